pub mod aggregation;
pub mod archive;
pub mod decision;
pub mod extraction;
pub mod prompts;
pub mod reimbursement;
pub mod verification;
