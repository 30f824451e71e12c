pub mod claim;
pub mod error;
