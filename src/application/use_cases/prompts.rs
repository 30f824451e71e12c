use chrono::Local;

pub(crate) fn decision_system_prompt() -> String {
    "You are an assistant helping with reimbursement requests. Review the submitted receipt, \
     summarize it, and explicitly decide whether to 'Approve' or 'Reject' the request based on \
     the provided information and standard reimbursement guidelines. Prefer returning a JSON \
     object with exactly the keys \"decision\" (either \"Approve\" or \"Reject\") and \
     \"feedback\" (your justification). If you cannot return JSON, respond with exactly two \
     fields:\nDecision: Approve or Reject\nFeedback: your justification"
        .to_string()
}

pub(crate) fn decision_user_prompt(content: &str) -> String {
    format!(
        "Today is {}. Here is the document content:\n\n{}\n\nDoes this meet the criteria for reimbursement?",
        Local::now().format("%Y-%m-%d"),
        content
    )
}

pub(crate) fn decision_image_prompt() -> String {
    format!(
        "Today is {}. The attached image is the submitted receipt. Does it meet the criteria for reimbursement?",
        Local::now().format("%Y-%m-%d")
    )
}

pub(crate) fn verification_system_prompt() -> String {
    "You are a strict reviewer of reimbursement decisions. You will be given a decision and the \
     feedback that was written to justify it. Answer only the question: does the feedback \
     actually support the stated decision? Reply with Yes or No."
        .to_string()
}

pub(crate) fn verification_user_prompt(decision: &str, feedback: &str) -> String {
    format!(
        "Decision: {}\nFeedback:\n{}\n\nDoes the feedback support the decision? Answer Yes or No.",
        decision, feedback
    )
}
