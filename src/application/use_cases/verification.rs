use crate::application::use_cases::prompts;
use crate::domain::claim::Verdict;
use crate::domain::error::Result;
use crate::infrastructure::llm_clients::{LLMClient, UserContent};
use std::sync::Arc;

/// Second, independent model call checking that the feedback actually
/// supports the stated decision. Fail-closed: anything but an affirmative
/// reply counts as "no", and the caller downgrades the verdict to Rejected.
pub struct ConsistencyVerifier {
    llm_client: Arc<dyn LLMClient + Send + Sync>,
}

impl ConsistencyVerifier {
    pub fn new(llm_client: Arc<dyn LLMClient + Send + Sync>) -> Self {
        Self { llm_client }
    }

    pub async fn verify(&self, verdict: &Verdict) -> Result<bool> {
        let system = prompts::verification_system_prompt();
        let user = UserContent::Text(prompts::verification_user_prompt(
            verdict.decision.as_str(),
            &verdict.feedback,
        ));
        let reply = self.llm_client.generate(&system, &user).await?;
        Ok(is_affirmative(&reply))
    }
}

fn is_affirmative(reply: &str) -> bool {
    reply.to_lowercase().contains("yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn affirmative_tokens_pass() {
        assert!(is_affirmative("Yes"));
        assert!(is_affirmative("yes, the feedback supports the decision"));
        assert!(is_affirmative("YES."));
    }

    #[test]
    fn anything_else_fails_closed() {
        assert!(!is_affirmative("No"));
        assert!(!is_affirmative("Unclear"));
        assert!(!is_affirmative(""));
        assert!(!is_affirmative("The feedback contradicts the decision."));
    }
}
