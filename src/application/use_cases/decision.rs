use crate::application::use_cases::prompts;
use crate::domain::claim::{ContentUnit, Decision, Verdict};
use crate::domain::error::{AppError, Result};
use crate::infrastructure::llm_clients::{LLMClient, UserContent};
use serde::Deserialize;
use std::sync::Arc;

/// Drives one model call per content unit and parses the reply into a
/// `Verdict`. The model is asked for a structured JSON reply first; the
/// `Decision:`/`Feedback:` line-prefix format is accepted as a fallback for
/// providers that cannot guarantee structure.
pub struct DecisionEngine {
    llm_client: Arc<dyn LLMClient + Send + Sync>,
}

#[derive(Debug, Deserialize)]
struct StructuredReply {
    decision: String,
    feedback: String,
}

impl DecisionEngine {
    pub fn new(llm_client: Arc<dyn LLMClient + Send + Sync>) -> Self {
        Self { llm_client }
    }

    pub async fn evaluate(&self, unit: &ContentUnit) -> Result<Verdict> {
        let system = prompts::decision_system_prompt();
        let user = if unit.is_image {
            UserContent::Image {
                prompt: prompts::decision_image_prompt(),
                payload: unit.content.clone(),
            }
        } else {
            UserContent::Text(prompts::decision_user_prompt(&unit.content))
        };

        let reply = self.llm_client.generate(&system, &user).await?;
        parse_verdict(&reply)
    }
}

/// Parses a model reply into a verdict. An off-vocabulary or missing
/// decision label is a model error, never an implicit approve or reject.
pub fn parse_verdict(reply: &str) -> Result<Verdict> {
    let payload = strip_code_fence(reply);
    if let Ok(structured) = serde_json::from_str::<StructuredReply>(&payload) {
        let decision = parse_decision_label(&structured.decision)?;
        return Ok(Verdict {
            decision,
            feedback: structured.feedback.trim().to_string(),
        });
    }

    let mut label: Option<String> = None;
    let mut feedback_lines: Vec<String> = Vec::new();
    for raw_line in reply.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        let lower = line.to_lowercase();
        if lower.starts_with("decision:") {
            // Slice the original line so the label is kept verbatim.
            label = Some(line["decision:".len()..].trim().to_string());
        } else if lower.starts_with("feedback:") {
            feedback_lines.push(line["feedback:".len()..].trim().to_string());
        } else {
            feedback_lines.push(line.to_string());
        }
    }

    let label = label.ok_or_else(|| {
        AppError::ModelInvocation("Model reply contained no decision label".to_string())
    })?;
    let decision = parse_decision_label(&label)?;
    Ok(Verdict {
        decision,
        feedback: feedback_lines.join("\n").trim().to_string(),
    })
}

fn parse_decision_label(label: &str) -> Result<Decision> {
    match label.trim().trim_matches(|c| c == '.' || c == '!').to_lowercase().as_str() {
        "approve" | "approved" => Ok(Decision::Approved),
        "reject" | "rejected" => Ok(Decision::Rejected),
        other => Err(AppError::ModelInvocation(format!(
            "Unrecognized decision label: '{}'",
            other
        ))),
    }
}

fn strip_code_fence(value: &str) -> String {
    let trimmed = value.trim();
    if let Some(stripped) = trimmed.strip_prefix("```json") {
        return stripped.trim().trim_end_matches("```").trim().to_string();
    }
    if let Some(stripped) = trimmed.strip_prefix("```") {
        return stripped.trim().trim_end_matches("```").trim().to_string();
    }
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_structured_json_reply() {
        let verdict =
            parse_verdict(r#"{"decision": "Approve", "feedback": "Within policy."}"#).unwrap();
        assert_eq!(verdict.decision, Decision::Approved);
        assert_eq!(verdict.feedback, "Within policy.");
    }

    #[test]
    fn parses_fenced_json_reply() {
        let reply = "```json\n{\"decision\": \"Rejected\", \"feedback\": \"No receipt date.\"}\n```";
        let verdict = parse_verdict(reply).unwrap();
        assert_eq!(verdict.decision, Decision::Rejected);
    }

    #[test]
    fn parses_line_prefix_reply_case_insensitively() {
        let reply = "decision: Approve\nFEEDBACK: Taxi fare is covered.\nThe amount is reasonable.";
        let verdict = parse_verdict(reply).unwrap();
        assert_eq!(verdict.decision, Decision::Approved);
        assert_eq!(
            verdict.feedback,
            "Taxi fare is covered.\nThe amount is reasonable."
        );
    }

    #[test]
    fn non_prefixed_lines_join_the_feedback_in_order() {
        let reply = "Summary of the claim.\nDecision: Reject\nFeedback: Over the limit.\nSee the travel policy.";
        let verdict = parse_verdict(reply).unwrap();
        assert_eq!(verdict.decision, Decision::Rejected);
        assert_eq!(
            verdict.feedback,
            "Summary of the claim.\nOver the limit.\nSee the travel policy."
        );
    }

    #[test]
    fn missing_decision_label_is_a_model_error() {
        let err = parse_verdict("Looks fine to me.").unwrap_err();
        assert!(matches!(err, AppError::ModelInvocation(_)));
    }

    #[test]
    fn off_vocabulary_label_is_a_model_error() {
        let err = parse_verdict("Decision: Maybe\nFeedback: unsure").unwrap_err();
        assert!(matches!(err, AppError::ModelInvocation(_)));
    }
}
