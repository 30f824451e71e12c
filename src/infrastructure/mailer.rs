use crate::domain::claim::{ClaimRequest, Decision, StagedFile};
use crate::domain::error::{AppError, Result};
use crate::infrastructure::config::SmtpSettings;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::warn;

/// Transactional email delivery for decided claims. Approved requests go to
/// the administrator with the claimant copied; rejected requests go to the
/// claimant only. Every original artifact is attached.
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    config: SmtpSettings,
}

impl Mailer {
    pub fn new(config: SmtpSettings) -> Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.server)
            .map_err(|e| AppError::Config(format!("Invalid SMTP relay '{}': {}", config.server, e)))?
            .port(config.port)
            .credentials(Credentials::new(config.user.clone(), config.password.clone()))
            .build();
        Ok(Self { transport, config })
    }

    pub async fn send_decision(
        &self,
        claim: &ClaimRequest,
        decision: Decision,
        feedback: &str,
        attachments: &[StagedFile],
    ) -> Result<()> {
        let (to, cc) = recipients(decision, &claim.claimant_email, &claim.admin_email);
        let body = decision_body(claim, decision, feedback);

        let mut builder = Message::builder()
            .from(parse_mailbox(&self.config.user)?)
            .to(parse_mailbox(&to)?)
            .subject("Reimbursement Request Decision");
        if let Some(cc) = cc {
            builder = builder.cc(parse_mailbox(&cc)?);
        }

        let mut parts = MultiPart::mixed().singlepart(SinglePart::plain(body));
        for staged in attachments {
            let bytes = match std::fs::read(&staged.path) {
                Ok(bytes) => bytes,
                Err(err) => {
                    warn!(file = %staged.original_name, error = %err, "skipping unreadable attachment");
                    continue;
                }
            };
            let mime = mime_guess::from_path(&staged.original_name).first_or_octet_stream();
            let Ok(content_type) = ContentType::parse(mime.as_ref()) else {
                warn!(file = %staged.original_name, "skipping attachment with unmappable content type");
                continue;
            };
            parts = parts
                .singlepart(Attachment::new(staged.original_name.clone()).body(bytes, content_type));
        }

        let message = builder
            .multipart(parts)
            .map_err(|e| AppError::Delivery(format!("Failed to build message: {}", e)))?;
        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::Delivery(format!("Failed to send email: {}", e)))?;
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox> {
    address
        .parse()
        .map_err(|e| AppError::Validation(format!("Invalid email address '{}': {}", address, e)))
}

/// Recipient routing: (to, cc).
fn recipients(decision: Decision, claimant: &str, admin: &str) -> (String, Option<String>) {
    match decision {
        Decision::Approved => (admin.to_string(), Some(claimant.to_string())),
        Decision::Rejected => (claimant.to_string(), None),
    }
}

fn decision_body(claim: &ClaimRequest, decision: Decision, feedback: &str) -> String {
    match decision {
        Decision::Approved => format!(
            "Reimbursement request from {} ({}) has been APPROVED.\n\nDetails:\n{}\n\nDecision Summary:\n{}",
            claim.claimant_name, claim.claimant_email, claim.details, feedback
        ),
        Decision::Rejected => format!(
            "Dear {},\n\nYour reimbursement request for '{}' has been REJECTED.\n\nReason:\n{}\n\nPlease contact your administrator for more details.",
            claim.claimant_name, claim.details, feedback
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claim() -> ClaimRequest {
        ClaimRequest {
            role: "user".to_string(),
            claimant_name: "Joe".to_string(),
            claimant_email: "joe@example.com".to_string(),
            admin_email: "admin@example.com".to_string(),
            details: "Conference travel".to_string(),
        }
    }

    #[test]
    fn approved_notifies_admin_with_claimant_copied() {
        let (to, cc) = recipients(Decision::Approved, "joe@example.com", "admin@example.com");
        assert_eq!(to, "admin@example.com");
        assert_eq!(cc.as_deref(), Some("joe@example.com"));
    }

    #[test]
    fn rejected_notifies_only_the_claimant() {
        let (to, cc) = recipients(Decision::Rejected, "joe@example.com", "admin@example.com");
        assert_eq!(to, "joe@example.com");
        assert!(cc.is_none());
    }

    #[test]
    fn rejection_body_names_the_claimant_and_reason() {
        let body = decision_body(&claim(), Decision::Rejected, "Missing receipt date.");
        assert!(body.contains("Dear Joe"));
        assert!(body.contains("REJECTED"));
        assert!(body.contains("Missing receipt date."));
    }
}
