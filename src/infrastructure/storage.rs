use crate::domain::claim::{Decision, StagedFile};
use crate::domain::error::{AppError, Result};
use crate::infrastructure::config::StorageSettings;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::time::Duration;

/// HTTP object-store client. Keys are namespaced by claimant and final
/// decision so an administrator can browse evidence per person and outcome.
pub struct StorageClient {
    client: reqwest::Client,
    config: StorageSettings,
}

impl StorageClient {
    pub fn new(config: StorageSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    /// Uploads one staged artifact and returns its durable retrieval URL.
    pub async fn upload_artifact(
        &self,
        claimant_email: &str,
        decision: Decision,
        staged: &StagedFile,
    ) -> Result<String> {
        let token = self.config.access_token.clone().ok_or_else(|| {
            AppError::Storage("Missing object storage credentials".to_string())
        })?;

        let bytes = std::fs::read(&staged.path).map_err(|e| {
            AppError::ArtifactMissing(format!(
                "Staged file '{}' vanished before upload: {}",
                staged.original_name, e
            ))
        })?;
        let content_type = mime_guess::from_path(&staged.original_name)
            .first_or_octet_stream()
            .to_string();

        let key = object_key(
            &self.config.root,
            claimant_email,
            decision,
            &staged.original_name,
            Utc::now(),
        );
        let url = format!(
            "{}/{}/{}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.bucket,
            key
        );

        let response = self
            .client
            .put(&url)
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Upload request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::Storage(format!(
                "Upload rejected ({}): {}",
                status, text
            )));
        }

        let public_base = self
            .config
            .public_base_url
            .as_deref()
            .unwrap_or(&self.config.endpoint);
        Ok(format!(
            "{}/{}/{}",
            public_base.trim_end_matches('/'),
            self.config.bucket,
            key
        ))
    }
}

/// `<root>/<sanitized-claimant>/<DECISION>/<stem>_<timestamp><ext>`
pub fn object_key(
    root: &str,
    claimant_email: &str,
    decision: Decision,
    original_name: &str,
    now: DateTime<Utc>,
) -> String {
    let recipient: String = claimant_email
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let name = Path::new(original_name);
    let stem = name
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("artifact");
    let ext = name
        .extension()
        .and_then(|s| s.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default();
    format!(
        "{}/{}/{}/{}_{}{}",
        root,
        recipient,
        decision.as_str().to_uppercase(),
        stem,
        now.format("%Y%m%d%H%M%S"),
        ext
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn key_is_namespaced_by_claimant_and_decision() {
        let now = Utc.with_ymd_and_hms(2026, 8, 30, 12, 0, 0).unwrap();
        let key = object_key(
            "claims",
            "joe@example.com",
            Decision::Approved,
            "Receipt.PDF",
            now,
        );
        assert_eq!(
            key,
            "claims/joe_example_com/APPROVED/Receipt_20260830120000.pdf"
        );
    }

    #[test]
    fn nameless_artifacts_still_get_a_key() {
        let now = Utc.with_ymd_and_hms(2026, 8, 30, 12, 0, 0).unwrap();
        let key = object_key("claims", "a@b.c", Decision::Rejected, "", now);
        assert!(key.starts_with("claims/a_b_c/REJECTED/artifact_"));
    }
}
