use crate::application::use_cases::aggregation::aggregate;
use crate::application::use_cases::archive::ArchiveExpander;
use crate::application::use_cases::decision::DecisionEngine;
use crate::application::use_cases::extraction;
use crate::application::use_cases::verification::ConsistencyVerifier;
use crate::domain::claim::{
    extension_of, is_accepted_extension, AggregateOutcome, ClaimRequest, ContentUnit, Decision,
    StagedFile, UploadedFile, ARCHIVE_EXTENSION,
};
use crate::domain::error::{AppError, Result};
use crate::infrastructure::llm_clients::LLMClient;
use crate::infrastructure::mailer::Mailer;
use crate::infrastructure::storage::StorageClient;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{info, warn};

/// Drives one claim end to end: validate, stage, extract, evaluate, verify,
/// aggregate, deliver. Staged files live in a request-scoped temp directory
/// whose drop guarantees cleanup on every exit path, including mid-phase
/// failures.
pub struct ReimbursementUseCase {
    engine: DecisionEngine,
    verifier: ConsistencyVerifier,
    storage: Option<Arc<StorageClient>>,
    mailer: Option<Arc<Mailer>>,
    staging_root: Option<PathBuf>,
}

impl ReimbursementUseCase {
    pub fn new(
        llm_client: Arc<dyn LLMClient + Send + Sync>,
        storage: Option<Arc<StorageClient>>,
        mailer: Option<Arc<Mailer>>,
        staging_root: Option<PathBuf>,
    ) -> Self {
        Self {
            engine: DecisionEngine::new(llm_client.clone()),
            verifier: ConsistencyVerifier::new(llm_client),
            storage,
            mailer,
            staging_root,
        }
    }

    pub async fn execute(
        &self,
        claim: ClaimRequest,
        files: Vec<UploadedFile>,
    ) -> Result<AggregateOutcome> {
        // Validating
        if !claim.role.eq_ignore_ascii_case("user") {
            return Err(AppError::Validation("Role must be 'user'.".to_string()));
        }
        if files.is_empty() {
            return Err(AppError::Validation(
                "At least one file is required.".to_string(),
            ));
        }
        // Every upload needs a recognized extension before anything is
        // staged or any model call is made.
        for file in &files {
            match extension_of(&file.file_name) {
                Some(ext) if is_accepted_extension(&ext) => {}
                _ => {
                    return Err(AppError::Validation(format!(
                        "Unsupported file type: '{}'",
                        file.file_name
                    )))
                }
            }
        }

        // Staging. The TempDir binding keeps the directory alive for the
        // rest of the request and removes it on drop, whichever way
        // `process` returns.
        let staging = self.staging_dir()?;
        let staged = stage_uploads(&staging, files)?;
        self.process(&claim, &staged).await
    }

    async fn process(
        &self,
        claim: &ClaimRequest,
        staged: &[StagedFile],
    ) -> Result<AggregateOutcome> {
        // Extracting
        let units = self.extract_all(staged);
        if units.is_empty() {
            return Err(AppError::Extraction(
                "No uploaded file could be processed".to_string(),
            ));
        }

        // Evaluating + Verifying, one unit at a time; every verdict is
        // settled before aggregation.
        let mut verdicts = Vec::with_capacity(units.len());
        for unit in &units {
            let mut verdict = self.engine.evaluate(unit).await?;
            if !self.verifier.verify(&verdict).await? {
                warn!(
                    decision = %verdict.decision,
                    "feedback does not support the decision, downgrading to Rejected"
                );
                verdict.decision = Decision::Rejected;
            }
            verdicts.push(verdict);
        }

        // Aggregating
        let mut outcome = aggregate(&verdicts);
        info!(
            decision = %outcome.final_decision,
            processed = outcome.processed_count,
            "claim decided"
        );

        // Delivering
        if let Some(storage) = &self.storage {
            for file in staged {
                match storage
                    .upload_artifact(&claim.claimant_email, outcome.final_decision, file)
                    .await
                {
                    Ok(url) => outcome.artifact_locations.push(url),
                    // Best-effort per artifact in the batch case; a single
                    // upload is atomic-or-fail.
                    Err(err) if staged.len() > 1 => {
                        warn!(file = %file.original_name, error = %err, "artifact upload failed, skipping");
                    }
                    Err(err) => return Err(err),
                }
            }
        }
        if let Some(mailer) = &self.mailer {
            mailer
                .send_decision(
                    claim,
                    outcome.final_decision,
                    &outcome.combined_feedback,
                    staged,
                )
                .await?;
        }

        Ok(outcome)
    }

    fn extract_all(&self, staged: &[StagedFile]) -> Vec<ContentUnit> {
        let expander = ArchiveExpander::new(self.staging_root.clone());
        let mut units = Vec::new();
        for file in staged {
            if file.extension == ARCHIVE_EXTENSION {
                match expander.expand(&file.path) {
                    Ok(mut expanded) => units.append(&mut expanded),
                    Err(err) => {
                        warn!(file = %file.original_name, error = %err, "dropping archive that failed expansion");
                    }
                }
            } else {
                match extraction::extract(&file.path, &file.extension) {
                    Ok(unit) => units.push(unit),
                    Err(err) => {
                        warn!(file = %file.original_name, error = %err, "dropping file that failed extraction");
                    }
                }
            }
        }
        units
    }

    fn staging_dir(&self) -> Result<TempDir> {
        let staging = match &self.staging_root {
            Some(root) => TempDir::new_in(root),
            None => TempDir::new(),
        };
        staging.map_err(|e| AppError::IoError(format!("Failed to create staging dir: {}", e)))
    }
}

fn stage_uploads(staging: &TempDir, files: Vec<UploadedFile>) -> Result<Vec<StagedFile>> {
    let mut staged = Vec::with_capacity(files.len());
    for (index, file) in files.into_iter().enumerate() {
        let extension = extension_of(&file.file_name).ok_or_else(|| {
            AppError::Validation(format!("Unsupported file type: '{}'", file.file_name))
        })?;
        let path = staging.path().join(format!("{}_{}", index, file.file_name));
        std::fs::write(&path, &file.bytes)?;
        staged.push(StagedFile {
            path,
            original_name: file.file_name,
            extension,
        });
    }
    Ok(staged)
}
