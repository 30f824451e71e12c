use crate::application::ReimbursementUseCase;
use crate::domain::claim::{AggregateOutcome, ClaimRequest, UploadedFile};
use crate::domain::error::AppError;
use actix_multipart::form::bytes::Bytes;
use actix_multipart::form::text::Text;
use actix_multipart::form::MultipartForm;
use actix_web::http::StatusCode;
use actix_web::{get, post, web, HttpResponse, ResponseError};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

pub struct HttpState {
    pub reimbursement_use_case: Arc<ReimbursementUseCase>,
}

#[derive(Debug, MultipartForm)]
pub struct ReimbursementForm {
    pub role: Text<String>,
    pub name: Text<String>,
    pub email: Text<String>,
    pub admin_email: Text<String>,
    pub reimbursement_details: Text<String>,
    #[multipart(rename = "files")]
    pub files: Vec<Bytes>,
}

#[derive(Serialize)]
pub struct ReimbursementResponse {
    pub status: String,
    pub feedback: String,
    pub processed_files: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploaded_files: Option<Vec<String>>,
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl From<AggregateOutcome> for ReimbursementResponse {
    fn from(outcome: AggregateOutcome) -> Self {
        Self {
            status: outcome.final_decision.as_str().to_string(),
            feedback: outcome.combined_feedback,
            processed_files: outcome.processed_count,
            uploaded_files: if outcome.artifact_locations.is_empty() {
                None
            } else {
                Some(outcome.artifact_locations)
            },
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Extraction(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            detail: self.to_string(),
        })
    }
}

#[post("/request_reimbursement")]
async fn request_reimbursement(
    data: web::Data<HttpState>,
    MultipartForm(form): MultipartForm<ReimbursementForm>,
) -> Result<HttpResponse, AppError> {
    info!(files = form.files.len(), "received reimbursement request");

    let claim = ClaimRequest {
        role: form.role.into_inner(),
        claimant_name: form.name.into_inner(),
        claimant_email: form.email.into_inner(),
        admin_email: form.admin_email.into_inner(),
        details: form.reimbursement_details.into_inner(),
    };
    let files = form
        .files
        .into_iter()
        .map(|file| UploadedFile {
            file_name: file.file_name.unwrap_or_else(|| "upload".to_string()),
            bytes: file.data.to_vec(),
        })
        .collect();

    let outcome = data
        .reimbursement_use_case
        .execute(claim, files)
        .await
        .map_err(|err| {
            error!(error = %err, "reimbursement request failed");
            err
        })?;

    Ok(HttpResponse::Ok().json(ReimbursementResponse::from(outcome)))
}

#[get("/health")]
async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(request_reimbursement).service(health);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::claim::Decision;

    #[test]
    fn validation_failures_are_client_errors() {
        assert_eq!(
            AppError::Validation("bad role".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Extraction("all failed".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn provider_failures_are_server_errors() {
        for err in [
            AppError::ModelInvocation("x".to_string()),
            AppError::Storage("x".to_string()),
            AppError::Delivery("x".to_string()),
            AppError::ArtifactMissing("x".to_string()),
        ] {
            assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[test]
    fn upload_urls_are_omitted_when_storage_is_disabled() {
        let outcome = AggregateOutcome {
            final_decision: Decision::Approved,
            combined_feedback: "ok".to_string(),
            processed_count: 1,
            artifact_locations: Vec::new(),
        };
        let response = ReimbursementResponse::from(outcome);
        assert_eq!(response.status, "Approved");
        assert!(response.uploaded_files.is_none());
    }
}
