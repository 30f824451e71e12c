use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize)]
pub enum AppError {
    Validation(String),
    Extraction(String),
    ModelInvocation(String),
    Storage(String),
    ArtifactMissing(String),
    Delivery(String),
    Config(String),
    IoError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(msg) => write!(f, "Validation error: {}", msg),
            AppError::Extraction(msg) => write!(f, "Extraction error: {}", msg),
            AppError::ModelInvocation(msg) => write!(f, "Model error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::ArtifactMissing(msg) => write!(f, "Artifact missing: {}", msg),
            AppError::Delivery(msg) => write!(f, "Delivery error: {}", msg),
            AppError::Config(msg) => write!(f, "Config error: {}", msg),
            AppError::IoError(msg) => write!(f, "IO error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
