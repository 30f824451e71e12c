use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Extensions the content extractor knows how to read.
pub const CONTENT_EXTENSIONS: [&str; 5] = ["docx", "pdf", "jpg", "jpeg", "png"];

/// Archives are accepted at upload time and expanded into their members.
pub const ARCHIVE_EXTENSION: &str = "zip";

pub fn extension_of(file_name: &str) -> Option<String> {
    std::path::Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

pub fn is_content_extension(ext: &str) -> bool {
    CONTENT_EXTENSIONS.contains(&ext)
}

pub fn is_accepted_extension(ext: &str) -> bool {
    is_content_extension(ext) || ext == ARCHIVE_EXTENSION
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Approved,
    Rejected,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Approved => "Approved",
            Decision::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One extracted item, normalized so every downstream stage is
/// format-agnostic. `content` is plain text, or a base64 payload when
/// `is_image` is set.
#[derive(Debug, Clone)]
pub struct ContentUnit {
    pub content: String,
    pub is_image: bool,
}

impl ContentUnit {
    pub fn text(content: String) -> Self {
        Self {
            content,
            is_image: false,
        }
    }

    pub fn image(payload: String) -> Self {
        Self {
            content: payload,
            is_image: true,
        }
    }
}

/// One item's decision plus the model's justification.
#[derive(Debug, Clone)]
pub struct Verdict {
    pub decision: Decision,
    pub feedback: String,
}

/// The reconciled result for a whole request.
#[derive(Debug, Clone)]
pub struct AggregateOutcome {
    pub final_decision: Decision,
    pub combined_feedback: String,
    pub processed_count: usize,
    pub artifact_locations: Vec<String>,
}

/// Claimant metadata submitted alongside the files.
#[derive(Debug, Clone)]
pub struct ClaimRequest {
    pub role: String,
    pub claimant_name: String,
    pub claimant_email: String,
    pub admin_email: String,
    pub details: String,
}

/// A raw upload as received from the HTTP layer.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// An upload written to the request-scoped staging directory.
#[derive(Debug, Clone)]
pub struct StagedFile {
    pub path: PathBuf,
    pub original_name: String,
    pub extension: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_lowercased() {
        assert_eq!(extension_of("Receipt.DOCX").as_deref(), Some("docx"));
        assert_eq!(extension_of("scan.jpeg").as_deref(), Some("jpeg"));
        assert_eq!(extension_of("noext"), None);
    }

    #[test]
    fn archive_is_accepted_but_not_content() {
        assert!(is_accepted_extension("zip"));
        assert!(!is_content_extension("zip"));
        assert!(!is_accepted_extension("txt"));
    }
}
