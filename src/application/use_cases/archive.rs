use crate::application::use_cases::extraction;
use crate::domain::claim::{extension_of, is_content_extension, ContentUnit};
use crate::domain::error::{AppError, Result};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

/// Expands a zip archive into the content units of its recognized members.
///
/// Members are unpacked into a scratch directory that is removed when the
/// expansion completes or fails. Nested archives are skipped so recursion
/// stays bounded, and a member that fails extraction is logged and dropped
/// rather than aborting the batch.
pub struct ArchiveExpander {
    scratch_root: Option<PathBuf>,
}

impl ArchiveExpander {
    pub fn new(scratch_root: Option<PathBuf>) -> Self {
        Self { scratch_root }
    }

    pub fn expand(&self, archive_path: &Path) -> Result<Vec<ContentUnit>> {
        let file = fs::File::open(archive_path)
            .map_err(|e| AppError::Extraction(format!("Failed to open archive: {}", e)))?;
        let mut archive = zip::ZipArchive::new(file)
            .map_err(|e| AppError::Extraction(format!("Failed to read archive: {}", e)))?;

        let scratch = self.scratch_dir()?;
        let mut units = Vec::new();

        for index in 0..archive.len() {
            let mut entry = match archive.by_index(index) {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(index, error = %err, "skipping unreadable archive member");
                    continue;
                }
            };
            if entry.is_dir() {
                continue;
            }
            let Some(member_path) = entry.enclosed_name().map(Path::to_path_buf) else {
                warn!(name = entry.name(), "skipping archive member with unsafe path");
                continue;
            };
            let member_name = member_path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("member")
                .to_string();
            let Some(ext) = extension_of(&member_name).filter(|e| is_content_extension(e)) else {
                debug!(member = %member_name, "skipping archive member with unrecognized extension");
                continue;
            };

            let mut bytes = Vec::new();
            if let Err(err) = entry.read_to_end(&mut bytes) {
                warn!(member = %member_name, error = %err, "skipping archive member that failed to decompress");
                continue;
            }
            let staged = scratch.path().join(format!("{}_{}", index, member_name));
            if let Err(err) = fs::write(&staged, &bytes) {
                warn!(member = %member_name, error = %err, "skipping archive member that failed to stage");
                continue;
            }

            match extraction::extract(&staged, &ext) {
                Ok(unit) => units.push(unit),
                Err(err) => {
                    warn!(member = %member_name, error = %err, "dropping archive member that failed extraction");
                }
            }
        }

        Ok(units)
    }

    fn scratch_dir(&self) -> Result<TempDir> {
        let scratch = match &self.scratch_root {
            Some(root) => TempDir::new_in(root),
            None => TempDir::new(),
        };
        scratch.map_err(|e| AppError::Extraction(format!("Failed to create scratch dir: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;

    fn write_test_archive(dir: &Path) -> PathBuf {
        let path = dir.join("bundle.zip");
        let file = fs::File::create(&path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = FileOptions::default();

        writer.start_file("receipt.png", options).unwrap();
        writer.write_all(&[0x89, 0x50, 0x4e, 0x47]).unwrap();

        writer.start_file("broken.docx", options).unwrap();
        writer.write_all(b"not a real document").unwrap();

        writer.start_file("inner.zip", options).unwrap();
        writer.write_all(b"nested archives are skipped").unwrap();

        writer.start_file("notes.txt", options).unwrap();
        writer.write_all(b"irrelevant").unwrap();

        writer.finish().unwrap();
        path
    }

    #[test]
    fn expands_only_recognized_members_and_drops_failures() {
        let dir = tempfile::tempdir().unwrap();
        let archive_path = write_test_archive(dir.path());

        let units = ArchiveExpander::new(None).expand(&archive_path).unwrap();

        // The corrupt docx is dropped, the nested zip and the .txt member
        // are never attempted; only the image survives.
        assert_eq!(units.len(), 1);
        assert!(units[0].is_image);
    }

    #[test]
    fn scratch_dir_is_removed_after_expansion() {
        let dir = tempfile::tempdir().unwrap();
        let scratch_root = dir.path().join("scratch");
        fs::create_dir(&scratch_root).unwrap();
        let archive_path = write_test_archive(dir.path());

        let expander = ArchiveExpander::new(Some(scratch_root.clone()));
        expander.expand(&archive_path).unwrap();

        assert_eq!(fs::read_dir(&scratch_root).unwrap().count(), 0);
    }

    #[test]
    fn unreadable_archive_is_an_extraction_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.zip");
        fs::write(&path, b"definitely not a zip").unwrap();

        let err = ArchiveExpander::new(None).expand(&path).unwrap_err();
        assert!(matches!(err, AppError::Extraction(_)));
    }
}
