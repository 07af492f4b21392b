//! Local artifact sink: result JSON, its ZIP archive, and cleanup.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

use ufbatch_core::model::ExportDocument;
use ufbatch_core::{ArtifactSink, BatchError, BatchResult};

/// Writes artifacts to the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalArtifactSink;

impl LocalArtifactSink {
    pub fn new() -> Self {
        Self
    }
}

fn write_json(document: &ExportDocument, path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, document)?;
    writer.flush()
}

fn zip_single(source: &Path, target: &Path) -> zip::result::ZipResult<()> {
    let entry_name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut zip = zip::ZipWriter::new(BufWriter::new(File::create(target)?));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    zip.start_file(entry_name, options)?;
    io::copy(&mut File::open(source)?, &mut zip)?;
    zip.finish()?.flush()?;
    Ok(())
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

impl ArtifactSink for LocalArtifactSink {
    fn write_result(&self, document: &ExportDocument, path: &Path) -> BatchResult<()> {
        write_json(document, path).map_err(|e| {
            BatchError::file_processing(format!("failed to write {}: {e}", path.display()))
        })
    }

    fn compress(&self, source: &Path, target: &Path) -> BatchResult<PathBuf> {
        zip_single(source, target).map_err(|e| {
            BatchError::file_processing(format!(
                "failed to compress {} into {}: {e}",
                source.display(),
                target.display()
            ))
        })?;
        Ok(target.to_path_buf())
    }

    fn delete(&self, paths: &[&Path]) -> BatchResult<()> {
        for path in paths {
            remove_if_exists(path).map_err(|e| {
                BatchError::file_processing_fatal(format!(
                    "failed to delete {}: {e}",
                    path.display()
                ))
            })?;
            tracing::debug!(path = %path.display(), "artifact removed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use ufbatch_core::model::AttributeRecord;

    fn document() -> ExportDocument {
        ExportDocument::from_records(&[AttributeRecord {
            infra_company_id: Some("C1".into()),
            data_type: Some("pipe".into()),
            object_id: Some("o1".into()),
            facility_classification_name: Some("Gas main".into()),
            facility_attribute: None,
            sid_list: vec!["15/0/1/2".into()],
        }])
    }

    #[test]
    fn writes_pretty_json_with_lf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("T-1_location.json");

        LocalArtifactSink.write_result(&document(), &path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("{\n  \"isFacilityExist\": true,"));
        assert!(!text.contains('\r'));
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["facilitySidList"][0]["objectName"], "Gas main");
        assert_eq!(value["facilitySidList"][0]["facilityAttribute"], "");
    }

    #[test]
    fn creates_missing_export_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out/T-1_location.json");
        LocalArtifactSink.write_result(&document(), &path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn compresses_into_single_named_entry() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("T-1_location.json");
        let zip_path = dir.path().join("T-1_location.zip");
        LocalArtifactSink.write_result(&document(), &json).unwrap();

        let out = LocalArtifactSink.compress(&json, &zip_path).unwrap();
        assert_eq!(out, zip_path);

        let mut archive = zip::ZipArchive::new(File::open(&zip_path).unwrap()).unwrap();
        assert_eq!(archive.len(), 1);
        let mut entry = archive.by_index(0).unwrap();
        assert_eq!(entry.name(), "T-1_location.json");
        let mut contents = String::new();
        entry.read_to_string(&mut contents).unwrap();
        assert_eq!(contents, fs::read_to_string(&json).unwrap());
    }

    #[test]
    fn compress_missing_source_is_retryable_file_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = LocalArtifactSink
            .compress(&dir.path().join("absent.json"), &dir.path().join("absent.zip"))
            .unwrap_err();
        assert!(matches!(err, BatchError::FileProcessing(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("T-1_location.json");
        let zip_path = dir.path().join("T-1_location.zip");
        fs::write(&json, "{}").unwrap();

        LocalArtifactSink.delete(&[json.as_path(), zip_path.as_path()]).unwrap();
        assert!(!json.exists());

        LocalArtifactSink.delete(&[json.as_path(), zip_path.as_path()]).unwrap();
    }

    #[test]
    fn delete_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        // a non-empty directory cannot be removed as a file
        let blocker = dir.path().join("T-1_location.json");
        fs::create_dir(&blocker).unwrap();
        fs::write(blocker.join("inner"), "x").unwrap();

        let err = LocalArtifactSink.delete(&[blocker.as_path()]).unwrap_err();
        assert!(matches!(err, BatchError::FileProcessingFatal(_)));
        assert!(!err.is_retryable());
    }
}
