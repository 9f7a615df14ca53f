//! Staging module - where an item's file lives while exiftool works on it
//!
//! Includes:
//! - Deterministic path derivation from the binary field name
//! - Stale sibling removal before reuse
//! - Writing and verifying the staged bytes
//! - Artifact cleanup

use crate::common::{BACKUP_SUFFIX, IN_PROGRESS_SUFFIX, PROCESSED_SUFFIX, errors::ExifError};
use crate::utils::{remove_if_exists, sibling_path};
use crate::workflow::types::{StagingGuard, try_acquire};
use log::{debug, info};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use tokio::task::{JoinError, spawn_blocking};

/// The staged file and the siblings exiftool may create next to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingPaths {
    pub staged: PathBuf,
    pub in_progress: PathBuf,
    pub processed: PathBuf,
    pub backup: PathBuf,
}

impl StagingPaths {
    /// `{storage}/{sanitized field}.{extension}` plus its siblings.
    pub fn derive(storage: &Path, field_name: &str, extension: &str) -> Result<Self, ExifError> {
        let cleaned = sanitize_field_name(field_name);
        if cleaned.is_empty() {
            return Err(ExifError::validation(format!(
                "binary property name {:?} contains no letters or digits",
                field_name
            )));
        }

        let staged = storage.join(format!("{}.{}", cleaned, extension));
        Ok(Self {
            in_progress: sibling_path(&staged, IN_PROGRESS_SUFFIX),
            processed: sibling_path(&staged, PROCESSED_SUFFIX),
            backup: sibling_path(&staged, BACKUP_SUFFIX),
            staged,
        })
    }

    /// Every transient file of one item.
    pub fn artifacts(&self) -> [&Path; 4] {
        [
            self.staged.as_path(),
            self.processed.as_path(),
            self.backup.as_path(),
            self.in_progress.as_path(),
        ]
    }

    /// The processed sibling wins when an operation produced one.
    pub fn output_path(&self) -> &Path {
        if self.processed.exists() {
            &self.processed
        } else {
            &self.staged
        }
    }

    /// Remove leftovers of a crashed run. exiftool refuses to write while its
    /// temp file exists, and a stale processed file would become the output.
    pub fn remove_stale(&self) -> Result<(), ExifError> {
        for path in [&self.in_progress, &self.processed] {
            if remove_if_exists(path).map_err(|err| ExifError::io(path, err))? {
                info!("Removed stale staging artifact {:?}", path);
            }
        }
        Ok(())
    }

    /// Delete all artifacts that exist. Every path is attempted; the first
    /// failure is returned.
    pub fn remove_artifacts(&self) -> Result<(), ExifError> {
        let mut first_error = None;
        for path in self.artifacts() {
            match remove_if_exists(path) {
                Ok(true) => debug!("Deleted staging artifact {:?}", path),
                Ok(false) => {}
                Err(err) if first_error.is_none() => first_error = Some(ExifError::io(path, err)),
                Err(err) => debug!("Also failed to delete {:?}: {}", path, err),
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Keep ASCII letters and digits only.
pub fn sanitize_field_name(field_name: &str) -> String {
    field_name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// Staging paths reserved for one item. The reservation ends on drop.
#[derive(Debug)]
pub struct StagedFile {
    pub paths: StagingPaths,
    _guard: StagingGuard,
}

/// Derive the paths for an item, reserve them and clear stale siblings.
pub fn allocate(storage: &Path, field_name: &str, extension: &str) -> Result<StagedFile, ExifError> {
    let paths = StagingPaths::derive(storage, field_name, extension)?;
    let guard = try_acquire(&paths.staged).ok_or_else(|| {
        ExifError::validation(format!(
            "staging path {:?} is already in use by another item",
            paths.staged
        ))
    })?;
    paths.remove_stale()?;
    Ok(StagedFile {
        paths,
        _guard: guard,
    })
}

/// Write the attachment to the staged path and check it reads back non-empty.
pub async fn write_staged(path: &Path, data: Vec<u8>) -> Result<(), ExifError> {
    let path_for_error = path;
    let path = path.to_path_buf();
    spawn_blocking(move || -> Result<(), ExifError> {
        fs::write(&path, &data).map_err(|err| ExifError::io(&path, err))?;
        let written = fs::read(&path).map_err(|err| ExifError::io(&path, err))?;
        if written.is_empty() {
            return Err(ExifError::validation(
                "failed to write binary data to temporary file",
            ));
        }
        Ok(())
    })
    .await
    .map_err(|err| staging_task_failed(path_for_error, err))?
}

fn staging_task_failed(path: &Path, err: JoinError) -> ExifError {
    ExifError::io(path, io::Error::other(format!("staging task failed: {}", err)))
}

/// Read the bytes of the effective output file.
pub async fn read_output(path: &Path) -> Result<Vec<u8>, ExifError> {
    tokio::fs::read(path)
        .await
        .map_err(|err| ExifError::io(path, err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_name_is_reduced_to_alphanumerics() {
        assert_eq!(sanitize_field_name("data"), "data");
        assert_eq!(sanitize_field_name("my-image_01.bin"), "myimage01bin");
        assert_eq!(sanitize_field_name("../../etc/passwd"), "etcpasswd");
        assert_eq!(sanitize_field_name("фото1"), "1");
    }

    #[test]
    fn paths_are_deterministic() {
        let storage = Path::new("/var/lib/n8n/storage");
        let a = StagingPaths::derive(storage, "image data", "jpg").unwrap();
        let b = StagingPaths::derive(storage, "image data", "jpg").unwrap();

        assert_eq!(a, b);
        assert_eq!(a.staged, storage.join("imagedata.jpg"));
        assert_eq!(a.in_progress, storage.join("imagedata.jpg_exiftool_tmp"));
        assert_eq!(a.processed, storage.join("imagedata.jpg_processed"));
        assert_eq!(a.backup, storage.join("imagedata.jpg_original"));
    }

    #[test]
    fn empty_sanitized_name_is_rejected() {
        let err = StagingPaths::derive(Path::new("/tmp"), "__--", "png").unwrap_err();
        assert!(matches!(err, ExifError::Validation(_)));
    }

    #[test]
    fn allocation_clears_stale_siblings() {
        let dir = tempfile::tempdir().unwrap();
        let paths = StagingPaths::derive(dir.path(), "stale", "jpg").unwrap();
        fs::write(&paths.in_progress, b"lock").unwrap();
        fs::write(&paths.processed, b"old output").unwrap();

        let staged = allocate(dir.path(), "stale", "jpg").unwrap();

        assert!(!staged.paths.in_progress.exists());
        assert!(!staged.paths.processed.exists());
    }

    #[test]
    fn allocation_is_exclusive_per_path() {
        let dir = tempfile::tempdir().unwrap();
        let first = allocate(dir.path(), "data", "png").unwrap();

        let err = allocate(dir.path(), "data", "png").unwrap_err();
        assert!(matches!(err, ExifError::Validation(_)));

        drop(first);
        assert!(allocate(dir.path(), "data", "png").is_ok());
    }

    #[test]
    fn output_prefers_processed_sibling() {
        let dir = tempfile::tempdir().unwrap();
        let paths = StagingPaths::derive(dir.path(), "data", "jpg").unwrap();
        assert_eq!(paths.output_path(), paths.staged.as_path());

        fs::write(&paths.processed, b"repaired").unwrap();
        assert_eq!(paths.output_path(), paths.processed.as_path());
    }

    #[test]
    fn remove_artifacts_deletes_every_sibling() {
        let dir = tempfile::tempdir().unwrap();
        let paths = StagingPaths::derive(dir.path(), "data", "webp").unwrap();
        for path in paths.artifacts() {
            fs::write(path, b"x").unwrap();
        }

        paths.remove_artifacts().unwrap();

        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn staged_bytes_round_trip_for_every_extension() {
        let dir = tempfile::tempdir().unwrap();
        let payload: Vec<u8> = (0..=255u8).cycle().take(4096).collect();

        for ext in crate::common::SUPPORTED_IMAGE_EXTENSIONS {
            let paths = StagingPaths::derive(dir.path(), "data", ext).unwrap();
            write_staged(&paths.staged, payload.clone()).await.unwrap();

            assert_eq!(read_output(&paths.staged).await.unwrap(), payload);
            paths.remove_artifacts().unwrap();
        }
    }

    #[tokio::test]
    async fn unwritable_staging_path_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("data.png");

        let err = write_staged(&path, vec![1, 2, 3]).await.unwrap_err();
        assert_eq!(err.kind(), "IoError");
    }

    #[tokio::test]
    async fn failed_staging_task_is_an_io_error() {
        let join_error = tokio::spawn(async { panic!("staging worker died") })
            .await
            .unwrap_err();

        let err = staging_task_failed(Path::new("/srv/storage/data.png"), join_error);

        assert_eq!(err.kind(), "IoError");
        assert!(err.to_string().contains("data.png"));
    }

    #[tokio::test]
    async fn empty_payload_fails_verification() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.png");

        let err = write_staged(&path, Vec::new()).await.unwrap_err();
        assert!(matches!(err, ExifError::Validation(_)));
    }
}
