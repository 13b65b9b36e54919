//! Atomic File Publishing
//!
//! In-place mode stages the encoded bytes in `<final>.tmp` and renames it over
//! the original only after the encoder and the flush both succeeded. Mirror
//! mode writes the destination directly, since nothing existed there to
//! protect. In both modes a failed write removes whatever was staged, so no
//! `.tmp` file or truncated output outlives the job.

use crate::codec::WriteSeek;
use crate::errors::{CodecError, FileError};
use crate::output_resolver::OutputLayout;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

pub const TEMP_SUFFIX: &str = ".tmp";

pub fn temp_path_for(final_path: &Path) -> PathBuf {
    let mut name = OsString::from(final_path.as_os_str());
    name.push(TEMP_SUFFIX);
    PathBuf::from(name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishMode {
    /// Stage next to the target, then rename over it.
    ReplaceViaTemp,
    /// Write the target directly, creating parent directories first.
    Direct,
}

/// Deletes the staged file on drop unless the publish went through.
struct StagedFile<'a> {
    path: &'a Path,
    armed: bool,
}

impl<'a> StagedFile<'a> {
    fn new(path: &'a Path) -> Self {
        Self { path, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for StagedFile<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match fs::remove_file(self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Removed staged output"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to remove staged output"
            ),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AtomicFileWriter {
    mode: PublishMode,
}

impl AtomicFileWriter {
    pub fn new(mode: PublishMode) -> Self {
        Self { mode }
    }

    pub fn for_layout(layout: &OutputLayout) -> Self {
        match layout {
            OutputLayout::InPlace => Self::new(PublishMode::ReplaceViaTemp),
            OutputLayout::Mirror { .. } => Self::new(PublishMode::Direct),
        }
    }

    pub fn mode(&self) -> PublishMode {
        self.mode
    }

    /// Runs `write` against a staged file and publishes it at `final_path`.
    ///
    /// Returns the size of the published file as reported by the filesystem.
    pub fn publish<F>(&self, final_path: &Path, write: F) -> Result<u64, FileError>
    where
        F: FnOnce(&mut dyn WriteSeek) -> Result<(), CodecError>,
    {
        let staging = match self.mode {
            PublishMode::ReplaceViaTemp => temp_path_for(final_path),
            PublishMode::Direct => {
                if let Some(parent) = final_path.parent() {
                    fs::create_dir_all(parent).map_err(FileError::Mkdir)?;
                }
                final_path.to_path_buf()
            }
        };

        let file = File::create(&staging).map_err(|e| match self.mode {
            PublishMode::ReplaceViaTemp => FileError::CreateTemp(e),
            PublishMode::Direct => FileError::CreateOutput(e),
        })?;
        let mut guard = StagedFile::new(&staging);

        let mut writer = BufWriter::new(file);
        write(&mut writer).map_err(FileError::Encode)?;
        let file = writer
            .into_inner()
            .map_err(|e| FileError::Write(e.into_error()))?;
        file.sync_all().map_err(FileError::Write)?;
        drop(file);

        if self.mode == PublishMode::ReplaceViaTemp {
            fs::rename(&staging, final_path).map_err(FileError::Rename)?;
        }
        guard.disarm();

        let size = fs::metadata(final_path)
            .map_err(FileError::StatOutput)?
            .len();
        Ok(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_bytes(bytes: &'static [u8]) -> impl FnOnce(&mut dyn WriteSeek) -> Result<(), CodecError> {
        move |sink: &mut dyn WriteSeek| {
            sink.write_all(bytes)
                .map_err(|e| CodecError::Unsupported(e.to_string()))
        }
    }

    fn failing_write(sink: &mut dyn WriteSeek) -> Result<(), CodecError> {
        let _ = sink.write_all(b"half an image");
        Err(CodecError::Unsupported("boom".to_string()))
    }

    #[test]
    fn test_temp_path_appends_suffix() {
        assert_eq!(
            temp_path_for(Path::new("/a/scan.tif")),
            PathBuf::from("/a/scan.tif.tmp")
        );
    }

    #[test]
    fn test_in_place_replaces_and_reports_size() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("scan.tif");
        fs::write(&target, b"original contents").unwrap();

        let writer = AtomicFileWriter::new(PublishMode::ReplaceViaTemp);
        let size = writer.publish(&target, write_bytes(b"new")).unwrap();

        assert_eq!(size, 3);
        assert_eq!(fs::read(&target).unwrap(), b"new");
        assert!(!temp_path_for(&target).exists());
    }

    #[test]
    fn test_in_place_encode_failure_keeps_original() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("scan.tif");
        fs::write(&target, b"original contents").unwrap();

        let writer = AtomicFileWriter::new(PublishMode::ReplaceViaTemp);
        let err = writer.publish(&target, failing_write).unwrap_err();

        assert!(matches!(err, FileError::Encode(_)), "got {:?}", err);
        assert_eq!(fs::read(&target).unwrap(), b"original contents");
        assert!(!temp_path_for(&target).exists());
    }

    #[test]
    fn test_in_place_rename_failure_removes_temp() {
        let temp = TempDir::new().unwrap();
        // A non-empty directory cannot be replaced by a file.
        let target = temp.path().join("scan.tif");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("inner"), b"x").unwrap();

        let writer = AtomicFileWriter::new(PublishMode::ReplaceViaTemp);
        let err = writer.publish(&target, write_bytes(b"new")).unwrap_err();

        assert!(matches!(err, FileError::Rename(_)), "got {:?}", err);
        assert!(!temp_path_for(&target).exists());
        assert!(target.join("inner").exists());
    }

    #[test]
    fn test_direct_creates_missing_parents() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("out/root/a/b/x.tif");

        let writer = AtomicFileWriter::new(PublishMode::Direct);
        let size = writer.publish(&target, write_bytes(b"12345")).unwrap();

        assert_eq!(size, 5);
        assert_eq!(fs::read(&target).unwrap(), b"12345");
        assert!(!temp_path_for(&target).exists());

        // Parent already present: still fine.
        let sibling = temp.path().join("out/root/a/b/y.tif");
        writer.publish(&sibling, write_bytes(b"1")).unwrap();
        assert!(sibling.exists());
    }

    #[test]
    fn test_direct_encode_failure_removes_partial_output() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("out/x.tif");

        let writer = AtomicFileWriter::new(PublishMode::Direct);
        let err = writer.publish(&target, failing_write).unwrap_err();

        assert!(matches!(err, FileError::Encode(_)));
        assert!(!target.exists());
    }

    #[test]
    fn test_direct_mkdir_failure() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("out");
        fs::write(&blocker, b"a file, not a directory").unwrap();

        let writer = AtomicFileWriter::new(PublishMode::Direct);
        let err = writer
            .publish(&blocker.join("x.tif"), write_bytes(b"1"))
            .unwrap_err();

        assert!(matches!(err, FileError::Mkdir(_)), "got {:?}", err);
    }

    #[test]
    fn test_for_layout() {
        assert_eq!(
            AtomicFileWriter::for_layout(&OutputLayout::InPlace).mode(),
            PublishMode::ReplaceViaTemp
        );
        let mirror = OutputLayout::Mirror {
            output_root: PathBuf::from("/out/root"),
        };
        assert_eq!(
            AtomicFileWriter::for_layout(&mirror).mode(),
            PublishMode::Direct
        );
    }
}
