//! Error types for the recompression pipeline.
//!
//! `ConfigError` aborts the run before any file is touched. `FileError` is
//! scoped to a single job: it is reported by the coordinator and never leaves
//! the worker iteration that produced it.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("TIFF codec error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("unsupported pixel layout: {0}")]
    Unsupported(String),

    #[error("image contains no pages")]
    NoPages,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid input directory {}", .path.display())]
    InvalidInputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Input path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Invalid output directory {}", .path.display())]
    InvalidOutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(
        "--outdir must not be inside the input directory ({} is under {})",
        .output.display(),
        .input.display()
    )]
    OutputInsideInput { output: PathBuf, input: PathBuf },

    #[error("--outdir would mirror the input directory onto itself: {}", .0.display())]
    OutputRootIsInput(PathBuf),

    #[error("{0}")]
    DangerousDirectory(String),

    #[error("Failed to create log file {}", .path.display())]
    LogFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to initialize logging: {0}")]
    Logging(String),

    #[error("Failed to scan directory: {0}")]
    Traversal(#[from] walkdir::Error),

    #[error("Failed to create thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// One variant per pipeline stage, so the log names where a file failed.
#[derive(Error, Debug)]
pub enum FileError {
    #[error("stat failed: {0}")]
    Stat(#[source] io::Error),

    #[error("open failed: {0}")]
    Open(#[source] io::Error),

    #[error("decode failed: {0}")]
    Decode(#[source] CodecError),

    #[error("relative path error: {} is outside the input root", .0.display())]
    RelativePath(PathBuf),

    #[error("mkdir failed: {0}")]
    Mkdir(#[source] io::Error),

    #[error("create temp file failed: {0}")]
    CreateTemp(#[source] io::Error),

    #[error("create output file failed: {0}")]
    CreateOutput(#[source] io::Error),

    #[error("encode failed: {0}")]
    Encode(#[source] CodecError),

    #[error("write failed: {0}")]
    Write(#[source] io::Error),

    #[error("rename failed: {0}")]
    Rename(#[source] io::Error),

    #[error("stat new file failed: {0}")]
    StatOutput(#[source] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_error_names_stage_and_cause() {
        let err = FileError::Rename(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        assert_eq!(err.to_string(), "rename failed: denied");

        let err = FileError::Decode(CodecError::Unsupported("Palette(8)".to_string()));
        assert_eq!(
            err.to_string(),
            "decode failed: unsupported pixel layout: Palette(8)"
        );
    }

    #[test]
    fn test_config_error_nested_output_message() {
        let err = ConfigError::OutputInsideInput {
            output: PathBuf::from("/data/scans/out"),
            input: PathBuf::from("/data/scans"),
        };
        let msg = err.to_string();
        assert!(msg.contains("--outdir must not be inside the input directory"));
        assert!(msg.contains("/data/scans/out"));
    }

    #[test]
    fn test_config_error_cause_is_reported_once() {
        let cause = || io::Error::new(io::ErrorKind::NotFound, "no such entry");
        let errors = [
            ConfigError::InvalidInputDir {
                path: PathBuf::from("/data/scans"),
                source: cause(),
            },
            ConfigError::InvalidOutputDir {
                path: PathBuf::from("/data/out"),
                source: cause(),
            },
            ConfigError::LogFile {
                path: PathBuf::from("/var/log/tiff.log"),
                source: cause(),
            },
        ];

        for err in errors {
            assert!(!err.to_string().contains("no such entry"), "{}", err);
            let source = std::error::Error::source(&err).map(ToString::to_string);
            assert_eq!(source.as_deref(), Some("no such entry"));
        }
    }
}
