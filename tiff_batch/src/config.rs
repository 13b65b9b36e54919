//! Run configuration and startup validation.
//!
//! Everything here runs before the first file is touched. Any error is a
//! [`ConfigError`] and aborts the run.

use crate::codec::Compression;
use crate::errors::ConfigError;
use crate::output_resolver::OutputResolver;
use crate::safety;
use crate::stats::RunSummary;
use std::fs;
use std::path::{Path, PathBuf};

pub const EXIT_OK: i32 = 0;
pub const EXIT_USAGE: i32 = 1;
pub const EXIT_FILE_FAILURES: i32 = 2;
pub const EXIT_CANCELLED: i32 = 130;

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub input_dir: PathBuf,
    /// `None` selects in-place mode.
    pub out_dir: Option<PathBuf>,
    pub log_file: PathBuf,
    pub threads: usize,
    pub compression: Compression,
    /// Exit non-zero when any file failed.
    pub strict: bool,
}

pub fn validate_input_dir(path: &Path) -> Result<(), ConfigError> {
    let meta = fs::metadata(path).map_err(|source| ConfigError::InvalidInputDir {
        path: path.to_path_buf(),
        source,
    })?;
    if !meta.is_dir() {
        return Err(ConfigError::NotADirectory(path.to_path_buf()));
    }
    Ok(())
}

impl RunConfig {
    /// Validates the input and output directories and returns the resolver
    /// for this run.
    pub fn prepare(&self) -> Result<OutputResolver, ConfigError> {
        validate_input_dir(&self.input_dir)?;
        let resolver = OutputResolver::new(&self.input_dir, self.out_dir.as_deref())?;
        safety::check_input_root(resolver.root(), resolver.is_in_place())?;
        Ok(resolver)
    }

    pub fn exit_code(&self, summary: &RunSummary) -> i32 {
        if summary.was_cancelled() {
            EXIT_CANCELLED
        } else if self.strict && summary.failed > 0 {
            EXIT_FILE_FAILURES
        } else {
            EXIT_OK
        }
    }
}
