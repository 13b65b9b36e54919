//! Batch Pipeline
//!
//! A fixed-size rayon pool drains the pre-built job list. Each worker runs
//! stat → read → decode → resolve → encode and publish → stats update for one
//! file and sends a [`FileOutcome`] to the coordinator. The coordinator is the
//! calling thread: it alone reports outcomes (audit log, progress bar), so
//! workers never share an output stream.
//!
//! [`run_batch`] returns only after every worker has finished, so the
//! [`RunSummary`] it hands back is final.

use crate::atomic_writer::AtomicFileWriter;
use crate::codec::{Compression, TiffCodec};
use crate::errors::{ConfigError, FileError};
use crate::output_resolver::OutputResolver;
use crate::report;
use crate::stats::{RunStats, RunSummary};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};

/// One discovered TIFF, by absolute path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    source: PathBuf,
}

impl Job {
    pub fn new(source: PathBuf) -> Self {
        Self { source }
    }

    pub fn from_paths(paths: Vec<PathBuf>) -> Vec<Job> {
        paths.into_iter().map(Job::new).collect()
    }

    pub fn source(&self) -> &Path {
        &self.source
    }
}

/// Shared stop flag. Checked by workers before each job; a job already
/// running always completes.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub enum FileOutcome {
    Compressed {
        source: PathBuf,
        output: PathBuf,
        original_bytes: u64,
        compressed_bytes: u64,
    },
    Failed {
        source: PathBuf,
        error: FileError,
    },
    /// Never started because the run was cancelled.
    Cancelled { source: PathBuf },
}

impl FileOutcome {
    pub fn source(&self) -> &Path {
        match self {
            FileOutcome::Compressed { source, .. }
            | FileOutcome::Failed { source, .. }
            | FileOutcome::Cancelled { source } => source,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FileOutcome::Compressed { .. })
    }

    /// The audit log line for this outcome. Cancelled jobs are not logged.
    pub fn audit_line(&self) -> Option<String> {
        match self {
            FileOutcome::Compressed {
                output,
                original_bytes,
                compressed_bytes,
                ..
            } => Some(report::format_success_line(
                output,
                *original_bytes,
                *compressed_bytes,
            )),
            FileOutcome::Failed { source, error } => {
                Some(report::format_error_line(source, error))
            }
            FileOutcome::Cancelled { .. } => None,
        }
    }
}

/// Receives every outcome, on the coordinator thread, in completion order.
pub trait BatchObserver {
    fn on_outcome(&mut self, outcome: FileOutcome);
}

impl<F: FnMut(FileOutcome)> BatchObserver for F {
    fn on_outcome(&mut self, outcome: FileOutcome) {
        self(outcome)
    }
}

pub struct Pipeline<C> {
    codec: C,
    resolver: OutputResolver,
    writer: AtomicFileWriter,
    compression: Compression,
}

impl<C: TiffCodec> Pipeline<C> {
    pub fn new(codec: C, resolver: OutputResolver, compression: Compression) -> Self {
        let writer = AtomicFileWriter::for_layout(resolver.layout());
        Self {
            codec,
            resolver,
            writer,
            compression,
        }
    }

    /// Recompresses one file and returns `(output path, original size,
    /// published size)`. Stats are not touched here.
    pub fn process_file(&self, source: &Path) -> Result<(PathBuf, u64, u64), FileError> {
        let original_bytes = fs::metadata(source).map_err(FileError::Stat)?.len();
        let data = fs::read(source).map_err(FileError::Open)?;
        let pixels = self.codec.decode(&data).map_err(FileError::Decode)?;
        drop(data);

        let output = self.resolver.resolve(source)?;
        let codec = &self.codec;
        let compression = self.compression;
        let compressed_bytes = self
            .writer
            .publish(&output, move |sink| codec.encode(pixels, compression, sink))?;

        Ok((output, original_bytes, compressed_bytes))
    }

    /// Runs one job end to end and records it in `stats`.
    pub fn run_job(&self, job: &Job, cancel: &CancelToken, stats: &RunStats) -> FileOutcome {
        let source = job.source().to_path_buf();
        if cancel.is_cancelled() {
            stats.record_cancelled();
            return FileOutcome::Cancelled { source };
        }

        match self.process_file(&source) {
            Ok((output, original_bytes, compressed_bytes)) => {
                stats.record_success(original_bytes, compressed_bytes);
                tracing::debug!(
                    source = %source.display(),
                    output = %output.display(),
                    original_bytes,
                    compressed_bytes,
                    "File recompressed"
                );
                FileOutcome::Compressed {
                    source,
                    output,
                    original_bytes,
                    compressed_bytes,
                }
            }
            Err(error) => {
                stats.record_failure();
                tracing::debug!(source = %source.display(), error = %error, "File failed");
                FileOutcome::Failed { source, error }
            }
        }
    }
}

/// Processes `jobs` on `threads` workers and reports each outcome to
/// `observer`. Per-file failures are outcomes, not errors; the only error is
/// failing to build the pool. Totals cover this call only.
pub fn run_batch<C, O>(
    jobs: &[Job],
    pipeline: &Pipeline<C>,
    threads: usize,
    cancel: &CancelToken,
    observer: &mut O,
) -> Result<RunSummary, ConfigError>
where
    C: TiffCodec,
    O: BatchObserver,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .thread_name(|i| format!("tiff-worker-{}", i))
        .build()?;

    tracing::debug!(jobs = jobs.len(), threads = pool.current_num_threads(), "Starting batch");

    let stats = RunStats::new();
    let (tx, rx) = mpsc::channel::<FileOutcome>();
    std::thread::scope(|scope| {
        let stats = &stats;
        scope.spawn(move || {
            pool.install(|| {
                jobs.par_iter().for_each_with(tx, |tx, job| {
                    let outcome = pipeline.run_job(job, cancel, stats);
                    // The receiver outlives every sender.
                    let _ = tx.send(outcome);
                });
            });
        });

        // Ends once the last worker dropped its sender.
        for outcome in rx {
            observer.on_outcome(outcome);
        }
    });

    Ok(stats.summary())
}
