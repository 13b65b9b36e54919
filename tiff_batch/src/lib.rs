//! tiff_batch: parallel lossless TIFF recompression
//!
//! Walks a directory tree, decodes every `.tif`/`.tiff` file and rewrites it
//! with deflate compression, either in place (temp file + rename) or into a
//! mirrored output tree. Per-file failures are isolated and reported; the run
//! always finishes with a size summary.

pub mod atomic_writer;
pub mod codec;
pub mod config;
pub mod discovery;
pub mod errors;
pub mod logging;
pub mod output_resolver;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod safety;
pub mod stats;
pub mod thread_manager;

#[cfg(test)]
mod test_support;

pub use atomic_writer::{AtomicFileWriter, PublishMode};
pub use codec::{Compression, DeflateLevel, DeflateTiffCodec, PixelBuffer, TiffCodec};
pub use config::RunConfig;
pub use discovery::collect_tiff_files;
pub use errors::{CodecError, ConfigError, FileError};
pub use logging::{init_logging, LogConfig};
pub use output_resolver::{OutputLayout, OutputResolver};
pub use pipeline::{run_batch, BatchObserver, CancelToken, FileOutcome, Job, Pipeline};
pub use progress::create_progress_bar;
pub use stats::{RunStats, RunSummary};
