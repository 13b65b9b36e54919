use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use console::style;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;
use tiff_batch::config::{EXIT_OK, EXIT_USAGE};
use tiff_batch::logging::{self, DEFAULT_LOG_FILE};
use tiff_batch::report::render_summary;
use tiff_batch::{
    collect_tiff_files, create_progress_bar, init_logging, run_batch, thread_manager,
    CancelToken, Compression, DeflateLevel, DeflateTiffCodec, FileOutcome, Job, LogConfig,
    OutputLayout, Pipeline, RunConfig,
};
use tracing::Level;

#[derive(Parser, Debug)]
#[command(name = "tiffcompressor")]
#[command(
    version,
    about = "Recompress every TIFF under a directory with lossless deflate",
    long_about = None
)]
struct Cli {
    /// Directory to scan recursively for .tif/.tiff files
    #[arg(value_name = "DIRECTORY")]
    input: PathBuf,

    /// Number of concurrent workers (default: number of CPUs)
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    threads: Option<u32>,

    /// Append-mode log file, one line per file plus the summary
    #[arg(long, value_name = "FILE", default_value = DEFAULT_LOG_FILE)]
    logfile: PathBuf,

    /// Mirror the tree under DIR instead of overwriting in place
    #[arg(long, value_name = "DIR")]
    outdir: Option<PathBuf>,

    /// Deflate effort
    #[arg(long, value_enum, default_value_t = LevelArg::Balanced)]
    level: LevelArg,

    /// Exit with status 2 if any file failed
    #[arg(long)]
    strict: bool,

    /// Show debug diagnostics on stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LevelArg {
    Fast,
    Balanced,
    Best,
}

impl From<LevelArg> for DeflateLevel {
    fn from(level: LevelArg) -> Self {
        match level {
            LevelArg::Fast => DeflateLevel::Fast,
            LevelArg::Balanced => DeflateLevel::Balanced,
            LevelArg::Best => DeflateLevel::Best,
        }
    }
}

impl Cli {
    fn run_config(&self) -> RunConfig {
        RunConfig {
            input_dir: self.input.clone(),
            out_dir: self.outdir.clone(),
            log_file: self.logfile.clone(),
            threads: thread_manager::resolve_threads(self.threads.map(|n| n as usize)),
            compression: Compression::Deflate(self.level.into()),
            strict: self.strict,
        }
    }
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version render through the same path
            let code = if e.use_stderr() { EXIT_USAGE } else { EXIT_OK };
            let _ = e.print();
            process::exit(code);
        }
    };

    match run(&cli) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("{} {:#}", style("❌").red().bold(), e);
            process::exit(EXIT_USAGE);
        }
    }
}

fn run(cli: &Cli) -> Result<i32> {
    let config = cli.run_config();
    let console_level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    execute(&config, console_level, &mut io::stdout())
}

/// Runs a whole batch for `config`, writing user-facing lines to `out`.
/// Returns the process exit code.
fn execute<W: Write>(config: &RunConfig, console_level: Level, out: &mut W) -> Result<i32> {
    let resolver = config.prepare()?;

    writeln!(out, "{} {}", style("📂 Input:").cyan().bold(), resolver.root().display())?;
    match resolver.layout() {
        OutputLayout::InPlace => writeln!(out, "{} in place", style("📁 Output:").cyan().bold())?,
        OutputLayout::Mirror { output_root } => writeln!(
            out,
            "{} {}",
            style("📁 Output:").cyan().bold(),
            output_root.display()
        )?,
    }

    let _log_guard = init_logging(
        LogConfig::new()
            .with_log_file(&config.log_file)
            .with_console_level(console_level),
    )?;

    let files = collect_tiff_files(resolver.root())?;
    if files.is_empty() {
        writeln!(out, "No TIFF files found.")?;
        return Ok(EXIT_OK);
    }
    let jobs = Job::from_paths(files);

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        handler_token.cancel();
        eprintln!("\n⏹️  Interrupted, finishing files already in progress...");
    })
    .context("Failed to install Ctrl-C handler")?;

    tracing::info!(
        files = jobs.len(),
        threads = config.threads,
        compression = ?config.compression,
        "Starting recompression"
    );

    let pb = create_progress_bar(jobs.len() as u64, "Compressing TIFFs");
    let pipeline = Pipeline::new(DeflateTiffCodec, resolver, config.compression);
    let summary = run_batch(
        &jobs,
        &pipeline,
        config.threads,
        &cancel,
        &mut |outcome: FileOutcome| {
            if let Some(line) = outcome.audit_line() {
                logging::audit(&line);
            }
            if let FileOutcome::Failed { source, error } = &outcome {
                tracing::debug!(path = %source.display(), error = %error, "Recompression failed");
            }
            if let Some(name) = outcome.source().file_name() {
                pb.set_message(name.to_string_lossy().into_owned());
            }
            pb.inc(1);
        },
    )?;
    pb.finish_and_clear();

    let text = render_summary(&summary);
    writeln!(out, "{}", text)?;
    logging::audit(&text);

    Ok(config.exit_code(&summary))
}
