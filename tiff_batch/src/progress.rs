//! Progress Bar Module
//!
//! One bar for the whole batch, advanced once per finished file by the
//! coordinator thread. Drawn on stderr; hidden when stderr is not a terminal.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

pub mod progress_style {
    pub const BATCH_TEMPLATE: &str = "{spinner:.green} {prefix:.cyan.bold} ▕{bar:35.green/black}▏ {percent:>3}% • {pos}/{len} • ⏱️ {elapsed_precise} (ETA: {eta}) • {msg}";
    pub const PROGRESS_CHARS: &str = "█▓░";
    pub const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";
}

fn batch_style() -> ProgressStyle {
    match ProgressStyle::default_bar().template(progress_style::BATCH_TEMPLATE) {
        Ok(style) => style
            .progress_chars(progress_style::PROGRESS_CHARS)
            .tick_chars(progress_style::SPINNER_CHARS),
        Err(e) => {
            tracing::warn!(error = %e, "Invalid progress template, using default");
            ProgressStyle::default_bar()
        }
    }
}

pub fn create_progress_bar(total: u64, prefix: &str) -> ProgressBar {
    let visible = console::Term::stderr().is_term();
    create_progress_bar_for(total, prefix, visible)
}

pub fn create_progress_bar_for(total: u64, prefix: &str, visible: bool) -> ProgressBar {
    let pb = ProgressBar::new(total);
    if !visible {
        pb.set_draw_target(ProgressDrawTarget::hidden());
        return pb;
    }
    pb.set_style(batch_style());
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
