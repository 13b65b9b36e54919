//! Report Module
//!
//! Text of the per-file audit lines and of the final summary block. Tools
//! parse the log, so these formats only change deliberately.

use crate::stats::RunSummary;
use std::path::Path;

const KB: f64 = 1024.0;
const MB: f64 = 1024.0 * 1024.0;

/// `✔ <basename> | <before> KB → <after> KB`
pub fn format_success_line(output_path: &Path, original_bytes: u64, compressed_bytes: u64) -> String {
    let name = output_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| output_path.display().to_string());
    format!(
        "✔ {} | {:.2} KB → {:.2} KB",
        name,
        original_bytes as f64 / KB,
        compressed_bytes as f64 / KB
    )
}

/// `❌ ERROR <full path>: <cause>`
pub fn format_error_line(source: &Path, cause: &dyn std::fmt::Display) -> String {
    format!("❌ ERROR {}: {}", source.display(), cause)
}

pub fn render_summary(summary: &RunSummary) -> String {
    let original_mb = summary.original_bytes as f64 / MB;
    let compressed_mb = summary.compressed_bytes as f64 / MB;
    let saved_mb = original_mb - compressed_mb;

    let headline = if summary.was_cancelled() {
        "⏹️  Run interrupted, remaining files were not started."
    } else {
        "✅ All files processed."
    };

    let mut text = format!(
        "\n{}\n💾 Total original size: {:.2} MB\n📦 Total compressed size: {:.2} MB\n📉 Space saved: {:.2} MB ({:.1}%)",
        headline,
        original_mb,
        compressed_mb,
        saved_mb,
        summary.saved_percent()
    );
    text.push_str(&format!(
        "\n📁 Files: {} succeeded, {} failed",
        summary.succeeded, summary.failed
    ));
    if summary.was_cancelled() {
        text.push_str(&format!(", {} cancelled", summary.cancelled));
    }
    text
}
