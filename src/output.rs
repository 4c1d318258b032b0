//! CLI output formatting.
//!
//! Each display has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure — no I/O, no side effects.
//!
//! Per-image progress lines arrive through the event channel while workers
//! run; the summary and check output print once at the end:
//!
//! ```text
//! Processing 4 images
//!   paris/eiffel.jpg  4.77 MB -> 1.95 MB (q85)
//!   small.jpg  0.98 MB (already under budget)
//!   slow.heic  9.20 MB timed out (original kept)
//!   broken.jpg  FAILED: unreadable image
//!
//! Reduced 10.05 MB (67.21%, 2.51 MB per image) in total image size.
//! Processing time: 0.15 minutes
//! ```

use crate::process::{LibraryInventory, ProcessEvent, RunSummary};
use crate::report::ResultRow;

/// Bytes → "4.77 MB" (binary megabytes, two decimals).
fn format_mb(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
}

/// Format one progress event as printable lines.
pub fn format_process_event(event: &ProcessEvent) -> Vec<String> {
    match event {
        ProcessEvent::Started { total } => vec![format!("Processing {total} images")],
        ProcessEvent::Row(row) => vec![format_row_line(row)],
    }
}

fn format_row_line(row: &ResultRow) -> String {
    if let Some(ref error) = row.error {
        return format!("  {}  FAILED: {}", row.relative_path, error);
    }
    let original = row.original_bytes.map(format_mb).unwrap_or_default();
    match row.outcome {
        "already-compliant" => {
            format!("  {}  {} (already under budget)", row.relative_path, original)
        }
        "timed-out" => format!("  {}  {} timed out (original kept)", row.relative_path, original),
        _ => {
            let fin = row.final_bytes.map(format_mb).unwrap_or_default();
            let quality = row
                .final_quality
                .map(|q| format!(" (q{q})"))
                .unwrap_or_default();
            format!("  {}  {} -> {}{}", row.relative_path, original, fin, quality)
        }
    }
}

/// Format the end-of-run summary, including the size-reduction accounting.
pub fn format_run_summary(summary: &RunSummary) -> Vec<String> {
    let mut lines = vec![format!(
        "Processed {} images ({} compressed, {} already compliant, {} timed out, {} failed)",
        summary.total,
        summary.compressed,
        summary.already_compliant,
        summary.timed_out,
        summary.failed,
    )];

    let routed = summary.compressed + summary.already_compliant + summary.timed_out;
    if routed > 0 && summary.original_bytes > 0 {
        let saved = summary.saved_bytes();
        let percent = saved as f64 / summary.original_bytes as f64 * 100.0;
        let per_image = saved / routed as u64;
        lines.push(format!(
            "Reduced {} ({:.2}%, {} per image) in total image size.",
            format_mb(saved),
            percent,
            format_mb(per_image),
        ));
    }
    lines.push(format!(
        "Processing time: {:.2} minutes",
        summary.elapsed.as_secs_f64() / 60.0
    ));
    lines
}

/// Format the `check` command's library census.
pub fn format_check_output(inventory: &LibraryInventory) -> Vec<String> {
    vec![
        format!(
            "{} images, {}",
            inventory.images,
            format_mb(inventory.total_bytes)
        ),
        format!("    with GPS: {}", inventory.with_gps),
        format!("    missing GPS: {}", inventory.without_gps),
        format!("    unreadable: {}", inventory.unreadable),
    ]
}

pub fn print_run_summary(summary: &RunSummary) {
    for line in format_run_summary(summary) {
        println!("{line}");
    }
}

pub fn print_check_output(inventory: &LibraryInventory) {
    for line in format_check_output(inventory) {
        println!("{line}");
    }
}
