//! Output formatting utilities

use console::style;
use nbfetch_core::types::{FetchReport, LinkReport};
use serde::Serialize;

/// Print a value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Format bytes as human-readable
pub fn format_bytes(bytes: u64) -> String {
    human_bytes::human_bytes(bytes as f64)
}

pub fn print_fetch_report(report: &FetchReport) {
    let retries = match report.attempts {
        0 | 1 => String::new(),
        n => format!(" after {} attempts", n),
    };
    println!(
        "{} {} ({}){}",
        style("✓").green().bold(),
        style(report.path.display()).cyan(),
        format_bytes(report.bytes),
        style(retries).dim()
    );
}

pub fn print_link_report(report: &LinkReport) {
    for entry in &report.entries {
        println!("  {}", entry.display());
    }
    println!(
        "{} {} entr{} from {} into {} ({:?})",
        style("✓").green().bold(),
        style(report.entries.len()).bold(),
        if report.entries.len() == 1 { "y" } else { "ies" },
        report.source.display(),
        report.destination.display(),
        report.mode
    );
}
