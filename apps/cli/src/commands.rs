//! CLI command implementations

use crate::output::{format_bytes, print_fetch_report, print_json, print_link_report};
use crate::{ConfigAction, OutputFormat};
use anyhow::{bail, Context, Result};
use console::style;
use nbfetch_core::types::{FetchReport, Settings};
use nbfetch_core::{Fetcher, ResourceBundle};
use std::path::Path;

// ============================================================================
// Fetch Commands
// ============================================================================

pub async fn fetch(fetcher: &Fetcher, url: &str, path: &Path, format: OutputFormat) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("cannot create {}", parent.display()))?;
    }

    let report = fetcher
        .fetch(url, path)
        .await
        .with_context(|| format!("failed to fetch {}", url))?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Human => print_fetch_report(&report),
    }

    Ok(())
}

pub async fn release(
    fetcher: &Fetcher,
    version: &str,
    files: &[String],
    dir: &Path,
    format: OutputFormat,
) -> Result<()> {
    let reports = fetcher
        .fetch_release_assets(version, files, dir)
        .await
        .with_context(|| format!("failed to fetch release {} assets", version))?;

    print_reports(&reports, format)
}

pub async fn bundle(
    fetcher: &Fetcher,
    bundle: ResourceBundle,
    dir: &Path,
    format: OutputFormat,
) -> Result<()> {
    let reports = fetcher
        .fetch_bundle(bundle, dir)
        .await
        .with_context(|| format!("failed to fetch bundle {}", bundle))?;

    print_reports(&reports, format)
}

fn print_reports(reports: &[FetchReport], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(reports)?,
        OutputFormat::Human => {
            for report in reports {
                print_fetch_report(report);
            }
            let total: u64 = reports.iter().map(|r| r.bytes).sum();
            println!();
            println!(
                "{} file(s), {} total",
                style(reports.len()).bold(),
                format_bytes(total)
            );
        }
    }
    Ok(())
}

// ============================================================================
// Link Command
// ============================================================================

pub async fn link(src: &Path, dst: &Path, format: OutputFormat) -> Result<()> {
    let report = nbfetch_core::link_all_files(src, dst)
        .await
        .with_context(|| format!("failed to link {} into {}", src.display(), dst.display()))?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Human => print_link_report(&report),
    }

    Ok(())
}

// ============================================================================
// Config Commands
// ============================================================================

pub async fn config_action(path: &Path, action: ConfigAction, format: OutputFormat) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let settings = nbfetch_core::load_settings(path).await?;
            match format {
                OutputFormat::Json => print_json(&settings)?,
                OutputFormat::Human => print_settings(path, &settings),
            }
        }

        ConfigAction::Path => match format {
            OutputFormat::Json => print_json(&path)?,
            OutputFormat::Human => println!("{}", path.display()),
        },

        ConfigAction::Init { force } => {
            if path.exists() && !force {
                bail!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                );
            }
            nbfetch_core::save_settings(path, &Settings::default()).await?;
            println!(
                "{} Wrote default settings to {}",
                style("✓").green().bold(),
                path.display()
            );
        }
    }

    Ok(())
}

fn print_settings(path: &Path, settings: &Settings) {
    println!("{}", style("Settings").bold().underlined());
    println!("  File:              {}", path.display());
    println!(
        "  Attempts:          {}",
        settings.retry.attempts()
    );
    println!(
        "  Initial delay:     {:.1}s (x{} per retry)",
        settings.retry.initial_delay().as_secs_f64(),
        settings.retry.backoff
    );
    println!("  Read chunk:        {}", format_bytes(settings.read_chunk_size as u64));
    println!("  Write buffer:      {}", format_bytes(settings.write_buffer_size as u64));
    println!("  Release base URL:  {}", settings.release_base_url);
    println!("  User agent:        {}", settings.user_agent);
    println!("  Connect timeout:   {}s", settings.connect_timeout_secs);
}
