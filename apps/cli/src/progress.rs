//! Progress bar rendering for fetch events

use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use nbfetch_core::types::FetchEvent;
use std::collections::HashMap;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

/// Renders one progress bar per file being fetched
pub struct FetchProgress {
    multi: MultiProgress,
    bars: HashMap<String, ProgressBar>,
}

impl FetchProgress {
    pub fn new(visible: bool) -> Self {
        let target = if visible {
            ProgressDrawTarget::stderr()
        } else {
            ProgressDrawTarget::hidden()
        };

        Self {
            multi: MultiProgress::with_draw_target(target),
            bars: HashMap::new(),
        }
    }

    /// Consume events until the channel closes
    pub fn spawn(mut rx: broadcast::Receiver<FetchEvent>, visible: bool) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut progress = Self::new(visible);
            loop {
                match rx.recv().await {
                    Ok(event) => progress.handle_event(&event),
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
            progress.clear();
        })
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} {msg:20!} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░  ")
    }

    /// Update the bars from an event
    pub fn handle_event(&mut self, event: &FetchEvent) {
        match event {
            FetchEvent::Started { file, total, .. } => {
                // a retry replaces the bar of the failed attempt
                if let Some(old) = self.bars.remove(file) {
                    old.finish_and_clear();
                }
                let pb = self.multi.add(ProgressBar::new(*total));
                pb.set_style(Self::bar_style());
                pb.set_message(file.clone());
                self.bars.insert(file.clone(), pb);
            }

            FetchEvent::Progress {
                file,
                downloaded,
                total,
            } => {
                if let Some(pb) = self.bars.get(file) {
                    pb.set_length(*total);
                    pb.set_position(*downloaded);
                }
            }

            FetchEvent::Finished { file, .. } => {
                if let Some(pb) = self.bars.get(file) {
                    pb.finish_with_message(format!("{} {}", style("✓").green().bold(), file));
                }
            }

            FetchEvent::Abandoned { file, .. } => {
                if let Some(pb) = self.bars.get(file) {
                    pb.abandon_with_message(format!("{} {}", style("✗").red().bold(), file));
                }
            }

            FetchEvent::Retrying {
                file,
                attempt,
                max_attempts,
                delay_ms,
                error,
            } => {
                let _ = self.multi.println(format!(
                    "{} {} attempt {}/{} failed: {}; retrying in {:.0}s",
                    style("↻").yellow(),
                    file,
                    attempt,
                    max_attempts,
                    error,
                    *delay_ms as f64 / 1000.0
                ));
            }
        }
    }

    /// Clear all progress bars that are still running
    pub fn clear(&mut self) {
        for (_, pb) in self.bars.drain() {
            if !pb.is_finished() {
                pb.finish_and_clear();
            }
        }
    }
}
