//! Shared types for nbfetch
//!
//! This crate contains the data structures shared between the core
//! library and the CLI: retry policy, settings, progress events and reports.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// Retry Types
// ============================================================================

/// Exponential backoff policy for a single fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the first retry, in milliseconds
    pub initial_delay_ms: u64,
    /// Multiplier applied to the delay after every retry
    pub backoff: u32,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration, backoff: u32) -> Self {
        Self {
            max_attempts,
            initial_delay_ms: u64::try_from(initial_delay.as_millis()).unwrap_or(u64::MAX),
            backoff,
        }
    }

    /// A policy that never retries
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO, 1)
    }

    /// Attempt budget, never less than one
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    /// Delay before retry number `retry_index` (0 = first retry).
    ///
    /// `initial_delay * backoff^retry_index`, saturating on overflow.
    pub fn delay_for(&self, retry_index: u32) -> Duration {
        let multiplier = self.backoff.saturating_pow(retry_index);
        self.initial_delay().saturating_mul(multiplier)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(4, Duration::from_secs(3), 2)
    }
}

// ============================================================================
// Settings
// ============================================================================

pub const DEFAULT_RELEASE_BASE: &str = "https://github.com/hse-aml/intro-to-dl/releases/download";

/// Application settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub retry: RetryPolicy,
    /// Size of each read from the response body
    pub read_chunk_size: usize,
    /// Capacity of the buffered file writer
    pub write_buffer_size: usize,
    /// Base URL that release assets are resolved against
    pub release_base_url: String,
    pub user_agent: String,
    pub connect_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            read_chunk_size: 1024 * 1024,
            write_buffer_size: 16 * 1024 * 1024,
            release_base_url: DEFAULT_RELEASE_BASE.to_string(),
            user_agent: format!("nbfetch/{}", env!("CARGO_PKG_VERSION")),
            connect_timeout_secs: 30,
        }
    }
}

// ============================================================================
// Events
// ============================================================================

/// Progress events emitted by the fetcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FetchEvent {
    Started {
        file: String,
        url: String,
        total: u64,
    },
    Progress {
        file: String,
        downloaded: u64,
        total: u64,
    },
    Finished {
        file: String,
        bytes: u64,
    },
    /// The transfer stopped before completion; the partial file is gone
    Abandoned {
        file: String,
        downloaded: u64,
        total: u64,
    },
    Retrying {
        file: String,
        attempt: u32,
        max_attempts: u32,
        delay_ms: u64,
        error: String,
    },
}

// ============================================================================
// Reports
// ============================================================================

/// Outcome of a successful fetch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchReport {
    pub url: String,
    pub path: PathBuf,
    pub bytes: u64,
    pub attempts: u32,
}

/// How entries were mirrored into the destination directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkMode {
    Symlink,
    Copy,
}

impl LinkMode {
    /// The mode available on the current platform
    pub fn native() -> Self {
        if cfg!(windows) {
            LinkMode::Copy
        } else {
            LinkMode::Symlink
        }
    }
}

/// Outcome of linking a resource directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkReport {
    /// Source directory actually used (after any substitution)
    pub source: PathBuf,
    pub destination: PathBuf,
    pub mode: LinkMode,
    /// Destination paths, in file-name order
    pub entries: Vec<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_waits_3_6_12() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.attempts(), 4);
        assert_eq!(policy.delay_for(0), Duration::from_secs(3));
        assert_eq!(policy.delay_for(1), Duration::from_secs(6));
        assert_eq!(policy.delay_for(2), Duration::from_secs(12));
    }

    #[test]
    fn delay_saturates() {
        let policy = RetryPolicy::new(100, Duration::from_secs(u64::MAX / 2), 2);
        assert!(policy.delay_for(64) > Duration::ZERO);
    }

    #[test]
    fn zero_attempts_means_one() {
        let policy = RetryPolicy::new(0, Duration::ZERO, 2);
        assert_eq!(policy.attempts(), 1);
    }

    #[test]
    fn settings_fill_missing_fields() {
        let settings: Settings =
            serde_json::from_str(r#"{"retry": {"max_attempts": 2}}"#).unwrap();
        assert_eq!(settings.retry.max_attempts, 2);
        assert_eq!(settings.retry.initial_delay_ms, 3000);
        assert_eq!(settings.read_chunk_size, 1024 * 1024);
        assert_eq!(settings.release_base_url, DEFAULT_RELEASE_BASE);
    }
}
