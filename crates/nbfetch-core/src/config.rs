//! Settings file loading and saving

use crate::error::{FetchError, Result};
use nbfetch_types::Settings;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Default settings location: `<config dir>/nbfetch/settings.json`
pub fn default_settings_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("nbfetch"))
        .unwrap_or_else(|| PathBuf::from(".nbfetch"))
        .join("settings.json")
}

/// Load settings from `path`; a missing file yields the defaults
pub async fn load_settings(path: &Path) -> Result<Settings> {
    if !fs::try_exists(path).await? {
        debug!("No settings at {}, using defaults", path.display());
        return Ok(Settings::default());
    }

    let content = fs::read_to_string(path).await?;
    let settings: Settings = serde_json::from_str(&content)
        .map_err(|e| FetchError::Config(format!("{}: {}", path.display(), e)))?;

    if settings.read_chunk_size == 0 || settings.write_buffer_size == 0 {
        return Err(FetchError::Config(format!(
            "{}: buffer sizes must be positive",
            path.display()
        )));
    }

    Ok(settings)
}

/// Write settings to `path` as pretty JSON, creating parent directories
pub async fn save_settings(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let content =
        serde_json::to_string_pretty(settings).map_err(|e| FetchError::Config(e.to_string()))?;
    fs::write(path, content).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_gives_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = load_settings(&tmp.path().join("none.json")).await.unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[tokio::test]
    async fn save_then_load() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested/settings.json");
        let mut settings = Settings::default();
        settings.retry.max_attempts = 7;

        save_settings(&path, &settings).await.unwrap();

        assert_eq!(load_settings(&path).await.unwrap(), settings);
    }

    #[tokio::test]
    async fn rejects_malformed_and_zero_sizes() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("settings.json");

        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_settings(&path).await, Err(FetchError::Config(_))));

        std::fs::write(&path, r#"{"read_chunk_size": 0}"#).unwrap();
        assert!(matches!(load_settings(&path).await, Err(FetchError::Config(_))));
    }
}
