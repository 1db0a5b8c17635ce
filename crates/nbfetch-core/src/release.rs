//! Release asset downloads: one named file, or a batch fetched in order

use crate::error::{FetchError, Result};
use crate::fetch::Fetcher;
use nbfetch_types::FetchReport;
use std::path::Path;
use tokio::fs;
use tracing::info;
use url::Url;

impl Fetcher {
    /// Canonical download URL of `filename` in release `version`
    pub fn release_url(&self, version: &str, filename: &str) -> Result<Url> {
        check_file_name(filename)?;
        if version.is_empty() || version.contains('/') {
            return Err(FetchError::InvalidUrl(format!(
                "invalid release version: {:?}",
                version
            )));
        }

        let raw = format!(
            "{}/{}/{}",
            self.settings().release_base_url.trim_end_matches('/'),
            version,
            filename
        );
        Url::parse(&raw).map_err(|_| FetchError::InvalidUrl(raw))
    }

    /// Download one release asset into `target_dir`, creating it if needed
    pub async fn fetch_release_asset(
        &self,
        version: &str,
        filename: &str,
        target_dir: impl AsRef<Path>,
    ) -> Result<FetchReport> {
        let target_dir = target_dir.as_ref();
        let url = self.release_url(version, filename)?;

        fs::create_dir_all(target_dir).await?;
        self.fetch(url.as_str(), target_dir.join(filename)).await
    }

    /// Download release assets one after another.
    ///
    /// Stops at the first file that fails after its retries; files fetched
    /// before it stay on disk and later ones are never requested.
    pub async fn fetch_release_assets<S: AsRef<str>>(
        &self,
        version: &str,
        filenames: &[S],
        target_dir: impl AsRef<Path>,
    ) -> Result<Vec<FetchReport>> {
        let target_dir = target_dir.as_ref();
        fs::create_dir_all(target_dir).await?;

        let mut reports = Vec::with_capacity(filenames.len());
        for (index, filename) in filenames.iter().enumerate() {
            info!(
                "Release {}: file {} of {}: {}",
                version,
                index + 1,
                filenames.len(),
                filename.as_ref()
            );
            reports.push(
                self.fetch_release_asset(version, filename.as_ref(), target_dir)
                    .await?,
            );
        }

        Ok(reports)
    }
}

/// A file name must be a single, plain path component
pub(crate) fn check_file_name(filename: &str) -> Result<()> {
    let path = Path::new(filename);
    let plain = path.file_name().is_some_and(|name| name == path.as_os_str());
    if plain && !filename.contains(['/', '\\']) {
        Ok(())
    } else {
        Err(FetchError::InvalidFileName(filename.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nbfetch_types::Settings;

    #[test]
    fn release_url_joins_base_version_and_file() {
        let fetcher = Fetcher::new(Settings::default()).unwrap();
        let url = fetcher.release_url("v0.2", "cifar.zip").unwrap();
        assert_eq!(
            url.as_str(),
            "https://github.com/hse-aml/intro-to-dl/releases/download/v0.2/cifar.zip"
        );
    }

    #[test]
    fn release_url_tolerates_trailing_slash() {
        let fetcher = Fetcher::new(Settings {
            release_base_url: "http://mirror.local/assets/".into(),
            ..Settings::default()
        })
        .unwrap();
        let url = fetcher.release_url("v1", "a.zip").unwrap();
        assert_eq!(url.as_str(), "http://mirror.local/assets/v1/a.zip");
    }

    #[test]
    fn rejects_path_like_file_names() {
        for bad in ["", "..", "../a.zip", "dir/a.zip", "a\\b.zip", "/abs.zip"] {
            assert!(
                matches!(check_file_name(bad), Err(FetchError::InvalidFileName(_))),
                "{bad:?} should be rejected"
            );
        }
        assert!(check_file_name("a.zip").is_ok());
    }

    #[test]
    fn rejects_bad_versions() {
        let fetcher = Fetcher::new(Settings::default()).unwrap();
        assert!(fetcher.release_url("", "a.zip").is_err());
        assert!(fetcher.release_url("v1/../v2", "a.zip").is_err());
    }
}
