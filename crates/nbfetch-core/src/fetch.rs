//! Retrying, size-verified single file fetcher
//!
//! Key principles:
//! - One sequential transfer at a time, always from byte zero
//! - Body streamed through a fixed-size read buffer into a buffered writer
//! - Progress reported as broadcast events, never blocking the transfer
//! - A file shorter than the declared content length never survives

use crate::error::{FetchError, Result};
use crate::retry::retry_with_backoff;
use futures::TryStreamExt;
use nbfetch_types::{FetchEvent, FetchReport, Settings};
use reqwest::Client;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::sync::broadcast;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

/// Minimum interval between two progress events for the same file
const PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

/// Downloads single files with retry and truncation checks
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    settings: Settings,
    event_tx: broadcast::Sender<FetchEvent>,
    interrupt: CancellationToken,
}

impl Fetcher {
    /// Create a new fetcher from settings
    pub fn new(settings: Settings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(settings.user_agent.as_str())
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .build()?;

        let (event_tx, _) = broadcast::channel(1024);

        Ok(Self {
            client,
            settings,
            event_tx,
            interrupt: CancellationToken::new(),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Subscribe to progress events
    pub fn subscribe(&self) -> broadcast::Receiver<FetchEvent> {
        self.event_tx.subscribe()
    }

    /// Token that aborts the running fetch when cancelled.
    ///
    /// Once cancelled, every later fetch on this fetcher fails with
    /// [`FetchError::Interrupted`].
    pub fn interrupt_token(&self) -> CancellationToken {
        self.interrupt.clone()
    }

    fn emit(&self, event: FetchEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Download `url` to `path`, retrying per the configured policy.
    ///
    /// On success the file holds exactly the declared content length. On
    /// failure no partial file is left behind.
    pub async fn fetch(&self, url: &str, path: impl AsRef<Path>) -> Result<FetchReport> {
        let url = Url::parse(url).map_err(|_| FetchError::InvalidUrl(url.to_string()))?;
        let path = path.as_ref();
        let file = display_name(path);
        let policy = self.settings.retry;

        info!("Fetching {} -> {}", url, path.display());

        let (bytes, attempts) = retry_with_backoff(
            &policy,
            &self.interrupt,
            |attempt| {
                let (url, file) = (&url, file.as_str());
                async move {
                    self.fetch_once(url, path, file)
                        .await
                        .map(|bytes| (bytes, attempt))
                }
            },
            |attempt, delay, err| {
                self.emit(FetchEvent::Retrying {
                    file: file.clone(),
                    attempt,
                    max_attempts: policy.attempts(),
                    delay_ms: saturating_millis(delay),
                    error: err.to_string(),
                })
            },
        )
        .await?;

        info!("Fetched {} ({} bytes, {} attempt(s))", file, bytes, attempts);

        Ok(FetchReport {
            url: url.to_string(),
            path: path.to_path_buf(),
            bytes,
            attempts,
        })
    }

    /// A single attempt: request, stream to disk, then verify the size
    async fn fetch_once(&self, url: &Url, path: &Path, file: &str) -> Result<u64> {
        let response = tokio::select! {
            _ = self.interrupt.cancelled() => return Err(FetchError::Interrupted),
            response = self.client.get(url.clone()).send() => response?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::ServerError {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let total = response
            .content_length()
            .ok_or_else(|| FetchError::MissingContentLength {
                url: url.to_string(),
            })?;

        debug!("{}: server declared {} bytes", file, total);
        self.emit(FetchEvent::Started {
            file: file.to_string(),
            url: url.to_string(),
            total,
        });

        let transfer = self.write_body(response, path, file, total).await;
        self.finish_attempt(transfer, path, file, total).await
    }

    /// Cleanup after an attempt, whether or not the transfer succeeded.
    ///
    /// A file shorter than `total` is removed and reported as
    /// [`FetchError::Incomplete`], carrying the transport error if there was
    /// one. An interrupt always wins over truncation.
    async fn finish_attempt(
        &self,
        transfer: Result<u64>,
        path: &Path,
        file: &str,
        total: u64,
    ) -> Result<u64> {
        let on_disk = fs::metadata(path).await.ok().map(|m| m.len());
        let truncated = matches!(on_disk, Some(len) if len < total);
        let actual = on_disk.unwrap_or(0);

        let removal = if truncated {
            warn!("{}: removing partial file ({} of {} bytes)", file, actual, total);
            fs::remove_file(path).await
        } else {
            Ok(())
        };

        match &transfer {
            Ok(written) if !truncated => self.emit(FetchEvent::Finished {
                file: file.to_string(),
                bytes: *written,
            }),
            _ => self.emit(FetchEvent::Abandoned {
                file: file.to_string(),
                downloaded: actual,
                total,
            }),
        }

        if let Err(source) = removal {
            if let Err(cause) = &transfer {
                warn!("{}: transfer failed before cleanup: {}", file, cause);
            }
            return Err(FetchError::Cleanup {
                path: path.to_path_buf(),
                source,
            });
        }

        if truncated && !matches!(transfer, Err(FetchError::Interrupted)) {
            return Err(FetchError::Incomplete {
                path: path.to_path_buf(),
                expected: total,
                actual,
                source: transfer.err().map(Box::new),
            });
        }

        transfer
    }

    /// Stream the response body into `path`
    async fn write_body(
        &self,
        response: reqwest::Response,
        path: &Path,
        file: &str,
        total: u64,
    ) -> Result<u64> {
        let mut writer =
            BufWriter::with_capacity(self.settings.write_buffer_size, File::create(path).await?);
        let reader = StreamReader::new(response.bytes_stream().map_err(std::io::Error::other));
        tokio::pin!(reader);
        let mut buf = vec![0u8; self.settings.read_chunk_size.max(1)];

        let mut downloaded = 0u64;
        let mut last_progress = Instant::now();

        loop {
            let n = tokio::select! {
                _ = self.interrupt.cancelled() => return Err(FetchError::Interrupted),
                read = reader.read(&mut buf) => read.map_err(body_error)?,
            };
            if n == 0 {
                break;
            }

            writer.write_all(&buf[..n]).await?;
            downloaded += n as u64;

            if last_progress.elapsed() >= PROGRESS_INTERVAL || downloaded >= total {
                self.emit(FetchEvent::Progress {
                    file: file.to_string(),
                    downloaded,
                    total,
                });
                last_progress = Instant::now();
            }
        }

        writer.flush().await?;
        writer.into_inner().sync_all().await?;

        Ok(downloaded)
    }
}

/// Recover the transport error that the stream reader wrapped in `io::Error`
fn body_error(err: std::io::Error) -> FetchError {
    if !err.get_ref().is_some_and(|inner| inner.is::<reqwest::Error>()) {
        return FetchError::Io(err);
    }
    match err.into_inner().map(|inner| inner.downcast::<reqwest::Error>()) {
        Some(Ok(transport)) => FetchError::Network(*transport),
        _ => FetchError::Io(std::io::Error::other("response body failed")),
    }
}

fn saturating_millis(delay: Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}

/// File name used in events and logs
fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
