mod common;

use common::{payload, Reply, TestServer};
use nbfetch_core::types::{FetchEvent, RetryPolicy, Settings};
use nbfetch_core::{FetchError, Fetcher};
use std::time::Duration;
use tokio_test::assert_ok;

fn settings(max_attempts: u32) -> Settings {
    Settings {
        retry: RetryPolicy::new(max_attempts, Duration::from_millis(5), 2),
        read_chunk_size: 4096,
        write_buffer_size: 16 * 1024,
        ..Settings::default()
    }
}

fn drain(rx: &mut tokio::sync::broadcast::Receiver<FetchEvent>) -> Vec<FetchEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn successful_fetch_matches_declared_length() {
    let body = payload(100_000);
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/data.bin")
        .with_status(200)
        .with_body(body.clone())
        .expect(1)
        .create_async()
        .await;

    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("data.bin");
    let fetcher = Fetcher::new(settings(4)).unwrap();
    let mut events = fetcher.subscribe();

    let report = assert_ok!(
        fetcher
            .fetch(&format!("{}/data.bin", server.url()), &path)
            .await
    );

    mock.assert_async().await;
    assert_eq!(report.bytes, body.len() as u64);
    assert_eq!(report.attempts, 1);
    assert_eq!(std::fs::metadata(&path).unwrap().len(), body.len() as u64);
    assert_eq!(std::fs::read(&path).unwrap(), body);

    let events = drain(&mut events);
    assert!(matches!(
        events.first(),
        Some(FetchEvent::Started { total: 100_000, .. })
    ));
    assert!(events.contains(&FetchEvent::Progress {
        file: "data.bin".into(),
        downloaded: 100_000,
        total: 100_000,
    }));
    assert!(matches!(
        events.last(),
        Some(FetchEvent::Finished { bytes: 100_000, .. })
    ));
}

#[tokio::test]
async fn truncated_transfer_is_removed_and_retried() {
    let body = payload(64 * 1024);
    let served = body.clone();
    let server = TestServer::start(move |_, n| {
        if n < 3 {
            Reply::truncated(&served, 1000)
        } else {
            Reply::full(&served)
        }
    })
    .await;

    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("a.zip");
    let fetcher = Fetcher::new(settings(4)).unwrap();
    let mut events = fetcher.subscribe();

    let report = fetcher.fetch(&server.url("/a.zip"), &path).await.unwrap();

    assert_eq!(report.attempts, 3);
    assert_eq!(server.requests().len(), 3);
    assert_eq!(std::fs::read(&path).unwrap(), body);

    let events = drain(&mut events);
    let retries: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            FetchEvent::Retrying {
                attempt,
                max_attempts,
                delay_ms,
                error,
                ..
            } => Some((*attempt, *max_attempts, *delay_ms, error.clone())),
            _ => None,
        })
        .collect();
    let abandoned = events
        .iter()
        .filter(|e| matches!(e, FetchEvent::Abandoned { total: 65_536, .. }))
        .count();
    assert_eq!(
        retries
            .iter()
            .map(|(attempt, max, delay, _)| (*attempt, *max, *delay))
            .collect::<Vec<_>>(),
        vec![(1, 4, 5), (2, 4, 10)]
    );
    assert!(retries
        .iter()
        .all(|(.., error)| error.starts_with("Incomplete download")));
    assert_eq!(abandoned, 2);
}

#[tokio::test]
async fn exhausted_retries_leave_no_partial_file() {
    let body = payload(8192);
    let server = TestServer::start(move |_, _| Reply::truncated(&body, 10)).await;

    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("a.zip");
    let fetcher = Fetcher::new(settings(3)).unwrap();

    let err = fetcher
        .fetch(&server.url("/a.zip"), &path)
        .await
        .unwrap_err();

    assert!(
        matches!(err, FetchError::Incomplete { expected: 8192, .. }),
        "unexpected error: {err}"
    );
    assert_eq!(server.requests().len(), 3);
    assert!(!path.exists());
}

#[tokio::test]
async fn server_errors_are_retried_then_surfaced() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/gone.zip")
        .with_status(503)
        .expect(4)
        .create_async()
        .await;

    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("gone.zip");
    let fetcher = Fetcher::new(settings(4)).unwrap();

    let err = fetcher
        .fetch(&format!("{}/gone.zip", server.url()), &path)
        .await
        .unwrap_err();

    mock.assert_async().await;
    assert!(matches!(err, FetchError::ServerError { status: 503, .. }));
    assert!(!path.exists());
}

#[tokio::test]
async fn missing_content_length_is_fatal() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/stream")
        .with_status(200)
        .with_chunked_body(|w| std::io::Write::write_all(w, b"no length here"))
        .expect(1)
        .create_async()
        .await;

    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("stream");
    let fetcher = Fetcher::new(settings(4)).unwrap();

    let err = fetcher
        .fetch(&format!("{}/stream", server.url()), &path)
        .await
        .unwrap_err();

    mock.assert_async().await;
    assert!(matches!(err, FetchError::MissingContentLength { .. }));
    assert!(!path.exists());
}

#[tokio::test]
async fn interrupt_aborts_mid_transfer_without_retry() {
    let body = payload(32 * 1024);
    let server = TestServer::start(move |_, _| Reply {
        stall: true,
        ..Reply::truncated(&body, 512)
    })
    .await;

    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("slow.bin");
    let fetcher = Fetcher::new(settings(4)).unwrap();
    let token = fetcher.interrupt_token();
    let mut events = fetcher.subscribe();

    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if matches!(event, FetchEvent::Started { .. }) {
                tokio::time::sleep(Duration::from_millis(50)).await;
                token.cancel();
                return;
            }
        }
    });

    let err = fetcher
        .fetch(&server.url("/slow.bin"), &path)
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Interrupted));
    assert_eq!(server.requests().len(), 1);
    assert!(!path.exists());
}
