//! Integration tests for gear_sync

use std::sync::Arc;
use std::time::Duration;

use gear_sync::*;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::runtime::Handle;

fn move_record(name: &str, from: usize, to: usize) -> PersistRecord {
    PersistRecord::moved(name, Some(from), Some(to))
}

/// Serve exactly one request with a canned status, returning the raw request text.
async fn serve_once(status_line: &'static str) -> (String, tokio::task::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut received = Vec::new();
        let mut buf = [0u8; 4096];

        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            received.extend_from_slice(&buf[..n]);

            let text = String::from_utf8_lossy(&received).to_string();
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        let (key, value) = line.split_once(':')?;
                        if key.eq_ignore_ascii_case("content-length") {
                            value.trim().parse::<usize>().ok()
                        } else {
                            None
                        }
                    })
                    .unwrap_or(0);
                if received.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }

        let response = format!(
            "{}\r\nContent-Length: 4\r\nConnection: close\r\n\r\nnope",
            status_line
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();

        String::from_utf8_lossy(&received).to_string()
    });

    (format!("http://{}/character/update_item", addr), handle)
}

#[tokio::test]
async fn test_persist_is_fire_and_forget() {
    let backend = MemoryBackend::new();
    let mut client = SyncClient::new(Arc::new(backend.clone()), Handle::current());

    let seq = client.persist(vec![move_record("sword", 0, 3)]);
    assert_eq!(seq, Some(1));

    // Nothing has been awaited yet, so the write has not happened
    assert!(backend.batches().is_empty());

    client.flush().await;

    let batches = backend.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].sequence, 1);
    assert_eq!(batches[0].records[0].current_space_index, 3);
    assert_eq!(client.stats().written, 1);
    assert_eq!(client.pending(), 0);
}

#[tokio::test]
async fn test_empty_batch_is_not_sent() {
    let backend = MemoryBackend::new();
    let mut client = SyncClient::new(Arc::new(backend.clone()), Handle::current());

    assert_eq!(client.persist(Vec::new()), None);
    client.flush().await;

    assert!(backend.batches().is_empty());
    assert_eq!(client.stats().submitted, 0);
}

#[tokio::test]
async fn test_failures_are_reported_and_retryable() {
    let backend = MemoryBackend::new();
    backend.fail_next(1);
    let mut client = SyncClient::new(Arc::new(backend.clone()), Handle::current());

    client.persist(vec![move_record("a", 0, 1), move_record("b", 1, 0)]);
    client.flush().await;

    let failures = client.take_failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].batch.names(), vec!["a", "b"]);
    assert!(matches!(failures[0].error, PersistenceFailure::Unavailable(_)));
    assert_eq!(client.stats().failed, 1);
    assert!(client.take_failures().is_empty());

    let failed = failures.into_iter().next().unwrap();
    let seq = client.retry(failed);
    assert_eq!(seq, Some(2));
    client.flush().await;

    let batches = backend.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].sequence, 2);
    assert_eq!(batches[0].records.len(), 2);
}

#[tokio::test]
async fn test_later_gesture_not_held_up_by_earlier() {
    let backend = MemoryBackend::new();
    let mut client = SyncClient::new(Arc::new(backend.clone()), Handle::current());

    client.persist(vec![move_record("a", 0, 1)]);
    client.persist(vec![move_record("a", 1, 2)]);
    assert_eq!(client.stats().submitted, 2);

    client.flush().await;
    assert_eq!(backend.batches().len(), 2);
}

#[tokio::test]
async fn test_http_backend_success() {
    let (url, server) = serve_once("HTTP/1.1 200 OK").await;
    let settings = SyncSettings::new(url)
        .with_csrf_token("token-123")
        .with_timeout(Duration::from_secs(5));
    let backend = HttpBackend::new(&settings).unwrap();

    let batch = PersistBatch::new(
        1,
        vec![PersistRecord::equip_change("sword", true, Some(0), None)],
    );
    backend.write(&batch).await.unwrap();

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /character/update_item"));
    assert!(request.to_lowercase().contains("x-csrftoken: token-123"));
    assert!(request.contains("\"item_data\""));
    assert!(request.contains("\"currentSpaceIndex\":-1"));
}

#[tokio::test]
async fn test_http_backend_non_success_is_failure() {
    let (url, server) = serve_once("HTTP/1.1 404 Not Found").await;
    let backend = HttpBackend::new(&SyncSettings::new(url)).unwrap();

    let batch = PersistBatch::new(1, vec![move_record("sword", 0, 1)]);
    let result = backend.write(&batch).await;
    server.await.unwrap();

    match result {
        Err(PersistenceFailure::Status { status, message }) => {
            assert_eq!(status, 404);
            assert_eq!(message, "nope");
        }
        other => panic!("expected status failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_http_backend_unreachable() {
    // Bind then drop to get a port nobody listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let settings = SyncSettings::new(format!("http://{}/update", addr))
        .with_timeout(Duration::from_secs(2));
    let backend = HttpBackend::new(&settings).unwrap();

    let batch = PersistBatch::new(1, vec![move_record("sword", 0, 1)]);
    assert!(matches!(
        backend.write(&batch).await,
        Err(PersistenceFailure::Http(_))
    ));
}
