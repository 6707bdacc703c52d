//! HTTP fetcher tests against a local mock server.

use std::time::Duration;

use vscore_media::{HttpFetcher, MediaError, MediaFetcher};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher() -> HttpFetcher {
    HttpFetcher::new(Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn downloads_body_to_new_file() {
    let server = MockServer::start().await;
    let body = vec![7u8; 64 * 1024];
    Mock::given(method("GET"))
        .and(path("/blob/v1-clip.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("clip.mp4");
    let url = format!("{}/blob/v1-clip.mp4", server.uri());

    let written = fetcher().fetch(&url, &dest).await.unwrap();
    assert_eq!(written, body.len() as u64);
    assert_eq!(tokio::fs::read(&dest).await.unwrap(), body);
}

#[tokio::test]
async fn non_success_status_is_reported_and_writes_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("clip.mp4");

    let err = fetcher()
        .fetch(&format!("{}/missing", server.uri()), &dest)
        .await
        .unwrap_err();

    match err {
        MediaError::HttpStatus { status, ref reason } => {
            assert_eq!(status, 404);
            assert_eq!(reason, "Not Found");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!err.is_retryable());
    assert!(!dest.exists());
}

#[tokio::test]
async fn refuses_to_overwrite_existing_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"new".to_vec()))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("clip.mp4");
    tokio::fs::write(&dest, b"old").await.unwrap();

    let err = fetcher().fetch(&server.uri(), &dest).await.unwrap_err();
    assert!(matches!(err, MediaError::Io(_)));
    assert_eq!(tokio::fs::read(&dest).await.unwrap(), b"old");
}
