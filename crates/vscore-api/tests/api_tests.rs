//! Router tests against in-memory collaborators.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use vscore_api::middleware::IpRateLimiter;
use vscore_api::{create_router, ApiConfig, AppState};
use vscore_db::{DbError, DbResult, MemoryStore, VideoStore};
use vscore_media::{FrameExtractor, MediaFetcher, MediaResult};
use vscore_ml_client::{Embedder, MlResult, VisionModel, VisionRequest};
use vscore_models::{AnalysisRecord, VideoId, VideoRecord, VideoWithAnalysis};
use vscore_storage::{MockUploadSigner, StorageError, StorageResult, UploadTarget, UploadUrlSigner};
use vscore_worker::{AnalysisPipeline, PipelineConfig};

const DIMENSIONS: usize = 3;

struct StubFetcher;

#[async_trait]
impl MediaFetcher for StubFetcher {
    async fn fetch(&self, _url: &str, dest: &Path) -> MediaResult<u64> {
        tokio::fs::write(dest, b"video").await?;
        Ok(5)
    }
}

struct StubExtractor;

#[async_trait]
impl FrameExtractor for StubExtractor {
    async fn extract(&self, _video: &Path, out_dir: &Path, count: usize) -> MediaResult<Vec<PathBuf>> {
        tokio::fs::create_dir_all(out_dir).await?;
        let mut frames = Vec::new();
        for n in 1..=count {
            let path = out_dir.join(format!("screenshot-{n}.jpg"));
            tokio::fs::write(&path, [n as u8]).await?;
            frames.push(path);
        }
        Ok(frames)
    }
}

struct StubVision;

#[async_trait]
impl VisionModel for StubVision {
    async fn complete(&self, request: &VisionRequest) -> MlResult<String> {
        assert_eq!(request.images.len(), 5);
        Ok(json!({
            "overallScore": 82,
            "summary": "Good",
            "details": {
                "hook": {"score": 90, "feedback": "Fast"},
                "pacing": {"score": 70, "feedback": "Even"},
                "visuals": {"score": 85, "feedback": "Sharp"},
                "cta": {"score": 60, "feedback": "Late"}
            }
        })
        .to_string())
    }
}

/// Keyword embedding: one axis per topic.
struct KeywordEmbedder;

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, input: &str) -> MlResult<Vec<f32>> {
        let text = input.to_lowercase();
        let axis = |word: &str| if text.contains(word) { 1.0 } else { 0.0 };
        Ok(vec![axis("hook"), axis("pacing"), axis("cta") + 0.01])
    }

    fn dimensions(&self) -> usize {
        DIMENSIONS
    }
}

struct UnavailableSigner;

#[async_trait]
impl UploadUrlSigner for UnavailableSigner {
    async fn issue(&self, _blob_name: &str, _content_type: &str) -> StorageResult<UploadTarget> {
        Err(StorageError::presign_failed("bucket unreachable"))
    }
}

/// Hands back PROCESSING records without their blob URL and refuses to
/// mark anything failed.
struct UrlDroppingStore(Arc<MemoryStore>);

#[async_trait]
impl VideoStore for UrlDroppingStore {
    async fn create_video(&self, video: &VideoRecord) -> DbResult<()> {
        self.0.create_video(video).await
    }

    async fn get_video(&self, id: &VideoId) -> DbResult<Option<VideoRecord>> {
        self.0.get_video(id).await
    }

    async fn get_video_with_analysis(&self, id: &VideoId) -> DbResult<Option<VideoWithAnalysis>> {
        self.0.get_video_with_analysis(id).await
    }

    async fn mark_processing(&self, id: &VideoId) -> DbResult<VideoRecord> {
        let mut record = self.0.mark_processing(id).await?;
        record.url = None;
        Ok(record)
    }

    async fn complete_with_analysis(&self, analysis: &AnalysisRecord) -> DbResult<()> {
        self.0.complete_with_analysis(analysis).await
    }

    async fn heartbeat(&self, id: &VideoId) -> DbResult<bool> {
        self.0.heartbeat(id).await
    }

    async fn mark_failed(&self, _id: &VideoId) -> DbResult<bool> {
        Err(DbError::InvalidData("write rejected".into()))
    }

    async fn fail_stale_processing(&self, cutoff: DateTime<Utc>) -> DbResult<Vec<VideoId>> {
        self.0.fail_stale_processing(cutoff).await
    }

    async fn ping(&self) -> DbResult<()> {
        self.0.ping().await
    }
}

fn plain_store(store: Arc<MemoryStore>) -> Arc<dyn VideoStore> {
    store
}

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
    _scratch: TempDir,
}

fn test_app(with_embedder: bool, rate_limiter: IpRateLimiter) -> TestApp {
    test_app_with(
        with_embedder,
        rate_limiter,
        Arc::new(MockUploadSigner::new("http://mock.local")),
        plain_store,
    )
}

fn test_app_with(
    with_embedder: bool,
    rate_limiter: IpRateLimiter,
    uploads: Arc<dyn UploadUrlSigner>,
    videos: fn(Arc<MemoryStore>) -> Arc<dyn VideoStore>,
) -> TestApp {
    let scratch = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::with_dimensions(DIMENSIONS));
    let videos = videos(store.clone());

    let pipeline = AnalysisPipeline::new(
        PipelineConfig {
            scratch_dir: scratch.path().to_path_buf(),
            retry_base_delay: Duration::from_millis(1),
            ..PipelineConfig::default()
        },
        Arc::new(StubFetcher),
        Arc::new(StubExtractor),
        Some(Arc::new(StubVision)),
        videos.clone(),
    );

    let embedder: Option<Arc<dyn Embedder>> = if with_embedder {
        Some(Arc::new(KeywordEmbedder))
    } else {
        None
    };

    let state = AppState {
        config: ApiConfig::default(),
        videos,
        knowledge: store.clone(),
        uploads,
        embedder,
        pipeline,
    };

    TestApp {
        router: create_router(state, rate_limiter, None),
        store,
        _scratch: scratch,
    }
}

fn app() -> TestApp {
    test_app(true, IpRateLimiter::new(1000, 1000))
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::String(
            String::from_utf8_lossy(&bytes).into_owned(),
        ))
    };
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_empty(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn init_upload(router: &Router) -> String {
    let (status, body) = send(
        router,
        post_json(
            "/videos/init-upload",
            json!({"filename": "clip.mp4", "mimeType": "video/mp4", "size": 2048}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_str().unwrap().to_string()
}

async fn wait_for_status(router: &Router, id: &str, wanted: &str) -> Value {
    for _ in 0..200 {
        let (_, body) = send(router, get(&format!("/videos/{id}"))).await;
        if body["status"] == wanted {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("video {id} never reached {wanted}");
}

#[tokio::test]
async fn init_upload_creates_pending_video_with_mock_urls() {
    let app = app();
    let (status, body) = send(
        &app.router,
        post_json(
            "/videos/init-upload",
            json!({"filename": "clip.mp4", "mimeType": "video/mp4", "size": 2048}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    let id = body["id"].as_str().unwrap();
    assert_eq!(
        body["uploadUrl"],
        format!("http://mock.local/mock-upload/{id}-clip.mp4")
    );
    assert_eq!(
        body["blobUrl"],
        format!("http://mock.local/mock-blob/{id}-clip.mp4")
    );

    let (status, video) = send(&app.router, get(&format!("/videos/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(video["status"], "PENDING");
    assert_eq!(video["originalName"], "clip.mp4");
    assert_eq!(video["url"], body["blobUrl"]);
    assert!(video["analysis"].is_null());
}

#[tokio::test]
async fn init_upload_rejects_invalid_body() {
    let app = app();

    for body in [
        json!({"filename": "", "mimeType": "video/mp4", "size": 1}),
        json!({"filename": "   ", "mimeType": "video/mp4", "size": 1}),
        json!({"filename": "a.mp4", "mimeType": "", "size": 1}),
        json!({"filename": "a.mp4", "mimeType": "video/mp4", "size": -5}),
    ] {
        let (status, response) =
            send(&app.router, post_json("/videos/init-upload", body.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body} -> {response}");
        assert!(response["detail"].is_string());
    }
}

#[tokio::test]
async fn init_upload_accepts_filenames_with_double_dots() {
    let app = app();
    let (status, body) = send(
        &app.router,
        post_json(
            "/videos/init-upload",
            json!({"filename": "trailer..final.mp4", "mimeType": "video/mp4", "size": 10}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED, "{body}");
    let id = body["id"].as_str().unwrap();
    assert_eq!(
        body["blobUrl"],
        format!("http://mock.local/mock-blob/{id}-trailer..final.mp4")
    );

    let (status, video) = send(&app.router, get(&format!("/videos/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(video["originalName"], "trailer..final.mp4");
}

#[tokio::test]
async fn failed_upload_signing_leaves_no_video() {
    let app = test_app_with(
        true,
        IpRateLimiter::new(1000, 1000),
        Arc::new(UnavailableSigner),
        plain_store,
    );
    let (status, body) = send(
        &app.router,
        post_json(
            "/videos/init-upload",
            json!({"filename": "clip.mp4", "mimeType": "video/mp4", "size": 10}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["detail"].is_string());
    assert_eq!(app.store.video_count().await, 0);
}

#[tokio::test]
async fn confirm_runs_pipeline_to_completion() {
    let app = app();
    let id = init_upload(&app.router).await;

    let (status, body) = send(&app.router, post_empty(&format!("/videos/{id}/confirm"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "PROCESSING"}));

    let video = wait_for_status(&app.router, &id, "COMPLETED").await;
    assert_eq!(video["analysis"]["overallScore"], 82);
    assert_eq!(video["analysis"]["details"]["cta"]["score"], 60);
    assert_eq!(video["analysis"]["videoId"], id.as_str());
}

#[tokio::test]
async fn second_confirm_is_a_conflict() {
    let app = app();
    let id = init_upload(&app.router).await;

    let (first, _) = send(&app.router, post_empty(&format!("/videos/{id}/confirm"))).await;
    assert_eq!(first, StatusCode::OK);

    let (second, body) = send(&app.router, post_empty(&format!("/videos/{id}/confirm"))).await;
    assert_eq!(second, StatusCode::CONFLICT);
    assert!(body["detail"].as_str().unwrap().contains("expected PENDING"));
}

#[tokio::test]
async fn confirm_without_blob_url_is_a_conflict_even_if_failing_it_errors() {
    let app = test_app_with(
        true,
        IpRateLimiter::new(1000, 1000),
        Arc::new(MockUploadSigner::new("http://mock.local")),
        |store| Arc::new(UrlDroppingStore(store)),
    );
    let id = init_upload(&app.router).await;

    let (status, body) = send(&app.router, post_empty(&format!("/videos/{id}/confirm"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["detail"].as_str().unwrap().contains("no blob URL"));
    assert_eq!(app.store.analysis_count().await, 0);
}

#[tokio::test]
async fn unknown_video_is_not_found() {
    let app = app();

    let (status, body) = send(&app.router, get("/videos/does-not-exist")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["detail"].as_str().unwrap().contains("does-not-exist"));

    let (status, _) = send(&app.router, post_empty("/videos/does-not-exist/confirm")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rag_index_then_search_ranks_by_similarity() {
    let app = app();

    for (id, title, content) in [
        ("d1", "Hooks", "Open with a strong hook in the first second"),
        ("d2", "Pacing", "Keep pacing tight through the middle"),
        ("d3", "CTA", "Place the CTA before viewers drop off"),
    ] {
        let (status, body) = send(
            &app.router,
            post_json(
                "/rag/index",
                json!({"id": id, "title": title, "content": content, "metadata": {"source": "guide"}}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": true}));
    }

    let (status, body) = send(
        &app.router,
        post_json("/rag/search", json!({"query": "how do I improve my hook?", "limit": 2})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["query"], "how do I improve my hook?");

    let results = body["data"]["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["id"], "d1");
    assert_eq!(results[0]["metadata"]["source"], "guide");
    assert!(results[0]["score"].as_f64().unwrap() > results[1]["score"].as_f64().unwrap());
}

#[tokio::test]
async fn rag_search_uses_default_limit() {
    let app = app();
    for n in 0..7 {
        let (status, _) = send(
            &app.router,
            post_json(
                "/rag/index",
                json!({"id": format!("d{n}"), "title": "t", "content": format!("hook tip {n}")}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, body) = send(&app.router, post_json("/rag/search", json!({"query": "hook"}))).await;
    assert_eq!(body["data"]["results"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn rag_index_upsert_replaces_document() {
    let app = app();
    for content in ["first hook draft", "pacing rewrite"] {
        let (status, _) = send(
            &app.router,
            post_json("/rag/index", json!({"id": "d1", "title": "Doc", "content": content})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, body) = send(&app.router, post_json("/rag/search", json!({"query": "pacing"}))).await;
    let results = body["data"]["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["content"], "pacing rewrite");
}

#[tokio::test]
async fn rag_validation_errors_are_bad_requests() {
    let app = app();

    for request in [
        post_json("/rag/search", json!({"query": ""})),
        post_json("/rag/search", json!({"query": "hook", "limit": 0})),
        post_json("/rag/search", json!({"query": "hook", "limit": 51})),
        post_json("/rag/index", json!({"id": "", "title": "t", "content": "c"})),
        post_json("/rag/index", json!({"id": "d1", "title": "t", "content": "  "})),
    ] {
        let (status, body) = send(&app.router, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    }
}

#[tokio::test]
async fn rag_without_embedder_is_internal_error() {
    let app = test_app(false, IpRateLimiter::new(1000, 1000));
    let (status, body) = send(&app.router, post_json("/rag/search", json!({"query": "hook"}))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn health_and_ready() {
    let app = app();

    let (status, body) = send(&app.router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send(&app.router, get("/ready")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
    assert_eq!(body["checks"]["database"]["status"], "ok");
    assert_eq!(body["checks"]["vision"]["status"], "ok");
}

#[tokio::test]
async fn responses_carry_security_headers_and_request_id() {
    let app = app();
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "req-123")
        .body(Body::empty())
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    let headers = response.headers();
    assert_eq!(headers["x-request-id"], "req-123");
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
}

#[tokio::test]
async fn api_routes_are_rate_limited_per_client() {
    let app = test_app(true, IpRateLimiter::new(1, 1));
    let from = |ip: &str| {
        Request::builder()
            .uri("/videos/missing")
            .header("x-forwarded-for", ip)
            .body(Body::empty())
            .unwrap()
    };

    let (first, _) = send(&app.router, from("203.0.113.1")).await;
    assert_eq!(first, StatusCode::NOT_FOUND);

    let (second, body) = send(&app.router, from("203.0.113.1")).await;
    assert_eq!(second, StatusCode::TOO_MANY_REQUESTS);
    assert!(body["detail"].as_str().unwrap().contains("Rate limit"));

    let (other, _) = send(&app.router, from("203.0.113.2")).await;
    assert_eq!(other, StatusCode::NOT_FOUND);

    // Probes are outside the limiter
    let (health, _) = send(&app.router, get("/health")).await;
    assert_eq!(health, StatusCode::OK);
}
