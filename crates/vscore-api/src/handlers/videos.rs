//! Video upload and status handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use validator::Validate;

use vscore_models::{VideoId, VideoRecord, VideoStatus, VideoWithAnalysis};
use vscore_worker::VideoJob;

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InitUploadRequest {
    #[validate(length(min = 1, max = 1024, message = "filename must not be empty"))]
    pub filename: String,
    #[validate(length(min = 1, max = 255, message = "mimeType must not be empty"))]
    pub mime_type: String,
    #[validate(range(min = 0, message = "size must not be negative"))]
    pub size: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitUploadResponse {
    pub id: VideoId,
    pub upload_url: String,
    pub blob_url: String,
}

/// Create a PENDING video and hand out a direct upload URL.
pub async fn init_upload(
    State(state): State<AppState>,
    Json(request): Json<InitUploadRequest>,
) -> ApiResult<(StatusCode, Json<InitUploadResponse>)> {
    request.validate()?;
    if request.filename.trim().is_empty() {
        return Err(ApiError::bad_request("filename must not be blank"));
    }

    // The row is only written once a target exists, so a signer failure
    // leaves nothing behind.
    let mut video = VideoRecord::new_pending(request.filename, request.mime_type, request.size);
    let target = state
        .uploads
        .issue(&video.blob_name(), &video.mime_type)
        .await?;
    video.url = Some(target.blob_url.clone());
    state.videos.create_video(&video).await?;

    info!(video_id = %video.id, filename = %video.original_name, size = video.size, "Upload initiated");
    metrics::record_upload_initiated();

    Ok((
        StatusCode::CREATED,
        Json(InitUploadResponse {
            id: video.id,
            upload_url: target.upload_url,
            blob_url: target.blob_url,
        }),
    ))
}

#[derive(Debug, Serialize)]
pub struct ConfirmResponse {
    pub status: VideoStatus,
}

/// Move a video to PROCESSING and start its analysis in the background.
///
/// Only the first confirm for a video starts a run; repeats get 409.
pub async fn confirm_upload(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> ApiResult<Json<ConfirmResponse>> {
    let id = VideoId::from(video_id);
    let record = state.videos.mark_processing(&id).await?;

    let Some(job) = VideoJob::from_record(&record) else {
        // mark_processing requires a URL, so this only happens on a store bug
        warn!(video_id = %id, "Video entered PROCESSING without a blob URL");
        if let Err(e) = state.videos.mark_failed(&id).await {
            error!(video_id = %id, error = %e, "Could not mark video failed");
        }
        return Err(ApiError::conflict(format!("Video {id} has no blob URL")));
    };

    let pipeline = state.pipeline.clone();
    tokio::spawn(async move {
        pipeline.run(job).await;
    });

    info!(video_id = %id, "Upload confirmed, analysis started");
    metrics::record_run_started();

    Ok(Json(ConfirmResponse {
        status: VideoStatus::Processing,
    }))
}

/// Video record with its analysis once available.
pub async fn get_video(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> ApiResult<Json<VideoWithAnalysis>> {
    let id = VideoId::from(video_id);
    state
        .videos
        .get_video_with_analysis(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Video {id} not found")))
}
