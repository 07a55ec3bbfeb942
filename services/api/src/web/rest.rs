//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use axum::{
    extract::{Extension, Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::{IntoParams, OpenApi, ToSchema};
use uuid::Uuid;

use lingualive_core::domain::{PhotoWithContent, ProgressSummary, TranslationRecord};
use lingualive_core::ports::PortError;
use lingualive_core::progression;

use crate::web::state::AppState;
use crate::web::translate_task::{
    translate_image, ImageSubmission, TranslateError, TranslationSource,
};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        translate_image_handler,
        get_progress_handler,
        list_badges_handler,
        list_photos_handler,
        get_photo_handler,
    ),
    components(
        schemas(TranslateImageResponse, ProgressResponse, BadgeListResponse, EarnedBadgeView, PhotoPageResponse, ErrorBody)
    ),
    tags(
        (name = "LinguaLive API", description = "API endpoints for photo-based language learning.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Error Body (all failing endpoints answer with JSON)
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

pub type ErrorResponse = (StatusCode, Json<ErrorBody>);

pub fn error_response(status: StatusCode, message: impl Into<String>) -> ErrorResponse {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// The response payload for a completed image translation.
#[derive(Serialize, ToSchema)]
pub struct TranslateImageResponse {
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub record: TranslationRecord,
    /// "fresh" for a newly generated translation, "cache" for a replay.
    #[schema(value_type = String)]
    pub source: TranslationSource,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProgressResponse {
    pub user_id: Uuid,
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub progress: ProgressSummary,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EarnedBadgeView {
    pub key: String,
    pub name: String,
    pub description: String,
    pub earned_at: DateTime<Utc>,
}

#[derive(Serialize, ToSchema)]
pub struct BadgeListResponse {
    pub badges: Vec<EarnedBadgeView>,
}

#[derive(Serialize, ToSchema)]
pub struct PhotoPageResponse {
    #[schema(value_type = Vec<Object>)]
    pub photos: Vec<PhotoWithContent>,
    pub total: i64,
    pub limit: i64,
    pub skip: i64,
}

#[derive(Deserialize, IntoParams)]
pub struct PhotoPageQuery {
    /// Page size, 1 to 50. Defaults to 10.
    pub limit: Option<i64>,
    /// Number of photos to skip. Defaults to 0.
    pub skip: Option<i64>,
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Translate a photographed scene into learning content.
///
/// Accepts multipart/form-data with an `image` file part plus optional `lat`,
/// `lng` and `takenAt` parts. Requires an authenticated session.
#[utoipa::path(
    post,
    path = "/translate/image",
    request_body(content_type = "multipart/form-data", description = "The image to translate."),
    responses(
        (status = 200, description = "Translation completed", body = TranslateImageResponse),
        (status = 400, description = "Payload is not an image", body = ErrorBody),
        (status = 401, description = "Not authenticated", body = ErrorBody),
        (status = 413, description = "Image exceeds the size limit", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn translate_image_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ErrorResponse> {
    let mut image: Option<(String, String, bytes::Bytes)> = None;
    let mut location_lat = None;
    let mut location_lng = None;
    let mut taken_at = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        error_response(
            StatusCode::BAD_REQUEST,
            format!("Failed to read multipart data: {}", e),
        )
    })? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                let file_name = field.file_name().unwrap_or("photo").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field.bytes().await.map_err(|e| {
                    error_response(
                        StatusCode::BAD_REQUEST,
                        format!("Failed to read image bytes: {}", e),
                    )
                })?;
                image = Some((file_name, content_type, data));
            }
            "lat" => {
                location_lat = field.text().await.ok().and_then(|v| v.parse::<f64>().ok());
            }
            "lng" => {
                location_lng = field.text().await.ok().and_then(|v| v.parse::<f64>().ok());
            }
            "takenAt" => {
                taken_at = field.text().await.ok().and_then(|v| {
                    DateTime::parse_from_rfc3339(&v)
                        .ok()
                        .map(|dt| dt.with_timezone(&Utc))
                });
            }
            _ => {}
        }
    }

    let (file_name, content_type, bytes) = image.ok_or_else(|| {
        error_response(StatusCode::BAD_REQUEST, "Image is required")
    })?;

    let submission = ImageSubmission {
        file_name,
        content_type,
        bytes,
        location_lat,
        location_lng,
        taken_at,
    };

    let outcome = translate_image(app_state, user_id, submission)
        .await
        .map_err(|e| match e {
            TranslateError::InvalidImageType => {
                error_response(StatusCode::BAD_REQUEST, "Invalid image type")
            }
            TranslateError::ImageTooLarge => {
                error_response(StatusCode::PAYLOAD_TOO_LARGE, "Image too large")
            }
            TranslateError::Port(port) => {
                error!("Translation pipeline failed: {:?}", port);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "Translation failed")
            }
        })?;

    Ok(Json(TranslateImageResponse {
        record: outcome.record,
        source: outcome.source,
    }))
}

/// Fetch the caller's XP, level and streak.
#[utoipa::path(
    get,
    path = "/user/progress",
    responses(
        (status = 200, description = "Current progress", body = ProgressResponse),
        (status = 401, description = "Not authenticated", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn get_progress_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let progress = app_state.db.get_progress(user_id).await.map_err(|e| {
        error!("Failed to load progress: {:?}", e);
        error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load progress")
    })?;

    let summary = match progress {
        Some(p) => progression::summarize(&p, app_state.config.level_xp_threshold),
        None => progression::empty_summary(),
    };

    Ok(Json(ProgressResponse {
        user_id,
        progress: summary,
    }))
}

/// List the badges the caller has earned, newest first.
#[utoipa::path(
    get,
    path = "/user/badges",
    responses(
        (status = 200, description = "Earned badges", body = BadgeListResponse),
        (status = 401, description = "Not authenticated", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn list_badges_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let earned = app_state
        .db
        .list_badges_for_user(user_id)
        .await
        .map_err(|e| {
            error!("Failed to list badges: {:?}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load badges")
        })?;

    let badges = earned
        .into_iter()
        .map(|e| EarnedBadgeView {
            key: e.badge.key,
            name: e.badge.name,
            description: e.badge.description,
            earned_at: e.earned_at,
        })
        .collect();

    Ok(Json(BadgeListResponse { badges }))
}

/// List the caller's photos with their learning artifacts, newest first.
#[utoipa::path(
    get,
    path = "/photos",
    params(PhotoPageQuery),
    responses(
        (status = 200, description = "One page of photos", body = PhotoPageResponse),
        (status = 401, description = "Not authenticated", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn list_photos_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Query(query): Query<PhotoPageQuery>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let limit = query.limit.unwrap_or(10).clamp(1, 50);
    let skip = query.skip.unwrap_or(0).max(0);

    let (photos, total) = app_state
        .db
        .list_photos(user_id, limit, skip)
        .await
        .map_err(|e| {
            error!("Failed to list photos: {:?}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load photos")
        })?;

    Ok(Json(PhotoPageResponse {
        photos,
        total,
        limit,
        skip,
    }))
}

/// Fetch one photo with its learning artifacts.
#[utoipa::path(
    get,
    path = "/photos/{id}",
    params(
        ("id" = Uuid, Path, description = "The photo id.")
    ),
    responses(
        (status = 200, description = "The photo", body = Object),
        (status = 401, description = "Not authenticated", body = ErrorBody),
        (status = 404, description = "No such photo for this user", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn get_photo_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(photo_id): Path<Uuid>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let photo = app_state
        .db
        .get_photo_for_user(photo_id, user_id)
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => error_response(StatusCode::NOT_FOUND, "Photo not found"),
            other => {
                error!("Failed to load photo: {:?}", other);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load photo")
            }
        })?;

    Ok(Json(photo))
}
