use std::sync::Arc;

use axum::{
    http::HeaderMap,
    response::IntoResponse,
    routing::post,
    Extension, Json, Router,
};
use validator::Validate;

use crate::{
    db::ReferralExt,
    dtos::referraldtos::{TrackVisitDto, TrackVisitResponseDto},
    error::HttpError,
    AppState,
};

pub fn referral_handler() -> Router {
    Router::new().route("/track", post(track_visit))
}

/// Anonymous landing-page hit on a referral link. The code must belong to
/// a real user before a visit row is written, so bogus codes never pollute
/// the visit table.
pub async fn track_visit(
    Extension(app_state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<TrackVisitDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let owner = app_state
        .db_client
        .get_code_owner(&body.referral_code)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    if owner.is_none() {
        return Err(HttpError::bad_request("Invalid referral code".to_string()));
    }

    let visitor_ip = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .unwrap_or("unknown");

    let user_agent = headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .unwrap_or("unknown");

    let visit = app_state
        .db_client
        .record_visit(&body.referral_code, visitor_ip, user_agent)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(TrackVisitResponseDto {
        success: true,
        visit,
    }))
}
