use std::sync::Arc;

use axum::{
    http::HeaderMap,
    response::IntoResponse,
    routing::post,
    Extension, Json, Router,
};
use chrono::Utc;

use crate::{
    db::UserExt,
    dtos::{referraldtos::ClerkWebhookEvent, userdtos::Response},
    error::HttpError,
    service::webhook::{self, WebhookError},
    AppState,
};

pub fn webhook_handler() -> Router {
    Router::new().route("/clerk", post(clerk_webhook))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, HttpError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| HttpError::bad_request(format!("Missing {} header", name)))
}

/// Identity-provider webhook. The signature is cryptographically verified
/// against the shared secret before the payload is trusted.
pub async fn clerk_webhook(
    Extension(app_state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Result<impl IntoResponse, HttpError> {
    let msg_id = header_str(&headers, "svix-id")?;
    let timestamp = header_str(&headers, "svix-timestamp")?;
    let signature = header_str(&headers, "svix-signature")?;

    webhook::verify_signature(
        &app_state.env.webhook_secret,
        msg_id,
        timestamp,
        body.as_bytes(),
        signature,
        Utc::now().timestamp(),
    )
    .map_err(|e| match e {
        WebhookError::SecretNotConfigured | WebhookError::InvalidSecret => {
            tracing::error!("Webhook rejected: {}", e);
            HttpError::server_error(e.to_string())
        }
        WebhookError::InvalidTimestamp | WebhookError::SignatureMismatch => {
            tracing::warn!("Webhook rejected: {}", e);
            HttpError::unauthorized(e.to_string())
        }
    })?;

    let event: ClerkWebhookEvent = serde_json::from_str(&body)
        .map_err(|e| HttpError::bad_request(format!("Invalid webhook payload: {}", e)))?;

    match event.event_type.as_str() {
        "user.created" | "user.updated" => {
            let email = event
                .data
                .primary_email()
                .ok_or(HttpError::bad_request("Webhook user has no email address".to_string()))?
                .to_string();

            let user = app_state
                .db_client
                .upsert_user_by_email(event.data.display_name(), email)
                .await
                .map_err(|e| HttpError::server_error(e.to_string()))?;

            if event.event_type == "user.created" {
                if let Err(e) = app_state
                    .referral_service
                    .ensure_referral_code(user.id)
                    .await
                {
                    tracing::warn!("Referral code issuance failed for {}: {}", user.id, e);
                }
            }

            tracing::info!("Webhook {} processed for {}", event.event_type, user.email);
        }
        other => {
            tracing::debug!("Ignoring webhook event type {}", other);
        }
    }

    Ok(Json(Response {
        status: "success",
        message: "Webhook processed".to_string(),
    }))
}
