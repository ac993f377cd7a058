use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::{ReferralExt, UserExt},
    dtos::userdtos::{
        FilterUserDto, NameUpdateDto, RequestQueryDto, SetActiveDto, UpdatePointsDto, UserData,
        UserListResponseDto, UserResponseDto,
    },
    error::HttpError,
    middleware::{admin_check, JWTAuthMiddleware},
    service::referral::generate_referral_link,
    AppState,
};

pub fn users_handler() -> Router {
    let admin_routes = Router::new()
        .route("/", get(get_users))
        .route("/:user_id/active", put(set_user_active))
        .route("/points", post(adjust_points))
        .layer(middleware::from_fn(admin_check));

    Router::new()
        .route("/me", get(get_me).put(update_name))
        .route("/referral-link", get(get_referral_link))
        .route("/referral-stats", get(get_referral_stats))
        .route("/referral-status", get(check_referral_status))
        .merge(admin_routes)
}

pub async fn get_me(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    // Lazy issuance on first access; an issuance failure degrades to a
    // null code and the client asks the user to refresh.
    let referral_code = match app_state
        .referral_service
        .ensure_referral_code(auth.user.id)
        .await
    {
        Ok(code) => Some(code),
        Err(e) => {
            tracing::warn!("Referral code issuance failed for {}: {}", auth.user.id, e);
            None
        }
    };

    Ok(Json(UserResponseDto {
        status: "success".to_string(),
        data: UserData {
            user: FilterUserDto::filter_user(&auth.user, referral_code),
        },
    }))
}

pub async fn update_name(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Json(body): Json<NameUpdateDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let user = app_state
        .db_client
        .update_user_name(auth.user.id, body.name)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(UserResponseDto {
        status: "success".to_string(),
        data: UserData {
            user: FilterUserDto::filter_user(&user, None),
        },
    }))
}

pub async fn get_referral_link(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let referral_code = app_state
        .referral_service
        .ensure_referral_code(auth.user.id)
        .await
        .map_err(HttpError::from)?;

    let referral_link = generate_referral_link(&app_state.env.app_url, &referral_code);

    Ok(Json(json!({
        "status": "success",
        "data": {
            "referral_code": referral_code,
            "referral_link": referral_link
        }
    })))
}

pub async fn get_referral_stats(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let stats = app_state
        .referral_service
        .referral_stats(&auth.user)
        .await
        .map_err(HttpError::from)?;

    Ok(Json(json!({
        "status": "success",
        "data": {
            "total_referrals": stats.total_referrals,
            "completed_referrals": stats.completed_referrals,
            "converted_visits": stats.converted_visits,
            "total_points_earned": stats.total_points_earned,
            "referred_users": stats.referred_users
        }
    })))
}

pub async fn check_referral_status(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let referral = app_state
        .db_client
        .get_referral_by_referred(auth.user.id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    let referral_info = if let Some(ref referral) = referral {
        let referrer = app_state
            .db_client
            .get_user(Some(referral.referrer_id), None)
            .await
            .map_err(|e| HttpError::server_error(e.to_string()))?;

        referrer.map(|r| {
            json!({
                "referrer_name": r.name,
                "status": referral.status.to_str(),
                "completed_task_count": referral.completed_task_count,
                "points_awarded": referral.points_awarded,
                "referred_at": referral.created_at
            })
        })
    } else {
        None
    };

    Ok(Json(json!({
        "status": "success",
        "data": {
            "was_referred": referral.is_some(),
            "referral_info": referral_info
        }
    })))
}

pub async fn get_users(
    Extension(app_state): Extension<Arc<AppState>>,
    Query(query_params): Query<RequestQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    query_params
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let page = query_params.page.unwrap_or(1);
    let limit = query_params.limit.unwrap_or(10);

    let users = app_state
        .db_client
        .get_users(page as u32, limit)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    let count = app_state
        .db_client
        .get_user_count()
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(UserListResponseDto {
        status: "success".to_string(),
        users: FilterUserDto::filter_users(&users),
        results: count,
    }))
}

pub async fn set_user_active(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Json(body): Json<SetActiveDto>,
) -> Result<impl IntoResponse, HttpError> {
    let user = app_state
        .db_client
        .set_user_active(user_id, body.is_active)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    tracing::info!("User {} active flag set to {}", user.id, user.is_active);

    Ok(Json(UserResponseDto {
        status: "success".to_string(),
        data: UserData {
            user: FilterUserDto::filter_user(&user, None),
        },
    }))
}

pub async fn adjust_points(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Json(body): Json<UpdatePointsDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let user = app_state
        .db_client
        .add_points(body.user_id, body.points)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    tracing::info!(
        "Admin {} adjusted points for {} by {} ({})",
        auth.user.id,
        body.user_id,
        body.points,
        body.reason.as_deref().unwrap_or("no reason given")
    );

    Ok(Json(UserResponseDto {
        status: "success".to_string(),
        data: UserData {
            user: FilterUserDto::filter_user(&user, None),
        },
    }))
}
