use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::TaskExt,
    dtos::taskdtos::{
        ApplicationDecisionDto, ApplicationListResponseDto, ApplicationResponseDto, ApplyTaskDto,
        CreateCommentDto, CreateTaskDto, TaskDetailResponseDto, TaskListResponseDto, TaskQueryDto,
        TaskResponseDto, UpdateTaskStatusDto,
    },
    error::HttpError,
    middleware::JWTAuthMiddleware,
    AppState,
};

pub fn task_handler() -> Router {
    Router::new()
        .route("/", post(create_task).get(get_tasks))
        .route("/me", get(get_my_tasks))
        .route("/:task_id", get(get_task))
        .route("/:task_id/apply", post(apply_to_task))
        .route("/:task_id/applications", get(get_applications))
        .route("/:task_id/status", put(update_task_status))
        .route("/:task_id/approve", post(approve_task))
        .route("/:task_id/comments", post(add_comment))
        .route("/applications/:application_id", put(decide_application))
}

pub async fn create_task(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Json(body): Json<CreateTaskDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let task = app_state
        .task_service
        .create_task(&auth.user, body)
        .await
        .map_err(HttpError::from)?;

    Ok(Json(TaskResponseDto {
        status: "success".to_string(),
        task,
    }))
}

pub async fn get_tasks(
    Extension(app_state): Extension<Arc<AppState>>,
    Query(query_params): Query<TaskQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    query_params
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let page = query_params.page.unwrap_or(1);
    let limit = query_params.limit.unwrap_or(10);

    let tasks = app_state
        .db_client
        .get_tasks(query_params.status, page as u32, limit)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(TaskListResponseDto {
        status: "success".to_string(),
        results: tasks.len(),
        tasks,
    }))
}

pub async fn get_my_tasks(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let tasks = app_state
        .db_client
        .get_tasks_for_user(auth.user.id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(TaskListResponseDto {
        status: "success".to_string(),
        results: tasks.len(),
        tasks,
    }))
}

pub async fn get_task(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(task_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let task = app_state
        .db_client
        .get_task(task_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or(HttpError::not_found(format!("Task {} not found", task_id)))?;

    let comments = app_state
        .db_client
        .get_comments_for_task(task_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(TaskDetailResponseDto {
        status: "success".to_string(),
        task,
        comments,
    }))
}

pub async fn apply_to_task(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(task_id): Path<Uuid>,
    Json(body): Json<ApplyTaskDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let application = app_state
        .task_service
        .apply_to_task(task_id, &auth.user, body.reason)
        .await
        .map_err(HttpError::from)?;

    Ok(Json(ApplicationResponseDto {
        status: "success".to_string(),
        application,
    }))
}

pub async fn get_applications(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(task_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let task = app_state
        .db_client
        .get_task(task_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or(HttpError::not_found(format!("Task {} not found", task_id)))?;

    if task.created_by != auth.user.id && !auth.user.role.is_admin() {
        return Err(HttpError::forbidden(
            "Only the task owner can view applications".to_string(),
        ));
    }

    let applications = app_state
        .db_client
        .get_applications_for_task(task_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(ApplicationListResponseDto {
        status: "success".to_string(),
        applications,
    }))
}

pub async fn decide_application(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(application_id): Path<Uuid>,
    Json(body): Json<ApplicationDecisionDto>,
) -> Result<impl IntoResponse, HttpError> {
    let application = app_state
        .task_service
        .decide_application(application_id, &auth.user, body.accept)
        .await
        .map_err(HttpError::from)?;

    Ok(Json(ApplicationResponseDto {
        status: "success".to_string(),
        application,
    }))
}

pub async fn update_task_status(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(task_id): Path<Uuid>,
    Json(body): Json<UpdateTaskStatusDto>,
) -> Result<impl IntoResponse, HttpError> {
    let task = app_state
        .task_service
        .update_status(task_id, &auth.user, body.status)
        .await
        .map_err(HttpError::from)?;

    Ok(Json(TaskResponseDto {
        status: "success".to_string(),
        task,
    }))
}

pub async fn approve_task(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(task_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let task = app_state
        .task_service
        .approve_task(task_id, &auth.user)
        .await
        .map_err(HttpError::from)?;

    Ok(Json(TaskResponseDto {
        status: "success".to_string(),
        task,
    }))
}

pub async fn add_comment(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    Path(task_id): Path<Uuid>,
    Json(body): Json<CreateCommentDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    app_state
        .db_client
        .get_task(task_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or(HttpError::not_found(format!("Task {} not found", task_id)))?;

    // Replies nest one level deep: replying to a reply attaches to the
    // top-level comment instead.
    let parent_id = match body.parent_id {
        Some(parent_id) => {
            let comments = app_state
                .db_client
                .get_comments_for_task(task_id)
                .await
                .map_err(|e| HttpError::server_error(e.to_string()))?;

            let parent = comments
                .iter()
                .find(|c| c.id == parent_id)
                .ok_or(HttpError::bad_request("Parent comment not found".to_string()))?;

            Some(parent.parent_id.unwrap_or(parent.id))
        }
        None => None,
    };

    let comment = app_state
        .db_client
        .add_comment(task_id, body.content, auth.user.id, parent_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "comment": comment
    })))
}
