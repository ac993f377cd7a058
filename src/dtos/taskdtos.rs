use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::taskmodel::{Task, TaskApplication, TaskComment, TaskStatus};

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct CreateTaskDto {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1-200 characters"))]
    pub title: String,

    pub description: Option<String>,

    #[validate(range(min = 0, message = "Points cannot be negative"))]
    pub points: i32,

    #[validate(range(min = 0, message = "Payment amount cannot be negative"))]
    pub payment_amount: Option<i64>,

    pub payment_notes: Option<String>,
}

#[derive(Serialize, Deserialize, Validate)]
pub struct TaskQueryDto {
    pub status: Option<TaskStatus>,
    #[validate(range(min = 1, max = 10000))]
    pub page: Option<usize>,
    #[validate(range(min = 1, max = 50))]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTaskStatusDto {
    pub status: TaskStatus,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct ApplyTaskDto {
    #[validate(length(max = 1000, message = "Reason must be at most 1000 characters"))]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationDecisionDto {
    pub accept: bool,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct CreateCommentDto {
    #[validate(length(min = 1, max = 2000, message = "Comment must be between 1-2000 characters"))]
    pub content: String,

    /// One level of nesting: replies to replies keep the original parent.
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskResponseDto {
    pub status: String,
    pub task: Task,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskListResponseDto {
    pub status: String,
    pub tasks: Vec<Task>,
    pub results: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskDetailResponseDto {
    pub status: String,
    pub task: Task,
    pub comments: Vec<TaskComment>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApplicationResponseDto {
    pub status: String,
    pub application: TaskApplication,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApplicationListResponseDto {
    pub status: String,
    pub applications: Vec<TaskApplication>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_status_uses_snake_case_on_the_wire() {
        let dto: UpdateTaskStatusDto = serde_json::from_str(r#"{"status":"in_progress"}"#).unwrap();
        assert_eq!(dto.status, TaskStatus::InProgress);

        let body = serde_json::to_string(&UpdateTaskStatusDto {
            status: TaskStatus::Completed,
        })
        .unwrap();
        assert!(body.contains("completed"));
    }

    #[test]
    fn oversized_page_rejected() {
        let query = TaskQueryDto {
            status: None,
            page: Some(usize::MAX),
            limit: Some(10),
        };
        assert!(query.validate().is_err());
    }

    #[test]
    fn negative_points_rejected() {
        let dto = CreateTaskDto {
            title: "Write onboarding docs".to_string(),
            points: -5,
            ..Default::default()
        };
        assert!(dto.validate().is_err());
    }
}
