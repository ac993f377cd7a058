use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
pub enum TaskStatus {
    Open,
    Assigned,
    InProgress,
    Completed,
    Approved,
    Blocked,
    Cancelled,
}

impl TaskStatus {
    /// Forward-only lifecycle: open → assigned → in_progress → completed → approved,
    /// with blocked/cancelled as side exits. A blocked task can resume work.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, next),
            (Open, Assigned)
                | (Assigned, InProgress)
                | (InProgress, Completed)
                | (Completed, Approved)
                | (Open | Assigned | InProgress, Blocked)
                | (Open | Assigned | InProgress | Blocked, Cancelled)
                | (Blocked, InProgress)
        )
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "application_status", rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub points: i32,
    // Optional cash payment in minor units, alongside the point reward
    pub payment_amount: Option<i64>,
    pub payment_notes: Option<String>,
    pub status: TaskStatus,
    pub assigned_to: Option<Uuid>,
    pub created_by: Uuid,

    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,

    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct TaskApplication {
    pub id: Uuid,
    pub task_id: Uuid,
    pub applicant_id: Uuid,
    pub status: ApplicationStatus,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct TaskComment {
    pub id: Uuid,
    pub task_id: Uuid,
    pub content: String,
    pub created_by: Uuid,
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_moves_forward_only() {
        use TaskStatus::*;
        assert!(Open.can_transition_to(Assigned));
        assert!(Assigned.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Completed));
        assert!(Completed.can_transition_to(Approved));

        assert!(!Assigned.can_transition_to(Open));
        assert!(!Completed.can_transition_to(InProgress));
        assert!(!Open.can_transition_to(Completed));
        assert!(!Approved.can_transition_to(Completed));
    }

    #[test]
    fn blocked_and_cancelled_exits() {
        use TaskStatus::*;
        assert!(InProgress.can_transition_to(Blocked));
        assert!(Blocked.can_transition_to(InProgress));
        assert!(Blocked.can_transition_to(Cancelled));
        assert!(!Completed.can_transition_to(Blocked));
        assert!(!Cancelled.can_transition_to(Open));
        assert!(!Approved.can_transition_to(Blocked));
        assert!(!Cancelled.can_transition_to(Assigned));
    }
}
