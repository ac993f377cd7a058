// service/task.rs
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    db::{db::DBClient, TaskExt},
    dtos::taskdtos::CreateTaskDto,
    models::{
        taskmodel::{ApplicationStatus, Task, TaskApplication, TaskStatus},
        usermodel::User,
    },
    service::{error::ServiceError, referral::ReferralService},
};

#[derive(Debug, Clone)]
pub struct TaskService {
    db_client: Arc<DBClient>,
    referral_service: Arc<ReferralService>,
}

impl TaskService {
    pub fn new(db_client: Arc<DBClient>, referral_service: Arc<ReferralService>) -> Self {
        Self {
            db_client,
            referral_service,
        }
    }

    pub async fn create_task(&self, creator: &User, dto: CreateTaskDto) -> Result<Task, ServiceError> {
        self.db_client
            .create_task(
                dto.title,
                dto.description,
                dto.points,
                dto.payment_amount,
                dto.payment_notes,
                creator.id,
            )
            .await
            .map_err(ServiceError::from)
    }

    pub async fn apply_to_task(
        &self,
        task_id: Uuid,
        applicant: &User,
        reason: Option<String>,
    ) -> Result<TaskApplication, ServiceError> {
        let task = self
            .db_client
            .get_task(task_id)
            .await?
            .ok_or(ServiceError::TaskNotFound(task_id))?;

        if task.status != TaskStatus::Open {
            return Err(ServiceError::TaskNotOpen(task_id));
        }

        if task.created_by == applicant.id {
            return Err(ServiceError::Validation(
                "You cannot apply to your own task".to_string(),
            ));
        }

        // One pending application per (task, applicant).
        if self
            .db_client
            .get_pending_application(task_id, applicant.id)
            .await?
            .is_some()
        {
            return Err(ServiceError::AlreadyApplied(applicant.id, task_id));
        }

        self.db_client
            .create_application(task_id, applicant.id, reason)
            .await
            .map_err(ServiceError::from)
    }

    /// Task owner (or an admin) accepts or rejects a pending application.
    /// Accepting assigns the task and moves it to `assigned`.
    pub async fn decide_application(
        &self,
        application_id: Uuid,
        decider: &User,
        accept: bool,
    ) -> Result<TaskApplication, ServiceError> {
        let application = self
            .db_client
            .get_application(application_id)
            .await?
            .ok_or(ServiceError::ApplicationNotFound(application_id))?;

        if application.status != ApplicationStatus::Pending {
            return Err(ServiceError::ApplicationNotPending(application_id));
        }

        let task = self
            .db_client
            .get_task(application.task_id)
            .await?
            .ok_or(ServiceError::TaskNotFound(application.task_id))?;

        if task.created_by != decider.id && !decider.role.is_admin() {
            return Err(ServiceError::UnauthorizedTaskAccess(decider.id, task.id));
        }

        if !accept {
            return self
                .db_client
                .update_application_status(application_id, ApplicationStatus::Rejected)
                .await
                .map_err(ServiceError::from);
        }

        if !task.status.can_transition_to(TaskStatus::Assigned) {
            return Err(ServiceError::InvalidStatusTransition(
                task.id,
                task.status,
                TaskStatus::Assigned,
            ));
        }

        self.db_client
            .assign_task(task.id, application.applicant_id)
            .await?;

        self.db_client
            .update_application_status(application_id, ApplicationStatus::Accepted)
            .await
            .map_err(ServiceError::from)
    }

    /// Status changes by participants. Approval has its own admin path.
    pub async fn update_status(
        &self,
        task_id: Uuid,
        actor: &User,
        new_status: TaskStatus,
    ) -> Result<Task, ServiceError> {
        if new_status == TaskStatus::Approved {
            return Err(ServiceError::Validation(
                "Approval goes through the approve endpoint".to_string(),
            ));
        }

        let task = self
            .db_client
            .get_task(task_id)
            .await?
            .ok_or(ServiceError::TaskNotFound(task_id))?;

        if !task.status.can_transition_to(new_status) {
            return Err(ServiceError::InvalidStatusTransition(
                task_id,
                task.status,
                new_status,
            ));
        }

        let is_assignee = task.assigned_to == Some(actor.id);
        let is_owner = task.created_by == actor.id;
        let is_admin = actor.role.is_admin();

        let allowed = match new_status {
            // Work progress belongs to the assignee.
            TaskStatus::InProgress | TaskStatus::Completed => is_assignee,
            // Moderation moves belong to the owner or an admin.
            TaskStatus::Blocked | TaskStatus::Cancelled => is_owner || is_admin,
            // Assignment happens through application acceptance.
            _ => false,
        };

        if !allowed {
            return Err(ServiceError::UnauthorizedTaskAccess(actor.id, task_id));
        }

        let updated = self.db_client.update_task_status(task_id, new_status).await?;

        if new_status == TaskStatus::Completed {
            // Referral bookkeeping must not undo the completion.
            if let Err(e) = self.referral_service.record_task_completion(actor.id).await {
                tracing::warn!(
                    "Referral completion attribution failed for {}: {}",
                    actor.id,
                    e
                );
            }
        }

        Ok(updated)
    }

    /// Admin approval of a completed task credits the assignee's points in
    /// the same transaction as the status change, with an in-place
    /// increment rather than a read-then-write.
    pub async fn approve_task(&self, task_id: Uuid, approver: &User) -> Result<Task, ServiceError> {
        if !approver.role.is_admin() {
            return Err(ServiceError::UnauthorizedTaskAccess(approver.id, task_id));
        }

        let mut tx = self.db_client.pool.begin().await?;

        let approved = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET status = 'approved'::task_status, updated_at = NOW()
            WHERE id = $1 AND status = 'completed'::task_status
            RETURNING
                id, title, description, points, payment_amount, payment_notes,
                status, assigned_to, created_by, created_at, updated_at
            "#,
        )
        .bind(task_id)
        .fetch_optional(&mut *tx)
        .await?;

        let task = match approved {
            Some(task) => task,
            None => {
                tx.rollback().await?;
                let existing = self
                    .db_client
                    .get_task(task_id)
                    .await?
                    .ok_or(ServiceError::TaskNotFound(task_id))?;
                return Err(ServiceError::InvalidStatusTransition(
                    task_id,
                    existing.status,
                    TaskStatus::Approved,
                ));
            }
        };

        if let Some(assignee_id) = task.assigned_to {
            sqlx::query("UPDATE users SET points = points + $1, updated_at = NOW() WHERE id = $2")
                .bind(task.points)
                .bind(assignee_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        tracing::info!(
            "Task {} approved by {}, {} points credited",
            task.id,
            approver.id,
            task.points
        );

        Ok(task)
    }
}
