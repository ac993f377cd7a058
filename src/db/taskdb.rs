// db/taskdb.rs
use async_trait::async_trait;
use uuid::Uuid;

use super::db::DBClient;

use crate::models::taskmodel::{
    ApplicationStatus, Task, TaskApplication, TaskComment, TaskStatus,
};

#[async_trait]
pub trait TaskExt {
    async fn create_task<T: Into<String> + Send>(
        &self,
        title: T,
        description: Option<String>,
        points: i32,
        payment_amount: Option<i64>,
        payment_notes: Option<String>,
        created_by: Uuid,
    ) -> Result<Task, sqlx::Error>;

    async fn get_task(&self, task_id: Uuid) -> Result<Option<Task>, sqlx::Error>;

    async fn get_tasks(
        &self,
        status: Option<TaskStatus>,
        page: u32,
        limit: usize,
    ) -> Result<Vec<Task>, sqlx::Error>;

    /// Tasks a user is involved in, either as creator or assignee.
    async fn get_tasks_for_user(&self, user_id: Uuid) -> Result<Vec<Task>, sqlx::Error>;

    async fn update_task_status(
        &self,
        task_id: Uuid,
        status: TaskStatus,
    ) -> Result<Task, sqlx::Error>;

    /// Assignment and status move together in one statement.
    async fn assign_task(&self, task_id: Uuid, user_id: Uuid) -> Result<Task, sqlx::Error>;

    async fn create_application(
        &self,
        task_id: Uuid,
        applicant_id: Uuid,
        reason: Option<String>,
    ) -> Result<TaskApplication, sqlx::Error>;

    async fn get_application(
        &self,
        application_id: Uuid,
    ) -> Result<Option<TaskApplication>, sqlx::Error>;

    async fn get_pending_application(
        &self,
        task_id: Uuid,
        applicant_id: Uuid,
    ) -> Result<Option<TaskApplication>, sqlx::Error>;

    async fn get_applications_for_task(
        &self,
        task_id: Uuid,
    ) -> Result<Vec<TaskApplication>, sqlx::Error>;

    async fn update_application_status(
        &self,
        application_id: Uuid,
        status: ApplicationStatus,
    ) -> Result<TaskApplication, sqlx::Error>;

    async fn add_comment<T: Into<String> + Send>(
        &self,
        task_id: Uuid,
        content: T,
        created_by: Uuid,
        parent_id: Option<Uuid>,
    ) -> Result<TaskComment, sqlx::Error>;

    async fn get_comments_for_task(&self, task_id: Uuid)
        -> Result<Vec<TaskComment>, sqlx::Error>;
}

#[async_trait]
impl TaskExt for DBClient {
    async fn create_task<T: Into<String> + Send>(
        &self,
        title: T,
        description: Option<String>,
        points: i32,
        payment_amount: Option<i64>,
        payment_notes: Option<String>,
        created_by: Uuid,
    ) -> Result<Task, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (title, description, points, payment_amount, payment_notes, created_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING
                id, title, description, points, payment_amount, payment_notes,
                status, assigned_to, created_by, created_at, updated_at
            "#,
        )
        .bind(title.into())
        .bind(description)
        .bind(points)
        .bind(payment_amount)
        .bind(payment_notes)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_task(&self, task_id: Uuid) -> Result<Option<Task>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            SELECT
                id, title, description, points, payment_amount, payment_notes,
                status, assigned_to, created_by, created_at, updated_at
            FROM tasks
            WHERE id = $1
            "#,
        )
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_tasks(
        &self,
        status: Option<TaskStatus>,
        page: u32,
        limit: usize,
    ) -> Result<Vec<Task>, sqlx::Error> {
        let offset = (page as i64 - 1) * limit as i64;

        match status {
            Some(status) => {
                sqlx::query_as::<_, Task>(
                    r#"
                    SELECT
                        id, title, description, points, payment_amount, payment_notes,
                        status, assigned_to, created_by, created_at, updated_at
                    FROM tasks
                    WHERE status = $1
                    ORDER BY created_at DESC LIMIT $2 OFFSET $3
                    "#,
                )
                .bind(status)
                .bind(limit as i64)
                .bind(offset)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, Task>(
                    r#"
                    SELECT
                        id, title, description, points, payment_amount, payment_notes,
                        status, assigned_to, created_by, created_at, updated_at
                    FROM tasks
                    ORDER BY created_at DESC LIMIT $1 OFFSET $2
                    "#,
                )
                .bind(limit as i64)
                .bind(offset)
                .fetch_all(&self.pool)
                .await
            }
        }
    }

    async fn get_tasks_for_user(&self, user_id: Uuid) -> Result<Vec<Task>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            SELECT
                id, title, description, points, payment_amount, payment_notes,
                status, assigned_to, created_by, created_at, updated_at
            FROM tasks
            WHERE created_by = $1 OR assigned_to = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn update_task_status(
        &self,
        task_id: Uuid,
        status: TaskStatus,
    ) -> Result<Task, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET status = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING
                id, title, description, points, payment_amount, payment_notes,
                status, assigned_to, created_by, created_at, updated_at
            "#,
        )
        .bind(status)
        .bind(task_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn assign_task(&self, task_id: Uuid, user_id: Uuid) -> Result<Task, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET assigned_to = $1, status = 'assigned'::task_status, updated_at = NOW()
            WHERE id = $2
            RETURNING
                id, title, description, points, payment_amount, payment_notes,
                status, assigned_to, created_by, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(task_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn create_application(
        &self,
        task_id: Uuid,
        applicant_id: Uuid,
        reason: Option<String>,
    ) -> Result<TaskApplication, sqlx::Error> {
        sqlx::query_as::<_, TaskApplication>(
            r#"
            INSERT INTO task_applications (task_id, applicant_id, reason)
            VALUES ($1, $2, $3)
            RETURNING id, task_id, applicant_id, status, reason, created_at
            "#,
        )
        .bind(task_id)
        .bind(applicant_id)
        .bind(reason)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_application(
        &self,
        application_id: Uuid,
    ) -> Result<Option<TaskApplication>, sqlx::Error> {
        sqlx::query_as::<_, TaskApplication>(
            r#"
            SELECT id, task_id, applicant_id, status, reason, created_at
            FROM task_applications
            WHERE id = $1
            "#,
        )
        .bind(application_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_pending_application(
        &self,
        task_id: Uuid,
        applicant_id: Uuid,
    ) -> Result<Option<TaskApplication>, sqlx::Error> {
        sqlx::query_as::<_, TaskApplication>(
            r#"
            SELECT id, task_id, applicant_id, status, reason, created_at
            FROM task_applications
            WHERE task_id = $1 AND applicant_id = $2 AND status = 'pending'::application_status
            "#,
        )
        .bind(task_id)
        .bind(applicant_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_applications_for_task(
        &self,
        task_id: Uuid,
    ) -> Result<Vec<TaskApplication>, sqlx::Error> {
        sqlx::query_as::<_, TaskApplication>(
            r#"
            SELECT id, task_id, applicant_id, status, reason, created_at
            FROM task_applications
            WHERE task_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(task_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn update_application_status(
        &self,
        application_id: Uuid,
        status: ApplicationStatus,
    ) -> Result<TaskApplication, sqlx::Error> {
        sqlx::query_as::<_, TaskApplication>(
            r#"
            UPDATE task_applications
            SET status = $1
            WHERE id = $2
            RETURNING id, task_id, applicant_id, status, reason, created_at
            "#,
        )
        .bind(status)
        .bind(application_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn add_comment<T: Into<String> + Send>(
        &self,
        task_id: Uuid,
        content: T,
        created_by: Uuid,
        parent_id: Option<Uuid>,
    ) -> Result<TaskComment, sqlx::Error> {
        sqlx::query_as::<_, TaskComment>(
            r#"
            INSERT INTO task_comments (task_id, content, created_by, parent_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, task_id, content, created_by, parent_id, created_at
            "#,
        )
        .bind(task_id)
        .bind(content.into())
        .bind(created_by)
        .bind(parent_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_comments_for_task(
        &self,
        task_id: Uuid,
    ) -> Result<Vec<TaskComment>, sqlx::Error> {
        sqlx::query_as::<_, TaskComment>(
            r#"
            SELECT id, task_id, content, created_by, parent_id, created_at
            FROM task_comments
            WHERE task_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(task_id)
        .fetch_all(&self.pool)
        .await
    }
}
