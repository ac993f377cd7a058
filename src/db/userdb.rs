// db/userdb.rs
use async_trait::async_trait;
use uuid::Uuid;

use super::db::DBClient;

use crate::models::usermodel::User;

#[async_trait]
pub trait UserExt {
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        email: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error>;

    async fn get_users(&self, page: u32, limit: usize) -> Result<Vec<User>, sqlx::Error>;

    async fn get_user_count(&self) -> Result<i64, sqlx::Error>;

    async fn save_user<T: Into<String> + Send>(
        &self,
        name: T,
        email: T,
        password: T,
    ) -> Result<User, sqlx::Error>;

    /// Webhook provisioning: create the profile if the email is new,
    /// otherwise refresh the name on the existing row.
    async fn upsert_user_by_email<T: Into<String> + Send>(
        &self,
        name: T,
        email: T,
    ) -> Result<User, sqlx::Error>;

    async fn update_user_name<T: Into<String> + Send>(
        &self,
        user_id: Uuid,
        name: T,
    ) -> Result<User, sqlx::Error>;

    /// In-place point credit, never read-then-write.
    async fn add_points(&self, user_id: Uuid, points: i32) -> Result<User, sqlx::Error>;

    async fn set_user_active(&self, user_id: Uuid, is_active: bool) -> Result<User, sqlx::Error>;
}

#[async_trait]
impl UserExt for DBClient {
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        email: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error> {
        let mut user: Option<User> = None;

        if let Some(user_id) = user_id {
            user = sqlx::query_as::<_, User>(
                r#"
                SELECT
                    id, name, email, password, role, points, is_active,
                    created_at, updated_at
                FROM users
                WHERE id = $1
                "#,
            )
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        } else if let Some(email) = email {
            user = sqlx::query_as::<_, User>(
                r#"
                SELECT
                    id, name, email, password, role, points, is_active,
                    created_at, updated_at
                FROM users
                WHERE email = $1
                "#,
            )
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        }

        Ok(user)
    }

    async fn get_users(&self, page: u32, limit: usize) -> Result<Vec<User>, sqlx::Error> {
        let offset = (page as i64 - 1) * limit as i64;

        sqlx::query_as::<_, User>(
            r#"
            SELECT
                id, name, email, password, role, points, is_active,
                created_at, updated_at
            FROM users
            ORDER BY created_at DESC LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit as i64)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_user_count(&self) -> Result<i64, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM users"#)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn save_user<T: Into<String> + Send>(
        &self,
        name: T,
        email: T,
        password: T,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password)
            VALUES ($1, $2, $3)
            RETURNING
                id, name, email, password, role, points, is_active,
                created_at, updated_at
            "#,
        )
        .bind(name.into())
        .bind(email.into())
        .bind(password.into())
        .fetch_one(&self.pool)
        .await
    }

    async fn upsert_user_by_email<T: Into<String> + Send>(
        &self,
        name: T,
        email: T,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email)
            VALUES ($1, $2)
            ON CONFLICT (email) DO UPDATE
            SET name = EXCLUDED.name, updated_at = NOW()
            RETURNING
                id, name, email, password, role, points, is_active,
                created_at, updated_at
            "#,
        )
        .bind(name.into())
        .bind(email.into())
        .fetch_one(&self.pool)
        .await
    }

    async fn update_user_name<T: Into<String> + Send>(
        &self,
        user_id: Uuid,
        new_name: T,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING
                id, name, email, password, role, points, is_active,
                created_at, updated_at
            "#,
        )
        .bind(new_name.into())
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn add_points(&self, user_id: Uuid, points: i32) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET points = points + $1, updated_at = NOW()
            WHERE id = $2
            RETURNING
                id, name, email, password, role, points, is_active,
                created_at, updated_at
            "#,
        )
        .bind(points)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn set_user_active(&self, user_id: Uuid, is_active: bool) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET is_active = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING
                id, name, email, password, role, points, is_active,
                created_at, updated_at
            "#,
        )
        .bind(is_active)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
    }
}
