// db/referraldb.rs
use async_trait::async_trait;
use uuid::Uuid;

use super::db::DBClient;

use crate::models::{
    referralmodel::{Referral, ReferralCode, ReferralVisit, ReferredUser},
    usermodel::User,
};

#[async_trait]
pub trait ReferralExt {
    /// All codes held by a user, oldest first. More than one row means a
    /// past insert race left duplicates behind.
    async fn get_codes_for_user(&self, user_id: Uuid) -> Result<Vec<ReferralCode>, sqlx::Error>;

    /// Insert keyed on user_id with duplicate-ignoring semantics; returns
    /// None when a concurrent request won the race.
    async fn insert_code(
        &self,
        user_id: Uuid,
        code: &str,
    ) -> Result<Option<ReferralCode>, sqlx::Error>;

    async fn delete_codes_except(&self, user_id: Uuid, keep_id: Uuid) -> Result<u64, sqlx::Error>;

    /// The user owning a referral code, joined in one query so the caller
    /// can check the admin flag without a second round trip.
    async fn get_code_owner(&self, code: &str) -> Result<Option<User>, sqlx::Error>;

    async fn record_visit(
        &self,
        referral_code: &str,
        visitor_ip: &str,
        user_agent: &str,
    ) -> Result<ReferralVisit, sqlx::Error>;

    async fn mark_oldest_visit_converted(&self, referral_code: &str) -> Result<u64, sqlx::Error>;

    async fn create_referral(
        &self,
        referrer_id: Uuid,
        referred_user_id: Uuid,
    ) -> Result<Referral, sqlx::Error>;

    async fn get_referral_by_referred(
        &self,
        referred_user_id: Uuid,
    ) -> Result<Option<Referral>, sqlx::Error>;

    async fn count_referrals(&self, referrer_id: Uuid) -> Result<(i64, i64), sqlx::Error>;

    async fn count_converted_visits(&self, referral_code: &str) -> Result<i64, sqlx::Error>;

    async fn get_referred_users(&self, referrer_id: Uuid) -> Result<Vec<ReferredUser>, sqlx::Error>;
}

#[async_trait]
impl ReferralExt for DBClient {
    async fn get_codes_for_user(&self, user_id: Uuid) -> Result<Vec<ReferralCode>, sqlx::Error> {
        sqlx::query_as::<_, ReferralCode>(
            r#"
            SELECT id, code, user_id, created_at
            FROM referral_codes
            WHERE user_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn insert_code(
        &self,
        user_id: Uuid,
        code: &str,
    ) -> Result<Option<ReferralCode>, sqlx::Error> {
        sqlx::query_as::<_, ReferralCode>(
            r#"
            INSERT INTO referral_codes (user_id, code)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO NOTHING
            RETURNING id, code, user_id, created_at
            "#,
        )
        .bind(user_id)
        .bind(code)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_codes_except(&self, user_id: Uuid, keep_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM referral_codes
            WHERE user_id = $1 AND id <> $2
            "#,
        )
        .bind(user_id)
        .bind(keep_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn get_code_owner(&self, code: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT
                u.id, u.name, u.email, u.password, u.role, u.points, u.is_active,
                u.created_at, u.updated_at
            FROM referral_codes rc
            JOIN users u ON u.id = rc.user_id
            WHERE rc.code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
    }

    async fn record_visit(
        &self,
        referral_code: &str,
        visitor_ip: &str,
        user_agent: &str,
    ) -> Result<ReferralVisit, sqlx::Error> {
        sqlx::query_as::<_, ReferralVisit>(
            r#"
            INSERT INTO referral_visits (referral_code, visitor_ip, user_agent)
            VALUES ($1, $2, $3)
            RETURNING id, referral_code, visitor_ip, user_agent, converted, created_at
            "#,
        )
        .bind(referral_code)
        .bind(visitor_ip)
        .bind(user_agent)
        .fetch_one(&self.pool)
        .await
    }

    async fn mark_oldest_visit_converted(&self, referral_code: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE referral_visits
            SET converted = true
            WHERE id = (
                SELECT id FROM referral_visits
                WHERE referral_code = $1 AND converted = false
                ORDER BY created_at ASC
                LIMIT 1
            )
            "#,
        )
        .bind(referral_code)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn create_referral(
        &self,
        referrer_id: Uuid,
        referred_user_id: Uuid,
    ) -> Result<Referral, sqlx::Error> {
        sqlx::query_as::<_, Referral>(
            r#"
            INSERT INTO referrals (referrer_id, referred_user_id)
            VALUES ($1, $2)
            RETURNING
                id, referrer_id, referred_user_id, status,
                completed_task_count, points_awarded, created_at
            "#,
        )
        .bind(referrer_id)
        .bind(referred_user_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_referral_by_referred(
        &self,
        referred_user_id: Uuid,
    ) -> Result<Option<Referral>, sqlx::Error> {
        sqlx::query_as::<_, Referral>(
            r#"
            SELECT
                id, referrer_id, referred_user_id, status,
                completed_task_count, points_awarded, created_at
            FROM referrals
            WHERE referred_user_id = $1
            "#,
        )
        .bind(referred_user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn count_referrals(&self, referrer_id: Uuid) -> Result<(i64, i64), sqlx::Error> {
        let row: (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COUNT(*) FILTER (WHERE points_awarded)
            FROM referrals
            WHERE referrer_id = $1
            "#,
        )
        .bind(referrer_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn count_converted_visits(&self, referral_code: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM referral_visits
            WHERE referral_code = $1 AND converted = true
            "#,
        )
        .bind(referral_code)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_referred_users(
        &self,
        referrer_id: Uuid,
    ) -> Result<Vec<ReferredUser>, sqlx::Error> {
        sqlx::query_as::<_, ReferredUser>(
            r#"
            SELECT
                u.id,
                u.name,
                u.email,
                r.created_at as joined_at
            FROM referrals r
            JOIN users u ON u.id = r.referred_user_id
            WHERE r.referrer_id = $1
            ORDER BY r.created_at DESC
            "#,
        )
        .bind(referrer_id)
        .fetch_all(&self.pool)
        .await
    }
}
