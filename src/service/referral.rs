// service/referral.rs
//
// Referral attribution engine: code issuance, signup-time linkage,
// task-completion counting and the reward flip at the threshold.
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use uuid::Uuid;

use crate::{
    db::{db::DBClient, ReferralExt},
    models::{referralmodel::{Referral, ReferralStats}, usermodel::User},
    service::error::ServiceError,
    utils::retry::retry_with_backoff,
};

/// Referred users must complete this many tasks before the referrer is paid.
pub const REFERRAL_TASK_THRESHOLD: i32 = 3;
pub const REFERRAL_REWARD_POINTS: i32 = 50;

const CODE_RANDOM_LEN: usize = 6;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Six random base36 chars followed by two base36 chars derived from the
/// current time, uppercased. The time suffix keeps codes generated in the
/// same instant from colliding too easily.
pub fn generate_referral_code() -> String {
    let mut rng = rand::rng();
    let mut code: String = (0..CODE_RANDOM_LEN)
        .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
        .collect();

    let stamp = Utc::now().timestamp() as u64 % (36 * 36);
    code.push(BASE36[(stamp / 36) as usize] as char);
    code.push(BASE36[(stamp % 36) as usize] as char);

    code.to_uppercase()
}

pub fn generate_referral_link(base_url: &str, code: &str) -> String {
    format!("{}/signup?ref={}", base_url, code)
}

/// True exactly when this update crossed the reward threshold, i.e. the
/// returned row just flipped points_awarded.
fn threshold_newly_crossed(referral: &Referral, threshold: i32) -> bool {
    referral.points_awarded && referral.completed_task_count == threshold
}

/// Points owed for this update, Some only on the update that crossed the
/// threshold.
fn completion_credit(referral: &Referral) -> Option<i32> {
    threshold_newly_crossed(referral, REFERRAL_TASK_THRESHOLD).then_some(REFERRAL_REWARD_POINTS)
}

/// Pure attribution decision for a signup that carried a referral code.
/// Returns the referrer to record against, or the warning explaining why
/// attribution was skipped.
fn check_attribution(code_owner: Option<User>, new_user: &User) -> Result<User, &'static str> {
    let referrer = code_owner.ok_or("Referral code not recognized, no referral recorded")?;

    if referrer.role.is_admin() {
        return Err("Admin referral codes do not earn rewards");
    }

    if referrer.id == new_user.id {
        return Err("You cannot refer yourself");
    }

    Ok(referrer)
}

#[derive(Debug, Clone)]
pub struct ReferralService {
    db_client: Arc<DBClient>,
}

impl ReferralService {
    pub fn new(db_client: Arc<DBClient>) -> Self {
        Self { db_client }
    }

    /// Every user holds exactly one code. Returns the oldest existing code
    /// and reactively cleans duplicates, or generates one lazily. The
    /// insert ignores conflicts on user_id, so a lost race falls through to
    /// re-reading the winner's code.
    pub async fn ensure_referral_code(&self, user_id: Uuid) -> Result<String, ServiceError> {
        let codes = self.db_client.get_codes_for_user(user_id).await?;

        if let Some(first) = codes.first() {
            if codes.len() > 1 {
                let db = self.db_client.clone();
                let keep_id = first.id;
                let deleted = retry_with_backoff(
                    "duplicate referral code cleanup",
                    3,
                    Duration::from_millis(200),
                    move || {
                        let db = db.clone();
                        async move { db.delete_codes_except(user_id, keep_id).await }
                    },
                )
                .await;

                match deleted {
                    Ok(n) => tracing::info!("Removed {} duplicate referral codes for {}", n, user_id),
                    Err(e) => tracing::warn!(
                        "Failed to clean duplicate referral codes for {}: {}",
                        user_id,
                        e
                    ),
                }
            }
            return Ok(first.code.clone());
        }

        let code = generate_referral_code();
        if let Some(inserted) = self.db_client.insert_code(user_id, &code).await? {
            return Ok(inserted.code);
        }

        // Conflict: a concurrent request inserted first, use its code.
        let codes = self.db_client.get_codes_for_user(user_id).await?;
        codes
            .first()
            .map(|c| c.code.clone())
            .ok_or(ServiceError::ReferralCodeUnavailable)
    }

    /// Signup-time attribution. The caller has already created the profile;
    /// nothing here may fail the signup. Returns a human-readable warning
    /// when attribution was skipped, and marks the oldest unconverted visit
    /// only when a referral was actually recorded.
    pub async fn record_signup(
        &self,
        new_user: &User,
        referral_code: Option<&str>,
    ) -> Result<Option<String>, ServiceError> {
        let code = match referral_code {
            Some(code) if !code.trim().is_empty() => code.trim(),
            _ => return Ok(None),
        };

        let code_owner = match self.db_client.get_code_owner(code).await {
            Ok(owner) => owner,
            Err(e) => {
                tracing::warn!("Referral code lookup failed during signup: {}", e);
                return Ok(Some("Referral could not be recorded".to_string()));
            }
        };

        let referrer = match check_attribution(code_owner, new_user) {
            Ok(referrer) => referrer,
            Err(warning) => {
                tracing::warn!(
                    "Signup {} via code {} skipped: {}",
                    new_user.email,
                    code,
                    warning
                );
                return Ok(Some(warning.to_string()));
            }
        };

        if let Err(e) = self
            .db_client
            .create_referral(referrer.id, new_user.id)
            .await
        {
            tracing::warn!(
                "Failed to create referral {} -> {}: {}",
                referrer.id,
                new_user.id,
                e
            );
            return Ok(Some("Referral could not be recorded".to_string()));
        }

        tracing::info!(
            "Referral recorded: {} referred {} via {}",
            referrer.email,
            new_user.email,
            code
        );

        // Conversion marking is best-effort bookkeeping on top of a valid
        // referral; a failure here never surfaces to the signup.
        let db = self.db_client.clone();
        let visit_code = code.to_string();
        let converted = retry_with_backoff(
            "mark referral visit converted",
            3,
            Duration::from_millis(200),
            move || {
                let db = db.clone();
                let code = visit_code.clone();
                async move { db.mark_oldest_visit_converted(&code).await }
            },
        )
        .await;

        match converted {
            Ok(0) => tracing::debug!("No unconverted visits for code {}", code),
            Ok(_) => tracing::debug!("Marked oldest visit converted for code {}", code),
            Err(e) => tracing::warn!("Failed to mark visit converted for code {}: {}", code, e),
        }

        Ok(None)
    }

    /// Called when a referred user completes a task. The counter increment,
    /// the reward flip and the referrer credit run in one transaction, so a
    /// failed credit rolls the flip back and a later completion retries it.
    pub async fn record_task_completion(&self, user_id: Uuid) -> Result<(), ServiceError> {
        let mut tx = self.db_client.pool.begin().await?;

        let updated = sqlx::query_as::<_, Referral>(
            r#"
            UPDATE referrals
            SET completed_task_count = completed_task_count + 1,
                points_awarded = completed_task_count + 1 >= $2,
                status = CASE
                    WHEN completed_task_count + 1 >= $2 THEN 'completed'::referral_status
                    ELSE status
                END
            WHERE referred_user_id = $1 AND points_awarded = false
            RETURNING
                id, referrer_id, referred_user_id, status,
                completed_task_count, points_awarded, created_at
            "#,
        )
        .bind(user_id)
        .bind(REFERRAL_TASK_THRESHOLD)
        .fetch_optional(&mut *tx)
        .await?;

        let referral = match updated {
            Some(referral) => referral,
            // Not referred, or points already awarded.
            None => {
                tx.rollback().await?;
                return Ok(());
            }
        };

        let credit = completion_credit(&referral);
        if let Some(points) = credit {
            sqlx::query("UPDATE users SET points = points + $1, updated_at = NOW() WHERE id = $2")
                .bind(points)
                .bind(referral.referrer_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        if let Some(points) = credit {
            tracing::info!(
                "Referral {} completed: credited {} points to {}",
                referral.id,
                points,
                referral.referrer_id
            );
        }

        Ok(())
    }

    pub async fn referral_stats(&self, user: &User) -> Result<ReferralStats, ServiceError> {
        let code = self.ensure_referral_code(user.id).await?;

        let (total_referrals, completed_referrals) =
            self.db_client.count_referrals(user.id).await?;
        let converted_visits = self.db_client.count_converted_visits(&code).await?;
        let referred_users = self.db_client.get_referred_users(user.id).await?;

        Ok(ReferralStats {
            total_referrals,
            completed_referrals,
            converted_visits,
            total_points_earned: completed_referrals * REFERRAL_REWARD_POINTS as i64,
            referred_users,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{referralmodel::ReferralStatus, usermodel::UserRole};

    fn user(role: UserRole) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password: None,
            role,
            points: 0,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn referral(count: i32, awarded: bool) -> Referral {
        Referral {
            id: Uuid::new_v4(),
            referrer_id: Uuid::new_v4(),
            referred_user_id: Uuid::new_v4(),
            status: if awarded {
                ReferralStatus::Completed
            } else {
                ReferralStatus::Pending
            },
            completed_task_count: count,
            points_awarded: awarded,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn code_is_eight_uppercase_base36_chars() {
        let code = generate_referral_code();
        assert_eq!(code.len(), 8);
        assert!(code
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn codes_are_not_constant() {
        let a = generate_referral_code();
        let b = generate_referral_code();
        // Same timestamp suffix is fine, the random prefix should differ.
        assert_ne!(a[..6], b[..6], "two generated codes shared a prefix");
    }

    #[test]
    fn link_points_at_signup_page() {
        let link = generate_referral_link("https://superintern.example", "XYZ123AB");
        assert_eq!(link, "https://superintern.example/signup?ref=XYZ123AB");
    }

    #[test]
    fn threshold_crossing_requires_exact_count_and_flag() {
        // The update that flipped the flag at exactly the threshold.
        assert!(threshold_newly_crossed(&referral(3, true), 3));

        // Counter below threshold, nothing to credit.
        assert!(!threshold_newly_crossed(&referral(2, false), 3));

        // Flag set with a higher count means an earlier update credited;
        // the WHERE guard should prevent this row from appearing at all.
        assert!(!threshold_newly_crossed(&referral(4, true), 3));
    }

    #[test]
    fn credit_owed_only_on_the_crossing_update() {
        assert_eq!(
            completion_credit(&referral(REFERRAL_TASK_THRESHOLD, true)),
            Some(REFERRAL_REWARD_POINTS)
        );
        assert_eq!(completion_credit(&referral(REFERRAL_TASK_THRESHOLD - 1, false)), None);
        assert_eq!(completion_credit(&referral(REFERRAL_TASK_THRESHOLD + 1, true)), None);
    }

    #[test]
    fn unknown_code_skips_attribution() {
        let new_user = user(UserRole::Intern);
        let warning = check_attribution(None, &new_user).unwrap_err();
        assert!(warning.contains("not recognized"));
    }

    #[test]
    fn admin_referrer_never_earns_a_referral() {
        let new_user = user(UserRole::Intern);
        let warning = check_attribution(Some(user(UserRole::Admin)), &new_user).unwrap_err();
        assert!(warning.contains("Admin"));
    }

    #[test]
    fn self_referral_skipped() {
        let new_user = user(UserRole::Intern);
        let warning = check_attribution(Some(new_user.clone()), &new_user).unwrap_err();
        assert!(warning.contains("yourself"));
    }

    #[test]
    fn intern_referrer_accepted() {
        let new_user = user(UserRole::Intern);
        let referrer = user(UserRole::Intern);
        let accepted = check_attribution(Some(referrer.clone()), &new_user).unwrap();
        assert_eq!(accepted.id, referrer.id);
    }
}
