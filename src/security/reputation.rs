//! Reputation System
//!
//! Tracks member behavior over time to assign a Trust Score (0-100).
//! Reporters below the configured threshold cannot file reports.
//!
//! Scores move on two events:
//! - a report by the member led to a moderation action (+1)
//! - the member was sanctioned (configurable penalty)

use super::ReporterEligibility;
use crate::db::DbError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, warn};
use uuid::Uuid;

/// Trust lost when a member receives a sanction.
pub const SANCTION_PENALTY: i32 = 10;

#[derive(Debug, Clone)]
pub struct ReputationManager {
    pool: SqlitePool,
}

impl ReputationManager {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the trust score for a member (0-100).
    /// Returns 0 if the member is unknown.
    pub async fn get_trust_score(&self, member: Uuid) -> Result<i32, DbError> {
        let score =
            sqlx::query_scalar::<_, i32>("SELECT trust_score FROM reputation WHERE entity = ?")
                .bind(member.to_string())
                .fetch_optional(&self.pool)
                .await?;

        Ok(score.unwrap_or(0))
    }

    /// Record a report that led to action.
    /// New members start at 10; existing members gain +1, capped at 100.
    pub async fn record_actioned_report(&self, member: Uuid, now: DateTime<Utc>) {
        let sql = r#"
            INSERT INTO reputation (entity, trust_score, first_seen, last_seen, violations)
            VALUES (?, 10, ?, ?, 0)
            ON CONFLICT(entity) DO UPDATE SET
                trust_score = MIN(100, trust_score + 1),
                last_seen = excluded.last_seen
        "#;

        if let Err(e) = sqlx::query(sql)
            .bind(member.to_string())
            .bind(now.timestamp())
            .bind(now.timestamp())
            .execute(&self.pool)
            .await
        {
            warn!(member = %member, error = %e, "Failed to record actioned report");
        }
    }

    /// Record a sanction against a member.
    /// Decreases trust score, never below 0. Returns the new score.
    pub async fn record_violation(&self, member: Uuid, penalty: i32, now: DateTime<Utc>) -> i32 {
        // Ensure record exists (start at 0 trust if new offender), then deduct
        let sql = r#"
            INSERT INTO reputation (entity, trust_score, first_seen, last_seen, violations)
            VALUES (?, MAX(0, 0 - ?), ?, ?, 1)
            ON CONFLICT(entity) DO UPDATE SET
                trust_score = MAX(0, trust_score - ?),
                last_seen = excluded.last_seen,
                violations = violations + 1
            RETURNING trust_score
        "#;

        match sqlx::query_scalar::<_, i32>(sql)
            .bind(member.to_string())
            .bind(penalty)
            .bind(now.timestamp())
            .bind(now.timestamp())
            .bind(penalty)
            .fetch_one(&self.pool)
            .await
        {
            Ok(new_score) => {
                debug!(member = %member, penalty, new_score, "Reputation penalty applied");
                new_score
            }
            Err(e) => {
                warn!(member = %member, error = %e, "Failed to record violation");
                0
            }
        }
    }

    /// Set a member's score directly (operator tooling and tests).
    pub async fn set_trust_score(
        &self,
        member: Uuid,
        score: i32,
        now: DateTime<Utc>,
    ) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO reputation (entity, trust_score, first_seen, last_seen, violations)
            VALUES (?, ?, ?, ?, 0)
            ON CONFLICT(entity) DO UPDATE SET
                trust_score = excluded.trust_score,
                last_seen = excluded.last_seen
            "#,
        )
        .bind(member.to_string())
        .bind(score.clamp(0, 100))
        .bind(now.timestamp())
        .bind(now.timestamp())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl ReporterEligibility for ReputationManager {
    async fn trust_score(&self, reporter_id: Uuid) -> Result<i32, DbError> {
        self.get_trust_score(reporter_id).await
    }

    async fn note_actioned_report(&self, reporter_id: Uuid, at: DateTime<Utc>) {
        self.record_actioned_report(reporter_id, at).await;
    }

    async fn note_sanction(&self, member_id: Uuid, at: DateTime<Utc>) {
        self.record_violation(member_id, SANCTION_PENALTY, at).await;
    }
}
