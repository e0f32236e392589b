//! Appeal ledger backed by the `appeals` table.
//!
//! The three nullable sanction columns carry the [`SanctionRef`]; a CHECK
//! constraint keeps exactly one of them set, and partial unique indexes
//! allow at most one open appeal per sanction.

use super::ports::{AppealDecisionRecord, AppealLedger};
use super::rows::{opt_ts, opt_uuid, parse, ts, uuid};
use super::{DbError, SqliteTx, unique_or};
use async_trait::async_trait;
use sanction_proto::{Appeal, PenaltyModification, SanctionRef};
use uuid::Uuid;

const APPEAL_COLUMNS: &str = "id, appellant_id, appeal_type, moderation_action_id, \
     community_ban_id, platform_suspension_id, appeal_text, status, decision_explanation, \
     penalty_days, is_escalated, expected_resolution_at, reviewer_id, reviewed_at, created_at";

/// Column holding the reference for a sanction kind.
fn column_of(sanction: SanctionRef) -> &'static str {
    match sanction {
        SanctionRef::ModerationAction(_) => "moderation_action_id",
        SanctionRef::CommunityBan(_) => "community_ban_id",
        SanctionRef::PlatformSuspension(_) => "platform_suspension_id",
    }
}

/// Split a reference into the three stored columns.
fn columns(sanction: SanctionRef) -> (Option<String>, Option<String>, Option<String>) {
    let id = Some(sanction.id().to_string());
    match sanction {
        SanctionRef::ModerationAction(_) => (id, None, None),
        SanctionRef::CommunityBan(_) => (None, id, None),
        SanctionRef::PlatformSuspension(_) => (None, None, id),
    }
}

#[derive(sqlx::FromRow)]
struct AppealRow {
    id: String,
    appellant_id: String,
    appeal_type: String,
    moderation_action_id: Option<String>,
    community_ban_id: Option<String>,
    platform_suspension_id: Option<String>,
    appeal_text: String,
    status: String,
    decision_explanation: Option<String>,
    penalty_days: Option<i64>,
    is_escalated: bool,
    expected_resolution_at: i64,
    reviewer_id: Option<String>,
    reviewed_at: Option<i64>,
    created_at: i64,
}

impl TryFrom<AppealRow> for Appeal {
    type Error = DbError;

    fn try_from(row: AppealRow) -> Result<Self, DbError> {
        let sanction = SanctionRef::from_fields(
            opt_uuid("moderation_action_id", row.moderation_action_id.as_deref())?,
            opt_uuid("community_ban_id", row.community_ban_id.as_deref())?,
            opt_uuid("platform_suspension_id", row.platform_suspension_id.as_deref())?,
        )
        .map_err(|e| DbError::Corrupt(format!("appeal {}: {e}", row.id)))?;

        let penalty_modification = row
            .penalty_days
            .map(|days| {
                u32::try_from(days)
                    .map(|duration_days| PenaltyModification { duration_days })
                    .map_err(|_| DbError::Corrupt(format!("penalty_days: {days}")))
            })
            .transpose()?;

        Ok(Appeal {
            id: uuid("id", &row.id)?,
            appellant_id: uuid("appellant_id", &row.appellant_id)?,
            sanction,
            appeal_type: parse("appeal_type", &row.appeal_type)?,
            appeal_text: row.appeal_text,
            status: parse("status", &row.status)?,
            decision_explanation: row.decision_explanation,
            penalty_modification,
            is_escalated: row.is_escalated,
            expected_resolution_at: ts("expected_resolution_at", row.expected_resolution_at)?,
            reviewer_id: opt_uuid("reviewer_id", row.reviewer_id.as_deref())?,
            reviewed_at: opt_ts("reviewed_at", row.reviewed_at)?,
            created_at: ts("created_at", row.created_at)?,
        })
    }
}

#[async_trait]
impl AppealLedger for SqliteTx {
    async fn insert_appeal(&mut self, appeal: &Appeal) -> Result<(), DbError> {
        let (action_id, ban_id, suspension_id) = columns(appeal.sanction);

        sqlx::query(
            r#"
            INSERT INTO appeals (id, appellant_id, appeal_type, moderation_action_id,
                community_ban_id, platform_suspension_id, appeal_text, status,
                decision_explanation, penalty_days, is_escalated, expected_resolution_at,
                reviewer_id, reviewed_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(appeal.id.to_string())
        .bind(appeal.appellant_id.to_string())
        .bind(appeal.appeal_type.as_str())
        .bind(action_id)
        .bind(ban_id)
        .bind(suspension_id)
        .bind(&appeal.appeal_text)
        .bind(appeal.status.as_str())
        .bind(appeal.decision_explanation.as_deref())
        .bind(appeal.penalty_modification.map(|m| i64::from(m.duration_days)))
        .bind(appeal.is_escalated)
        .bind(appeal.expected_resolution_at.timestamp())
        .bind(appeal.reviewer_id.map(|id| id.to_string()))
        .bind(appeal.reviewed_at.map(|at| at.timestamp()))
        .bind(appeal.created_at.timestamp())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| unique_or(e, &format!("open appeal for {}", appeal.sanction)))?;

        Ok(())
    }

    async fn find_appeal(&mut self, id: Uuid) -> Result<Option<Appeal>, DbError> {
        let sql = format!("SELECT {APPEAL_COLUMNS} FROM appeals WHERE id = ?");
        let row = sqlx::query_as::<_, AppealRow>(&sql)
            .bind(id.to_string())
            .fetch_optional(&mut *self.tx)
            .await?;

        row.map(Appeal::try_from).transpose()
    }

    async fn open_appeal_for(&mut self, sanction: SanctionRef) -> Result<Option<Appeal>, DbError> {
        let sql = format!(
            "SELECT {APPEAL_COLUMNS} FROM appeals \
             WHERE {} = ? AND status IN ('pending', 'under_review') \
             LIMIT 1",
            column_of(sanction)
        );
        let row = sqlx::query_as::<_, AppealRow>(&sql)
            .bind(sanction.id().to_string())
            .fetch_optional(&mut *self.tx)
            .await?;

        row.map(Appeal::try_from).transpose()
    }

    async fn appeals_for(&mut self, sanction: SanctionRef) -> Result<Vec<Appeal>, DbError> {
        let sql = format!(
            "SELECT {APPEAL_COLUMNS} FROM appeals WHERE {} = ? ORDER BY created_at, rowid",
            column_of(sanction)
        );
        let rows = sqlx::query_as::<_, AppealRow>(&sql)
            .bind(sanction.id().to_string())
            .fetch_all(&mut *self.tx)
            .await?;

        rows.into_iter().map(Appeal::try_from).collect()
    }

    async fn mark_under_review(&mut self, id: Uuid, reviewer_id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query(
            "UPDATE appeals SET status = 'under_review', reviewer_id = ? \
             WHERE id = ? AND status = 'pending'",
        )
        .bind(reviewer_id.to_string())
        .bind(id.to_string())
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_escalated(&mut self, id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query(
            "UPDATE appeals SET is_escalated = 1 \
             WHERE id = ? AND status IN ('pending', 'under_review')",
        )
        .bind(id.to_string())
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn record_decision(
        &mut self,
        id: Uuid,
        decision: &AppealDecisionRecord,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(
            r#"
            UPDATE appeals
            SET status = ?, decision_explanation = ?, penalty_days = ?,
                reviewer_id = ?, reviewed_at = ?
            WHERE id = ? AND status IN ('pending', 'under_review')
            "#,
        )
        .bind(decision.status.as_str())
        .bind(&decision.decision_explanation)
        .bind(
            decision
                .penalty_modification
                .map(|m| i64::from(m.duration_days)),
        )
        .bind(decision.reviewer_id.to_string())
        .bind(decision.reviewed_at.timestamp())
        .bind(id.to_string())
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
