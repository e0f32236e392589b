//! [`SanctionRegistry`] over SQLite.

use super::models::{ActionRow, BanRow, SuspensionRow};
use crate::db::ports::SanctionRegistry;
use crate::db::{DbError, SqliteTx};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sanction_proto::{
    CommunityBan, ModerationAction, PlatformSuspension, Sanction, SanctionRef, TargetRef,
};
use uuid::Uuid;

const ACTION_COLUMNS: &str = "id, report_id, actor_id, target_kind, target_id, content_author_id, \
     community_id, action_type, removal_type, reason_category, reason_text, internal_notes, \
     status, is_active, created_at";

const BAN_COLUMNS: &str = "id, community_id, user_id, issued_by, reason_category, reason_text, \
     is_permanent, expiration_date, is_active, created_at";

const SUSPENSION_COLUMNS: &str = "id, user_id, issued_by, reason_category, reason_text, \
     is_permanent, expiration_date, is_active, created_at";

/// Table holding a given sanction kind.
fn table_of(sanction: SanctionRef) -> &'static str {
    match sanction {
        SanctionRef::ModerationAction(_) => "moderation_actions",
        SanctionRef::CommunityBan(_) => "community_bans",
        SanctionRef::PlatformSuspension(_) => "platform_suspensions",
    }
}

#[async_trait]
impl SanctionRegistry for SqliteTx {
    async fn insert_action(&mut self, action: &ModerationAction) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO moderation_actions (id, report_id, actor_id, target_kind, target_id,
                content_author_id, community_id, action_type, removal_type, reason_category,
                reason_text, internal_notes, status, is_active, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(action.id.to_string())
        .bind(action.report_id.map(|id| id.to_string()))
        .bind(action.actor_id.to_string())
        .bind(action.target.kind().as_str())
        .bind(action.target.id().to_string())
        .bind(action.content_author_id.to_string())
        .bind(action.community_id.to_string())
        .bind(action.action_type.as_str())
        .bind(action.removal_type.as_str())
        .bind(action.reason_category.as_str())
        .bind(&action.reason_text)
        .bind(action.internal_notes.as_deref())
        .bind(action.status.as_str())
        .bind(action.is_active)
        .bind(action.created_at.timestamp())
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn insert_ban(&mut self, ban: &CommunityBan) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO community_bans (id, community_id, user_id, issued_by, reason_category,
                reason_text, is_permanent, expiration_date, is_active, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(ban.id.to_string())
        .bind(ban.community_id.to_string())
        .bind(ban.user_id.to_string())
        .bind(ban.issued_by.to_string())
        .bind(ban.reason_category.as_str())
        .bind(&ban.reason_text)
        .bind(ban.is_permanent)
        .bind(ban.expiration_date.map(|at| at.timestamp()))
        .bind(ban.is_active)
        .bind(ban.created_at.timestamp())
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn insert_suspension(
        &mut self,
        suspension: &PlatformSuspension,
    ) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO platform_suspensions (id, user_id, issued_by, reason_category,
                reason_text, is_permanent, expiration_date, is_active, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(suspension.id.to_string())
        .bind(suspension.user_id.to_string())
        .bind(suspension.issued_by.to_string())
        .bind(suspension.reason_category.as_str())
        .bind(&suspension.reason_text)
        .bind(suspension.is_permanent)
        .bind(suspension.expiration_date.map(|at| at.timestamp()))
        .bind(suspension.is_active)
        .bind(suspension.created_at.timestamp())
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn get(&mut self, sanction: SanctionRef) -> Result<Option<Sanction>, DbError> {
        let id = sanction.id().to_string();
        match sanction {
            SanctionRef::ModerationAction(_) => {
                let sql = format!("SELECT {ACTION_COLUMNS} FROM moderation_actions WHERE id = ?");
                let row = sqlx::query_as::<_, ActionRow>(&sql)
                    .bind(id)
                    .fetch_optional(&mut *self.tx)
                    .await?;
                row.map(|r| ModerationAction::try_from(r).map(Sanction::ModerationAction))
                    .transpose()
            }
            SanctionRef::CommunityBan(_) => {
                let sql = format!("SELECT {BAN_COLUMNS} FROM community_bans WHERE id = ?");
                let row = sqlx::query_as::<_, BanRow>(&sql)
                    .bind(id)
                    .fetch_optional(&mut *self.tx)
                    .await?;
                row.map(|r| CommunityBan::try_from(r).map(Sanction::CommunityBan))
                    .transpose()
            }
            SanctionRef::PlatformSuspension(_) => {
                let sql =
                    format!("SELECT {SUSPENSION_COLUMNS} FROM platform_suspensions WHERE id = ?");
                let row = sqlx::query_as::<_, SuspensionRow>(&sql)
                    .bind(id)
                    .fetch_optional(&mut *self.tx)
                    .await?;
                row.map(|r| PlatformSuspension::try_from(r).map(Sanction::PlatformSuspension))
                    .transpose()
            }
        }
    }

    async fn set_active(&mut self, sanction: SanctionRef, active: bool) -> Result<bool, DbError> {
        let sql = format!("UPDATE {} SET is_active = ? WHERE id = ?", table_of(sanction));
        let result = sqlx::query(&sql)
            .bind(active)
            .bind(sanction.id().to_string())
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn modify_expiration(
        &mut self,
        sanction: SanctionRef,
        expiration_date: Option<DateTime<Utc>>,
        is_permanent: bool,
    ) -> Result<bool, DbError> {
        if matches!(sanction, SanctionRef::ModerationAction(_)) {
            return Ok(false);
        }

        let sql = format!(
            "UPDATE {} SET is_permanent = ?, expiration_date = ? WHERE id = ?",
            table_of(sanction)
        );
        let result = sqlx::query(&sql)
            .bind(is_permanent)
            .bind(expiration_date.map(|at| at.timestamp()))
            .bind(sanction.id().to_string())
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn active_actions_on(
        &mut self,
        target: TargetRef,
    ) -> Result<Vec<ModerationAction>, DbError> {
        let sql = format!(
            "SELECT {ACTION_COLUMNS} FROM moderation_actions \
             WHERE target_kind = ? AND target_id = ? AND is_active = 1 \
             ORDER BY created_at"
        );
        let rows = sqlx::query_as::<_, ActionRow>(&sql)
            .bind(target.kind().as_str())
            .bind(target.id().to_string())
            .fetch_all(&mut *self.tx)
            .await?;

        rows.into_iter().map(ModerationAction::try_from).collect()
    }

    async fn active_bans_for(
        &mut self,
        user_id: Uuid,
        community_id: Uuid,
    ) -> Result<Vec<CommunityBan>, DbError> {
        let sql = format!(
            "SELECT {BAN_COLUMNS} FROM community_bans \
             WHERE user_id = ? AND community_id = ? AND is_active = 1 \
             ORDER BY created_at"
        );
        let rows = sqlx::query_as::<_, BanRow>(&sql)
            .bind(user_id.to_string())
            .bind(community_id.to_string())
            .fetch_all(&mut *self.tx)
            .await?;

        rows.into_iter().map(CommunityBan::try_from).collect()
    }

    async fn active_suspensions_for(
        &mut self,
        user_id: Uuid,
    ) -> Result<Vec<PlatformSuspension>, DbError> {
        let sql = format!(
            "SELECT {SUSPENSION_COLUMNS} FROM platform_suspensions \
             WHERE user_id = ? AND is_active = 1 \
             ORDER BY created_at"
        );
        let rows = sqlx::query_as::<_, SuspensionRow>(&sql)
            .bind(user_id.to_string())
            .fetch_all(&mut *self.tx)
            .await?;

        rows.into_iter().map(PlatformSuspension::try_from).collect()
    }
}
