//! Row shapes for the three sanction tables.

use super::super::DbError;
use super::super::rows::{opt_ts, opt_uuid, parse, ts, uuid};
use sanction_proto::{
    CommunityBan, ContentKind, ModerationAction, PlatformSuspension, TargetRef,
};

#[derive(sqlx::FromRow)]
pub(super) struct ActionRow {
    id: String,
    report_id: Option<String>,
    actor_id: String,
    target_kind: String,
    target_id: String,
    content_author_id: String,
    community_id: String,
    action_type: String,
    removal_type: String,
    reason_category: String,
    reason_text: String,
    internal_notes: Option<String>,
    status: String,
    is_active: bool,
    created_at: i64,
}

impl TryFrom<ActionRow> for ModerationAction {
    type Error = DbError;

    fn try_from(row: ActionRow) -> Result<Self, DbError> {
        let kind: ContentKind = parse("target_kind", &row.target_kind)?;
        Ok(ModerationAction {
            id: uuid("id", &row.id)?,
            report_id: opt_uuid("report_id", row.report_id.as_deref())?,
            actor_id: uuid("actor_id", &row.actor_id)?,
            target: TargetRef::new(kind, uuid("target_id", &row.target_id)?),
            content_author_id: uuid("content_author_id", &row.content_author_id)?,
            community_id: uuid("community_id", &row.community_id)?,
            action_type: parse("action_type", &row.action_type)?,
            removal_type: parse("removal_type", &row.removal_type)?,
            reason_category: parse("reason_category", &row.reason_category)?,
            reason_text: row.reason_text,
            internal_notes: row.internal_notes,
            status: parse("status", &row.status)?,
            is_active: row.is_active,
            created_at: ts("created_at", row.created_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(super) struct BanRow {
    id: String,
    community_id: String,
    user_id: String,
    issued_by: String,
    reason_category: String,
    reason_text: String,
    is_permanent: bool,
    expiration_date: Option<i64>,
    is_active: bool,
    created_at: i64,
}

impl TryFrom<BanRow> for CommunityBan {
    type Error = DbError;

    fn try_from(row: BanRow) -> Result<Self, DbError> {
        Ok(CommunityBan {
            id: uuid("id", &row.id)?,
            community_id: uuid("community_id", &row.community_id)?,
            user_id: uuid("user_id", &row.user_id)?,
            issued_by: uuid("issued_by", &row.issued_by)?,
            reason_category: parse("reason_category", &row.reason_category)?,
            reason_text: row.reason_text,
            is_permanent: row.is_permanent,
            expiration_date: opt_ts("expiration_date", row.expiration_date)?,
            is_active: row.is_active,
            created_at: ts("created_at", row.created_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(super) struct SuspensionRow {
    id: String,
    user_id: String,
    issued_by: String,
    reason_category: String,
    reason_text: String,
    is_permanent: bool,
    expiration_date: Option<i64>,
    is_active: bool,
    created_at: i64,
}

impl TryFrom<SuspensionRow> for PlatformSuspension {
    type Error = DbError;

    fn try_from(row: SuspensionRow) -> Result<Self, DbError> {
        Ok(PlatformSuspension {
            id: uuid("id", &row.id)?,
            user_id: uuid("user_id", &row.user_id)?,
            issued_by: uuid("issued_by", &row.issued_by)?,
            reason_category: parse("reason_category", &row.reason_category)?,
            reason_text: row.reason_text,
            is_permanent: row.is_permanent,
            expiration_date: opt_ts("expiration_date", row.expiration_date)?,
            is_active: row.is_active,
            created_at: ts("created_at", row.created_at)?,
        })
    }
}
