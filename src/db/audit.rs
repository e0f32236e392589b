//! Append-only audit trail backed by `audit_log`.

use super::ports::{AuditEntry, AuditTrail};
use super::rows::{ts, uuid};
use super::{DbError, SqliteTx};
use async_trait::async_trait;
use uuid::Uuid;

#[derive(sqlx::FromRow)]
struct AuditRow {
    at: i64,
    actor_id: String,
    action: String,
    subject_kind: String,
    subject_id: String,
    detail: Option<String>,
}

impl TryFrom<AuditRow> for AuditEntry {
    type Error = DbError;

    fn try_from(row: AuditRow) -> Result<Self, DbError> {
        Ok(AuditEntry {
            at: ts("at", row.at)?,
            actor_id: uuid("actor_id", &row.actor_id)?,
            action: row.action,
            subject_kind: row.subject_kind,
            subject_id: uuid("subject_id", &row.subject_id)?,
            detail: row.detail,
        })
    }
}

#[async_trait]
impl AuditTrail for SqliteTx {
    async fn record(&mut self, entry: &AuditEntry) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO audit_log (at, actor_id, action, subject_kind, subject_id, detail)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.at.timestamp())
        .bind(entry.actor_id.to_string())
        .bind(&entry.action)
        .bind(&entry.subject_kind)
        .bind(entry.subject_id.to_string())
        .bind(entry.detail.as_deref())
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn entries_for(
        &mut self,
        subject_kind: &str,
        subject_id: Uuid,
    ) -> Result<Vec<AuditEntry>, DbError> {
        let rows = sqlx::query_as::<_, AuditRow>(
            r#"
            SELECT at, actor_id, action, subject_kind, subject_id, detail
            FROM audit_log
            WHERE subject_kind = ? AND subject_id = ?
            ORDER BY id
            "#,
        )
        .bind(subject_kind)
        .bind(subject_id.to_string())
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter().map(AuditEntry::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, Store, StoreTx};
    use chrono::DateTime;

    #[tokio::test]
    async fn entries_come_back_in_insertion_order() {
        let db = Database::new(":memory:").await.unwrap();
        let subject = Uuid::new_v4();
        let actor = Uuid::new_v4();
        let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();

        let mut tx = db.begin().await.unwrap();
        tx.record(&AuditEntry::new(at, actor, "appeal.submitted", "appeal", subject))
            .await
            .unwrap();
        tx.record(
            &AuditEntry::new(at, actor, "appeal.resolved", "appeal", subject)
                .with_detail("overturn"),
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let mut tx = db.begin().await.unwrap();
        let entries = tx.entries_for("appeal", subject).await.unwrap();
        let actions: Vec<_> = entries.iter().map(|e| e.action.as_str()).collect();
        assert_eq!(actions, ["appeal.submitted", "appeal.resolved"]);
        assert_eq!(entries[1].detail.as_deref(), Some("overturn"));
        assert!(tx.entries_for("report", subject).await.unwrap().is_empty());
    }
}
