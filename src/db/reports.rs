//! Report log backed by the `reports` table.

use super::ports::{ReportCounts, ReportLog};
use super::rows::{parse, ts, uuid};
use super::{DbError, SqliteTx};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sanction_proto::{ContentKind, Report, ReportStatus, TargetRef};
use uuid::Uuid;

#[derive(sqlx::FromRow)]
struct ReportRow {
    id: String,
    reporter_id: String,
    target_kind: String,
    target_id: String,
    violation_category: String,
    severity_level: String,
    status: String,
    explanation: Option<String>,
    created_at: i64,
}

impl TryFrom<ReportRow> for Report {
    type Error = DbError;

    fn try_from(row: ReportRow) -> Result<Self, DbError> {
        let kind: ContentKind = parse("target_kind", &row.target_kind)?;
        Ok(Report {
            id: uuid("id", &row.id)?,
            reporter_id: uuid("reporter_id", &row.reporter_id)?,
            target: TargetRef::new(kind, uuid("target_id", &row.target_id)?),
            violation_category: parse("violation_category", &row.violation_category)?,
            severity_level: parse("severity_level", &row.severity_level)?,
            status: parse("status", &row.status)?,
            explanation: row.explanation,
            created_at: ts("created_at", row.created_at)?,
        })
    }
}

#[async_trait]
impl ReportLog for SqliteTx {
    async fn insert_report(&mut self, report: &Report) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO reports (id, reporter_id, target_kind, target_id, violation_category,
                                 severity_level, status, explanation, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(report.id.to_string())
        .bind(report.reporter_id.to_string())
        .bind(report.target.kind().as_str())
        .bind(report.target.id().to_string())
        .bind(report.violation_category.as_str())
        .bind(report.severity_level.as_str())
        .bind(report.status.as_str())
        .bind(report.explanation.as_deref())
        .bind(report.created_at.timestamp())
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn find_report(&mut self, id: Uuid) -> Result<Option<Report>, DbError> {
        let row = sqlx::query_as::<_, ReportRow>(
            r#"
            SELECT id, reporter_id, target_kind, target_id, violation_category,
                   severity_level, status, explanation, created_at
            FROM reports
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(Report::try_from).transpose()
    }

    async fn report_counts(
        &mut self,
        reporter_id: Uuid,
        hour_since: DateTime<Utc>,
        day_since: DateTime<Utc>,
    ) -> Result<ReportCounts, DbError> {
        // One statement so both windows see the same snapshot.
        let (last_hour, last_day) = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT COALESCE(SUM(created_at > ?), 0), COUNT(*)
            FROM reports
            WHERE reporter_id = ? AND created_at > ?
            "#,
        )
        .bind(hour_since.timestamp())
        .bind(reporter_id.to_string())
        .bind(day_since.timestamp())
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(ReportCounts {
            last_hour: u32::try_from(last_hour).unwrap_or(u32::MAX),
            last_day: u32::try_from(last_day).unwrap_or(u32::MAX),
        })
    }

    async fn recent_report_on(
        &mut self,
        reporter_id: Uuid,
        target: TargetRef,
        since: DateTime<Utc>,
    ) -> Result<Option<Uuid>, DbError> {
        let id = sqlx::query_scalar::<_, String>(
            r#"
            SELECT id FROM reports
            WHERE reporter_id = ? AND target_kind = ? AND target_id = ? AND created_at > ?
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(reporter_id.to_string())
        .bind(target.kind().as_str())
        .bind(target.id().to_string())
        .bind(since.timestamp())
        .fetch_optional(&mut *self.tx)
        .await?;

        id.map(|id| uuid("id", &id)).transpose()
    }

    async fn set_report_status(
        &mut self,
        id: Uuid,
        from: ReportStatus,
        to: ReportStatus,
    ) -> Result<bool, DbError> {
        let result = sqlx::query("UPDATE reports SET status = ? WHERE id = ? AND status = ?")
            .bind(to.as_str())
            .bind(id.to_string())
            .bind(from.as_str())
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, Store, StoreTx};
    use chrono::Duration;
    use sanction_proto::ViolationCategory;

    fn report(reporter: Uuid, target: TargetRef, at: DateTime<Utc>) -> Report {
        Report {
            id: Uuid::new_v4(),
            reporter_id: reporter,
            target,
            violation_category: ViolationCategory::Spam,
            severity_level: ViolationCategory::Spam.severity(),
            status: ReportStatus::Pending,
            explanation: None,
            created_at: at,
        }
    }

    #[tokio::test]
    async fn insert_and_find() {
        let db = Database::new(":memory:").await.unwrap();
        let r = report(
            Uuid::new_v4(),
            TargetRef::Comment(Uuid::new_v4()),
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        );

        let mut tx = db.begin().await.unwrap();
        tx.insert_report(&r).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = db.begin().await.unwrap();
        assert_eq!(tx.find_report(r.id).await.unwrap(), Some(r));
    }

    #[tokio::test]
    async fn counts_split_by_window() {
        let db = Database::new(":memory:").await.unwrap();
        let reporter = Uuid::new_v4();
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();

        let mut tx = db.begin().await.unwrap();
        for offset in [Duration::minutes(5), Duration::hours(3), Duration::hours(30)] {
            let r = report(reporter, TargetRef::Post(Uuid::new_v4()), now - offset);
            tx.insert_report(&r).await.unwrap();
        }
        let counts = tx
            .report_counts(reporter, now - Duration::hours(1), now - Duration::hours(24))
            .await
            .unwrap();
        assert_eq!(counts, ReportCounts { last_hour: 1, last_day: 2 });
    }

    #[tokio::test]
    async fn status_is_compare_and_set() {
        let db = Database::new(":memory:").await.unwrap();
        let r = report(Uuid::new_v4(), TargetRef::Topic(Uuid::new_v4()), Utc::now());

        let mut tx = db.begin().await.unwrap();
        tx.insert_report(&r).await.unwrap();
        assert!(
            tx.set_report_status(r.id, ReportStatus::Pending, ReportStatus::Resolved)
                .await
                .unwrap()
        );
        assert!(
            !tx.set_report_status(r.id, ReportStatus::Pending, ReportStatus::Dismissed)
                .await
                .unwrap()
        );
    }
}
