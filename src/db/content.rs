//! Content directory: author and community of reportable content.
//!
//! The host application owns the content itself. It keeps this mirror up
//! to date through [`ContentRepository::upsert`]; the engine only reads it.

use super::ports::{ContentDirectory, ContentInfo};
use super::rows::{parse, uuid};
use super::{DbError, SqliteTx};
use async_trait::async_trait;
use sanction_proto::{ContentKind, TargetRef};
use sqlx::SqlitePool;
use uuid::Uuid;

#[derive(sqlx::FromRow)]
struct ContentRow {
    kind: String,
    id: String,
    author_id: String,
    community_id: String,
}

impl TryFrom<ContentRow> for ContentInfo {
    type Error = DbError;

    fn try_from(row: ContentRow) -> Result<Self, DbError> {
        let kind: ContentKind = parse("kind", &row.kind)?;
        Ok(ContentInfo {
            target: TargetRef::new(kind, uuid("id", &row.id)?),
            author_id: uuid("author_id", &row.author_id)?,
            community_id: uuid("community_id", &row.community_id)?,
        })
    }
}

/// Repository for the content mirror.
pub struct ContentRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ContentRepository<'a> {
    /// Create a new content repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Record or update the author and community of a piece of content.
    pub async fn upsert(
        &self,
        target: TargetRef,
        author_id: Uuid,
        community_id: Uuid,
    ) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO content_items (kind, id, author_id, community_id)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (kind, id) DO UPDATE SET
                author_id = excluded.author_id,
                community_id = excluded.community_id
            "#,
        )
        .bind(target.kind().as_str())
        .bind(target.id().to_string())
        .bind(author_id.to_string())
        .bind(community_id.to_string())
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Look up a piece of content outside any transaction.
    pub async fn get(&self, target: TargetRef) -> Result<Option<ContentInfo>, DbError> {
        let row = sqlx::query_as::<_, ContentRow>(
            "SELECT kind, id, author_id, community_id FROM content_items WHERE kind = ? AND id = ?",
        )
        .bind(target.kind().as_str())
        .bind(target.id().to_string())
        .fetch_optional(self.pool)
        .await?;

        row.map(ContentInfo::try_from).transpose()
    }
}

#[async_trait]
impl ContentDirectory for SqliteTx {
    async fn lookup(&mut self, target: TargetRef) -> Result<Option<ContentInfo>, DbError> {
        let row = sqlx::query_as::<_, ContentRow>(
            "SELECT kind, id, author_id, community_id FROM content_items WHERE kind = ? AND id = ?",
        )
        .bind(target.kind().as_str())
        .bind(target.id().to_string())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(ContentInfo::try_from).transpose()
    }
}
