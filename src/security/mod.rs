//! Security module for sanctiond.
//!
//! Provides reporter trust tracking:
//! - **Reputation**: per-member trust score (0-100) consulted before a
//!   report is accepted, raised by reports that lead to action and
//!   lowered when the member is sanctioned

pub mod reputation;

pub use reputation::ReputationManager;

use crate::db::DbError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Source of reporter trust scores.
///
/// The `note_*` hooks run after the triggering transaction commits and
/// are best effort.
#[async_trait]
pub trait ReporterEligibility: Send + Sync {
    /// Trust score for a reporter (0-100). Unknown reporters score 0.
    async fn trust_score(&self, reporter_id: Uuid) -> Result<i32, DbError>;

    /// A report by `reporter_id` led to a moderation action.
    async fn note_actioned_report(&self, _reporter_id: Uuid, _at: DateTime<Utc>) {}

    /// `member_id` received a sanction.
    async fn note_sanction(&self, _member_id: Uuid, _at: DateTime<Utc>) {}
}
