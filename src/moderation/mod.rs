//! The moderation engine.
//!
//! Five components share one [`Engine`]:
//! - [`ReportIntake`]: validates, deduplicates, rate limits and classifies reports
//! - [`SanctionAuthority`]: applies removals, bans and suspensions; report triage
//! - the sanction registry, reached through [`crate::db::SanctionRegistry`]
//! - [`AppealProcess`]: files appeals, starts review, escalates
//! - [`AppealResolution`]: applies reviewer decisions to appeal and sanction
//!
//! Every operation reads the clock once, runs in one store transaction and
//! writes an audit row in that same transaction.

mod appeals;
mod authority;
mod intake;
mod resolution;

pub use appeals::{AppealProcess, AppealRequest};
pub use authority::{
    ActionRequest, BanRequest, ContentState, MemberStanding, SanctionAuthority, SuspensionRequest,
};
pub use intake::{ReportIntake, ReportRequest};
pub use resolution::{AppealOutcome, AppealResolution, ResolutionRequest};

use crate::caps::{AuthorityScope, CapabilityAuthority, Principal};
use crate::clock::{Clock, SystemClock};
use crate::config::{AppealPolicy, ReportPolicy};
use crate::db::{AuditEntry, AuditTrail, Store};
use crate::error::{ModerationError, ModerationResult};
use crate::security::ReporterEligibility;
use sanction_proto::{Sanction, SanctionRef};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Audit subject kinds.
pub mod subject {
    use sanction_proto::SanctionRef;

    pub const REPORT: &str = "report";
    pub const APPEAL: &str = "appeal";

    pub fn sanction(sanction: SanctionRef) -> &'static str {
        match sanction {
            SanctionRef::ModerationAction(_) => "moderation_action",
            SanctionRef::CommunityBan(_) => "community_ban",
            SanctionRef::PlatformSuspension(_) => "platform_suspension",
        }
    }
}

/// Shared state for the moderation components.
pub struct Engine<S: Store> {
    store: S,
    clock: Arc<dyn Clock>,
    eligibility: Arc<dyn ReporterEligibility>,
    authority: CapabilityAuthority,
    reports: ReportPolicy,
    appeals: AppealPolicy,
}

impl<S: Store> Engine<S> {
    pub fn new(
        store: S,
        eligibility: Arc<dyn ReporterEligibility>,
        reports: ReportPolicy,
        appeals: AppealPolicy,
    ) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            eligibility,
            authority: CapabilityAuthority::new(),
            reports,
            appeals,
        }
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn intake(&self) -> ReportIntake<'_, S> {
        ReportIntake::new(self)
    }

    pub fn authority(&self) -> SanctionAuthority<'_, S> {
        SanctionAuthority::new(self)
    }

    pub fn appeals(&self) -> AppealProcess<'_, S> {
        AppealProcess::new(self)
    }

    pub fn resolution(&self) -> AppealResolution<'_, S> {
        AppealResolution::new(self)
    }

    /// Audit rows for one subject, oldest first. Admins only.
    pub async fn audit_trail(
        &self,
        principal: &Principal,
        subject_kind: &str,
        subject_id: Uuid,
    ) -> ModerationResult<Vec<AuditEntry>> {
        if !matches!(principal, Principal::Admin { .. }) {
            return Err(ModerationError::forbidden("audit trail is restricted to admins"));
        }
        let mut tx = self.store.begin().await?;
        Ok(tx.entries_for(subject_kind, subject_id).await?)
    }
}

/// Authority scope a sanction was issued at.
pub(crate) fn scope_of(sanction: &Sanction) -> AuthorityScope {
    AuthorityScope {
        tier: sanction.tier(),
        community_id: sanction.community_id(),
    }
}

/// Audit row for a sanction.
pub(crate) fn sanction_entry(
    at: chrono::DateTime<chrono::Utc>,
    actor: Uuid,
    action: &str,
    sanction: SanctionRef,
) -> AuditEntry {
    AuditEntry::new(at, actor, action, subject::sanction(sanction), sanction.id())
}

/// Record a refused request before handing the error back.
pub(crate) fn observe<T>(
    operation: &'static str,
    result: ModerationResult<T>,
) -> ModerationResult<T> {
    if let Err(ref e) = result {
        crate::metrics::record_rejection(operation, e.error_code());
        if e.is_retryable() {
            tracing::warn!(operation, error = %e, "Operation failed");
        } else {
            debug!(operation, kind = e.error_code(), error = %e, "Request refused");
        }
    }
    result
}

/// Trimmed text must be non-empty and at most `max` characters.
pub(crate) fn require_text(field: &str, text: &str, max: usize) -> ModerationResult<()> {
    let len = text.trim().chars().count();
    if len == 0 {
        return Err(ModerationError::validation(format!("{field} is required")));
    }
    if len > max {
        return Err(ModerationError::validation(format!(
            "{field} exceeds {max} characters"
        )));
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn text_bounds() {
        assert!(require_text("reason_text", "   ", 10).is_err());
        assert!(require_text("reason_text", "ok", 10).is_ok());
        assert!(require_text("reason_text", "ü".repeat(10).as_str(), 10).is_ok());
        assert!(require_text("reason_text", "ü".repeat(11).as_str(), 10).is_err());
    }

    #[tokio::test]
    async fn audit_trail_is_admin_only() {
        let f = fixture().await;
        let moderator = moderator(Uuid::new_v4());
        let err = f
            .engine
            .audit_trail(&moderator, subject::REPORT, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, ModerationError::Authorization(_)));

        let entries = f
            .engine
            .audit_trail(&admin(), subject::REPORT, Uuid::new_v4())
            .await
            .unwrap();
        assert!(entries.is_empty());
    }
}
