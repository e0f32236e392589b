//! Capability Authority - The capability mint.
//!
//! This module implements [`CapabilityAuthority`], the sole entity authorized
//! to create capability tokens. It evaluates the acting [`Principal`] against
//! the requested [`AuthorityScope`], logs all grants, and issues unforgeable
//! tokens. Checks are pure functions of their inputs and take no locks.

use super::moderation::*;
use super::principal::Principal;
use super::tokens::{AuthorityScope, Cap, Capability};
use uuid::Uuid;
use tracing::{debug, trace};

// ============================================================================
// Request Method Generation Macros
// ============================================================================

/// Macro to generate scoped capability request methods (tier check only).
macro_rules! impl_scoped_cap_request {
    ($(
        $(#[$meta:meta])*
        $method:ident -> $cap:ident
    ),* $(,)?) => {
        $(
            $(#[$meta])*
            pub fn $method(&self, principal: &Principal, scope: AuthorityScope) -> Option<Cap<$cap>> {
                self.grant_if::<$cap>(
                    principal,
                    scope,
                    principal.can_act_at(scope.tier, scope.community_id),
                )
            }
        )*
    };
}

// ============================================================================
// Capability Authority
// ============================================================================

/// The Capability Authority - sole minter of capability tokens.
///
/// Each request:
///
/// 1. Evaluates the principal's authority against the scope
/// 2. Logs the capability grant (or denial) for audit
/// 3. Returns `Some(Cap<T>)` if authorized, `None` otherwise
#[derive(Debug, Default, Clone, Copy)]
pub struct CapabilityAuthority;

impl CapabilityAuthority {
    #[inline]
    pub fn new() -> Self {
        Self
    }

    fn grant_if<T: Capability<Scope = AuthorityScope>>(
        &self,
        principal: &Principal,
        scope: AuthorityScope,
        allowed: bool,
    ) -> Option<Cap<T>> {
        if allowed {
            self.log_grant::<T>(principal, &scope);
            Some(Cap::new(scope))
        } else {
            self.log_denial::<T>(principal, &scope);
            None
        }
    }

    /// Log a capability grant.
    fn log_grant<T: Capability>(&self, principal: &Principal, scope: &T::Scope)
    where
        T::Scope: std::fmt::Display,
    {
        debug!(
            capability = T::NAME,
            principal = %principal,
            scope = %scope,
            "Capability granted"
        );
    }

    /// Log a capability denial.
    fn log_denial<T: Capability>(&self, principal: &Principal, scope: &T::Scope)
    where
        T::Scope: std::fmt::Display,
    {
        trace!(
            capability = T::NAME,
            principal = %principal,
            scope = %scope,
            "Capability denied"
        );
    }

    // ========================================================================
    // Scoped Capability Requests
    // ========================================================================

    impl_scoped_cap_request! {
        /// Request capability to remove content at the given tier.
        request_removal_cap -> RemoveContentCap,

        /// Request capability to move a report through triage.
        request_triage_cap -> TriageReportCap,
    }

    /// Request capability to ban a member from `community_id`.
    pub fn request_ban_cap(
        &self,
        principal: &Principal,
        community_id: Uuid,
    ) -> Option<Cap<BanMemberCap>> {
        let scope = AuthorityScope::community(community_id);
        self.grant_if::<BanMemberCap>(
            principal,
            scope,
            principal.can_act_at(scope.tier, scope.community_id),
        )
    }

    /// Request capability to suspend a member platform-wide.
    pub fn request_suspension_cap(&self, principal: &Principal) -> Option<Cap<SuspendMemberCap>> {
        let scope = AuthorityScope::platform();
        self.grant_if::<SuspendMemberCap>(principal, scope, principal.can_act_at(scope.tier, None))
    }

    /// Request capability to review an appeal against a sanction issued at `scope`.
    ///
    /// Escalated appeals are reserved for admins whatever the sanction's tier.
    pub fn request_review_cap(
        &self,
        principal: &Principal,
        scope: AuthorityScope,
        escalated: bool,
    ) -> Option<Cap<ReviewAppealCap>> {
        let allowed = principal.can_act_at(scope.tier, scope.community_id)
            && (!escalated || matches!(principal, Principal::Admin { .. }));
        self.grant_if::<ReviewAppealCap>(principal, scope, allowed)
    }
}
