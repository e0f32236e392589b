//! Moderation capability types.
//!
//! Defines the concrete capability types for sanction and appeal operations:
//! - Enforcement capabilities (remove content, ban, suspend)
//! - Review capabilities (triage reports, review appeals)

use super::tokens::{AuthorityScope, Capability};

/// Macro to define capability types with minimal boilerplate.
///
/// # Variants
///
/// - `scoped($name, $cap_name)` - Tier/community scoped capability (Scope = AuthorityScope)
macro_rules! define_capability {
    (scoped $name:ident, $cap_name:literal, $doc:literal) => {
        #[doc = $doc]
        ///
        /// Scope: Authority tier and community.
        pub struct $name;

        impl Capability for $name {
            type Scope = AuthorityScope;
            const NAME: &'static str = $cap_name;
        }
    };
}

// ============================================================================
// Enforcement Capabilities
// ============================================================================

define_capability!(scoped RemoveContentCap, "content:remove",
    "Capability to remove content. Required: moderator of the content's community (community tier) or admin.");

define_capability!(scoped BanMemberCap, "member:ban",
    "Capability to ban a member from one community. Required: moderator of that community or admin.");

define_capability!(scoped SuspendMemberCap, "member:suspend",
    "Capability to suspend a member platform-wide. Required: admin.");

// ============================================================================
// Review Capabilities
// ============================================================================

define_capability!(scoped TriageReportCap, "report:triage",
    "Capability to move a report through triage. Required: moderator of the target's community or admin.");

define_capability!(scoped ReviewAppealCap, "appeal:review",
    "Capability to review and resolve an appeal. Required: authority at or above the sanction's tier; admin once escalated.");
