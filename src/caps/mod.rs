//! Capability-based moderation permissions.
//!
//! Instead of scattered role checks, engine operations require possession
//! of a `Cap<T>` token to perform privileged actions.
//!
//! # Architecture
//!
//! 1. **[`Principal`]** - Who is acting: member, moderator of one community, or admin.
//!    [`Principal::can_act_at`] is the single tier/scope check.
//!
//! 2. **[`Cap<T>`](tokens::Cap)** - An unforgeable capability token proving authorization.
//!    Can only be created by [`CapabilityAuthority`](authority::CapabilityAuthority).
//!
//! 3. **[`CapabilityAuthority`](authority::CapabilityAuthority)** - The capability mint.
//!
//! # Usage
//!
//! ```ignore
//! let cap = authority
//!     .request_ban_cap(&principal, community_id)
//!     .ok_or_else(|| ModerationError::forbidden("not a moderator of this community"))?;
//! ```

mod authority;
mod moderation;
mod principal;
mod tokens;

pub use authority::CapabilityAuthority;
pub use moderation::{
    BanMemberCap, RemoveContentCap, ReviewAppealCap, SuspendMemberCap, TriageReportCap,
};
pub use principal::{Principal, Role};
pub use tokens::{AuthorityScope, Cap, Capability};
