//! # sanction-proto
//!
//! Shared vocabulary for the sanctiond moderation engine: violation
//! categories and the severity table, content and sanction references,
//! lifecycle states and the persisted entity records.
//!
//! Every enum has one canonical snake_case spelling, used for SQL columns,
//! JSON bodies and log fields alike.
//!
//! ```rust
//! use sanction_proto::{Severity, ViolationCategory};
//!
//! let category: ViolationCategory = "spam".parse().unwrap();
//! assert_eq!(category.severity(), Severity::Medium);
//! ```

#![deny(clippy::all)]

#[macro_use]
mod macros;

pub mod category;
pub mod entity;
pub mod error;
pub mod sanction;
pub mod status;
pub mod target;

pub use category::{Severity, ViolationCategory};
pub use entity::{
    Appeal, CommunityBan, ModerationAction, PenaltyModification, PlatformSuspension, Report,
    Sanction,
};
pub use error::ProtoError;
pub use sanction::{
    check_term, stored_expiration, term_in_effect, ActionStatus, ActionType, AppealType, SanctionRef, Tier,
};
pub use status::{AppealStatus, Decision, ReportStatus};
pub use target::{ContentKind, TargetRef};
