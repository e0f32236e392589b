//! sanctiond - moderation, sanction and appeal lifecycle engine.
//!
//! Turns abuse reports into scoped sanctions and runs the appeal protocol
//! that can uphold, lift or soften them.

pub mod caps;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod metrics;
pub mod moderation;
pub mod security;
pub mod telemetry;
