//! Error types for the moderation vocabulary.

use thiserror::Error;

/// Errors raised while building or parsing protocol values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtoError {
    /// A string did not name any variant of the expected enum.
    #[error("unknown {kind}: {value:?}")]
    UnknownVariant {
        /// Enum being parsed (e.g. "violation category").
        kind: &'static str,
        /// Offending input.
        value: String,
    },

    /// A report must reference exactly one piece of content.
    #[error("exactly one target must be set, got {0}")]
    TargetCardinality(usize),

    /// An appeal must reference exactly one sanction.
    #[error("exactly one sanction reference must be set, got {0}")]
    SanctionCardinality(usize),

    /// `is_permanent = true` with an expiration date.
    #[error("permanent sanctions cannot carry an expiration date")]
    PermanentWithExpiration,

    /// `is_permanent = false` without an expiration date.
    #[error("temporary sanctions require an expiration date")]
    TemporaryWithoutExpiration,

    /// Expiration date not strictly in the future.
    #[error("expiration date must be in the future")]
    ExpirationInPast,
}
