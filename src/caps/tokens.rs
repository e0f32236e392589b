//! Core capability token types.
//!
//! This module defines the unforgeable `Cap<T>` token and the `Capability` trait.

use sanction_proto::Tier;
use std::fmt;
use std::marker::PhantomData;
use uuid::Uuid;

/// An unforgeable capability token proving authorization.
///
/// This type can only be constructed within the `caps` module (via `pub(super)`),
/// ensuring that only [`CapabilityAuthority`](super::authority::CapabilityAuthority)
/// can mint tokens.
///
/// # Security Properties
///
/// - **Unforgeable**: `new()` is `pub(super)`, only Authority can create
/// - **Non-transferable**: `!Clone` and `!Copy` prevent token sharing
/// - **Scoped**: Contains the authority scope it was granted for
/// - **Typed**: Generic parameter prevents mixing capability types
pub struct Cap<T: Capability> {
    /// The resource this capability is scoped to.
    scope: T::Scope,
    /// Zero-sized marker for the capability type.
    _marker: PhantomData<T>,
}

// Explicitly NOT deriving Clone, Copy, or Default to prevent token leakage.

impl<T: Capability> Cap<T> {
    /// Create a new capability token.
    ///
    /// This is `pub(super)` to ensure only `CapabilityAuthority` can mint tokens.
    #[inline]
    pub(super) fn new(scope: T::Scope) -> Self {
        Self {
            scope,
            _marker: PhantomData,
        }
    }

    /// Get the scope of this capability.
    #[inline]
    pub fn scope(&self) -> &T::Scope {
        &self.scope
    }

    /// Consume the capability and return the scope.
    #[inline]
    pub fn into_scope(self) -> T::Scope {
        self.scope
    }
}

impl<T: Capability> fmt::Debug for Cap<T>
where
    T::Scope: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cap")
            .field("capability", &T::NAME)
            .field("scope", &self.scope)
            .finish()
    }
}

impl<T: Capability> fmt::Display for Cap<T>
where
    T::Scope: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cap<{}>({})", T::NAME, self.scope)
    }
}

/// Trait for capability types.
///
/// Each capability type defines:
/// - `Scope`: The type of resource it's scoped to
/// - `NAME`: A human-readable name for logging and debugging
pub trait Capability: 'static + Send + Sync {
    /// The type of resource this capability is scoped to.
    type Scope: Clone + Send + Sync;

    /// Human-readable name of this capability (for logging).
    const NAME: &'static str;
}

/// Where a granted capability may be exercised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorityScope {
    /// Tier the holder acts at.
    pub tier: Tier,
    /// Community the action is bounded to. `None` for platform-wide acts.
    pub community_id: Option<Uuid>,
}

impl AuthorityScope {
    pub fn platform() -> Self {
        Self {
            tier: Tier::Platform,
            community_id: None,
        }
    }

    pub fn community(community_id: Uuid) -> Self {
        Self {
            tier: Tier::Community,
            community_id: Some(community_id),
        }
    }
}

impl fmt::Display for AuthorityScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.community_id {
            Some(community) => write!(f, "{}:{}", self.tier, community),
            None => write!(f, "{}", self.tier),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test capability for unit tests
    struct TestCap;
    impl Capability for TestCap {
        type Scope = AuthorityScope;
        const NAME: &'static str = "test:cap";
    }

    #[test]
    fn cap_has_correct_scope() {
        let cap = Cap::<TestCap>::new(AuthorityScope::platform());
        assert_eq!(cap.scope().tier, Tier::Platform);
    }

    #[test]
    fn cap_into_scope_consumes() {
        let community = Uuid::new_v4();
        let cap = Cap::<TestCap>::new(AuthorityScope::community(community));
        let scope = cap.into_scope();
        assert_eq!(scope.community_id, Some(community));
    }

    #[test]
    fn cap_debug_format() {
        let cap = Cap::<TestCap>::new(AuthorityScope::platform());
        let debug = format!("{:?}", cap);
        assert!(debug.contains("test:cap"));
        assert!(debug.contains("Platform"));
    }

    #[test]
    fn cap_display_format() {
        let cap = Cap::<TestCap>::new(AuthorityScope::platform());
        assert_eq!(format!("{}", cap), "Cap<test:cap>(platform)");
    }
}
