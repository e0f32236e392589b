//! Sanction tiers, references and term rules.

use crate::error::ProtoError;
use chrono::{DateTime, SubsecRound, Utc};
use uuid::Uuid;

string_enum! {
    /// Authority level a sanction or principal operates at.
    ///
    /// `Platform` dominates `Community`.
    #[derive(PartialOrd, Ord)]
    pub enum Tier ("tier") {
        Community => "community",
        Platform => "platform",
    }
}

string_enum! {
    /// Kind of sanction an appeal contests. Mirrors [`SanctionRef`].
    pub enum AppealType ("appeal type") {
        ContentRemoval => "content_removal",
        CommunityBan => "community_ban",
        PlatformSuspension => "platform_suspension",
    }
}

string_enum! {
    /// What a moderation action does to its target.
    pub enum ActionType ("action type") {
        Remove => "remove",
    }
}

string_enum! {
    /// Moderation actions are applied synchronously and are never queued.
    pub enum ActionStatus ("action status") {
        Completed => "completed",
    }
}

/// Reference to exactly one sanction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(tag = "kind", content = "id", rename_all = "snake_case")
)]
pub enum SanctionRef {
    ModerationAction(Uuid),
    CommunityBan(Uuid),
    PlatformSuspension(Uuid),
}

impl SanctionRef {
    /// Build from the three optional id fields, requiring exactly one.
    pub fn from_fields(
        moderation_action_id: Option<Uuid>,
        community_ban_id: Option<Uuid>,
        platform_suspension_id: Option<Uuid>,
    ) -> Result<Self, ProtoError> {
        let set: Vec<SanctionRef> = [
            moderation_action_id.map(SanctionRef::ModerationAction),
            community_ban_id.map(SanctionRef::CommunityBan),
            platform_suspension_id.map(SanctionRef::PlatformSuspension),
        ]
        .into_iter()
        .flatten()
        .collect();

        match set.as_slice() {
            [only] => Ok(*only),
            other => Err(ProtoError::SanctionCardinality(other.len())),
        }
    }

    pub fn id(&self) -> Uuid {
        match *self {
            SanctionRef::ModerationAction(id)
            | SanctionRef::CommunityBan(id)
            | SanctionRef::PlatformSuspension(id) => id,
        }
    }

    /// The appeal type that contests this kind of sanction.
    pub fn appeal_type(&self) -> AppealType {
        match self {
            SanctionRef::ModerationAction(_) => AppealType::ContentRemoval,
            SanctionRef::CommunityBan(_) => AppealType::CommunityBan,
            SanctionRef::PlatformSuspension(_) => AppealType::PlatformSuspension,
        }
    }
}

impl std::fmt::Display for SanctionRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.appeal_type(), self.id())
    }
}

/// Expiration dates are stored with whole-second precision.
#[inline]
pub fn stored_expiration(expiration_date: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    expiration_date.map(|at| at.trunc_subsecs(0))
}

/// Check the permanent/expiration mutual exclusion for a new term.
///
/// Permanent terms carry no expiration; temporary terms carry one that is
/// strictly after `now`.
pub fn check_term(
    is_permanent: bool,
    expiration_date: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<(), ProtoError> {
    match (is_permanent, expiration_date) {
        (true, None) => Ok(()),
        (true, Some(_)) => Err(ProtoError::PermanentWithExpiration),
        (false, None) => Err(ProtoError::TemporaryWithoutExpiration),
        (false, Some(at)) if at <= now => Err(ProtoError::ExpirationInPast),
        (false, Some(_)) => Ok(()),
    }
}

/// Whether a ban or suspension currently restricts its subject.
#[inline]
pub fn term_in_effect(
    is_active: bool,
    is_permanent: bool,
    expiration_date: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    is_active && (is_permanent || expiration_date.is_some_and(|at| at > now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn sanction_ref_requires_exactly_one() {
        let id = Uuid::new_v4();
        assert_eq!(
            SanctionRef::from_fields(None, Some(id), None),
            Ok(SanctionRef::CommunityBan(id))
        );
        assert_eq!(
            SanctionRef::from_fields(None, None, None),
            Err(ProtoError::SanctionCardinality(0))
        );
        assert_eq!(
            SanctionRef::from_fields(Some(id), None, Some(id)),
            Err(ProtoError::SanctionCardinality(2))
        );
    }

    #[test]
    fn appeal_type_mirrors_reference() {
        let id = Uuid::new_v4();
        assert_eq!(
            SanctionRef::ModerationAction(id).appeal_type(),
            AppealType::ContentRemoval
        );
        assert_eq!(
            SanctionRef::PlatformSuspension(id).appeal_type(),
            AppealType::PlatformSuspension
        );
    }

    #[test]
    fn term_rules() {
        let now = Utc::now();
        assert_eq!(check_term(true, None, now), Ok(()));
        assert_eq!(
            check_term(true, Some(now + Duration::days(1)), now),
            Err(ProtoError::PermanentWithExpiration)
        );
        assert_eq!(
            check_term(false, None, now),
            Err(ProtoError::TemporaryWithoutExpiration)
        );
        assert_eq!(
            check_term(false, Some(now), now),
            Err(ProtoError::ExpirationInPast)
        );
        assert_eq!(check_term(false, Some(now + Duration::seconds(1)), now), Ok(()));
    }

    #[test]
    fn sub_second_expiration_is_truncated() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let expires = stored_expiration(Some(now + Duration::milliseconds(500)));
        assert_eq!(expires, Some(now));
        assert_eq!(
            check_term(false, expires, now),
            Err(ProtoError::ExpirationInPast)
        );
    }

    #[test]
    fn expired_terms_are_not_in_effect() {
        let now = Utc::now();
        assert!(term_in_effect(true, true, None, now));
        assert!(term_in_effect(true, false, Some(now + Duration::hours(1)), now));
        assert!(!term_in_effect(true, false, Some(now - Duration::hours(1)), now));
        assert!(!term_in_effect(false, true, None, now));
    }

    #[test]
    fn platform_dominates_community() {
        assert!(Tier::Platform > Tier::Community);
    }
}
