//! Acting principals and the single tier check every operation goes through.

use sanction_proto::Tier;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Who is making a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Principal {
    Member { id: Uuid },
    /// Moderates exactly one community.
    Moderator { id: Uuid, community_id: Uuid },
    Admin { id: Uuid },
}

/// Role names as carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Member,
    Moderator,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "member" => Ok(Role::Member),
            "moderator" => Ok(Role::Moderator),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role {other:?}")),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Principal {
    pub fn id(&self) -> Uuid {
        match *self {
            Principal::Member { id } | Principal::Moderator { id, .. } | Principal::Admin { id } => {
                id
            }
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Principal::Member { .. } => Role::Member,
            Principal::Moderator { .. } => Role::Moderator,
            Principal::Admin { .. } => Role::Admin,
        }
    }

    /// Highest tier this principal can act at, if any.
    pub fn tier(&self) -> Option<Tier> {
        match self {
            Principal::Member { .. } => None,
            Principal::Moderator { .. } => Some(Tier::Community),
            Principal::Admin { .. } => Some(Tier::Platform),
        }
    }

    /// Whether this principal may act at `required` tier within `community`.
    ///
    /// Admins act anywhere. Moderators act at community tier, and only in
    /// the community they moderate. Members never hold moderation authority.
    pub fn can_act_at(&self, required: Tier, community: Option<Uuid>) -> bool {
        match *self {
            Principal::Admin { .. } => true,
            Principal::Moderator { community_id, .. } => {
                required == Tier::Community && community == Some(community_id)
            }
            Principal::Member { .. } => false,
        }
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.role(), self.id())
    }
}
