//! Content references.

use crate::error::ProtoError;
use uuid::Uuid;

string_enum! {
    /// Kind of user-submitted content that can be reported or removed.
    pub enum ContentKind ("content kind") {
        Topic => "topic",
        Reply => "reply",
        Post => "post",
        Comment => "comment",
    }
}

/// Exactly one piece of content.
///
/// The enum shape makes "both" and "neither" unrepresentable; use
/// [`TargetRef::from_fields`] when decoding the four optional id fields a
/// client sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(tag = "kind", content = "id", rename_all = "snake_case")
)]
pub enum TargetRef {
    Topic(Uuid),
    Reply(Uuid),
    Post(Uuid),
    Comment(Uuid),
}

impl TargetRef {
    /// Build from the optional per-kind fields, requiring exactly one.
    pub fn from_fields(
        topic: Option<Uuid>,
        reply: Option<Uuid>,
        post: Option<Uuid>,
        comment: Option<Uuid>,
    ) -> Result<Self, ProtoError> {
        let set: Vec<TargetRef> = [
            topic.map(TargetRef::Topic),
            reply.map(TargetRef::Reply),
            post.map(TargetRef::Post),
            comment.map(TargetRef::Comment),
        ]
        .into_iter()
        .flatten()
        .collect();

        match set.as_slice() {
            [only] => Ok(*only),
            other => Err(ProtoError::TargetCardinality(other.len())),
        }
    }

    /// Rebuild from a stored `(kind, id)` pair.
    pub fn new(kind: ContentKind, id: Uuid) -> Self {
        match kind {
            ContentKind::Topic => TargetRef::Topic(id),
            ContentKind::Reply => TargetRef::Reply(id),
            ContentKind::Post => TargetRef::Post(id),
            ContentKind::Comment => TargetRef::Comment(id),
        }
    }

    pub fn kind(&self) -> ContentKind {
        match self {
            TargetRef::Topic(_) => ContentKind::Topic,
            TargetRef::Reply(_) => ContentKind::Reply,
            TargetRef::Post(_) => ContentKind::Post,
            TargetRef::Comment(_) => ContentKind::Comment,
        }
    }

    pub fn id(&self) -> Uuid {
        match *self {
            TargetRef::Topic(id)
            | TargetRef::Reply(id)
            | TargetRef::Post(id)
            | TargetRef::Comment(id) => id,
        }
    }
}

impl std::fmt::Display for TargetRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_one_field_is_accepted() {
        let id = Uuid::new_v4();
        let target = TargetRef::from_fields(None, None, Some(id), None).unwrap();
        assert_eq!(target, TargetRef::Post(id));
        assert_eq!(target.kind(), ContentKind::Post);
        assert_eq!(target.id(), id);
    }

    #[test]
    fn neither_is_rejected() {
        assert_eq!(
            TargetRef::from_fields(None, None, None, None),
            Err(ProtoError::TargetCardinality(0))
        );
    }

    #[test]
    fn both_are_rejected() {
        let err = TargetRef::from_fields(
            Some(Uuid::new_v4()),
            None,
            None,
            Some(Uuid::new_v4()),
        )
        .unwrap_err();
        assert_eq!(err, ProtoError::TargetCardinality(2));
    }

    #[test]
    fn new_round_trips_kind() {
        let id = Uuid::new_v4();
        for kind in ContentKind::ALL {
            assert_eq!(TargetRef::new(*kind, id).kind(), *kind);
        }
    }
}
