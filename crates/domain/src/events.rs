use crate::models::{Comment, CommentId, SubjectId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "record", rename_all = "snake_case")]
pub enum ChangeEvent {
    Inserted(Comment),
    Updated(Comment),
    Deleted(CommentId),
}

impl ChangeEvent {
    pub fn comment_id(&self) -> &CommentId {
        match self {
            ChangeEvent::Inserted(c) | ChangeEvent::Updated(c) => &c.id,
            ChangeEvent::Deleted(id) => id,
        }
    }

    /// `None` for deletions, which only carry the id.
    pub fn subject_id(&self) -> Option<&SubjectId> {
        match self {
            ChangeEvent::Inserted(c) | ChangeEvent::Updated(c) => Some(&c.subject_id),
            ChangeEvent::Deleted(_) => None,
        }
    }
}

/// A change as published by a backend, tagged with the subject it belongs to
/// so subscribers can filter a shared channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectChange {
    pub subject_id: SubjectId,
    pub event: ChangeEvent,
}
