//! Parent/child queries over a flat comment list.
//!
//! Nothing here is cached: every call walks the slice it is given, so results
//! always match the collection they were computed from.

use domain::{Comment, CommentId};

pub fn top_level(comments: &[Comment]) -> Vec<&Comment> {
    comments.iter().filter(|c| c.parent_id.is_none()).collect()
}

pub fn children_of<'a>(comments: &'a [Comment], id: &CommentId) -> Vec<&'a Comment> {
    comments
        .iter()
        .filter(|c| c.parent_id.as_ref() == Some(id))
        .collect()
}

pub fn reply_count(comments: &[Comment], id: &CommentId) -> usize {
    comments
        .iter()
        .filter(|c| c.parent_id.as_ref() == Some(id))
        .count()
}
