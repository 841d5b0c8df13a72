use crate::models::{CommentId, UserId};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("comment {0} not found")]
    NotFound(CommentId),
    #[error("backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("comment content cannot be empty")]
    EmptyContent,
    #[error("parent comment {0} does not belong to this subject")]
    UnknownParent(CommentId),
    #[error("only top-level comments can be replied to ({0} is a reply)")]
    NotTopLevel(CommentId),
    #[error("no edit in progress")]
    NoEditInProgress,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthorizationError {
    #[error("you must be signed in")]
    NotSignedIn,
    #[error("user {user} is not the author of comment {comment}")]
    NotAuthor { user: UserId, comment: CommentId },
}

#[derive(Debug, Error)]
pub enum ThreadError {
    #[error("failed to load comments: {0}")]
    Fetch(#[source] RemoteError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),
    #[error("remote write failed: {0}")]
    Remote(#[from] RemoteError),
    #[error("comment {0} is not in this thread")]
    NotFound(CommentId),
    #[error("no subject is open")]
    NoSubject,
}

pub type ThreadResult<T> = Result<T, ThreadError>;
