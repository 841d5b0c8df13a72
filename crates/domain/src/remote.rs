use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::RemoteError;
use crate::events::ChangeEvent;
use crate::models::{Comment, CommentId, CommentPatch, NewComment, SessionUser, SubjectId};

pub type ChangeFeed = BoxStream<'static, ChangeEvent>;

#[async_trait]
pub trait RemoteCommentStore: Send + Sync {
    /// All comments of a subject, newest `updated_at` first.
    async fn select(&self, subject: &SubjectId) -> Result<Vec<Comment>, RemoteError>;

    async fn insert(&self, comment: NewComment) -> Result<Comment, RemoteError>;

    async fn update(&self, id: &CommentId, patch: CommentPatch) -> Result<Comment, RemoteError>;

    /// Fails with [`RemoteError::NotFound`] when the row is already gone.
    async fn delete(&self, id: &CommentId) -> Result<(), RemoteError>;

    fn subscribe(&self, subject: &SubjectId) -> ChangeFeed;
}

pub trait SessionProvider: Send + Sync {
    fn current_user(&self) -> Option<SessionUser>;
}
