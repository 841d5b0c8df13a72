use async_trait::async_trait;
use domain::{
    ChangeFeed, Comment, CommentId, CommentPatch, NewComment, RemoteCommentStore, RemoteError,
    SubjectId,
};
use tokio_stream::{wrappers::BroadcastStream, StreamExt};
use tracing::{info, warn};

use crate::Db;

fn backend(e: anyhow::Error) -> RemoteError {
    RemoteError::Backend(format!("{e:#}"))
}

#[async_trait]
impl RemoteCommentStore for Db {
    async fn select(&self, subject: &SubjectId) -> Result<Vec<Comment>, RemoteError> {
        self.list_comments(subject.as_str()).await.map_err(backend)
    }

    async fn insert(&self, comment: NewComment) -> Result<Comment, RemoteError> {
        let parent = comment.parent_id.clone();
        match (self.insert_comment(&comment).await.map_err(backend)?, parent) {
            (Some(saved), _) => Ok(saved),
            (None, Some(parent)) => Err(RemoteError::NotFound(parent)),
            (None, None) => Err(RemoteError::Backend("insert produced no row".into())),
        }
    }

    async fn update(&self, id: &CommentId, patch: CommentPatch) -> Result<Comment, RemoteError> {
        self.update_comment_content(id.as_str(), &patch.content)
            .await
            .map_err(backend)?
            .ok_or_else(|| RemoteError::NotFound(id.clone()))
    }

    async fn delete(&self, id: &CommentId) -> Result<(), RemoteError> {
        self.delete_comment(id.as_str())
            .await
            .map_err(backend)?
            .map(|_| ())
            .ok_or_else(|| RemoteError::NotFound(id.clone()))
    }

    fn subscribe(&self, subject: &SubjectId) -> ChangeFeed {
        let rx = self.changes.subscribe();
        let subject = subject.clone();
        info!("Realtime feed opened: subject={}", subject);

        let stream = BroadcastStream::new(rx).filter_map(move |result| match result {
            Ok(change) if change.subject_id == subject => Some(change.event),
            Ok(_) => None,
            Err(lagged) => {
                warn!("Realtime feed for {} lagged: {}", subject, lagged);
                None
            }
        });
        Box::pin(stream)
    }
}
