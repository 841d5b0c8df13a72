use std::sync::Arc;

use domain::{
    ChangeFeed, Comment, CommentId, RemoteCommentStore, SessionProvider, SubjectId, ThreadError,
    ThreadResult, ValidationError,
};
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::editing::EditSession;
use crate::index;
use crate::store::{CommentStore, LoadStatus};
use crate::visibility::{ReplyVisibility, ScrollViewport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadEntry {
    pub comment: Comment,
    pub is_own: bool,
    pub is_editing: bool,
    pub reply_box_open: bool,
    pub reply_count: usize,
    pub expanded: bool,
    pub replies: Vec<ThreadEntry>,
}

pub struct SubjectView {
    store: CommentStore,
    editing: EditSession,
    visibility: ReplyVisibility,
    feed: Option<(CancellationToken, JoinHandle<()>)>,
}

impl SubjectView {
    pub fn new(remote: Arc<dyn RemoteCommentStore>, session: Arc<dyn SessionProvider>) -> Self {
        Self {
            store: CommentStore::new(remote, session),
            editing: EditSession::new(),
            visibility: ReplyVisibility::new(),
            feed: None,
        }
    }

    /// Subscribes to `subject`'s realtime channel, then loads it. Changes
    /// that arrive before the load finishes are merged into its result.
    ///
    /// A failed load is returned but leaves the view usable with an empty
    /// thread; live changes keep flowing.
    pub async fn open(&mut self, subject: SubjectId) -> ThreadResult<()> {
        self.stop_feed();
        self.editing = EditSession::new();
        self.visibility = ReplyVisibility::new();

        self.store.switch_subject(subject.clone());
        let feed = self.store.remote().subscribe(&subject);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(pump(self.store.clone(), feed, cancel.clone()));
        self.feed = Some((cancel, handle));
        info!("Opened subject view for {}", subject);

        self.store.load(subject).await
    }

    pub async fn reload(&mut self) -> ThreadResult<()> {
        let subject = self.store.subject().ok_or(ThreadError::NoSubject)?;
        self.store.load(subject).await
    }

    pub fn close(&mut self) {
        self.stop_feed();
        self.store.close();
        info!("Closed subject view");
    }

    fn stop_feed(&mut self) {
        if let Some((cancel, _handle)) = self.feed.take() {
            cancel.cancel();
        }
    }

    pub fn store(&self) -> &CommentStore {
        &self.store
    }

    pub fn session(&self) -> &EditSession {
        &self.editing
    }

    pub fn visibility(&self) -> &ReplyVisibility {
        &self.visibility
    }

    pub fn status(&self) -> LoadStatus {
        self.store.status()
    }

    pub async fn submit_comment(&mut self, content: &str) -> ThreadResult<Comment> {
        let parent = self.editing.reply_target().map(|r| r.id.clone());
        let saved = self.store.create(content, parent).await?;
        self.editing.finish_reply();
        Ok(saved)
    }

    pub fn start_reply(&mut self, id: &CommentId) -> ThreadResult<()> {
        let comment = self
            .store
            .get(id)
            .ok_or_else(|| ThreadError::NotFound(id.clone()))?;
        self.editing.start_reply(&comment)?;
        Ok(())
    }

    pub fn cancel_reply(&mut self) {
        self.editing.cancel_reply();
    }

    pub fn start_edit(&mut self, id: &CommentId) -> ThreadResult<()> {
        let comment = self
            .store
            .get(id)
            .ok_or_else(|| ThreadError::NotFound(id.clone()))?;
        self.editing.start_edit(comment.id, comment.content);
        Ok(())
    }

    pub fn set_edit_draft(&mut self, text: impl Into<String>) {
        self.editing.set_draft(text);
    }

    pub fn cancel_edit(&mut self) {
        self.editing.cancel_edit();
    }

    /// Saves the current draft. The edit slot stays open on failure so the
    /// draft is not lost.
    pub async fn submit_edit(&mut self) -> ThreadResult<Comment> {
        let target = self
            .editing
            .edit_target()
            .cloned()
            .ok_or(ValidationError::NoEditInProgress)?;
        let updated = self.store.edit(&target.id, &target.draft).await?;
        self.editing.finish_edit(&target.id);
        Ok(updated)
    }

    pub async fn remove(&mut self, id: &CommentId) -> ThreadResult<Vec<CommentId>> {
        let removed = self.store.remove(id).await?;
        self.editing.forget(&removed);
        self.visibility.forget(&removed);
        Ok(removed)
    }

    pub fn toggle_replies<V, F>(&mut self, parent: &CommentId, viewport: &mut V, relayout: F) -> bool
    where
        V: ScrollViewport,
        F: FnOnce(&mut V),
    {
        self.visibility.toggle_with(parent, viewport, relayout)
    }

    pub fn entries(&self) -> Vec<ThreadEntry> {
        let comments = self.store.snapshot();
        let me = self.store.current_user().map(|u| u.id);
        let entry = |c: &Comment, replies: Vec<ThreadEntry>| ThreadEntry {
            comment: c.clone(),
            is_own: me.as_ref().is_some_and(|id| c.is_authored_by(id)),
            is_editing: self.editing.is_editing(&c.id),
            reply_box_open: self.editing.is_replying_to(&c.id),
            reply_count: index::reply_count(&comments, &c.id),
            expanded: self.visibility.is_expanded(&c.id),
            replies,
        };

        index::top_level(&comments)
            .into_iter()
            .map(|top| {
                let replies = if self.visibility.is_expanded(&top.id) {
                    index::children_of(&comments, &top.id)
                        .into_iter()
                        .map(|r| entry(r, Vec::new()))
                        .collect()
                } else {
                    Vec::new()
                };
                entry(top, replies)
            })
            .collect()
    }
}

impl Drop for SubjectView {
    fn drop(&mut self) {
        self.stop_feed();
        self.store.close();
    }
}

async fn pump(store: CommentStore, mut feed: ChangeFeed, cancel: CancellationToken) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            next = feed.next() => match next {
                Some(event) => {
                    store.apply_remote_change(event);
                }
                None => {
                    warn!("Realtime feed ended");
                    break;
                }
            },
        }
    }
    debug!("Realtime pump stopped");
}
