use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use domain::{
    AuthorizationError, ChangeEvent, Comment, CommentId, CommentPatch, NewComment,
    RemoteCommentStore, SessionProvider, SessionUser, SubjectId, ThreadError, ThreadResult,
    ValidationError,
};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::{deletion, index};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    Idle,
    Loading,
    Ready,
    /// The initial fetch failed; live changes are still applied.
    Failed(String),
}

#[derive(Debug)]
struct StoreState {
    subject: Option<SubjectId>,
    comments: Vec<Comment>,
    status: LoadStatus,
    pending: Vec<ChangeEvent>,
    /// Ids removed during this subject's lifetime; later inserts/updates for
    /// them are stale.
    removed: HashSet<CommentId>,
    generation: u64,
    closed: bool,
}

impl StoreState {
    fn is_live(&self, generation: u64) -> bool {
        !self.closed && self.generation == generation
    }

    fn find(&self, id: &CommentId) -> Option<&Comment> {
        self.comments.iter().find(|c| c.id == *id)
    }

    fn accept(&mut self, event: ChangeEvent) -> bool {
        match self.status {
            LoadStatus::Idle => {
                debug!("No subject loaded, dropping change for {}", event.comment_id());
                false
            }
            LoadStatus::Loading => {
                self.pending.push(event);
                false
            }
            LoadStatus::Ready | LoadStatus::Failed(_) => self.reconcile(event),
        }
    }

    fn reconcile(&mut self, event: ChangeEvent) -> bool {
        if let Some(subject) = event.subject_id() {
            if self.subject.as_ref() != Some(subject) {
                debug!("Ignoring change for foreign subject {}", subject);
                return false;
            }
        }
        match event {
            ChangeEvent::Inserted(c) | ChangeEvent::Updated(c) => self.upsert(c),
            ChangeEvent::Deleted(id) => self.remove_ids([id]) > 0,
        }
    }

    fn upsert(&mut self, incoming: Comment) -> bool {
        if self.removed.contains(&incoming.id) {
            debug!("Ignoring change for removed comment {}", incoming.id);
            return false;
        }
        match self.comments.iter_mut().find(|c| c.id == incoming.id) {
            Some(existing) if *existing == incoming => false,
            Some(existing) if incoming.updated_at >= existing.updated_at => {
                *existing = incoming;
                true
            }
            Some(existing) => {
                debug!(
                    "Ignoring stale change for {} ({} < {})",
                    incoming.id, incoming.updated_at, existing.updated_at
                );
                false
            }
            None => {
                self.comments.push(incoming);
                true
            }
        }
    }

    fn remove_ids(&mut self, ids: impl IntoIterator<Item = CommentId>) -> usize {
        self.removed.extend(ids);
        let before = self.comments.len();
        self.comments.retain(|c| !self.removed.contains(&c.id));
        before - self.comments.len()
    }
}

/// Local view of one subject's comments, reconciled with a remote backend.
///
/// Cloning is cheap and every clone shares the same state, so a realtime
/// pump can hold one while the UI holds another. The state lock is never held
/// across a remote call.
#[derive(Clone)]
pub struct CommentStore {
    remote: Arc<dyn RemoteCommentStore>,
    session: Arc<dyn SessionProvider>,
    state: Arc<Mutex<StoreState>>,
    revision: Arc<watch::Sender<u64>>,
}

impl CommentStore {
    pub fn new(remote: Arc<dyn RemoteCommentStore>, session: Arc<dyn SessionProvider>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            remote,
            session,
            state: Arc::new(Mutex::new(StoreState {
                subject: None,
                comments: Vec::new(),
                status: LoadStatus::Idle,
                pending: Vec::new(),
                removed: HashSet::new(),
                generation: 0,
                closed: false,
            })),
            revision: Arc::new(revision),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn bump(&self) {
        self.revision.send_modify(|r| *r += 1);
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub(crate) fn remote(&self) -> &Arc<dyn RemoteCommentStore> {
        &self.remote
    }

    pub fn current_user(&self) -> Option<SessionUser> {
        self.session.current_user()
    }

    /// Starts buffering for `subject`, reopening a closed store. Changes
    /// applied from now on are merged into the next [`load`](Self::load) for
    /// the same subject. Returns the new generation.
    pub fn switch_subject(&self, subject: SubjectId) -> u64 {
        let generation = {
            let mut st = self.lock();
            st.generation += 1;
            st.closed = false;
            let same_pending_load =
                st.status == LoadStatus::Loading && st.subject.as_ref() == Some(&subject);
            if !same_pending_load {
                st.pending.clear();
                st.removed.clear();
                st.comments.clear();
                st.subject = Some(subject);
                st.status = LoadStatus::Loading;
            }
            st.generation
        };
        self.bump();
        generation
    }

    pub async fn load(&self, subject: SubjectId) -> ThreadResult<()> {
        let generation = self.switch_subject(subject.clone());
        info!("Loading comments for subject {}", subject);

        let fetched = self.remote.select(&subject).await;

        let result = {
            let mut st = self.lock();
            if !st.is_live(generation) {
                debug!("Discarding superseded load of {}", subject);
                return Ok(());
            }
            let result = match fetched {
                Ok(mut comments) => {
                    comments.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
                    comments.retain(|c| !st.removed.contains(&c.id));
                    info!("Loaded {} comments for {}", comments.len(), subject);
                    st.comments = comments;
                    st.status = LoadStatus::Ready;
                    Ok(())
                }
                Err(e) => {
                    error!("Failed to load comments for {}: {}", subject, e);
                    st.comments.clear();
                    st.status = LoadStatus::Failed(e.to_string());
                    Err(ThreadError::Fetch(e))
                }
            };
            let pending = std::mem::take(&mut st.pending);
            if !pending.is_empty() {
                debug!("Merging {} buffered changes", pending.len());
            }
            for event in pending {
                st.reconcile(event);
            }
            result
        };
        self.bump();
        result
    }

    /// Folds one realtime notification into the collection. Duplicates,
    /// stale updates and deletes of absent ids are no-ops.
    pub fn apply_remote_change(&self, event: ChangeEvent) -> bool {
        let changed = {
            let mut st = self.lock();
            if st.closed {
                return false;
            }
            st.accept(event)
        };
        if changed {
            self.bump();
        }
        changed
    }

    pub async fn create(
        &self,
        content: &str,
        parent_id: Option<CommentId>,
    ) -> ThreadResult<Comment> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ValidationError::EmptyContent.into());
        }
        let user = self
            .session
            .current_user()
            .ok_or(AuthorizationError::NotSignedIn)?;

        let (subject, generation) = {
            let st = self.lock();
            let subject = match (&st.subject, st.closed) {
                (Some(s), false) => s.clone(),
                _ => return Err(ThreadError::NoSubject),
            };
            if let Some(parent) = &parent_id {
                if st.find(parent).is_none() {
                    return Err(ValidationError::UnknownParent(parent.clone()).into());
                }
            }
            (subject, st.generation)
        };

        let saved = self
            .remote
            .insert(NewComment {
                subject_id: subject,
                author_id: user.id,
                author_username: user.username,
                content: content.to_string(),
                parent_id,
            })
            .await
            .map_err(|e| {
                error!("Failed to post comment: {}", e);
                ThreadError::Remote(e)
            })?;
        info!("Posted comment {}", saved.id);

        self.commit(generation, ChangeEvent::Inserted(saved.clone()));
        Ok(saved)
    }

    pub async fn edit(&self, id: &CommentId, new_content: &str) -> ThreadResult<Comment> {
        let content = new_content.trim();
        if content.is_empty() {
            return Err(ValidationError::EmptyContent.into());
        }
        let generation = self.authorize(id)?;

        let updated = self
            .remote
            .update(
                id,
                CommentPatch {
                    content: content.to_string(),
                },
            )
            .await
            .map_err(|e| {
                error!("Failed to edit comment {}: {}", id, e);
                ThreadError::Remote(e)
            })?;
        info!("Edited comment {}", id);

        self.commit(generation, ChangeEvent::Updated(updated.clone()));
        Ok(updated)
    }

    pub async fn remove(&self, id: &CommentId) -> ThreadResult<Vec<CommentId>> {
        let generation = self.authorize(id)?;

        let deleted = deletion::delete_subtree(self.remote.as_ref(), id, |node| {
            self.children_ids(node)
        })
        .await
        .map_err(|e| {
            error!("Failed to remove comment {}: {}", id, e);
            ThreadError::Remote(e)
        })?;

        let removed = {
            let mut st = self.lock();
            if !st.is_live(generation) {
                debug!("View moved on, not applying removal of {}", id);
                return Ok(deleted);
            }
            st.remove_ids(deleted.iter().cloned())
        };
        info!("Removed comment {} ({} local rows)", id, removed);
        self.bump();
        Ok(deleted)
    }

    fn authorize(&self, id: &CommentId) -> ThreadResult<u64> {
        let user = self
            .session
            .current_user()
            .ok_or(AuthorizationError::NotSignedIn)?;
        let st = self.lock();
        let comment = st
            .find(id)
            .ok_or_else(|| ThreadError::NotFound(id.clone()))?;
        if !comment.is_authored_by(&user.id) {
            warn!("User {} tried to modify comment {} they did not write", user.id, id);
            return Err(AuthorizationError::NotAuthor {
                user: user.id,
                comment: id.clone(),
            }
            .into());
        }
        Ok(st.generation)
    }

    fn commit(&self, generation: u64, event: ChangeEvent) {
        let changed = {
            let mut st = self.lock();
            if !st.is_live(generation) {
                debug!("View moved on, dropping local copy of {}", event.comment_id());
                return;
            }
            st.accept(event)
        };
        if changed {
            self.bump();
        }
    }

    fn children_ids(&self, id: &CommentId) -> Vec<CommentId> {
        let st = self.lock();
        index::children_of(&st.comments, id)
            .into_iter()
            .map(|c| c.id.clone())
            .collect()
    }

    pub fn close(&self) {
        {
            let mut st = self.lock();
            st.closed = true;
            st.subject = None;
            st.comments.clear();
            st.pending.clear();
            st.removed.clear();
            st.status = LoadStatus::Idle;
        }
        self.bump();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn status(&self) -> LoadStatus {
        self.lock().status.clone()
    }

    pub fn subject(&self) -> Option<SubjectId> {
        self.lock().subject.clone()
    }

    pub fn snapshot(&self) -> Vec<Comment> {
        self.lock().comments.clone()
    }

    pub fn get(&self, id: &CommentId) -> Option<Comment> {
        self.lock().find(id).cloned()
    }

    pub fn top_level(&self) -> Vec<Comment> {
        let st = self.lock();
        index::top_level(&st.comments).into_iter().cloned().collect()
    }

    pub fn children_of(&self, id: &CommentId) -> Vec<Comment> {
        let st = self.lock();
        index::children_of(&st.comments, id)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn top_level_count(&self) -> usize {
        index::top_level(&self.lock().comments).len()
    }

    pub fn reply_count(&self, id: &CommentId) -> usize {
        index::reply_count(&self.lock().comments, id)
    }
}
