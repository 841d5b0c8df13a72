//! In-memory backend and fixtures for unit tests.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use domain::{
    ChangeEvent, ChangeFeed, Comment, CommentId, CommentPatch, NewComment, RemoteCommentStore,
    RemoteError, SessionUser, SubjectId, UserId,
};
use tokio::sync::{broadcast, oneshot};
use tokio_stream::{wrappers::BroadcastStream, StreamExt};

pub const SUBJECT: &str = "g1";

pub fn subject() -> SubjectId {
    SubjectId::new_unchecked(SUBJECT.to_string())
}

pub fn at(tick: i64) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + chrono::Duration::seconds(tick)
}

pub fn comment(id: &str, parent: Option<&str>, author: &str, tick: i64) -> Comment {
    Comment {
        id: CommentId::new(id),
        subject_id: subject(),
        author_id: UserId::new(author),
        author_username: format!("{author}-name"),
        content: format!("body of {id}"),
        updated_at: at(tick),
        parent_id: parent.map(CommentId::new),
    }
}

pub fn user(id: &str) -> SessionUser {
    SessionUser {
        id: UserId::new(id),
        username: format!("{id}-name"),
    }
}

#[derive(Default)]
struct Inner {
    rows: Vec<Comment>,
    clock: i64,
    next_id: u64,
    fail_select: bool,
    fail_delete: HashSet<CommentId>,
    held_select: Option<oneshot::Receiver<()>>,
    delete_calls: Vec<CommentId>,
    update_calls: usize,
}

pub struct MemoryRemote {
    inner: Mutex<Inner>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl MemoryRemote {
    pub fn new(rows: Vec<Comment>) -> Self {
        let clock = rows.iter().map(|c| c.updated_at).max().map_or(0, |t| {
            (t - at(0)).num_seconds()
        });
        let (changes, _) = broadcast::channel(64);
        Self {
            inner: Mutex::new(Inner {
                rows,
                clock,
                ..Default::default()
            }),
            changes,
        }
    }

    pub fn fail_select(&self) {
        self.inner.lock().unwrap().fail_select = true;
    }

    pub fn fail_delete_of(&self, id: &str) {
        self.inner
            .lock()
            .unwrap()
            .fail_delete
            .insert(CommentId::new(id));
    }

    pub fn heal(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_select = false;
        inner.fail_delete.clear();
    }

    /// The next `select` waits until `release` fires.
    pub fn hold_select(&self, release: oneshot::Receiver<()>) {
        self.inner.lock().unwrap().held_select = Some(release);
    }

    pub fn delete_calls(&self) -> Vec<CommentId> {
        self.inner.lock().unwrap().delete_calls.clone()
    }

    pub fn update_calls(&self) -> usize {
        self.inner.lock().unwrap().update_calls
    }

    pub fn row(&self, id: &str) -> Option<Comment> {
        self.inner
            .lock()
            .unwrap()
            .rows
            .iter()
            .find(|c| c.id.as_str() == id)
            .cloned()
    }

    pub fn row_ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self
            .inner
            .lock()
            .unwrap()
            .rows
            .iter()
            .map(|c| c.id.to_string())
            .collect();
        ids.sort();
        ids
    }

    /// Simulates a write made by another client.
    pub fn push_external(&self, event: ChangeEvent) {
        let mut inner = self.inner.lock().unwrap();
        match &event {
            ChangeEvent::Inserted(c) | ChangeEvent::Updated(c) => {
                inner.rows.retain(|r| r.id != c.id);
                inner.rows.push(c.clone());
            }
            ChangeEvent::Deleted(id) => inner.rows.retain(|r| r.id != *id),
        }
        let _ = self.changes.send(event);
    }

    fn tick(inner: &mut Inner) -> NaiveDateTime {
        inner.clock += 1;
        at(inner.clock)
    }
}

#[async_trait]
impl RemoteCommentStore for MemoryRemote {
    async fn select(&self, subject: &SubjectId) -> Result<Vec<Comment>, RemoteError> {
        let held = self.inner.lock().unwrap().held_select.take();
        if let Some(release) = held {
            let _ = release.await;
        }
        let inner = self.inner.lock().unwrap();
        if inner.fail_select {
            return Err(RemoteError::Backend("select refused".into()));
        }
        let mut rows: Vec<_> = inner
            .rows
            .iter()
            .filter(|c| c.subject_id == *subject)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(rows)
    }

    async fn insert(&self, comment: NewComment) -> Result<Comment, RemoteError> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let saved = Comment {
            id: CommentId::new(format!("new{}", inner.next_id)),
            subject_id: comment.subject_id,
            author_id: comment.author_id,
            author_username: comment.author_username,
            content: comment.content,
            updated_at: Self::tick(&mut inner),
            parent_id: comment.parent_id,
        };
        inner.rows.push(saved.clone());
        let _ = self.changes.send(ChangeEvent::Inserted(saved.clone()));
        Ok(saved)
    }

    async fn update(&self, id: &CommentId, patch: CommentPatch) -> Result<Comment, RemoteError> {
        let mut inner = self.inner.lock().unwrap();
        inner.update_calls += 1;
        let now = Self::tick(&mut inner);
        let row = inner
            .rows
            .iter_mut()
            .find(|c| c.id == *id)
            .ok_or_else(|| RemoteError::NotFound(id.clone()))?;
        row.content = patch.content;
        row.updated_at = now;
        let saved = row.clone();
        let _ = self.changes.send(ChangeEvent::Updated(saved.clone()));
        Ok(saved)
    }

    async fn delete(&self, id: &CommentId) -> Result<(), RemoteError> {
        let mut inner = self.inner.lock().unwrap();
        inner.delete_calls.push(id.clone());
        if inner.fail_delete.contains(id) {
            return Err(RemoteError::Backend(format!("delete of {id} refused")));
        }
        let before = inner.rows.len();
        inner.rows.retain(|c| c.id != *id);
        if inner.rows.len() == before {
            return Err(RemoteError::NotFound(id.clone()));
        }
        let _ = self.changes.send(ChangeEvent::Deleted(id.clone()));
        Ok(())
    }

    fn subscribe(&self, subject: &SubjectId) -> ChangeFeed {
        let subject = subject.clone();
        let stream = BroadcastStream::new(self.changes.subscribe()).filter_map(move |evt| {
            let evt = evt.ok()?;
            match evt.subject_id() {
                Some(s) if *s != subject => None,
                _ => Some(evt),
            }
        });
        Box::pin(stream)
    }
}
