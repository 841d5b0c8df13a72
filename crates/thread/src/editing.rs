use domain::{Comment, CommentId, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditTarget {
    pub id: CommentId,
    pub draft: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyTarget {
    pub id: CommentId,
    pub author_username: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Editing(CommentId),
    ReplyingTo(CommentId),
    EditingAndReplying {
        editing: CommentId,
        replying_to: CommentId,
    },
}

#[derive(Debug, Default)]
pub struct EditSession {
    editing: Option<EditTarget>,
    replying: Option<ReplyTarget>,
}

impl EditSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        match (&self.editing, &self.replying) {
            (None, None) => SessionState::Idle,
            (Some(e), None) => SessionState::Editing(e.id.clone()),
            (None, Some(r)) => SessionState::ReplyingTo(r.id.clone()),
            (Some(e), Some(r)) => SessionState::EditingAndReplying {
                editing: e.id.clone(),
                replying_to: r.id.clone(),
            },
        }
    }

    pub fn start_edit(&mut self, id: CommentId, content: impl Into<String>) {
        self.editing = Some(EditTarget {
            id,
            draft: content.into(),
        });
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        if let Some(target) = &mut self.editing {
            target.draft = text.into();
        }
    }

    pub fn edit_target(&self) -> Option<&EditTarget> {
        self.editing.as_ref()
    }

    pub fn is_editing(&self, id: &CommentId) -> bool {
        self.editing.as_ref().is_some_and(|e| e.id == *id)
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    /// Clears the edit slot after `id` was saved, unless another comment has
    /// been picked for editing in the meantime.
    pub fn finish_edit(&mut self, id: &CommentId) {
        if self.is_editing(id) {
            self.editing = None;
        }
    }

    pub fn start_reply(&mut self, comment: &Comment) -> Result<(), ValidationError> {
        if !comment.is_top_level() {
            return Err(ValidationError::NotTopLevel(comment.id.clone()));
        }
        self.replying = Some(ReplyTarget {
            id: comment.id.clone(),
            author_username: comment.author_username.clone(),
        });
        Ok(())
    }

    pub fn reply_target(&self) -> Option<&ReplyTarget> {
        self.replying.as_ref()
    }

    pub fn is_replying_to(&self, id: &CommentId) -> bool {
        self.replying.as_ref().is_some_and(|r| r.id == *id)
    }

    pub fn cancel_reply(&mut self) {
        self.replying = None;
    }

    pub fn finish_reply(&mut self) {
        self.replying = None;
    }

    pub fn forget(&mut self, removed: &[CommentId]) {
        if self.editing.as_ref().is_some_and(|e| removed.contains(&e.id)) {
            self.editing = None;
        }
        if self.replying.as_ref().is_some_and(|r| removed.contains(&r.id)) {
            self.replying = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::comment;

    #[test]
    fn second_edit_replaces_the_first() {
        let mut session = EditSession::new();
        session.start_edit(CommentId::new("id1"), "one");
        session.start_edit(CommentId::new("id2"), "two");

        assert_eq!(session.state(), SessionState::Editing(CommentId::new("id2")));
        assert!(!session.is_editing(&CommentId::new("id1")));
        assert_eq!(session.edit_target().unwrap().draft, "two");
    }

    #[test]
    fn edit_and_reply_are_independent() {
        let mut session = EditSession::new();
        session.start_edit(CommentId::new("a"), "body");
        session.set_draft("half-typed");
        session.start_reply(&comment("d", None, "u2", 1)).unwrap();

        assert_eq!(
            session.state(),
            SessionState::EditingAndReplying {
                editing: CommentId::new("a"),
                replying_to: CommentId::new("d"),
            }
        );
        assert_eq!(session.edit_target().unwrap().draft, "half-typed");

        session.cancel_reply();
        assert_eq!(session.state(), SessionState::Editing(CommentId::new("a")));
        session.start_reply(&comment("d", None, "u2", 1)).unwrap();
        session.cancel_edit();
        assert_eq!(session.state(), SessionState::ReplyingTo(CommentId::new("d")));
        assert_eq!(session.reply_target().unwrap().author_username, "u2-name");
    }

    #[test]
    fn replies_only_target_top_level_comments() {
        let mut session = EditSession::new();
        let err = session
            .start_reply(&comment("b", Some("a"), "u1", 1))
            .unwrap_err();

        assert_eq!(err, ValidationError::NotTopLevel(CommentId::new("b")));
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn finish_edit_ignores_a_newer_target() {
        let mut session = EditSession::new();
        session.start_edit(CommentId::new("a"), "x");
        session.start_edit(CommentId::new("b"), "y");
        session.finish_edit(&CommentId::new("a"));
        assert!(session.is_editing(&CommentId::new("b")));

        session.finish_edit(&CommentId::new("b"));
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn forget_clears_removed_targets() {
        let mut session = EditSession::new();
        session.start_edit(CommentId::new("b"), "x");
        session.start_reply(&comment("a", None, "u1", 1)).unwrap();

        session.forget(&[CommentId::new("a"), CommentId::new("b")]);
        assert_eq!(session.state(), SessionState::Idle);
    }
}
