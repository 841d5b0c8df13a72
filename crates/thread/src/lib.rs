//! Client-side comment threads: a reconciled local store per subject, the
//! edit/reply slots, reply visibility, and the view tying them together.

pub mod deletion;
pub mod editing;
pub mod identity;
pub mod index;
pub mod store;
pub mod view;
pub mod visibility;

#[cfg(test)]
mod testing;

pub use editing::{EditSession, EditTarget, ReplyTarget, SessionState};
pub use identity::SharedSession;
pub use store::{CommentStore, LoadStatus};
pub use view::{SubjectView, ThreadEntry};
pub use visibility::{ReplyVisibility, ScrollViewport};
