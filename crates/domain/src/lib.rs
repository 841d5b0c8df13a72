mod error;
mod events;
mod models;
mod remote;

pub use error::{AuthorizationError, RemoteError, ThreadError, ThreadResult, ValidationError};
pub use events::{ChangeEvent, SubjectChange};
pub use models::{Comment, CommentId, CommentPatch, NewComment, SessionUser, SubjectId, UserId};
pub use remote::{ChangeFeed, RemoteCommentStore, SessionProvider};
