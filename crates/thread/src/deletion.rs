//! Cascading removal of a comment and its replies.

use std::collections::HashSet;

use domain::{CommentId, RemoteCommentStore, RemoteError};
use tracing::{debug, error, warn};

enum Step {
    Visit(CommentId),
    Delete(CommentId),
}

/// Deletes `root` and everything below it from `remote`, replies before the
/// comment they answer. `children_of` is asked for a node's replies when the
/// node is first reached, so it sees the collection as it is at that moment.
///
/// Each id is visited at most once, so a parent chain that loops back on
/// itself terminates. A backend "not found" counts as already deleted, which
/// makes a retry after a partial failure safe. Any other error stops the walk
/// and is returned; nodes deleted before it stay deleted remotely.
///
/// Returns the deleted ids in deletion order.
pub async fn delete_subtree<F>(
    remote: &dyn RemoteCommentStore,
    root: &CommentId,
    children_of: F,
) -> Result<Vec<CommentId>, RemoteError>
where
    F: Fn(&CommentId) -> Vec<CommentId>,
{
    let mut visited = HashSet::new();
    let mut deleted = Vec::new();
    let mut stack = vec![Step::Visit(root.clone())];

    while let Some(step) = stack.pop() {
        match step {
            Step::Visit(id) => {
                if !visited.insert(id.clone()) {
                    warn!("Comment {} already visited, parent chain loops", id);
                    continue;
                }
                stack.push(Step::Delete(id.clone()));
                // reversed so the first child is handled first
                for child in children_of(&id).into_iter().rev() {
                    stack.push(Step::Visit(child));
                }
            }
            Step::Delete(id) => {
                match remote.delete(&id).await {
                    Ok(()) => debug!("Deleted comment {}", id),
                    Err(RemoteError::NotFound(_)) => {
                        debug!("Comment {} was already gone", id)
                    }
                    Err(e) => {
                        error!("Deleting comment {} failed: {}", id, e);
                        return Err(e);
                    }
                }
                deleted.push(id);
            }
        }
    }

    Ok(deleted)
}
