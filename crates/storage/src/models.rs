use chrono::NaiveDateTime;
use domain::{Comment, CommentId, SubjectId, UserId};
use sqlx::FromRow;

#[derive(FromRow)]
pub struct SqlComment {
    pub id: String,
    pub subject_id: String,
    pub author_id: String,
    pub author_username: String,
    pub content: String,
    pub updated_at: NaiveDateTime,
    pub parent_id: Option<String>,
}

impl From<SqlComment> for Comment {
    fn from(sql: SqlComment) -> Self {
        Comment {
            id: CommentId::new(sql.id),
            subject_id: SubjectId::new_unchecked(sql.subject_id),
            author_id: UserId::new(sql.author_id),
            author_username: sql.author_username,
            content: sql.content,
            updated_at: sql.updated_at,
            parent_id: sql.parent_id.map(CommentId::new),
        }
    }
}
