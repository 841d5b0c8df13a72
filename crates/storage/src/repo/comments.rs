use crate::{models::SqlComment, Db};
use chrono::Utc;
use domain::{ChangeEvent, Comment, CommentId, NewComment, SubjectId};
use sqlx::Row;

const SELECT_COMMENT: &str = r#"
    SELECT id, subject_id, author_id, author_username, content, updated_at, parent_id
    FROM comments
"#;

fn new_comment_id() -> String {
    format!("{:x}", rand::random::<u128>())
}

impl Db {
    pub async fn list_comments(&self, subject_id: &str) -> anyhow::Result<Vec<Comment>> {
        let rows = sqlx::query_as::<_, SqlComment>(&format!(
            "{SELECT_COMMENT} WHERE subject_id = ? ORDER BY updated_at DESC, rowid DESC"
        ))
        .bind(subject_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn get_comment(&self, id: &str) -> anyhow::Result<Option<Comment>> {
        let row = sqlx::query_as::<_, SqlComment>(&format!("{SELECT_COMMENT} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    /// Returns `None` when the parent is missing or belongs to another subject.
    pub async fn insert_comment(&self, c: &NewComment) -> anyhow::Result<Option<Comment>> {
        let mut tx = self.pool.begin().await?;

        if let Some(parent_id) = &c.parent_id {
            let parent_subject: Option<String> =
                sqlx::query("SELECT subject_id FROM comments WHERE id = ?")
                    .bind(parent_id.as_str())
                    .fetch_optional(&mut *tx)
                    .await?
                    .map(|r| r.get(0));
            if parent_subject.as_deref() != Some(c.subject_id.as_str()) {
                return Ok(None);
            }
        }

        let comment = Comment {
            id: CommentId::new(new_comment_id()),
            subject_id: c.subject_id.clone(),
            author_id: c.author_id.clone(),
            author_username: c.author_username.clone(),
            content: c.content.clone(),
            updated_at: Utc::now().naive_utc(),
            parent_id: c.parent_id.clone(),
        };

        sqlx::query(
            r#"
            INSERT INTO comments (
                id, subject_id, author_id, author_username,
                content, updated_at, parent_id
            )
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(comment.id.as_str())
        .bind(comment.subject_id.as_str())
        .bind(comment.author_id.as_str())
        .bind(&comment.author_username)
        .bind(&comment.content)
        .bind(comment.updated_at)
        .bind(comment.parent_id.as_ref().map(CommentId::as_str))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.publish(&comment.subject_id, ChangeEvent::Inserted(comment.clone()));
        Ok(Some(comment))
    }

    pub async fn update_comment_content(
        &self,
        id: &str,
        content: &str,
    ) -> anyhow::Result<Option<Comment>> {
        let result = sqlx::query("UPDATE comments SET content = ?, updated_at = ? WHERE id = ?")
            .bind(content)
            .bind(Utc::now().naive_utc())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        let updated = self.get_comment(id).await?;
        if let Some(c) = &updated {
            self.publish(&c.subject_id, ChangeEvent::Updated(c.clone()));
        }
        Ok(updated)
    }

    /// Hard delete. Fails while replies still reference the row.
    pub async fn delete_comment(&self, id: &str) -> anyhow::Result<Option<SubjectId>> {
        let mut tx = self.pool.begin().await?;

        let subject: Option<String> = sqlx::query("SELECT subject_id FROM comments WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .map(|r| r.get(0));

        let Some(subject) = subject else {
            return Ok(None);
        };

        sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let subject_id = SubjectId::new_unchecked(subject);
        self.publish(&subject_id, ChangeEvent::Deleted(CommentId::new(id)));
        Ok(Some(subject_id))
    }
}
