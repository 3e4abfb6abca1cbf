//! Storage for comments.
use std::collections::BTreeMap;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use sqlx::PgPool;
use validator::ValidationErrors;

use crate::resources::comment::Comment;

/// A change applied to a stored comment. Returning an error discards it.
pub type Change = Box<dyn FnOnce(&mut Comment) -> Result<(), ValidationErrors> + Send>;

/// Outcome of [`CommentStore::modify`].
#[derive(Debug)]
pub enum Modified {
    Saved(Comment),
    Rejected(ValidationErrors),
    Missing,
}

/// Where comments are durably kept. The store owns identity: it assigns `id`
/// on insert and never changes it afterwards.
#[async_trait]
pub trait CommentStore: Send + Sync {
    /// Stores a new comment, ignoring any `id` it carries, and returns it with
    /// the assigned `id`.
    async fn insert(&self, comment: &Comment) -> Result<Comment>;
    async fn fetch_all(&self) -> Result<Vec<Comment>>;
    async fn fetch_one(&self, id: i64) -> Result<Option<Comment>>;
    /// Overwrites name, email and comment of an existing row.
    async fn update(&self, id: i64, comment: &Comment) -> Result<Option<Comment>>;
    /// Reads, changes and writes back one row without letting another
    /// writer in between.
    async fn modify(&self, id: i64, change: Change) -> Result<Modified>;
    /// Returns false if there was nothing to delete.
    async fn delete(&self, id: i64) -> Result<bool>;
}

pub struct PgCommentStore {
    pool: PgPool,
}

impl PgCommentStore {
    pub fn new(pool: PgPool) -> Self {
        PgCommentStore { pool }
    }
}

#[async_trait]
impl CommentStore for PgCommentStore {
    async fn insert(&self, comment: &Comment) -> Result<Comment> {
        let res = sqlx::query_as::<_, Comment>(
            r#"
            insert into comments (name, email, comment)
            values ($1, $2, $3)
            returning id, name, email, comment
            "#,
        )
        .bind(comment.name())
        .bind(comment.email())
        .bind(comment.comment())
        .fetch_one(&self.pool)
        .await?;
        Ok(res)
    }

    async fn fetch_all(&self) -> Result<Vec<Comment>> {
        let res = sqlx::query_as::<_, Comment>(
            r#"
            select id, name, email, comment from comments
            order by id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(res)
    }

    async fn fetch_one(&self, id: i64) -> Result<Option<Comment>> {
        let res = sqlx::query_as::<_, Comment>(
            r#"
            select id, name, email, comment from comments
            where id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(res)
    }

    async fn update(&self, id: i64, comment: &Comment) -> Result<Option<Comment>> {
        let res = sqlx::query_as::<_, Comment>(
            r#"
            update comments
            set name = $1, email = $2, comment = $3
            where id = $4
            returning id, name, email, comment
            "#,
        )
        .bind(comment.name())
        .bind(comment.email())
        .bind(comment.comment())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(res)
    }

    async fn modify(&self, id: i64, change: Change) -> Result<Modified> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Comment>(
            r#"
            select id, name, email, comment from comments
            where id = $1
            for update
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        // Returning early drops `tx`, which rolls back and releases the lock.
        let Some(mut comment) = current else {
            return Ok(Modified::Missing);
        };
        if let Err(e) = change(&mut comment) {
            return Ok(Modified::Rejected(e));
        }

        let res = sqlx::query_as::<_, Comment>(
            r#"
            update comments
            set name = $1, email = $2, comment = $3
            where id = $4
            returning id, name, email, comment
            "#,
        )
        .bind(comment.name())
        .bind(comment.email())
        .bind(comment.comment())
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Modified::Saved(res))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let res = sqlx::query("delete from comments where id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

/// Keeps comments in process memory. Used when no database is configured.
#[derive(Default)]
pub struct MemoryCommentStore {
    inner: Mutex<MemoryTable>,
}

#[derive(Default)]
struct MemoryTable {
    last_id: i64,
    rows: BTreeMap<i64, Comment>,
}

impl MemoryCommentStore {
    fn with_table<T>(&self, f: impl FnOnce(&mut MemoryTable) -> T) -> Result<T> {
        let mut table = self
            .inner
            .lock()
            .map_err(|_| anyhow!("comment table lock poisoned"))?;
        Ok(f(&mut table))
    }
}

#[async_trait]
impl CommentStore for MemoryCommentStore {
    async fn insert(&self, comment: &Comment) -> Result<Comment> {
        self.with_table(|table| {
            // Ids are never reused, even after deletes.
            table.last_id += 1;
            let mut stored = comment.clone();
            stored.set_id(table.last_id);
            table.rows.insert(table.last_id, stored.clone());
            stored
        })
    }

    async fn fetch_all(&self) -> Result<Vec<Comment>> {
        self.with_table(|table| table.rows.values().cloned().collect())
    }

    async fn fetch_one(&self, id: i64) -> Result<Option<Comment>> {
        self.with_table(|table| table.rows.get(&id).cloned())
    }

    async fn update(&self, id: i64, comment: &Comment) -> Result<Option<Comment>> {
        self.with_table(|table| {
            table.rows.get_mut(&id).map(|stored| {
                stored.set_name(comment.name().map(str::to_owned));
                stored.set_email(comment.email().map(str::to_owned));
                stored.set_comment(comment.comment().map(str::to_owned));
                stored.clone()
            })
        })
    }

    async fn modify(&self, id: i64, change: Change) -> Result<Modified> {
        self.with_table(|table| {
            let Some(stored) = table.rows.get_mut(&id) else {
                return Modified::Missing;
            };
            let mut changed = stored.clone();
            match change(&mut changed) {
                Ok(()) => {
                    changed.set_id(id);
                    *stored = changed.clone();
                    Modified::Saved(changed)
                }
                Err(e) => Modified::Rejected(e),
            }
        })
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        self.with_table(|table| table.rows.remove(&id).is_some())
    }
}
