use async_trait::async_trait;
use uuid::Uuid;

use crate::models::*;

pub const THREAD_NOT_FOUND: &str = "thread tidak ditemukan";
pub const COMMENT_NOT_FOUND: &str = "comment tidak ditemukan";
pub const REPLY_NOT_FOUND: &str = "reply tidak ditemukan";
pub const NOT_OWNER: &str = "Anda tidak berhak mengakses resource ini";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RepoError {
    #[error("{0}")] NotFound(&'static str),
    #[error("{0}")] Forbidden(&'static str),
    #[error("storage failure: {0}")] Internal(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

/// Result of a like toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeState {
    Liked,
    Unliked,
}

fn new_id(prefix: &str) -> Id {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

#[async_trait]
pub trait ThreadRepo: Send + Sync {
    async fn add_thread(&self, new: NewThread, owner: &str) -> RepoResult<AddedThread>;
    async fn check_thread_availability(&self, thread_id: &str) -> RepoResult<()>;
    async fn get_thread_by_id(&self, thread_id: &str) -> RepoResult<ThreadSummary>;
}

#[async_trait]
pub trait CommentRepo: Send + Sync {
    async fn add_comment(&self, new: NewComment, thread_id: &str, owner: &str) -> RepoResult<AddedComment>;
    /// NotFound unless the comment exists and belongs to `thread_id`.
    async fn check_comment_availability(&self, comment_id: &str, thread_id: &str) -> RepoResult<()>;
    async fn verify_comment_owner(&self, comment_id: &str, owner: &str) -> RepoResult<()>;
    async fn delete_comment(&self, comment_id: &str) -> RepoResult<()>;
    /// Every comment of the thread, deleted ones included, oldest first.
    async fn get_comments_by_thread_id(&self, thread_id: &str) -> RepoResult<Vec<CommentDetail>>;
    async fn like_comment(&self, comment_id: &str, user_id: &str) -> RepoResult<LikeState>;
    async fn get_comment_like_count(&self, comment_id: &str) -> RepoResult<u64>;
}

#[async_trait]
pub trait ReplyRepo: Send + Sync {
    async fn add_reply(&self, new: NewReply, comment_id: &str, owner: &str) -> RepoResult<AddedReply>;
    /// One batched lookup for all replies under the given comments.
    async fn get_replies_by_comment_ids(&self, comment_ids: &[Id]) -> RepoResult<Vec<ReplyDetail>>;
    /// NotFound unless the reply exists and belongs to `comment_id`.
    async fn verify_reply_exists(&self, reply_id: &str, comment_id: &str) -> RepoResult<()>;
    async fn verify_reply_owner(&self, reply_id: &str, owner: &str) -> RepoResult<()>;
    async fn delete_reply(&self, reply_id: &str) -> RepoResult<()>;
}

/// Display names of token holders; registration itself lives elsewhere.
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn upsert_user(&self, user_id: &str, username: &str) -> RepoResult<()>;
}

pub trait Repo: ThreadRepo + CommentRepo + ReplyRepo + UserRepo {}

impl<T> Repo for T where T: ThreadRepo + CommentRepo + ReplyRepo + UserRepo {}

#[cfg(feature = "inmem-store")]
pub mod inmem {
    use super::*;
    use chrono::{DateTime, Utc};
    use std::collections::HashMap;
    use std::sync::{Arc, RwLock};

    #[derive(Debug, Clone)]
    struct ThreadRecord {
        id: Id,
        title: String,
        body: String,
        date: DateTime<Utc>,
        owner: Id,
    }

    #[derive(Debug, Clone)]
    struct CommentRecord {
        id: Id,
        content: String,
        date: DateTime<Utc>,
        owner: Id,
        thread_id: Id,
        is_delete: bool,
    }

    #[derive(Debug, Clone)]
    struct ReplyRecord {
        id: Id,
        content: String,
        date: DateTime<Utc>,
        owner: Id,
        comment_id: Id,
        is_delete: bool,
    }

    #[derive(Debug, Clone)]
    struct LikeRecord {
        #[allow(dead_code)]
        id: Id,
        comment_id: Id,
        user_id: Id,
        #[allow(dead_code)]
        created_at: DateTime<Utc>,
    }

    // Vec storage keeps insertion order, which breaks date ties.
    #[derive(Default)]
    struct State {
        users: HashMap<Id, String>,
        threads: Vec<ThreadRecord>,
        comments: Vec<CommentRecord>,
        replies: Vec<ReplyRecord>,
        likes: Vec<LikeRecord>,
    }

    impl State {
        fn username(&self, user_id: &str) -> String {
            self.users.get(user_id).cloned().unwrap_or_else(|| user_id.to_string())
        }
        fn comment(&self, id: &str) -> Option<&CommentRecord> {
            self.comments.iter().find(|c| c.id == id)
        }
        fn reply(&self, id: &str) -> Option<&ReplyRecord> {
            self.replies.iter().find(|r| r.id == id)
        }
        fn like_count(&self, comment_id: &str) -> usize {
            self.likes.iter().filter(|l| l.comment_id == comment_id).count()
        }
    }

    #[derive(Clone, Default)]
    pub struct InMemRepo {
        state: Arc<RwLock<State>>,
    }

    impl InMemRepo {
        pub fn new() -> Self {
            Self::default()
        }

        fn read(&self) -> RepoResult<std::sync::RwLockReadGuard<'_, State>> {
            self.state.read().map_err(|_| RepoError::Internal("state lock poisoned".into()))
        }

        fn write(&self) -> RepoResult<std::sync::RwLockWriteGuard<'_, State>> {
            self.state.write().map_err(|_| RepoError::Internal("state lock poisoned".into()))
        }
    }

    #[async_trait]
    impl ThreadRepo for InMemRepo {
        async fn add_thread(&self, new: NewThread, owner: &str) -> RepoResult<AddedThread> {
            let mut s = self.write()?;
            let thread = ThreadRecord {
                id: new_id("thread"),
                title: new.title,
                body: new.body,
                date: Utc::now(),
                owner: owner.to_string(),
            };
            let added = AddedThread { id: thread.id.clone(), title: thread.title.clone(), owner: thread.owner.clone() };
            s.threads.push(thread);
            Ok(added)
        }

        async fn check_thread_availability(&self, thread_id: &str) -> RepoResult<()> {
            let s = self.read()?;
            if s.threads.iter().any(|t| t.id == thread_id) { Ok(()) } else { Err(RepoError::NotFound(THREAD_NOT_FOUND)) }
        }

        async fn get_thread_by_id(&self, thread_id: &str) -> RepoResult<ThreadSummary> {
            let s = self.read()?;
            let t = s.threads.iter().find(|t| t.id == thread_id).ok_or(RepoError::NotFound(THREAD_NOT_FOUND))?;
            Ok(ThreadSummary {
                id: t.id.clone(),
                title: t.title.clone(),
                body: t.body.clone(),
                date: t.date,
                username: s.username(&t.owner),
            })
        }
    }

    #[async_trait]
    impl CommentRepo for InMemRepo {
        async fn add_comment(&self, new: NewComment, thread_id: &str, owner: &str) -> RepoResult<AddedComment> {
            let mut s = self.write()?;
            if !s.threads.iter().any(|t| t.id == thread_id) { return Err(RepoError::NotFound(THREAD_NOT_FOUND)); }
            let comment = CommentRecord {
                id: new_id("comment"),
                content: new.content,
                date: Utc::now(),
                owner: owner.to_string(),
                thread_id: thread_id.to_string(),
                is_delete: false,
            };
            let added = AddedComment { id: comment.id.clone(), content: comment.content.clone(), owner: comment.owner.clone() };
            s.comments.push(comment);
            Ok(added)
        }

        async fn check_comment_availability(&self, comment_id: &str, thread_id: &str) -> RepoResult<()> {
            let s = self.read()?;
            match s.comment(comment_id) {
                Some(c) if c.thread_id == thread_id => Ok(()),
                _ => Err(RepoError::NotFound(COMMENT_NOT_FOUND)),
            }
        }

        async fn verify_comment_owner(&self, comment_id: &str, owner: &str) -> RepoResult<()> {
            let s = self.read()?;
            let c = s.comment(comment_id).ok_or(RepoError::NotFound(COMMENT_NOT_FOUND))?;
            if c.owner != owner { return Err(RepoError::Forbidden(NOT_OWNER)); }
            Ok(())
        }

        async fn delete_comment(&self, comment_id: &str) -> RepoResult<()> {
            let mut s = self.write()?;
            let c = s.comments.iter_mut().find(|c| c.id == comment_id).ok_or(RepoError::NotFound(COMMENT_NOT_FOUND))?;
            c.is_delete = true;
            Ok(())
        }

        async fn get_comments_by_thread_id(&self, thread_id: &str) -> RepoResult<Vec<CommentDetail>> {
            let s = self.read()?;
            let mut rows: Vec<CommentRow> = s.comments.iter()
                .filter(|c| c.thread_id == thread_id)
                .map(|c| CommentRow {
                    id: c.id.clone(),
                    username: s.username(&c.owner),
                    date: c.date,
                    content: c.content.clone(),
                    is_delete: c.is_delete,
                    like_count: s.like_count(&c.id) as i64,
                })
                .collect();
            rows.sort_by(|a, b| a.date.cmp(&b.date));    // ascending, stable
            Ok(rows.into_iter().map(CommentDetail::from_row).collect())
        }

        async fn like_comment(&self, comment_id: &str, user_id: &str) -> RepoResult<LikeState> {
            // check and act under one write guard
            let mut s = self.write()?;
            let before = s.likes.len();
            s.likes.retain(|l| !(l.comment_id == comment_id && l.user_id == user_id));
            if s.likes.len() != before {
                return Ok(LikeState::Unliked);
            }
            s.likes.push(LikeRecord {
                id: new_id("like"),
                comment_id: comment_id.to_string(),
                user_id: user_id.to_string(),
                created_at: Utc::now(),
            });
            Ok(LikeState::Liked)
        }

        async fn get_comment_like_count(&self, comment_id: &str) -> RepoResult<u64> {
            let s = self.read()?;
            Ok(s.like_count(comment_id) as u64)
        }
    }

    #[async_trait]
    impl ReplyRepo for InMemRepo {
        async fn add_reply(&self, new: NewReply, comment_id: &str, owner: &str) -> RepoResult<AddedReply> {
            let mut s = self.write()?;
            if s.comment(comment_id).is_none() { return Err(RepoError::NotFound(COMMENT_NOT_FOUND)); }
            let reply = ReplyRecord {
                id: new_id("reply"),
                content: new.content,
                date: Utc::now(),
                owner: owner.to_string(),
                comment_id: comment_id.to_string(),
                is_delete: false,
            };
            let added = AddedReply { id: reply.id.clone(), content: reply.content.clone(), owner: reply.owner.clone() };
            s.replies.push(reply);
            Ok(added)
        }

        async fn get_replies_by_comment_ids(&self, comment_ids: &[Id]) -> RepoResult<Vec<ReplyDetail>> {
            if comment_ids.is_empty() { return Ok(Vec::new()); }
            let s = self.read()?;
            let mut rows: Vec<ReplyRow> = s.replies.iter()
                .filter(|r| comment_ids.contains(&r.comment_id))
                .map(|r| ReplyRow {
                    id: r.id.clone(),
                    content: r.content.clone(),
                    date: r.date,
                    username: s.username(&r.owner),
                    comment_id: r.comment_id.clone(),
                    is_delete: r.is_delete,
                })
                .collect();
            rows.sort_by(|a, b| a.date.cmp(&b.date));
            Ok(rows.into_iter().map(ReplyDetail::from_row).collect())
        }

        async fn verify_reply_exists(&self, reply_id: &str, comment_id: &str) -> RepoResult<()> {
            let s = self.read()?;
            match s.reply(reply_id) {
                Some(r) if r.comment_id == comment_id => Ok(()),
                _ => Err(RepoError::NotFound(REPLY_NOT_FOUND)),
            }
        }

        async fn verify_reply_owner(&self, reply_id: &str, owner: &str) -> RepoResult<()> {
            let s = self.read()?;
            let r = s.reply(reply_id).ok_or(RepoError::NotFound(REPLY_NOT_FOUND))?;
            if r.owner != owner { return Err(RepoError::Forbidden(NOT_OWNER)); }
            Ok(())
        }

        async fn delete_reply(&self, reply_id: &str) -> RepoResult<()> {
            let mut s = self.write()?;
            let r = s.replies.iter_mut().find(|r| r.id == reply_id).ok_or(RepoError::NotFound(REPLY_NOT_FOUND))?;
            r.is_delete = true;
            Ok(())
        }
    }

    #[async_trait]
    impl UserRepo for InMemRepo {
        async fn upsert_user(&self, user_id: &str, username: &str) -> RepoResult<()> {
            let mut s = self.write()?;
            s.users.insert(user_id.to_string(), username.to_string());
            Ok(())
        }
    }
}

// Postgres implementation (feature = "postgres-store")
#[cfg(feature = "postgres-store")]
pub mod pg {
    use super::*;
    use sqlx::{Pool, Postgres};
    use chrono::Utc;

    fn internal(e: sqlx::Error) -> RepoError {
        tracing::error!("postgres error: {e}");
        RepoError::Internal(e.to_string())
    }

    #[derive(Clone)]
    pub struct PgRepo { pool: Pool<Postgres> }

    impl PgRepo {
        pub fn new(pool: Pool<Postgres>) -> Self { Self { pool } }

        /// Apply the bundled schema migrations.
        pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
            sqlx::migrate!("./migrations").run(&self.pool).await
        }

        async fn exists(&self, sql: &str, id: &str) -> RepoResult<bool> {
            let row: Option<(String,)> = sqlx::query_as(sql)
                .bind(id)
                .fetch_optional(&self.pool).await.map_err(internal)?;
            Ok(row.is_some())
        }

        async fn owner_of(&self, sql: &str, id: &str) -> RepoResult<Option<String>> {
            let row: Option<(String,)> = sqlx::query_as(sql)
                .bind(id)
                .fetch_optional(&self.pool).await.map_err(internal)?;
            Ok(row.map(|(owner,)| owner))
        }
    }

    #[async_trait]
    impl ThreadRepo for PgRepo {
        async fn add_thread(&self, new: NewThread, owner: &str) -> RepoResult<AddedThread> {
            let rec = sqlx::query_as::<_, AddedThread>(
                "INSERT INTO threads (id, title, body, date, owner) VALUES ($1,$2,$3,$4,$5) RETURNING id, title, owner"
            )
            .bind(new_id("thread"))
            .bind(&new.title)
            .bind(&new.body)
            .bind(Utc::now())
            .bind(owner)
            .fetch_one(&self.pool).await.map_err(internal)?;
            Ok(rec)
        }

        async fn check_thread_availability(&self, thread_id: &str) -> RepoResult<()> {
            if self.exists("SELECT id FROM threads WHERE id = $1", thread_id).await? {
                Ok(())
            } else {
                Err(RepoError::NotFound(THREAD_NOT_FOUND))
            }
        }

        async fn get_thread_by_id(&self, thread_id: &str) -> RepoResult<ThreadSummary> {
            sqlx::query_as::<_, ThreadSummary>(r#"
                SELECT t.id, t.title, t.body, t.date, COALESCE(u.username, t.owner) AS username
                FROM threads t
                LEFT JOIN users u ON u.id = t.owner
                WHERE t.id = $1
            "#)
            .bind(thread_id)
            .fetch_optional(&self.pool).await.map_err(internal)?
            .ok_or(RepoError::NotFound(THREAD_NOT_FOUND))
        }
    }

    #[async_trait]
    impl CommentRepo for PgRepo {
        async fn add_comment(&self, new: NewComment, thread_id: &str, owner: &str) -> RepoResult<AddedComment> {
            let rec = sqlx::query_as::<_, AddedComment>(
                "INSERT INTO comments (id, content, date, owner, thread_id, is_delete) VALUES ($1,$2,$3,$4,$5,FALSE) RETURNING id, content, owner"
            )
            .bind(new_id("comment"))
            .bind(&new.content)
            .bind(Utc::now())
            .bind(owner)
            .bind(thread_id)
            .fetch_one(&self.pool).await.map_err(internal)?;
            Ok(rec)
        }

        async fn check_comment_availability(&self, comment_id: &str, thread_id: &str) -> RepoResult<()> {
            let row: Option<(String,)> = sqlx::query_as("SELECT id FROM comments WHERE id = $1 AND thread_id = $2")
                .bind(comment_id)
                .bind(thread_id)
                .fetch_optional(&self.pool).await.map_err(internal)?;
            row.map(|_| ()).ok_or(RepoError::NotFound(COMMENT_NOT_FOUND))
        }

        async fn verify_comment_owner(&self, comment_id: &str, owner: &str) -> RepoResult<()> {
            match self.owner_of("SELECT owner FROM comments WHERE id = $1", comment_id).await? {
                None => Err(RepoError::NotFound(COMMENT_NOT_FOUND)),
                Some(o) if o != owner => Err(RepoError::Forbidden(NOT_OWNER)),
                Some(_) => Ok(()),
            }
        }

        async fn delete_comment(&self, comment_id: &str) -> RepoResult<()> {
            let res = sqlx::query("UPDATE comments SET is_delete = TRUE WHERE id = $1")
                .bind(comment_id)
                .execute(&self.pool).await.map_err(internal)?;
            if res.rows_affected() == 0 { return Err(RepoError::NotFound(COMMENT_NOT_FOUND)); }
            Ok(())
        }

        async fn get_comments_by_thread_id(&self, thread_id: &str) -> RepoResult<Vec<CommentDetail>> {
            let rows = sqlx::query_as::<_, CommentRow>(r#"
                SELECT c.id, COALESCE(u.username, c.owner) AS username, c.date, c.content, c.is_delete,
                       COUNT(cl.id) AS like_count
                FROM comments c
                LEFT JOIN users u ON u.id = c.owner
                LEFT JOIN comment_likes cl ON cl.comment_id = c.id
                WHERE c.thread_id = $1
                GROUP BY c.id, u.username
                ORDER BY c.date ASC, c.id ASC
            "#)
            .bind(thread_id)
            .fetch_all(&self.pool).await.map_err(internal)?;
            Ok(rows.into_iter().map(CommentDetail::from_row).collect())
        }

        async fn like_comment(&self, comment_id: &str, user_id: &str) -> RepoResult<LikeState> {
            // UNIQUE (comment_id, user_id) backs the insert; the whole toggle is one transaction.
            let mut tx = self.pool.begin().await.map_err(internal)?;
            let removed = sqlx::query("DELETE FROM comment_likes WHERE comment_id = $1 AND user_id = $2")
                .bind(comment_id)
                .bind(user_id)
                .execute(&mut *tx).await.map_err(internal)?;
            let state = if removed.rows_affected() > 0 {
                LikeState::Unliked
            } else {
                sqlx::query(
                    "INSERT INTO comment_likes (id, comment_id, user_id, created_at) VALUES ($1,$2,$3,$4) ON CONFLICT (comment_id, user_id) DO NOTHING"
                )
                .bind(new_id("like"))
                .bind(comment_id)
                .bind(user_id)
                .bind(Utc::now())
                .execute(&mut *tx).await.map_err(internal)?;
                LikeState::Liked
            };
            tx.commit().await.map_err(internal)?;
            Ok(state)
        }

        async fn get_comment_like_count(&self, comment_id: &str) -> RepoResult<u64> {
            let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM comment_likes WHERE comment_id = $1")
                .bind(comment_id)
                .fetch_one(&self.pool).await.map_err(internal)?;
            Ok(u64::try_from(count).unwrap_or(0))
        }
    }

    #[async_trait]
    impl ReplyRepo for PgRepo {
        async fn add_reply(&self, new: NewReply, comment_id: &str, owner: &str) -> RepoResult<AddedReply> {
            let rec = sqlx::query_as::<_, AddedReply>(
                "INSERT INTO replies (id, content, date, owner, comment_id, is_delete) VALUES ($1,$2,$3,$4,$5,FALSE) RETURNING id, content, owner"
            )
            .bind(new_id("reply"))
            .bind(&new.content)
            .bind(Utc::now())
            .bind(owner)
            .bind(comment_id)
            .fetch_one(&self.pool).await.map_err(internal)?;
            Ok(rec)
        }

        async fn get_replies_by_comment_ids(&self, comment_ids: &[Id]) -> RepoResult<Vec<ReplyDetail>> {
            if comment_ids.is_empty() { return Ok(Vec::new()); }
            let rows = sqlx::query_as::<_, ReplyRow>(r#"
                SELECT r.id, r.content, r.date, COALESCE(u.username, r.owner) AS username, r.comment_id, r.is_delete
                FROM replies r
                LEFT JOIN users u ON u.id = r.owner
                WHERE r.comment_id = ANY($1)
                ORDER BY r.date ASC, r.id ASC
            "#)
            .bind(comment_ids)
            .fetch_all(&self.pool).await.map_err(internal)?;
            Ok(rows.into_iter().map(ReplyDetail::from_row).collect())
        }

        async fn verify_reply_exists(&self, reply_id: &str, comment_id: &str) -> RepoResult<()> {
            let row: Option<(String,)> = sqlx::query_as("SELECT id FROM replies WHERE id = $1 AND comment_id = $2")
                .bind(reply_id)
                .bind(comment_id)
                .fetch_optional(&self.pool).await.map_err(internal)?;
            row.map(|_| ()).ok_or(RepoError::NotFound(REPLY_NOT_FOUND))
        }

        async fn verify_reply_owner(&self, reply_id: &str, owner: &str) -> RepoResult<()> {
            match self.owner_of("SELECT owner FROM replies WHERE id = $1", reply_id).await? {
                None => Err(RepoError::NotFound(REPLY_NOT_FOUND)),
                Some(o) if o != owner => Err(RepoError::Forbidden(NOT_OWNER)),
                Some(_) => Ok(()),
            }
        }

        async fn delete_reply(&self, reply_id: &str) -> RepoResult<()> {
            let res = sqlx::query("UPDATE replies SET is_delete = TRUE WHERE id = $1")
                .bind(reply_id)
                .execute(&self.pool).await.map_err(internal)?;
            if res.rows_affected() == 0 { return Err(RepoError::NotFound(REPLY_NOT_FOUND)); }
            Ok(())
        }
    }

    #[async_trait]
    impl UserRepo for PgRepo {
        async fn upsert_user(&self, user_id: &str, username: &str) -> RepoResult<()> {
            sqlx::query(
                "INSERT INTO users (id, username) VALUES ($1,$2) ON CONFLICT (id) DO UPDATE SET username = EXCLUDED.username"
            )
            .bind(user_id)
            .bind(username)
            .execute(&self.pool).await.map_err(internal)?;
            Ok(())
        }
    }
}
