use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

// Opaque, prefixed identifiers ("thread-…", "comment-…", "reply-…")
pub type Id = String;

/// Shown in place of a soft-deleted comment's content.
pub const COMMENT_MASK: &str = "**komentar telah dihapus**";
/// Shown in place of a soft-deleted reply's content.
pub const REPLY_MASK: &str = "**balasan telah dihapus**";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Thread,
    Comment,
    Reply,
    ThreadDetail,
    CommentDetail,
    ReplyDetail,
}

impl Entity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Entity::Thread => "THREAD",
            Entity::Comment => "COMMENT",
            Entity::Reply => "REPLY",
            Entity::ThreadDetail => "THREAD_DETAIL",
            Entity::CommentDetail => "COMMENT_DETAIL",
            Entity::ReplyDetail => "REPLY_DETAIL",
        }
    }

    /// True for write-shaped entities built from client payloads.
    pub fn is_client_payload(&self) -> bool {
        matches!(self, Entity::Thread | Entity::Comment | Entity::Reply)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload rejection. The `Display` form is the stable machine code,
/// e.g. `THREAD.NOT_CONTAIN_NEEDED_PROPERTY`.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0}.NOT_CONTAIN_NEEDED_PROPERTY")]
    MissingProperty(Entity),
    #[error("{0}.NOT_MEET_DATA_TYPE_SPECIFICATION")]
    InvalidDataType(Entity),
}

impl ValidationError {
    pub fn entity(&self) -> Entity {
        match self {
            ValidationError::MissingProperty(e) | ValidationError::InvalidDataType(e) => *e,
        }
    }

    /// Human readable message sent to clients for write payloads.
    pub fn message(&self) -> String {
        let noun = match self.entity() {
            Entity::Thread | Entity::ThreadDetail => "thread",
            Entity::Comment | Entity::CommentDetail => "comment",
            Entity::Reply | Entity::ReplyDetail => "reply",
        };
        match self {
            ValidationError::MissingProperty(_) => {
                format!("tidak dapat membuat {noun} karena properti yang dibutuhkan tidak ada")
            }
            ValidationError::InvalidDataType(_) => {
                format!("tidak dapat membuat {noun} karena tipe data tidak sesuai")
            }
        }
    }
}

pub type ValidationResult<T> = Result<T, ValidationError>;

/// Field access over a raw JSON payload. Callers run `require` for every
/// mandatory field before reading any of them, so a missing field is never
/// reported as a type mismatch.
struct Payload<'a> {
    entity: Entity,
    fields: Option<&'a Map<String, Value>>,
}

impl<'a> Payload<'a> {
    fn new(entity: Entity, value: &'a Value) -> Self {
        Self { entity, fields: value.as_object() }
    }

    fn get(&self, key: &str) -> Option<&'a Value> {
        self.fields
            .and_then(|m| m.get(key))
            .filter(|v| !v.is_null() && v.as_str() != Some(""))
    }

    fn require(&self, keys: &[&str]) -> ValidationResult<()> {
        if keys.iter().all(|k| self.get(k).is_some()) {
            Ok(())
        } else {
            Err(ValidationError::MissingProperty(self.entity))
        }
    }

    fn invalid(&self) -> ValidationError {
        ValidationError::InvalidDataType(self.entity)
    }

    fn string(&self, key: &str) -> ValidationResult<String> {
        self.get(key)
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| self.invalid())
    }

    fn date(&self, key: &str) -> ValidationResult<DateTime<Utc>> {
        let raw = self.get(key).and_then(Value::as_str).ok_or_else(|| self.invalid())?;
        DateTime::parse_from_rfc3339(raw)
            .map(|d| d.with_timezone(&Utc))
            .map_err(|_| self.invalid())
    }

    fn boolean(&self, key: &str) -> ValidationResult<bool> {
        self.get(key).and_then(Value::as_bool).ok_or_else(|| self.invalid())
    }

    fn optional_bool(&self, key: &str) -> ValidationResult<bool> {
        match self.get(key) {
            None => Ok(false),
            Some(v) => v.as_bool().ok_or_else(|| self.invalid()),
        }
    }

    fn optional_count(&self, key: &str) -> ValidationResult<u64> {
        match self.get(key) {
            None => Ok(0),
            Some(v) => v.as_u64().ok_or_else(|| self.invalid()),
        }
    }

    fn array(&self, key: &str) -> ValidationResult<&'a Vec<Value>> {
        self.get(key).and_then(Value::as_array).ok_or_else(|| self.invalid())
    }

    fn optional_array(&self, key: &str) -> ValidationResult<Option<&'a Vec<Value>>> {
        match self.get(key) {
            None => Ok(None),
            Some(v) => v.as_array().map(Some).ok_or_else(|| self.invalid()),
        }
    }
}

fn mask(content: String, is_delete: bool, replacement: &str) -> String {
    if is_delete {
        replacement.to_owned()
    } else {
        content
    }
}

// ---------------------------------------------------------------------------
// Write-side payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NewThread {
    pub title: String,
    pub body: String,
}

impl NewThread {
    pub fn from_payload(payload: &Value) -> ValidationResult<Self> {
        let p = Payload::new(Entity::Thread, payload);
        p.require(&["title", "body"])?;
        Ok(Self { title: p.string("title")?, body: p.string("body")? })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NewComment {
    pub content: String,
}

impl NewComment {
    pub fn from_payload(payload: &Value) -> ValidationResult<Self> {
        let p = Payload::new(Entity::Comment, payload);
        p.require(&["content"])?;
        Ok(Self { content: p.string("content")? })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NewReply {
    pub content: String,
}

impl NewReply {
    pub fn from_payload(payload: &Value) -> ValidationResult<Self> {
        let p = Payload::new(Entity::Reply, payload);
        p.require(&["content"])?;
        Ok(Self { content: p.string("content")? })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct AddedThread {
    pub id: Id,
    pub title: String,
    pub owner: Id,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct AddedComment {
    pub id: Id,
    pub content: String,
    pub owner: Id,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct AddedReply {
    pub id: Id,
    pub content: String,
    pub owner: Id,
}

// ---------------------------------------------------------------------------
// Read-side rows and detail views
// ---------------------------------------------------------------------------

/// Thread header as stored, with the owner's display name resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ThreadSummary {
    pub id: Id,
    pub title: String,
    pub body: String,
    pub date: DateTime<Utc>,
    pub username: String,
}

/// Comment row joined with its author and current like count, unmasked.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct CommentRow {
    pub id: Id,
    pub username: String,
    pub date: DateTime<Utc>,
    pub content: String,
    pub is_delete: bool,
    pub like_count: i64,
}

/// Reply row joined with its author, unmasked.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ReplyRow {
    pub id: Id,
    pub content: String,
    pub date: DateTime<Utc>,
    pub username: String,
    pub comment_id: Id,
    pub is_delete: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ReplyDetail {
    pub id: Id,
    pub content: String,
    pub date: DateTime<Utc>,
    pub username: String,
    pub comment_id: Id,
    pub is_delete: bool,
}

impl ReplyDetail {
    pub fn from_row(row: ReplyRow) -> Self {
        Self {
            content: mask(row.content, row.is_delete, REPLY_MASK),
            id: row.id,
            date: row.date,
            username: row.username,
            comment_id: row.comment_id,
            is_delete: row.is_delete,
        }
    }

    pub fn from_payload(payload: &Value) -> ValidationResult<Self> {
        let p = Payload::new(Entity::ReplyDetail, payload);
        p.require(&["id", "content", "date", "username", "comment_id", "is_delete"])?;
        Ok(Self::from_row(ReplyRow {
            id: p.string("id")?,
            content: p.string("content")?,
            date: p.date("date")?,
            username: p.string("username")?,
            comment_id: p.string("comment_id")?,
            is_delete: p.boolean("is_delete")?,
        }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CommentDetail {
    pub id: Id,
    pub username: String,
    pub date: DateTime<Utc>,
    pub content: String,
    #[serde(rename = "likeCount")]
    pub like_count: u64,
    pub replies: Vec<ReplyDetail>,
}

impl CommentDetail {
    /// Replies start empty; they are attached during thread assembly.
    pub fn from_row(row: CommentRow) -> Self {
        Self {
            content: mask(row.content, row.is_delete, COMMENT_MASK),
            id: row.id,
            username: row.username,
            date: row.date,
            like_count: u64::try_from(row.like_count).unwrap_or(0),
            replies: Vec::new(),
        }
    }

    pub fn from_payload(payload: &Value) -> ValidationResult<Self> {
        let p = Payload::new(Entity::CommentDetail, payload);
        p.require(&["id", "username", "date", "content"])?;
        let id = p.string("id")?;
        let username = p.string("username")?;
        let date = p.date("date")?;
        let content = p.string("content")?;
        let like_count = p.optional_count("likeCount")?;
        let is_delete = p.optional_bool("is_delete")?;
        let replies = match p.optional_array("replies")? {
            Some(items) => items
                .iter()
                .map(ReplyDetail::from_payload)
                .collect::<ValidationResult<Vec<_>>>()?,
            None => Vec::new(),
        };
        Ok(Self {
            id,
            username,
            date,
            content: mask(content, is_delete, COMMENT_MASK),
            like_count,
            replies,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ThreadDetail {
    pub id: Id,
    pub title: String,
    pub body: String,
    pub date: DateTime<Utc>,
    pub username: String,
    pub comments: Vec<CommentDetail>,
}

impl ThreadDetail {
    pub fn new(thread: ThreadSummary, comments: Vec<CommentDetail>) -> Self {
        Self {
            id: thread.id,
            title: thread.title,
            body: thread.body,
            date: thread.date,
            username: thread.username,
            comments,
        }
    }

    pub fn from_payload(payload: &Value) -> ValidationResult<Self> {
        let p = Payload::new(Entity::ThreadDetail, payload);
        p.require(&["id", "title", "body", "date", "username", "comments"])?;
        let thread = ThreadSummary {
            id: p.string("id")?,
            title: p.string("title")?,
            body: p.string("body")?,
            date: p.date("date")?,
            username: p.string("username")?,
        };
        let comments = p
            .array("comments")?
            .iter()
            .map(CommentDetail::from_payload)
            .collect::<ValidationResult<Vec<_>>>()?;
        Ok(Self::new(thread, comments))
    }
}
