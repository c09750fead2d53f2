//! Orchestration tests for the use cases against hand-written stub
//! repositories that record which calls were made.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;
use threadline::models::*;
use threadline::repo::*;
use threadline::usecases::{self, UseCaseError};

fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 12, 6, 7, minute, 33).unwrap()
}

#[derive(Default)]
struct StubRepo {
    thread: Option<ThreadSummary>,
    comments: Vec<CommentRow>,
    replies: Vec<ReplyRow>,
    owner: String,
    fail_comments: bool,
    calls: Mutex<Vec<String>>,
}

impl StubRepo {
    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
    fn called(&self, name: &str) -> bool {
        self.calls().iter().any(|c| c.starts_with(name))
    }
    fn has_thread(&self, id: &str) -> bool {
        self.thread.as_ref().map(|t| t.id == id).unwrap_or(false)
    }
}

#[async_trait]
impl ThreadRepo for StubRepo {
    async fn add_thread(&self, new: NewThread, owner: &str) -> RepoResult<AddedThread> {
        self.record("add_thread");
        Ok(AddedThread { id: "thread-123".into(), title: new.title, owner: owner.into() })
    }
    async fn check_thread_availability(&self, thread_id: &str) -> RepoResult<()> {
        self.record("check_thread_availability");
        if self.has_thread(thread_id) { Ok(()) } else { Err(RepoError::NotFound(THREAD_NOT_FOUND)) }
    }
    async fn get_thread_by_id(&self, thread_id: &str) -> RepoResult<ThreadSummary> {
        self.record("get_thread_by_id");
        self.thread.clone().filter(|t| t.id == thread_id).ok_or(RepoError::NotFound(THREAD_NOT_FOUND))
    }
}

#[async_trait]
impl CommentRepo for StubRepo {
    async fn add_comment(&self, new: NewComment, _thread_id: &str, owner: &str) -> RepoResult<AddedComment> {
        self.record("add_comment");
        Ok(AddedComment { id: "comment-123".into(), content: new.content, owner: owner.into() })
    }
    async fn check_comment_availability(&self, comment_id: &str, _thread_id: &str) -> RepoResult<()> {
        self.record("check_comment_availability");
        if self.comments.iter().any(|c| c.id == comment_id) { Ok(()) } else { Err(RepoError::NotFound(COMMENT_NOT_FOUND)) }
    }
    async fn verify_comment_owner(&self, _comment_id: &str, owner: &str) -> RepoResult<()> {
        self.record("verify_comment_owner");
        if owner == self.owner { Ok(()) } else { Err(RepoError::Forbidden(NOT_OWNER)) }
    }
    async fn delete_comment(&self, comment_id: &str) -> RepoResult<()> {
        self.record(format!("delete_comment:{comment_id}"));
        Ok(())
    }
    async fn get_comments_by_thread_id(&self, _thread_id: &str) -> RepoResult<Vec<CommentDetail>> {
        self.record("get_comments_by_thread_id");
        if self.fail_comments {
            return Err(RepoError::Internal("connection reset".into()));
        }
        Ok(self.comments.iter().cloned().map(CommentDetail::from_row).collect())
    }
    async fn like_comment(&self, _comment_id: &str, _user_id: &str) -> RepoResult<LikeState> {
        self.record("like_comment");
        Ok(LikeState::Liked)
    }
    async fn get_comment_like_count(&self, _comment_id: &str) -> RepoResult<u64> {
        Ok(0)
    }
}

#[async_trait]
impl ReplyRepo for StubRepo {
    async fn add_reply(&self, new: NewReply, _comment_id: &str, owner: &str) -> RepoResult<AddedReply> {
        self.record("add_reply");
        Ok(AddedReply { id: "reply-123".into(), content: new.content, owner: owner.into() })
    }
    async fn get_replies_by_comment_ids(&self, comment_ids: &[Id]) -> RepoResult<Vec<ReplyDetail>> {
        self.record(format!("get_replies_by_comment_ids:{}", comment_ids.join(",")));
        Ok(self
            .replies
            .iter()
            .filter(|r| comment_ids.contains(&r.comment_id))
            .cloned()
            .map(ReplyDetail::from_row)
            .collect())
    }
    async fn verify_reply_exists(&self, reply_id: &str, _comment_id: &str) -> RepoResult<()> {
        self.record("verify_reply_exists");
        if self.replies.iter().any(|r| r.id == reply_id) { Ok(()) } else { Err(RepoError::NotFound(REPLY_NOT_FOUND)) }
    }
    async fn verify_reply_owner(&self, _reply_id: &str, owner: &str) -> RepoResult<()> {
        self.record("verify_reply_owner");
        if owner == self.owner { Ok(()) } else { Err(RepoError::Forbidden(NOT_OWNER)) }
    }
    async fn delete_reply(&self, reply_id: &str) -> RepoResult<()> {
        self.record(format!("delete_reply:{reply_id}"));
        Ok(())
    }
}

fn thread_123() -> ThreadSummary {
    ThreadSummary {
        id: "thread-123".into(),
        title: "judul thread".into(),
        body: "isi thread".into(),
        date: at(22),
        username: "dicoding".into(),
    }
}

fn comment_row(id: &str, minute: u32, content: &str, is_delete: bool) -> CommentRow {
    CommentRow {
        id: id.into(),
        username: "dicoding".into(),
        date: at(minute),
        content: content.into(),
        is_delete,
        like_count: 0,
    }
}

fn reply_row(id: &str, comment_id: &str, minute: u32, username: &str, content: &str, is_delete: bool) -> ReplyRow {
    ReplyRow {
        id: id.into(),
        content: content.into(),
        date: at(minute),
        username: username.into(),
        comment_id: comment_id.into(),
        is_delete,
    }
}

/// thread-123 with an active comment carrying a deleted and an active reply,
/// followed by a deleted comment without replies.
fn scenario() -> StubRepo {
    StubRepo {
        thread: Some(thread_123()),
        comments: vec![
            comment_row("comment-001", 23, "komentar pertama", false),
            comment_row("comment-002", 24, "komentar dihapus", true),
        ],
        // delivered out of date order on purpose
        replies: vec![
            reply_row("reply-002", "comment-001", 26, "dicoding", "balasan kedua", false),
            reply_row("reply-001", "comment-001", 25, "alice", "balasan yang dihapus", true),
        ],
        owner: "user-123".into(),
        ..Default::default()
    }
}

#[tokio::test]
async fn missing_thread_short_circuits_before_comment_and_reply_fetch() {
    let repo = StubRepo::default();
    let err = usecases::get_thread_detail(&repo, "thread-not-found").await.unwrap_err();
    assert_eq!(err, UseCaseError::Repo(RepoError::NotFound(THREAD_NOT_FOUND)));
    assert_eq!(repo.calls(), vec!["get_thread_by_id".to_string()]);
}

#[tokio::test]
async fn assembles_nested_detail_with_masks_and_order() {
    let repo = scenario();
    let detail = usecases::get_thread_detail(&repo, "thread-123").await.unwrap();

    assert_eq!(detail.id, "thread-123");
    assert_eq!(detail.username, "dicoding");
    assert_eq!(detail.comments.len(), 2);

    let first = &detail.comments[0];
    assert_eq!(first.id, "comment-001");
    assert_eq!(first.content, "komentar pertama");
    assert_eq!(first.like_count, 0);
    let reply_ids: Vec<&str> = first.replies.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(reply_ids, ["reply-001", "reply-002"]);
    assert_eq!(first.replies[0].content, REPLY_MASK);
    assert_eq!(first.replies[0].username, "alice");
    assert!(first.replies[0].is_delete);
    assert_eq!(first.replies[1].content, "balasan kedua");

    let second = &detail.comments[1];
    assert_eq!(second.content, COMMENT_MASK);
    assert!(second.replies.is_empty());

    // one batched reply lookup covering the deleted comment too
    let batched: Vec<String> = repo.calls().into_iter().filter(|c| c.starts_with("get_replies")).collect();
    assert_eq!(batched, vec!["get_replies_by_comment_ids:comment-001,comment-002".to_string()]);
}

#[tokio::test]
async fn serialised_detail_matches_client_shape() {
    let repo = scenario();
    let detail = usecases::get_thread_detail(&repo, "thread-123").await.unwrap();
    let v = serde_json::to_value(&detail).unwrap();

    let comment = &v["comments"][0];
    let mut keys: Vec<&String> = comment.as_object().unwrap().keys().collect();
    keys.sort();
    assert_eq!(keys, ["content", "date", "id", "likeCount", "replies", "username"]);

    let reply = &comment["replies"][0];
    assert_eq!(reply["comment_id"], "comment-001");
    assert_eq!(reply["is_delete"], true);
    assert_eq!(reply["content"], "**balasan telah dihapus**");
    assert_eq!(v["comments"][1]["content"], "**komentar telah dihapus**");
    assert_eq!(v["comments"][1]["replies"], json!([]));

    // the serialised view passes its own validator unchanged
    assert_eq!(ThreadDetail::from_payload(&v).unwrap(), detail);
}

#[tokio::test]
async fn thread_without_comments_skips_reply_fetch() {
    let repo = StubRepo { thread: Some(thread_123()), ..Default::default() };
    let detail = usecases::get_thread_detail(&repo, "thread-123").await.unwrap();
    assert!(detail.comments.is_empty());
    assert!(!repo.called("get_replies_by_comment_ids"));
}

#[tokio::test]
async fn comment_fetch_failure_propagates() {
    let repo = StubRepo { fail_comments: true, ..scenario() };
    let err = usecases::get_thread_detail(&repo, "thread-123").await.unwrap_err();
    assert!(matches!(err, UseCaseError::Repo(RepoError::Internal(_))));
    assert!(!repo.called("get_replies_by_comment_ids"));
}

#[tokio::test]
async fn add_thread_validates_before_insert() {
    let repo = StubRepo::default();
    let err = usecases::add_thread(&repo, &json!({ "title": "judul thread" }), "user-123").await.unwrap_err();
    assert_eq!(err.to_string(), "THREAD.NOT_CONTAIN_NEEDED_PROPERTY");
    let err = usecases::add_thread(&repo, &json!({ "title": "judul", "body": 123 }), "user-123").await.unwrap_err();
    assert_eq!(err.to_string(), "THREAD.NOT_MEET_DATA_TYPE_SPECIFICATION");
    assert!(!repo.called("add_thread"));

    let added = usecases::add_thread(&repo, &json!({ "title": "judul", "body": "isi" }), "user-123").await.unwrap();
    assert_eq!(added, AddedThread { id: "thread-123".into(), title: "judul".into(), owner: "user-123".into() });
}

#[tokio::test]
async fn add_comment_requires_thread() {
    let repo = StubRepo::default();
    let err = usecases::add_comment(&repo, &json!({ "content": "hai" }), "thread-404", "user-123").await.unwrap_err();
    assert!(matches!(err, UseCaseError::Repo(RepoError::NotFound(_))));
    assert!(!repo.called("add_comment"));

    let repo = scenario();
    let added = usecases::add_comment(&repo, &json!({ "content": "hai" }), "thread-123", "user-123").await.unwrap();
    assert_eq!(added.content, "hai");
}

#[tokio::test]
async fn add_reply_requires_thread_and_comment() {
    let repo = scenario();
    let err = usecases::add_reply(&repo, &json!({ "content": "hai" }), "thread-123", "comment-404", "user-123")
        .await
        .unwrap_err();
    assert_eq!(err, UseCaseError::Repo(RepoError::NotFound(COMMENT_NOT_FOUND)));
    assert!(!repo.called("add_reply"));

    let added = usecases::add_reply(&repo, &json!({ "content": "hai" }), "thread-123", "comment-001", "user-123")
        .await
        .unwrap();
    assert_eq!(added.owner, "user-123");
}

#[tokio::test]
async fn delete_comment_checks_chain_then_owner() {
    let repo = scenario();
    let err = usecases::delete_comment(&repo, "thread-123", "comment-001", "user-456").await.unwrap_err();
    assert_eq!(err, UseCaseError::Repo(RepoError::Forbidden(NOT_OWNER)));
    assert!(!repo.called("delete_comment"));

    usecases::delete_comment(&repo, "thread-123", "comment-001", "user-123").await.unwrap();
    assert_eq!(
        repo.calls(),
        vec![
            "check_thread_availability",
            "check_comment_availability",
            "verify_comment_owner",
            "check_thread_availability",
            "check_comment_availability",
            "verify_comment_owner",
            "delete_comment:comment-001",
        ]
    );
}

#[tokio::test]
async fn delete_reply_missing_reply_is_not_found_not_forbidden() {
    let repo = scenario();
    let err = usecases::delete_reply(&repo, "thread-123", "comment-001", "reply-404", "user-456")
        .await
        .unwrap_err();
    assert_eq!(err, UseCaseError::Repo(RepoError::NotFound(REPLY_NOT_FOUND)));
    assert!(!repo.called("verify_reply_owner"));

    usecases::delete_reply(&repo, "thread-123", "comment-001", "reply-002", "user-123").await.unwrap();
    assert!(repo.called("delete_reply:reply-002"));
}

#[tokio::test]
async fn like_requires_existing_comment() {
    let repo = scenario();
    let err = usecases::like_comment(&repo, "thread-123", "comment-404", "user-123").await.unwrap_err();
    assert!(matches!(err, UseCaseError::Repo(RepoError::NotFound(_))));
    assert!(!repo.called("like_comment"));

    let state = usecases::like_comment(&repo, "thread-123", "comment-001", "user-123").await.unwrap();
    assert_eq!(state, LikeState::Liked);
}
