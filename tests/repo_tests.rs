#![cfg(feature = "inmem-store")]

use threadline::{
    models::{NewComment, NewReply, NewThread, COMMENT_MASK, REPLY_MASK},
    repo::{inmem::InMemRepo, LikeState, RepoError},
};
// Bring trait method namespaces into scope so calls on InMemRepo resolve.
use threadline::repo::{CommentRepo, ReplyRepo, ThreadRepo, UserRepo};

/// Helper that returns a fresh, empty repository for every test run.
fn repo() -> InMemRepo {
    InMemRepo::new()
}

async fn seed_thread(r: &InMemRepo) -> String {
    r.upsert_user("user-123", "dicoding").await.unwrap();
    r.add_thread(NewThread { title: "judul".into(), body: "isi".into() }, "user-123")
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn thread_lookup_resolves_username() {
    let r = repo();
    let thread_id = seed_thread(&r).await;
    assert!(thread_id.starts_with("thread-"));

    r.check_thread_availability(&thread_id).await.unwrap();
    let t = r.get_thread_by_id(&thread_id).await.unwrap();
    assert_eq!(t.title, "judul");
    assert_eq!(t.username, "dicoding");

    let err = r.get_thread_by_id("thread-404").await.unwrap_err();
    assert_eq!(err, RepoError::NotFound("thread tidak ditemukan"));
}

#[tokio::test]
async fn unknown_user_falls_back_to_owner_id() {
    let r = repo();
    let added = r
        .add_thread(NewThread { title: "t".into(), body: "b".into() }, "user-999")
        .await
        .unwrap();
    assert_eq!(r.get_thread_by_id(&added.id).await.unwrap().username, "user-999");
}

#[tokio::test]
async fn comment_lifecycle_with_soft_delete() {
    let r = repo();
    let thread_id = seed_thread(&r).await;
    let c = r
        .add_comment(NewComment { content: "komentar".into() }, &thread_id, "user-123")
        .await
        .unwrap();
    assert_eq!(c.content, "komentar");
    assert_eq!(c.owner, "user-123");

    r.check_comment_availability(&c.id, &thread_id).await.unwrap();
    // a comment looked up under another thread does not exist there
    assert!(matches!(
        r.check_comment_availability(&c.id, "thread-other").await,
        Err(RepoError::NotFound(_))
    ));

    r.verify_comment_owner(&c.id, "user-123").await.unwrap();
    assert!(matches!(r.verify_comment_owner(&c.id, "user-456").await, Err(RepoError::Forbidden(_))));

    r.delete_comment(&c.id).await.unwrap();
    // second delete stays deleted, no error
    r.delete_comment(&c.id).await.unwrap();

    let comments = r.get_comments_by_thread_id(&thread_id).await.unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].content, COMMENT_MASK);
}

#[tokio::test]
async fn add_comment_to_missing_thread_is_not_found() {
    let r = repo();
    let err = r
        .add_comment(NewComment { content: "x".into() }, "thread-404", "user-123")
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound(_)));
}

#[tokio::test]
async fn like_toggle_counts() {
    let r = repo();
    let thread_id = seed_thread(&r).await;
    let c = r
        .add_comment(NewComment { content: "komentar".into() }, &thread_id, "user-123")
        .await
        .unwrap();

    assert_eq!(r.get_comment_like_count(&c.id).await.unwrap(), 0);
    assert_eq!(r.like_comment(&c.id, "user-123").await.unwrap(), LikeState::Liked);
    assert_eq!(r.get_comment_like_count(&c.id).await.unwrap(), 1);
    assert_eq!(r.like_comment(&c.id, "user-456").await.unwrap(), LikeState::Liked);
    assert_eq!(r.get_comment_like_count(&c.id).await.unwrap(), 2);
    assert_eq!(r.like_comment(&c.id, "user-123").await.unwrap(), LikeState::Unliked);
    assert_eq!(r.get_comment_like_count(&c.id).await.unwrap(), 1);

    let comments = r.get_comments_by_thread_id(&thread_id).await.unwrap();
    assert_eq!(comments[0].like_count, 1);
}

#[tokio::test]
async fn replies_are_batched_and_masked() {
    let r = repo();
    let thread_id = seed_thread(&r).await;
    let c1 = r.add_comment(NewComment { content: "satu".into() }, &thread_id, "user-123").await.unwrap();
    let c2 = r.add_comment(NewComment { content: "dua".into() }, &thread_id, "user-123").await.unwrap();

    let r1 = r.add_reply(NewReply { content: "balasan 1".into() }, &c1.id, "user-123").await.unwrap();
    let r2 = r.add_reply(NewReply { content: "balasan 2".into() }, &c2.id, "user-123").await.unwrap();
    r.verify_reply_exists(&r1.id, &c1.id).await.unwrap();
    assert!(matches!(r.verify_reply_exists(&r1.id, &c2.id).await, Err(RepoError::NotFound(_))));
    assert!(matches!(r.verify_reply_owner(&r2.id, "user-456").await, Err(RepoError::Forbidden(_))));

    r.delete_reply(&r1.id).await.unwrap();

    let replies = r
        .get_replies_by_comment_ids(&[c1.id.clone(), c2.id.clone()])
        .await
        .unwrap();
    assert_eq!(replies.len(), 2);
    let deleted = replies.iter().find(|x| x.id == r1.id).unwrap();
    assert_eq!(deleted.content, REPLY_MASK);
    assert!(deleted.is_delete);
    assert!(replies.windows(2).all(|w| w[0].date <= w[1].date));

    assert!(r.get_replies_by_comment_ids(&[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn add_reply_to_missing_comment_is_not_found() {
    let r = repo();
    let err = r
        .add_reply(NewReply { content: "x".into() }, "comment-404", "user-123")
        .await
        .unwrap_err();
    assert_eq!(err, RepoError::NotFound("comment tidak ditemukan"));
}
