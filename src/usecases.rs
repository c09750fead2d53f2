//! Request-level orchestration over the repository contracts.
//!
//! Every function is generic over the repository traits it needs, so the
//! HTTP layer can pass `&dyn Repo` while tests pass narrow stubs.

use std::collections::HashMap;

use serde_json::Value;
use tracing::info;

use crate::models::*;
use crate::repo::{CommentRepo, LikeState, RepoError, ReplyRepo, ThreadRepo};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum UseCaseError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

pub type UseCaseResult<T> = Result<T, UseCaseError>;

pub async fn add_thread<R>(repo: &R, payload: &Value, owner: &str) -> UseCaseResult<AddedThread>
where
    R: ThreadRepo + ?Sized,
{
    let new = NewThread::from_payload(payload)?;
    let added = repo.add_thread(new, owner).await?;
    info!(thread_id = %added.id, owner, "thread created");
    Ok(added)
}

pub async fn add_comment<R>(
    repo: &R,
    payload: &Value,
    thread_id: &str,
    owner: &str,
) -> UseCaseResult<AddedComment>
where
    R: ThreadRepo + CommentRepo + ?Sized,
{
    repo.check_thread_availability(thread_id).await?;
    let new = NewComment::from_payload(payload)?;
    let added = repo.add_comment(new, thread_id, owner).await?;
    info!(comment_id = %added.id, thread_id, owner, "comment created");
    Ok(added)
}

pub async fn add_reply<R>(
    repo: &R,
    payload: &Value,
    thread_id: &str,
    comment_id: &str,
    owner: &str,
) -> UseCaseResult<AddedReply>
where
    R: ThreadRepo + CommentRepo + ReplyRepo + ?Sized,
{
    repo.check_thread_availability(thread_id).await?;
    repo.check_comment_availability(comment_id, thread_id).await?;
    let new = NewReply::from_payload(payload)?;
    let added = repo.add_reply(new, comment_id, owner).await?;
    info!(reply_id = %added.id, comment_id, owner, "reply created");
    Ok(added)
}

/// Soft delete. Existence is checked before ownership so a missing comment
/// is always NotFound, never Forbidden.
pub async fn delete_comment<R>(repo: &R, thread_id: &str, comment_id: &str, owner: &str) -> UseCaseResult<()>
where
    R: ThreadRepo + CommentRepo + ?Sized,
{
    repo.check_thread_availability(thread_id).await?;
    repo.check_comment_availability(comment_id, thread_id).await?;
    repo.verify_comment_owner(comment_id, owner).await?;
    repo.delete_comment(comment_id).await?;
    info!(comment_id, owner, "comment soft-deleted");
    Ok(())
}

pub async fn delete_reply<R>(
    repo: &R,
    thread_id: &str,
    comment_id: &str,
    reply_id: &str,
    owner: &str,
) -> UseCaseResult<()>
where
    R: ThreadRepo + CommentRepo + ReplyRepo + ?Sized,
{
    repo.check_thread_availability(thread_id).await?;
    repo.check_comment_availability(comment_id, thread_id).await?;
    repo.verify_reply_exists(reply_id, comment_id).await?;
    repo.verify_reply_owner(reply_id, owner).await?;
    repo.delete_reply(reply_id).await?;
    info!(reply_id, owner, "reply soft-deleted");
    Ok(())
}

pub async fn like_comment<R>(repo: &R, thread_id: &str, comment_id: &str, user_id: &str) -> UseCaseResult<LikeState>
where
    R: ThreadRepo + CommentRepo + ?Sized,
{
    repo.check_thread_availability(thread_id).await?;
    repo.check_comment_availability(comment_id, thread_id).await?;
    let state = repo.like_comment(comment_id, user_id).await?;
    info!(comment_id, user_id, ?state, "comment like toggled");
    Ok(state)
}

/// Assemble the nested thread → comments → replies view.
///
/// The thread lookup runs first and short-circuits: when it fails, neither
/// comments nor replies are fetched. Replies for all comments, deleted ones
/// included, come from a single batched call.
pub async fn get_thread_detail<R>(repo: &R, thread_id: &str) -> UseCaseResult<ThreadDetail>
where
    R: ThreadRepo + CommentRepo + ReplyRepo + ?Sized,
{
    let thread = repo.get_thread_by_id(thread_id).await?;
    let mut comments = repo.get_comments_by_thread_id(thread_id).await?;
    comments.sort_by(|a, b| a.date.cmp(&b.date));

    let comment_ids: Vec<Id> = comments.iter().map(|c| c.id.clone()).collect();
    let replies = if comment_ids.is_empty() {
        Vec::new()
    } else {
        repo.get_replies_by_comment_ids(&comment_ids).await?
    };

    attach_replies(&mut comments, replies);
    Ok(ThreadDetail::new(thread, comments))
}

/// Group replies by owning comment, order each group by date (stable), and
/// hand each comment its group. Replies whose comment is not in `comments`
/// are dropped.
pub fn attach_replies(comments: &mut [CommentDetail], replies: Vec<ReplyDetail>) {
    let mut by_comment: HashMap<Id, Vec<ReplyDetail>> = HashMap::new();
    for reply in replies {
        by_comment.entry(reply.comment_id.clone()).or_default().push(reply);
    }
    for comment in comments.iter_mut() {
        let mut group = by_comment.remove(&comment.id).unwrap_or_default();
        group.sort_by(|a, b| a.date.cmp(&b.date));
        comment.replies = group;
    }
}
