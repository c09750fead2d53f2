use crate::models::{
    AddedComment, AddedReply, AddedThread, CommentDetail, NewComment, NewReply, NewThread, ReplyDetail,
    ThreadDetail,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::create_thread,
        crate::routes::get_thread,
        crate::routes::create_comment,
        crate::routes::delete_comment,
        crate::routes::like_comment,
        crate::routes::create_reply,
        crate::routes::delete_reply,
    ),
    components(schemas(
        NewThread, AddedThread, NewComment, AddedComment, NewReply, AddedReply,
        ThreadDetail, CommentDetail, ReplyDetail
    )),
    tags(
        (name = "threads", description = "Thread operations"),
        (name = "comments", description = "Comment operations and likes"),
        (name = "replies", description = "Reply operations"),
    )
)]
pub struct ApiDoc;
