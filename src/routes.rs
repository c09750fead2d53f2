use std::sync::Arc;

use actix_web::{web, HttpResponse};
use serde_json::{json, Value};
use tracing::warn;

use crate::auth::Auth;
use crate::error::{ApiError, ApiErrorBody};
use crate::models::*;
use crate::repo::{Repo, UserRepo};
use crate::usecases;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config());
    cfg.service(web::resource("/threads").route(web::post().to(create_thread)))
        .service(web::resource("/threads/{thread_id}").route(web::get().to(get_thread)))
        .service(
            web::resource("/threads/{thread_id}/comments")
                .route(web::post().to(create_comment)),
        )
        .service(
            web::resource("/threads/{thread_id}/comments/{comment_id}")
                .route(web::delete().to(delete_comment)),
        )
        .service(
            web::resource("/threads/{thread_id}/comments/{comment_id}/likes")
                .route(web::put().to(like_comment)),
        )
        .service(
            web::resource("/threads/{thread_id}/comments/{comment_id}/replies")
                .route(web::post().to(create_reply)),
        )
        .service(
            web::resource("/threads/{thread_id}/comments/{comment_id}/replies/{reply_id}")
                .route(web::delete().to(delete_reply)),
        );
}

// Unparsable bodies get the same envelope as validation failures.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        warn!("rejected request body: {err}");
        let body = ApiErrorBody { status: "fail", message: "payload JSON tidak valid".to_string() };
        actix_web::error::InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
    })
}

#[derive(Clone)]
pub struct AppState { pub repo: Arc<dyn Repo> }

/// Record the token holder's display name before they author anything.
async fn remember_user(data: &AppState, auth: &Auth) -> Result<(), ApiError> {
    data.repo.upsert_user(auth.user_id(), auth.username()).await?;
    Ok(())
}

fn success(data: Value) -> Value {
    json!({ "status": "success", "data": data })
}

#[utoipa::path(
    post,
    path = "/threads",
    tag = "threads",
    request_body = NewThread,
    responses(
        (status = 201, description = "Thread created", body = AddedThread),
        (status = 400, description = "Missing or malformed property"),
        (status = 401, description = "Missing authentication")
    )
)]
pub async fn create_thread(
    auth: Auth,
    data: web::Data<AppState>,
    payload: web::Json<Value>,
) -> Result<HttpResponse, ApiError> {
    remember_user(&data, &auth).await?;
    let added = usecases::add_thread(&*data.repo, &payload, auth.user_id()).await?;
    Ok(HttpResponse::Created().json(success(json!({ "addedThread": added }))))
}

#[utoipa::path(
    get,
    path = "/threads/{thread_id}",
    tag = "threads",
    params(("thread_id" = String, Path, description = "Thread id")),
    responses(
        (status = 200, description = "Thread with comments and replies", body = ThreadDetail),
        (status = 404, description = "Thread not found")
    )
)]
pub async fn get_thread(data: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let thread = usecases::get_thread_detail(&*data.repo, &path).await?;
    Ok(HttpResponse::Ok().json(success(json!({ "thread": thread }))))
}

#[utoipa::path(
    post,
    path = "/threads/{thread_id}/comments",
    tag = "comments",
    request_body = NewComment,
    params(("thread_id" = String, Path, description = "Thread id")),
    responses(
        (status = 201, description = "Comment created", body = AddedComment),
        (status = 400, description = "Missing or malformed property"),
        (status = 404, description = "Thread not found")
    )
)]
pub async fn create_comment(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<Value>,
) -> Result<HttpResponse, ApiError> {
    remember_user(&data, &auth).await?;
    let added = usecases::add_comment(&*data.repo, &payload, &path, auth.user_id()).await?;
    Ok(HttpResponse::Created().json(success(json!({ "addedComment": added }))))
}

#[utoipa::path(
    delete,
    path = "/threads/{thread_id}/comments/{comment_id}",
    tag = "comments",
    params(
        ("thread_id" = String, Path, description = "Thread id"),
        ("comment_id" = String, Path, description = "Comment id")
    ),
    responses(
        (status = 200, description = "Comment soft-deleted"),
        (status = 403, description = "Requester does not own the comment"),
        (status = 404, description = "Thread or comment not found")
    )
)]
pub async fn delete_comment(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (thread_id, comment_id) = path.into_inner();
    usecases::delete_comment(&*data.repo, &thread_id, &comment_id, auth.user_id()).await?;
    Ok(HttpResponse::Ok().json(json!({ "status": "success" })))
}

#[utoipa::path(
    put,
    path = "/threads/{thread_id}/comments/{comment_id}/likes",
    tag = "comments",
    params(
        ("thread_id" = String, Path, description = "Thread id"),
        ("comment_id" = String, Path, description = "Comment id")
    ),
    responses(
        (status = 200, description = "Like toggled"),
        (status = 404, description = "Thread or comment not found")
    )
)]
pub async fn like_comment(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (thread_id, comment_id) = path.into_inner();
    usecases::like_comment(&*data.repo, &thread_id, &comment_id, auth.user_id()).await?;
    Ok(HttpResponse::Ok().json(json!({ "status": "success" })))
}

#[utoipa::path(
    post,
    path = "/threads/{thread_id}/comments/{comment_id}/replies",
    tag = "replies",
    request_body = NewReply,
    params(
        ("thread_id" = String, Path, description = "Thread id"),
        ("comment_id" = String, Path, description = "Comment id")
    ),
    responses(
        (status = 201, description = "Reply created", body = AddedReply),
        (status = 400, description = "Missing or malformed property"),
        (status = 404, description = "Thread or comment not found")
    )
)]
pub async fn create_reply(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<(String, String)>,
    payload: web::Json<Value>,
) -> Result<HttpResponse, ApiError> {
    let (thread_id, comment_id) = path.into_inner();
    remember_user(&data, &auth).await?;
    let added = usecases::add_reply(&*data.repo, &payload, &thread_id, &comment_id, auth.user_id()).await?;
    Ok(HttpResponse::Created().json(success(json!({ "addedReply": added }))))
}

#[utoipa::path(
    delete,
    path = "/threads/{thread_id}/comments/{comment_id}/replies/{reply_id}",
    tag = "replies",
    params(
        ("thread_id" = String, Path, description = "Thread id"),
        ("comment_id" = String, Path, description = "Comment id"),
        ("reply_id" = String, Path, description = "Reply id")
    ),
    responses(
        (status = 200, description = "Reply soft-deleted"),
        (status = 403, description = "Requester does not own the reply"),
        (status = 404, description = "Thread, comment or reply not found")
    )
)]
pub async fn delete_reply(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<(String, String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (thread_id, comment_id, reply_id) = path.into_inner();
    usecases::delete_reply(&*data.repo, &thread_id, &comment_id, &reply_id, auth.user_id()).await?;
    Ok(HttpResponse::Ok().json(json!({ "status": "success" })))
}
