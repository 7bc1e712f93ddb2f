use crate::server::{Result, ServerError, ServerRouter, auth::AuthenticatedUser, json::Json};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use druckwerk_common::model::{
    Id,
    comment::{Comment, CommentMarker, CommentUpdate, CreateComment},
    post::PostMarker,
    user::Role,
};
use druckwerk_db::client::DbClient;
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(get_post_comments)
        .typed_get(get_own_comments)
        .typed_post(create_comment)
        .typed_put(update_comment)
        .typed_delete(delete_comment)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/comments/post/{post_id}", rejection(ServerError))]
struct PostCommentsPath {
    post_id: Id<PostMarker>,
}

async fn get_post_comments(
    PostCommentsPath { post_id }: PostCommentsPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<Vec<Comment>>> {
    let comments = db.fetch_post_comments(post_id).await?;

    Ok(Json(comments))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/comments/mine", rejection(ServerError))]
struct OwnCommentsPath();

async fn get_own_comments(
    OwnCommentsPath(): OwnCommentsPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<Comment>>> {
    let comments = db.fetch_user_comments(user.user_id()).await?;

    Ok(Json(comments))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/comments/create", rejection(ServerError))]
struct CreateCommentPath();

async fn create_comment(
    CreateCommentPath(): CreateCommentPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(create): Json<CreateComment>,
) -> Result<(StatusCode, Json<Comment>)> {
    let comment = db
        .create_comment(&create, user.user_id())
        .await?
        .ok_or(ServerError::PostByIdNotFound(create.post_id))?;

    Ok((StatusCode::CREATED, Json(comment)))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/comments/{id}", rejection(ServerError))]
struct UpdateCommentPath {
    id: Id<CommentMarker>,
}

async fn update_comment(
    UpdateCommentPath { id }: UpdateCommentPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(update): Json<CommentUpdate>,
) -> Result<Json<Comment>> {
    let comment = db
        .fetch_comment(id)
        .await?
        .ok_or(ServerError::CommentByIdNotFound(id))?;

    if !user.may_act_for(comment.author.id) {
        return Err(ServerError::Forbidden);
    }

    // Only admins decide what the public gets to see.
    if update.is_public.is_some() && !user.holds(Role::Admin) {
        return Err(ServerError::Forbidden);
    }

    let updated = db
        .update_comment(id, &update)
        .await?
        .ok_or(ServerError::CommentByIdNotFound(id))?;

    Ok(Json(updated))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/comments/{id}", rejection(ServerError))]
struct DeleteCommentPath {
    id: Id<CommentMarker>,
}

async fn delete_comment(
    DeleteCommentPath { id }: DeleteCommentPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<StatusCode> {
    let comment = db
        .fetch_comment(id)
        .await?
        .ok_or(ServerError::CommentByIdNotFound(id))?;

    if !user.may_act_for(comment.author.id) {
        return Err(ServerError::Forbidden);
    }

    db.delete_comment(id)
        .await?
        .ok_or(ServerError::CommentByIdNotFound(id))?;

    Ok(StatusCode::NO_CONTENT)
}
