use crate::server::{Result, ServerError, ServerRouter, auth::AuthenticatedUser, json::Json};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use druckwerk_common::model::{
    Id,
    interaction::LikeState,
    post::{PartialPost, Post, PostDraft, PostMarker},
};
use druckwerk_db::client::DbClient;
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_posts)
        .typed_get(get_post)
        .typed_post(create_post)
        .typed_put(update_post)
        .typed_delete(delete_post)
        .typed_post(toggle_like)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts", rejection(ServerError))]
struct ListPostsPath();

async fn list_posts(
    ListPostsPath(): ListPostsPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<Vec<PartialPost>>> {
    let posts = db.fetch_posts().await?;

    Ok(Json(posts))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}", rejection(ServerError))]
struct GetPostPath {
    id: Id<PostMarker>,
}

async fn get_post(
    GetPostPath { id }: GetPostPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<Post>> {
    let post = db
        .fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(Json(post))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/create", rejection(ServerError))]
struct CreatePostPath();

async fn create_post(
    CreatePostPath(): CreatePostPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(draft): Json<PostDraft>,
) -> Result<(StatusCode, Json<PartialPost>)> {
    let post = db.create_post(&draft, user.user_id()).await?;

    Ok((StatusCode::CREATED, Json(post)))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}", rejection(ServerError))]
struct UpdatePostPath {
    id: Id<PostMarker>,
}

async fn update_post(
    UpdatePostPath { id }: UpdatePostPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(draft): Json<PostDraft>,
) -> Result<Json<Post>> {
    let post = db
        .fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    if !user.may_act_for(post.author.id) {
        return Err(ServerError::Forbidden);
    }

    let updated = db
        .update_post(id, &draft)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(Json(updated))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}", rejection(ServerError))]
struct DeletePostPath {
    id: Id<PostMarker>,
}

async fn delete_post(
    DeletePostPath { id }: DeletePostPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<StatusCode> {
    let post = db
        .fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    if !user.may_act_for(post.author.id) {
        return Err(ServerError::Forbidden);
    }

    if !db.delete_post(id).await? {
        return Err(ServerError::PostByIdNotFound(id));
    }

    Ok(StatusCode::NO_CONTENT)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/like", rejection(ServerError))]
struct ToggleLikePath {
    id: Id<PostMarker>,
}

async fn toggle_like(
    ToggleLikePath { id }: ToggleLikePath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Json<LikeState>> {
    let state = db
        .toggle_post_like(id, user.user_id())
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(Json(state))
}
