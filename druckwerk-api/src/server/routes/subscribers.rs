use crate::server::{Result, ServerError, ServerRouter, auth::AuthenticatedUser, json::Json};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use druckwerk_common::model::{
    Id,
    subscriber::{Subscriber, SubscriberMarker, SubscriberStatus},
    user::{Email, Role},
};
use druckwerk_db::client::DbClient;
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_post(subscribe)
        .typed_put(unsubscribe)
        .typed_get(list_subscribers)
        .typed_put(set_status)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/subscribers/subscribe", rejection(ServerError))]
struct SubscribePath();

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct SubscribeRequest {
    email: Email,
}

async fn subscribe(
    SubscribePath(): SubscribePath,
    State(db): State<Arc<DbClient>>,
    Json(request): Json<SubscribeRequest>,
) -> Result<(StatusCode, Json<Subscriber>)> {
    if let Some(existing) = db.fetch_subscriber_by_email(&request.email).await? {
        return match existing.status {
            SubscriberStatus::Active => Err(ServerError::AlreadySubscribed),
            SubscriberStatus::Unsubscribed => {
                let subscriber = db
                    .set_subscriber_status(existing.id, SubscriberStatus::Active)
                    .await?
                    .ok_or(ServerError::SubscriberByIdNotFound(existing.id))?;

                Ok((StatusCode::OK, Json(subscriber)))
            }
        };
    }

    let subscriber = db.create_subscriber(&request.email).await?;
    Ok((StatusCode::CREATED, Json(subscriber)))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/subscribers/{id}/unsubscribe", rejection(ServerError))]
struct UnsubscribePath {
    id: Id<SubscriberMarker>,
}

async fn unsubscribe(
    UnsubscribePath { id }: UnsubscribePath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<Subscriber>> {
    let subscriber = db
        .set_subscriber_status(id, SubscriberStatus::Unsubscribed)
        .await?
        .ok_or(ServerError::SubscriberByIdNotFound(id))?;

    Ok(Json(subscriber))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/subscribers", rejection(ServerError))]
struct ListSubscribersPath();

async fn list_subscribers(
    ListSubscribersPath(): ListSubscribersPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<Subscriber>>> {
    if !user.holds(Role::Admin) {
        return Err(ServerError::Forbidden);
    }

    let subscribers = db.fetch_subscribers().await?;
    Ok(Json(subscribers))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/subscribers/{id}", rejection(ServerError))]
struct SetStatusPath {
    id: Id<SubscriberMarker>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct StatusUpdate {
    status: SubscriberStatus,
}

async fn set_status(
    SetStatusPath { id }: SetStatusPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<Subscriber>> {
    if !user.holds(Role::Admin) {
        return Err(ServerError::Forbidden);
    }

    let subscriber = db
        .set_subscriber_status(id, update.status)
        .await?
        .ok_or(ServerError::SubscriberByIdNotFound(id))?;

    Ok(Json(subscriber))
}
