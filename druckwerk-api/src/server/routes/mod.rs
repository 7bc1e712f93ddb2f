use crate::server::ServerRouter;
use axum::Router;

mod auth;
mod comments;
mod posts;
mod subscribers;
mod users;

pub fn routes() -> ServerRouter {
    Router::new()
        .merge(auth::routes())
        .merge(comments::routes())
        .merge(posts::routes())
        .merge(subscribers::routes())
        .merge(users::routes())
}
