use axum::{
    Router,
    extract::{
        FromRef, Request,
        rejection::{JsonRejection, PathRejection},
    },
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use axum_extra::typed_header::TypedHeaderRejection;
use druckwerk_common::model::{
    Id, ModelValidationError,
    auth::{AuthTokenDecodeError, AuthTokenHashError, PasswordHashingError, PasswordTooShortError},
    comment::CommentMarker,
    post::PostMarker,
    subscriber::SubscriberMarker,
    user::UserMarker,
};
use druckwerk_db::client::{DbClient, DbError};
use json::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

mod auth;
mod json;
mod routes;

pub type ServerRouter = Router<ServerState>;

#[derive(Clone, Debug, FromRef)]
pub struct ServerState {
    pub db_client: Arc<DbClient>,
}

pub fn routes() -> ServerRouter {
    routes::routes().fallback(fallback)
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Incoming JSON rejected: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error("Authorization header was missing or invalid: {0}")]
    InvalidAuthorizationHeader(TypedHeaderRejection),
    #[error("The provided auth token could not be decoded: {0}")]
    InvalidAuthToken(#[from] AuthTokenDecodeError),
    #[error("The auth token could not be hashed: {0}")]
    AuthTokenHash(#[from] AuthTokenHashError),
    #[error("The password could not be hashed: {0}")]
    PasswordHashing(#[from] PasswordHashingError),
    #[error("Provided token was invalid")]
    InvalidToken,
    #[error("Email or password was incorrect")]
    InvalidCredentials,
    #[error("The identity is not allowed to perform this action")]
    Forbidden,
    #[error("Password and confirmation do not match")]
    PasswordMismatch,
    #[error(transparent)]
    PasswordTooShort(#[from] PasswordTooShortError),
    #[error("Request contained invalid data: {0}")]
    Validation(#[from] ModelValidationError),
    #[error("The email address is already registered")]
    EmailTaken,
    #[error("The email address is already subscribed")]
    AlreadySubscribed,
    #[error(transparent)]
    Database(#[from] DbError),
    #[error("Post with id {0} was not found.")]
    PostByIdNotFound(Id<PostMarker>),
    #[error("User with id {0} was not found.")]
    UserByIdNotFound(Id<UserMarker>),
    #[error("Comment with id {0} was not found.")]
    CommentByIdNotFound(Id<CommentMarker>),
    #[error("Subscriber with id {0} was not found.")]
    SubscriberByIdNotFound(Id<SubscriberMarker>),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_)
            | ServerError::PathRejection(_)
            | ServerError::PostByIdNotFound(_)
            | ServerError::UserByIdNotFound(_)
            | ServerError::CommentByIdNotFound(_)
            | ServerError::SubscriberByIdNotFound(_) => StatusCode::NOT_FOUND,
            // No usable identity at all, whether the header is absent or the
            // token in it cannot be read.
            ServerError::InvalidAuthorizationHeader(_)
            | ServerError::InvalidAuthToken(_)
            | ServerError::InvalidToken
            | ServerError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ServerError::Forbidden => StatusCode::FORBIDDEN,
            ServerError::JsonRejection(_)
            | ServerError::PasswordMismatch
            | ServerError::PasswordTooShort(_)
            | ServerError::Validation(_)
            | ServerError::EmailTaken
            | ServerError::AlreadySubscribed => StatusCode::BAD_REQUEST,
            ServerError::JsonResponse(_)
            | ServerError::Database(_)
            | ServerError::AuthTokenHash(_)
            | ServerError::PasswordHashing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
struct ErrorResponse {
    status: u16,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        error!(error = %self, %status, "Replying with error");

        let error_response = ErrorResponse {
            status: status.as_u16(),
        };
        (status, Json(error_response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use crate::server::ServerError;
    use axum::http::StatusCode;
    use druckwerk_common::model::{Id, auth::AuthTokenDecodeError};

    #[test]
    fn missing_resources_reply_not_found() {
        for error in [
            ServerError::PostByIdNotFound(Id::from(1_u64)),
            ServerError::UserByIdNotFound(Id::from(1_u64)),
            ServerError::CommentByIdNotFound(Id::from(1_u64)),
            ServerError::SubscriberByIdNotFound(Id::from(1_u64)),
        ] {
            assert_eq!(error.status(), StatusCode::NOT_FOUND);
        }
    }

    #[test]
    fn auth_failures_reply_unauthorized() {
        assert_eq!(
            ServerError::InvalidToken.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ServerError::InvalidCredentials.status(),
            StatusCode::UNAUTHORIZED
        );
        // A bearer token that cannot even be decoded is still just an
        // invalid identity, not a generic bad request.
        assert_eq!(
            ServerError::InvalidAuthToken(AuthTokenDecodeError::NotEnoughParts).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ServerError::Forbidden.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn client_mistakes_reply_bad_request() {
        for error in [
            ServerError::PasswordMismatch,
            ServerError::EmailTaken,
            ServerError::AlreadySubscribed,
        ] {
            assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        }
    }
}
