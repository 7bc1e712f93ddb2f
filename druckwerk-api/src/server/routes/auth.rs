use crate::server::{Result, ServerError, ServerRouter, auth::AuthenticatedUser, json::Json};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use druckwerk_common::{
    model::{
        auth::{
            AuthToken, Authentication, ISSUED_TOKEN_LIFETIME, Password, StoredPasswordHash,
        },
        user::{Email, NewUser, Role, User, Username},
    },
    util::PositiveDuration,
};
use druckwerk_db::client::DbClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::UtcDateTime;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_post(register)
        .typed_post(login)
        .typed_get(me)
        .typed_put(update_profile)
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
struct SessionResponse {
    token: String,
    user: User,
}

/// Creates a fresh bearer token for `user` and persists its hash.
async fn issue_session(db: &DbClient, user: User) -> Result<SessionResponse> {
    let token = AuthToken::generate_random(user.id);

    let authentication = Authentication {
        user: user.id,
        role: user.role,
        token_hash: token.hash()?,
        created_at: UtcDateTime::now(),
        expires_after: Some(PositiveDuration::new_unchecked(ISSUED_TOKEN_LIFETIME)),
    };
    db.create_auth(&authentication).await?;

    Ok(SessionResponse {
        token: token.as_token_str(),
        user,
    })
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/auth/register", rejection(ServerError))]
struct RegisterPath();

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct RegisterRequest {
    username: Username,
    email: Email,
    password: String,
    confirm_password: String,
}

async fn register(
    RegisterPath(): RegisterPath,
    State(db): State<Arc<DbClient>>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<SessionResponse>)> {
    if request.password != request.confirm_password {
        return Err(ServerError::PasswordMismatch);
    }
    let password = Password::new(request.password)?;

    if db.fetch_login_by_email(&request.email).await?.is_some() {
        return Err(ServerError::EmailTaken);
    }

    let password_hash = StoredPasswordHash::derive(&password)?;
    let user = db
        .create_user(&NewUser {
            username: request.username,
            email: request.email,
            password_hash,
            role: Role::User,
            donor: false,
        })
        .await?;

    let session = issue_session(&db, user).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/auth/login", rejection(ServerError))]
struct LoginPath();

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct LoginRequest {
    email: Email,
    password: String,
}

async fn login(
    LoginPath(): LoginPath,
    State(db): State<Arc<DbClient>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<SessionResponse>> {
    let Some((user, password_hash)) = db.fetch_login_by_email(&request.email).await? else {
        return Err(ServerError::InvalidCredentials);
    };

    // A password below the policy length can never be stored, so it is
    // simply a wrong credential here.
    let password =
        Password::new(request.password).map_err(|_| ServerError::InvalidCredentials)?;
    if !password_hash.verify(&password) {
        return Err(ServerError::InvalidCredentials);
    }

    let session = issue_session(&db, user).await?;
    Ok(Json(session))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/auth/me", rejection(ServerError))]
struct MePath();

async fn me(
    MePath(): MePath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Json<User>> {
    let user = db
        .fetch_user(user.user_id())
        .await?
        .ok_or(ServerError::UserByIdNotFound(user.user_id()))?;

    Ok(Json(user))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/auth/me/profile", rejection(ServerError))]
struct UpdateProfilePath();

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct ProfileUpdate {
    username: Username,
}

async fn update_profile(
    UpdateProfilePath(): UpdateProfilePath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<User>> {
    let updated = db
        .update_username(user.user_id(), &update.username)
        .await?
        .ok_or(ServerError::UserByIdNotFound(user.user_id()))?;

    Ok(Json(updated))
}
