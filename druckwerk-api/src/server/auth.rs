use crate::server::ServerError;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::TypedHeader;
use druckwerk_common::model::{
    Id,
    auth::AuthToken,
    user::{Role, UserMarker},
};
use druckwerk_db::client::DbClient;
use headers::{Authorization, authorization::Bearer};
use std::sync::Arc;
use time::UtcDateTime;

type AuthorizationHeader = TypedHeader<Authorization<Bearer>>;

/// The identity behind a request, resolved from the bearer token.
///
/// All authorization questions go through [`Self::holds`] and
/// [`Self::may_act_for`]; routes never inspect roles on their own.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct AuthenticatedUser {
    id: Id<UserMarker>,
    role: Role,
}

impl AuthenticatedUser {
    #[must_use]
    pub fn user_id(self) -> Id<UserMarker> {
        self.id
    }

    /// Does this identity hold `role`?
    #[must_use]
    pub fn holds(self, role: Role) -> bool {
        self.role == role
    }

    /// May this identity modify a resource owned by `owner`? True for the
    /// owner themselves and for admins.
    #[must_use]
    pub fn may_act_for(self, owner: Id<UserMarker>) -> bool {
        self.id == owner || self.holds(Role::Admin)
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<DbClient>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let request_token: AuthToken = AuthorizationHeader::from_request_parts(parts, state)
            .await
            .map_err(ServerError::InvalidAuthorizationHeader)?
            .token()
            .parse()?;

        let token_hash = request_token.hash()?;

        let authentication = Arc::<DbClient>::from_ref(state)
            .fetch_auth(&token_hash)
            .await?
            .ok_or(ServerError::InvalidToken)?;

        assert_eq!(authentication.token_hash, token_hash);

        if authentication.is_expired(UtcDateTime::now()) {
            return Err(ServerError::InvalidToken);
        }

        Ok(Self {
            id: authentication.user,
            role: authentication.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::server::auth::AuthenticatedUser;
    use druckwerk_common::model::{Id, user::Role};

    #[test]
    fn capability_checks() {
        let admin = AuthenticatedUser {
            id: Id::from(1_u64),
            role: Role::Admin,
        };
        let user = AuthenticatedUser {
            id: Id::from(2_u64),
            role: Role::User,
        };

        assert!(admin.holds(Role::Admin));
        assert!(!user.holds(Role::Admin));

        // Owners may act for themselves, admins for everyone.
        assert!(user.may_act_for(Id::from(2_u64)));
        assert!(!user.may_act_for(Id::from(1_u64)));
        assert!(admin.may_act_for(Id::from(2_u64)));
    }
}
