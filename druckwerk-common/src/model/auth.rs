use crate::{
    model::{
        Id,
        user::{Role, UserMarker},
    },
    util::PositiveDuration,
};
use argon2::{
    Argon2, Params, PasswordHasher, PasswordVerifier,
    password_hash::{PasswordHash, SaltString, rand_core::OsRng},
};
use base64::{DecodeError, Engine, display::Base64Display, prelude::BASE64_STANDARD};
use std::{
    fmt::{Debug, Formatter},
    num::ParseIntError,
    str::FromStr,
};
use thiserror::Error;
use time::{Duration, UtcDateTime};

pub const AUTH_TOKEN_CORE_LEN: usize = 24;
pub const AUTH_TOKEN_SALT_LEN: usize = 18;
pub const AUTH_TOKEN_HASH_LEN: usize = Params::DEFAULT_OUTPUT_LEN;

/// Lifetime of tokens issued at login and registration.
pub const ISSUED_TOKEN_LIFETIME: Duration = Duration::hours(24);

#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error("Hashing auth token failed: {0}")]
pub struct AuthTokenHashError(argon2::Error);

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum AuthTokenDecodeError {
    #[error("Not enough parts separated by ':'")]
    NotEnoughParts,
    #[error("Invalid user id: {0}")]
    InvalidUserId(ParseIntError),
    #[error("Decoding base64 failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("The length of the core part is incorrect")]
    InvalidCoreLength,
    #[error("The length of the salt part is incorrect")]
    InvalidSaltLength,
}

/// An opaque bearer token in the form `user_id:base64(core):base64(salt)`.
///
/// Only the argon2 hash of the core is stored server-side, so a database
/// leak does not leak usable credentials.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct AuthToken {
    pub user_id: Id<UserMarker>,
    pub core: [u8; AUTH_TOKEN_CORE_LEN],
    pub salt: [u8; AUTH_TOKEN_SALT_LEN],
}

#[derive(Clone, Eq, PartialEq, Hash)]
pub struct AuthTokenHash(pub Box<[u8; AUTH_TOKEN_HASH_LEN]>);

/// A stored credential: who the token belongs to and when it stops working.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Authentication {
    pub user: Id<UserMarker>,
    pub role: Role,
    pub token_hash: AuthTokenHash,
    pub created_at: UtcDateTime,
    pub expires_after: Option<PositiveDuration>,
}

impl Authentication {
    #[must_use]
    pub fn is_expired(&self, now: UtcDateTime) -> bool {
        match self.expires_after {
            Some(expires_after) => self.created_at + expires_after.get() < now,
            None => false,
        }
    }
}

impl AuthToken {
    #[must_use]
    pub fn generate_random(user_id: Id<UserMarker>) -> Self {
        let core = rand::random();
        let salt = rand::random();

        Self {
            user_id,
            core,
            salt,
        }
    }

    #[must_use]
    pub fn as_token_str(&self) -> String {
        let user_id = self.user_id;
        let encoded_core = Base64Display::new(&self.core, &BASE64_STANDARD);
        let encoded_salt = Base64Display::new(&self.salt, &BASE64_STANDARD);

        format!("{user_id}:{encoded_core}:{encoded_salt}")
    }

    pub fn hash(&self) -> Result<AuthTokenHash, AuthTokenHashError> {
        let argon2 = Argon2::default();

        let mut hash = Box::new([0; AUTH_TOKEN_HASH_LEN]);
        argon2
            .hash_password_into(&self.core, &self.salt, &mut *hash)
            .map_err(AuthTokenHashError)?;

        Ok(AuthTokenHash(hash))
    }
}

impl FromStr for AuthToken {
    type Err = AuthTokenDecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');

        let user_id_part = parts.next().ok_or(Self::Err::NotEnoughParts)?;
        let core_part = parts.next().ok_or(Self::Err::NotEnoughParts)?;
        let salt_part = parts.next().ok_or(Self::Err::NotEnoughParts)?;

        let user_id = u64::from_str(user_id_part)
            .map_err(Self::Err::InvalidUserId)?
            .into();
        let core = BASE64_STANDARD
            .decode(core_part)?
            .try_into()
            .map_err(|_| Self::Err::InvalidCoreLength)?;
        let salt = BASE64_STANDARD
            .decode(salt_part)?
            .try_into()
            .map_err(|_| Self::Err::InvalidSaltLength)?;

        Ok(Self {
            user_id,
            core,
            salt,
        })
    }
}

impl Debug for AuthToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthToken")
            .field("user_id", &self.user_id)
            .field("core", &"[redacted]")
            .field("salt", &"[redacted]")
            .finish()
    }
}

impl Debug for AuthTokenHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AuthTokenHash").field(&"[redacted]").finish()
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The auth token hash had an invalid length")]
pub struct InvalidAuthTokenHashError;

impl TryFrom<Box<[u8]>> for AuthTokenHash {
    type Error = InvalidAuthTokenHashError;

    fn try_from(value: Box<[u8]>) -> Result<Self, Self::Error> {
        Ok(Self(
            value.try_into().map_err(|_| InvalidAuthTokenHashError)?,
        ))
    }
}

pub const PASSWORD_MIN_LEN: usize = 6;

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The password must have at least {PASSWORD_MIN_LEN} characters")]
pub struct PasswordTooShortError;

/// A plaintext password as received from a client, checked against the
/// length policy. Never stored and never printed.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct Password(String);

impl Password {
    pub fn new(password: impl Into<String>) -> Result<Self, PasswordTooShortError> {
        let password = password.into();
        if password.chars().count() < PASSWORD_MIN_LEN {
            Err(PasswordTooShortError)
        } else {
            Ok(Password(password))
        }
    }
}

impl Debug for Password {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Password").field(&"[redacted]").finish()
    }
}

#[derive(Debug, Error)]
#[error("Password hashing failed: {0}")]
pub struct PasswordHashingError(argon2::password_hash::Error);

/// An argon2 hash in PHC string form, as persisted for a user.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct StoredPasswordHash(String);

impl StoredPasswordHash {
    pub fn derive(password: &Password) -> Result<Self, PasswordHashingError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.0.as_bytes(), &salt)
            .map_err(PasswordHashingError)?;

        Ok(Self(hash.to_string()))
    }

    #[must_use]
    pub fn verify(&self, candidate: &Password) -> bool {
        let Ok(parsed) = PasswordHash::new(&self.0) else {
            return false;
        };

        Argon2::default()
            .verify_password(candidate.0.as_bytes(), &parsed)
            .is_ok()
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn from_stored(phc: String) -> Self {
        Self(phc)
    }
}

impl Debug for StoredPasswordHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("StoredPasswordHash")
            .field(&"[redacted]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        model::{
            Id,
            auth::{AuthToken, AuthTokenDecodeError, Authentication, Password, StoredPasswordHash},
            user::Role,
        },
        util::PositiveDuration,
    };
    use std::str::FromStr;
    use time::{Duration, macros::utc_datetime};

    #[test]
    fn token_str_round_trip() {
        let token = AuthToken::generate_random(Id::from(42_u64));

        let parsed = AuthToken::from_str(&token.as_token_str()).unwrap();
        assert_eq!(parsed, token);
    }

    #[test]
    fn token_decode_rejections() {
        assert_eq!(
            AuthToken::from_str("42:only-two-parts"),
            Err(AuthTokenDecodeError::NotEnoughParts)
        );
        assert!(matches!(
            AuthToken::from_str("not-a-number:QUJD:QUJD"),
            Err(AuthTokenDecodeError::InvalidUserId(_))
        ));
        assert_eq!(
            AuthToken::from_str("42:QUJD:QUJD"),
            Err(AuthTokenDecodeError::InvalidCoreLength)
        );
    }

    #[test]
    fn equal_tokens_hash_equally() {
        let token = AuthToken::generate_random(Id::from(1_u64));
        assert_eq!(token.hash().unwrap(), token.hash().unwrap());
    }

    #[test]
    fn password_policy() {
        assert!(Password::new("short").is_err());
        assert!(Password::new("long enough").is_ok());
    }

    #[test]
    fn password_hash_verification() {
        let password = Password::new("correct horse").unwrap();
        let hash = StoredPasswordHash::derive(&password).unwrap();

        assert!(hash.verify(&password));
        assert!(!hash.verify(&Password::new("battery staple").unwrap()));
        assert!(!StoredPasswordHash::from_stored("not-a-phc-string".to_owned()).verify(&password));
    }

    #[test]
    fn authentication_expiry() {
        let created_at = utc_datetime!(2025-06-01 12:00);
        let token_hash = AuthToken::generate_random(Id::from(7_u64)).hash().unwrap();

        let expiring = Authentication {
            user: Id::from(7_u64),
            role: Role::User,
            token_hash: token_hash.clone(),
            created_at,
            expires_after: Some(PositiveDuration::new_unchecked(Duration::hours(24))),
        };
        assert!(!expiring.is_expired(created_at + Duration::hours(23)));
        assert!(expiring.is_expired(created_at + Duration::hours(25)));

        let permanent = Authentication {
            expires_after: None,
            ..expiring
        };
        assert!(!permanent.is_expired(created_at + Duration::days(10_000)));
    }
}
