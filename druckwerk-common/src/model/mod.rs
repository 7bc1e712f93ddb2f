pub mod auth;
pub mod comment;
pub mod interaction;
pub mod post;
pub mod subscriber;
pub mod user;

use crate::{
    model::{
        auth::InvalidAuthTokenHashError,
        comment::InvalidCommentContentError,
        subscriber::InvalidSubscriberStatusError,
        user::{InvalidEmailError, InvalidRoleError, InvalidUsernameError},
    },
    snowflake::{Epoch, Snowflake, SnowflakeGenerator},
    util::NonPositiveDurationError,
};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, marker::PhantomData};
use thiserror::Error;
use time::{UtcDateTime, macros::utc_datetime};

/// Errors for data that does not satisfy the model's validity rules, e.g.
/// when loaded from storage or deserialized from a request.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum ModelValidationError {
    #[error(transparent)]
    Username(#[from] InvalidUsernameError),
    #[error(transparent)]
    Email(#[from] InvalidEmailError),
    #[error(transparent)]
    Role(#[from] InvalidRoleError),
    #[error(transparent)]
    CommentContent(#[from] InvalidCommentContentError),
    #[error(transparent)]
    SubscriberStatus(#[from] InvalidSubscriberStatusError),
    #[error(transparent)]
    NonPositiveDuration(#[from] NonPositiveDurationError),
    #[error(transparent)]
    TokenHash(#[from] InvalidAuthTokenHashError),
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct DruckwerkEpoch;
impl Epoch for DruckwerkEpoch {
    const EPOCH_TIME: UtcDateTime = utc_datetime!(2025-01-01 00:00);
}

pub type DruckwerkSnowflake = Snowflake<DruckwerkEpoch>;
pub type DruckwerkSnowflakeGenerator = SnowflakeGenerator<DruckwerkEpoch>;

#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Id<Marker>(DruckwerkSnowflake, #[serde(skip)] PhantomData<Marker>);

impl<Marker> Id<Marker> {
    #[must_use]
    pub fn new(snowflake: DruckwerkSnowflake) -> Self {
        Self(snowflake, PhantomData)
    }

    #[must_use]
    pub fn snowflake(self) -> DruckwerkSnowflake {
        self.0
    }
}

impl<Marker> Display for Id<Marker> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<Marker> From<DruckwerkSnowflake> for Id<Marker> {
    fn from(value: DruckwerkSnowflake) -> Self {
        Self::new(value)
    }
}

impl<Marker> From<Id<Marker>> for DruckwerkSnowflake {
    fn from(value: Id<Marker>) -> Self {
        value.0
    }
}

impl<Marker> From<u64> for Id<Marker> {
    fn from(value: u64) -> Self {
        Id::new(DruckwerkSnowflake::new(value))
    }
}

impl<Marker> From<Id<Marker>> for u64 {
    fn from(value: Id<Marker>) -> Self {
        value.snowflake().get()
    }
}
