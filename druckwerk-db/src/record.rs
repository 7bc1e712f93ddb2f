use druckwerk_common::model::{
    ModelValidationError,
    auth::{Authentication, StoredPasswordHash},
    comment::{Comment, CommentContent},
    post::{PartialPost, Post},
    subscriber::Subscriber,
    user::{Email, User, Username},
};
use sqlx::FromRow;
use time::{Duration, PrimitiveDateTime};

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct UserRecord {
    pub user_snowflake: i64,
    pub username: String,
    pub email: String,
    pub role: String,
    pub donor: bool,
    pub created_at: PrimitiveDateTime,
}

/// A user row together with its password hash, fetched only for login.
#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct LoginRecord {
    #[sqlx(flatten)]
    pub user: UserRecord,
    pub password_hash: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct AuthenticationRecord {
    pub user_snowflake: i64,
    pub role: String,
    pub token_hash: Vec<u8>,
    pub created_at: PrimitiveDateTime,
    pub expires_after_seconds: Option<i64>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct PartialPostRecord {
    pub post_snowflake: i64,
    pub user_snowflake: i64,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub like_count: i64,
    pub comment_count: i64,
    pub created_at: PrimitiveDateTime,
    pub updated_at: PrimitiveDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct FullPostRecord {
    pub post_snowflake: i64,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub like_count: i64,
    pub comment_count: i64,
    pub created_at: PrimitiveDateTime,
    pub updated_at: PrimitiveDateTime,
    #[sqlx(flatten)]
    pub author: AuthorRecord,
}

/// The author columns of a joined `users` row, aliased `author_*` so they
/// cannot collide with the post's own columns.
#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct AuthorRecord {
    pub author_snowflake: i64,
    pub author_username: String,
    pub author_email: String,
    pub author_role: String,
    pub author_donor: bool,
    pub author_created_at: PrimitiveDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct CommentRecord {
    pub comment_snowflake: i64,
    pub post_snowflake: i64,
    pub content: String,
    pub is_public: bool,
    pub created_at: PrimitiveDateTime,
    pub updated_at: PrimitiveDateTime,
    #[sqlx(flatten)]
    pub author: AuthorRecord,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct SubscriberRecord {
    pub subscriber_snowflake: i64,
    pub email: String,
    pub status: String,
    pub created_at: PrimitiveDateTime,
}

impl TryFrom<UserRecord> for User {
    type Error = ModelValidationError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.user_snowflake.cast_unsigned().into(),
            username: Username::new(value.username)?,
            email: Email::new(value.email)?,
            role: value.role.parse()?,
            donor: value.donor,
            created_at: value.created_at.as_utc(),
        })
    }
}

impl TryFrom<LoginRecord> for (User, StoredPasswordHash) {
    type Error = ModelValidationError;

    fn try_from(value: LoginRecord) -> Result<Self, Self::Error> {
        Ok((
            value.user.try_into()?,
            StoredPasswordHash::from_stored(value.password_hash),
        ))
    }
}

impl TryFrom<AuthenticationRecord> for Authentication {
    type Error = ModelValidationError;

    fn try_from(value: AuthenticationRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            user: value.user_snowflake.cast_unsigned().into(),
            role: value.role.parse()?,
            token_hash: value.token_hash.into_boxed_slice().try_into()?,
            created_at: value.created_at.as_utc(),
            expires_after: value
                .expires_after_seconds
                .map(|seconds| Duration::seconds(seconds).try_into())
                .transpose()?,
        })
    }
}

impl TryFrom<AuthorRecord> for User {
    type Error = ModelValidationError;

    fn try_from(value: AuthorRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.author_snowflake.cast_unsigned().into(),
            username: Username::new(value.author_username)?,
            email: Email::new(value.author_email)?,
            role: value.author_role.parse()?,
            donor: value.author_donor,
            created_at: value.author_created_at.as_utc(),
        })
    }
}

impl TryFrom<PartialPostRecord> for PartialPost {
    type Error = ModelValidationError;

    fn try_from(value: PartialPostRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.post_snowflake.cast_unsigned().into(),
            author_id: value.user_snowflake.cast_unsigned().into(),
            title: value.title,
            content: value.content,
            tags: value.tags,
            like_count: value.like_count.cast_unsigned(),
            comment_count: value.comment_count.cast_unsigned(),
            created_at: value.created_at.as_utc(),
            updated_at: value.updated_at.as_utc(),
        })
    }
}

impl TryFrom<FullPostRecord> for Post {
    type Error = ModelValidationError;

    fn try_from(value: FullPostRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.post_snowflake.cast_unsigned().into(),
            author: value.author.try_into()?,
            title: value.title,
            content: value.content,
            tags: value.tags,
            like_count: value.like_count.cast_unsigned(),
            comment_count: value.comment_count.cast_unsigned(),
            created_at: value.created_at.as_utc(),
            updated_at: value.updated_at.as_utc(),
        })
    }
}

impl TryFrom<CommentRecord> for Comment {
    type Error = ModelValidationError;

    fn try_from(value: CommentRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.comment_snowflake.cast_unsigned().into(),
            post_id: value.post_snowflake.cast_unsigned().into(),
            author: value.author.try_into()?,
            content: CommentContent::new(value.content)?,
            is_public: value.is_public,
            created_at: value.created_at.as_utc(),
            updated_at: value.updated_at.as_utc(),
        })
    }
}

impl TryFrom<SubscriberRecord> for Subscriber {
    type Error = ModelValidationError;

    fn try_from(value: SubscriberRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.subscriber_snowflake.cast_unsigned().into(),
            email: Email::new(value.email)?,
            status: value.status.parse()?,
            created_at: value.created_at.as_utc(),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::record::{AuthenticationRecord, SubscriberRecord, UserRecord};
    use druckwerk_common::model::{
        Id, ModelValidationError, auth::Authentication, subscriber::Subscriber, user::User,
    };
    use time::{Duration, macros::datetime};

    fn user_record() -> UserRecord {
        UserRecord {
            user_snowflake: 42,
            username: "alice".to_owned(),
            email: "alice@example.com".to_owned(),
            role: "admin".to_owned(),
            donor: true,
            created_at: datetime!(2025-06-01 12:00),
        }
    }

    #[test]
    fn user_conversion() {
        let user = User::try_from(user_record()).unwrap();
        assert_eq!(user.id, Id::from(42_u64));
        assert_eq!(user.username.get(), "alice");
        assert_eq!(user.created_at, datetime!(2025-06-01 12:00).as_utc());
    }

    #[test]
    fn invalid_role_is_rejected() {
        let record = UserRecord {
            role: "superuser".to_owned(),
            ..user_record()
        };
        assert!(matches!(
            User::try_from(record),
            Err(ModelValidationError::Role(_))
        ));
    }

    #[test]
    fn authentication_conversion() {
        let record = AuthenticationRecord {
            user_snowflake: 7,
            role: "user".to_owned(),
            token_hash: vec![0; 32],
            created_at: datetime!(2025-06-01 12:00),
            expires_after_seconds: Some(86_400),
        };

        let authentication = Authentication::try_from(record).unwrap();
        assert_eq!(authentication.user, Id::from(7_u64));
        assert_eq!(
            authentication.expires_after.map(|duration| duration.get()),
            Some(Duration::hours(24))
        );
    }

    #[test]
    fn bad_token_hash_length_is_rejected() {
        let record = AuthenticationRecord {
            user_snowflake: 7,
            role: "user".to_owned(),
            token_hash: vec![0; 3],
            created_at: datetime!(2025-06-01 12:00),
            expires_after_seconds: None,
        };

        assert!(matches!(
            Authentication::try_from(record),
            Err(ModelValidationError::TokenHash(_))
        ));
    }

    #[test]
    fn subscriber_conversion() {
        let record = SubscriberRecord {
            subscriber_snowflake: 3,
            email: "reader@example.com".to_owned(),
            status: "unsubscribed".to_owned(),
            created_at: datetime!(2025-06-01 12:00),
        };

        let subscriber = Subscriber::try_from(record).unwrap();
        assert_eq!(
            subscriber.status,
            druckwerk_common::model::subscriber::SubscriberStatus::Unsubscribed
        );
    }
}
