use crate::record::{
    AuthenticationRecord, CommentRecord, FullPostRecord, LoginRecord, PartialPostRecord,
    SubscriberRecord, UserRecord,
};
use druckwerk_common::{
    model::{
        DruckwerkSnowflake, DruckwerkSnowflakeGenerator, Id, ModelValidationError,
        auth::{AuthTokenHash, Authentication, StoredPasswordHash},
        comment::{Comment, CommentMarker, CommentUpdate, CreateComment},
        interaction::LikeState,
        post::{PartialPost, Post, PostDraft, PostMarker},
        subscriber::{Subscriber, SubscriberMarker, SubscriberStatus},
        user::{Email, NewUser, User, UserMarker, Username},
    },
    snowflake::{ProcessId, WorkerId},
};
use sqlx::{PgPool, postgres::PgPoolOptions, query, query_as, query_scalar};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use time::{PrimitiveDateTime, UtcDateTime};
use tracing::warn;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error("Running migrations failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

#[derive(Debug)]
pub struct DbClient {
    pool: PgPool,
    snowflake_generator: Mutex<DruckwerkSnowflakeGenerator>,
}

fn to_primitive(value: UtcDateTime) -> PrimitiveDateTime {
    PrimitiveDateTime::new(value.date(), value.time())
}

const POST_COLUMNS: &str = "
    posts.post_snowflake,
    posts.user_snowflake,
    posts.title,
    posts.content,
    posts.tags,
    (SELECT COUNT(*) FROM post_likes
        WHERE post_likes.post_snowflake = posts.post_snowflake) AS like_count,
    posts.comment_count,
    posts.created_at,
    posts.updated_at
";

const AUTHOR_COLUMNS: &str = "
    users.user_snowflake AS author_snowflake,
    users.username AS author_username,
    users.email AS author_email,
    users.role AS author_role,
    users.donor AS author_donor,
    users.created_at AS author_created_at
";

impl DbClient {
    #[must_use]
    pub fn new(pool: PgPool, worker_id: WorkerId, process_id: ProcessId) -> Self {
        let snowflake_generator =
            Mutex::new(DruckwerkSnowflakeGenerator::new(worker_id, process_id));

        Self {
            pool,
            snowflake_generator,
        }
    }

    pub async fn connect(
        database_url: &str,
        worker_id: WorkerId,
        process_id: ProcessId,
    ) -> Result<Self> {
        let pool = PgPoolOptions::new().connect(database_url).await?;
        Ok(Self::new(pool, worker_id, process_id))
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!().run(&self.pool).await?;
        Ok(())
    }

    fn next_snowflake(&self) -> DruckwerkSnowflake {
        self.snowflake_generator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .generate()
    }

    pub async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(
            "
            SELECT user_snowflake, username, email, role, donor, created_at
            FROM users
            WHERE user_snowflake = $1
            ",
        )
        .bind(user_id.snowflake().get().cast_signed())
        .fetch_optional(&self.pool)
        .await?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }

    pub async fn fetch_login_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<(User, StoredPasswordHash)>> {
        let record = query_as::<_, LoginRecord>(
            "
            SELECT user_snowflake, username, email, role, donor, created_at, password_hash
            FROM users
            WHERE email = $1
            ",
        )
        .bind(email.get())
        .fetch_optional(&self.pool)
        .await?;

        let login = record.map(TryInto::try_into).transpose()?;
        Ok(login)
    }

    pub async fn create_user(&self, user: &NewUser) -> Result<User> {
        let user_snowflake = self.next_snowflake();

        let record = query_as::<_, UserRecord>(
            "
            INSERT INTO users (user_snowflake, username, email, password_hash, role, donor)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING user_snowflake, username, email, role, donor, created_at
            ",
        )
        .bind(user_snowflake.get().cast_signed())
        .bind(user.username.get())
        .bind(user.email.get())
        .bind(user.password_hash.get())
        .bind(user.role.as_str())
        .bind(user.donor)
        .fetch_one(&self.pool)
        .await?;

        Ok(record.try_into()?)
    }

    pub async fn update_username(
        &self,
        user_id: Id<UserMarker>,
        username: &Username,
    ) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(
            "
            UPDATE users
            SET username = $2
            WHERE user_snowflake = $1
            RETURNING user_snowflake, username, email, role, donor, created_at
            ",
        )
        .bind(user_id.snowflake().get().cast_signed())
        .bind(username.get())
        .fetch_optional(&self.pool)
        .await?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }

    pub async fn create_auth(&self, authentication: &Authentication) -> Result<()> {
        query(
            "
            INSERT INTO authentications
                (token_hash, user_snowflake, created_at, expires_after_seconds)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(&authentication.token_hash.0[..])
        .bind(authentication.user.snowflake().get().cast_signed())
        .bind(to_primitive(authentication.created_at))
        .bind(
            authentication
                .expires_after
                .map(|duration| duration.get().whole_seconds()),
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn fetch_auth(&self, token_hash: &AuthTokenHash) -> Result<Option<Authentication>> {
        let record = query_as::<_, AuthenticationRecord>(
            "
            SELECT
                authentications.user_snowflake,
                users.role,
                authentications.token_hash,
                authentications.created_at,
                authentications.expires_after_seconds
            FROM authentications
            JOIN users USING (user_snowflake)
            WHERE authentications.token_hash = $1
            ",
        )
        .bind(&token_hash.0[..])
        .fetch_optional(&self.pool)
        .await?;

        let authentication = record.map(Authentication::try_from).transpose()?;
        Ok(authentication)
    }

    pub async fn fetch_posts(&self) -> Result<Vec<PartialPost>> {
        let records = query_as::<_, PartialPostRecord>(&format!(
            "
            SELECT {POST_COLUMNS}
            FROM posts
            ORDER BY posts.created_at DESC
            "
        ))
        .fetch_all(&self.pool)
        .await?;

        let posts = records
            .into_iter()
            .map(PartialPost::try_from)
            .collect::<Result<_, _>>()?;
        Ok(posts)
    }

    pub async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let record = query_as::<_, FullPostRecord>(&format!(
            "
            SELECT {POST_COLUMNS}, {AUTHOR_COLUMNS}
            FROM posts
            JOIN users USING (user_snowflake)
            WHERE posts.post_snowflake = $1
            "
        ))
        .bind(post_id.snowflake().get().cast_signed())
        .fetch_optional(&self.pool)
        .await?;

        let post = record.map(Post::try_from).transpose()?;
        Ok(post)
    }

    pub async fn fetch_user_posts(
        &self,
        user_id: Id<UserMarker>,
    ) -> Result<Option<Vec<PartialPost>>> {
        if self.fetch_user(user_id).await?.is_none() {
            return Ok(None);
        }

        let records = query_as::<_, PartialPostRecord>(&format!(
            "
            SELECT {POST_COLUMNS}
            FROM posts
            WHERE posts.user_snowflake = $1
            ORDER BY posts.created_at DESC
            "
        ))
        .bind(user_id.snowflake().get().cast_signed())
        .fetch_all(&self.pool)
        .await?;

        let posts = records
            .into_iter()
            .map(PartialPost::try_from)
            .collect::<Result<_, _>>()?;
        Ok(Some(posts))
    }

    pub async fn create_post(
        &self,
        draft: &PostDraft,
        author: Id<UserMarker>,
    ) -> Result<PartialPost> {
        let post_snowflake = self.next_snowflake();

        let created_at = query_scalar::<_, PrimitiveDateTime>(
            "
            INSERT INTO posts (post_snowflake, user_snowflake, title, content, tags)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING created_at
            ",
        )
        .bind(post_snowflake.get().cast_signed())
        .bind(author.snowflake().get().cast_signed())
        .bind(&draft.title)
        .bind(&draft.content)
        .bind(&draft.tags)
        .fetch_one(&self.pool)
        .await?;

        Ok(PartialPost {
            id: post_snowflake.into(),
            author_id: author,
            title: draft.title.clone(),
            content: draft.content.clone(),
            tags: draft.tags.clone(),
            like_count: 0,
            comment_count: 0,
            created_at: created_at.as_utc(),
            updated_at: created_at.as_utc(),
        })
    }

    pub async fn update_post(
        &self,
        post_id: Id<PostMarker>,
        draft: &PostDraft,
    ) -> Result<Option<Post>> {
        let updated = query(
            "
            UPDATE posts
            SET title = $2, content = $3, tags = $4, updated_at = (now() AT TIME ZONE 'utc')
            WHERE post_snowflake = $1
            ",
        )
        .bind(post_id.snowflake().get().cast_signed())
        .bind(&draft.title)
        .bind(&draft.content)
        .bind(&draft.tags)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }

        self.fetch_post(post_id).await
    }

    pub async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<bool> {
        let deleted = query("DELETE FROM posts WHERE post_snowflake = $1")
            .bind(post_id.snowflake().get().cast_signed())
            .execute(&self.pool)
            .await?;

        Ok(deleted.rows_affected() > 0)
    }

    /// Flips `user_id`'s membership in the post's like relation.
    ///
    /// Membership is checked inside the transaction, right before the write,
    /// and the reported count is `COUNT(*)` over the relation after the
    /// mutation, so the client never sees a count that disagrees with the
    /// relation. The in-memory rules live in
    /// [`LikeSet`](druckwerk_common::model::interaction::LikeSet); here the
    /// relation stays in the database and only one row is touched per toggle.
    pub async fn toggle_post_like(
        &self,
        post_id: Id<PostMarker>,
        user_id: Id<UserMarker>,
    ) -> Result<Option<LikeState>> {
        let mut tx = self.pool.begin().await?;

        let post_exists = query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM posts WHERE post_snowflake = $1)",
        )
        .bind(post_id.snowflake().get().cast_signed())
        .fetch_one(&mut *tx)
        .await?;

        if !post_exists {
            return Ok(None);
        }

        let previously_liked = query_scalar::<_, bool>(
            "
            SELECT EXISTS (
                SELECT 1 FROM post_likes
                WHERE post_snowflake = $1 AND user_snowflake = $2
            )
            ",
        )
        .bind(post_id.snowflake().get().cast_signed())
        .bind(user_id.snowflake().get().cast_signed())
        .fetch_one(&mut *tx)
        .await?;

        if previously_liked {
            query("DELETE FROM post_likes WHERE post_snowflake = $1 AND user_snowflake = $2")
        } else {
            query(
                "
                INSERT INTO post_likes (post_snowflake, user_snowflake)
                VALUES ($1, $2)
                ON CONFLICT DO NOTHING
                ",
            )
        }
        .bind(post_id.snowflake().get().cast_signed())
        .bind(user_id.snowflake().get().cast_signed())
        .execute(&mut *tx)
        .await?;

        let like_count =
            query_scalar::<_, i64>("SELECT COUNT(*) FROM post_likes WHERE post_snowflake = $1")
                .bind(post_id.snowflake().get().cast_signed())
                .fetch_one(&mut *tx)
                .await?;

        tx.commit().await?;

        Ok(Some(LikeState {
            liked: !previously_liked,
            like_count: like_count.cast_unsigned(),
        }))
    }

    pub async fn fetch_post_comments(&self, post_id: Id<PostMarker>) -> Result<Vec<Comment>> {
        let records = query_as::<_, CommentRecord>(&format!(
            "
            SELECT
                comments.comment_snowflake,
                comments.post_snowflake,
                comments.content,
                comments.is_public,
                comments.created_at,
                comments.updated_at,
                {AUTHOR_COLUMNS}
            FROM comments
            JOIN users USING (user_snowflake)
            WHERE comments.post_snowflake = $1 AND comments.is_public
            ORDER BY comments.created_at DESC
            "
        ))
        .bind(post_id.snowflake().get().cast_signed())
        .fetch_all(&self.pool)
        .await?;

        let comments = records
            .into_iter()
            .map(Comment::try_from)
            .collect::<Result<_, _>>()?;
        Ok(comments)
    }

    pub async fn fetch_user_comments(&self, user_id: Id<UserMarker>) -> Result<Vec<Comment>> {
        let records = query_as::<_, CommentRecord>(&format!(
            "
            SELECT
                comments.comment_snowflake,
                comments.post_snowflake,
                comments.content,
                comments.is_public,
                comments.created_at,
                comments.updated_at,
                {AUTHOR_COLUMNS}
            FROM comments
            JOIN users USING (user_snowflake)
            WHERE comments.user_snowflake = $1
            ORDER BY comments.created_at DESC
            "
        ))
        .bind(user_id.snowflake().get().cast_signed())
        .fetch_all(&self.pool)
        .await?;

        let comments = records
            .into_iter()
            .map(Comment::try_from)
            .collect::<Result<_, _>>()?;
        Ok(comments)
    }

    pub async fn fetch_comment(&self, comment_id: Id<CommentMarker>) -> Result<Option<Comment>> {
        let record = query_as::<_, CommentRecord>(&format!(
            "
            SELECT
                comments.comment_snowflake,
                comments.post_snowflake,
                comments.content,
                comments.is_public,
                comments.created_at,
                comments.updated_at,
                {AUTHOR_COLUMNS}
            FROM comments
            JOIN users USING (user_snowflake)
            WHERE comments.comment_snowflake = $1
            "
        ))
        .bind(comment_id.snowflake().get().cast_signed())
        .fetch_optional(&self.pool)
        .await?;

        let comment = record.map(Comment::try_from).transpose()?;
        Ok(comment)
    }

    /// Creates a comment and brings the post's stored comment count back in
    /// line. Returns `None` when the post does not exist.
    pub async fn create_comment(
        &self,
        create: &CreateComment,
        author: Id<UserMarker>,
    ) -> Result<Option<Comment>> {
        let post_exists = query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM posts WHERE post_snowflake = $1)",
        )
        .bind(create.post_id.snowflake().get().cast_signed())
        .fetch_one(&self.pool)
        .await?;

        if !post_exists {
            return Ok(None);
        }

        let comment_snowflake = self.next_snowflake();

        query(
            "
            INSERT INTO comments (comment_snowflake, post_snowflake, user_snowflake, content)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(comment_snowflake.get().cast_signed())
        .bind(create.post_id.snowflake().get().cast_signed())
        .bind(author.snowflake().get().cast_signed())
        .bind(create.content.get())
        .execute(&self.pool)
        .await?;

        self.recompute_comment_count(create.post_id).await?;

        self.fetch_comment(comment_snowflake.into()).await
    }

    pub async fn update_comment(
        &self,
        comment_id: Id<CommentMarker>,
        update: &CommentUpdate,
    ) -> Result<Option<Comment>> {
        let post_snowflake = query_scalar::<_, i64>(
            "
            UPDATE comments
            SET
                content = COALESCE($2, content),
                is_public = COALESCE($3, is_public),
                updated_at = (now() AT TIME ZONE 'utc')
            WHERE comment_snowflake = $1
            RETURNING post_snowflake
            ",
        )
        .bind(comment_id.snowflake().get().cast_signed())
        .bind(update.content.as_ref().map(|content| content.get()))
        .bind(update.is_public)
        .fetch_optional(&self.pool)
        .await?;

        let Some(post_snowflake) = post_snowflake else {
            return Ok(None);
        };

        // A visibility flip changes which comments the count covers.
        self.recompute_comment_count(post_snowflake.cast_unsigned().into())
            .await?;

        self.fetch_comment(comment_id).await
    }

    pub async fn delete_comment(&self, comment_id: Id<CommentMarker>) -> Result<Option<()>> {
        let post_snowflake = query_scalar::<_, i64>(
            "DELETE FROM comments WHERE comment_snowflake = $1 RETURNING post_snowflake",
        )
        .bind(comment_id.snowflake().get().cast_signed())
        .fetch_optional(&self.pool)
        .await?;

        let Some(post_snowflake) = post_snowflake else {
            return Ok(None);
        };

        self.recompute_comment_count(post_snowflake.cast_unsigned().into())
            .await?;

        Ok(Some(()))
    }

    /// Rewrites the post's stored comment count from the authoritative
    /// comment rows. Never increments. The single statement is idempotent,
    /// so a failed attempt is retried once before the error surfaces.
    pub async fn recompute_comment_count(&self, post_id: Id<PostMarker>) -> Result<()> {
        if let Err(error) = self.write_comment_count(post_id).await {
            warn!(%error, %post_id, "Comment count recompute failed, retrying once");
            self.write_comment_count(post_id).await?;
        }

        Ok(())
    }

    async fn write_comment_count(&self, post_id: Id<PostMarker>) -> Result<()> {
        query(
            "
            UPDATE posts
            SET comment_count = (
                SELECT COUNT(*) FROM comments
                WHERE comments.post_snowflake = posts.post_snowflake AND comments.is_public
            )
            WHERE post_snowflake = $1
            ",
        )
        .bind(post_id.snowflake().get().cast_signed())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn fetch_subscribers(&self) -> Result<Vec<Subscriber>> {
        let records = query_as::<_, SubscriberRecord>(
            "
            SELECT subscriber_snowflake, email, status, created_at
            FROM subscribers
            ORDER BY created_at DESC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        let subscribers = records
            .into_iter()
            .map(Subscriber::try_from)
            .collect::<Result<_, _>>()?;
        Ok(subscribers)
    }

    pub async fn fetch_subscriber_by_email(&self, email: &Email) -> Result<Option<Subscriber>> {
        let record = query_as::<_, SubscriberRecord>(
            "
            SELECT subscriber_snowflake, email, status, created_at
            FROM subscribers
            WHERE email = $1
            ",
        )
        .bind(email.get())
        .fetch_optional(&self.pool)
        .await?;

        let subscriber = record.map(Subscriber::try_from).transpose()?;
        Ok(subscriber)
    }

    pub async fn create_subscriber(&self, email: &Email) -> Result<Subscriber> {
        let subscriber_snowflake = self.next_snowflake();

        let record = query_as::<_, SubscriberRecord>(
            "
            INSERT INTO subscribers (subscriber_snowflake, email)
            VALUES ($1, $2)
            RETURNING subscriber_snowflake, email, status, created_at
            ",
        )
        .bind(subscriber_snowflake.get().cast_signed())
        .bind(email.get())
        .fetch_one(&self.pool)
        .await?;

        Ok(record.try_into()?)
    }

    pub async fn set_subscriber_status(
        &self,
        subscriber_id: Id<SubscriberMarker>,
        status: SubscriberStatus,
    ) -> Result<Option<Subscriber>> {
        let record = query_as::<_, SubscriberRecord>(
            "
            UPDATE subscribers
            SET status = $2
            WHERE subscriber_snowflake = $1
            RETURNING subscriber_snowflake, email, status, created_at
            ",
        )
        .bind(subscriber_id.snowflake().get().cast_signed())
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let subscriber = record.map(Subscriber::try_from).transpose()?;
        Ok(subscriber)
    }
}

#[cfg(test)]
mod tests {
    use crate::client::DbClient;
    use druckwerk_common::{
        model::{
            Id,
            auth::{Password, StoredPasswordHash},
            comment::{CommentContent, CommentUpdate, CreateComment},
            post::{PartialPost, PostDraft},
            user::{Email, NewUser, Role, User, Username},
        },
        snowflake::{ProcessId, WorkerId},
    };
    use sqlx::PgPool;

    fn client(pool: PgPool) -> DbClient {
        DbClient::new(
            pool,
            WorkerId::new_unchecked(0),
            ProcessId::new_unchecked(0),
        )
    }

    async fn sample_user(db: &DbClient, name: &str) -> User {
        db.create_user(&NewUser {
            username: Username::new(name).unwrap(),
            email: Email::new(format!("{name}@example.com")).unwrap(),
            password_hash: StoredPasswordHash::derive(&Password::new("hunter22").unwrap())
                .unwrap(),
            role: Role::User,
            donor: false,
        })
        .await
        .unwrap()
    }

    async fn sample_post(db: &DbClient, author: &User) -> PartialPost {
        db.create_post(
            &PostDraft {
                title: "Title".to_owned(),
                content: "Content".to_owned(),
                tags: Vec::new(),
            },
            author.id,
        )
        .await
        .unwrap()
    }

    #[sqlx::test]
    async fn toggle_flips_membership_and_reports_relation_size(pool: PgPool) {
        let db = client(pool);
        let author = sample_user(&db, "author").await;
        let reader = sample_user(&db, "reader").await;
        let post = sample_post(&db, &author).await;

        let first = db
            .toggle_post_like(post.id, reader.id)
            .await
            .unwrap()
            .unwrap();
        assert!(first.liked);
        assert_eq!(first.like_count, 1);

        let second = db
            .toggle_post_like(post.id, author.id)
            .await
            .unwrap()
            .unwrap();
        assert!(second.liked);
        assert_eq!(second.like_count, 2);

        let unliked = db
            .toggle_post_like(post.id, reader.id)
            .await
            .unwrap()
            .unwrap();
        assert!(!unliked.liked);
        assert_eq!(unliked.like_count, 1);

        // Reads derive the same count from the relation.
        let fetched = db.fetch_post(post.id).await.unwrap().unwrap();
        assert_eq!(fetched.like_count, 1);
    }

    #[sqlx::test]
    async fn toggle_on_missing_post_is_none(pool: PgPool) {
        let db = client(pool);
        let user = sample_user(&db, "nobody").await;

        let state = db.toggle_post_like(Id::from(1_u64), user.id).await.unwrap();
        assert!(state.is_none());
    }

    #[sqlx::test]
    async fn comment_count_follows_public_comments(pool: PgPool) {
        let db = client(pool);
        let author = sample_user(&db, "author").await;
        let post = sample_post(&db, &author).await;

        let mut comments = Vec::new();
        for n in 0..3 {
            let comment = db
                .create_comment(
                    &CreateComment {
                        post_id: post.id,
                        content: CommentContent::new(format!("comment {n}")).unwrap(),
                    },
                    author.id,
                )
                .await
                .unwrap()
                .unwrap();
            comments.push(comment);
        }
        let fetched = db.fetch_post(post.id).await.unwrap().unwrap();
        assert_eq!(fetched.comment_count, 3);

        db.delete_comment(comments[0].id).await.unwrap().unwrap();
        let fetched = db.fetch_post(post.id).await.unwrap().unwrap();
        assert_eq!(fetched.comment_count, 2);

        db.update_comment(
            comments[1].id,
            &CommentUpdate {
                content: None,
                is_public: Some(false),
            },
        )
        .await
        .unwrap()
        .unwrap();
        let fetched = db.fetch_post(post.id).await.unwrap().unwrap();
        assert_eq!(fetched.comment_count, 1);
    }

    #[sqlx::test]
    async fn recompute_is_idempotent(pool: PgPool) {
        let db = client(pool);
        let author = sample_user(&db, "author").await;
        let post = sample_post(&db, &author).await;

        db.create_comment(
            &CreateComment {
                post_id: post.id,
                content: CommentContent::new("only one").unwrap(),
            },
            author.id,
        )
        .await
        .unwrap()
        .unwrap();

        // Running the recompute again rewrites the same value instead of
        // incrementing anything.
        db.recompute_comment_count(post.id).await.unwrap();
        db.recompute_comment_count(post.id).await.unwrap();

        let fetched = db.fetch_post(post.id).await.unwrap().unwrap();
        assert_eq!(fetched.comment_count, 1);
    }

    #[sqlx::test]
    async fn recompute_failure_surfaces(pool: PgPool) {
        let db = client(pool.clone());

        // With the pool closed the write and its single retry both fail;
        // the error must reach the caller instead of reporting success.
        pool.close().await;
        let result = db.recompute_comment_count(Id::from(1_u64)).await;
        assert!(result.is_err());
    }
}
