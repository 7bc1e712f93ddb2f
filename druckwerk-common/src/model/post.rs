use crate::model::{
    Id,
    user::{User, UserMarker},
};
use serde::{Deserialize, Serialize};
use time::UtcDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

/// A post with its author resolved, as served from `GET /posts/{id}`.
///
/// `like_count` is derived from the like relation at read time and
/// `comment_count` mirrors the number of public comments; see
/// [`crate::model::interaction`] for the rules that keep them honest.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Post {
    pub id: Id<PostMarker>,
    pub author: User,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub like_count: u64,
    pub comment_count: u64,
    pub created_at: UtcDateTime,
    pub updated_at: UtcDateTime,
}

/// A post without the author resolved, for list views.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct PartialPost {
    pub id: Id<PostMarker>,
    pub author_id: Id<UserMarker>,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub like_count: u64,
    pub comment_count: u64,
    pub created_at: UtcDateTime,
    pub updated_at: UtcDateTime,
}

/// The client-supplied part of a post, used for create and update.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}
