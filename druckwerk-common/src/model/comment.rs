use crate::model::{Id, post::PostMarker, user::User};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use thiserror::Error;
use time::UtcDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct CommentMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Comment {
    pub id: Id<CommentMarker>,
    pub post_id: Id<PostMarker>,
    pub author: User,
    pub content: CommentContent,
    pub is_public: bool,
    pub created_at: UtcDateTime,
    pub updated_at: UtcDateTime,
}

/// What a client sends to `POST /comments/create`.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct CreateComment {
    pub post_id: Id<PostMarker>,
    pub content: CommentContent,
}

/// A partial update of a comment. `content` may come from the comment's
/// author, `is_public` only from an admin; the routing layer enforces that.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct CommentUpdate {
    #[serde(default)]
    pub content: Option<CommentContent>,
    #[serde(default)]
    pub is_public: Option<bool>,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct CommentContent(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Comment content must not be empty")]
pub struct InvalidCommentContentError;

impl CommentContent {
    pub fn new(content: impl Into<String>) -> Result<Self, InvalidCommentContentError> {
        let trimmed = content.into().trim().to_owned();
        if trimmed.is_empty() {
            Err(InvalidCommentContentError)
        } else {
            Ok(CommentContent(trimmed))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for CommentContent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        CommentContent::new(&*inner)
            .map_err(|_| Error::invalid_value(Unexpected::Str(&inner), &"CommentContent"))
    }
}

#[cfg(test)]
mod tests {
    use crate::model::comment::CommentContent;

    #[test]
    fn content_is_trimmed_and_non_empty() {
        assert_eq!(CommentContent::new("  hello  ").unwrap().get(), "hello");
        assert!(CommentContent::new("").is_err());
        assert!(CommentContent::new(" \n\t ").is_err());
    }
}
