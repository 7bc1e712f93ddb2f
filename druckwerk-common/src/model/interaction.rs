//! The like relation of a post and the toggle that mutates it.
//!
//! A post's likes are one explicit representation everywhere: a set of user
//! ids. The count handed to clients is always the size of that set after the
//! mutation, never a separately maintained number, so it cannot drift.

use crate::model::{Id, user::UserMarker};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The set of users that have liked a given post.
///
/// Membership is read from storage at request time and mutated through
/// [`LikeSet::toggle`]; callers never get to assert "currently liked"
/// themselves.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct LikeSet(BTreeSet<Id<UserMarker>>);

/// The outcome of a toggle as reported to the client: whether the acting
/// user now likes the post, and the size of the like relation afterwards.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash, Serialize, Deserialize)]
pub struct LikeState {
    pub liked: bool,
    pub like_count: u64,
}

impl LikeSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, user: Id<UserMarker>) -> bool {
        self.0.contains(&user)
    }

    #[must_use]
    pub fn len(&self) -> u64 {
        self.0.len() as u64
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Flips `user`'s membership and reports the resulting state.
    ///
    /// The returned `like_count` is the relation size after the flip.
    pub fn toggle(&mut self, user: Id<UserMarker>) -> LikeState {
        let liked = if self.0.remove(&user) {
            false
        } else {
            self.0.insert(user);
            true
        };

        LikeState {
            liked,
            like_count: self.len(),
        }
    }
}

impl FromIterator<Id<UserMarker>> for LikeSet {
    fn from_iter<T: IntoIterator<Item = Id<UserMarker>>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{Id, interaction::LikeSet, user::UserMarker};

    fn user(id: u64) -> Id<UserMarker> {
        Id::from(id)
    }

    #[test]
    fn double_toggle_is_idempotent() {
        let mut likes = LikeSet::new();

        let first = likes.toggle(user(1));
        assert!(first.liked);
        assert_eq!(first.like_count, 1);

        let second = likes.toggle(user(1));
        assert!(!second.liked);
        assert_eq!(second.like_count, 0);

        assert!(likes.is_empty());
    }

    #[test]
    fn duplicate_likes_are_impossible() {
        let mut likes: LikeSet = [user(1)].into_iter().collect();

        // A set built from a duplicated relation collapses to one entry.
        let duplicated: LikeSet = [user(1), user(1)].into_iter().collect();
        assert_eq!(duplicated.len(), 1);

        likes.toggle(user(1));
        likes.toggle(user(1));
        assert_eq!(likes.len(), 1);
    }

    #[test]
    fn two_users_one_unlikes() {
        // Example trace: P1 starts empty, U1 likes, U2 likes, U1 unlikes.
        let mut likes = LikeSet::new();

        let u1_likes = likes.toggle(user(1));
        assert!(u1_likes.liked);
        assert_eq!(u1_likes.like_count, 1);

        let u2_likes = likes.toggle(user(2));
        assert!(u2_likes.liked);
        assert_eq!(u2_likes.like_count, 2);

        let u1_unlikes = likes.toggle(user(1));
        assert!(!u1_unlikes.liked);
        assert_eq!(u1_unlikes.like_count, 1);

        assert!(likes.contains(user(2)));
        assert!(!likes.contains(user(1)));
    }

    #[test]
    fn count_matches_net_toggle_parity() {
        let mut likes = LikeSet::new();

        // Each user toggles a different number of times; only odd net
        // toggle counts leave the user in the relation.
        let toggle_counts = [(1, 3), (2, 2), (3, 1), (4, 4), (5, 5)];
        for (user_id, count) in toggle_counts {
            for _ in 0..count {
                likes.toggle(user(user_id));
            }
        }

        let expected: u64 = toggle_counts
            .iter()
            .filter(|(_, count)| count % 2 == 1)
            .count() as u64;
        assert_eq!(likes.len(), expected);

        for (user_id, count) in toggle_counts {
            assert_eq!(likes.contains(user(user_id)), count % 2 == 1);
        }
    }

    #[test]
    fn posts_are_isolated() {
        let mut post_a = LikeSet::new();
        let mut post_b: LikeSet = [user(9)].into_iter().collect();

        post_a.toggle(user(1));
        post_a.toggle(user(2));

        assert_eq!(post_a.len(), 2);
        assert_eq!(post_b.len(), 1);

        post_b.toggle(user(9));
        assert_eq!(post_a.len(), 2);
        assert!(post_b.is_empty());
    }
}
