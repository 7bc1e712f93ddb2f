use crate::model::{Id, user::Email};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use std::str::FromStr;
use thiserror::Error;
use time::UtcDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct SubscriberMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Subscriber {
    pub id: Id<SubscriberMarker>,
    pub email: Email,
    pub status: SubscriberStatus,
    pub created_at: UtcDateTime,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriberStatus {
    #[default]
    Active,
    Unsubscribed,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Unknown subscriber status: {0}")]
pub struct InvalidSubscriberStatusError(String);

impl SubscriberStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SubscriberStatus::Active => "active",
            SubscriberStatus::Unsubscribed => "unsubscribed",
        }
    }
}

impl FromStr for SubscriberStatus {
    type Err = InvalidSubscriberStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SubscriberStatus::Active),
            "unsubscribed" => Ok(SubscriberStatus::Unsubscribed),
            other => Err(InvalidSubscriberStatusError(other.to_owned())),
        }
    }
}

impl<'de> Deserialize<'de> for SubscriberStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        SubscriberStatus::from_str(&inner)
            .map_err(|_| Error::invalid_value(Unexpected::Str(&inner), &"active or unsubscribed"))
    }
}

#[cfg(test)]
mod tests {
    use crate::model::subscriber::SubscriberStatus;
    use std::str::FromStr;

    #[test]
    fn status_round_trip() {
        for status in [SubscriberStatus::Active, SubscriberStatus::Unsubscribed] {
            assert_eq!(SubscriberStatus::from_str(status.as_str()), Ok(status));
        }
        assert!(SubscriberStatus::from_str("paused").is_err());
    }
}
