use serde::{Deserialize, Serialize};

/// Who gets to see a user's email on their profile.
///
/// Stored as TEXT in the users table; `as_str`/`parse` are the canonical
/// mapping in both directions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailVisibility {
    #[default]
    Hidden,
    FollowingOnly,
    Public,
}

impl EmailVisibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailVisibility::Hidden => "hidden",
            EmailVisibility::FollowingOnly => "following_only",
            EmailVisibility::Public => "public",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "hidden" => Some(EmailVisibility::Hidden),
            "following_only" => Some(EmailVisibility::FollowingOnly),
            "public" => Some(EmailVisibility::Public),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visibility_round_trips_through_text() {
        for v in [
            EmailVisibility::Hidden,
            EmailVisibility::FollowingOnly,
            EmailVisibility::Public,
        ] {
            assert_eq!(EmailVisibility::parse(v.as_str()), Some(v));
        }
        assert_eq!(EmailVisibility::parse("friends"), None);
    }

    #[test]
    fn visibility_serializes_snake_case() {
        let json = serde_json::to_string(&EmailVisibility::FollowingOnly).unwrap();
        assert_eq!(json, "\"following_only\"");
    }
}
