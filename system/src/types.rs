use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

pub type ConnectionId = u32;

const GENERATED_SESSION_ID_LEN: usize = 8;

/// Opaque session token taken from the board URL. Never validated for format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Short token for a fresh board link, the leading characters of a v4 uuid.
    pub fn generate() -> Self {
        let mut id = uuid::Uuid::new_v4().to_string();
        id.truncate(GENERATED_SESSION_ID_LEN);
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl FromStr for SessionId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub participant_count: i64,
    /// Empty and waiting for its eviction timer.
    pub draining: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_generates_eight_character_tokens() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_eq!(a.as_str().len(), 8);
        assert_ne!(a, b);
    }

    #[test]
    fn it_keeps_any_string_as_is() {
        let id: SessionId = "not/a uuid?".parse().expect("infallible");
        assert_eq!(id.to_string(), "not/a uuid?");
        assert_eq!(serde_json::to_string(&id).expect(""), "\"not/a uuid?\"");
    }

    #[test]
    fn it_serializes_snapshot_in_camel_case() {
        let snapshot = SessionSnapshot {
            session_id: "abcd1234".into(),
            participant_count: -1,
            draining: true,
        };
        assert_eq!(
            serde_json::to_value(&snapshot).expect(""),
            serde_json::json!({
                "sessionId": "abcd1234",
                "participantCount": -1,
                "draining": true,
            })
        );
    }
}
