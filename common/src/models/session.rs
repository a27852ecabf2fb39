// common/src/models/session.rs
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_PROJECT_ID: &str = "default";
pub const DEFAULT_SUB_PATH: &str = "/terminal-audit";

/// Connectivity of a terminal session, as shown on the status badge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Connecting,
    Connected,
    Error,
    Disconnected,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Connecting => "connecting",
            SessionStatus::Connected => "connected",
            SessionStatus::Error => "error",
            SessionStatus::Disconnected => "disconnected",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which backend channel a session talks to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTarget {
    /// Opaque project identifier sent as the `project` query parameter
    pub project_id: String,
    /// Logical channel on the backend, e.g. `/terminal-audit`
    pub sub_path: String,
}

impl SessionTarget {
    pub fn new(project_id: impl Into<String>, sub_path: impl Into<String>) -> Self {
        let sub_path = sub_path.into();
        let sub_path = if sub_path.starts_with('/') {
            sub_path
        } else {
            format!("/{}", sub_path)
        };
        Self {
            project_id: project_id.into(),
            sub_path,
        }
    }
}

impl Default for SessionTarget {
    fn default() -> Self {
        Self {
            project_id: DEFAULT_PROJECT_ID.to_string(),
            sub_path: DEFAULT_SUB_PATH.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display_matches_badge() {
        assert_eq!(SessionStatus::Connecting.to_string(), "connecting");
        assert_eq!(SessionStatus::Disconnected.to_string(), "disconnected");
        assert_eq!(
            serde_json::to_string(&SessionStatus::Error).unwrap(),
            "\"error\""
        );
    }

    #[test]
    fn test_target_normalizes_sub_path() {
        let target = SessionTarget::new("p1", "terminal-audit");
        assert_eq!(target.sub_path, "/terminal-audit");

        let target = SessionTarget::new("p1", "/shell");
        assert_eq!(target.sub_path, "/shell");
    }
}
