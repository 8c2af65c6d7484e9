//! Sub-agent session settings.

use std::time::Duration;

use crate::oid::Oid;

/// Conventional location of the master agent's Unix socket.
pub const DEFAULT_SOCKET_PATH: &str = "/var/agentx/master";

/// Settings announced to the master in the Open PDU, plus where to find it.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Human-readable sub-agent description.
    pub description: String,
    /// Seconds the master should wait for us; 0 leaves it to the master.
    pub default_timeout: u8,
    /// Object identifier of the sub-agent, usually its sysObjectID.
    pub id: Oid,
    pub socket_path: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            description: String::from("AgentX sub-agent"),
            default_timeout: 0,
            id: Oid::null(),
            socket_path: DEFAULT_SOCKET_PATH.to_string(),
        }
    }
}

impl SessionConfig {
    pub fn new(description: impl Into<String>) -> Self {
        SessionConfig {
            description: description.into(),
            ..SessionConfig::default()
        }
    }

    pub fn with_timeout(mut self, seconds: u8) -> Self {
        self.default_timeout = seconds;
        self
    }

    pub fn with_id(mut self, id: Oid) -> Self {
        self.id = id;
        self
    }

    pub fn with_socket_path(mut self, path: impl Into<String>) -> Self {
        self.socket_path = path.into();
        self
    }

    /// How long the session waits for answers to its own requests.
    pub fn response_timeout(&self) -> Duration {
        match self.default_timeout {
            0 => Duration::from_secs(1),
            secs => Duration::from_secs(secs as u64),
        }
    }
}
