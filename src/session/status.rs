use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// On/off state of one capture resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceState {
    #[default]
    Inactive,
    Active,
}

impl ResourceState {
    pub fn is_active(self) -> bool {
        self == ResourceState::Active
    }
}

impl From<bool> for ResourceState {
    fn from(active: bool) -> Self {
        if active {
            ResourceState::Active
        } else {
            ResourceState::Inactive
        }
    }
}

/// Snapshot of a live session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatus {
    pub session_id: String,

    pub connection: ConnectionStatus,

    /// When the current connection was established
    pub connected_at: Option<DateTime<Utc>>,

    /// Whether the local audio pipeline is ready
    pub initialized: bool,

    pub microphone: ResourceState,

    pub camera: ResourceState,

    pub screen: ResourceState,

    /// Whether a model turn is streaming
    pub turn_active: bool,

    /// Number of committed transcript entries
    pub history_len: usize,
}
