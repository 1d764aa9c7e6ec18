//! Session configuration with sensible defaults.
//!
//! All operational parameters of the session runtime are centralized
//! here. Every value has a documented default.

use serde::{Deserialize, Serialize};

use crate::{Result, Username, WhisperlinkError};

/// Longest accepted local username, in bytes.
const MAX_USERNAME_LEN: usize = 64;

/// Session runtime configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    /// The local user's name, as known to the relay. The session
    /// never treats this name as a selectable peer.
    pub local_user: Username,

    /// Capacity of the bounded command channel. Callers await
    /// backpressure if the event loop is overloaded.
    pub command_channel_size: usize,

    /// Capacity of the bounded UI event channel. Larger than the
    /// command channel to absorb bursts of incoming messages.
    pub event_channel_size: usize,
}

impl SessionConfig {
    /// Creates a configuration for `local_user` with default channel
    /// capacities.
    pub fn new(local_user: Username) -> Self {
        Self {
            local_user,
            command_channel_size: 256,
            event_channel_size: 1024,
        }
    }

    /// Validates all configuration values.
    ///
    /// Returns an error if any value is outside its acceptable range.
    pub fn validate(&self) -> Result<()> {
        let name = self.local_user.as_str();
        if name.is_empty() {
            return Err(WhisperlinkError::Config {
                reason: "local_user must not be empty".into(),
            });
        }

        if name.len() > MAX_USERNAME_LEN {
            return Err(WhisperlinkError::Config {
                reason: format!("local_user exceeds {MAX_USERNAME_LEN} bytes"),
            });
        }

        if name.chars().any(char::is_control) {
            return Err(WhisperlinkError::Config {
                reason: "local_user must not contain control characters".into(),
            });
        }

        if self.command_channel_size == 0 {
            return Err(WhisperlinkError::Config {
                reason: "command_channel_size must be greater than 0".into(),
            });
        }

        if self.event_channel_size == 0 {
            return Err(WhisperlinkError::Config {
                reason: "event_channel_size must be greater than 0".into(),
            });
        }

        Ok(())
    }
}
