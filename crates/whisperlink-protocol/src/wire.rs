//! Typed wire events for the relay boundary.
//!
//! [`RelayEvent`] is the unified inbound event type the session
//! consumes; [`ClientRequest`] is everything the client ever sends.
//! Both serialize as externally tagged JSON with snake_case event
//! names and camelCase payload fields, e.g.
//!
//! ```json
//! {"event":"new_public_key","data":{"username":"bob","publicKey":"-----BEGIN..."}}
//! ```
//!
//! The transport carrying these events is out of scope; the session
//! only sees channels of already-typed values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use whisperlink_types::Username;

use crate::envelope::{MessageEnvelope, OutgoingMessage};

// ---------------------------------------------------------------------------
// RelayEvent
// ---------------------------------------------------------------------------

/// Events delivered relay→client.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum RelayEvent {
    /// Initial directory snapshot: username → public key PEM for
    /// every connected user (including, possibly, the local user —
    /// the session skips its own entry). Sent once per connection.
    PublicKeysExchange(BTreeMap<Username, String>),

    /// Incremental single-peer key announcement.
    #[serde(rename_all = "camelCase")]
    NewPublicKey {
        /// User the key belongs to.
        username: Username,
        /// The announced public key PEM.
        public_key: String,
    },

    /// Complete replacement of the online-user set.
    UserListUpdate(Vec<Username>),

    /// Display-only status text; no state change.
    StatusMessage {
        /// The status text.
        text: String,
    },

    /// A relayed message, delivered to the recipient and echoed back
    /// to the sender.
    NewMessage(MessageEnvelope),
}

// ---------------------------------------------------------------------------
// ClientRequest
// ---------------------------------------------------------------------------

/// Requests sent client→relay.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientRequest {
    /// Announces the local public key. Sent once, immediately after
    /// identity generation.
    #[serde(rename_all = "camelCase")]
    RegisterPublicKey {
        /// SPKI PEM of the local identity's public half.
        public_key: String,
    },

    /// Submits an encrypted message for relay to its recipient.
    SendMessage(OutgoingMessage),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_event_shape() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let request = ClientRequest::RegisterPublicKey {
            public_key: "PEM".into(),
        };
        let json = serde_json::to_string(&request)?;
        assert_eq!(
            json,
            r#"{"event":"register_public_key","data":{"publicKey":"PEM"}}"#
        );
        Ok(())
    }

    #[test]
    fn new_public_key_roundtrip() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let json = r#"{"event":"new_public_key","data":{"username":"bob","publicKey":"PEM"}}"#;
        let event: RelayEvent = serde_json::from_str(json)?;
        match event {
            RelayEvent::NewPublicKey {
                username,
                public_key,
            } => {
                assert_eq!(username, Username::new("bob"));
                assert_eq!(public_key, "PEM");
            }
            other => panic!("unexpected event: {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn user_list_update_roundtrip() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let json = r#"{"event":"user_list_update","data":["alice","bob"]}"#;
        let event: RelayEvent = serde_json::from_str(json)?;
        match event {
            RelayEvent::UserListUpdate(users) => {
                assert_eq!(users, vec![Username::new("alice"), Username::new("bob")]);
            }
            other => panic!("unexpected event: {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn keys_exchange_map_keys_are_usernames(
    ) -> std::result::Result<(), Box<dyn std::error::Error>> {
        let json = r#"{"event":"public_keys_exchange","data":{"alice":"PEM_A","bob":"PEM_B"}}"#;
        let event: RelayEvent = serde_json::from_str(json)?;
        match event {
            RelayEvent::PublicKeysExchange(map) => {
                assert_eq!(map.len(), 2);
                assert_eq!(map.get(&Username::new("bob")).map(String::as_str), Some("PEM_B"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn unknown_event_rejected() {
        let json = r#"{"event":"selfdestruct","data":{}}"#;
        let result: std::result::Result<RelayEvent, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }
}
