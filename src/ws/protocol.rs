//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Deserializer, Serialize};

use crate::relay::{PlayerId, PlayerRecord};

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMsg {
    /// Current car state of the sending connection
    Update(PlayerUpdate),

    /// Any `type` this server does not know; dropped without a reply
    #[serde(other)]
    Unknown,
}

/// Car state fields carried by an `update`.
///
/// Every field is optional: absent fields leave the stored record untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerUpdate {
    #[serde(
        default,
        deserialize_with = "non_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub x: Option<f64>,
    #[serde(
        default,
        deserialize_with = "non_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub y: Option<f64>,
    /// Heading in radians
    #[serde(
        default,
        deserialize_with = "non_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub rotation: Option<f64>,
    #[serde(
        default,
        deserialize_with = "non_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub speed: Option<f64>,
    /// Health percentage
    #[serde(
        default,
        deserialize_with = "non_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub hp: Option<f64>,
    #[serde(
        default,
        deserialize_with = "non_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub lights_on: Option<bool>,
}

/// A key that is present must carry a value; only a missing key means "unchanged"
fn non_null<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl PlayerUpdate {
    /// Reject updates carrying non-finite numbers.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        let numbers = [
            ("x", self.x),
            ("y", self.y),
            ("rotation", self.rotation),
            ("speed", self.speed),
            ("hp", self.hp),
        ];

        for (field, value) in numbers {
            if let Some(v) = value {
                if !v.is_finite() {
                    return Err(ProtocolError::NonFinite(field));
                }
            }
        }

        Ok(())
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMsg {
    /// Sent once to a new connection
    Init {
        /// The connection's own record
        player: PlayerRecord,
        /// Everybody else currently connected
        players: Vec<PlayerRecord>,
    },

    /// Another player connected
    PlayerJoin { player: PlayerRecord },

    /// Another player's state after an `update`
    PlayerUpdate { player: PlayerRecord },

    /// Another player disconnected
    PlayerLeave {
        #[serde(rename = "playerId")]
        player_id: PlayerId,
    },
}

impl ServerMsg {
    /// Id of the player this message is about
    pub fn subject(&self) -> &PlayerId {
        match self {
            ServerMsg::Init { player, .. }
            | ServerMsg::PlayerJoin { player }
            | ServerMsg::PlayerUpdate { player } => &player.id,
            ServerMsg::PlayerLeave { player_id } => player_id,
        }
    }
}

/// Decode a text frame into a validated client message
pub fn decode_client_msg(text: &str) -> Result<ClientMsg, ProtocolError> {
    let msg: ClientMsg = serde_json::from_str(text)?;
    if let ClientMsg::Update(update) = &msg {
        update.validate()?;
    }
    Ok(msg)
}

/// Protocol errors
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Field `{0}` is not a finite number")]
    NonFinite(&'static str),
}
