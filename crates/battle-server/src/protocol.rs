//! WebSocket protocol messages for the battle relay.

use battle_core::{CommandInstruction, PlayerId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    /// Open a new room on one of the built-in maps
    CreateRoom {
        player_name: String,
        #[serde(default)]
        map: Option<String>,
    },

    JoinRoom { room_id: Uuid, player_name: String },

    LeaveRoom,

    /// Start the battle (host only)
    StartGame,

    /// A finished order for the sender's seat
    TroopOrder { instruction: CommandInstruction },

    /// The sender's seat is done for the day
    EndTurn,

    Chat { message: String },

    /// Request the rooms still waiting for players
    ListRooms,

    Ping,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerMessage {
    /// Sent once on connect with the id assigned to this client
    Welcome { player_id: Uuid },

    RoomCreated { room_id: Uuid },

    JoinedRoom { room: RoomInfo },

    LeftRoom,

    /// Someone joined, left, or dropped their connection
    RoomUpdated { room: RoomInfo },

    /// The battle began; `seat` is the receiver's own seat
    GameStarted {
        map: String,
        seat: PlayerId,
        seats: Vec<String>,
    },

    /// An accepted order from another seat, to be replayed locally
    TroopOrder {
        seat: PlayerId,
        instruction: CommandInstruction,
    },

    /// Another seat ended its turn
    EndTurn { seat: PlayerId },

    /// The sender's order was not relayed
    OrderRejected { reason: String },

    ChatMessage { player_name: String, message: String },

    RoomList { rooms: Vec<RoomInfo> },

    Error { message: String },

    Pong,

    GameOver { winner: PlayerId, winner_name: String },
}

/// Room information for clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomInfo {
    pub id: Uuid,
    pub name: String,
    pub map: String,
    pub players: Vec<PlayerInfo>,
    pub max_players: u8,
    pub host_id: Uuid,
    pub status: RoomStatus,
}

/// Player information in a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub id: Uuid,
    pub name: String,
    pub connected: bool,
    /// Seat index, assigned when the battle starts
    pub seat: Option<PlayerId>,
}

/// Room status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomStatus {
    Waiting,
    InGame,
    Finished,
}
