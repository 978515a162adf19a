//! Game room management.
//!
//! Each room that has started holds its own headless `BattleSystemManager`
//! with every seat marked remote. Orders from clients are dry-run against it
//! before being replayed, so only orders every peer can ratify are relayed.

use battle_core::{
    maps, BattleAssets, BattleSystemManager, MapDef, PlayerId, Players, RemoteOrder, Scenario,
};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::protocol::{PlayerInfo, RoomInfo, RoomStatus};

/// Map used when a room is created without naming one
pub const DEFAULT_MAP: &str = "duel";

/// Upper bound on engine ticks spent settling after one order
const PUMP_LIMIT: usize = 4096;

#[derive(Debug, Error)]
pub enum RoomError {
    #[error("Room is full")]
    RoomFull,

    #[error("Player not in room")]
    PlayerNotInRoom,

    #[error("Not the host")]
    NotHost,

    #[error("Game already started")]
    GameAlreadyStarted,

    #[error("Not enough players")]
    NotEnoughPlayers,

    #[error("Game not started")]
    GameNotStarted,

    #[error("Game is over")]
    GameFinished,

    #[error("Not your turn")]
    NotYourTurn,

    #[error("Unknown map: {0}")]
    UnknownMap(String),

    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    #[error("Battle engine failed: {0}")]
    Engine(String),
}

/// A player in a game room.
#[derive(Debug, Clone)]
pub struct RoomPlayer {
    pub id: Uuid,
    pub name: String,
    pub connected: bool,
    /// Seat in the battle, assigned when the game starts
    pub seat: Option<PlayerId>,
}

impl RoomPlayer {
    pub fn new(id: Uuid, name: String) -> Self {
        Self {
            id,
            name,
            connected: true,
            seat: None,
        }
    }

    pub fn to_info(&self) -> PlayerInfo {
        PlayerInfo {
            id: self.id,
            name: self.name.clone(),
            connected: self.connected,
            seat: self.seat,
        }
    }
}

/// A room of players sharing one battle.
pub struct GameRoom {
    pub id: Uuid,
    pub name: String,
    pub map: &'static MapDef,
    pub max_players: u8,
    pub host_id: Uuid,
    pub status: RoomStatus,
    pub players: HashMap<Uuid, RoomPlayer>,
    /// Join order, which becomes seat order
    pub player_order: Vec<Uuid>,
    /// The authoritative battle (once started)
    pub battle: Option<BattleSystemManager>,
}

impl GameRoom {
    pub fn new(
        id: Uuid,
        host_id: Uuid,
        host_name: String,
        map_name: Option<&str>,
    ) -> Result<Self, RoomError> {
        let map_name = map_name.unwrap_or(DEFAULT_MAP);
        let map =
            maps::named(map_name).ok_or_else(|| RoomError::UnknownMap(map_name.to_string()))?;

        let mut players = HashMap::new();
        players.insert(host_id, RoomPlayer::new(host_id, host_name.clone()));

        Ok(Self {
            id,
            name: format!("{}'s Battle", host_name),
            map,
            max_players: map.seats as u8,
            host_id,
            status: RoomStatus::Waiting,
            players,
            player_order: vec![host_id],
            battle: None,
        })
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.max_players as usize
    }

    pub fn add_player(&mut self, player_id: Uuid, name: String) -> Result<(), RoomError> {
        if self.status != RoomStatus::Waiting {
            return Err(RoomError::GameAlreadyStarted);
        }
        if self.is_full() {
            return Err(RoomError::RoomFull);
        }

        self.players.insert(player_id, RoomPlayer::new(player_id, name));
        self.player_order.push(player_id);
        Ok(())
    }

    /// Returns whether the room is now empty
    pub fn remove_player(&mut self, player_id: Uuid) -> Result<bool, RoomError> {
        if self.players.remove(&player_id).is_none() {
            return Err(RoomError::PlayerNotInRoom);
        }
        self.player_order.retain(|&id| id != player_id);

        if player_id == self.host_id {
            if let Some(&next) = self.player_order.first() {
                self.host_id = next;
            }
        }

        Ok(self.players.is_empty())
    }

    pub fn set_player_connected(&mut self, player_id: Uuid, connected: bool) {
        if let Some(player) = self.players.get_mut(&player_id) {
            player.connected = connected;
        }
    }

    pub fn start_game(&mut self, requester_id: Uuid) -> Result<(), RoomError> {
        if requester_id != self.host_id {
            return Err(RoomError::NotHost);
        }
        if self.status != RoomStatus::Waiting {
            return Err(RoomError::GameAlreadyStarted);
        }
        if self.players.len() < self.map.seats {
            return Err(RoomError::NotEnoughPlayers);
        }

        for (seat, player_id) in self.player_order.iter().enumerate() {
            if let Some(player) = self.players.get_mut(player_id) {
                player.seat = Some(seat as PlayerId);
            }
        }
        let names = self.seat_names();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();

        let board = self
            .map
            .build()
            .map_err(|e| RoomError::Engine(e.to_string()))?;
        let scenario = Scenario::default();
        let mut players = Players::new(&names, &board, &scenario);
        for seat in 0..players.len() {
            if let Some(player) = players.get_mut(seat as PlayerId) {
                player.remote = true;
            }
        }

        let assets = BattleAssets::new(board, players, scenario);
        let mut battle =
            BattleSystemManager::new(assets).map_err(|e| RoomError::Engine(e.to_string()))?;
        pump(&mut battle)?;

        info!(room = %self.id, map = self.map.name, seats = names.len(), "battle started");
        self.battle = Some(battle);
        self.status = RoomStatus::InGame;
        Ok(())
    }

    /// Check `order` against the authoritative battle and replay it.
    ///
    /// Returns the sender's seat so the caller can relay the order onward.
    pub fn apply_order(
        &mut self,
        player_id: Uuid,
        order: RemoteOrder,
    ) -> Result<PlayerId, RoomError> {
        let seat = self.seat_of(player_id)?;
        if self.status == RoomStatus::Finished {
            return Err(RoomError::GameFinished);
        }
        let battle = self.battle.as_mut().ok_or(RoomError::GameNotStarted)?;

        if battle.assets().players.current_id() != seat {
            return Err(RoomError::NotYourTurn);
        }

        if let RemoteOrder::Instruction(instruction) = &order {
            let BattleAssets {
                registry,
                board,
                players,
                scenario,
                ..
            } = battle.assets_mut();
            if let Err(e) = registry.validate(instruction, board, players, scenario) {
                warn!(room = %self.id, seat, error = %e, "order rejected");
                return Err(RoomError::InvalidOrder(e.to_string()));
            }
        }

        debug!(room = %self.id, seat, ?order, "replaying order");
        battle.assets_mut().inbox.push_back(order);
        pump(battle)?;

        if battle.assets().finished {
            self.status = RoomStatus::Finished;
        }
        Ok(seat)
    }

    pub fn seat_of(&self, player_id: Uuid) -> Result<PlayerId, RoomError> {
        let player = self
            .players
            .get(&player_id)
            .ok_or(RoomError::PlayerNotInRoom)?;
        player.seat.ok_or(RoomError::GameNotStarted)
    }

    /// Names in seat order
    pub fn seat_names(&self) -> Vec<String> {
        self.player_order
            .iter()
            .filter_map(|id| self.players.get(id).map(|p| p.name.clone()))
            .collect()
    }

    /// The seat whose turn it is
    pub fn current_seat(&self) -> Option<PlayerId> {
        self.battle
            .as_ref()
            .map(|b| b.assets().players.current_id())
    }

    pub fn get_winner(&self) -> Option<(PlayerId, String)> {
        let outcome = self.battle.as_ref()?.assets().outcome?;
        let winner_id = self.player_order.get(outcome.winner as usize)?;
        let winner_name = self.players.get(winner_id)?.name.clone();
        Some((outcome.winner, winner_name))
    }

    pub fn to_info(&self) -> RoomInfo {
        RoomInfo {
            id: self.id,
            name: self.name.clone(),
            map: self.map.name.to_string(),
            players: self
                .player_order
                .iter()
                .filter_map(|id| self.players.get(id).map(|p| p.to_info()))
                .collect(),
            max_players: self.max_players,
            host_id: self.host_id,
            status: self.status,
        }
    }
}

/// Tick the battle until it is waiting on the next remote order
fn pump(battle: &mut BattleSystemManager) -> Result<(), RoomError> {
    for _ in 0..PUMP_LIMIT {
        // Nobody watches the animations here
        battle.assets_mut().events.drain();
        if battle.is_idle() {
            return Ok(());
        }
        battle
            .update()
            .map_err(|e| RoomError::Engine(e.to_string()))?;
    }
    Err(RoomError::Engine(format!(
        "battle never settled: {}",
        battle.state_history()
    )))
}
