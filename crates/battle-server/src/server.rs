//! WebSocket server and connection handling.

use crate::protocol::{ClientMessage, RoomInfo, RoomStatus, ServerMessage};
use crate::room::{GameRoom, RoomError};
use battle_core::{PlayerId, RemoteOrder};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Server state shared across all connections.
pub struct ServerState {
    pub rooms: DashMap<Uuid, GameRoom>,
    /// Which room each player is in
    pub player_rooms: DashMap<Uuid, Uuid>,
    /// Outgoing message channel per connected player
    pub player_senders: DashMap<Uuid, mpsc::UnboundedSender<ServerMessage>>,
}

impl ServerState {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
            player_rooms: DashMap::new(),
            player_senders: DashMap::new(),
        }
    }

    pub fn send_to_player(&self, player_id: Uuid, msg: ServerMessage) {
        if let Some(sender) = self.player_senders.get(&player_id) {
            let _ = sender.send(msg);
        }
    }

    pub fn send_error(&self, player_id: Uuid, err: impl ToString) {
        self.send_to_player(
            player_id,
            ServerMessage::Error {
                message: err.to_string(),
            },
        );
    }

    /// Send `msg` to every player in `members`
    fn broadcast(&self, members: &[Uuid], msg: ServerMessage) {
        for player_id in members {
            self.send_to_player(*player_id, msg.clone());
        }
    }

    /// Broadcast a message to all players in a room.
    pub fn broadcast_to_room(&self, room_id: Uuid, msg: ServerMessage) {
        let members = self.room_members(room_id);
        self.broadcast(&members, msg);
    }

    /// Broadcast a message to all players in a room except one.
    pub fn broadcast_to_room_except(&self, room_id: Uuid, except: Uuid, msg: ServerMessage) {
        let members: Vec<Uuid> = self
            .room_members(room_id)
            .into_iter()
            .filter(|id| *id != except)
            .collect();
        self.broadcast(&members, msg);
    }

    fn room_members(&self, room_id: Uuid) -> Vec<Uuid> {
        self.rooms
            .get(&room_id)
            .map(|room| room.player_order.clone())
            .unwrap_or_default()
    }

    pub fn get_waiting_rooms(&self) -> Vec<RoomInfo> {
        self.rooms
            .iter()
            .filter(|r| r.status == RoomStatus::Waiting)
            .map(|r| r.to_info())
            .collect()
    }

    fn room_of(&self, player_id: Uuid) -> Option<Uuid> {
        self.player_rooms.get(&player_id).map(|r| *r)
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}

/// Run the WebSocket server.
pub async fn run_server(addr: SocketAddr, state: Arc<ServerState>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Battle relay listening on {}", addr);

    while let Ok((stream, peer_addr)) = listener.accept().await {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, state).await {
                error!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }

    Ok(())
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    state: Arc<ServerState>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New WebSocket connection from {}", addr);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let player_id = Uuid::new_v4();

    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    state.player_senders.insert(player_id, tx);

    let welcome = serde_json::to_string(&ServerMessage::Welcome { player_id })?;
    ws_sender.send(Message::Text(welcome)).await?;

    // Forward queued messages to the socket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(text) => {
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(e) => error!("Cannot encode message: {}", e),
            }
        }
    });

    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => handle_message(player_id, client_msg, &state),
                Err(e) => {
                    warn!("Invalid message from {}: {}", player_id, e);
                    state.send_error(player_id, format!("Invalid message: {}", e));
                }
            },
            Ok(Message::Close(_)) => {
                info!("Client {} closing connection", player_id);
                break;
            }
            Ok(Message::Ping(_)) => state.send_to_player(player_id, ServerMessage::Pong),
            Err(e) => {
                error!("WebSocket error from {}: {}", player_id, e);
                break;
            }
            _ => {}
        }
    }

    handle_disconnect(player_id, &state);
    state.player_senders.remove(&player_id);
    send_task.abort();

    info!("Connection closed for {}", player_id);
    Ok(())
}

fn handle_message(player_id: Uuid, msg: ClientMessage, state: &ServerState) {
    match msg {
        ClientMessage::CreateRoom { player_name, map } => {
            let room_id = Uuid::new_v4();
            match GameRoom::new(room_id, player_id, player_name, map.as_deref()) {
                Ok(room) => {
                    let room_info = room.to_info();
                    state.rooms.insert(room_id, room);
                    state.player_rooms.insert(player_id, room_id);
                    info!(room = %room_id, map = %room_info.map, "room created");

                    state.send_to_player(player_id, ServerMessage::RoomCreated { room_id });
                    state.send_to_player(player_id, ServerMessage::JoinedRoom { room: room_info });
                }
                Err(e) => state.send_error(player_id, e),
            }
        }

        ClientMessage::JoinRoom {
            room_id,
            player_name,
        } => {
            let joined = match state.rooms.get_mut(&room_id) {
                Some(mut room) => room.add_player(player_id, player_name).map(|()| room.to_info()),
                None => {
                    state.send_error(player_id, "Room not found");
                    return;
                }
            };
            match joined {
                Ok(room_info) => {
                    state.player_rooms.insert(player_id, room_id);
                    state.send_to_player(
                        player_id,
                        ServerMessage::JoinedRoom {
                            room: room_info.clone(),
                        },
                    );
                    state.broadcast_to_room_except(
                        room_id,
                        player_id,
                        ServerMessage::RoomUpdated { room: room_info },
                    );
                }
                Err(e) => state.send_error(player_id, e),
            }
        }

        ClientMessage::LeaveRoom => {
            if let Some((_, room_id)) = state.player_rooms.remove(&player_id) {
                leave_room(player_id, room_id, state);
                state.send_to_player(player_id, ServerMessage::LeftRoom);
            }
        }

        ClientMessage::StartGame => {
            let Some(room_id) = state.room_of(player_id) else {
                state.send_error(player_id, RoomError::PlayerNotInRoom);
                return;
            };
            let started = match state.rooms.get_mut(&room_id) {
                Some(mut room) => room.start_game(player_id).map(|()| {
                    let map = room.map.name.to_string();
                    (map, room.seat_names(), room.player_order.clone())
                }),
                None => return,
            };
            match started {
                Ok((map, seats, order)) => {
                    for (seat, member) in order.into_iter().enumerate() {
                        state.send_to_player(
                            member,
                            ServerMessage::GameStarted {
                                map: map.clone(),
                                seat: seat as PlayerId,
                                seats: seats.clone(),
                            },
                        );
                    }
                }
                Err(e) => state.send_error(player_id, e),
            }
        }

        ClientMessage::TroopOrder { instruction } => {
            relay_order(player_id, RemoteOrder::Instruction(instruction), state);
        }

        ClientMessage::EndTurn => relay_order(player_id, RemoteOrder::EndTurn, state),

        ClientMessage::Chat { message } => {
            if let Some(room_id) = state.room_of(player_id) {
                let player_name = state
                    .rooms
                    .get(&room_id)
                    .and_then(|r| r.players.get(&player_id).map(|p| p.name.clone()))
                    .unwrap_or_else(|| "Unknown".to_string());

                state.broadcast_to_room(
                    room_id,
                    ServerMessage::ChatMessage {
                        player_name,
                        message,
                    },
                );
            }
        }

        ClientMessage::ListRooms => {
            let rooms = state.get_waiting_rooms();
            state.send_to_player(player_id, ServerMessage::RoomList { rooms });
        }

        ClientMessage::Ping => state.send_to_player(player_id, ServerMessage::Pong),
    }
}

/// Check an order against the room's battle, then pass it to the other seats
fn relay_order(player_id: Uuid, order: RemoteOrder, state: &ServerState) {
    let Some(room_id) = state.room_of(player_id) else {
        state.send_error(player_id, RoomError::PlayerNotInRoom);
        return;
    };

    let applied = match state.rooms.get_mut(&room_id) {
        Some(mut room) => room
            .apply_order(player_id, order.clone())
            .map(|seat| (seat, room.get_winner())),
        None => return,
    };

    match applied {
        Ok((seat, winner)) => {
            let relayed = match order {
                RemoteOrder::Instruction(instruction) => {
                    ServerMessage::TroopOrder { seat, instruction }
                }
                RemoteOrder::EndTurn => ServerMessage::EndTurn { seat },
            };
            state.broadcast_to_room_except(room_id, player_id, relayed);

            if let Some((winner, winner_name)) = winner {
                info!(room = %room_id, winner, "battle over");
                state.broadcast_to_room(
                    room_id,
                    ServerMessage::GameOver {
                        winner,
                        winner_name,
                    },
                );
            }
        }
        Err(e @ (RoomError::InvalidOrder(_) | RoomError::NotYourTurn)) => {
            state.send_to_player(
                player_id,
                ServerMessage::OrderRejected {
                    reason: e.to_string(),
                },
            );
        }
        Err(e) => state.send_error(player_id, e),
    }
}

/// Remove a player from a waiting room, dropping the room once empty
fn leave_room(player_id: Uuid, room_id: Uuid, state: &ServerState) {
    let remaining = match state.rooms.get_mut(&room_id) {
        Some(mut room) => match room.remove_player(player_id) {
            Ok(true) => None,
            Ok(false) => Some(room.to_info()),
            Err(_) => return,
        },
        None => return,
    };

    match remaining {
        Some(room_info) => {
            state.broadcast_to_room(room_id, ServerMessage::RoomUpdated { room: room_info })
        }
        None => {
            state.rooms.remove(&room_id);
            info!(room = %room_id, "room closed");
        }
    }
}

fn handle_disconnect(player_id: Uuid, state: &ServerState) {
    let Some((_, room_id)) = state.player_rooms.remove(&player_id) else {
        return;
    };

    // Seats stay reserved once the battle is running
    let in_game = match state.rooms.get_mut(&room_id) {
        Some(mut room) if room.status != RoomStatus::Waiting => {
            room.set_player_connected(player_id, false);
            Some(room.to_info())
        }
        Some(_) => None,
        None => return,
    };

    match in_game {
        Some(room_info) => {
            state.broadcast_to_room(room_id, ServerMessage::RoomUpdated { room: room_info })
        }
        None => leave_room(player_id, room_id, state),
    }
}
