use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use async_trait::async_trait;
use futures::{sink::SinkExt, stream::StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, Mutex, RwLock};
use uuid::Uuid;

use crate::actions::PlayerRequest;
use crate::errors::{ServerResult, SessionError};
use crate::game::TurnAuthority;
use crate::service::{spawn_match, MatchCommand, MatchHandle};
use crate::session::{EventTransport, PeerId, Seat, ServerMessage};

/// Websocket-backed [`EventTransport`]: a broadcast channel fans state events
/// out to every connected peer, and a per-peer channel carries private
/// messages (the welcome and trap-placement confirmations).
pub struct WsTransport {
    broadcaster: broadcast::Sender<ServerMessage>,
    peers: RwLock<HashMap<PeerId, mpsc::UnboundedSender<ServerMessage>>>,
}

impl WsTransport {
    pub fn new() -> Self {
        let (broadcaster, _) = broadcast::channel(256);
        WsTransport {
            broadcaster,
            peers: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a peer, returning its private receiver and a subscription
    /// to the broadcast stream.
    pub async fn register(
        &self,
        peer: PeerId,
    ) -> (
        mpsc::UnboundedReceiver<ServerMessage>,
        broadcast::Receiver<ServerMessage>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        self.peers.write().await.insert(peer, tx);
        (rx, self.broadcaster.subscribe())
    }

    pub async fn unregister(&self, peer: PeerId) {
        self.peers.write().await.remove(&peer);
    }
}

impl Default for WsTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventTransport for WsTransport {
    async fn send_to(&self, peer: PeerId, message: &ServerMessage) -> ServerResult<()> {
        let peers = self.peers.read().await;
        let tx = peers
            .get(&peer)
            .ok_or_else(|| SessionError::PeerNotFound(peer.to_string()))?;
        tx.send(message.clone())
            .map_err(|_| SessionError::PeerNotFound(peer.to_string()))?;
        Ok(())
    }

    async fn broadcast(&self, message: &ServerMessage) -> ServerResult<()> {
        // A send error only means no peer is currently subscribed.
        let _ = self.broadcaster.send(message.clone());
        Ok(())
    }
}

/// Seat occupancy for one match: host first, guest second, nobody else.
#[derive(Debug, Default)]
struct SeatMap {
    host: Option<PeerId>,
    guest: Option<PeerId>,
}

impl SeatMap {
    /// Seats the peer in the first free seat, or refuses a third connection.
    fn take_seat(&mut self, peer: PeerId) -> Option<Seat> {
        if self.host.is_none() {
            self.host = Some(peer);
            Some(Seat::Host)
        } else if self.guest.is_none() {
            self.guest = Some(peer);
            Some(Seat::Guest)
        } else {
            None
        }
    }

    fn release(&mut self, peer: PeerId) {
        if self.host == Some(peer) {
            self.host = None;
        }
        if self.guest == Some(peer) {
            self.guest = None;
        }
    }

    fn connected(&self) -> u8 {
        self.host.is_some() as u8 + self.guest.is_some() as u8
    }
}

struct MatchEntry {
    handle: MatchHandle,
    transport: Arc<WsTransport>,
    seats: SeatMap,
}

/// Shared application state: the match registry.
pub struct AppState {
    matches: Mutex<HashMap<String, MatchEntry>>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new() -> SharedState {
        Arc::new(AppState {
            matches: Mutex::new(HashMap::new()),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MatchCreated {
    pub id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MatchSummary {
    pub id: String,
    pub connected: u8,
}

/// Create a match: spawns its authority task and hands back the join code.
pub async fn create_match(State(state): State<SharedState>) -> Json<MatchCreated> {
    let id = Uuid::new_v4().to_string();
    let transport = Arc::new(WsTransport::new());
    let handle = spawn_match(TurnAuthority::new(), transport.clone());

    log::info!("created match {}", id);
    state.matches.lock().await.insert(
        id.clone(),
        MatchEntry {
            handle,
            transport,
            seats: SeatMap::default(),
        },
    );

    Json(MatchCreated { id })
}

/// Look up a match by its join code.
pub async fn get_match(
    State(state): State<SharedState>,
    Path(match_id): Path<String>,
) -> Result<Json<MatchSummary>, StatusCode> {
    let matches = state.matches.lock().await;
    match matches.get(&match_id) {
        Some(entry) => Ok(Json(MatchSummary {
            id: match_id.clone(),
            connected: entry.seats.connected(),
        })),
        None => Err(StatusCode::NOT_FOUND),
    }
}

/// Upgrade a peer connection into a seat at the match.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(match_id): Path<String>,
    State(state): State<SharedState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, match_id, state))
}

async fn handle_connection(socket: WebSocket, match_id: String, state: SharedState) {
    let (mut sender, mut receiver) = socket.split();
    let peer: PeerId = Uuid::new_v4();

    // Seat the peer, or turn it away.
    let (seat, handle, transport) = {
        let mut matches = state.matches.lock().await;
        let Some(entry) = matches.get_mut(&match_id) else {
            let error = SessionError::MatchNotFound(match_id.clone());
            send_raw(&mut sender, &ServerMessage::error(error.to_string())).await;
            return;
        };
        let Some(seat) = entry.seats.take_seat(peer) else {
            // No spectators: exactly two peers per match.
            send_raw(&mut sender, &ServerMessage::error(SessionError::MatchFull.to_string()))
                .await;
            return;
        };
        (seat, entry.handle.clone(), entry.transport.clone())
    };

    log::info!("peer {} joined match {} as {:?}", peer, match_id, seat);
    let (mut private_rx, mut broadcast_rx) = transport.register(peer).await;

    if handle
        .submit(MatchCommand::Seat { peer, seat })
        .await
        .is_err()
    {
        log::error!("match {} queue closed before welcome", match_id);
        transport.unregister(peer).await;
        return;
    }

    // Forward private and broadcast messages to this peer's socket.
    let mut send_task = tokio::spawn(async move {
        loop {
            let message = tokio::select! {
                private = private_rx.recv() => match private {
                    Some(m) => m,
                    None => break,
                },
                public = broadcast_rx.recv() => match public {
                    Ok(m) => m,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        log::warn!("peer fell behind, skipped {} events", skipped);
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            };
            match serde_json::to_string(&message) {
                Ok(json) => {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break; // Client disconnected
                    }
                }
                Err(e) => log::error!("failed to serialize server message: {}", e),
            }
        }
    });

    // Feed client requests into the match queue, stamped with this seat.
    let request_handle = handle.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            match message {
                Message::Text(text) => match serde_json::from_str::<PlayerRequest>(&text) {
                    Ok(request) => {
                        if request_handle
                            .submit(MatchCommand::Request {
                                peer,
                                seat,
                                request,
                            })
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    // Malformed input is dropped, matching the silent
                    // rejection of illegal requests.
                    Err(e) => log::debug!("ignoring malformed request: {}", e),
                },
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    }

    // Tear down the seat so a replacement peer can join.
    transport.unregister(peer).await;
    {
        let mut matches = state.matches.lock().await;
        if let Some(entry) = matches.get_mut(&match_id) {
            entry.seats.release(peer);
        }
    }
    let _ = handle.submit(MatchCommand::Leave { peer, seat }).await;
    log::info!("peer {} disconnected from match {}", peer, match_id);
}

async fn send_raw(
    sender: &mut (impl SinkExt<Message> + Unpin),
    message: &ServerMessage,
) {
    if let Ok(json) = serde_json::to_string(message) {
        let _ = sender.send(Message::Text(json.into())).await;
    }
}
