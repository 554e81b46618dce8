use std::sync::Arc;

use tokio::sync::mpsc;

use crate::actions::{Outbound, PlayerRequest};
use crate::errors::SessionError;
use crate::game::{PlayerColor, TurnAuthority};
use crate::session::{ColorAssignment, EventTransport, PeerId, Seat, ServerMessage};

/// Commands fed into a match's command queue.
#[derive(Debug)]
pub enum MatchCommand {
    /// A peer took a seat; the runtime answers with a private welcome.
    Seat { peer: PeerId, seat: Seat },

    /// A request from a seated peer, stamped with its seat by the session
    /// layer.
    Request {
        peer: PeerId,
        seat: Seat,
        request: PlayerRequest,
    },

    /// A peer disconnected.
    Leave { peer: PeerId, seat: Seat },
}

/// Sender half of a match's queue. Clone freely; one per connection.
#[derive(Clone)]
pub struct MatchHandle {
    tx: mpsc::Sender<MatchCommand>,
}

impl MatchHandle {
    pub async fn submit(&self, command: MatchCommand) -> Result<(), SessionError> {
        self.tx
            .send(command)
            .await
            .map_err(|_| SessionError::QueueClosed)
    }
}

/// Spawns the task owning one match's [`TurnAuthority`].
///
/// All mutation flows through the returned handle's queue and is applied by
/// this single consumer strictly in arrival order, so two concurrent peers
/// can never both observe "my turn" mid-update. Event delivery happens after
/// the state change completes and never blocks on peer acknowledgment.
pub fn spawn_match(authority: TurnAuthority, transport: Arc<dyn EventTransport>) -> MatchHandle {
    let (tx, rx) = mpsc::channel(64);
    tokio::spawn(run_match(authority, transport, rx));
    MatchHandle { tx }
}

async fn run_match(
    mut authority: TurnAuthority,
    transport: Arc<dyn EventTransport>,
    mut rx: mpsc::Receiver<MatchCommand>,
) {
    while let Some(command) = rx.recv().await {
        match command {
            MatchCommand::Seat { peer, seat } => {
                let assigned = seat_color(&authority, seat);
                log::info!("peer {} seated as {:?} playing {}", peer, seat, assigned);
                let welcome =
                    ServerMessage::welcome(seat, assigned, authority.host_color(), authority.turn());
                if let Err(e) = transport.send_to(peer, &welcome).await {
                    log::error!("failed to deliver welcome to {}: {}", peer, e);
                }
            }
            MatchCommand::Request {
                peer,
                seat,
                request,
            } => {
                handle_request(&mut authority, transport.as_ref(), peer, seat, request).await;
            }
            MatchCommand::Leave { peer, seat } => {
                // No reconnection semantics: the seat frees up at the session
                // layer and the authority simply stops receiving requests.
                log::info!("peer {} left seat {:?}", peer, seat);
            }
        }
    }
    log::info!("match queue closed, authority going idle");
}

// The assignment is derived from the authority's host color once per
// command, so a restart-with-swap is reflected on the very next request.
fn seat_color(authority: &TurnAuthority, seat: Seat) -> PlayerColor {
    ColorAssignment::new(authority.host_color()).for_seat(seat)
}

async fn handle_request(
    authority: &mut TurnAuthority,
    transport: &dyn EventTransport,
    peer: PeerId,
    seat: Seat,
    request: PlayerRequest,
) {
    let seat_color = seat_color(authority, seat);
    let outcome = match request {
        PlayerRequest::PlaceMove { x, y, color } => {
            if color != seat_color {
                log::debug!("dropping move claiming {} from the {} seat", color, seat_color);
                return;
            }
            authority.handle_move(seat_color, x, y)
        }
        PlayerRequest::PlaceTrap { x, y, color } => {
            if color != seat_color {
                log::debug!("dropping trap claiming {} from the {} seat", color, seat_color);
                return;
            }
            authority.handle_trap(seat_color, x, y)
        }
        PlayerRequest::Restart { swap_colors } => {
            if seat != Seat::Host {
                log::debug!("dropping restart from {:?}: {}", seat, SessionError::NotHost);
                return;
            }
            Ok(authority.restart(swap_colors))
        }
    };

    match outcome {
        Ok(events) => dispatch(transport, peer, events).await,
        // Silent toward the wire: the sender infers rejection from the
        // absence of a confirming event.
        Err(reject) => log::debug!("rejected {} request: {}", seat_color, reject),
    }
}

async fn dispatch(transport: &dyn EventTransport, requester: PeerId, events: Vec<Outbound>) {
    for outbound in events {
        let result = match outbound {
            Outbound::Broadcast(event) => transport.broadcast(&ServerMessage::Event(event)).await,
            Outbound::Requester(event) => {
                transport.send_to(requester, &ServerMessage::Event(event)).await
            }
        };
        if let Err(e) = result {
            log::error!("event delivery failed: {}", e);
        }
    }
}
