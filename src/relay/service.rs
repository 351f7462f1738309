//! Relay event loop - owns the registry and fans out state changes
//!
//! Every transport event (connect, message, disconnect) is queued to a
//! single task and handled to completion before the next one, so the
//! registry and the connection table are never touched concurrently.
//!
//! Fan-out is fire-and-forget: each connection has an unbounded outbound
//! queue, connections whose writer is gone are skipped, and a failed send
//! is dropped. Nothing is retried and slow receivers are never evicted.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::ws::protocol::{ClientMsg, PlayerUpdate, ServerMsg};

use super::identity::IdGenerator;
use super::registry::{PlayerRecord, PlayerRegistry};
use super::PlayerId;

/// Queue of messages waiting to be written to one connection
pub type Outbound = mpsc::UnboundedSender<ServerMsg>;

/// Capacity of the relay's inbound event queue
const EVENT_QUEUE_CAPACITY: usize = 256;

/// Transport events fed to the relay
#[derive(Debug)]
pub enum RelayEvent {
    /// A connection finished its handshake
    Connect {
        outbound: Outbound,
        reply: oneshot::Sender<PlayerId>,
    },
    /// A decoded message from an open connection
    Message { player_id: PlayerId, msg: ClientMsg },
    /// A connection closed or errored
    Disconnect { player_id: PlayerId },
}

/// Relay errors
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Relay task is not running")]
    Stopped,
}

/// Cloneable handle used by connection handlers to talk to the relay
#[derive(Clone)]
pub struct RelayHandle {
    event_tx: mpsc::Sender<RelayEvent>,
    player_count: Arc<AtomicUsize>,
}

impl RelayHandle {
    /// Register a new connection; resolves to its assigned id once the
    /// `init` message has been queued on `outbound`.
    pub async fn connect(&self, outbound: Outbound) -> Result<PlayerId, RelayError> {
        let (reply, reply_rx) = oneshot::channel();
        self.event_tx
            .send(RelayEvent::Connect { outbound, reply })
            .await
            .map_err(|_| RelayError::Stopped)?;
        reply_rx.await.map_err(|_| RelayError::Stopped)
    }

    pub async fn message(&self, player_id: PlayerId, msg: ClientMsg) -> Result<(), RelayError> {
        self.event_tx
            .send(RelayEvent::Message { player_id, msg })
            .await
            .map_err(|_| RelayError::Stopped)
    }

    pub async fn disconnect(&self, player_id: PlayerId) -> Result<(), RelayError> {
        self.event_tx
            .send(RelayEvent::Disconnect { player_id })
            .await
            .map_err(|_| RelayError::Stopped)
    }

    /// Number of registered players
    pub fn player_count(&self) -> usize {
        self.player_count.load(Ordering::Relaxed)
    }
}

/// The relay itself (owned by the relay task)
pub struct Relay {
    registry: PlayerRegistry,
    peers: HashMap<PlayerId, Outbound>,
    ids: IdGenerator,
    event_rx: mpsc::Receiver<RelayEvent>,
    player_count: Arc<AtomicUsize>,
}

impl Relay {
    pub fn new(ids: IdGenerator) -> (Self, RelayHandle) {
        let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let player_count = Arc::new(AtomicUsize::new(0));

        let handle = RelayHandle {
            event_tx,
            player_count: player_count.clone(),
        };

        let relay = Self {
            registry: PlayerRegistry::new(),
            peers: HashMap::new(),
            ids,
            event_rx,
            player_count,
        };

        (relay, handle)
    }

    /// Process events until every handle has been dropped
    pub async fn run(mut self) {
        info!("Relay started");

        while let Some(event) = self.event_rx.recv().await {
            self.handle_event(event);
        }

        info!(players = self.registry.len(), "Relay stopped");
    }

    fn handle_event(&mut self, event: RelayEvent) {
        match event {
            RelayEvent::Connect { outbound, reply } => {
                let player_id = self.handle_connect(outbound);
                if reply.send(player_id.clone()).is_err() {
                    // handler went away before learning its id
                    self.handle_disconnect(&player_id);
                }
            }
            RelayEvent::Message { player_id, msg } => self.handle_message(&player_id, msg),
            RelayEvent::Disconnect { player_id } => self.handle_disconnect(&player_id),
        }
    }

    /// Register a connection, reply `init` to it and announce it to the rest
    pub fn handle_connect(&mut self, outbound: Outbound) -> PlayerId {
        let player_id = self.ids.next_id();
        let record = PlayerRecord::new(player_id.clone(), self.ids.next_color().to_string());

        let init = ServerMsg::Init {
            player: record.clone(),
            players: self.registry.snapshot(),
        };
        if outbound.send(init).is_err() {
            debug!(player_id = %player_id, "Init dropped, connection already gone");
        }

        if let Some(prev) = self.registry.register(record.clone()) {
            warn!(player_id = %prev.id, "Player id reused, previous record replaced");
        }
        self.peers.insert(player_id.clone(), outbound);
        self.sync_count();

        let delivered = self.fan_out(Some(&player_id), &ServerMsg::PlayerJoin { player: record });
        info!(
            player_id = %player_id,
            players = self.registry.len(),
            delivered,
            "Player joined"
        );

        player_id
    }

    pub fn handle_message(&mut self, player_id: &PlayerId, msg: ClientMsg) {
        match msg {
            ClientMsg::Update(update) => self.handle_update(player_id, &update),
            ClientMsg::Unknown => {
                debug!(player_id = %player_id, "Ignoring unknown message type");
            }
        }
    }

    fn handle_update(&mut self, player_id: &PlayerId, update: &PlayerUpdate) {
        let Some(record) = self.registry.update(player_id, update) else {
            debug!(player_id = %player_id, "Update for unregistered player dropped");
            return;
        };

        let msg = ServerMsg::PlayerUpdate {
            player: record.clone(),
        };
        self.fan_out(Some(player_id), &msg);
    }

    /// Forget a connection and tell everyone left
    pub fn handle_disconnect(&mut self, player_id: &PlayerId) {
        self.peers.remove(player_id);
        if self.registry.remove(player_id).is_none() {
            debug!(player_id = %player_id, "Disconnect for unregistered player");
            return;
        }
        self.sync_count();

        let delivered = self.fan_out(
            None,
            &ServerMsg::PlayerLeave {
                player_id: player_id.clone(),
            },
        );
        info!(
            player_id = %player_id,
            players = self.registry.len(),
            delivered,
            "Player left"
        );
    }

    /// Queue `msg` on every open connection except `except`.
    /// Returns how many connections it was queued on.
    fn fan_out(&self, except: Option<&PlayerId>, msg: &ServerMsg) -> usize {
        let mut delivered = 0;

        for (id, outbound) in &self.peers {
            if Some(id) == except || outbound.is_closed() {
                continue;
            }
            match outbound.send(msg.clone()) {
                Ok(()) => delivered += 1,
                Err(_) => debug!(player_id = %id, "Send to closed connection dropped"),
            }
        }

        delivered
    }

    fn sync_count(&self) {
        self.player_count.store(self.registry.len(), Ordering::Relaxed);
    }

    pub fn registry(&self) -> &PlayerRegistry {
        &self.registry
    }
}
