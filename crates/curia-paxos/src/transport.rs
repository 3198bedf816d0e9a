//! Transport abstraction for council communication.
//!
//! Defines the `Transport` trait for pluggable transport implementations:
//! - TCP transport for real councils (one fresh connection per message)
//! - In-memory channels for unit testing
//!
//! There are no persistent channels: every outbound message dials the target,
//! writes a single framed message, and closes. A failed dial is equivalent to
//! message loss.

use crate::codec;
use crate::config::AddressBook;
use crate::error::CouncilError;
use crate::message::Message;
use crate::types::MemberId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::mpsc;

/// Transport abstraction for sending one council message to one peer.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Send a message to the target member.
    async fn send(&self, target: MemberId, msg: Message) -> Result<(), CouncilError>;
}

/// Send a message, logging and swallowing any failure.
///
/// Transport failures are indistinguishable from network loss; the protocol
/// proceeds using the peers that did answer.
pub(crate) async fn send_or_log(
    transport: &dyn Transport,
    local: MemberId,
    target: MemberId,
    msg: Message,
) {
    let kind = msg.kind();
    if let Err(e) = transport.send(target, msg).await {
        tracing::debug!(member = %local, peer = %target, kind, error = %e, "send failed, treating as message loss");
    }
}

/// TCP transport dialing a fresh connection per message.
pub struct TcpTransport {
    book: AddressBook,
}

impl TcpTransport {
    pub fn new(book: AddressBook) -> Self {
        Self { book }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn send(&self, target: MemberId, msg: Message) -> Result<(), CouncilError> {
        let addr = self
            .book
            .addr(target)
            .ok_or(CouncilError::UnknownPeer { peer: target })?;

        let mut stream = TcpStream::connect(addr)
            .await
            .map_err(|source| CouncilError::Connect {
                peer: target,
                source,
            })?;

        codec::write_message(&mut stream, &msg).await?;
        Ok(())
    }
}

/// In-memory transport for testing.
///
/// Uses tokio channels to simulate the network without actual I/O. Useful
/// for unit tests of the state machine wiring and for gate tests with
/// controlled timing.
pub struct InMemoryTransport {
    local: MemberId,

    /// Channels to other members (id → sender)
    peers: Arc<parking_lot::RwLock<HashMap<MemberId, mpsc::Sender<(MemberId, Message)>>>>,

    /// Receiver for incoming messages
    rx: Arc<tokio::sync::Mutex<mpsc::Receiver<(MemberId, Message)>>>,
}

impl InMemoryTransport {
    /// Create a new in-memory transport.
    ///
    /// Returns the transport and a sender that can be handed to other
    /// transports via [`InMemoryTransport::add_peer`].
    pub fn new(local: MemberId) -> (Self, mpsc::Sender<(MemberId, Message)>) {
        let (tx, rx) = mpsc::channel(100);

        let transport = Self {
            local,
            peers: Arc::new(parking_lot::RwLock::new(HashMap::new())),
            rx: Arc::new(tokio::sync::Mutex::new(rx)),
        };

        (transport, tx)
    }

    /// Add a peer's sender to this transport.
    pub fn add_peer(&self, id: MemberId, sender: mpsc::Sender<(MemberId, Message)>) {
        self.peers.write().insert(id, sender);
    }

    /// Remove a peer from this transport.
    pub fn remove_peer(&self, id: MemberId) {
        self.peers.write().remove(&id);
    }

    /// Receive the next inbound message, with its sender.
    pub async fn recv(&self) -> Option<(MemberId, Message)> {
        let mut rx = self.rx.lock().await;
        rx.recv().await
    }

    pub fn local_id(&self) -> MemberId {
        self.local
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn send(&self, target: MemberId, msg: Message) -> Result<(), CouncilError> {
        let sender = {
            let peers = self.peers.read();
            peers.get(&target).cloned()
        };

        match sender {
            Some(tx) => tx
                .send((self.local, msg))
                .await
                .map_err(|_| CouncilError::Connect {
                    peer: target,
                    source: std::io::Error::new(
                        std::io::ErrorKind::BrokenPipe,
                        "peer channel closed",
                    ),
                }),
            None => Err(CouncilError::UnknownPeer { peer: target }),
        }
    }
}

/// Create a mesh of connected in-memory transports, one per member id.
pub fn create_transport_mesh(ids: &[MemberId]) -> HashMap<MemberId, Arc<InMemoryTransport>> {
    let mut transports = HashMap::new();
    let mut senders = HashMap::new();

    for id in ids {
        let (transport, sender) = InMemoryTransport::new(*id);
        transports.insert(*id, Arc::new(transport));
        senders.insert(*id, sender);
    }

    for id in ids {
        if let Some(transport) = transports.get(id) {
            for (peer, sender) in &senders {
                if peer != id {
                    transport.add_peer(*peer, sender.clone());
                }
            }
        }
    }

    transports
}
