//! Council member: wires the listener, state machine, behavior gate, and
//! election driver into one peer.
//!
//! Each member runs a single listener task that accepts inbound connections
//! serially: accept, read exactly one framed message, apply it to the state
//! machine, perform the resulting sends through the behavior gate, close.
//! The election driver runs on whatever task calls
//! [`CouncilMember::start_election`]; driver and listener share the state
//! through one mutex taken only for the transition itself, never across I/O.

use crate::behavior::{GatedTransport, MemberBehavior};
use crate::codec;
use crate::config::CouncilConfig;
use crate::election::{self, ElectionOutcome};
use crate::error::{CouncilError, Result};
use crate::message::Message;
use crate::state::{Outbound, PaxosState};
use crate::transport::{send_or_log, TcpTransport, Transport};
use crate::types::{MemberId, ProposalNumber};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// A council member acting as proposer, acceptor, and learner.
pub struct CouncilMember {
    id: MemberId,
    behavior: MemberBehavior,
    config: CouncilConfig,
    state: Arc<Mutex<PaxosState>>,
    transport: Arc<dyn Transport>,

    /// Listening endpoint, taken by the accept loop on `listen`.
    listener: Mutex<Option<TcpListener>>,

    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
}

impl std::fmt::Debug for CouncilMember {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CouncilMember")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("running", &self.running.load(Ordering::Relaxed))
            .finish()
    }
}

impl CouncilMember {
    /// Construct a member and bind its listening endpoint.
    ///
    /// The endpoint comes from the member's own address book entry. A bind
    /// failure is the one fatal construction error and is surfaced here.
    pub async fn bind(
        id: MemberId,
        behavior: MemberBehavior,
        config: CouncilConfig,
    ) -> Result<Self> {
        config.validate()?;
        let addr = config
            .address_book
            .addr(id)
            .ok_or(CouncilError::UnknownPeer { peer: id })?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| CouncilError::Bind { addr, source })?;

        let transport = Arc::new(GatedTransport::new(
            Arc::new(TcpTransport::new(config.address_book.clone())),
            behavior,
            config.small_delay,
            config.large_delay,
        ));

        let state = Arc::new(Mutex::new(PaxosState::new(id, config.address_book.len())));
        let (shutdown_tx, _) = broadcast::channel(4);

        info!(member = %id, %addr, %behavior, "council member bound");

        Ok(Self {
            id,
            behavior,
            config,
            state,
            transport,
            listener: Mutex::new(Some(listener)),
            running: Arc::new(AtomicBool::new(true)),
            shutdown_tx,
        })
    }

    /// Begin accepting inbound messages on a background task.
    pub fn listen(&self) {
        if !self.running.load(Ordering::SeqCst) {
            warn!(member = %self.id, "listen called on a shut-down member");
            return;
        }
        let Some(listener) = self.listener.lock().take() else {
            warn!(member = %self.id, "listener already running");
            return;
        };

        let id = self.id;
        let state = self.state.clone();
        let transport = self.transport.clone();
        let running = self.running.clone();
        let peers = self.config.address_book.peers_of(id);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    accepted = listener.accept() => match accepted {
                        Ok((mut stream, _)) => {
                            match codec::read_message(&mut stream).await {
                                Ok(msg) => {
                                    debug!(member = %id, peer = %msg.sender(), kind = msg.kind(), "received message");
                                    let outbound = { state.lock().handle(msg) };
                                    apply_outbound(transport.as_ref(), id, &peers, outbound).await;
                                }
                                // A bad frame abandons this connection only.
                                Err(e) => warn!(member = %id, error = %e, "failed to decode inbound message"),
                            }
                        }
                        Err(e) => {
                            if running.load(Ordering::SeqCst) {
                                warn!(member = %id, error = %e, "accept failed");
                            } else {
                                break;
                            }
                        }
                    }
                }
            }
            debug!(member = %id, "listener stopped");
        });
    }

    /// Drive an election proposing `value`, on the current task.
    ///
    /// Returns when the council elected a president or a phase timed out.
    pub async fn start_election(&self, value: impl Into<String>) -> ElectionOutcome {
        election::drive_election(
            self.id,
            &self.state,
            self.transport.as_ref(),
            &self.config,
            value.into(),
        )
        .await
    }

    /// Inject one message as if it had arrived over the wire.
    ///
    /// Replies and propagations go through the behavior gate and the real
    /// transport exactly as for a listened message. Intended for tests and
    /// embedding code.
    pub async fn deliver(&self, message: Message) {
        let outbound = { self.state.lock().handle(message) };
        let peers = self.config.address_book.peers_of(self.id);
        apply_outbound(self.transport.as_ref(), self.id, &peers, outbound).await;
    }

    /// Clear all proposer and acceptor state back to initial.
    ///
    /// Forgets promises and accepted values, so it must only separate
    /// disjoint scenarios, never rounds of one decree.
    pub fn reset(&self) {
        self.state.lock().reset();
        debug!(member = %self.id, "state reset");
    }

    /// Stop listening. Idempotent; in-flight outbound sends are not cancelled.
    pub fn shutdown(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            info!(member = %self.id, "shutting down");
            let _ = self.shutdown_tx.send(());
        }
    }

    pub fn id(&self) -> MemberId {
        self.id
    }

    pub fn behavior(&self) -> MemberBehavior {
        self.behavior
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn accepted_value(&self) -> Option<String> {
        self.state.lock().accepted_value().map(str::to_string)
    }

    pub fn accepted_proposal_number(&self) -> Option<ProposalNumber> {
        self.state.lock().accepted_proposal_number()
    }

    pub fn promised_proposal_number(&self) -> Option<ProposalNumber> {
        self.state.lock().promised_proposal_number()
    }

    pub fn proposal_number(&self) -> ProposalNumber {
        self.state.lock().proposal_number()
    }

    pub fn promised_by(&self) -> HashSet<MemberId> {
        self.state.lock().promised_by()
    }

    pub fn accepted_by(&self) -> HashSet<MemberId> {
        self.state.lock().accepted_by()
    }
}

/// Perform the sends a state transition asked for.
async fn apply_outbound(
    transport: &dyn Transport,
    id: MemberId,
    peers: &[MemberId],
    outbound: Option<Outbound>,
) {
    match outbound {
        Some(Outbound::Reply { to, message }) => {
            send_or_log(transport, id, to, message).await;
        }
        Some(Outbound::Broadcast { message }) => {
            for peer in peers {
                send_or_log(transport, id, *peer, message.clone()).await;
            }
        }
        None => {}
    }
}
