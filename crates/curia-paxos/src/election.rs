//! Election driver: runs Phase 1 and Phase 2 for a local proposal.
//!
//! The driver executes on the caller's task. It fans PREPARE out to every
//! other member (each send passing through the behavior gate, so a delayed
//! profile slows the fan-out itself), then polls the promise tally until a
//! majority or the phase timeout, and repeats the pattern with
//! ACCEPT_REQUEST. A timeout abandons the election; there is no retry and no
//! proposal-number catch-up.

use crate::config::CouncilConfig;
use crate::message::Message;
use crate::state::PaxosState;
use crate::transport::{send_or_log, Transport};
use crate::types::{MemberId, ProposalNumber};
use parking_lot::Mutex;
use std::fmt;
use std::time::Instant;
use tracing::{info, warn};

/// Which phase of an election failed to gather a majority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElectionPhase {
    Promise,
    Accept,
}

impl fmt::Display for ElectionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElectionPhase::Promise => write!(f, "promise"),
            ElectionPhase::Accept => write!(f, "accept"),
        }
    }
}

/// Result of driving one election.
///
/// A timeout is a normal protocol outcome, not an error: the council may
/// simply not have a reachable majority right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElectionOutcome {
    /// A majority accepted; `value` is the elected president.
    Elected { value: String },

    /// The given phase timed out short of a majority.
    TimedOut { phase: ElectionPhase },
}

impl ElectionOutcome {
    pub fn is_elected(&self) -> bool {
        matches!(self, ElectionOutcome::Elected { .. })
    }
}

pub(crate) async fn drive_election(
    id: MemberId,
    state: &Mutex<PaxosState>,
    transport: &dyn Transport,
    config: &CouncilConfig,
    proposed_value: String,
) -> ElectionOutcome {
    let number = state.lock().next_proposal();
    info!(member = %id, number = %number, value = %proposed_value, "starting election");

    let peers = config.address_book.peers_of(id);

    // Phase 1a: prepare.
    for peer in &peers {
        let msg = Message::Prepare { number, from: id };
        send_or_log(transport, id, *peer, msg).await;
    }

    // Phase 1b: wait for a majority of promises.
    if !wait_for_majority(state, config, PaxosState::promise_majority).await {
        warn!(member = %id, number = %number, "promise phase timed out, abandoning election");
        return ElectionOutcome::TimedOut {
            phase: ElectionPhase::Promise,
        };
    }
    info!(member = %id, number = %number, "received majority of promises");

    // If any promise reported a previously accepted value, that value rides
    // phase 2 instead of ours.
    let value = {
        let s = state.lock();
        s.accepted_value()
            .map(str::to_string)
            .unwrap_or(proposed_value)
    };

    // Phase 2a: accept-request.
    for peer in &peers {
        let msg = Message::AcceptRequest {
            number,
            value: value.clone(),
            from: id,
        };
        send_or_log(transport, id, *peer, msg).await;
    }

    // Phase 2b: wait for a majority of accepts.
    if !wait_for_majority(state, config, PaxosState::accept_majority).await {
        warn!(member = %id, number = %number, "accept phase timed out, abandoning election");
        return ElectionOutcome::TimedOut {
            phase: ElectionPhase::Accept,
        };
    }

    info!(member = %id, number = %number, value = %value, "election successful, president elected");
    propagate(id, state, transport, &peers, number, &value).await;

    ElectionOutcome::Elected { value }
}

/// Poll the tally until `reached` reports a majority or the phase times out.
///
/// Handlers fill the tallies concurrently on the listener task; polling is
/// safe because majority is monotone within an election.
async fn wait_for_majority(
    state: &Mutex<PaxosState>,
    config: &CouncilConfig,
    reached: fn(&PaxosState) -> bool,
) -> bool {
    let deadline = Instant::now() + config.phase_timeout;
    loop {
        if reached(&state.lock()) {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(config.poll_interval).await;
    }
}

/// Learner dissemination: push the chosen value to every other member.
///
/// Reuses ACCEPT_REQUEST so peers that missed the accept phase still adopt
/// the winner through their ordinary handler. The adopt guard keeps a value
/// the member already holds from being re-flooded; the ACCEPTED handler may
/// have adopted and broadcast first, in which case this is a no-op.
pub(crate) async fn propagate(
    id: MemberId,
    state: &Mutex<PaxosState>,
    transport: &dyn Transport,
    peers: &[MemberId],
    number: ProposalNumber,
    value: &str,
) {
    let adopted = state.lock().adopt_if_new(number, value);
    if !adopted {
        return;
    }

    for peer in peers {
        let msg = Message::AcceptRequest {
            number,
            value: value.to_string(),
            from: id,
        };
        send_or_log(transport, id, *peer, msg).await;
    }
}
