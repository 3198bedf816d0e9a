//! Paxos state machine for a single decree.
//!
//! One `PaxosState` per member holds the acceptor side (promised number,
//! accepted number, accepted value), the proposer side (proposal counter,
//! promise and accept tallies), and the handlers for the five message kinds.
//!
//! `handle` is a pure transition: it mutates the state and describes the
//! network effect to perform, but never touches the network itself. Callers
//! run it under the member's mutex and apply the returned effect after the
//! lock is released, which keeps handler side effects serialized without
//! holding a lock across I/O.

use crate::message::Message;
use crate::types::{MemberId, ProposalNumber};
use std::collections::HashSet;
use tracing::{debug, info};

/// Network effect produced by a state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Send one message back to a single peer.
    Reply { to: MemberId, message: Message },

    /// Send one message to every other council member.
    Broadcast { message: Message },
}

/// Per-member Paxos state (acceptor, proposer, and learner roles combined).
#[derive(Debug)]
pub struct PaxosState {
    id: MemberId,
    council_size: usize,

    /// Counter for proposals initiated by this member. Starts at 0 and is
    /// incremented before each local election, so the first proposal is n1.
    proposal_number: ProposalNumber,

    /// Highest proposal number this member has promised to. `None` until the
    /// first promise.
    promised: Option<ProposalNumber>,

    /// Highest accepted proposal and its value, if anything was accepted.
    accepted: Option<(ProposalNumber, String)>,

    /// Peers that promised this member's current proposal.
    promised_by: HashSet<MemberId>,

    /// Peers that accepted this member's current proposal.
    accepted_by: HashSet<MemberId>,
}

impl PaxosState {
    pub fn new(id: MemberId, council_size: usize) -> Self {
        Self {
            id,
            council_size,
            proposal_number: ProposalNumber::ZERO,
            promised: None,
            accepted: None,
            promised_by: HashSet::new(),
            accepted_by: HashSet::new(),
        }
    }

    /// Advance the local proposal counter and return the new number.
    pub fn next_proposal(&mut self) -> ProposalNumber {
        self.proposal_number = self.proposal_number.next();
        self.proposal_number
    }

    /// Apply one inbound message and return the effect to perform.
    pub fn handle(&mut self, msg: Message) -> Option<Outbound> {
        match msg {
            Message::Prepare { number, from } => Some(self.on_prepare(number, from)),
            Message::Promise {
                number,
                accepted_value,
                from,
            } => {
                self.on_promise(number, accepted_value, from);
                None
            }
            Message::AcceptRequest {
                number,
                value,
                from,
            } => Some(self.on_accept_request(number, value, from)),
            Message::Accepted {
                number,
                value,
                from,
            } => self.on_accepted(number, value, from),
            Message::Nack { number, from } => {
                debug!(member = %self.id, peer = %from, number = %number, "received NACK");
                None
            }
        }
    }

    fn on_prepare(&mut self, number: ProposalNumber, from: MemberId) -> Outbound {
        match self.promised {
            Some(promised) if number <= promised => {
                debug!(
                    member = %self.id, peer = %from, number = %number, promised = %promised,
                    "rejecting PREPARE, already promised"
                );
                Outbound::Reply {
                    to: from,
                    message: Message::Nack {
                        number: promised,
                        from: self.id,
                    },
                }
            }
            _ => {
                debug!(member = %self.id, peer = %from, number = %number, "promising");
                self.promised = Some(number);
                Outbound::Reply {
                    to: from,
                    message: Message::Promise {
                        number,
                        accepted_value: self.accepted.as_ref().map(|(_, v)| v.clone()),
                        from: self.id,
                    },
                }
            }
        }
    }

    fn on_promise(&mut self, number: ProposalNumber, value: Option<String>, from: MemberId) {
        self.promised_by.insert(from);
        debug!(
            member = %self.id, peer = %from,
            promises = self.promised_by.len(), council = self.council_size,
            "received PROMISE"
        );

        // Adopt the highest-numbered value any promiser already accepted; a
        // proposer is not free to push its own value past one of those.
        if let Some(value) = value {
            let newer = self.accepted.as_ref().map_or(true, |(n, _)| number > *n);
            if newer {
                self.accepted = Some((number, value));
            }
        }
    }

    fn on_accept_request(
        &mut self,
        number: ProposalNumber,
        value: String,
        from: MemberId,
    ) -> Outbound {
        match self.promised {
            Some(promised) if number < promised => {
                debug!(
                    member = %self.id, peer = %from, number = %number, promised = %promised,
                    "rejecting ACCEPT_REQUEST"
                );
                Outbound::Reply {
                    to: from,
                    message: Message::Nack {
                        number: promised,
                        from: self.id,
                    },
                }
            }
            _ => {
                debug!(member = %self.id, peer = %from, number = %number, value = %value, "accepting proposal");
                self.promised = Some(number);
                self.accepted = Some((number, value.clone()));
                Outbound::Reply {
                    to: from,
                    message: Message::Accepted {
                        number,
                        value,
                        from: self.id,
                    },
                }
            }
        }
    }

    fn on_accepted(
        &mut self,
        number: ProposalNumber,
        value: String,
        from: MemberId,
    ) -> Option<Outbound> {
        self.accepted_by.insert(from);
        debug!(
            member = %self.id, peer = %from,
            accepts = self.accepted_by.len(), council = self.council_size,
            "received ACCEPTED"
        );

        if self.accept_majority() && self.adopt_if_new(number, &value) {
            info!(member = %self.id, value = %value, "consensus reached, propagating winner");
            return Some(Outbound::Broadcast {
                message: Message::AcceptRequest {
                    number,
                    value,
                    from: self.id,
                },
            });
        }
        None
    }

    /// Adopt a chosen value locally unless it is already held.
    ///
    /// The equality guard is what keeps learner dissemination from looping:
    /// a redundant ACCEPT_REQUEST carrying the value a member already holds
    /// produces no further broadcast.
    pub fn adopt_if_new(&mut self, number: ProposalNumber, value: &str) -> bool {
        match &self.accepted {
            Some((_, held)) if held == value => false,
            _ => {
                self.accepted = Some((number, value.to_string()));
                true
            }
        }
    }

    /// Majority test with the local member implicitly counted.
    pub fn is_majority(&self, tally: usize) -> bool {
        tally + 1 > self.council_size / 2
    }

    /// Whether the promise tally has reached a majority.
    pub fn promise_majority(&self) -> bool {
        self.is_majority(self.promised_by.len())
    }

    /// Whether the accept tally has reached a majority.
    pub fn accept_majority(&self) -> bool {
        self.is_majority(self.accepted_by.len())
    }

    /// Clear all proposer and acceptor state back to initial.
    ///
    /// This forgets promises and accepted values, which is unsound between
    /// rounds of the same decree; it exists for test harnesses running
    /// disjoint scenarios on one council.
    pub fn reset(&mut self) {
        self.proposal_number = ProposalNumber::ZERO;
        self.promised = None;
        self.accepted = None;
        self.promised_by.clear();
        self.accepted_by.clear();
    }

    pub fn id(&self) -> MemberId {
        self.id
    }

    pub fn council_size(&self) -> usize {
        self.council_size
    }

    pub fn proposal_number(&self) -> ProposalNumber {
        self.proposal_number
    }

    pub fn promised_proposal_number(&self) -> Option<ProposalNumber> {
        self.promised
    }

    pub fn accepted_proposal_number(&self) -> Option<ProposalNumber> {
        self.accepted.as_ref().map(|(n, _)| *n)
    }

    pub fn accepted_value(&self) -> Option<&str> {
        self.accepted.as_ref().map(|(_, v)| v.as_str())
    }

    pub fn promised_by(&self) -> HashSet<MemberId> {
        self.promised_by.clone()
    }

    pub fn accepted_by(&self) -> HashSet<MemberId> {
        self.accepted_by.clone()
    }
}
