//! Wire protocol messages for the council.
//!
//! The five message kinds of single-decree Paxos: prepare, promise,
//! accept-request, accepted, and nack. One message travels per connection;
//! framing lives in [`crate::codec`].

use crate::types::{MemberId, ProposalNumber};
use serde::{Deserialize, Serialize};

/// A protocol message exchanged between council members.
///
/// A `Promise` carries the promiser's (newly raised) promised number and the
/// value it previously accepted, if any — acceptors that have never accepted
/// anything promise with `accepted_value: None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// Phase 1a: a proposer asks acceptors to promise not to accept lower numbers.
    Prepare {
        number: ProposalNumber,
        from: MemberId,
    },

    /// Phase 1b: an acceptor commits to the proposal number, reporting any
    /// previously accepted value so the proposer can adopt it.
    Promise {
        number: ProposalNumber,
        accepted_value: Option<String>,
        from: MemberId,
    },

    /// Phase 2a: a proposer asks acceptors to accept a concrete value.
    /// Also reused to disseminate a chosen value to learners.
    AcceptRequest {
        number: ProposalNumber,
        value: String,
        from: MemberId,
    },

    /// Phase 2b: an acceptor confirms it accepted the value.
    Accepted {
        number: ProposalNumber,
        value: String,
        from: MemberId,
    },

    /// Rejection of a stale prepare or accept-request; carries the rejecting
    /// acceptor's current promised number.
    Nack {
        number: ProposalNumber,
        from: MemberId,
    },
}

impl Message {
    /// Encode the message to bytes using bincode.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        bincode::serialize(self).map_err(|e| CodecError::Encode(e.to_string()))
    }

    /// Decode a message from bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        bincode::deserialize(bytes).map_err(|e| CodecError::Decode(e.to_string()))
    }

    /// The sending member.
    pub fn sender(&self) -> MemberId {
        match self {
            Message::Prepare { from, .. }
            | Message::Promise { from, .. }
            | Message::AcceptRequest { from, .. }
            | Message::Accepted { from, .. }
            | Message::Nack { from, .. } => *from,
        }
    }

    /// The proposal number the message refers to.
    pub fn number(&self) -> ProposalNumber {
        match self {
            Message::Prepare { number, .. }
            | Message::Promise { number, .. }
            | Message::AcceptRequest { number, .. }
            | Message::Accepted { number, .. }
            | Message::Nack { number, .. } => *number,
        }
    }

    /// Short label for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Prepare { .. } => "PREPARE",
            Message::Promise { .. } => "PROMISE",
            Message::AcceptRequest { .. } => "ACCEPT_REQUEST",
            Message::Accepted { .. } => "ACCEPTED",
            Message::Nack { .. } => "NACK",
        }
    }
}

/// Message encoding/decoding and framing errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("serialization error: {0}")]
    Encode(String),

    #[error("deserialization error: {0}")]
    Decode(String),

    #[error("frame of {0} bytes exceeds the maximum message size")]
    FrameTooLarge(usize),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
