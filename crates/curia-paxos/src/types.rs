//! Core council types: member identifiers and proposal numbers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Council member identifier (unique across the council, stable for its lifetime).
///
/// Members are conventionally numbered 1..=N.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MemberId(pub u32);

impl MemberId {
    pub fn new(id: u32) -> Self {
        MemberId(id)
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M{}", self.0)
    }
}

/// Paxos proposal number (larger wins).
///
/// Each proposer keeps its own counter and increments it before every new
/// proposal, so numbers on the wire are always >= 1. Numbers are NOT unique
/// across proposers: two proposers' first proposals both carry n = 1 and the
/// acceptor-side comparisons arbitrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProposalNumber(pub u64);

impl ProposalNumber {
    pub const ZERO: ProposalNumber = ProposalNumber(0);

    pub fn next(self) -> ProposalNumber {
        ProposalNumber(self.0 + 1)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ProposalNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}
