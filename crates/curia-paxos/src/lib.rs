//! Single-decree Paxos over a fixed council of peers.
//!
//! A council of N members agrees on exactly one value (a president's name)
//! despite concurrent proposals, delayed peers, and silent peers, as long as
//! a strict majority stays reachable. Every member plays all three roles:
//! proposer, acceptor, and learner.
//!
//! # Architecture
//!
//! - One framed message per TCP connection, no persistent channels
//! - A per-member behavior profile (immediate / delayed / silent) gates all
//!   outbound traffic, simulating network faults
//! - One listener task per member handles inbound messages serially; the
//!   election driver runs on the caller's task
//! - All protocol state sits behind a single per-member mutex
//!
//! # Modules
//!
//! - [`message`]: Wire protocol messages (Prepare, Promise, AcceptRequest, ...)
//! - [`codec`]: Length-prefixed stream framing
//! - [`transport`]: Transport abstraction (TCP and in-memory)
//! - [`behavior`]: Fault-injection profiles and the outbound gate
//! - [`state`]: The Paxos state machine proper
//! - [`election`]: Two-phase election driver
//! - [`member`]: The assembled council member and its control surface
//!
//! # Example
//!
//! ```ignore
//! use curia_paxos::{AddressBook, CouncilConfig, CouncilMember, MemberBehavior, MemberId};
//!
//! let config = CouncilConfig::new(AddressBook::localhost(9, 8001));
//! let member = CouncilMember::bind(MemberId(1), MemberBehavior::ImmediateResponse, config).await?;
//! member.listen();
//! let outcome = member.start_election("Member 1").await;
//! ```

pub mod behavior;
pub mod codec;
pub mod config;
pub mod election;
pub mod error;
pub mod member;
pub mod message;
pub mod state;
pub mod transport;
pub mod types;

pub use behavior::{GatedTransport, MemberBehavior};
pub use config::{AddressBook, ConfigError, CouncilConfig};
pub use election::{ElectionOutcome, ElectionPhase};
pub use error::{CouncilError, Result};
pub use member::CouncilMember;
pub use message::{CodecError, Message};
pub use state::{Outbound, PaxosState};
pub use transport::{create_transport_mesh, InMemoryTransport, TcpTransport, Transport};
pub use types::{MemberId, ProposalNumber};
