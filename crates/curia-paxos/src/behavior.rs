//! Per-member behavior profiles and the outbound gate applying them.
//!
//! Behavior profiles are deliberate fault injection for exercising the
//! protocol, not a transport feature: a delayed send blocks the task that is
//! driving it, and a dropped send vanishes silently. Inbound traffic is never
//! filtered.

use crate::error::CouncilError;
use crate::message::Message;
use crate::transport::Transport;
use crate::types::MemberId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// How a member treats its own outbound messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemberBehavior {
    /// Send without delay.
    ImmediateResponse,

    /// Pause briefly before every send.
    SmallDelay,

    /// Pause for a long time before every send.
    LargeDelay,

    /// Never send anything (simulates a silent or failed member).
    NoResponse,
}

impl fmt::Display for MemberBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberBehavior::ImmediateResponse => write!(f, "immediate-response"),
            MemberBehavior::SmallDelay => write!(f, "small-delay"),
            MemberBehavior::LargeDelay => write!(f, "large-delay"),
            MemberBehavior::NoResponse => write!(f, "no-response"),
        }
    }
}

/// Transport wrapper applying a member's behavior profile to every send.
///
/// The delay is awaited in-line, so whatever task drives the send (the
/// election driver, or the listener replying to an inbound message) is
/// blocked for its duration.
pub struct GatedTransport<T: Transport> {
    inner: Arc<T>,
    behavior: MemberBehavior,
    small_delay: Duration,
    large_delay: Duration,
}

impl<T: Transport> GatedTransport<T> {
    pub fn new(
        inner: Arc<T>,
        behavior: MemberBehavior,
        small_delay: Duration,
        large_delay: Duration,
    ) -> Self {
        Self {
            inner,
            behavior,
            small_delay,
            large_delay,
        }
    }

    pub fn behavior(&self) -> MemberBehavior {
        self.behavior
    }
}

#[async_trait]
impl<T: Transport> Transport for GatedTransport<T> {
    async fn send(&self, target: MemberId, msg: Message) -> Result<(), CouncilError> {
        match self.behavior {
            MemberBehavior::ImmediateResponse => {}
            MemberBehavior::SmallDelay => tokio::time::sleep(self.small_delay).await,
            MemberBehavior::LargeDelay => tokio::time::sleep(self.large_delay).await,
            MemberBehavior::NoResponse => {
                tracing::trace!(peer = %target, kind = msg.kind(), "dropping outbound message");
                return Ok(());
            }
        }
        self.inner.send(target, msg).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{create_transport_mesh, InMemoryTransport};
    use crate::types::ProposalNumber;
    use std::time::Instant;

    fn nack(from: u32) -> Message {
        Message::Nack {
            number: ProposalNumber(1),
            from: MemberId(from),
        }
    }

    #[tokio::test]
    async fn test_immediate_passes_through() {
        let mesh = create_transport_mesh(&[MemberId(1), MemberId(2)]);
        let t1 = mesh.get(&MemberId(1)).unwrap().clone();
        let t2 = mesh.get(&MemberId(2)).unwrap().clone();

        let gate = GatedTransport::new(
            t1,
            MemberBehavior::ImmediateResponse,
            Duration::from_millis(50),
            Duration::from_millis(200),
        );

        gate.send(MemberId(2), nack(1)).await.unwrap();
        let (from, msg) = t2.recv().await.unwrap();
        assert_eq!(from, MemberId(1));
        assert_eq!(msg, nack(1));
    }

    #[tokio::test]
    async fn test_delay_blocks_sender() {
        let mesh = create_transport_mesh(&[MemberId(1), MemberId(2)]);
        let t1 = mesh.get(&MemberId(1)).unwrap().clone();
        let t2 = mesh.get(&MemberId(2)).unwrap().clone();

        let gate = GatedTransport::new(
            t1,
            MemberBehavior::SmallDelay,
            Duration::from_millis(50),
            Duration::from_millis(200),
        );

        let start = Instant::now();
        gate.send(MemberId(2), nack(1)).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(45));

        // The message still arrives after the pause.
        let (from, _) = t2.recv().await.unwrap();
        assert_eq!(from, MemberId(1));
    }

    #[tokio::test]
    async fn test_large_delay_uses_large_duration() {
        let mesh = create_transport_mesh(&[MemberId(1), MemberId(2)]);
        let t1 = mesh.get(&MemberId(1)).unwrap().clone();

        let gate = GatedTransport::new(
            t1,
            MemberBehavior::LargeDelay,
            Duration::from_millis(10),
            Duration::from_millis(120),
        );

        let start = Instant::now();
        gate.send(MemberId(2), nack(1)).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(110));
    }

    #[tokio::test]
    async fn test_no_response_drops_silently() {
        let (transport, _sender) = InMemoryTransport::new(MemberId(1));
        // No peers registered: a real send would fail, a dropped one reports Ok.
        let gate = GatedTransport::new(
            Arc::new(transport),
            MemberBehavior::NoResponse,
            Duration::from_millis(50),
            Duration::from_millis(200),
        );

        gate.send(MemberId(2), nack(1)).await.unwrap();
    }
}
