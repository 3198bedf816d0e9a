//! Council configuration: address book and protocol timing.
//!
//! Tunable parameters for phase timeouts, tally polling, and the simulated
//! send delays applied by the behavior gate.

use crate::types::MemberId;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Duration;

/// Static mapping from member id to network endpoint.
///
/// Every peer holds the same mapping, covering all N members including
/// itself. Supplied at construction and never changed afterwards.
#[derive(Debug, Clone, Default)]
pub struct AddressBook {
    entries: BTreeMap<MemberId, SocketAddr>,
}

impl AddressBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// An address book of `count` members on 127.0.0.1, member `i` listening
    /// on `base_port + i - 1`.
    pub fn localhost(count: u32, base_port: u16) -> Self {
        let mut book = Self::new();
        for i in 1..=count {
            let port = base_port + (i as u16) - 1;
            book.insert(MemberId(i), SocketAddr::from(([127, 0, 0, 1], port)));
        }
        book
    }

    pub fn insert(&mut self, id: MemberId, addr: SocketAddr) {
        self.entries.insert(id, addr);
    }

    pub fn addr(&self, id: MemberId) -> Option<SocketAddr> {
        self.entries.get(&id).copied()
    }

    pub fn contains(&self, id: MemberId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All member ids, in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = MemberId> + '_ {
        self.entries.keys().copied()
    }

    /// All member ids except `id`, in ascending order.
    pub fn peers_of(&self, id: MemberId) -> Vec<MemberId> {
        self.ids().filter(|peer| *peer != id).collect()
    }
}

/// Council configuration.
#[derive(Debug, Clone)]
pub struct CouncilConfig {
    /// Endpoints of every council member, including the local one.
    pub address_book: AddressBook,

    /// How long a proposer waits for a majority in each phase.
    /// Must stay well above `large_delay` so slow-but-present peers are
    /// counted. Default: 10s
    pub phase_timeout: Duration,

    /// Granularity at which the election driver re-checks its tallies.
    /// Default: 100ms
    pub poll_interval: Duration,

    /// Outbound delay applied by the `SmallDelay` behavior profile.
    /// Default: 1s
    pub small_delay: Duration,

    /// Outbound delay applied by the `LargeDelay` behavior profile.
    /// Default: 5s
    pub large_delay: Duration,
}

impl CouncilConfig {
    /// Create a config for the given address book with default timing.
    pub fn new(address_book: AddressBook) -> Self {
        Self {
            address_book,
            phase_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(100),
            small_delay: Duration::from_secs(1),
            large_delay: Duration::from_secs(5),
        }
    }

    /// Set the per-phase majority timeout.
    pub fn with_phase_timeout(mut self, timeout: Duration) -> Self {
        self.phase_timeout = timeout;
        self
    }

    /// Set the tally polling interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the simulated send delays for the delayed behavior profiles.
    pub fn with_delays(mut self, small: Duration, large: Duration) -> Self {
        self.small_delay = small;
        self.large_delay = large;
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.address_book.is_empty() {
            return Err(ConfigError::InvalidValue(
                "address book must not be empty".into(),
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::InvalidValue("poll_interval must be > 0".into()));
        }
        if self.poll_interval >= self.phase_timeout {
            return Err(ConfigError::InvalidValue(
                "poll_interval must be < phase_timeout".into(),
            ));
        }
        if self.small_delay > self.large_delay {
            return Err(ConfigError::InvalidValue(
                "small_delay must be <= large_delay".into(),
            ));
        }
        // Slow peers answer after large_delay; a tighter timeout would starve
        // them out of every quorum.
        if self.phase_timeout < self.large_delay * 2 {
            return Err(ConfigError::InvalidValue(
                "phase_timeout must be >= 2 * large_delay".into(),
            ));
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration value: {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = CouncilConfig::new(AddressBook::localhost(9, 8001));
        assert!(config.validate().is_ok());
        assert_eq!(config.phase_timeout, Duration::from_secs(10));
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert_eq!(config.small_delay, Duration::from_secs(1));
        assert_eq!(config.large_delay, Duration::from_secs(5));
    }

    #[test]
    fn test_localhost_book_ports() {
        let book = AddressBook::localhost(9, 8001);
        assert_eq!(book.len(), 9);
        assert_eq!(
            book.addr(MemberId(1)),
            Some(SocketAddr::from(([127, 0, 0, 1], 8001)))
        );
        assert_eq!(
            book.addr(MemberId(9)),
            Some(SocketAddr::from(([127, 0, 0, 1], 8009)))
        );
        assert_eq!(book.peers_of(MemberId(5)).len(), 8);
        assert!(!book.peers_of(MemberId(5)).contains(&MemberId(5)));
    }

    #[test]
    fn test_empty_book_rejected() {
        let config = CouncilConfig::new(AddressBook::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_timeout_must_cover_large_delay_twice() {
        let config = CouncilConfig::new(AddressBook::localhost(3, 9001))
            .with_phase_timeout(Duration::from_secs(8));
        assert!(config.validate().is_err());

        let config = CouncilConfig::new(AddressBook::localhost(3, 9001))
            .with_phase_timeout(Duration::from_secs(8))
            .with_delays(Duration::from_secs(1), Duration::from_secs(4));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_poll_interval_bounds() {
        let config = CouncilConfig::new(AddressBook::localhost(3, 9001))
            .with_poll_interval(Duration::ZERO);
        assert!(config.validate().is_err());

        let config = CouncilConfig::new(AddressBook::localhost(3, 9001))
            .with_delays(Duration::ZERO, Duration::ZERO)
            .with_phase_timeout(Duration::from_millis(50))
            .with_poll_interval(Duration::from_millis(100));
        assert!(config.validate().is_err());
    }
}
