//! Council error types.

use crate::config::ConfigError;
use crate::message::CodecError;
use crate::types::MemberId;
use std::net::SocketAddr;
use thiserror::Error;

/// Council errors.
#[derive(Debug, Error)]
pub enum CouncilError {
    /// The listening endpoint could not be bound. Fatal at construction.
    #[error("failed to bind listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// A peer could not be reached. Callers treat this as message loss.
    #[error("failed to reach member {peer}: {source}")]
    Connect {
        peer: MemberId,
        source: std::io::Error,
    },

    /// The address book has no entry for the target member.
    #[error("no address book entry for member {peer}")]
    UnknownPeer { peer: MemberId },

    /// Message encoding, framing, or decoding failed.
    #[error("codec error: {source}")]
    Codec {
        #[from]
        source: CodecError,
    },

    /// Configuration rejected by validation.
    #[error("configuration error: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },
}

/// Council result type.
pub type Result<T> = std::result::Result<T, CouncilError>;
