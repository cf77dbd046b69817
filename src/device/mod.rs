//! Wire protocols spoken by the supported output devices.

pub mod colorlight;
pub mod dmx;
pub mod e131;
pub mod transport;

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("network interface {0:?} not found")]
    InterfaceNotFound(String),

    #[error("network interface {0:?} does not provide an Ethernet channel")]
    UnsupportedChannel(String),

    #[error("no buffer space available for the packet")]
    BufferUnavailable,

    #[error("invalid MAC address {0:?}")]
    InvalidMac(String),

    #[error("universe {0} is not active")]
    InactiveUniverse(u16),

    #[error(transparent)]
    Io(#[from] io::Error),
}
