//! Raw Ethernet output.

use std::str::FromStr;
use std::time::Duration;

use pnet_datalink::{Channel, DataLinkSender, MacAddr};
use tracing::{debug, trace};

use crate::device::TransportError;
use crate::device::colorlight::MacAddress;

/// Sends pre-built Ethernet frames, header included.
pub trait EthernetTransport: Send {
    fn send(&mut self, frame: &[u8]) -> Result<(), TransportError>;
}

/// A layer-2 socket bound to a named network interface.
pub struct Datalink {
    interface: String,
    tx: Box<dyn DataLinkSender>,
}

impl Datalink {
    const WRITE_TIMEOUT: Duration = Duration::from_millis(100);

    /// Open an Ethernet channel on `interface`.
    ///
    /// This usually requires `CAP_NET_RAW` or root.
    pub fn open(interface: &str) -> Result<Self, TransportError> {
        let network_interface = pnet_datalink::interfaces()
            .into_iter()
            .find(|candidate| candidate.name == interface)
            .ok_or_else(|| TransportError::InterfaceNotFound(interface.to_owned()))?;

        let config = pnet_datalink::Config {
            write_timeout: Some(Self::WRITE_TIMEOUT),
            ..Default::default()
        };

        match pnet_datalink::channel(&network_interface, config)? {
            Channel::Ethernet(tx, _rx) => {
                debug!("opened raw Ethernet channel on {interface}");
                Ok(Self {
                    interface: interface.to_owned(),
                    tx,
                })
            }
            _ => Err(TransportError::UnsupportedChannel(interface.to_owned())),
        }
    }
}

impl EthernetTransport for Datalink {
    fn send(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        trace!("sending {} bytes on {}", frame.len(), self.interface);

        match self.tx.send_to(frame, None) {
            Some(result) => Ok(result?),
            None => Err(TransportError::BufferUnavailable),
        }
    }
}

/// Parse a colon-separated MAC address such as `11:22:33:44:55:66`.
pub fn parse_mac(s: &str) -> Result<MacAddress, TransportError> {
    let MacAddr(a, b, c, d, e, f) =
        MacAddr::from_str(s).map_err(|_| TransportError::InvalidMac(s.to_owned()))?;
    Ok([a, b, c, d, e, f])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mac_addresses() {
        assert_eq!(
            parse_mac("11:22:33:44:55:66").unwrap(),
            [0x11, 0x22, 0x33, 0x44, 0x55, 0x66]
        );
        assert_eq!(parse_mac("aa:BB:cc:0:1:ff").unwrap(), [0xAA, 0xBB, 0xCC, 0, 1, 0xFF]);
        assert!(matches!(
            parse_mac("11:22:33"),
            Err(TransportError::InvalidMac(_))
        ));
        assert!(parse_mac("not a mac").is_err());
    }

    #[test]
    fn unknown_interface() {
        let err = Datalink::open("ww-player-missing0").err().unwrap();
        assert!(matches!(err, TransportError::InterfaceNotFound(name) if name == "ww-player-missing0"));
    }
}
