//! Streaming ACN (ANSI E1.31) data packets and a UDP sender.

use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use crate::device::TransportError;

pub const ACN_SDT_MULTICAST_PORT: u16 = 5568;
pub const DEFAULT_PRIORITY: u8 = 100;
pub const MAX_SLOTS: usize = 512;

const PREAMBLE_SIZE: u16 = 0x0010;
const ACN_PACKET_IDENTIFIER: [u8; 12] = *b"ASC-E1.17\0\0\0";
const VECTOR_ROOT_E131_DATA: u32 = 0x0000_0004;
const VECTOR_E131_DATA_PACKET: u32 = 0x0000_0002;
const VECTOR_DMP_SET_PROPERTY: u8 = 0x02;
const DMP_ADDRESS_AND_DATA_TYPE: u8 = 0xA1;
const SOURCE_NAME_LEN: usize = 64;
const DMX_START_CODE: u8 = 0x00;

/// Offset of the first DMX slot in a data packet.
pub const DATA_OFFSET: usize = 126;

const ROOT_LAYER_OFFSET: usize = 16;
const FRAMING_LAYER_OFFSET: usize = 38;
const DMP_LAYER_OFFSET: usize = 115;

pub const OPTION_STREAM_TERMINATED: u8 = 0x40;

/// Number of stream-terminated packets sent when a universe is released.
const TERMINATION_PACKETS: usize = 3;

/// A single E1.31 data packet. Slots beyond [`MAX_SLOTS`] are dropped on encode.
#[derive(Debug, Clone)]
pub struct DataPacket<'a> {
    pub cid: [u8; 16],
    pub source_name: &'a str,
    pub priority: u8,
    pub sequence: u8,
    pub options: u8,
    pub universe: u16,
    pub data: &'a [u8],
}

impl DataPacket<'_> {
    pub fn encode(&self) -> Vec<u8> {
        let slots = &self.data[..self.data.len().min(MAX_SLOTS)];
        let len = DATA_OFFSET + slots.len();

        let mut packet = Vec::with_capacity(len);

        // Root layer
        packet.extend(PREAMBLE_SIZE.to_be_bytes());
        packet.extend(0u16.to_be_bytes()); // postamble size
        packet.extend(ACN_PACKET_IDENTIFIER);
        packet.extend(flags_and_length(len - ROOT_LAYER_OFFSET));
        packet.extend(VECTOR_ROOT_E131_DATA.to_be_bytes());
        packet.extend(self.cid);

        // Framing layer
        packet.extend(flags_and_length(len - FRAMING_LAYER_OFFSET));
        packet.extend(VECTOR_E131_DATA_PACKET.to_be_bytes());
        packet.extend(source_name(self.source_name));
        packet.push(self.priority);
        packet.extend(0u16.to_be_bytes()); // synchronization address
        packet.push(self.sequence);
        packet.push(self.options);
        packet.extend(self.universe.to_be_bytes());

        // DMP layer
        packet.extend(flags_and_length(len - DMP_LAYER_OFFSET));
        packet.push(VECTOR_DMP_SET_PROPERTY);
        packet.push(DMP_ADDRESS_AND_DATA_TYPE);
        packet.extend(0u16.to_be_bytes()); // first property address
        packet.extend(1u16.to_be_bytes()); // address increment
        packet.extend(property_count(slots.len()).to_be_bytes());
        packet.push(DMX_START_CODE);
        packet.extend(slots);

        packet
    }
}

fn flags_and_length(len: usize) -> [u8; 2] {
    let len = u16::try_from(len).unwrap_or(u16::MAX) & 0x0FFF;
    (0x7000 | len).to_be_bytes()
}

fn property_count(slots: usize) -> u16 {
    u16::try_from(slots + 1).unwrap_or(u16::MAX)
}

/// Null-padded, always leaving room for a terminating null.
fn source_name(name: &str) -> [u8; SOURCE_NAME_LEN] {
    let mut field = [0; SOURCE_NAME_LEN];
    let mut end = name.len().min(SOURCE_NAME_LEN - 1);
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    field[..end].copy_from_slice(&name.as_bytes()[..end]);
    field
}

/// The multicast group a universe is published on.
pub fn multicast_address(universe: u16) -> Ipv4Addr {
    let [hi, lo] = universe.to_be_bytes();
    Ipv4Addr::new(239, 255, hi, lo)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Multicast,
    Unicast(SocketAddr),
}

#[derive(Debug, Default)]
struct Output {
    sequence: u8,
    /// The slots last sent, repeated by [`Sender::refresh`] while nothing new arrives.
    slots: Vec<u8>,
    sent_at: Option<Instant>,
}

/// Sends DMX data for a set of active universes.
///
/// Universes must be activated before data is sent on them. Dropping the sender, or calling
/// [`Sender::terminate`], tells receivers the streams have ended.
#[derive(Debug)]
pub struct Sender {
    socket: UdpSocket,
    cid: [u8; 16],
    source_name: String,
    priority: u8,
    destination: Destination,
    outputs: BTreeMap<u16, Output>,
}

impl Sender {
    pub fn bind(
        bind: SocketAddr,
        source_name: impl Into<String>,
        priority: u8,
        destination: Destination,
    ) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(bind)?;
        debug!("bound sACN socket to {}", socket.local_addr()?);

        Ok(Self {
            socket,
            cid: rand::random(),
            source_name: source_name.into(),
            priority,
            destination,
            outputs: BTreeMap::new(),
        })
    }

    pub fn activate(&mut self, universe: u16) {
        if self.outputs.insert(universe, Output::default()).is_none() {
            debug!("activated universe {universe}");
        }
    }

    pub fn active_universes(&self) -> impl Iterator<Item = u16> + '_ {
        self.outputs.keys().copied()
    }

    /// Send one packet of DMX data on an active universe.
    ///
    /// The data becomes the universe's current level and is kept alive by [`Sender::refresh`].
    pub fn send(&mut self, universe: u16, data: &[u8]) -> Result<(), TransportError> {
        self.send_with_options(universe, data, 0)?;

        if let Some(output) = self.outputs.get_mut(&universe) {
            output.slots.clear();
            output.slots.extend_from_slice(data);
            output.sent_at = Some(Instant::now());
        }

        Ok(())
    }

    /// Re-send the current data of every universe that has been quiet for at least `max_age`.
    ///
    /// Receivers drop a stream that stays silent for 2.5 s, so a held look must be repeated.
    /// Universes that never carried data are skipped. Returns how many packets went out.
    pub fn refresh(&mut self, max_age: Duration) -> Result<usize, TransportError> {
        let stale = self
            .outputs
            .iter()
            .filter(|(_, output)| output.sent_at.is_some_and(|at| at.elapsed() >= max_age))
            .map(|(&universe, _)| universe)
            .collect::<Vec<_>>();

        for &universe in &stale {
            let slots = self
                .outputs
                .get(&universe)
                .map(|output| output.slots.clone())
                .unwrap_or_default();

            let sent = self.send(universe, &slots);
            trace!("refreshed universe {universe}");
            sent?;
        }

        Ok(stale.len())
    }

    fn send_with_options(
        &mut self,
        universe: u16,
        data: &[u8],
        options: u8,
    ) -> Result<(), TransportError> {
        let target = self.target(universe);
        let output = self
            .outputs
            .get_mut(&universe)
            .ok_or(TransportError::InactiveUniverse(universe))?;

        let packet = DataPacket {
            cid: self.cid,
            source_name: &self.source_name,
            priority: self.priority,
            sequence: output.sequence,
            options,
            universe,
            data,
        }
        .encode();
        output.sequence = output.sequence.wrapping_add(1);

        trace!("sending {} bytes to {target} for universe {universe}", packet.len());
        self.socket.send_to(&packet, target)?;

        Ok(())
    }

    /// Mark every active universe as terminated and release it.
    pub fn terminate(&mut self) {
        let universes = self.active_universes().collect::<Vec<_>>();

        for universe in universes {
            for _ in 0..TERMINATION_PACKETS {
                if let Err(err) = self.send_with_options(universe, &[], OPTION_STREAM_TERMINATED) {
                    warn!("failed to terminate universe {universe}: {err}");
                    break;
                }
            }

            self.outputs.remove(&universe);
            debug!("terminated universe {universe}");
        }
    }

    fn target(&self, universe: u16) -> SocketAddr {
        match self.destination {
            Destination::Multicast => SocketAddr::new(
                IpAddr::V4(multicast_address(universe)),
                ACN_SDT_MULTICAST_PORT,
            ),
            Destination::Unicast(address) => address,
        }
    }
}

impl Drop for Sender {
    fn drop(&mut self) {
        self.terminate();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn packet<'a>(data: &'a [u8], sequence: u8, options: u8) -> DataPacket<'a> {
        DataPacket {
            cid: [0xCC; 16],
            source_name: "ww-player",
            priority: DEFAULT_PRIORITY,
            sequence,
            options,
            universe: 0x0102,
            data,
        }
    }

    #[test]
    fn data_packet_layout() {
        let data = [7u8; 510];
        let bytes = packet(&data, 9, 0).encode();

        assert_eq!(bytes.len(), DATA_OFFSET + 510);
        assert_eq!(bytes[..2], [0x00, 0x10]);
        assert_eq!(bytes[4..16], ACN_PACKET_IDENTIFIER);

        let pdu_length = |offset: usize| u16::from_be_bytes([bytes[offset], bytes[offset + 1]]);
        assert_eq!(pdu_length(16), 0x7000 | (636 - 16));
        assert_eq!(pdu_length(38), 0x7000 | (636 - 38));
        assert_eq!(pdu_length(115), 0x7000 | (636 - 115));

        assert_eq!(bytes[18..22], [0, 0, 0, 4]);
        assert_eq!(bytes[22..38], [0xCC; 16]);
        assert_eq!(bytes[40..44], [0, 0, 0, 2]);
        assert_eq!(&bytes[44..53], b"ww-player");
        assert!(bytes[53..108].iter().all(|&b| b == 0));
        assert_eq!(bytes[108], DEFAULT_PRIORITY);
        assert_eq!(bytes[111], 9);
        assert_eq!(bytes[112], 0);
        assert_eq!(bytes[113..115], [0x01, 0x02]);
        assert_eq!(bytes[117..119], [0x02, 0xA1]);
        assert_eq!(bytes[119..123], [0, 0, 0, 1]);
        assert_eq!(u16::from_be_bytes([bytes[123], bytes[124]]), 511);
        assert_eq!(bytes[125], 0);
        assert_eq!(bytes[126..], data);
    }

    #[test]
    fn long_source_name_is_truncated() {
        let name = "x".repeat(100);
        let field = source_name(&name);

        assert_eq!(field[62], b'x');
        assert_eq!(field[63], 0);
    }

    #[test]
    fn oversized_data_is_truncated() {
        let data = [1u8; 600];
        assert_eq!(packet(&data, 0, 0).encode().len(), DATA_OFFSET + MAX_SLOTS);
    }

    #[test]
    fn multicast_groups() {
        assert_eq!(multicast_address(1), Ipv4Addr::new(239, 255, 0, 1));
        assert_eq!(multicast_address(0x0203), Ipv4Addr::new(239, 255, 2, 3));
    }

    fn receiver() -> UdpSocket {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        socket
    }

    fn sender(receiver: &UdpSocket) -> Sender {
        let destination = Destination::Unicast(receiver.local_addr().unwrap());
        Sender::bind("127.0.0.1:0".parse().unwrap(), "test", 150, destination).unwrap()
    }

    #[test]
    fn inactive_universe_is_rejected() {
        let receiver = receiver();
        let mut sender = sender(&receiver);

        let err = sender.send(4, &[0; 3]).unwrap_err();
        assert!(matches!(err, TransportError::InactiveUniverse(4)));
    }

    #[test]
    fn sequence_increments_per_universe() {
        let receiver = receiver();
        let mut sender = sender(&receiver);
        sender.activate(1);

        let mut buffer = [0u8; 1024];
        for expected in 0..3u8 {
            sender.send(1, &[1, 2, 3]).unwrap();
            let len = receiver.recv(&mut buffer).unwrap();

            assert_eq!(len, DATA_OFFSET + 3);
            assert_eq!(buffer[108], 150);
            assert_eq!(buffer[111], expected);
            assert_eq!(buffer[126..129], [1, 2, 3]);
        }
    }

    #[test]
    fn refresh_repeats_the_held_level() {
        let receiver = receiver();
        let mut sender = sender(&receiver);
        sender.activate(1);
        sender.activate(2);

        sender.send(1, &[4, 5, 6]).unwrap();
        let mut buffer = [0u8; 1024];
        receiver.recv(&mut buffer).unwrap();

        assert_eq!(sender.refresh(Duration::from_secs(60)).unwrap(), 0);
        assert_eq!(sender.refresh(Duration::ZERO).unwrap(), 1);

        let len = receiver.recv(&mut buffer).unwrap();
        assert_eq!(len, DATA_OFFSET + 3);
        assert_eq!(buffer[111], 1);
        assert_eq!(buffer[113..115], [0, 1]);
        assert_eq!(buffer[126..129], [4, 5, 6]);

        // The refreshed data is kept for the next round.
        assert_eq!(sender.refresh(Duration::ZERO).unwrap(), 1);
        let len = receiver.recv(&mut buffer).unwrap();
        assert_eq!(buffer[126..len], [4, 5, 6]);
    }

    #[test]
    fn drop_terminates_streams() {
        let receiver = receiver();
        let mut sender = sender(&receiver);
        sender.activate(2);
        drop(sender);

        let mut buffer = [0u8; 1024];
        for _ in 0..TERMINATION_PACKETS {
            receiver.recv(&mut buffer).unwrap();
            assert_eq!(buffer[112], OPTION_STREAM_TERMINATED);
            assert_eq!(buffer[113..115], [0, 2]);
        }
    }
}
