use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, RecvTimeoutError};
use tracing::{debug, error, error_span, trace, warn};
use ww::Frame;

use crate::brightness::Brightness;
use crate::config::SacnConfig;
use crate::device::TransportError;
use crate::device::dmx;
use crate::device::e131::Sender;
use crate::sink::FrameSink;

/// How long a universe may stay quiet before its current level is sent again.
const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(1);

fn lock(sender: &Mutex<Sender>) -> MutexGuard<'_, Sender> {
    sender.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Streams frames as DMX over sACN, one universe per 510 bytes.
///
/// Brightness is applied to the channel values before they are sent. Only the universes
/// configured up front carry data; a background thread repeats their last level while playback
/// is paused or stopped so receivers keep holding it.
pub struct SacnSink {
    // Stopped before the sender is released.
    keep_alive: Option<KeepAlive>,
    sender: Arc<Mutex<Sender>>,
    brightness: Brightness,
    universes: u16,
    overflow_reported: bool,
}

impl SacnSink {
    pub fn open(config: &SacnConfig, brightness: Brightness) -> Result<Self, TransportError> {
        let sender = Sender::bind(
            config.bind(),
            config.source_name(),
            config.priority(),
            config.destination(),
        )?;

        Ok(Self::new(sender, config.universes(), brightness))
    }

    pub fn new(mut sender: Sender, universes: u16, brightness: Brightness) -> Self {
        for universe in 1..=universes {
            sender.activate(universe);
        }

        let sender = Arc::new(Mutex::new(sender));
        let keep_alive = KeepAlive::spawn(Arc::clone(&sender), KEEP_ALIVE_INTERVAL);

        Self {
            keep_alive,
            sender,
            brightness,
            universes,
            overflow_reported: false,
        }
    }
}

impl FrameSink for SacnSink {
    fn send(&mut self, frame: Frame) -> Result<(), TransportError> {
        let scaled = self.brightness.scale_all(&frame);
        let mut sender = lock(&self.sender);
        let mut dropped = 0;

        for universe in dmx::convert(&scaled) {
            if universe.number() > self.universes {
                dropped += 1;
                continue;
            }

            sender.send(universe.number(), universe.data())?;
        }

        if dropped > 0 && !self.overflow_reported {
            warn!(
                "{} byte frame needs {} universes but only {} are configured; dropping the rest",
                frame.len(),
                self.universes + dropped,
                self.universes
            );
            self.overflow_reported = true;
        }

        trace!("sent {} byte frame", frame.len());
        Ok(())
    }

    fn brightness(&self) -> Brightness {
        self.brightness
    }

    fn set_brightness(&mut self, brightness: Brightness) {
        self.brightness = brightness;
    }

    fn clear(&mut self) -> Result<(), TransportError> {
        let black = [0; dmx::UNIVERSE_SLOTS];
        let mut sender = lock(&self.sender);

        for universe in 1..=self.universes {
            sender.send(universe, &black)?;
        }

        Ok(())
    }

    fn close(&mut self) {
        debug!("releasing {} configured universes", self.universes);
        drop(self.keep_alive.take());
        lock(&self.sender).terminate();
    }
}

/// Repeats each universe's current level until dropped.
struct KeepAlive {
    // Dropping the sender ends the thread.
    stop: Option<channel::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl KeepAlive {
    fn spawn(sender: Arc<Mutex<Sender>>, interval: Duration) -> Option<Self> {
        let (stop, stopped) = channel::bounded::<()>(0);
        let span = error_span!("keep-alive");

        let spawned = thread::Builder::new()
            .name("sacn keep-alive".to_owned())
            .spawn(move || {
                let _guard = span.enter();

                // Waking four times per interval bounds the gap between packets.
                while let Err(RecvTimeoutError::Timeout) = stopped.recv_timeout(interval / 4) {
                    if let Err(err) = lock(&sender).refresh(interval) {
                        warn!("failed to refresh universes: {err}");
                    }
                }
            });

        match spawned {
            Ok(handle) => Some(Self {
                stop: Some(stop),
                handle: Some(handle),
            }),
            Err(err) => {
                error!("failed to start sACN keep-alive thread: {err}");
                None
            }
        }
    }
}

impl Drop for KeepAlive {
    fn drop(&mut self) {
        drop(self.stop.take());

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("sACN keep-alive thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::UdpSocket;
    use std::time::Duration;

    use super::*;
    use crate::device::e131::{DATA_OFFSET, Destination, OPTION_STREAM_TERMINATED};

    fn setup(universes: u16, brightness: u8) -> (UdpSocket, SacnSink) {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();

        let destination = Destination::Unicast(receiver.local_addr().unwrap());
        let sender = Sender::bind("127.0.0.1:0".parse().unwrap(), "test", 100, destination).unwrap();

        (receiver, SacnSink::new(sender, universes, Brightness::new(brightness)))
    }

    fn universe_of(packet: &[u8]) -> u16 {
        u16::from_be_bytes([packet[113], packet[114]])
    }

    #[test]
    fn frame_is_split_and_scaled() {
        let (receiver, mut sink) = setup(2, 128);
        sink.send(Frame::from_slice(&[255; 600])).unwrap();

        let mut buffer = [0u8; 1024];

        let len = receiver.recv(&mut buffer).unwrap();
        assert_eq!(len, DATA_OFFSET + 510);
        assert_eq!(universe_of(&buffer), 1);
        assert!(buffer[DATA_OFFSET..len].iter().all(|&b| b == 128));

        let len = receiver.recv(&mut buffer).unwrap();
        assert_eq!(len, DATA_OFFSET + 90);
        assert_eq!(universe_of(&buffer), 2);
    }

    #[test]
    fn clear_blanks_active_universes() {
        let (receiver, mut sink) = setup(2, 255);
        sink.clear().unwrap();

        let mut buffer = [0xFFu8; 1024];
        for expected in [1, 2] {
            let len = receiver.recv(&mut buffer).unwrap();
            assert_eq!(universe_of(&buffer), expected);
            assert!(buffer[DATA_OFFSET..len].iter().all(|&b| b == 0));
        }
    }

    #[test]
    fn unconfigured_universes_are_dropped() {
        let (receiver, mut sink) = setup(1, 255);
        sink.send(Frame::from_slice(&[9; 1600])).unwrap();
        sink.close();

        let mut buffer = [0u8; 1024];
        let mut data_universes = Vec::new();
        while let Ok(len) = receiver.recv(&mut buffer) {
            if buffer[112] & OPTION_STREAM_TERMINATED != 0 {
                break;
            }
            assert_eq!(len, DATA_OFFSET + 510);
            data_universes.push(universe_of(&buffer));
        }

        assert_eq!(data_universes, [1]);
    }

    #[test]
    fn held_level_is_repeated_while_idle() {
        let (receiver, mut sink) = setup(1, 255);
        sink.send(Frame::from_slice(&[42; 10])).unwrap();

        let mut buffer = [0u8; 1024];
        receiver.recv(&mut buffer).unwrap();
        assert_eq!(buffer[111], 0);

        // Nothing else is sent, as while paused; the same level must arrive again in time.
        receiver
            .set_read_timeout(Some(KEEP_ALIVE_INTERVAL * 2))
            .unwrap();
        let len = receiver.recv(&mut buffer).unwrap();

        assert_eq!(universe_of(&buffer), 1);
        assert_eq!(buffer[111], 1);
        assert_eq!(buffer[112], 0);
        assert_eq!(buffer[DATA_OFFSET..len], [42; 10]);
    }

    #[test]
    fn brightness_round_trips() {
        let (_receiver, mut sink) = setup(1, 10);
        sink.set_brightness(Brightness::new(99));
        assert_eq!(sink.brightness(), Brightness::new(99));
    }
}
