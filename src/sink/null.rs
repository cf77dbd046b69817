use tracing::trace;
use ww::Frame;

use crate::brightness::Brightness;
use crate::device::TransportError;
use crate::sink::FrameSink;

/// Discards frames. Used when no hardware is attached.
#[derive(Debug, Default)]
pub struct NullSink {
    brightness: Brightness,
    frames: u64,
}

impl NullSink {
    pub fn new(brightness: Brightness) -> Self {
        Self {
            brightness,
            frames: 0,
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl FrameSink for NullSink {
    fn send(&mut self, frame: Frame) -> Result<(), TransportError> {
        self.frames += 1;
        trace!(frame = self.frames, "discarding {} bytes", frame.len());
        Ok(())
    }

    fn brightness(&self) -> Brightness {
        self.brightness
    }

    fn set_brightness(&mut self, brightness: Brightness) {
        self.brightness = brightness;
    }

    fn clear(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_frames() {
        let mut sink = NullSink::new(Brightness::FULL);
        sink.send(Frame::zeroed(3)).unwrap();
        sink.send(Frame::zeroed(3)).unwrap();

        assert_eq!(sink.frames(), 2);
        assert_eq!(sink.brightness(), Brightness::FULL);
    }
}
