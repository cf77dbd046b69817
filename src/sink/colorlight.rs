use tracing::trace;
use ww::Frame;

use crate::brightness::Brightness;
use crate::device::TransportError;
use crate::device::colorlight::{Encoder, Layout, MacAddress, ethernet_frame};
use crate::device::transport::EthernetTransport;
use crate::sink::FrameSink;

/// Every package goes out this many times; receivers drop packages under load.
const SEND_REPEAT: usize = 2;

/// Number of black frames pushed when clearing the panel.
const CLEAR_REPEAT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorlightSettings {
    pub source: MacAddress,
    pub destination: MacAddress,
    pub encoder: Encoder,
    pub layout: Layout,
}

/// Drives a Colorlight receiver card over raw Ethernet.
pub struct ColorlightSink<T> {
    transport: T,
    settings: ColorlightSettings,
    brightness: Brightness,
}

impl<T: EthernetTransport> ColorlightSink<T> {
    pub fn new(transport: T, settings: ColorlightSettings, brightness: Brightness) -> Self {
        Self {
            transport,
            settings,
            brightness,
        }
    }

    fn send_package(&mut self, package: &[u8]) -> Result<(), TransportError> {
        let frame = ethernet_frame(self.settings.destination, self.settings.source, package);

        for _ in 0..SEND_REPEAT {
            self.transport.send(&frame)?;
        }

        Ok(())
    }

    /// Push one frame at an explicit card brightness, without touching the stored level.
    fn display(&mut self, data: &[u8], brightness: u8) -> Result<(), TransportError> {
        let ColorlightSettings {
            encoder, layout, ..
        } = self.settings;

        self.send_package(&encoder.set_brightness(brightness))?;
        for package in encoder.rows(data, layout) {
            self.send_package(&package)?;
        }
        self.send_package(&encoder.display_frame(brightness))
    }
}

impl<T: EthernetTransport> FrameSink for ColorlightSink<T> {
    fn send(&mut self, frame: Frame) -> Result<(), TransportError> {
        trace!("displaying {} byte frame", frame.len());
        self.display(&frame, self.brightness.get())
    }

    fn brightness(&self) -> Brightness {
        self.brightness
    }

    fn set_brightness(&mut self, brightness: Brightness) {
        self.brightness = brightness;
    }

    fn clear(&mut self) -> Result<(), TransportError> {
        let black = vec![0; self.settings.layout.row_len() * usize::from(self.settings.layout.height)];

        for _ in 0..CLEAR_REPEAT {
            self.display(&black, Brightness::OFF.get())?;
        }

        Ok(())
    }
}
