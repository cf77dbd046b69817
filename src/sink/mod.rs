//! Destinations for rendered frames.

mod colorlight;
mod null;
mod sacn;

pub use colorlight::{ColorlightSettings, ColorlightSink};
pub use null::NullSink;
pub use sacn::SacnSink;
use ww::Frame;

use crate::brightness::Brightness;
use crate::config::OutputConfig;
use crate::device::TransportError;
use crate::device::transport::Datalink;

/// Something that can display frames.
///
/// Sinks are best-effort: a failed send is reported to the caller, which decides whether to keep
/// going. Nothing is retried.
pub trait FrameSink: Send {
    fn send(&mut self, frame: Frame) -> Result<(), TransportError>;

    fn brightness(&self) -> Brightness;

    fn set_brightness(&mut self, brightness: Brightness);

    /// Blank the output.
    fn clear(&mut self) -> Result<(), TransportError>;

    /// Release the output. Called once, before the process exits.
    fn close(&mut self) {}
}

/// Open the sink described by the `[output]` configuration.
pub fn from_config(
    output: &OutputConfig,
    brightness: Brightness,
) -> anyhow::Result<Box<dyn FrameSink>> {
    let sink: Box<dyn FrameSink> = match *output {
        OutputConfig::Colorlight(ref config) => {
            let settings = config.settings()?;
            let transport = Datalink::open(config.interface())?;
            Box::new(ColorlightSink::new(transport, settings, brightness))
        }
        OutputConfig::Sacn(ref config) => Box::new(SacnSink::open(config, brightness)?),
        OutputConfig::Null => Box::new(NullSink::new(brightness)),
    };

    Ok(sink)
}
