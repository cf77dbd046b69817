use std::fs::File;
use std::io::{self, BufWriter, Write as _};
use std::path::{Path, PathBuf};

use anyhow::{Context as _, ensure};
use colored::Colorize as _;
use tracing::debug;
use ww::de::Header;
use ww::ser::Writer;

use crate::commands::Run;
use crate::context::Context;
use crate::source::{FrameDecoder as _, GifFrames};

#[derive(Debug, Clone, clap::Args)]
pub struct Convert {
    /// The animated GIF to encode.
    input: PathBuf,

    /// Where to write the `.ww` file.
    output: PathBuf,

    /// Pixels per strip.
    #[clap(long, default_value_t = 64)]
    width: u16,

    /// Number of strips.
    #[clap(long, default_value_t = 64)]
    height: u8,

    #[clap(long, default_value_t = 30)]
    fps: u8,
}

impl Run for Convert {
    fn run(&self, _ctx: &mut Context) -> anyhow::Result<()> {
        let frames = convert(&self.input, &self.output, self.width, self.height, self.fps)?;

        let mut stderr = io::stderr();
        writeln!(
            stderr,
            "{} {frames} frames to {}",
            "Wrote".bold().green(),
            self.output.display()
        )?;

        Ok(())
    }
}

fn convert(input: &Path, output: &Path, width: u16, height: u8, fps: u8) -> anyhow::Result<u64> {
    ensure!(width > 0 && height > 0, "width and height must be at least 1");

    let mut frames = GifFrames::open(input, Some((u32::from(width), u32::from(height))))?;

    let file = File::create(output)
        .with_context(|| format!("failed to create {}", output.display()))?;
    let mut writer = Writer::new(BufWriter::new(file), Header::new(fps, 3, height, width))?;

    while let Some(frame) = frames.decode()? {
        writer.write_frame(&frame)?;
        debug!("encoded frame {}", writer.frames_written());
    }

    let written = writer.frames_written();
    writer.finish()?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use image::codecs::gif::GifEncoder;
    use image::{Delay, Frame, Rgba, RgbaImage};
    use ww::PlayMode;
    use ww::de::Reader;

    use super::*;

    #[test]
    fn gif_becomes_ww() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.gif");
        let output = dir.path().join("out.ww");

        let mut encoder = GifEncoder::new(File::create(&input).unwrap());
        encoder
            .encode_frames((0..3).map(|_| {
                let image = RgbaImage::from_pixel(8, 8, Rgba([255, 255, 255, 255]));
                Frame::from_parts(image, 0, 0, Delay::from_numer_denom_ms(40, 1))
            }))
            .unwrap();
        drop(encoder);

        assert_eq!(convert(&input, &output, 4, 2, 25).unwrap(), 3);

        let mut reader = Reader::open(&output, PlayMode::Hold).unwrap();
        assert_eq!(*reader.header(), Header::new(25, 3, 2, 4));
        assert_eq!(reader.frame_count(), 3);
        assert!(reader.next_frame().iter().all(|&b| b == 255));
    }
}
