use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::Context as _;
use image::codecs::gif::GifDecoder;
use image::imageops::{self, FilterType};
use image::{AnimationDecoder as _, DynamicImage, Frames, RgbaImage};
use ww::Frame;

use crate::source::FrameDecoder;

/// Frames of an animated GIF as packed RGB.
pub struct GifFrames {
    frames: Frames<'static>,
    resize: Option<(u32, u32)>,
}

impl GifFrames {
    pub fn open(path: &Path, resize: Option<(u32, u32)>) -> anyhow::Result<Self> {
        let file =
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        let decoder = GifDecoder::new(BufReader::new(file))
            .with_context(|| format!("failed to read GIF header from {}", path.display()))?;

        Ok(Self {
            frames: decoder.into_frames(),
            resize,
        })
    }
}

impl FrameDecoder for GifFrames {
    fn decode(&mut self) -> anyhow::Result<Option<Frame>> {
        let Some(frame) = self.frames.next() else {
            return Ok(None);
        };

        let frame = frame.context("failed to decode GIF frame")?;
        Ok(Some(Frame::from(rgb_bytes(frame.into_buffer(), self.resize))))
    }
}

/// Drop the alpha channel and optionally scale to `resize`.
pub fn rgb_bytes(image: RgbaImage, resize: Option<(u32, u32)>) -> Vec<u8> {
    let rgb = DynamicImage::ImageRgba8(image).into_rgb8();

    match resize {
        Some((width, height)) if rgb.dimensions() != (width, height) => {
            imageops::resize(&rgb, width, height, FilterType::Triangle).into_raw()
        }
        _ => rgb.into_raw(),
    }
}

#[cfg(test)]
mod tests {
    use image::codecs::gif::GifEncoder;
    use image::{Delay, Rgba};

    use super::*;

    fn write_gif(path: &Path, colors: &[[u8; 4]]) {
        let file = File::create(path).unwrap();
        let mut encoder = GifEncoder::new(file);
        let frames = colors.iter().map(|&color| {
            let buffer = RgbaImage::from_pixel(4, 2, Rgba(color));
            image::Frame::from_parts(buffer, 0, 0, Delay::from_numer_denom_ms(100, 1))
        });
        encoder.encode_frames(frames).unwrap();
    }

    #[test]
    fn decodes_every_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.gif");
        write_gif(&path, &[[255, 0, 0, 255], [0, 0, 255, 255]]);

        let mut frames = GifFrames::open(&path, None).unwrap();

        let first = frames.decode().unwrap().unwrap();
        assert_eq!(first.len(), 4 * 2 * 3);
        assert_eq!(first[..3], [255, 0, 0]);

        let second = frames.decode().unwrap().unwrap();
        assert_eq!(second[..3], [0, 0, 255]);

        assert!(frames.decode().unwrap().is_none());
    }

    #[test]
    fn resizes_to_panel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.gif");
        write_gif(&path, &[[0, 255, 0, 255]]);

        let mut frames = GifFrames::open(&path, Some((2, 1))).unwrap();
        let frame = frames.decode().unwrap().unwrap();

        assert_eq!(frame.len(), 2 * 3);
        assert_eq!(frame[..3], [0, 255, 0]);
    }

    #[test]
    fn rgb_conversion_drops_alpha() {
        let image = RgbaImage::from_pixel(1, 1, Rgba([1, 2, 3, 4]));
        assert_eq!(rgb_bytes(image, None), [1, 2, 3]);
    }
}
