//! Producers of frames for the playback loop.

mod animation;
mod decoded;
mod gif;

use std::path::Path;

use anyhow::bail;

pub use self::animation::WwSource;
pub use self::decoded::{DecodedSource, FrameDecoder, QUEUE_DEPTH};
pub use self::gif::GifFrames;
use crate::media::MediaKind;
use crate::playlist::{PlayMode, PlaylistEntry};

/// The outcome of asking a source for its next frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pull {
    Frame(ww::Frame),
    /// Nothing is ready yet. The tick is skipped.
    Underrun,
    /// The source has nothing more to give.
    Exhausted,
}

pub trait AnimationSource: Send {
    fn pull(&mut self) -> anyhow::Result<Pull>;

    /// Jump to `frame`, counted from the start of the media.
    fn seek(&mut self, frame: u64) -> anyhow::Result<()> {
        _ = frame;
        bail!("this source does not support seeking")
    }
}

/// Turns playlist entries into sources.
pub trait SourceLoader: Send {
    fn open(&self, entry: &PlaylistEntry) -> anyhow::Result<Box<dyn AnimationSource>>;
}

/// Opens WW files and GIFs from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct MediaLoader {
    resize: Option<(u32, u32)>,
}

impl MediaLoader {
    /// Decoded video is scaled to `resize` when given; WW files are always played as stored.
    pub fn new(resize: Option<(u32, u32)>) -> Self {
        Self { resize }
    }
}

impl SourceLoader for MediaLoader {
    fn open(&self, entry: &PlaylistEntry) -> anyhow::Result<Box<dyn AnimationSource>> {
        let path = entry.filepath();

        match MediaKind::from_path(path) {
            Some(MediaKind::Ww) => {
                // Looping inside the file only makes sense when the entry repeats itself.
                let mode = match entry.mode() {
                    PlayMode::RepeatOne => ww::PlayMode::Loop,
                    PlayMode::Repeat | PlayMode::RepeatNone => ww::PlayMode::Hold,
                };
                Ok(Box::new(WwSource::open(path, mode)?))
            }
            Some(MediaKind::Gif) => Ok(Box::new(open_gif(path, self.resize)?)),
            None => bail!("unsupported media type: {}", path.display()),
        }
    }
}

fn open_gif(path: &Path, resize: Option<(u32, u32)>) -> anyhow::Result<DecodedSource> {
    // Surface a missing file now rather than on the first tick.
    GifFrames::open(path, resize)?;

    let name = entry_name(path);
    let path = path.to_owned();
    DecodedSource::spawn(&name, move || GifFrames::open(&path, resize))
}

fn entry_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned())
}
