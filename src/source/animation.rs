use std::path::Path;

use anyhow::Context as _;
use ww::PlayMode;
use ww::de::Reader;

use crate::source::{AnimationSource, Pull};

/// Plays a WW file through a chunked [`Reader`].
pub struct WwSource {
    reader: Reader,
}

impl WwSource {
    pub fn open(path: &Path, mode: PlayMode) -> anyhow::Result<Self> {
        let reader = Reader::open(path, mode)
            .with_context(|| format!("failed to open animation {}", path.display()))?;

        tracing::debug!(
            frames = reader.frame_count(),
            frame_size = reader.frame_size(),
            ?mode,
            "opened {}",
            path.display()
        );

        Ok(Self { reader })
    }
}

impl AnimationSource for WwSource {
    fn pull(&mut self) -> anyhow::Result<Pull> {
        if self.reader.is_exhausted() {
            return Ok(Pull::Exhausted);
        }

        let frame = self.reader.try_next_frame()?;
        Ok(Pull::Frame(frame))
    }

    fn seek(&mut self, frame: u64) -> anyhow::Result<()> {
        Ok(self.reader.seek(frame)?)
    }
}

#[cfg(test)]
mod tests {
    use ww::Frame;
    use ww::de::Header;
    use ww::ser::Writer;

    use super::*;

    fn animation(frames: u8) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut writer = Writer::new(file.reopen().unwrap(), Header::new(30, 1, 1, 2)).unwrap();
        for i in 0..frames {
            writer.write_frame(&[i, i]).unwrap();
        }
        writer.finish().unwrap();
        file
    }

    #[test]
    fn hold_ends_after_last_frame() {
        let file = animation(2);
        let mut source = WwSource::open(file.path(), PlayMode::Hold).unwrap();

        assert_eq!(source.pull().unwrap(), Pull::Frame(Frame::from_slice(&[0, 0])));
        assert_eq!(source.pull().unwrap(), Pull::Frame(Frame::from_slice(&[1, 1])));
        assert_eq!(source.pull().unwrap(), Pull::Exhausted);
    }

    #[test]
    fn seek_jumps_to_frame() {
        let file = animation(5);
        let mut source = WwSource::open(file.path(), PlayMode::Loop).unwrap();

        source.seek(3).unwrap();
        assert_eq!(source.pull().unwrap(), Pull::Frame(Frame::from_slice(&[3, 3])));
        assert!(source.seek(5).is_err());
    }

    #[test]
    fn open_reports_path() {
        let err = WwSource::open(Path::new("/nonexistent.ww"), PlayMode::Hold)
            .err()
            .unwrap();
        assert!(format!("{err:#}").contains("/nonexistent.ww"));
    }
}
