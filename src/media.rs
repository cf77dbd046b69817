//! The media directory: discovering playable files and rendering their thumbnails.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, bail};
use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder as _, DynamicImage, GrayImage, ImageFormat, RgbImage, RgbaImage};
use tracing::{debug, warn};
use ww::PlayMode;
use ww::de::Reader;

use crate::playlist::{Playlist, PlaylistEntry};

pub const PLAYLIST_FILE_NAME: &str = "playlist.json";
const THUMBNAIL_SUFFIX: &str = "_thumbnail.png";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Ww,
    Gif,
}

impl MediaKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?;

        if extension.eq_ignore_ascii_case("ww") {
            Some(Self::Ww)
        } else if extension.eq_ignore_ascii_case("gif") {
            Some(Self::Gif)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct MediaDir {
    path: PathBuf,
}

impl MediaDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn as_path(&self) -> &Path {
        &self.path
    }

    /// Where the playlist lives unless configured otherwise.
    pub fn playlist_path(&self) -> PathBuf {
        self.path.join(PLAYLIST_FILE_NAME)
    }

    pub fn thumbnail_path(&self, media: &Path) -> PathBuf {
        let stem = media.file_stem().unwrap_or_default().to_string_lossy();
        self.path.join(format!("{stem}{THUMBNAIL_SUFFIX}"))
    }

    /// Every playable file in the directory, sorted by file name.
    pub fn scan(&self) -> anyhow::Result<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.path)
            .with_context(|| format!("failed to read media directory {}", self.path.display()))?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry.context("failed to read media directory entry")?.path();

            if path.is_file() && MediaKind::from_path(&path).is_some() {
                files.push(path);
            }
        }

        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        debug!("found {} media files", files.len());

        Ok(files)
    }

    /// Build a playlist of everything in the directory, rendering missing thumbnails.
    pub fn build_playlist(&self) -> anyhow::Result<Playlist> {
        let entries = self
            .scan()?
            .into_iter()
            .map(|path| {
                let thumbnail = self
                    .ensure_thumbnail(&path)
                    .inspect_err(|err| {
                        warn!("skipping thumbnail for {}: {err:#}", path.display());
                    })
                    .ok();

                PlaylistEntry::new(path).with_thumbnail(thumbnail)
            })
            .collect();

        Ok(Playlist::new(crate::playlist::PlayMode::default(), entries))
    }

    fn ensure_thumbnail(&self, media: &Path) -> anyhow::Result<PathBuf> {
        let thumbnail = self.thumbnail_path(media);

        if !thumbnail.exists() {
            render_thumbnail(media)?
                .save_with_format(&thumbnail, ImageFormat::Png)
                .with_context(|| format!("failed to write {}", thumbnail.display()))?;
            debug!("rendered {}", thumbnail.display());
        }

        Ok(thumbnail)
    }
}

/// The first frame of `media` as an image.
pub fn render_thumbnail(media: &Path) -> anyhow::Result<DynamicImage> {
    match MediaKind::from_path(media) {
        Some(MediaKind::Ww) => render_ww(media),
        Some(MediaKind::Gif) => render_gif(media),
        None => bail!("unsupported media type: {}", media.display()),
    }
}

fn render_ww(path: &Path) -> anyhow::Result<DynamicImage> {
    let mut reader = Reader::open(path, PlayMode::Hold)?;
    let header = *reader.header();
    let frame = reader.try_next_frame()?.into_vec();

    // One row per strip, one column per pixel.
    let width = u32::from(header.pixels());
    let height = u32::from(header.strips());

    let image = match header.bytes_per_pixel() {
        1 => GrayImage::from_raw(width, height, frame).map(DynamicImage::ImageLuma8),
        3 => RgbImage::from_raw(width, height, frame).map(DynamicImage::ImageRgb8),
        4 => RgbaImage::from_raw(width, height, frame).map(DynamicImage::ImageRgba8),
        other => bail!("cannot render {other} bytes per pixel"),
    };

    image.context("frame does not match header dimensions")
}

fn render_gif(path: &Path) -> anyhow::Result<DynamicImage> {
    let file = fs::File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let decoder = GifDecoder::new(std::io::BufReader::new(file))?;

    let frame = decoder
        .into_frames()
        .next()
        .context("GIF has no frames")??;

    Ok(DynamicImage::ImageRgba8(frame.into_buffer()))
}

#[cfg(test)]
mod tests {
    use image::GenericImageView as _;
    use ww::de::Header;
    use ww::ser::Writer;

    use super::*;
    use crate::playlist::PlayMode;

    fn write_ww(path: &Path, header: Header, frame: &[u8]) {
        let mut writer = Writer::new(fs::File::create(path).unwrap(), header).unwrap();
        writer.write_frame(frame).unwrap();
        writer.finish().unwrap();
    }

    #[test]
    fn recognizes_extensions() {
        assert_eq!(MediaKind::from_path(Path::new("a.ww")), Some(MediaKind::Ww));
        assert_eq!(MediaKind::from_path(Path::new("a.GIF")), Some(MediaKind::Gif));
        assert_eq!(MediaKind::from_path(Path::new("a.avi")), None);
        assert_eq!(MediaKind::from_path(Path::new("ww")), None);
    }

    #[test]
    fn scan_is_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["c.ww", "a.gif", "b.ww", "notes.txt", "playlist.json"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::create_dir(dir.path().join("d.ww")).unwrap();

        let files = MediaDir::new(dir.path()).scan().unwrap();
        let names = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect::<Vec<_>>();

        assert_eq!(names, ["a.gif", "b.ww", "c.ww"]);
    }

    #[test]
    fn missing_directory() {
        assert!(MediaDir::new("/nonexistent/media").scan().is_err());
    }

    #[test]
    fn thumbnails_follow_media_names() {
        let media = MediaDir::new("/media");
        assert_eq!(
            media.thumbnail_path(Path::new("/media/intro.ww")),
            Path::new("/media/intro_thumbnail.png")
        );
    }

    #[test]
    fn renders_ww_first_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("strip.ww");
        write_ww(&path, Header::new(30, 3, 2, 2), &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);

        let image = render_thumbnail(&path).unwrap();
        assert_eq!(image.dimensions(), (2, 2));
        assert_eq!(image.to_rgb8().get_pixel(1, 1).0, [10, 11, 12]);
    }

    #[test]
    fn skips_unrenderable_layouts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("odd.ww");
        write_ww(&path, Header::new(30, 2, 1, 1), &[0, 0]);

        assert!(render_thumbnail(&path).is_err());
    }

    #[test]
    fn builds_playlist_with_thumbnails() {
        let dir = tempfile::tempdir().unwrap();
        write_ww(&dir.path().join("b.ww"), Header::new(30, 1, 1, 1), &[200]);
        write_ww(&dir.path().join("a.ww"), Header::new(30, 2, 1, 1), &[0, 0]);

        let media = MediaDir::new(dir.path());
        let playlist_path = media.playlist_path();
        let playlist = Playlist::load(&playlist_path, &media).unwrap();

        assert_eq!(playlist.mode(), PlayMode::Repeat);
        assert_eq!(playlist.len(), 2);

        let a = playlist.get(0).unwrap();
        assert_eq!(a.name(), "a.ww");
        assert_eq!(a.thumbnail(), None);

        let b = playlist.get(1).unwrap();
        assert_eq!(b.name(), "b.ww");
        assert_eq!(b.thumbnail(), Some(dir.path().join("b_thumbnail.png").as_path()));
        assert!(dir.path().join("b_thumbnail.png").is_file());

        // The scan result was persisted.
        assert_eq!(Playlist::from_file(&playlist_path).unwrap(), playlist);
    }
}
