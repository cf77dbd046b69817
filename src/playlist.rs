//! The ordered list of media the player cycles through, and its JSON file.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Context as _;
use tracing::{debug, info};

use crate::media::MediaDir;

/// What happens when an entry finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayMode {
    /// Move on to the next entry, wrapping around at the end.
    #[default]
    Repeat,

    /// Play the same entry again.
    RepeatOne,

    /// Move on to the next entry, stopping after the last one.
    RepeatNone,
}

impl PlayMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Repeat => "REPEAT",
            Self::RepeatOne => "REPEAT_ONE",
            Self::RepeatNone => "REPEAT_NONE",
        }
    }
}

impl fmt::Display for PlayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PlaylistEntry {
    name: String,
    filepath: PathBuf,

    #[serde(default)]
    thumbnail: Option<PathBuf>,

    #[serde(default)]
    mode: PlayMode,
}

impl PlaylistEntry {
    /// An entry named after the file it plays.
    pub fn new(filepath: impl Into<PathBuf>) -> Self {
        let filepath = filepath.into();
        let name = filepath.file_name().map_or_else(
            || filepath.display().to_string(),
            |name| name.to_string_lossy().into_owned(),
        );

        Self {
            name,
            filepath,
            thumbnail: None,
            mode: PlayMode::default(),
        }
    }

    #[must_use]
    pub fn with_thumbnail(self, thumbnail: Option<PathBuf>) -> Self {
        Self { thumbnail, ..self }
    }

    #[must_use]
    pub fn with_mode(self, mode: PlayMode) -> Self {
        Self { mode, ..self }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn filepath(&self) -> &Path {
        &self.filepath
    }

    pub fn thumbnail(&self) -> Option<&Path> {
        self.thumbnail.as_deref()
    }

    pub fn mode(&self) -> PlayMode {
        self.mode
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Playlist {
    #[serde(default)]
    mode: PlayMode,

    #[serde(rename = "playlist", default)]
    entries: Vec<PlaylistEntry>,
}

impl FromStr for Playlist {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(s).context("failed to parse playlist")
    }
}

impl Playlist {
    pub fn new(mode: PlayMode, entries: Vec<PlaylistEntry>) -> Self {
        Self { mode, entries }
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path).context("failed to read playlist file")?;
        contents.parse()
    }

    /// Read the playlist at `path`, or build one from `media` and save it there.
    pub fn load(path: &Path, media: &MediaDir) -> anyhow::Result<Self> {
        if path.is_file() {
            debug!("reading playlist from {}", path.display());
            return Self::from_file(path)
                .with_context(|| format!("failed to load playlist {}", path.display()));
        }

        info!(
            "no playlist at {}, scanning {}",
            path.display(),
            media.as_path().display()
        );

        let playlist = media.build_playlist()?;
        playlist.save(path)?;
        info!("saved {} entries to {}", playlist.len(), path.display());

        Ok(playlist)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let mut contents =
            serde_json::to_string_pretty(self).context("failed to serialize playlist")?;
        contents.push('\n');

        fs::write(path, contents)
            .with_context(|| format!("failed to write playlist {}", path.display()))
    }

    pub fn mode(&self) -> PlayMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: PlayMode) {
        self.mode = mode;
    }

    pub fn entries(&self) -> &[PlaylistEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&PlaylistEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
