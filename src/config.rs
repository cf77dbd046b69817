use std::fs;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context as _, ensure};

use crate::brightness::Brightness;
use crate::device::colorlight::{self, Encoder, Layout};
use crate::device::e131::{self, Destination};
use crate::device::transport::parse_mac;
use crate::sink::ColorlightSettings;
use crate::verbosity::VerbosityLevel;

pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Written by `ww-player init`.
pub const DEFAULT_CONFIG: &str = r#"# Directory scanned for .ww and .gif files.
media_dir = "media"

# Defaults to playlist.json inside media_dir.
# playlist = "media/playlist.json"

fps = 30
brightness = 50
autoplay = false

# One of: off, error, warn, info, debug, trace. Overridden by -v and -q.
log_level = "info"

[server]
bind = "127.0.0.1:5555"

[output]
type = "null"

# [output]
# type = "colorlight"
# interface = "eth0"
# src_mac = "22:22:33:44:55:66"
# dst_mac = "11:22:33:44:55:66"
# width = 64
# height = 64

# [output]
# type = "sacn"
# universes = 1
# unicast = "192.168.1.50:5568"
"#;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    media_dir: PathBuf,

    #[serde(default)]
    playlist: Option<PathBuf>,

    #[serde(default = "default_fps")]
    fps: u32,

    #[serde(default)]
    brightness: Brightness,

    #[serde(default)]
    autoplay: bool,

    #[serde(default)]
    log_level: Option<VerbosityLevel>,

    #[serde(default)]
    server: ServerConfig,

    #[serde(default)]
    output: OutputConfig,
}

fn default_fps() -> u32 {
    30
}

impl FromStr for Config {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: Self = toml::from_str(s).context("failed to parse configuration")?;
        ensure!(config.fps > 0, "fps must be at least 1");
        Ok(config)
    }
}

impl Config {
    /// Load a configuration file. Relative paths inside it are resolved against its directory.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path).context("failed to read configuration file")?;
        let mut config = contents.parse::<Self>()?;

        if let Some(base) = path.parent() {
            config.media_dir = base.join(&config.media_dir);
            config.playlist = config.playlist.map(|playlist| base.join(playlist));
        }

        Ok(config)
    }

    /// `<config dir>/ww-player/config.toml`, falling back to the working directory.
    pub fn default_path() -> PathBuf {
        dirs::config_dir().map_or_else(
            || PathBuf::from(CONFIG_FILE_NAME),
            |dir| dir.join(env!("CARGO_PKG_NAME")).join(CONFIG_FILE_NAME),
        )
    }

    pub fn media_dir(&self) -> &Path {
        &self.media_dir
    }

    pub fn playlist(&self) -> Option<&Path> {
        self.playlist.as_deref()
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn brightness(&self) -> Brightness {
        self.brightness
    }

    pub fn autoplay(&self) -> bool {
        self.autoplay
    }

    pub fn log_level(&self) -> Option<VerbosityLevel> {
        self.log_level
    }

    pub fn server(&self) -> &ServerConfig {
        &self.server
    }

    pub fn output(&self) -> &OutputConfig {
        &self.output
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    bind: SocketAddr,
}

fn default_bind() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, 5555))
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

impl ServerConfig {
    pub fn bind(&self) -> SocketAddr {
        self.bind
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutputConfig {
    Colorlight(ColorlightConfig),
    Sacn(SacnConfig),
    #[default]
    Null,
}

impl OutputConfig {
    /// The size decoded video should be scaled to, if the output has a fixed geometry.
    pub fn frame_geometry(&self) -> Option<(u32, u32)> {
        match *self {
            Self::Colorlight(ref config) => {
                Some((u32::from(config.width), u32::from(config.height)))
            }
            Self::Sacn(ref config) => config.width.zip(config.height),
            Self::Null => None,
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ColorlightConfig {
    interface: String,

    #[serde(default = "default_src_mac")]
    src_mac: String,

    #[serde(default = "default_dst_mac")]
    dst_mac: String,

    #[serde(default = "default_panel_size")]
    width: u16,

    #[serde(default = "default_panel_size")]
    height: u16,

    #[serde(default = "default_display_ethertype")]
    display_ethertype: u16,

    #[serde(default = "default_pixel_ethertype_base")]
    pixel_ethertype_base: u16,

    #[serde(default = "default_max_pixels_per_package")]
    max_pixels_per_package: u16,
}

fn default_src_mac() -> String {
    "22:22:33:44:55:66".to_owned()
}

fn default_dst_mac() -> String {
    "11:22:33:44:55:66".to_owned()
}

fn default_panel_size() -> u16 {
    64
}

fn default_display_ethertype() -> u16 {
    colorlight::DEFAULT_DISPLAY_ETHERTYPE
}

fn default_pixel_ethertype_base() -> u16 {
    colorlight::DEFAULT_PIXEL_ETHERTYPE_BASE
}

fn default_max_pixels_per_package() -> u16 {
    colorlight::MAX_PIXELS_PER_PACKAGE
}

impl ColorlightConfig {
    pub fn interface(&self) -> &str {
        &self.interface
    }

    pub fn settings(&self) -> anyhow::Result<ColorlightSettings> {
        ensure!(
            (1..=colorlight::MAX_PIXELS_PER_PACKAGE).contains(&self.max_pixels_per_package),
            "max_pixels_per_package must be between 1 and {}",
            colorlight::MAX_PIXELS_PER_PACKAGE
        );

        Ok(ColorlightSettings {
            source: parse_mac(&self.src_mac)?,
            destination: parse_mac(&self.dst_mac)?,
            encoder: Encoder::new(self.display_ethertype, self.pixel_ethertype_base),
            layout: Layout {
                width: self.width,
                height: self.height,
                max_pixels_per_package: self.max_pixels_per_package,
            },
        })
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct SacnConfig {
    #[serde(default = "default_sacn_bind")]
    bind: SocketAddr,

    /// Send to this address instead of the per-universe multicast groups.
    #[serde(default)]
    unicast: Option<SocketAddr>,

    #[serde(default = "default_universes")]
    universes: u16,

    #[serde(default = "default_source_name")]
    source_name: String,

    #[serde(default = "default_priority")]
    priority: u8,

    #[serde(default)]
    width: Option<u32>,

    #[serde(default)]
    height: Option<u32>,
}

fn default_sacn_bind() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
}

fn default_universes() -> u16 {
    1
}

fn default_source_name() -> String {
    env!("CARGO_PKG_NAME").to_owned()
}

fn default_priority() -> u8 {
    e131::DEFAULT_PRIORITY
}

impl SacnConfig {
    pub fn bind(&self) -> SocketAddr {
        self.bind
    }

    pub fn destination(&self) -> Destination {
        self.unicast.map_or(Destination::Multicast, Destination::Unicast)
    }

    pub fn universes(&self) -> u16 {
        self.universes
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn priority(&self) -> u8 {
        self.priority
    }
}
