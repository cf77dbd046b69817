use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context as _, ensure};
use tracing::info;

use crate::commands::{Run, shutdown_on_interrupt};
use crate::context::Context;
use crate::player::{Controller, PlayerState};
use crate::playlist::{PlayMode, Playlist, PlaylistEntry};
use crate::sink;
use crate::source::MediaLoader;

#[derive(Debug, Clone, clap::Args)]
pub struct Play {
    /// A `.ww` or `.gif` file.
    file: PathBuf,

    /// Keep repeating until interrupted.
    #[clap(long = "loop")]
    repeat: bool,

    /// Override the configured frame rate.
    #[clap(long)]
    fps: Option<u32>,
}

impl Run for Play {
    fn run(&self, ctx: &mut Context) -> anyhow::Result<()> {
        ensure!(self.file.is_file(), "{} does not exist", self.file.display());
        let config = ctx.config()?;

        let mode = if self.repeat {
            PlayMode::RepeatOne
        } else {
            PlayMode::RepeatNone
        };
        let playlist = Playlist::new(mode, vec![PlaylistEntry::new(&self.file).with_mode(mode)]);

        let sink = sink::from_config(config.output(), config.brightness())
            .context("failed to open output")?;
        let loader = MediaLoader::new(config.output().frame_geometry());
        let fps = self.fps.unwrap_or(config.fps());
        let controller = Arc::new(Controller::new(playlist, sink, Box::new(loader), fps)?);

        shutdown_on_interrupt(Arc::clone(&controller))?;

        info!("playing {} at {fps} fps", self.file.display());
        controller.play()?;

        while controller.state() != PlayerState::Stopped {
            thread::sleep(Duration::from_millis(100));
        }

        controller.shutdown();
        Ok(())
    }
}
