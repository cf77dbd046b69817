use std::path::Path;
use std::sync::Arc;

use anyhow::{Context as _, ensure};
use tracing::info;

use crate::commands::{Run, shutdown_on_interrupt};
use crate::context::Context;
use crate::media::MediaDir;
use crate::player::Controller;
use crate::playlist::Playlist;
use crate::server::Server;
use crate::sink;
use crate::source::MediaLoader;

#[derive(Debug, Clone, Default, clap::Args)]
pub struct Serve {
    /// Start playing immediately, regardless of `autoplay`.
    #[clap(long)]
    play: bool,
}

impl Run for Serve {
    fn run(&self, ctx: &mut Context) -> anyhow::Result<()> {
        let config = ctx.config()?;

        let media = MediaDir::new(config.media_dir());
        ensure!(
            media.as_path().is_dir(),
            "media directory {} does not exist",
            media.as_path().display()
        );

        let playlist_path = config
            .playlist()
            .map_or_else(|| media.playlist_path(), Path::to_path_buf);
        let playlist = Playlist::load(&playlist_path, &media)?;
        info!("{} entries in {}", playlist.len(), playlist_path.display());

        let sink = sink::from_config(config.output(), config.brightness())
            .context("failed to open output")?;
        let loader = MediaLoader::new(config.output().frame_geometry());
        let controller = Arc::new(Controller::new(
            playlist,
            sink,
            Box::new(loader),
            config.fps(),
        )?);

        shutdown_on_interrupt(Arc::clone(&controller))?;

        if self.play || config.autoplay() {
            controller.play()?;
        }

        Server::new(config.server().bind(), controller).run()
    }
}
