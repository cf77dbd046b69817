mod convert;
mod init;
mod inspect;
mod play;
mod serve;

use std::process;
use std::sync::Arc;

use anyhow::Context as _;
use tracing::info;

use crate::context::Context;
use crate::player::Controller;

pub trait Run {
    fn run(&self, ctx: &mut Context) -> anyhow::Result<()>;
}

#[derive(Debug, clap::Subcommand)]
pub enum Subcommand {
    /// Write a default configuration file.
    Init(init::Init),

    /// Run the player and accept commands over TCP.
    Serve(serve::Serve),

    /// Play a single file on the configured output.
    Play(play::Play),

    /// Print the header of a `.ww` file.
    Inspect(inspect::Inspect),

    /// Encode an animated GIF as a `.ww` file.
    Convert(convert::Convert),
}

impl Subcommand {
    pub fn run(&self, ctx: &mut Context) -> anyhow::Result<()> {
        let handler: &dyn Run = match *self {
            Self::Init(ref inner) => inner,
            Self::Serve(ref inner) => inner,
            Self::Play(ref inner) => inner,
            Self::Inspect(ref inner) => inner,
            Self::Convert(ref inner) => inner,
        };

        handler.run(ctx)
    }
}

/// Blank the output and exit on Ctrl-C.
fn shutdown_on_interrupt(controller: Arc<Controller>) -> anyhow::Result<()> {
    ctrlc::set_handler(move || {
        info!("interrupted, shutting down");
        controller.shutdown();
        process::exit(0);
    })
    .context("failed to install Ctrl-C handler")
}
