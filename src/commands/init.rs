use std::fs;
use std::io::{self, Write as _};

use anyhow::{Context as _, bail};
use colored::Colorize as _;

use crate::commands::Run;
use crate::config::DEFAULT_CONFIG;
use crate::context::Context;

#[derive(Debug, Clone, Default, clap::Args)]
pub struct Init {
    /// Overwrite an existing configuration file.
    #[clap(long)]
    force: bool,
}

impl Run for Init {
    fn run(&self, ctx: &mut Context) -> anyhow::Result<()> {
        let path = &ctx.config_path;

        if path.exists() && !self.force {
            bail!("{} already exists (use --force to overwrite it)", path.display());
        }

        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        fs::write(path, DEFAULT_CONFIG)
            .with_context(|| format!("failed to write {}", path.display()))?;

        let mut stderr = io::stderr();
        writeln!(stderr, "{}", "Created configuration file:".bold().green())?;
        writeln!(stderr, "  {}", path.display())?;

        Ok(())
    }
}
