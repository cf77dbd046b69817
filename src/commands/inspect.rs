use std::io::{self, Write as _};
use std::path::PathBuf;

use anyhow::Context as _;
use colored::Colorize as _;
use ww::PlayMode;
use ww::de::Reader;

use crate::commands::Run;
use crate::context::Context;
use crate::verbosity::VerbosityLevel;

#[derive(Debug, Clone, clap::Args)]
pub struct Inspect {
    /// The `.ww` file to describe.
    file: PathBuf,
}

impl Run for Inspect {
    fn run(&self, ctx: &mut Context) -> anyhow::Result<()> {
        let reader = Reader::open(&self.file, PlayMode::Hold)
            .with_context(|| format!("failed to open {}", self.file.display()))?;
        let header = reader.header();

        #[expect(clippy::cast_precision_loss)]
        let duration = reader.frame_count() as f64 / f64::from(header.frame_rate().max(1));

        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{}", self.file.display().to_string().bold())?;
        writeln!(stdout, "  {:<16}{} fps", "Frame rate".cyan(), header.frame_rate())?;
        writeln!(stdout, "  {:<16}{}", "Bytes/pixel".cyan(), header.bytes_per_pixel())?;
        writeln!(stdout, "  {:<16}{}", "Strips".cyan(), header.strips())?;
        writeln!(stdout, "  {:<16}{}", "Pixels/strip".cyan(), header.pixels())?;
        writeln!(stdout, "  {:<16}{} bytes", "Frame size".cyan(), reader.frame_size())?;
        writeln!(stdout, "  {:<16}{}", "Frames".cyan(), reader.frame_count())?;
        writeln!(stdout, "  {:<16}{duration:.2} s", "Duration".cyan())?;

        if ctx.level >= VerbosityLevel::Debug {
            writeln!(stdout, "  {:<16}{} bytes", "File size".cyan(), reader.file_size())?;
            writeln!(stdout, "  {:<16}{} bytes", "Data size".cyan(), reader.data_size())?;
        }

        Ok(())
    }
}
