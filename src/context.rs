use std::path::PathBuf;

use anyhow::Context as _;

use crate::config::Config;
use crate::verbosity::VerbosityLevel;

#[derive(Debug, Clone)]
pub struct Context {
    pub config_path: PathBuf,
    pub config: Option<Config>,
    pub level: VerbosityLevel,
}

impl Context {
    pub fn new(config_path: PathBuf) -> Self {
        Self {
            config_path,
            config: None,
            level: VerbosityLevel::default(),
        }
    }

    pub fn with_level(self, level: VerbosityLevel) -> Self {
        Self { level, ..self }
    }

    /// The loaded configuration, reading it from [`Self::config_path`] on first use.
    pub fn config(&mut self) -> anyhow::Result<&Config> {
        let config = match self.config.take() {
            Some(config) => config,
            None => Config::from_file(&self.config_path).with_context(|| {
                format!(
                    "failed to load {} (run `{} init` to create it)",
                    self.config_path.display(),
                    env!("CARGO_PKG_NAME")
                )
            })?,
        };

        Ok(self.config.insert(config))
    }
}
