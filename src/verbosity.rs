use clap::ArgAction;
use tracing::level_filters::LevelFilter;

#[derive(Debug, Clone, clap::Args)]
pub struct Verbosity {
    #[clap(
        short,
        long,
        action = ArgAction::Count,
        help = "Use verbose output (or `-vv` and `-vvv` for more verbose output)",
        global = true,
        overrides_with = "quiet",
    )]
    verbose: u8,

    #[clap(
        short,
        long,
        action = ArgAction::Count,
        help = "Use quiet output (or `-qq` for silent output)",
        global = true,
        overrides_with = "verbose",
    )]
    quiet: u8,
}

impl Verbosity {
    /// Returns a verbosity level based on the number of `-v` and `-q` flags provided, or `None`
    /// when neither was given.
    pub fn level(&self) -> Option<VerbosityLevel> {
        match self.quiet {
            0 => {}
            1 => return Some(VerbosityLevel::Error),
            _ => return Some(VerbosityLevel::Off),
        }

        match self.verbose {
            0 => None,
            1 => Some(VerbosityLevel::Info),
            2 => Some(VerbosityLevel::Debug),
            _ => Some(VerbosityLevel::Trace),
        }
    }
}

/// Also accepted as `log_level` in the configuration file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerbosityLevel {
    /// Silence all logging output.
    Off,

    /// Shows events up to [`ERROR`](tracing::Level::ERROR).
    Error,

    /// Shows events up to [`WARN`](tracing::Level::WARN).
    #[default]
    Warn,

    /// Shows events up to [`INFO`](tracing::Level::INFO).
    Info,

    /// Shows events up to [`DEBUG`](tracing::Level::DEBUG).
    Debug,

    /// Shows events up to [`TRACE`](tracing::Level::TRACE).
    Trace,
}

impl VerbosityLevel {
    pub fn level_filter(self) -> LevelFilter {
        match self {
            Self::Off => LevelFilter::OFF,
            Self::Error => LevelFilter::ERROR,
            Self::Warn => LevelFilter::WARN,
            Self::Info => LevelFilter::INFO,
            Self::Debug => LevelFilter::DEBUG,
            Self::Trace => LevelFilter::TRACE,
        }
    }

    pub fn is_trace(self) -> bool {
        matches!(self, Self::Trace)
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Debug, Parser)]
    struct Cli {
        #[clap(flatten)]
        verbosity: Verbosity,
    }

    fn level(args: &[&str]) -> Option<VerbosityLevel> {
        let args = std::iter::once("ww-player").chain(args.iter().copied());
        Cli::parse_from(args).verbosity.level()
    }

    #[test]
    fn flags_map_to_levels() {
        assert_eq!(level(&[]), None);
        assert_eq!(level(&["-v"]), Some(VerbosityLevel::Info));
        assert_eq!(level(&["-vv"]), Some(VerbosityLevel::Debug));
        assert_eq!(level(&["-vvvv"]), Some(VerbosityLevel::Trace));
        assert_eq!(level(&["-q"]), Some(VerbosityLevel::Error));
        assert_eq!(level(&["-qq"]), Some(VerbosityLevel::Off));
    }

    #[test]
    fn levels_are_ordered() {
        assert!(VerbosityLevel::Off < VerbosityLevel::Warn);
        assert!(VerbosityLevel::Debug < VerbosityLevel::Trace);
        assert!(VerbosityLevel::Trace.is_trace());
    }
}
