//! The text commands accepted by the control server.

use std::str::FromStr;

use tracing::{debug, warn};

use crate::brightness::{Brightness, ParseBrightnessError};
use crate::player::Controller;
use crate::playlist::PlayMode;

const OK: &str = "OK";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Play,
    Pause,
    Resume,
    Stop,
    Restart,
    Prev,
    Next,
    GetState,
    SetBrightness(Brightness),
    GetBrightness,
    SetMode(PlayMode),
    SetFps(u32),
    GetFps,
    GetCurrentMedia,
    Seek(u64),
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Unknown command")]
    Unknown(String),

    #[error("{0} requires an argument")]
    MissingArgument(&'static str),

    #[error("invalid argument for {command}: {reason}")]
    InvalidArgument {
        command: &'static str,
        reason: String,
    },
}

impl FromStr for Command {
    type Err = CommandError;

    /// Parse `<command>[ <argument>]`. Extra arguments are ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let name = words.next().unwrap_or_default();
        let argument = words.next();

        let command = match name {
            "play" => Self::Play,
            "pause" => Self::Pause,
            "resume" => Self::Resume,
            "stop" => Self::Stop,
            "restart" => Self::Restart,
            "prev" => Self::Prev,
            "next" => Self::Next,
            "get_state" => Self::GetState,
            "set_brightness" => {
                let argument = argument.ok_or(CommandError::MissingArgument("set_brightness"))?;
                let brightness = argument
                    .parse()
                    .map_err(|err: ParseBrightnessError| {
                        CommandError::InvalidArgument {
                            command: "set_brightness",
                            reason: err.to_string(),
                        }
                    })?;
                Self::SetBrightness(brightness)
            }
            "get_brightness" => Self::GetBrightness,
            "repeat" => Self::SetMode(PlayMode::Repeat),
            "repeat_one" => Self::SetMode(PlayMode::RepeatOne),
            "repeat_none" => Self::SetMode(PlayMode::RepeatNone),
            "set_fps" => Self::SetFps(parse_fps(argument)?),
            "get_fps" => Self::GetFps,
            "get_current_media" => Self::GetCurrentMedia,
            "seek" => {
                let argument = argument.ok_or(CommandError::MissingArgument("seek"))?;
                let frame = argument
                    .parse()
                    .map_err(|_| CommandError::InvalidArgument {
                        command: "seek",
                        reason: format!("expected a frame index, got {argument:?}"),
                    })?;
                Self::Seek(frame)
            }
            other => return Err(CommandError::Unknown(other.to_owned())),
        };

        Ok(command)
    }
}

/// Decimal rates are truncated toward zero.
#[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn parse_fps(argument: Option<&str>) -> Result<u32, CommandError> {
    let argument = argument.ok_or(CommandError::MissingArgument("set_fps"))?;
    let invalid = || CommandError::InvalidArgument {
        command: "set_fps",
        reason: format!("expected a rate of at least 1, got {argument:?}"),
    };

    let fps = argument.parse::<f64>().map_err(|_| invalid())?.trunc();
    if !(1.0..=f64::from(u32::MAX)).contains(&fps) {
        return Err(invalid());
    }

    Ok(fps as u32)
}

impl Command {
    /// Apply the command and return the reply line.
    pub fn execute(self, controller: &Controller) -> anyhow::Result<String> {
        let reply = match self {
            Self::Play => {
                controller.play()?;
                OK.to_owned()
            }
            Self::Pause => {
                controller.pause();
                OK.to_owned()
            }
            Self::Resume => {
                controller.resume()?;
                OK.to_owned()
            }
            Self::Stop => {
                controller.stop();
                OK.to_owned()
            }
            Self::Restart => {
                controller.restart()?;
                OK.to_owned()
            }
            Self::Prev => {
                controller.prev()?;
                OK.to_owned()
            }
            Self::Next => {
                controller.next()?;
                OK.to_owned()
            }
            Self::GetState => controller.state().to_string(),
            Self::SetBrightness(brightness) => {
                controller.set_brightness(brightness);
                OK.to_owned()
            }
            Self::GetBrightness => controller.brightness().to_string(),
            Self::SetMode(mode) => {
                controller.set_mode(mode);
                OK.to_owned()
            }
            Self::SetFps(fps) => {
                controller.set_fps(fps)?;
                OK.to_owned()
            }
            Self::GetFps => controller.fps().to_string(),
            Self::GetCurrentMedia => controller
                .current_media()
                .ok_or_else(|| anyhow::anyhow!("the playlist is empty"))?,
            Self::Seek(frame) => {
                controller.seek(frame)?;
                OK.to_owned()
            }
        };

        Ok(reply)
    }
}

/// Parse and run one request line, always producing a reply.
pub fn respond(controller: &Controller, line: &str) -> String {
    let command = match line.parse::<Command>() {
        Ok(command) => command,
        Err(CommandError::Unknown(name)) => {
            warn!("unknown command received: {name:?}");
            return CommandError::Unknown(name).to_string();
        }
        Err(err) => {
            warn!("rejected {line:?}: {err}");
            return format!("Error processing message: {err}");
        }
    };

    debug!("received {command:?}");
    match command.execute(controller) {
        Ok(reply) => reply,
        Err(err) => {
            warn!("{command:?} failed: {err:#}");
            format!("Error processing message: {err:#}")
        }
    }
}
