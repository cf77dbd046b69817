//! Output brightness, shared by every sink.

use std::fmt;
use std::str::FromStr;

/// A brightness level from 0 (off) to 255 (full).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct Brightness(u8);

impl Brightness {
    pub const OFF: Self = Self(0);
    pub const FULL: Self = Self(u8::MAX);

    pub const fn new(level: u8) -> Self {
        Self(level)
    }

    pub const fn get(self) -> u8 {
        self.0
    }

    /// The brightness as a fraction of full output.
    pub fn factor(self) -> f32 {
        f32::from(self.0) / f32::from(u8::MAX)
    }

    /// Scale a single channel value, rounding to the nearest integer.
    #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn scale(self, value: u8) -> u8 {
        // The product never exceeds 255.0, so the cast cannot saturate.
        (f32::from(value) * self.factor()).round() as u8
    }

    pub fn scale_all(self, data: &[u8]) -> Vec<u8> {
        data.iter().map(|&value| self.scale(value)).collect()
    }
}

impl Default for Brightness {
    fn default() -> Self {
        Self(50)
    }
}

impl fmt::Display for Brightness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("expected a brightness between 0 and 255, got {0:?}")]
pub struct ParseBrightnessError(String);

impl FromStr for Brightness {
    type Err = ParseBrightnessError;

    /// Accepts integers and decimals, rounding the latter.
    #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .trim()
            .parse::<f32>()
            .map_err(|_| ParseBrightnessError(s.to_owned()))?
            .round();

        if !(0.0..=255.0).contains(&value) {
            return Err(ParseBrightnessError(s.to_owned()));
        }

        Ok(Self(value as u8))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaling_rounds_to_nearest() {
        let half = Brightness::new(128);

        assert_eq!(half.scale(0), 0);
        assert_eq!(half.scale(255), 128);
        assert_eq!(half.scale(100), 50);
        assert_eq!(half.scale(3), 2);
        assert_eq!(Brightness::FULL.scale(255), 255);
        assert_eq!(Brightness::OFF.scale(255), 0);
    }

    #[test]
    fn full_brightness_is_identity() {
        let data = (0..=255).collect::<Vec<u8>>();
        assert_eq!(Brightness::FULL.scale_all(&data), data);
    }

    #[test]
    fn parses_commands() {
        assert_eq!("0".parse::<Brightness>().unwrap(), Brightness::OFF);
        assert_eq!("255".parse::<Brightness>().unwrap(), Brightness::FULL);
        assert_eq!("127.6".parse::<Brightness>().unwrap(), Brightness::new(128));
        assert!("256".parse::<Brightness>().is_err());
        assert!("-1".parse::<Brightness>().is_err());
        assert!("bright".parse::<Brightness>().is_err());
        assert!("NaN".parse::<Brightness>().is_err());
    }
}
