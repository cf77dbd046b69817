use std::{error, fmt, io};

/// Errors raised while reading or writing a WW file.
#[non_exhaustive]
#[derive(Debug)]
pub enum FormatError {
    /// An error occurred while attempting to read from a file.
    ReadFailure {
        /// The underlying error that caused the failure.
        source: io::Error,
    },

    /// An error occurred while attempting to write to a file.
    WriteFailure {
        /// The underlying error that caused the failure.
        source: io::Error,
    },

    /// Attempted to read more bytes than were available.
    NotEnoughBytes {
        /// The number of bytes needed to complete the operation.
        needed: usize,
    },

    /// A fixed header field did not contain the expected bytes.
    UnexpectedBytes {
        /// Name of the header field.
        field: &'static str,
        /// Byte offset of the field within the header.
        offset: usize,
        /// The bytes required by the file format.
        expected: Vec<u8>,
        /// The bytes found in the file.
        actual: Vec<u8>,
    },

    /// The header describes frames of zero bytes.
    EmptyFrame,

    /// The frame data is not a whole number of frames.
    TrailingData {
        /// The size of a single frame in bytes.
        frame_size: usize,
        /// The number of bytes left over after the last whole frame.
        remainder: u64,
    },

    /// Attempted to seek past the last frame.
    FrameOutOfRange {
        /// The requested frame.
        index: u64,
        /// The number of frames in the file.
        count: u64,
    },

    /// A frame handed to the writer had the wrong length.
    FrameSizeMismatch {
        /// The frame size declared by the header.
        expected: usize,
        /// The length of the rejected frame.
        actual: usize,
    },
}

impl error::Error for FormatError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Self::ReadFailure { ref source } | Self::WriteFailure { ref source } => Some(source),
            Self::NotEnoughBytes { .. }
            | Self::UnexpectedBytes { .. }
            | Self::EmptyFrame
            | Self::TrailingData { .. }
            | Self::FrameOutOfRange { .. }
            | Self::FrameSizeMismatch { .. } => None,
        }
    }
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::ReadFailure { .. } => "failed to read WW file".fmt(f),
            Self::WriteFailure { .. } => "failed to write WW file".fmt(f),
            Self::NotEnoughBytes { needed } => {
                write!(f, "truncated header (needed {needed} additional bytes)")
            }
            Self::UnexpectedBytes {
                field,
                offset,
                ref expected,
                ref actual,
            } => {
                write!(
                    f,
                    "invalid header: expected {field} at byte {offset} to be {expected:02x?}, got {actual:02x?}"
                )
            }
            Self::EmptyFrame => "invalid header: frame size is zero".fmt(f),
            Self::TrailingData {
                frame_size,
                remainder,
            } => {
                write!(
                    f,
                    "frame data is not a multiple of the frame size ({frame_size} bytes, {remainder} left over)"
                )
            }
            Self::FrameOutOfRange { index, count } => {
                write!(f, "frame {index} out of range (file has {count} frames)")
            }
            Self::FrameSizeMismatch { expected, actual } => {
                write!(f, "expected frame to be {expected} bytes, got {actual}")
            }
        }
    }
}
