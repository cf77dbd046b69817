//! Encode WW animation files.

use std::io::Write;

use crate::de::{FormatError, Header};

/// Writes a header followed by frames of exactly [`Header::frame_size`] bytes.
pub struct Writer<W: Write> {
    inner: W,
    frame_size: usize,
    frames_written: u64,
}

impl<W: Write> Writer<W> {
    /// Write `header` and prepare to accept frames.
    ///
    /// # Errors
    ///
    /// This function returns an error if:
    ///
    /// - The header describes zero-byte frames.
    /// - The header could not be written.
    pub fn new(mut inner: W, header: Header) -> Result<Self, FormatError> {
        let frame_size = header.frame_size();

        if frame_size == 0 {
            return Err(FormatError::EmptyFrame);
        }

        inner
            .write_all(&header.to_bytes())
            .map_err(|source| FormatError::WriteFailure { source })?;

        Ok(Self {
            inner,
            frame_size,
            frames_written: 0,
        })
    }

    /// Append a frame.
    ///
    /// # Errors
    ///
    /// This function returns an error if:
    ///
    /// - `frame` is not exactly one frame long.
    /// - The frame could not be written.
    pub fn write_frame(&mut self, frame: &[u8]) -> Result<(), FormatError> {
        if frame.len() != self.frame_size {
            return Err(FormatError::FrameSizeMismatch {
                expected: self.frame_size,
                actual: frame.len(),
            });
        }

        self.inner
            .write_all(frame)
            .map_err(|source| FormatError::WriteFailure { source })?;
        self.frames_written += 1;

        Ok(())
    }

    /// The number of frames written so far.
    pub const fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Flush and return the underlying writer.
    ///
    /// # Errors
    ///
    /// This function returns an error if:
    ///
    /// - The writer could not be flushed.
    pub fn finish(mut self) -> Result<W, FormatError> {
        self.inner
            .flush()
            .map_err(|source| FormatError::WriteFailure { source })?;

        Ok(self.inner)
    }
}
