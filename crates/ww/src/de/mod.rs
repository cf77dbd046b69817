//! Decode WW animation files.

mod error;
mod header;
mod parser;

use std::collections::VecDeque;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

pub use error::FormatError;
pub use header::{HEADER_SIZE, Header, MAGIC};
use tracing::{debug, trace, warn};

use crate::Frame;

/// The number of frames read from disk at a time.
pub const DEFAULT_CHUNK_FRAMES: usize = 512;

/// Determines what the [`Reader`] produces once the end of the file is reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlayMode {
    /// Emit blank frames forever.
    Hold,
    /// Rewind to the first frame and keep going.
    #[default]
    Loop,
}

/// Streams frames out of a WW file.
///
/// Frames are read from disk in contiguous chunks of [`DEFAULT_CHUNK_FRAMES`] and handed out one
/// at a time, so only a single chunk is ever held in memory.
pub struct Reader<R = File> {
    inner: R,
    header: Header,
    frame_size: usize,
    file_size: u64,
    bytes_loaded: u64,
    chunk_frames: usize,
    queue: VecDeque<Frame>,
    mode: PlayMode,
}

impl Reader<File> {
    /// Open a WW file and validate its header.
    ///
    /// # Errors
    ///
    /// This function returns an error if:
    ///
    /// - Cannot read the file at path.
    /// - The header is truncated or invalid.
    /// - The frame data is not a whole number of frames.
    pub fn open<P: AsRef<Path>>(path: P, mode: PlayMode) -> Result<Self, FormatError> {
        let file = File::open(path).map_err(|source| FormatError::ReadFailure { source })?;
        Self::new(file, mode)
    }
}

impl<R: Read + Seek> Reader<R> {
    /// Validate the header of a WW stream.
    ///
    /// # Errors
    ///
    /// This function returns an error if:
    ///
    /// - Cannot read or seek the stream.
    /// - The header is truncated or invalid.
    /// - The frame data is not a whole number of frames.
    pub fn new(mut inner: R, mode: PlayMode) -> Result<Self, FormatError> {
        let read_failure = |source| FormatError::ReadFailure { source };

        let file_size = inner.seek(SeekFrom::End(0)).map_err(read_failure)?;
        inner.seek(SeekFrom::Start(0)).map_err(read_failure)?;

        let mut buffer = Vec::with_capacity(HEADER_SIZE);
        inner
            .by_ref()
            .take(HEADER_SIZE as u64)
            .read_to_end(&mut buffer)
            .map_err(read_failure)?;

        let header = Header::from_bytes(&buffer)?;
        let frame_size = header.frame_size();

        if frame_size == 0 {
            return Err(FormatError::EmptyFrame);
        }

        let data_size = file_size - HEADER_SIZE as u64;
        let remainder = data_size % frame_size as u64;

        if remainder != 0 {
            return Err(FormatError::TrailingData {
                frame_size,
                remainder,
            });
        }

        debug!(
            "opened animation: {} frames of {frame_size} bytes at {} fps",
            data_size / frame_size as u64,
            header.frame_rate(),
        );

        Ok(Self {
            inner,
            header,
            frame_size,
            file_size,
            bytes_loaded: 0,
            chunk_frames: DEFAULT_CHUNK_FRAMES,
            queue: VecDeque::new(),
            mode,
        })
    }

    /// Read `chunk_frames` frames from disk at a time instead of [`DEFAULT_CHUNK_FRAMES`].
    #[must_use]
    pub fn with_chunk_frames(mut self, chunk_frames: usize) -> Self {
        self.chunk_frames = chunk_frames.max(1);
        self
    }

    /// Return the next frame.
    ///
    /// Never fails: once a [`PlayMode::Hold`] file runs out, or if the underlying stream errors,
    /// a blank frame is returned so callers on a fixed cadence never stall.
    pub fn next_frame(&mut self) -> Frame {
        self.try_next_frame().unwrap_or_else(|err| {
            warn!("failed to stream animation data: {err}");
            Frame::zeroed(self.frame_size)
        })
    }

    /// Return the next frame, surfacing I/O errors from the underlying stream.
    ///
    /// # Errors
    ///
    /// This function returns an error if:
    ///
    /// - The next chunk could not be read.
    pub fn try_next_frame(&mut self) -> Result<Frame, FormatError> {
        if self.queue.is_empty() {
            self.fill()?;
        }

        Ok(self
            .queue
            .pop_front()
            .unwrap_or_else(|| Frame::zeroed(self.frame_size)))
    }

    /// Continue streaming from `frame_index`, discarding any buffered frames.
    ///
    /// # Errors
    ///
    /// This function returns an error if:
    ///
    /// - `frame_index` is not less than [`Self::frame_count`].
    pub fn seek(&mut self, frame_index: u64) -> Result<(), FormatError> {
        let count = self.frame_count();

        if frame_index >= count {
            return Err(FormatError::FrameOutOfRange {
                index: frame_index,
                count,
            });
        }

        self.queue.clear();
        self.bytes_loaded = frame_index * self.frame_size as u64;
        Ok(())
    }

    /// Returns `true` once a [`PlayMode::Hold`] file has handed out every frame.
    pub fn is_exhausted(&self) -> bool {
        self.mode == PlayMode::Hold && self.queue.is_empty() && self.bytes_loaded >= self.data_size()
    }

    fn fill(&mut self) -> Result<(), FormatError> {
        if self.bytes_loaded < self.data_size() {
            return self.load_chunk();
        }

        match self.mode {
            PlayMode::Loop => {
                trace!("end of animation, rewinding");
                self.bytes_loaded = 0;
                self.load_chunk()
            }
            PlayMode::Hold => Ok(()),
        }
    }

    fn load_chunk(&mut self) -> Result<(), FormatError> {
        let read_failure = |source| FormatError::ReadFailure { source };

        let remaining = self.data_size() - self.bytes_loaded;
        let chunk_size = self.chunk_frames.saturating_mul(self.frame_size);
        let size = usize::try_from(remaining).map_or(chunk_size, |r| r.min(chunk_size));

        if size == 0 {
            return Ok(());
        }

        self.inner
            .seek(SeekFrom::Start(HEADER_SIZE as u64 + self.bytes_loaded))
            .map_err(read_failure)?;

        let mut buffer = vec![0; size];
        self.inner.read_exact(&mut buffer).map_err(read_failure)?;
        self.bytes_loaded += size as u64;

        self.queue
            .extend(buffer.chunks_exact(self.frame_size).map(Frame::from_slice));
        trace!("loaded {} frames", size / self.frame_size);

        Ok(())
    }
}

impl<R> Reader<R> {
    /// The decoded file header.
    pub const fn header(&self) -> &Header {
        &self.header
    }

    /// The size of each frame in bytes.
    pub const fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// The total size of the file in bytes, header included.
    pub const fn file_size(&self) -> u64 {
        self.file_size
    }

    /// The size of the frame data region in bytes.
    pub const fn data_size(&self) -> u64 {
        self.file_size - HEADER_SIZE as u64
    }

    /// The number of frames in the file.
    pub const fn frame_count(&self) -> u64 {
        self.data_size() / self.frame_size as u64
    }

    /// What happens once the end of the file is reached.
    pub const fn mode(&self) -> PlayMode {
        self.mode
    }
}
