use std::ops::Deref;

/// One tick of animation data.
///
/// A frame is immutable once produced; ownership moves from the source that decoded it to the
/// sink that transmits it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    data: Box<[u8]>,
}

impl Frame {
    /// Create a frame of `len` zero bytes (black on every output).
    #[must_use]
    pub fn zeroed(len: usize) -> Self {
        Self {
            data: vec![0; len].into_boxed_slice(),
        }
    }

    /// Copy `data` into a new frame.
    #[must_use]
    pub fn from_slice(data: &[u8]) -> Self {
        Self { data: data.into() }
    }

    /// The raw bytes of the frame.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Returns `true` if every byte of the frame is zero.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.data.iter().all(|&byte| byte == 0)
    }

    /// Consume the frame, returning the underlying buffer.
    #[must_use]
    pub fn into_vec(self) -> Vec<u8> {
        self.data.into_vec()
    }
}

impl From<Vec<u8>> for Frame {
    fn from(data: Vec<u8>) -> Self {
        Self {
            data: data.into_boxed_slice(),
        }
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl Deref for Frame {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}
