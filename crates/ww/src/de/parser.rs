use std::mem;

use bytemuck::Pod;

use crate::de::error::FormatError;

/// Represents an ongoing parse.
pub struct Parser<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Parser<'a> {
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// Return the next `size` bytes.
    ///
    /// # Errors
    ///
    /// This function returns an error if:
    ///
    /// - There are not enough bytes to fill a buffer of size `size`.
    pub fn read_bytes(&mut self, size: usize) -> Result<&'a [u8], FormatError> {
        let (result, data) =
            self.data
                .split_at_checked(size)
                .ok_or_else(|| FormatError::NotEnoughBytes {
                    needed: size.saturating_sub(self.data.len()),
                })?;

        self.data = data;
        self.offset += size;
        Ok(result)
    }
}

impl Parser<'_> {
    pub fn read<T: Pod>(&mut self) -> Result<T, FormatError> {
        let bytes = self.read_bytes(mem::size_of::<T>())?;
        Ok(bytemuck::pod_read_unaligned(bytes))
    }

    pub fn read_u16_be(&mut self) -> Result<u16, FormatError> {
        // Multi-byte header fields are stored in network byte order.
        self.read::<[u8; 2]>().map(u16::from_be_bytes)
    }

    /// Consume `expected.len()` bytes, failing if they differ from `expected`.
    pub fn expect_bytes(&mut self, field: &'static str, expected: &[u8]) -> Result<(), FormatError> {
        let offset = self.offset;
        let actual = self.read_bytes(expected.len())?;

        if actual != expected {
            return Err(FormatError::UnexpectedBytes {
                field,
                offset,
                expected: expected.to_vec(),
                actual: actual.to_vec(),
            });
        }

        Ok(())
    }
}
