use crate::de::error::FormatError;
use crate::de::parser::Parser;

/// The length of a WW header in bytes.
pub const HEADER_SIZE: usize = 13;

/// Magic bytes identifying a WW file (bytes 2 and 3 of the header).
pub const MAGIC: [u8; 2] = *b"WW";

/// Represents the fixed header at the start of every WW file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    frame_rate: u8,
    bytes_per_pixel: u8,
    strips: u8,
    pixels: u16,
}

impl Header {
    /// Describe an animation with the given playback rate and geometry.
    #[must_use]
    pub const fn new(frame_rate: u8, bytes_per_pixel: u8, strips: u8, pixels: u16) -> Self {
        Self {
            frame_rate,
            bytes_per_pixel,
            strips,
            pixels,
        }
    }

    /// Decode the header from the first [`HEADER_SIZE`] bytes of `data`.
    ///
    /// # Errors
    ///
    /// This function returns an error if:
    ///
    /// - `data` is shorter than [`HEADER_SIZE`].
    /// - Any of the padding, magic, or reserved bytes are wrong.
    pub fn from_bytes(data: &[u8]) -> Result<Self, FormatError> {
        let mut parser = Parser::new(data);
        parse_header(&mut parser)
    }

    /// Encode the header.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let [pixels_hi, pixels_lo] = self.pixels.to_be_bytes();
        [
            0,
            0,
            MAGIC[0],
            MAGIC[1],
            0,
            0,
            self.frame_rate,
            self.bytes_per_pixel,
            self.strips,
            pixels_hi,
            pixels_lo,
            0,
            0,
        ]
    }

    /// The intended playback rate, in frames per second.
    #[must_use]
    pub const fn frame_rate(&self) -> u8 {
        self.frame_rate
    }

    /// The number of bytes used for each pixel.
    #[must_use]
    pub const fn bytes_per_pixel(&self) -> u8 {
        self.bytes_per_pixel
    }

    /// The number of LED strips.
    #[must_use]
    pub const fn strips(&self) -> u8 {
        self.strips
    }

    /// The number of pixels on each strip.
    #[must_use]
    pub const fn pixels(&self) -> u16 {
        self.pixels
    }

    /// The size of a single frame in bytes.
    #[must_use]
    pub const fn frame_size(&self) -> usize {
        self.bytes_per_pixel as usize * self.strips as usize * self.pixels as usize
    }
}

fn parse_header(parser: &mut Parser) -> Result<Header, FormatError> {
    parser.expect_bytes("padding", &[0, 0])?;
    parser.expect_bytes("magic", &MAGIC)?;
    parser.expect_bytes("reserved", &[0, 0])?;

    let frame_rate = parser.read::<u8>()?;
    let bytes_per_pixel = parser.read::<u8>()?;
    let strips = parser.read::<u8>()?;
    let pixels = parser.read_u16_be()?;

    parser.expect_bytes("reserved", &[0, 0])?;

    Ok(Header {
        frame_rate,
        bytes_per_pixel,
        strips,
        pixels,
    })
}
