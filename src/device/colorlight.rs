//! Packet builders for Colorlight receiver cards.
//!
//! Colorlight cards speak a vendor protocol directly on top of Ethernet. The EtherType field
//! selects the packet kind and nothing is ever acknowledged. A displayed frame is a
//! set-brightness package, one or more pixel-data packages per row, and a display-frame package
//! that latches the streamed rows.

pub const DEFAULT_DISPLAY_ETHERTYPE: u16 = 0x0107;
pub const DEFAULT_PIXEL_ETHERTYPE_BASE: u16 = 0x5500;
const SET_BRIGHTNESS_ETHERTYPE_BASE: u16 = 0x0A << 8;

/// Length of a set-brightness package, EtherType included.
pub const SET_BRIGHTNESS_LEN: usize = 63;
/// Length of a display-frame package, EtherType included.
pub const DISPLAY_FRAME_LEN: usize = 98;

const PIXEL_DATA_MARKER: [u8; 2] = [0x08, 0x88];
const PIXEL_DATA_HEADER_LEN: usize = 9;

pub const BYTES_PER_PIXEL: usize = 3;

/// The most pixels that fit in one package on a 1500 byte MTU.
pub const MAX_PIXELS_PER_PACKAGE: u16 = 497;

pub type MacAddress = [u8; 6];

/// Dimensions of the panel, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub width: u16,
    pub height: u16,
    pub max_pixels_per_package: u16,
}

impl Layout {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            max_pixels_per_package: MAX_PIXELS_PER_PACKAGE,
        }
    }

    pub fn row_len(&self) -> usize {
        usize::from(self.width) * BYTES_PER_PIXEL
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Encoder {
    display_ethertype: u16,
    pixel_ethertype_base: u16,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new(DEFAULT_DISPLAY_ETHERTYPE, DEFAULT_PIXEL_ETHERTYPE_BASE)
    }
}

impl Encoder {
    pub const fn new(display_ethertype: u16, pixel_ethertype_base: u16) -> Self {
        Self {
            display_ethertype,
            pixel_ethertype_base,
        }
    }

    pub fn set_brightness(&self, brightness: u8) -> Vec<u8> {
        let ethertype = SET_BRIGHTNESS_ETHERTYPE_BASE | u16::from(brightness);

        let mut package = vec![0; SET_BRIGHTNESS_LEN];
        package[..2].copy_from_slice(&ethertype.to_be_bytes());

        let body = &mut package[2..];
        body[0] = brightness;
        body[1] = brightness;
        body[2] = 0xFF;

        package
    }

    pub fn display_frame(&self, brightness: u8) -> Vec<u8> {
        let mut package = vec![0; DISPLAY_FRAME_LEN];
        package[..2].copy_from_slice(&self.display_ethertype.to_be_bytes());

        let body = &mut package[2..];
        body[21] = brightness;
        body[22] = 5;
        body[24..=26].fill(brightness);

        package
    }

    /// Build the package carrying `pixels` (RGB triplets) for `row`, starting at column `offset`.
    pub fn pixel_data(&self, row: u16, offset: u16, pixels: &[u8]) -> Vec<u8> {
        // The row's high byte rides in the EtherType, its low byte in the body.
        let ethertype = self.pixel_ethertype_base | (row >> 8);
        let [_, row_lsb] = row.to_be_bytes();
        let count = u16::try_from(pixels.len() / BYTES_PER_PIXEL).unwrap_or(u16::MAX);

        let mut package = Vec::with_capacity(PIXEL_DATA_HEADER_LEN + pixels.len());
        package.extend(ethertype.to_be_bytes());
        package.push(row_lsb);
        package.extend(offset.to_be_bytes());
        package.extend(count.to_be_bytes());
        package.extend(PIXEL_DATA_MARKER);
        package.extend(pixels);

        package
    }

    /// Split `frame` into pixel-data packages, in ascending row then column order.
    ///
    /// Rows beyond `layout.height` are ignored; a short frame yields fewer rows.
    pub fn rows(&self, frame: &[u8], layout: Layout) -> Vec<Vec<u8>> {
        let max_pixels = layout.max_pixels_per_package.clamp(1, MAX_PIXELS_PER_PACKAGE);
        let chunk_len = usize::from(max_pixels) * BYTES_PER_PIXEL;

        let mut packages = Vec::new();
        for (row, data) in (0..layout.height).zip(frame.chunks(layout.row_len().max(1))) {
            let mut offset = 0u16;

            for chunk in data.chunks(chunk_len) {
                packages.push(self.pixel_data(row, offset, chunk));
                offset = offset.saturating_add(max_pixels);
            }
        }

        packages
    }
}

/// Wrap a package in an Ethernet II header.
pub fn ethernet_frame(destination: MacAddress, source: MacAddress, package: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(12 + package.len());
    frame.extend(destination);
    frame.extend(source);
    frame.extend(package);
    frame
}
