//! Map frames onto DMX-512 universes.

/// Channels used per universe. DMX-512 allows 512; two are left as headroom so RGB triplets
/// never straddle a universe boundary.
pub const UNIVERSE_SLOTS: usize = 510;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Universe {
    number: u16,
    data: Vec<u8>,
}

impl Universe {
    pub fn new(number: u16, data: Vec<u8>) -> Self {
        Self { number, data }
    }

    /// The 1-based universe number.
    pub const fn number(&self) -> u16 {
        self.number
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Split `frame` into consecutive universes, starting at universe 1.
pub fn convert(frame: &[u8]) -> Vec<Universe> {
    (1..=u16::MAX)
        .zip(frame.chunks(UNIVERSE_SLOTS))
        .map(|(number, chunk)| Universe::new(number, chunk.to_vec()))
        .collect()
}
