//! Encode and decode WW binary animation files.
//!
//! A WW file is a 13-byte header followed by a contiguous run of fixed-size frames. The
//! [`de::Reader`] streams those frames from disk in chunks so arbitrarily long animations can be
//! played without loading them into memory.

#![warn(
    missing_docs,
    clippy::correctness,
    clippy::suspicious,
    clippy::complexity,
    clippy::perf,
    clippy::style,
    clippy::pedantic
)]

pub mod de;
mod frame;
pub mod ser;

pub use de::PlayMode;
pub use frame::Frame;
