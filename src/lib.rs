//! YM chiptune container loader and resampling mixer
//!
//! Two independent pipelines:
//!
//! - **Format loader**: raw bytes -> optional LHA depack -> 4-byte tag dispatch
//!   -> per-variant decode (YM2!/YM3!/YM3b/YM5!/YM6!, MIX1, YMT1/YMT2)
//!   -> de-interleave -> [`SongDescriptor`].
//! - **Resampling mixer**: 16-bit stereo PCM in a [`SampleRing`] -> 4-point
//!   cubic interpolation in 16.16 fixed point -> pan/volume -> 8/16-bit,
//!   mono/stereo, signed/unsigned output with circular wrap.
//!
//! # Crate feature flags
//! - `ym-format` (default): depack, parser and loader (`compression`, `ym_parser`, `ym_loader`)
//! - `streaming` (default): ring buffer and resampler (`streaming`)
//!
//! # Quick start
//! ## Load a song
//! ```no_run
//! # #[cfg(feature = "ym-format")]
//! # {
//! use ymplay_core::{NullChip, YmMusic};
//! let mut music = YmMusic::new(NullChip);
//! if music.load("song.ym").is_err() {
//!     eprintln!("{}", music.last_error());
//! }
//! # }
//! ```
//!
//! ## Resample one tick
//! ```no_run
//! # #[cfg(feature = "streaming")]
//! # {
//! use ymplay_core::streaming::{OutputFormat, Resampler, SampleRing};
//! let mut ring = SampleRing::new(22_050).unwrap();
//! ring.write(&[0i16; 2 * 1024]);
//! let format = OutputFormat::default();
//! let mut resampler = Resampler::new(format, 4096).unwrap();
//! resampler.set_speed(256, 44_100, 48_000).unwrap();
//! let mut device = vec![0u8; 4096 * format.bytes_per_frame()];
//! let produced = resampler.process(&mut ring, &mut device, 512);
//! # let _ = produced;
//! # }
//! ```

#![warn(missing_docs)]

#[cfg(feature = "ym-format")]
pub mod compression; // LHA depack
#[cfg(feature = "streaming")]
pub mod streaming; // Resampling mixer
#[cfg(feature = "ym-format")]
pub mod ym_loader; // Song instance and file I/O
#[cfg(feature = "ym-format")]
pub mod ym_parser; // Container parsing

/// Error types for loading and mixing
#[derive(thiserror::Error, Debug)]
pub enum YmError {
    /// IO error from filesystem
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Not enough bytes left for a required field
    #[error("File too small: {0}")]
    Truncated(String),

    /// Bad magic, unsupported level/version or a count/size out of bounds
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// The 4-byte tag does not name a known container
    #[error("Unknown YM format: {0}")]
    UnknownFormat(String),

    /// An allocation could not be satisfied
    #[error("Out of memory: {0}")]
    OutOfMemory(String),

    /// Decompression error (LHA/LZH)
    #[error("Decompression error: {0}")]
    DecompressionError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for YmError {
    /// Converts a String into `YmError::Other`.
    ///
    /// Prefer the specific variants where the failure class is known.
    fn from(msg: String) -> Self {
        YmError::Other(msg)
    }
}

impl From<&str> for YmError {
    fn from(msg: &str) -> Self {
        YmError::Other(msg.to_string())
    }
}

/// Result type for loader and mixer operations
pub type Result<T> = std::result::Result<T, YmError>;

#[cfg(feature = "ym-format")]
pub use compression::depack_if_needed;
#[cfg(feature = "streaming")]
pub use streaming::{
    Channels, OutputFormat, Panning, Resampler, SampleRing, SampleWidth, Segments, StreamFlags,
};
#[cfg(feature = "ym-format")]
pub use ym_loader::{ChipBackend, NullChip, PlaybackState, YmMusic};
#[cfg(feature = "ym-format")]
pub use ym_parser::{
    decode, DigiDrum, MixBlock, SongAttributes, SongBody, SongDescriptor, SongFormat,
    SongMetadata,
};
