//! Resampling mixer
//!
//! Source PCM (16-bit signed stereo at a fixed native rate) is queued in a
//! [`SampleRing`]. Each polling tick a [`Resampler`] converts it to the
//! device rate with 4-point cubic interpolation, applies [`Panning`] and
//! writes the result in the device [`OutputFormat`].
//!
//! Everything here is single-threaded and allocation-free after setup.

pub mod fixed_point;
pub mod output;
pub mod panning;
pub mod resampler;
pub mod ring_buffer;

pub use output::{Channels, OutputFormat, SampleWidth};
pub use panning::Panning;
pub use resampler::{Resampler, StreamFlags};
pub use ring_buffer::{SampleRing, Segments};
