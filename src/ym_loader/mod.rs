//! YM File Loader Domain
//!
//! File and memory loading with transparent LHA depack, plus the
//! [`YmMusic`] song instance.

pub mod loader;
pub mod music;

pub use loader::YmFileLoader;
pub use music::{ChipBackend, NullChip, PlaybackState, YmMusic};

use crate::ym_parser::SongDescriptor;
use crate::Result;
use std::path::Path;

/// Convenience function to load and decode a YM file from disk
pub fn load_file<P: AsRef<Path>>(path: P) -> Result<SongDescriptor> {
    YmFileLoader::load(path)
}
