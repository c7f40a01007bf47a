//! Song instance
//!
//! [`YmMusic`] owns at most one decoded song and the chip it drives. A
//! failed load leaves the instance empty with the reason available from
//! [`YmMusic::last_error`].

use super::loader::YmFileLoader;
use crate::ym_parser::SongDescriptor;
use crate::{Result, YmError};
use std::path::Path;

/// The sound chip a loaded song is played on
///
/// Only the calls the loader needs: the clock comes from the song header and
/// the chip is reset once per successful load.
pub trait ChipBackend {
    /// Set the chip master clock in Hz
    fn set_clock(&mut self, clock_hz: u32);

    /// Return the chip to its power-on state
    fn reset(&mut self);
}

/// Chip backend that ignores every call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NullChip;

impl ChipBackend for NullChip {
    fn set_clock(&mut self, _clock_hz: u32) {}

    fn reset(&mut self) {}
}

/// Playback state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlaybackState {
    /// Nothing loaded, or stopped and rewound
    #[default]
    Stopped,
    /// Currently playing
    Playing,
    /// Paused
    Paused,
}

/// One loaded song and the chip that plays it
#[derive(Debug)]
pub struct YmMusic<B: ChipBackend> {
    chip: B,
    song: Option<SongDescriptor>,
    last_error: String,
    state: PlaybackState,
    current_frame: u32,
}

impl<B: ChipBackend> YmMusic<B> {
    /// Empty instance driving `chip`
    pub fn new(chip: B) -> Self {
        YmMusic {
            chip,
            song: None,
            last_error: String::new(),
            state: PlaybackState::Stopped,
            current_frame: 0,
        }
    }

    /// Load a song from disk, replacing whatever was loaded
    ///
    /// On success the song is ready and playing from frame 0. On failure the
    /// instance holds no song and the error text is kept for
    /// [`last_error`](Self::last_error).
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        log::info!("loading '{}'", path.display());
        self.stop();
        self.unload();
        let result = YmFileLoader::load(path);
        self.install(result)
    }

    /// Load a song from a caller-owned buffer
    ///
    /// The bytes are copied; the caller keeps ownership of `bytes`.
    pub fn load_memory(&mut self, bytes: &[u8]) -> Result<()> {
        log::info!("loading {} bytes from memory", bytes.len());
        self.stop();
        self.unload();
        let result = YmFileLoader::load_slice(bytes);
        self.install(result)
    }

    fn install(&mut self, result: Result<SongDescriptor>) -> Result<()> {
        match result {
            Ok(song) => {
                log::info!(
                    "{} '{}' by '{}': {} frames at {} Hz, clock {} Hz",
                    song.metadata.song_type,
                    song.metadata.name,
                    song.metadata.author,
                    song.frame_count,
                    song.player_rate,
                    song.clock
                );
                self.chip.set_clock(song.clock);
                self.chip.reset();
                self.song = Some(song);
                self.last_error.clear();
                self.current_frame = 0;
                self.state = PlaybackState::Playing;
                Ok(())
            }
            Err(e) => {
                log::warn!("load failed: {}", e);
                self.last_error = e.to_string();
                Err(e)
            }
        }
    }

    /// Drop the loaded song, if any
    pub fn unload(&mut self) {
        if self.song.take().is_some() {
            log::debug!("song unloaded");
        }
        self.state = PlaybackState::Stopped;
        self.current_frame = 0;
    }

    /// Start or resume playback
    pub fn play(&mut self) -> Result<()> {
        if self.song.is_none() {
            return Err(YmError::Other("no song loaded".into()));
        }
        self.state = PlaybackState::Playing;
        Ok(())
    }

    /// Pause without rewinding
    pub fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Paused;
        }
    }

    /// Stop and rewind to the first frame
    pub fn stop(&mut self) {
        self.state = PlaybackState::Stopped;
        self.current_frame = 0;
    }

    /// Current playback state
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Current frame position
    pub fn current_frame(&self) -> u32 {
        self.current_frame
    }

    /// Frame data for this player tick, then step to the next frame
    ///
    /// Returns `None` unless playing a song with a frame stream. Past the
    /// last frame the position wraps to the loop frame, or to 0 when the
    /// loop frame is out of range.
    pub fn next_frame(&mut self) -> Option<&[u8]> {
        if self.state != PlaybackState::Playing {
            return None;
        }
        let song = self.song.as_ref()?;
        if song.frame_count == 0 {
            return None;
        }
        let index = self.current_frame;
        let next = index + 1;
        self.current_frame = if next < song.frame_count {
            next
        } else if song.loop_frame < song.frame_count {
            song.loop_frame
        } else {
            0
        };
        song.frame(index as usize)
    }

    /// Move the play position to `frame`
    pub fn seek(&mut self, frame: u32) -> Result<()> {
        let song = self
            .song
            .as_ref()
            .ok_or_else(|| YmError::Other("no song loaded".into()))?;
        if frame >= song.frame_count {
            return Err(YmError::Other(format!(
                "frame {} past the end ({} frames)",
                frame, song.frame_count
            )));
        }
        self.current_frame = frame;
        Ok(())
    }

    /// True when a song is loaded
    pub fn is_loaded(&self) -> bool {
        self.song.is_some()
    }

    /// The loaded song
    pub fn song(&self) -> Option<&SongDescriptor> {
        self.song.as_ref()
    }

    /// Text of the most recent load failure, empty after a success
    pub fn last_error(&self) -> &str {
        &self.last_error
    }

    /// The chip backend
    pub fn chip(&self) -> &B {
        &self.chip
    }

    /// Mutable access to the chip backend
    pub fn chip_mut(&mut self) -> &mut B {
        &mut self.chip
    }
}
