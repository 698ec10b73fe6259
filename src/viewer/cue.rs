//! Audio cue delivery.
//!
//! Cue playback is best-effort: a denied or failed playback is logged and
//! ignored, and never blocks or fails the navigation that triggered it.

use log::debug;

use crate::error::CueError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cue {
    PageFlip,
}

pub trait CueSink {
    fn play(&self, cue: Cue) -> Result<(), CueError>;
}

/// Default sink: no audio device, just a debug log line.
pub struct SilentCue;

impl CueSink for SilentCue {
    fn play(&self, cue: Cue) -> Result<(), CueError> {
        debug!("cue: {cue:?}");
        Ok(())
    }
}
