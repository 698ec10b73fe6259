//! Page-flip viewer runtime.
//!
//! `ViewerState` is the pure state machine; `Viewer` binds it to the side
//! channels: audio cues, the controls auto-hide timer, and the reading
//! analytics recorder. Cue and analytics failures never reach the caller.

pub mod controls;
pub mod cue;
pub mod sizing;
pub mod state;

pub use controls::ControlsVisibility;
pub use cue::{Cue, CueSink, SilentCue};
pub use sizing::fit_page;
pub use state::{Command, Effect, Phase, ViewerState};

use std::time::Instant;

use log::debug;

use crate::analytics::{AnalyticsSink, ReadingRecorder};

pub struct Viewer<'a> {
    pub state: ViewerState,
    pub controls: ControlsVisibility,
    cue: &'a dyn CueSink,
    recorder: ReadingRecorder<'a>,
}

impl<'a> Viewer<'a> {
    /// Open a viewer over an ordered page-URL list. An empty list opens in
    /// the loading phase, waiting for `Command::PagesResolved`.
    pub fn open(
        document_id: &str,
        title: &str,
        page_urls: Vec<String>,
        total_hint: u32,
        cover_aspect: Option<f32>,
        cue: &'a dyn CueSink,
        sink: &'a dyn AnalyticsSink,
    ) -> Self {
        Self::open_at(
            document_id,
            title,
            page_urls,
            total_hint,
            cover_aspect,
            cue,
            sink,
            Instant::now(),
        )
    }

    #[expect(clippy::too_many_arguments, reason = "test-visible clock parameter")]
    pub fn open_at(
        document_id: &str,
        title: &str,
        page_urls: Vec<String>,
        total_hint: u32,
        cover_aspect: Option<f32>,
        cue: &'a dyn CueSink,
        sink: &'a dyn AnalyticsSink,
        now: Instant,
    ) -> Self {
        let mut state = ViewerState::new(title);
        let total = (page_urls.len() as u32).max(total_hint);
        let _ = state.apply(Command::Open {
            page_urls,
            total_hint,
            cover_aspect,
        });

        Self {
            state,
            controls: ControlsVisibility::new(now),
            cue,
            recorder: ReadingRecorder::start_at(document_id, total, sink, now),
        }
    }

    /// Drive the state machine and execute the resulting side effects.
    /// The effects are also returned for the host (rendering, animation).
    pub fn command(&mut self, cmd: Command) -> Vec<Effect> {
        self.command_at(cmd, Instant::now())
    }

    pub fn command_at(&mut self, cmd: Command, now: Instant) -> Vec<Effect> {
        let effects = self.state.apply(cmd);

        for effect in &effects {
            match effect {
                Effect::PlayFlipCue => {
                    // A denied or failed cue never blocks the flip.
                    if let Err(e) = self.cue.play(Cue::PageFlip) {
                        debug!("flip cue skipped: {e}");
                    }
                }
                Effect::PageChanged { to, .. } => {
                    self.recorder.page_changed_at(*to, now);
                }
                Effect::ShowControls => {
                    self.controls.note_interaction(now);
                }
                Effect::SessionEnded => {
                    self.recorder.end_session_at(now);
                }
                Effect::StopAudio => {}
            }
        }

        effects
    }

    /// Advance the controls timer. Returns true when this tick hid them.
    pub fn tick(&mut self, now: Instant) -> bool {
        self.controls.tick(now)
    }

    #[must_use]
    pub fn session_id(&self) -> &str {
        self.recorder.session_id()
    }
}
