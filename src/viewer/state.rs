//! Viewer state machine.
//!
//! One explicit machine instead of a pile of independent booleans:
//! `Idle -> Loading -> Ready <-> Flipping -> Closed`, with commands for
//! every navigation input and effects for the side channels (audio cue,
//! page-change notification, controls, session end). The flip cue fires
//! exactly once, at the transition into `Flipping`, never per animation
//! frame.

use super::sizing::fit_page;

/// Viewer lifecycle phase. `Closed` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    /// The page list is still resolving.
    Loading,
    /// Steady display state.
    Ready,
    /// A turn animation is running.
    Flipping,
    Closed,
}

#[derive(Debug)]
pub struct ViewerState {
    pub phase: Phase,
    /// 1-based current page.
    pub current_page: u32,
    pub total_pages: u32,
    pub page_urls: Vec<String>,
    pub title: String,
    pub sound_enabled: bool,
    pub fullscreen: bool,
    /// Display size from the last resize trigger, if any.
    pub size: Option<(u32, u32)>,
    /// Cover width/height ratio used for sizing.
    pub cover_aspect: f32,
}

/// Commands that drive the viewer.
#[derive(Clone, Debug)]
pub enum Command {
    /// Open with a page list; an empty list means the list is still
    /// resolving and the viewer holds in `Loading`.
    Open {
        page_urls: Vec<String>,
        total_hint: u32,
        cover_aspect: Option<f32>,
    },
    /// The externally-resolving page list arrived.
    PagesResolved { page_urls: Vec<String> },
    FlipNext,
    FlipPrev,
    /// Direct navigation (e.g. a slider): animate straight to the target
    /// page, bypassing flip-by-flip traversal.
    GoToPage(u32),
    /// The turn animation completed.
    AnimationDone,
    /// Recompute display size for a new viewport.
    Resize { width: u32, height: u32 },
    ToggleFullscreen,
    ToggleSound,
    /// Pointer move, touch, or other interaction with no other meaning.
    Interaction,
    Close,
}

/// Effects produced by state transitions; the host executes them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Play the page-turn cue. Emitted at most once per flip.
    PlayFlipCue,
    PageChanged { from: u32, to: u32 },
    ShowControls,
    StopAudio,
    SessionEnded,
}

impl ViewerState {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            phase: Phase::Idle,
            current_page: 1,
            total_pages: 0,
            page_urls: Vec::new(),
            title: title.into(),
            sound_enabled: true,
            fullscreen: false,
            size: None,
            cover_aspect: 0.75,
        }
    }

    /// Apply a command and return the resulting effects.
    #[must_use]
    pub fn apply(&mut self, cmd: Command) -> Vec<Effect> {
        if self.phase == Phase::Closed {
            return vec![];
        }

        match cmd {
            Command::Open {
                page_urls,
                total_hint,
                cover_aspect,
            } => {
                if self.phase != Phase::Idle {
                    return vec![];
                }
                self.total_pages = (page_urls.len() as u32).max(total_hint);
                self.page_urls = page_urls;
                if let Some(aspect) = cover_aspect {
                    self.cover_aspect = aspect;
                }
                self.current_page = 1;
                self.phase = if self.page_urls.is_empty() {
                    Phase::Loading
                } else {
                    Phase::Ready
                };
                vec![Effect::ShowControls]
            }

            Command::PagesResolved { page_urls } => {
                if self.phase != Phase::Loading {
                    return vec![];
                }
                self.total_pages = page_urls.len() as u32;
                self.page_urls = page_urls;
                self.phase = Phase::Ready;
                vec![]
            }

            Command::FlipNext => {
                if self.phase == Phase::Ready && self.current_page < self.total_pages {
                    self.start_flip(self.current_page + 1)
                } else {
                    vec![]
                }
            }

            Command::FlipPrev => {
                if self.phase == Phase::Ready && self.current_page > 1 {
                    self.start_flip(self.current_page - 1)
                } else {
                    vec![]
                }
            }

            Command::GoToPage(page) => {
                let target = page.clamp(1, self.total_pages.max(1));
                if self.phase == Phase::Ready && target != self.current_page {
                    self.start_flip(target)
                } else {
                    vec![]
                }
            }

            Command::AnimationDone => {
                if self.phase == Phase::Flipping {
                    self.phase = Phase::Ready;
                }
                vec![]
            }

            Command::Resize { width, height } => {
                self.size = Some(fit_page(width, height, self.cover_aspect));
                vec![]
            }

            Command::ToggleFullscreen => {
                // Tracked locally; not synchronized if fullscreen is exited
                // by a mechanism outside this toggle.
                self.fullscreen = !self.fullscreen;
                vec![Effect::ShowControls]
            }

            Command::ToggleSound => {
                self.sound_enabled = !self.sound_enabled;
                if self.sound_enabled {
                    vec![Effect::ShowControls]
                } else {
                    vec![Effect::StopAudio, Effect::ShowControls]
                }
            }

            Command::Interaction => vec![Effect::ShowControls],

            Command::Close => {
                self.phase = Phase::Closed;
                vec![Effect::StopAudio, Effect::SessionEnded]
            }
        }
    }

    fn start_flip(&mut self, target: u32) -> Vec<Effect> {
        let from = self.current_page;
        self.current_page = target;
        self.phase = Phase::Flipping;

        let mut effects = Vec::with_capacity(3);
        if self.sound_enabled {
            effects.push(Effect::PlayFlipCue);
        }
        effects.push(Effect::PageChanged { from, to: target });
        effects.push(Effect::ShowControls);
        effects
    }

    /// URL of the current page, when the list has resolved.
    #[must_use]
    pub fn current_page_url(&self) -> Option<&str> {
        self.page_urls
            .get((self.current_page as usize).saturating_sub(1))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls(n: u32) -> Vec<String> {
        (1..=n).map(|i| format!("u/page-{i:03}.jpg")).collect()
    }

    fn ready_state(pages: u32) -> ViewerState {
        let mut state = ViewerState::new("Spring Catalog");
        let effects = state.apply(Command::Open {
            page_urls: urls(pages),
            total_hint: pages,
            cover_aspect: Some(0.75),
        });
        assert_eq!(effects, vec![Effect::ShowControls]);
        state
    }

    fn cue_count(effects: &[Effect]) -> usize {
        effects.iter().filter(|e| **e == Effect::PlayFlipCue).count()
    }

    #[test]
    fn open_with_pages_goes_ready() {
        let state = ready_state(3);
        assert_eq!(state.phase, Phase::Ready);
        assert_eq!(state.current_page, 1);
        assert_eq!(state.total_pages, 3);
    }

    #[test]
    fn open_without_pages_holds_in_loading() {
        let mut state = ViewerState::new("T");
        state.apply(Command::Open {
            page_urls: vec![],
            total_hint: 12,
            cover_aspect: None,
        });
        assert_eq!(state.phase, Phase::Loading);
        assert_eq!(state.total_pages, 12);

        state.apply(Command::PagesResolved { page_urls: urls(12) });
        assert_eq!(state.phase, Phase::Ready);
        assert_eq!(state.page_urls.len(), 12);
    }

    #[test]
    fn flip_fires_cue_exactly_once_per_transition() {
        let mut state = ready_state(5);
        let effects = state.apply(Command::FlipNext);
        assert_eq!(cue_count(&effects), 1);
        assert!(effects.contains(&Effect::PageChanged { from: 1, to: 2 }));
        assert_eq!(state.phase, Phase::Flipping);

        // No further cue while the animation runs or when it completes.
        assert_eq!(cue_count(&state.apply(Command::FlipNext)), 0);
        assert_eq!(cue_count(&state.apply(Command::AnimationDone)), 0);
        assert_eq!(state.phase, Phase::Ready);
        assert_eq!(state.current_page, 2);
    }

    #[test]
    fn flip_at_boundaries_is_a_no_op() {
        let mut state = ready_state(2);
        assert!(state.apply(Command::FlipPrev).is_empty());

        state.apply(Command::FlipNext);
        state.apply(Command::AnimationDone);
        assert_eq!(state.current_page, 2);
        assert!(state.apply(Command::FlipNext).is_empty());
    }

    #[test]
    fn failed_cue_never_blocks_navigation() {
        // The machine only *requests* a cue; navigation state has already
        // advanced by the time the host plays it.
        let mut state = ready_state(5);
        let effects = state.apply(Command::FlipNext);
        assert!(effects.contains(&Effect::PlayFlipCue));
        assert_eq!(state.current_page, 2);
    }

    #[test]
    fn sound_off_suppresses_cue_but_not_navigation() {
        let mut state = ready_state(5);
        let effects = state.apply(Command::ToggleSound);
        assert!(effects.contains(&Effect::StopAudio));

        let effects = state.apply(Command::FlipNext);
        assert_eq!(cue_count(&effects), 0);
        assert!(effects.contains(&Effect::PageChanged { from: 1, to: 2 }));
    }

    #[test]
    fn direct_navigation_clamps_and_animates() {
        let mut state = ready_state(10);
        let effects = state.apply(Command::GoToPage(99));
        assert!(effects.contains(&Effect::PageChanged { from: 1, to: 10 }));
        assert_eq!(state.phase, Phase::Flipping);

        state.apply(Command::AnimationDone);
        assert!(state.apply(Command::GoToPage(10)).is_empty());
    }

    #[test]
    fn resize_computes_size_once_per_trigger() {
        let mut state = ready_state(3);
        assert!(state.size.is_none());
        state.apply(Command::Resize {
            width: 1300,
            height: 900,
        });
        let (w, h) = state.size.unwrap();
        assert!(w <= 980 && h <= 980);
    }

    #[test]
    fn close_is_terminal_and_ends_the_session() {
        let mut state = ready_state(3);
        let effects = state.apply(Command::Close);
        assert_eq!(effects, vec![Effect::StopAudio, Effect::SessionEnded]);
        assert_eq!(state.phase, Phase::Closed);

        assert!(state.apply(Command::FlipNext).is_empty());
        assert!(state.apply(Command::Close).is_empty());
    }

    #[test]
    fn fullscreen_is_a_local_toggle() {
        let mut state = ready_state(3);
        state.apply(Command::ToggleFullscreen);
        assert!(state.fullscreen);
        state.apply(Command::ToggleFullscreen);
        assert!(!state.fullscreen);
    }

    #[test]
    fn current_page_url_follows_navigation() {
        let mut state = ready_state(3);
        assert_eq!(state.current_page_url(), Some("u/page-001.jpg"));
        state.apply(Command::FlipNext);
        assert_eq!(state.current_page_url(), Some("u/page-002.jpg"));
    }
}
