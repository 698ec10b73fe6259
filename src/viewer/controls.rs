//! Auto-hiding viewer controls.
//!
//! Any interaction makes the controls visible and restarts a fixed
//! inactivity timer; the timer expiring hides them. A new interaction
//! always resets the deadline, so controls never hide mid-interaction.

use std::time::{Duration, Instant};

/// Controls hide after this much inactivity.
pub const HIDE_AFTER: Duration = Duration::from_millis(2500);

#[derive(Debug)]
pub struct ControlsVisibility {
    visible: bool,
    hide_at: Option<Instant>,
}

impl ControlsVisibility {
    /// Controls start visible, with the hide timer running.
    #[must_use]
    pub fn new(now: Instant) -> Self {
        Self {
            visible: true,
            hide_at: Some(now + HIDE_AFTER),
        }
    }

    #[must_use]
    pub fn visible(&self) -> bool {
        self.visible
    }

    /// Mark an interaction: show controls and restart the timer.
    pub fn note_interaction(&mut self, now: Instant) {
        self.visible = true;
        self.hide_at = Some(now + HIDE_AFTER);
    }

    /// Advance time. Returns true when this tick hid the controls.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.hide_at {
            Some(deadline) if self.visible && now >= deadline => {
                self.visible = false;
                self.hide_at = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hides_after_inactivity() {
        let t0 = Instant::now();
        let mut controls = ControlsVisibility::new(t0);
        assert!(controls.visible());

        assert!(!controls.tick(t0 + Duration::from_millis(2499)));
        assert!(controls.visible());

        assert!(controls.tick(t0 + Duration::from_millis(2500)));
        assert!(!controls.visible());
    }

    #[test]
    fn interaction_resets_the_deadline() {
        let t0 = Instant::now();
        let mut controls = ControlsVisibility::new(t0);

        controls.note_interaction(t0 + Duration::from_millis(2000));
        // Old deadline passed, but the reset keeps controls up.
        assert!(!controls.tick(t0 + Duration::from_millis(2600)));
        assert!(controls.visible());

        assert!(controls.tick(t0 + Duration::from_millis(4500)));
        assert!(!controls.visible());
    }

    #[test]
    fn interaction_after_hide_shows_again() {
        let t0 = Instant::now();
        let mut controls = ControlsVisibility::new(t0);
        controls.tick(t0 + HIDE_AFTER);
        assert!(!controls.visible());

        controls.note_interaction(t0 + Duration::from_secs(10));
        assert!(controls.visible());
    }
}
