//! Responsive page sizing.
//!
//! Pure function from viewport dimensions and cover aspect ratio to a
//! display size. Narrow viewports get a larger relative ratio with a
//! smaller absolute cap; wide viewports the opposite. The result is the
//! smaller of the width-constrained and height-constrained candidates, so
//! neither dimension exceeds its cap. Recomputed only on explicit resize
//! triggers, not continuously.

/// One viewport-width band.
struct Breakpoint {
    /// Band applies to viewports strictly narrower than this.
    max_viewport_width: u32,
    /// Fraction of the viewport the page may occupy.
    ratio: f32,
    /// Absolute cap on either page dimension, in the same units as the
    /// viewport.
    max_dimension: u32,
}

const BREAKPOINTS: [Breakpoint; 4] = [
    Breakpoint {
        max_viewport_width: 600,
        ratio: 0.95,
        max_dimension: 540,
    },
    Breakpoint {
        max_viewport_width: 900,
        ratio: 0.85,
        max_dimension: 680,
    },
    Breakpoint {
        max_viewport_width: 1200,
        ratio: 0.75,
        max_dimension: 820,
    },
    Breakpoint {
        max_viewport_width: u32::MAX,
        ratio: 0.65,
        max_dimension: 980,
    },
];

fn breakpoint_for(viewport_width: u32) -> &'static Breakpoint {
    BREAKPOINTS
        .iter()
        .find(|bp| viewport_width < bp.max_viewport_width)
        .unwrap_or(&BREAKPOINTS[BREAKPOINTS.len() - 1])
}

/// Compute the display size for a page with width/height ratio `aspect`
/// inside a `viewport_width` x `viewport_height` viewport.
#[must_use]
pub fn fit_page(viewport_width: u32, viewport_height: u32, aspect: f32) -> (u32, u32) {
    // A degenerate aspect would divide by zero; fall back to portrait 3:4.
    let aspect = if aspect.is_finite() && aspect > 0.01 {
        aspect
    } else {
        0.75
    };

    let bp = breakpoint_for(viewport_width);

    let width_candidate = (viewport_width as f32 * bp.ratio).min(bp.max_dimension as f32);
    let height_candidate = (viewport_height as f32 * bp.ratio).min(bp.max_dimension as f32);

    // Width implied by the height candidate, preserving the aspect ratio.
    let width_from_height = height_candidate * aspect;
    let width = width_candidate.min(width_from_height);
    let height = width / aspect;

    (width.round() as u32, height.round() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_viewport_respects_cap_and_aspect() {
        let (w, h) = fit_page(1300, 900, 0.75);
        let bp_cap = 980;
        assert!(w <= bp_cap, "width {w} exceeds cap");
        assert!(h <= bp_cap, "height {h} exceeds cap");
        // height = width / aspect within rounding of one unit
        let expected_h = w as f32 / 0.75;
        assert!((h as f32 - expected_h).abs() <= 1.0, "h={h} expected~{expected_h}");
    }

    #[test]
    fn narrow_viewport_uses_larger_ratio() {
        let (w, _) = fit_page(400, 800, 0.75);
        // 95% of a 400-wide viewport, not height-bound here
        assert_eq!(w, 380);
    }

    #[test]
    fn cap_binds_on_huge_viewports() {
        let (w, h) = fit_page(4000, 4000, 1.0);
        assert_eq!(w, 980);
        assert_eq!(h, 980);
    }

    #[test]
    fn landscape_aspect_is_width_bound() {
        let (w, h) = fit_page(1000, 400, 1.5);
        // Height candidate: 400 * 0.75 = 300 -> width 450; width candidate 750.
        assert_eq!(w, 450);
        assert_eq!(h, 300);
    }

    #[test]
    fn degenerate_aspect_falls_back() {
        let (w, h) = fit_page(1300, 900, 0.0);
        assert!(w > 0 && h > 0);
        let (w2, h2) = fit_page(1300, 900, f32::NAN);
        assert_eq!((w, h), (w2, h2));
    }

    #[test]
    fn band_edges_select_the_wider_band() {
        // Exactly 600 falls in the 600..900 band.
        let narrow = breakpoint_for(599);
        let mid = breakpoint_for(600);
        assert_eq!(narrow.max_dimension, 540);
        assert_eq!(mid.max_dimension, 680);
    }
}
