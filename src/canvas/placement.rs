use crate::canvas::items::ResultItem;
use crate::foundation::config::EditorConfig;
use crate::foundation::core::{Point, Vec2};
use crate::viewport::transform::ViewportTransform;

#[derive(Clone, Copy, Debug, PartialEq)]
/// Constants of result auto-placement.
pub struct PlacementRules {
    /// Offset to the right of the anchor on wide viewports.
    pub offset_wide: f64,
    /// Offset below the anchor on narrow viewports.
    pub offset_narrow: f64,
    /// Width at which the viewport counts as wide.
    pub wide_breakpoint: f64,
    /// Per-axis collision distance (strict).
    pub collision_threshold: f64,
    /// Rightward shift per collision.
    pub collision_shift: f64,
    /// Shift budget.
    pub max_attempts: u32,
    /// Diagonal stagger between files of one drop.
    pub drop_stagger: f64,
}

impl Default for PlacementRules {
    fn default() -> Self {
        Self::from(&EditorConfig::default())
    }
}

impl From<&EditorConfig> for PlacementRules {
    fn from(cfg: &EditorConfig) -> Self {
        Self {
            offset_wide: cfg.result_offset_wide,
            offset_narrow: cfg.result_offset_narrow,
            wide_breakpoint: cfg.wide_breakpoint,
            collision_threshold: cfg.collision_threshold,
            collision_shift: cfg.collision_shift,
            max_attempts: cfg.collision_max_attempts,
            drop_stagger: cfg.drop_stagger,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
/// Chosen position and how many shifts it took.
pub struct Placement {
    /// World position.
    pub position: Point,
    /// Collision shifts applied.
    pub shifts: u32,
}

/// Position for a new result anchored at `anchor` (the origin when the block is gone).
///
/// The candidate sits right of the anchor on wide viewports and below it otherwise, then moves
/// right while any existing item lies strictly within the threshold on both axes. After
/// `max_attempts` shifts the candidate is accepted even if it still collides.
pub fn place_result(
    anchor: Option<Point>,
    viewport_width: f64,
    existing: &[ResultItem],
    rules: &PlacementRules,
) -> Placement {
    let anchor = anchor.unwrap_or(Point::ORIGIN);
    let mut candidate = if viewport_width >= rules.wide_breakpoint {
        Point::new(anchor.x + rules.offset_wide, anchor.y)
    } else {
        Point::new(anchor.x, anchor.y + rules.offset_narrow)
    };

    let mut shifts = 0;
    while shifts < rules.max_attempts && collides(candidate, existing, rules.collision_threshold) {
        candidate.x += rules.collision_shift;
        shifts += 1;
    }
    Placement {
        position: candidate,
        shifts,
    }
}

fn collides(candidate: Point, existing: &[ResultItem], threshold: f64) -> bool {
    existing.iter().any(|item| {
        let p = item.position_or_origin();
        (p.x - candidate.x).abs() < threshold && (p.y - candidate.y).abs() < threshold
    })
}

/// World positions for files dropped at screen point `drop`: `screen_to_world(drop)` staggered
/// diagonally per file.
pub fn place_dropped(
    drop: Point,
    count: usize,
    transform: &ViewportTransform,
    rules: &PlacementRules,
) -> Vec<Point> {
    let origin = transform.screen_to_world(drop);
    (0..count)
        .map(|i| {
            let step = i as f64 * rules.drop_stagger;
            origin + Vec2::new(step, step)
        })
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/canvas/placement.rs"]
mod tests;
