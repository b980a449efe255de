use crate::canvas::block::Block;
use crate::foundation::config::EditorConfig;
use crate::foundation::core::Size;
use crate::viewport::transform::ViewportTransform;

#[derive(Clone, Copy, Debug, PartialEq)]
/// Virtualization thresholds.
pub struct VisibilityRules {
    /// Below this many blocks everything is visible.
    pub min_blocks: usize,
    /// World-space margin around the viewport.
    pub buffer: f64,
    /// Blocks returned when the transform is corrupt.
    pub fail_safe_count: usize,
}

impl Default for VisibilityRules {
    fn default() -> Self {
        Self::from(&EditorConfig::default())
    }
}

impl From<&EditorConfig> for VisibilityRules {
    fn from(cfg: &EditorConfig) -> Self {
        Self {
            min_blocks: cfg.virtualize_min_blocks,
            buffer: cfg.virtualize_buffer,
            fail_safe_count: cfg.virtualize_fail_safe_count,
        }
    }
}

/// Blocks worth rendering for the current view.
///
/// A non-finite transform yields only the first `fail_safe_count` blocks. Small registries are
/// returned whole. Otherwise a block is kept when its position lies strictly inside the visible
/// world rectangle grown by `buffer` on every side.
pub fn visible_blocks<'a>(
    blocks: &'a [Block],
    transform: &ViewportTransform,
    viewport: Size,
    rules: &VisibilityRules,
) -> Vec<&'a Block> {
    if !transform.is_finite() {
        return blocks.iter().take(rules.fail_safe_count).collect();
    }
    if blocks.len() < rules.min_blocks {
        return blocks.iter().collect();
    }
    let area = transform.visible_world_rect(viewport).inflate(rules.buffer, rules.buffer);
    blocks
        .iter()
        .filter(|b| {
            let p = b.position;
            p.x > area.x0 && p.x < area.x1 && p.y > area.y0 && p.y < area.y1
        })
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/canvas/visibility.rs"]
mod tests;
