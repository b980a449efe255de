use std::path::Path;

use anyhow::Context;

use crate::foundation::error::{CanvasError, CanvasResult};

/// Tunable constants of the canvas engine.
///
/// Defaults reproduce the stock editor behaviour. Hosts may load overrides from JSON; missing
/// fields keep their defaults.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// Lower scale bound.
    pub min_scale: f64,
    /// Upper scale bound.
    pub max_scale: f64,
    /// Multiplier turning wheel `delta_y` into a scale delta.
    pub zoom_factor: f64,
    /// Horizontal gap used when appending a block after the last one.
    pub block_spacing_x: f64,
    /// Offset applied to duplicated blocks (both axes).
    pub duplicate_offset: f64,
    /// Position of the first block appended to an empty registry.
    pub first_block_position: (f64, f64),
    /// Maximum number of extra reference slots per block.
    pub max_extra_refs: usize,
    /// Result offset to the right of the anchor block on wide viewports.
    pub result_offset_wide: f64,
    /// Result offset below the anchor block on narrow viewports.
    pub result_offset_narrow: f64,
    /// Viewport width at or above which the layout counts as wide.
    pub wide_breakpoint: f64,
    /// Per-axis distance under which two result items collide.
    pub collision_threshold: f64,
    /// Horizontal shift applied per collision.
    pub collision_shift: f64,
    /// Maximum number of collision shifts.
    pub collision_max_attempts: u32,
    /// Per-file offset for drop uploads (both axes).
    pub drop_stagger: f64,
    /// Registry size below which virtualization is skipped.
    pub virtualize_min_blocks: usize,
    /// World-space margin added around the viewport.
    pub virtualize_buffer: f64,
    /// Blocks returned when the transform is corrupt.
    pub virtualize_fail_safe_count: usize,
    /// Display-history ids kept on save.
    pub history_retention: usize,
    /// Result items kept on save.
    pub item_retention: usize,
    /// Result items kept when a save hits the storage quota.
    pub item_retention_degraded: usize,
    /// Delay between the last change and the save, in milliseconds.
    pub save_debounce_ms: u64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.4,
            max_scale: 2.0,
            zoom_factor: 0.001,
            block_spacing_x: 450.0,
            duplicate_offset: 50.0,
            first_block_position: (200.0, 300.0),
            max_extra_refs: 4,
            result_offset_wide: 440.0,
            result_offset_narrow: 650.0,
            wide_breakpoint: 1024.0,
            collision_threshold: 50.0,
            collision_shift: 340.0,
            collision_max_attempts: 10,
            drop_stagger: 20.0,
            virtualize_min_blocks: 10,
            virtualize_buffer: 1500.0,
            virtualize_fail_safe_count: 2,
            history_retention: 50,
            item_retention: 50,
            item_retention_degraded: 10,
            save_debounce_ms: 2000,
        }
    }
}

impl EditorConfig {
    /// Validate ranges that the engine relies on.
    pub fn validate(&self) -> CanvasResult<()> {
        if !(self.min_scale.is_finite() && self.max_scale.is_finite()) || self.min_scale <= 0.0 {
            return Err(CanvasError::validation(
                "scale bounds must be finite and min_scale > 0",
            ));
        }
        if self.min_scale > self.max_scale {
            return Err(CanvasError::validation("min_scale must be <= max_scale"));
        }
        for (name, value) in [
            ("zoomFactor", self.zoom_factor),
            ("blockSpacingX", self.block_spacing_x),
            ("duplicateOffset", self.duplicate_offset),
            ("resultOffsetWide", self.result_offset_wide),
            ("resultOffsetNarrow", self.result_offset_narrow),
            ("wideBreakpoint", self.wide_breakpoint),
            ("collisionThreshold", self.collision_threshold),
            ("collisionShift", self.collision_shift),
            ("dropStagger", self.drop_stagger),
            ("virtualizeBuffer", self.virtualize_buffer),
        ] {
            if !value.is_finite() {
                return Err(CanvasError::validation(format!("{name} must be finite")));
            }
        }
        if self.item_retention_degraded > self.item_retention {
            return Err(CanvasError::validation(
                "itemRetentionDegraded must be <= itemRetention",
            ));
        }
        Ok(())
    }

    /// Load a JSON config file and validate it.
    pub fn from_json_file(path: &Path) -> CanvasResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_str(&text)?;
        cfg.validate()?;
        Ok(cfg)
    }
}
