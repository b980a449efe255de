use crate::foundation::config::EditorConfig;
use crate::foundation::core::{Point, Rect, Size, Vec2, finite_or, is_finite_point};

/// Lower bound of the canvas zoom level.
pub const MIN_SCALE: f64 = 0.4;
/// Upper bound of the canvas zoom level.
pub const MAX_SCALE: f64 = 2.0;
/// Scale delta per unit of wheel `delta_y`.
pub const ZOOM_FACTOR: f64 = 0.001;

/// Pan/zoom state of the canvas.
///
/// `screen = world * scale + (x, y)`. Every setter rejects updates that would leave a non-finite
/// field and keeps the previous value instead, so a committed transform is always usable.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ViewportTransform {
    /// Screen-space horizontal offset.
    pub x: f64,
    /// Screen-space vertical offset.
    pub y: f64,
    /// Zoom level, within `[MIN_SCALE, MAX_SCALE]`.
    pub scale: f64,
}

impl Default for ViewportTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Scale limits applied by [`ViewportTransform::zoom_with`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoomLimits {
    /// Lower bound.
    pub min_scale: f64,
    /// Upper bound.
    pub max_scale: f64,
    /// Wheel delta multiplier.
    pub zoom_factor: f64,
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self {
            min_scale: MIN_SCALE,
            max_scale: MAX_SCALE,
            zoom_factor: ZOOM_FACTOR,
        }
    }
}

impl From<&EditorConfig> for ZoomLimits {
    fn from(cfg: &EditorConfig) -> Self {
        Self {
            min_scale: cfg.min_scale,
            max_scale: cfg.max_scale,
            zoom_factor: cfg.zoom_factor,
        }
    }
}

impl ViewportTransform {
    /// `{0, 0, 1}`.
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        scale: 1.0,
    };

    /// `true` when all three fields are finite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.scale.is_finite()
    }

    /// Translation as a vector.
    pub fn offset(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// Add a screen-space delta to the offset. Returns `false` (and leaves the transform
    /// untouched) when the result would not be finite.
    pub fn pan(&mut self, delta_screen_x: f64, delta_screen_y: f64) -> bool {
        self.set_offset(Vec2::new(self.x + delta_screen_x, self.y + delta_screen_y))
    }

    /// Gesture pan: offset becomes `start_offset + delta_screen`.
    pub fn pan_to(&mut self, start_offset: Vec2, delta_screen: Vec2) -> bool {
        self.set_offset(start_offset + delta_screen)
    }

    /// Overwrite the offset, rejecting non-finite values.
    pub fn set_offset(&mut self, offset: Vec2) -> bool {
        if !(offset.x.is_finite() && offset.y.is_finite()) {
            return false;
        }
        self.x = offset.x;
        self.y = offset.y;
        true
    }

    /// Apply one wheel step with the stock limits.
    pub fn zoom(&mut self, screen_delta_y: f64) -> bool {
        self.zoom_with(screen_delta_y, ZoomLimits::default())
    }

    /// Apply one wheel step: `scale += -delta_y * factor`, clamped. Zoom is anchored at the canvas
    /// origin, so the offset is left as-is.
    pub fn zoom_with(&mut self, screen_delta_y: f64, limits: ZoomLimits) -> bool {
        let raw = self.scale + -screen_delta_y * limits.zoom_factor;
        let next = raw.clamp(limits.min_scale, limits.max_scale);
        if !next.is_finite() {
            return false;
        }
        self.scale = next;
        true
    }

    /// Map a world point to screen space.
    pub fn world_to_screen(&self, p: Point) -> Point {
        Point::new(p.x * self.scale + self.x, p.y * self.scale + self.y)
    }

    /// Map a screen point to world space.
    ///
    /// The committed scale is bounded away from zero; a zero or non-finite scale only reaches
    /// this point through a hand-built transform and falls back to `1.0`.
    pub fn screen_to_world(&self, p: Point) -> Point {
        let scale = self.safe_scale();
        Point::new((p.x - self.x) / scale, (p.y - self.y) / scale)
    }

    /// Convert a screen-space delta to world space.
    pub fn screen_delta_to_world(&self, delta: Vec2) -> Vec2 {
        delta / self.safe_scale()
    }

    /// World-space rectangle covered by a viewport of `size` screen pixels.
    pub fn visible_world_rect(&self, size: Size) -> Rect {
        let top_left = self.screen_to_world(Point::ORIGIN);
        let bottom_right = self.screen_to_world(Point::new(size.width, size.height));
        Rect::from_points(top_left, bottom_right)
    }

    /// Back to `{0, 0, 1}`.
    pub fn reset(&mut self) {
        *self = Self::IDENTITY;
    }

    /// Offset that puts `world` at the center of a `viewport` at the current scale.
    ///
    /// Non-finite components fall back to `0`.
    pub fn centered_on(&self, world: Point, viewport: Size) -> Self {
        Self {
            x: finite_or(-world.x * self.scale + viewport.width / 2.0, 0.0),
            y: finite_or(-world.y * self.scale + viewport.height / 2.0, 0.0),
            scale: self.scale,
        }
    }

    /// Center `world` in `viewport`. Returns `false` when `world` itself is not finite.
    pub fn center_on(&mut self, world: Point, viewport: Size) -> bool {
        if !is_finite_point(world) {
            return false;
        }
        *self = self.centered_on(world, viewport);
        true
    }

    fn safe_scale(&self) -> f64 {
        if self.scale.is_finite() && self.scale != 0.0 {
            self.scale
        } else {
            1.0
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/viewport/transform.rs"]
mod tests;
