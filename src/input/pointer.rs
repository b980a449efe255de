use crate::foundation::core::{Point, Vec2, is_finite_point, is_finite_vec};
use crate::foundation::ids::{BlockId, ItemId};
use crate::viewport::transform::ViewportTransform;

/// Host-assigned pointer identifier.
pub type PointerId = i64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Pointer button that triggered a press.
pub enum PointerButton {
    /// Left mouse button, pen tip or touch contact.
    Primary,
    /// Right mouse button.
    Secondary,
    /// Middle button and anything else.
    Auxiliary,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
/// Draggable canvas entity.
pub enum EntityRef {
    /// A generation block.
    Block(BlockId),
    /// A result item card.
    Item(ItemId),
}

#[derive(Clone, Debug, PartialEq)]
/// What lies under the pointer on press, as reported by the host's hit test.
pub enum HitTarget {
    /// Empty canvas.
    Background,
    /// Interactive sub-element (form field, button, panel) that must not start a pan.
    Excluded,
    /// Drag handle of an entity currently at world position `position`.
    DragHandle {
        /// Entity being grabbed.
        entity: EntityRef,
        /// Its committed world position.
        position: Point,
    },
}

#[derive(Clone, Debug, PartialEq)]
/// Raw input delivered by the host, in screen coordinates.
pub enum PointerEvent {
    /// Button pressed.
    Down {
        /// Pointer id.
        pointer: PointerId,
        /// Button.
        button: PointerButton,
        /// Screen position.
        position: Point,
        /// Hit-test result.
        target: HitTarget,
    },
    /// Pointer moved.
    Move {
        /// Pointer id.
        pointer: PointerId,
        /// Screen position.
        position: Point,
    },
    /// Button released.
    Up {
        /// Pointer id.
        pointer: PointerId,
        /// Screen position.
        position: Point,
    },
    /// The platform cancelled the pointer.
    Cancel {
        /// Pointer id.
        pointer: PointerId,
    },
    /// Pointer left the canvas.
    Leave {
        /// Pointer id.
        pointer: PointerId,
    },
    /// Wheel scrolled.
    Wheel {
        /// Vertical wheel delta.
        delta_y: f64,
    },
}

#[derive(Clone, Debug, PartialEq)]
/// Gesture state.
pub enum GestureState {
    /// No gesture.
    Idle,
    /// Canvas pan in progress.
    Panning {
        /// Captured pointer.
        pointer: PointerId,
        /// Screen position at press.
        start_screen: Point,
        /// Transform offset at press.
        start_offset: Vec2,
    },
    /// Entity drag in progress.
    DraggingEntity {
        /// Captured pointer.
        pointer: PointerId,
        /// Entity being dragged.
        entity: EntityRef,
        /// Screen position at press.
        start_screen: Point,
        /// Entity world position at press.
        start_world: Point,
        /// Most recent finite preview position.
        last_valid: Point,
    },
}

#[derive(Clone, Debug, PartialEq)]
/// State change requested by the machine; the owner applies it.
pub enum InteractionEffect {
    /// Set the transform offset (screen space).
    SetOffset(Vec2),
    /// Apply one zoom step with this wheel delta.
    Zoom(f64),
    /// Show the dragged entity at `position` without committing.
    Preview {
        /// Dragged entity.
        entity: EntityRef,
        /// World position.
        position: Point,
    },
    /// Write the entity's authoritative position.
    Commit {
        /// Dragged entity.
        entity: EntityRef,
        /// World position.
        position: Point,
    },
    /// Drop the preview, keeping the committed position.
    Abandon {
        /// Dragged entity.
        entity: EntityRef,
    },
}

/// Pan/drag/zoom input state machine with per-frame coalescing.
///
/// `handle` consumes events immediately; moves and wheel steps are buffered and applied by
/// `on_frame`. Within one frame the last move wins and the first wheel delta wins.
#[derive(Clone, Debug)]
pub struct PointerMachine {
    state: GestureState,
    pending_move: Option<Point>,
    pending_wheel: Option<f64>,
}

impl Default for PointerMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl PointerMachine {
    /// Idle machine.
    pub fn new() -> Self {
        Self {
            state: GestureState::Idle,
            pending_move: None,
            pending_wheel: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> &GestureState {
        &self.state
    }

    /// Pointer holding capture, if any.
    pub fn captured_pointer(&self) -> Option<PointerId> {
        match &self.state {
            GestureState::Idle => None,
            GestureState::Panning { pointer, .. } | GestureState::DraggingEntity { pointer, .. } => {
                Some(*pointer)
            }
        }
    }

    /// `true` when a frame callback has work to do.
    pub fn frame_pending(&self) -> bool {
        self.pending_move.is_some() || self.pending_wheel.is_some()
    }

    /// Drop any gesture and buffered input without emitting effects.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Feed one event. Returns effects that must be applied right away.
    pub fn handle(
        &mut self,
        event: PointerEvent,
        transform: &ViewportTransform,
    ) -> Vec<InteractionEffect> {
        match event {
            PointerEvent::Down {
                pointer,
                button,
                position,
                target,
            } => {
                self.on_down(pointer, button, position, target, transform);
                Vec::new()
            }
            PointerEvent::Move { pointer, position } => {
                if self.captured_pointer() == Some(pointer) {
                    self.pending_move = Some(position);
                }
                Vec::new()
            }
            PointerEvent::Up { pointer, position } => self.on_up(pointer, position, transform),
            PointerEvent::Cancel { pointer } | PointerEvent::Leave { pointer } => {
                self.on_cancel(pointer)
            }
            PointerEvent::Wheel { delta_y } => {
                if self.pending_wheel.is_none() {
                    self.pending_wheel = Some(delta_y);
                }
                Vec::new()
            }
        }
    }

    /// Animation-frame tick: apply the coalesced move and wheel step.
    pub fn on_frame(&mut self, transform: &ViewportTransform) -> Vec<InteractionEffect> {
        let mut out = Vec::new();
        if let Some(delta_y) = self.pending_wheel.take() {
            out.push(InteractionEffect::Zoom(delta_y));
        }
        let Some(current) = self.pending_move.take() else {
            return out;
        };
        match &mut self.state {
            GestureState::Idle => {}
            GestureState::Panning {
                start_screen,
                start_offset,
                ..
            } => {
                if let Some(offset) = pan_offset(*start_screen, *start_offset, current) {
                    out.push(InteractionEffect::SetOffset(offset));
                }
            }
            GestureState::DraggingEntity {
                entity,
                start_screen,
                start_world,
                last_valid,
                ..
            } => {
                if let Some(p) = drag_position(*start_screen, *start_world, current, transform) {
                    *last_valid = p;
                    out.push(InteractionEffect::Preview {
                        entity: entity.clone(),
                        position: p,
                    });
                }
            }
        }
        out
    }

    fn on_down(
        &mut self,
        pointer: PointerId,
        button: PointerButton,
        position: Point,
        target: HitTarget,
        transform: &ViewportTransform,
    ) {
        if button != PointerButton::Primary
            || !matches!(self.state, GestureState::Idle)
            || !is_finite_point(position)
        {
            return;
        }
        self.pending_move = None;
        match target {
            HitTarget::Excluded => {}
            HitTarget::Background => {
                self.state = GestureState::Panning {
                    pointer,
                    start_screen: position,
                    start_offset: transform.offset(),
                };
            }
            HitTarget::DragHandle {
                entity,
                position: world,
            } => {
                if !is_finite_point(world) {
                    return;
                }
                self.state = GestureState::DraggingEntity {
                    pointer,
                    entity,
                    start_screen: position,
                    start_world: world,
                    last_valid: world,
                };
            }
        }
    }

    fn on_up(
        &mut self,
        pointer: PointerId,
        position: Point,
        transform: &ViewportTransform,
    ) -> Vec<InteractionEffect> {
        if self.captured_pointer() != Some(pointer) {
            return Vec::new();
        }
        let state = std::mem::replace(&mut self.state, GestureState::Idle);
        self.pending_move = None;
        match state {
            GestureState::Idle => Vec::new(),
            GestureState::Panning {
                start_screen,
                start_offset,
                ..
            } => pan_offset(start_screen, start_offset, position)
                .map(InteractionEffect::SetOffset)
                .into_iter()
                .collect(),
            GestureState::DraggingEntity {
                entity,
                start_screen,
                start_world,
                last_valid,
                ..
            } => {
                let position = drag_position(start_screen, start_world, position, transform)
                    .unwrap_or(last_valid);
                vec![InteractionEffect::Commit { entity, position }]
            }
        }
    }

    fn on_cancel(&mut self, pointer: PointerId) -> Vec<InteractionEffect> {
        if self.captured_pointer() != Some(pointer) {
            return Vec::new();
        }
        let state = std::mem::replace(&mut self.state, GestureState::Idle);
        self.pending_move = None;
        match state {
            GestureState::DraggingEntity { entity, .. } => {
                vec![InteractionEffect::Abandon { entity }]
            }
            GestureState::Idle | GestureState::Panning { .. } => Vec::new(),
        }
    }
}

fn pan_offset(start_screen: Point, start_offset: Vec2, current: Point) -> Option<Vec2> {
    let next = start_offset + (current - start_screen);
    is_finite_vec(next).then_some(next)
}

fn drag_position(
    start_screen: Point,
    start_world: Point,
    current: Point,
    transform: &ViewportTransform,
) -> Option<Point> {
    let delta = (current - start_screen) / transform.scale;
    if !is_finite_vec(delta) {
        return None;
    }
    let p = start_world + delta;
    is_finite_point(p).then_some(p)
}

#[cfg(test)]
#[path = "../../tests/unit/input/pointer.rs"]
mod tests;
