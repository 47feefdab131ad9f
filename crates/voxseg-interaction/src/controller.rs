//! The point interaction state machine.

use glam::Vec3;

use voxseg_core::event::EventChannel;

use crate::point_set::{InsertOutcome, PointSet};

/// Default world-space radius for selecting points and detecting contour
/// closure.
pub const DEFAULT_SELECTION_ACCURACY: f32 = 3.5;

/// The states of the interaction controller.
///
/// The controller is reset, not terminated; there is no terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionState {
    /// No interaction in progress.
    #[default]
    Idle,
    /// A point is selected and may be moved or removed.
    PointSelected,
    /// The selected point follows the pointer.
    Dragging,
    /// The whole set follows the pointer.
    DraggingAll,
}

/// Translates discrete pointer actions into point-set mutations.
///
/// The controller owns its [`PointSet`]; collaborators read it through
/// [`point_set`](Self::point_set) but never mutate it directly. Derived
/// events (contour closed, set filled, render refresh) are published on
/// explicit channels.
pub struct PointInteractionController {
    points: PointSet,
    state: InteractionState,
    selection_accuracy: f32,
    drag_anchor: Vec3,
    closed_contour: EventChannel<()>,
    set_filled: EventChannel<()>,
    refresh: EventChannel<()>,
}

impl PointInteractionController {
    /// Creates a controller over an empty, unbounded point set.
    #[must_use]
    pub fn new() -> Self {
        Self::with_point_set(PointSet::new())
    }

    /// Creates a controller over the given (possibly bounded) point set.
    #[must_use]
    pub fn with_point_set(points: PointSet) -> Self {
        Self {
            points,
            state: InteractionState::Idle,
            selection_accuracy: DEFAULT_SELECTION_ACCURACY,
            drag_anchor: Vec3::ZERO,
            closed_contour: EventChannel::new(),
            set_filled: EventChannel::new(),
            refresh: EventChannel::new(),
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> InteractionState {
        self.state
    }

    /// Returns the owned point set.
    #[must_use]
    pub fn point_set(&self) -> &PointSet {
        &self.points
    }

    /// Returns the selection/closure radius in world units.
    #[must_use]
    pub fn selection_accuracy(&self) -> f32 {
        self.selection_accuracy
    }

    /// Sets the selection/closure radius in world units.
    pub fn set_selection_accuracy(&mut self, accuracy: f32) {
        self.selection_accuracy = accuracy;
    }

    /// Channel fired when an add-attempt closes the contour.
    pub fn closed_contour_events(&mut self) -> &mut EventChannel<()> {
        &mut self.closed_contour
    }

    /// Channel fired when a bounded set reaches its maximum.
    pub fn set_filled_events(&mut self) -> &mut EventChannel<()> {
        &mut self.set_filled
    }

    /// Channel fired after any point-set mutation, requesting a redraw.
    pub fn refresh_events(&mut self) -> &mut EventChannel<()> {
        &mut self.refresh
    }

    /// Attempts to add a point at a world position.
    ///
    /// With at least three points present, a position within the selection
    /// accuracy of the first point closes the contour instead of adding a
    /// duplicate. Returns true if a point was added or overwritten.
    pub fn add_point(&mut self, position: Vec3) -> bool {
        if self.is_closing_position(position) {
            self.closed_contour.publish(&());
            return false;
        }

        match self.points.insert(position) {
            InsertOutcome::Appended(index) | InsertOutcome::Overwrote(index) => {
                // insert() bound-checked the index already
                let _ = self.points.select(index);
                self.state = InteractionState::PointSelected;
                if self.points.is_full() {
                    self.set_filled.publish(&());
                }
                self.refresh.publish(&());
                true
            }
            InsertOutcome::Rejected => {
                log::debug!("point set is full, dropping point at {position}");
                false
            }
        }
    }

    /// Returns true if adding at `position` would close the contour.
    #[must_use]
    pub fn is_closing_position(&self, position: Vec3) -> bool {
        self.points.len() >= 3
            && self
                .points
                .point(0)
                .is_some_and(|first| first.distance(position) < self.selection_accuracy)
    }

    /// Removes the point at an index.
    ///
    /// Out-of-range indices are reported and ignored. When points remain,
    /// the first one becomes the new selection.
    pub fn remove_point(&mut self, index: usize) {
        match self.points.remove(index) {
            Ok(_) => {
                if self.points.is_empty() {
                    self.state = InteractionState::Idle;
                } else {
                    let _ = self.points.select(0);
                    self.state = InteractionState::PointSelected;
                }
                self.refresh.publish(&());
            }
            Err(err) => log::warn!("cannot remove point: {err}"),
        }
    }

    /// Selects the point at an index. Invalid indices are reported and
    /// ignored; on an empty set this is a no-op.
    pub fn select_point(&mut self, index: usize) {
        if self.points.is_empty() {
            return;
        }
        match self.points.select(index) {
            Ok(()) => self.state = InteractionState::PointSelected,
            Err(err) => log::warn!("cannot select point: {err}"),
        }
    }

    /// Selects the point nearest to a world position within the selection
    /// accuracy. Returns the selected index, if any.
    pub fn select_point_near(&mut self, position: Vec3) -> Option<usize> {
        let index = self
            .points
            .nearest_within(position, self.selection_accuracy)?;
        self.select_point(index);
        Some(index)
    }

    /// Clears the selection and returns to `Idle`.
    pub fn unselect_point(&mut self) {
        self.points.unselect();
        self.state = InteractionState::Idle;
    }

    /// Starts dragging the point at an index, recording its current
    /// position as the drag anchor.
    pub fn init_move(&mut self, index: usize) {
        match self.points.point(index) {
            Some(position) => {
                let _ = self.points.select(index);
                self.drag_anchor = position;
                self.state = InteractionState::Dragging;
            }
            None => log::warn!(
                "cannot start move: index {index} out of range (set has {} points)",
                self.points.len()
            ),
        }
    }

    /// Moves the dragged point to a new world position.
    pub fn move_point(&mut self, position: Vec3) {
        if self.state != InteractionState::Dragging {
            return;
        }
        if let Some(index) = self.points.selected_index() {
            let _ = self.points.set_point(index, position);
            self.drag_anchor = position;
            self.refresh.publish(&());
        }
    }

    /// Ends a drag, keeping the moved coordinates.
    pub fn finish_move(&mut self) {
        if matches!(
            self.state,
            InteractionState::Dragging | InteractionState::DraggingAll
        ) {
            self.state = if self.points.selected_index().is_some() {
                InteractionState::PointSelected
            } else {
                InteractionState::Idle
            };
        }
    }

    /// Starts dragging the whole set, anchored at a reference position.
    pub fn init_move_all(&mut self, reference: Vec3) {
        self.drag_anchor = reference;
        self.state = InteractionState::DraggingAll;
    }

    /// Translates every point by the delta from the anchor to `position`.
    pub fn move_set(&mut self, position: Vec3) {
        if self.state != InteractionState::DraggingAll {
            return;
        }
        let delta = position - self.drag_anchor;
        self.points.translate_all(delta);
        self.drag_anchor = position;
        self.refresh.publish(&());
    }

    /// Returns unconditionally to `Idle`, dropping selection and any
    /// in-progress drag.
    pub fn abort(&mut self) {
        self.points.unselect();
        self.state = InteractionState::Idle;
    }

    /// Clears the point set and returns to `Idle`. Called at session start
    /// and end.
    pub fn reset(&mut self) {
        self.points.clear();
        self.state = InteractionState::Idle;
    }
}

impl Default for PointInteractionController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_add_selects_new_point() {
        let mut controller = PointInteractionController::new();
        assert!(controller.add_point(Vec3::new(1.0, 2.0, 3.0)));
        assert_eq!(controller.state(), InteractionState::PointSelected);
        assert_eq!(controller.point_set().selected_index(), Some(0));
        assert_eq!(controller.point_set().len(), 1);
    }

    #[test]
    fn test_single_point_controller_overwrites() {
        let mut controller = PointInteractionController::with_point_set(PointSet::single_point());
        controller.add_point(Vec3::new(1.0, 2.0, 3.0));
        controller.add_point(Vec3::new(40.0, 50.0, 60.0));
        assert_eq!(controller.point_set().len(), 1);
        assert_eq!(
            controller.point_set().point(0),
            Some(Vec3::new(40.0, 50.0, 60.0))
        );
    }

    #[test]
    fn test_closed_contour_detection() {
        let fired = Rc::new(Cell::new(0));
        let sink = fired.clone();

        let mut controller = PointInteractionController::new();
        controller
            .closed_contour_events()
            .subscribe(move |(): &()| sink.set(sink.get() + 1));

        controller.add_point(Vec3::new(0.0, 0.0, 0.0));
        controller.add_point(Vec3::new(10.0, 0.0, 0.0));
        controller.add_point(Vec3::new(10.0, 10.0, 0.0));

        // Within the accuracy radius of point 0: closes, does not add.
        assert!(!controller.add_point(Vec3::new(1.0, 0.0, 0.0)));
        assert_eq!(controller.point_set().len(), 3);
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn test_no_closure_below_three_points() {
        let fired = Rc::new(Cell::new(0));
        let sink = fired.clone();

        let mut controller = PointInteractionController::new();
        controller
            .closed_contour_events()
            .subscribe(move |(): &()| sink.set(sink.get() + 1));

        controller.add_point(Vec3::ZERO);
        controller.add_point(Vec3::new(10.0, 0.0, 0.0));
        // Near point 0, but only two points so it is a regular add.
        assert!(controller.add_point(Vec3::new(0.5, 0.0, 0.0)));
        assert_eq!(fired.get(), 0);
        assert_eq!(controller.point_set().len(), 3);
    }

    #[test]
    fn test_set_filled_event() {
        let fired = Rc::new(Cell::new(false));
        let sink = fired.clone();

        let mut controller = PointInteractionController::with_point_set(PointSet::bounded(
            2,
            crate::point_set::BoundedInsertPolicy::Reject,
        ));
        controller
            .set_filled_events()
            .subscribe(move |(): &()| sink.set(true));

        controller.add_point(Vec3::ZERO);
        assert!(!fired.get());
        controller.add_point(Vec3::X);
        assert!(fired.get());
    }

    #[test]
    fn test_remove_out_of_range_is_recoverable() {
        let mut controller = PointInteractionController::new();
        controller.add_point(Vec3::ZERO);
        controller.remove_point(5);
        assert_eq!(controller.point_set().len(), 1);
        controller.remove_point(0);
        assert!(controller.point_set().is_empty());
        assert_eq!(controller.state(), InteractionState::Idle);
    }

    #[test]
    fn test_remove_selects_first_remaining() {
        let mut controller = PointInteractionController::new();
        controller.add_point(Vec3::ZERO);
        controller.add_point(Vec3::new(10.0, 0.0, 0.0));
        controller.add_point(Vec3::new(20.0, 0.0, 0.0));
        controller.remove_point(1);
        assert_eq!(controller.point_set().selected_index(), Some(0));
        assert_eq!(controller.state(), InteractionState::PointSelected);
    }

    #[test]
    fn test_drag_cycle() {
        let mut controller = PointInteractionController::new();
        controller.add_point(Vec3::ZERO);
        controller.add_point(Vec3::new(10.0, 0.0, 0.0));

        controller.init_move(1);
        assert_eq!(controller.state(), InteractionState::Dragging);
        controller.move_point(Vec3::new(12.0, 3.0, 0.0));
        controller.finish_move();

        assert_eq!(controller.state(), InteractionState::PointSelected);
        assert_eq!(
            controller.point_set().point(1),
            Some(Vec3::new(12.0, 3.0, 0.0))
        );
        // The other point is untouched.
        assert_eq!(controller.point_set().point(0), Some(Vec3::ZERO));
    }

    #[test]
    fn test_move_point_ignored_outside_drag() {
        let mut controller = PointInteractionController::new();
        controller.add_point(Vec3::ZERO);
        controller.move_point(Vec3::new(5.0, 5.0, 5.0));
        assert_eq!(controller.point_set().point(0), Some(Vec3::ZERO));
    }

    #[test]
    fn test_move_set_translates_uniformly() {
        let mut controller = PointInteractionController::new();
        controller.add_point(Vec3::ZERO);
        controller.add_point(Vec3::new(10.0, 0.0, 0.0));

        controller.init_move_all(Vec3::new(5.0, 0.0, 0.0));
        controller.move_set(Vec3::new(5.0, 2.0, 0.0));
        controller.move_set(Vec3::new(6.0, 2.0, 0.0));
        controller.finish_move();

        assert_eq!(controller.point_set().point(0), Some(Vec3::new(1.0, 2.0, 0.0)));
        assert_eq!(
            controller.point_set().point(1),
            Some(Vec3::new(11.0, 2.0, 0.0))
        );
    }

    #[test]
    fn test_abort_returns_to_idle() {
        let mut controller = PointInteractionController::new();
        controller.add_point(Vec3::ZERO);
        controller.init_move(0);
        controller.abort();
        assert_eq!(controller.state(), InteractionState::Idle);
        assert_eq!(controller.point_set().selected_index(), None);
        // The set itself survives an abort.
        assert_eq!(controller.point_set().len(), 1);
    }

    #[test]
    fn test_select_on_empty_set_is_noop() {
        let mut controller = PointInteractionController::new();
        controller.select_point(0);
        assert_eq!(controller.state(), InteractionState::Idle);
    }

    #[test]
    fn test_select_point_near() {
        let mut controller = PointInteractionController::new();
        controller.add_point(Vec3::ZERO);
        controller.add_point(Vec3::new(10.0, 0.0, 0.0));
        controller.unselect_point();

        assert_eq!(controller.select_point_near(Vec3::new(9.0, 0.0, 0.0)), Some(1));
        assert_eq!(controller.point_set().selected_index(), Some(1));
        assert_eq!(controller.select_point_near(Vec3::new(100.0, 0.0, 0.0)), None);
    }
}
