//! Pointer drag of the focused tasks: `Idle -> Dragging -> Settling -> Idle`.

use crate::model::{Position, TaskId};
use crate::position::{Screen, Viewport};
use crate::scroll::Scroller;

#[derive(Debug, Clone, PartialEq)]
pub struct Gesture {
    origin: Position,
    starts: Vec<(TaskId, Position)>,
    auto_scrolled: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(Gesture),
    Settling,
}

#[derive(Debug, Default)]
pub struct DragController {
    state: DragState,
}

impl DragController {
    #[cfg(test)]
    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging(_))
    }

    /// Starts a gesture at `pointer` (canvas percent) for the given tasks and
    /// their current positions.
    pub fn begin(&mut self, pointer: Position, tasks: Vec<(TaskId, Position)>) {
        self.state = DragState::Dragging(Gesture {
            origin: pointer,
            starts: tasks,
            auto_scrolled: false,
        });
    }

    /// Unclamped positions for every dragged task; all share the same delta.
    pub fn positions_at(&self, pointer: Position) -> Vec<(TaskId, Position)> {
        let DragState::Dragging(gesture) = &self.state else {
            return Vec::new();
        };
        let d_top = pointer.top - gesture.origin.top;
        let d_left = pointer.left - gesture.origin.left;
        gesture
            .starts
            .iter()
            .map(|(id, start)| (id.clone(), start.offset(d_top, d_left)))
            .collect()
    }

    /// Screen to scroll to when the pointer (viewport row `y`) sits on the
    /// edge facing the other screen. Fires at most once per gesture and never
    /// while a scroll is in flight.
    pub fn auto_scroll_target(
        &mut self,
        y: f64,
        viewport: &Viewport,
        scroller: &Scroller,
    ) -> Option<Screen> {
        let DragState::Dragging(gesture) = &mut self.state else {
            return None;
        };
        if gesture.auto_scrolled || scroller.in_flight() {
            return None;
        }
        let target = if viewport.at_bottom_edge(y) && !viewport.is_scrolled() {
            Screen::Stock
        } else if viewport.at_top_edge(y) && viewport.is_scrolled() {
            Screen::Main
        } else {
            return None;
        };
        gesture.auto_scrolled = true;
        Some(target)
    }

    /// Ends the gesture, running `settle` for each dragged task while in the
    /// `Settling` state. Returns the settled ids.
    pub fn release(&mut self, mut settle: impl FnMut(&TaskId)) -> Vec<TaskId> {
        let DragState::Dragging(gesture) = std::mem::replace(&mut self.state, DragState::Settling)
        else {
            self.state = DragState::Idle;
            return Vec::new();
        };
        let ids: Vec<TaskId> = gesture.starts.into_iter().map(|(id, _)| id).collect();
        for id in &ids {
            settle(id);
        }
        self.state = DragState::Idle;
        ids
    }

    /// Drops a task from the gesture, e.g. when it is deleted mid-drag.
    pub fn forget(&mut self, id: &str) {
        if let DragState::Dragging(gesture) = &mut self.state {
            gesture.starts.retain(|(task, _)| task != id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start(drag: &mut DragController) {
        drag.begin(
            Position::new(50.0, 50.0),
            vec![
                ("a".to_string(), Position::new(10.0, 20.0)),
                ("b".to_string(), Position::new(40.0, 70.0)),
            ],
        );
    }

    #[test]
    fn moves_follow_pointer_delta_without_clamping() {
        let mut drag = DragController::default();
        start(&mut drag);
        let moved = drag.positions_at(Position::new(-30.0, 95.0));
        assert_eq!(moved[0].1, Position::new(-70.0, 65.0));
        assert_eq!(moved[1].1, Position::new(-40.0, 115.0));
    }

    #[test]
    fn relative_offset_is_preserved() {
        let mut drag = DragController::default();
        start(&mut drag);
        let moved = drag.positions_at(Position::new(57.5, 41.0));
        let (a, b) = (moved[0].1, moved[1].1);
        assert_eq!(a.top - b.top, 10.0 - 40.0);
        assert_eq!(a.left - b.left, 20.0 - 70.0);
    }

    #[test]
    fn release_settles_each_task_then_idles() {
        let mut drag = DragController::default();
        start(&mut drag);
        let mut seen = Vec::new();
        let ids = drag.release(|id| seen.push(id.clone()));
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(seen, ids);
        assert_eq!(drag.state(), &DragState::Idle);
        assert!(drag.positions_at(Position::new(0.0, 0.0)).is_empty());
    }

    #[test]
    fn release_without_gesture_is_harmless() {
        let mut drag = DragController::default();
        assert!(drag.release(|_| panic!("nothing to settle")).is_empty());
    }

    #[test]
    fn auto_scroll_triggers_at_most_once_per_drag() {
        let viewport = Viewport::new(80, 20);
        let scroller = Scroller::default();
        let mut drag = DragController::default();
        start(&mut drag);
        assert_eq!(drag.auto_scroll_target(5.0, &viewport, &scroller), None);
        assert_eq!(
            drag.auto_scroll_target(19.0, &viewport, &scroller),
            Some(Screen::Stock)
        );
        assert_eq!(drag.auto_scroll_target(19.0, &viewport, &scroller), None);
        start(&mut drag);
        assert_eq!(
            drag.auto_scroll_target(19.0, &viewport, &scroller),
            Some(Screen::Stock)
        );
    }

    #[test]
    fn auto_scroll_respects_direction_and_latch() {
        let mut viewport = Viewport::new(80, 20);
        let mut scroller = Scroller::default();
        let mut drag = DragController::default();
        start(&mut drag);
        assert_eq!(drag.auto_scroll_target(0.0, &viewport, &scroller), None);
        viewport.screen = Screen::Stock;
        assert_eq!(drag.auto_scroll_target(19.0, &viewport, &scroller), None);
        scroller.request(Screen::Main);
        assert_eq!(drag.auto_scroll_target(0.0, &viewport, &scroller), None);
        scroller.observe(Screen::Main);
        assert_eq!(
            drag.auto_scroll_target(0.0, &viewport, &scroller),
            Some(Screen::Main)
        );
    }
}
