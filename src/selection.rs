//! Focus tracking. Direct clicks and marquee deltas both funnel into the
//! same focus set.

use crate::model::TaskId;
use std::collections::BTreeSet;

#[derive(Debug, Default)]
pub struct SelectionController {
    focused: BTreeSet<TaskId>,
    marquee: Option<BTreeSet<TaskId>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Press {
    /// Modifier press flipped membership of the pressed task only.
    Toggled,
    /// Plain press; the focus set is ready to be dragged.
    Grabbed,
}

impl SelectionController {
    pub fn is_focused(&self, id: &str) -> bool {
        self.focused.contains(id)
    }

    pub fn focused(&self) -> impl Iterator<Item = &TaskId> {
        self.focused.iter()
    }

    pub fn focused_ids(&self) -> Vec<TaskId> {
        self.focused.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.focused.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.focused.is_empty()
    }

    /// The focused task when exactly one is focused.
    pub fn single(&self) -> Option<&TaskId> {
        if self.focused.len() == 1 {
            self.focused.iter().next()
        } else {
            None
        }
    }

    pub fn focus(&mut self, id: &str) {
        self.focused.insert(id.to_string());
    }

    pub fn toggle(&mut self, id: &str) {
        if !self.focused.remove(id) {
            self.focused.insert(id.to_string());
        }
    }

    pub fn focus_only(&mut self, id: &str) {
        self.focused.clear();
        self.focus(id);
    }

    /// Pointer press on a task.
    pub fn press(&mut self, id: &str, toggle: bool) -> Press {
        if toggle {
            self.toggle(id);
            return Press::Toggled;
        }
        if !self.is_focused(id) {
            self.focus_only(id);
        }
        Press::Grabbed
    }

    /// Drops a task that no longer exists.
    pub fn forget(&mut self, id: &str) {
        self.focused.remove(id);
        if let Some(covered) = self.marquee.as_mut() {
            covered.remove(id);
        }
    }

    pub fn begin_marquee(&mut self) {
        self.focused.clear();
        self.marquee = Some(BTreeSet::new());
    }

    #[cfg(test)]
    pub fn marquee_active(&self) -> bool {
        self.marquee.is_some()
    }

    /// Applies the change between the previously and currently covered sets.
    pub fn update_marquee(&mut self, covered: BTreeSet<TaskId>) {
        let Some(previous) = self.marquee.as_mut() else {
            return;
        };
        for added in covered.difference(previous) {
            self.focused.insert(added.clone());
        }
        for removed in previous.difference(&covered) {
            self.focused.remove(removed);
        }
        *previous = covered;
    }

    pub fn end_marquee(&mut self) {
        self.marquee = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[&str]) -> BTreeSet<TaskId> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn focused(sel: &SelectionController) -> BTreeSet<TaskId> {
        sel.focused().cloned().collect()
    }

    #[test]
    fn plain_press_on_unfocused_task_focuses_only_it() {
        let mut sel = SelectionController::default();
        sel.focus("a");
        sel.focus("b");
        assert_eq!(sel.press("c", false), Press::Grabbed);
        assert_eq!(focused(&sel), set(&["c"]));
    }

    #[test]
    fn plain_press_on_focused_task_keeps_group() {
        let mut sel = SelectionController::default();
        sel.focus("a");
        sel.focus("b");
        sel.press("a", false);
        assert_eq!(focused(&sel), set(&["a", "b"]));
    }

    #[test]
    fn toggling_twice_restores_membership() {
        let mut sel = SelectionController::default();
        sel.focus("a");
        let before = focused(&sel);
        assert_eq!(sel.press("b", true), Press::Toggled);
        assert_eq!(focused(&sel), set(&["a", "b"]));
        sel.press("b", true);
        assert_eq!(focused(&sel), before);
        sel.press("a", true);
        sel.press("a", true);
        assert_eq!(focused(&sel), before);
    }

    #[test]
    fn marquee_follows_covered_set() {
        let mut sel = SelectionController::default();
        sel.focus("z");
        sel.begin_marquee();
        assert!(sel.is_empty());
        sel.update_marquee(set(&["a", "b"]));
        assert_eq!(focused(&sel), set(&["a", "b"]));
        sel.update_marquee(set(&["b"]));
        assert_eq!(focused(&sel), set(&["b"]));
        sel.end_marquee();
        assert!(!sel.marquee_active());
        assert_eq!(focused(&sel), set(&["b"]));
    }

    #[test]
    fn marquee_deltas_do_not_touch_uncovered_focus() {
        let mut sel = SelectionController::default();
        sel.begin_marquee();
        sel.update_marquee(set(&["a"]));
        sel.toggle("x");
        sel.update_marquee(set(&["a", "b"]));
        assert_eq!(focused(&sel), set(&["a", "b", "x"]));
    }

    #[test]
    fn updates_without_marquee_are_ignored() {
        let mut sel = SelectionController::default();
        sel.update_marquee(set(&["a"]));
        assert!(sel.is_empty());
    }

    #[test]
    fn single_requires_exactly_one() {
        let mut sel = SelectionController::default();
        assert!(sel.single().is_none());
        sel.focus("a");
        assert_eq!(sel.single().map(String::as_str), Some("a"));
        sel.focus("b");
        assert!(sel.single().is_none());
        sel.forget("a");
        assert_eq!(sel.len(), 1);
    }
}
