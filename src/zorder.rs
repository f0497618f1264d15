//! Stacking order.
//!
//! `bring_to_front` is a full relayout: the target gets `n - 1` and every other
//! item is renumbered `0..n - 1` keeping its relative order. It runs only on
//! explicit user command, so there is no incremental variant.

use crate::model::{Position, Task, TaskId};
use std::cmp::Ordering;

pub trait Stacked {
    fn stack_id(&self) -> &str;
    fn zindex(&self) -> u32;
    fn set_zindex(&mut self, zindex: u32);
}

impl Stacked for Task {
    fn stack_id(&self) -> &str {
        &self.id
    }

    fn zindex(&self) -> u32 {
        self.zindex
    }

    fn set_zindex(&mut self, zindex: u32) {
        self.zindex = zindex;
    }
}

/// Returns false (and changes nothing) when `id` is not among `items`.
pub fn bring_to_front<'a, T, I>(items: I, id: &str) -> bool
where
    T: Stacked + 'a,
    I: IntoIterator<Item = &'a mut T>,
{
    let mut items: Vec<&mut T> = items.into_iter().collect();
    let Some(target_idx) = items.iter().position(|item| item.stack_id() == id) else {
        return false;
    };
    let target = items.swap_remove(target_idx);
    items.sort_by(|a, b| stacking_cmp(&**a, &**b));
    let mut next = 0u32;
    for item in items {
        item.set_zindex(next);
        next += 1;
    }
    target.set_zindex(next);
    true
}

/// Order in which a multi-selection is brought forward: ascending `top`, so
/// cards lower on the canvas end up stacked above the ones higher up.
pub fn front_order(mut picks: Vec<(TaskId, Position)>) -> Vec<TaskId> {
    picks.sort_by(|a, b| a.1.top.total_cmp(&b.1.top));
    picks.into_iter().map(|(id, _)| id).collect()
}

/// True when no two items share a zindex.
pub fn is_strict<'a, T: Stacked + 'a>(items: impl IntoIterator<Item = &'a T>) -> bool {
    let mut seen: Vec<u32> = items.into_iter().map(|i| i.zindex()).collect();
    let len = seen.len();
    seen.sort_unstable();
    seen.dedup();
    seen.len() == len
}

fn stacking_cmp<T: Stacked>(a: &T, b: &T) -> Ordering {
    a.zindex()
        .cmp(&b.zindex())
        .then_with(|| a.stack_id().cmp(b.stack_id()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewTask;
    use std::collections::BTreeMap;

    fn stack(entries: &[(&str, u32)]) -> BTreeMap<TaskId, Task> {
        entries
            .iter()
            .map(|(id, z)| {
                (
                    id.to_string(),
                    Task::from_new(id.to_string(), NewTask::default(), *z),
                )
            })
            .collect()
    }

    fn z(tasks: &BTreeMap<TaskId, Task>, id: &str) -> u32 {
        tasks[id].zindex
    }

    #[test]
    fn two_tasks_are_renumbered_densely() {
        let mut tasks = stack(&[("low", 3), ("high", 7)]);
        assert!(bring_to_front(tasks.values_mut(), "low"));
        assert_eq!(z(&tasks, "high"), 0);
        assert_eq!(z(&tasks, "low"), 1);
    }

    #[test]
    fn target_ends_above_everything_and_others_keep_order() {
        let mut tasks = stack(&[("a", 10), ("b", 2), ("c", 5), ("d", 40)]);
        bring_to_front(tasks.values_mut(), "c");
        assert_eq!(z(&tasks, "b"), 0);
        assert_eq!(z(&tasks, "a"), 1);
        assert_eq!(z(&tasks, "d"), 2);
        assert_eq!(z(&tasks, "c"), 3);
        assert!(is_strict(tasks.values()));
    }

    #[test]
    fn duplicate_indices_are_resolved() {
        let mut tasks = stack(&[("a", 1), ("b", 1), ("c", 1)]);
        assert!(!is_strict(tasks.values()));
        bring_to_front(tasks.values_mut(), "a");
        assert!(is_strict(tasks.values()));
        assert_eq!(z(&tasks, "a"), 2);
    }

    #[test]
    fn missing_target_is_a_no_op() {
        let mut tasks = stack(&[("a", 4), ("b", 9)]);
        assert!(!bring_to_front(tasks.values_mut(), "zzz"));
        assert_eq!(z(&tasks, "a"), 4);
        assert_eq!(z(&tasks, "b"), 9);
    }

    #[test]
    fn group_front_stacks_selection_in_top_order() {
        let mut tasks = stack(&[("x", 5), ("y", 1), ("s1", 0), ("s2", 9)]);
        let order = front_order(vec![
            ("s2".to_string(), Position::new(80.0, 0.0)),
            ("s1".to_string(), Position::new(20.0, 0.0)),
        ]);
        assert_eq!(order, vec!["s1".to_string(), "s2".to_string()]);
        for id in &order {
            bring_to_front(tasks.values_mut(), id);
        }
        assert_eq!(z(&tasks, "y"), 0);
        assert_eq!(z(&tasks, "x"), 1);
        assert_eq!(z(&tasks, "s1"), 2);
        assert_eq!(z(&tasks, "s2"), 3);
    }
}
