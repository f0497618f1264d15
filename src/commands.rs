use crate::config::Settings;
use crate::model::{BoardError, NewTask, Position, Task, TaskColor, TaskPatch};
use crate::position::{self, EDGE_MARGIN};
use crate::store::{init_project_store, locate_store, open_store, FileStore, StoreLocation, TaskStore};
use crate::transfer::{export_json, import_into};
use crate::ui;
use anyhow::{bail, Context, Result};
use log::info;
use std::env;
use std::fs;
use std::path::Path;

pub fn init() -> Result<()> {
    let location = init_project_store()?;
    println!("Initialized task store at {}", location.path.display());
    Ok(())
}

pub fn list() -> Result<()> {
    let (store, location) = open_current_store()?;
    let mut tasks = store.list()?;
    tasks.sort_by_key(|t| t.zindex);
    println!(
        "Tasks: {} ({}, {})",
        tasks.len(),
        location.scope.label(),
        store.path().display()
    );
    if tasks.is_empty() {
        println!("  (empty)");
    }
    for task in &tasks {
        print_task(task);
    }
    Ok(())
}

pub fn add(
    text: String,
    top: Option<f64>,
    left: Option<f64>,
    color: Option<String>,
) -> Result<()> {
    let (mut store, _) = open_current_store()?;
    let color = parse_color(color.as_deref())?.unwrap_or_default();
    let position = settle(Position::new(
        top.unwrap_or(EDGE_MARGIN),
        left.unwrap_or(EDGE_MARGIN),
    ));
    let task = store.create(NewTask {
        position,
        color,
        text,
    })?;
    info!("event=cli_add id={}", task.id);
    println!("Added task {} (z {})", task.id, task.zindex);
    Ok(())
}

pub fn edit(
    task_id: String,
    text: Option<String>,
    color: Option<String>,
    top: Option<f64>,
    left: Option<f64>,
) -> Result<()> {
    let (mut store, _) = open_current_store()?;
    let current = find_task(&store, &task_id)?;
    let mut patch = TaskPatch {
        text,
        color: parse_color(color.as_deref())?,
        position: None,
    };
    if top.is_some() || left.is_some() {
        patch.position = Some(settle(Position::new(
            top.unwrap_or(current.position.top),
            left.unwrap_or(current.position.left),
        )));
    }
    if patch.is_empty() {
        bail!("nothing to change; pass --text, --color, --top or --left");
    }
    store
        .update(&task_id, &patch)
        .with_context(|| format!("updating task {}", task_id))?;
    println!("Updated task {}", task_id);
    Ok(())
}

pub fn delete(task_id: String) -> Result<()> {
    let (mut store, _) = open_current_store()?;
    store
        .delete(&task_id)
        .with_context(|| format!("deleting task {}", task_id))?;
    info!("event=cli_delete id={}", task_id);
    println!("Deleted task {}", task_id);
    Ok(())
}

pub fn front(task_id: String) -> Result<()> {
    let (mut store, _) = open_current_store()?;
    store
        .reorder_to_front(&task_id)
        .with_context(|| format!("bringing task {} to front", task_id))?;
    println!("Brought task {} to front", task_id);
    Ok(())
}

pub fn export(path: &Path) -> Result<()> {
    let (store, _) = open_current_store()?;
    let tasks = store.list()?;
    let json = export_json(&tasks)?;
    fs::write(path, json).with_context(|| format!("writing {:?}", path))?;
    println!("Exported {} tasks to {}", tasks.len(), path.display());
    Ok(())
}

pub fn import(path: &Path) -> Result<()> {
    let (mut store, _) = open_current_store()?;
    let json = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
    let created = import_into(&mut store, &json)?;
    println!("Imported {} tasks from {}", created.len(), path.display());
    Ok(())
}

pub fn tui(settings: &Settings) -> Result<()> {
    let (store, location) = open_current_store()?;
    ui::run(store, location, settings)
}

fn open_current_store() -> Result<(FileStore, StoreLocation)> {
    let cwd = env::current_dir()?;
    let location = locate_store(&cwd)?;
    let store = open_store(&location)?;
    Ok((store, location))
}

fn find_task(store: &dyn TaskStore, task_id: &str) -> Result<Task> {
    let task = store
        .list()?
        .into_iter()
        .find(|t| t.id == task_id)
        .ok_or_else(|| BoardError::TaskNotFound(task_id.to_string()))?;
    Ok(task)
}

fn parse_color(raw: Option<&str>) -> Result<Option<TaskColor>> {
    match raw {
        Some(raw) => Ok(Some(raw.parse()?)),
        None => Ok(None),
    }
}

fn settle(raw: Position) -> Position {
    if position::in_bounds(raw) {
        raw
    } else {
        position::clamp(raw)
    }
}

fn print_task(task: &Task) {
    let first_line = task.text.lines().next().unwrap_or("");
    println!(
        "  - {} [{}] top {:.1} left {:.1} z {}: {}",
        task.id, task.color, task.position.top, task.position.left, task.zindex, first_line
    );
    let more = task.text.lines().count().saturating_sub(1);
    if more > 0 {
        println!("    (+{} more lines)", more);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn find_task_reports_missing_id() {
        let mut store = MemoryStore::new();
        let task = store.create(NewTask::default()).unwrap();
        assert_eq!(find_task(&store, &task.id).unwrap().id, task.id);
        let err = find_task(&store, "gone").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BoardError>(),
            Some(BoardError::TaskNotFound(id)) if id == "gone"
        ));
    }

    #[test]
    fn cli_positions_are_settled_onto_canvas() {
        assert_eq!(settle(Position::new(20.0, 30.0)), Position::new(20.0, 30.0));
        assert!(position::in_bounds(settle(Position::new(500.0, -1.0))));
    }

    #[test]
    fn color_flag_is_optional_and_validated() {
        assert_eq!(parse_color(None).unwrap(), None);
        assert_eq!(parse_color(Some("Blue")).unwrap(), Some(TaskColor::Blue));
        assert!(parse_color(Some("teal")).is_err());
    }
}
