//! JSON export/import of task records. Export drops ids; import is additive
//! and always goes through `TaskStore::create`, so every imported record
//! gets a fresh id and a zindex above everything already stored.

use crate::model::{NewTask, Position, Task, TaskColor};
use crate::position;
use crate::store::TaskStore;
use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ExportedTask {
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub top: f64,
    #[serde(default)]
    pub left: f64,
    #[serde(default)]
    pub zindex: u32,
}

impl From<&Task> for ExportedTask {
    fn from(task: &Task) -> Self {
        ExportedTask {
            color: Some(task.color.name().to_string()),
            text: task.text.clone(),
            top: task.position.top,
            left: task.position.left,
            zindex: task.zindex,
        }
    }
}

impl ExportedTask {
    /// Maps a record onto valid task fields: unknown colors fall back to the
    /// default and positions are clamped onto the canvas.
    pub fn into_new_task(self) -> NewTask {
        let color = match self.color.as_deref() {
            None => TaskColor::default(),
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!("event=import_color status=fallback color={}", raw);
                TaskColor::default()
            }),
        };
        let raw = Position::new(self.top, self.left);
        let position = if position::in_bounds(raw) {
            raw
        } else {
            position::clamp(raw)
        };
        NewTask {
            position,
            color,
            text: self.text,
        }
    }
}

pub fn export_json(tasks: &[Task]) -> Result<String> {
    let mut records: Vec<ExportedTask> = tasks.iter().map(ExportedTask::from).collect();
    records.sort_by_key(|r| r.zindex);
    serde_json::to_string_pretty(&records).context("serializing tasks")
}

pub fn parse_import(json: &str) -> Result<Vec<NewTask>> {
    let mut records: Vec<ExportedTask> =
        serde_json::from_str(json).context("parsing task export (expected a JSON array)")?;
    records.sort_by_key(|r| r.zindex);
    Ok(records.into_iter().map(ExportedTask::into_new_task).collect())
}

/// Creates every record in `json` as a new task; returns the created tasks.
pub fn import_into(store: &mut dyn TaskStore, json: &str) -> Result<Vec<Task>> {
    let fields = parse_import(json)?;
    let mut created = Vec::with_capacity(fields.len());
    for f in fields {
        created.push(store.create(f).context("creating imported task")?);
    }
    info!("event=import status=ok count={}", created.len());
    Ok(created)
}
