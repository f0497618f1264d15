use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type TaskId = String;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub top: f64,
    pub left: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskColor {
    Red,
    Orange,
    Yellow,
    Green,
    Blue,
    Indigo,
    Purple,
    #[default]
    White,
    Black,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Task {
    pub id: TaskId,
    #[serde(default)]
    pub color: TaskColor,
    #[serde(default)]
    pub text: String,
    #[serde(flatten)]
    pub position: Position,
    pub zindex: u32,
}

/// Fields supplied when a task is created; the store assigns id and zindex.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewTask {
    pub position: Position,
    pub color: TaskColor,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub position: Option<Position>,
    pub color: Option<TaskColor>,
    pub text: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum BoardError {
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),
    #[error("unknown color `{0}`; expected one of {expected}", expected = TaskColor::names().join(", "))]
    UnknownColor(String),
}

impl Position {
    pub fn new(top: f64, left: f64) -> Self {
        Position { top, left }
    }

    pub fn offset(&self, d_top: f64, d_left: f64) -> Self {
        Position {
            top: self.top + d_top,
            left: self.left + d_left,
        }
    }
}

impl TaskColor {
    pub const ALL: [TaskColor; 9] = [
        TaskColor::Red,
        TaskColor::Orange,
        TaskColor::Yellow,
        TaskColor::Green,
        TaskColor::Blue,
        TaskColor::Indigo,
        TaskColor::Purple,
        TaskColor::White,
        TaskColor::Black,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TaskColor::Red => "red",
            TaskColor::Orange => "orange",
            TaskColor::Yellow => "yellow",
            TaskColor::Green => "green",
            TaskColor::Blue => "blue",
            TaskColor::Indigo => "indigo",
            TaskColor::Purple => "purple",
            TaskColor::White => "white",
            TaskColor::Black => "black",
        }
    }

    fn names() -> Vec<&'static str> {
        TaskColor::ALL.iter().map(|c| c.name()).collect()
    }
}

impl fmt::Display for TaskColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TaskColor {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        TaskColor::ALL
            .iter()
            .copied()
            .find(|c| c.name() == wanted)
            .ok_or_else(|| BoardError::UnknownColor(s.to_string()))
    }
}

impl Task {
    pub fn from_new(id: TaskId, fields: NewTask, zindex: u32) -> Self {
        Task {
            id,
            color: fields.color,
            text: fields.text,
            position: fields.position,
            zindex,
        }
    }
}

impl TaskPatch {
    pub fn position(position: Position) -> Self {
        TaskPatch {
            position: Some(position),
            ..Default::default()
        }
    }

    pub fn color(color: TaskColor) -> Self {
        TaskPatch {
            color: Some(color),
            ..Default::default()
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        TaskPatch {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.position.is_none() && self.color.is_none() && self.text.is_none()
    }

    pub fn apply(&self, task: &mut Task) {
        if let Some(position) = self.position {
            task.position = position;
        }
        if let Some(color) = self.color {
            task.color = color;
        }
        if let Some(text) = &self.text {
            task.text = text.clone();
        }
    }
}

/// Millisecond timestamp in hex followed by three random hex digits.
pub fn generate_id() -> TaskId {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..3)
        .map(|_| char::from_digit(rng.gen_range(0..16), 16).unwrap_or('0'))
        .collect();
    format!("{:x}{}", Utc::now().timestamp_millis().max(0), suffix)
}

/// Generates an id not already taken according to `taken`.
pub fn unique_id(taken: impl Fn(&str) -> bool) -> TaskId {
    loop {
        let id = generate_id();
        if !taken(&id) {
            return id;
        }
    }
}

/// One above the highest zindex in use; 1 for an empty collection.
pub fn next_zindex<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> u32 {
    tasks
        .into_iter()
        .map(|t| t.zindex)
        .max()
        .map(|z| z.saturating_add(1))
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, zindex: u32) -> Task {
        Task::from_new(id.to_string(), NewTask::default(), zindex)
    }

    #[test]
    fn generated_ids_have_time_prefix_and_hex_suffix() {
        let id = generate_id();
        assert!(id.len() > 3);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn unique_id_skips_taken_values() {
        let first = generate_id();
        let id = unique_id(|candidate| candidate == first);
        assert_ne!(id, first);
    }

    #[test]
    fn next_zindex_is_one_above_max() {
        let empty: Vec<Task> = Vec::new();
        assert_eq!(next_zindex(&empty), 1);
        let tasks = vec![task("a", 3), task("b", 7), task("c", 0)];
        assert_eq!(next_zindex(&tasks), 8);
    }

    #[test]
    fn color_parses_case_insensitively() {
        assert_eq!("Indigo".parse::<TaskColor>().unwrap(), TaskColor::Indigo);
        assert!(matches!(
            "teal".parse::<TaskColor>(),
            Err(BoardError::UnknownColor(_))
        ));
        assert_eq!(TaskColor::default(), TaskColor::White);
    }

    #[test]
    fn patch_only_touches_present_fields() {
        let mut t = task("a", 1);
        t.text = "keep".into();
        TaskPatch::color(TaskColor::Red).apply(&mut t);
        assert_eq!(t.color, TaskColor::Red);
        assert_eq!(t.text, "keep");
        assert!(TaskPatch::default().is_empty());
    }

    #[test]
    fn record_shape_is_flat() {
        let mut t = task("abc", 2);
        t.position = Position::new(10.0, 20.0);
        let yaml = serde_yaml::to_string(&t).unwrap();
        assert!(yaml.contains("top: 10.0"));
        assert!(yaml.contains("left: 20.0"));
        assert!(yaml.contains("color: white"));
        let back: Task = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, t);
    }
}
