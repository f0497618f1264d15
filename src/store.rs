use crate::model::{next_zindex, unique_id, NewTask, Task, TaskId, TaskPatch};
use crate::zorder;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};

const STORE_DIR: &str = ".pinboard";
const STORE_FILE: &str = "tasks.yml";

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("task not found: {0}")]
    NotFound(TaskId),
    #[error("task id already stored: {0}")]
    DuplicateId(TaskId),
    #[error("reading or writing {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("encoding task file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Durable task records. Each call is atomic on its own; nothing more.
pub trait TaskStore {
    fn list(&self) -> StoreResult<Vec<Task>>;
    /// Assigns a fresh id and the next zindex.
    fn create(&mut self, fields: NewTask) -> StoreResult<Task>;
    /// Stores a task whose id and zindex were assigned by the caller.
    fn insert(&mut self, task: Task) -> StoreResult<()>;
    fn update(&mut self, id: &str, patch: &TaskPatch) -> StoreResult<()>;
    fn delete(&mut self, id: &str) -> StoreResult<()>;
    fn reorder_to_front(&mut self, id: &str) -> StoreResult<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreOp {
    Insert(Task),
    Update { id: TaskId, patch: TaskPatch },
    Delete(TaskId),
    ReorderToFront(TaskId),
}

impl StoreOp {
    pub fn apply(self, store: &mut dyn TaskStore) -> StoreResult<()> {
        match self {
            StoreOp::Insert(task) => store.insert(task),
            StoreOp::Update { id, patch } => store.update(&id, &patch),
            StoreOp::Delete(id) => store.delete(&id),
            StoreOp::ReorderToFront(id) => store.reorder_to_front(&id),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            StoreOp::Insert(_) => "insert",
            StoreOp::Update { .. } => "update",
            StoreOp::Delete(_) => "delete",
            StoreOp::ReorderToFront(_) => "reorder_to_front",
        }
    }
}

/// Where the board's writes go. Submitting never waits for the write.
pub trait StoreSink {
    fn submit(&self, op: StoreOp);
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
struct TaskDocument {
    #[serde(default)]
    tasks: Vec<Task>,
}

impl TaskDocument {
    fn find_mut(&mut self, id: &str) -> StoreResult<&mut Task> {
        self.tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn create(&mut self, fields: NewTask) -> Task {
        let id = unique_id(|candidate| self.tasks.iter().any(|t| t.id == candidate));
        let task = Task::from_new(id, fields, next_zindex(&self.tasks));
        self.tasks.push(task.clone());
        task
    }

    fn insert(&mut self, task: Task) -> StoreResult<()> {
        if self.tasks.iter().any(|t| t.id == task.id) {
            return Err(StoreError::DuplicateId(task.id));
        }
        self.tasks.push(task);
        Ok(())
    }

    fn update(&mut self, id: &str, patch: &TaskPatch) -> StoreResult<()> {
        patch.apply(self.find_mut(id)?);
        Ok(())
    }

    fn delete(&mut self, id: &str) -> StoreResult<()> {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        if self.tasks.len() == before {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn reorder_to_front(&mut self, id: &str) -> StoreResult<()> {
        if zorder::bring_to_front(self.tasks.iter_mut(), id) {
            Ok(())
        } else {
            Err(StoreError::NotFound(id.to_string()))
        }
    }
}

/// In-memory store for exercising board and import logic without a file.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStore {
    doc: TaskDocument,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }
}

#[cfg(test)]
impl TaskStore for MemoryStore {
    fn list(&self) -> StoreResult<Vec<Task>> {
        Ok(self.doc.tasks.clone())
    }

    fn create(&mut self, fields: NewTask) -> StoreResult<Task> {
        Ok(self.doc.create(fields))
    }

    fn insert(&mut self, task: Task) -> StoreResult<()> {
        self.doc.insert(task)
    }

    fn update(&mut self, id: &str, patch: &TaskPatch) -> StoreResult<()> {
        self.doc.update(id, patch)
    }

    fn delete(&mut self, id: &str) -> StoreResult<()> {
        self.doc.delete(id)
    }

    fn reorder_to_front(&mut self, id: &str) -> StoreResult<()> {
        self.doc.reorder_to_front(id)
    }
}

/// YAML file rewritten after every mutation.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    doc: TaskDocument,
}

impl FileStore {
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let doc = if path.exists() {
            let data = fs::read_to_string(&path).map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
            if data.trim().is_empty() {
                TaskDocument::default()
            } else {
                serde_yaml::from_str(&data)?
            }
        } else {
            TaskDocument::default()
        };
        debug!(
            "event=store_open path={} tasks={}",
            path.display(),
            doc.tasks.len()
        );
        Ok(FileStore { path, doc })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self) -> StoreResult<()> {
        let io_err = |source: std::io::Error| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let serialized = serde_yaml::to_string(&self.doc)?;
        fs::write(&self.path, serialized).map_err(io_err)?;
        Ok(())
    }

    fn mutate<T>(
        &mut self,
        f: impl FnOnce(&mut TaskDocument) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let out = f(&mut self.doc)?;
        self.save()?;
        Ok(out)
    }
}

impl TaskStore for FileStore {
    fn list(&self) -> StoreResult<Vec<Task>> {
        Ok(self.doc.tasks.clone())
    }

    fn create(&mut self, fields: NewTask) -> StoreResult<Task> {
        self.mutate(|doc| Ok(doc.create(fields)))
    }

    fn insert(&mut self, task: Task) -> StoreResult<()> {
        self.mutate(|doc| doc.insert(task))
    }

    fn update(&mut self, id: &str, patch: &TaskPatch) -> StoreResult<()> {
        self.mutate(|doc| doc.update(id, patch))
    }

    fn delete(&mut self, id: &str) -> StoreResult<()> {
        self.mutate(|doc| doc.delete(id))
    }

    fn reorder_to_front(&mut self, id: &str) -> StoreResult<()> {
        self.mutate(|doc| doc.reorder_to_front(id))
    }
}

type BoxedStore = Box<dyn TaskStore + Send>;

/// Write-behind worker. Ops are applied in submission order on a background
/// thread, so a later write for the same task always lands last.
pub struct StoreHandle {
    tx: Option<Sender<StoreOp>>,
    worker: Option<JoinHandle<BoxedStore>>,
}

impl StoreHandle {
    pub fn spawn<S: TaskStore + Send + 'static>(store: S) -> Result<Self> {
        let (tx, rx) = mpsc::channel::<StoreOp>();
        let worker = thread::Builder::new()
            .name("pinboard-store".into())
            .spawn(move || {
                let mut store: BoxedStore = Box::new(store);
                for op in rx {
                    let name = op.name();
                    if let Err(err) = op.apply(store.as_mut()) {
                        warn!("event=store_write status=error op={} error={}", name, err);
                    }
                }
                store
            })
            .context("starting store worker")?;
        Ok(StoreHandle {
            tx: Some(tx),
            worker: Some(worker),
        })
    }

    /// Drains pending writes and hands the store back.
    #[cfg(test)]
    pub fn close(mut self) -> Result<BoxedStore> {
        self.tx.take();
        let worker = self
            .worker
            .take()
            .context("store worker already stopped")?;
        worker
            .join()
            .map_err(|_| anyhow::anyhow!("store worker panicked"))
    }
}

impl StoreSink for StoreHandle {
    fn submit(&self, op: StoreOp) {
        let Some(tx) = &self.tx else {
            warn!("event=store_submit status=closed op={}", op.name());
            return;
        };
        if let Err(mpsc::SendError(op)) = tx.send(op) {
            warn!("event=store_submit status=disconnected op={}", op.name());
        }
    }
}

impl Drop for StoreHandle {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("event=store_worker status=panicked");
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreScope {
    Project,
    Global,
}

#[derive(Debug, Clone)]
pub struct StoreLocation {
    pub path: PathBuf,
    pub scope: StoreScope,
}

impl StoreScope {
    pub fn label(&self) -> &'static str {
        match self {
            StoreScope::Project => "project",
            StoreScope::Global => "global",
        }
    }
}

pub fn init_project_store() -> Result<StoreLocation> {
    let cwd = env::current_dir()?;
    let dir = cwd.join(STORE_DIR);
    fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", STORE_DIR))?;
    let location = StoreLocation {
        path: dir.join(STORE_FILE),
        scope: StoreScope::Project,
    };
    if !location.path.exists() {
        FileStore::open(&location.path)?.save()?;
    }
    Ok(location)
}

pub fn locate_store(start: &Path) -> Result<StoreLocation> {
    if let Some(project_path) = find_project_store(start) {
        return Ok(StoreLocation {
            path: project_path,
            scope: StoreScope::Project,
        });
    }
    Ok(StoreLocation {
        path: global_store_path()?,
        scope: StoreScope::Global,
    })
}

pub fn open_store(location: &StoreLocation) -> Result<FileStore> {
    FileStore::open(&location.path).with_context(|| format!("opening {:?}", location.path))
}

fn find_project_store(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(STORE_DIR).join(STORE_FILE))
        .find(|candidate| candidate.exists())
}

fn global_store_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "pinboard").context("locating data directory")?;
    Ok(dirs.data_dir().join(STORE_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Position, TaskColor};

    fn fields(text: &str) -> NewTask {
        NewTask {
            text: text.into(),
            ..Default::default()
        }
    }

    #[test]
    fn create_assigns_distinct_ids_and_rising_zindex() {
        let mut store = MemoryStore::new();
        let a = store.create(fields("a")).unwrap();
        let b = store.create(fields("b")).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(a.zindex, 1);
        assert_eq!(b.zindex, 2);
    }

    #[test]
    fn insert_rejects_duplicate_ids() {
        let mut store = MemoryStore::new();
        let task = store.create(fields("a")).unwrap();
        assert!(matches!(
            store.insert(task),
            Err(StoreError::DuplicateId(_))
        ));
    }

    #[test]
    fn missing_ids_report_not_found() {
        let mut store = MemoryStore::new();
        assert!(matches!(
            store.update("nope", &TaskPatch::text("x")),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(store.delete("nope"), Err(StoreError::NotFound(_))));
        assert!(matches!(
            store.reorder_to_front("nope"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn reorder_to_front_persists_dense_indices() {
        let mut store = MemoryStore::new();
        let a = store.create(fields("a")).unwrap();
        let b = store.create(fields("b")).unwrap();
        store.reorder_to_front(&a.id).unwrap();
        let tasks = store.list().unwrap();
        let z = |id: &str| tasks.iter().find(|t| t.id == id).unwrap().zindex;
        assert_eq!(z(&b.id), 0);
        assert_eq!(z(&a.id), 1);
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(STORE_FILE);
        let created = {
            let mut store = FileStore::open(&path).unwrap();
            let task = store.create(fields("persist me")).unwrap();
            store
                .update(&task.id, &TaskPatch::color(TaskColor::Green))
                .unwrap();
            task
        };
        let store = FileStore::open(&path).unwrap();
        let tasks = store.list().unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, created.id);
        assert_eq!(tasks[0].color, TaskColor::Green);
        assert_eq!(tasks[0].text, "persist me");
    }

    #[test]
    fn empty_file_opens_as_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(STORE_FILE);
        fs::write(&path, "").unwrap();
        assert!(FileStore::open(&path).unwrap().list().unwrap().is_empty());
    }

    #[test]
    fn handle_applies_ops_in_order_and_last_write_wins() {
        let mut seed = MemoryStore::new();
        let task = seed.create(fields("t")).unwrap();
        let handle = StoreHandle::spawn(seed).unwrap();
        for step in 0..20 {
            handle.submit(StoreOp::Update {
                id: task.id.clone(),
                patch: TaskPatch::position(Position::new(f64::from(step), 1.0)),
            });
        }
        handle.submit(StoreOp::Update {
            id: "gone".into(),
            patch: TaskPatch::text("ignored"),
        });
        let store = handle.close().unwrap();
        let tasks = store.list().unwrap();
        assert_eq!(tasks[0].position, Position::new(19.0, 1.0));
    }

    #[test]
    fn project_store_is_found_from_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        let store_path = dir.path().join(STORE_DIR).join(STORE_FILE);
        FileStore::open(&store_path).unwrap().save().unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        let location = locate_store(&nested).unwrap();
        assert_eq!(location.scope, StoreScope::Project);
        assert_eq!(location.path, store_path);
    }
}
