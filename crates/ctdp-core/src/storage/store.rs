//! JSON-backed task list.
//!
//! The whole list is one snapshot at `<data_dir>/tasks.json`:
//!
//! ```json
//! { "version": 1, "tasks": [ ... ], "activeTaskId": "..." }
//! ```
//!
//! Loading tolerates partially populated records: the document is migrated
//! first, then every optional task field falls back to its default.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::data_dir;
use super::migrations::{self, CURRENT_VERSION};
use crate::error::{StoreError, ValidationError};
use crate::timer::Task;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreData {
    #[serde(default)]
    version: u32,
    #[serde(default)]
    tasks: Vec<Task>,
    #[serde(default)]
    active_task_id: Option<String>,
}

/// The task list plus the selected task.
///
/// Loaded once, mutated in place, saved explicitly after each batch of
/// changes.
#[derive(Debug, Clone)]
pub struct TaskStore {
    data: StoreData,
    path: Option<PathBuf>,
}

impl TaskStore {
    /// An empty store that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            data: StoreData {
                version: CURRENT_VERSION,
                ..Default::default()
            },
            path: None,
        }
    }

    /// Open `<data_dir>/tasks.json`.
    ///
    /// # Errors
    /// See [`TaskStore::load_from`].
    pub fn open() -> Result<Self, StoreError> {
        Self::load_from(data_dir()?.join("tasks.json"))
    }

    /// Load the store at `path`, migrating it if needed.
    ///
    /// A missing file yields an empty store. A migrated document is written
    /// back immediately.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let mut store = Self::in_memory();
                store.path = Some(path);
                return Ok(store);
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        let mut root: serde_json::Value =
            serde_json::from_str(&content).map_err(|source| StoreError::Parse {
                path: path.clone(),
                source,
            })?;
        let migrated = migrations::migrate(&mut root)?;
        let data: StoreData = serde_json::from_value(root).map_err(|source| StoreError::Parse {
            path: path.clone(),
            source,
        })?;

        let mut store = Self {
            data,
            path: Some(path),
        };
        let reselected = store.ensure_selection();
        if migrated || reselected {
            tracing::info!(version = store.data.version, "task store upgraded");
            store.save()?;
        }
        Ok(store)
    }

    /// Persist the full snapshot. In-memory stores ignore this.
    ///
    /// # Errors
    /// Returns an error if the snapshot cannot be written.
    pub fn save(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let io_err = |source| StoreError::Io {
            path: path.clone(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let content = serde_json::to_string_pretty(&self.data).map_err(|source| {
            StoreError::Parse {
                path: path.clone(),
                source,
            }
        })?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content).map_err(io_err)?;
        fs::rename(&tmp, path).map_err(io_err)?;
        tracing::debug!(path = %path.display(), tasks = self.data.tasks.len(), "task store saved");
        Ok(())
    }

    pub fn version(&self) -> u32 {
        self.data.version
    }

    // ── Tasks ────────────────────────────────────────────────────────

    pub fn tasks(&self) -> &[Task] {
        &self.data.tasks
    }

    pub fn tasks_mut(&mut self) -> impl Iterator<Item = &mut Task> {
        self.data.tasks.iter_mut()
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.data.tasks.iter().find(|t| t.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.data.tasks.iter_mut().find(|t| t.id == id)
    }

    /// Create a task and make it the selected one.
    ///
    /// # Errors
    /// Returns [`ValidationError::EmptyName`] for a blank name.
    pub fn create_task(
        &mut self,
        name: &str,
        description: &str,
        session_minutes: &str,
        booking_minutes: &str,
    ) -> Result<&Task, ValidationError> {
        let task = Task::new(name, description, session_minutes, booking_minutes)?;
        tracing::info!(id = %task.id, name = %task.name, "task created");
        self.data.active_task_id = Some(task.id.clone());
        self.data.tasks.push(task);
        Ok(&self.data.tasks[self.data.tasks.len() - 1])
    }

    /// Delete a task. Deleting the selected task selects the first remaining.
    pub fn delete_task(&mut self, id: &str) -> Option<Task> {
        let idx = self.data.tasks.iter().position(|t| t.id == id)?;
        let removed = self.data.tasks.remove(idx);
        if self.data.active_task_id.as_deref() == Some(id) {
            self.data.active_task_id = self.data.tasks.first().map(|t| t.id.clone());
        }
        tracing::info!(id = %removed.id, "task deleted");
        Some(removed)
    }

    // ── Selection ────────────────────────────────────────────────────

    pub fn active_task_id(&self) -> Option<&str> {
        self.data.active_task_id.as_deref()
    }

    pub fn active_task(&self) -> Option<&Task> {
        self.active_task_id().and_then(|id| self.get(id))
    }

    /// Select a task. Unknown ids leave the selection unchanged.
    pub fn select(&mut self, id: &str) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        self.data.active_task_id = Some(id.to_string());
        true
    }

    /// `explicit` if given, otherwise the selected task.
    pub fn resolve_id(&self, explicit: Option<&str>) -> Option<String> {
        explicit
            .map(str::to_string)
            .or_else(|| self.data.active_task_id.clone())
    }

    /// Select the first task when nothing valid is selected.
    fn ensure_selection(&mut self) -> bool {
        if self.active_task().is_some() {
            return false;
        }
        let first = self.data.tasks.first().map(|t| t.id.clone());
        let changed = first != self.data.active_task_id;
        self.data.active_task_id = first;
        changed
    }
}
