//! Task store schema migrations.
//!
//! Migrations are versioned and applied to the raw JSON document before it
//! is deserialized. The top-level `version` field tracks the schema version;
//! a document without one is version 0. Every step is idempotent, so running
//! the chain twice leaves the document unchanged.

use serde_json::{json, Map, Value};

use crate::error::StoreError;

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const CURRENT_VERSION: u32 = 1;

/// Apply all pending migrations. Returns whether anything was changed.
///
/// # Errors
/// Returns an error if the document is not a JSON object.
pub fn migrate(root: &mut Value) -> Result<bool, StoreError> {
    let current_version = schema_version(root);
    let doc = root
        .as_object_mut()
        .ok_or_else(|| StoreError::MigrationFailed {
            version: CURRENT_VERSION,
            message: "task store root is not an object".into(),
        })?;

    let mut changed = ensure_task_list(doc);

    if current_version < 1 {
        migrate_v1(doc)?;
        changed = true;
    }

    if current_version > CURRENT_VERSION {
        tracing::warn!(
            found = current_version,
            supported = CURRENT_VERSION,
            "task store written by a newer version"
        );
    }

    Ok(changed)
}

/// Get the schema version of a document; 0 when absent or malformed.
pub fn schema_version(root: &Value) -> u32 {
    root.get("version")
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(0)
}

fn ensure_task_list(doc: &mut Map<String, Value>) -> bool {
    match doc.get("tasks") {
        Some(Value::Array(_)) => false,
        _ => {
            doc.insert("tasks".into(), json!([]));
            true
        }
    }
}

/// Migration v1: session-log accumulators.
///
/// Adds to every task:
/// - logPrecedents: precedent names used in the open cycle (`[]`)
/// - logBookingStartTime: original booking time of the open cycle (`null`)
fn migrate_v1(doc: &mut Map<String, Value>) -> Result<(), StoreError> {
    let tasks = doc
        .get_mut("tasks")
        .and_then(Value::as_array_mut)
        .ok_or_else(|| StoreError::MigrationFailed {
            version: 1,
            message: "tasks is not a list".into(),
        })?;

    for task in tasks.iter_mut().filter_map(Value::as_object_mut) {
        if !matches!(task.get("logPrecedents"), Some(Value::Array(_))) {
            task.insert("logPrecedents".into(), json!([]));
        }
        task.entry("logBookingStartTime").or_insert(Value::Null);
    }

    doc.insert("version".into(), json!(1));
    Ok(())
}
