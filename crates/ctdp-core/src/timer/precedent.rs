//! Precedent registry.
//!
//! A precedent is a named, reusable permission to pause an active session for
//! a bounded time. Each task owns its own ordered registry; nothing is shared
//! between tasks.

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::task::{parse_minutes, positive_minutes};
use crate::error::ValidationError;

/// Pause limit applied when the submitted limit is missing or invalid.
pub const DEFAULT_PAUSE_LIMIT_MINUTES: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Precedent {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_limit", deserialize_with = "de_limit")]
    pub auto_fail_minutes: u32,
    #[serde(default)]
    pub usage_count: u32,
}

fn default_limit() -> u32 {
    DEFAULT_PAUSE_LIMIT_MINUTES
}

/// A stored limit below one minute loads as the default.
fn de_limit<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let raw = i64::deserialize(deserializer)?;
    Ok(positive_minutes(raw, DEFAULT_PAUSE_LIMIT_MINUTES))
}

impl Precedent {
    /// Pause budget in milliseconds.
    pub fn limit_ms(&self) -> u64 {
        u64::from(self.auto_fail_minutes) * 60_000
    }
}

/// Ordered collection of precedents with unique ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrecedentRegistry(Vec<Precedent>);

impl PrecedentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new precedent and return it.
    ///
    /// `limit_minutes` is raw user input: anything that is not a positive
    /// integer falls back to [`DEFAULT_PAUSE_LIMIT_MINUTES`].
    ///
    /// # Errors
    /// Returns [`ValidationError::EmptyName`] when `name` is blank; the
    /// registry is left untouched.
    pub fn create(
        &mut self,
        name: &str,
        description: &str,
        limit_minutes: &str,
    ) -> Result<&Precedent, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName { what: "Precedent" });
        }

        let precedent = Precedent {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            description: description.trim().to_string(),
            auto_fail_minutes: parse_minutes(limit_minutes, DEFAULT_PAUSE_LIMIT_MINUTES),
            usage_count: 0,
        };
        tracing::debug!(id = %precedent.id, name = %precedent.name, "precedent created");
        self.0.push(precedent);
        Ok(&self.0[self.0.len() - 1])
    }

    /// Remove a precedent by id. Unknown ids are ignored.
    pub fn remove(&mut self, id: &str) -> Option<Precedent> {
        let idx = self.0.iter().position(|p| p.id == id)?;
        Some(self.0.remove(idx))
    }

    pub fn get(&self, id: &str) -> Option<&Precedent> {
        self.0.iter().find(|p| p.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut Precedent> {
        self.0.iter_mut().find(|p| p.id == id)
    }

    /// Drop every rule. Used when the chain fails.
    pub(crate) fn clear(&mut self) {
        self.0.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Precedent> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
