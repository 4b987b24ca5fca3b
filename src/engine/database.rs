// src/engine/database.rs

use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::info;

/// The currently active database, shared with the UI.
///
/// The UI changes it when the user picks or creates a database; the runner
/// only reads it, once per task, at submission.
#[derive(Debug, Clone, Default)]
pub struct ActiveDatabase {
    inner: Arc<RwLock<Option<PathBuf>>>,
}

impl ActiveDatabase {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(path)),
        }
    }

    /// Initialise from an environment variable; unset or empty means none.
    pub fn from_env(var: &str) -> Self {
        let path = std::env::var_os(var)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        info!(env = var, database = ?path, "active database resolved from environment");
        Self::new(path)
    }

    pub fn get(&self) -> Option<PathBuf> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set(&self, path: Option<PathBuf>) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = path;
    }
}
