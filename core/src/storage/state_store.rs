use super::json_file::{read_json, write_json};
use crate::models::{local_now, AppState};
use crate::Result;
use log::{debug, warn};
use std::path::{Path, PathBuf};

/// Reads and writes the singleton `app_state.json` record
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Saved state, or the defaults when the file is absent or unreadable
    pub fn load(&self) -> AppState {
        if !self.path.exists() {
            debug!("state: {} not found, using defaults", self.path.display());
            return AppState::default();
        }
        match read_json(&self.path) {
            Ok(state) => state,
            Err(err) => {
                warn!("state: ignoring unreadable {}: {}", self.path.display(), err);
                AppState::default()
            }
        }
    }

    /// Replace the stored record, stamping `last_saved`
    pub fn save(&self, state: &AppState) -> Result<()> {
        let mut state = state.clone();
        state.last_saved = Some(local_now());
        write_json(&self.path, &state)
    }
}
