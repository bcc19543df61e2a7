use crate::Result;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

const USAGE_FILE: &str = "usage_data.json";
const STATE_FILE: &str = "app_state.json";
const CONFIG_FILE: &str = "config.toml";
const NOTES_DIR: &str = "notes";

/// Layout of the application data directory
#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Platform data directory, falling back to `./data`
    pub fn default_location() -> Self {
        match ProjectDirs::from("", "", "marginalia") {
            Some(dirs) => Self::new(dirs.data_dir()),
            None => Self::new("data"),
        }
    }

    /// Create the directory tree if it does not exist yet
    pub fn ensure(&self) -> Result<()> {
        std::fs::create_dir_all(self.notes_dir())?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn usage_path(&self) -> PathBuf {
        self.root.join(USAGE_FILE)
    }

    pub fn state_path(&self) -> PathBuf {
        self.root.join(STATE_FILE)
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    pub fn notes_dir(&self) -> PathBuf {
        self.root.join(NOTES_DIR)
    }

    /// Default notes file for a document title
    pub fn notes_path_for(&self, title: &str) -> PathBuf {
        let file_name: String = title
            .chars()
            .map(|c| if matches!(c, '/' | '\\' | ':' | '\0') { '_' } else { c })
            .collect();
        self.notes_dir().join(format!("{}.json", file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_ensure_creates_notes_dir() {
        let dir = tempdir().unwrap();
        let data = DataDir::new(dir.path().join("data"));
        assert!(!data.notes_dir().exists());

        data.ensure().unwrap();
        assert!(data.notes_dir().is_dir());
        // Idempotent
        data.ensure().unwrap();
    }

    #[test]
    fn test_file_layout() {
        let data = DataDir::new("/tmp/marginalia");
        assert_eq!(data.usage_path(), PathBuf::from("/tmp/marginalia/usage_data.json"));
        assert_eq!(data.state_path(), PathBuf::from("/tmp/marginalia/app_state.json"));
        assert_eq!(data.config_path(), PathBuf::from("/tmp/marginalia/config.toml"));
        assert_eq!(
            data.notes_path_for("a/b: c"),
            PathBuf::from("/tmp/marginalia/notes/a_b_ c.json")
        );
    }
}
