use super::Zoom;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// On-disk layout of a notes file.
///
/// `notes` is keyed by zero-based page index; JSON object keys are the
/// index rendered as a string (`"0"`, `"1"`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotesFile {
    pub title: String,
    pub book_path: PathBuf,
    #[serde(default)]
    pub notes: BTreeMap<usize, String>,
    #[serde(default)]
    pub last_page: usize,
    #[serde(default)]
    pub last_saved: Option<NaiveDateTime>,
    #[serde(default)]
    pub zoom_level: Zoom,
}

/// Document metadata written alongside the notes
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentMeta {
    pub title: String,
    pub book_path: PathBuf,
    pub last_page: usize,
    pub zoom_level: Zoom,
    pub last_saved: Option<NaiveDateTime>,
}

impl NotesFile {
    /// Split into metadata and the page mapping
    pub fn into_parts(self) -> (DocumentMeta, BTreeMap<usize, String>) {
        let meta = DocumentMeta {
            title: self.title,
            book_path: self.book_path,
            last_page: self.last_page,
            zoom_level: self.zoom_level,
            last_saved: self.last_saved,
        };
        (meta, self.notes)
    }
}
