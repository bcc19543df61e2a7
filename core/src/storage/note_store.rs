use super::json_file::{read_json, write_json};
use crate::models::{local_now, DocumentMeta, NotesFile};
use crate::{Error, Result};
use log::{debug, warn};
use std::collections::BTreeMap;
use std::path::Path;

/// Per-page notes of the open document
#[derive(Debug, Default)]
pub struct NoteStore {
    notes: BTreeMap<usize, String>,
    /// Entries loaded from a notes file that lie past the document's last
    /// page. Not visible as pages but written back on flush.
    parked: BTreeMap<usize, String>,
    dirty: bool,
}

impl NoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A clean store over an existing mapping, e.g. one read from a notes file
    pub fn from_notes(notes: BTreeMap<usize, String>) -> Self {
        Self {
            notes,
            ..Self::default()
        }
    }

    /// Start over for a freshly opened document: every page empty, clean
    pub fn reset(&mut self, page_count: usize) {
        self.notes = (0..page_count).map(|page| (page, String::new())).collect();
        self.parked.clear();
        self.dirty = false;
    }

    /// Make the mapping cover exactly `0..page_count`, keeping loaded text
    pub fn fill_missing(&mut self, page_count: usize) {
        let overflow = self.notes.split_off(&page_count);
        if !overflow.is_empty() {
            warn!(
                "notes: {} entries lie past page {}, keeping them aside",
                overflow.len(),
                page_count
            );
            self.parked.extend(overflow);
        }
        for page in 0..page_count {
            if let Some(text) = self.parked.remove(&page) {
                self.notes.entry(page).or_insert(text);
            } else {
                self.notes.entry(page).or_default();
            }
        }
    }

    /// Note text for a page, empty when there is none
    pub fn get(&self, page: usize) -> &str {
        self.notes.get(&page).map(String::as_str).unwrap_or("")
    }

    /// Overwrite a page's note and mark the store dirty
    pub fn set(&mut self, page: usize, text: impl Into<String>) {
        self.notes.insert(page, text.into());
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub fn page_count(&self) -> usize {
        self.notes.len()
    }

    /// Pages in index order with their text
    pub fn pages(&self) -> impl Iterator<Item = (usize, &str)> {
        self.notes.iter().map(|(page, text)| (*page, text.as_str()))
    }

    /// Number of pages whose note holds more than whitespace
    pub fn non_empty_count(&self) -> usize {
        self.notes.values().filter(|text| !text.trim().is_empty()).count()
    }

    /// Write the whole mapping plus `meta` to `path`.
    ///
    /// On failure nothing in memory changes, the store stays dirty.
    pub fn flush<P: AsRef<Path>>(&mut self, path: P, meta: &DocumentMeta) -> Result<()> {
        let path = path.as_ref();
        let mut notes = self.parked.clone();
        notes.extend(self.notes.iter().map(|(page, text)| (*page, text.clone())));

        let file = NotesFile {
            title: meta.title.clone(),
            book_path: meta.book_path.clone(),
            notes,
            last_page: meta.last_page,
            last_saved: Some(local_now()),
            zoom_level: meta.zoom_level,
        };
        write_json(path, &file)?;

        debug!("notes: flushed {} pages to {}", self.notes.len(), path.display());
        self.dirty = false;
        Ok(())
    }

    /// Read a notes file and replace the in-memory mapping.
    ///
    /// Fails with [`Error::MissingSource`] when the referenced document no
    /// longer exists; the current mapping is left untouched in that case.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<DocumentMeta> {
        let path = path.as_ref();
        let file: NotesFile = read_json(path)?;
        if !file.book_path.exists() {
            return Err(Error::MissingSource(file.book_path));
        }

        let (meta, notes) = file.into_parts();
        debug!("notes: loaded {} pages from {}", notes.len(), path.display());
        self.notes = notes;
        self.parked.clear();
        self.dirty = false;
        Ok(meta)
    }

    /// Non-empty notes as a Markdown document
    pub fn to_markdown(&self, title: &str) -> String {
        let mut out = format!("# {}\n", title);
        for (page, text) in self.pages() {
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            out.push_str(&format!("\n## Page {}\n\n{}\n", page + 1, text));
        }
        out
    }
}
