//! The reading session: document, notes, usage and persisted state tied
//! together behind the actions a user can take.

use crate::autosave::{AutosaveSettings, AutosaveTimers, AutosaveTrigger};
use crate::document::{DocumentSession, LopdfEngine, PdfEngine};
use crate::models::{
    today, AppState, DocumentMeta, MarkerKind, NotesFile, PageMarkers, ReadingStats, Theme, Zoom,
};
use crate::storage::{read_json, DataDir, NoteStore, StateStore, UsageTracker};
use crate::{Error, Result};
use chrono::NaiveDate;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::time::Instant;

pub struct Reader<E: PdfEngine = LopdfEngine> {
    data_dir: DataDir,
    document: DocumentSession<E>,
    notes: NoteStore,
    notes_path: Option<PathBuf>,
    usage: UsageTracker,
    state_store: StateStore,
    startup_state: AppState,
    theme: Theme,
    markers: PageMarkers,
    autosave: AutosaveTimers,
    persist_error: Option<String>,
}

impl Reader<LopdfEngine> {
    pub fn new(data_dir: DataDir, autosave: AutosaveSettings) -> Result<Self> {
        Self::with_engine(data_dir, autosave, LopdfEngine::new())
    }
}

impl<E: PdfEngine> Reader<E> {
    /// Load usage and state from `data_dir`, creating it if needed
    pub fn with_engine(data_dir: DataDir, autosave: AutosaveSettings, engine: E) -> Result<Self> {
        data_dir.ensure()?;
        let usage = UsageTracker::open(data_dir.usage_path());
        let state_store = StateStore::new(data_dir.state_path());
        let startup_state = state_store.load();

        let mut document = DocumentSession::new(engine);
        document.set_zoom(startup_state.zoom_level);

        Ok(Self {
            theme: startup_state.theme,
            data_dir,
            document,
            notes: NoteStore::new(),
            notes_path: None,
            usage,
            state_store,
            startup_state,
            markers: PageMarkers::default(),
            autosave: AutosaveTimers::new(autosave, Instant::now()),
            persist_error: None,
        })
    }

    // =========================
    // Accessors
    // =========================

    pub fn data_dir(&self) -> &DataDir {
        &self.data_dir
    }

    pub fn document(&self) -> &DocumentSession<E> {
        &self.document
    }

    pub fn notes(&self) -> &NoteStore {
        &self.notes
    }

    pub fn notes_path(&self) -> Option<&Path> {
        self.notes_path.as_deref()
    }

    pub fn usage(&self) -> &UsageTracker {
        &self.usage
    }

    pub fn markers(&self) -> &PageMarkers {
        &self.markers
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn zoom(&self) -> Zoom {
        self.document.zoom()
    }

    pub fn is_dirty(&self) -> bool {
        self.notes.is_dirty()
    }

    pub fn autosave_enabled(&self) -> bool {
        self.autosave.is_enabled()
    }

    pub fn current_page(&self) -> usize {
        self.document.current_page()
    }

    /// Note of the page on screen
    pub fn current_note(&self) -> &str {
        self.notes.get(self.document.current_page())
    }

    /// The most recent background write failure, reported once
    pub fn take_persist_error(&mut self) -> Option<String> {
        self.persist_error.take()
    }

    /// Snapshot of what `app_state.json` holds for this session
    pub fn current_state(&self) -> AppState {
        AppState {
            last_book_path: self.document.path().map(Path::to_path_buf),
            last_page: self.document.current_page(),
            zoom_level: self.document.zoom(),
            theme: self.theme,
            last_saved: None,
        }
    }

    // =========================
    // Opening documents
    // =========================

    /// Reopen the book of the previous session, if it still exists
    pub fn resume(&mut self) -> Result<bool> {
        let state = self.startup_state.clone();
        match state.last_book_path {
            Some(path) if path.exists() => {
                info!("reader: resuming {} at page {}", path.display(), state.last_page + 1);
                self.open_book_at(&path, state.last_page)?;
                Ok(true)
            }
            Some(path) => {
                warn!("reader: last book {} no longer exists", path.display());
                Ok(false)
            }
            None => Ok(false),
        }
    }

    /// Open a book at its first page, picking up its notes file from the
    /// data directory when there is one
    pub fn open_book<P: AsRef<Path>>(&mut self, path: P) -> Result<usize> {
        self.open_book_at(path.as_ref(), 0)
    }

    fn open_book_at(&mut self, path: &Path, page: usize) -> Result<usize> {
        self.save_pending_notes()?;
        let page_count = self.document.open(path)?;
        let title = self.document.title().unwrap_or("Untitled").to_string();

        let (notes, notes_path, relinked) = self.notes_for_book(path, &title, page_count);
        self.notes = notes;
        self.notes_path = Some(notes_path);

        self.enter_document(page.min(page_count - 1))?;
        if relinked {
            // Rewrite book_path so the file matches this book from now on
            if let Err(err) = self.save_notes() {
                self.remember("updating the notes file", &err);
            }
        }
        Ok(page_count)
    }

    /// Notes to start with for a freshly opened book, where they live, and
    /// whether they were written for the same book at a previous location
    fn notes_for_book(
        &mut self,
        book: &Path,
        title: &str,
        page_count: usize,
    ) -> (NoteStore, PathBuf, bool) {
        let mut candidate = self.data_dir.notes_path_for(title);
        let mut suffix = 1;
        while candidate.exists() {
            let mut loaded = NoteStore::new();
            match loaded.load(&candidate) {
                Ok(meta) if same_file(&meta.book_path, book) => {
                    debug!("reader: merging notes from {}", candidate.display());
                    loaded.fill_missing(page_count);
                    return (loaded, candidate, false);
                }
                Ok(meta) => debug!(
                    "reader: {} belongs to {}",
                    candidate.display(),
                    meta.book_path.display()
                ),
                Err(Error::MissingSource(old)) => match read_json::<NotesFile, _>(&candidate) {
                    Ok(file) if file.title == title => {
                        info!(
                            "reader: {} moved to {}, keeping its notes",
                            old.display(),
                            book.display()
                        );
                        let (_, notes) = file.into_parts();
                        let mut moved = NoteStore::from_notes(notes);
                        moved.fill_missing(page_count);
                        return (moved, candidate, true);
                    }
                    Ok(_) => debug!("reader: {} has another title", candidate.display()),
                    Err(err) => {
                        self.remember(&format!("loading notes from {}", candidate.display()), &err)
                    }
                },
                Err(err) => {
                    self.remember(&format!("loading notes from {}", candidate.display()), &err)
                }
            }
            suffix += 1;
            candidate = self
                .data_dir
                .notes_path_for(&format!("{} ({})", title, suffix));
        }

        let mut fresh = NoteStore::new();
        fresh.reset(page_count);
        (fresh, candidate, false)
    }

    /// Load a notes file, reopen its book and restore its page and zoom.
    /// Later saves go to `path`.
    pub fn open_notes<P: AsRef<Path>>(&mut self, path: P) -> Result<usize> {
        let path = path.as_ref();
        let mut loaded = NoteStore::new();
        let meta = loaded.load(path)?;

        self.save_pending_notes()?;
        let page_count = self.document.open(&meta.book_path)?;
        loaded.fill_missing(page_count);
        self.notes = loaded;
        self.notes_path = Some(path.to_path_buf());
        self.document.set_zoom(meta.zoom_level);

        self.enter_document(meta.last_page.min(page_count - 1))?;
        info!("reader: notes loaded from {}", path.display());
        Ok(page_count)
    }

    fn enter_document(&mut self, page: usize) -> Result<()> {
        self.document.go_to(page)?;
        self.markers.clear();
        self.autosave.saved();
        self.record_usage();
        self.persist_state();
        Ok(())
    }

    // =========================
    // Navigation
    // =========================

    /// Show a zero-based page, saving pending edits first
    pub fn show_page(&mut self, page: usize) -> Result<()> {
        let page_count = self.document.page_count();
        if !self.document.is_open() {
            return Err(Error::NoDocument);
        }
        if page >= page_count {
            return Err(Error::PageOutOfRange { page, page_count });
        }

        if self.notes.is_dirty() {
            if let Err(err) = self.save_notes() {
                self.remember("saving notes", &err);
            }
        }
        self.document.go_to(page)?;
        self.markers.clear();
        self.persist_state();
        Ok(())
    }

    /// Go to the next page; false when already on the last one
    pub fn next_page(&mut self) -> Result<bool> {
        let page = self.document.current_page();
        if page + 1 >= self.document.page_count() {
            return Ok(false);
        }
        self.show_page(page + 1)?;
        Ok(true)
    }

    /// Go to the previous page; false when already on the first one
    pub fn prev_page(&mut self) -> Result<bool> {
        let page = self.document.current_page();
        if page == 0 || !self.document.is_open() {
            return Ok(false);
        }
        self.show_page(page - 1)?;
        Ok(true)
    }

    /// Jump to a page number as typed by the user (1-based)
    pub fn go_to_page(&mut self, input: &str) -> Result<()> {
        if !self.document.is_open() {
            return Err(Error::NoDocument);
        }
        let number: usize = input
            .trim()
            .parse()
            .map_err(|_| Error::InvalidInput("Please enter a valid page number".to_string()))?;
        let page_count = self.document.page_count();
        if number == 0 || number > page_count {
            return Err(Error::PageOutOfRange {
                page: number.saturating_sub(1),
                page_count,
            });
        }
        self.show_page(number - 1)
    }

    // =========================
    // Notes
    // =========================

    /// Replace the current page's note
    pub fn edit_note(&mut self, text: impl Into<String>) -> Result<()> {
        if !self.document.is_open() {
            return Err(Error::NoDocument);
        }
        let page = self.document.current_page();
        self.notes.set(page, text);
        self.record_usage();
        self.autosave.note_edited(Instant::now());
        Ok(())
    }

    /// Write notes and state now
    pub fn save(&mut self) -> Result<()> {
        self.save_notes()?;
        self.persist_state();
        Ok(())
    }

    /// Write notes to `path` and keep saving there
    pub fn save_as<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let meta = self.document_meta()?;
        self.notes.flush(path, &meta)?;
        self.autosave.saved();
        self.notes_path = Some(path.to_path_buf());
        self.persist_state();
        info!("reader: notes saved as {}", path.display());
        Ok(())
    }

    fn save_notes(&mut self) -> Result<()> {
        let meta = self.document_meta()?;
        let path = self.notes_path.clone().ok_or(Error::NoDocument)?;
        self.notes.flush(&path, &meta)?;
        self.autosave.saved();
        Ok(())
    }

    fn save_pending_notes(&mut self) -> Result<()> {
        if self.document.is_open() && self.notes.is_dirty() {
            self.save_notes()?;
        }
        Ok(())
    }

    fn document_meta(&self) -> Result<DocumentMeta> {
        let book_path = self.document.path().ok_or(Error::NoDocument)?;
        Ok(DocumentMeta {
            title: self.document.title().unwrap_or("Untitled").to_string(),
            book_path: book_path.to_path_buf(),
            last_page: self.document.current_page(),
            zoom_level: self.document.zoom(),
            last_saved: None,
        })
    }

    /// Drive the autosave timers. Returns the trigger when a save happened.
    pub fn tick(&mut self, now: Instant) -> Option<AutosaveTrigger> {
        let trigger = self.autosave.poll(now)?;
        if !self.document.is_open() || !self.notes.is_dirty() {
            return None;
        }
        debug!("reader: autosave ({:?})", trigger);
        match self.save_notes() {
            Ok(()) => {
                self.persist_state();
                Some(trigger)
            }
            Err(err) => {
                self.remember("autosaving notes", &err);
                None
            }
        }
    }

    pub fn set_autosave(&mut self, enabled: bool) {
        self.autosave.set_enabled(enabled, Instant::now());
    }

    // =========================
    // View settings
    // =========================

    pub fn zoom_in(&mut self) -> Zoom {
        self.set_zoom(self.document.zoom().zoom_in())
    }

    pub fn zoom_out(&mut self) -> Zoom {
        self.set_zoom(self.document.zoom().zoom_out())
    }

    pub fn reset_zoom(&mut self) -> Zoom {
        self.set_zoom(Zoom::default())
    }

    fn set_zoom(&mut self, zoom: Zoom) -> Zoom {
        self.document.set_zoom(zoom);
        self.persist_state();
        zoom
    }

    pub fn toggle_theme(&mut self) -> Theme {
        self.set_theme(self.theme.toggled())
    }

    pub fn set_theme(&mut self, theme: Theme) -> Theme {
        self.theme = theme;
        self.persist_state();
        theme
    }

    // =========================
    // Bookmarks & highlights
    // =========================

    pub fn add_bookmark(&mut self, label: &str, anchor: usize) -> bool {
        self.markers.add(MarkerKind::Bookmark, label, anchor)
    }

    pub fn add_highlight(&mut self, label: &str, anchor: usize) -> bool {
        self.markers.add(MarkerKind::Highlight, label, anchor)
    }

    // =========================
    // Usage
    // =========================

    pub fn stats(&self, today: NaiveDate) -> ReadingStats {
        let days_used = self.usage.days_used();
        let avg_pages_per_day = if self.document.is_open() && days_used > 0 {
            Some(self.document.page_count() / days_used)
        } else {
            None
        };
        ReadingStats {
            days_used,
            current_streak: self.usage.streak(today),
            longest_streak: self.usage.longest_streak(),
            total_notes: self.notes.non_empty_count(),
            avg_pages_per_day,
        }
    }

    fn record_usage(&mut self) {
        if let Err(err) = self.usage.record(today()) {
            self.remember("recording usage", &err);
        }
    }

    // =========================
    // Persistence helpers
    // =========================

    fn persist_state(&mut self) {
        let state = self.current_state();
        if let Err(err) = self.state_store.save(&state) {
            self.remember("saving application state", &err);
        }
    }

    fn remember(&mut self, context: &str, err: &Error) {
        warn!("reader: {} failed: {}", context, err);
        self.persist_error = Some(format!("Failed {}: {}", context, err));
    }

    /// Best-effort save of notes, usage and state, then close the document
    pub fn shutdown(&mut self) {
        if self.document.is_open() && self.notes.is_dirty() {
            if let Err(err) = self.save_notes() {
                warn!("reader: saving notes on exit failed: {}", err);
            }
        }
        if let Err(err) = self.usage.save() {
            warn!("reader: saving usage on exit failed: {}", err);
        }
        if let Err(err) = self.state_store.save(&self.current_state()) {
            warn!("reader: saving state on exit failed: {}", err);
        }
        self.document.close();
        info!("reader: shut down");
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
