mod app_state;
mod marker;
mod notes_file;
mod stats;
mod theme;
mod zoom;

pub use app_state::AppState;
pub use marker::{Marker, MarkerKind, PageMarkers, MAX_LABEL_CHARS};
pub use notes_file::{DocumentMeta, NotesFile};
pub use stats::ReadingStats;
pub use theme::Theme;
pub use zoom::Zoom;

use chrono::{Local, NaiveDate, NaiveDateTime};

/// Wall-clock time used for `last_saved` stamps
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// The calendar day usage is recorded against
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}
