use super::{theme, Theme, Zoom};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The session-resume record kept in `app_state.json`.
///
/// Every field has a default so that partially written or older files still
/// load; the record is always rewritten as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppState {
    pub last_book_path: Option<PathBuf>,
    pub last_page: usize,
    pub zoom_level: Zoom,
    #[serde(rename = "dark_mode", with = "theme::dark_mode")]
    pub theme: Theme,
    pub last_saved: Option<NaiveDateTime>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            last_book_path: None,
            last_page: 0,
            zoom_level: Zoom::default(),
            theme: Theme::Light,
            last_saved: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let state = AppState::default();
        assert!(state.last_book_path.is_none());
        assert_eq!(state.last_page, 0);
        assert_eq!(state.zoom_level.factor(), 1.5);
        assert_eq!(state.theme, Theme::Light);
    }

    #[test]
    fn test_reads_state_file_layout() {
        let json = r#"{
            "last_book_path": "/books/rust.pdf",
            "last_page": 12,
            "zoom_level": 2.0,
            "dark_mode": true,
            "last_saved": "2024-10-07T21:14:03.512345"
        }"#;
        let state: AppState = serde_json::from_str(json).unwrap();
        assert_eq!(state.last_book_path, Some(PathBuf::from("/books/rust.pdf")));
        assert_eq!(state.last_page, 12);
        assert_eq!(state.zoom_level.factor(), 2.0);
        assert_eq!(state.theme, Theme::Dark);
        assert!(state.last_saved.is_some());
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let state: AppState = serde_json::from_str(r#"{"last_page": 4}"#).unwrap();
        assert_eq!(state.last_page, 4);
        assert_eq!(state.zoom_level, Zoom::default());
        assert_eq!(state.theme, Theme::Light);
    }

    #[test]
    fn test_writes_dark_mode_flag() {
        let state = AppState {
            theme: Theme::Dark,
            ..AppState::default()
        };
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["dark_mode"], serde_json::Value::Bool(true));
        assert_eq!(value["last_book_path"], serde_json::Value::Null);
    }
}
