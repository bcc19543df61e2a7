use anyhow::{Context, Result};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use log::{info, warn};
use marginalia_core::autosave::AutosaveSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Key binding strings such as `"ctrl-s"`, `"shift-o"` or `"right"`
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Keymap {
    pub quit: String,
    pub help: String,
    pub save: String,
    pub save_as: String,
    pub open_book: String,
    pub open_notes: String,
    pub export: String,
    pub next_page: String,
    pub prev_page: String,
    pub goto_page: String,
    pub edit_notes: String,
    pub zoom_in: String,
    pub zoom_out: String,
    pub reset_zoom: String,
    pub toggle_theme: String,
    pub toggle_autosave: String,
    pub bookmark: String,
    pub highlight: String,
    pub prev_marker: String,
    pub next_marker: String,
    pub main_view: String,
    pub calendar_view: String,
    pub settings_view: String,
    pub about_view: String,
}

impl Default for Keymap {
    fn default() -> Self {
        Self {
            quit: "q".to_string(),
            help: "h".to_string(),
            save: "ctrl-s".to_string(),
            save_as: "shift-s".to_string(),
            open_book: "o".to_string(),
            open_notes: "shift-o".to_string(),
            export: "e".to_string(),
            next_page: "right".to_string(),
            prev_page: "left".to_string(),
            goto_page: "g".to_string(),
            edit_notes: "enter".to_string(),
            zoom_in: "+".to_string(),
            zoom_out: "-".to_string(),
            reset_zoom: "0".to_string(),
            toggle_theme: "t".to_string(),
            toggle_autosave: "a".to_string(),
            bookmark: "b".to_string(),
            highlight: "m".to_string(),
            prev_marker: "[".to_string(),
            next_marker: "]".to_string(),
            main_view: "1".to_string(),
            calendar_view: "2".to_string(),
            settings_view: "3".to_string(),
            about_view: "4".to_string(),
        }
    }
}

/// Everything a key can be bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    Help,
    Save,
    SaveAs,
    OpenBook,
    OpenNotes,
    Export,
    NextPage,
    PrevPage,
    GotoPage,
    EditNotes,
    ZoomIn,
    ZoomOut,
    ResetZoom,
    ToggleTheme,
    ToggleAutosave,
    Bookmark,
    Highlight,
    PrevMarker,
    NextMarker,
    MainView,
    CalendarView,
    SettingsView,
    AboutView,
}

impl Keymap {
    fn entries(&self) -> [(Action, &str); 24] {
        [
            (Action::Quit, self.quit.as_str()),
            (Action::Help, self.help.as_str()),
            (Action::Save, self.save.as_str()),
            (Action::SaveAs, self.save_as.as_str()),
            (Action::OpenBook, self.open_book.as_str()),
            (Action::OpenNotes, self.open_notes.as_str()),
            (Action::Export, self.export.as_str()),
            (Action::NextPage, self.next_page.as_str()),
            (Action::PrevPage, self.prev_page.as_str()),
            (Action::GotoPage, self.goto_page.as_str()),
            (Action::EditNotes, self.edit_notes.as_str()),
            (Action::ZoomIn, self.zoom_in.as_str()),
            (Action::ZoomOut, self.zoom_out.as_str()),
            (Action::ResetZoom, self.reset_zoom.as_str()),
            (Action::ToggleTheme, self.toggle_theme.as_str()),
            (Action::ToggleAutosave, self.toggle_autosave.as_str()),
            (Action::Bookmark, self.bookmark.as_str()),
            (Action::Highlight, self.highlight.as_str()),
            (Action::PrevMarker, self.prev_marker.as_str()),
            (Action::NextMarker, self.next_marker.as_str()),
            (Action::MainView, self.main_view.as_str()),
            (Action::CalendarView, self.calendar_view.as_str()),
            (Action::SettingsView, self.settings_view.as_str()),
            (Action::AboutView, self.about_view.as_str()),
        ]
    }

    /// Parse every binding; unparseable strings are logged and skipped
    pub fn resolve(&self) -> Vec<(KeyBinding, Action)> {
        self.entries()
            .into_iter()
            .filter_map(|(action, binding)| match KeyBinding::parse(binding) {
                Some(binding) => Some((binding, action)),
                None => {
                    warn!("config: ignoring unknown key binding {:?} for {:?}", binding, action);
                    None
                }
            })
            .collect()
    }

    /// The binding string shown in hints and help for `action`
    pub fn label(&self, action: Action) -> &str {
        self.entries()
            .into_iter()
            .find(|(a, _)| *a == action)
            .map(|(_, binding)| binding)
            .unwrap_or("")
    }
}

/// A parsed key binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyBinding {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeyBinding {
    pub fn parse(text: &str) -> Option<Self> {
        let mut rest = text.trim();
        let mut modifiers = KeyModifiers::NONE;
        loop {
            let lower = rest.to_ascii_lowercase();
            if rest.len() > 5 && lower.starts_with("ctrl-") {
                modifiers |= KeyModifiers::CONTROL;
                rest = &rest[5..];
            } else if rest.len() > 4 && lower.starts_with("alt-") {
                modifiers |= KeyModifiers::ALT;
                rest = &rest[4..];
            } else if rest.len() > 6 && lower.starts_with("shift-") {
                modifiers |= KeyModifiers::SHIFT;
                rest = &rest[6..];
            } else {
                break;
            }
        }

        let code = match rest.to_ascii_lowercase().as_str() {
            "enter" => KeyCode::Enter,
            "esc" => KeyCode::Esc,
            "tab" => KeyCode::Tab,
            "backspace" => KeyCode::Backspace,
            "delete" => KeyCode::Delete,
            "insert" => KeyCode::Insert,
            "space" => KeyCode::Char(' '),
            "left" => KeyCode::Left,
            "right" => KeyCode::Right,
            "up" => KeyCode::Up,
            "down" => KeyCode::Down,
            "home" => KeyCode::Home,
            "end" => KeyCode::End,
            "pageup" => KeyCode::PageUp,
            "pagedown" => KeyCode::PageDown,
            name if name.len() > 1 && name.starts_with('f') => {
                let n: u8 = name[1..].parse().ok()?;
                if !(1..=12).contains(&n) {
                    return None;
                }
                KeyCode::F(n)
            }
            _ => {
                let mut chars = rest.chars();
                let c = chars.next()?;
                if chars.next().is_some() {
                    return None;
                }
                KeyCode::Char(c.to_ascii_lowercase())
            }
        };
        Some(Self { code, modifiers })
    }

    /// Letters compare case-insensitively, with an uppercase letter counting
    /// as shifted. Shift is ignored for other characters since the terminal
    /// folds it into the character itself.
    pub fn matches(&self, key: &KeyEvent) -> bool {
        let strict = KeyModifiers::CONTROL | KeyModifiers::ALT;
        if key.modifiers & strict != self.modifiers & strict {
            return false;
        }
        match (self.code, key.code) {
            (KeyCode::Char(want), KeyCode::Char(got)) => {
                if want != got.to_ascii_lowercase() {
                    return false;
                }
                if want.is_ascii_alphabetic() {
                    let shifted = key.modifiers.contains(KeyModifiers::SHIFT) || got.is_ascii_uppercase();
                    shifted == self.modifiers.contains(KeyModifiers::SHIFT)
                } else {
                    true
                }
            }
            (want, got) => {
                want == got
                    && key.modifiers.contains(KeyModifiers::SHIFT)
                        == self.modifiers.contains(KeyModifiers::SHIFT)
            }
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub autosave: AutosaveSettings,
    pub keymap: Keymap,
}

/// Read `config.toml`, writing the defaults first when it does not exist
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        let config = Config::default();
        let toml = toml::to_string(&config).context("serializing default config")?;
        fs::write(path, toml).with_context(|| format!("writing {}", path.display()))?;
        info!("config: wrote defaults to {}", path.display());
        return Ok(config);
    }

    let content =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn test_parse_bindings() {
        let save = KeyBinding::parse("ctrl-s").unwrap();
        assert_eq!(save.code, KeyCode::Char('s'));
        assert_eq!(save.modifiers, KeyModifiers::CONTROL);

        assert_eq!(KeyBinding::parse("Right").unwrap().code, KeyCode::Right);
        assert_eq!(KeyBinding::parse("-").unwrap().code, KeyCode::Char('-'));
        assert_eq!(KeyBinding::parse("f5").unwrap().code, KeyCode::F(5));
        assert_eq!(KeyBinding::parse("f").unwrap().code, KeyCode::Char('f'));
        assert!(KeyBinding::parse("f13").is_none());
        assert!(KeyBinding::parse("ctrl-").is_none());
        assert!(KeyBinding::parse("nonsense").is_none());
    }

    #[test]
    fn test_matches() {
        let save = KeyBinding::parse("ctrl-s").unwrap();
        assert!(save.matches(&key(KeyCode::Char('s'), KeyModifiers::CONTROL)));
        assert!(!save.matches(&key(KeyCode::Char('s'), KeyModifiers::NONE)));

        let save_as = KeyBinding::parse("shift-s").unwrap();
        assert!(save_as.matches(&key(KeyCode::Char('S'), KeyModifiers::SHIFT)));
        assert!(save_as.matches(&key(KeyCode::Char('S'), KeyModifiers::NONE)));
        assert!(!save_as.matches(&key(KeyCode::Char('s'), KeyModifiers::NONE)));

        let zoom_in = KeyBinding::parse("+").unwrap();
        assert!(zoom_in.matches(&key(KeyCode::Char('+'), KeyModifiers::SHIFT)));

        let next = KeyBinding::parse("right").unwrap();
        assert!(next.matches(&key(KeyCode::Right, KeyModifiers::NONE)));
        assert!(!next.matches(&key(KeyCode::Right, KeyModifiers::SHIFT)));
    }

    #[test]
    fn test_default_keymap_resolves_completely() {
        let keymap = Keymap::default();
        assert_eq!(keymap.resolve().len(), 24);
        assert_eq!(keymap.label(Action::Save), "ctrl-s");
    }

    #[test]
    fn test_load_config_writes_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let config = load_config(&path).unwrap();
        assert!(config.autosave.enabled);
        assert!(path.exists());

        let reloaded = load_config(&path).unwrap();
        assert_eq!(reloaded.keymap.quit, "q");
        assert_eq!(reloaded.autosave.delay_secs, 2);
    }

    #[test]
    fn test_load_partial_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[autosave]\nenabled = false\n\n[keymap]\nquit = \"ctrl-q\"\n").unwrap();

        let config = load_config(&path).unwrap();
        assert!(!config.autosave.enabled);
        assert_eq!(config.autosave.backup_interval_secs, 60);
        assert_eq!(config.keymap.quit, "ctrl-q");
        assert_eq!(config.keymap.save, "ctrl-s");
    }

    #[test]
    fn test_load_invalid_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[autosave\n").unwrap();
        assert!(load_config(&path).is_err());
    }
}
