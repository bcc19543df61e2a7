mod data_dir;
mod json_file;
mod note_store;
mod state_store;
mod usage_tracker;

pub use data_dir::DataDir;
pub use json_file::{read_json, write_json};
pub use note_store::NoteStore;
pub use state_store::StateStore;
pub use usage_tracker::{DayCell, UsageTracker};
