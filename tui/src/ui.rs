mod layout;
mod palette;
mod widgets;

pub use layout::render;
pub use palette::Palette;
pub use widgets::{
    render_about,
    render_calendar,
    render_header,
    render_help_screen,
    render_markers_panel,
    render_notes_editor,
    render_page_pane,
    render_prompt,
    render_settings,
    render_stats,
    render_status_bar,
};
