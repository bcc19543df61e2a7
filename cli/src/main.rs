use anyhow::{Context, Result};
use chrono::Datelike;
use clap::{Parser, Subcommand};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::info;
use marginalia_core::models::{today, NotesFile};
use marginalia_core::storage::{read_json, DataDir, NoteStore, UsageTracker};
use marginalia_tui::{App, Event, EventHandler};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(
    name = "marginalia",
    version,
    about = "PDF reader with per-page notes",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// PDF to open; resumes the last session when omitted
    book: Option<PathBuf>,

    /// Directory holding notes, usage, state and config.toml
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log output file path (enables logging when specified)
    #[arg(long, global = true)]
    log: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print reading statistics
    Stats,
    /// Render one page to PNG with pdfium
    #[cfg(feature = "pdfium")]
    Render {
        pdf: PathBuf,

        /// Page number, starting at 1
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Zoom factor between 0.5 and 3.0
        #[arg(long)]
        zoom: Option<f32>,

        #[arg(short, long, default_value = "page.png")]
        output: PathBuf,
    },
    /// Write a notes file as Markdown
    Export {
        notes: PathBuf,

        /// Output file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(log_path) = &cli.log {
        let file = fs::File::create(log_path)
            .with_context(|| format!("failed to open log file {}", log_path.display()))?;
        env_logger::Builder::from_default_env()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();
    } else if cli.command.is_some() {
        env_logger::init();
    }
    // The terminal UI without --log runs with no logger

    let data_dir = cli
        .data_dir
        .clone()
        .map(DataDir::new)
        .unwrap_or_else(DataDir::default_location);

    match cli.command {
        Some(Command::Stats) => cmd_stats(&data_dir),
        #[cfg(feature = "pdfium")]
        Some(Command::Render {
            pdf,
            page,
            zoom,
            output,
        }) => render::cmd_render(&pdf, page, zoom, &output),
        Some(Command::Export { notes, output }) => {
            let markdown = export_markdown(&notes)?;
            match output {
                Some(path) => fs::write(&path, markdown)
                    .with_context(|| format!("writing {}", path.display())),
                None => {
                    print!("{}", markdown);
                    Ok(())
                }
            }
        }
        None => run_tui(cli.book.as_deref(), data_dir),
    }
}

fn run_tui(book: Option<&Path>, data_dir: DataDir) -> Result<()> {
    info!("starting with data directory {}", data_dir.root().display());
    let mut app = App::new(data_dir)?;
    app.start(book);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let event_handler = EventHandler::new(250); // 250ms tick rate
    let result = run_app(&mut terminal, &mut app, &event_handler);

    app.shutdown();

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), DisableMouseCapture, LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    event_handler: &EventHandler,
) -> Result<()> {
    loop {
        terminal.draw(|f| marginalia_tui::ui::render(f, app))?;

        match event_handler.next()? {
            Event::Key(key) => marginalia_tui::event::handle_key_event(key, app),
            Event::Mouse(mouse) => marginalia_tui::event::handle_mouse_event(mouse, app),
            Event::Tick => {}
        }
        // Timers are deadline based, so polling after every event is enough
        app.tick(Instant::now());

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

fn cmd_stats(data_dir: &DataDir) -> Result<()> {
    let usage = UsageTracker::open(data_dir.usage_path());
    let today = today();

    println!("Days used:       {}", usage.days_used());
    println!("Current streak:  {} days", usage.streak(today));
    println!("Longest streak:  {} days", usage.longest_streak());
    println!();
    println!("{}", today.format("%B %Y"));
    println!(" Mo  Tu  We  Th  Fr  Sa  Su");
    for week in usage.month_grid(today.year(), today.month()) {
        let row: String = week
            .iter()
            .map(|cell| match cell {
                Some(cell) if cell.count > 0 => format!("{:>3}*", cell.date.day()),
                Some(cell) => format!("{:>3} ", cell.date.day()),
                None => "    ".to_string(),
            })
            .collect();
        println!("{}", row.trim_end());
    }
    println!("(* = days with activity)");
    Ok(())
}

/// Notes file as Markdown; the referenced PDF does not need to exist
fn export_markdown(notes_path: &Path) -> Result<String> {
    let file: NotesFile = read_json(notes_path)
        .with_context(|| format!("reading notes file {}", notes_path.display()))?;
    let (meta, notes) = file.into_parts();
    Ok(NoteStore::from_notes(notes).to_markdown(&meta.title))
}

#[cfg(feature = "pdfium")]
mod render {
    use anyhow::{bail, Result};
    use marginalia_core::document::pdfium::PdfiumEngine;
    use marginalia_core::document::{save_png, DocumentSession};
    use marginalia_core::models::Zoom;
    use std::path::Path;

    pub fn cmd_render(pdf: &Path, page: usize, zoom: Option<f32>, output: &Path) -> Result<()> {
        let mut session = DocumentSession::new(PdfiumEngine::from_system_library()?);
        let page_count = session.open(pdf)?;
        if page == 0 || page > page_count {
            bail!("Page number must be between 1 and {} (got {})", page_count, page);
        }
        let zoom = zoom.map(Zoom::new).unwrap_or_default();
        let image = session.render(page - 1, zoom)?;
        save_png(&image, output)?;
        println!(
            "Rendered page {} of {} at {}% to {} ({}x{})",
            page,
            pdf.display(),
            zoom.percent(),
            output.display(),
            image.width(),
            image.height()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marginalia_core::models::{DocumentMeta, Zoom};
    use tempfile::tempdir;

    #[test]
    fn test_parse_book_and_flags() {
        let cli = Cli::try_parse_from(["marginalia", "book.pdf", "--data-dir", "/tmp/m"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.book, Some(PathBuf::from("book.pdf")));
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/m")));
    }

    #[test]
    fn test_parse_stats() {
        let cli = Cli::try_parse_from(["marginalia", "stats"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Stats)));
    }

    #[cfg(feature = "pdfium")]
    #[test]
    fn test_parse_render() {
        let cli = Cli::try_parse_from([
            "marginalia", "render", "a.pdf", "--page", "3", "--zoom", "2.0", "-o", "out.png",
        ])
        .unwrap();
        match cli.command {
            Some(Command::Render { pdf, page, zoom, output }) => {
                assert_eq!(pdf, PathBuf::from("a.pdf"));
                assert_eq!(page, 3);
                assert_eq!(zoom, Some(2.0));
                assert_eq!(output, PathBuf::from("out.png"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_export_without_source_pdf() {
        let dir = tempdir().unwrap();
        let notes_path = dir.path().join("gone.json");

        let mut store = NoteStore::new();
        store.reset(3);
        store.set(1, "kept");
        let meta = DocumentMeta {
            title: "Gone".to_string(),
            book_path: dir.path().join("gone.pdf"),
            last_page: 1,
            zoom_level: Zoom::default(),
            last_saved: None,
        };
        store.flush(&notes_path, &meta).unwrap();

        let markdown = export_markdown(&notes_path).unwrap();
        assert_eq!(markdown, "# Gone\n\n## Page 2\n\nkept\n");
    }
}
