//! PDF access behind a small engine trait, plus the session that tracks the
//! open document, current page and zoom.

use crate::models::Zoom;
use crate::{Error, Result};
use image::{ImageBuffer, Rgba};
use log::{debug, info};
use lopdf::{Document, ObjectId};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

#[cfg(feature = "pdfium")]
pub mod pdfium;

pub type RgbaImage = ImageBuffer<Rgba<u8>, Vec<u8>>;

/// Longest edge of any raster, in pixels
pub const MAX_RASTER_EDGE: u32 = 8192;

const PAPER: Rgba<u8> = Rgba([255, 255, 255, 255]);

const LETTER: PageSize = PageSize {
    width_pt: 612.0,
    height_pt: 792.0,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentHandle(u64);

impl DocumentHandle {
    pub fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width_pt: f32,
    pub height_pt: f32,
}

/// The capabilities the reader needs from a PDF library
pub trait PdfEngine {
    fn open(&mut self, path: &Path) -> Result<DocumentHandle>;
    fn page_count(&self, handle: DocumentHandle) -> Result<usize>;
    fn page_size(&self, handle: DocumentHandle, page_index: usize) -> Result<PageSize>;
    fn render_page(
        &self,
        handle: DocumentHandle,
        page_index: usize,
        scale: f32,
    ) -> Result<RgbaImage>;
    fn page_text(&self, handle: DocumentHandle, page_index: usize) -> Result<String>;
    fn close(&mut self, handle: DocumentHandle) -> Result<()>;
}

#[derive(Debug)]
struct DocumentRecord {
    doc: Document,
    pages: Vec<(u32, ObjectId)>,
    page_sizes: Vec<PageSize>,
}

/// Pixel dimensions for a page at `scale`, shrunk to fit
/// [`MAX_RASTER_EDGE`] while keeping the aspect ratio
pub fn raster_size(page: PageSize, scale: f32) -> (u32, u32) {
    let scale = if scale > 0.0 { scale } else { 1.0 };
    let width = page.width_pt * scale;
    let height = page.height_pt * scale;
    let limit = MAX_RASTER_EDGE as f32;
    let longest = width.max(height);
    let fit = if longest > limit { limit / longest } else { 1.0 };
    let edge = |pt: f32| (pt * fit).round().min(limit).max(1.0) as u32;
    (edge(width), edge(height))
}

/// [`PdfEngine`] on top of `lopdf`.
///
/// Parses structure, geometry and text. It cannot rasterize content streams:
/// `render_page` yields a blank sheet with the page's pixel dimensions. Build
/// with the `pdfium` feature for `pdfium::PdfiumEngine`, which draws pages.
#[derive(Debug, Default)]
pub struct LopdfEngine {
    next_handle: u64,
    docs: HashMap<DocumentHandle, DocumentRecord>,
}

impl LopdfEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn parse(bytes: &[u8]) -> Result<DocumentRecord> {
        if bytes.windows("/Encrypt".len()).any(|window| window == b"/Encrypt") {
            return Err(Error::InvalidInput("encrypted PDFs are not supported".to_string()));
        }

        let doc = Document::load_mem(bytes)?;
        let pages: Vec<(u32, ObjectId)> = doc.get_pages().into_iter().collect();
        let mut page_sizes = Vec::with_capacity(pages.len());

        for (_, object_id) in &pages {
            let dict = doc.get_dictionary(*object_id)?;
            let size = dict
                .get(b"MediaBox")
                .ok()
                .and_then(|obj| obj.as_array().ok())
                .and_then(|array| {
                    if array.len() != 4 {
                        return None;
                    }
                    let x0 = array[0].as_float().ok()?;
                    let y0 = array[1].as_float().ok()?;
                    let x1 = array[2].as_float().ok()?;
                    let y1 = array[3].as_float().ok()?;
                    Some(PageSize {
                        width_pt: (x1 - x0).abs(),
                        height_pt: (y1 - y0).abs(),
                    })
                })
                .unwrap_or(LETTER);
            page_sizes.push(size);
        }

        Ok(DocumentRecord {
            doc,
            pages,
            page_sizes,
        })
    }

    /// Parse `bytes` and register the document under a new handle
    pub(crate) fn open_bytes(&mut self, bytes: &[u8]) -> Result<DocumentHandle> {
        let record = Self::parse(bytes)?;
        self.next_handle += 1;
        let handle = DocumentHandle(self.next_handle);
        self.docs.insert(handle, record);
        Ok(handle)
    }

    fn record(&self, handle: DocumentHandle) -> Result<&DocumentRecord> {
        self.docs
            .get(&handle)
            .ok_or_else(|| Error::InvalidInput(format!("invalid document handle {}", handle.raw())))
    }

    fn check_page(record: &DocumentRecord, page_index: usize) -> Result<()> {
        if page_index >= record.pages.len() {
            return Err(Error::PageOutOfRange {
                page: page_index,
                page_count: record.pages.len(),
            });
        }
        Ok(())
    }
}

impl PdfEngine for LopdfEngine {
    fn open(&mut self, path: &Path) -> Result<DocumentHandle> {
        let bytes = fs::read(path)?;
        self.open_bytes(&bytes)
    }

    fn page_count(&self, handle: DocumentHandle) -> Result<usize> {
        Ok(self.record(handle)?.pages.len())
    }

    fn page_size(&self, handle: DocumentHandle, page_index: usize) -> Result<PageSize> {
        let record = self.record(handle)?;
        Self::check_page(record, page_index)?;
        Ok(record.page_sizes[page_index])
    }

    fn render_page(
        &self,
        handle: DocumentHandle,
        page_index: usize,
        scale: f32,
    ) -> Result<RgbaImage> {
        let (width, height) = raster_size(self.page_size(handle, page_index)?, scale);
        Ok(RgbaImage::from_pixel(width, height, PAPER))
    }

    fn page_text(&self, handle: DocumentHandle, page_index: usize) -> Result<String> {
        let record = self.record(handle)?;
        Self::check_page(record, page_index)?;
        let (page_number, _) = record.pages[page_index];
        Ok(record.doc.extract_text(&[page_number])?)
    }

    fn close(&mut self, handle: DocumentHandle) -> Result<()> {
        self.docs
            .remove(&handle)
            .map(|_| ())
            .ok_or_else(|| Error::InvalidInput(format!("invalid document handle {}", handle.raw())))
    }
}

#[derive(Debug)]
struct OpenDocument {
    handle: DocumentHandle,
    path: PathBuf,
    title: String,
    page_count: usize,
}

/// The open document with its reading position
#[derive(Debug)]
pub struct DocumentSession<E: PdfEngine = LopdfEngine> {
    engine: E,
    open: Option<OpenDocument>,
    current_page: usize,
    zoom: Zoom,
}

impl Default for DocumentSession<LopdfEngine> {
    fn default() -> Self {
        Self::new(LopdfEngine::new())
    }
}

impl<E: PdfEngine> DocumentSession<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            open: None,
            current_page: 0,
            zoom: Zoom::default(),
        }
    }

    /// Open `path`, replacing the current document only on success.
    ///
    /// Returns the page count and resets the position to the first page.
    pub fn open<P: AsRef<Path>>(&mut self, path: P) -> Result<usize> {
        let path = path.as_ref();
        let unreadable = |reason: String| Error::UnreadableDocument {
            path: path.to_path_buf(),
            reason,
        };

        let handle = self.engine.open(path).map_err(|e| unreadable(e.to_string()))?;
        let page_count = match self.engine.page_count(handle) {
            Ok(0) => {
                let _ = self.engine.close(handle);
                return Err(unreadable("document has no pages".to_string()));
            }
            Ok(count) => count,
            Err(e) => {
                let _ = self.engine.close(handle);
                return Err(unreadable(e.to_string()));
            }
        };

        self.close();
        let title = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Untitled".to_string());
        info!("document: opened {} ({} pages)", path.display(), page_count);

        self.open = Some(OpenDocument {
            handle,
            path: path.to_path_buf(),
            title,
            page_count,
        });
        self.current_page = 0;
        Ok(page_count)
    }

    pub fn close(&mut self) {
        if let Some(doc) = self.open.take() {
            debug!("document: closing {}", doc.path.display());
            let _ = self.engine.close(doc.handle);
        }
        self.current_page = 0;
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    /// Page count of the open document, 0 when none is open
    pub fn page_count(&self) -> usize {
        self.open.as_ref().map(|doc| doc.page_count).unwrap_or(0)
    }

    pub fn title(&self) -> Option<&str> {
        self.open.as_ref().map(|doc| doc.title.as_str())
    }

    pub fn path(&self) -> Option<&Path> {
        self.open.as_ref().map(|doc| doc.path.as_path())
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn zoom(&self) -> Zoom {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: Zoom) {
        self.zoom = zoom;
    }

    /// Move to `page`, which must exist in the open document
    pub fn go_to(&mut self, page: usize) -> Result<()> {
        let page_count = self.open.as_ref().ok_or(Error::NoDocument)?.page_count;
        if page >= page_count {
            return Err(Error::PageOutOfRange { page, page_count });
        }
        self.current_page = page;
        Ok(())
    }

    pub fn render(&self, page_index: usize, zoom: Zoom) -> Result<RgbaImage> {
        let doc = self.open.as_ref().ok_or(Error::NoDocument)?;
        self.engine.render_page(doc.handle, page_index, zoom.factor())
    }

    pub fn render_current(&self) -> Result<RgbaImage> {
        self.render(self.current_page, self.zoom)
    }

    pub fn page_text(&self, page_index: usize) -> Result<String> {
        let doc = self.open.as_ref().ok_or(Error::NoDocument)?;
        self.engine.page_text(doc.handle, page_index)
    }

    pub fn page_size(&self, page_index: usize) -> Result<PageSize> {
        let doc = self.open.as_ref().ok_or(Error::NoDocument)?;
        self.engine.page_size(doc.handle, page_index)
    }
}

/// Write a rendered page as PNG
pub fn save_png<P: AsRef<Path>>(image: &RgbaImage, path: P) -> Result<()> {
    let path = path.as_ref();
    image.save_with_format(path, image::ImageFormat::Png)?;
    debug!("document: wrote {}x{} raster to {}", image.width(), image.height(), path.display());
    Ok(())
}
