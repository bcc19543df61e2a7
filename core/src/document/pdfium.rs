//! Page rasterization through the system pdfium library.

use super::{raster_size, DocumentHandle, LopdfEngine, PageSize, PdfEngine, RgbaImage};
use crate::{Error, Result};
use log::debug;
use pdfium_render::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

fn render_error(context: &str, err: PdfiumError) -> Error {
    Error::Render(format!("{}: {:?}", context, err))
}

/// [`PdfEngine`] drawing pages with pdfium. Structure, geometry and text
/// still come from [`LopdfEngine`].
pub struct PdfiumEngine {
    pdfium: Pdfium,
    inner: LopdfEngine,
    bytes: HashMap<DocumentHandle, Vec<u8>>,
}

impl PdfiumEngine {
    pub fn from_system_library() -> Result<Self> {
        let bindings = Pdfium::bind_to_system_library()
            .map_err(|err| render_error("failed to bind pdfium system library", err))?;
        Ok(Self {
            pdfium: Pdfium::new(bindings),
            inner: LopdfEngine::new(),
            bytes: HashMap::new(),
        })
    }
}

impl PdfEngine for PdfiumEngine {
    fn open(&mut self, path: &Path) -> Result<DocumentHandle> {
        let bytes = fs::read(path)?;
        let handle = self.inner.open_bytes(&bytes)?;
        self.bytes.insert(handle, bytes);
        Ok(handle)
    }

    fn page_count(&self, handle: DocumentHandle) -> Result<usize> {
        self.inner.page_count(handle)
    }

    fn page_size(&self, handle: DocumentHandle, page_index: usize) -> Result<PageSize> {
        self.inner.page_size(handle, page_index)
    }

    fn render_page(
        &self,
        handle: DocumentHandle,
        page_index: usize,
        scale: f32,
    ) -> Result<RgbaImage> {
        let size = self.inner.page_size(handle, page_index)?;
        let (width, height) = raster_size(size, scale);
        let bytes = self
            .bytes
            .get(&handle)
            .ok_or_else(|| Error::InvalidInput(format!("invalid document handle {}", handle.raw())))?;

        let document = self
            .pdfium
            .load_pdf_from_byte_slice(bytes, None)
            .map_err(|err| render_error("pdfium cannot load document", err))?;
        let index = page_index.try_into().map_err(|_| Error::PageOutOfRange {
            page: page_index,
            page_count: self.inner.page_count(handle).unwrap_or(0),
        })?;
        let page = document
            .pages()
            .get(index)
            .map_err(|err| render_error("pdfium cannot load page", err))?;

        let config = PdfRenderConfig::new()
            .set_target_width(width as i32)
            .set_maximum_height(height as i32);
        let bitmap = page
            .render_with_config(&config)
            .map_err(|err| render_error("pdfium cannot render page", err))?;

        let (out_width, out_height) = (bitmap.width() as u32, bitmap.height() as u32);
        debug!("pdfium: page {} rendered at {}x{}", page_index + 1, out_width, out_height);
        RgbaImage::from_raw(out_width, out_height, bitmap.as_rgba_bytes())
            .ok_or_else(|| Error::Render("pdfium returned a truncated bitmap".to_string()))
    }

    fn page_text(&self, handle: DocumentHandle, page_index: usize) -> Result<String> {
        self.inner.page_text(handle, page_index)
    }

    fn close(&mut self, handle: DocumentHandle) -> Result<()> {
        self.bytes.remove(&handle);
        self.inner.close(handle)
    }
}
