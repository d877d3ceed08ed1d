//! Page rasterization. PDFium-backed behind feature `pdfium`.

use crate::error::{Result, SplitError};
use std::path::Path;

pub const DEFAULT_DPI: u32 = 130;
pub const MAX_DPI: u32 = 600;

/// Renders one zero-based page of the PDF at `path` to PNG bytes.
pub fn render_page(path: &Path, page_index: usize, dpi: u32) -> Result<Vec<u8>> {
    if dpi == 0 || dpi > MAX_DPI {
        return Err(SplitError::InvalidArgument(format!(
            "dpi must be within 1..={}",
            MAX_DPI
        )));
    }

    #[cfg(feature = "pdfium")]
    {
        return pdfium::render_png(path, page_index, dpi);
    }

    #[allow(unreachable_code)]
    {
        let _ = (path, page_index);
        Err(SplitError::Unsupported(
            "page rendering requires the `pdfium` feature".to_string(),
        ))
    }
}

#[cfg(feature = "pdfium")]
mod pdfium {
    use crate::error::{Result, SplitError};
    use pdfium_render::prelude::*;
    use std::io::Cursor;
    use std::path::{Path, PathBuf};

    fn bind() -> Result<Box<dyn PdfiumLibraryBindings>> {
        if let Ok(dir) = std::env::var("PDFIUM_DIR") {
            let lib_path = Pdfium::pdfium_platform_library_name_at_path(&PathBuf::from(dir));
            if let Ok(bindings) = Pdfium::bind_to_library(&lib_path) {
                return Ok(bindings);
            }
        }
        Pdfium::bind_to_system_library().map_err(|e| SplitError::Render(e.to_string()))
    }

    pub(super) fn render_png(path: &Path, page_index: usize, dpi: u32) -> Result<Vec<u8>> {
        if !path.is_file() {
            return Err(SplitError::NotFound(path.display().to_string()));
        }
        let pdfium = Pdfium::new(bind()?);
        let document = pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| SplitError::Render(e.to_string()))?;

        let pages = document.pages();
        if page_index >= pages.len() as usize {
            return Err(SplitError::InvalidArgument(format!(
                "page {} is outside 0..{}",
                page_index,
                pages.len()
            )));
        }
        let page = pages
            .get(page_index as u16)
            .map_err(|e| SplitError::Render(e.to_string()))?;

        let config = PdfRenderConfig::new().scale_page_by_factor(dpi as f32 / 72.0);
        let image = page
            .render_with_config(&config)
            .map_err(|e| SplitError::Render(e.to_string()))?
            .as_image();

        let mut png = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .map_err(|e| SplitError::Render(e.to_string()))?;
        Ok(png)
    }
}
