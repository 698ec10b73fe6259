//! Page rasterization: one page of an opened document in, one compressed
//! JPEG out.
//!
//! The engine is behind a trait so the publish pipeline and the range reader
//! can be exercised without a PDF backend. The real backend is MuPDF,
//! enabled with the `pdf` feature.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::ExtendedColorType;
use image::codecs::jpeg::JpegEncoder;

use crate::error::RasterError;

/// An opened paginated document. Pages are 1-based everywhere.
pub trait OpenDocument {
    fn page_count(&self) -> u32;

    fn title(&self) -> Option<String>;

    /// Width/height aspect ratio of the first page, used for viewer sizing.
    fn cover_aspect(&self) -> Option<f32>;

    /// Rasterize one page into a JPEG at the given scale and quality.
    ///
    /// At most one page's raster memory is live at any instant: the page
    /// object and its raster surface are released before this returns.
    fn rasterize_page(&self, page: u32, scale: f32, quality: u8) -> Result<Vec<u8>, RasterError>;

    /// Rasterize one page into a `data:` URI, for callers that embed the
    /// image directly instead of addressing an uploaded asset.
    fn rasterize_page_data_uri(
        &self,
        page: u32,
        scale: f32,
        quality: u8,
    ) -> Result<String, RasterError> {
        let jpeg = self.rasterize_page(page, scale, quality)?;
        Ok(jpeg_data_uri(&jpeg))
    }
}

/// Opens documents from raw bytes.
pub trait DocumentEngine {
    fn open(&self, bytes: &[u8]) -> Result<Box<dyn OpenDocument>, RasterError>;
}

/// Encode JPEG bytes as a `data:` URI.
#[must_use]
pub fn jpeg_data_uri(jpeg: &[u8]) -> String {
    format!("data:image/jpeg;base64,{}", BASE64.encode(jpeg))
}

/// Encode an RGB buffer as JPEG at the given quality.
pub fn encode_jpeg(
    rgb: &[u8],
    width: u32,
    height: u32,
    quality: u8,
    page: u32,
) -> Result<Vec<u8>, RasterError> {
    let mut out = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100));
    encoder
        .encode(rgb, width, height, ExtendedColorType::Rgb8)
        .map_err(|e| RasterError::page(page, format!("jpeg encode: {e}")))?;
    Ok(out)
}

#[cfg(feature = "pdf")]
pub use mupdf_engine::MupdfEngine;

#[cfg(feature = "pdf")]
mod mupdf_engine {
    use mupdf::{Colorspace, Document, Matrix, Pixmap};

    use super::{DocumentEngine, OpenDocument, encode_jpeg};
    use crate::error::RasterError;

    /// MuPDF-backed document engine.
    pub struct MupdfEngine;

    struct MupdfDocument {
        doc: Document,
        page_count: u32,
    }

    impl DocumentEngine for MupdfEngine {
        fn open(&self, bytes: &[u8]) -> Result<Box<dyn OpenDocument>, RasterError> {
            let doc = Document::from_bytes(bytes, "application/pdf")
                .map_err(|e| RasterError::unsupported(e.to_string()))?;
            let page_count = doc
                .page_count()
                .map_err(|e| RasterError::unsupported(e.to_string()))?;
            if page_count <= 0 {
                return Err(RasterError::unsupported("document has no pages"));
            }

            Ok(Box::new(MupdfDocument {
                doc,
                page_count: page_count as u32,
            }))
        }
    }

    impl OpenDocument for MupdfDocument {
        fn page_count(&self) -> u32 {
            self.page_count
        }

        fn title(&self) -> Option<String> {
            self.doc
                .metadata(mupdf::MetadataName::Title)
                .ok()
                .filter(|t| !t.is_empty())
        }

        fn cover_aspect(&self) -> Option<f32> {
            let page = self.doc.load_page(0).ok()?;
            let bounds = page.bounds().ok()?;
            let width = bounds.x1 - bounds.x0;
            let height = bounds.y1 - bounds.y0;
            if width > 0.0 && height > 0.0 {
                Some(width / height)
            } else {
                None
            }
        }

        fn rasterize_page(
            &self,
            page_no: u32,
            scale: f32,
            quality: u8,
        ) -> Result<Vec<u8>, RasterError> {
            if page_no == 0 || page_no > self.page_count {
                return Err(RasterError::page(page_no, "page out of range"));
            }

            let page = self
                .doc
                .load_page((page_no - 1) as i32)
                .map_err(|e| RasterError::page(page_no, e.to_string()))?;

            let transform = Matrix::new_scale(scale, scale);
            let rgb = Colorspace::device_rgb();
            let pixmap = page
                .to_pixmap(&transform, &rgb, false, false)
                .map_err(|e| RasterError::page(page_no, e.to_string()))?;

            let width = pixmap.width();
            let height = pixmap.height();
            let pixels = pixmap_to_rgb(&pixmap, page_no)?;

            // Release the raster surface and the page object before encoding
            // so at most one page's raster memory is live at a time.
            drop(pixmap);
            drop(page);

            encode_jpeg(&pixels, width, height, quality, page_no)
        }
    }

    fn pixmap_to_rgb(pixmap: &Pixmap, page_no: u32) -> Result<Vec<u8>, RasterError> {
        let n = pixmap.n() as usize;
        if n < 3 {
            return Err(RasterError::page(
                page_no,
                format!("unsupported pixmap format: {n} channels"),
            ));
        }

        let width = pixmap.width() as usize;
        let height = pixmap.height() as usize;
        let stride = pixmap.stride() as usize;
        let samples = pixmap.samples();
        let row_bytes = width * n;
        let expected_min = stride.saturating_mul(height);
        if samples.len() < expected_min || row_bytes > stride {
            return Err(RasterError::page(page_no, "pixmap buffer size mismatch"));
        }

        let mut out = Vec::with_capacity(width * height * 3);
        for y in 0..height {
            let row_start = y * stride;
            let row = &samples[row_start..row_start + row_bytes];
            if n == 3 {
                out.extend_from_slice(row);
            } else {
                for px in row.chunks_exact(n) {
                    out.extend_from_slice(&px[..3]);
                }
            }
        }

        Ok(out)
    }
}
