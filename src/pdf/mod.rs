//! Page text and embedded image extraction for the source manual.
//!
//! Parsing is delegated to `lopdf`; this module only walks pages, normalizes
//! line endings and writes image streams out as standalone files.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use flate2::read::ZlibDecoder;
use lopdf::Document;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF not found: {0:?}")]
    NotFound(PathBuf),

    #[error("Failed to parse PDF {path:?}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Failed to write image {path:?}: {reason}")]
    Write { path: PathBuf, reason: String },
}

/// Raw text of one page. Page numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub number: u32,
    pub text: String,
}

/// An image written to disk during extraction. `path` is relative to the
/// project root whenever the image directory lives under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMeta {
    pub id: String,
    pub page: u32,
    pub path: String,
}

/// Borrowed view of an image XObject, decoupled from lopdf's own type.
#[derive(Debug, Clone, Copy)]
struct RawImage<'a> {
    width: i64,
    height: i64,
    color_space: Option<&'a str>,
    bits_per_component: Option<i64>,
    filters: &'a [String],
    has_decode_parms: bool,
    content: &'a [u8],
}

fn load_document(path: &Path) -> Result<Document, PdfError> {
    if !path.exists() {
        return Err(PdfError::NotFound(path.to_path_buf()));
    }

    Document::load(path).map_err(|err| PdfError::Parse {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })
}

pub fn extract_text_by_page(pdf_path: &Path) -> Result<Vec<Page>, PdfError> {
    let doc = load_document(pdf_path)?;
    let mut pages = Vec::new();

    for page_number in doc.get_pages().keys().copied() {
        let text = match doc.extract_text(&[page_number]) {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!("No text extracted from page {}: {}", page_number, err);
                String::new()
            }
        };
        pages.push(Page {
            number: page_number,
            text: text.replace('\r', "\n"),
        });
    }

    tracing::info!("Extracted text from {} pages", pages.len());
    Ok(pages)
}

/// Writes every decodable page image into `out_dir` as
/// `page<P>_img<I>.<ext>` and returns their metadata in page order.
pub fn extract_images(
    pdf_path: &Path,
    out_dir: &Path,
    project_root: &Path,
) -> Result<Vec<ImageMeta>, PdfError> {
    let doc = load_document(pdf_path)?;
    fs::create_dir_all(out_dir).map_err(|err| PdfError::Write {
        path: out_dir.to_path_buf(),
        reason: err.to_string(),
    })?;

    let mut images = Vec::new();
    for (page_number, page_id) in doc.get_pages() {
        let page_images = match doc.get_page_images(page_id) {
            Ok(found) => found,
            Err(err) => {
                tracing::warn!("Skipping images on page {}: {}", page_number, err);
                continue;
            }
        };

        for (index, image) in page_images.iter().enumerate() {
            let filters = image.filters.clone().unwrap_or_default();
            let raw = RawImage {
                width: image.width,
                height: image.height,
                color_space: image.color_space.as_deref(),
                bits_per_component: image.bits_per_component,
                filters: &filters,
                has_decode_parms: image.origin_dict.has(b"DecodeParms"),
                content: image.content,
            };

            let stem = format!("page{}_img{}", page_number, index);
            if let Some(path) = write_image(&raw, out_dir, &stem)? {
                images.push(ImageMeta {
                    id: format!("img_{}", images.len()),
                    page: page_number,
                    path: relative_path(&path, project_root),
                });
            }
        }
    }

    tracing::info!("Extracted {} images into {}", images.len(), out_dir.display());
    Ok(images)
}

fn relative_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}

fn write_image(image: &RawImage<'_>, out_dir: &Path, stem: &str) -> Result<Option<PathBuf>, PdfError> {
    // JPEG streams are already a complete file.
    if image.filters.iter().any(|filter| filter == "DCTDecode") {
        let path = out_dir.join(format!("{}.jpg", stem));
        fs::write(&path, image.content).map_err(|err| PdfError::Write {
            path: path.clone(),
            reason: err.to_string(),
        })?;
        return Ok(Some(path));
    }

    let pixels = match image.filters {
        [] => image.content.to_vec(),
        [filter] if filter == "FlateDecode" && !image.has_decode_parms => {
            match inflate(image.content) {
                Ok(bytes) => bytes,
                Err(err) => {
                    tracing::warn!("Skipping {}: corrupt Flate stream: {}", stem, err);
                    return Ok(None);
                }
            }
        }
        other => {
            tracing::warn!("Skipping {}: unsupported filters {:?}", stem, other);
            return Ok(None);
        }
    };

    let (color, channels) = match (image.color_space, image.bits_per_component) {
        (Some("DeviceRGB"), Some(8)) => (image::ColorType::Rgb8, 3usize),
        (Some("DeviceGray"), Some(8)) => (image::ColorType::L8, 1usize),
        (space, bits) => {
            tracing::warn!(
                "Skipping {}: unsupported color space {:?} at {:?} bits",
                stem,
                space,
                bits
            );
            return Ok(None);
        }
    };

    let (Ok(width), Ok(height)) = (u32::try_from(image.width), u32::try_from(image.height)) else {
        tracing::warn!("Skipping {}: invalid dimensions", stem);
        return Ok(None);
    };

    let expected = width as usize * height as usize * channels;
    if expected == 0 || pixels.len() < expected {
        tracing::warn!(
            "Skipping {}: expected {} pixel bytes, found {}",
            stem,
            expected,
            pixels.len()
        );
        return Ok(None);
    }

    let path = out_dir.join(format!("{}.png", stem));
    image::save_buffer(&path, &pixels[..expected], width, height, color).map_err(|err| {
        PdfError::Write {
            path: path.clone(),
            reason: err.to_string(),
        }
    })?;
    Ok(Some(path))
}

fn inflate(content: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(content);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}
