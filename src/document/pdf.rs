//! First-page rasterization for PDFs
//!
//! The first page is rendered with `hayro` at [`RENDER_DPI`], so text-only
//! and vector pages work and page rotation is honoured. Files the renderer
//! cannot open fall back to decoding the largest image XObject the page
//! paints, which covers most scanner output.

use hayro::{InterpreterSettings, Pdf, RenderSettings};
use image::{DynamicImage, GrayImage, ImageFormat, Rgb, RgbImage, RgbaImage};
use lopdf::{Dictionary, Document, Object, Stream};
use std::sync::Arc;
use tracing::{debug, warn};

use super::DocumentError;

/// Resolution pages are rendered at
pub const RENDER_DPI: f32 = 200.0;

/// PDF user space units per inch
const POINTS_PER_INCH: f32 = 72.0;

/// Parent chain depth limit when looking for inherited resources
const MAX_INHERITANCE_DEPTH: usize = 32;

/// Raster of the first page
pub fn first_page_image(bytes: &[u8]) -> Result<DynamicImage, DocumentError> {
    match render_first_page(bytes, RENDER_DPI) {
        Err(DocumentError::PdfRender(reason)) => {
            warn!("PDF renderer rejected the file ({}), looking for an embedded image", reason);
            largest_page_image(bytes)
        }
        result => result,
    }
}

/// Render the first page, flattened onto white
pub fn render_first_page(bytes: &[u8], dpi: f32) -> Result<DynamicImage, DocumentError> {
    let data: Arc<dyn AsRef<[u8]> + Send + Sync> = Arc::new(bytes.to_vec());
    let pdf = Pdf::new(data).map_err(|e| DocumentError::PdfRender(format!("{e:?}")))?;
    let pages = pdf.pages();
    let page = pages.first().ok_or(DocumentError::PdfNoPages)?;
    debug!("PDF has {} pages, rendering the first at {} dpi", pages.len(), dpi);

    let scale = dpi / POINTS_PER_INCH;
    let settings = RenderSettings {
        x_scale: scale,
        y_scale: scale,
        ..Default::default()
    };
    let pixmap = hayro::render(page, &InterpreterSettings::default(), &settings);
    let rendered = image::load_from_memory_with_format(&pixmap.take_png(), ImageFormat::Png)?;

    Ok(DynamicImage::ImageRgb8(flatten_on_white(&rendered.to_rgba8())))
}

/// Composite over a white sheet; unpainted page areas are transparent
fn flatten_on_white(image: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, a] = image.get_pixel(x, y).0;
        let blend = |c: u8| ((c as u32 * a as u32 + 255 * (255 - a as u32)) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}

/// Decode the largest image on the first page
pub fn largest_page_image(bytes: &[u8]) -> Result<DynamicImage, DocumentError> {
    let doc = Document::load_mem(bytes)?;
    let pages = doc.get_pages();
    let page_id = *pages.values().next().ok_or(DocumentError::PdfNoPages)?;

    let page = doc.get_dictionary(page_id)?;
    let resources = inherited_resources(&doc, page).ok_or(DocumentError::PdfNoImage)?;
    let xobjects = resources
        .get(b"XObject")
        .ok()
        .and_then(|x| resolve_dict(&doc, x))
        .ok_or(DocumentError::PdfNoImage)?;

    let stream = xobjects
        .iter()
        .filter_map(|(_, obj)| doc.dereference(obj).ok())
        .filter_map(|(_, obj)| obj.as_stream().ok())
        .filter(|stream| is_image(stream))
        .max_by_key(|stream| {
            let width = integer(&doc, &stream.dict, b"Width").unwrap_or(0);
            let height = integer(&doc, &stream.dict, b"Height").unwrap_or(0);
            width.saturating_mul(height)
        })
        .ok_or(DocumentError::PdfNoImage)?;

    decode_image_stream(&doc, stream)
}

/// Page resources, following `Parent` links when the page inherits them
fn inherited_resources<'a>(doc: &'a Document, page: &'a Dictionary) -> Option<&'a Dictionary> {
    let mut node = page;
    for _ in 0..MAX_INHERITANCE_DEPTH {
        if let Some(resources) = node.get(b"Resources").ok().and_then(|r| resolve_dict(doc, r)) {
            return Some(resources);
        }
        node = node.get(b"Parent").ok().and_then(|p| resolve_dict(doc, p))?;
    }
    None
}

fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    doc.dereference(obj).ok().and_then(|(_, o)| o.as_dict().ok())
}

fn integer(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<i64> {
    let obj = dict.get(key).ok()?;
    doc.dereference(obj).ok()?.1.as_i64().ok()
}

fn is_image(stream: &Stream) -> bool {
    matches!(stream.dict.get(b"Subtype"), Ok(Object::Name(name)) if name == b"Image")
}

fn filter_names(doc: &Document, dict: &Dictionary) -> Vec<Vec<u8>> {
    let Some(filter) = dict.get(b"Filter").ok().and_then(|f| doc.dereference(f).ok()) else {
        return Vec::new();
    };
    match filter.1 {
        Object::Name(name) => vec![name.clone()],
        Object::Array(items) => items
            .iter()
            .filter_map(|item| item.as_name().ok().map(<[u8]>::to_vec))
            .collect(),
        _ => Vec::new(),
    }
}

/// Number of colour components, if the colour space names one directly
fn color_components(doc: &Document, dict: &Dictionary) -> Option<u32> {
    let (_, space) = doc.dereference(dict.get(b"ColorSpace").ok()?).ok()?;
    let name = match space {
        Object::Name(name) => name.as_slice(),
        Object::Array(items) => items.first()?.as_name().ok()?,
        _ => return None,
    };
    match name {
        b"DeviceGray" | b"CalGray" => Some(1),
        b"DeviceRGB" | b"CalRGB" => Some(3),
        b"DeviceCMYK" => Some(4),
        _ => None,
    }
}

fn decode_image_stream(doc: &Document, stream: &Stream) -> Result<DynamicImage, DocumentError> {
    let filters = filter_names(doc, &stream.dict);

    if filters.iter().any(|f| f == b"DCTDecode") {
        if filters.len() > 1 {
            return Err(DocumentError::UnsupportedPdfImage(
                "chained filters before DCTDecode".to_string(),
            ));
        }
        debug!("Decoding embedded JPEG ({} bytes)", stream.content.len());
        return Ok(image::load_from_memory_with_format(&stream.content, ImageFormat::Jpeg)?);
    }

    let data = if filters.is_empty() {
        stream.content.clone()
    } else if filters.iter().all(|f| f == b"FlateDecode" || f == b"LZWDecode") {
        stream.decompressed_content()?
    } else {
        let names: Vec<String> = filters.iter().map(|f| String::from_utf8_lossy(f).into_owned()).collect();
        return Err(DocumentError::UnsupportedPdfImage(format!("filter {}", names.join(", "))));
    };

    let width = dimension(doc, stream, b"Width")?;
    let height = dimension(doc, stream, b"Height")?;
    let bits = integer(doc, &stream.dict, b"BitsPerComponent").unwrap_or(8);
    let image_mask = matches!(stream.dict.get(b"ImageMask"), Ok(Object::Boolean(true)));

    if bits == 1 || image_mask {
        return unpack_bitmap(width, height, &data);
    }
    if bits != 8 {
        return Err(DocumentError::UnsupportedPdfImage(format!("{bits} bits per component")));
    }

    let pixels = width as usize * height as usize;
    let components = color_components(doc, &stream.dict)
        .or_else(|| match data.len().checked_div(pixels) {
            Some(n @ (1 | 3 | 4)) => Some(n as u32),
            _ => None,
        })
        .ok_or_else(|| DocumentError::UnsupportedPdfImage("unknown colour space".to_string()))?;
    debug!("Raw PDF image {}x{}, {} components", width, height, components);

    let needed = pixels * components as usize;
    if data.len() < needed {
        return Err(DocumentError::UnsupportedPdfImage(format!(
            "truncated image data ({} of {} bytes)",
            data.len(),
            needed
        )));
    }
    let data = &data[..needed];

    let image = match components {
        1 => GrayImage::from_raw(width, height, data.to_vec()).map(DynamicImage::ImageLuma8),
        3 => RgbImage::from_raw(width, height, data.to_vec()).map(DynamicImage::ImageRgb8),
        4 => RgbImage::from_raw(width, height, cmyk_to_rgb(data)).map(DynamicImage::ImageRgb8),
        n => {
            return Err(DocumentError::UnsupportedPdfImage(format!("{n} colour components")));
        }
    };
    image.ok_or_else(|| DocumentError::UnsupportedPdfImage("pixel buffer size mismatch".to_string()))
}

fn dimension(doc: &Document, stream: &Stream, key: &[u8]) -> Result<u32, DocumentError> {
    integer(doc, &stream.dict, key)
        .and_then(|v| u32::try_from(v).ok())
        .filter(|v| *v > 0)
        .ok_or_else(|| {
            DocumentError::UnsupportedPdfImage(format!("missing {}", String::from_utf8_lossy(key)))
        })
}

/// 1-bit rows padded to whole bytes; set bits are white
fn unpack_bitmap(width: u32, height: u32, data: &[u8]) -> Result<DynamicImage, DocumentError> {
    let row_bytes = (width as usize).div_ceil(8);
    if data.len() < row_bytes * height as usize {
        return Err(DocumentError::UnsupportedPdfImage("truncated bitmap".to_string()));
    }

    let image = GrayImage::from_fn(width, height, |x, y| {
        let byte = data[y as usize * row_bytes + x as usize / 8];
        let bit = (byte >> (7 - (x % 8))) & 1;
        image::Luma([if bit == 1 { 255 } else { 0 }])
    });
    Ok(DynamicImage::ImageLuma8(image))
}

fn cmyk_to_rgb(data: &[u8]) -> Vec<u8> {
    data.chunks_exact(4)
        .flat_map(|px| {
            let k = 255 - px[3] as u32;
            [0, 1, 2].map(|i| ((255 - px[i] as u32) * k / 255) as u8)
        })
        .collect()
}
