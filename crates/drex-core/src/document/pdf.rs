//! PDF drawing access using lopdf and pdf-extract.

use std::collections::BTreeMap;
use std::path::Path;

use image::{DynamicImage, GrayImage, RgbImage};
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, trace, warn};

use super::{DocumentKind, DrawingDocument, LayoutLine, Result, TextLayout};
use crate::error::{PageError, SourceError};
use crate::models::parameter::BoundingBox;

/// Documents with less extractable text than this are treated as scanned.
const MIN_TEXT_LEN: usize = 50;

/// Mean glyph width as a fraction of the font size, used to approximate
/// line boxes without consulting font metrics.
const GLYPH_WIDTH_EM: f32 = 0.5;

/// A structural drawing PDF opened for one extraction run.
#[derive(Debug)]
pub struct PdfDocument {
    document: Document,
    raw_data: Vec<u8>,
    page_ids: BTreeMap<u32, ObjectId>,
}

impl PdfDocument {
    /// Open a drawing from disk.
    pub fn open(path: &Path) -> std::result::Result<Self, SourceError> {
        if !path.exists() {
            return Err(SourceError::NotFound(path.to_path_buf()));
        }
        let data = std::fs::read(path).map_err(|e| SourceError::Unreadable(e.to_string()))?;
        Self::from_bytes(data)
    }

    /// Open a drawing from bytes already in memory.
    pub fn from_bytes(data: Vec<u8>) -> std::result::Result<Self, SourceError> {
        let mut document =
            Document::load_mem(&data).map_err(|e| SourceError::Unreadable(e.to_string()))?;

        // PDFs with empty-password encryption are common enough to handle.
        let raw_data = if document.is_encrypted() {
            if document.decrypt("").is_err() {
                return Err(SourceError::Encrypted);
            }
            debug!("decrypted PDF with empty password");
            let mut decrypted = Vec::new();
            document
                .save_to(&mut decrypted)
                .map_err(|e| SourceError::Unreadable(e.to_string()))?;
            decrypted
        } else {
            data
        };

        let page_ids = document.get_pages();
        if page_ids.is_empty() {
            return Err(SourceError::NoPages);
        }
        debug!("loaded PDF with {} pages", page_ids.len());

        Ok(Self {
            document,
            raw_data,
            page_ids,
        })
    }

    /// Extract text from the whole document in one pass.
    pub fn full_text(&self) -> std::result::Result<String, SourceError> {
        pdf_extract::extract_text_from_mem(&self.raw_data)
            .map_err(|e| SourceError::Unreadable(e.to_string()))
    }

    fn page_id(&self, page: u32) -> Option<ObjectId> {
        self.page_ids.get(&page).copied()
    }

    /// Resources dictionary for a page, following Parent inheritance.
    fn page_resources(&self, page_id: ObjectId) -> Option<Dictionary> {
        let mut node_id = page_id;
        loop {
            let node = self.document.get_object(node_id).ok()?;
            let dict = match node {
                Object::Dictionary(dict) => dict,
                _ => return None,
            };
            if let Ok(resources) = dict.get(b"Resources") {
                if let Ok((_, Object::Dictionary(res))) = self.document.dereference(resources) {
                    return Some(res.clone());
                }
            }
            match dict.get(b"Parent") {
                Ok(Object::Reference(parent_id)) => node_id = *parent_id,
                _ => return None,
            }
        }
    }

    /// Decode the raster XObjects referenced by a page.
    fn page_images(&self, page: u32) -> Vec<DynamicImage> {
        let Some(page_id) = self.page_id(page) else {
            return Vec::new();
        };
        let Some(resources) = self.page_resources(page_id) else {
            return Vec::new();
        };

        let mut images = Vec::new();
        if let Ok(xobjects) = resources.get(b"XObject") {
            if let Ok((_, Object::Dictionary(xobjects))) = self.document.dereference(xobjects) {
                for (_name, entry) in xobjects.iter() {
                    if let Ok((_, object)) = self.document.dereference(entry) {
                        if let Some(image) = self.decode_image_object(object) {
                            images.push(image);
                        }
                    }
                }
            }
        }
        debug!("page {}: {} raster xobjects decoded", page, images.len());
        images
    }

    fn decode_image_object(&self, object: &Object) -> Option<DynamicImage> {
        let Object::Stream(stream) = object else {
            return None;
        };
        let dict = &stream.dict;
        if dict.get(b"Subtype").ok()?.as_name().ok()? != b"Image" {
            return None;
        }

        let width = dict.get(b"Width").ok()?.as_i64().ok()? as u32;
        let height = dict.get(b"Height").ok()?.as_i64().ok()? as u32;
        trace!("image xobject {}x{}", width, height);

        if let Some(filter) = Self::first_filter(dict) {
            match filter {
                b"DCTDecode" => {
                    // JPEG stream: hand the compressed bytes to the decoder.
                    return image::load_from_memory_with_format(
                        &stream.content,
                        image::ImageFormat::Jpeg,
                    )
                    .ok();
                }
                b"JPXDecode" | b"CCITTFaxDecode" | b"JBIG2Decode" => {
                    trace!("unsupported image filter {:?}", String::from_utf8_lossy(filter));
                    return None;
                }
                _ => {}
            }
        }

        let data = stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone());
        let bits = dict
            .get(b"BitsPerComponent")
            .ok()
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(8);
        if bits != 8 {
            trace!("unsupported bits per component: {}", bits);
            return None;
        }

        let color_space = self.color_space_name(dict);
        Self::image_from_raw(&data, width, height, &color_space)
    }

    fn first_filter(dict: &Dictionary) -> Option<&[u8]> {
        match dict.get(b"Filter").ok()? {
            Object::Name(name) => Some(name.as_slice()),
            Object::Array(array) => array.first().and_then(|o| o.as_name().ok()),
            _ => None,
        }
    }

    fn color_space_name(&self, dict: &Dictionary) -> Vec<u8> {
        dict.get(b"ColorSpace")
            .ok()
            .and_then(|o| match o {
                Object::Name(name) => Some(name.clone()),
                Object::Array(array) => array
                    .first()
                    .and_then(|o| o.as_name().ok())
                    .map(|n| n.to_vec()),
                Object::Reference(id) => self
                    .document
                    .get_object(*id)
                    .ok()
                    .and_then(|o| o.as_name().ok())
                    .map(|n| n.to_vec()),
                _ => None,
            })
            .unwrap_or_else(|| b"DeviceRGB".to_vec())
    }

    fn image_from_raw(
        data: &[u8],
        width: u32,
        height: u32,
        color_space: &[u8],
    ) -> Option<DynamicImage> {
        match color_space {
            b"DeviceRGB" | b"RGB" => {
                let expected = (width as usize) * (height as usize) * 3;
                let pixels = data.get(..expected)?.to_vec();
                RgbImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8)
            }
            b"DeviceGray" | b"G" => {
                let expected = (width as usize) * (height as usize);
                let pixels = data.get(..expected)?.to_vec();
                GrayImage::from_raw(width, height, pixels).map(DynamicImage::ImageLuma8)
            }
            other => {
                trace!("unsupported color space {:?}", String::from_utf8_lossy(other));
                None
            }
        }
    }

    fn has_raster_content(&self) -> bool {
        self.document.objects.values().any(|object| {
            matches!(object, Object::Stream(stream)
                if stream
                    .dict
                    .get(b"Subtype")
                    .ok()
                    .and_then(|o| o.as_name().ok())
                    .is_some_and(|name| name == b"Image"))
        })
    }
}

impl DrawingDocument for PdfDocument {
    fn page_count(&self) -> u32 {
        self.page_ids.len() as u32
    }

    fn page_text(&self, page: u32) -> Result<String> {
        if !self.page_ids.contains_key(&page) {
            return Err(PageError::Text {
                page,
                reason: "no such page".to_string(),
            });
        }
        self.document.extract_text(&[page]).map_err(|e| PageError::Text {
            page,
            reason: e.to_string(),
        })
    }

    fn page_layout(&self, page: u32) -> Result<TextLayout> {
        let page_id = self.page_id(page).ok_or_else(|| PageError::Layout {
            page,
            reason: "no such page".to_string(),
        })?;
        let content = self
            .document
            .get_page_content(page_id)
            .map_err(|e| PageError::Layout {
                page,
                reason: e.to_string(),
            })?;
        let content = Content::decode(&content).map_err(|e| PageError::Layout {
            page,
            reason: e.to_string(),
        })?;

        let runs = collect_text_runs(&content);
        Ok(group_runs_into_lines(runs))
    }

    fn render_page(&self, page: u32, upscale: f32) -> Result<DynamicImage> {
        let image = self
            .page_images(page)
            .into_iter()
            .max_by_key(|i| (i.width() as u64) * (i.height() as u64))
            .ok_or_else(|| PageError::Raster {
                page,
                reason: "page has no embedded raster content".to_string(),
            })?;

        if upscale > 1.0 {
            let width = ((image.width() as f32) * upscale) as u32;
            let height = ((image.height() as f32) * upscale) as u32;
            Ok(image.resize_exact(
                width.max(1),
                height.max(1),
                image::imageops::FilterType::Lanczos3,
            ))
        } else {
            Ok(image)
        }
    }

    fn kind(&self) -> DocumentKind {
        let has_text = self
            .full_text()
            .map(|t| t.trim().len() >= MIN_TEXT_LEN)
            .unwrap_or(false);
        let has_images = self.has_raster_content();

        let kind = match (has_text, has_images) {
            (true, false) => DocumentKind::Vector,
            (false, true) => DocumentKind::Scanned,
            (true, true) => DocumentKind::Hybrid,
            (false, false) => DocumentKind::Empty,
        };
        debug!("document classified as {:?}", kind);
        kind
    }
}

/// A positioned fragment of shown text.
struct TextRun {
    x: f32,
    y: f32,
    size: f32,
    width: f32,
    text: String,
}

fn operand_number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Walk the content stream's text operators, tracking the text cursor.
///
/// Only the common positioning subset is interpreted (Td/TD/Tm/T*/TL plus
/// the show operators); glyph widths are approximated at half an em.
fn collect_text_runs(content: &Content) -> Vec<TextRun> {
    let mut runs = Vec::new();
    let mut line_x = 0.0f32;
    let mut line_y = 0.0f32;
    let mut cursor_x = 0.0f32;
    let mut size = 12.0f32;
    let mut leading = 0.0f32;

    let emit = |cursor_x: &mut f32, line_y: f32, size: f32, bytes: &[u8], runs: &mut Vec<TextRun>| {
        let text = String::from_utf8_lossy(bytes).into_owned();
        if text.trim().is_empty() {
            return;
        }
        let width = GLYPH_WIDTH_EM * size * text.chars().count() as f32;
        runs.push(TextRun {
            x: *cursor_x,
            y: line_y,
            size,
            width,
            text,
        });
        *cursor_x += width;
    };

    for op in &content.operations {
        match op.operator.as_str() {
            "BT" => {
                line_x = 0.0;
                line_y = 0.0;
                cursor_x = 0.0;
            }
            "Tf" => {
                if let Some(s) = op.operands.get(1).and_then(operand_number) {
                    size = s;
                }
            }
            "TL" => {
                if let Some(l) = op.operands.first().and_then(operand_number) {
                    leading = l;
                }
            }
            "Td" | "TD" => {
                let tx = op.operands.first().and_then(operand_number).unwrap_or(0.0);
                let ty = op.operands.get(1).and_then(operand_number).unwrap_or(0.0);
                if op.operator == "TD" {
                    leading = -ty;
                }
                line_x += tx;
                line_y += ty;
                cursor_x = line_x;
            }
            "Tm" => {
                // Only the translation part of the matrix is tracked.
                line_x = op.operands.get(4).and_then(operand_number).unwrap_or(0.0);
                line_y = op.operands.get(5).and_then(operand_number).unwrap_or(0.0);
                cursor_x = line_x;
            }
            "T*" => {
                line_y -= leading;
                cursor_x = line_x;
            }
            "Tj" => {
                if let Some(Object::String(bytes, _)) = op.operands.first() {
                    emit(&mut cursor_x, line_y, size, bytes, &mut runs);
                }
            }
            "'" => {
                line_y -= leading;
                cursor_x = line_x;
                if let Some(Object::String(bytes, _)) = op.operands.first() {
                    emit(&mut cursor_x, line_y, size, bytes, &mut runs);
                }
            }
            "\"" => {
                line_y -= leading;
                cursor_x = line_x;
                if let Some(Object::String(bytes, _)) = op.operands.get(2) {
                    emit(&mut cursor_x, line_y, size, bytes, &mut runs);
                }
            }
            "TJ" => {
                if let Some(Object::Array(elements)) = op.operands.first() {
                    for element in elements {
                        match element {
                            Object::String(bytes, _) => {
                                emit(&mut cursor_x, line_y, size, bytes, &mut runs);
                            }
                            other => {
                                if let Some(adjust) = operand_number(other) {
                                    cursor_x -= adjust / 1000.0 * size;
                                }
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }

    if runs.is_empty() {
        warn!("content stream produced no positioned text");
    }
    runs
}

/// Group runs into lines by baseline proximity and synthesize line boxes.
fn group_runs_into_lines(mut runs: Vec<TextRun>) -> TextLayout {
    runs.sort_by(|a, b| {
        b.y.partial_cmp(&a.y)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
    });

    let mut lines: Vec<LayoutLine> = Vec::new();
    let mut current: Vec<TextRun> = Vec::new();

    let flush = |group: &mut Vec<TextRun>, lines: &mut Vec<LayoutLine>| {
        if group.is_empty() {
            return;
        }
        let x1 = group.iter().map(|r| r.x).fold(f32::INFINITY, f32::min);
        let x2 = group
            .iter()
            .map(|r| r.x + r.width)
            .fold(f32::NEG_INFINITY, f32::max);
        let baseline = group.iter().map(|r| r.y).sum::<f32>() / group.len() as f32;
        let height = group.iter().map(|r| r.size).fold(0.0f32, f32::max);
        let text = group
            .iter()
            .map(|r| r.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        lines.push(LayoutLine {
            text,
            bbox: BoundingBox::new(x1, baseline, x2, baseline + height),
        });
        group.clear();
    };

    for run in runs {
        let same_line = current.last().is_some_and(|last| {
            let tolerance = (last.size.max(run.size) * 0.5).max(2.0);
            (last.y - run.y).abs() <= tolerance
        });
        if !same_line {
            flush(&mut current, &mut lines);
        }
        current.push(run);
    }
    flush(&mut current, &mut lines);

    TextLayout { lines }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::Operation;
    use lopdf::{Stream, dictionary};

    fn drawing_pdf(lines: &[(&str, f32, f32)]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
        ];
        for (text, x, y) in lines {
            operations.push(Operation::new(
                "Tm",
                vec![
                    1.into(),
                    0.into(),
                    0.into(),
                    1.into(),
                    Object::Real(*x),
                    Object::Real(*y),
                ],
            ));
            operations.push(Operation::new("Tj", vec![Object::string_literal(*text)]));
        }
        operations.push(Operation::new("ET", vec![]));

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().unwrap(),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn open_missing_file_is_not_found() {
        let err = PdfDocument::open(Path::new("/nonexistent/drawing.pdf")).unwrap_err();
        assert!(matches!(err, SourceError::NotFound(_)));
    }

    #[test]
    fn garbage_bytes_are_unreadable() {
        let err = PdfDocument::from_bytes(b"not a pdf at all".to_vec()).unwrap_err();
        assert!(matches!(err, SourceError::Unreadable(_)));
    }

    #[test]
    fn layout_positions_lines() {
        let bytes = drawing_pdf(&[
            ("thickness: 150 mm", 72.0, 720.0),
            ("clear cover: 25 mm", 72.0, 700.0),
        ]);
        let doc = PdfDocument::from_bytes(bytes).unwrap();
        assert_eq!(doc.page_count(), 1);

        let layout = doc.page_layout(1).unwrap();
        assert_eq!(layout.lines.len(), 2);

        let first = &layout.lines[0];
        assert!(first.text.contains("thickness"));
        assert!((first.bbox.x1 - 72.0).abs() < 0.01);
        assert!((first.bbox.y1 - 720.0).abs() < 0.01);
        assert!(first.bbox.x2 > first.bbox.x1);
    }

    #[test]
    fn page_text_reads_shown_strings() {
        let bytes = drawing_pdf(&[("spacing: 150 mm", 72.0, 720.0)]);
        let doc = PdfDocument::from_bytes(bytes).unwrap();
        let text = doc.page_text(1).unwrap();
        assert!(text.contains("150"));
    }

    #[test]
    fn missing_page_is_page_scoped() {
        let bytes = drawing_pdf(&[("span: 4.5 m", 72.0, 720.0)]);
        let doc = PdfDocument::from_bytes(bytes).unwrap();
        let err = doc.page_text(7).unwrap_err();
        assert_eq!(err.page(), 7);
    }

    #[test]
    fn vector_page_has_no_raster() {
        let bytes = drawing_pdf(&[("width: 230 mm", 72.0, 720.0)]);
        let doc = PdfDocument::from_bytes(bytes).unwrap();
        let err = doc.render_page(1, 2.0).unwrap_err();
        assert!(matches!(err, PageError::Raster { page: 1, .. }));
    }
}
