//! PDF document access backed by `lopdf`.

use crate::error::{Result, SplitError};
use crate::services::pdf_text;
use lopdf::{Document, ObjectId};
use std::path::Path;
use tracing::{debug, warn};

/// Page-level access the chapter pipeline needs from a document.
///
/// Implementations own whatever the underlying engine holds open; it is released on drop.
pub trait PageSource {
    fn page_count(&self) -> usize;

    /// Plain text of a zero-based page. Empty when out of range or the page has no text layer.
    fn page_text(&self, page_index: usize) -> String;

    /// Serializes pages `start_index..=end_index` as a standalone document.
    fn extract_range(&self, start_index: usize, end_index: usize) -> Result<Vec<u8>>;
}

pub struct PdfDocument {
    doc: Document,
    /// lopdf page numbers (one-based) and page object ids in document order.
    pages: Vec<(u32, ObjectId)>,
}

impl PdfDocument {
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(SplitError::NotFound(path.display().to_string()));
        }
        debug!("Loading PDF from: {}", path.display());
        Ok(Self::from_document(Document::load(path)?))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(Self::from_document(Document::load_mem(bytes)?))
    }

    fn from_document(doc: Document) -> Self {
        let pages = doc.get_pages().into_iter().collect::<Vec<_>>();
        debug!("PDF has {} pages", pages.len());
        Self { doc, pages }
    }

    /// Checked variant of [`PageSource::page_text`] for direct page access.
    pub fn checked_page_text(&self, page_index: usize) -> Result<String> {
        if page_index >= self.page_count() {
            return Err(SplitError::InvalidArgument(format!(
                "page {} is outside 0..{}",
                page_index,
                self.page_count()
            )));
        }
        Ok(self.page_text(page_index))
    }
}

impl PageSource for PdfDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_text(&self, page_index: usize) -> String {
        let Some(&(_, page_id)) = self.pages.get(page_index) else {
            return String::new();
        };
        match pdf_text::extract_page_text(&self.doc, page_id) {
            Ok(text) => text,
            Err(e) => {
                warn!("Text extraction failed on page {}: {}", page_index, e);
                String::new()
            }
        }
    }

    fn extract_range(&self, start_index: usize, end_index: usize) -> Result<Vec<u8>> {
        if start_index > end_index || end_index >= self.page_count() {
            return Err(SplitError::InvalidArgument(format!(
                "page range {}..={} is outside 0..{}",
                start_index,
                end_index,
                self.page_count()
            )));
        }

        let dropped = self
            .pages
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx < start_index || *idx > end_index)
            .map(|(_, &(number, _))| number)
            .collect::<Vec<_>>();

        let mut part = self.doc.clone();
        part.delete_pages(&dropped);
        part.prune_objects();
        part.renumber_objects();
        part.compress();

        let mut bytes = Vec::new();
        part.save_to(&mut bytes)?;
        Ok(bytes)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use lopdf::content::{Content, Operation};
    use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat, dictionary};
    use std::collections::BTreeMap;

    /// Builds a PDF with one page per entry, set in a CID-keyed Identity-H font.
    ///
    /// Every distinct character gets its own two-byte code and a `/ToUnicode` entry. A page's
    /// lines share one text object and are separated by `Td` moves.
    pub fn pdf_with_pages(pages: &[&[&str]]) -> Vec<u8> {
        let mut codes = BTreeMap::new();
        for ch in pages.iter().flat_map(|p| p.iter()).flat_map(|l| l.chars()) {
            let next = codes.len() as u16 + 1;
            codes.entry(ch).or_insert(next);
        }

        let mut doc = Document::with_version("1.5");
        let cmap_id = doc.add_object(Stream::new(dictionary! {}, to_unicode_cmap(&codes)));
        let descendant_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType0",
            "BaseFont" => "KozMinPr6N-Regular",
            "CIDSystemInfo" => dictionary! {
                "Registry" => Object::string_literal("Adobe"),
                "Ordering" => Object::string_literal("Identity"),
                "Supplement" => 0,
            },
        });
        let font = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => "KozMinPr6N-Regular",
            "Encoding" => "Identity-H",
            "DescendantFonts" => vec![descendant_id.into()],
            "ToUnicode" => cmap_id,
        };

        let page_ops = pages
            .iter()
            .map(|lines| {
                let mut operations = vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                ];
                for (i, line) in lines.iter().enumerate() {
                    if i > 0 {
                        operations.push(Operation::new("Td", vec![0.into(), (-16).into()]));
                    }
                    let bytes = line
                        .chars()
                        .flat_map(|ch| codes[&ch].to_be_bytes())
                        .collect::<Vec<_>>();
                    operations.push(Operation::new(
                        "Tj",
                        vec![Object::String(bytes, StringFormat::Hexadecimal)],
                    ));
                }
                operations.push(Operation::new("ET", vec![]));
                operations
            })
            .collect::<Vec<_>>();

        build(doc, font, page_ops)
    }

    /// Builds a one-page PDF in Courier from raw content operations.
    pub fn pdf_with_operations(operations: Vec<Operation>) -> Vec<u8> {
        let font = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
            "Encoding" => "WinAnsiEncoding",
        };
        build(Document::with_version("1.5"), font, vec![operations])
    }

    fn to_unicode_cmap(codes: &BTreeMap<char, u16>) -> Vec<u8> {
        let mut cmap = String::from(
            "/CIDInit /ProcSet findresource begin\n12 dict begin\nbegincmap\n\
             /CMapName /Adobe-Identity-UCS def\n/CMapType 2 def\n\
             1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n",
        );
        cmap.push_str(&format!("{} beginbfchar\n", codes.len()));
        for (ch, code) in codes {
            let dst = ch
                .encode_utf16(&mut [0; 2])
                .iter()
                .map(|unit| format!("{:04X}", unit))
                .collect::<String>();
            cmap.push_str(&format!("<{:04X}> <{}>\n", code, dst));
        }
        cmap.push_str(
            "endbfchar\nendcmap\nCMapName currentdict /CMap defineresource pop\nend\nend\n",
        );
        cmap.into_bytes()
    }

    fn build(mut doc: Document, font: Dictionary, page_ops: Vec<Vec<Operation>>) -> Vec<u8> {
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(font);
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let kids = page_ops
            .into_iter()
            .map(|operations| {
                let content = Content { operations };
                let content_id = doc.add_object(Stream::new(
                    dictionary! {},
                    content.encode().expect("encode content"),
                ));
                let page_id: ObjectId = doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                    "Contents" => content_id,
                    "Resources" => resources_id,
                    "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
                });
                page_id.into()
            })
            .collect::<Vec<Object>>();

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("save fixture pdf");
        bytes
    }
}
