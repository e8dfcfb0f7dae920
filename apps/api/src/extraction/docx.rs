use std::io::{Cursor, Read};

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use super::ExtractionError;

const DOCUMENT_PART: &str = "word/document.xml";

lazy_static! {
    static ref EMPTY_PARAGRAPH: Regex = Regex::new(r"<w:p\b[^>]*/>").unwrap();
    static ref PARAGRAPH: Regex = Regex::new(r"(?s)<w:p\b[^>]*>(.*?)</w:p>").unwrap();
    static ref RUN_CONTENT: Regex =
        Regex::new(r"<w:t(?:\s[^>]*)?>([^<]*)</w:t>|<w:tab/>|<w:br\b[^>]*/>|<w:cr/>").unwrap();
    static ref ENTITY: Regex =
        Regex::new(r"&(?:#x([0-9a-fA-F]+)|#([0-9]+)|(lt|gt|quot|apos|amp));").unwrap();
}

/// Reads the main document part and returns one line per non-empty paragraph.
/// Table cells are paragraphs too, so their text is included in document order.
pub(super) fn extract_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| ExtractionError::Docx(e.to_string()))?;
    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| ExtractionError::Docx(format!("{DOCUMENT_PART}: {e}")))?
        .read_to_string(&mut xml)
        .map_err(|e| ExtractionError::Docx(e.to_string()))?;

    Ok(paragraphs(&xml).join("\n"))
}

fn paragraphs(xml: &str) -> Vec<String> {
    let xml = EMPTY_PARAGRAPH.replace_all(xml, "");
    PARAGRAPH
        .captures_iter(&xml)
        .map(|p| paragraph_text(&p[1]))
        .filter(|text| !text.trim().is_empty())
        .collect()
}

fn paragraph_text(inner: &str) -> String {
    RUN_CONTENT
        .captures_iter(inner)
        .map(|c| match c.get(1) {
            Some(text) => unescape(text.as_str()),
            None if &c[0] == "<w:tab/>" => "\t".to_string(),
            None => "\n".to_string(),
        })
        .collect()
}

/// Single pass, so `&amp;lt;` stays `&lt;`. Unknown code points are kept as written.
fn unescape(text: &str) -> String {
    ENTITY
        .replace_all(text, |c: &Captures| {
            if let Some(name) = c.get(3) {
                let ch = match name.as_str() {
                    "lt" => '<',
                    "gt" => '>',
                    "quot" => '"',
                    "apos" => '\'',
                    _ => '&',
                };
                return ch.to_string();
            }
            let code = match c.get(1) {
                Some(hex) => u32::from_str_radix(hex.as_str(), 16).ok(),
                None => c[2].parse().ok(),
            };
            code.and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_else(|| c[0].to_string())
        })
        .into_owned()
}
