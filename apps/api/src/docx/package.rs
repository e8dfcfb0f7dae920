use std::io::{Cursor, Write};

use zip::{write::FileOptions, CompressionMethod, ZipWriter};

use super::{Align, DocxError, Paragraph, Run};

const TWIPS_PER_POINT: u32 = 20;
/// 0.5" margins on every side.
const MARGIN_TWIPS: u32 = 720;
/// 6.5" from the left margin.
const RIGHT_TAB_TWIPS: u32 = 9360;
const BULLET_INDENT_TWIPS: u32 = 360;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/><Override PartName="/word/numbering.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.numbering+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/numbering" Target="numbering.xml"/></Relationships>"#;

// Calibri 10pt (sz is in half-points), single line spacing.
const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:docDefaults><w:rPrDefault><w:rPr><w:rFonts w:ascii="Calibri" w:hAnsi="Calibri" w:eastAsia="Calibri" w:cs="Calibri"/><w:sz w:val="20"/><w:szCs w:val="20"/></w:rPr></w:rPrDefault><w:pPrDefault><w:pPr><w:spacing w:after="0" w:line="240" w:lineRule="auto"/></w:pPr></w:pPrDefault></w:docDefaults><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/></w:style></w:styles>"#;

const NUMBERING: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:numbering xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:abstractNum w:abstractNumId="0"><w:multiLevelType w:val="singleLevel"/><w:lvl w:ilvl="0"><w:start w:val="1"/><w:numFmt w:val="bullet"/><w:lvlText w:val="•"/><w:lvlJc w:val="left"/><w:pPr><w:ind w:left="360" w:hanging="180"/></w:pPr></w:lvl></w:abstractNum><w:num w:numId="1"><w:abstractNumId w:val="0"/></w:num></w:numbering>"#;

/// Writes the minimal OPC package Word needs: content types, relationships,
/// styles, bullet numbering and the document body.
pub(super) fn write_package(paragraphs: &[Paragraph]) -> Result<Vec<u8>, DocxError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let parts = [
        ("[Content_Types].xml", CONTENT_TYPES.to_string()),
        ("_rels/.rels", PACKAGE_RELS.to_string()),
        ("word/_rels/document.xml.rels", DOCUMENT_RELS.to_string()),
        ("word/styles.xml", STYLES.to_string()),
        ("word/numbering.xml", NUMBERING.to_string()),
        ("word/document.xml", document_xml(paragraphs)),
    ];
    for (name, content) in parts {
        zip.start_file(name, options)?;
        zip.write_all(content.as_bytes())?;
    }

    Ok(zip.finish()?.into_inner())
}

fn document_xml(paragraphs: &[Paragraph]) -> String {
    let body: String = paragraphs.iter().map(paragraph_xml).collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}<w:sectPr><w:pgSz w:w="12240" w:h="15840"/><w:pgMar w:top="{m}" w:right="{m}" w:bottom="{m}" w:left="{m}" w:header="720" w:footer="720" w:gutter="0"/></w:sectPr></w:body></w:document>"#,
        m = MARGIN_TWIPS
    )
}

fn paragraph_xml(p: &Paragraph) -> String {
    let mut props = String::new();
    if p.bullet {
        props.push_str(r#"<w:numPr><w:ilvl w:val="0"/><w:numId w:val="1"/></w:numPr>"#);
    }
    if p.bottom_rule {
        props.push_str(
            r#"<w:pBdr><w:bottom w:val="single" w:sz="6" w:space="1" w:color="auto"/></w:pBdr>"#,
        );
    }
    if p.right_tab {
        props.push_str(&format!(
            r#"<w:tabs><w:tab w:val="right" w:pos="{RIGHT_TAB_TWIPS}"/></w:tabs>"#
        ));
    }
    props.push_str(&format!(
        r#"<w:spacing w:before="{}" w:after="{}"/>"#,
        p.space_before_pt * TWIPS_PER_POINT,
        p.space_after_pt * TWIPS_PER_POINT
    ));
    if p.bullet {
        props.push_str(&format!(
            r#"<w:ind w:left="{BULLET_INDENT_TWIPS}" w:hanging="180"/>"#
        ));
    }
    match p.align {
        Some(Align::Center) => props.push_str(r#"<w:jc w:val="center"/>"#),
        Some(Align::Right) => props.push_str(r#"<w:jc w:val="right"/>"#),
        None => {}
    }

    let runs: String = p.runs.iter().map(run_xml).collect();
    format!("<w:p><w:pPr>{props}</w:pPr>{runs}</w:p>")
}

fn run_xml(run: &Run) -> String {
    let mut props = String::new();
    if run.bold {
        props.push_str("<w:b/>");
    }
    if run.italic {
        props.push_str("<w:i/>");
    }
    if let Some(size) = run.size_pt {
        let half_points = size * 2;
        props.push_str(&format!(
            r#"<w:sz w:val="{half_points}"/><w:szCs w:val="{half_points}"/>"#
        ));
    }

    let content: Vec<String> = run
        .text
        .split('\t')
        .map(|segment| {
            if segment.is_empty() {
                String::new()
            } else {
                format!(r#"<w:t xml:space="preserve">{}</w:t>"#, escape(segment))
            }
        })
        .collect();
    let content = content.join("<w:tab/>");

    if props.is_empty() {
        format!("<w:r>{content}</w:r>")
    } else {
        format!("<w:r><w:rPr>{props}</w:rPr>{content}</w:r>")
    }
}

/// Escapes markup and drops characters XML 1.0 cannot carry (form feeds and
/// other control codes that PDF extraction leaves behind).
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars().filter(|&c| is_xml_char(c)) {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

fn is_xml_char(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}'
    )
}
