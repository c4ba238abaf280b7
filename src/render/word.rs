//! WordprocessingML (`.docx`) backend.
//!
//! The package is assembled from hand-built XML parts and zipped with fixed
//! entry timestamps, so identical trees always produce identical bytes.

use super::{
    Renderer, column_weights, output::write_atomically, types::RenderError, types::ReportFormat,
};
use crate::{
    config::WordConfig,
    text,
    tree::{Block, DocumentTree},
};
use std::fmt::Write as _;
use std::path::Path;
use tracing::{debug, info};

const NS_W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// A4 in twentieths of a point.
const PAGE_W_TWIPS: u32 = 11906;
const PAGE_H_TWIPS: u32 = 16838;
const TWIPS_PER_CM: f32 = 1440.0 / 2.54;

#[derive(Debug, Clone)]
pub struct WordRenderer {
    margin_twips: u32,
    latin_font: String,
    east_asian_font: String,
}

impl WordRenderer {
    #[cfg(feature = "word")]
    pub fn new(cfg: &WordConfig) -> Result<Self, RenderError> {
        Ok(Self::from_config(cfg))
    }

    #[cfg(not(feature = "word"))]
    pub fn new(_cfg: &WordConfig) -> Result<Self, RenderError> {
        Err(RenderError::missing_dependency(
            ReportFormat::Word,
            "this build does not include the `word` feature (zip packaging)",
        ))
    }

    #[cfg_attr(not(feature = "word"), allow(dead_code))]
    fn from_config(cfg: &WordConfig) -> Self {
        let max_margin = (PAGE_W_TWIPS / 2).saturating_sub(720) as f32;
        let margin = (cfg.margin_cm.max(0.0) * TWIPS_PER_CM).min(max_margin);
        Self {
            margin_twips: margin.round() as u32,
            latin_font: cfg.latin_font.clone(),
            east_asian_font: cfg.east_asian_font.clone(),
        }
    }

    /// The complete package, in memory.
    pub fn render_to_bytes(&self, tree: &DocumentTree) -> Result<Vec<u8>, RenderError> {
        let parts = self.parts(tree);
        let mut cursor = std::io::Cursor::new(Vec::new());
        package::write(&mut cursor, &parts)
            .map_err(|e| RenderError::write_failure("<memory>", e))?;
        Ok(cursor.into_inner())
    }

    fn parts(&self, tree: &DocumentTree) -> Vec<(&'static str, String)> {
        let title = tree
            .iter()
            .find_map(|b| match b {
                Block::Heading { level: 0, text } => Some(text.as_str()),
                _ => None,
            })
            .unwrap_or("Report");

        vec![
            ("[Content_Types].xml", content_types_xml()),
            ("_rels/.rels", package_rels_xml()),
            ("docProps/core.xml", core_xml(title)),
            ("docProps/app.xml", app_xml()),
            ("word/_rels/document.xml.rels", document_rels_xml()),
            ("word/document.xml", self.document_xml(tree)),
            ("word/styles.xml", self.styles_xml()),
            ("word/numbering.xml", numbering_xml()),
        ]
    }

    fn content_width(&self) -> u32 {
        PAGE_W_TWIPS.saturating_sub(2 * self.margin_twips)
    }

    fn document_xml(&self, tree: &DocumentTree) -> String {
        let mut body = String::new();

        for block in tree {
            match block {
                Block::Heading { level, text } => {
                    let (style, center) = match level {
                        0 => ("Title", true),
                        1 => ("Heading1", false),
                        2 => ("Heading2", false),
                        _ => ("Heading3", false),
                    };
                    let jc = if center { r#"<w:jc w:val="center"/>"# } else { "" };
                    let _ = write!(
                        body,
                        r#"<w:p><w:pPr><w:pStyle w:val="{style}"/>{jc}</w:pPr>{}</w:p>"#,
                        runs(text, false)
                    );
                }
                Block::Paragraph { text } => {
                    let _ = write!(body, "<w:p>{}</w:p>", runs(text, false));
                }
                Block::BulletList { items } => {
                    for item in items {
                        let _ = write!(
                            body,
                            r#"<w:p><w:pPr><w:pStyle w:val="ListBullet"/><w:numPr><w:ilvl w:val="0"/><w:numId w:val="1"/></w:numPr></w:pPr>{}</w:p>"#,
                            runs(item, false)
                        );
                    }
                }
                Block::Table { header, rows } => {
                    self.table_xml(&mut body, header, rows);
                    // Keeps consecutive tables from merging and spaces the
                    // table from what follows.
                    body.push_str("<w:p/>");
                }
            }
        }

        let m = self.margin_twips;
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="{NS_W}" xmlns:r="{NS_R}"><w:body>{body}<w:sectPr><w:pgSz w:w="{PAGE_W_TWIPS}" w:h="{PAGE_H_TWIPS}"/><w:pgMar w:top="{m}" w:right="{m}" w:bottom="{m}" w:left="{m}" w:header="708" w:footer="708" w:gutter="0"/><w:cols w:space="708"/></w:sectPr></w:body></w:document>"#
        )
    }

    fn table_xml(&self, out: &mut String, header: &[String], rows: &[Vec<String>]) {
        let weights = column_weights(header, rows);
        let total: f32 = weights.iter().sum();
        let width = self.content_width();
        let cols: Vec<u32> = weights
            .iter()
            .map(|w| ((w / total) * width as f32).floor() as u32)
            .collect();

        let _ = write!(
            out,
            r#"<w:tbl><w:tblPr><w:tblStyle w:val="TableGrid"/><w:tblW w:w="{width}" w:type="dxa"/><w:tblLayout w:type="fixed"/><w:tblLook w:val="04A0" w:firstRow="1" w:lastRow="0" w:firstColumn="1" w:lastColumn="0" w:noHBand="0" w:noVBand="1"/></w:tblPr><w:tblGrid>"#
        );
        for w in &cols {
            let _ = write!(out, r#"<w:gridCol w:w="{w}"/>"#);
        }
        out.push_str("</w:tblGrid>");

        if !header.is_empty() {
            out.push_str("<w:tr><w:trPr><w:tblHeader/></w:trPr>");
            for (i, w) in cols.iter().enumerate() {
                let cell = header.get(i).map(String::as_str).unwrap_or("");
                table_cell(out, *w, cell, true, Some("D9D9D9"));
            }
            out.push_str("</w:tr>");
        }

        for row in rows {
            out.push_str("<w:tr>");
            for (i, w) in cols.iter().enumerate() {
                let cell = row.get(i).map(String::as_str).unwrap_or("");
                // Header-less tables are key/value grids: shade the key column.
                let key_column = header.is_empty() && i == 0;
                let fill = key_column.then_some("F2F2F2");
                table_cell(out, *w, cell, key_column, fill);
            }
            out.push_str("</w:tr>");
        }
        out.push_str("</w:tbl>");
    }

    fn styles_xml(&self) -> String {
        let latin = escape(&self.latin_font);
        let east = escape(&self.east_asian_font);
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="{NS_W}"><w:docDefaults><w:rPrDefault><w:rPr><w:rFonts w:ascii="{latin}" w:hAnsi="{latin}" w:eastAsia="{east}" w:cs="{latin}"/><w:sz w:val="21"/><w:szCs w:val="21"/><w:lang w:val="en-US" w:eastAsia="zh-CN"/></w:rPr></w:rPrDefault><w:pPrDefault><w:pPr><w:spacing w:after="120" w:line="276" w:lineRule="auto"/></w:pPr></w:pPrDefault></w:docDefaults><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:qFormat/></w:style><w:style w:type="paragraph" w:styleId="Title"><w:name w:val="Title"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:qFormat/><w:pPr><w:spacing w:after="400"/><w:jc w:val="center"/></w:pPr><w:rPr><w:b/><w:sz w:val="36"/><w:szCs w:val="36"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:qFormat/><w:pPr><w:keepNext/><w:spacing w:before="360" w:after="120"/><w:outlineLvl w:val="0"/></w:pPr><w:rPr><w:b/><w:sz w:val="28"/><w:szCs w:val="28"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="Heading2"><w:name w:val="heading 2"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:qFormat/><w:pPr><w:keepNext/><w:spacing w:before="240" w:after="80"/><w:outlineLvl w:val="1"/></w:pPr><w:rPr><w:b/><w:sz w:val="24"/><w:szCs w:val="24"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="Heading3"><w:name w:val="heading 3"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:qFormat/><w:pPr><w:keepNext/><w:spacing w:before="120" w:after="60"/><w:outlineLvl w:val="2"/></w:pPr><w:rPr><w:b/><w:sz w:val="21"/><w:szCs w:val="21"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="ListBullet"><w:name w:val="List Bullet"/><w:basedOn w:val="Normal"/><w:pPr><w:numPr><w:numId w:val="1"/></w:numPr><w:spacing w:after="60"/><w:ind w:left="720" w:hanging="360"/><w:contextualSpacing/></w:pPr></w:style><w:style w:type="table" w:default="1" w:styleId="TableNormal"><w:name w:val="Normal Table"/><w:tblPr><w:tblInd w:w="0" w:type="dxa"/><w:tblCellMar><w:top w:w="0" w:type="dxa"/><w:left w:w="108" w:type="dxa"/><w:bottom w:w="0" w:type="dxa"/><w:right w:w="108" w:type="dxa"/></w:tblCellMar></w:tblPr></w:style><w:style w:type="table" w:styleId="TableGrid"><w:name w:val="Table Grid"/><w:basedOn w:val="TableNormal"/><w:tblPr><w:tblBorders><w:top w:val="single" w:sz="4" w:space="0" w:color="000000"/><w:left w:val="single" w:sz="4" w:space="0" w:color="000000"/><w:bottom w:val="single" w:sz="4" w:space="0" w:color="000000"/><w:right w:val="single" w:sz="4" w:space="0" w:color="000000"/><w:insideH w:val="single" w:sz="4" w:space="0" w:color="000000"/><w:insideV w:val="single" w:sz="4" w:space="0" w:color="000000"/></w:tblBorders></w:tblPr></w:style></w:styles>"#
        )
    }
}

impl Renderer for WordRenderer {
    fn format(&self) -> ReportFormat {
        ReportFormat::Word
    }

    fn render(&self, tree: &DocumentTree, output: &Path) -> Result<(), RenderError> {
        info!("rendering word report blocks={} out={}", tree.len(), output.display());
        let parts = self.parts(tree);
        write_atomically(output, |file| {
            package::write(file, &parts).map_err(|e| RenderError::write_failure(output, e))
        })?;
        debug!("word report written parts={}", parts.len());
        Ok(())
    }
}

#[cfg(feature = "word")]
mod package {
    use std::io::{Seek, Write};
    use zip::{CompressionMethod, DateTime, ZipWriter, result::ZipError, write::SimpleFileOptions};

    pub fn write<W: Write + Seek>(
        w: W,
        parts: &[(&'static str, String)],
    ) -> Result<(), ZipError> {
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default());

        let mut zip = ZipWriter::new(w);
        for (name, xml) in parts {
            zip.start_file(*name, options)?;
            zip.write_all(xml.as_bytes())?;
        }
        zip.finish()?;
        Ok(())
    }
}

#[cfg(not(feature = "word"))]
mod package {
    use std::io::{Seek, Write};

    pub fn write<W: Write + Seek>(
        _w: W,
        _parts: &[(&'static str, String)],
    ) -> Result<(), std::io::Error> {
        Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "word packaging is not compiled in",
        ))
    }
}

fn table_cell(out: &mut String, width: u32, text: &str, bold: bool, fill: Option<&str>) {
    let shd = fill
        .map(|f| format!(r#"<w:shd w:val="clear" w:color="auto" w:fill="{f}"/>"#))
        .unwrap_or_default();
    let _ = write!(
        out,
        r#"<w:tc><w:tcPr><w:tcW w:w="{width}" w:type="dxa"/>{shd}</w:tcPr><w:p><w:pPr><w:spacing w:after="0"/></w:pPr>{}</w:p></w:tc>"#,
        runs(text, bold)
    );
}

/// One run per non-blank line, separated by line breaks.
fn runs(s: &str, bold: bool) -> String {
    let rpr = if bold { "<w:rPr><w:b/></w:rPr>" } else { "" };
    let mut out = String::new();
    for (i, line) in text::lines(s).enumerate() {
        if i > 0 {
            out.push_str("<w:r><w:br/></w:r>");
        }
        let _ = write!(
            out,
            r#"<w:r>{rpr}<w:t xml:space="preserve">{}</w:t></w:r>"#,
            escape(line.trim())
        );
    }
    out
}

/// XML text escaping. Characters XML 1.0 cannot carry are dropped.
fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(ch),
            c if (c as u32) < 0x20 || c == '\u{FFFE}' || c == '\u{FFFF}' => {}
            c => out.push(c),
        }
    }
    out
}

fn content_types_xml() -> String {
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/><Override PartName="/word/numbering.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.numbering+xml"/><Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/><Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/></Types>"#
        .to_string()
}

fn package_rels_xml() -> String {
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/></Relationships>"#
        .to_string()
}

fn document_rels_xml() -> String {
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/numbering" Target="numbering.xml"/></Relationships>"#
        .to_string()
}

fn core_xml(title: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"><dc:title>{}</dc:title><dc:creator>{}</dc:creator></cp:coreProperties>"#,
        escape(title),
        env!("CARGO_PKG_NAME")
    )
}

fn app_xml() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties"><Application>{} {}</Application></Properties>"#,
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    )
}

fn numbering_xml() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:numbering xmlns:w="{NS_W}"><w:abstractNum w:abstractNumId="0"><w:multiLevelType w:val="singleLevel"/><w:lvl w:ilvl="0"><w:start w:val="1"/><w:numFmt w:val="bullet"/><w:lvlText w:val="&#8226;"/><w:lvlJc w:val="left"/><w:pPr><w:ind w:left="720" w:hanging="360"/></w:pPr></w:lvl></w:abstractNum><w:num w:numId="1"><w:abstractNumId w:val="0"/></w:num></w:numbering>"#
    )
}
