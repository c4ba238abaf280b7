//! PDF object assembly.

use super::fonts::{EmbeddedFont, ResolvedFont};
use super::layout::{Layout, PageGeometry, Typeface};
use crate::tree::{Block, DocumentTree};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat, content::Content};
use std::fmt::Write as _;
use std::io::Write;
use tracing::{debug, warn};

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub fn write<W: Write>(
    tree: &DocumentTree,
    font: &ResolvedFont,
    geometry: PageGeometry,
    body_size: f32,
    out: &mut W,
) -> Result<(), BoxError> {
    let mut typeface = match font {
        ResolvedFont::Embedded(f) => match Typeface::embedded(f) {
            Ok(t) => t,
            Err(e) => {
                warn!("embedded font {} failed to load ({e}); using built-in", f.name());
                Typeface::builtin()
            }
        },
        ResolvedFont::Builtin => Typeface::builtin(),
    };

    let pages = Layout::new(&mut typeface, geometry, body_size).run(tree);
    debug!("pdf layout pages={}", pages.len());

    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let fonts = match (font, typeface.face()) {
        (ResolvedFont::Embedded(f), Some(_)) => embedded_font_resources(&mut doc, f, &typeface)?,
        _ => builtin_font_resources(&mut doc),
    };
    let resources_id = doc.add_object(Dictionary::from_iter(vec![(
        "Font",
        Object::Dictionary(fonts),
    )]));

    let mut page_ids = Vec::with_capacity(pages.len());
    for operations in pages {
        let content = Content { operations }.encode().map_err(|e| e.to_string())?;
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content));
        let page = Dictionary::from_iter(vec![
            ("Type", name("Page")),
            ("Parent", Object::Reference(pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(geometry.width),
                    Object::Real(geometry.height),
                ]),
            ),
            ("Resources", Object::Reference(resources_id)),
            ("Contents", Object::Reference(content_id)),
        ]);
        page_ids.push(doc.add_object(page));
    }

    let count = page_ids.len() as i64;
    let pages_dict = Dictionary::from_iter(vec![
        ("Type", name("Pages")),
        ("Count", Object::Integer(count)),
        (
            "Kids",
            Object::Array(page_ids.into_iter().map(Object::Reference).collect()),
        ),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", name("Catalog")),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let info_id = doc.add_object(Dictionary::from_iter(vec![
        ("Title", text_string(document_title(tree))),
        (
            "Producer",
            text_string(concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"))),
        ),
    ]));
    doc.trailer.set("Info", Object::Reference(info_id));

    doc.compress();
    doc.save_to(out).map_err(|e| e.to_string())?;
    Ok(())
}

fn builtin_font_resources(doc: &mut Document) -> Dictionary {
    let mut fonts = Dictionary::new();
    for (key, base) in [("F1", "Helvetica"), ("F2", "Helvetica-Bold")] {
        let id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", name("Font")),
            ("Subtype", name("Type1")),
            ("BaseFont", name(base)),
            ("Encoding", name("WinAnsiEncoding")),
        ]));
        fonts.set(key, Object::Reference(id));
    }
    fonts
}

/// Type0 font over a CIDFontType2 descendant with Identity-H encoding. The
/// whole font file is embedded; a ToUnicode CMap keeps text extractable.
fn embedded_font_resources(
    doc: &mut Document,
    font: &EmbeddedFont,
    typeface: &Typeface<'_>,
) -> Result<Dictionary, BoxError> {
    let face = typeface.face().ok_or("embedded typeface has no face")?;
    let upem = f32::from(face.units_per_em().max(1));
    let scale = |v: i16| Object::Integer((f32::from(v) * 1000.0 / upem).round() as i64);

    let mut file_dict = Dictionary::new();
    file_dict.set("Length1", Object::Integer(font.data().len() as i64));
    let file_id = doc.add_object(Stream::new(file_dict, font.data().to_vec()));

    let bbox = face.global_bounding_box();
    let cap_height = face.capital_height().unwrap_or(face.ascender());
    let descriptor_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", name("FontDescriptor")),
        ("FontName", name(font.name())),
        ("Flags", Object::Integer(4)),
        (
            "FontBBox",
            Object::Array(vec![
                scale(bbox.x_min),
                scale(bbox.y_min),
                scale(bbox.x_max),
                scale(bbox.y_max),
            ]),
        ),
        ("ItalicAngle", Object::Integer(0)),
        ("Ascent", scale(face.ascender())),
        ("Descent", scale(face.descender())),
        ("CapHeight", scale(cap_height)),
        ("StemV", Object::Integer(80)),
        ("FontFile2", Object::Reference(file_id)),
    ]));

    let mut widths = Vec::new();
    for &gid in typeface.used_glyphs().keys() {
        let adv = face
            .glyph_hor_advance(ttf_parser::GlyphId(gid))
            .unwrap_or(0);
        let w = (f32::from(adv) * 1000.0 / upem).round() as i64;
        widths.push(Object::Integer(i64::from(gid)));
        widths.push(Object::Array(vec![Object::Integer(w)]));
    }

    let cid_font_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", name("Font")),
        ("Subtype", name("CIDFontType2")),
        ("BaseFont", name(font.name())),
        (
            "CIDSystemInfo",
            Object::Dictionary(Dictionary::from_iter(vec![
                ("Registry", Object::string_literal("Adobe")),
                ("Ordering", Object::string_literal("Identity")),
                ("Supplement", Object::Integer(0)),
            ])),
        ),
        ("FontDescriptor", Object::Reference(descriptor_id)),
        ("DW", Object::Integer(1000)),
        ("W", Object::Array(widths)),
        ("CIDToGIDMap", name("Identity")),
    ]));

    let to_unicode_id = doc.add_object(Stream::new(
        Dictionary::new(),
        to_unicode_cmap(typeface).into_bytes(),
    ));

    let type0_id: ObjectId = doc.add_object(Dictionary::from_iter(vec![
        ("Type", name("Font")),
        ("Subtype", name("Type0")),
        ("BaseFont", name(font.name())),
        ("Encoding", name("Identity-H")),
        (
            "DescendantFonts",
            Object::Array(vec![Object::Reference(cid_font_id)]),
        ),
        ("ToUnicode", Object::Reference(to_unicode_id)),
    ]));

    let mut fonts = Dictionary::new();
    fonts.set("F1", Object::Reference(type0_id));
    Ok(fonts)
}

fn to_unicode_cmap(typeface: &Typeface<'_>) -> String {
    let mut cmap = String::from(
        "/CIDInit /ProcSet findresource begin\n12 dict begin\nbegincmap\n\
         /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
         /CMapName /Adobe-Identity-UCS def\n/CMapType 2 def\n\
         1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n",
    );

    let entries: Vec<(u16, char)> = typeface
        .used_glyphs()
        .iter()
        .filter(|(gid, _)| **gid != 0)
        .map(|(g, c)| (*g, *c))
        .collect();

    // bfchar sections are limited to 100 entries each.
    for chunk in entries.chunks(100) {
        let _ = writeln!(cmap, "{} beginbfchar", chunk.len());
        for (gid, c) in chunk {
            let mut units = [0u16; 2];
            let hex: String = c
                .encode_utf16(&mut units)
                .iter()
                .map(|u| format!("{u:04X}"))
                .collect();
            let _ = writeln!(cmap, "<{gid:04X}> <{hex}>");
        }
        cmap.push_str("endbfchar\n");
    }

    cmap.push_str("endcmap\nCMapName currentdict /CMap defineresource pop\nend\nend\n");
    cmap
}

fn document_title(tree: &DocumentTree) -> &str {
    tree.iter()
        .find_map(|b| match b {
            Block::Heading { level: 0, text } => Some(text.as_str()),
            _ => None,
        })
        .unwrap_or("Report")
}

fn name(n: &str) -> Object {
    Object::Name(n.as_bytes().to_vec())
}

/// PDF text string: PDFDocEncoding for ASCII, UTF-16BE with BOM otherwise.
fn text_string(s: &str) -> Object {
    if s.is_ascii() {
        return Object::String(s.as_bytes().to_vec(), StringFormat::Literal);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in s.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}
