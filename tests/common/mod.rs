#![allow(dead_code)]

use lopdf::{Document, Object, ObjectId, content::Content};
use regex::Regex;
use std::collections::{BTreeMap, HashMap};

/// Text of one `BT`/`ET` object: one source line, possibly wrapped.
#[derive(Debug, Clone)]
pub struct Piece {
    pub page: usize,
    pub lines: Vec<String>,
    /// Absolute baseline of every line.
    pub baselines: Vec<f32>,
}

enum Decoder {
    WinAnsi,
    Cmap(HashMap<u16, String>),
}

impl Decoder {
    fn decode(&self, bytes: &[u8]) -> String {
        match self {
            Decoder::WinAnsi => bytes.iter().map(|&b| char::from(b)).collect(),
            Decoder::Cmap(map) => bytes
                .chunks(2)
                .map(|c| {
                    let gid = u16::from_be_bytes([c[0], *c.get(1).unwrap_or(&0)]);
                    map.get(&gid).cloned().unwrap_or_else(|| "\u{FFFD}".to_string())
                })
                .collect(),
        }
    }
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).expect("dangling reference"),
        other => other,
    }
}

fn page_fonts(doc: &Document, page_id: ObjectId) -> HashMap<Vec<u8>, Decoder> {
    let page = doc.get_dictionary(page_id).expect("page dict");
    let resources = resolve(doc, page.get(b"Resources").expect("resources"))
        .as_dict()
        .expect("resource dict");
    let fonts = resolve(doc, resources.get(b"Font").expect("fonts"))
        .as_dict()
        .expect("font dict");

    fonts
        .iter()
        .map(|(key, value)| {
            let font = resolve(doc, value).as_dict().expect("font");
            let decoder = match font.get(b"ToUnicode") {
                Ok(cmap) => {
                    let stream = resolve(doc, cmap).as_stream().expect("cmap stream");
                    let data = stream
                        .decompressed_content()
                        .unwrap_or_else(|_| stream.content.clone());
                    Decoder::Cmap(parse_bfchar(&String::from_utf8_lossy(&data)))
                }
                Err(_) => Decoder::WinAnsi,
            };
            (key.clone(), decoder)
        })
        .collect()
}

fn parse_bfchar(cmap: &str) -> HashMap<u16, String> {
    let entry = Regex::new(r"<([0-9A-Fa-f]{4})>\s*<([0-9A-Fa-f]+)>").unwrap();
    let mut map = HashMap::new();
    for section in cmap.split("beginbfchar").skip(1) {
        let body = section.split("endbfchar").next().unwrap_or("");
        for cap in entry.captures_iter(body) {
            let gid = u16::from_str_radix(&cap[1], 16).unwrap();
            let units: Vec<u16> = cap[2]
                .as_bytes()
                .chunks(4)
                .map(|h| u16::from_str_radix(std::str::from_utf8(h).unwrap(), 16).unwrap())
                .collect();
            map.insert(gid, String::from_utf16_lossy(&units));
        }
    }
    map
}

/// Every text object in page order, decoded through the page fonts.
pub fn pieces(bytes: &[u8]) -> Vec<Piece> {
    let doc = Document::load_mem(bytes).expect("parseable pdf");
    let pages: BTreeMap<u32, ObjectId> = doc.get_pages();
    let mut out = Vec::new();

    for (page_index, (_, page_id)) in pages.into_iter().enumerate() {
        let fonts = page_fonts(&doc, page_id);
        let data = doc.get_page_content(page_id).expect("page content");
        let content = Content::decode(&data).expect("decodable content");

        let mut current: Option<Piece> = None;
        let mut font: Option<&Decoder> = None;
        let mut y = 0.0f32;
        for op in &content.operations {
            match op.operator.as_str() {
                "BT" => {
                    y = 0.0;
                    current = Some(Piece {
                        page: page_index,
                        lines: Vec::new(),
                        baselines: Vec::new(),
                    });
                }
                "Tf" => {
                    let name = op.operands[0].as_name().expect("font name");
                    font = fonts.get(name);
                }
                "Td" => y += op.operands[1].as_float().expect("ty"),
                "Tj" => {
                    if let (Some(piece), Some(Object::String(bytes, _))) =
                        (current.as_mut(), op.operands.first())
                    {
                        let decoder = font.expect("Tj before Tf");
                        piece.lines.push(decoder.decode(bytes));
                        piece.baselines.push(y);
                    }
                }
                "ET" => {
                    if let Some(piece) = current.take() {
                        if !piece.lines.is_empty() {
                            out.push(piece);
                        }
                    }
                }
                _ => {}
            }
        }
    }
    out
}

fn squash(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Matches text objects to `expected` fragments in order. Wrapping may only
/// break a fragment within one object; a page break may split it across
/// objects on consecutive pages. Whitespace at wrap points is ignored.
pub fn assert_fragments(pieces: &[Piece], expected: &[String]) {
    let mut it = pieces.iter();
    for (i, fragment) in expected.iter().enumerate() {
        let want = squash(fragment);
        let first = it
            .next()
            .unwrap_or_else(|| panic!("fragment {i} {fragment:?} missing from pdf"));
        let mut got = squash(&first.lines.concat());
        let mut page = first.page;
        while got.len() < want.len() && want.starts_with(&got) {
            let next = it
                .next()
                .unwrap_or_else(|| panic!("fragment {i} {fragment:?} truncated: {got:?}"));
            assert_eq!(
                next.page,
                page + 1,
                "fragment {i} {fragment:?} split without a page break"
            );
            page = next.page;
            got.push_str(&squash(&next.lines.concat()));
        }
        assert_eq!(got, want, "fragment {i}");
    }
    let extra: Vec<_> = it.collect();
    assert!(extra.is_empty(), "unexpected text in pdf: {extra:?}");
}
