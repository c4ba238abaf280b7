//! Flowing single-column layout: turns blocks into per-page content
//! operations.

use super::fonts::EmbeddedFont;
use crate::{
    render::{column_count, column_weights, is_wide},
    text,
    tree::{Block, DocumentTree},
};
use lopdf::{Object, StringFormat, content::Operation};
use std::collections::BTreeMap;
use ttf_parser::{Face, GlyphId};

#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// Glyph metrics and string encoding for whichever font the render uses.
pub(crate) struct Typeface<'a> {
    face: Option<Face<'a>>,
    units_per_em: f32,
    used: BTreeMap<u16, char>,
}

impl<'a> Typeface<'a> {
    pub fn builtin() -> Self {
        Self {
            face: None,
            units_per_em: 1000.0,
            used: BTreeMap::new(),
        }
    }

    pub fn embedded(font: &'a EmbeddedFont) -> Result<Self, String> {
        let face = Face::parse(font.data(), 0).map_err(|e| e.to_string())?;
        let units_per_em = f32::from(face.units_per_em().max(1));
        Ok(Self {
            face: Some(face),
            units_per_em,
            used: BTreeMap::new(),
        })
    }

    pub fn face(&self) -> Option<&Face<'a>> {
        self.face.as_ref()
    }

    /// Glyph id -> character for every glyph drawn so far.
    pub fn used_glyphs(&self) -> &BTreeMap<u16, char> {
        &self.used
    }

    /// Embedded fonts serve every style from one face.
    pub fn resource(&self, bold: bool) -> &'static str {
        if bold && self.face.is_none() { "F2" } else { "F1" }
    }

    /// Advance width in 1/1000 em.
    pub fn advance(&self, c: char, bold: bool) -> f32 {
        let c = if c == '\t' { ' ' } else { c };
        match &self.face {
            Some(face) => {
                let gid = face.glyph_index(c).unwrap_or(GlyphId(0));
                let adv = face.glyph_hor_advance(gid).unwrap_or(0);
                f32::from(adv) * 1000.0 / self.units_per_em
            }
            None => {
                let table = if bold { &HELVETICA_BOLD } else { &HELVETICA };
                let code = winansi(c).unwrap_or(b'?');
                match code {
                    0x20..=0x7E => f32::from(table[usize::from(code - 0x20)]),
                    0xA0 => 278.0,
                    _ => 556.0,
                }
            }
        }
    }

    pub fn measure(&self, s: &str, size: f32, bold: bool) -> f32 {
        s.chars().map(|c| self.advance(c, bold)).sum::<f32>() * size / 1000.0
    }

    /// Bytes for a `Tj` operand: WinAnsi codes for the built-in font,
    /// big-endian glyph ids (Identity-H) for an embedded one.
    pub fn encode(&mut self, s: &str) -> Vec<u8> {
        match &self.face {
            Some(face) => {
                let mut out = Vec::with_capacity(s.len() * 2);
                for c in s.chars() {
                    let c = if c == '\t' { ' ' } else { c };
                    let gid = face.glyph_index(c).map(|g| g.0).unwrap_or(0);
                    if gid != 0 {
                        self.used.entry(gid).or_insert(c);
                    } else {
                        self.used.entry(0).or_insert('\u{FFFD}');
                    }
                    out.extend_from_slice(&gid.to_be_bytes());
                }
                out
            }
            None => s.chars().map(|c| winansi(c).unwrap_or(b'?')).collect(),
        }
    }
}

fn winansi(c: char) -> Option<u8> {
    let code = match c {
        '\t' => b' ',
        ' '..='~' => c as u8,
        '\u{A0}'..='\u{FF}' => c as u32 as u8,
        '\u{20AC}' => 0x80,
        '\u{201A}' => 0x82,
        '\u{0192}' => 0x83,
        '\u{201E}' => 0x84,
        '\u{2026}' => 0x85,
        '\u{2020}' => 0x86,
        '\u{2021}' => 0x87,
        '\u{02C6}' => 0x88,
        '\u{2030}' => 0x89,
        '\u{0160}' => 0x8A,
        '\u{2039}' => 0x8B,
        '\u{0152}' => 0x8C,
        '\u{017D}' => 0x8E,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201C}' => 0x93,
        '\u{201D}' => 0x94,
        '\u{2022}' => 0x95,
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '\u{02DC}' => 0x98,
        '\u{2122}' => 0x99,
        '\u{0161}' => 0x9A,
        '\u{203A}' => 0x9B,
        '\u{0153}' => 0x9C,
        '\u{017E}' => 0x9E,
        '\u{0178}' => 0x9F,
        _ => return None,
    };
    Some(code)
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
}

impl PageGeometry {
    pub fn content_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Align {
    Left,
    Center,
}

#[derive(Debug, Clone, Copy)]
struct Style {
    size: f32,
    bold: bool,
    leading: f32,
    before: f32,
    after: f32,
    align: Align,
}

const BULLET_INDENT: f32 = 18.0;
const CELL_PAD: f32 = 4.0;

pub(crate) struct Layout<'t, 'a> {
    font: &'t mut Typeface<'a>,
    geo: PageGeometry,
    body: f32,
    pages: Vec<Vec<Operation>>,
    y: f32,
}

impl<'t, 'a> Layout<'t, 'a> {
    pub fn new(font: &'t mut Typeface<'a>, geo: PageGeometry, body: f32) -> Self {
        Self {
            font,
            geo,
            body,
            pages: vec![Vec::new()],
            y: geo.height - geo.margin,
        }
    }

    /// Lays out every block and returns the content operations per page.
    pub fn run(mut self, tree: &DocumentTree) -> Vec<Vec<Operation>> {
        for block in tree {
            self.block(block);
        }
        self.pages
    }

    fn style(&self, heading: Option<u8>) -> Style {
        let b = self.body;
        let (size, before, after, align) = match heading {
            Some(0) => (b * 1.8, 0.0, b * 2.0, Align::Center),
            Some(1) => (b * 1.4, b * 1.4, b * 0.6, Align::Left),
            Some(2) => (b * 1.2, b * 1.0, b * 0.4, Align::Left),
            Some(_) => (b * 1.05, b * 0.6, b * 0.3, Align::Left),
            None => (b, 0.0, b * 0.6, Align::Left),
        };
        Style {
            size,
            bold: heading.is_some(),
            leading: size * 1.35,
            before,
            after,
            align,
        }
    }

    fn block(&mut self, block: &Block) {
        match block {
            Block::Heading { level, text } => {
                let style = self.style(Some(*level));
                self.gap(style.before);
                // Keep a heading with at least one line of what follows.
                let body_line = self.style(None).leading;
                self.ensure(style.leading + body_line);
                self.text_block(text, style, 0.0, false);
                self.gap(style.after);
            }
            Block::Paragraph { text } => {
                let style = self.style(None);
                self.text_block(text, style, 0.0, false);
                self.gap(style.after);
            }
            Block::BulletList { items } => {
                let mut style = self.style(None);
                style.after = self.body * 0.25;
                for item in items {
                    self.text_block(item, style, BULLET_INDENT, true);
                    self.gap(style.after);
                }
                self.gap(self.body * 0.4);
            }
            Block::Table { header, rows } => {
                self.table(header, rows);
                self.gap(self.body * 1.2);
            }
        }
    }

    fn ops(&mut self) -> &mut Vec<Operation> {
        // `pages` is never empty: it starts with one page and only grows.
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn top(&self) -> f32 {
        self.geo.height - self.geo.margin
    }

    fn at_top(&self) -> bool {
        (self.y - self.top()).abs() < f32::EPSILON
    }

    fn new_page(&mut self) {
        self.pages.push(Vec::new());
        self.y = self.top();
    }

    fn fits(&self, h: f32) -> bool {
        self.y - h >= self.geo.margin || self.at_top()
    }

    /// Starts a new page unless `h` points still fit on this one.
    fn ensure(&mut self, h: f32) {
        if !self.fits(h) {
            self.new_page();
        }
    }

    fn gap(&mut self, h: f32) {
        if !self.at_top() {
            self.y = (self.y - h).max(self.geo.margin);
        }
    }

    fn text_block(&mut self, text: &str, style: Style, indent: f32, bullet: bool) {
        let x0 = self.geo.margin + indent;
        let width = self.geo.content_width() - indent;
        let groups = self.wrap(text, style.size, style.bold, width);
        let dot_x = self.geo.margin + indent / 2.5;
        let dot_r = style.size * 0.15;

        // An empty item still shows its bullet.
        if groups.is_empty() {
            if bullet {
                self.ensure(style.leading);
                let baseline = self.y - style.leading / 2.0 - style.size * 0.3;
                self.dot(dot_x, baseline + style.size * 0.3, dot_r);
                self.y -= style.leading;
            }
            return;
        }

        let mut first = true;
        for lines in &groups {
            let mut piece = Vec::with_capacity(lines.len());
            for line in lines {
                if !self.fits(style.leading) {
                    self.text_object(&piece, style.size, style.bold, 0.0);
                    piece.clear();
                    self.new_page();
                }
                let baseline = self.y - style.leading / 2.0 - style.size * 0.3;
                if bullet && first {
                    self.dot(dot_x, baseline + style.size * 0.3, dot_r);
                }
                first = false;
                let x = match style.align {
                    Align::Left => x0,
                    Align::Center => {
                        let w = self.font.measure(line, style.size, style.bold);
                        x0 + ((width - w) / 2.0).max(0.0)
                    }
                };
                piece.push((x, baseline, line.as_str()));
                self.y -= style.leading;
            }
            self.text_object(&piece, style.size, style.bold, 0.0);
        }
    }

    fn table(&mut self, header: &[String], rows: &[Vec<String>]) {
        let n = column_count(header, rows);
        let weights = column_weights(header, rows);
        let total: f32 = weights.iter().sum();
        let widths: Vec<f32> = weights
            .iter()
            .map(|w| w / total * self.geo.content_width())
            .collect();

        let size = self.body * 0.95;
        let leading = size * 1.3;

        if !header.is_empty() {
            self.table_row(header, n, &widths, size, leading, RowKind::Header);
        }
        for row in rows {
            let kind = if header.is_empty() {
                RowKind::KeyValue
            } else {
                RowKind::Body
            };
            self.table_row(row, n, &widths, size, leading, kind);
        }
    }

    /// Whole body lines that fit between `y` and the bottom margin inside a
    /// padded cell.
    fn row_capacity(&self, y: f32, leading: f32) -> usize {
        ((y - self.geo.margin - 2.0 * CELL_PAD) / leading).floor().max(0.0) as usize
    }

    /// Draws one table row. A row that fits on a fresh page is never split;
    /// a taller row is cut into pieces, each with its own cell borders.
    fn table_row(
        &mut self,
        cells: &[String],
        n: usize,
        widths: &[f32],
        size: f32,
        leading: f32,
        kind: RowKind,
    ) {
        let cols: Vec<Column> = (0..n)
            .map(|i| {
                let bold = kind.bold(i);
                let cell = cells.get(i).map(String::as_str).unwrap_or("");
                let lines = self
                    .wrap(cell, size, bold, widths[i] - 2.0 * CELL_PAD)
                    .into_iter()
                    .enumerate()
                    .flat_map(|(g, lines)| lines.into_iter().map(move |l| (g, l)))
                    .collect();
                Column { lines, bold }
            })
            .collect();
        let total = cols.iter().map(|c| c.lines.len()).max().unwrap_or(0).max(1);
        let fresh = self.row_capacity(self.top(), leading).max(1);

        let mut start = 0;
        while start < total {
            let avail = self.row_capacity(self.y, leading);
            let remaining = total - start;
            let move_on = avail < remaining
                && !self.at_top()
                && (avail == 0 || (start == 0 && remaining <= fresh));
            if move_on {
                self.new_page();
                continue;
            }
            let take = remaining.min(avail.max(1));
            self.row_piece(&cols, start..start + take, widths, size, leading, kind);
            start += take;
            if start < total {
                self.new_page();
            }
        }
    }

    fn row_piece(
        &mut self,
        cols: &[Column],
        range: std::ops::Range<usize>,
        widths: &[f32],
        size: f32,
        leading: f32,
        kind: RowKind,
    ) {
        let height = range.len() as f32 * leading + 2.0 * CELL_PAD;
        let top = self.y;
        let mut x = self.geo.margin;

        for (i, col) in cols.iter().enumerate() {
            let w = widths[i];
            let (fill, text_gray) = kind.colors(i);
            let ops = self.ops();
            ops.push(op("q", vec![]));
            if let Some(gray) = fill {
                ops.push(op("g", vec![num(gray)]));
                ops.push(op("re", vec![num(x), num(top - height), num(w), num(height)]));
                ops.push(op("f", vec![]));
            }
            ops.push(op("G", vec![num(0.0)]));
            ops.push(op("w", vec![num(0.5)]));
            ops.push(op("re", vec![num(x), num(top - height), num(w), num(height)]));
            ops.push(op("S", vec![]));
            ops.push(op("Q", vec![]));

            // One text object per source line of the cell.
            let mut piece: Vec<(f32, f32, &str)> = Vec::new();
            let mut group = None;
            for (row, (g, line)) in col.lines.iter().enumerate() {
                if !range.contains(&row) {
                    continue;
                }
                if group.is_some_and(|prev| prev != *g) {
                    self.text_object(&piece, size, col.bold, text_gray);
                    piece.clear();
                }
                group = Some(*g);
                let line_top = top - CELL_PAD - (row - range.start) as f32 * leading;
                let baseline = line_top - leading / 2.0 - size * 0.3;
                piece.push((x + CELL_PAD, baseline, line.as_str()));
            }
            self.text_object(&piece, size, col.bold, text_gray);
            x += w;
        }
        self.y = top - height;
    }

    /// One `BT`/`ET` text object: the first line is positioned absolutely,
    /// later lines by relative `Td` moves.
    fn text_object(&mut self, lines: &[(f32, f32, &str)], size: f32, bold: bool, gray: f32) {
        if lines.is_empty() {
            return;
        }
        let resource = self.font.resource(bold);
        let encoded: Vec<Vec<u8>> = lines.iter().map(|(_, _, s)| self.font.encode(s)).collect();
        let ops = self.ops();
        ops.push(op("BT", vec![]));
        ops.push(op("g", vec![num(gray)]));
        ops.push(op("Tf", vec![Object::Name(resource.as_bytes().to_vec()), num(size)]));
        let (mut px, mut py) = (0.0, 0.0);
        for ((x, y, _), bytes) in lines.iter().zip(encoded) {
            ops.push(op("Td", vec![num(x - px), num(y - py)]));
            ops.push(op("Tj", vec![Object::String(bytes, StringFormat::Hexadecimal)]));
            (px, py) = (*x, *y);
        }
        ops.push(op("ET", vec![]));
    }

    /// Filled circle drawn with four Bezier arcs.
    fn dot(&mut self, cx: f32, cy: f32, r: f32) {
        let k = 0.5523 * r;
        let ops = self.ops();
        ops.push(op("q", vec![]));
        ops.push(op("g", vec![num(0.0)]));
        ops.push(op("m", vec![num(cx + r), num(cy)]));
        ops.push(op("c", vec![num(cx + r), num(cy + k), num(cx + k), num(cy + r), num(cx), num(cy + r)]));
        ops.push(op("c", vec![num(cx - k), num(cy + r), num(cx - r), num(cy + k), num(cx - r), num(cy)]));
        ops.push(op("c", vec![num(cx - r), num(cy - k), num(cx - k), num(cy - r), num(cx), num(cy - r)]));
        ops.push(op("c", vec![num(cx + k), num(cy - r), num(cx + r), num(cy - k), num(cx + r), num(cy)]));
        ops.push(op("f", vec![]));
        ops.push(op("Q", vec![]));
    }

    /// Wrapped lines grouped by source line (blank source lines dropped).
    fn wrap(&self, s: &str, size: f32, bold: bool, max: f32) -> Vec<Vec<String>> {
        text::lines(s)
            .map(|line| self.wrap_line(line.trim(), size, bold, max))
            .filter(|lines| !lines.is_empty())
            .collect()
    }

    /// Greedy line breaking. Breaks fall after whitespace or around wide
    /// characters; a token wider than the line is split between characters.
    fn wrap_line(&self, line: &str, size: f32, bold: bool, max: f32) -> Vec<String> {
        let mut out = Vec::new();
        let mut cur = String::new();
        let mut cur_w = 0.0;
        for tok in tokens(line) {
            let w = self.font.measure(tok.trim_end(), size, bold);
            if cur_w + w > max && !cur.trim().is_empty() {
                out.push(cur.trim().to_string());
                cur.clear();
                cur_w = 0.0;
            }
            if w > max {
                for c in tok.chars() {
                    let cw = self.font.measure(c.encode_utf8(&mut [0; 4]), size, bold);
                    if cur_w + cw > max && !cur.trim().is_empty() {
                        out.push(cur.trim().to_string());
                        cur.clear();
                        cur_w = 0.0;
                    }
                    cur.push(c);
                    cur_w += cw;
                }
                continue;
            }
            cur.push_str(tok);
            cur_w += self.font.measure(tok, size, bold);
        }
        if !cur.trim().is_empty() {
            out.push(cur.trim().to_string());
        }
        out
    }
}

struct Column {
    /// (source line index, wrapped line)
    lines: Vec<(usize, String)>,
    bold: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum RowKind {
    Header,
    Body,
    KeyValue,
}

impl RowKind {
    fn bold(self, col: usize) -> bool {
        match self {
            RowKind::Header => true,
            RowKind::KeyValue => col == 0,
            RowKind::Body => false,
        }
    }

    /// (background gray, text gray)
    fn colors(self, col: usize) -> (Option<f32>, f32) {
        match self {
            RowKind::Header => (Some(0.5), 1.0),
            RowKind::KeyValue if col == 0 => (Some(0.9), 0.0),
            _ => (None, 0.0),
        }
    }
}

/// Splits a line into break units. Each unit carries its trailing
/// whitespace; wide characters stand alone.
fn tokens(line: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut prev: Option<char> = None;
    for (i, c) in line.char_indices() {
        if let Some(p) = prev {
            let boundary = !c.is_whitespace() && (p.is_whitespace() || is_wide(p) || is_wide(c));
            if boundary {
                out.push(&line[start..i]);
                start = i;
            }
        }
        prev = Some(c);
    }
    if start < line.len() {
        out.push(&line[start..]);
    }
    out
}

fn op(name: &str, operands: Vec<Object>) -> Operation {
    Operation::new(name, operands)
}

fn num(v: f32) -> Object {
    Object::Real(v)
}
