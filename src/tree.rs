//! Format-agnostic document structure shared by every renderer.

use crate::text;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    /// Level 0 is the document title, 1 a section, 2 a violation, 3 a
    /// labelled sub-list.
    Heading { level: u8, text: String },
    Paragraph { text: String },
    BulletList { items: Vec<String> },
    /// An empty `header` means the table has no header row.
    Table {
        header: Vec<String>,
        rows: Vec<Vec<String>>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentTree {
    pub blocks: Vec<Block>,
}

impl DocumentTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    pub fn heading(&mut self, level: u8, text: impl Into<String>) {
        self.push(Block::Heading {
            level,
            text: text.into(),
        });
    }

    pub fn paragraph(&mut self, text: impl Into<String>) {
        self.push(Block::Paragraph { text: text.into() });
    }

    pub fn bullets(&mut self, items: Vec<String>) {
        self.push(Block::BulletList { items });
    }

    pub fn table(&mut self, header: Vec<String>, rows: Vec<Vec<String>>) {
        self.push(Block::Table { header, rows });
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Block> {
        self.blocks.iter()
    }

    pub fn tables(&self) -> impl Iterator<Item = (&[String], &[Vec<String>])> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Table { header, rows } => Some((header.as_slice(), rows.as_slice())),
            _ => None,
        })
    }

    /// Ordered, non-empty text content: headings, paragraph lines, bullet
    /// items, then table header cells and body cells row by row. Both
    /// renderers emit exactly this text.
    pub fn text_fragments(&self) -> Vec<String> {
        let mut out = Vec::new();
        for block in &self.blocks {
            match block {
                Block::Heading { text, .. } | Block::Paragraph { text } => push_lines(&mut out, text),
                Block::BulletList { items } => {
                    for item in items {
                        push_lines(&mut out, item);
                    }
                }
                Block::Table { header, rows } => {
                    for cell in header.iter().chain(rows.iter().flatten()) {
                        push_lines(&mut out, cell);
                    }
                }
            }
        }
        out
    }
}

impl<'a> IntoIterator for &'a DocumentTree {
    type Item = &'a Block;
    type IntoIter = std::slice::Iter<'a, Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}

fn push_lines(out: &mut Vec<String>, s: &str) {
    out.extend(text::lines(s).map(|l| l.trim().to_string()));
}
