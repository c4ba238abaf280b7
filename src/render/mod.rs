pub mod output;
pub mod pdf;
pub mod types;
pub mod word;

use crate::{config::Config, tree::DocumentTree};
use std::path::Path;

pub use pdf::PdfRenderer;
pub use types::{RenderError, ReportFormat};
pub use word::WordRenderer;

pub trait Renderer {
    fn format(&self) -> ReportFormat;
    /// Writes `tree` to `output`, replacing any existing file. On error no
    /// file is left at `output`.
    fn render(&self, tree: &DocumentTree, output: &Path) -> Result<(), RenderError>;
}

/// Constructs the renderer for `format`. Fails with `MissingDependency`
/// when that backend was not compiled in.
pub fn renderer_for(format: ReportFormat, cfg: &Config) -> Result<Box<dyn Renderer>, RenderError> {
    Ok(match format {
        ReportFormat::Word => Box::new(WordRenderer::new(&cfg.word)?),
        ReportFormat::Pdf => Box::new(PdfRenderer::new(&cfg.pdf)?),
    })
}

/// Number of columns a table needs: the widest of the header and every row.
pub(crate) fn column_count(header: &[String], rows: &[Vec<String>]) -> usize {
    rows.iter()
        .map(Vec::len)
        .chain(std::iter::once(header.len()))
        .max()
        .unwrap_or(0)
        .max(1)
}

/// Relative column widths from the longest cell in each column, counting
/// wide (CJK) characters double. Clamped so no column collapses or swallows
/// the table.
pub(crate) fn column_weights(header: &[String], rows: &[Vec<String>]) -> Vec<f32> {
    let n = column_count(header, rows);
    (0..n)
        .map(|i| {
            let longest = std::iter::once(header)
                .chain(rows.iter().map(Vec::as_slice))
                .filter_map(|r| r.get(i))
                .map(|cell| display_width(cell))
                .max()
                .unwrap_or(0);
            longest.clamp(4, 40) as f32
        })
        .collect()
}

fn display_width(s: &str) -> usize {
    s.chars().map(|c| if is_wide(c) { 2 } else { 1 }).sum()
}

/// East Asian wide ranges that matter for report text.
pub(crate) fn is_wide(c: char) -> bool {
    matches!(c as u32,
        0x1100..=0x115F
        | 0x2E80..=0x303E
        | 0x3041..=0x33FF
        | 0x3400..=0x4DBF
        | 0x4E00..=0x9FFF
        | 0xA000..=0xA4CF
        | 0xAC00..=0xD7A3
        | 0xF900..=0xFAFF
        | 0xFE30..=0xFE4F
        | 0xFF00..=0xFF60
        | 0xFFE0..=0xFFE6)
}
