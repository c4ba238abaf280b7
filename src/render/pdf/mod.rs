pub mod fonts;
#[cfg(feature = "pdf")]
mod layout;
#[cfg(feature = "pdf")]
mod writer;

use super::{Renderer, types::RenderError, types::ReportFormat};
use crate::{config::PdfConfig, tree::DocumentTree};
use fonts::{FontResolver, FontSource, ResolvedFont, SystemFonts};
use std::path::{Path, PathBuf};

pub struct PdfRenderer {
    page: (f32, f32),
    margin: f32,
    body_size: f32,
    candidates: Vec<PathBuf>,
    source: Box<dyn FontSource + Send + Sync>,
}

impl PdfRenderer {
    pub fn new(cfg: &PdfConfig) -> Result<Self, RenderError> {
        Self::with_font_source(cfg, SystemFonts)
    }

    /// Same as [`PdfRenderer::new`] but probes fonts through `source`.
    pub fn with_font_source<S>(cfg: &PdfConfig, source: S) -> Result<Self, RenderError>
    where
        S: FontSource + Send + Sync + 'static,
    {
        if !cfg!(feature = "pdf") {
            return Err(RenderError::missing_dependency(
                ReportFormat::Pdf,
                "this build does not include the `pdf` feature (lopdf, ttf-parser)",
            ));
        }

        let page = match cfg.page_size.trim().to_ascii_lowercase().as_str() {
            "letter" => (612.0, 792.0),
            _ => (595.28, 841.89),
        };
        // Leave at least 2 inches of content width.
        let margin = cfg.margin_pt.clamp(0.0, (page.0 - 144.0) / 2.0);
        Ok(Self {
            page,
            margin,
            body_size: cfg.body_font_size.clamp(6.0, 24.0),
            candidates: cfg.font_candidates.iter().map(PathBuf::from).collect(),
            source: Box::new(source),
        })
    }

    /// Runs font resolution once; every style in the document uses the
    /// result.
    pub fn resolve_font(&self) -> ResolvedFont {
        FontResolver::new(&*self.source).resolve(&self.candidates)
    }

    pub fn render_to_bytes(&self, tree: &DocumentTree) -> Result<Vec<u8>, RenderError> {
        let mut buf = Vec::new();
        self.write_document(tree, &mut buf, Path::new("<memory>"))?;
        Ok(buf)
    }

    #[cfg(feature = "pdf")]
    fn write_document<W: std::io::Write>(
        &self,
        tree: &DocumentTree,
        out: &mut W,
        path: &Path,
    ) -> Result<(), RenderError> {
        let font = self.resolve_font();
        let geometry = layout::PageGeometry {
            width: self.page.0,
            height: self.page.1,
            margin: self.margin,
        };
        writer::write(tree, &font, geometry, self.body_size, out)
            .map_err(|e| RenderError::write_failure(path, e))
    }

    #[cfg(not(feature = "pdf"))]
    fn write_document<W: std::io::Write>(
        &self,
        _tree: &DocumentTree,
        _out: &mut W,
        _path: &Path,
    ) -> Result<(), RenderError> {
        Err(RenderError::missing_dependency(
            ReportFormat::Pdf,
            "this build does not include the `pdf` feature",
        ))
    }
}

impl Renderer for PdfRenderer {
    fn format(&self) -> ReportFormat {
        ReportFormat::Pdf
    }

    fn render(&self, tree: &DocumentTree, output: &Path) -> Result<(), RenderError> {
        tracing::info!("rendering pdf report blocks={} out={}", tree.len(), output.display());
        super::output::write_atomically(output, |file| self.write_document(tree, file, output))
    }
}
