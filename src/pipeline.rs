use crate::{
    builder::{self, Labels},
    config::Config,
    model::InspectionReport,
    render::{RenderError, ReportFormat, renderer_for},
    util::{ensure_dir, file_stamp, now},
};
use std::path::{Path, PathBuf};
use std::time::Instant;
use time::OffsetDateTime;
use tracing::{debug, info};

/// Picks a backend, names the output file and drives one render.
pub struct ReportGenerator {
    cfg: Config,
}

impl ReportGenerator {
    pub fn new(cfg: &Config) -> Self {
        Self { cfg: cfg.clone() }
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn generate(
        &self,
        report: &InspectionReport,
        format: &str,
        out_dir: &Path,
    ) -> Result<PathBuf, RenderError> {
        self.generate_at(report, format, out_dir, now())
    }

    /// Like [`ReportGenerator::generate`] with the file name stamped from
    /// `at` instead of the clock.
    pub fn generate_at(
        &self,
        report: &InspectionReport,
        format: &str,
        out_dir: &Path,
        at: OffsetDateTime,
    ) -> Result<PathBuf, RenderError> {
        let started = Instant::now();
        let format: ReportFormat = format.parse()?;
        let renderer = renderer_for(format, &self.cfg)?;

        ensure_dir(out_dir).map_err(|e| RenderError::write_failure(out_dir, e))?;

        let path = out_dir.join(output_file_name(&self.cfg.report.file_prefix, at, format));
        info!(
            "generating {format} report id={} violations={} out={}",
            report.report_id,
            report.violations.len(),
            path.display()
        );

        let labels = Labels::for_language(&self.cfg.report.language);
        let tree = builder::build_with(report, &labels);
        debug!("document tree blocks={}", tree.len());

        renderer.render(&tree, &path)?;

        info!(
            "report written path={} elapsed_ms={}",
            path.display(),
            started.elapsed().as_millis()
        );
        Ok(path)
    }
}

/// `<prefix>_<YYYYMMDD_HHMMSS>.<ext>`. An empty prefix falls back to
/// `Building_Safety_Report`.
pub fn output_file_name(prefix: &str, at: OffsetDateTime, format: ReportFormat) -> String {
    let prefix = match prefix.trim() {
        "" => "Building_Safety_Report",
        p => p,
    };
    format!("{prefix}_{}.{}", file_stamp(at), format.extension())
}
