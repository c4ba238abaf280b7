use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Word,
    Pdf,
}

impl ReportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ReportFormat::Word => "docx",
            ReportFormat::Pdf => "pdf",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReportFormat::Word => "word",
            ReportFormat::Pdf => "pdf",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportFormat {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "word" | "docx" => Ok(ReportFormat::Word),
            "pdf" => Ok(ReportFormat::Pdf),
            _ => Err(RenderError::UnsupportedFormat(s.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The backend for this format is not compiled in. Recoverable: the
    /// caller can offer the other format or ask for a rebuild.
    #[error("{format} rendering is unavailable: {detail}")]
    MissingDependency {
        format: ReportFormat,
        detail: String,
    },

    #[error("failed to write {}: {source}", path.display())]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("unsupported report format: {0:?} (expected \"word\" or \"pdf\")")]
    UnsupportedFormat(String),
}

impl RenderError {
    pub fn write_failure(
        path: impl Into<PathBuf>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    ) -> Self {
        RenderError::WriteFailure {
            path: path.into(),
            source: source.into(),
        }
    }

    pub fn missing_dependency(format: ReportFormat, detail: impl Into<String>) -> Self {
        RenderError::MissingDependency {
            format,
            detail: detail.into(),
        }
    }

    pub fn is_missing_dependency(&self) -> bool {
        matches!(self, RenderError::MissingDependency { .. })
    }
}
