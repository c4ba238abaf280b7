use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub report: Report,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub word: WordConfig,
    #[serde(default)]
    pub pdf: PdfConfig,
    #[serde(default)]
    pub logging: Logging,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Report {
    pub language: String,
    pub file_prefix: String,
}
impl Default for Report {
    fn default() -> Self {
        Self {
            language: "en".into(),
            file_prefix: "Building_Safety_Report".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Output {
    pub dir: String,
    pub format: String,
}
impl Default for Output {
    fn default() -> Self {
        Self {
            dir: "reports".into(),
            format: "pdf".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WordConfig {
    pub margin_cm: f32,
    pub latin_font: String,
    pub east_asian_font: String,
}
impl Default for WordConfig {
    fn default() -> Self {
        Self {
            margin_cm: 2.54,
            latin_font: "Calibri".into(),
            east_asian_font: "SimSun".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    pub page_size: String,
    pub margin_pt: f32,
    pub body_font_size: f32,
    /// Tried in order; the first that exists and registers is embedded.
    pub font_candidates: Vec<String>,
}
impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            page_size: "A4".into(),
            margin_pt: 72.0,
            body_font_size: 10.0,
            font_candidates: default_font_candidates(),
        }
    }
}

pub fn default_font_candidates() -> Vec<String> {
    [
        "C:/Windows/Fonts/simsun.ttc",
        "C:/Windows/Fonts/msyh.ttc",
        "C:/Windows/Fonts/simhei.ttf",
        "C:/Windows/Fonts/simsun.ttf",
        "/usr/share/fonts/truetype/droid/DroidSansFallbackFull.ttf",
        "/usr/share/fonts/truetype/wqy/wqy-microhei.ttc",
        "/usr/share/fonts/truetype/arphic/uming.ttc",
        "/System/Library/Fonts/Supplemental/Arial Unicode.ttf",
        "/Library/Fonts/Arial Unicode.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: false,
            file_path: "".into(),
        }
    }
}
