//! Font resolution for the PDF backend.
//!
//! Candidates are probed in order through a [`FontSource`]; the first file
//! that exists and registers is embedded for every text style. When nothing
//! registers the renderer falls back to the built-in Helvetica pair.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Filesystem access used by [`FontResolver`]. Tests substitute an in-memory
/// implementation.
pub trait FontSource {
    fn exists(&self, path: &Path) -> bool;
    fn read(&self, path: &Path) -> std::io::Result<Vec<u8>>;
}

impl<S: FontSource + ?Sized> FontSource for &S {
    fn exists(&self, path: &Path) -> bool {
        (**self).exists(path)
    }

    fn read(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        (**self).read(path)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemFonts;

impl FontSource for SystemFonts {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        std::fs::read(path)
    }
}

/// A TrueType face ready for embedding. Faces taken from a collection are
/// stored as standalone font files.
#[derive(Clone)]
pub struct EmbeddedFont {
    path: PathBuf,
    name: String,
    data: Vec<u8>,
}

impl fmt::Debug for EmbeddedFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddedFont")
            .field("path", &self.path)
            .field("name", &self.name)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl EmbeddedFont {
    pub fn register(path: &Path, data: Vec<u8>) -> Result<Self, String> {
        let (name, data) = face::standalone(data)?;
        Ok(Self {
            path: path.to_path_buf(),
            name: pdf_name(&name),
            data,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// PostScript name, restricted to characters valid in a PDF name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

#[derive(Debug, Clone)]
pub enum ResolvedFont {
    Embedded(EmbeddedFont),
    /// Helvetica / Helvetica-Bold, WinAnsi encoded. Glyphs outside that
    /// encoding render as `?`.
    Builtin,
}

impl ResolvedFont {
    pub fn describe(&self) -> String {
        match self {
            ResolvedFont::Embedded(f) => format!("{} ({})", f.name(), f.path().display()),
            ResolvedFont::Builtin => "Helvetica (built-in)".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProbeStatus {
    Missing,
    Unreadable { error: String },
    Rejected { reason: String },
    Registered { name: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FontProbe {
    pub path: String,
    #[serde(flatten)]
    pub status: ProbeStatus,
}

pub struct FontResolver<S> {
    source: S,
}

impl<S: FontSource> FontResolver<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Walks `candidates` in order and stops at the first font that
    /// registers.
    pub fn resolve<P: AsRef<Path>>(&self, candidates: &[P]) -> ResolvedFont {
        for candidate in candidates {
            let path = candidate.as_ref();
            match self.try_register(path) {
                Ok(font) => {
                    info!("using font {}", path.display());
                    return ResolvedFont::Embedded(font);
                }
                Err(ProbeStatus::Missing) => debug!("font candidate missing: {}", path.display()),
                Err(status) => warn!("font candidate {} not usable: {:?}", path.display(), status),
            }
        }
        warn!("no font candidate registered; falling back to built-in Helvetica");
        ResolvedFont::Builtin
    }

    /// Status of every candidate, without stopping at the first success.
    pub fn probe<P: AsRef<Path>>(&self, candidates: &[P]) -> Vec<FontProbe> {
        candidates
            .iter()
            .map(|c| {
                let path = c.as_ref();
                let status = match self.try_register(path) {
                    Ok(font) => ProbeStatus::Registered {
                        name: font.name().to_string(),
                    },
                    Err(status) => status,
                };
                FontProbe {
                    path: path.display().to_string(),
                    status,
                }
            })
            .collect()
    }

    fn try_register(&self, path: &Path) -> Result<EmbeddedFont, ProbeStatus> {
        if !self.source.exists(path) {
            return Err(ProbeStatus::Missing);
        }
        let data = self.source.read(path).map_err(|e| ProbeStatus::Unreadable {
            error: e.to_string(),
        })?;
        EmbeddedFont::register(path, data).map_err(|reason| ProbeStatus::Rejected { reason })
    }
}

fn pdf_name(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if cleaned.is_empty() {
        "EmbeddedFont".to_string()
    } else {
        cleaned
    }
}

#[cfg(feature = "pdf")]
mod face {
    use ttf_parser::{Face, name_id};

    /// Returns the PostScript name and an embeddable single-face font file.
    /// Collections contribute their first face.
    pub fn standalone(data: Vec<u8>) -> Result<(String, Vec<u8>), String> {
        let data = match ttf_parser::fonts_in_collection(&data) {
            Some(0) => return Err("font collection has no faces".to_string()),
            Some(_) => first_face(&data)?,
            None => data,
        };
        let name = inspect(&data)?;
        Ok((name, data))
    }

    fn inspect(data: &[u8]) -> Result<String, String> {
        let face = Face::parse(data, 0).map_err(|e| e.to_string())?;
        if face.tables().glyf.is_none() {
            return Err("no TrueType outlines (CFF-based fonts are not supported)".to_string());
        }
        let name = face
            .names()
            .into_iter()
            .filter(|n| n.name_id == name_id::POST_SCRIPT_NAME)
            .find_map(|n| n.to_string())
            .unwrap_or_default();
        Ok(name)
    }

    /// Copies face 0 of a `ttcf` collection into a plain sfnt: its table
    /// directory followed by every table it references, 4-byte aligned.
    fn first_face(data: &[u8]) -> Result<Vec<u8>, String> {
        let bytes = move |at: usize, len: usize| {
            at.checked_add(len)
                .and_then(|end| data.get(at..end))
                .ok_or_else(|| format!("collection truncated at byte {at}"))
        };
        let be32 = move |at: usize| -> Result<usize, String> {
            let b = bytes(at, 4)?;
            Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]) as usize)
        };

        let dir = be32(12)?;
        let head = bytes(dir, 12)?;
        let num_tables = usize::from(u16::from_be_bytes([head[4], head[5]]));
        let header_len = 12 + 16 * num_tables;

        let mut records = Vec::with_capacity(16 * num_tables);
        let mut tables = Vec::new();
        for i in 0..num_tables {
            let rec = dir + 12 + 16 * i;
            let tag_and_checksum = bytes(rec, 8)?;
            let offset = be32(rec + 8)?;
            let len = be32(rec + 12)?;
            let table = bytes(offset, len)?;

            let new_offset = u32::try_from(header_len + tables.len())
                .map_err(|_| "font too large".to_string())?;
            records.extend_from_slice(tag_and_checksum);
            records.extend_from_slice(&new_offset.to_be_bytes());
            records.extend_from_slice(&(len as u32).to_be_bytes());
            tables.extend_from_slice(table);
            tables.resize(tables.len().next_multiple_of(4), 0);
        }

        let mut out = Vec::with_capacity(header_len + tables.len());
        out.extend_from_slice(head);
        out.extend_from_slice(&records);
        out.extend_from_slice(&tables);
        Ok(out)
    }
}

#[cfg(not(feature = "pdf"))]
mod face {
    pub fn standalone(_data: Vec<u8>) -> Result<(String, Vec<u8>), String> {
        Err("font parsing is not compiled in".to_string())
    }
}
