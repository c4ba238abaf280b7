mod common;

use inspection_report::render::pdf::fonts::{
    FontProbe, FontResolver, FontSource, ProbeStatus, ResolvedFont, SystemFonts,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// In-memory filesystem. `None` contents simulate a read error.
#[derive(Default)]
struct FakeFonts {
    files: HashMap<PathBuf, Option<Vec<u8>>>,
}

impl FakeFonts {
    fn with(mut self, path: &str, data: Option<&[u8]>) -> Self {
        self.files.insert(PathBuf::from(path), data.map(<[u8]>::to_vec));
        self
    }
}

impl FontSource for FakeFonts {
    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    fn read(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        match self.files.get(path) {
            Some(Some(data)) => Ok(data.clone()),
            Some(None) => Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "denied",
            )),
            None => Err(std::io::ErrorKind::NotFound.into()),
        }
    }
}

const DEJAVU: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf";

#[test]
fn nothing_present_falls_back_to_builtin() {
    let resolver = FontResolver::new(FakeFonts::default());
    let font = resolver.resolve(&["/fonts/a.ttf", "/fonts/b.ttf"]);
    assert!(matches!(font, ResolvedFont::Builtin));
    assert_eq!(font.describe(), "Helvetica (built-in)");
}

#[test]
fn empty_candidate_list_falls_back_to_builtin() {
    let resolver = FontResolver::new(FakeFonts::default());
    let none: [&str; 0] = [];
    assert!(matches!(resolver.resolve(&none), ResolvedFont::Builtin));
}

#[test]
fn probe_reports_every_candidate() {
    let source = FakeFonts::default()
        .with("/fonts/garbage.ttf", Some(b"not a font"))
        .with("/fonts/locked.ttf", None);
    let probes = FontResolver::new(source).probe(&[
        "/fonts/missing.ttf",
        "/fonts/garbage.ttf",
        "/fonts/locked.ttf",
    ]);

    assert_eq!(probes.len(), 3);
    assert_eq!(
        probes[0],
        FontProbe {
            path: "/fonts/missing.ttf".into(),
            status: ProbeStatus::Missing,
        }
    );
    assert!(matches!(probes[1].status, ProbeStatus::Rejected { .. }));
    assert!(matches!(probes[2].status, ProbeStatus::Unreadable { .. }));
}

#[test]
fn broken_candidates_do_not_stop_resolution() {
    let source = FakeFonts::default().with("/fonts/garbage.ttf", Some(b"\0\x01\0\0junk"));
    let font = FontResolver::new(&source).resolve(&["/fonts/garbage.ttf"]);
    assert!(matches!(font, ResolvedFont::Builtin));
}

#[test]
fn probe_serializes_flat() {
    let probe = FontProbe {
        path: "/fonts/x.ttf".into(),
        status: ProbeStatus::Rejected {
            reason: "bad".into(),
        },
    };
    let json = serde_json::to_value(&probe).unwrap();
    assert_eq!(
        json,
        serde_json::json!({"path": "/fonts/x.ttf", "status": "rejected", "reason": "bad"})
    );
}

#[cfg(feature = "pdf")]
#[test]
fn first_registering_system_font_wins() {
    if !Path::new(DEJAVU).is_file() {
        eprintln!("skipping: {DEJAVU} not installed");
        return;
    }
    let font = FontResolver::new(SystemFonts).resolve(&["/definitely/not/here.ttf", DEJAVU]);
    match font {
        ResolvedFont::Embedded(f) => {
            assert_eq!(f.path(), Path::new(DEJAVU));
            assert_eq!(f.name(), "DejaVuSans");
        }
        ResolvedFont::Builtin => panic!("expected DejaVu to register"),
    }
}

#[cfg(feature = "pdf")]
#[test]
fn embedded_font_is_written_as_type0() {
    use inspection_report::builder::build;
    use inspection_report::config::PdfConfig;
    use inspection_report::model::InspectionReport;
    use inspection_report::render::PdfRenderer;
    use lopdf::{Document, Object};

    if !Path::new(DEJAVU).is_file() {
        eprintln!("skipping: {DEJAVU} not installed");
        return;
    }
    let cfg = PdfConfig {
        font_candidates: vec![DEJAVU.to_string()],
        ..PdfConfig::default()
    };
    let bytes = PdfRenderer::new(&cfg)
        .unwrap()
        .render_to_bytes(&build(&InspectionReport::sample()))
        .unwrap();
    let doc = Document::load_mem(&bytes).unwrap();

    let subtypes: Vec<Vec<u8>> = doc
        .objects
        .values()
        .filter_map(|o| o.as_dict().ok())
        .filter_map(|d| d.get(b"Subtype").and_then(Object::as_name).ok())
        .map(<[u8]>::to_vec)
        .collect();
    assert!(subtypes.contains(&b"Type0".to_vec()));
    assert!(subtypes.contains(&b"CIDFontType2".to_vec()));
    assert!(
        doc.objects
            .values()
            .filter_map(|o| o.as_dict().ok())
            .any(|d| d.has(b"ToUnicode"))
    );
}

#[test]
fn renderer_uses_injected_source() {
    use inspection_report::config::PdfConfig;
    use inspection_report::render::PdfRenderer;

    let cfg = PdfConfig {
        font_candidates: vec!["/fonts/a.ttf".into()],
        ..PdfConfig::default()
    };
    let Ok(renderer) = PdfRenderer::with_font_source(&cfg, FakeFonts::default()) else {
        // Built without the pdf backend.
        return;
    };
    assert!(matches!(renderer.resolve_font(), ResolvedFont::Builtin));
}

#[cfg(feature = "pdf")]
/// Wraps a single TrueType face into a one-font `ttcf` collection.
fn as_collection(ttf: &[u8]) -> Vec<u8> {
    let mut face = ttf.to_vec();
    let num_tables = usize::from(u16::from_be_bytes([face[4], face[5]]));
    for i in 0..num_tables {
        let at = 12 + 16 * i + 8;
        let offset = u32::from_be_bytes(face[at..at + 4].try_into().unwrap());
        face[at..at + 4].copy_from_slice(&(offset + 16).to_be_bytes());
    }

    let mut out = b"ttcf".to_vec();
    out.extend_from_slice(&0x0001_0000u32.to_be_bytes());
    out.extend_from_slice(&1u32.to_be_bytes());
    out.extend_from_slice(&16u32.to_be_bytes());
    out.extend_from_slice(&face);
    out
}

#[cfg(feature = "pdf")]
#[test]
fn collection_contributes_its_first_face() {
    use inspection_report::builder::build;
    use inspection_report::config::PdfConfig;
    use inspection_report::model::InspectionReport;
    use inspection_report::render::PdfRenderer;

    let Ok(ttf) = std::fs::read(DEJAVU) else {
        eprintln!("skipping: {DEJAVU} not installed");
        return;
    };
    let ttc = as_collection(&ttf);

    let source = FakeFonts::default().with("/fonts/sans.ttc", Some(&ttc));
    match FontResolver::new(&source).resolve(&["/fonts/sans.ttc"]) {
        ResolvedFont::Embedded(f) => {
            assert_eq!(f.name(), "DejaVuSans");
            assert_eq!(&f.data()[..4], &[0, 1, 0, 0]);
        }
        ResolvedFont::Builtin => panic!("collection was not registered"),
    }

    let cfg = PdfConfig {
        font_candidates: vec!["/fonts/sans.ttc".into()],
        ..PdfConfig::default()
    };
    let tree = build(&InspectionReport::sample());
    let bytes = PdfRenderer::with_font_source(&cfg, source)
        .unwrap()
        .render_to_bytes(&tree)
        .unwrap();
    common::assert_fragments(&common::pieces(&bytes), &tree.text_fragments());
}

#[cfg(feature = "pdf")]
#[test]
fn truncated_collection_is_rejected() {
    let mut ttc = b"ttcf".to_vec();
    ttc.extend_from_slice(&0x0001_0000u32.to_be_bytes());
    ttc.extend_from_slice(&1u32.to_be_bytes());
    ttc.extend_from_slice(&9999u32.to_be_bytes());

    let source = FakeFonts::default().with("/fonts/cut.ttc", Some(&ttc));
    let resolver = FontResolver::new(&source);
    let probes = resolver.probe(&["/fonts/cut.ttc"]);
    assert!(matches!(probes[0].status, ProbeStatus::Rejected { .. }));
    assert!(matches!(
        resolver.resolve(&["/fonts/cut.ttc"]),
        ResolvedFont::Builtin
    ));
}

#[cfg(feature = "pdf")]
#[test]
fn embedded_text_decodes_through_to_unicode() {
    use inspection_report::builder::build;
    use inspection_report::config::PdfConfig;
    use inspection_report::model::InspectionReport;
    use inspection_report::render::PdfRenderer;

    if !Path::new(DEJAVU).is_file() {
        eprintln!("skipping: {DEJAVU} not installed");
        return;
    }
    let cfg = PdfConfig {
        font_candidates: vec![DEJAVU.to_string()],
        ..PdfConfig::default()
    };
    let tree = build(&InspectionReport::sample());
    let bytes = PdfRenderer::new(&cfg).unwrap().render_to_bytes(&tree).unwrap();
    common::assert_fragments(&common::pieces(&bytes), &tree.text_fragments());
}

#[cfg(feature = "pdf")]
#[test]
fn chinese_report_renders_with_cjk_font() {
    use inspection_report::builder::{Labels, build_with};
    use inspection_report::config::{PdfConfig, default_font_candidates};
    use inspection_report::model::InspectionReport;
    use inspection_report::render::PdfRenderer;

    // First installed candidate with Chinese glyphs.
    let found = default_font_candidates().into_iter().find_map(|path| {
        let data = std::fs::read(&path).ok()?;
        let face = ttf_parser::Face::parse(&data, 0).ok()?;
        face.glyph_index('建')?;
        let missing: Vec<char> = (' '..='~')
            .chain("建筑安全与质量检测报告：，".chars())
            .filter(|&c| face.glyph_index(c).is_none())
            .collect();
        Some((path, missing))
    });
    let Some((path, missing)) = found else {
        eprintln!("skipping: no CJK TrueType font installed");
        return;
    };

    let cfg = PdfConfig {
        font_candidates: vec![path.clone()],
        ..PdfConfig::default()
    };
    let renderer = PdfRenderer::new(&cfg).unwrap();
    if matches!(renderer.resolve_font(), ResolvedFont::Builtin) {
        eprintln!("skipping: {path} has no TrueType outlines");
        return;
    }

    let mut report = InspectionReport::sample();
    report.location = Some("上海市浦东新区 3 号工地".into());
    report.violations[0].description = Some("基坑临边未设置防护栏杆".repeat(12));
    let tree = build_with(&report, &Labels::chinese());
    let bytes = renderer.render_to_bytes(&tree).unwrap();

    let pieces = common::pieces(&bytes);
    let shown: String = pieces.iter().flat_map(|p| p.lines.iter().cloned()).collect();
    assert!(shown.contains("建筑安全与质量检测报告"));

    let expected: Vec<String> = tree
        .text_fragments()
        .iter()
        .map(|f| {
            f.chars()
                .map(|c| if missing.contains(&c) { '\u{FFFD}' } else { c })
                .collect()
        })
        .collect();
    common::assert_fragments(&pieces, &expected);
}
