#![cfg(feature = "word")]

use inspection_report::builder::build;
use inspection_report::config::WordConfig;
use inspection_report::model::InspectionReport;
use inspection_report::render::{Renderer, WordRenderer};
use regex::Regex;
use std::io::{Cursor, Read};

fn part(bytes: &[u8], name: &str) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("valid zip");
    let mut entry = archive.by_name(name).expect("part present");
    let mut xml = String::new();
    entry.read_to_string(&mut xml).expect("utf-8 part");
    xml
}

fn run_texts(document_xml: &str) -> Vec<String> {
    let re = Regex::new(r"<w:t[^>]*>([^<]*)</w:t>").unwrap();
    re.captures_iter(document_xml)
        .map(|c| {
            c[1].replace("&lt;", "<")
                .replace("&gt;", ">")
                .replace("&quot;", "\"")
                .replace("&apos;", "'")
                .replace("&amp;", "&")
        })
        .collect()
}

#[test]
fn package_contains_every_part() {
    let renderer = WordRenderer::new(&WordConfig::default()).unwrap();
    let bytes = renderer
        .render_to_bytes(&build(&InspectionReport::sample()))
        .unwrap();
    let archive = zip::ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
    let mut names: Vec<&str> = archive.file_names().collect();
    names.sort_unstable();
    assert_eq!(
        names,
        vec![
            "[Content_Types].xml",
            "_rels/.rels",
            "docProps/app.xml",
            "docProps/core.xml",
            "word/_rels/document.xml.rels",
            "word/document.xml",
            "word/numbering.xml",
            "word/styles.xml",
        ]
    );
}

#[test]
fn run_text_matches_tree_fragments() {
    let mut report = InspectionReport::sample();
    report.violations[0].description = Some("Rails <missing> & \"unsafe\"\nsecond line".into());
    let tree = build(&report);
    let bytes = WordRenderer::new(&WordConfig::default())
        .unwrap()
        .render_to_bytes(&tree)
        .unwrap();
    let xml = part(&bytes, "word/document.xml");
    assert_eq!(run_texts(&xml), tree.text_fragments());
}

#[test]
fn structure_uses_native_constructs() {
    let tree = build(&InspectionReport::sample());
    let bytes = WordRenderer::new(&WordConfig::default())
        .unwrap()
        .render_to_bytes(&tree)
        .unwrap();
    let xml = part(&bytes, "word/document.xml");

    assert!(xml.contains(r#"<w:pStyle w:val="Title"/>"#));
    assert!(xml.contains(r#"<w:pStyle w:val="Heading1"/>"#));
    assert!(xml.contains(r#"<w:pStyle w:val="ListBullet"/>"#));
    assert_eq!(xml.matches("<w:tbl>").count(), 2);
    assert_eq!(xml.matches("<w:tblHeader/>").count(), 1);
    // 2.54 cm = 1440 twips on every side.
    assert!(xml.contains(r#"w:top="1440" w:right="1440" w:bottom="1440" w:left="1440""#));
}

#[test]
fn output_is_deterministic() {
    let tree = build(&InspectionReport::sample());
    let renderer = WordRenderer::new(&WordConfig::default()).unwrap();
    assert_eq!(
        renderer.render_to_bytes(&tree).unwrap(),
        renderer.render_to_bytes(&tree).unwrap()
    );
}

#[test]
fn render_overwrites_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.docx");
    std::fs::write(&path, b"stale").unwrap();

    let tree = build(&InspectionReport::sample());
    let renderer = WordRenderer::new(&WordConfig::default()).unwrap();
    renderer.render(&tree, &path).unwrap();

    let on_disk = std::fs::read(&path).unwrap();
    assert_eq!(on_disk, renderer.render_to_bytes(&tree).unwrap());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn write_into_missing_directory_fails_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent").join("report.docx");
    let tree = build(&InspectionReport::sample());
    let err = WordRenderer::new(&WordConfig::default())
        .unwrap()
        .render(&tree, &path)
        .expect_err("parent does not exist");
    assert!(!err.is_missing_dependency());
    assert!(!path.exists());
}
