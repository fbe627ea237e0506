use pbix_doc::error::{exit_code, RunError};
use pbix_doc::layout::{decode_utf16le, ReportDocument, LAYOUT_ENTRY};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

fn utf16le(text: &str, bom: bool) -> Vec<u8> {
    let mut out = Vec::new();
    if bom {
        out.extend_from_slice(&[0xFF, 0xFE]);
    }
    for unit in text.encode_utf16() {
        out.extend_from_slice(&unit.to_le_bytes());
    }
    out
}

fn make_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let cursor = Cursor::new(&mut buf);
        let mut writer = ZipWriter::new(cursor);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        for (name, contents) in entries {
            writer.start_file(*name, options).expect("start zip entry");
            writer.write_all(contents).expect("write zip entry contents");
        }
        writer.finish().expect("finish zip");
    }
    buf
}

const LAYOUT: &str = r#"{"config":"{\"version\":\"5.43\"}","sections":[{"name":"ReportSection1","displayName":"Überblick","filters":"[]","visualContainers":[]}]}"#;

#[test]
fn reads_utf16_layout_from_archive() {
    let bytes = make_zip(&[
        ("Version", b"1.28".as_slice()),
        (LAYOUT_ENTRY, utf16le(LAYOUT, true).as_slice()),
    ]);
    let doc = ReportDocument::from_reader(Cursor::new(bytes)).expect("open archive");
    assert_eq!(doc.sections.len(), 1);
    assert_eq!(doc.sections[0].display_name, "Überblick");
    assert_eq!(doc.config["version"], "5.43");
    assert_eq!(doc.section_display_name("ReportSection1"), Some("Überblick"));
}

#[test]
fn bom_is_optional() {
    let with = decode_utf16le(&utf16le("{}", true)).expect("decode");
    let without = decode_utf16le(&utf16le("{}", false)).expect("decode");
    assert_eq!(with, "{}");
    assert_eq!(without, "{}");
}

#[test]
fn odd_byte_length_is_rejected() {
    assert!(decode_utf16le(&[0x7B, 0x00, 0x7D]).is_err());
}

#[test]
fn archive_without_layout_has_its_own_exit_code() {
    let bytes = make_zip(&[("DataModel", b"not a layout".as_slice())]);
    let err = ReportDocument::from_reader(Cursor::new(bytes)).expect_err("missing layout");
    assert!(matches!(
        err.downcast_ref::<RunError>(),
        Some(RunError::MissingLayout { .. })
    ));
    assert_eq!(exit_code(&err), 6);
}

#[test]
fn non_zip_input_is_a_generic_failure() {
    let err = ReportDocument::from_reader(Cursor::new(b"plain text".to_vec())).expect_err("not zip");
    assert_eq!(exit_code(&err), 1);
}
