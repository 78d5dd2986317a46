use quick_html::encoding::encoding_for_label;
use quick_html::{Config, Event, Reader};

use pretty_assertions::assert_eq;

/// Parses bytes and returns `(document encoding, concatenated text,
/// <html> start-tag count)`.
fn parse(bytes: &[u8], config: Config, declared: Option<&str>) -> (String, String, usize) {
    let mut reader = match declared {
        Some(label) => Reader::with_declared_encoding(
            bytes,
            config,
            encoding_for_label(label).expect("known label"),
        ),
        None => Reader::with_config(bytes, config),
    };
    let mut encoding = String::new();
    let mut text = String::new();
    let mut html_starts = 0;
    loop {
        match reader.read_event().unwrap() {
            Event::StartDocument { encoding: e } => encoding = e.to_string(),
            Event::Start { name, .. } if name.local == "html" => html_starts += 1,
            Event::Text(t) => text.push_str(&t),
            Event::EndDocument => break,
            _ => {}
        }
    }
    (encoding, text, html_starts)
}

fn utf16le(s: &str, bom: bool) -> Vec<u8> {
    let mut bytes = Vec::new();
    if bom {
        bytes.extend_from_slice(&[0xFF, 0xFE]);
    }
    for unit in s.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    bytes
}

#[test]
fn utf8_bom_wins() {
    let mut bytes = vec![0xEF, 0xBB, 0xBF];
    bytes.extend_from_slice("<p>héllo</p>".as_bytes());
    let (encoding, text, _) = parse(&bytes, Config::default(), None);
    assert_eq!(encoding, "UTF-8");
    assert_eq!(text, "héllo");
}

#[test]
fn utf16le_bom() {
    let bytes = utf16le("<p>hi</p>", true);
    let (encoding, text, _) = parse(&bytes, Config::default(), None);
    assert_eq!(encoding, "UTF-16LE");
    assert_eq!(text, "hi");
}

#[test]
fn utf16be_bom() {
    let mut bytes = vec![0xFE, 0xFF];
    for unit in "<p>hi</p>".encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    let (encoding, text, _) = parse(&bytes, Config::default(), None);
    assert_eq!(encoding, "UTF-16BE");
    assert_eq!(text, "hi");
}

#[test]
fn windows_1252_is_the_default() {
    // 0xE9 is é in Windows-1252 and a bare continuation byte in UTF-8
    let bytes = b"<p>caf\xE9</p>";
    let (encoding, text, _) = parse(bytes, Config::default(), None);
    assert_eq!(encoding, "windows-1252");
    assert_eq!(text, "café");
}

#[test]
fn configurable_default_encoding() {
    let mut config = Config::default();
    config
        .set_property("default-encoding", "ISO-8859-5")
        .unwrap();
    let (encoding, _, _) = parse(b"<p>x</p>", config, None);
    assert_eq!(encoding, "ISO-8859-5");
}

#[test]
fn meta_triggers_one_replay_with_exactly_once_events() {
    // the byte source initially claims ISO-8859-1; the meta declares UTF-8;
    // the non-ASCII content only decodes correctly after the replay
    let bytes = "<html><head><meta charset=\"UTF-8\"></head><body>héllo</body></html>".as_bytes();
    let (encoding, text, html_starts) = parse(bytes, Config::default(), Some("ISO-8859-1"));
    assert_eq!(encoding, "UTF-8");
    assert_eq!(text, "héllo");
    assert_eq!(html_starts, 1);
}

#[test]
fn meta_charset_in_content_attribute() {
    let bytes =
        "<head><meta http-equiv=\"Content-Type\" content=\"text/html; charset=utf-8\"></head><body>héllo</body>"
            .as_bytes();
    let (encoding, text, _) = parse(bytes, Config::default(), Some("ISO-8859-1"));
    assert_eq!(encoding, "UTF-8");
    assert_eq!(text, "héllo");
}

#[test]
fn matching_meta_declaration_changes_nothing() {
    let bytes = b"<head><meta charset=\"windows-1252\"></head><body>caf\xE9</body>";
    let (encoding, text, _) = parse(bytes, Config::default(), None);
    assert_eq!(encoding, "windows-1252");
    assert_eq!(text, "café");
}

#[test]
fn utf16_meta_declaration_is_ignored_with_warning() {
    let mut config = Config::default();
    config.report_errors = true;
    let mut reader = Reader::with_config(
        b"<head><meta charset=\"utf-16\"></head><body>x</body>".as_ref(),
        config,
    );
    while reader.read_event().unwrap() != Event::EndDocument {}
    let warnings = reader.take_warnings();
    assert!(
        warnings.iter().any(|w| w.code == "encoding-ignored"),
        "{:?}",
        warnings
    );
}

#[test]
fn meta_after_content_does_not_replay() {
    // by the time real content has been emitted the recording is gone; the
    // late declaration must not disturb the parse
    let bytes = b"<body>caf\xE9<meta charset=\"UTF-8\"></body>";
    let (encoding, text, _) = parse(bytes, Config::default(), None);
    assert_eq!(encoding, "windows-1252");
    assert!(text.starts_with("café"), "{:?}", text);
}

#[test]
fn xml_decl_encoding_triggers_replay() {
    let bytes = "<?xml version=\"1.0\" encoding=\"utf-8\"?><html><body>héllo</body></html>".as_bytes();
    let (encoding, text, _) = parse(bytes, Config::default(), Some("ISO-8859-1"));
    assert_eq!(encoding, "UTF-8");
    assert_eq!(text, "héllo");
}

#[test]
fn character_input_ignores_declarations() {
    // from_str is the decoder bypass: a conflicting meta is informational
    let mut reader = Reader::from_str("<head><meta charset=\"utf-16\"></head><body>héllo</body>");
    let mut text = String::new();
    let mut encoding = String::new();
    loop {
        match reader.read_event().unwrap() {
            Event::StartDocument { encoding: e } => encoding = e.to_string(),
            Event::Text(t) => text.push_str(&t),
            Event::EndDocument => break,
            _ => {}
        }
    }
    assert_eq!(encoding, "UTF-8");
    assert_eq!(text, "héllo");
}

#[test]
fn second_meta_cannot_change_encoding_again() {
    let mut config = Config::default();
    config.report_errors = true;
    let bytes =
        b"<head><meta charset=\"UTF-8\"><meta charset=\"ISO-8859-5\"></head><body>x</body>";
    let mut reader =
        Reader::with_declared_encoding(bytes.as_ref(), config, encoding_for_label("ISO-8859-1").unwrap());
    let mut encoding = String::new();
    loop {
        match reader.read_event().unwrap() {
            Event::StartDocument { encoding: e } => encoding = e.to_string(),
            Event::EndDocument => break,
            _ => {}
        }
    }
    assert_eq!(encoding, "UTF-8");
    let warnings = reader.take_warnings();
    assert!(
        warnings.iter().any(|w| w.code == "encoding-ignored"),
        "{:?}",
        warnings
    );
}
