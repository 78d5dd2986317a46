use quick_html::{Config, Event, Reader};

use pretty_assertions::assert_eq;

/// Renders the full event stream compactly, tagging synthesized events
/// with `[s]`.
fn dump_with(html: &str, mut config: Config) -> Vec<String> {
    config.augmentations = true;
    let mut reader = Reader::with_config(html.as_bytes(), config);
    let mut out = Vec::new();
    loop {
        let event = reader.read_event().unwrap();
        let synth = reader.augmentation().map_or(false, |a| a.synthesized);
        let done = event == Event::EndDocument;
        let mut rendered = match event {
            Event::StartDocument { .. } => "StartDocument".to_string(),
            Event::XmlDecl { .. } => "XmlDecl".to_string(),
            Event::Doctype(d) => format!("<!DOCTYPE {}>", d.name),
            Event::Start { name, attrs } => {
                if attrs.is_empty() {
                    format!("<{}>", name.local)
                } else {
                    format!("<{} {}>", name.local, attrs)
                }
            }
            Event::Empty { name, .. } => format!("<{}/>", name.local),
            Event::End { name } => format!("</{}>", name.local),
            Event::Text(t) => format!("'{}'", t),
            Event::IgnorableWhitespace(t) => format!("ws'{}'", t),
            Event::Comment(c) => format!("<!--{}-->", c),
            Event::PI { target, data } => format!("<?{} {}?>", target, data),
            Event::CDataStart => "CDataStart".to_string(),
            Event::CDataEnd => "CDataEnd".to_string(),
            Event::GeneralEntityStart(n) => format!("&{}(", n),
            Event::GeneralEntityEnd(n) => format!(")&{}", n),
            Event::EndDocument => "EndDocument".to_string(),
        };
        if synth {
            rendered.push_str("[s]");
        }
        out.push(rendered);
        if done {
            break;
        }
    }
    out
}

fn dump(html: &str) -> Vec<String> {
    dump_with(html, Config::default())
}

#[test]
fn plain_document() {
    assert_eq!(
        dump("<html><body><p>Hi</p></body></html>"),
        [
            "StartDocument",
            "<html>",
            "<body>",
            "<p>",
            "'Hi'",
            "</p>",
            "</body>",
            "</html>",
            "EndDocument",
        ]
    );
}

#[test]
fn auto_open_html_head_body() {
    assert_eq!(
        dump("Hi"),
        [
            "StartDocument",
            "<html>[s]",
            "<head>[s]",
            "</head>[s]",
            "<body>[s]",
            "'Hi'",
            "</body>[s]",
            "</html>[s]",
            "EndDocument",
        ]
    );
}

#[test]
fn misnested_tags() {
    assert_eq!(
        dump("<b><i>x</b>y</i>"),
        [
            "StartDocument",
            "<html>[s]",
            "<head>[s]",
            "</head>[s]",
            "<body>[s]",
            "<b>",
            "<i>",
            "'x'",
            "</i>[s]",
            "</b>",
            "'y'",
            "</body>[s]",
            "</html>[s]",
            "EndDocument",
        ]
    );
}

#[test]
fn entity_with_and_without_semicolon() {
    let events = dump("&amp;&amp X");
    let texts: Vec<_> = events.iter().filter(|s| s.starts_with('\'')).collect();
    assert_eq!(texts, ["'&'", "'& X'"]);
}

#[test]
fn attributes_are_folded_and_first_wins() {
    let events = dump(r#"<a HREF="one" href="two" checked>x</a>"#);
    assert!(
        events
            .iter()
            .any(|e| e == r#"<a href="one" checked="checked">"#),
        "{:?}",
        events
    );
}

#[test]
fn value_less_attribute_gets_its_name_as_value() {
    let events = dump("<input disabled>");
    assert!(
        events.iter().any(|e| e == r#"<input disabled="disabled">"#),
        "{:?}",
        events
    );
}

#[test]
fn element_name_case_folding() {
    let mut config = Config::default();
    config.set_property("names/elems", "upper").unwrap();
    let events = dump_with("<div>x</div>", config);
    assert!(events.iter().any(|e| e == "<DIV>"), "{:?}", events);

    let mut config = Config::default();
    config.set_property("names/elems", "match").unwrap();
    let events = dump_with("<DiV>x</dIv>", config);
    assert!(events.iter().any(|e| e == "<DiV>"), "{:?}", events);
}

#[test]
fn comment_and_doctype_pass_through() {
    let events = dump("<!DOCTYPE html><!-- hello --><html><body></body></html>");
    assert_eq!(events[1], "<!DOCTYPE html>");
    assert_eq!(events[2], "<!-- hello -->");
}

#[test]
fn doctype_identifiers() {
    let html = r#"<!DOCTYPE html PUBLIC "-//W3C//DTD HTML 4.01//EN" "http://www.w3.org/TR/html4/strict.dtd"><html></html>"#;
    let mut reader = Reader::from_bytes(html.as_bytes());
    loop {
        match reader.read_event().unwrap() {
            Event::Doctype(d) => {
                assert_eq!(d.name, "html");
                assert_eq!(d.public_id.as_deref(), Some("-//W3C//DTD HTML 4.01//EN"));
                assert_eq!(
                    d.system_id.as_deref(),
                    Some("http://www.w3.org/TR/html4/strict.dtd")
                );
                return;
            }
            Event::EndDocument => panic!("no doctype event"),
            _ => {}
        }
    }
}

#[test]
fn processing_instruction() {
    let events = dump("<?robot follow me?><html></html>");
    assert_eq!(events[1], "<?robot follow me?>");
}

#[test]
fn self_closed_tag_is_expanded() {
    assert_eq!(
        dump("<div><hr/>x</div>"),
        [
            "StartDocument",
            "<html>[s]",
            "<head>[s]",
            "</head>[s]",
            "<body>[s]",
            "<div>",
            "<hr>",
            "</hr>[s]",
            "'x'",
            "</div>",
            "</body>[s]",
            "</html>[s]",
            "EndDocument",
        ]
    );
}

#[test]
fn stray_lt_is_text() {
    let events = dump("a < b");
    let texts: Vec<_> = events.iter().filter(|s| s.starts_with('\'')).collect();
    assert_eq!(texts, ["'a < b'"]);
}

#[test]
fn end_document_is_terminal() {
    let mut reader = Reader::from_str("x");
    while reader.read_event().unwrap() != Event::EndDocument {}
    assert_eq!(reader.read_event().unwrap(), Event::EndDocument);
    assert_eq!(reader.read_event().unwrap(), Event::EndDocument);
}

#[test]
fn warnings_are_collected() {
    let mut config = Config::default();
    config.report_errors = true;
    let mut reader = Reader::with_config(b"<p foo=1 foo=2>unclosed".as_ref(), config);
    while reader.read_event().unwrap() != Event::EndDocument {}
    let warnings = reader.take_warnings();
    assert!(
        warnings.iter().any(|w| w.code == "duplicate-attribute"),
        "{:?}",
        warnings
    );
}

#[test]
fn warnings_are_silent_by_default() {
    let mut reader = Reader::from_bytes(b"<p foo=1 foo=2>unclosed");
    while reader.read_event().unwrap() != Event::EndDocument {}
    assert!(reader.take_warnings().is_empty());
}

#[test]
fn warning_observer_is_called() {
    use std::cell::RefCell;
    use std::rc::Rc;

    let seen = Rc::new(RefCell::new(Vec::new()));
    let seen2 = seen.clone();
    let mut config = Config::default();
    config.report_errors = true;
    let mut reader = Reader::with_config(b"<!-- unclosed".as_ref(), config);
    reader.set_warning_observer(move |w| seen2.borrow_mut().push(w.code));
    while reader.read_event().unwrap() != Event::EndDocument {}
    assert_eq!(*seen.borrow(), ["unclosed-comment"]);
}

#[test]
fn balance_tags_off_yields_raw_stream() {
    let mut config = Config::default();
    config.balance_tags = false;
    let events = dump_with("<b><i>x</b>", config);
    assert_eq!(
        events,
        [
            "StartDocument",
            "<b>",
            "<i>",
            "'x'",
            "</b>",
            "EndDocument",
        ]
    );
}

#[test]
fn raw_stream_keeps_empty_events() {
    let mut config = Config::default();
    config.balance_tags = false;
    let events = dump_with("<br/>", config);
    assert_eq!(events, ["StartDocument", "<br/>", "EndDocument"]);
}

// === the sink surface ====================================================

#[derive(Default)]
struct Collector {
    calls: Vec<String>,
}

impl quick_html::EventSink for Collector {
    fn start_document(&mut self, encoding: &str, _augs: Option<&quick_html::Augmentation>) {
        self.calls.push(format!("startDocument({})", encoding));
    }
    fn start_element(
        &mut self,
        name: &quick_html::QName,
        _attrs: &quick_html::events::attributes::Attributes,
        _augs: Option<&quick_html::Augmentation>,
    ) {
        self.calls.push(format!("start({})", name.local));
    }
    fn end_element(&mut self, name: &quick_html::QName, _augs: Option<&quick_html::Augmentation>) {
        self.calls.push(format!("end({})", name.local));
    }
    fn characters(&mut self, text: &str, _augs: Option<&quick_html::Augmentation>) {
        self.calls.push(format!("chars({})", text));
    }
    fn end_document(&mut self, _augs: Option<&quick_html::Augmentation>) {
        self.calls.push("endDocument".to_string());
    }
}

#[test]
fn scan_document_complete_drives_the_sink() {
    let mut reader = Reader::from_bytes(b"<p>Hi</p>");
    let mut sink = Collector::default();
    let more = reader.scan_document(true, &mut sink).unwrap();
    assert!(!more);
    assert_eq!(
        sink.calls,
        [
            "startDocument(windows-1252)",
            "start(html)",
            "start(head)",
            "end(head)",
            "start(body)",
            "start(p)",
            "chars(Hi)",
            "end(p)",
            "end(body)",
            "end(html)",
            "endDocument",
        ]
    );
}

#[test]
fn scan_document_stepwise() {
    let mut reader = Reader::from_bytes(b"<p>Hi</p>");
    let mut sink = Collector::default();
    let mut steps = 0;
    while reader.scan_document(false, &mut sink).unwrap() {
        steps += 1;
        assert!(steps < 100, "scan_document(false) never finished");
    }
    assert_eq!(sink.calls.last().map(String::as_str), Some("endDocument"));
    assert!(steps >= sink.calls.len() - 1);
}

#[test]
fn push_input_source_injects_between_events() {
    let mut reader = Reader::from_bytes(b"<div>one</div>");
    // read until the text event
    loop {
        match reader.read_event().unwrap() {
            Event::Text(t) => {
                assert_eq!(t, "one");
                break;
            }
            _ => {}
        }
    }
    // document.write-style injection: scanned before the rest of <div>
    reader.push_input_source("<b>two</b>");
    let mut rest = Vec::new();
    loop {
        match reader.read_event().unwrap() {
            Event::Start { name, .. } => rest.push(format!("<{}>", name.local)),
            Event::End { name } => rest.push(format!("</{}>", name.local)),
            Event::Text(t) => rest.push(format!("'{}'", t)),
            Event::EndDocument => break,
            _ => {}
        }
    }
    assert_eq!(
        rest,
        ["<b>", "'two'", "</b>", "</div>", "</body>", "</html>"]
    );
}

#[test]
fn evaluate_input_source_scans_to_exhaustion() {
    let mut reader = Reader::from_bytes(b"<div>one</div>");
    loop {
        if let Event::Text(_) = reader.read_event().unwrap() {
            break;
        }
    }
    let mut sink = Collector::default();
    reader.evaluate_input_source("<b>two</b>", &mut sink).unwrap();
    assert!(
        sink.calls.contains(&"start(b)".to_string())
            && sink.calls.contains(&"chars(two)".to_string()),
        "{:?}",
        sink.calls
    );
}
