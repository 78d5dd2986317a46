use quick_html::{Config, Event, Reader};

use pretty_assertions::assert_eq;

fn collect(html: &str, config: Config) -> Vec<Event> {
    let mut reader = Reader::with_config(html.as_bytes(), config);
    let mut out = Vec::new();
    loop {
        let event = reader.read_event().unwrap();
        let done = event == Event::EndDocument;
        out.push(event);
        if done {
            return out;
        }
    }
}

fn texts(events: &[Event]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::Text(t) => Some(t.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn script_content_is_raw_text() {
    let events = collect(
        r#"<script>if (a<b && c>d) { s = "</p>"; }</script>"#,
        Config::default(),
    );
    assert_eq!(
        texts(&events),
        [r#"if (a<b && c>d) { s = "</p>"; }"#]
    );
}

#[test]
fn script_end_tag_is_case_insensitive() {
    let events = collect("<script>x</SCRIPT>y", Config::default());
    assert_eq!(texts(&events), ["x", "y"]);
}

#[test]
fn script_end_tag_prefix_is_not_an_end_tag() {
    let events = collect("<script></scripts></script>", Config::default());
    assert_eq!(texts(&events), ["</scripts>"]);
}

#[test]
fn style_content_is_raw_text() {
    let events = collect("<style>p > a { color: red }</style>", Config::default());
    assert_eq!(texts(&events), ["p > a { color: red }"]);
}

#[test]
fn unclosed_script_runs_to_end_of_input() {
    let mut config = Config::default();
    config.report_errors = true;
    let mut reader = Reader::with_config(b"<script>never closed".as_ref(), config);
    let mut text = String::new();
    loop {
        match reader.read_event().unwrap() {
            Event::Text(t) => text.push_str(&t),
            Event::EndDocument => break,
            _ => {}
        }
    }
    assert_eq!(text, "never closed");
    assert!(reader
        .take_warnings()
        .iter()
        .any(|w| w.code == "unclosed-element"));
}

#[test]
fn plaintext_consumes_everything() {
    let events = collect("<plaintext><p>not a tag</p> &amp;", Config::default());
    assert_eq!(texts(&events), ["<p>not a tag</p> &amp;"]);
}

#[test]
fn textarea_preserves_markup_as_text() {
    let events = collect("<textarea><b>bold?</b></textarea>", Config::default());
    assert_eq!(texts(&events), ["<b>bold?</b>"]);
}

#[test]
fn cdata_is_characters_by_default() {
    let events = collect("<div><![CDATA[a<b]]></div>", Config::default());
    assert_eq!(texts(&events), ["a<b"]);
    assert!(!events.iter().any(|e| matches!(e, Event::CDataStart)));
}

#[test]
fn cdata_sections_feature_emits_markers_in_foreign_content() {
    let mut config = Config::default();
    config.set_feature("scanner/cdata-sections", true).unwrap();
    let events = collect("<svg><![CDATA[a<b]]></svg>", config);
    let kinds: Vec<_> = events.iter().map(Event::kind).collect();
    let start = kinds.iter().position(|k| *k == "CDataStart");
    let end = kinds.iter().position(|k| *k == "CDataEnd");
    assert!(start.is_some() && end.is_some(), "{:?}", kinds);
    assert_eq!(texts(&events), ["a<b"]);
}

#[test]
fn cdata_markers_outside_foreign_content_are_demoted() {
    let mut config = Config::default();
    config.set_feature("scanner/cdata-sections", true).unwrap();
    let events = collect("<div><![CDATA[a<b]]></div>", config);
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, Event::CDataStart | Event::CDataEnd)),
        "markers must be dropped outside svg/math"
    );
    assert_eq!(texts(&events), ["a<b"]);
}

#[test]
fn bogus_markup_becomes_comments() {
    let events = collect("<!whatever><div>x</div>", Config::default());
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::Comment(c) if c == "whatever")));
}

#[test]
fn unterminated_pi_is_linear_and_complete() {
    // regression guard for quadratic PI scanning: a megabyte of PI data
    // with no terminator must parse in one pass
    let mut doc = String::with_capacity(1_000_100);
    doc.push_str("<?");
    for _ in 0..1_000_000 {
        doc.push('y');
    }
    let mut config = Config::default();
    config.report_errors = true;
    let mut reader = Reader::with_config(doc.as_bytes(), config);
    let mut pi_len = None;
    loop {
        match reader.read_event().unwrap() {
            Event::PI { target, data } => pi_len = Some(target.len() + data.len()),
            Event::EndDocument => break,
            _ => {}
        }
    }
    assert_eq!(pi_len, Some(1_000_000));
    assert!(reader.take_warnings().iter().any(|w| w.code == "unclosed-pi"));
}

#[test]
fn augmentations_track_lines_and_columns() {
    let mut config = Config::default();
    config.augmentations = true;
    config.balance_tags = false;
    let mut reader = Reader::with_config(b"<p>a\nb</p>\n<p>c</p>".as_ref(), config);
    let mut spans = Vec::new();
    loop {
        let event = reader.read_event().unwrap();
        if event == Event::EndDocument {
            break;
        }
        if let Some(augs) = reader.augmentation() {
            spans.push((event.kind().to_string(), augs.begin, augs.end));
        }
    }
    // the second <p> starts on line 2
    let second_p = spans
        .iter()
        .filter(|(k, _, _)| k == "Start")
        .nth(1)
        .unwrap();
    assert_eq!(second_p.1.line, 2);
    assert_eq!(second_p.1.column, 1);
}

#[test]
fn augmented_positions_are_monotone() {
    let mut config = Config::default();
    config.augmentations = true;
    let doc = "<html>\n<body>\n<p>one</p>\n<ul><li>two<li>three</ul>\n</body></html>";
    let mut reader = Reader::with_config(doc.as_bytes(), config);
    let mut last_begin = None;
    loop {
        let event = reader.read_event().unwrap();
        let done = event == Event::EndDocument;
        if let Some(augs) = reader.augmentation() {
            if let Some(last) = last_begin {
                assert!(augs.begin >= last, "positions went backwards");
            }
            last_begin = Some(augs.begin);
        }
        if done {
            break;
        }
    }
}

#[test]
fn synthesized_events_carry_the_flag() {
    let mut config = Config::default();
    config.augmentations = true;
    let mut reader = Reader::with_config(b"Hi".as_ref(), config);
    let mut synth_names = Vec::new();
    loop {
        match reader.read_event().unwrap() {
            Event::Start { name, .. } => {
                if reader.augmentation().map_or(false, |a| a.synthesized) {
                    synth_names.push(name.local);
                }
            }
            Event::EndDocument => break,
            _ => {}
        }
    }
    assert_eq!(synth_names, ["html", "head", "body"]);
}

#[test]
fn crlf_is_normalized() {
    let mut config = Config::default();
    config.balance_tags = false;
    let events = collect("a\r\nb\rc", config);
    assert_eq!(texts(&events), ["a\nb\nc"]);
}

#[test]
fn empty_input_yields_a_complete_skeleton() {
    let events = collect("", Config::default());
    let kinds: Vec<_> = events.iter().map(Event::kind).collect();
    assert_eq!(
        kinds,
        [
            "StartDocument",
            "Start",
            "Start",
            "End",
            "Start",
            "End",
            "End",
            "EndDocument"
        ]
    );
}

#[test]
fn nesting_invariant_holds_for_tag_soup() {
    // every End matches the most recent unclosed Start
    let soup = "<table><tr><b><td>x</b></td><li>y</table><p>z";
    let mut reader = Reader::from_bytes(soup.as_bytes());
    let mut stack = Vec::new();
    loop {
        match reader.read_event().unwrap() {
            Event::Start { name, .. } => stack.push(name.local),
            Event::End { name } => {
                let open = stack.pop().expect("end without start");
                assert_eq!(open, name.local);
            }
            Event::EndDocument => break,
            _ => {}
        }
    }
    assert!(stack.is_empty(), "unclosed: {:?}", stack);
}
