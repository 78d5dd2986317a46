use quick_html::entities;
use quick_html::{Config, Event, Reader};

use pretty_assertions::assert_eq;

/// Concatenated character data of a parse with balancing disabled.
fn text_of(doc: &str) -> String {
    let mut config = Config::default();
    config.balance_tags = false;
    let mut reader = Reader::with_config(doc.as_bytes(), config);
    let mut text = String::new();
    loop {
        match reader.read_event().unwrap() {
            Event::Text(t) => text.push_str(&t),
            Event::EndDocument => break,
            _ => {}
        }
    }
    text
}

#[test]
fn every_catalog_name_round_trips_through_the_scanner() {
    for (name, replacement) in entities::catalog() {
        let doc = format!("&{} ", name);
        assert_eq!(
            text_of(&doc),
            format!("{} ", replacement),
            "reference &{}",
            name
        );
    }
}

#[test]
fn references_mix_with_surrounding_text() {
    assert_eq!(text_of("a&lt;b&gt;c"), "a<b>c");
    assert_eq!(text_of("&quot;x&quot;"), "\"x\"");
    assert_eq!(text_of("fish &amp; chips"), "fish & chips");
}

#[test]
fn longest_match_is_preferred() {
    // &notin; must not resolve as &not + "in;"
    assert_eq!(text_of("&notin;"), "\u{2209}");
    // with no longer continuation, the legacy &not form applies
    assert_eq!(text_of("&notq"), "\u{AC}q");
}

#[test]
fn unknown_references_stay_literal() {
    assert_eq!(text_of("&nosuch;"), "&nosuch;");
    assert_eq!(text_of("AT&T"), "AT&T");
    assert_eq!(text_of("a & b"), "a & b");
}

#[test]
fn numeric_references() {
    assert_eq!(text_of("&#65;"), "A");
    assert_eq!(text_of("&#x41;"), "A");
    assert_eq!(text_of("&#8364;"), "€");
    assert_eq!(text_of("&#x20AC;"), "€");
}

#[test]
fn numeric_references_without_semicolon() {
    assert_eq!(text_of("&#65 x"), "A x");
}

#[test]
fn windows_1252_remap_window() {
    // 0x80–0x9F numeric references take the Windows-1252 glyphs
    assert_eq!(text_of("&#128;"), "\u{20AC}");
    assert_eq!(text_of("&#146;"), "\u{2019}");
    assert_eq!(text_of("&#153;"), "\u{2122}");
    assert_eq!(text_of("&#159;"), "\u{178}");
    // the holes pass through unchanged
    assert_eq!(text_of("&#129;"), "\u{81}");
}

#[test]
fn invalid_code_points_become_replacement_chars() {
    assert_eq!(text_of("&#0;"), "\u{FFFD}");
    assert_eq!(text_of("&#xD800;"), "\u{FFFD}");
    assert_eq!(text_of("&#x110000;"), "\u{FFFD}");
    assert_eq!(text_of("&#99999999999;"), "\u{FFFD}");
}

#[test]
fn bare_hash_is_literal() {
    assert_eq!(text_of("&# x"), "&# x");
    assert_eq!(text_of("&#x x"), "&#x x");
}

#[test]
fn references_in_attribute_values() {
    let mut reader = Reader::from_bytes(br#"<a title="a&lt;b" href="?x=1&amp;y=2">t</a>"#);
    loop {
        match reader.read_event().unwrap() {
            Event::Start { name, attrs } if name.local == "a" => {
                assert_eq!(attrs.value("title"), Some("a<b"));
                assert_eq!(attrs.value("href"), Some("?x=1&y=2"));
                return;
            }
            Event::EndDocument => panic!("no <a> seen"),
            _ => {}
        }
    }
}

#[test]
fn attribute_values_are_lenient_about_missing_semicolons() {
    // a name without its ';' stays literal inside attribute values
    let mut reader = Reader::from_bytes(br#"<a href="?a=1&copy=2">t</a>"#);
    loop {
        match reader.read_event().unwrap() {
            Event::Start { name, attrs } if name.local == "a" => {
                assert_eq!(attrs.value("href"), Some("?a=1&copy=2"));
                return;
            }
            Event::EndDocument => panic!("no <a> seen"),
            _ => {}
        }
    }
}

#[test]
fn notify_char_refs_wraps_named_references() {
    let mut config = Config::default();
    config.set_feature("scanner/notify-char-refs", true).unwrap();
    config.balance_tags = false;
    let mut reader = Reader::with_config(b"x&lt;y".as_ref(), config);
    let mut events = Vec::new();
    loop {
        match reader.read_event().unwrap() {
            Event::Text(t) => events.push(format!("'{}'", t)),
            Event::GeneralEntityStart(n) => events.push(format!("start:{}", n)),
            Event::GeneralEntityEnd(n) => events.push(format!("end:{}", n)),
            Event::EndDocument => break,
            _ => {}
        }
    }
    assert_eq!(events, ["'x'", "start:lt", "'<'", "end:lt", "'y'"]);
}

#[test]
fn raw_text_never_resolves_references(){
    let mut reader = Reader::from_bytes(b"<script>a &amp; b</script>");
    let mut text = String::new();
    loop {
        match reader.read_event().unwrap() {
            Event::Text(t) => text.push_str(&t),
            Event::EndDocument => break,
            _ => {}
        }
    }
    assert_eq!(text, "a &amp; b");
}

#[test]
fn rcdata_resolves_references() {
    let mut reader = Reader::from_bytes(b"<title>a &amp; b</title>x");
    let mut texts = Vec::new();
    loop {
        match reader.read_event().unwrap() {
            Event::Text(t) => texts.push(t),
            Event::EndDocument => break,
            _ => {}
        }
    }
    assert_eq!(texts, ["a & b", "x"]);
}
