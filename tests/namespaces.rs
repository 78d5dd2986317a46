use quick_html::namespace::{MATHML_NS, SVG_NS, XHTML_NS};
use quick_html::{Config, Event, Reader};

use pretty_assertions::assert_eq;

fn dump(html: &str) -> Vec<(String, Option<String>)> {
    let mut config = Config::default();
    config.set_feature("insert-namespaces", true).unwrap();
    let mut reader = Reader::with_config(html.as_bytes(), config);
    let mut out = Vec::new();
    loop {
        match reader.read_event().unwrap() {
            Event::Start { name, .. } => out.push((name.local.clone(), name.uri.clone())),
            Event::EndDocument => return out,
            _ => {}
        }
    }
}

#[test]
fn html_elements_get_the_xhtml_namespace() {
    let starts = dump("<p>x</p>");
    for (name, uri) in &starts {
        assert_eq!(uri.as_deref(), Some(XHTML_NS), "element {}", name);
    }
    // synthesized elements included
    assert!(starts.iter().any(|(name, _)| name == "html"));
    assert!(starts.iter().any(|(name, _)| name == "body"));
}

#[test]
fn svg_subtree_gets_the_svg_namespace() {
    let starts = dump("<p><svg><circle/></svg><b>x</b></p>");
    let uri_of = |n: &str| {
        starts
            .iter()
            .find(|(name, _)| name == n)
            .map(|(_, uri)| uri.clone())
            .unwrap()
    };
    assert_eq!(uri_of("svg").as_deref(), Some(SVG_NS));
    assert_eq!(uri_of("circle").as_deref(), Some(SVG_NS));
    assert_eq!(uri_of("b").as_deref(), Some(XHTML_NS));
    assert_eq!(uri_of("p").as_deref(), Some(XHTML_NS));
}

#[test]
fn mathml_subtree_gets_the_mathml_namespace() {
    let starts = dump("<math><mi>x</mi></math>");
    let uri_of = |n: &str| {
        starts
            .iter()
            .find(|(name, _)| name == n)
            .map(|(_, uri)| uri.clone())
            .unwrap()
    };
    assert_eq!(uri_of("math").as_deref(), Some(MATHML_NS));
    assert_eq!(uri_of("mi").as_deref(), Some(MATHML_NS));
}

#[test]
fn namespaces_are_off_by_default() {
    let mut reader = Reader::from_bytes(b"<p>x</p>");
    loop {
        match reader.read_event().unwrap() {
            Event::Start { name, .. } => assert_eq!(name.uri, None),
            Event::EndDocument => break,
            _ => {}
        }
    }
}
