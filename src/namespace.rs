//! The namespace binder.
//!
//! An optional pipeline stage that assigns the XHTML namespace to every HTML
//! element (synthesized ones included), switches to the SVG and MathML
//! namespaces inside the respective foreign-content subtrees, and resolves
//! attribute prefixes against `xmlns`/`xmlns:*` declarations per the XML
//! namespace rules.

use crate::events::attributes::Attributes;
use crate::events::{Event, QName};
use crate::scanner::ScannedEvent;

/// The XHTML namespace, assigned to every HTML element.
pub const XHTML_NS: &str = "http://www.w3.org/1999/xhtml";
/// The MathML namespace, assigned inside `<math>` subtrees.
pub const MATHML_NS: &str = "http://www.w3.org/1998/Math/MathML";
/// The SVG namespace, assigned inside `<svg>` subtrees.
pub const SVG_NS: &str = "http://www.w3.org/2000/svg";
/// The namespace of `xmlns` attributes themselves.
pub const XMLNS_NS: &str = "http://www.w3.org/2000/xmlns/";
/// The built-in namespace of the `xml:` prefix.
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";
/// The XLink namespace, built-in inside foreign content.
pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

/// A prefix binding declared by an `xmlns:prefix` attribute.
///
/// `level` is the nesting depth the binding was declared at, counting the
/// declaring element; it is used to drop the binding when that element
/// closes.
#[derive(Debug, Clone)]
struct Binding {
    prefix: String,
    uri: String,
    level: i32,
}

pub(crate) struct NamespaceBinder {
    bindings: Vec<Binding>,
    nesting: i32,
    /// Content namespace per open element; the last entry is current.
    /// Starts implicitly at XHTML; `<svg>`/`<math>` switch their subtree.
    content_ns: Vec<&'static str>,
}

impl NamespaceBinder {
    pub(crate) fn new() -> NamespaceBinder {
        NamespaceBinder {
            bindings: Vec::new(),
            nesting: 0,
            content_ns: Vec::new(),
        }
    }

    /// Assigns namespaces to one event in place.
    pub(crate) fn bind(&mut self, ev: &mut ScannedEvent) {
        match &mut ev.event {
            Event::Start { name, attrs } => self.bind_start(name, attrs, false),
            Event::Empty { name, attrs } => self.bind_start(name, attrs, true),
            Event::End { name } => self.bind_end(name),
            _ => {}
        }
    }

    fn current_content_ns(&self) -> &'static str {
        self.content_ns.last().copied().unwrap_or(XHTML_NS)
    }

    fn bind_start(&mut self, name: &mut QName, attrs: &mut Attributes, empty: bool) {
        self.nesting += 1;
        let level = self.nesting;

        // record xmlns:prefix declarations before resolving anything on this
        // element; a prefix may be declared on the element that uses it
        for attr in attrs.iter() {
            if let Some(rest) = attr.name.raw.strip_prefix("xmlns:") {
                if !rest.is_empty() {
                    self.bindings.push(Binding {
                        prefix: rest.to_string(),
                        uri: attr.value.clone(),
                        level,
                    });
                }
            }
        }

        // the content namespace is structural: XHTML everywhere, SVG and
        // MathML inside their subtrees
        let subtree_ns = match name.local_name().to_ascii_lowercase().as_str() {
            "svg" => SVG_NS,
            "math" => MATHML_NS,
            _ => self.current_content_ns(),
        };

        name.uri = match &name.prefix {
            Some(prefix) => self.resolve(prefix),
            None => Some(subtree_ns.to_string()),
        };

        let foreign = subtree_ns != XHTML_NS;
        for attr in attrs.iter_mut() {
            attr.name.uri = self.attr_uri(&attr.name, foreign);
        }

        if empty {
            self.nesting -= 1;
            self.drop_bindings();
        } else {
            self.content_ns.push(subtree_ns);
        }
    }

    fn bind_end(&mut self, name: &mut QName) {
        name.uri = match &name.prefix {
            Some(prefix) => self.resolve(prefix),
            None => Some(self.current_content_ns().to_string()),
        };
        self.content_ns.pop();
        self.nesting -= 1;
        self.drop_bindings();
    }

    fn attr_uri(&self, name: &QName, foreign: bool) -> Option<String> {
        if name.raw == "xmlns" || name.raw.starts_with("xmlns:") {
            return Some(XMLNS_NS.to_string());
        }
        let prefix = name.prefix.as_deref()?;
        if prefix == "xml" {
            return Some(XML_NS.to_string());
        }
        if let Some(uri) = self.resolve(prefix) {
            return Some(uri);
        }
        if foreign && prefix == "xlink" {
            return Some(XLINK_NS.to_string());
        }
        None
    }

    /// Innermost binding for a prefix, per XML namespace scoping.
    fn resolve(&self, prefix: &str) -> Option<String> {
        self.bindings
            .iter()
            .rfind(|b| b.prefix == prefix)
            .map(|b| b.uri.clone())
    }

    fn drop_bindings(&mut self) {
        let nesting = self.nesting;
        self.bindings.retain(|b| b.level <= nesting);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::events::attributes::Attribute;
    use pretty_assertions::assert_eq;

    fn start(name: &str, attrs: Vec<Attribute>) -> ScannedEvent {
        ScannedEvent {
            event: Event::Start {
                name: QName::folded(name.to_string(), name.to_string()),
                attrs: attrs.into_iter().collect(),
            },
            augs: None,
        }
    }

    fn end(name: &str) -> ScannedEvent {
        ScannedEvent {
            event: Event::End {
                name: QName::folded(name.to_string(), name.to_string()),
            },
            augs: None,
        }
    }

    fn uri_of(ev: &ScannedEvent) -> Option<String> {
        match &ev.event {
            Event::Start { name, .. } | Event::End { name } => name.uri.clone(),
            _ => None,
        }
    }

    #[test]
    fn html_elements_get_xhtml() {
        let mut binder = NamespaceBinder::new();
        let mut ev = start("div", vec![]);
        binder.bind(&mut ev);
        assert_eq!(uri_of(&ev).as_deref(), Some(XHTML_NS));
    }

    #[test]
    fn svg_subtree_switches_namespace() {
        let mut binder = NamespaceBinder::new();
        let mut svg = start("svg", vec![]);
        binder.bind(&mut svg);
        assert_eq!(uri_of(&svg).as_deref(), Some(SVG_NS));

        let mut path = start("path", vec![]);
        binder.bind(&mut path);
        assert_eq!(uri_of(&path).as_deref(), Some(SVG_NS));

        let mut path_end = end("path");
        binder.bind(&mut path_end);
        let mut svg_end = end("svg");
        binder.bind(&mut svg_end);
        assert_eq!(uri_of(&svg_end).as_deref(), Some(SVG_NS));

        // back in HTML content
        let mut div = start("div", vec![]);
        binder.bind(&mut div);
        assert_eq!(uri_of(&div).as_deref(), Some(XHTML_NS));
    }

    #[test]
    fn xmlns_attribute_namespace() {
        let mut binder = NamespaceBinder::new();
        let mut ev = start(
            "svg",
            vec![Attribute::new("xmlns:xlink", "http://www.w3.org/1999/xlink")],
        );
        binder.bind(&mut ev);
        match &ev.event {
            Event::Start { attrs, .. } => {
                assert_eq!(attrs[0].name.uri.as_deref(), Some(XMLNS_NS));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn declared_prefix_resolves_on_descendants() {
        let mut binder = NamespaceBinder::new();
        let mut root = start("div", vec![Attribute::new("xmlns:v", "urn:x-vml")]);
        binder.bind(&mut root);

        let mut shape = start("v:shape", vec![]);
        binder.bind(&mut shape);
        assert_eq!(uri_of(&shape).as_deref(), Some("urn:x-vml"));

        let mut shape_end = end("v:shape");
        binder.bind(&mut shape_end);
        let mut root_end = end("div");
        binder.bind(&mut root_end);

        // the binding is out of scope now
        let mut stray = start("v:shape", vec![]);
        binder.bind(&mut stray);
        assert_eq!(uri_of(&stray), None);
    }

    #[test]
    fn xlink_is_builtin_in_foreign_content() {
        let mut binder = NamespaceBinder::new();
        let mut ev = start("svg", vec![Attribute::new("xlink:href", "#x")]);
        binder.bind(&mut ev);
        match &ev.event {
            Event::Start { attrs, .. } => {
                assert_eq!(attrs[0].name.uri.as_deref(), Some(XLINK_NS));
            }
            _ => unreachable!(),
        }
    }
}
