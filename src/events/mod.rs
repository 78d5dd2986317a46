//! The events emitted by the parsing pipeline.
//!
//! The scanner produces the low-level stream; the balancer may insert
//! synthesized events between real ones. Every event can carry an
//! [`Augmentation`] describing where in the source it came from.

pub mod attributes;

use std::fmt;

use self::attributes::Attributes;

/// A position in the decoded character stream.
///
/// `line` and `column` are 1-based; `offset` counts characters from the start
/// of the document (after newline normalization), 0-based.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number.
    pub column: u32,
    /// 0-based character offset.
    pub offset: usize,
}

impl Position {
    /// The start-of-document position.
    pub const START: Position = Position {
        line: 1,
        column: 1,
        offset: 0,
    };
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Side-channel metadata attached to an event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Augmentation {
    /// Position of the first character of the construct.
    pub begin: Position,
    /// Position just after the last character of the construct.
    pub end: Position,
    /// `true` if the event was inserted by the balancer rather than being
    /// present in the source text. Synthesized events repeat the position of
    /// the event they were inserted next to.
    pub synthesized: bool,
}

impl Augmentation {
    /// Creates an augmentation spanning `begin..end`, not synthesized.
    pub fn span(begin: Position, end: Position) -> Self {
        Augmentation {
            begin,
            end,
            synthesized: false,
        }
    }

    /// Creates a synthesized augmentation collapsed onto `at`.
    pub fn synthesized_at(at: Position) -> Self {
        Augmentation {
            begin: at,
            end: at,
            synthesized: true,
        }
    }
}

/// A qualified element or attribute name.
///
/// `raw` preserves the name exactly as written in the source; `local` is the
/// case-folded form used for all matching (see the `names_elems` and
/// `names_attrs` config properties). `uri` is `None` until the namespace
/// binder runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QName {
    /// The name as written in the source.
    pub raw: String,
    /// The case-folded local name.
    pub local: String,
    /// The namespace prefix, if the raw name contained a `:`.
    pub prefix: Option<String>,
    /// The namespace URI assigned by the namespace binder.
    pub uri: Option<String>,
}

impl QName {
    /// Creates a name whose raw and local forms coincide, with no namespace.
    ///
    /// This is the form used by tests and by synthesized events; scanner-made
    /// names go through the case-folding constructor instead.
    pub fn new(name: &str) -> QName {
        QName::folded(name.to_string(), name.to_string())
    }

    /// Creates a name from the raw source spelling and its folded form,
    /// splitting off a namespace prefix if one is present.
    pub fn folded(raw: String, local: String) -> QName {
        let prefix = raw.find(':').and_then(|i| {
            // a leading or trailing colon is not a prefix
            if i == 0 || i + 1 == raw.len() {
                None
            } else {
                Some(raw[..i].to_string())
            }
        });
        QName {
            raw,
            local,
            prefix,
            uri: None,
        }
    }

    /// The local name without any prefix.
    pub fn local_name(&self) -> &str {
        match self.local.find(':') {
            Some(i) if i > 0 && i + 1 < self.local.len() => &self.local[i + 1..],
            _ => &self.local,
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.local)
    }
}

/// A parsed `<!DOCTYPE …>` declaration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Doctype {
    /// The root element name, as written.
    pub name: String,
    /// The PUBLIC identifier, without quotes.
    pub public_id: Option<String>,
    /// The SYSTEM identifier, without quotes.
    pub system_id: Option<String>,
}

/// An event produced by the parsing pipeline.
///
/// Events own their data: the balancer queues events and inserts synthesized
/// ones, so they must outlive the scanner's internal buffer.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// The first event of every parse. Reports the encoding the document is
    /// actually decoded with, after BOM sniffing and any `<meta>`-triggered
    /// change.
    StartDocument {
        /// Canonical name of the final document encoding.
        encoding: &'static str,
    },
    /// An `<?xml …?>` declaration.
    XmlDecl {
        /// The `version` pseudo-attribute, if present.
        version: Option<String>,
        /// The `encoding` pseudo-attribute, if present.
        encoding: Option<String>,
        /// The `standalone` pseudo-attribute, if present.
        standalone: Option<String>,
    },
    /// A `<!DOCTYPE …>` declaration.
    Doctype(Doctype),
    /// A start tag.
    Start {
        /// The element name.
        name: QName,
        /// The attributes, in source order, duplicates discarded.
        attrs: Attributes,
    },
    /// A self-closed tag (`<br/>`). The balancer expands these into a
    /// `Start` immediately followed by a synthesized `End`.
    Empty {
        /// The element name.
        name: QName,
        /// The attributes, in source order, duplicates discarded.
        attrs: Attributes,
    },
    /// An end tag.
    End {
        /// The element name.
        name: QName,
    },
    /// Character data.
    Text(String),
    /// Character data consisting only of whitespace, in positions where the
    /// balancer knows no content is expected (before `<body>`).
    IgnorableWhitespace(String),
    /// A comment. The content excludes the `<!--`/`-->` delimiters.
    Comment(String),
    /// A processing instruction.
    PI {
        /// The PI target (first name after `<?`).
        target: String,
        /// The PI data, with leading whitespace stripped.
        data: String,
    },
    /// Start of a CDATA section (only with the `cdata_sections` flag).
    CDataStart,
    /// End of a CDATA section (only with the `cdata_sections` flag).
    CDataEnd,
    /// Start of a resolved named character reference (only with the
    /// `notify_char_refs` flag). The following `Text` event carries the
    /// replacement.
    GeneralEntityStart(String),
    /// End of a resolved named character reference.
    GeneralEntityEnd(String),
    /// The last event of every parse. Terminal: reading past it returns
    /// `EndDocument` again.
    EndDocument,
}

impl Event {
    /// Name of the variant, used by tests and diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::StartDocument { .. } => "StartDocument",
            Event::XmlDecl { .. } => "XmlDecl",
            Event::Doctype(_) => "Doctype",
            Event::Start { .. } => "Start",
            Event::Empty { .. } => "Empty",
            Event::End { .. } => "End",
            Event::Text(_) => "Text",
            Event::IgnorableWhitespace(_) => "IgnorableWhitespace",
            Event::Comment(_) => "Comment",
            Event::PI { .. } => "PI",
            Event::CDataStart => "CDataStart",
            Event::CDataEnd => "CDataEnd",
            Event::GeneralEntityStart(_) => "GeneralEntityStart",
            Event::GeneralEntityEnd(_) => "GeneralEntityEnd",
            Event::EndDocument => "EndDocument",
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn qname_prefix_split() {
        let q = QName::folded("svg:path".to_string(), "svg:path".to_string());
        assert_eq!(q.prefix.as_deref(), Some("svg"));
        assert_eq!(q.local_name(), "path");
    }

    #[test]
    fn qname_degenerate_colons() {
        assert_eq!(QName::folded(":a".to_string(), ":a".to_string()).prefix, None);
        assert_eq!(QName::folded("a:".to_string(), "a:".to_string()).prefix, None);
    }

    #[test]
    fn positions_are_ordered() {
        let a = Position { line: 1, column: 9, offset: 8 };
        let b = Position { line: 2, column: 1, offset: 9 };
        assert!(a < b);
    }
}
