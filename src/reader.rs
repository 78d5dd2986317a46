//! The reader: assembles the parsing pipeline and drives it.
//!
//! A [`Reader`] owns the scanner, the optional tag balancer and the optional
//! namespace binder, and exposes the event stream two ways:
//!
//! - the pull loop: call [`read_event`] until [`Event::EndDocument`];
//! - the cooperative driver: [`scan_document`] dispatches events into an
//!   [`EventSink`], one step or to completion.
//!
//! The reader is strictly single-threaded: one caller drives it, and
//! re-entrant input ([`push_input_source`]) is legal only between events.
//!
//! [`read_event`]: Reader::read_event
//! [`scan_document`]: Reader::scan_document
//! [`push_input_source`]: Reader::push_input_source

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use encoding_rs::{Encoding, UTF_8};

use crate::balancer::{BalancingListener, TagBalancer};
use crate::encoding::encoding_for_label;
use crate::errors::{ConfigError, Result, Warning};
use crate::events::attributes::Attributes;
use crate::events::{Augmentation, Doctype, Event, QName};
use crate::namespace::NamespaceBinder;
use crate::scanner::{ScanOutcome, ScannedEvent, Scanner};

/// Case folding applied to element and attribute names.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NameCase {
    /// Fold to ASCII uppercase.
    Upper,
    /// Fold to ASCII lowercase.
    Lower,
    /// The catalog's canonical form (lowercase).
    #[default]
    Default,
    /// Preserve the name exactly as written.
    Match,
}

/// User-defined settings that affect parsing.
///
/// All fields can be set directly; the string-keyed [`set_feature`] and
/// [`set_property`] setters exist for callers configuring the parser from
/// identifier/value pairs and report [`ConfigError`] for unknown ids.
///
/// [`set_feature`]: Config::set_feature
/// [`set_property`]: Config::set_property
#[derive(Clone, Debug)]
pub struct Config {
    /// Attach line/column/offset spans to every event. Default: `false`.
    pub augmentations: bool,
    /// Report warnings for recovered malformations. Default: `false`.
    pub report_errors: bool,
    /// Run the tag balancer; turning it off yields the raw scanner stream.
    /// Default: `true`.
    pub balance_tags: bool,
    /// Balance as a document fragment seeded by [`fragment_context`].
    /// Default: `false`.
    ///
    /// [`fragment_context`]: Config::fragment_context
    pub document_fragment: bool,
    /// Run the namespace binder. Default: `false`.
    pub insert_namespaces: bool,
    /// Synthesize `html`/`head`/`body` when missing. Default: `true`.
    pub insert_html_body: bool,
    /// Emit [`Event::GeneralEntityStart`]/[`Event::GeneralEntityEnd`] around
    /// each named character reference in content. Default: `false`.
    pub notify_char_refs: bool,
    /// Emit CDATA sections as [`Event::CDataStart`]/characters/
    /// [`Event::CDataEnd`] instead of plain characters. Default: `false`.
    pub cdata_sections: bool,
    /// Case folding of element names. Default: [`NameCase::Default`].
    pub names_elems: NameCase,
    /// Case folding of attribute names. Default: [`NameCase::Lower`].
    pub names_attrs: NameCase,
    /// Fallback encoding label when nothing is detected or declared.
    /// Default: `"windows-1252"`.
    pub default_encoding: String,
    /// Element names seeding the balancer's stack in fragment mode.
    pub fragment_context: Vec<String>,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            augmentations: false,
            report_errors: false,
            balance_tags: true,
            document_fragment: false,
            insert_namespaces: false,
            insert_html_body: true,
            notify_char_refs: false,
            cdata_sections: false,
            names_elems: NameCase::Default,
            names_attrs: NameCase::Lower,
            default_encoding: "windows-1252".to_string(),
            fragment_context: Vec::new(),
        }
    }
}

impl Config {
    /// Sets a feature by its string identifier.
    pub fn set_feature(&mut self, id: &str, value: bool) -> std::result::Result<(), ConfigError> {
        match id {
            "augmentations" => self.augmentations = value,
            "report-errors" => self.report_errors = value,
            "balance-tags" => self.balance_tags = value,
            "balance-tags/document-fragment" => self.document_fragment = value,
            "insert-namespaces" => self.insert_namespaces = value,
            "insert-html-body" => self.insert_html_body = value,
            "scanner/notify-char-refs" => self.notify_char_refs = value,
            "scanner/cdata-sections" => self.cdata_sections = value,
            _ => return Err(ConfigError::UnknownFeature(id.to_string())),
        }
        Ok(())
    }

    /// Sets a string property by its identifier.
    pub fn set_property(&mut self, id: &str, value: &str) -> std::result::Result<(), ConfigError> {
        let invalid = || ConfigError::InvalidValue {
            property: id.to_string(),
            value: value.to_string(),
        };
        match id {
            "names/elems" => {
                self.names_elems = match value {
                    "upper" => NameCase::Upper,
                    "lower" => NameCase::Lower,
                    "default" => NameCase::Default,
                    "match" => NameCase::Match,
                    _ => return Err(invalid()),
                }
            }
            "names/attrs" => {
                self.names_attrs = match value {
                    "upper" => NameCase::Upper,
                    "lower" => NameCase::Lower,
                    "no-change" => NameCase::Match,
                    _ => return Err(invalid()),
                }
            }
            "default-encoding" => {
                if encoding_for_label(value).is_none() {
                    return Err(invalid());
                }
                self.default_encoding = value.to_string();
            }
            "fragment-context-stack" => {
                self.fragment_context = value.split_whitespace().map(str::to_string).collect();
            }
            _ => return Err(ConfigError::UnknownProperty(id.to_string())),
        }
        Ok(())
    }
}

/// The capability set a consumer implements to receive events.
///
/// Every method has a no-op default, so sinks implement only what they need.
/// Event data is borrowed: a sink that retains characters or attributes past
/// the callback must clone them.
#[allow(unused_variables)]
pub trait EventSink {
    /// The parse started; `encoding` is the final document encoding.
    fn start_document(&mut self, encoding: &str, augs: Option<&Augmentation>) {}
    /// An `<?xml …?>` declaration.
    fn xml_decl(
        &mut self,
        version: Option<&str>,
        encoding: Option<&str>,
        standalone: Option<&str>,
        augs: Option<&Augmentation>,
    ) {
    }
    /// A `<!DOCTYPE …>` declaration.
    fn doctype_decl(&mut self, doctype: &Doctype, augs: Option<&Augmentation>) {}
    /// A start tag (real or synthesized).
    fn start_element(&mut self, name: &QName, attrs: &Attributes, augs: Option<&Augmentation>) {}
    /// A self-closed tag, only seen with the balancer disabled.
    fn empty_element(&mut self, name: &QName, attrs: &Attributes, augs: Option<&Augmentation>) {}
    /// An end tag (real or synthesized).
    fn end_element(&mut self, name: &QName, augs: Option<&Augmentation>) {}
    /// Character data.
    fn characters(&mut self, text: &str, augs: Option<&Augmentation>) {}
    /// Whitespace in positions where no content is expected.
    fn ignorable_whitespace(&mut self, text: &str, augs: Option<&Augmentation>) {}
    /// A comment.
    fn comment(&mut self, text: &str, augs: Option<&Augmentation>) {}
    /// A processing instruction.
    fn processing_instruction(&mut self, target: &str, data: &str, augs: Option<&Augmentation>) {}
    /// Start of a CDATA section.
    fn start_cdata(&mut self, augs: Option<&Augmentation>) {}
    /// End of a CDATA section.
    fn end_cdata(&mut self, augs: Option<&Augmentation>) {}
    /// Start of a notified named character reference.
    fn start_general_entity(&mut self, name: &str, augs: Option<&Augmentation>) {}
    /// End of a notified named character reference.
    fn end_general_entity(&mut self, name: &str, augs: Option<&Augmentation>) {}
    /// The parse finished.
    fn end_document(&mut self, augs: Option<&Augmentation>) {}
}

/// A permissive streaming HTML reader.
pub struct Reader<R: Read> {
    scanner: Scanner<R>,
    balancer: Option<TagBalancer>,
    binder: Option<NamespaceBinder>,
    /// Scanner output held back until the encoding is settled, so a replay
    /// never re-delivers an event. Pre-balancer: downstream stages see
    /// nothing until the prologue is final.
    holdback: VecDeque<ScannedEvent>,
    out: VecDeque<ScannedEvent>,
    last_augs: Option<Augmentation>,
    warnings: Vec<Warning>,
    warning_observer: Option<Box<dyn FnMut(&Warning)>>,
    ended: bool,
}

impl<'a> Reader<&'a [u8]> {
    /// Creates a reader over a character string (decoder bypass: the input
    /// is already decoded, in-document encoding declarations are
    /// informational only).
    pub fn from_str(input: &'a str) -> Reader<&'a [u8]> {
        Reader::build(input.as_bytes(), Config::default(), Some(UTF_8), true)
    }

    /// Creates a reader over an in-memory byte slice.
    pub fn from_bytes(input: &'a [u8]) -> Reader<&'a [u8]> {
        Reader::build(input, Config::default(), None, false)
    }
}

impl Reader<BufReader<File>> {
    /// Opens and reads a file. The reader owns the stream; it is closed when
    /// the reader is dropped.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Reader<BufReader<File>>> {
        let file = File::open(path)?;
        Ok(Reader::build(
            BufReader::new(file),
            Config::default(),
            None,
            false,
        ))
    }
}

impl<R: Read> Reader<R> {
    /// Creates a reader over a byte stream with the default configuration.
    pub fn from_reader(input: R) -> Reader<R> {
        Reader::build(input, Config::default(), None, false)
    }

    /// Creates a reader over a byte stream with the given configuration.
    pub fn with_config(input: R, config: Config) -> Reader<R> {
        Reader::build(input, config, None, false)
    }

    /// Creates a reader over a byte stream whose encoding the caller
    /// already knows (e.g. from a `Content-Type` header). A BOM still wins.
    pub fn with_declared_encoding(
        input: R,
        config: Config,
        encoding: &'static Encoding,
    ) -> Reader<R> {
        Reader::build(input, config, Some(encoding), false)
    }

    fn build(
        input: R,
        config: Config,
        declared: Option<&'static Encoding>,
        transcoded: bool,
    ) -> Reader<R> {
        let balancer = if config.balance_tags {
            Some(TagBalancer::new(config.clone()))
        } else {
            None
        };
        let binder = if config.insert_namespaces {
            Some(NamespaceBinder::new())
        } else {
            None
        };
        Reader {
            scanner: Scanner::new(input, config, declared, transcoded),
            balancer,
            binder,
            holdback: VecDeque::new(),
            out: VecDeque::new(),
            last_augs: None,
            warnings: Vec::new(),
            warning_observer: None,
            ended: false,
        }
    }

    /// Installs an observer for tags the balancer discards.
    pub fn set_balancing_listener(&mut self, listener: Box<dyn BalancingListener>) {
        if let Some(balancer) = &mut self.balancer {
            balancer.set_listener(listener);
        }
    }

    /// Installs an observer for recovered-malformation warnings.
    ///
    /// Without an observer, warnings accumulate and can be drained with
    /// [`take_warnings`](Reader::take_warnings).
    pub fn set_warning_observer<F: FnMut(&Warning) + 'static>(&mut self, observer: F) {
        self.warning_observer = Some(Box::new(observer));
    }

    /// Drains warnings collected since the last call.
    pub fn take_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }

    /// The augmentation of the most recently returned event, when the
    /// `augmentations` feature is on.
    pub fn augmentation(&self) -> Option<&Augmentation> {
        self.last_augs.as_ref()
    }

    /// Suspends the current input and scans `text` next
    /// (`document.write`-style re-entrant input).
    ///
    /// Legal only between events: call it between two [`read_event`] calls
    /// or from inside an [`EventSink`] callback boundary, never while an
    /// event is being scanned.
    ///
    /// [`read_event`]: Reader::read_event
    pub fn push_input_source(&mut self, text: &str) {
        self.scanner.push_input_source(text);
    }

    /// Pushes `text` and drives the parse until that source is exhausted,
    /// dispatching its events into `sink`.
    pub fn evaluate_input_source(&mut self, text: &str, sink: &mut dyn EventSink) -> Result<()> {
        self.scanner.push_input_source(text);
        let depth = self.scanner.source_depth();
        while self.scanner.source_depth() >= depth || !self.out.is_empty() {
            let event = self.read_event()?;
            let done = event == Event::EndDocument;
            dispatch(sink, &event, self.last_augs.as_ref());
            if done {
                break;
            }
        }
        Ok(())
    }

    /// Returns the next event of the repaired stream.
    ///
    /// [`Event::EndDocument`] is terminal: further calls keep returning it.
    pub fn read_event(&mut self) -> Result<Event> {
        loop {
            if let Some(ev) = self.out.pop_front() {
                self.last_augs = ev.augs;
                if ev.event == Event::EndDocument {
                    self.ended = true;
                }
                return Ok(ev.event);
            }
            if self.ended {
                self.last_augs = None;
                return Ok(Event::EndDocument);
            }
            match self.scanner.next_event()? {
                ScanOutcome::Event(ev) => {
                    self.holdback.push_back(ev);
                    if self.scanner.is_settled() {
                        self.warnings.extend(self.scanner.take_warnings());
                        while let Some(held) = self.holdback.pop_front() {
                            self.process(held);
                        }
                        self.deliver_warnings();
                    }
                }
                ScanOutcome::Restarted => {
                    // everything held back came from the abandoned decode
                    self.holdback.clear();
                }
                ScanOutcome::Finished => {
                    self.ended = true;
                }
            }
        }
    }

    /// Advances the parse, dispatching events into `sink`.
    ///
    /// With `complete == true`, scans to the end of input (or a fatal read
    /// error). Otherwise delivers at least one event and returns. The result
    /// is `true` while more input remains.
    pub fn scan_document(&mut self, complete: bool, sink: &mut dyn EventSink) -> Result<bool> {
        loop {
            let event = self.read_event()?;
            let done = event == Event::EndDocument;
            dispatch(sink, &event, self.last_augs.as_ref());
            if done {
                return Ok(false);
            }
            if !complete {
                return Ok(true);
            }
        }
    }

    fn process(&mut self, ev: ScannedEvent) {
        if let Some(balancer) = &mut self.balancer {
            balancer.push_event(ev);
            while let Some(mut out) = balancer.pop_event() {
                if let Some(binder) = &mut self.binder {
                    binder.bind(&mut out);
                }
                self.out.push_back(out);
            }
        } else {
            let mut ev = ev;
            if let Some(binder) = &mut self.binder {
                binder.bind(&mut ev);
            }
            self.out.push_back(ev);
        }
    }

    fn deliver_warnings(&mut self) {
        if let Some(observer) = &mut self.warning_observer {
            for warning in self.warnings.drain(..) {
                observer(&warning);
            }
        }
    }
}

/// Maps an event onto the sink capability set.
fn dispatch(sink: &mut dyn EventSink, event: &Event, augs: Option<&Augmentation>) {
    match event {
        Event::StartDocument { encoding } => sink.start_document(encoding, augs),
        Event::XmlDecl {
            version,
            encoding,
            standalone,
        } => sink.xml_decl(
            version.as_deref(),
            encoding.as_deref(),
            standalone.as_deref(),
            augs,
        ),
        Event::Doctype(doctype) => sink.doctype_decl(doctype, augs),
        Event::Start { name, attrs } => sink.start_element(name, attrs, augs),
        Event::Empty { name, attrs } => sink.empty_element(name, attrs, augs),
        Event::End { name } => sink.end_element(name, augs),
        Event::Text(text) => sink.characters(text, augs),
        Event::IgnorableWhitespace(text) => sink.ignorable_whitespace(text, augs),
        Event::Comment(text) => sink.comment(text, augs),
        Event::PI { target, data } => sink.processing_instruction(target, data, augs),
        Event::CDataStart => sink.start_cdata(augs),
        Event::CDataEnd => sink.end_cdata(augs),
        Event::GeneralEntityStart(name) => sink.start_general_entity(name, augs),
        Event::GeneralEntityEnd(name) => sink.end_general_entity(name, augs),
        Event::EndDocument => sink.end_document(augs),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn unknown_feature_is_a_config_error() {
        let mut config = Config::default();
        assert_eq!(
            config.set_feature("no-such-feature", true),
            Err(ConfigError::UnknownFeature("no-such-feature".to_string()))
        );
    }

    #[test]
    fn feature_ids_map_to_fields() {
        let mut config = Config::default();
        config.set_feature("augmentations", true).unwrap();
        config.set_feature("balance-tags", false).unwrap();
        config.set_feature("scanner/cdata-sections", true).unwrap();
        assert!(config.augmentations);
        assert!(!config.balance_tags);
        assert!(config.cdata_sections);
    }

    #[test]
    fn property_values_are_validated() {
        let mut config = Config::default();
        config.set_property("names/elems", "upper").unwrap();
        assert_eq!(config.names_elems, NameCase::Upper);
        assert!(config.set_property("names/elems", "sideways").is_err());
        assert!(config.set_property("default-encoding", "not-a-charset").is_err());
        config.set_property("default-encoding", "ISO-8859-2").unwrap();
        config
            .set_property("fragment-context-stack", "html body table")
            .unwrap();
        assert_eq!(config.fragment_context, ["html", "body", "table"]);
    }

    #[test]
    fn unknown_property_is_a_config_error() {
        let mut config = Config::default();
        assert_eq!(
            config.set_property("no/such", "x"),
            Err(ConfigError::UnknownProperty("no/such".to_string()))
        );
    }
}
