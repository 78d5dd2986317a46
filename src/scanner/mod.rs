//! The tokenizer.
//!
//! A single-threaded cooperative state machine over a stack of character
//! sources. The bottom source decodes the byte stream; pushed sources
//! (`document.write`-style re-entrant input) are served first and popped
//! when exhausted. The scanner never aborts on malformed markup: every
//! construct gets a best-effort interpretation, optionally with a warning.

pub(crate) mod buffer;

use std::collections::VecDeque;
use std::io::Read;

use encoding_rs::Encoding;

use crate::encoding::{encoding_for_label, meta_decision, Decoder, MetaDecision};
use crate::elements;
use crate::entities::{numeric_replacement, EntityResolver, FeedResult, Resolution};
use crate::errors::{Result, Warning};
use crate::events::attributes::{Attribute, Attributes};
use crate::events::{Augmentation, Doctype, Event, Position, QName};
use crate::playback::PlaybackStream;
use crate::reader::{Config, NameCase};

use self::buffer::InputCursor;

/// Byte chunk size per refill.
const CHUNK: usize = 2048;

/// An event together with its source span.
#[derive(Debug, Clone)]
pub(crate) struct ScannedEvent {
    pub(crate) event: Event,
    pub(crate) augs: Option<Augmentation>,
}

/// Outcome of one scanner step.
#[derive(Debug)]
pub(crate) enum ScanOutcome {
    /// The next event of the stream.
    Event(ScannedEvent),
    /// A `<meta>`-triggered replay was performed; every event produced so
    /// far is void and scanning restarts from the first byte.
    Restarted,
    /// `EndDocument` was already delivered; the stream is exhausted.
    Finished,
}

/// Which construct a character reference appears in; controls leniency and
/// notification.
#[derive(Clone, Copy, PartialEq, Eq)]
enum RefContext {
    /// Ordinary character data: full reporting, `notify_char_refs` applies.
    Content,
    /// Attribute values: lenient, never notified.
    Attribute,
    /// RCDATA (`<title>`, `<textarea>`): resolved but never notified.
    RcData,
}

#[derive(Debug, Clone, PartialEq)]
enum State {
    Content,
    /// Inside a raw-text or RCDATA element; consume until `</name`.
    SpecialText { name: String, rcdata: bool },
    /// Inside `<plaintext>`: everything to EOF is character data.
    Plaintext,
    /// `EndDocument` emitted.
    Done,
}

/// The decoding byte source at the bottom of the cursor stack.
struct ByteSource<R: Read> {
    stream: PlaybackStream<R>,
    decoder: Decoder,
    eof: bool,
}

impl<R: Read> ByteSource<R> {
    /// Reads one chunk into the cursor. Returns `false` at end of input.
    fn fill(&mut self, cursor: &mut InputCursor) -> Result<bool> {
        if self.eof {
            return Ok(false);
        }
        let mut chunk = [0u8; CHUNK];
        let n = self.stream.read(&mut chunk)?;
        let mut text = String::new();
        if n == 0 {
            self.eof = true;
            self.decoder.decode_to_string(&[], &mut text, true);
            cursor.append_normalized(&text);
            cursor.finish_input();
        } else {
            self.decoder.decode_to_string(&chunk[..n], &mut text, false);
            cursor.append_normalized(&text);
        }
        Ok(true)
    }
}

/// The tokenizer state machine.
pub(crate) struct Scanner<R: Read> {
    source: ByteSource<R>,
    /// Character-source stack; the last entry is active, index 0 is the
    /// primary (decoder-fed) source.
    cursors: Vec<InputCursor>,
    config: Config,
    state: State,
    queue: VecDeque<ScannedEvent>,
    warnings: Vec<Warning>,
    /// The input was supplied as characters; encoding declarations inside
    /// the document are informational only.
    transcoded: bool,
    init_done: bool,
    started: bool,
    /// The encoding can no longer change; recorded bytes were released.
    settled: bool,
    /// One replay already happened; a second incompatible `<meta>` is
    /// ignored.
    replayed: bool,
}

impl<R: Read> Scanner<R> {
    /// `declared` is the caller-supplied encoding (takes precedence over
    /// the configured default, loses to a BOM).
    pub(crate) fn new(
        input: R,
        config: Config,
        declared: Option<&'static Encoding>,
        transcoded: bool,
    ) -> Scanner<R> {
        let default = encoding_for_label(&config.default_encoding)
            .unwrap_or_else(crate::encoding::default_encoding);
        Scanner {
            source: ByteSource {
                stream: PlaybackStream::new(input),
                decoder: Decoder::new(declared.unwrap_or(default)),
                eof: false,
            },
            cursors: vec![InputCursor::primary()],
            config,
            state: State::Content,
            queue: VecDeque::new(),
            warnings: Vec::new(),
            transcoded,
            init_done: false,
            started: false,
            settled: false,
            replayed: false,
        }
    }

    /// The encoding currently in effect.
    pub(crate) fn encoding_name(&self) -> &'static str {
        self.source.decoder.encoding().name()
    }

    /// `true` once the encoding can no longer change; until then the reader
    /// holds events back so a replay never re-delivers anything.
    pub(crate) fn is_settled(&self) -> bool {
        self.settled
    }

    /// Depth of the character-source stack (1 = primary only).
    pub(crate) fn source_depth(&self) -> usize {
        self.cursors.len()
    }

    /// Suspends the current source and scans the given text next.
    ///
    /// Legal only between tokens; the suspended source resumes, with its
    /// position intact, when the pushed text is exhausted.
    pub(crate) fn push_input_source(&mut self, text: &str) {
        self.cursors.push(InputCursor::pushed(text));
    }

    /// Drains warnings collected since the last call.
    pub(crate) fn take_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }

    /// Advances the state machine until the next emission boundary.
    pub(crate) fn next_event(&mut self) -> Result<ScanOutcome> {
        loop {
            if let Some(ev) = self.queue.pop_front() {
                return Ok(ScanOutcome::Event(ev));
            }
            if self.state == State::Done {
                return Ok(ScanOutcome::Finished);
            }
            if !self.init_done {
                self.init()?;
                continue;
            }
            if !self.started {
                self.started = true;
                let pos = self.position();
                self.emit_at(
                    Event::StartDocument {
                        encoding: self.encoding_name(),
                    },
                    pos,
                );
                continue;
            }
            match self.state.clone() {
                State::Content => {
                    if self.scan_content()? {
                        return Ok(ScanOutcome::Restarted);
                    }
                }
                State::SpecialText { name, rcdata } => self.scan_special_text(&name, rcdata)?,
                State::Plaintext => self.scan_plaintext()?,
                State::Done => unreachable!(),
            }
        }
    }

    /// BOM sniffing, performed lazily so construction never does I/O.
    fn init(&mut self) -> Result<()> {
        self.init_done = true;
        if self.transcoded {
            // character input: nothing to sniff, nothing to replay
            self.source.stream.clear();
            self.settle();
            return Ok(());
        }
        if let Some(encoding) = self.source.stream.detect_encoding()? {
            self.source.decoder = Decoder::new(encoding);
            // a BOM outranks any in-document declaration
            self.source.stream.clear();
            self.settle();
        }
        Ok(())
    }

    fn settle(&mut self) {
        if !self.settled {
            self.settled = true;
            self.source.stream.clear();
        }
    }

    // === character access =================================================

    fn position(&self) -> Position {
        self.cursors.last().expect("cursor stack is never empty").position()
    }

    fn read_char(&mut self) -> Result<Option<char>> {
        loop {
            let top = self.cursors.last_mut().expect("cursor stack is never empty");
            if let Some(c) = top.next() {
                return Ok(Some(c));
            }
            if top.pushed {
                self.cursors.pop();
                continue;
            }
            top.buf.compact();
            if !self.source.fill(top)? {
                return Ok(None);
            }
        }
    }

    fn peek_char(&mut self) -> Result<Option<char>> {
        loop {
            let top = self.cursors.last_mut().expect("cursor stack is never empty");
            if let Some(c) = top.buf.peek() {
                return Ok(Some(c));
            }
            if top.pushed {
                self.cursors.pop();
                continue;
            }
            top.buf.compact();
            if !self.source.fill(top)? {
                return Ok(None);
            }
        }
    }

    fn rewind(&mut self, n: usize) {
        if n > 0 {
            self.cursors
                .last_mut()
                .expect("cursor stack is never empty")
                .rewind(n);
        }
    }

    /// Case-insensitive keyword probe. `keyword` must be uppercase and
    /// newline-free. On mismatch the consumed characters are pushed back;
    /// the mismatching character itself is never consumed.
    fn skip_if(&mut self, keyword: &str) -> Result<bool> {
        debug_assert!(keyword.chars().all(|c| !c.is_ascii_lowercase() && c != '\n'));
        let mut taken = 0;
        for expected in keyword.chars() {
            match self.peek_char()? {
                Some(c) if c.to_ascii_uppercase() == expected => {
                    self.read_char()?;
                    taken += 1;
                }
                _ => {
                    self.rewind(taken);
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    fn skip_whitespace(&mut self) -> Result<()> {
        while let Some(c) = self.peek_char()? {
            if c.is_ascii_whitespace() {
                self.read_char()?;
            } else {
                break;
            }
        }
        Ok(())
    }

    // === emission helpers =================================================

    fn augs(&self, begin: Position) -> Option<Augmentation> {
        if self.config.augmentations {
            Some(Augmentation::span(begin, self.position()))
        } else {
            None
        }
    }

    fn emit_at(&mut self, event: Event, begin: Position) {
        let augs = self.augs(begin);
        self.queue.push_back(ScannedEvent { event, augs });
    }

    fn warn(&mut self, code: &'static str, message: String) {
        if self.config.report_errors {
            self.warnings.push(Warning {
                code,
                message,
                position: self.position(),
            });
        }
    }

    fn fold_elem(&self, raw: &str) -> String {
        match self.config.names_elems {
            NameCase::Upper => raw.to_ascii_uppercase(),
            NameCase::Lower | NameCase::Default => raw.to_ascii_lowercase(),
            NameCase::Match => raw.to_string(),
        }
    }

    fn fold_attr(&self, raw: &str) -> String {
        match self.config.names_attrs {
            NameCase::Upper => raw.to_ascii_uppercase(),
            NameCase::Lower | NameCase::Default => raw.to_ascii_lowercase(),
            NameCase::Match => raw.to_string(),
        }
    }

    // === content scanning =================================================

    /// Scans character data until the next markup construct and dispatches
    /// it. Returns `true` if an encoding replay was performed.
    fn scan_content(&mut self) -> Result<bool> {
        let mut begin = self.position();
        let mut text = String::new();
        loop {
            let before = self.position();
            match self.read_char()? {
                None => {
                    self.flush_text(&mut text, begin, before);
                    self.settle();
                    self.emit_at(Event::EndDocument, before);
                    self.state = State::Done;
                    return Ok(false);
                }
                Some('<') => match self.peek_char()? {
                    Some(c) if c == '!' || c == '?' || c == '/' || c.is_ascii_alphabetic() => {
                        self.flush_text(&mut text, begin, before);
                        return self.scan_markup(before);
                    }
                    _ => text.push('<'),
                },
                Some('&') => {
                    // a reference boundary flushes the pending run
                    self.flush_text(&mut text, begin, before);
                    begin = before;
                    self.scan_char_ref(&mut text, None, RefContext::Content, &mut begin)?;
                }
                Some(c) => text.push(c),
            }
        }
    }

    fn flush_text(&mut self, text: &mut String, begin: Position, end: Position) {
        if text.is_empty() {
            return;
        }
        // raw-text content (a prologue <title> or <style>) never settles the
        // encoding; only real character data does
        if self.state == State::Content && !text.chars().all(|c| c.is_ascii_whitespace()) {
            self.settle();
        }
        let augs = if self.config.augmentations {
            Some(Augmentation::span(begin, end))
        } else {
            None
        };
        self.queue.push_back(ScannedEvent {
            event: Event::Text(std::mem::take(text)),
            augs,
        });
    }

    /// Resolves a character reference after its `&` was consumed, appending
    /// the outcome to `text`. With `notify_char_refs` the reference is
    /// emitted as its own event triple instead. `raw` receives the source
    /// characters the reference consumed (attribute values keep their
    /// unresolved form there).
    fn scan_char_ref(
        &mut self,
        text: &mut String,
        mut raw: Option<&mut String>,
        context: RefContext,
        run_begin: &mut Position,
    ) -> Result<()> {
        let amp = self.position();
        match self.peek_char()? {
            Some('#') => {
                self.read_char()?;
                self.scan_numeric_ref(text, raw, context)?;
                Ok(())
            }
            Some(c) if c.is_ascii_alphanumeric() => {
                let mut resolver = EntityResolver::new();
                let mut fed = String::new();
                loop {
                    match self.peek_char()? {
                        Some(c) => match resolver.feed(c) {
                            FeedResult::Continue => {
                                self.read_char()?;
                                fed.push(c);
                            }
                            FeedResult::Done => {
                                self.read_char()?;
                                fed.push(c);
                                break;
                            }
                            // the character is not part of any name and
                            // stays unconsumed
                            FeedResult::Dead => break,
                        },
                        None => break,
                    }
                }
                match resolver.resolve() {
                    // attribute values are lenient: a name without its ';'
                    // stays literal (`href="?a=1&copy=2"` keeps `&copy`)
                    Resolution::Matched(m)
                        if context == RefContext::Attribute && !m.ends_with_semicolon =>
                    {
                        self.rewind(m.matched_len + m.rewind);
                        text.push('&');
                    }
                    Resolution::Matched(m) => {
                        self.rewind(m.rewind);
                        if let Some(raw) = raw.as_deref_mut() {
                            raw.push_str(&fed[..m.matched_len]);
                        }
                        let name = fed[..m.matched_len].trim_end_matches(';').to_string();
                        if !m.ends_with_semicolon && context == RefContext::Content {
                            self.warn(
                                "unterminated-reference",
                                format!("character reference '&{}' has no ';'", name),
                            );
                        }
                        if self.config.notify_char_refs && context == RefContext::Content {
                            self.emit_at(Event::GeneralEntityStart(name.clone()), amp);
                            self.emit_at(Event::Text(m.replacement.to_string()), amp);
                            self.emit_at(Event::GeneralEntityEnd(name), amp);
                            *run_begin = self.position();
                        } else {
                            text.push_str(m.replacement);
                        }
                    }
                    Resolution::NoMatch { seen } => {
                        self.rewind(seen);
                        if context == RefContext::Content {
                            self.warn(
                                "unknown-reference",
                                "'&' does not start a known character reference".to_string(),
                            );
                        }
                        text.push('&');
                    }
                }
                Ok(())
            }
            _ => {
                // bare ampersand
                text.push('&');
                Ok(())
            }
        }
    }

    fn scan_numeric_ref(
        &mut self,
        text: &mut String,
        raw: Option<&mut String>,
        context: RefContext,
    ) -> Result<()> {
        let hex = match self.peek_char()? {
            Some('x') | Some('X') => {
                self.read_char()?;
                true
            }
            _ => false,
        };
        let mut digits = String::new();
        while let Some(c) = self.peek_char()? {
            let is_digit = if hex {
                c.is_ascii_hexdigit()
            } else {
                c.is_ascii_digit()
            };
            if is_digit {
                digits.push(c);
                self.read_char()?;
            } else {
                break;
            }
        }
        if digits.is_empty() {
            // `&#` with no digits: rewind the marker and emit literally
            self.rewind(if hex { 2 } else { 1 });
            text.push('&');
            return Ok(());
        }
        let mut terminated = false;
        match self.peek_char()? {
            Some(';') => {
                self.read_char()?;
                terminated = true;
            }
            _ => {
                if context == RefContext::Content {
                    self.warn(
                        "unterminated-reference",
                        "numeric character reference has no ';'".to_string(),
                    );
                }
            }
        }
        if let Some(raw) = raw {
            raw.push('#');
            if hex {
                raw.push('x');
            }
            raw.push_str(&digits);
            if terminated {
                raw.push(';');
            }
        }
        let radix = if hex { 16 } else { 10 };
        let code = u32::from_str_radix(&digits, radix).unwrap_or(u32::MAX);
        let (ch, valid) = numeric_replacement(code);
        if !valid && context == RefContext::Content {
            self.warn(
                "invalid-code-point",
                format!("numeric character reference #{} is not a valid code point", digits),
            );
        }
        text.push(ch);
        Ok(())
    }

    // === markup scanning ==================================================

    /// Dispatches on the character after a flushed `<`. Returns `true` if an
    /// encoding replay was performed.
    fn scan_markup(&mut self, begin: Position) -> Result<bool> {
        match self.peek_char()? {
            Some('!') => {
                self.read_char()?;
                self.scan_decl(begin)?;
                Ok(false)
            }
            Some('?') => {
                self.read_char()?;
                self.scan_pi(begin)
            }
            Some('/') => {
                self.read_char()?;
                self.scan_end_tag(begin)?;
                Ok(false)
            }
            _ => self.scan_start_tag(begin),
        }
    }

    fn read_name(&mut self) -> Result<String> {
        let mut name = String::new();
        while let Some(c) = self.peek_char()? {
            if c.is_ascii_whitespace() || c == '>' || c == '/' || c == '<' || c == '=' || c == '?' {
                break;
            }
            name.push(c);
            self.read_char()?;
        }
        Ok(name)
    }

    /// Scans a start tag. Returns `true` if a `<meta>`-declared encoding
    /// triggered a replay.
    fn scan_start_tag(&mut self, begin: Position) -> Result<bool> {
        let raw_name = self.read_name()?;
        let (attrs, self_closing, closed) = self.scan_attributes()?;
        if !closed {
            self.warn(
                "unclosed-tag",
                format!("end of input inside tag '{}'", raw_name),
            );
        }

        // a prologue <meta> may change the document encoding
        if raw_name.eq_ignore_ascii_case("meta") && !self.transcoded {
            if let Some(label) = declared_charset(&attrs) {
                if let Some(declared) = encoding_for_label(&label) {
                    if self.settled {
                        // the encoding is final; a conflicting declaration
                        // (a second <meta>, or one past the prologue) is
                        // informational only
                        if declared != self.source.decoder.encoding() {
                            self.warn(
                                "encoding-ignored",
                                format!(
                                    "declared encoding '{}' comes too late; the document stays {}",
                                    declared.name(),
                                    self.encoding_name()
                                ),
                            );
                        }
                    } else {
                        match meta_decision(self.source.decoder.encoding(), declared) {
                            MetaDecision::Keep => {}
                            MetaDecision::Replay => {
                                self.restart(declared)?;
                                return Ok(true);
                            }
                            MetaDecision::Ignore => {
                                self.warn(
                                    "encoding-ignored",
                                    format!(
                                        "declared encoding '{}' cannot apply to a document decoded as {}",
                                        declared.name(),
                                        self.encoding_name()
                                    ),
                                );
                            }
                        }
                    }
                }
            }
        }

        let local = self.fold_elem(&raw_name);
        let descriptor = elements::lookup(&local);
        let name = QName::folded(raw_name, local);

        if !self_closing {
            if let Some(e) = descriptor {
                if e.is_raw_text() || e.is_rcdata() {
                    self.state = State::SpecialText {
                        name: e.name.to_string(),
                        rcdata: e.is_rcdata(),
                    };
                } else if e.code == elements::code::PLAINTEXT {
                    self.state = State::Plaintext;
                }
            }
        }

        let prologue = descriptor.map_or(false, |e| {
            matches!(
                e.code,
                elements::code::HTML
                    | elements::code::HEAD
                    | elements::code::META
                    | elements::code::TITLE
                    | elements::code::BASE
                    | elements::code::BASEFONT
                    | elements::code::BGSOUND
                    | elements::code::LINK
                    | elements::code::STYLE
                    | elements::code::SCRIPT
                    | elements::code::NOSCRIPT
                    | elements::code::ISINDEX
            )
        });
        if !prologue {
            self.settle();
        }

        let event = if self_closing {
            Event::Empty { name, attrs }
        } else {
            Event::Start { name, attrs }
        };
        self.emit_at(event, begin);
        Ok(false)
    }

    /// Scans the attribute list of an open tag.
    ///
    /// Returns the attributes, whether the tag was self-closing, and whether
    /// a closing `>` was found before end of input.
    fn scan_attributes(&mut self) -> Result<(Attributes, bool, bool)> {
        let mut attrs = Attributes::new();
        loop {
            self.skip_whitespace()?;
            let attr_begin = self.position();
            match self.peek_char()? {
                None => return Ok((attrs, false, false)),
                Some('>') => {
                    self.read_char()?;
                    return Ok((attrs, false, true));
                }
                Some('/') => {
                    self.read_char()?;
                    match self.peek_char()? {
                        Some('>') => {
                            self.read_char()?;
                            return Ok((attrs, true, true));
                        }
                        _ => {
                            self.warn(
                                "stray-solidus",
                                "'/' in tag is not part of '/>'".to_string(),
                            );
                            continue;
                        }
                    }
                }
                Some('=') => {
                    // an equals sign with no attribute name
                    self.read_char()?;
                    self.warn("bad-attribute", "attribute name is missing".to_string());
                    continue;
                }
                Some('<') => {
                    // treat a stray '<' as the end of the malformed tag
                    self.warn(
                        "unclosed-tag",
                        "'<' inside tag ends the previous tag".to_string(),
                    );
                    return Ok((attrs, false, true));
                }
                _ => {}
            }

            let raw_name = self.read_name()?;
            if raw_name.is_empty() {
                // a character that can start neither a name nor a value
                self.read_char()?;
                self.warn("bad-attribute", "junk character in tag".to_string());
                continue;
            }
            self.skip_whitespace()?;

            let (value, raw_value) = if self.peek_char()? == Some('=') {
                self.read_char()?;
                self.skip_whitespace()?;
                self.scan_attr_value()?
            } else {
                // a value-less attribute gets its own name as value
                (raw_name.clone(), raw_name.clone())
            };

            let folded = self.fold_attr(&raw_name);
            let attr = Attribute {
                name: QName::folded(raw_name.clone(), folded),
                value,
                raw_value,
                specified: true,
                augs: if self.config.augmentations {
                    Some(Augmentation::span(attr_begin, self.position()))
                } else {
                    None
                },
            };
            if !attrs.push(attr) {
                self.warn(
                    "duplicate-attribute",
                    format!("duplicate attribute '{}' discarded", raw_name),
                );
            }
        }
    }

    fn scan_attr_value(&mut self) -> Result<(String, String)> {
        let mut value = String::new();
        let mut raw = String::new();
        match self.peek_char()? {
            Some(q) if q == '"' || q == '\'' => {
                self.read_char()?;
                loop {
                    match self.read_char()? {
                        None => {
                            self.warn(
                                "unclosed-attribute",
                                "end of input inside quoted attribute value".to_string(),
                            );
                            break;
                        }
                        Some(c) if c == q => break,
                        Some('&') => {
                            raw.push('&');
                            let mut ignored = Position::START;
                            self.scan_char_ref(
                                &mut value,
                                Some(&mut raw),
                                RefContext::Attribute,
                                &mut ignored,
                            )?;
                        }
                        Some(c) => {
                            raw.push(c);
                            value.push(c);
                        }
                    }
                }
            }
            _ => {
                // unquoted value: up to whitespace or '>'
                while let Some(c) = self.peek_char()? {
                    if c.is_ascii_whitespace() || c == '>' {
                        break;
                    }
                    self.read_char()?;
                    if c == '&' {
                        raw.push('&');
                        let mut ignored = Position::START;
                        self.scan_char_ref(
                            &mut value,
                            Some(&mut raw),
                            RefContext::Attribute,
                            &mut ignored,
                        )?;
                    } else {
                        raw.push(c);
                        value.push(c);
                    }
                }
            }
        }
        Ok((value, raw))
    }

    fn scan_end_tag(&mut self, begin: Position) -> Result<()> {
        match self.peek_char()? {
            Some('>') => {
                self.read_char()?;
                self.warn("empty-end-tag", "'</>' has no element name".to_string());
                return Ok(());
            }
            Some(c) if c.is_ascii_alphabetic() => {}
            Some(_) => {
                // bogus construct: everything to '>' becomes a comment
                let content = self.consume_until_gt()?;
                self.warn(
                    "bogus-end-tag",
                    "'</' is not followed by an element name".to_string(),
                );
                self.emit_at(Event::Comment(content), begin);
                return Ok(());
            }
            None => {
                self.warn("eof-in-markup", "end of input after '</'".to_string());
                self.emit_at(Event::Text("</".to_string()), begin);
                return Ok(());
            }
        }
        let raw_name = self.read_name()?;
        // anything between the name and '>' is ignored on end tags
        let mut saw_junk = false;
        loop {
            match self.read_char()? {
                None => {
                    self.warn(
                        "unclosed-tag",
                        format!("end of input inside tag '/{}'", raw_name),
                    );
                    break;
                }
                Some('>') => break,
                Some(c) => {
                    if !c.is_ascii_whitespace() {
                        saw_junk = true;
                    }
                }
            }
        }
        if saw_junk {
            self.warn(
                "end-tag-attributes",
                format!("content after '</{}' ignored", raw_name),
            );
        }
        let local = self.fold_elem(&raw_name);
        self.emit_at(
            Event::End {
                name: QName::folded(raw_name, local),
            },
            begin,
        );
        Ok(())
    }

    fn consume_until_gt(&mut self) -> Result<String> {
        let mut content = String::new();
        loop {
            match self.read_char()? {
                None | Some('>') => return Ok(content),
                Some(c) => content.push(c),
            }
        }
    }

    // === declarations =====================================================

    fn scan_decl(&mut self, begin: Position) -> Result<()> {
        if self.skip_if("--")? {
            return self.scan_comment(begin);
        }
        if self.skip_if("[CDATA[")? {
            return self.scan_cdata(begin);
        }
        if self.skip_if("DOCTYPE")? {
            return self.scan_doctype(begin);
        }
        // <!whatever> is recovered as a comment
        let content = self.consume_until_gt()?;
        self.warn(
            "bogus-comment",
            "'<!' does not start a comment, CDATA section or doctype".to_string(),
        );
        self.emit_at(Event::Comment(content), begin);
        Ok(())
    }

    fn scan_comment(&mut self, begin: Position) -> Result<()> {
        let mut content = String::new();
        loop {
            match self.read_char()? {
                None => {
                    self.warn(
                        "unclosed-comment",
                        "end of input inside comment".to_string(),
                    );
                    break;
                }
                Some('>') if content.ends_with("--") => {
                    content.truncate(content.len() - 2);
                    break;
                }
                // `<!-->` and `<!--->` close immediately
                Some('>') if content.is_empty() || content == "-" => {
                    content.clear();
                    break;
                }
                Some(c) => content.push(c),
            }
        }
        self.emit_at(Event::Comment(content), begin);
        Ok(())
    }

    fn scan_cdata(&mut self, begin: Position) -> Result<()> {
        let mut content = String::new();
        loop {
            match self.read_char()? {
                None => {
                    self.warn(
                        "unclosed-cdata",
                        "end of input inside CDATA section".to_string(),
                    );
                    break;
                }
                Some('>') if content.ends_with("]]") => {
                    content.truncate(content.len() - 2);
                    break;
                }
                Some(c) => content.push(c),
            }
        }
        if self.config.cdata_sections {
            self.emit_at(Event::CDataStart, begin);
            self.emit_at(Event::Text(content), begin);
            self.emit_at(Event::CDataEnd, begin);
        } else {
            self.emit_at(Event::Text(content), begin);
        }
        Ok(())
    }

    fn scan_doctype(&mut self, begin: Position) -> Result<()> {
        self.skip_whitespace()?;
        let name = self.read_name()?;
        let mut doctype = Doctype {
            name,
            public_id: None,
            system_id: None,
        };
        self.skip_whitespace()?;
        if self.skip_if("PUBLIC")? {
            self.skip_whitespace()?;
            doctype.public_id = self.scan_quoted_id()?;
            self.skip_whitespace()?;
            doctype.system_id = self.scan_quoted_id()?;
        } else if self.skip_if("SYSTEM")? {
            self.skip_whitespace()?;
            doctype.system_id = self.scan_quoted_id()?;
        }
        // permissive: drop anything else up to '>'
        loop {
            match self.read_char()? {
                None => {
                    self.warn(
                        "unclosed-doctype",
                        "end of input inside doctype".to_string(),
                    );
                    break;
                }
                Some('>') => break,
                Some(_) => {}
            }
        }
        self.emit_at(Event::Doctype(doctype), begin);
        Ok(())
    }

    fn scan_quoted_id(&mut self) -> Result<Option<String>> {
        match self.peek_char()? {
            Some(q) if q == '"' || q == '\'' => {
                self.read_char()?;
                let mut id = String::new();
                loop {
                    match self.read_char()? {
                        None => {
                            self.warn(
                                "unclosed-doctype",
                                "end of input inside doctype identifier".to_string(),
                            );
                            break;
                        }
                        Some(c) if c == q => break,
                        Some(c) => id.push(c),
                    }
                }
                Ok(Some(id))
            }
            _ => Ok(None),
        }
    }

    // === processing instructions ==========================================

    /// Scans `<?target data?>`. An `<?xml …?>` declaration is parsed into
    /// its pseudo-attributes and may refine the encoding like `<meta>` does.
    /// Returns `true` if a replay was performed.
    fn scan_pi(&mut self, begin: Position) -> Result<bool> {
        let target = self.read_name()?;
        if target.is_empty() {
            self.warn("bad-pi-target", "processing instruction has no target".to_string());
        }
        self.skip_whitespace()?;
        let mut data = String::new();
        loop {
            match self.read_char()? {
                None => {
                    self.warn(
                        "unclosed-pi",
                        "end of input inside processing instruction".to_string(),
                    );
                    break;
                }
                // `>` ends the instruction whether or not the XML-style `?`
                // precedes it; HTML never nests `>` inside one
                Some('>') => {
                    if data.ends_with('?') {
                        data.pop();
                    }
                    break;
                }
                Some(c) => data.push(c),
            }
        }
        if target.eq_ignore_ascii_case("xml") {
            let version = pseudo_attr(&data, "version");
            let encoding = pseudo_attr(&data, "encoding");
            let standalone = pseudo_attr(&data, "standalone");
            if let Some(label) = &encoding {
                if !self.settled && !self.transcoded && !self.replayed {
                    if let Some(declared) = encoding_for_label(label) {
                        if meta_decision(self.source.decoder.encoding(), declared)
                            == MetaDecision::Replay
                        {
                            self.restart(declared)?;
                            return Ok(true);
                        }
                    }
                }
            }
            self.emit_at(
                Event::XmlDecl {
                    version,
                    encoding,
                    standalone,
                },
                begin,
            );
        } else {
            self.emit_at(Event::PI { target, data }, begin);
        }
        Ok(false)
    }

    // === special content ==================================================

    /// Raw text and RCDATA: consume up to the matching case-insensitive end
    /// tag; no tag recognition inside, references only in RCDATA.
    fn scan_special_text(&mut self, name: &str, rcdata: bool) -> Result<()> {
        let mut begin = self.position();
        let mut text = String::new();
        let upper = name.to_ascii_uppercase();
        loop {
            let before = self.position();
            match self.read_char()? {
                None => {
                    self.warn(
                        "unclosed-element",
                        format!("end of input inside '{}'", name),
                    );
                    self.flush_text(&mut text, begin, before);
                    self.state = State::Content;
                    return Ok(());
                }
                Some('<') => {
                    if self.peek_char()? == Some('/') {
                        self.read_char()?;
                        if self.skip_if(&upper)? {
                            match self.peek_char()? {
                                Some(c) if c.is_ascii_whitespace() || c == '>' || c == '/' => {
                                    // the matching end tag
                                    loop {
                                        match self.read_char()? {
                                            None | Some('>') => break,
                                            Some(_) => {}
                                        }
                                    }
                                    self.flush_text(&mut text, begin, before);
                                    let end_begin = before;
                                    self.emit_at(
                                        Event::End {
                                            name: QName::folded(
                                                name.to_string(),
                                                self.fold_elem(name),
                                            ),
                                        },
                                        end_begin,
                                    );
                                    self.state = State::Content;
                                    return Ok(());
                                }
                                None => {
                                    // `</name` at EOF still closes
                                    self.flush_text(&mut text, begin, before);
                                    self.emit_at(
                                        Event::End {
                                            name: QName::folded(
                                                name.to_string(),
                                                self.fold_elem(name),
                                            ),
                                        },
                                        before,
                                    );
                                    self.state = State::Content;
                                    return Ok(());
                                }
                                Some(_) => {
                                    // a longer name; not our end tag
                                    self.rewind(upper.chars().count());
                                    text.push_str("</");
                                }
                            }
                        } else {
                            text.push_str("</");
                        }
                    } else {
                        text.push('<');
                    }
                }
                Some('&') if rcdata => {
                    let mut ignored = Position::START;
                    self.scan_char_ref(&mut text, None, RefContext::RcData, &mut ignored)?;
                }
                Some(c) => text.push(c),
            }
        }
    }

    fn scan_plaintext(&mut self) -> Result<()> {
        let begin = self.position();
        let mut text = String::new();
        loop {
            let before = self.position();
            match self.read_char()? {
                None => {
                    self.flush_text(&mut text, begin, before);
                    self.settle();
                    self.emit_at(Event::EndDocument, before);
                    self.state = State::Done;
                    return Ok(());
                }
                Some(c) => text.push(c),
            }
        }
    }

    // === encoding replay ==================================================

    /// Replays the recorded bytes under a newly declared encoding and
    /// restarts scanning from the beginning of the document.
    fn restart(&mut self, encoding: &'static Encoding) -> Result<()> {
        self.source.stream.playback()?;
        self.source.decoder = Decoder::new(encoding);
        self.source.eof = false;
        self.cursors = vec![InputCursor::primary()];
        self.queue.clear();
        self.warnings.clear();
        self.started = false;
        self.state = State::Content;
        self.replayed = true;
        // only one change per parse, so the encoding is now final
        self.settled = true;
        Ok(())
    }
}

/// Extracts a declared charset label from a `<meta>` tag's attributes:
/// either a `charset` attribute or a `content` attribute containing
/// `charset=…`.
fn declared_charset(attrs: &Attributes) -> Option<String> {
    for attr in attrs {
        if attr.name.raw.eq_ignore_ascii_case("charset") {
            return Some(attr.value.clone());
        }
    }
    for attr in attrs {
        if attr.name.raw.eq_ignore_ascii_case("content") {
            let content = &attr.value;
            let lower = content.to_ascii_lowercase();
            if let Some(i) = lower.find("charset") {
                let rest = &content[i + "charset".len()..];
                let rest = rest.trim_start();
                if let Some(rest) = rest.strip_prefix('=') {
                    let label: String = rest
                        .trim_start()
                        .chars()
                        .take_while(|&c| c != ';' && !c.is_ascii_whitespace())
                        .collect();
                    if !label.is_empty() {
                        return Some(label);
                    }
                }
            }
        }
    }
    None
}

/// Finds a `name="value"` or `name='value'` pseudo-attribute in an XML
/// declaration body.
fn pseudo_attr(data: &str, name: &str) -> Option<String> {
    let lower = data.to_ascii_lowercase();
    let mut search = 0;
    while let Some(i) = lower[search..].find(name) {
        let at = search + i;
        let rest = &data[at + name.len()..];
        let rest = rest.trim_start();
        if let Some(rest) = rest.strip_prefix('=') {
            let rest = rest.trim_start();
            let mut chars = rest.chars();
            if let Some(q) = chars.next() {
                if q == '"' || q == '\'' {
                    let value: String = chars.take_while(|&c| c != q).collect();
                    return Some(value);
                }
            }
        }
        search = at + name.len();
    }
    None
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn charset_attribute() {
        let mut attrs = Attributes::new();
        attrs.push(Attribute::new("charset", "utf-8"));
        assert_eq!(declared_charset(&attrs).as_deref(), Some("utf-8"));
    }

    #[test]
    fn charset_in_content_attribute() {
        let mut attrs = Attributes::new();
        attrs.push(Attribute::new("http-equiv", "Content-Type"));
        attrs.push(Attribute::new("content", "text/html; charset=ISO-8859-7"));
        assert_eq!(declared_charset(&attrs).as_deref(), Some("ISO-8859-7"));
    }

    #[test]
    fn no_charset() {
        let mut attrs = Attributes::new();
        attrs.push(Attribute::new("name", "viewport"));
        assert_eq!(declared_charset(&attrs), None);
    }

    #[test]
    fn pseudo_attrs() {
        let data = r#"version="1.0" encoding='utf-8' standalone="yes""#;
        assert_eq!(pseudo_attr(data, "version").as_deref(), Some("1.0"));
        assert_eq!(pseudo_attr(data, "encoding").as_deref(), Some("utf-8"));
        assert_eq!(pseudo_attr(data, "standalone").as_deref(), Some("yes"));
        assert_eq!(pseudo_attr(data, "nope"), None);
    }
}
