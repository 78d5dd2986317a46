//! The tag balancer.
//!
//! Consumes the scanner's raw event stream and produces a repaired stream in
//! which every start element has a matching end element in correct nesting
//! order. Missing ancestors (`html`, `head`, `body`, `tbody`, …) are opened
//! with the `synthesized` augmentation flag; mismatched and stray tags are
//! repaired or discarded with a notification to the balancing listener.
//!
//! The balancer never rejects input: its contract is "always produce a
//! balanced stream".

use std::collections::VecDeque;

use crate::elements::{self, code, HtmlElement};
use crate::events::attributes::Attributes;
use crate::events::{Augmentation, Event, Position, QName};
use crate::reader::{Config, NameCase};
use crate::scanner::ScannedEvent;

/// Observer for tags the balancer discards.
///
/// For every start element the balancer emits, it emits exactly one matching
/// end element before `EndDocument`; discarded tags are the ones that would
/// break that invariant, reported here so a DOM binding can still use them
/// (e.g. merge the attributes of a re-opened `<body>`).
pub trait BalancingListener {
    /// A start tag was discarded (singleton re-open, misplaced tag).
    fn ignored_start_element(
        &mut self,
        name: &QName,
        attrs: &Attributes,
        augs: Option<&Augmentation>,
    );

    /// An end tag was discarded (nothing matching open).
    fn ignored_end_element(&mut self, name: &QName, augs: Option<&Augmentation>);
}

/// An entry of the element stack.
struct OpenElement {
    element: &'static HtmlElement,
    name: QName,
    /// Seeded from the fragment context stack: never emitted, never closed.
    seeded: bool,
    /// Inside an `svg` or `math` subtree.
    foreign: bool,
}

pub(crate) struct TagBalancer {
    config: Config,
    stack: Vec<OpenElement>,
    queue: VecDeque<ScannedEvent>,
    listener: Option<Box<dyn BalancingListener>>,
    seen_html: bool,
    seen_head: bool,
    seen_body: bool,
    seen_frameset: bool,
    ended: bool,
}

impl TagBalancer {
    pub(crate) fn new(config: Config) -> TagBalancer {
        let mut balancer = TagBalancer {
            config,
            stack: Vec::new(),
            queue: VecDeque::new(),
            listener: None,
            seen_html: false,
            seen_head: false,
            seen_body: false,
            seen_frameset: false,
            ended: false,
        };
        balancer.seed_fragment_context();
        balancer
    }

    pub(crate) fn set_listener(&mut self, listener: Box<dyn BalancingListener>) {
        self.listener = Some(listener);
    }

    /// Seeds the element stack from the configured fragment context, without
    /// emitting any events for the seeded elements.
    fn seed_fragment_context(&mut self) {
        if !self.config.document_fragment {
            return;
        }
        let context = self.config.fragment_context.clone();
        for name in &context {
            let local = self.fold(name);
            let element = elements::lookup_or_unknown(&local);
            match element.code {
                code::HTML => self.seen_html = true,
                code::HEAD => self.seen_head = true,
                code::BODY => self.seen_body = true,
                code::FRAMESET => self.seen_frameset = true,
                _ => {}
            }
            let foreign = self.parent_foreign() || is_foreign_root(&local);
            self.stack.push(OpenElement {
                element,
                name: QName::folded(name.clone(), local),
                seeded: true,
                foreign,
            });
        }
    }

    pub(crate) fn pop_event(&mut self) -> Option<ScannedEvent> {
        self.queue.pop_front()
    }

    /// Feeds one scanner event through the balancing algorithm.
    pub(crate) fn push_event(&mut self, ev: ScannedEvent) {
        let begin = ev.augs.map(|a| a.begin).unwrap_or_default();
        match ev.event {
            Event::Start { name, attrs } => self.handle_start(name, attrs, ev.augs, false),
            Event::Empty { name, attrs } => self.handle_start(name, attrs, ev.augs, true),
            Event::End { name } => self.handle_end(name, ev.augs),
            Event::Text(text) => self.handle_text(text, ev.augs),
            Event::CDataStart | Event::CDataEnd => {
                // CDATA is only legal inside foreign content; elsewhere its
                // contents pass through as plain characters
                if self.in_foreign_content() {
                    self.queue.push_back(ev);
                }
            }
            Event::GeneralEntityStart(_) | Event::GeneralEntityEnd(_) => {
                self.ensure_body(begin);
                self.queue.push_back(ev);
            }
            Event::EndDocument => self.handle_end_document(ev.augs),
            // document-level events pass through untouched
            _ => self.queue.push_back(ev),
        }
    }

    fn fold(&self, raw: &str) -> String {
        match self.config.names_elems {
            NameCase::Upper => raw.to_ascii_uppercase(),
            NameCase::Lower | NameCase::Default => raw.to_ascii_lowercase(),
            NameCase::Match => raw.to_string(),
        }
    }

    fn parent_foreign(&self) -> bool {
        self.stack.last().map_or(false, |e| e.foreign)
    }

    fn in_foreign_content(&self) -> bool {
        self.parent_foreign()
    }

    fn stack_has(&self, code: u16) -> bool {
        self.stack.iter().any(|e| e.element.code == code)
    }

    fn stack_has_any(&self, codes: &[u16]) -> bool {
        self.stack.iter().any(|e| codes.contains(&e.element.code))
    }

    fn synth_augs(&self, at: Position) -> Option<Augmentation> {
        if self.config.augmentations {
            Some(Augmentation::synthesized_at(at))
        } else {
            None
        }
    }

    fn emit(&mut self, event: Event, augs: Option<Augmentation>) {
        self.queue.push_back(ScannedEvent { event, augs });
    }

    // === start tags =======================================================

    fn handle_start(
        &mut self,
        name: QName,
        attrs: Attributes,
        augs: Option<Augmentation>,
        self_closed: bool,
    ) {
        let element = elements::lookup_or_unknown(&name.local);
        let begin = augs.map(|a| a.begin).unwrap_or_default();

        // singletons may appear at most once per document
        if element.is_singleton() && self.singleton_seen(element.code) {
            if let Some(listener) = self.listener.as_mut() {
                listener.ignored_start_element(&name, &attrs, augs.as_ref());
            }
            return;
        }

        self.open_missing_ancestors(element, begin);
        self.close_on_open(element, begin);
        self.push_open(element, name, attrs, augs);

        if element.is_empty() || self_closed {
            self.close_top(begin);
        }
    }

    fn singleton_seen(&self, code: u16) -> bool {
        match code {
            code::HTML => self.seen_html,
            code::HEAD => self.seen_head,
            code::BODY => self.seen_body,
            code::FRAMESET => self.seen_frameset,
            _ => false,
        }
    }

    fn note_singleton(&mut self, code: u16) {
        match code {
            code::HTML => self.seen_html = true,
            code::HEAD => self.seen_head = true,
            code::BODY => self.seen_body = true,
            code::FRAMESET => self.seen_frameset = true,
            _ => {}
        }
    }

    /// Opens the minimal chain of elements connecting the current stack to
    /// an allowed parent of `element`.
    fn open_missing_ancestors(&mut self, element: &'static HtmlElement, at: Position) {
        if element.parents.is_empty() || self.stack_has_any(element.parents) {
            return;
        }
        let mut chain: Vec<&'static HtmlElement> = Vec::new();
        let mut current = element;
        while !current.parents.is_empty() && !self.stack_has_any(current.parents) {
            let parent = elements::element(current.parents[0]);
            let is_structure = matches!(
                parent.code,
                code::HTML | code::HEAD | code::BODY | code::FRAMESET
            );
            if is_structure && (self.config.document_fragment || !self.config.insert_html_body) {
                break;
            }
            if self.singleton_seen(parent.code) {
                break;
            }
            chain.push(parent);
            if chain.len() > 16 {
                break;
            }
            current = parent;
        }
        for parent in chain.into_iter().rev() {
            self.synth_open(parent, at);
        }
    }

    /// Opens a synthesized element, running the same close-on-open rules a
    /// real tag would.
    fn synth_open(&mut self, element: &'static HtmlElement, at: Position) {
        // a synthesized <body> implies the head phase is over
        if element.code == code::BODY && !self.seen_head && !self.config.document_fragment {
            let head = elements::element(code::HEAD);
            self.close_on_open(head, at);
            self.push_open_synth(head, at);
            self.close_top(at);
        }
        self.close_on_open(element, at);
        self.push_open_synth(element, at);
    }

    fn push_open_synth(&mut self, element: &'static HtmlElement, at: Position) {
        let name = QName::folded(element.name.to_string(), self.fold(element.name));
        let augs = self.synth_augs(at);
        self.push_open(element, name, Attributes::new(), augs);
    }

    fn push_open(
        &mut self,
        element: &'static HtmlElement,
        name: QName,
        attrs: Attributes,
        augs: Option<Augmentation>,
    ) {
        self.note_singleton(element.code);
        let foreign = self.parent_foreign() || is_foreign_root(&name.local);
        self.stack.push(OpenElement {
            element,
            name: name.clone(),
            seeded: false,
            foreign,
        });
        self.emit(Event::Start { name, attrs }, augs);
    }

    /// Pops open elements the new element implicitly closes, bounded by the
    /// new element's close barriers and by the fragment context.
    fn close_on_open(&mut self, element: &'static HtmlElement, at: Position) {
        if element.closes.is_empty() {
            return;
        }
        loop {
            let mut target = None;
            for (i, entry) in self.stack.iter().enumerate().rev() {
                if entry.seeded {
                    break;
                }
                if element.closes.contains(&entry.element.code) {
                    target = Some(i);
                    break;
                }
                if element.bounds.contains(&entry.element.code) {
                    break;
                }
            }
            match target {
                Some(i) => self.pop_through(i, at),
                None => return,
            }
        }
    }

    /// Pops every entry down to and including index `i`, emitting a
    /// synthesized end element for each.
    fn pop_through(&mut self, i: usize, at: Position) {
        while self.stack.len() > i {
            self.close_top(at);
        }
    }

    fn close_top(&mut self, at: Position) {
        if let Some(entry) = self.stack.pop() {
            debug_assert!(!entry.seeded);
            let augs = self.synth_augs(at);
            self.emit(Event::End { name: entry.name }, augs);
        }
    }

    // === end tags =========================================================

    fn handle_end(&mut self, name: QName, augs: Option<Augmentation>) {
        let element = elements::lookup_or_unknown(&name.local);
        let begin = augs.map(|a| a.begin).unwrap_or_default();

        // find the matching open element, not crossing a close barrier or
        // the seeded fragment context
        let mut matched = None;
        for (i, entry) in self.stack.iter().enumerate().rev() {
            let is_match = if element.code == code::UNKNOWN {
                entry.element.code == code::UNKNOWN
                    && entry.name.local.eq_ignore_ascii_case(&name.local)
            } else {
                entry.element.code == element.code
            };
            if is_match {
                if entry.seeded {
                    break;
                }
                matched = Some(i);
                break;
            }
            if entry.seeded || element.bounds.contains(&entry.element.code) {
                break;
            }
        }

        match matched {
            Some(i) => {
                // recovered closes for everything the stray content left open
                while self.stack.len() > i + 1 {
                    self.close_top(begin);
                }
                let entry = self.stack.pop().expect("matched entry is on the stack");
                self.emit(Event::End { name: entry.name }, augs);
            }
            None => match element.code {
                // close-aliases: these end tags imply their own open
                code::P => {
                    self.handle_start(name.clone(), Attributes::new(), self.synth_augs(begin), false);
                    let entry = self.stack.pop().expect("p was just opened");
                    self.emit(Event::End { name: entry.name }, augs);
                }
                code::BR => {
                    self.handle_start(name, Attributes::new(), self.synth_augs(begin), false);
                }
                _ => {
                    if let Some(listener) = self.listener.as_mut() {
                        listener.ignored_end_element(&name, augs.as_ref());
                    }
                }
            },
        }
    }

    // === character data ===================================================

    fn handle_text(&mut self, text: String, augs: Option<Augmentation>) {
        let begin = augs.map(|a| a.begin).unwrap_or_default();
        if self.config.document_fragment {
            self.emit(Event::Text(text), augs);
            return;
        }
        // text belongs to whatever element is open, unless that element is
        // the document structure itself (a <title> in head keeps its text;
        // text directly inside <head> forces the body open)
        let in_content = self
            .stack
            .last()
            .map_or(false, |e| !matches!(e.element.code, code::HTML | code::HEAD));
        if in_content {
            self.emit(Event::Text(text), augs);
            return;
        }
        if text.chars().all(|c| c.is_ascii_whitespace()) {
            // whitespace never forces <body> open
            self.emit(Event::IgnorableWhitespace(text), augs);
            return;
        }
        self.ensure_body(begin);
        self.emit(Event::Text(text), augs);
    }

    /// Synthesizes `html`, `head`, `/head`, `body` as needed so character
    /// content has a place to live.
    fn ensure_body(&mut self, at: Position) {
        if self.config.document_fragment || !self.config.insert_html_body {
            return;
        }
        if self.stack_has(code::BODY) || self.stack_has(code::FRAMESET) {
            return;
        }
        if self.seen_body || self.seen_frameset {
            // body was already closed; content after it stays where it is
            return;
        }
        if !self.stack_has(code::HTML) {
            if self.seen_html {
                return;
            }
            self.synth_open(elements::element(code::HTML), at);
        }
        // close a still-open head, along with anything inside it
        if let Some(i) = self.stack.iter().position(|e| e.element.code == code::HEAD) {
            self.pop_through(i, at);
        }
        self.synth_open(elements::element(code::BODY), at);
    }

    // === end of input =====================================================

    fn handle_end_document(&mut self, augs: Option<Augmentation>) {
        if self.ended {
            return;
        }
        self.ended = true;
        let at = augs.map(|a| a.begin).unwrap_or_default();
        // a document with no content at all still gets its skeleton
        if !self.config.document_fragment
            && self.config.insert_html_body
            && !self.seen_html
            && !self.seen_frameset
        {
            self.ensure_body(at);
        }
        // close every remaining open element in LIFO order
        while let Some(entry) = self.stack.last() {
            if entry.seeded {
                break;
            }
            self.close_top(at);
        }
        self.stack.clear();
        self.emit(Event::EndDocument, augs);
    }
}

/// `svg` and `math` open foreign-content subtrees.
fn is_foreign_root(local: &str) -> bool {
    local.eq_ignore_ascii_case("svg") || local.eq_ignore_ascii_case("math")
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config() -> Config {
        Config::default()
    }

    fn balance(events: Vec<Event>, config: Config) -> Vec<Event> {
        let mut b = TagBalancer::new(config);
        let mut out = Vec::new();
        for event in events {
            b.push_event(ScannedEvent { event, augs: None });
            while let Some(ev) = b.pop_event() {
                out.push(ev.event);
            }
        }
        out
    }

    fn start(name: &str) -> Event {
        Event::Start {
            name: QName::new(name),
            attrs: Attributes::new(),
        }
    }

    fn end(name: &str) -> Event {
        Event::End {
            name: QName::new(name),
        }
    }

    fn text(s: &str) -> Event {
        Event::Text(s.to_string())
    }

    fn names(events: &[Event]) -> Vec<String> {
        events
            .iter()
            .map(|e| match e {
                Event::Start { name, .. } => format!("<{}>", name.local),
                Event::End { name } => format!("</{}>", name.local),
                Event::Text(t) => format!("'{}'", t),
                Event::IgnorableWhitespace(_) => "ws".to_string(),
                other => other.kind().to_string(),
            })
            .collect()
    }

    #[test]
    fn bare_text_synthesizes_skeleton() {
        let out = balance(vec![text("Hi"), Event::EndDocument], config());
        assert_eq!(
            names(&out),
            [
                "<html>", "<head>", "</head>", "<body>", "'Hi'", "</body>", "</html>",
                "EndDocument"
            ]
        );
    }

    #[test]
    fn explicit_body_gets_no_head() {
        let out = balance(
            vec![
                start("html"),
                start("body"),
                start("p"),
                text("Hi"),
                end("p"),
                end("body"),
                end("html"),
                Event::EndDocument,
            ],
            config(),
        );
        assert_eq!(
            names(&out),
            [
                "<html>", "<body>", "<p>", "'Hi'", "</p>", "</body>", "</html>", "EndDocument"
            ]
        );
    }

    #[test]
    fn misnested_inline_tags_are_repaired() {
        let out = balance(
            vec![
                start("b"),
                start("i"),
                text("x"),
                end("b"),
                text("y"),
                end("i"),
                Event::EndDocument,
            ],
            config(),
        );
        // the stray </i> at the end is ignored; balance holds
        let starts = out
            .iter()
            .filter(|e| matches!(e, Event::Start { .. }))
            .count();
        let ends = out.iter().filter(|e| matches!(e, Event::End { .. })).count();
        assert_eq!(starts, ends);
        assert_eq!(
            names(&out),
            [
                "<html>", "<head>", "</head>", "<body>", "<b>", "<i>", "'x'", "</i>", "</b>",
                "'y'", "</body>", "</html>", "EndDocument"
            ]
        );
    }

    #[test]
    fn li_closes_li() {
        let out = balance(
            vec![
                start("body"),
                start("ul"),
                start("li"),
                text("a"),
                start("li"),
                text("b"),
                end("ul"),
                Event::EndDocument,
            ],
            config(),
        );
        assert_eq!(
            names(&out),
            [
                "<html>", "<body>", "<ul>", "<li>", "'a'", "</li>", "<li>", "'b'", "</li>",
                "</ul>", "</body>", "</html>", "EndDocument"
            ]
        );
    }

    #[test]
    fn nested_list_items_respect_bounds() {
        // the inner list is its own scope: the second inner <li> must not
        // close the outer one
        let out = balance(
            vec![
                start("body"),
                start("ul"),
                start("li"),
                start("ul"),
                start("li"),
                start("li"),
                Event::EndDocument,
            ],
            config(),
        );
        let opens = out
            .iter()
            .filter(|e| matches!(e, Event::Start { name, .. } if name.local == "li"))
            .count();
        assert_eq!(opens, 3);
    }

    #[test]
    fn block_closes_paragraph() {
        let out = balance(
            vec![
                start("body"),
                start("p"),
                text("a"),
                start("div"),
                text("b"),
                Event::EndDocument,
            ],
            config(),
        );
        assert_eq!(
            names(&out),
            [
                "<html>", "<body>", "<p>", "'a'", "</p>", "<div>", "'b'", "</div>", "</body>",
                "</html>", "EndDocument"
            ]
        );
    }

    #[test]
    fn second_body_is_ignored() {
        let mut cfg = config();
        cfg.report_errors = true;
        let out = balance(
            vec![
                start("body"),
                start("body"),
                text("x"),
                Event::EndDocument,
            ],
            cfg,
        );
        let bodies = out
            .iter()
            .filter(|e| matches!(e, Event::Start { name, .. } if name.local == "body"))
            .count();
        assert_eq!(bodies, 1);
    }

    #[test]
    fn empty_elements_are_closed_immediately() {
        let out = balance(
            vec![start("body"), start("br"), text("x"), Event::EndDocument],
            config(),
        );
        assert_eq!(
            names(&out),
            [
                "<html>", "<body>", "<br>", "</br>", "'x'", "</body>", "</html>", "EndDocument"
            ]
        );
    }

    #[test]
    fn stray_end_p_synthesizes_its_open() {
        let out = balance(vec![start("body"), end("p"), Event::EndDocument], config());
        assert_eq!(
            names(&out),
            [
                "<html>", "<body>", "<p>", "</p>", "</body>", "</html>", "EndDocument"
            ]
        );
    }

    #[test]
    fn whitespace_before_body_is_ignorable() {
        let out = balance(vec![text("  \n"), text("Hi"), Event::EndDocument], config());
        assert_eq!(names(&out)[0], "ws");
        assert_eq!(names(&out)[1], "<html>");
    }

    #[test]
    fn fragment_context_seeds_tbody_synthesis() {
        let mut cfg = config();
        cfg.document_fragment = true;
        cfg.fragment_context = vec![
            "html".to_string(),
            "body".to_string(),
            "table".to_string(),
        ];
        let out = balance(
            vec![
                start("tr"),
                start("td"),
                text("hi"),
                end("td"),
                end("tr"),
                Event::EndDocument,
            ],
            cfg,
        );
        assert_eq!(
            names(&out),
            [
                "<tbody>", "<tr>", "<td>", "'hi'", "</td>", "</tr>", "</tbody>", "EndDocument"
            ]
        );
    }

    #[test]
    fn fragment_context_with_tbody_needs_no_synthesis() {
        let mut cfg = config();
        cfg.document_fragment = true;
        cfg.fragment_context = vec![
            "html".to_string(),
            "body".to_string(),
            "table".to_string(),
            "tbody".to_string(),
        ];
        let out = balance(
            vec![
                start("tr"),
                start("td"),
                text("hi"),
                end("td"),
                end("tr"),
                Event::EndDocument,
            ],
            cfg,
        );
        assert_eq!(
            names(&out),
            ["<tr>", "<td>", "'hi'", "</td>", "</tr>", "EndDocument"]
        );
    }

    #[test]
    fn table_cells_synthesize_row_structure() {
        let out = balance(
            vec![start("body"), start("table"), start("td"), text("x"), Event::EndDocument],
            config(),
        );
        assert_eq!(
            names(&out),
            [
                "<html>", "<body>", "<table>", "<tbody>", "<tr>", "<td>", "'x'", "</td>",
                "</tr>", "</tbody>", "</table>", "</body>", "</html>", "EndDocument"
            ]
        );
    }

    #[test]
    fn new_row_closes_open_cell() {
        let out = balance(
            vec![
                start("body"),
                start("table"),
                start("tr"),
                start("td"),
                text("a"),
                start("tr"),
                start("td"),
                text("b"),
                Event::EndDocument,
            ],
            config(),
        );
        let rows: Vec<_> = names(&out);
        let first_tr = rows.iter().position(|s| s == "<tr>").unwrap();
        let close_td = rows.iter().position(|s| s == "</td>").unwrap();
        let second_tr = rows.iter().rposition(|s| s == "<tr>").unwrap();
        assert!(first_tr < close_td && close_td < second_tr);
    }

    #[test]
    fn end_document_closes_everything() {
        let out = balance(
            vec![start("body"), start("div"), start("b"), Event::EndDocument],
            config(),
        );
        let starts = out
            .iter()
            .filter(|e| matches!(e, Event::Start { .. }))
            .count();
        let ends = out.iter().filter(|e| matches!(e, Event::End { .. })).count();
        assert_eq!(starts, ends);
        assert_eq!(out.last(), Some(&Event::EndDocument));
    }

    #[test]
    fn empty_document_gets_a_skeleton() {
        let out = balance(vec![Event::EndDocument], config());
        assert_eq!(
            names(&out),
            [
                "<html>", "<head>", "</head>", "<body>", "</body>", "</html>", "EndDocument"
            ]
        );
    }

    #[test]
    fn listener_sees_ignored_tags() {
        use std::cell::RefCell;
        use std::rc::Rc;

        struct Recorder(Rc<RefCell<Vec<String>>>);
        impl BalancingListener for Recorder {
            fn ignored_start_element(
                &mut self,
                name: &QName,
                _attrs: &Attributes,
                _augs: Option<&Augmentation>,
            ) {
                self.0.borrow_mut().push(format!("start:{}", name.local));
            }
            fn ignored_end_element(&mut self, name: &QName, _augs: Option<&Augmentation>) {
                self.0.borrow_mut().push(format!("end:{}", name.local));
            }
        }

        let log = Rc::new(RefCell::new(Vec::new()));
        let mut b = TagBalancer::new(config());
        b.set_listener(Box::new(Recorder(log.clone())));
        for event in [
            start("body"),
            start("body"),
            end("table"),
            Event::EndDocument,
        ] {
            b.push_event(ScannedEvent { event, augs: None });
            while b.pop_event().is_some() {}
        }
        assert_eq!(*log.borrow(), ["start:body", "end:table"]);
    }
}
