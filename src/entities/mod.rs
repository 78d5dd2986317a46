//! Named and numeric character reference resolution.
//!
//! The named-reference catalog is a trie keyed character by character,
//! supporting the incremental longest-match lookup the scanner needs: feed
//! one character at a time, stop as soon as the catalog cannot extend, and
//! learn how many characters to push back. The HTML quirk that some names
//! are valid both with and without the trailing semicolon (`&amp` / `&amp;`)
//! falls out of the table containing both forms.
//!
//! The trie is built once on first use and shared, read-only, by every
//! parser in the process.

mod table;

use std::sync::OnceLock;

use table::NAMED_REFERENCES;

/// Lowest character with a dense root slot (`'0'`).
const ROOT_BASE: usize = b'0' as usize;
/// Root slots cover `'0'..='z'`: digits, both letter cases and the
/// punctuation between them. Reference names start with ASCII letters; the
/// digit range keeps the arithmetic trivial.
const ROOT_SPAN: usize = (b'z' - b'0') as usize + 1;

#[derive(Debug)]
struct TrieNode {
    ch: char,
    /// Replacement text if the path from the root to this node spells a
    /// valid reference name. A node can be a valid match and still extend
    /// (`&amp` extends to `&amp;`).
    replacement: Option<&'static str>,
    /// `true` if the name ending at this node ends with `;`. Such a node is
    /// always terminal: no name extends past its semicolon.
    ends_with_semicolon: bool,
    /// Children sorted by `ch` for binary search.
    children: Vec<TrieNode>,
}

impl TrieNode {
    fn new(ch: char) -> TrieNode {
        TrieNode {
            ch,
            replacement: None,
            ends_with_semicolon: false,
            children: Vec::new(),
        }
    }

    fn child(&self, ch: char) -> Option<&TrieNode> {
        self.children
            .binary_search_by(|c| c.ch.cmp(&ch))
            .ok()
            .map(|i| &self.children[i])
    }

    fn child_mut(&mut self, ch: char) -> &mut TrieNode {
        match self.children.binary_search_by(|c| c.ch.cmp(&ch)) {
            Ok(i) => &mut self.children[i],
            Err(i) => {
                self.children.insert(i, TrieNode::new(ch));
                &mut self.children[i]
            }
        }
    }
}

/// The named-reference catalog.
#[derive(Debug)]
pub struct EntityTrie {
    /// Dense, direct-indexed children of the root.
    roots: Vec<Option<TrieNode>>,
}

impl EntityTrie {
    fn build() -> EntityTrie {
        let mut roots: Vec<Option<TrieNode>> = Vec::with_capacity(ROOT_SPAN);
        roots.resize_with(ROOT_SPAN, || None);

        for &(name, replacement) in NAMED_REFERENCES {
            let mut chars = name.chars();
            let first = chars.next().expect("reference names are never empty");
            let slot = first as usize - ROOT_BASE;
            let mut node = roots[slot].get_or_insert_with(|| TrieNode::new(first));
            for ch in chars {
                node = node.child_mut(ch);
            }
            node.replacement = Some(replacement);
            node.ends_with_semicolon = name.ends_with(';');
            debug_assert!(
                !node.ends_with_semicolon || node.children.is_empty(),
                "no name extends past a semicolon"
            );
        }
        EntityTrie { roots }
    }

    fn root(&self, ch: char) -> Option<&TrieNode> {
        let i = (ch as usize).checked_sub(ROOT_BASE)?;
        self.roots.get(i)?.as_ref().filter(|n| n.ch == ch)
    }

    /// Number of names in the catalog. Used by tests.
    pub fn name_count(&self) -> usize {
        NAMED_REFERENCES.len()
    }
}

/// Iterates the full reference catalog as `(name, replacement)` pairs.
///
/// Names that are legal without a trailing semicolon appear in both forms.
pub fn catalog() -> impl Iterator<Item = (&'static str, &'static str)> {
    NAMED_REFERENCES.iter().copied()
}

static TRIE: OnceLock<EntityTrie> = OnceLock::new();

/// The process-wide reference catalog, built on first use.
pub fn entity_trie() -> &'static EntityTrie {
    TRIE.get_or_init(EntityTrie::build)
}

/// Outcome of feeding one character to an [`EntityResolver`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeedResult {
    /// The character extended the walk and was consumed; feed the next one.
    Continue,
    /// The character completed a semicolon-terminated name (and was
    /// consumed); call [`EntityResolver::resolve`].
    Done,
    /// The character cannot extend the walk and was *not* consumed; call
    /// [`EntityResolver::resolve`] and re-scan the character as ordinary
    /// input.
    Dead,
}

/// A successful named-reference lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntityMatch {
    /// The replacement text for the longest valid name seen.
    pub replacement: &'static str,
    /// Length of the matched name in characters (excluding the `&`).
    pub matched_len: usize,
    /// How many of the fed characters were *not* part of the match and must
    /// be pushed back for re-scanning as ordinary character data.
    pub rewind: usize,
    /// `true` if the matched name ends with `;`.
    pub ends_with_semicolon: bool,
}

/// Result of a finished lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// The longest valid name seen, with rewind accounting.
    Matched(EntityMatch),
    /// No prefix of the consumed characters is a valid name; all of them
    /// must be pushed back.
    NoMatch {
        /// Number of characters consumed (and to be pushed back).
        seen: usize,
    },
}

/// Incremental longest-match lookup state over the [`EntityTrie`].
#[derive(Debug)]
pub struct EntityResolver {
    trie: &'static EntityTrie,
    node: Option<&'static TrieNode>,
    at_root: bool,
    /// Characters consumed so far (the ones that advanced the walk).
    seen: usize,
    best: Option<(&'static str, usize, bool)>,
}

impl EntityResolver {
    /// Starts a lookup at the root of the shared catalog.
    pub fn new() -> EntityResolver {
        EntityResolver {
            trie: entity_trie(),
            node: None,
            at_root: true,
            seen: 0,
            best: None,
        }
    }

    /// Feeds the next character after the `&`.
    ///
    /// Returns [`FeedResult::Dead`] when the walk cannot extend (the
    /// character stays unconsumed) and [`FeedResult::Done`] when a
    /// semicolon-terminated name completed (longest possible match by
    /// construction).
    pub fn feed(&mut self, ch: char) -> FeedResult {
        let next = if self.at_root {
            self.trie.root(ch)
        } else {
            self.node.and_then(|n| n.child(ch))
        };
        match next {
            None => FeedResult::Dead,
            Some(node) => {
                self.seen += 1;
                self.at_root = false;
                self.node = Some(node);
                if let Some(replacement) = node.replacement {
                    self.best = Some((replacement, self.seen, node.ends_with_semicolon));
                    if node.ends_with_semicolon {
                        return FeedResult::Done;
                    }
                }
                FeedResult::Continue
            }
        }
    }

    /// Finishes the lookup, reporting the longest valid match and how many
    /// characters to push back.
    pub fn resolve(self) -> Resolution {
        match self.best {
            Some((replacement, matched_len, ends_with_semicolon)) => {
                Resolution::Matched(EntityMatch {
                    replacement,
                    matched_len,
                    rewind: self.seen - matched_len,
                    ends_with_semicolon,
                })
            }
            None => Resolution::NoMatch { seen: self.seen },
        }
    }
}

impl Default for EntityResolver {
    fn default() -> Self {
        EntityResolver::new()
    }
}

/// The WHATWG override table for numeric references in `0x80..=0x9F`.
///
/// HTML treats these code points as Windows-1252 bytes; the holes (0x81,
/// 0x8D, 0x8F, 0x90, 0x9D) pass through unchanged.
const WINDOWS_1252_REMAP: [(u32, char); 27] = [
    (0x80, '\u{20AC}'),
    (0x82, '\u{201A}'),
    (0x83, '\u{0192}'),
    (0x84, '\u{201E}'),
    (0x85, '\u{2026}'),
    (0x86, '\u{2020}'),
    (0x87, '\u{2021}'),
    (0x88, '\u{02C6}'),
    (0x89, '\u{2030}'),
    (0x8A, '\u{0160}'),
    (0x8B, '\u{2039}'),
    (0x8C, '\u{0152}'),
    (0x8E, '\u{017D}'),
    (0x91, '\u{2018}'),
    (0x92, '\u{2019}'),
    (0x93, '\u{201C}'),
    (0x94, '\u{201D}'),
    (0x95, '\u{2022}'),
    (0x96, '\u{2013}'),
    (0x97, '\u{2014}'),
    (0x98, '\u{02DC}'),
    (0x99, '\u{2122}'),
    (0x9A, '\u{0161}'),
    (0x9B, '\u{203A}'),
    (0x9C, '\u{0153}'),
    (0x9E, '\u{017E}'),
    (0x9F, '\u{0178}'),
];

/// Maps a numeric reference code point to the character to emit.
///
/// Returns the character and whether the code point was valid as written;
/// invalid code points (NUL, surrogates, out of range) come back as
/// `U+FFFD` with `false` so the caller can warn.
pub fn numeric_replacement(code: u32) -> (char, bool) {
    if code == 0 || (0xD800..=0xDFFF).contains(&code) || code > 0x10FFFF {
        return ('\u{FFFD}', false);
    }
    if (0x80..=0x9F).contains(&code) {
        if let Some(&(_, ch)) = WINDOWS_1252_REMAP.iter().find(|&&(c, _)| c == code) {
            return (ch, true);
        }
    }
    match char::from_u32(code) {
        Some(ch) => (ch, true),
        None => ('\u{FFFD}', false),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lookup(name: &str) -> Resolution {
        let mut r = EntityResolver::new();
        for ch in name.chars() {
            match r.feed(ch) {
                FeedResult::Continue => {}
                FeedResult::Done | FeedResult::Dead => break,
            }
        }
        r.resolve()
    }

    #[test]
    fn catalog_size() {
        assert!(entity_trie().name_count() > 2200);
    }

    #[test]
    fn semicolon_form_matches_terminally() {
        match lookup("amp;x") {
            Resolution::Matched(m) => {
                assert_eq!(m.replacement, "&");
                assert_eq!(m.matched_len, 4);
                assert_eq!(m.rewind, 0);
                assert!(m.ends_with_semicolon);
            }
            r => panic!("unexpected {:?}", r),
        }
    }

    #[test]
    fn legacy_form_without_semicolon() {
        // in `&amp X` the space stops the walk without being consumed
        match lookup("amp X") {
            Resolution::Matched(m) => {
                assert_eq!(m.replacement, "&");
                assert_eq!(m.matched_len, 3);
                assert_eq!(m.rewind, 0);
                assert!(!m.ends_with_semicolon);
            }
            r => panic!("unexpected {:?}", r),
        }
    }

    #[test]
    fn longest_match_wins() {
        // `&notin;` must not stop at the legacy `&not`
        match lookup("notin;") {
            Resolution::Matched(m) => {
                assert_eq!(m.replacement, "\u{2209}");
                assert_eq!(m.matched_len, 6);
                assert_eq!(m.rewind, 0);
            }
            r => panic!("unexpected {:?}", r),
        }
        // `&notx` falls back to the legacy `&not`; the `x` is never consumed
        match lookup("notx") {
            Resolution::Matched(m) => {
                assert_eq!(m.replacement, "\u{AC}");
                assert_eq!(m.matched_len, 3);
                assert_eq!(m.rewind, 0);
                assert!(!m.ends_with_semicolon);
            }
            r => panic!("unexpected {:?}", r),
        }
    }

    #[test]
    fn unknown_name_rewinds_everything() {
        match lookup("nosuch;") {
            // `n` and `o` advance; the `s` hits a dead end unconsumed
            Resolution::NoMatch { seen } => assert_eq!(seen, 2),
            r => panic!("unexpected {:?}", r),
        }
    }

    #[test]
    fn case_sensitive_names() {
        match lookup("Uuml;") {
            Resolution::Matched(m) => assert_eq!(m.replacement, "\u{DC}"),
            r => panic!("unexpected {:?}", r),
        }
        match lookup("uuml;") {
            Resolution::Matched(m) => assert_eq!(m.replacement, "\u{FC}"),
            r => panic!("unexpected {:?}", r),
        }
    }

    #[test]
    fn multi_char_replacements() {
        // some references expand to two characters
        match lookup("NotEqualTilde;") {
            Resolution::Matched(m) => assert_eq!(m.replacement, "\u{2242}\u{338}"),
            r => panic!("unexpected {:?}", r),
        }
    }

    #[test]
    fn numeric_remap_window() {
        assert_eq!(numeric_replacement(0x80), ('\u{20AC}', true));
        assert_eq!(numeric_replacement(0x99), ('\u{2122}', true));
        assert_eq!(numeric_replacement(0x81), ('\u{81}', true));
        assert_eq!(numeric_replacement(0x41), ('A', true));
    }

    #[test]
    fn numeric_rejects_bad_code_points() {
        assert_eq!(numeric_replacement(0), ('\u{FFFD}', false));
        assert_eq!(numeric_replacement(0xD800), ('\u{FFFD}', false));
        assert_eq!(numeric_replacement(0x110000), ('\u{FFFD}', false));
    }

    #[test]
    fn every_catalog_name_resolves_to_its_replacement() {
        for &(name, replacement) in table::NAMED_REFERENCES {
            match lookup(&format!("{} ", name)) {
                Resolution::Matched(m) => {
                    assert_eq!(m.replacement, replacement, "name {:?}", name)
                }
                r => panic!("{:?} did not resolve: {:?}", name, r),
            }
        }
    }
}
