//! The HTML element model.
//!
//! An immutable catalog of element descriptors consulted by the balancer for
//! every start and end tag: which category an element belongs to, where it
//! may live (`parents`), which open elements it implicitly closes
//! (`closes`), and how far an implicit close may propagate (`bounds`).
//!
//! Codes are dense small integers, so the catalog doubles as an array and
//! stack entries can carry a `u16` instead of a string.

use std::sync::OnceLock;

/// Category and behavior flags of an element.
pub mod flags {
    /// Phrasing-level content.
    pub const INLINE: u8 = 0x01;
    /// Flow-level content that breaks lines.
    pub const BLOCK: u8 = 0x02;
    /// Void element: never has content, auto-closed on open.
    pub const EMPTY: u8 = 0x04;
    /// May contain other elements.
    pub const CONTAINER: u8 = 0x08;
    /// Structural element with bespoke balancing rules.
    pub const SPECIAL: u8 = 0x10;
    /// Content is raw text up to the matching end tag; no tags, no
    /// character references (`<script>`, `<style>`, `<xmp>`, …).
    pub const RAW_TEXT: u8 = 0x20;
    /// Content is text up to the matching end tag, but character references
    /// are still resolved (`<title>`, `<textarea>`).
    pub const RCDATA: u8 = 0x40;
}

/// Dense element codes. The catalog array is indexed by these.
#[allow(missing_docs)]
pub mod code {
    pub const A: u16 = 0;
    pub const ABBR: u16 = 1;
    pub const ACRONYM: u16 = 2;
    pub const ADDRESS: u16 = 3;
    pub const APPLET: u16 = 4;
    pub const AREA: u16 = 5;
    pub const ARTICLE: u16 = 6;
    pub const ASIDE: u16 = 7;
    pub const AUDIO: u16 = 8;
    pub const B: u16 = 9;
    pub const BASE: u16 = 10;
    pub const BASEFONT: u16 = 11;
    pub const BDI: u16 = 12;
    pub const BDO: u16 = 13;
    pub const BGSOUND: u16 = 14;
    pub const BIG: u16 = 15;
    pub const BLINK: u16 = 16;
    pub const BLOCKQUOTE: u16 = 17;
    pub const BODY: u16 = 18;
    pub const BR: u16 = 19;
    pub const BUTTON: u16 = 20;
    pub const CANVAS: u16 = 21;
    pub const CAPTION: u16 = 22;
    pub const CENTER: u16 = 23;
    pub const CITE: u16 = 24;
    pub const CODE: u16 = 25;
    pub const COL: u16 = 26;
    pub const COLGROUP: u16 = 27;
    pub const COMMENT: u16 = 28;
    pub const DATALIST: u16 = 29;
    pub const DD: u16 = 30;
    pub const DEL: u16 = 31;
    pub const DETAILS: u16 = 32;
    pub const DFN: u16 = 33;
    pub const DIR: u16 = 34;
    pub const DIV: u16 = 35;
    pub const DL: u16 = 36;
    pub const DT: u16 = 37;
    pub const EM: u16 = 38;
    pub const EMBED: u16 = 39;
    pub const FIELDSET: u16 = 40;
    pub const FIGCAPTION: u16 = 41;
    pub const FIGURE: u16 = 42;
    pub const FONT: u16 = 43;
    pub const FOOTER: u16 = 44;
    pub const FORM: u16 = 45;
    pub const FRAME: u16 = 46;
    pub const FRAMESET: u16 = 47;
    pub const H1: u16 = 48;
    pub const H2: u16 = 49;
    pub const H3: u16 = 50;
    pub const H4: u16 = 51;
    pub const H5: u16 = 52;
    pub const H6: u16 = 53;
    pub const HEAD: u16 = 54;
    pub const HEADER: u16 = 55;
    pub const HGROUP: u16 = 56;
    pub const HR: u16 = 57;
    pub const HTML: u16 = 58;
    pub const I: u16 = 59;
    pub const IFRAME: u16 = 60;
    pub const IMG: u16 = 61;
    pub const INPUT: u16 = 62;
    pub const INS: u16 = 63;
    pub const ISINDEX: u16 = 64;
    pub const KBD: u16 = 65;
    pub const KEYGEN: u16 = 66;
    pub const LABEL: u16 = 67;
    pub const LAYER: u16 = 68;
    pub const LEGEND: u16 = 69;
    pub const LI: u16 = 70;
    pub const LINK: u16 = 71;
    pub const LISTING: u16 = 72;
    pub const MAIN: u16 = 73;
    pub const MAP: u16 = 74;
    pub const MARK: u16 = 75;
    pub const MARQUEE: u16 = 76;
    pub const MENU: u16 = 77;
    pub const META: u16 = 78;
    pub const METER: u16 = 79;
    pub const MULTICOL: u16 = 80;
    pub const NAV: u16 = 81;
    pub const NOBR: u16 = 82;
    pub const NOEMBED: u16 = 83;
    pub const NOFRAMES: u16 = 84;
    pub const NOLAYER: u16 = 85;
    pub const NOSCRIPT: u16 = 86;
    pub const OBJECT: u16 = 87;
    pub const OL: u16 = 88;
    pub const OPTGROUP: u16 = 89;
    pub const OPTION: u16 = 90;
    pub const OUTPUT: u16 = 91;
    pub const P: u16 = 92;
    pub const PARAM: u16 = 93;
    pub const PLAINTEXT: u16 = 94;
    pub const PRE: u16 = 95;
    pub const PROGRESS: u16 = 96;
    pub const Q: u16 = 97;
    pub const RB: u16 = 98;
    pub const RP: u16 = 99;
    pub const RT: u16 = 100;
    pub const RUBY: u16 = 101;
    pub const S: u16 = 102;
    pub const SAMP: u16 = 103;
    pub const SCRIPT: u16 = 104;
    pub const SECTION: u16 = 105;
    pub const SELECT: u16 = 106;
    pub const SMALL: u16 = 107;
    pub const SOURCE: u16 = 108;
    pub const SPACER: u16 = 109;
    pub const SPAN: u16 = 110;
    pub const STRIKE: u16 = 111;
    pub const STRONG: u16 = 112;
    pub const STYLE: u16 = 113;
    pub const SUB: u16 = 114;
    pub const SUMMARY: u16 = 115;
    pub const SUP: u16 = 116;
    pub const TABLE: u16 = 117;
    pub const TBODY: u16 = 118;
    pub const TD: u16 = 119;
    pub const TEXTAREA: u16 = 120;
    pub const TFOOT: u16 = 121;
    pub const TH: u16 = 122;
    pub const THEAD: u16 = 123;
    pub const TIME: u16 = 124;
    pub const TITLE: u16 = 125;
    pub const TR: u16 = 126;
    pub const TRACK: u16 = 127;
    pub const TT: u16 = 128;
    pub const U: u16 = 129;
    pub const UL: u16 = 130;
    pub const VAR: u16 = 131;
    pub const VIDEO: u16 = 132;
    pub const WBR: u16 = 133;
    pub const XML: u16 = 134;
    pub const XMP: u16 = 135;
    /// Pseudo-code for names not in the catalog.
    pub const UNKNOWN: u16 = 136;
}

use self::code::*;
use self::flags::*;

/// An immutable element descriptor.
#[derive(Debug)]
pub struct HtmlElement {
    /// Dense code; `ELEMENTS[code as usize]` is this descriptor.
    pub code: u16,
    /// Canonical (lowercase) name.
    pub name: &'static str,
    /// Category bitmask, see [`flags`].
    pub flags: u8,
    /// Elements an instance must have as an ancestor; empty means "any".
    /// The first entry is the one the balancer auto-opens.
    pub parents: &'static [u16],
    /// Ancestors at which an implicit close stops propagating.
    pub bounds: &'static [u16],
    /// Open elements that an open of this element implicitly closes.
    pub closes: &'static [u16],
}

impl HtmlElement {
    /// `true` for void elements (`<br>`, `<img>`, …).
    pub fn is_empty(&self) -> bool {
        self.flags & EMPTY != 0
    }

    /// `true` for block-level elements.
    pub fn is_block(&self) -> bool {
        self.flags & BLOCK != 0
    }

    /// `true` for phrasing-level elements.
    pub fn is_inline(&self) -> bool {
        self.flags & INLINE != 0
    }

    /// `true` if the element may contain others.
    pub fn is_container(&self) -> bool {
        self.flags & CONTAINER != 0
    }

    /// `true` for structural elements with bespoke balancing rules.
    pub fn is_special(&self) -> bool {
        self.flags & SPECIAL != 0
    }

    /// `true` if content is scanned as raw text (no tags, no references).
    pub fn is_raw_text(&self) -> bool {
        self.flags & RAW_TEXT != 0
    }

    /// `true` if content is scanned as text with references resolved.
    pub fn is_rcdata(&self) -> bool {
        self.flags & RCDATA != 0
    }

    /// `true` for the elements that may appear at most once per document.
    pub fn is_singleton(&self) -> bool {
        matches!(self.code, HTML | HEAD | BODY | FRAMESET)
    }
}

const fn elem(
    code: u16,
    name: &'static str,
    flags: u8,
    parents: &'static [u16],
    bounds: &'static [u16],
    closes: &'static [u16],
) -> HtmlElement {
    HtmlElement {
        code,
        name,
        flags,
        parents,
        bounds,
        closes,
    }
}

const P_NONE: &[u16] = &[];
const P_HTML: &[u16] = &[HTML];
const P_BODY: &[u16] = &[BODY];
const P_HEAD_BODY: &[u16] = &[HEAD, BODY];
const P_TABLE: &[u16] = &[TABLE];
const P_ROWGROUP: &[u16] = &[TBODY, THEAD, TFOOT];
const P_TR: &[u16] = &[TR];
const P_COLGROUP: &[u16] = &[COLGROUP, TABLE];
const P_SELECT: &[u16] = &[SELECT, DATALIST];
const P_OPTGROUP: &[u16] = &[SELECT];
const P_MAP: &[u16] = &[MAP];
const P_FRAMESET: &[u16] = &[FRAMESET];
const P_OBJECT: &[u16] = &[OBJECT, APPLET];
const P_RUBY: &[u16] = &[RUBY];

const B_NONE: &[u16] = &[];
const B_HTML: &[u16] = &[HTML];
const B_BODY: &[u16] = &[BODY];
const B_LIST: &[u16] = &[UL, OL, MENU, DIR, BODY];
const B_DL: &[u16] = &[DL, BODY];
const B_P: &[u16] = &[BODY, TD, TH, CAPTION, LI, DD, DT, OBJECT, APPLET, MARQUEE];
const B_TABLE: &[u16] = &[TABLE];
const B_ROW: &[u16] = &[TABLE, TBODY, THEAD, TFOOT];
const B_CELL: &[u16] = &[TABLE, TBODY, THEAD, TFOOT, TR];
const B_SELECT: &[u16] = &[SELECT, DATALIST, BODY];
const B_RUBY: &[u16] = &[RUBY, BODY];

const C_NONE: &[u16] = &[];
const C_P: &[u16] = &[P];
const C_A: &[u16] = &[A];
const C_NOBR: &[u16] = &[NOBR];
const C_BUTTON: &[u16] = &[BUTTON];
const C_LI: &[u16] = &[LI, P];
const C_DEF: &[u16] = &[DD, DT, P];
const C_HEAD: &[u16] = &[HEAD];
const C_SELECT: &[u16] = &[SELECT];
const C_OPTION: &[u16] = &[OPTION];
const C_OPTGROUP: &[u16] = &[OPTION, OPTGROUP];
const C_CAPTION: &[u16] = &[CAPTION];
const C_COLGROUP: &[u16] = &[CAPTION, COLGROUP];
const C_SECTION: &[u16] = &[CAPTION, COLGROUP, THEAD, TBODY, TFOOT];
const C_TR: &[u16] = &[TR, TD, TH];
const C_CELL: &[u16] = &[TD, TH];
const C_RUBY_TEXT: &[u16] = &[RB, RP, RT];

/// The catalog, indexed by [`code`].
static ELEMENTS: &[HtmlElement] = &[
    elem(A, "a", INLINE | CONTAINER, P_BODY, B_BODY, C_A),
    elem(ABBR, "abbr", INLINE | CONTAINER, P_BODY, B_NONE, C_NONE),
    elem(ACRONYM, "acronym", INLINE | CONTAINER, P_BODY, B_NONE, C_NONE),
    elem(ADDRESS, "address", BLOCK | CONTAINER, P_BODY, B_NONE, C_P),
    elem(APPLET, "applet", INLINE | CONTAINER, P_BODY, B_NONE, C_NONE),
    elem(AREA, "area", EMPTY, P_MAP, B_NONE, C_NONE),
    elem(ARTICLE, "article", BLOCK | CONTAINER, P_BODY, B_NONE, C_P),
    elem(ASIDE, "aside", BLOCK | CONTAINER, P_BODY, B_NONE, C_P),
    elem(AUDIO, "audio", INLINE | CONTAINER, P_BODY, B_NONE, C_NONE),
    elem(B, "b", INLINE | CONTAINER, P_BODY, B_NONE, C_NONE),
    elem(BASE, "base", EMPTY, P_HEAD_BODY, B_NONE, C_NONE),
    elem(BASEFONT, "basefont", EMPTY, P_HEAD_BODY, B_NONE, C_NONE),
    elem(BDI, "bdi", INLINE | CONTAINER, P_BODY, B_NONE, C_NONE),
    elem(BDO, "bdo", INLINE | CONTAINER, P_BODY, B_NONE, C_NONE),
    elem(BGSOUND, "bgsound", EMPTY, P_HEAD_BODY, B_NONE, C_NONE),
    elem(BIG, "big", INLINE | CONTAINER, P_BODY, B_NONE, C_NONE),
    elem(BLINK, "blink", INLINE | CONTAINER, P_BODY, B_NONE, C_NONE),
    elem(BLOCKQUOTE, "blockquote", BLOCK | CONTAINER, P_BODY, B_NONE, C_P),
    elem(BODY, "body", SPECIAL | CONTAINER, P_HTML, B_HTML, C_HEAD),
    elem(BR, "br", EMPTY | INLINE, P_BODY, B_NONE, C_NONE),
    elem(BUTTON, "button", INLINE | CONTAINER, P_BODY, B_BODY, C_BUTTON),
    elem(CANVAS, "canvas", INLINE | CONTAINER, P_BODY, B_NONE, C_NONE),
    elem(CAPTION, "caption", SPECIAL | CONTAINER, P_TABLE, B_TABLE, C_CAPTION),
    elem(CENTER, "center", BLOCK | CONTAINER, P_BODY, B_NONE, C_P),
    elem(CITE, "cite", INLINE | CONTAINER, P_BODY, B_NONE, C_NONE),
    elem(CODE, "code", INLINE | CONTAINER, P_BODY, B_NONE, C_NONE),
    elem(COL, "col", SPECIAL | EMPTY, P_COLGROUP, B_TABLE, C_NONE),
    elem(COLGROUP, "colgroup", SPECIAL | CONTAINER, P_TABLE, B_TABLE, C_COLGROUP),
    elem(COMMENT, "comment", CONTAINER, P_BODY, B_NONE, C_NONE),
    elem(DATALIST, "datalist", CONTAINER, P_BODY, B_NONE, C_NONE),
    elem(DD, "dd", BLOCK | CONTAINER, P_BODY, B_DL, C_DEF),
    elem(DEL, "del", INLINE | CONTAINER, P_BODY, B_NONE, C_NONE),
    elem(DETAILS, "details", BLOCK | CONTAINER, P_BODY, B_NONE, C_P),
    elem(DFN, "dfn", INLINE | CONTAINER, P_BODY, B_NONE, C_NONE),
    elem(DIR, "dir", BLOCK | CONTAINER, P_BODY, B_NONE, C_P),
    elem(DIV, "div", BLOCK | CONTAINER, P_BODY, B_NONE, C_P),
    elem(DL, "dl", BLOCK | CONTAINER, P_BODY, B_NONE, C_P),
    elem(DT, "dt", BLOCK | CONTAINER, P_BODY, B_DL, C_DEF),
    elem(EM, "em", INLINE | CONTAINER, P_BODY, B_NONE, C_NONE),
    elem(EMBED, "embed", EMPTY | INLINE, P_BODY, B_NONE, C_NONE),
    elem(FIELDSET, "fieldset", BLOCK | CONTAINER, P_BODY, B_NONE, C_P),
    elem(FIGCAPTION, "figcaption", BLOCK | CONTAINER, P_BODY, B_NONE, C_P),
    elem(FIGURE, "figure", BLOCK | CONTAINER, P_BODY, B_NONE, C_P),
    elem(FONT, "font", INLINE | CONTAINER, P_BODY, B_NONE, C_NONE),
    elem(FOOTER, "footer", BLOCK | CONTAINER, P_BODY, B_NONE, C_P),
    elem(FORM, "form", BLOCK | CONTAINER | SPECIAL, P_BODY, B_NONE, C_P),
    elem(FRAME, "frame", SPECIAL | EMPTY, P_FRAMESET, B_NONE, C_NONE),
    elem(FRAMESET, "frameset", SPECIAL | CONTAINER, P_HTML, B_HTML, C_NONE),
    elem(H1, "h1", BLOCK | CONTAINER, P_BODY, B_NONE, C_P),
    elem(H2, "h2", BLOCK | CONTAINER, P_BODY, B_NONE, C_P),
    elem(H3, "h3", BLOCK | CONTAINER, P_BODY, B_NONE, C_P),
    elem(H4, "h4", BLOCK | CONTAINER, P_BODY, B_NONE, C_P),
    elem(H5, "h5", BLOCK | CONTAINER, P_BODY, B_NONE, C_P),
    elem(H6, "h6", BLOCK | CONTAINER, P_BODY, B_NONE, C_P),
    elem(HEAD, "head", SPECIAL | CONTAINER, P_HTML, B_HTML, C_NONE),
    elem(HEADER, "header", BLOCK | CONTAINER, P_BODY, B_NONE, C_P),
    elem(HGROUP, "hgroup", BLOCK | CONTAINER, P_BODY, B_NONE, C_P),
    elem(HR, "hr", EMPTY | BLOCK, P_BODY, B_NONE, C_P),
    elem(HTML, "html", SPECIAL | CONTAINER, P_NONE, B_NONE, C_NONE),
    elem(I, "i", INLINE | CONTAINER, P_BODY, B_NONE, C_NONE),
    elem(IFRAME, "iframe", INLINE | CONTAINER, P_BODY, B_NONE, C_NONE),
    elem(IMG, "img", EMPTY | INLINE, P_BODY, B_NONE, C_NONE),
    elem(INPUT, "input", EMPTY | INLINE, P_BODY, B_NONE, C_NONE),
    elem(INS, "ins", INLINE | CONTAINER, P_BODY, B_NONE, C_NONE),
    elem(ISINDEX, "isindex", EMPTY, P_HEAD_BODY, B_NONE, C_NONE),
    elem(KBD, "kbd", INLINE | CONTAINER, P_BODY, B_NONE, C_NONE),
    elem(KEYGEN, "keygen", EMPTY | INLINE, P_BODY, B_NONE, C_NONE),
    elem(LABEL, "label", INLINE | CONTAINER, P_BODY, B_NONE, C_NONE),
    elem(LAYER, "layer", BLOCK | CONTAINER, P_BODY, B_NONE, C_P),
    elem(LEGEND, "legend", INLINE | CONTAINER, P_BODY, B_NONE, C_NONE),
    elem(LI, "li", BLOCK | CONTAINER, P_BODY, B_LIST, C_LI),
    elem(LINK, "link", EMPTY, P_HEAD_BODY, B_NONE, C_NONE),
    elem(LISTING, "listing", BLOCK | CONTAINER, P_BODY, B_NONE, C_P),
    elem(MAIN, "main", BLOCK | CONTAINER, P_BODY, B_NONE, C_P),
    elem(MAP, "map", INLINE | CONTAINER, P_BODY, B_NONE, C_NONE),
    elem(MARK, "mark", INLINE | CONTAINER, P_BODY, B_NONE, C_NONE),
    elem(MARQUEE, "marquee", BLOCK | CONTAINER, P_BODY, B_NONE, C_P),
    elem(MENU, "menu", BLOCK | CONTAINER, P_BODY, B_NONE, C_P),
    elem(META, "meta", SPECIAL | EMPTY, P_HEAD_BODY, B_NONE, C_NONE),
    elem(METER, "meter", INLINE | CONTAINER, P_BODY, B_NONE, C_NONE),
    elem(MULTICOL, "multicol", BLOCK | CONTAINER, P_BODY, B_NONE, C_P),
    elem(NAV, "nav", BLOCK | CONTAINER, P_BODY, B_NONE, C_P),
    elem(NOBR, "nobr", INLINE | CONTAINER, P_BODY, B_BODY, C_NOBR),
    elem(NOEMBED, "noembed", CONTAINER | RAW_TEXT, P_BODY, B_NONE, C_NONE),
    elem(NOFRAMES, "noframes", CONTAINER | RAW_TEXT, P_BODY, B_NONE, C_NONE),
    elem(NOLAYER, "nolayer", CONTAINER, P_BODY, B_NONE, C_NONE),
    elem(NOSCRIPT, "noscript", CONTAINER, P_BODY, B_NONE, C_NONE),
    elem(OBJECT, "object", INLINE | CONTAINER, P_BODY, B_NONE, C_NONE),
    elem(OL, "ol", BLOCK | CONTAINER, P_BODY, B_NONE, C_P),
    elem(OPTGROUP, "optgroup", CONTAINER, P_OPTGROUP, B_SELECT, C_OPTGROUP),
    elem(OPTION, "option", CONTAINER, P_SELECT, B_SELECT, C_OPTION),
    elem(OUTPUT, "output", INLINE | CONTAINER, P_BODY, B_NONE, C_NONE),
    elem(P, "p", BLOCK | CONTAINER, P_BODY, B_P, C_P),
    elem(PARAM, "param", EMPTY, P_OBJECT, B_NONE, C_NONE),
    elem(PLAINTEXT, "plaintext", BLOCK | CONTAINER, P_BODY, B_NONE, C_P),
    elem(PRE, "pre", BLOCK | CONTAINER, P_BODY, B_NONE, C_P),
    elem(PROGRESS, "progress", INLINE | CONTAINER, P_BODY, B_NONE, C_NONE),
    elem(Q, "q", INLINE | CONTAINER, P_BODY, B_NONE, C_NONE),
    elem(RB, "rb", CONTAINER, P_RUBY, B_RUBY, C_RUBY_TEXT),
    elem(RP, "rp", CONTAINER, P_RUBY, B_RUBY, C_RUBY_TEXT),
    elem(RT, "rt", CONTAINER, P_RUBY, B_RUBY, C_RUBY_TEXT),
    elem(RUBY, "ruby", INLINE | CONTAINER, P_BODY, B_NONE, C_NONE),
    elem(S, "s", INLINE | CONTAINER, P_BODY, B_NONE, C_NONE),
    elem(SAMP, "samp", INLINE | CONTAINER, P_BODY, B_NONE, C_NONE),
    elem(SCRIPT, "script", INLINE | CONTAINER | RAW_TEXT, P_HEAD_BODY, B_NONE, C_NONE),
    elem(SECTION, "section", BLOCK | CONTAINER, P_BODY, B_NONE, C_P),
    elem(SELECT, "select", INLINE | CONTAINER, P_BODY, B_BODY, C_SELECT),
    elem(SMALL, "small", INLINE | CONTAINER, P_BODY, B_NONE, C_NONE),
    elem(SOURCE, "source", EMPTY, P_BODY, B_NONE, C_NONE),
    elem(SPACER, "spacer", EMPTY, P_BODY, B_NONE, C_NONE),
    elem(SPAN, "span", INLINE | CONTAINER, P_BODY, B_NONE, C_NONE),
    elem(STRIKE, "strike", INLINE | CONTAINER, P_BODY, B_NONE, C_NONE),
    elem(STRONG, "strong", INLINE | CONTAINER, P_BODY, B_NONE, C_NONE),
    elem(STYLE, "style", CONTAINER | RAW_TEXT, P_HEAD_BODY, B_NONE, C_NONE),
    elem(SUB, "sub", INLINE | CONTAINER, P_BODY, B_NONE, C_NONE),
    elem(SUMMARY, "summary", BLOCK | CONTAINER, P_BODY, B_NONE, C_P),
    elem(SUP, "sup", INLINE | CONTAINER, P_BODY, B_NONE, C_NONE),
    elem(TABLE, "table", BLOCK | CONTAINER | SPECIAL, P_BODY, B_NONE, C_P),
    elem(TBODY, "tbody", SPECIAL | CONTAINER, P_TABLE, B_TABLE, C_SECTION),
    elem(TD, "td", SPECIAL | CONTAINER, P_TR, B_CELL, C_CELL),
    elem(TEXTAREA, "textarea", INLINE | CONTAINER | RCDATA, P_BODY, B_NONE, C_NONE),
    elem(TFOOT, "tfoot", SPECIAL | CONTAINER, P_TABLE, B_TABLE, C_SECTION),
    elem(TH, "th", SPECIAL | CONTAINER, P_TR, B_CELL, C_CELL),
    elem(THEAD, "thead", SPECIAL | CONTAINER, P_TABLE, B_TABLE, C_SECTION),
    elem(TIME, "time", INLINE | CONTAINER, P_BODY, B_NONE, C_NONE),
    elem(TITLE, "title", CONTAINER | RCDATA, P_HEAD_BODY, B_NONE, C_NONE),
    elem(TR, "tr", SPECIAL | CONTAINER, P_ROWGROUP, B_ROW, C_TR),
    elem(TRACK, "track", EMPTY, P_BODY, B_NONE, C_NONE),
    elem(TT, "tt", INLINE | CONTAINER, P_BODY, B_NONE, C_NONE),
    elem(U, "u", INLINE | CONTAINER, P_BODY, B_NONE, C_NONE),
    elem(UL, "ul", BLOCK | CONTAINER, P_BODY, B_NONE, C_P),
    elem(VAR, "var", INLINE | CONTAINER, P_BODY, B_NONE, C_NONE),
    elem(VIDEO, "video", INLINE | CONTAINER, P_BODY, B_NONE, C_NONE),
    elem(WBR, "wbr", EMPTY | INLINE, P_BODY, B_NONE, C_NONE),
    elem(XML, "xml", CONTAINER, P_BODY, B_NONE, C_NONE),
    elem(XMP, "xmp", BLOCK | CONTAINER | RAW_TEXT, P_BODY, B_NONE, C_P),
    elem(UNKNOWN, "", INLINE | CONTAINER, P_BODY, B_NONE, C_NONE),
];

/// Returns the descriptor for a code.
pub fn element(code: u16) -> &'static HtmlElement {
    &ELEMENTS[code as usize]
}

/// The descriptor used for names not in the catalog: an inline container
/// with no placement constraints.
pub fn unknown() -> &'static HtmlElement {
    &ELEMENTS[UNKNOWN as usize]
}

/// Case-insensitive name index, bucketed by name length.
///
/// Lookups first select the bucket for the key's length, then binary-search
/// it, uppercasing the key on the fly; no allocation per lookup.
struct NameIndex {
    buckets: Vec<Vec<&'static HtmlElement>>,
}

impl NameIndex {
    fn build() -> NameIndex {
        let max_len = ELEMENTS
            .iter()
            .map(|e| e.name.len())
            .max()
            .unwrap_or(0);
        let mut buckets: Vec<Vec<&'static HtmlElement>> = vec![Vec::new(); max_len + 1];
        for e in ELEMENTS {
            if e.code != UNKNOWN {
                buckets[e.name.len()].push(e);
            }
        }
        for bucket in &mut buckets {
            bucket.sort_by(|a, b| a.name.cmp(b.name));
        }
        NameIndex { buckets }
    }

    fn lookup(&self, name: &str) -> Option<&'static HtmlElement> {
        let bucket = self.buckets.get(name.len())?;
        bucket
            .binary_search_by(|e| cmp_ignore_case(e.name, name))
            .ok()
            .map(|i| bucket[i])
    }
}

/// Byte-wise comparison of `a` (already lowercase) against `b` folded to
/// lowercase on the fly.
fn cmp_ignore_case(a: &str, b: &str) -> std::cmp::Ordering {
    let a = a.as_bytes();
    let b = b.as_bytes();
    for (&x, &y) in a.iter().zip(b.iter()) {
        let ord = x.cmp(&y.to_ascii_lowercase());
        if ord != std::cmp::Ordering::Equal {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}

static NAME_INDEX: OnceLock<NameIndex> = OnceLock::new();

/// Looks up an element by name, case-insensitively.
pub fn lookup(name: &str) -> Option<&'static HtmlElement> {
    NAME_INDEX.get_or_init(NameIndex::build).lookup(name)
}

/// Looks up an element by name, falling back to the [`unknown`] descriptor.
pub fn lookup_or_unknown(name: &str) -> &'static HtmlElement {
    lookup(name).unwrap_or_else(unknown)
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn codes_index_the_catalog() {
        for (i, e) in ELEMENTS.iter().enumerate() {
            assert_eq!(e.code as usize, i, "misplaced catalog entry {:?}", e.name);
        }
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(lookup("DIV").unwrap().code, DIV);
        assert_eq!(lookup("Td").unwrap().code, TD);
        assert_eq!(lookup("blink").unwrap().code, BLINK);
        assert!(lookup("bogus").is_none());
    }

    #[test]
    fn every_name_resolves_to_itself() {
        for e in ELEMENTS.iter().filter(|e| e.code != UNKNOWN) {
            assert_eq!(lookup(e.name).unwrap().code, e.code, "{:?}", e.name);
            let upper = e.name.to_ascii_uppercase();
            assert_eq!(lookup(&upper).unwrap().code, e.code, "{:?}", upper);
        }
    }

    #[test]
    fn category_flags() {
        assert!(element(BR).is_empty());
        assert!(element(DIV).is_block());
        assert!(element(SPAN).is_inline());
        assert!(element(SCRIPT).is_raw_text());
        assert!(element(TITLE).is_rcdata());
        assert!(element(HTML).is_singleton());
        assert!(element(FRAMESET).is_singleton());
        assert!(!element(DIV).is_singleton());
        assert!(unknown().is_container());
    }

    #[test]
    fn close_on_open_matrix_spot_checks() {
        assert!(element(LI).closes.contains(&LI));
        assert!(element(LI).bounds.contains(&UL));
        assert!(element(DD).closes.contains(&DT));
        assert!(element(TR).closes.contains(&TD));
        assert!(element(TBODY).closes.contains(&THEAD));
        assert!(element(DIV).closes.contains(&P));
        assert!(element(BODY).closes.contains(&HEAD));
    }
}
