//! A module for wrappers that decode bytes into characters.
//!
//! The document encoding is established in up to three steps: BOM sniffing
//! on the raw byte stream, the configured default, and a possible mid-stream
//! change triggered by a `<meta charset>` tag. The [`Decoder`] here is
//! incremental and swappable so the scanner can keep feeding it chunks
//! across all three.

use encoding_rs::{CoderResult, Encoding, UTF_16BE, UTF_16LE, UTF_8, WINDOWS_1252};

/// Unicode "byte order mark" encoded as UTF-8
pub(crate) const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
/// Unicode "byte order mark" encoded as UTF-16 with little-endian byte order
pub(crate) const UTF16_LE_BOM: &[u8] = &[0xFF, 0xFE];
/// Unicode "byte order mark" encoded as UTF-16 with big-endian byte order
pub(crate) const UTF16_BE_BOM: &[u8] = &[0xFE, 0xFF];

/// Checks the given prefix of a byte stream for a byte order mark.
///
/// Returns the detected encoding and the BOM length in bytes:
///
/// | Bytes     | Detected encoding | Consumed |
/// |-----------|-------------------|----------|
/// |`EF BB BF` | UTF-8             | 3 bytes  |
/// |`FF FE`    | UTF-16LE          | 2 bytes  |
/// |`FE FF`    | UTF-16BE          | 2 bytes  |
pub fn detect_bom(bytes: &[u8]) -> Option<(&'static Encoding, usize)> {
    if bytes.starts_with(UTF8_BOM) {
        Some((UTF_8, 3))
    } else if bytes.starts_with(UTF16_LE_BOM) {
        Some((UTF_16LE, 2))
    } else if bytes.starts_with(UTF16_BE_BOM) {
        Some((UTF_16BE, 2))
    } else {
        None
    }
}

/// Looks up an encoding by its IANA label, as written in a `charset`
/// attribute. Whitespace and quotes around the label are tolerated.
pub fn encoding_for_label(label: &str) -> Option<&'static Encoding> {
    let label = label.trim_matches(|c: char| c.is_ascii_whitespace() || c == '"' || c == '\'');
    Encoding::for_label(label.as_bytes())
}

/// The fallback encoding when nothing is detected or declared.
///
/// HTML content without any encoding information is overwhelmingly
/// Windows-1252, and every encoding label a document is likely to carry for
/// "plain ASCII" maps here as well.
pub fn default_encoding() -> &'static Encoding {
    WINDOWS_1252
}

/// Encoding families for the replay decision.
///
/// A change of encoding within the ASCII-superset family can be honored by
/// replaying the recorded bytes; a change that crosses into the UTF-16
/// family cannot (the `<meta>` tag that declared it was readable, which
/// disproves the declaration).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncodingFamily {
    /// US-ASCII supersets: UTF-8, the ISO-8859 and Windows-125x ranges, …
    AsciiSuperset,
    /// UTF-16 in either byte order.
    Utf16,
    /// Everything else (EBCDIC-like or escape-coded encodings).
    Other,
}

/// Classifies an encoding into its family.
pub fn family(encoding: &'static Encoding) -> EncodingFamily {
    if encoding == UTF_16LE || encoding == UTF_16BE {
        EncodingFamily::Utf16
    } else if encoding.is_ascii_compatible() {
        EncodingFamily::AsciiSuperset
    } else {
        EncodingFamily::Other
    }
}

/// What to do about a `<meta>`-declared encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetaDecision {
    /// Declared encoding is the current one; nothing changes.
    Keep,
    /// Different encoding within the ASCII-superset family: replay the
    /// recorded bytes and re-decode from the beginning.
    Replay,
    /// The declaration cannot be honored (crosses the UTF-16 family
    /// boundary); ignore it with a warning.
    Ignore,
}

/// Decides how to treat a declared encoding relative to the current one.
///
/// The decision is symmetric in the family table: both sides in the
/// ASCII-superset family permits a replay, anything crossing into UTF-16
/// does not.
pub fn meta_decision(current: &'static Encoding, declared: &'static Encoding) -> MetaDecision {
    if current == declared {
        return MetaDecision::Keep;
    }
    match (family(current), family(declared)) {
        (EncodingFamily::AsciiSuperset, EncodingFamily::AsciiSuperset) => MetaDecision::Replay,
        _ => MetaDecision::Ignore,
    }
}

/// An incremental decoder from bytes to UTF-8 text.
///
/// Malformed sequences are replaced with `U+FFFD REPLACEMENT CHARACTER`;
/// a permissive parser never fails on bad bytes, only on I/O.
pub struct Decoder {
    encoding: &'static Encoding,
    inner: encoding_rs::Decoder,
}

impl Decoder {
    /// Creates a decoder for the given encoding.
    ///
    /// BOM handling is disabled: the byte source strips the BOM during
    /// detection, before any bytes reach the decoder.
    pub fn new(encoding: &'static Encoding) -> Decoder {
        Decoder {
            encoding,
            inner: encoding.new_decoder_without_bom_handling(),
        }
    }

    /// The encoding this decoder reads.
    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// Decodes `bytes` into `out`, replacing malformed sequences.
    ///
    /// Returns the number of input bytes consumed. With `last == false` the
    /// decoder may leave an incomplete trailing sequence unconsumed; feed the
    /// remainder together with the next chunk.
    pub fn decode_to_string(&mut self, bytes: &[u8], out: &mut String, last: bool) -> usize {
        let mut total_read = 0;
        loop {
            let needed = self
                .inner
                .max_utf8_buffer_length(bytes.len() - total_read)
                .unwrap_or(8 * 1024);
            out.reserve(needed.max(4));
            let (result, read, _replaced) =
                self.inner
                    .decode_to_string(&bytes[total_read..], out, last);
            total_read += read;
            match result {
                CoderResult::InputEmpty => return total_read,
                CoderResult::OutputFull => continue,
            }
        }
    }
}

impl std::fmt::Debug for Decoder {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Decoder")
            .field("encoding", &self.encoding.name())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn bom_detection() {
        assert_eq!(detect_bom(b"\xEF\xBB\xBFx"), Some((UTF_8, 3)));
        assert_eq!(detect_bom(b"\xFF\xFEx"), Some((UTF_16LE, 2)));
        assert_eq!(detect_bom(b"\xFE\xFFx"), Some((UTF_16BE, 2)));
        assert_eq!(detect_bom(b"<html>"), None);
        assert_eq!(detect_bom(b"\xEF\xBB"), None);
    }

    #[test]
    fn label_lookup_tolerates_quotes() {
        assert_eq!(encoding_for_label(" \"UTF-8\" "), Some(UTF_8));
        assert_eq!(encoding_for_label("iso-8859-1"), Some(WINDOWS_1252));
        assert_eq!(encoding_for_label("no-such-charset"), None);
    }

    #[test]
    fn families() {
        assert_eq!(family(UTF_8), EncodingFamily::AsciiSuperset);
        assert_eq!(family(WINDOWS_1252), EncodingFamily::AsciiSuperset);
        assert_eq!(family(UTF_16LE), EncodingFamily::Utf16);
        assert_eq!(family(UTF_16BE), EncodingFamily::Utf16);
    }

    #[test]
    fn meta_decisions() {
        assert_eq!(meta_decision(UTF_8, UTF_8), MetaDecision::Keep);
        assert_eq!(meta_decision(WINDOWS_1252, UTF_8), MetaDecision::Replay);
        assert_eq!(meta_decision(UTF_8, WINDOWS_1252), MetaDecision::Replay);
        assert_eq!(meta_decision(UTF_8, UTF_16LE), MetaDecision::Ignore);
        assert_eq!(meta_decision(UTF_16BE, UTF_8), MetaDecision::Ignore);
    }

    #[test]
    fn incremental_decode_keeps_partial_sequences() {
        let mut d = Decoder::new(UTF_8);
        let bytes = "héllo".as_bytes();
        let mut out = String::new();
        // split in the middle of the two-byte é
        let read = d.decode_to_string(&bytes[..2], &mut out, false);
        assert_eq!(read, 2);
        let _ = d.decode_to_string(&bytes[2..], &mut out, true);
        assert_eq!(out, "héllo");
    }

    #[test]
    fn replacement_on_malformed() {
        let mut d = Decoder::new(UTF_8);
        let mut out = String::new();
        d.decode_to_string(b"a\xFFb", &mut out, true);
        assert_eq!(out, "a\u{FFFD}b");
    }
}
