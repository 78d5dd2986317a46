//! A byte source that can re-read its own history.
//!
//! A mid-stream encoding change (`<meta charset>`) requires re-decoding the
//! document from the first byte. [`PlaybackStream`] records bytes as they are
//! read so the scanner can request a replay; once the prologue is past the
//! point where a change can occur, the recording is dropped and reads pass
//! straight through.

use std::io::{self, Read};

use encoding_rs::Encoding;

use crate::encoding::detect_bom;
use crate::errors::{Error, Result};

/// Replay mode of the stream.
///
/// Transitions: `Recording` → (`Playback` | `Cleared`); `Playback` →
/// `Cleared` automatically when the replay is exhausted. `Cleared` is
/// terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Recording,
    Playback,
    Cleared,
}

/// A buffered byte stream with BOM sniffing and record/replay.
pub struct PlaybackStream<R> {
    inner: R,
    mode: Mode,
    /// Recorded bytes. `pos` is the next unread index; bytes past `pos` are
    /// pending re-reads (BOM pushback or an active replay).
    buf: Vec<u8>,
    pos: usize,
    detected: bool,
}

impl<R: Read> PlaybackStream<R> {
    /// Wraps a byte stream, starting in recording mode.
    pub fn new(inner: R) -> PlaybackStream<R> {
        PlaybackStream {
            inner,
            mode: Mode::Recording,
            buf: Vec::new(),
            pos: 0,
            detected: false,
        }
    }

    /// Peeks the first bytes of the stream for a byte order mark.
    ///
    /// On a match the BOM is consumed (it is excluded from any later replay)
    /// and the matching encoding is returned. On no match all peeked bytes
    /// are pushed back, so the next read returns them unchanged.
    ///
    /// Calling this a second time fails with
    /// [`Error::EncodingAlreadyDetected`].
    pub fn detect_encoding(&mut self) -> Result<Option<&'static Encoding>> {
        if self.detected {
            return Err(Error::EncodingAlreadyDetected);
        }
        self.detected = true;

        let start = self.pos;
        let mut peeked = [0u8; 3];
        let mut n = 0;
        while n < 3 {
            match self.read(&mut peeked[n..n + 1])? {
                0 => break,
                _ => n += 1,
            }
        }

        match detect_bom(&peeked[..n]) {
            Some((encoding, bom_len)) => {
                // drop the BOM bytes from the recording, push back the rest
                self.buf.drain(start..start + bom_len);
                self.pos = start;
                Ok(Some(encoding))
            }
            None => {
                self.pos = start;
                Ok(None)
            }
        }
    }

    /// Switches to playback: subsequent reads return the recorded bytes from
    /// position 0. When the recording is exhausted the stream transitions to
    /// cleared and reads continue from the underlying source.
    ///
    /// Fails with [`Error::ReplayUnavailable`] unless the stream is
    /// recording.
    pub fn playback(&mut self) -> Result<()> {
        match self.mode {
            Mode::Recording => {
                self.mode = Mode::Playback;
                self.pos = 0;
                Ok(())
            }
            Mode::Playback | Mode::Cleared => Err(Error::ReplayUnavailable),
        }
    }

    /// Drops the recording.
    ///
    /// During recording this releases the buffer (any pushed-back bytes are
    /// kept and served first) and enters cleared mode. During playback it is
    /// a no-op: the replay must finish first. Cleared is terminal.
    pub fn clear(&mut self) {
        if self.mode == Mode::Recording {
            self.buf.drain(..self.pos);
            self.pos = 0;
            self.mode = Mode::Cleared;
        }
    }

    /// `true` while the stream still records and a replay is possible.
    pub fn can_replay(&self) -> bool {
        self.mode == Mode::Recording
    }

    /// `true` while a replay is being served.
    pub fn in_playback(&self) -> bool {
        self.mode == Mode::Playback
    }
}

impl<R: Read> Read for PlaybackStream<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }
        // serve pending bytes (pushback or replay) before touching the source
        if self.pos < self.buf.len() {
            let n = (self.buf.len() - self.pos).min(out.len());
            out[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
            self.pos += n;
            if self.pos == self.buf.len() && self.mode != Mode::Recording {
                self.buf.clear();
                self.pos = 0;
                self.mode = Mode::Cleared;
            }
            return Ok(n);
        }
        match self.mode {
            Mode::Recording => {
                let n = self.inner.read(out)?;
                self.buf.extend_from_slice(&out[..n]);
                self.pos = self.buf.len();
                Ok(n)
            }
            Mode::Playback | Mode::Cleared => {
                self.mode = Mode::Cleared;
                self.inner.read(out)
            }
        }
    }
}
