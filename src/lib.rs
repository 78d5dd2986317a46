//! Permissive streaming HTML reader.
//!
//! ## Description
//!
//! `quick-html` accepts arbitrary byte or character input, well-formed or
//! not, and produces a structured stream of document events: start/end
//! tags, character data, comments, processing instructions, doctype, CDATA.
//! Malformed markup never fails the parse: the scanner recovers, and the
//! tag balancer repairs mismatched, missing and misnested tags against an
//! HTML element model, so that every start element is matched by exactly
//! one end element in correct nesting order.
//!
//! - [`Reader`]: a pull reader over the repaired event stream
//! - [`EventSink`]: a SAX-style callback surface driven by
//!   [`Reader::scan_document`]
//!
//! ## Examples
//!
//! ### Pull loop
//!
//! ```rust
//! use quick_html::{Event, Reader};
//!
//! let mut reader = Reader::from_str("<p>Hello <b>world");
//!
//! let mut text = String::new();
//! loop {
//!     match reader.read_event().unwrap() {
//!         Event::Text(t) => text.push_str(&t),
//!         Event::EndDocument => break,
//!         _ => (),
//!     }
//! }
//! assert_eq!(text, "Hello world");
//! ```
//!
//! ### Repair
//!
//! ```rust
//! use quick_html::{Event, Reader};
//!
//! // missing html/head/body, unclosed <li>, stray </i>: all repaired
//! let mut reader = Reader::from_str("<ul><li>a<li>b</i></ul>");
//! let mut starts = 0;
//! let mut ends = 0;
//! loop {
//!     match reader.read_event().unwrap() {
//!         Event::Start { .. } => starts += 1,
//!         Event::End { .. } => ends += 1,
//!         Event::EndDocument => break,
//!         _ => (),
//!     }
//! }
//! assert_eq!(starts, ends);
//! ```
//!
//! ## Encoding
//!
//! The byte source sniffs BOMs, honors a caller-declared encoding, falls
//! back to Windows-1252, and handles mid-stream `<meta charset>` changes by
//! replaying the recorded prologue bytes under the new encoding. Events are
//! delivered exactly once: nothing is released downstream until the
//! encoding can no longer change.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod balancer;
mod scanner;

pub mod elements;
pub mod encoding;
pub mod entities;
pub mod errors;
pub mod events;
pub mod namespace;
pub mod playback;
pub mod reader;

// reexports
pub use crate::balancer::BalancingListener;
pub use crate::errors::{ConfigError, Error, Result, Warning};
pub use crate::events::{Augmentation, Doctype, Event, Position, QName};
pub use crate::reader::{Config, EventSink, NameCase, Reader};
