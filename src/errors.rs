//! Error management module

use std::fmt;
use std::io;

use crate::events::Position;

/// An error raised while parsing HTML.
///
/// Malformed markup is never an error: the scanner and the balancer always
/// recover and keep producing events. Only conditions that make it impossible
/// to continue reading the input at all are reported here.
#[derive(Debug)]
pub enum Error {
    /// An error originating from reading the underlying byte stream.
    Io(io::Error),
    /// A mid-stream encoding change required replaying already-consumed
    /// bytes, but the recording was no longer available.
    ReplayUnavailable,
    /// [`PlaybackStream::detect_encoding`] was called more than once.
    ///
    /// [`PlaybackStream::detect_encoding`]: crate::playback::PlaybackStream::detect_encoding
    EncodingAlreadyDetected,
    /// An invalid configuration call.
    Config(ConfigError),
}

/// An error raised by the string-keyed configuration surface.
///
/// The typed [`Config`] fields cannot produce these; only the
/// [`set_feature`]/[`set_property`] compatibility setters do.
///
/// [`Config`]: crate::reader::Config
/// [`set_feature`]: crate::reader::Config::set_feature
/// [`set_property`]: crate::reader::Config::set_property
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// The feature identifier is not recognized.
    UnknownFeature(String),
    /// The property identifier is not recognized.
    UnknownProperty(String),
    /// The property value is not one of the enumerated values.
    InvalidValue {
        /// The property identifier the value was supplied for.
        property: String,
        /// The rejected value.
        value: String,
    },
}

/// A specialized `Result` type where the error is hard-wired to [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::ReplayUnavailable => {
                write!(
                    f,
                    "encoding change requires replay, but the byte recording was cleared"
                )
            }
            Error::EncodingAlreadyDetected => {
                write!(f, "encoding detection was already performed on this stream")
            }
            Error::Config(e) => write!(f, "{}", e),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::UnknownFeature(id) => write!(f, "unknown feature '{}'", id),
            ConfigError::UnknownProperty(id) => write!(f, "unknown property '{}'", id),
            ConfigError::InvalidValue { property, value } => {
                write!(f, "invalid value '{}' for property '{}'", value, property)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<io::Error> for Error {
    /// Creates a new `Error::Io` from the given error
    #[inline]
    fn from(error: io::Error) -> Error {
        Error::Io(error)
    }
}

impl From<ConfigError> for Error {
    #[inline]
    fn from(error: ConfigError) -> Error {
        Error::Config(error)
    }
}

/// A recovered malformation, reported through the warning observer when the
/// `report_errors` config flag is set.
///
/// Warnings never abort the parse; the event carrying the best-effort
/// interpretation of the malformed construct is emitted regardless.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Warning {
    /// Stable identifier of the malformation kind, e.g. `"unclosed-comment"`.
    pub code: &'static str,
    /// Human-readable description.
    pub message: String,
    /// Location of the offending construct in the source.
    pub position: Position,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} at {}:{}: {}",
            self.code, self.position.line, self.position.column, self.message
        )
    }
}
