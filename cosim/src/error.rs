//! Error codes and the library-wide error type.
//!
//! Every failure emitted by a slave or by the engine carries an
//! [`ErrorCode`], which is either one of the library-specific conditions
//! enumerated by [`Errc`] or a generic I/O condition. The code may be
//! complemented by a free-form message which is appended to, and never
//! replaces, the standard description of the code.
//!
//! ```
//! use cosim::{Errc, Error};
//!
//! let err = Error::with_message(Errc::ModelError, "division by zero in `pendulum`");
//!
//! assert_eq!(err.code(), Errc::ModelError.into());
//! assert_eq!(
//!     err.to_string(),
//!     "the model reported an error: division by zero in `pendulum`"
//! );
//! ```
use std::error;
use std::fmt;
use std::io;

/// Error conditions specific to this library.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Errc {
    /// No error.
    Success = 0,
    /// An input file is corrupted or invalid.
    BadFile,
    /// The requested feature (e.g. an FMI feature) is unsupported.
    UnsupportedFeature,
    /// Error loading dynamic library (e.g. model code).
    DlLoadError,
    /// The model reported an error.
    ModelError,
    /// ZIP file error.
    ZipError,
}

/// Standard descriptions, indexed by the `Errc` discriminant.
static DESCRIPTIONS: [&str; 6] = [
    "success",
    "bad file",
    "unsupported feature",
    "error loading dynamic library",
    "the model reported an error",
    "ZIP file error",
];

impl Errc {
    /// All library-specific conditions, including `Success`.
    pub const ALL: [Errc; 6] = [
        Errc::Success,
        Errc::BadFile,
        Errc::UnsupportedFeature,
        Errc::DlLoadError,
        Errc::ModelError,
        Errc::ZipError,
    ];

    /// Returns the standard description of the condition.
    pub fn description(self) -> &'static str {
        DESCRIPTIONS[self as usize]
    }

    /// Returns the snake-case identifier of the condition, e.g.
    /// `"dl_load_error"`.
    pub fn name(self) -> &'static str {
        match self {
            Errc::Success => "success",
            Errc::BadFile => "bad_file",
            Errc::UnsupportedFeature => "unsupported_feature",
            Errc::DlLoadError => "dl_load_error",
            Errc::ModelError => "model_error",
            Errc::ZipError => "zip_error",
        }
    }
}

impl fmt::Display for Errc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// The code carried by an [`Error`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// A library-specific condition.
    Cosim(Errc),
    /// A generic I/O condition.
    Io(io::ErrorKind),
}

impl ErrorCode {
    /// Returns `true` if the code denotes the absence of error.
    pub fn is_success(self) -> bool {
        self == ErrorCode::Cosim(Errc::Success)
    }
}

impl From<Errc> for ErrorCode {
    fn from(errc: Errc) -> Self {
        ErrorCode::Cosim(errc)
    }
}

impl From<io::ErrorKind> for ErrorCode {
    fn from(kind: io::ErrorKind) -> Self {
        ErrorCode::Io(kind)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::Cosim(errc) => fmt::Display::fmt(errc, f),
            ErrorCode::Io(kind) => fmt::Display::fmt(kind, f),
        }
    }
}

/// An error reported by a slave or by the engine.
///
/// The `Display` implementation always contains the standard description of
/// the code; an additional message, if any, follows it after a colon.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Error {
    code: ErrorCode,
    message: Option<String>,
}

impl Error {
    /// Creates an error with the given code and no additional message.
    pub fn new(code: impl Into<ErrorCode>) -> Self {
        Self {
            code: code.into(),
            message: None,
        }
    }

    /// Creates an error with the given code and an additional message.
    pub fn with_message(code: impl Into<ErrorCode>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: Some(message.into()),
        }
    }

    /// Returns the error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Returns the additional message, if any.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}: {}", self.code, message),
            None => fmt::Display::fmt(&self.code, f),
        }
    }
}

impl error::Error for Error {}

impl From<Errc> for Error {
    fn from(errc: Errc) -> Self {
        Error::new(errc)
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::with_message(e.kind(), e.to_string())
    }
}
