//! Error types for xmlfactory
//!
//! Every failure is one of three kinds: the requested parser configuration
//! cannot be satisfied, the input is not acceptable XML (syntax, schema
//! validity or resource limits), or the input could not be read.

use std::fmt;
use thiserror::Error;

/// Result type alias using xmlfactory Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for xmlfactory operations
#[derive(Error, Debug)]
pub enum Error {
    /// The requested factory/builder configuration cannot be satisfied
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// The input is malformed, invalid against the schema, or exceeds a limit
    #[error("{0}")]
    Parse(#[from] ParseError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration(ConfigurationError::new(message))
    }

    /// True for configuration failures
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }

    /// True for well-formedness failures
    pub fn is_syntax(&self) -> bool {
        matches!(self, Error::Parse(e) if e.kind == ParseErrorKind::Syntax)
    }

    /// True for schema validity failures
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Parse(e) if e.kind == ParseErrorKind::Validation)
    }

    /// True for I/O failures
    pub fn is_io(&self) -> bool {
        matches!(self, Error::Io(_))
    }

    /// The parse error, if this is one
    pub fn as_parse_error(&self) -> Option<&ParseError> {
        match self {
            Error::Parse(e) => Some(e),
            _ => None,
        }
    }
}

/// Why a builder could not be configured
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ConfigurationError {
    /// Error message
    pub message: String,
}

impl ConfigurationError {
    /// Create a new configuration error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Category of a [`ParseError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseErrorKind {
    /// The input is not well-formed XML
    Syntax,
    /// The document violates the attached schema
    Validation,
    /// A resource limit was exceeded while reading the input
    LimitExceeded,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseErrorKind::Syntax => write!(f, "syntax error"),
            ParseErrorKind::Validation => write!(f, "validation error"),
            ParseErrorKind::LimitExceeded => write!(f, "limit exceeded"),
        }
    }
}

/// Line and column (both 1-based) in the parsed text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextPosition {
    /// Line number
    pub line: usize,
    /// Column number, in characters
    pub column: usize,
}

impl TextPosition {
    /// Create a new position
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// Compute the position of a byte offset in `text`
    pub fn from_offset(text: &str, offset: usize) -> Self {
        let mut offset = offset.min(text.len());
        while !text.is_char_boundary(offset) {
            offset -= 1;
        }
        let before = &text[..offset];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let column = before[line_start..].chars().count() + 1;
        Self { line, column }
    }
}

impl fmt::Display for TextPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A diagnostic raised while parsing or validating a document
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    /// Error category
    pub kind: ParseErrorKind,
    /// Error message
    pub message: String,
    /// Position in the input
    pub location: Option<TextPosition>,
    /// Path to the element concerned, e.g. `/root/child[1]`
    pub path: Option<String>,
    /// Identifier of the input (usually its file path)
    pub system_id: Option<String>,
}

impl ParseError {
    /// Create a new parse error
    pub fn new(kind: ParseErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            location: None,
            path: None,
            system_id: None,
        }
    }

    /// Create a well-formedness error
    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(ParseErrorKind::Syntax, message)
    }

    /// Create a schema validity error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ParseErrorKind::Validation, message)
    }

    /// Create a limit error
    pub fn limit(message: impl Into<String>) -> Self {
        Self::new(ParseErrorKind::LimitExceeded, message)
    }

    /// Set the location
    pub fn with_location(mut self, location: TextPosition) -> Self {
        self.location = Some(location);
        self
    }

    /// Set the element path
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the system id, keeping one that is already present
    pub fn with_system_id(mut self, system_id: impl Into<String>) -> Self {
        if self.system_id.is_none() {
            self.system_id = Some(system_id.into());
        }
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;

        match (&self.system_id, &self.location) {
            (Some(id), Some(loc)) => write!(f, " ({}:{})", id, loc)?,
            (Some(id), None) => write!(f, " ({})", id)?,
            (None, Some(loc)) => write!(f, " (at {})", loc)?,
            (None, None) => {}
        }

        if let Some(ref path) = self.path {
            write!(f, "\n\nPath: {}", path)?;
        }

        Ok(())
    }
}

impl std::error::Error for ParseError {}
