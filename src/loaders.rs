//! Resource loading utilities
//!
//! This module reads schemas and XML documents from a [`Location`],
//! enforcing the size limit before any parsing happens.

use crate::error::{Error, ParseError, Result};
use crate::limits::Limits;
use crate::locations::Location;
use std::fs;
use std::path::Path;

/// Resource loader for schemas and documents
#[derive(Debug, Clone)]
pub struct Loader {
    /// Resource limits
    limits: Limits,
}

impl Loader {
    /// Create a new loader with default settings
    pub fn new() -> Self {
        Self {
            limits: Limits::default(),
        }
    }

    /// Set the limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Load a resource as bytes
    ///
    /// Missing or unreadable files surface as [`Error::Io`]. URLs are not
    /// fetched; they fail with a configuration error.
    pub fn load_bytes(&self, location: &Location) -> Result<Vec<u8>> {
        match location {
            Location::Path(path) => self.load_file(path),
            Location::Url(url) => Err(Error::configuration(format!(
                "remote resources are not supported: {}",
                url
            ))),
            Location::Text(s) => {
                self.limits.check_xml_size(s.len())?;
                Ok(s.as_bytes().to_vec())
            }
        }
    }

    /// Load a resource as a string
    pub fn load(&self, location: &Location) -> Result<String> {
        let bytes = self.load_bytes(location)?;
        decode_utf8(bytes).map_err(|e| match location.system_id() {
            Some(id) => ParseError::syntax(e.message).with_system_id(id).into(),
            None => e.into(),
        })
    }

    fn load_file(&self, path: &Path) -> Result<Vec<u8>> {
        // Reject oversized files before reading them into memory
        let metadata = fs::metadata(path)?;
        self.limits.check_xml_size(metadata.len() as usize).map_err(|e| {
            Error::Parse(e.with_system_id(path.to_string_lossy()))
        })?;
        Ok(fs::read(path)?)
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode document bytes as UTF-8, dropping a byte order mark
pub fn decode_utf8(bytes: Vec<u8>) -> std::result::Result<String, ParseError> {
    let bytes = match bytes.strip_prefix(b"\xEF\xBB\xBF") {
        Some(rest) => rest.to_vec(),
        None => bytes,
    };
    String::from_utf8(bytes).map_err(|e| {
        ParseError::syntax(format!(
            "input is not valid UTF-8 (invalid byte sequence at offset {})",
            e.utf8_error().valid_up_to()
        ))
    })
}
