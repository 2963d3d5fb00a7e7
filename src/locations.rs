//! Resource location resolution
//!
//! This module describes where a schema or XML document comes from
//! (file path, URL, or inline text) and resolves relative references
//! such as `xs:include/@schemaLocation` against it.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use url::Url;

/// Resource location - can be a URL, file path, or inline text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    /// File system path
    Path(PathBuf),
    /// URL (http, https, ftp, etc.)
    Url(Url),
    /// Inline document text
    Text(String),
}

impl FromStr for Location {
    type Err = Error;

    /// Auto-detect the kind of location: markup is inline text, anything
    /// with a non-file URL scheme is a URL, and the rest is a path
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim_start().starts_with('<') {
            return Ok(Location::Text(s.to_string()));
        }

        if let Ok(url) = Url::parse(s) {
            if url.scheme() == "file" {
                if let Ok(path) = url.to_file_path() {
                    return Ok(Location::Path(path));
                }
            } else if url.scheme().len() > 1 {
                // Single letter schemes are Windows drive letters
                return Ok(Location::Url(url));
            }
        }

        Ok(Location::Path(PathBuf::from(s)))
    }
}

impl Location {
    /// Location of an inline document
    pub fn text(text: impl Into<String>) -> Self {
        Location::Text(text.into())
    }

    /// Identifier used in diagnostics; inline text has none
    pub fn system_id(&self) -> Option<String> {
        match self {
            Location::Path(p) => Some(p.to_string_lossy().to_string()),
            Location::Url(u) => Some(u.to_string()),
            Location::Text(_) => None,
        }
    }

    /// Check if this is a remote location (URL)
    pub fn is_remote(&self) -> bool {
        matches!(self, Location::Url(_))
    }

    /// Check if this is a local file
    pub fn is_file(&self) -> bool {
        matches!(self, Location::Path(_))
    }

    /// Resolve a reference found inside the resource at this location
    pub fn resolve(&self, reference: &str) -> Location {
        if let Ok(url) = Url::parse(reference) {
            if url.scheme().len() > 1 && url.scheme() != "file" {
                return Location::Url(url);
            }
        }
        match self {
            Location::Path(base) => {
                let reference = Path::new(reference);
                if reference.is_absolute() {
                    Location::Path(reference.to_path_buf())
                } else {
                    let dir = base.parent().unwrap_or_else(|| Path::new(""));
                    Location::Path(dir.join(reference))
                }
            }
            Location::Url(base) => match base.join(reference) {
                Ok(url) => Location::Url(url),
                Err(_) => Location::Path(PathBuf::from(reference)),
            },
            Location::Text(_) => Location::Path(PathBuf::from(reference)),
        }
    }
}

impl From<PathBuf> for Location {
    fn from(path: PathBuf) -> Self {
        Location::Path(path)
    }
}

impl From<&Path> for Location {
    fn from(path: &Path) -> Self {
        Location::Path(path.to_path_buf())
    }
}

impl From<Url> for Location {
    fn from(url: Url) -> Self {
        Location::Url(url)
    }
}
