//! XML namespace handling
//!
//! This module provides qualified names (QNames) and a scoped prefix
//! context used when resolving prefixed names found in attribute values
//! (for example `type="xs:integer"` inside a schema).

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// XML namespace, bound to the `xml` prefix
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Namespace of `xmlns` declarations
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

/// XML Schema 1.0 namespace, also the schema language URI
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// XML Schema instance namespace (`xsi:nil`, `xsi:schemaLocation`, ...)
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// XML Namespace URI
pub type NamespaceUri = String;

/// Namespace prefix
pub type Prefix = String;

/// Qualified name (QName) - combination of namespace and local name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QName {
    /// Namespace URI (None for no namespace)
    pub namespace: Option<NamespaceUri>,
    /// Local name
    pub local_name: String,
}

impl QName {
    /// Create a new QName
    pub fn new(namespace: Option<impl Into<String>>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.map(|s| s.into()),
            local_name: local_name.into(),
        }
    }

    /// Create a QName without a namespace
    pub fn local(local_name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            local_name: local_name.into(),
        }
    }

    /// Create a QName with a namespace
    pub fn namespaced(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            local_name: local_name.into(),
        }
    }

    /// Whether this name lives in `namespace`
    pub fn is_in(&self, namespace: &str) -> bool {
        self.namespace.as_deref() == Some(namespace)
    }

    /// Whether this name is `{namespace}local_name`
    pub fn matches(&self, namespace: Option<&str>, local_name: &str) -> bool {
        self.namespace.as_deref() == namespace && self.local_name == local_name
    }
}

impl fmt::Display for QName {
    /// Clark notation: `{namespace}local` or just `local`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{}}}{}", ns, self.local_name),
            None => write!(f, "{}", self.local_name),
        }
    }
}

/// `NameStartChar` production of XML 1.0 (fifth edition), colon excluded
fn is_name_start_char(c: char) -> bool {
    matches!(c,
        'A'..='Z' | '_' | 'a'..='z'
        | '\u{C0}'..='\u{D6}' | '\u{D8}'..='\u{F6}' | '\u{F8}'..='\u{2FF}'
        | '\u{370}'..='\u{37D}' | '\u{37F}'..='\u{1FFF}' | '\u{200C}'..='\u{200D}'
        | '\u{2070}'..='\u{218F}' | '\u{2C00}'..='\u{2FEF}' | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}' | '\u{FDF0}'..='\u{FFFD}' | '\u{10000}'..='\u{EFFFF}')
}

/// `NameChar` production of XML 1.0 (fifth edition), colon excluded
fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || matches!(c,
            '-' | '.' | '0'..='9' | '\u{B7}' | '\u{300}'..='\u{36F}' | '\u{203F}'..='\u{2040}')
}

/// Whether `name` matches the XML `NCName` production (a name without colons)
pub fn is_ncname(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if is_name_start_char(c) => chars.all(is_name_char),
        _ => false,
    }
}

/// Whether `name` matches the XML `Name` production
pub fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == ':' || is_name_start_char(c) => chars.all(|c| c == ':' || is_name_char(c)),
        _ => false,
    }
}

/// Whether `name` is a `QName`: an `NCName`, optionally prefixed by another
pub fn is_qname(name: &str) -> bool {
    match name.split_once(':') {
        Some((prefix, local)) => is_ncname(prefix) && is_ncname(local),
        None => is_ncname(name),
    }
}

/// One level of namespace declarations
#[derive(Debug, Clone, Default)]
struct Scope {
    prefixes: HashMap<Prefix, NamespaceUri>,
    /// `Some(None)` records an undeclaration (`xmlns=""`)
    default_namespace: Option<Option<NamespaceUri>>,
}

/// Namespace context for resolving prefixes, with nested scopes
#[derive(Debug, Clone)]
pub struct NamespaceContext {
    scopes: Vec<Scope>,
}

impl NamespaceContext {
    /// Create a context holding only the implicit `xml` binding
    pub fn new() -> Self {
        let mut root = Scope::default();
        root.prefixes
            .insert("xml".to_string(), XML_NAMESPACE.to_string());
        Self { scopes: vec![root] }
    }

    /// Open a nested scope
    pub fn push_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    /// Close the innermost scope; the root scope is never removed
    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Number of open scopes, including the root one
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Add a namespace prefix mapping in the innermost scope
    pub fn add_prefix(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.prefixes.insert(prefix.into(), namespace.into());
        }
    }

    /// Set the default namespace in the innermost scope; an empty URI undeclares it
    pub fn set_default_namespace(&mut self, namespace: impl Into<String>) {
        let namespace = namespace.into();
        if let Some(scope) = self.scopes.last_mut() {
            scope.default_namespace = Some(if namespace.is_empty() {
                None
            } else {
                Some(namespace)
            });
        }
    }

    /// Apply a declaration as stored on an element: `None` prefix is the default namespace
    pub fn declare(&mut self, prefix: Option<&str>, namespace: &str) {
        match prefix {
            Some(p) => self.add_prefix(p, namespace),
            None => self.set_default_namespace(namespace),
        }
    }

    /// Get the namespace for a prefix
    pub fn get_namespace(&self, prefix: &str) -> Option<&str> {
        self.scopes
            .iter()
            .rev()
            .find_map(|s| s.prefixes.get(prefix))
            .map(|s| s.as_str())
    }

    /// Get the default namespace
    pub fn get_default_namespace(&self) -> Option<&str> {
        self.scopes
            .iter()
            .rev()
            .find_map(|s| s.default_namespace.as_ref())
            .and_then(|ns| ns.as_deref())
    }

    /// Resolve a prefixed name to a QName
    pub fn resolve(&self, prefixed_name: &str) -> Result<QName> {
        if let Some((prefix, local)) = prefixed_name.split_once(':') {
            let namespace = self.get_namespace(prefix).ok_or_else(|| {
                Error::configuration(format!("unknown namespace prefix '{}'", prefix))
            })?;
            Ok(QName::namespaced(namespace, local))
        } else {
            Ok(QName::new(self.get_default_namespace(), prefixed_name))
        }
    }
}

impl Default for NamespaceContext {
    fn default() -> Self {
        Self::new()
    }
}
