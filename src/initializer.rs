//! One-call entry points for building parsers and parsing documents
//!
//! Each function creates its factory from scratch. The provider a call
//! names is looked up in the shared registry and never becomes a default
//! for later calls.
//!
//! ```rust
//! use xmlfactory::initializer;
//!
//! let doc = initializer::new_document_from_str("<root><child>value</child></root>")?;
//! assert_eq!(doc.root().local_name(), "root");
//! # Ok::<(), xmlfactory::Error>(())
//! ```

use crate::documents::Document;
use crate::error::Result;
use crate::factory::{
    BuilderFactory, DocumentBuilder, DomSource, ParserConfiguration, XML_SCHEMA_LANGUAGE,
};
use crate::handlers::ErrorHandler;
use crate::locations::Location;
use crate::providers::SCHEMA_PROVIDER;
use std::path::Path;

/// Create a factory from explicit settings
///
/// `implementation` names a provider of the shared registry; `None`
/// selects the default one. Nothing is parsed or loaded yet.
pub fn new_builder_factory(
    schema_source: Option<Location>,
    schema_language: Option<&str>,
    implementation: Option<&str>,
    namespace_aware: bool,
    validating: bool,
) -> Result<BuilderFactory> {
    let config = ParserConfiguration {
        schema_source,
        schema_language: schema_language.map(str::to_string),
        implementation: implementation.map(str::to_string),
        namespace_aware,
        validating,
        ..ParserConfiguration::default()
    };
    BuilderFactory::new(config)
}

/// Create a namespace-aware, validating factory for an XML Schema
pub fn new_builder_factory_for_schema(schema_source: impl Into<Location>) -> Result<BuilderFactory> {
    new_builder_factory(
        Some(schema_source.into()),
        Some(XML_SCHEMA_LANGUAGE),
        Some(SCHEMA_PROVIDER),
        true,
        true,
    )
}

/// Create a builder validating against an XML Schema
pub fn new_document_builder_for_schema(schema_source: impl Into<Location>) -> Result<DocumentBuilder> {
    new_builder_factory_for_schema(schema_source)?.new_document_builder()
}

/// Create a namespace-aware, non-validating builder with the default provider
pub fn new_document_builder() -> Result<DocumentBuilder> {
    new_builder_factory(None, None, None, true, false)?.new_document_builder()
}

/// Parse a file without validation
pub fn new_document_from_file(path: impl AsRef<Path>) -> Result<Document> {
    new_document_builder()?.parse_file(path)
}

/// Parse a string without validation
pub fn new_document_from_str(xml: &str) -> Result<Document> {
    new_document_builder()?.parse_str(xml)
}

/// Parse and validate a file against `schema`
///
/// Warnings and validation errors go to `handler`; the parse goes on
/// unless the handler returns an error. Syntax errors are reported to the
/// handler and always end the parse.
pub fn parse(
    path: impl AsRef<Path>,
    schema: impl Into<Location>,
    handler: &mut dyn ErrorHandler,
) -> Result<Document> {
    new_document_builder_for_schema(schema)?.parse_file_with_handler(path, handler)
}

/// Like [`parse`], wrapping the document with its path as system id
pub fn new_dom_source(
    path: impl AsRef<Path>,
    schema: impl Into<Location>,
    handler: &mut dyn ErrorHandler,
) -> Result<DomSource> {
    let path = path.as_ref();
    let document = parse(path, schema, handler)?;
    Ok(DomSource::new(
        document,
        Some(path.to_string_lossy().to_string()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{DEFAULT_PROVIDER, ROXMLTREE_PROVIDER};

    #[test]
    fn test_new_builder_factory() {
        let factory = new_builder_factory(None, None, Some(ROXMLTREE_PROVIDER), true, false).unwrap();
        assert_eq!(factory.provider_name(), ROXMLTREE_PROVIDER);
        assert!(factory.is_namespace_aware());
        assert!(!factory.is_validating());
    }

    #[test]
    fn test_factory_for_schema() {
        let factory = new_builder_factory_for_schema(Location::text("<x/>")).unwrap();
        assert_eq!(factory.provider_name(), SCHEMA_PROVIDER);
        assert_eq!(factory.schema_language(), Some(XML_SCHEMA_LANGUAGE));
        assert!(factory.is_namespace_aware());
        assert!(factory.is_validating());
    }

    #[test]
    fn test_named_provider_does_not_leak() {
        let named = new_builder_factory(None, None, Some(ROXMLTREE_PROVIDER), true, false)
            .unwrap()
            .new_document_builder()
            .unwrap();
        assert_eq!(named.provider_name(), ROXMLTREE_PROVIDER);

        let fresh = new_document_builder().unwrap();
        assert_eq!(fresh.provider_name(), DEFAULT_PROVIDER);
        assert!(fresh.is_namespace_aware());
        assert!(!fresh.is_validating());
    }

    #[test]
    fn test_new_document_from_str() {
        let doc = new_document_from_str("<root><child>value</child></root>").unwrap();
        let children: Vec<_> = doc.root().child_elements().collect();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].local_name(), "child");
        assert_eq!(children[0].text_content(), "value");

        assert!(new_document_from_str("<root><child></root>").unwrap_err().is_syntax());
    }
}
