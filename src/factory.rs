//! Builder factories and document builders
//!
//! A [`BuilderFactory`] holds a [`ParserConfiguration`] with its provider
//! already resolved. [`BuilderFactory::new_document_builder`] checks that
//! the configuration can be satisfied and compiles the schema, if any; the
//! resulting [`DocumentBuilder`] parses documents and validates them.
//!
//! Nothing is cached: every factory resolves its provider and every builder
//! compiles its schema again.

use crate::documents::Document;
use crate::error::{Error, Result};
use crate::handlers::{DefaultErrorHandler, ErrorHandler};
use crate::limits::Limits;
use crate::loaders::{decode_utf8, Loader};
use crate::locations::Location;
use crate::namespaces::XSD_NAMESPACE;
use crate::providers::{Feature, ParseOptions, ParserProvider, ProviderRegistry};
use crate::validators::Schema;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// Schema language URI of XML Schema 1.0
pub const XML_SCHEMA_LANGUAGE: &str = XSD_NAMESPACE;

/// Settings a [`BuilderFactory`] is created from
///
/// Absent fields mean "not requested": no schema, no schema language, the
/// registry's default provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfiguration {
    /// Schema document used for validation
    pub schema_source: Option<Location>,
    /// Schema language URI
    pub schema_language: Option<String>,
    /// Name of the parser provider
    pub implementation: Option<String>,
    /// Resolve namespace prefixes
    pub namespace_aware: bool,
    /// Validate parsed documents against the schema
    pub validating: bool,
    /// Resource limits
    pub limits: Limits,
}

impl ParserConfiguration {
    /// Empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the schema source
    pub fn with_schema_source(mut self, source: impl Into<Location>) -> Self {
        self.schema_source = Some(source.into());
        self
    }

    /// Set the schema language URI
    pub fn with_schema_language(mut self, language: impl Into<String>) -> Self {
        self.schema_language = Some(language.into());
        self
    }

    /// Name the parser provider
    pub fn with_implementation(mut self, name: impl Into<String>) -> Self {
        self.implementation = Some(name.into());
        self
    }

    /// Set namespace awareness
    pub fn with_namespace_aware(mut self, namespace_aware: bool) -> Self {
        self.namespace_aware = namespace_aware;
        self
    }

    /// Set validation
    pub fn with_validating(mut self, validating: bool) -> Self {
        self.validating = validating;
        self
    }

    /// Set the limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Read a configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::configuration(format!("invalid parser configuration: {}", e)))
    }

    /// Serialize the configuration as JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::configuration(format!("cannot serialize parser configuration: {}", e)))
    }
}

fn check_schema_language(language: Option<&str>) -> Result<()> {
    match language {
        None | Some(XML_SCHEMA_LANGUAGE) => Ok(()),
        Some(other) => Err(Error::configuration(format!(
            "unsupported schema language '{}': only XML Schema 1.0 ({}) is available",
            other, XML_SCHEMA_LANGUAGE
        ))),
    }
}

/// Factory of [`DocumentBuilder`]s sharing one configuration
#[derive(Debug, Clone)]
pub struct BuilderFactory {
    config: ParserConfiguration,
    provider: Arc<dyn ParserProvider>,
}

impl BuilderFactory {
    /// Create a factory, resolving the provider in the shared registry
    pub fn new(config: ParserConfiguration) -> Result<Self> {
        Self::with_registry(config, ProviderRegistry::shared())
    }

    /// Create a factory, resolving the provider in `registry`
    pub fn with_registry(config: ParserConfiguration, registry: &ProviderRegistry) -> Result<Self> {
        check_schema_language(config.schema_language.as_deref())?;
        let provider = registry.resolve(config.implementation.as_deref())?;
        tracing::debug!("builder factory using parser provider '{}'", provider.name());
        Ok(Self { config, provider })
    }

    /// Set namespace awareness
    pub fn set_namespace_aware(&mut self, namespace_aware: bool) {
        self.config.namespace_aware = namespace_aware;
    }

    /// Set validation
    pub fn set_validating(&mut self, validating: bool) {
        self.config.validating = validating;
    }

    /// Set the schema language; only XML Schema 1.0 is accepted
    pub fn set_schema_language(&mut self, language: Option<String>) -> Result<()> {
        check_schema_language(language.as_deref())?;
        self.config.schema_language = language;
        Ok(())
    }

    /// Set the schema source
    pub fn set_schema_source(&mut self, source: Option<Location>) {
        self.config.schema_source = source;
    }

    /// Set the limits
    pub fn set_limits(&mut self, limits: Limits) {
        self.config.limits = limits;
    }

    /// Whether builders resolve namespaces
    pub fn is_namespace_aware(&self) -> bool {
        self.config.namespace_aware
    }

    /// Whether builders validate
    pub fn is_validating(&self) -> bool {
        self.config.validating
    }

    /// Schema language URI
    pub fn schema_language(&self) -> Option<&str> {
        self.config.schema_language.as_deref()
    }

    /// Schema source
    pub fn schema_source(&self) -> Option<&Location> {
        self.config.schema_source.as_ref()
    }

    /// Resource limits
    pub fn limits(&self) -> &Limits {
        &self.config.limits
    }

    /// Name of the resolved parser provider
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// The full configuration
    pub fn configuration(&self) -> &ParserConfiguration {
        &self.config
    }

    /// Create a builder for the current configuration
    ///
    /// Fails with a configuration error when validation is requested without
    /// a schema, a schema comes without a language or with a
    /// namespace-unaware parser, the provider cannot parse without
    /// namespaces, or the schema cannot be loaded or compiled.
    pub fn new_document_builder(&self) -> Result<DocumentBuilder> {
        let config = &self.config;

        if config.validating && config.schema_source.is_none() {
            return Err(Error::configuration(
                "validation requested without a schema (DTD validation is not supported)",
            ));
        }
        if !config.namespace_aware && !self.provider.supports(Feature::NamespaceUnaware) {
            return Err(Error::configuration(format!(
                "parser provider '{}' cannot parse without namespace awareness",
                self.provider.name()
            )));
        }

        let schema = match config.schema_source {
            Some(ref source) => {
                if config.schema_language.is_none() {
                    return Err(Error::configuration(
                        "a schema source was given without a schema language",
                    ));
                }
                if !config.namespace_aware {
                    return Err(Error::configuration(
                        "schema validation requires a namespace-aware parser",
                    ));
                }
                if config.validating {
                    Some(Arc::new(self.load_schema(source)?))
                } else {
                    tracing::debug!("validation is disabled, ignoring the schema source");
                    None
                }
            }
            None => None,
        };

        Ok(DocumentBuilder {
            provider: Arc::clone(&self.provider),
            namespace_aware: config.namespace_aware,
            schema,
            limits: config.limits.clone(),
        })
    }

    fn load_schema(&self, source: &Location) -> Result<Schema> {
        let loader = Loader::new().with_limits(self.config.limits.clone());
        let schema = Schema::from_location(source, &loader, self.provider.as_ref(), &self.config.limits)
            .map_err(|e| {
                let name = source.system_id().unwrap_or_else(|| "(inline)".to_string());
                Error::configuration(format!("cannot load schema {}: {}", name, e))
            })?;
        tracing::debug!("compiled {}", schema);
        Ok(schema)
    }
}

/// Parses documents with a fixed provider, optionally validating them
#[derive(Debug, Clone)]
pub struct DocumentBuilder {
    provider: Arc<dyn ParserProvider>,
    namespace_aware: bool,
    schema: Option<Arc<Schema>>,
    limits: Limits,
}

impl DocumentBuilder {
    /// Whether prefixes are resolved to namespaces
    pub fn is_namespace_aware(&self) -> bool {
        self.namespace_aware
    }

    /// Whether parsed documents are validated
    pub fn is_validating(&self) -> bool {
        self.schema.is_some()
    }

    /// Name of the parser provider
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// The compiled schema documents are validated against
    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_deref()
    }

    /// Parse a string
    pub fn parse_str(&self, xml: &str) -> Result<Document> {
        self.parse_str_with_handler(xml, &mut DefaultErrorHandler)
    }

    /// Parse a string, reporting diagnostics to `handler`
    pub fn parse_str_with_handler(&self, xml: &str, handler: &mut dyn ErrorHandler) -> Result<Document> {
        let xml = xml.strip_prefix('\u{feff}').unwrap_or(xml);
        self.build(xml, None, handler)
    }

    /// Parse UTF-8 bytes
    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<Document> {
        self.parse_bytes_with_handler(bytes, &mut DefaultErrorHandler)
    }

    /// Parse UTF-8 bytes, reporting diagnostics to `handler`
    pub fn parse_bytes_with_handler(&self, bytes: &[u8], handler: &mut dyn ErrorHandler) -> Result<Document> {
        let text = decode_utf8(bytes.to_vec())?;
        self.build(&text, None, handler)
    }

    /// Parse a file
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<Document> {
        self.parse_file_with_handler(path, &mut DefaultErrorHandler)
    }

    /// Parse a file, reporting diagnostics to `handler`
    pub fn parse_file_with_handler(
        &self,
        path: impl AsRef<Path>,
        handler: &mut dyn ErrorHandler,
    ) -> Result<Document> {
        self.parse_location_with_handler(&Location::from(path.as_ref()), handler)
    }

    /// Parse the document at `location`
    pub fn parse_location(&self, location: &Location) -> Result<Document> {
        self.parse_location_with_handler(location, &mut DefaultErrorHandler)
    }

    /// Parse the document at `location`, reporting diagnostics to `handler`
    pub fn parse_location_with_handler(
        &self,
        location: &Location,
        handler: &mut dyn ErrorHandler,
    ) -> Result<Document> {
        let text = Loader::new().with_limits(self.limits.clone()).load(location)?;
        self.build(&text, location.system_id(), handler)
    }

    fn build(&self, text: &str, system_id: Option<String>, handler: &mut dyn ErrorHandler) -> Result<Document> {
        if let Err(e) = self.limits.check_xml_size(text.len()) {
            return Err(match system_id {
                Some(id) => e.with_system_id(id).into(),
                None => e.into(),
            });
        }

        let options = ParseOptions {
            namespace_aware: self.namespace_aware,
            limits: self.limits.clone(),
            system_id,
        };
        let document = self.provider.parse(text, &options, handler)?;
        tracing::debug!(
            "parsed <{}> with {}",
            document.root().tag_name(),
            self.provider.name()
        );

        if let Some(ref schema) = self.schema {
            schema.validate(&document, handler)?;
        }
        Ok(document)
    }
}

/// A parsed document with the identifier of where it came from
///
/// The unit handed to a downstream transformation step.
#[derive(Debug, Clone, PartialEq)]
pub struct DomSource {
    document: Document,
    system_id: Option<String>,
}

impl DomSource {
    /// Wrap a document
    pub fn new(document: Document, system_id: Option<String>) -> Self {
        Self {
            document,
            system_id,
        }
    }

    /// The document
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Path or URL the document was read from
    pub fn system_id(&self) -> Option<&str> {
        self.system_id.as_deref()
    }

    /// Unwrap the document
    pub fn into_document(self) -> Document {
        self.document
    }

    /// Serialize the document
    pub fn write_to<W: Write>(&self, out: W) -> Result<()> {
        self.document.write_to(out)
    }

    /// Serialize the document to a string
    pub fn to_xml_string(&self) -> Result<String> {
        self.document.to_xml_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::CollectingErrorHandler;
    use crate::providers::{DEFAULT_PROVIDER, ROXMLTREE_PROVIDER};

    const SCHEMA: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
          <xs:element name="root">
            <xs:complexType><xs:sequence>
              <xs:element name="child" type="xs:integer"/>
            </xs:sequence></xs:complexType>
          </xs:element>
        </xs:schema>"#;

    fn schema_config() -> ParserConfiguration {
        ParserConfiguration::new()
            .with_schema_source(Location::text(SCHEMA))
            .with_schema_language(XML_SCHEMA_LANGUAGE)
            .with_namespace_aware(true)
            .with_validating(true)
    }

    #[test]
    fn test_default_configuration() {
        let factory = BuilderFactory::new(ParserConfiguration::new()).unwrap();
        assert_eq!(factory.provider_name(), DEFAULT_PROVIDER);
        assert!(!factory.is_namespace_aware());
        assert!(!factory.is_validating());
        assert!(factory.schema_source().is_none());

        let builder = factory.new_document_builder().unwrap();
        assert!(!builder.is_validating());
        assert!(builder.schema().is_none());
    }

    #[test]
    fn test_unknown_provider() {
        let err = BuilderFactory::new(ParserConfiguration::new().with_implementation("xerces")).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("xerces"));
    }

    #[test]
    fn test_unsupported_schema_language() {
        let config = ParserConfiguration::new().with_schema_language("http://relaxng.org/ns/structure/1.0");
        assert!(BuilderFactory::new(config).unwrap_err().is_configuration());

        let mut factory = BuilderFactory::new(ParserConfiguration::new()).unwrap();
        assert!(factory
            .set_schema_language(Some("http://www.w3.org/XML/XMLSchema/v1.1".to_string()))
            .is_err());
        assert!(factory.schema_language().is_none());
        factory
            .set_schema_language(Some(XML_SCHEMA_LANGUAGE.to_string()))
            .unwrap();
        assert_eq!(factory.schema_language(), Some(XML_SCHEMA_LANGUAGE));
    }

    #[test]
    fn test_unsatisfiable_configurations() {
        let dtd = ParserConfiguration::new().with_validating(true);
        let err = BuilderFactory::new(dtd).unwrap().new_document_builder().unwrap_err();
        assert!(err.is_configuration());

        let no_language = ParserConfiguration::new()
            .with_schema_source(Location::text(SCHEMA))
            .with_namespace_aware(true)
            .with_validating(true);
        assert!(BuilderFactory::new(no_language)
            .unwrap()
            .new_document_builder()
            .unwrap_err()
            .is_configuration());

        let unaware = schema_config().with_namespace_aware(false);
        assert!(BuilderFactory::new(unaware)
            .unwrap()
            .new_document_builder()
            .unwrap_err()
            .is_configuration());

        let roxml = ParserConfiguration::new().with_implementation(ROXMLTREE_PROVIDER);
        assert!(BuilderFactory::new(roxml)
            .unwrap()
            .new_document_builder()
            .unwrap_err()
            .is_configuration());
    }

    #[test]
    fn test_bad_schema_is_configuration_error() {
        let missing = schema_config().with_schema_source(std::path::PathBuf::from("/nonexistent/schema.xsd"));
        let err = BuilderFactory::new(missing).unwrap().new_document_builder().unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("/nonexistent/schema.xsd"));

        let remote = schema_config().with_schema_source(Location::Url(
            url::Url::parse("http://example.com/schema.xsd").unwrap(),
        ));
        assert!(BuilderFactory::new(remote)
            .unwrap()
            .new_document_builder()
            .unwrap_err()
            .is_configuration());

        let broken = schema_config().with_schema_source(Location::text("<xs:schema"));
        assert!(BuilderFactory::new(broken)
            .unwrap()
            .new_document_builder()
            .unwrap_err()
            .is_configuration());
    }

    #[test]
    fn test_schema_ignored_without_validation() {
        let config = schema_config().with_validating(false);
        let builder = BuilderFactory::new(config).unwrap().new_document_builder().unwrap();
        assert!(!builder.is_validating());
        assert!(builder.parse_str("<root><child>abc</child></root>").is_ok());
    }

    #[test]
    fn test_validating_builder() {
        let builder = BuilderFactory::new(schema_config())
            .unwrap()
            .new_document_builder()
            .unwrap();
        assert!(builder.is_validating());
        assert!(builder.parse_str("<root><child>42</child></root>").is_ok());

        let err = builder.parse_str("<root><child>abc</child></root>").unwrap_err();
        assert!(err.is_validation());

        let mut handler = CollectingErrorHandler::new();
        let doc = builder
            .parse_str_with_handler("<root><child>abc</child></root>", &mut handler)
            .unwrap();
        assert_eq!(doc.root().local_name(), "root");
        assert_eq!(handler.errors().len(), 1);
    }

    #[test]
    fn test_syntax_errors_abort_with_collecting_handler() {
        let builder = BuilderFactory::new(schema_config())
            .unwrap()
            .new_document_builder()
            .unwrap();
        let mut handler = CollectingErrorHandler::new();
        let err = builder
            .parse_str_with_handler("<root><child>1</child>", &mut handler)
            .unwrap_err();
        assert!(err.is_syntax());
        assert!(handler.has_errors());
    }

    #[test]
    fn test_parse_bytes_and_size_limit() {
        let config = ParserConfiguration::new()
            .with_namespace_aware(true)
            .with_limits(Limits {
                max_xml_size: 32,
                ..Limits::default()
            });
        let builder = BuilderFactory::new(config).unwrap().new_document_builder().unwrap();
        assert!(builder.parse_bytes(b"\xEF\xBB\xBF<a/>").is_ok());
        assert!(builder.parse_bytes(b"<a>\xE9</a>").unwrap_err().is_syntax());

        let err = builder
            .parse_str("<a>this text is much longer than the limit</a>")
            .unwrap_err();
        assert!(matches!(
            err.as_parse_error().map(|e| e.kind),
            Some(crate::error::ParseErrorKind::LimitExceeded)
        ));
    }

    #[test]
    fn test_configuration_json() {
        let config = schema_config().with_implementation(ROXMLTREE_PROVIDER);
        let json = config.to_json().unwrap();
        assert_eq!(ParserConfiguration::from_json(&json).unwrap(), config);

        let partial = ParserConfiguration::from_json(r#"{"namespace_aware": true}"#).unwrap();
        assert!(partial.namespace_aware);
        assert!(partial.implementation.is_none());
        assert_eq!(partial.limits, Limits::default());

        assert!(ParserConfiguration::from_json("[1, 2]").unwrap_err().is_configuration());
    }

    #[test]
    fn test_dom_source() {
        let builder = BuilderFactory::new(ParserConfiguration::new().with_namespace_aware(true))
            .unwrap()
            .new_document_builder()
            .unwrap();
        let doc = builder.parse_str("<a><b>x</b></a>").unwrap();
        let source = DomSource::new(doc.clone(), Some("a.xml".to_string()));
        assert_eq!(source.system_id(), Some("a.xml"));
        assert_eq!(source.document(), &doc);
        let xml = source.to_xml_string().unwrap();
        assert!(xml.contains("<b>x</b>"));
        assert_eq!(source.into_document(), doc);
    }

    #[test]
    fn test_builders_are_thread_safe() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BuilderFactory>();
        assert_send_sync::<DocumentBuilder>();
    }
}
