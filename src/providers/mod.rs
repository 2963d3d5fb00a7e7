//! Parser providers
//!
//! A provider turns XML text into a [`Document`]. Builders never construct
//! a parser directly: they ask a [`ProviderRegistry`] for the provider named
//! in their configuration. The shared registry is immutable, so naming a
//! provider in one configuration cannot change what another one gets.

mod quick;
mod roxml;

pub use quick::QuickXmlProvider;
pub use roxml::RoxmltreeProvider;

use crate::documents::Document;
use crate::error::{Error, Result};
use crate::handlers::ErrorHandler;
use crate::limits::Limits;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use std::fmt;
use std::sync::Arc;

/// Name of the streaming provider backed by quick-xml
pub const QUICK_XML_PROVIDER: &str = "quick-xml";

/// Name of the tree provider backed by roxmltree
pub const ROXMLTREE_PROVIDER: &str = "roxmltree";

/// Provider used when a configuration names none
pub const DEFAULT_PROVIDER: &str = QUICK_XML_PROVIDER;

/// Provider requested by the schema-validating convenience path
pub const SCHEMA_PROVIDER: &str = ROXMLTREE_PROVIDER;

/// Optional capabilities a provider may lack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    /// Parsing with names kept verbatim instead of namespace-resolved
    NamespaceUnaware,
    /// Expanding entities declared in an internal DTD subset
    DocumentType,
}

/// Per-parse settings handed to a provider
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Resolve prefixes to namespace URIs
    pub namespace_aware: bool,
    /// Resource limits
    pub limits: Limits,
    /// Identifier of the input, for diagnostics
    pub system_id: Option<String>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            namespace_aware: true,
            limits: Limits::default(),
            system_id: None,
        }
    }
}

/// An XML parser implementation that builds [`Document`] trees
pub trait ParserProvider: Send + Sync + fmt::Debug {
    /// Registry name of this provider
    fn name(&self) -> &str;

    /// Whether the provider can honor `feature`
    fn supports(&self, feature: Feature) -> bool;

    /// Parse `text` into a document
    ///
    /// Well-formedness errors go to `handler.fatal_error` and end the parse;
    /// conditions that do not affect the tree go to `handler.warning`.
    fn parse(
        &self,
        text: &str,
        options: &ParseOptions,
        handler: &mut dyn ErrorHandler,
    ) -> Result<Document>;
}

/// Named collection of parser providers
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    providers: IndexMap<String, Arc<dyn ParserProvider>>,
    default: String,
}

static SHARED: Lazy<ProviderRegistry> = Lazy::new(ProviderRegistry::builtin);

impl ProviderRegistry {
    /// Registry holding the built-in providers, defaulting to quick-xml
    pub fn builtin() -> Self {
        let mut registry = Self {
            providers: IndexMap::new(),
            default: DEFAULT_PROVIDER.to_string(),
        };
        registry.register(Arc::new(QuickXmlProvider));
        registry.register(Arc::new(RoxmltreeProvider));
        registry
    }

    /// The process-wide read-only registry of built-in providers
    pub fn shared() -> &'static ProviderRegistry {
        &SHARED
    }

    /// Add a provider, returning the one it replaces
    pub fn register(&mut self, provider: Arc<dyn ParserProvider>) -> Option<Arc<dyn ParserProvider>> {
        self.providers.insert(provider.name().to_string(), provider)
    }

    /// Look up a provider by name
    pub fn get(&self, name: &str) -> Result<Arc<dyn ParserProvider>> {
        self.providers.get(name).cloned().ok_or_else(|| {
            Error::configuration(format!(
                "parser provider '{}' not found (available: {})",
                name,
                self.names().collect::<Vec<_>>().join(", ")
            ))
        })
    }

    /// Look up the named provider, or the default one
    pub fn resolve(&self, name: Option<&str>) -> Result<Arc<dyn ParserProvider>> {
        self.get(name.unwrap_or(&self.default))
    }

    /// Name of the default provider
    pub fn default_name(&self) -> &str {
        &self.default
    }

    /// Change the default provider of this registry
    pub fn set_default(&mut self, name: &str) -> Result<()> {
        self.get(name)?;
        self.default = name.to_string();
        Ok(())
    }

    /// Registered provider names, in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(|k| k.as_str())
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::DefaultErrorHandler;

    #[test]
    fn test_builtin_registry() {
        let registry = ProviderRegistry::builtin();
        let names: Vec<_> = registry.names().collect();
        assert_eq!(names, vec![QUICK_XML_PROVIDER, ROXMLTREE_PROVIDER]);
        assert_eq!(registry.default_name(), DEFAULT_PROVIDER);
        assert_eq!(registry.resolve(None).unwrap().name(), QUICK_XML_PROVIDER);
    }

    #[test]
    fn test_unknown_provider_is_configuration_error() {
        let err = ProviderRegistry::shared().get("xerces").unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("quick-xml"));
    }

    #[test]
    fn test_set_default_is_local_to_registry() {
        let mut registry = ProviderRegistry::builtin();
        registry.set_default(ROXMLTREE_PROVIDER).unwrap();
        assert_eq!(registry.resolve(None).unwrap().name(), ROXMLTREE_PROVIDER);
        assert_eq!(ProviderRegistry::shared().default_name(), DEFAULT_PROVIDER);
        assert!(registry.set_default("nope").is_err());
    }

    #[test]
    fn test_custom_provider() {
        #[derive(Debug)]
        struct Fixed;
        impl ParserProvider for Fixed {
            fn name(&self) -> &str {
                "fixed"
            }
            fn supports(&self, _feature: Feature) -> bool {
                false
            }
            fn parse(
                &self,
                _text: &str,
                _options: &ParseOptions,
                _handler: &mut dyn ErrorHandler,
            ) -> Result<Document> {
                Ok(Document::new(crate::documents::Element::new(
                    crate::namespaces::QName::local("fixed"),
                )))
            }
        }

        let mut registry = ProviderRegistry::builtin();
        assert!(registry.register(Arc::new(Fixed)).is_none());
        let doc = registry
            .get("fixed")
            .unwrap()
            .parse("<ignored/>", &ParseOptions::default(), &mut DefaultErrorHandler)
            .unwrap();
        assert_eq!(doc.root().local_name(), "fixed");
    }

    #[test]
    fn test_providers_agree_on_simple_document() {
        let xml = r#"<?xml version="1.0"?>
<!-- lead -->
<a:root xmlns:a="urn:a" xmlns="urn:d" x="1"><child a:y="2">text &amp; more</child><![CDATA[<raw>]]><?pi data?></a:root>"#;
        for name in [QUICK_XML_PROVIDER, ROXMLTREE_PROVIDER] {
            let provider = ProviderRegistry::shared().get(name).unwrap();
            let doc = provider
                .parse(xml, &ParseOptions::default(), &mut DefaultErrorHandler)
                .unwrap();
            let root = doc.root();
            assert_eq!(root.name, crate::namespaces::QName::namespaced("urn:a", "root"), "{}", name);
            assert_eq!(root.prefix.as_deref(), Some("a"), "{}", name);
            assert_eq!(root.attribute("x"), Some("1"), "{}", name);
            assert_eq!(root.namespace_declarations.len(), 2, "{}", name);

            let child = root.first_child("child").unwrap();
            assert_eq!(child.namespace(), Some("urn:d"), "{}", name);
            assert_eq!(child.attribute_ns(Some("urn:a"), "y"), Some("2"), "{}", name);
            assert_eq!(child.text_content(), "text & more", "{}", name);

            assert!(root.text_content().ends_with("<raw>"), "{}", name);
            assert!(doc
                .prolog
                .iter()
                .any(|n| matches!(n, crate::documents::Node::Comment(c) if c == " lead ")));
            assert!(root.children.iter().any(|n| matches!(
                n,
                crate::documents::Node::ProcessingInstruction(pi) if pi.target == "pi"
            )));
        }
    }
}
