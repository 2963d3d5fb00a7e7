//! # xmlfactory
//!
//! Configurable XML document builders: pluggable parser providers,
//! namespace handling and XML Schema 1.0 attribution.
//!
//! ## Features
//!
//! - Two parser providers: `quick-xml` (default) and `roxmltree`
//! - Namespace-aware and namespace-unaware parsing
//! - Validation against an XML Schema 1.0 document while parsing
//! - Error handlers deciding whether diagnostics abort the parse
//! - Resource limits against hostile input
//! - JSON-persistable parser configuration
//!
//! ## Example
//!
//! ```rust,no_run
//! use xmlfactory::handlers::CollectingErrorHandler;
//! use xmlfactory::initializer;
//! use std::path::Path;
//!
//! // Parse without validation
//! let doc = initializer::new_document_from_file("document.xml")?;
//!
//! // Parse and validate, collecting every violation
//! let mut handler = CollectingErrorHandler::new();
//! let doc = initializer::parse("document.xml", Path::new("schema.xsd"), &mut handler)?;
//! for error in handler.errors() {
//!     println!("{}", error);
//! }
//! # Ok::<(), xmlfactory::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Foundation
pub mod error;
pub mod limits;

// Names and resources
pub mod namespaces;
pub mod locations;
pub mod loaders;

// Document model and parsing
pub mod documents;
pub mod handlers;
pub mod providers;

// Schema validation
pub mod validators;

// Builders and the facade
pub mod factory;
pub mod initializer;

// Re-exports for convenience
pub use documents::{Attribute, Document, Element, Node};
pub use error::{ConfigurationError, Error, ParseError, ParseErrorKind, Result, TextPosition};
pub use factory::{BuilderFactory, DocumentBuilder, DomSource, ParserConfiguration, XML_SCHEMA_LANGUAGE};
pub use handlers::{CollectingErrorHandler, DefaultErrorHandler, ErrorHandler};
pub use limits::Limits;
pub use locations::Location;
pub use providers::{ParserProvider, ProviderRegistry};
pub use validators::Schema;

/// Version of the xmlfactory library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
