//! XML Schema validators
//!
//! A compact XSD 1.0 implementation: the schema component model, the
//! built-in datatypes, constraining facets, the schema document compiler
//! and the instance validator that walks a [`Document`](crate::documents::Document).

pub mod builtins;
pub mod facets;
pub mod schemas;

mod document_validation;
mod parsing;

// Re-exports
pub use builtins::{get_builtin_type, validate_builtin, BuiltinType, ValueResult, XsdValue};
pub use facets::{Facets, PatternFacet, WhiteSpace};
pub use schemas::{
    AttributeDecl, AttributeGroup, AttributeTerm, AttributeUsage, AttributeUse, ComplexType,
    Content, DerivationMethod, ElementDecl, NamespaceConstraint, Occurs, Particle,
    ProcessContents, Schema, SimpleType, Term, TypeDef, TypeRef, Variety, Wildcard,
};
