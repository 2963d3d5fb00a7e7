//! Compiled XML Schema
//!
//! This module holds the component model produced by [`super::parsing`] and
//! the [`Schema`] handle that builders attach to their parses. Components
//! are keyed by expanded name, so declarations from imported namespaces live
//! side by side with the main target namespace.

use std::fmt;

use indexmap::IndexMap;

use super::document_validation::DocumentValidator;
use super::facets::Facets;
use super::parsing::SchemaCompiler;
use crate::documents::Document;
use crate::error::Result;
use crate::handlers::{CollectingErrorHandler, ErrorHandler};
use crate::limits::Limits;
use crate::loaders::Loader;
use crate::locations::Location;
use crate::namespaces::QName;
use crate::providers::ParserProvider;

/// Occurrence bounds of a particle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurs {
    /// minOccurs
    pub min: usize,
    /// maxOccurs; `None` is unbounded
    pub max: Option<usize>,
}

impl Occurs {
    /// Exactly once
    pub const ONCE: Occurs = Occurs {
        min: 1,
        max: Some(1),
    };

    /// Create new occurrence bounds
    pub fn new(min: usize, max: Option<usize>) -> Self {
        Self { min, max }
    }

    /// Whether `count` more occurrences are still allowed
    pub fn allows(&self, count: usize) -> bool {
        self.max.map(|max| count < max).unwrap_or(true)
    }
}

impl Default for Occurs {
    fn default() -> Self {
        Self::ONCE
    }
}

/// Reference to a type: by name, or an anonymous inline definition
#[derive(Debug, Clone)]
pub enum TypeRef {
    /// Named type, built-in or global
    Named(QName),
    /// Anonymous simple type
    Simple(Box<SimpleType>),
    /// Anonymous complex type
    Complex(Box<ComplexType>),
}

/// A global type definition
#[derive(Debug, Clone)]
pub enum TypeDef {
    /// xs:simpleType
    Simple(SimpleType),
    /// xs:complexType
    Complex(ComplexType),
}

/// xs:simpleType
#[derive(Debug, Clone)]
pub struct SimpleType {
    /// Name, absent for anonymous types
    pub name: Option<QName>,
    /// How the value space is defined
    pub variety: Variety,
}

/// Derivation of a simple type
#[derive(Debug, Clone)]
pub enum Variety {
    /// xs:restriction of a base type
    Restriction {
        /// Base type
        base: TypeRef,
        /// Facets declared by this step
        facets: Facets,
    },
    /// xs:list of an item type
    List {
        /// Item type
        item: TypeRef,
    },
    /// xs:union of member types
    Union {
        /// Member types, tried in order
        members: Vec<TypeRef>,
    },
}

/// How a complex type derives from its base
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivationMethod {
    /// Base content first, then this type's content
    Extension,
    /// This type's content replaces the base content
    Restriction,
}

/// xs:complexType
#[derive(Debug, Clone)]
pub struct ComplexType {
    /// Name, absent for anonymous types
    pub name: Option<QName>,
    /// Character data may appear between child elements
    pub mixed: bool,
    /// Base type of xs:complexContent / xs:simpleContent derivations
    pub base: Option<(QName, DerivationMethod)>,
    /// Content declared by this type
    pub content: Content,
    /// Attribute uses declared by this type
    pub attributes: Vec<AttributeUse>,
    /// Referenced attribute groups
    pub attribute_groups: Vec<QName>,
    /// xs:anyAttribute
    pub any_attribute: Option<Wildcard>,
}

impl ComplexType {
    /// Empty content, no attributes
    pub fn empty(name: Option<QName>) -> Self {
        Self {
            name,
            mixed: false,
            base: None,
            content: Content::Empty,
            attributes: Vec::new(),
            attribute_groups: Vec::new(),
            any_attribute: None,
        }
    }
}

/// Content of a complex type
#[derive(Debug, Clone)]
pub enum Content {
    /// No child elements
    Empty,
    /// Character data only, of the given simple type
    Simple(TypeRef),
    /// Child elements matching a particle
    Elements(Particle),
}

/// A particle: a term with occurrence bounds
#[derive(Debug, Clone)]
pub struct Particle {
    /// minOccurs / maxOccurs
    pub occurs: Occurs,
    /// What the particle matches
    pub term: Term,
}

/// Term of a particle
#[derive(Debug, Clone)]
pub enum Term {
    /// Local element declaration
    Element(Box<ElementDecl>),
    /// Reference to a global element
    ElementRef(QName),
    /// Reference to a named model group
    Group(QName),
    /// xs:sequence
    Sequence(Vec<Particle>),
    /// xs:choice
    Choice(Vec<Particle>),
    /// xs:all
    All(Vec<Particle>),
    /// xs:any
    Any(Wildcard),
}

/// xs:element
#[derive(Debug, Clone)]
pub struct ElementDecl {
    /// Expanded element name
    pub name: QName,
    /// Declared type; `None` is xs:anyType
    pub type_ref: Option<TypeRef>,
    /// xsi:nil is allowed
    pub nillable: bool,
    /// Element cannot appear in instances
    pub is_abstract: bool,
    /// Value constraint `default`
    pub default: Option<String>,
    /// Value constraint `fixed`
    pub fixed: Option<String>,
}

impl ElementDecl {
    /// Declaration of type xs:anyType
    pub fn new(name: QName) -> Self {
        Self {
            name,
            type_ref: None,
            nillable: false,
            is_abstract: false,
            default: None,
            fixed: None,
        }
    }
}

/// xs:attribute
#[derive(Debug, Clone)]
pub struct AttributeDecl {
    /// Expanded attribute name
    pub name: QName,
    /// Declared simple type; `None` is xs:anySimpleType
    pub type_ref: Option<TypeRef>,
    /// Value constraint `default`
    pub default: Option<String>,
    /// Value constraint `fixed`
    pub fixed: Option<String>,
}

/// Value of the `use` attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttributeUsage {
    /// May be omitted
    #[default]
    Optional,
    /// Must be present
    Required,
    /// Must not be present
    Prohibited,
}

/// Attribute use inside a complex type or attribute group
#[derive(Debug, Clone)]
pub struct AttributeUse {
    /// Local declaration or reference to a global one
    pub attribute: AttributeTerm,
    /// Presence requirement
    pub usage: AttributeUsage,
    /// `fixed` given on the use itself
    pub fixed: Option<String>,
}

/// Declaration behind an attribute use
#[derive(Debug, Clone)]
pub enum AttributeTerm {
    /// Declared in place
    Local(AttributeDecl),
    /// `ref` to a global attribute
    Ref(QName),
}

impl AttributeUse {
    /// Name of the attribute this use governs
    pub fn name(&self) -> &QName {
        match &self.attribute {
            AttributeTerm::Local(decl) => &decl.name,
            AttributeTerm::Ref(name) => name,
        }
    }
}

/// xs:attributeGroup
#[derive(Debug, Clone, Default)]
pub struct AttributeGroup {
    /// Attribute uses
    pub attributes: Vec<AttributeUse>,
    /// Nested group references
    pub attribute_groups: Vec<QName>,
    /// xs:anyAttribute
    pub any_attribute: Option<Wildcard>,
}

/// Namespace constraint of a wildcard
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceConstraint {
    /// ##any
    Any,
    /// ##other: any namespace except the given one, and not unqualified
    Not(Option<String>),
    /// Explicit list; `None` stands for ##local
    Set(Vec<Option<String>>),
}

/// `processContents` of a wildcard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessContents {
    /// A global declaration must exist and is enforced
    #[default]
    Strict,
    /// Enforced when a global declaration exists
    Lax,
    /// Not validated
    Skip,
}

/// xs:any / xs:anyAttribute
#[derive(Debug, Clone)]
pub struct Wildcard {
    /// Allowed namespaces
    pub namespaces: NamespaceConstraint,
    /// Validation of matched items
    pub process_contents: ProcessContents,
}

impl Wildcard {
    /// Whether an item in `namespace` matches this wildcard
    pub fn allows(&self, namespace: Option<&str>) -> bool {
        match &self.namespaces {
            NamespaceConstraint::Any => true,
            NamespaceConstraint::Not(excluded) => {
                namespace.is_some() && namespace != excluded.as_deref()
            }
            NamespaceConstraint::Set(allowed) => allowed.iter().any(|ns| ns.as_deref() == namespace),
        }
    }
}

/// A compiled XML Schema
///
/// Cheap to share by reference; validation never mutates it.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub(crate) target_namespace: Option<String>,
    pub(crate) system_id: Option<String>,
    pub(crate) elements: IndexMap<QName, ElementDecl>,
    pub(crate) types: IndexMap<QName, TypeDef>,
    pub(crate) attributes: IndexMap<QName, AttributeDecl>,
    pub(crate) groups: IndexMap<QName, Particle>,
    pub(crate) attribute_groups: IndexMap<QName, AttributeGroup>,
}

impl Schema {
    /// Compile the schema at `location`
    ///
    /// `provider` parses the schema documents (namespace-aware); includes
    /// and imports are resolved relative to `location`.
    pub fn from_location(
        location: &Location,
        loader: &Loader,
        provider: &dyn ParserProvider,
        limits: &Limits,
    ) -> Result<Self> {
        SchemaCompiler::new(loader, provider, limits).compile(location)
    }

    /// Compile a schema file with the default provider and limits
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        Self::from_location(
            &Location::from(path.as_ref()),
            &Loader::new(),
            &crate::providers::QuickXmlProvider,
            &Limits::default(),
        )
    }

    /// Compile schema text; relative includes resolve against the working directory
    pub fn from_text(xsd: &str) -> Result<Self> {
        Self::from_location(
            &Location::text(xsd),
            &Loader::new(),
            &crate::providers::QuickXmlProvider,
            &Limits::default(),
        )
    }

    /// Target namespace of the main schema document
    pub fn target_namespace(&self) -> Option<&str> {
        self.target_namespace.as_deref()
    }

    /// Where the main schema document came from
    pub fn system_id(&self) -> Option<&str> {
        self.system_id.as_deref()
    }

    /// Global element declaration by name
    pub fn element(&self, name: &QName) -> Option<&ElementDecl> {
        self.elements.get(name)
    }

    /// Global type definition by name
    pub fn type_definition(&self, name: &QName) -> Option<&TypeDef> {
        self.types.get(name)
    }

    /// Names of the global elements, in declaration order
    pub fn element_names(&self) -> impl Iterator<Item = &QName> {
        self.elements.keys()
    }

    /// Names of the global types, in declaration order
    pub fn type_names(&self) -> impl Iterator<Item = &QName> {
        self.types.keys()
    }

    /// Validate `document`, reporting each violation to `handler.error`
    ///
    /// Returns the first error the handler chose to raise.
    pub fn validate(&self, document: &Document, handler: &mut dyn ErrorHandler) -> Result<()> {
        DocumentValidator::new(self, handler, document.system_id.clone())
            .validate(document)
            .map_err(Into::into)
    }

    /// Every violation in `document`, without stopping at the first
    pub fn violations(&self, document: &Document) -> Vec<crate::error::ParseError> {
        let mut collector = CollectingErrorHandler::new();
        // The collecting handler never raises
        let _ = self.validate(document, &mut collector);
        collector.into_report().1
    }

    /// Whether `document` is valid
    pub fn is_valid(&self, document: &Document) -> bool {
        self.violations(document).is_empty()
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Schema(target_namespace={}, elements={}, types={})",
            self.target_namespace.as_deref().unwrap_or("(none)"),
            self.elements.len(),
            self.types.len()
        )
    }
}
