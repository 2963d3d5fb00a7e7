//! Schema document compilation
//!
//! Turns parsed `xs:schema` documents into the component model of
//! [`super::schemas`]. Includes and imports are loaded through the same
//! loader and parser provider as the main document, and every name a
//! component refers to is checked once all documents are in.

use std::fmt;

use super::builtins::get_builtin_type;
use super::facets::Facets;
use super::schemas::{
    AttributeDecl, AttributeGroup, AttributeTerm, AttributeUsage, AttributeUse, ComplexType,
    Content, DerivationMethod, ElementDecl, NamespaceConstraint, Occurs, Particle,
    ProcessContents, Schema, SimpleType, Term, TypeDef, TypeRef, Variety, Wildcard,
};
use crate::documents::{Document, Element};
use crate::error::{Error, Result};
use crate::handlers::DefaultErrorHandler;
use crate::limits::Limits;
use crate::loaders::Loader;
use crate::locations::Location;
use crate::namespaces::{NamespaceContext, QName, XSD_NAMESPACE};
use crate::providers::{ParseOptions, ParserProvider};
use indexmap::IndexMap;

/// How a schema document was reached
#[derive(Debug, Clone)]
enum Inclusion {
    /// The document the caller asked for
    Main,
    /// xs:include from a document with this target namespace
    Include(Option<String>),
    /// xs:import declaring this namespace
    Import(Option<String>),
}

/// Per-document compilation settings
#[derive(Debug)]
struct DocumentScope {
    target_namespace: Option<String>,
    element_form_qualified: bool,
    attribute_form_qualified: bool,
    /// Included without a targetNamespace: unqualified references adopt the includer's
    chameleon: bool,
}

/// Compiles a schema and the documents it includes or imports
pub(crate) struct SchemaCompiler<'a> {
    loader: &'a Loader,
    provider: &'a dyn ParserProvider,
    limits: &'a Limits,
    schema: Schema,
    loaded: Vec<Location>,
}

impl<'a> SchemaCompiler<'a> {
    pub(crate) fn new(loader: &'a Loader, provider: &'a dyn ParserProvider, limits: &'a Limits) -> Self {
        Self {
            loader,
            provider,
            limits,
            schema: Schema::default(),
            loaded: Vec::new(),
        }
    }

    pub(crate) fn compile(mut self, location: &Location) -> Result<Schema> {
        self.load_document(location, Inclusion::Main, 1)?;
        check_references(&self.schema)?;
        self.schema.system_id = location.system_id();
        tracing::debug!(
            "compiled schema {} from {} document(s)",
            self.schema,
            self.loaded.len()
        );
        Ok(self.schema)
    }

    fn load_document(&mut self, location: &Location, inclusion: Inclusion, depth: usize) -> Result<()> {
        self.limits
            .check_schema_depth(depth)
            .map_err(|e| Error::configuration(e.message))?;
        if self.loaded.contains(location) {
            return Ok(());
        }
        self.loaded.push(location.clone());
        tracing::debug!("loading schema document {:?}", location.system_id());

        let text = self.loader.load(location)?;
        let options = ParseOptions {
            namespace_aware: true,
            limits: self.limits.clone(),
            system_id: location.system_id(),
        };
        let document = self
            .provider
            .parse(&text, &options, &mut DefaultErrorHandler)?;

        self.compile_document(&document, location, inclusion, depth)
            .map_err(|e| match (e, location.system_id()) {
                (Error::Configuration(c), Some(id)) if !c.message.starts_with(&id) => {
                    Error::configuration(format!("{}: {}", id, c.message))
                }
                (e, _) => e,
            })
    }

    fn compile_document(
        &mut self,
        document: &Document,
        location: &Location,
        inclusion: Inclusion,
        depth: usize,
    ) -> Result<()> {
        let root = document.root();
        if !root.name.matches(Some(XSD_NAMESPACE), "schema") {
            return Err(Error::configuration(format!(
                "the root element of a schema must be xs:schema, found <{}>",
                root.tag_name()
            )));
        }
        let ctx = enter(&NamespaceContext::new(), root);

        let is_main = matches!(inclusion, Inclusion::Main);
        let declared = root.attribute("targetNamespace").map(str::to_string);
        let (target_namespace, chameleon) = match inclusion {
            Inclusion::Main => (declared, false),
            Inclusion::Include(parent) => match declared {
                None => {
                    let chameleon = parent.is_some();
                    (parent, chameleon)
                }
                Some(ns) if Some(&ns) == parent.as_ref() => (Some(ns), false),
                Some(ns) => {
                    return Err(invalid(
                        root,
                        format!(
                            "included schema has targetNamespace '{}', expected '{}'",
                            ns,
                            parent.as_deref().unwrap_or("(none)")
                        ),
                    ))
                }
            },
            Inclusion::Import(expected) => {
                if declared != expected {
                    return Err(invalid(
                        root,
                        format!(
                            "imported schema has targetNamespace '{}', expected '{}'",
                            declared.as_deref().unwrap_or("(none)"),
                            expected.as_deref().unwrap_or("(none)")
                        ),
                    ));
                }
                (declared, false)
            }
        };
        if is_main {
            self.schema.target_namespace = target_namespace.clone();
        }

        let scope = DocumentScope {
            target_namespace,
            element_form_qualified: form_attribute(root, "elementFormDefault")?.unwrap_or(false),
            attribute_form_qualified: form_attribute(root, "attributeFormDefault")?.unwrap_or(false),
            chameleon,
        };

        for child in root.child_elements() {
            if child.namespace() != Some(XSD_NAMESPACE) {
                tracing::debug!("ignoring foreign schema element {}", child.name);
                continue;
            }
            match child.local_name() {
                "annotation" | "notation" => {}
                "include" => {
                    let reference = required(child, "schemaLocation")?;
                    let inclusion = Inclusion::Include(scope.target_namespace.clone());
                    self.load_document(&location.resolve(reference), inclusion, depth + 1)?;
                }
                "import" => {
                    let namespace = child.attribute("namespace").map(str::to_string);
                    if namespace == scope.target_namespace {
                        return Err(invalid(child, "a schema cannot import its own target namespace"));
                    }
                    match child.attribute("schemaLocation") {
                        Some(reference) => {
                            let inclusion = Inclusion::Import(namespace);
                            self.load_document(&location.resolve(reference), inclusion, depth + 1)?;
                        }
                        None => tracing::debug!(
                            "import of namespace {:?} has no schemaLocation; nothing loaded",
                            namespace
                        ),
                    }
                }
                "redefine" => return Err(invalid(child, "xs:redefine is not supported")),
                "element" => {
                    let decl = parse_element(child, &ctx, &scope, true)?;
                    insert_unique(&mut self.schema.elements, decl.name.clone(), decl, child)?;
                }
                "attribute" => {
                    let decl = parse_attribute(child, &ctx, &scope, true)?;
                    insert_unique(&mut self.schema.attributes, decl.name.clone(), decl, child)?;
                }
                "simpleType" => {
                    let name = global_name(child, &scope)?;
                    let simple = parse_simple_type(child, &ctx, &scope, Some(name.clone()))?;
                    insert_unique(&mut self.schema.types, name, TypeDef::Simple(simple), child)?;
                }
                "complexType" => {
                    let name = global_name(child, &scope)?;
                    let complex = parse_complex_type(child, &ctx, &scope, Some(name.clone()))?;
                    insert_unique(&mut self.schema.types, name, TypeDef::Complex(complex), child)?;
                }
                "group" => {
                    let name = global_name(child, &scope)?;
                    let particle = parse_group_definition(child, &ctx, &scope)?;
                    insert_unique(&mut self.schema.groups, name, particle, child)?;
                }
                "attributeGroup" => {
                    let name = global_name(child, &scope)?;
                    let group = parse_attribute_group(child, &ctx, &scope)?;
                    insert_unique(&mut self.schema.attribute_groups, name, group, child)?;
                }
                other => {
                    return Err(invalid(
                        child,
                        format!("unexpected top-level element xs:{}", other),
                    ))
                }
            }
        }

        Ok(())
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Context with the declarations made on `element` pushed
fn enter(parent: &NamespaceContext, element: &Element) -> NamespaceContext {
    let mut ctx = parent.clone();
    ctx.push_scope();
    for decl in &element.namespace_declarations {
        ctx.declare(decl.prefix.as_deref(), &decl.uri);
    }
    ctx
}

fn invalid(element: &Element, message: impl fmt::Display) -> Error {
    match element.position {
        Some(position) => Error::configuration(format!(
            "invalid <{}> at {}: {}",
            element.tag_name(),
            position,
            message
        )),
        None => Error::configuration(format!("invalid <{}>: {}", element.tag_name(), message)),
    }
}

/// Attach the component to a configuration error raised on its behalf
fn reword(element: &Element, error: Error) -> Error {
    match error {
        Error::Configuration(c) => invalid(element, c.message),
        other => other,
    }
}

fn required<'e>(element: &'e Element, name: &str) -> Result<&'e str> {
    element
        .attribute(name)
        .ok_or_else(|| invalid(element, format!("missing required attribute '{}'", name)))
}

fn boolean_attribute(element: &Element, name: &str) -> Result<bool> {
    match element.attribute(name).map(str::trim) {
        None | Some("false") | Some("0") => Ok(false),
        Some("true") | Some("1") => Ok(true),
        Some(other) => Err(invalid(
            element,
            format!("attribute '{}' must be a boolean, got '{}'", name, other),
        )),
    }
}

fn form_attribute(element: &Element, name: &str) -> Result<Option<bool>> {
    match element.attribute(name).map(str::trim) {
        None => Ok(None),
        Some("qualified") => Ok(Some(true)),
        Some("unqualified") => Ok(Some(false)),
        Some(other) => Err(invalid(
            element,
            format!("attribute '{}' must be 'qualified' or 'unqualified', got '{}'", name, other),
        )),
    }
}

/// Schema children of `element`, annotations skipped
fn xsd_children(element: &Element) -> impl Iterator<Item = &Element> {
    element
        .child_elements()
        .filter(|c| c.namespace() == Some(XSD_NAMESPACE) && c.local_name() != "annotation")
}

fn resolve_qname(element: &Element, ctx: &NamespaceContext, scope: &DocumentScope, value: &str) -> Result<QName> {
    let mut name = ctx.resolve(value.trim()).map_err(|e| reword(element, e))?;
    if scope.chameleon && name.namespace.is_none() {
        name.namespace = scope.target_namespace.clone();
    }
    Ok(name)
}

fn global_name(element: &Element, scope: &DocumentScope) -> Result<QName> {
    let name = required(element, "name")?;
    Ok(QName::new(scope.target_namespace.clone(), name))
}

fn insert_unique<V>(map: &mut IndexMap<QName, V>, name: QName, value: V, element: &Element) -> Result<()> {
    if map.contains_key(&name) {
        return Err(invalid(element, format!("'{}' is declared more than once", name)));
    }
    map.insert(name, value);
    Ok(())
}

fn parse_occurs(element: &Element) -> Result<Occurs> {
    let number = |name: &str, value: &str| {
        value.trim().parse::<usize>().map_err(|_| {
            invalid(
                element,
                format!("'{}' must be a non-negative integer, got '{}'", name, value),
            )
        })
    };
    let min = match element.attribute("minOccurs") {
        Some(v) => number("minOccurs", v)?,
        None => 1,
    };
    let max = match element.attribute("maxOccurs").map(str::trim) {
        Some("unbounded") => None,
        Some(v) => Some(number("maxOccurs", v)?),
        None => Some(1),
    };
    if let Some(max) = max {
        if min > max {
            return Err(invalid(element, "minOccurs is greater than maxOccurs"));
        }
    }
    Ok(Occurs::new(min, max))
}

// =============================================================================
// Declarations
// =============================================================================

fn parse_element(
    element: &Element,
    parent_ctx: &NamespaceContext,
    scope: &DocumentScope,
    global: bool,
) -> Result<ElementDecl> {
    let ctx = enter(parent_ctx, element);
    let local_name = required(element, "name")?;
    let qualified = global
        || form_attribute(element, "form")?.unwrap_or(scope.element_form_qualified);
    let namespace = if qualified {
        scope.target_namespace.clone()
    } else {
        None
    };

    let mut decl = ElementDecl::new(QName::new(namespace, local_name));
    decl.nillable = boolean_attribute(element, "nillable")?;
    decl.is_abstract = boolean_attribute(element, "abstract")?;
    decl.default = element.attribute("default").map(str::to_string);
    decl.fixed = element.attribute("fixed").map(str::to_string);
    if decl.default.is_some() && decl.fixed.is_some() {
        return Err(invalid(element, "'default' and 'fixed' are mutually exclusive"));
    }

    let inline = inline_type(element, &ctx, scope)?;
    decl.type_ref = match (element.attribute("type"), inline) {
        (Some(_), Some(_)) => {
            return Err(invalid(element, "'type' and an anonymous type are mutually exclusive"))
        }
        (Some(name), None) => Some(TypeRef::Named(resolve_qname(element, &ctx, scope, name)?)),
        (None, inline) => inline,
    };
    Ok(decl)
}

/// Anonymous simple or complex type declared inside `element`
fn inline_type(element: &Element, ctx: &NamespaceContext, scope: &DocumentScope) -> Result<Option<TypeRef>> {
    for child in xsd_children(element) {
        match child.local_name() {
            "simpleType" => {
                return Ok(Some(TypeRef::Simple(Box::new(parse_simple_type(
                    child, ctx, scope, None,
                )?))))
            }
            "complexType" => {
                return Ok(Some(TypeRef::Complex(Box::new(parse_complex_type(
                    child, ctx, scope, None,
                )?))))
            }
            _ => {}
        }
    }
    Ok(None)
}

fn parse_attribute(
    element: &Element,
    parent_ctx: &NamespaceContext,
    scope: &DocumentScope,
    global: bool,
) -> Result<AttributeDecl> {
    let ctx = enter(parent_ctx, element);
    let local_name = required(element, "name")?;
    if local_name == "xmlns" {
        return Err(invalid(element, "an attribute cannot be named 'xmlns'"));
    }
    let qualified = global
        || form_attribute(element, "form")?.unwrap_or(scope.attribute_form_qualified);
    let namespace = if qualified {
        scope.target_namespace.clone()
    } else {
        None
    };

    let inline = xsd_children(element)
        .find(|c| c.local_name() == "simpleType")
        .map(|c| parse_simple_type(c, &ctx, scope, None))
        .transpose()?;
    let type_ref = match (element.attribute("type"), inline) {
        (Some(_), Some(_)) => {
            return Err(invalid(element, "'type' and an anonymous type are mutually exclusive"))
        }
        (Some(name), None) => Some(TypeRef::Named(resolve_qname(element, &ctx, scope, name)?)),
        (None, inline) => inline.map(|s| TypeRef::Simple(Box::new(s))),
    };

    let decl = AttributeDecl {
        name: QName::new(namespace, local_name),
        type_ref,
        default: element.attribute("default").map(str::to_string),
        fixed: element.attribute("fixed").map(str::to_string),
    };
    if decl.default.is_some() && decl.fixed.is_some() {
        return Err(invalid(element, "'default' and 'fixed' are mutually exclusive"));
    }
    Ok(decl)
}

/// Handle an attribute-related child; returns false for anything else
fn parse_attribute_item(
    child: &Element,
    ctx: &NamespaceContext,
    scope: &DocumentScope,
    group: &mut AttributeGroup,
) -> Result<bool> {
    match child.local_name() {
        "attribute" => {
            let usage = match child.attribute("use").map(str::trim) {
                None | Some("optional") => AttributeUsage::Optional,
                Some("required") => AttributeUsage::Required,
                Some("prohibited") => AttributeUsage::Prohibited,
                Some(other) => {
                    return Err(invalid(child, format!("invalid value '{}' for 'use'", other)))
                }
            };
            let attribute_use = match child.attribute("ref") {
                Some(reference) => AttributeUse {
                    attribute: AttributeTerm::Ref(resolve_qname(child, ctx, scope, reference)?),
                    usage,
                    fixed: child.attribute("fixed").map(str::to_string),
                },
                None => AttributeUse {
                    attribute: AttributeTerm::Local(parse_attribute(child, ctx, scope, false)?),
                    usage,
                    fixed: None,
                },
            };
            if group
                .attributes
                .iter()
                .any(|existing| existing.name() == attribute_use.name())
            {
                return Err(invalid(
                    child,
                    format!("attribute '{}' is declared more than once", attribute_use.name()),
                ));
            }
            group.attributes.push(attribute_use);
        }
        "attributeGroup" => {
            let reference = required(child, "ref")?;
            group
                .attribute_groups
                .push(resolve_qname(child, ctx, scope, reference)?);
        }
        "anyAttribute" => group.any_attribute = Some(parse_wildcard(child, scope)?),
        _ => return Ok(false),
    }
    Ok(true)
}

fn parse_attribute_group(
    element: &Element,
    parent_ctx: &NamespaceContext,
    scope: &DocumentScope,
) -> Result<AttributeGroup> {
    let ctx = enter(parent_ctx, element);
    let mut group = AttributeGroup::default();
    for child in xsd_children(element) {
        if !parse_attribute_item(child, &ctx, scope, &mut group)? {
            return Err(invalid(
                child,
                "only attribute declarations are allowed in an attribute group",
            ));
        }
    }
    Ok(group)
}

fn parse_wildcard(element: &Element, scope: &DocumentScope) -> Result<Wildcard> {
    let namespaces = match element.attribute("namespace").map(str::trim) {
        None | Some("##any") => NamespaceConstraint::Any,
        Some("##other") => NamespaceConstraint::Not(scope.target_namespace.clone()),
        Some(list) => NamespaceConstraint::Set(
            list.split_whitespace()
                .map(|token| match token {
                    "##targetNamespace" => scope.target_namespace.clone(),
                    "##local" => None,
                    uri => Some(uri.to_string()),
                })
                .collect(),
        ),
    };
    let process_contents = match element.attribute("processContents").map(str::trim) {
        None | Some("strict") => ProcessContents::Strict,
        Some("lax") => ProcessContents::Lax,
        Some("skip") => ProcessContents::Skip,
        Some(other) => {
            return Err(invalid(
                element,
                format!("invalid value '{}' for 'processContents'", other),
            ))
        }
    };
    Ok(Wildcard {
        namespaces,
        process_contents,
    })
}

// =============================================================================
// Types
// =============================================================================

fn parse_simple_type(
    element: &Element,
    parent_ctx: &NamespaceContext,
    scope: &DocumentScope,
    name: Option<QName>,
) -> Result<SimpleType> {
    let ctx = enter(parent_ctx, element);
    let body = xsd_children(element)
        .next()
        .ok_or_else(|| invalid(element, "expected xs:restriction, xs:list or xs:union"))?;
    let body_ctx = enter(&ctx, body);

    let variety = match body.local_name() {
        "restriction" => {
            let base = match body.attribute("base") {
                Some(base) => TypeRef::Named(resolve_qname(body, &body_ctx, scope, base)?),
                None => {
                    let inline = xsd_children(body)
                        .find(|c| c.local_name() == "simpleType")
                        .ok_or_else(|| invalid(body, "missing 'base' or anonymous base type"))?;
                    TypeRef::Simple(Box::new(parse_simple_type(inline, &body_ctx, scope, None)?))
                }
            };
            let facets = parse_facets(body, |local| local == "simpleType")?;
            Variety::Restriction { base, facets }
        }
        "list" => {
            let item = match body.attribute("itemType") {
                Some(item) => TypeRef::Named(resolve_qname(body, &body_ctx, scope, item)?),
                None => {
                    let inline = xsd_children(body)
                        .find(|c| c.local_name() == "simpleType")
                        .ok_or_else(|| invalid(body, "missing 'itemType' or anonymous item type"))?;
                    TypeRef::Simple(Box::new(parse_simple_type(inline, &body_ctx, scope, None)?))
                }
            };
            Variety::List { item }
        }
        "union" => {
            let mut members = Vec::new();
            if let Some(list) = body.attribute("memberTypes") {
                for member in list.split_whitespace() {
                    members.push(TypeRef::Named(resolve_qname(body, &body_ctx, scope, member)?));
                }
            }
            for inline in xsd_children(body).filter(|c| c.local_name() == "simpleType") {
                members.push(TypeRef::Simple(Box::new(parse_simple_type(
                    inline, &body_ctx, scope, None,
                )?)));
            }
            if members.is_empty() {
                return Err(invalid(body, "a union needs at least one member type"));
            }
            Variety::Union { members }
        }
        other => {
            return Err(invalid(
                body,
                format!("unexpected xs:{} in a simple type", other),
            ))
        }
    };

    Ok(SimpleType { name, variety })
}

/// Facets declared as children of a restriction; `skip` filters non-facet children
fn parse_facets(restriction: &Element, skip: impl Fn(&str) -> bool) -> Result<Facets> {
    let mut facets = Facets::default();
    for child in xsd_children(restriction) {
        if skip(child.local_name()) {
            continue;
        }
        let value = required(child, "value")?;
        facets
            .set(child.local_name(), value)
            .map_err(|e| reword(child, e))?;
    }
    Ok(facets)
}

fn parse_complex_type(
    element: &Element,
    parent_ctx: &NamespaceContext,
    scope: &DocumentScope,
    name: Option<QName>,
) -> Result<ComplexType> {
    let ctx = enter(parent_ctx, element);
    let mut complex = ComplexType::empty(name);
    complex.mixed = boolean_attribute(element, "mixed")?;
    let mut attributes = AttributeGroup::default();

    for child in xsd_children(element) {
        match child.local_name() {
            "simpleContent" | "complexContent" => {
                let content_ctx = enter(&ctx, child);
                if child.local_name() == "complexContent" && child.attribute("mixed").is_some() {
                    complex.mixed = boolean_attribute(child, "mixed")?;
                }
                let derivation = xsd_children(child)
                    .next()
                    .ok_or_else(|| invalid(child, "expected xs:extension or xs:restriction"))?;
                let derivation_ctx = enter(&content_ctx, derivation);
                let method = match derivation.local_name() {
                    "extension" => DerivationMethod::Extension,
                    "restriction" => DerivationMethod::Restriction,
                    other => {
                        return Err(invalid(
                            derivation,
                            format!("unexpected xs:{} in type content", other),
                        ))
                    }
                };
                let base = resolve_qname(
                    derivation,
                    &derivation_ctx,
                    scope,
                    required(derivation, "base")?,
                )?;

                if child.local_name() == "simpleContent" {
                    complex.content = match method {
                        DerivationMethod::Extension => Content::Simple(TypeRef::Named(base.clone())),
                        DerivationMethod::Restriction => {
                            let facets = parse_facets(derivation, |local| {
                                matches!(
                                    local,
                                    "simpleType" | "attribute" | "attributeGroup" | "anyAttribute"
                                )
                            })?;
                            Content::Simple(TypeRef::Simple(Box::new(SimpleType {
                                name: None,
                                variety: Variety::Restriction {
                                    base: TypeRef::Named(base.clone()),
                                    facets,
                                },
                            })))
                        }
                    };
                    for item in xsd_children(derivation) {
                        parse_attribute_item(item, &derivation_ctx, scope, &mut attributes)?;
                    }
                } else {
                    for item in xsd_children(derivation) {
                        if parse_attribute_item(item, &derivation_ctx, scope, &mut attributes)? {
                            continue;
                        }
                        complex.content =
                            Content::Elements(parse_particle(item, &derivation_ctx, scope)?);
                    }
                }
                complex.base = Some((base, method));
            }
            "sequence" | "choice" | "all" | "group" => {
                complex.content = Content::Elements(parse_particle(child, &ctx, scope)?);
            }
            _ => {
                if !parse_attribute_item(child, &ctx, scope, &mut attributes)? {
                    return Err(invalid(
                        child,
                        format!("unexpected xs:{} in a complex type", child.local_name()),
                    ));
                }
            }
        }
    }

    complex.attributes = attributes.attributes;
    complex.attribute_groups = attributes.attribute_groups;
    complex.any_attribute = attributes.any_attribute;
    Ok(complex)
}

// =============================================================================
// Particles
// =============================================================================

fn parse_particle(element: &Element, ctx: &NamespaceContext, scope: &DocumentScope) -> Result<Particle> {
    let occurs = parse_occurs(element)?;
    let term = match element.local_name() {
        "element" => match element.attribute("ref") {
            Some(reference) => {
                let inner = enter(ctx, element);
                Term::ElementRef(resolve_qname(element, &inner, scope, reference)?)
            }
            None => Term::Element(Box::new(parse_element(element, ctx, scope, false)?)),
        },
        "sequence" | "choice" | "all" => {
            let inner = enter(ctx, element);
            let particles = xsd_children(element)
                .map(|child| parse_particle(child, &inner, scope))
                .collect::<Result<Vec<_>>>()?;
            match element.local_name() {
                "sequence" => Term::Sequence(particles),
                "choice" => Term::Choice(particles),
                _ => Term::All(particles),
            }
        }
        "group" => {
            let inner = enter(ctx, element);
            Term::Group(resolve_qname(element, &inner, scope, required(element, "ref")?)?)
        }
        "any" => Term::Any(parse_wildcard(element, scope)?),
        other => {
            return Err(invalid(
                element,
                format!("unexpected xs:{} in a content model", other),
            ))
        }
    };
    Ok(Particle { occurs, term })
}

fn parse_group_definition(
    element: &Element,
    parent_ctx: &NamespaceContext,
    scope: &DocumentScope,
) -> Result<Particle> {
    let ctx = enter(parent_ctx, element);
    let model = xsd_children(element)
        .next()
        .ok_or_else(|| invalid(element, "expected xs:sequence, xs:choice or xs:all"))?;
    if !matches!(model.local_name(), "sequence" | "choice" | "all") {
        return Err(invalid(model, "a named group must contain a model group"));
    }
    let mut particle = parse_particle(model, &ctx, scope)?;
    particle.occurs = Occurs::ONCE;
    Ok(particle)
}

// =============================================================================
// Reference checking
// =============================================================================

/// Fail when a component refers to a name no loaded document declares
fn check_references(schema: &Schema) -> Result<()> {
    let checker = ReferenceChecker { schema };
    for decl in schema.elements.values() {
        checker.element(decl)?;
    }
    for definition in schema.types.values() {
        match definition {
            TypeDef::Simple(simple) => checker.simple(simple)?,
            TypeDef::Complex(complex) => checker.complex(complex)?,
        }
    }
    for decl in schema.attributes.values() {
        checker.attribute(decl)?;
    }
    for particle in schema.groups.values() {
        checker.particle(particle)?;
    }
    for group in schema.attribute_groups.values() {
        checker.attribute_uses(&group.attributes, &group.attribute_groups)?;
    }
    Ok(())
}

struct ReferenceChecker<'s> {
    schema: &'s Schema,
}

impl ReferenceChecker<'_> {
    fn missing(kind: &str, name: &QName) -> Error {
        Error::configuration(format!("{} '{}' is not declared", kind, name))
    }

    fn type_name(&self, name: &QName) -> Result<()> {
        let builtin = name.is_in(XSD_NAMESPACE) && get_builtin_type(&name.local_name).is_some();
        if builtin || self.schema.types.contains_key(name) {
            Ok(())
        } else {
            Err(Self::missing("type", name))
        }
    }

    fn type_ref(&self, type_ref: &TypeRef) -> Result<()> {
        match type_ref {
            TypeRef::Named(name) => self.type_name(name),
            TypeRef::Simple(simple) => self.simple(simple),
            TypeRef::Complex(complex) => self.complex(complex),
        }
    }

    fn simple(&self, simple: &SimpleType) -> Result<()> {
        match &simple.variety {
            Variety::Restriction { base, .. } => self.type_ref(base),
            Variety::List { item } => self.type_ref(item),
            Variety::Union { members } => members.iter().try_for_each(|m| self.type_ref(m)),
        }
    }

    fn complex(&self, complex: &ComplexType) -> Result<()> {
        if let Some((ref base, _)) = complex.base {
            self.type_name(base)?;
        }
        match &complex.content {
            Content::Empty => {}
            Content::Simple(type_ref) => self.type_ref(type_ref)?,
            Content::Elements(particle) => self.particle(particle)?,
        }
        self.attribute_uses(&complex.attributes, &complex.attribute_groups)
    }

    fn element(&self, decl: &ElementDecl) -> Result<()> {
        match decl.type_ref {
            Some(ref type_ref) => self.type_ref(type_ref),
            None => Ok(()),
        }
    }

    fn attribute(&self, decl: &AttributeDecl) -> Result<()> {
        match decl.type_ref {
            Some(TypeRef::Complex(_)) => Err(Error::configuration(format!(
                "attribute '{}' cannot have a complex type",
                decl.name
            ))),
            Some(ref type_ref) => self.type_ref(type_ref),
            None => Ok(()),
        }
    }

    fn attribute_uses(&self, uses: &[AttributeUse], groups: &[QName]) -> Result<()> {
        for attribute_use in uses {
            match attribute_use.attribute {
                AttributeTerm::Local(ref decl) => self.attribute(decl)?,
                AttributeTerm::Ref(ref name) => {
                    if !self.schema.attributes.contains_key(name) {
                        return Err(Self::missing("attribute", name));
                    }
                }
            }
        }
        for name in groups {
            if !self.schema.attribute_groups.contains_key(name) {
                return Err(Self::missing("attribute group", name));
            }
        }
        Ok(())
    }

    fn particle(&self, particle: &Particle) -> Result<()> {
        match &particle.term {
            Term::Element(decl) => self.element(decl),
            Term::ElementRef(name) => {
                if self.schema.elements.contains_key(name) {
                    Ok(())
                } else {
                    Err(Self::missing("element", name))
                }
            }
            Term::Group(name) => {
                if self.schema.groups.contains_key(name) {
                    Ok(())
                } else {
                    Err(Self::missing("group", name))
                }
            }
            Term::Sequence(particles) | Term::Choice(particles) | Term::All(particles) => {
                particles.iter().try_for_each(|p| self.particle(p))
            }
            Term::Any(_) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::QuickXmlProvider;
    use std::fs;
    use tempfile::TempDir;

    const XS: &str = r#"xmlns:xs="http://www.w3.org/2001/XMLSchema""#;

    fn compile(body: &str) -> Result<Schema> {
        Schema::from_text(&format!("<xs:schema {}>{}</xs:schema>", XS, body))
    }

    #[test]
    fn test_parse_simple_schema() {
        let schema = compile(
            r#"<xs:element name="root">
                 <xs:complexType>
                   <xs:sequence>
                     <xs:element name="child" type="xs:integer" maxOccurs="unbounded"/>
                   </xs:sequence>
                   <xs:attribute name="id" type="xs:ID" use="required"/>
                 </xs:complexType>
               </xs:element>"#,
        )
        .unwrap();

        let root = schema.element(&QName::local("root")).unwrap();
        let complex = match root.type_ref {
            Some(TypeRef::Complex(ref c)) => c,
            ref other => panic!("unexpected type {:?}", other),
        };
        assert_eq!(complex.attributes.len(), 1);
        assert_eq!(complex.attributes[0].usage, AttributeUsage::Required);
        match complex.content {
            Content::Elements(Particle {
                term: Term::Sequence(ref items),
                ..
            }) => {
                assert_eq!(items.len(), 1);
                assert_eq!(items[0].occurs, Occurs::new(1, None));
            }
            ref other => panic!("unexpected content {:?}", other),
        }
    }

    #[test]
    fn test_non_schema_root_fails() {
        let err = Schema::from_text("<root/>").unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("xs:schema"));
    }

    #[test]
    fn test_undeclared_type_fails() {
        let err = compile(r#"<xs:element name="a" type="xs:noSuchType"/>"#).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("noSuchType"));

        let err = compile(r#"<xs:element name="a" type="missing"/>"#).unwrap_err();
        assert!(err.to_string().contains("'missing' is not declared"));
    }

    #[test]
    fn test_unknown_prefix_fails() {
        let err = compile(r#"<xs:element name="a" type="q:thing"/>"#).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("unknown namespace prefix 'q'"));
    }

    #[test]
    fn test_duplicate_global_fails() {
        let err = compile(
            r#"<xs:element name="a" type="xs:string"/><xs:element name="a" type="xs:int"/>"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_element_form_default() {
        let schema = Schema::from_text(&format!(
            r#"<xs:schema {} targetNamespace="urn:t" xmlns:t="urn:t" elementFormDefault="qualified">
                 <xs:element name="root" type="t:RootType"/>
                 <xs:complexType name="RootType">
                   <xs:sequence>
                     <xs:element name="inner" type="xs:string"/>
                     <xs:element name="plain" type="xs:string" form="unqualified"/>
                   </xs:sequence>
                 </xs:complexType>
               </xs:schema>"#,
            XS
        ))
        .unwrap();

        let root_type = schema
            .type_definition(&QName::namespaced("urn:t", "RootType"))
            .unwrap();
        let items = match root_type {
            TypeDef::Complex(ComplexType {
                content:
                    Content::Elements(Particle {
                        term: Term::Sequence(items),
                        ..
                    }),
                ..
            }) => items,
            other => panic!("unexpected definition {:?}", other),
        };
        let names: Vec<QName> = items
            .iter()
            .filter_map(|p| match p.term {
                Term::Element(ref d) => Some(d.name.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(
            names,
            vec![QName::namespaced("urn:t", "inner"), QName::local("plain")]
        );
    }

    #[test]
    fn test_simple_type_varieties() {
        let schema = compile(
            r#"<xs:simpleType name="Sizes">
                 <xs:list itemType="xs:integer"/>
               </xs:simpleType>
               <xs:simpleType name="Code">
                 <xs:restriction base="xs:string">
                   <xs:pattern value="[A-Z]{2}"/>
                   <xs:maxLength value="2"/>
                 </xs:restriction>
               </xs:simpleType>
               <xs:simpleType name="CodeOrSize">
                 <xs:union memberTypes="Code xs:integer"/>
               </xs:simpleType>"#,
        )
        .unwrap();
        let names: Vec<String> = schema.type_names().map(|n| n.to_string()).collect();
        assert_eq!(names, vec!["Sizes", "Code", "CodeOrSize"]);
        match schema.type_definition(&QName::local("Code")) {
            Some(TypeDef::Simple(SimpleType {
                variety: Variety::Restriction { facets, .. },
                ..
            })) => {
                assert_eq!(facets.patterns.len(), 1);
                assert_eq!(facets.max_length, Some(2));
            }
            other => panic!("unexpected definition {:?}", other),
        }
    }

    #[test]
    fn test_bad_facet_is_reported_at_component() {
        let err = compile(
            r#"<xs:simpleType name="Bad">
                 <xs:restriction base="xs:string"><xs:length value="many"/></xs:restriction>
               </xs:simpleType>"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("<xs:length>"));
    }

    #[test]
    fn test_occurs_validation() {
        let err = compile(
            r#"<xs:element name="a"><xs:complexType><xs:sequence>
                 <xs:element name="b" minOccurs="3" maxOccurs="2"/>
               </xs:sequence></xs:complexType></xs:element>"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("minOccurs is greater than maxOccurs"));
    }

    #[test]
    fn test_include_and_chameleon() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("types.xsd"),
            format!(
                r#"<xs:schema {}><xs:simpleType name="Code">
                     <xs:restriction base="xs:string"/>
                   </xs:simpleType></xs:schema>"#,
                XS
            ),
        )
        .unwrap();
        let main = dir.path().join("main.xsd");
        fs::write(
            &main,
            format!(
                r#"<xs:schema {} targetNamespace="urn:t" xmlns:t="urn:t">
                     <xs:include schemaLocation="types.xsd"/>
                     <xs:element name="code" type="t:Code"/>
                   </xs:schema>"#,
                XS
            ),
        )
        .unwrap();

        let schema = Schema::from_file(&main).unwrap();
        assert!(schema
            .type_definition(&QName::namespaced("urn:t", "Code"))
            .is_some());
        assert_eq!(schema.system_id(), Some(main.to_string_lossy().as_ref()));
    }

    #[test]
    fn test_circular_include() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.xsd");
        fs::write(
            &a,
            format!(
                r#"<xs:schema {}><xs:include schemaLocation="b.xsd"/><xs:element name="a"/></xs:schema>"#,
                XS
            ),
        )
        .unwrap();
        fs::write(
            dir.path().join("b.xsd"),
            format!(
                r#"<xs:schema {}><xs:include schemaLocation="a.xsd"/><xs:element name="b"/></xs:schema>"#,
                XS
            ),
        )
        .unwrap();

        let schema = Schema::from_file(&a).unwrap();
        assert_eq!(schema.element_names().count(), 2);
    }

    #[test]
    fn test_include_depth_limit() {
        let dir = TempDir::new().unwrap();
        for i in 0..5 {
            fs::write(
                dir.path().join(format!("s{}.xsd", i)),
                format!(
                    r#"<xs:schema {}><xs:include schemaLocation="s{}.xsd"/></xs:schema>"#,
                    XS,
                    i + 1
                ),
            )
            .unwrap();
        }
        let limits = Limits {
            max_schema_depth: 3,
            ..Limits::default()
        };
        let err = Schema::from_location(
            &Location::from(dir.path().join("s0.xsd")),
            &Loader::new(),
            &QuickXmlProvider,
            &limits,
        )
        .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_import_namespace_mismatch() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("other.xsd"),
            format!(r#"<xs:schema {} targetNamespace="urn:wrong"/>"#, XS),
        )
        .unwrap();
        let main = dir.path().join("main.xsd");
        fs::write(
            &main,
            format!(
                r#"<xs:schema {}><xs:import namespace="urn:other" schemaLocation="other.xsd"/></xs:schema>"#,
                XS
            ),
        )
        .unwrap();
        let err = Schema::from_file(&main).unwrap_err();
        assert!(err.to_string().contains("urn:wrong"));
    }

    #[test]
    fn test_missing_include_is_io_error() {
        let err = compile(r#"<xs:include schemaLocation="/nonexistent/dir/none.xsd"/>"#).unwrap_err();
        assert!(err.is_io());
    }
}
