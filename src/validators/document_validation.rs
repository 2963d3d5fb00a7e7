//! Document validation against a compiled schema
//!
//! Walks the instance tree from the root, assigning each element the
//! declaration its parent's content model gives it. Every violation is
//! reported to the [`ErrorHandler`] with the element path; validation goes
//! on until the handler raises.

use super::builtins::{get_builtin_type, BuiltinType, XsdValue};
use super::facets::WhiteSpace;
use super::schemas::{
    AttributeDecl, AttributeTerm, AttributeUsage, AttributeUse, ComplexType, Content,
    DerivationMethod, ElementDecl, Particle, ProcessContents, Schema, SimpleType, Term, TypeDef,
    TypeRef, Variety, Wildcard,
};
use crate::documents::{Document, Element, Node};
use crate::error::ParseError;
use crate::handlers::ErrorHandler;
use crate::namespaces::{QName, XSD_NAMESPACE, XSI_NAMESPACE};

/// Guard against derivation and group reference cycles
const MAX_DERIVATION_DEPTH: usize = 64;

type Outcome = Result<(), ParseError>;

/// A simple type, built-in or defined by the schema
#[derive(Debug, Clone, Copy)]
enum SimpleRef<'s> {
    /// xs:anySimpleType, or an attribute declared without a type
    AnySimple,
    Builtin(&'static BuiltinType),
    Defined(&'s SimpleType),
}

/// Type governing an element
#[derive(Debug, Clone, Copy)]
enum ElementType<'s> {
    /// xs:anyType
    Any,
    Simple(SimpleRef<'s>),
    Complex(&'s ComplexType),
}

/// What a child element was matched against
#[derive(Debug, Clone, Copy)]
enum Attribution<'s> {
    Declared(&'s ElementDecl),
    Wildcard(&'s Wildcard),
}

/// Content of a complex type with its base types folded in
#[derive(Debug, Default)]
struct EffectiveContent<'s> {
    particles: Vec<&'s Particle>,
    simple: Option<&'s TypeRef>,
    mixed: bool,
}

/// Result of matching children against a content model
#[derive(Debug, Default)]
struct ContentMatch<'s> {
    assigned: Vec<(usize, Attribution<'s>)>,
    furthest: usize,
}

/// Validates one document, reporting to a handler
pub(crate) struct DocumentValidator<'s, 'h> {
    schema: &'s Schema,
    handler: &'h mut dyn ErrorHandler,
    system_id: Option<String>,
}

impl<'s, 'h> DocumentValidator<'s, 'h> {
    pub(crate) fn new(
        schema: &'s Schema,
        handler: &'h mut dyn ErrorHandler,
        system_id: Option<String>,
    ) -> Self {
        Self {
            schema,
            handler,
            system_id,
        }
    }

    pub(crate) fn validate(mut self, document: &Document) -> Outcome {
        let root = document.root();
        let path = format!("/{}", root.tag_name());
        match self.schema.elements.get(&root.name) {
            Some(decl) => self.element(root, decl, &path),
            None => self.report(
                root,
                &path,
                format!(
                    "cvc-elt.1: cannot find the declaration of element '{}'",
                    root.tag_name()
                ),
            ),
        }
    }

    fn report(&mut self, element: &Element, path: &str, message: String) -> Outcome {
        let mut error = ParseError::validation(message).with_path(path);
        if let Some(position) = element.position {
            error = error.with_location(position);
        }
        if let Some(ref id) = self.system_id {
            error = error.with_system_id(id.as_str());
        }
        tracing::debug!("validation error at {}: {}", path, error.message);
        self.handler.error(error)
    }

    // =========================================================================
    // Elements
    // =========================================================================

    fn element(&mut self, element: &Element, decl: &'s ElementDecl, path: &str) -> Outcome {
        let tag = element.tag_name();
        if decl.is_abstract {
            return self.report(
                element,
                path,
                format!("cvc-elt.2: element '{}' is abstract and cannot appear in an instance", tag),
            );
        }

        let element_type = match self.element_type(decl.type_ref.as_ref()) {
            Ok(t) => t,
            Err(e) => return self.report(element, path, e.message),
        };

        if let Some(nil) = element.attribute_ns(Some(XSI_NAMESPACE), "nil") {
            if !decl.nillable {
                self.report(
                    element,
                    path,
                    format!("cvc-elt.3.1: attribute xsi:nil must not appear on element '{}', which is not nillable", tag),
                )?;
            } else if matches!(nil.trim(), "true" | "1") {
                if element.has_child_elements() || !element.text_content().is_empty() {
                    self.report(
                        element,
                        path,
                        format!("cvc-elt.3.2.1: element '{}' is nil and must have no content", tag),
                    )?;
                }
                if decl.fixed.is_some() {
                    self.report(
                        element,
                        path,
                        format!("cvc-elt.3.2.2: element '{}' has a fixed value and cannot be nil", tag),
                    )?;
                }
                if let ElementType::Complex(complex) = element_type {
                    self.attributes(element, complex, path)?;
                }
                return Ok(());
            }
        }

        match element_type {
            ElementType::Any => self.lax_children(element, path),
            ElementType::Simple(simple) => {
                if let Some(attr) = element
                    .attributes
                    .iter()
                    .find(|a| !a.name.is_in(XSI_NAMESPACE))
                {
                    self.report(
                        element,
                        path,
                        format!(
                            "cvc-type.3.1.1: element '{}' has a simple type and cannot have attribute '{}'",
                            tag,
                            attr.qualified_name()
                        ),
                    )?;
                }
                self.simple_content(element, decl, simple, path)
            }
            ElementType::Complex(complex) => self.complex_element(element, decl, complex, path),
        }
    }

    fn simple_content(
        &mut self,
        element: &Element,
        decl: &ElementDecl,
        simple: SimpleRef<'s>,
        path: &str,
    ) -> Outcome {
        let tag = element.tag_name();
        if element.has_child_elements() {
            return self.report(
                element,
                path,
                format!("cvc-type.3.1.2: element '{}' has simple content and must have no element children", tag),
            );
        }

        let mut text = element.text_content();
        if text.is_empty() {
            if let Some(ref default) = decl.default {
                text = default.clone();
            }
        }

        let value = match self.simple_value(simple, &text, 0) {
            Ok(value) => value,
            Err(e) => {
                return self.report(
                    element,
                    path,
                    format!("cvc-datatype-valid: element '{}': {}", tag, e.message),
                )
            }
        };

        if let Some(ref fixed) = decl.fixed {
            if !self.same_value(simple, &value, &text, fixed) {
                return self.report(
                    element,
                    path,
                    format!(
                        "cvc-elt.5.2.2.2: the value '{}' of element '{}' does not match the fixed value '{}'",
                        text.trim(),
                        tag,
                        fixed
                    ),
                );
            }
        }
        Ok(())
    }

    fn complex_element(
        &mut self,
        element: &Element,
        decl: &ElementDecl,
        complex: &'s ComplexType,
        path: &str,
    ) -> Outcome {
        self.attributes(element, complex, path)?;

        let content = match self.effective_content(complex, 0) {
            Ok(content) => content,
            Err(e) => return self.report(element, path, e.message),
        };
        let tag = element.tag_name();

        if let Some(type_ref) = content.simple {
            return match self.simple_type(type_ref, 0) {
                Ok(simple) => self.simple_content(element, decl, simple, path),
                Err(e) => self.report(element, path, e.message),
            };
        }

        let has_text = element
            .children
            .iter()
            .filter_map(Node::as_text)
            .any(|t| !t.trim().is_empty());

        if content.particles.is_empty() {
            if element.has_child_elements() || (has_text && !content.mixed) {
                return self.report(
                    element,
                    path,
                    format!("cvc-complex-type.2.1: element '{}' must be empty", tag),
                );
            }
            return Ok(());
        }

        if has_text && !content.mixed {
            self.report(
                element,
                path,
                format!(
                    "cvc-complex-type.2.3: element '{}' has element-only content and cannot contain character data",
                    tag
                ),
            )?;
        }

        let children: Vec<&Element> = element.child_elements().collect();
        let mut matched = ContentMatch::default();
        let mut end = Some(0);
        for &particle in &content.particles {
            end = end.and_then(|pos| self.match_occurs(particle, &children, pos, &mut matched, 0));
        }

        match end {
            Some(end) if end == children.len() => {}
            Some(end) => {
                self.report(
                    element,
                    path,
                    format!(
                        "cvc-complex-type.2.4.a: invalid content was found in element '{}' starting with element '{}'",
                        tag,
                        children[end].tag_name()
                    ),
                )?;
            }
            None if matched.furthest < children.len() => {
                return self.report(
                    element,
                    path,
                    format!(
                        "cvc-complex-type.2.4.a: invalid content was found in element '{}' starting with element '{}'",
                        tag,
                        children[matched.furthest].tag_name()
                    ),
                );
            }
            None => {
                return self.report(
                    element,
                    path,
                    format!(
                        "cvc-complex-type.2.4.b: the content of element '{}' is not complete",
                        tag
                    ),
                );
            }
        }

        for (index, attribution) in matched.assigned {
            let child = children[index];
            let child_path = child_path(path, &children, index);
            match attribution {
                Attribution::Declared(decl) => self.element(child, decl, &child_path)?,
                Attribution::Wildcard(wildcard) => {
                    self.wildcard_element(child, wildcard, &child_path)?
                }
            }
        }
        Ok(())
    }

    fn wildcard_element(&mut self, element: &Element, wildcard: &Wildcard, path: &str) -> Outcome {
        let global = self.schema.elements.get(&element.name);
        match (wildcard.process_contents, global) {
            (ProcessContents::Skip, _) => Ok(()),
            (_, Some(decl)) => self.element(element, decl, path),
            (ProcessContents::Lax, None) => self.lax_children(element, path),
            (ProcessContents::Strict, None) => self.report(
                element,
                path,
                format!(
                    "cvc-complex-type.2.4.c: the matching wildcard is strict, but no declaration can be found for element '{}'",
                    element.tag_name()
                ),
            ),
        }
    }

    /// Content of xs:anyType: children with a global declaration are checked
    fn lax_children(&mut self, element: &Element, path: &str) -> Outcome {
        let children: Vec<&Element> = element.child_elements().collect();
        for (index, child) in children.iter().enumerate() {
            let child_path = child_path(path, &children, index);
            match self.schema.elements.get(&child.name) {
                Some(decl) => self.element(child, decl, &child_path)?,
                None => self.lax_children(child, &child_path)?,
            }
        }
        Ok(())
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    fn attributes(&mut self, element: &Element, complex: &'s ComplexType, path: &str) -> Outcome {
        let tag = element.tag_name();
        let mut uses = Vec::new();
        let mut any_attribute = None;
        if let Err(e) = self.attribute_uses(complex, &mut uses, &mut any_attribute, 0) {
            return self.report(element, path, e.message);
        }

        for attr in &element.attributes {
            if attr.name.is_in(XSI_NAMESPACE) || is_namespace_declaration(&attr.name) {
                continue;
            }
            let name = attr.qualified_name();

            let (decl, fixed) = match uses.iter().copied().find(|u| u.name() == &attr.name) {
                Some(u) if u.usage == AttributeUsage::Prohibited => {
                    self.report(
                        element,
                        path,
                        format!(
                            "cvc-complex-type.3.2.2: attribute '{}' is not allowed to appear in element '{}'",
                            name, tag
                        ),
                    )?;
                    continue;
                }
                Some(u) => match self.attribute_decl(u) {
                    Some(decl) => (decl, u.fixed.as_ref().or(decl.fixed.as_ref())),
                    None => continue,
                },
                None => {
                    let global = self.schema.attributes.get(&attr.name);
                    match any_attribute {
                        Some(w) if w.allows(attr.name.namespace.as_deref()) => {
                            match (w.process_contents, global) {
                                (ProcessContents::Skip, _) | (ProcessContents::Lax, None) => continue,
                                (_, Some(decl)) => (decl, decl.fixed.as_ref()),
                                (ProcessContents::Strict, None) => {
                                    self.report(
                                        element,
                                        path,
                                        format!(
                                            "cvc-complex-type.3.2.2: no declaration can be found for attribute '{}' of element '{}'",
                                            name, tag
                                        ),
                                    )?;
                                    continue;
                                }
                            }
                        }
                        _ => {
                            self.report(
                                element,
                                path,
                                format!(
                                    "cvc-complex-type.3.2.2: attribute '{}' is not allowed to appear in element '{}'",
                                    name, tag
                                ),
                            )?;
                            continue;
                        }
                    }
                }
            };

            let simple = match decl.type_ref {
                Some(ref type_ref) => match self.simple_type(type_ref, 0) {
                    Ok(simple) => simple,
                    Err(e) => {
                        self.report(element, path, e.message)?;
                        continue;
                    }
                },
                None => SimpleRef::AnySimple,
            };
            match self.simple_value(simple, &attr.value, 0) {
                Ok(value) => {
                    if let Some(fixed) = fixed {
                        if !self.same_value(simple, &value, &attr.value, fixed) {
                            self.report(
                                element,
                                path,
                                format!(
                                    "cvc-attribute.4: the value '{}' of attribute '{}' on element '{}' does not match the fixed value '{}'",
                                    attr.value, name, tag, fixed
                                ),
                            )?;
                        }
                    }
                }
                Err(e) => {
                    self.report(
                        element,
                        path,
                        format!(
                            "cvc-attribute.3: attribute '{}' on element '{}': {}",
                            name, tag, e.message
                        ),
                    )?;
                }
            }
        }

        for u in uses.iter().filter(|u| u.usage == AttributeUsage::Required) {
            if !element.attributes.iter().any(|a| &a.name == u.name()) {
                self.report(
                    element,
                    path,
                    format!(
                        "cvc-complex-type.4: attribute '{}' must appear on element '{}'",
                        u.name().local_name,
                        tag
                    ),
                )?;
            }
        }
        Ok(())
    }

    fn attribute_decl(&self, attribute_use: &'s AttributeUse) -> Option<&'s AttributeDecl> {
        match attribute_use.attribute {
            AttributeTerm::Local(ref decl) => Some(decl),
            AttributeTerm::Ref(ref name) => self.schema.attributes.get(name),
        }
    }

    /// Attribute uses of a type, its attribute groups and its base types
    fn attribute_uses(
        &self,
        complex: &'s ComplexType,
        uses: &mut Vec<&'s AttributeUse>,
        any_attribute: &mut Option<&'s Wildcard>,
        depth: usize,
    ) -> Result<(), ParseError> {
        check_depth(depth)?;
        push_uses(uses, &complex.attributes);
        if any_attribute.is_none() {
            *any_attribute = complex.any_attribute.as_ref();
        }
        for group in &complex.attribute_groups {
            self.attribute_group_uses(group, uses, any_attribute, depth + 1)?;
        }
        if let Some((ref base, _)) = complex.base {
            if let Some(TypeDef::Complex(base)) = self.schema.types.get(base) {
                self.attribute_uses(base, uses, any_attribute, depth + 1)?;
            }
        }
        Ok(())
    }

    fn attribute_group_uses(
        &self,
        name: &QName,
        uses: &mut Vec<&'s AttributeUse>,
        any_attribute: &mut Option<&'s Wildcard>,
        depth: usize,
    ) -> Result<(), ParseError> {
        check_depth(depth)?;
        let Some(group) = self.schema.attribute_groups.get(name) else {
            return Ok(());
        };
        push_uses(uses, &group.attributes);
        if any_attribute.is_none() {
            *any_attribute = group.any_attribute.as_ref();
        }
        for nested in &group.attribute_groups {
            self.attribute_group_uses(nested, uses, any_attribute, depth + 1)?;
        }
        Ok(())
    }

    // =========================================================================
    // Content models
    // =========================================================================

    fn effective_content(
        &self,
        complex: &'s ComplexType,
        depth: usize,
    ) -> Result<EffectiveContent<'s>, ParseError> {
        check_depth(depth)?;
        let mut content = match complex.base {
            Some((ref base, DerivationMethod::Extension)) => match self.schema.types.get(base) {
                Some(TypeDef::Complex(base)) => self.effective_content(base, depth + 1)?,
                _ => EffectiveContent::default(),
            },
            _ => EffectiveContent::default(),
        };
        match complex.content {
            Content::Empty => {}
            Content::Simple(ref type_ref) => content.simple = Some(type_ref),
            Content::Elements(ref particle) => content.particles.push(particle),
        }
        content.mixed |= complex.mixed;
        Ok(content)
    }

    /// Match `particle` as many times as allowed, starting at `pos`
    ///
    /// Greedy: each repetition takes as many children as its term can.
    fn match_occurs(
        &self,
        particle: &'s Particle,
        children: &[&Element],
        pos: usize,
        matched: &mut ContentMatch<'s>,
        depth: usize,
    ) -> Option<usize> {
        let mut count = 0;
        let mut current = pos;
        while particle.occurs.allows(count) {
            let mark = matched.assigned.len();
            match self.match_term(&particle.term, children, current, matched, depth) {
                Some(next) if next > current => {
                    current = next;
                    count += 1;
                }
                Some(_) => {
                    // An emptiable term satisfies the remaining occurrences
                    count = count.max(particle.occurs.min);
                    break;
                }
                None => {
                    matched.assigned.truncate(mark);
                    break;
                }
            }
        }
        (count >= particle.occurs.min).then_some(current)
    }

    fn match_term(
        &self,
        term: &'s Term,
        children: &[&Element],
        pos: usize,
        matched: &mut ContentMatch<'s>,
        depth: usize,
    ) -> Option<usize> {
        if depth > MAX_DERIVATION_DEPTH {
            return None;
        }
        match term {
            Term::Element(decl) => match_element(decl, children, pos, matched),
            Term::ElementRef(name) => {
                let decl = self.schema.elements.get(name)?;
                match_element(decl, children, pos, matched)
            }
            Term::Group(name) => {
                let group = self.schema.groups.get(name)?;
                self.match_term(&group.term, children, pos, matched, depth + 1)
            }
            Term::Sequence(particles) => {
                let mark = matched.assigned.len();
                let mut current = pos;
                for particle in particles {
                    match self.match_occurs(particle, children, current, matched, depth + 1) {
                        Some(next) => current = next,
                        None => {
                            matched.assigned.truncate(mark);
                            return None;
                        }
                    }
                }
                Some(current)
            }
            Term::Choice(particles) => {
                let mut emptiable = false;
                for particle in particles {
                    let mark = matched.assigned.len();
                    match self.match_occurs(particle, children, pos, matched, depth + 1) {
                        Some(next) if next > pos => return Some(next),
                        Some(_) => emptiable = true,
                        None => {}
                    }
                    matched.assigned.truncate(mark);
                }
                emptiable.then_some(pos)
            }
            Term::All(particles) => {
                let mut used = vec![0usize; particles.len()];
                let mut current = pos;
                'next_child: while current < children.len() {
                    for (i, particle) in particles.iter().enumerate() {
                        if !particle.occurs.allows(used[i]) {
                            continue;
                        }
                        let mark = matched.assigned.len();
                        match self.match_term(&particle.term, children, current, matched, depth + 1) {
                            Some(next) if next > current => {
                                used[i] += 1;
                                current = next;
                                continue 'next_child;
                            }
                            _ => matched.assigned.truncate(mark),
                        }
                    }
                    break;
                }
                particles
                    .iter()
                    .zip(&used)
                    .all(|(particle, &count)| count >= particle.occurs.min)
                    .then_some(current)
            }
            Term::Any(wildcard) => {
                let child = children.get(pos)?;
                if !wildcard.allows(child.namespace()) {
                    return None;
                }
                matched.assigned.push((pos, Attribution::Wildcard(wildcard)));
                matched.furthest = matched.furthest.max(pos + 1);
                Some(pos + 1)
            }
        }
    }

    // =========================================================================
    // Simple values
    // =========================================================================

    fn element_type(&self, type_ref: Option<&'s TypeRef>) -> Result<ElementType<'s>, ParseError> {
        match type_ref {
            None => Ok(ElementType::Any),
            Some(TypeRef::Complex(complex)) => Ok(ElementType::Complex(complex)),
            Some(TypeRef::Simple(simple)) => Ok(ElementType::Simple(SimpleRef::Defined(simple))),
            Some(TypeRef::Named(name)) => {
                if name.is_in(XSD_NAMESPACE) {
                    if name.local_name == "anyType" {
                        return Ok(ElementType::Any);
                    }
                    if let Some(builtin) = get_builtin_type(&name.local_name) {
                        return Ok(ElementType::Simple(SimpleRef::Builtin(builtin)));
                    }
                }
                match self.schema.types.get(name) {
                    Some(TypeDef::Simple(simple)) => Ok(ElementType::Simple(SimpleRef::Defined(simple))),
                    Some(TypeDef::Complex(complex)) => Ok(ElementType::Complex(complex)),
                    None => Err(ParseError::validation(format!(
                        "type '{}' is not declared",
                        name
                    ))),
                }
            }
        }
    }

    /// Resolve a reference that must denote a simple type
    ///
    /// A complex type with simple content stands for its content type.
    fn simple_type(&self, type_ref: &'s TypeRef, depth: usize) -> Result<SimpleRef<'s>, ParseError> {
        check_depth(depth)?;
        match self.element_type(Some(type_ref))? {
            ElementType::Simple(simple) => Ok(simple),
            ElementType::Any => Ok(SimpleRef::AnySimple),
            ElementType::Complex(complex) => match self.effective_content(complex, depth + 1)?.simple {
                Some(content) => self.simple_type(content, depth + 1),
                None => Err(ParseError::validation(format!(
                    "type '{}' does not have simple content",
                    complex
                        .name
                        .as_ref()
                        .map(|n| n.to_string())
                        .unwrap_or_else(|| "(anonymous)".to_string())
                ))),
            },
        }
    }

    fn white_space(&self, simple: SimpleRef<'s>, depth: usize) -> Option<WhiteSpace> {
        if depth > MAX_DERIVATION_DEPTH {
            return None;
        }
        match simple {
            SimpleRef::AnySimple => Some(WhiteSpace::Preserve),
            SimpleRef::Builtin(builtin) => Some(builtin.white_space),
            SimpleRef::Defined(defined) => match defined.variety {
                Variety::Restriction { ref base, ref facets } => facets.white_space.or_else(|| {
                    self.simple_type(base, depth + 1)
                        .ok()
                        .and_then(|b| self.white_space(b, depth + 1))
                }),
                Variety::List { .. } => Some(WhiteSpace::Collapse),
                Variety::Union { .. } => None,
            },
        }
    }

    fn simple_value(&self, simple: SimpleRef<'s>, lexical: &str, depth: usize) -> Result<XsdValue, ParseError> {
        check_depth(depth)?;
        let defined = match simple {
            SimpleRef::AnySimple => return Ok(XsdValue::String(lexical.to_string())),
            SimpleRef::Builtin(builtin) => return builtin.validate(lexical),
            SimpleRef::Defined(defined) => defined,
        };

        match defined.variety {
            Variety::Restriction { ref base, ref facets } => {
                let base = self.simple_type(base, depth + 1)?;
                let normalized = match self.white_space(simple, depth) {
                    Some(mode) => mode.normalize(lexical),
                    None => lexical.to_string(),
                };
                let value = self.simple_value(base, &normalized, depth + 1)?;
                facets.check(&normalized, &value, &|operand: &str| {
                    self.simple_value(base, operand, depth + 1)
                })?;
                Ok(value)
            }
            Variety::List { ref item } => {
                let item = self.simple_type(item, depth + 1)?;
                lexical
                    .split_whitespace()
                    .map(|token| self.simple_value(item, token, depth + 1))
                    .collect::<Result<Vec<_>, _>>()
                    .map(XsdValue::List)
            }
            Variety::Union { ref members } => {
                for member in members {
                    let value = self
                        .simple_type(member, depth + 1)
                        .and_then(|m| self.simple_value(m, lexical, depth + 1));
                    if value.is_ok() {
                        return value;
                    }
                }
                Err(ParseError::validation(format!(
                    "'{}' is not valid for any member type of the union",
                    lexical.trim()
                )))
            }
        }
    }

    /// Whether `value` equals the `fixed` constraint of the same type
    fn same_value(&self, simple: SimpleRef<'s>, value: &XsdValue, lexical: &str, fixed: &str) -> bool {
        match self.simple_value(simple, fixed, 0) {
            Ok(expected) => &expected == value,
            Err(_) => lexical == fixed,
        }
    }
}

fn check_depth(depth: usize) -> Result<(), ParseError> {
    if depth > MAX_DERIVATION_DEPTH {
        Err(ParseError::validation(
            "type derivation or group references are nested too deeply (circular definition?)",
        ))
    } else {
        Ok(())
    }
}

/// Add uses whose names are not already present; earlier uses win
fn push_uses<'s>(uses: &mut Vec<&'s AttributeUse>, more: &'s [AttributeUse]) {
    for candidate in more {
        if !uses.iter().any(|u| u.name() == candidate.name()) {
            uses.push(candidate);
        }
    }
}

fn match_element<'s>(
    decl: &'s ElementDecl,
    children: &[&Element],
    pos: usize,
    matched: &mut ContentMatch<'s>,
) -> Option<usize> {
    let child = children.get(pos)?;
    if child.name != decl.name {
        return None;
    }
    matched.assigned.push((pos, Attribution::Declared(decl)));
    matched.furthest = matched.furthest.max(pos + 1);
    Some(pos + 1)
}

/// Raw `xmlns` attributes left by a namespace-unaware parse
fn is_namespace_declaration(name: &QName) -> bool {
    name.namespace.is_none()
        && (name.local_name == "xmlns" || name.local_name.starts_with("xmlns:"))
}

/// `/parent/child[n]`, counting same-named siblings from 1
fn child_path(parent: &str, siblings: &[&Element], index: usize) -> String {
    let child = siblings[index];
    let position = siblings[..index]
        .iter()
        .filter(|s| s.name == child.name)
        .count()
        + 1;
    format!("{}/{}[{}]", parent, child.tag_name(), position)
}
