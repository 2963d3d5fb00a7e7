//! Tree provider backed by roxmltree

use super::{Feature, ParseOptions, ParserProvider, ROXMLTREE_PROVIDER};
use crate::documents::{
    Attribute, Document, Element, NamespaceDeclaration, Node, ProcessingInstruction,
};
use crate::error::{Error, ParseError, Result, TextPosition};
use crate::handlers::{raise_fatal, ErrorHandler};
use crate::limits::Limits;
use crate::namespaces::{QName, XML_NAMESPACE};

/// Provider converting a strict roxmltree parse into a [`Document`]
///
/// Always namespace-aware. Entities declared in an internal DTD subset are
/// expanded; the DTD itself is not used for validation.
#[derive(Debug, Default, Clone, Copy)]
pub struct RoxmltreeProvider;

impl ParserProvider for RoxmltreeProvider {
    fn name(&self) -> &str {
        ROXMLTREE_PROVIDER
    }

    fn supports(&self, feature: Feature) -> bool {
        matches!(feature, Feature::DocumentType)
    }

    fn parse(
        &self,
        text: &str,
        options: &ParseOptions,
        handler: &mut dyn ErrorHandler,
    ) -> Result<Document> {
        if !options.namespace_aware {
            return Err(Error::configuration(
                "the roxmltree provider cannot parse without namespace processing",
            ));
        }

        let mut parsing = roxmltree::ParsingOptions::default();
        parsing.allow_dtd = true;

        let fatal = |e: ParseError| match options.system_id {
            Some(ref id) => e.with_system_id(id.as_str()),
            None => e,
        };

        let tree = match roxmltree::Document::parse_with_options(text, parsing) {
            Ok(tree) => tree,
            Err(e) => {
                let pos = e.pos();
                let err = ParseError::syntax(e.to_string())
                    .with_location(TextPosition::new(pos.row as usize, pos.col as usize));
                return Err(raise_fatal(handler, fatal(err)).into());
            }
        };

        if let Some(offset) = doctype_offset(&tree, text) {
            let mut warning = ParseError::syntax(
                "document type declaration is used for entity expansion only",
            )
            .with_location(TextPosition::from_offset(text, offset));
            warning.system_id = options.system_id.clone();
            handler.warning(&warning);
        }

        let mut document = convert(&tree, text, &options.limits)
            .map_err(|e| Error::from(raise_fatal(handler, fatal(e))))?;
        document.system_id = options.system_id.clone();
        Ok(document)
    }
}

/// Offset of the document type declaration, looked up in the prolog only
fn doctype_offset(tree: &roxmltree::Document, text: &str) -> Option<usize> {
    let prolog = text.get(..tree.root_element().range().start)?;
    prolog
        .match_indices("<!DOCTYPE")
        .map(|(offset, _)| offset)
        .find(|offset| !tree.root().children().any(|n| n.range().contains(offset)))
}

fn convert(
    tree: &roxmltree::Document,
    text: &str,
    limits: &Limits,
) -> std::result::Result<Document, ParseError> {
    let root = convert_element(tree.root_element(), text, 1, limits)?;
    let mut document = Document::new(root);

    let mut seen_root = false;
    for node in tree.root().children() {
        if node.is_element() {
            seen_root = true;
            continue;
        }
        if let Some(misc) = convert_misc(node) {
            if seen_root {
                document.epilog.push(misc);
            } else {
                document.prolog.push(misc);
            }
        }
    }

    Ok(document)
}

fn convert_misc(node: roxmltree::Node) -> Option<Node> {
    if node.is_comment() {
        return node.text().map(|t| Node::Comment(t.to_string()));
    }
    node.pi().map(|pi| {
        Node::ProcessingInstruction(ProcessingInstruction {
            target: pi.target.to_string(),
            data: pi.value.map(str::to_string),
        })
    })
}

fn convert_element(
    node: roxmltree::Node,
    text: &str,
    depth: usize,
    limits: &Limits,
) -> std::result::Result<Element, ParseError> {
    let start = node.range().start;
    let position = TextPosition::from_offset(text, start);
    let at = |e: ParseError| e.with_location(position);

    limits.check_xml_depth(depth).map_err(at)?;

    let tag = node.tag_name();
    let mut element = Element::new(QName::new(tag.namespace(), tag.name()));
    element.prefix = source_prefix(text, start);
    element.position = Some(position);

    let parent = node.parent_element();
    for ns in node.namespaces() {
        if ns.name() == Some("xml") {
            continue;
        }
        if let (Some(prefix), "") = (ns.name(), ns.uri()) {
            return Err(at(ParseError::syntax(format!(
                "the prefix '{}' cannot be bound to an empty namespace name",
                prefix
            ))));
        }
        let inherited = parent
            .map(|p| p.lookup_namespace_uri(ns.name()) == Some(ns.uri()))
            .unwrap_or(false);
        if !inherited {
            element.namespace_declarations.push(NamespaceDeclaration {
                prefix: ns.name().map(str::to_string),
                uri: ns.uri().to_string(),
            });
        }
    }
    limits
        .check_namespaces(element.namespace_declarations.len())
        .map_err(at)?;

    for attr in node.attributes() {
        let prefix = attr.namespace().and_then(|uri| {
            if uri == XML_NAMESPACE {
                Some("xml".to_string())
            } else {
                node.lookup_prefix(uri).map(str::to_string)
            }
        });
        element.attributes.push(Attribute {
            name: QName::new(attr.namespace(), attr.name()),
            prefix,
            value: attr.value().to_string(),
        });
    }
    limits.check_attributes(element.attributes.len()).map_err(at)?;

    for child in node.children() {
        if child.is_element() {
            let converted = convert_element(child, text, depth + 1, limits)?;
            element.add_child(Node::Element(converted));
        } else if child.is_text() {
            element.push_text(child.text().unwrap_or_default());
        } else if let Some(misc) = convert_misc(child) {
            element.add_child(misc);
        }
    }

    Ok(element)
}

/// Prefix of the start tag beginning at `start`, read from the source text
fn source_prefix(text: &str, start: usize) -> Option<String> {
    let tag = text.get(start..)?.strip_prefix('<')?;
    let end = tag.find(|c: char| c.is_whitespace() || c == '>' || c == '/')?;
    tag[..end].split_once(':').map(|(p, _)| p.to_string())
}
