//! Streaming provider backed by quick-xml

use super::{Feature, ParseOptions, ParserProvider, QUICK_XML_PROVIDER};
use crate::documents::{
    Attribute, Document, Element, NamespaceDeclaration, Node, ProcessingInstruction, TreeBuilder,
};
use crate::error::{ParseError, Result, TextPosition};
use crate::handlers::{raise_fatal, ErrorHandler};
use crate::namespaces::{is_qname, is_xml_name, QName};
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::{NsReader, Reader};
use std::borrow::Cow;

/// Provider reading events with quick-xml and assembling the tree itself
///
/// Supports namespace-unaware parsing. Entities declared in a DTD are not
/// expanded; a document type declaration is kept verbatim and reported as
/// a warning. Line endings and attribute values are normalized as XML 1.0
/// requires, so both providers build the same tree from the same text.
#[derive(Debug, Default, Clone, Copy)]
pub struct QuickXmlProvider;

impl ParserProvider for QuickXmlProvider {
    fn name(&self) -> &str {
        QUICK_XML_PROVIDER
    }

    fn supports(&self, feature: Feature) -> bool {
        matches!(feature, Feature::NamespaceUnaware)
    }

    fn parse(
        &self,
        text: &str,
        options: &ParseOptions,
        handler: &mut dyn ErrorHandler,
    ) -> Result<Document> {
        let normalized = normalize_line_endings(text);
        let text: &str = &normalized;
        let source = if options.namespace_aware {
            let mut reader = NsReader::from_str(text);
            reader.expand_empty_elements(true);
            reader.check_end_names(true);
            EventSource::Namespaced(reader)
        } else {
            let mut reader = Reader::from_str(text);
            reader.expand_empty_elements(true);
            reader.check_end_names(true);
            EventSource::Plain(reader)
        };

        let mut document = build(source, text, options, handler).map_err(|e| {
            let e = match options.system_id {
                Some(ref id) => e.with_system_id(id.as_str()),
                None => e,
            };
            raise_fatal(handler, e)
        })?;
        document.system_id = options.system_id.clone();
        Ok(document)
    }
}

/// Namespace of an element as reported by the reader
enum ElementNamespace {
    /// Namespace processing is off
    Unprocessed,
    /// Resolved namespace URI, `None` when unbound
    Resolved(Option<String>),
    /// A prefix with no in-scope declaration
    UnknownPrefix(String),
}

enum EventSource<'i> {
    Namespaced(NsReader<&'i [u8]>),
    Plain(Reader<&'i [u8]>),
}

impl<'i> EventSource<'i> {
    fn position(&self) -> usize {
        match self {
            EventSource::Namespaced(r) => r.buffer_position(),
            EventSource::Plain(r) => r.buffer_position(),
        }
    }

    fn next_event(&mut self) -> quick_xml::Result<(ElementNamespace, Event<'i>)> {
        match self {
            EventSource::Namespaced(r) => r
                .read_resolved_event()
                .map(|(resolved, event)| (element_namespace(resolved), event)),
            EventSource::Plain(r) => r
                .read_event()
                .map(|event| (ElementNamespace::Unprocessed, event)),
        }
    }

    fn element(
        &self,
        namespace: ElementNamespace,
        start: &BytesStart,
    ) -> std::result::Result<Element, ParseError> {
        let raw_name = utf8(start.name().as_ref())?;
        self.check_name(&raw_name, "element")?;
        let mut element = match namespace {
            ElementNamespace::Unprocessed => Element::new(QName::local(raw_name)),
            ElementNamespace::Resolved(ns) => {
                let mut element = Element::new(QName::new(ns, utf8(start.local_name().as_ref())?));
                element.prefix = start
                    .name()
                    .prefix()
                    .map(|p| utf8(p.as_ref()))
                    .transpose()?;
                element
            }
            ElementNamespace::UnknownPrefix(prefix) => {
                return Err(ParseError::syntax(format!(
                    "the prefix '{}' for element '{}' is not bound",
                    prefix, raw_name
                )))
            }
        };

        for attr in start.attributes() {
            let attr = attr.map_err(|e| ParseError::syntax(format!("malformed attribute: {}", e)))?;
            let key = utf8(attr.key.as_ref())?;
            self.check_name(&key, "attribute")?;
            let value = attribute_value(&key, &attr.value)?;

            match self {
                EventSource::Plain(_) => element.attributes.push(Attribute::new(key, value)),
                EventSource::Namespaced(reader) => {
                    if key == "xmlns" {
                        element.namespace_declarations.push(NamespaceDeclaration {
                            prefix: None,
                            uri: value,
                        });
                    } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                        if value.is_empty() {
                            return Err(ParseError::syntax(format!(
                                "the prefix '{}' cannot be bound to an empty namespace name",
                                prefix
                            )));
                        }
                        element.namespace_declarations.push(NamespaceDeclaration {
                            prefix: Some(prefix.to_string()),
                            uri: value,
                        });
                    } else {
                        let (resolved, local) = reader.resolve_attribute(attr.key);
                        let namespace = match element_namespace(resolved) {
                            ElementNamespace::Resolved(ns) => ns,
                            _ => {
                                return Err(ParseError::syntax(format!(
                                    "the prefix for attribute '{}' is not bound",
                                    key
                                )))
                            }
                        };
                        let name = QName::new(namespace, utf8(local.as_ref())?);
                        if element.attributes.iter().any(|a| a.name == name) {
                            return Err(ParseError::syntax(format!(
                                "attribute '{}' is specified more than once",
                                name
                            )));
                        }
                        element.attributes.push(Attribute {
                            name,
                            prefix: attr.key.prefix().map(|p| utf8(p.as_ref())).transpose()?,
                            value,
                        });
                    }
                }
            }
        }

        Ok(element)
    }

    fn check_name(&self, name: &str, what: &str) -> std::result::Result<(), ParseError> {
        let valid = match self {
            EventSource::Namespaced(_) => is_qname(name),
            EventSource::Plain(_) => is_xml_name(name),
        };
        if valid {
            Ok(())
        } else {
            Err(ParseError::syntax(format!("'{}' is not a valid {} name", name, what)))
        }
    }
}

/// Replace `\r\n` and lone `\r` with `\n`
fn normalize_line_endings(text: &str) -> Cow<'_, str> {
    if !text.contains('\r') {
        return Cow::Borrowed(text);
    }
    Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
}

/// Unescaped attribute value with literal whitespace mapped to spaces
///
/// Character references are expanded after the mapping, so `&#10;` still
/// yields a line feed.
fn attribute_value(key: &str, raw: &[u8]) -> std::result::Result<String, ParseError> {
    let raw = std::str::from_utf8(raw).map_err(|e| {
        ParseError::syntax(format!("invalid UTF-8 in attribute '{}': {}", key, e))
    })?;
    let spaced: String = raw
        .chars()
        .map(|c| if matches!(c, '\t' | '\n' | '\r') { ' ' } else { c })
        .collect();
    unescape(&spaced)
        .map(Cow::into_owned)
        .map_err(|e| ParseError::syntax(format!("invalid value of attribute '{}': {}", key, e)))
}

fn element_namespace(resolved: ResolveResult) -> ElementNamespace {
    match resolved {
        ResolveResult::Bound(ns) => {
            ElementNamespace::Resolved(Some(String::from_utf8_lossy(ns.as_ref()).into_owned()))
        }
        ResolveResult::Unbound => ElementNamespace::Resolved(None),
        ResolveResult::Unknown(prefix) => {
            ElementNamespace::UnknownPrefix(String::from_utf8_lossy(&prefix).into_owned())
        }
    }
}

fn utf8(bytes: &[u8]) -> std::result::Result<String, ParseError> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| ParseError::syntax(format!("invalid UTF-8 in name: {}", e)))
}

fn build(
    mut source: EventSource<'_>,
    text: &str,
    options: &ParseOptions,
    handler: &mut dyn ErrorHandler,
) -> std::result::Result<Document, ParseError> {
    let mut tree = TreeBuilder::new(&options.limits);
    let mut first_event = true;

    loop {
        let offset = source.position();
        let at = |e: ParseError| e.with_location(TextPosition::from_offset(text, offset));

        let (namespace, event) = match source.next_event() {
            Ok(pair) => pair,
            Err(e) => {
                let position = TextPosition::from_offset(text, source.position());
                return Err(ParseError::syntax(e.to_string()).with_location(position));
            }
        };

        match event {
            Event::Start(start) => {
                let mut element = source.element(namespace, &start).map_err(at)?;
                element.position = Some(TextPosition::from_offset(text, offset));
                tree.start_element(element).map_err(at)?;
            }
            Event::Empty(start) => {
                let mut element = source.element(namespace, &start).map_err(at)?;
                element.position = Some(TextPosition::from_offset(text, offset));
                tree.start_element(element).map_err(at)?;
                tree.end_element().map_err(at)?;
            }
            Event::End(_) => tree.end_element().map_err(at)?,
            Event::Text(t) => {
                if t.windows(3).any(|w| w == b"]]>") {
                    return Err(at(ParseError::syntax(
                        "the sequence ']]>' is not allowed in character data",
                    )));
                }
                let content = t
                    .unescape()
                    .map_err(|e| at(ParseError::syntax(format!("invalid character data: {}", e))))?;
                tree.text(&content).map_err(at)?;
            }
            Event::CData(c) => {
                let content = lossy(c.into_inner());
                tree.cdata(content).map_err(at)?;
            }
            Event::Comment(c) => tree.misc(Node::Comment(lossy(c.into_inner()))),
            Event::PI(p) => {
                let content = lossy(p.into_inner());
                let (target, data) = match content.split_once(|c: char| c.is_whitespace()) {
                    Some((target, data)) => (target.to_string(), Some(data.trim_start().to_string())),
                    None => (content, None),
                };
                tree.misc(Node::ProcessingInstruction(ProcessingInstruction { target, data }));
            }
            Event::DocType(d) => {
                tree.doctype(lossy(d.into_inner()).trim().to_string())
                    .map_err(at)?;
                let mut warning = at(ParseError::syntax(
                    "document type declaration is kept but not processed",
                ));
                warning.system_id = options.system_id.clone();
                handler.warning(&warning);
            }
            Event::Decl(_) => {
                if !first_event {
                    return Err(at(ParseError::syntax(
                        "XML declaration is only allowed at the start of the document",
                    )));
                }
            }
            Event::Eof => break,
        }
        first_event = false;
    }

    tree.finish(!matches!(source, EventSource::Plain(_)))
}

fn lossy(bytes: Cow<'_, [u8]>) -> String {
    String::from_utf8_lossy(&bytes).into_owned()
}
