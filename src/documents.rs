//! XML document object model
//!
//! This module provides the in-memory tree every parser provider builds:
//! a [`Document`] owning one root [`Element`], with text, CDATA, comment
//! and processing-instruction nodes, plus serialization back to XML.

use crate::error::{Error, ParseError, Result, TextPosition};
use crate::limits::Limits;
use crate::namespaces::QName;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Write;
use std::str::FromStr;

/// Attribute of an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute qualified name
    pub name: QName,
    /// Prefix used in the source, if any
    pub prefix: Option<String>,
    /// Attribute value, entities expanded
    pub value: String,
}

impl Attribute {
    /// Create an unprefixed attribute without a namespace
    pub fn new(local_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: QName::local(local_name),
            prefix: None,
            value: value.into(),
        }
    }

    /// Name as written in markup
    pub fn qualified_name(&self) -> String {
        qualify(self.prefix.as_deref(), &self.name.local_name)
    }
}

/// `xmlns` / `xmlns:p` declaration made on an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceDeclaration {
    /// Declared prefix; `None` for the default namespace
    pub prefix: Option<String>,
    /// Namespace URI (empty undeclares the default namespace)
    pub uri: String,
}

/// Processing instruction `<?target data?>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingInstruction {
    /// PI target
    pub target: String,
    /// PI content after the target
    pub data: Option<String>,
}

/// Any node that can appear in element content or around the root
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Element node
    Element(Element),
    /// Character data, entities expanded
    Text(String),
    /// CDATA section
    CData(String),
    /// Comment
    Comment(String),
    /// Processing instruction
    ProcessingInstruction(ProcessingInstruction),
}

impl Node {
    /// The element, if this node is one
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Character content of text and CDATA nodes
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Node::Text(t) | Node::CData(t) => Some(t),
            _ => None,
        }
    }
}

/// XML Element in the document tree
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Element qualified name
    ///
    /// Without namespace processing the local name holds the name exactly
    /// as written, prefix included.
    pub name: QName,
    /// Prefix used in the source, if any
    pub prefix: Option<String>,
    /// Element attributes, in document order
    pub attributes: Vec<Attribute>,
    /// Namespace declarations made on this element
    pub namespace_declarations: Vec<NamespaceDeclaration>,
    /// Child nodes
    pub children: Vec<Node>,
    /// Where the start tag begins in the source
    pub position: Option<TextPosition>,
}

impl Element {
    /// Create a new element
    pub fn new(name: QName) -> Self {
        Self {
            name,
            prefix: None,
            attributes: Vec::new(),
            namespace_declarations: Vec::new(),
            children: Vec::new(),
            position: None,
        }
    }

    /// Get the local name of the element
    pub fn local_name(&self) -> &str {
        &self.name.local_name
    }

    /// Get the namespace of the element
    pub fn namespace(&self) -> Option<&str> {
        self.name.namespace.as_deref()
    }

    /// Name as written in markup
    pub fn tag_name(&self) -> String {
        qualify(self.prefix.as_deref(), &self.name.local_name)
    }

    /// Get an attribute value by local name, preferring unqualified attributes
    pub fn attribute(&self, local_name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .filter(|a| a.name.local_name == local_name)
            .min_by_key(|a| a.name.namespace.is_some())
            .map(|a| a.value.as_str())
    }

    /// Get an attribute value by namespace and local name
    pub fn attribute_ns(&self, namespace: Option<&str>, local_name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.matches(namespace, local_name))
            .map(|a| a.value.as_str())
    }

    /// Set (or replace) an attribute
    pub fn set_attribute(&mut self, attribute: Attribute) {
        match self
            .attributes
            .iter_mut()
            .find(|a| a.name == attribute.name)
        {
            Some(existing) => *existing = attribute,
            None => self.attributes.push(attribute),
        }
    }

    /// Add a child node
    pub fn add_child(&mut self, child: Node) {
        self.children.push(child);
    }

    /// Append character data, merging with a preceding text node
    pub fn push_text(&mut self, text: &str) {
        if let Some(Node::Text(last)) = self.children.last_mut() {
            last.push_str(text);
        } else {
            self.children.push(Node::Text(text.to_string()));
        }
    }

    /// Child elements in document order
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    /// Find child elements by local name
    pub fn find_children(&self, local_name: &str) -> Vec<&Element> {
        self.child_elements()
            .filter(|e| e.local_name() == local_name)
            .collect()
    }

    /// First child element with the given local name
    pub fn first_child(&self, local_name: &str) -> Option<&Element> {
        self.child_elements().find(|e| e.local_name() == local_name)
    }

    /// All descendant elements (excluding self) with the given local name
    pub fn descendants_named(&self, local_name: &str) -> Vec<&Element> {
        let mut found = Vec::new();
        collect_named(self, local_name, &mut found);
        found
    }

    /// Concatenated character data of this element and all descendants
    pub fn text_content(&self) -> String {
        let mut text = String::new();
        append_text(self, &mut text);
        text
    }

    /// Whether any child is an element
    pub fn has_child_elements(&self) -> bool {
        self.child_elements().next().is_some()
    }
}

fn collect_named<'a>(element: &'a Element, local_name: &str, found: &mut Vec<&'a Element>) {
    for child in element.child_elements() {
        if child.local_name() == local_name {
            found.push(child);
        }
        collect_named(child, local_name, found);
    }
}

fn append_text(element: &Element, text: &mut String) {
    for child in &element.children {
        match child {
            Node::Text(t) | Node::CData(t) => text.push_str(t),
            Node::Element(e) => append_text(e, text),
            _ => {}
        }
    }
}

fn qualify(prefix: Option<&str>, local_name: &str) -> String {
    match prefix {
        Some(p) => format!("{}:{}", p, local_name),
        None => local_name.to_string(),
    }
}

/// XML Document representation
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Root element of the document
    pub root: Element,
    /// Comments and processing instructions before the root
    pub prolog: Vec<Node>,
    /// Comments and processing instructions after the root
    pub epilog: Vec<Node>,
    /// Raw document type declaration content, if present
    pub doctype: Option<String>,
    /// Identifier of the input (usually its file path)
    pub system_id: Option<String>,
    /// Whether names were namespace-resolved while parsing
    pub namespace_aware: bool,
}

impl Document {
    /// Create a document around a root element
    pub fn new(root: Element) -> Self {
        Self {
            root,
            prolog: Vec::new(),
            epilog: Vec::new(),
            doctype: None,
            system_id: None,
            namespace_aware: true,
        }
    }

    /// Get the root element
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Get the root element mutably
    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    /// All elements (root included) with the given local name, in document order
    pub fn elements_by_local_name(&self, local_name: &str) -> Vec<&Element> {
        let mut found = Vec::new();
        if self.root.local_name() == local_name {
            found.push(&self.root);
        }
        found.extend(self.root.descendants_named(local_name));
        found
    }

    /// Serialize the document as UTF-8 XML
    pub fn write_to<W: Write>(&self, out: W) -> Result<()> {
        let mut writer = Writer::new(out);
        self.write_events(&mut writer).map_err(|e| {
            Error::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
        })
    }

    /// Serialize the document to a string
    pub fn to_xml_string(&self) -> Result<String> {
        let mut out = Vec::new();
        self.write_to(&mut out)?;
        String::from_utf8(out).map_err(|e| {
            Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })
    }

    fn write_events<W: Write>(&self, writer: &mut Writer<W>) -> quick_xml::Result<()> {
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        if let Some(ref doctype) = self.doctype {
            writer.write_event(Event::DocType(BytesText::from_escaped(doctype.as_str())))?;
        }
        for node in &self.prolog {
            write_node(writer, node)?;
        }
        write_element(writer, &self.root)?;
        for node in &self.epilog {
            write_node(writer, node)?;
        }
        Ok(())
    }
}

impl FromStr for Document {
    type Err = Error;

    /// Parse with the default namespace-aware builder
    fn from_str(xml: &str) -> Result<Self> {
        crate::initializer::new_document_from_str(xml)
    }
}

fn write_element<W: Write>(writer: &mut Writer<W>, element: &Element) -> quick_xml::Result<()> {
    let name = element.tag_name();
    let mut start = BytesStart::new(name.as_str());

    for decl in &element.namespace_declarations {
        let key = match decl.prefix {
            Some(ref p) => format!("xmlns:{}", p),
            None => "xmlns".to_string(),
        };
        start.push_attribute((key.as_str(), decl.uri.as_str()));
    }
    for attr in &element.attributes {
        start.push_attribute((attr.qualified_name().as_str(), attr.value.as_str()));
    }

    if element.children.is_empty() {
        return writer.write_event(Event::Empty(start));
    }

    writer.write_event(Event::Start(start))?;
    for child in &element.children {
        write_node(writer, child)?;
    }
    writer.write_event(Event::End(BytesEnd::new(name.as_str())))
}

fn write_node<W: Write>(writer: &mut Writer<W>, node: &Node) -> quick_xml::Result<()> {
    match node {
        Node::Element(e) => write_element(writer, e),
        Node::Text(t) => writer.write_event(Event::Text(BytesText::new(t))),
        Node::CData(t) => writer.write_event(Event::CData(BytesCData::new(t.as_str()))),
        Node::Comment(c) => writer.write_event(Event::Comment(BytesText::from_escaped(c.as_str()))),
        Node::ProcessingInstruction(pi) => {
            let content = match pi.data {
                Some(ref data) => format!("{} {}", pi.target, data),
                None => pi.target.clone(),
            };
            writer.write_event(Event::PI(BytesText::from_escaped(content)))
        }
    }
}

/// Stack-based tree assembly shared by the parser providers
///
/// Enforces the document-level well-formedness rules a streaming reader
/// leaves to its caller: exactly one root, no character data outside it,
/// and every element closed by the end of input.
#[derive(Debug)]
pub(crate) struct TreeBuilder<'l> {
    limits: &'l Limits,
    stack: Vec<Element>,
    root: Option<Element>,
    prolog: Vec<Node>,
    epilog: Vec<Node>,
    doctype: Option<String>,
}

impl<'l> TreeBuilder<'l> {
    pub(crate) fn new(limits: &'l Limits) -> Self {
        Self {
            limits,
            stack: Vec::new(),
            root: None,
            prolog: Vec::new(),
            epilog: Vec::new(),
            doctype: None,
        }
    }

    pub(crate) fn depth(&self) -> usize {
        self.stack.len()
    }

    pub(crate) fn doctype(&mut self, content: String) -> std::result::Result<(), ParseError> {
        if self.root.is_some() || !self.stack.is_empty() {
            return Err(ParseError::syntax(
                "document type declaration must appear before the root element",
            ));
        }
        self.doctype = Some(content);
        Ok(())
    }

    pub(crate) fn start_element(&mut self, element: Element) -> std::result::Result<(), ParseError> {
        if self.stack.is_empty() && self.root.is_some() {
            return Err(ParseError::syntax(format!(
                "content is not allowed after the root element: <{}>",
                element.tag_name()
            )));
        }
        self.limits.check_xml_depth(self.stack.len() + 1)?;
        self.limits.check_attributes(element.attributes.len())?;
        self.limits
            .check_namespaces(element.namespace_declarations.len())?;
        self.stack.push(element);
        Ok(())
    }

    pub(crate) fn end_element(&mut self) -> std::result::Result<(), ParseError> {
        let element = self
            .stack
            .pop()
            .ok_or_else(|| ParseError::syntax("end tag without a matching start tag"))?;
        match self.stack.last_mut() {
            Some(parent) => parent.add_child(Node::Element(element)),
            None => self.root = Some(element),
        }
        Ok(())
    }

    pub(crate) fn text(&mut self, text: &str) -> std::result::Result<(), ParseError> {
        match self.stack.last_mut() {
            Some(current) => {
                if !text.is_empty() {
                    current.push_text(text);
                }
                Ok(())
            }
            None if text.trim().is_empty() => Ok(()),
            None => Err(ParseError::syntax(format!(
                "character data is not allowed outside the root element: '{}'",
                text.trim()
            ))),
        }
    }

    pub(crate) fn cdata(&mut self, text: String) -> std::result::Result<(), ParseError> {
        match self.stack.last_mut() {
            Some(current) => {
                current.add_child(Node::CData(text));
                Ok(())
            }
            None => Err(ParseError::syntax(
                "CDATA section is not allowed outside the root element",
            )),
        }
    }

    /// Comments and processing instructions
    pub(crate) fn misc(&mut self, node: Node) {
        match self.stack.last_mut() {
            Some(current) => current.add_child(node),
            None if self.root.is_none() => self.prolog.push(node),
            None => self.epilog.push(node),
        }
    }

    pub(crate) fn finish(mut self, namespace_aware: bool) -> std::result::Result<Document, ParseError> {
        if let Some(open) = self.stack.pop() {
            return Err(ParseError::syntax(format!(
                "unexpected end of document: element <{}> is not closed",
                open.tag_name()
            )));
        }
        let root = self
            .root
            .take()
            .ok_or_else(|| ParseError::syntax("premature end of file: no root element"))?;
        Ok(Document {
            root,
            prolog: self.prolog,
            epilog: self.epilog,
            doctype: self.doctype,
            system_id: None,
            namespace_aware,
        })
    }
}
