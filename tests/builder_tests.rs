//! Builder integration tests
//!
//! These tests drive the facade functions against the fixture files in
//! `tests/fixtures/`.

use std::io::Write;
use std::path::PathBuf;

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use tempfile::NamedTempFile;
use xmlfactory::handlers::{CollectingErrorHandler, DefaultErrorHandler, ErrorHandler};
use xmlfactory::initializer;
use xmlfactory::providers::{DEFAULT_PROVIDER, QUICK_XML_PROVIDER, ROXMLTREE_PROVIDER};
use xmlfactory::{Document, Location, ParseError, XML_SCHEMA_LANGUAGE};

fn fixture(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    path
}

// ============================================================================
// Non-validating parsing
// ============================================================================

#[test]
fn test_parse_simple_tree() {
    let doc = initializer::new_document_from_str("<root><child>value</child></root>").unwrap();
    let root = doc.root();
    assert_eq!(root.local_name(), "root");

    let children: Vec<_> = root.child_elements().collect();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].local_name(), "child");
    assert_eq!(children[0].text_content(), "value");
}

#[test]
fn test_serialize_and_reparse() {
    let xml = r#"<?xml version="1.0"?>
<!-- catalog -->
<c:catalog xmlns:c="urn:example:catalog" version="2">
  <c:item id="1">Fish &amp; chips</c:item>
  <c:item id="2"><![CDATA[<raw>]]></c:item>
  <?render mode="fast"?>
</c:catalog>"#;
    let doc = initializer::new_document_from_str(xml).unwrap();
    let serialized = doc.to_xml_string().unwrap();
    let reparsed = initializer::new_document_from_str(&serialized).unwrap();

    assert_eq!(reparsed.root().tag_name(), doc.root().tag_name());
    assert_eq!(reparsed.root().attributes, doc.root().attributes);
    assert_eq!(reparsed.root().text_content(), doc.root().text_content());
    assert_eq!(reparsed.root().namespace(), Some("urn:example:catalog"));
    let items: Vec<_> = reparsed.root().child_elements().collect();
    assert_eq!(items[0].text_content(), "Fish & chips");
    assert_eq!(items[1].text_content(), "<raw>");
}

#[test]
fn test_parse_file() {
    let doc = initializer::new_document_from_file(fixture("numeric-valid.xml")).unwrap();
    assert_eq!(doc.root().child_elements().count(), 2);
    let expected = fixture("numeric-valid.xml").to_string_lossy().to_string();
    assert_eq!(doc.system_id.as_deref(), Some(expected.as_str()));
}

#[test]
fn test_malformed_input_is_syntax_error() {
    let err = initializer::new_document_from_str("<root><child>value</root>").unwrap_err();
    assert!(err.is_syntax());

    let err = initializer::new_document_from_file(fixture("malformed.xml")).unwrap_err();
    assert!(err.is_syntax());
    let parse_error = err.as_parse_error().unwrap();
    assert!(parse_error.system_id.as_deref().unwrap().ends_with("malformed.xml"));
}

#[test]
fn test_missing_file_is_io_error() {
    let err = initializer::new_document_from_file("/nonexistent/document.xml").unwrap_err();
    assert!(err.is_io());
}

#[test]
fn test_parse_temp_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "\u{feff}<note><to>Tove</to></note>").unwrap();
    let doc = initializer::new_document_from_file(file.path()).unwrap();
    assert_eq!(doc.root().local_name(), "note");
}

#[test]
fn test_from_str_trait() {
    let doc: Document = "<a><b/></a>".parse().unwrap();
    assert_eq!(doc.root().child_elements().count(), 1);
}

// ============================================================================
// Provider selection
// ============================================================================

#[test]
fn test_named_implementation_does_not_affect_later_builders() {
    let roxml = initializer::new_builder_factory(None, None, Some(ROXMLTREE_PROVIDER), true, false)
        .unwrap()
        .new_document_builder()
        .unwrap();
    assert_eq!(roxml.provider_name(), ROXMLTREE_PROVIDER);

    let builder = initializer::new_document_builder().unwrap();
    assert_eq!(builder.provider_name(), DEFAULT_PROVIDER);
}

#[test]
fn test_schema_builder_uses_schema_provider() {
    let builder = initializer::new_document_builder_for_schema(fixture("numeric.xsd")).unwrap();
    assert_eq!(builder.provider_name(), ROXMLTREE_PROVIDER);
    assert!(builder.is_validating());
    assert!(builder.is_namespace_aware());
}

#[test]
fn test_providers_build_the_same_tree() {
    let xml = std::fs::read_to_string(fixture("catalog.xml")).unwrap();
    let quick = initializer::new_builder_factory(None, None, Some(QUICK_XML_PROVIDER), true, false)
        .unwrap()
        .new_document_builder()
        .unwrap()
        .parse_str(&xml)
        .unwrap();
    let roxml = initializer::new_builder_factory(None, None, Some(ROXMLTREE_PROVIDER), true, false)
        .unwrap()
        .new_document_builder()
        .unwrap()
        .parse_str(&xml)
        .unwrap();
    assert_eq!(quick.root().tag_name(), roxml.root().tag_name());
    assert_eq!(
        quick.root().child_elements().count(),
        roxml.root().child_elements().count()
    );
}

#[test]
fn test_providers_normalize_whitespace_alike() {
    let xml = "<a x=\"1\r\n2\tz\">line\r\nbreak\rhere<b/></a>";
    let parse_with = |provider: &str| {
        initializer::new_builder_factory(None, None, Some(provider), true, false)
            .unwrap()
            .new_document_builder()
            .unwrap()
            .parse_str(xml)
            .unwrap()
    };
    let quick = parse_with(QUICK_XML_PROVIDER);
    let roxml = parse_with(ROXMLTREE_PROVIDER);
    assert_eq!(quick.root().attribute("x"), Some("1 2 z"));
    assert_eq!(quick.root().text_content(), "line\nbreak\nhere");
    assert_eq!(quick.root().attribute("x"), roxml.root().attribute("x"));
    assert_eq!(quick.root().text_content(), roxml.root().text_content());
}

#[test]
fn test_default_provider_rejects_malformed_documents() {
    for xml in [
        "<1a/>",
        "<a>]]></a>",
        r#"<a xmlns:p=""/>"#,
        r#"<!-- c --><?xml version="1.0"?><a/>"#,
    ] {
        let err = initializer::new_document_from_str(xml).unwrap_err();
        assert!(err.is_syntax(), "{} should be a syntax error, got {}", xml, err);
    }
}

#[test]
fn test_namespace_unaware_parsing() {
    let builder = initializer::new_builder_factory(None, None, None, false, false)
        .unwrap()
        .new_document_builder()
        .unwrap();
    assert!(!builder.is_namespace_aware());

    let doc = builder
        .parse_str(r#"<x:root xmlns:x="urn:x"><x:child/></x:root>"#)
        .unwrap();
    assert_eq!(doc.root().local_name(), "x:root");
    assert_eq!(doc.root().namespace(), None);
    assert_eq!(doc.root().attribute("xmlns:x"), Some("urn:x"));
}

#[test]
fn test_unsatisfiable_factories() {
    // roxmltree cannot parse without namespaces
    let err = initializer::new_builder_factory(None, None, Some(ROXMLTREE_PROVIDER), false, false)
        .unwrap()
        .new_document_builder()
        .unwrap_err();
    assert!(err.is_configuration());

    let err = initializer::new_builder_factory(None, None, Some("saxon"), true, false).unwrap_err();
    assert!(err.is_configuration());

    let err = initializer::new_builder_factory(
        Some(Location::from(fixture("numeric.xsd"))),
        Some("http://relaxng.org/ns/structure/1.0"),
        None,
        true,
        true,
    )
    .unwrap_err();
    assert!(err.is_configuration());

    let err = initializer::new_document_builder_for_schema(fixture("missing.xsd")).unwrap_err();
    assert!(err.is_configuration());
}

// ============================================================================
// Schema validation
// ============================================================================

#[test]
fn test_valid_document() {
    let doc = initializer::parse(
        fixture("numeric-valid.xml"),
        fixture("numeric.xsd"),
        &mut DefaultErrorHandler,
    )
    .unwrap();
    assert_eq!(doc.root().local_name(), "root");
}

#[test]
fn test_non_numeric_child_fails_validation() {
    let builder = initializer::new_document_builder_for_schema(fixture("numeric.xsd")).unwrap();
    let err = builder.parse_str("<root><child>abc</child></root>").unwrap_err();
    assert!(err.is_validation());
    let parse_error = err.as_parse_error().unwrap();
    assert!(parse_error.message.contains("child"));
    assert_eq!(parse_error.path.as_deref(), Some("/root/child[1]"));
}

#[test]
fn test_collecting_handler_reports_without_raising() {
    let mut handler = CollectingErrorHandler::new();
    let doc = initializer::parse(
        fixture("numeric-invalid.xml"),
        fixture("numeric.xsd"),
        &mut handler,
    )
    .unwrap();
    assert_eq!(doc.root().child_elements().count(), 3);

    let (_, errors) = handler.into_report();
    let paths: Vec<_> = errors.iter().filter_map(|e| e.path.as_deref()).collect();
    assert_eq!(paths, vec!["/root/child[1]", "/root/child[3]"]);
    assert!(errors.iter().all(|e| e.location.is_some()));
    assert!(errors
        .iter()
        .all(|e| e.system_id.as_deref().unwrap().ends_with("numeric-invalid.xml")));
}

#[test]
fn test_handler_decides_when_to_stop() {
    struct StopAfter {
        seen: usize,
        limit: usize,
    }

    impl ErrorHandler for StopAfter {
        fn error(&mut self, error: ParseError) -> Result<(), ParseError> {
            self.seen += 1;
            if self.seen >= self.limit {
                Err(error)
            } else {
                Ok(())
            }
        }
    }

    let mut handler = StopAfter { seen: 0, limit: 2 };
    let err = initializer::parse(
        fixture("numeric-invalid.xml"),
        fixture("numeric.xsd"),
        &mut handler,
    )
    .unwrap_err();
    assert!(err.is_validation());
    assert_eq!(handler.seen, 2);
    assert_eq!(
        err.as_parse_error().unwrap().path.as_deref(),
        Some("/root/child[3]")
    );
}

#[test]
fn test_syntax_errors_always_abort() {
    let mut handler = CollectingErrorHandler::new();
    let err = initializer::parse(fixture("malformed.xml"), fixture("numeric.xsd"), &mut handler)
        .unwrap_err();
    assert!(err.is_syntax());
    assert_eq!(handler.errors().len(), 1);
}

#[test]
fn test_namespaced_schema_with_include() {
    let doc = initializer::parse(
        fixture("catalog.xml"),
        fixture("catalog.xsd"),
        &mut DefaultErrorHandler,
    )
    .unwrap();
    assert_eq!(doc.root().namespace(), Some("urn:example:catalog"));

    let mut handler = CollectingErrorHandler::new();
    initializer::parse(
        fixture("catalog-invalid.xml"),
        fixture("catalog.xsd"),
        &mut handler,
    )
    .unwrap();
    let paths: Vec<_> = handler
        .errors()
        .iter()
        .filter_map(|e| e.path.clone())
        .collect();
    assert_eq!(
        paths,
        vec![
            "/cat:catalog",
            "/cat:catalog/cat:book[1]",
            "/cat:catalog/cat:book[1]/cat:price[1]",
            "/cat:catalog/cat:book[2]",
        ]
    );
}

#[test]
fn test_new_dom_source() {
    let source = initializer::new_dom_source(
        fixture("numeric-valid.xml"),
        fixture("numeric.xsd"),
        &mut DefaultErrorHandler,
    )
    .unwrap();
    assert!(source.system_id().unwrap().ends_with("numeric-valid.xml"));
    assert!(source.to_xml_string().unwrap().contains("<child>42</child>"));
    assert_eq!(source.document().root().local_name(), "root");
}

#[test]
fn test_inline_schema_source() {
    let xsd = std::fs::read_to_string(fixture("numeric.xsd")).unwrap();
    let builder = initializer::new_builder_factory(
        Some(Location::text(xsd)),
        Some(XML_SCHEMA_LANGUAGE),
        None,
        true,
        true,
    )
    .unwrap()
    .new_document_builder()
    .unwrap();
    assert_eq!(builder.provider_name(), DEFAULT_PROVIDER);
    assert!(builder.parse_str("<root><child>5</child></root>").is_ok());
    assert!(builder.parse_str("<root/>").unwrap_err().is_validation());
}

// ============================================================================
// Escaping
// ============================================================================

proptest! {
    #[test]
    fn prop_text_and_attributes_survive_round_trip(
        text in "[a-zA-Z0-9 <>&'\"]{1,40}",
        value in "[a-zA-Z0-9 <>&'\"]{0,40}",
    ) {
        let builder = initializer::new_document_builder().unwrap();
        let mut root = xmlfactory::Element::new(xmlfactory::namespaces::QName::local("r"));
        root.set_attribute(xmlfactory::Attribute::new("a", value.clone()));
        root.push_text(&text);
        let doc = Document::new(root);

        let reparsed = builder.parse_str(&doc.to_xml_string().unwrap()).unwrap();
        prop_assert_eq!(reparsed.root().text_content(), text);
        prop_assert_eq!(reparsed.root().attribute("a"), Some(value.as_str()));
    }
}
