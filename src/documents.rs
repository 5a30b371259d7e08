//! XML document parsing
//!
//! Turns raw bytes into a namespace-resolved element tree. Every element,
//! attribute and text node carries its source [`Position`] so that validation
//! findings can point back into the request body.
//!
//! Tokenizing is done by `quick-xml`; this module adds the checks needed for
//! well-formedness that the tokenizer leaves to its caller (tag balance, a
//! single root, character validity, namespace binding rules, duplicate
//! attributes after namespace expansion) and enforces [`Limits`].

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;

use crate::error::{ParseError, ParseErrorKind};
use crate::limits::Limits;
use crate::names::{is_valid_ncname, is_valid_qname, is_xml_char};
use crate::namespaces::{NamespaceContext, QName, XMLNS_NAMESPACE, XML_NAMESPACE};

type ParseResult<T> = std::result::Result<T, ParseError>;

/// 1-based line and column of a node in the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Position {
    /// Line number, starting at 1
    pub line: usize,
    /// Column number in characters, starting at 1
    pub column: usize,
}

impl Position {
    /// Create a new position
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// An attribute of an element (namespace declarations excluded)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Expanded attribute name
    pub name: QName,
    /// Prefix as written in the source
    pub prefix: Option<String>,
    /// Normalized, unescaped value
    pub value: String,
    /// Position of the owning start tag
    pub position: Position,
}

/// Character data (text and CDATA sections, merged)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Text {
    /// Unescaped content
    pub content: String,
    /// Position where the text starts
    pub position: Position,
}

impl Text {
    /// Whether the text consists only of XML whitespace
    pub fn is_whitespace(&self) -> bool {
        is_xml_whitespace(&self.content)
    }
}

/// Child node of an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Child element
    Element(Element),
    /// Character data
    Text(Text),
}

/// XML Element in the document tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Expanded element name
    pub name: QName,
    /// Prefix as written in the source
    pub prefix: Option<String>,
    /// Attributes in document order
    pub attributes: Vec<Attribute>,
    /// Child nodes in document order
    pub children: Vec<Node>,
    /// In-scope namespace bindings
    pub namespaces: Arc<NamespaceContext>,
    /// Position of the start tag
    pub position: Position,
}

impl Element {
    /// Create a new element with no attributes or children
    pub fn new(name: QName) -> Self {
        Self {
            name,
            prefix: None,
            attributes: Vec::new(),
            children: Vec::new(),
            namespaces: Arc::new(NamespaceContext::new()),
            position: Position::default(),
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

    /// Get an attribute value by qualified name
    pub fn attribute(&self, name: &QName) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| &a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Get an unqualified attribute value by local name
    pub fn attribute_local(&self, local_name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.namespace.is_none() && a.name.local_name == local_name)
            .map(|a| a.value.as_str())
    }

    /// Child elements in document order
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// Whether the element has at least one child element
    pub fn has_child_elements(&self) -> bool {
        self.child_elements().next().is_some()
    }

    /// Concatenated character data of the direct text children
    pub fn text(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            if let Node::Text(t) = node {
                out.push_str(&t.content);
            }
        }
        out
    }

    /// First text node that is not whitespace only
    pub fn significant_text(&self) -> Option<&Text> {
        self.children.iter().find_map(|n| match n {
            Node::Text(t) if !t.is_whitespace() => Some(t),
            _ => None,
        })
    }

    /// Find child elements by local name
    pub fn find_children<'a>(&'a self, local_name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.child_elements()
            .filter(move |e| e.local_name() == local_name)
    }

    /// Add a child element
    pub fn add_child(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    fn push_text(&mut self, content: Cow<'_, str>, position: Position) {
        if let Some(Node::Text(last)) = self.children.last_mut() {
            last.content.push_str(&content);
        } else {
            self.children.push(Node::Text(Text {
                content: content.into_owned(),
                position,
            }));
        }
    }
}

/// A well-formed XML document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Root element of the document
    pub root: Element,
}

impl Document {
    /// Parse an XML document from bytes with default [`Limits`]
    pub fn parse(xml: &[u8]) -> ParseResult<Self> {
        Self::parse_with_limits(xml, &Limits::default())
    }

    /// Parse an XML document from a string
    pub fn from_string(xml: &str) -> ParseResult<Self> {
        Self::parse(xml.as_bytes())
    }

    /// Parse an XML document from bytes under the given limits
    pub fn parse_with_limits(xml: &[u8], limits: &Limits) -> ParseResult<Self> {
        limits.check_xml_size(xml.len())?;

        let bytes = xml.strip_prefix(b"\xEF\xBB\xBF".as_slice()).unwrap_or(xml);
        let text = match std::str::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => {
                let valid = std::str::from_utf8(&bytes[..e.valid_up_to()]).unwrap_or_default();
                let lines = LineIndex::new(valid);
                return Err(ParseError::new(ParseErrorKind::InvalidUtf8)
                    .at(lines.position(valid, valid.len())));
            }
        };

        if is_xml_whitespace(text) {
            return Err(ParseError::new(ParseErrorKind::EmptyDocument));
        }

        DocumentParser::new(text, limits).parse()
    }

    /// Get the root element
    pub fn root(&self) -> &Element {
        &self.root
    }
}

impl std::str::FromStr for Document {
    type Err = ParseError;

    fn from_str(s: &str) -> ParseResult<Self> {
        Self::from_string(s)
    }
}

/// Whether a string consists only of XML whitespace (space, tab, CR, LF)
pub fn is_xml_whitespace(s: &str) -> bool {
    s.bytes().all(|b| matches!(b, b' ' | b'\t' | b'\n' | b'\r'))
}

/// Byte offsets of line starts, for offset to line/column conversion
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(text: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(
            text.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self { starts }
    }

    fn position(&self, text: &str, offset: usize) -> Position {
        let offset = offset.min(text.len());
        let line = match self.starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        let start = self.starts[line];
        let column = text
            .get(start..offset)
            .map(|s| s.chars().count())
            .unwrap_or(offset - start);
        Position::new(line + 1, column + 1)
    }
}

struct OpenElement {
    element: Element,
    raw_name: String,
}

struct DocumentParser<'a> {
    text: &'a str,
    lines: LineIndex,
    limits: &'a Limits,
    stack: Vec<OpenElement>,
    root: Option<Element>,
    seen_root: bool,
}

impl<'a> DocumentParser<'a> {
    fn new(text: &'a str, limits: &'a Limits) -> Self {
        Self {
            text,
            lines: LineIndex::new(text),
            limits,
            stack: Vec::new(),
            root: None,
            seen_root: false,
        }
    }

    fn position(&self, offset: usize) -> Position {
        self.lines.position(self.text, offset)
    }

    fn error(&self, kind: ParseErrorKind, offset: usize) -> ParseError {
        ParseError::new(kind).at(self.position(offset))
    }

    fn parse(mut self) -> ParseResult<Document> {
        self.check_characters()?;

        let mut reader = Reader::from_str(self.text);
        reader.trim_text(false);
        reader.check_end_names(false);
        reader.check_comments(true);

        loop {
            let offset = reader.buffer_position() as usize;
            let event = match reader.read_event() {
                Ok(event) => event,
                Err(e) => {
                    let at = reader.buffer_position() as usize;
                    return Err(self.error(ParseErrorKind::Syntax(e.to_string()), at));
                }
            };

            match event {
                Event::Start(start) => {
                    let offset = self.tag_start(offset);
                    let (element, raw_name) = self.open_element(&start, offset)?;
                    self.stack.push(OpenElement { element, raw_name });
                    self.limits
                        .check_xml_depth(self.stack.len())
                        .map_err(|e| e.at(self.position(offset)))?;
                }
                Event::Empty(start) => {
                    let offset = self.tag_start(offset);
                    let (element, _) = self.open_element(&start, offset)?;
                    self.limits
                        .check_xml_depth(self.stack.len() + 1)
                        .map_err(|e| e.at(self.position(offset)))?;
                    self.close_element(element);
                }
                Event::End(end) => {
                    let offset = self.tag_start(offset);
                    let found = std::str::from_utf8(end.name().as_ref())
                        .map_err(|_| self.error(ParseErrorKind::InvalidUtf8, offset))?
                        .to_string();
                    match self.stack.pop() {
                        None => {
                            return Err(self.error(ParseErrorKind::UnexpectedEndTag(found), offset))
                        }
                        Some(open) if open.raw_name != found => {
                            return Err(self.error(
                                ParseErrorKind::MismatchedTag {
                                    expected: open.raw_name,
                                    found,
                                },
                                offset,
                            ));
                        }
                        Some(open) => self.close_element(open.element),
                    }
                }
                Event::Text(text) => {
                    let raw = std::str::from_utf8(&text)
                        .map_err(|_| self.error(ParseErrorKind::InvalidUtf8, offset))?;
                    self.text_content(raw, offset, true)?;
                }
                Event::CData(cdata) => {
                    let inner = cdata.into_inner();
                    let raw = std::str::from_utf8(&inner)
                        .map_err(|_| self.error(ParseErrorKind::InvalidUtf8, offset))?;
                    self.text_content(raw, offset, false)?;
                }
                Event::Eof => break,
                // Declarations, comments, processing instructions and
                // doctype carry nothing the tree keeps.
                _ => {}
            }
        }

        if let Some(open) = self.stack.last() {
            return Err(self.error(
                ParseErrorKind::UnclosedElement(open.raw_name.clone()),
                self.text.len(),
            ));
        }

        match self.root.take() {
            Some(root) => Ok(Document { root }),
            None => Err(self.error(ParseErrorKind::NoRootElement, self.text.len())),
        }
    }

    /// Offset of the '<' opening the tag just read. After a text event the
    /// tokenizer has already consumed the '<'.
    fn tag_start(&self, offset: usize) -> usize {
        if offset > 0 && self.text.as_bytes().get(offset - 1) == Some(&b'<') {
            offset - 1
        } else {
            offset
        }
    }

    fn check_characters(&self) -> ParseResult<()> {
        match self.text.char_indices().find(|(_, c)| !is_xml_char(*c)) {
            Some((offset, c)) => Err(self.error(ParseErrorKind::InvalidCharacter(c), offset)),
            None => Ok(()),
        }
    }

    fn text_content(&mut self, raw: &str, offset: usize, escaped: bool) -> ParseResult<()> {
        let position = self.position(offset);

        if self.stack.is_empty() {
            if escaped && is_xml_whitespace(raw) {
                return Ok(());
            }
            return Err(ParseError::new(ParseErrorKind::TextOutsideRoot).at(position));
        }

        let normalized = normalize_newlines(raw);
        let content = if escaped {
            let unescaped = quick_xml::escape::unescape(&normalized)
                .map_err(|e| ParseError::new(ParseErrorKind::Entity(e.to_string())).at(position))?;
            check_referenced_chars(raw, &unescaped, position)?;
            Cow::Owned(unescaped.into_owned())
        } else {
            normalized
        };

        if let Some(open) = self.stack.last_mut() {
            open.element.push_text(content, position);
        }
        Ok(())
    }

    fn close_element(&mut self, element: Element) {
        match self.stack.last_mut() {
            Some(parent) => parent.element.add_child(element),
            None => self.root = Some(element),
        }
    }

    fn open_element(&mut self, start: &BytesStart<'_>, offset: usize) -> ParseResult<(Element, String)> {
        let position = self.position(offset);
        let fail = |kind: ParseErrorKind| ParseError::new(kind).at(position);

        if self.stack.is_empty() {
            if self.seen_root {
                return Err(fail(ParseErrorKind::MultipleRoots));
            }
            self.seen_root = true;
        }

        let raw_name = std::str::from_utf8(start.name().as_ref())
            .map_err(|_| fail(ParseErrorKind::InvalidUtf8))?
            .to_string();
        if !is_valid_qname(&raw_name) {
            return Err(fail(ParseErrorKind::InvalidName(raw_name)));
        }

        let parent_scope = match self.stack.last() {
            Some(open) => Arc::clone(&open.element.namespaces),
            None => Arc::new(NamespaceContext::new()),
        };

        let mut raw_attributes: Vec<(String, String)> = Vec::new();
        let mut declarations: Vec<(Option<String>, String)> = Vec::new();

        let mut attributes = start.attributes();
        attributes.with_checks(false);
        for attr in attributes {
            let attr = attr.map_err(|e| fail(ParseErrorKind::Syntax(e.to_string())))?;
            let key = std::str::from_utf8(attr.key.as_ref())
                .map_err(|_| fail(ParseErrorKind::InvalidUtf8))?
                .to_string();
            if !is_valid_qname(&key) {
                return Err(fail(ParseErrorKind::InvalidName(key)));
            }
            if raw_attributes.iter().any(|(k, _)| *k == key)
                || declarations.iter().any(|(p, _)| declaration_name(p) == key)
            {
                return Err(fail(ParseErrorKind::DuplicateAttribute(key)));
            }

            let raw_value = std::str::from_utf8(&attr.value)
                .map_err(|_| fail(ParseErrorKind::InvalidUtf8))?;
            let value = normalize_attribute_value(raw_value, position)?;

            if key == "xmlns" {
                declarations.push((None, value));
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                declarations.push((Some(prefix.to_string()), value));
            } else {
                raw_attributes.push((key, value));
            }
        }

        self.limits
            .check_attributes(raw_attributes.len() + declarations.len())
            .map_err(|e| e.at(position))?;

        let namespaces = if declarations.is_empty() {
            parent_scope
        } else {
            let mut scope = (*parent_scope).clone();
            for (prefix, uri) in declarations {
                bind_namespace(&mut scope, prefix, uri).map_err(fail)?;
            }
            Arc::new(scope)
        };

        let (prefix, _) = crate::names::split_qname(&raw_name);
        let name = namespaces
            .resolve(&raw_name)
            .ok_or_else(|| fail(ParseErrorKind::UnboundPrefix(prefix.unwrap_or_default().to_string())))?;

        let mut element = Element::new(name);
        element.prefix = prefix.map(str::to_string);
        element.position = position;

        for (key, value) in raw_attributes {
            let (attr_prefix, _) = crate::names::split_qname(&key);
            let attr_name = namespaces.resolve_attribute(&key).ok_or_else(|| {
                fail(ParseErrorKind::UnboundPrefix(attr_prefix.unwrap_or_default().to_string()))
            })?;
            if element.attributes.iter().any(|a| a.name == attr_name) {
                return Err(fail(ParseErrorKind::DuplicateAttribute(attr_name.to_string())));
            }
            element.attributes.push(Attribute {
                name: attr_name,
                prefix: attr_prefix.map(str::to_string),
                value,
                position,
            });
        }

        element.namespaces = namespaces;
        Ok((element, raw_name))
    }
}

fn declaration_name(prefix: &Option<String>) -> String {
    match prefix {
        Some(p) => format!("xmlns:{}", p),
        None => "xmlns".to_string(),
    }
}

fn bind_namespace(
    scope: &mut NamespaceContext,
    prefix: Option<String>,
    uri: String,
) -> Result<(), ParseErrorKind> {
    if uri == XMLNS_NAMESPACE {
        return Err(ParseErrorKind::ReservedNamespace(format!(
            "'{}' cannot be bound",
            XMLNS_NAMESPACE
        )));
    }

    match prefix {
        None => {
            if uri == XML_NAMESPACE {
                return Err(ParseErrorKind::ReservedNamespace(
                    "the XML namespace cannot be the default namespace".to_string(),
                ));
            }
            if uri.is_empty() {
                scope.clear_default_namespace();
            } else {
                scope.set_default_namespace(uri);
            }
        }
        Some(prefix) => {
            if !is_valid_ncname(&prefix) {
                return Err(ParseErrorKind::InvalidName(prefix));
            }
            if prefix == "xmlns" {
                return Err(ParseErrorKind::ReservedNamespace(
                    "prefix 'xmlns' cannot be declared".to_string(),
                ));
            }
            if (prefix == "xml") != (uri == XML_NAMESPACE) {
                return Err(ParseErrorKind::ReservedNamespace(format!(
                    "prefix 'xml' is bound only to '{}'",
                    XML_NAMESPACE
                )));
            }
            if uri.is_empty() {
                return Err(ParseErrorKind::ReservedNamespace(format!(
                    "prefix '{}' cannot be undeclared",
                    prefix
                )));
            }
            scope.add_prefix(prefix, uri);
        }
    }
    Ok(())
}

/// Line-end normalization: CRLF and lone CR become LF
fn normalize_newlines(raw: &str) -> Cow<'_, str> {
    if raw.contains('\r') {
        Cow::Owned(raw.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(raw)
    }
}

/// Attribute-value normalization: literal whitespace characters become
/// spaces, then references are expanded
fn normalize_attribute_value(raw: &str, position: Position) -> ParseResult<String> {
    if raw.contains('<') {
        return Err(ParseError::new(ParseErrorKind::Syntax(
            "'<' is not allowed in attribute values".to_string(),
        ))
        .at(position));
    }

    let spaced = normalize_newlines(raw).replace(['\t', '\n'], " ");
    let value = quick_xml::escape::unescape(&spaced)
        .map_err(|e| ParseError::new(ParseErrorKind::Entity(e.to_string())).at(position))?;
    check_referenced_chars(raw, &value, position)?;
    Ok(value.into_owned())
}

fn check_referenced_chars(raw: &str, expanded: &str, position: Position) -> ParseResult<()> {
    if !raw.contains("&#") {
        return Ok(());
    }
    match expanded.chars().find(|c| !is_xml_char(*c)) {
        Some(c) => Err(ParseError::new(ParseErrorKind::InvalidCharacter(c)).at(position)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespaces::XSI_NAMESPACE;

    fn kind_of(xml: &str) -> ParseErrorKind {
        Document::from_string(xml).unwrap_err().kind
    }

    #[test]
    fn test_parse_simple_xml() {
        let doc = Document::from_string("<root><child>text</child></root>").unwrap();

        let root = doc.root();
        assert_eq!(root.local_name(), "root");
        assert_eq!(root.child_elements().count(), 1);
        let child = root.child_elements().next().unwrap();
        assert_eq!(child.local_name(), "child");
        assert_eq!(child.text(), "text");
    }

    #[test]
    fn test_parse_with_attributes() {
        let xml = r#"<root attr1="value1" attr2="a&amp;b"><child/></root>"#;
        let doc = Document::from_string(xml).unwrap();

        let root = doc.root();
        assert_eq!(root.attribute_local("attr1"), Some("value1"));
        assert_eq!(root.attribute_local("attr2"), Some("a&b"));
        assert_eq!(root.attributes[0].name, QName::local("attr1"));
    }

    #[test]
    fn test_parse_with_namespaces() {
        let xml = r#"<root xmlns="http://example.com" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
            <child xsi:nil="true"/>
        </root>"#;
        let doc = Document::from_string(xml).unwrap();

        let root = doc.root();
        assert_eq!(root.name, QName::namespaced("http://example.com", "root"));
        assert_eq!(root.namespaces.get_namespace("xsi"), Some(XSI_NAMESPACE));

        let child = root.child_elements().next().unwrap();
        assert_eq!(child.name, QName::namespaced("http://example.com", "child"));
        assert_eq!(
            child.attribute(&QName::namespaced(XSI_NAMESPACE, "nil")),
            Some("true")
        );
    }

    #[test]
    fn test_default_namespace_undeclared() {
        let xml = r#"<a xmlns="urn:x"><b xmlns=""/></a>"#;
        let doc = Document::from_string(xml).unwrap();
        let b = doc.root().child_elements().next().unwrap();
        assert_eq!(b.name, QName::local("b"));
    }

    #[test]
    fn test_positions() {
        let xml = "<root>\n  <child/>\n  <other>x</other>\n</root>";
        let doc = Document::from_string(xml).unwrap();

        let root = doc.root();
        assert_eq!(root.position, Position::new(1, 1));
        let children: Vec<_> = root.child_elements().collect();
        assert_eq!(children[0].position, Position::new(2, 3));
        assert_eq!(children[1].position, Position::new(3, 3));
    }

    #[test]
    fn test_text_merging_and_cdata() {
        let xml = "<a>1<!-- c -->2<![CDATA[<3>]]>&#52;</a>";
        let doc = Document::from_string(xml).unwrap();
        assert_eq!(doc.root().text(), "12<3>4");
        assert_eq!(doc.root().children.len(), 1);
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(
            Document::parse(b"").unwrap_err().kind,
            ParseErrorKind::EmptyDocument
        );
        assert_eq!(kind_of("   \n\t"), ParseErrorKind::EmptyDocument);
        assert_eq!(
            Document::parse(b"\xEF\xBB\xBF").unwrap_err().kind,
            ParseErrorKind::EmptyDocument
        );
    }

    #[test]
    fn test_no_root_element() {
        assert_eq!(
            kind_of("<?xml version=\"1.0\"?><!-- nothing -->"),
            ParseErrorKind::NoRootElement
        );
    }

    #[test]
    fn test_mismatched_tag() {
        let err = Document::from_string("<order>\n<id>1</order>").unwrap_err();
        assert_eq!(
            err.kind,
            ParseErrorKind::MismatchedTag {
                expected: "id".to_string(),
                found: "order".to_string()
            }
        );
        assert_eq!(err.position, Some(Position::new(2, 6)));
    }

    #[test]
    fn test_truncated_input() {
        assert_eq!(
            kind_of("<order><id>42"),
            ParseErrorKind::UnclosedElement("id".to_string())
        );
        assert!(Document::from_string("<order><i").is_err());
    }

    #[test]
    fn test_unexpected_end_tag() {
        assert_eq!(
            kind_of("<a/></b>"),
            ParseErrorKind::UnexpectedEndTag("b".to_string())
        );
    }

    #[test]
    fn test_multiple_roots() {
        assert_eq!(kind_of("<a/><b/>"), ParseErrorKind::MultipleRoots);
    }

    #[test]
    fn test_text_outside_root() {
        assert_eq!(kind_of("<a/>junk"), ParseErrorKind::TextOutsideRoot);
        assert!(Document::from_string("\n<a/>\n").is_ok());
    }

    #[test]
    fn test_invalid_character() {
        assert_eq!(
            kind_of("<a>\u{1}</a>"),
            ParseErrorKind::InvalidCharacter('\u{1}')
        );
        assert!(Document::from_string("<a>&#0;</a>").is_err());
    }

    #[test]
    fn test_invalid_utf8() {
        let err = Document::parse(b"<a>\xFF</a>").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::InvalidUtf8);
        assert_eq!(err.position, Some(Position::new(1, 4)));
    }

    #[test]
    fn test_unbound_prefix() {
        assert_eq!(
            kind_of("<p:a/>"),
            ParseErrorKind::UnboundPrefix("p".to_string())
        );
        assert_eq!(
            kind_of("<a q:b=\"1\"/>"),
            ParseErrorKind::UnboundPrefix("q".to_string())
        );
    }

    #[test]
    fn test_duplicate_attributes() {
        assert_eq!(
            kind_of("<a x=\"1\" x=\"2\"/>"),
            ParseErrorKind::DuplicateAttribute("x".to_string())
        );
        assert!(matches!(
            kind_of("<a xmlns:p=\"urn:n\" xmlns:q=\"urn:n\" p:x=\"1\" q:x=\"2\"/>"),
            ParseErrorKind::DuplicateAttribute(_)
        ));
    }

    #[test]
    fn test_reserved_bindings() {
        assert!(matches!(
            kind_of("<a xmlns:xmlns=\"urn:x\"/>"),
            ParseErrorKind::ReservedNamespace(_)
        ));
        assert!(matches!(
            kind_of("<a xmlns:xml=\"urn:x\"/>"),
            ParseErrorKind::ReservedNamespace(_)
        ));
        assert!(Document::from_string("<a xml:lang=\"en\"/>").is_ok());
    }

    #[test]
    fn test_undefined_entity() {
        assert!(matches!(kind_of("<a>&nbsp;</a>"), ParseErrorKind::Entity(_)));
    }

    #[test]
    fn test_depth_limit() {
        let limits = Limits::new().with_max_xml_depth(2);
        assert!(Document::parse_with_limits(b"<a><b/></a>", &limits).is_ok());
        let err = Document::parse_with_limits(b"<a><b><c/></b></a>", &limits).unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::LimitExceeded(_)));
    }

    #[test]
    fn test_size_limit() {
        let limits = Limits::new().with_max_xml_size(8);
        let err = Document::parse_with_limits(b"<root>text</root>", &limits).unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::LimitExceeded(_)));
    }

    #[test]
    fn test_attribute_value_normalization() {
        let doc = Document::from_string("<a v=\"x\ty\nz\" w=\"a&#10;b\"/>").unwrap();
        assert_eq!(doc.root().attribute_local("v"), Some("x y z"));
        assert_eq!(doc.root().attribute_local("w"), Some("a\nb"));
    }

    #[test]
    fn test_crlf_normalization() {
        let doc = Document::from_string("<a>x\r\ny\rz</a>").unwrap();
        assert_eq!(doc.root().text(), "x\ny\nz");
    }
}
