//! Error types for xsdgate
//!
//! Parsing, compiling and validating are kept strictly apart: a document that
//! is not well-formed is a [`ParseError`], a broken schema is a
//! [`CompileError`], and a well-formed document that does not conform is
//! reported as data (see [`crate::validators::ValidationError`]), never through
//! this module's error types.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::documents::Position;
use crate::namespaces::QName;

/// Result type alias using the crate [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for xsdgate operations
#[derive(Error, Debug)]
pub enum Error {
    /// Input is not well-formed XML
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// The schema document is invalid
    #[error("compile error: {0}")]
    Compile(#[from] CompileError),

    /// The gateway could not be constructed
    #[error("initialization error: {0}")]
    Init(#[from] InitError),

    /// A gateway operation could not run
    #[error("operation error: {0}")]
    Operation(#[from] OperationError),

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Resource loading error
    #[error("resource error: {0}")]
    Resource(#[from] ResourceError),
}

/// Reason a byte sequence is not a well-formed XML document
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// No content at all (empty, whitespace only or a bare byte order mark)
    #[error("empty document")]
    EmptyDocument,

    /// A prolog without any element
    #[error("document has no root element")]
    NoRootElement,

    /// Input is not valid UTF-8
    #[error("input is not valid UTF-8")]
    InvalidUtf8,

    /// A character outside the XML 1.0 Char production
    #[error("character U+{:04X} is not allowed in XML", *.0 as u32)]
    InvalidCharacter(char),

    /// End tag does not close the innermost open element
    #[error("end tag '{found}' does not match start tag '{expected}'")]
    MismatchedTag {
        /// Name of the open element
        expected: String,
        /// Name found in the end tag
        found: String,
    },

    /// End tag without any open element
    #[error("unexpected end tag '{0}'")]
    UnexpectedEndTag(String),

    /// Input ended while an element was still open
    #[error("element '{0}' is not closed (truncated input)")]
    UnclosedElement(String),

    /// Namespace prefix without an in-scope declaration
    #[error("namespace prefix '{0}' is not declared")]
    UnboundPrefix(String),

    /// Reserved prefix or namespace misuse (`xmlns`, `xml`)
    #[error("reserved namespace binding: {0}")]
    ReservedNamespace(String),

    /// Same attribute specified twice on one element
    #[error("duplicate attribute '{0}'")]
    DuplicateAttribute(String),

    /// Element or attribute name is not a valid XML name
    #[error("invalid XML name '{0}'")]
    InvalidName(String),

    /// A second top-level element
    #[error("document has more than one root element")]
    MultipleRoots,

    /// Character data before or after the root element
    #[error("text is not allowed outside the root element")]
    TextOutsideRoot,

    /// Unknown entity or malformed character reference
    #[error("invalid entity or character reference: {0}")]
    Entity(String),

    /// Other syntax error reported by the tokenizer
    #[error("syntax error: {0}")]
    Syntax(String),

    /// Input exceeds a configured limit
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),
}

/// XML well-formedness error with its source position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// What went wrong
    pub kind: ParseErrorKind,
    /// Where it went wrong, if known
    pub position: Option<Position>,
}

impl ParseError {
    /// Create a new parse error without a position
    pub fn new(kind: ParseErrorKind) -> Self {
        Self {
            kind,
            position: None,
        }
    }

    /// Set the position
    pub fn at(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;

        if let Some(ref pos) = self.position {
            write!(f, " at {}", pos)?;
        }

        Ok(())
    }
}

impl std::error::Error for ParseError {}

/// Failure to turn a schema document into a [`crate::validators::SchemaModel`]
#[derive(Error, Debug, Clone)]
pub enum CompileError {
    /// The schema document is not well-formed XML
    #[error("schema is not well-formed: {0}")]
    Parse(#[from] ParseError),

    /// The root element is not `xs:schema`
    #[error("expected an xs:schema root element, found '{0}'")]
    NotASchema(String),

    /// A `type`, `base`, `itemType` or `memberTypes` reference to nothing
    #[error("reference to undeclared type {0}")]
    UndeclaredType(QName),

    /// Any other unresolved reference (element, attribute, group, ...)
    #[error("reference to undeclared {component} {name}")]
    UnresolvedReference {
        /// Kind of component referenced
        component: &'static str,
        /// Referenced name
        name: QName,
    },

    /// Derivation or group nesting that never terminates
    #[error("circular definition of {component} {name}")]
    CircularDefinition {
        /// Kind of component involved in the cycle
        component: &'static str,
        /// Component at which the cycle was detected
        name: QName,
    },

    /// Malformed or inapplicable facet
    #[error("invalid {facet} facet value '{value}': {reason}")]
    InvalidFacet {
        /// Facet name
        facet: String,
        /// Declared value
        value: String,
        /// Why it was rejected
        reason: String,
    },

    /// Malformed minOccurs/maxOccurs
    #[error("invalid occurrence bounds: {0}")]
    InvalidOccurs(String),

    /// Two global components with the same name
    #[error("duplicate {component} definition {name}")]
    Duplicate {
        /// Kind of component
        component: &'static str,
        /// Duplicated name
        name: QName,
    },

    /// A schema element lacks a mandatory attribute
    #[error("<{element}> is missing required attribute '{attribute}'")]
    MissingAttribute {
        /// Schema element local name
        element: String,
        /// Attribute name
        attribute: String,
    },

    /// A QName value uses an undeclared prefix
    #[error("prefix '{0}' in QName value is not declared")]
    UnknownPrefix(String),

    /// Structurally invalid schema construct
    #[error("invalid schema: {0}")]
    Invalid(String),

    /// `schemaLocation` that cannot be resolved
    #[error("cannot resolve schema location '{0}'")]
    UnresolvedLocation(String),

    /// Included or imported schema could not be read
    #[error(transparent)]
    Resource(#[from] ResourceError),
}

/// A file could not be loaded
#[derive(Error, Debug, Clone)]
#[error("failed to load '{}': {reason}", path.display())]
pub struct ResourceError {
    /// Path of the resource
    pub path: PathBuf,
    /// Underlying reason
    pub reason: String,
}

impl ResourceError {
    /// Create a new resource error
    pub fn new(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Construction of a [`crate::gateway::ValidationGateway`] failed
#[derive(Error, Debug)]
pub enum InitError {
    /// The schema file could not be read
    #[error(transparent)]
    Io(#[from] ResourceError),

    /// The schema file did not compile
    #[error("failed to compile schema '{}': {source}", path.display())]
    Compile {
        /// Schema path
        path: PathBuf,
        /// Compiler error
        #[source]
        source: CompileError,
    },

    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A schema was already installed into a pending gateway
    #[error("a schema is already installed")]
    AlreadyInstalled,
}

/// A gateway validation call could not run
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OperationError {
    /// No schema has been installed yet
    #[error("xsd is not ready yet")]
    NotReady,

    /// The request body is not well-formed XML
    #[error("request body is not well-formed: {0}")]
    Parse(#[from] ParseError),
}

/// Configuration loading or validation failure
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config '{}': {source}", path.display())]
    Io {
        /// Config path
        path: PathBuf,
        /// I/O error
        #[source]
        source: std::io::Error,
    },

    /// TOML syntax or shape error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Semantically invalid value
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::new(ParseErrorKind::MismatchedTag {
            expected: "order".to_string(),
            found: "id".to_string(),
        })
        .at(Position::new(3, 7));

        let msg = format!("{}", err);
        assert!(msg.contains("end tag 'id' does not match start tag 'order'"));
        assert!(msg.contains("line 3, column 7"));
    }

    #[test]
    fn test_parse_error_without_position() {
        let err = ParseError::new(ParseErrorKind::EmptyDocument);
        assert_eq!(err.to_string(), "empty document");
    }

    #[test]
    fn test_invalid_character_display() {
        let kind = ParseErrorKind::InvalidCharacter('\u{1}');
        assert_eq!(kind.to_string(), "character U+0001 is not allowed in XML");
    }

    #[test]
    fn test_compile_error_display() {
        let err = CompileError::UndeclaredType(QName::namespaced("urn:a", "Missing"));
        assert_eq!(err.to_string(), "reference to undeclared type {urn:a}Missing");
    }

    #[test]
    fn test_error_conversion() {
        let parse_err = ParseError::new(ParseErrorKind::EmptyDocument);
        let err: Error = parse_err.clone().into();
        assert!(matches!(err, Error::Parse(_)));

        let op: OperationError = parse_err.into();
        assert!(matches!(op, OperationError::Parse(_)));

        let compile: Error = CompileError::NotASchema("root".to_string()).into();
        assert!(matches!(compile, Error::Compile(_)));
    }
}
