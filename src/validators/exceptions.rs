//! XSD Validation Exceptions
//!
//! Findings of a validation run. A [`ValidationError`] is data, not a Rust
//! error: the validator collects them into an ordered list and never returns
//! early. Parse and compile failures live in [`crate::error`].

use serde::{Serialize, Serializer};
use std::fmt;

use crate::documents::Position;
use crate::namespaces::QName;

/// Category of a validation finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationErrorKind {
    /// Element with no matching declaration
    UnknownElement,
    /// Children or text that do not fit the content model
    ContentModelViolation,
    /// Simple value failing its datatype or a facet
    FacetViolation {
        /// `datatype` for lexical failures, otherwise the facet name
        facet: String,
    },
    /// Required attribute absent
    MissingAttribute,
    /// Attribute neither declared nor admitted by a wildcard
    UnknownAttribute,
    /// Attribute with `use="prohibited"`
    ProhibitedAttribute,
    /// Value differing from a `fixed` constraint
    FixedValueMismatch,
    /// Misused `xsi:nil`
    NilViolation,
    /// Abstract element or type used directly
    AbstractElement,
    /// `xsi:type` naming an unknown or non-derived type
    TypeSubstitution,
}

impl ValidationErrorKind {
    /// Short label for messages
    pub fn label(&self) -> &'static str {
        match self {
            Self::UnknownElement => "unknown element",
            Self::ContentModelViolation => "content model violation",
            Self::FacetViolation { .. } => "facet violation",
            Self::MissingAttribute => "missing attribute",
            Self::UnknownAttribute => "unknown attribute",
            Self::ProhibitedAttribute => "prohibited attribute",
            Self::FixedValueMismatch => "fixed value mismatch",
            Self::NilViolation => "nil violation",
            Self::AbstractElement => "abstract element",
            Self::TypeSubstitution => "type substitution",
        }
    }
}

/// One step of a [`ValidationError`] path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathStep {
    /// Element, by expanded name
    Element(QName),
    /// Attribute of the preceding element
    Attribute(QName),
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathStep::Element(name) => write!(f, "{}", name),
            PathStep::Attribute(name) => write!(f, "@{}", name),
        }
    }
}

/// Validation error when XML data doesn't conform to the schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// What went wrong
    #[serde(flatten)]
    pub kind: ValidationErrorKind,
    /// Names from the document root to the offending node.
    ///
    /// A missing attribute ends in its `@name` step. Missing element content
    /// has no node of its own, so the path stops at the parent and
    /// `expected` lists the particles that were still required.
    #[serde(serialize_with = "serialize_path")]
    pub path: Vec<PathStep>,
    /// Source position of the offending node
    pub position: Position,
    /// Declaration, particle set or facet description that was expected
    pub expected: Option<String>,
    /// Observed value or structure
    pub actual: Option<String>,
    /// Human-readable summary
    pub message: String,
}

impl ValidationError {
    /// Create a new validation error
    pub fn new(
        kind: ValidationErrorKind,
        path: Vec<PathStep>,
        position: Position,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            path,
            position,
            expected: None,
            actual: None,
            message: message.into(),
        }
    }

    /// Set expected value
    pub fn with_expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self
    }

    /// Set actual value
    pub fn with_actual(mut self, actual: impl Into<String>) -> Self {
        self.actual = Some(actual.into());
        self
    }

    /// Path in `/a/b/@c` form
    pub fn path_string(&self) -> String {
        path_to_string(&self.path)
    }

    /// Facet name, for facet violations
    pub fn facet(&self) -> Option<&str> {
        match &self.kind {
            ValidationErrorKind::FacetViolation { facet } => Some(facet),
            _ => None,
        }
    }

    /// Name of the last element in the path
    pub fn element(&self) -> Option<&QName> {
        self.path.iter().rev().find_map(|step| match step {
            PathStep::Element(name) => Some(name),
            PathStep::Attribute(_) => None,
        })
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {} ({}): {}",
            self.kind.label(),
            self.path_string(),
            self.position,
            self.message
        )
    }
}

fn path_to_string(path: &[PathStep]) -> String {
    let mut out = String::new();
    for step in path {
        out.push('/');
        out.push_str(&step.to_string());
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

fn serialize_path<S: Serializer>(path: &[PathStep], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&path_to_string(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ValidationError {
        ValidationError::new(
            ValidationErrorKind::FacetViolation {
                facet: "maxLength".to_string(),
            },
            vec![
                PathStep::Element(QName::namespaced("urn:o", "order")),
                PathStep::Element(QName::local("id")),
                PathStep::Attribute(QName::local("code")),
            ],
            Position::new(3, 7),
            "value is too long",
        )
        .with_expected("at most 5 characters")
        .with_actual("ABCDEFG")
    }

    #[test]
    fn test_path_string() {
        assert_eq!(sample().path_string(), "/{urn:o}order/id/@code");

        let root = ValidationError::new(
            ValidationErrorKind::UnknownElement,
            Vec::new(),
            Position::default(),
            "x",
        );
        assert_eq!(root.path_string(), "/");
    }

    #[test]
    fn test_accessors() {
        let error = sample();
        assert_eq!(error.facet(), Some("maxLength"));
        assert_eq!(error.element(), Some(&QName::local("id")));
        assert_eq!(error.expected.as_deref(), Some("at most 5 characters"));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            sample().to_string(),
            "facet violation at /{urn:o}order/id/@code (line 3, column 7): value is too long"
        );
    }

    #[test]
    fn test_serialize() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["kind"], "facet_violation");
        assert_eq!(json["facet"], "maxLength");
        assert_eq!(json["path"], "/{urn:o}order/id/@code");
        assert_eq!(json["position"]["line"], 3);
        assert_eq!(json["actual"], "ABCDEFG");

        let missing = ValidationError::new(
            ValidationErrorKind::MissingAttribute,
            vec![PathStep::Element(QName::local("a"))],
            Position::default(),
            "m",
        );
        let json = serde_json::to_value(missing).unwrap();
        assert_eq!(json["kind"], "missing_attribute");
        assert!(json["expected"].is_null());
    }
}
