//! XSD Complex Types
//!
//! Complex types can have empty content, simple content, element-only content
//! (a model group) or mixed content with both text and elements.

use std::fmt;
use std::str::FromStr;

use crate::namespaces::{QName, XSD_NAMESPACE};

use super::attributes::AttributeUses;
use super::particles::Particle;
use super::simple_types::SimpleType;
use super::wildcards::Wildcard;

/// Index of a type definition in the schema's type arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub(crate) usize);

/// Derivation method for complex types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DerivationMethod {
    /// Type derived by restriction
    #[default]
    Restriction,
    /// Type derived by extension
    Extension,
}

impl FromStr for DerivationMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "restriction" => Ok(Self::Restriction),
            "extension" => Ok(Self::Extension),
            other => Err(format!("unknown derivation method '{}'", other)),
        }
    }
}

impl fmt::Display for DerivationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Restriction => write!(f, "restriction"),
            Self::Extension => write!(f, "extension"),
        }
    }
}

/// Content of a complex type
#[derive(Debug, Clone, PartialEq)]
pub enum ContentType {
    /// No text and no child elements
    Empty,
    /// Text only, checked against a simple type
    Simple(TypeId),
    /// Child elements only; whitespace text is ignored
    ElementOnly(Particle),
    /// Child elements interleaved with text
    Mixed(Particle),
}

impl ContentType {
    /// The content particle, for element-only and mixed content
    pub fn particle(&self) -> Option<&Particle> {
        match self {
            ContentType::ElementOnly(p) | ContentType::Mixed(p) => Some(p),
            _ => None,
        }
    }

    /// Whether character data is allowed
    pub fn allows_text(&self) -> bool {
        matches!(self, ContentType::Simple(_) | ContentType::Mixed(_))
    }

    /// Label for messages
    pub fn label(&self) -> &'static str {
        match self {
            ContentType::Empty => "empty",
            ContentType::Simple(_) => "simple",
            ContentType::ElementOnly(_) => "element-only",
            ContentType::Mixed(_) => "mixed",
        }
    }
}

/// A compiled complex type definition
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexType {
    /// Name, for global types
    pub name: Option<QName>,
    /// Base type (None only for anyType)
    pub base: Option<TypeId>,
    /// How the type derives from its base
    pub derivation: DerivationMethod,
    /// Whether the type may not be used directly by an element
    pub is_abstract: bool,
    /// Effective content, base content included
    pub content: ContentType,
    /// Effective attribute uses, inherited ones included
    pub attributes: AttributeUses,
    /// Effective attribute wildcard
    pub attribute_wildcard: Option<Wildcard>,
}

impl ComplexType {
    /// A complex type with empty content and no attributes
    pub fn empty(name: Option<QName>, base: Option<TypeId>) -> Self {
        Self {
            name,
            base,
            derivation: DerivationMethod::Restriction,
            is_abstract: false,
            content: ContentType::Empty,
            attributes: AttributeUses::new(),
            attribute_wildcard: None,
        }
    }

    /// Name for messages
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) if name.is_in(Some(XSD_NAMESPACE)) => format!("xs:{}", name.local_name),
            Some(name) => name.to_string(),
            None => "anonymous complex type".to_string(),
        }
    }
}

/// A simple or complex type definition
#[derive(Debug, Clone)]
pub enum TypeDefinition {
    /// Simple type
    Simple(SimpleType),
    /// Complex type
    Complex(ComplexType),
}

impl TypeDefinition {
    /// Name of the type, if global or built-in
    pub fn name(&self) -> Option<&QName> {
        match self {
            TypeDefinition::Simple(t) => t.name.as_ref(),
            TypeDefinition::Complex(t) => t.name.as_ref(),
        }
    }

    /// Base type
    pub fn base(&self) -> Option<TypeId> {
        match self {
            TypeDefinition::Simple(t) => t.base,
            TypeDefinition::Complex(t) => t.base,
        }
    }

    /// Name for messages
    pub fn display_name(&self) -> String {
        match self {
            TypeDefinition::Simple(t) => t.display_name(),
            TypeDefinition::Complex(t) => t.display_name(),
        }
    }

    /// Whether this is a simple type
    pub fn is_simple(&self) -> bool {
        matches!(self, TypeDefinition::Simple(_))
    }

    /// The simple type, if this is one
    pub fn as_simple(&self) -> Option<&SimpleType> {
        match self {
            TypeDefinition::Simple(t) => Some(t),
            TypeDefinition::Complex(_) => None,
        }
    }

    /// The complex type, if this is one
    pub fn as_complex(&self) -> Option<&ComplexType> {
        match self {
            TypeDefinition::Complex(t) => Some(t),
            TypeDefinition::Simple(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::groups::GroupId;
    use crate::validators::particles::{Occurs, Term};

    #[test]
    fn test_derivation_method() {
        assert_eq!("extension".parse::<DerivationMethod>().unwrap(), DerivationMethod::Extension);
        assert!("substitution".parse::<DerivationMethod>().is_err());
        assert_eq!(DerivationMethod::Restriction.to_string(), "restriction");
    }

    #[test]
    fn test_content_type() {
        let particle = Particle::new(Term::Group(GroupId(0)), Occurs::once());

        assert!(ContentType::Mixed(particle.clone()).allows_text());
        assert!(ContentType::Simple(TypeId(0)).allows_text());
        assert!(!ContentType::ElementOnly(particle.clone()).allows_text());
        assert!(!ContentType::Empty.allows_text());
        assert_eq!(ContentType::ElementOnly(particle.clone()).particle(), Some(&particle));
        assert_eq!(ContentType::Empty.label(), "empty");
    }

    #[test]
    fn test_display_name() {
        let t = ComplexType::empty(Some(QName::xsd("anyType")), None);
        assert_eq!(t.display_name(), "xs:anyType");
        let t = ComplexType::empty(Some(QName::namespaced("urn:o", "order")), None);
        assert_eq!(t.display_name(), "{urn:o}order");
        assert_eq!(ComplexType::empty(None, None).display_name(), "anonymous complex type");
    }
}
