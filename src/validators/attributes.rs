//! XSD Attribute Declarations
//!
//! A complex type holds its attribute uses as an ordered map from qualified
//! name to [`AttributeDeclaration`]; attribute groups are flattened into that
//! map at compile time.

use indexmap::IndexMap;
use std::fmt;
use std::str::FromStr;

use crate::namespaces::QName;

use super::complex_types::TypeId;
use super::elements::ValueConstraint;

/// Attribute use mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttributeUse {
    /// Attribute is optional (default)
    #[default]
    Optional,
    /// Attribute is required
    Required,
    /// Attribute is prohibited
    Prohibited,
}

impl FromStr for AttributeUse {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "optional" => Ok(AttributeUse::Optional),
            "required" => Ok(AttributeUse::Required),
            "prohibited" => Ok(AttributeUse::Prohibited),
            _ => Err(format!(
                "invalid attribute use '{}', must be 'optional', 'required' or 'prohibited'",
                s
            )),
        }
    }
}

impl AttributeUse {
    /// Get the use as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeUse::Optional => "optional",
            AttributeUse::Required => "required",
            AttributeUse::Prohibited => "prohibited",
        }
    }
}

impl fmt::Display for AttributeUse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Name qualification for local declarations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Form {
    /// Local name has no namespace
    #[default]
    Unqualified,
    /// Local name is in the target namespace
    Qualified,
}

impl FromStr for Form {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unqualified" => Ok(Form::Unqualified),
            "qualified" => Ok(Form::Qualified),
            _ => Err(format!(
                "invalid form '{}', must be 'qualified' or 'unqualified'",
                s
            )),
        }
    }
}

/// A compiled attribute declaration or attribute use
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDeclaration {
    /// Qualified name
    pub name: QName,
    /// Resolved simple type
    pub type_id: TypeId,
    /// Use mode (always optional for global declarations)
    pub usage: AttributeUse,
    /// `default` or `fixed` value
    pub value_constraint: Option<ValueConstraint>,
}

impl AttributeDeclaration {
    /// Create an optional declaration
    pub fn new(name: QName, type_id: TypeId) -> Self {
        Self {
            name,
            type_id,
            usage: AttributeUse::Optional,
            value_constraint: None,
        }
    }

    /// Set the use mode
    pub fn with_usage(mut self, usage: AttributeUse) -> Self {
        self.usage = usage;
        self
    }

    /// Whether the attribute must be present
    pub fn is_required(&self) -> bool {
        self.usage == AttributeUse::Required
    }

    /// Whether the attribute must be absent
    pub fn is_prohibited(&self) -> bool {
        self.usage == AttributeUse::Prohibited
    }
}

/// Attribute uses keyed by qualified name
pub type AttributeUses = IndexMap<QName, AttributeDeclaration>;

/// Merge attribute uses of a derivation step over the base's.
///
/// Extension adds uses; restriction may override a use, or drop it with
/// `use="prohibited"`. In both cases the derived declaration wins.
pub fn merge_attribute_uses(base: &AttributeUses, derived: AttributeUses) -> AttributeUses {
    let mut merged = base.clone();
    for (name, decl) in derived {
        merged.insert(name, decl);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_use_parse() {
        assert_eq!("required".parse::<AttributeUse>().unwrap(), AttributeUse::Required);
        assert_eq!("prohibited".parse::<AttributeUse>().unwrap(), AttributeUse::Prohibited);
        assert!("sometimes".parse::<AttributeUse>().is_err());
        assert_eq!(AttributeUse::default(), AttributeUse::Optional);
    }

    #[test]
    fn test_form_parse() {
        assert_eq!("qualified".parse::<Form>().unwrap(), Form::Qualified);
        assert!("QUALIFIED".parse::<Form>().is_err());
    }

    #[test]
    fn test_merge_uses() {
        let mut base = AttributeUses::new();
        base.insert(QName::local("a"), AttributeDeclaration::new(QName::local("a"), TypeId(1)));
        base.insert(QName::local("b"), AttributeDeclaration::new(QName::local("b"), TypeId(1)));

        let mut derived = AttributeUses::new();
        derived.insert(
            QName::local("b"),
            AttributeDeclaration::new(QName::local("b"), TypeId(1)).with_usage(AttributeUse::Prohibited),
        );
        derived.insert(
            QName::local("c"),
            AttributeDeclaration::new(QName::local("c"), TypeId(2)).with_usage(AttributeUse::Required),
        );

        let merged = merge_attribute_uses(&base, derived);
        let names: Vec<_> = merged.keys().map(|k| k.local_name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert!(merged[&QName::local("b")].is_prohibited());
        assert!(merged[&QName::local("c")].is_required());
    }
}
