//! XSD Element Declarations

use std::sync::Arc;

use crate::namespaces::{NamespaceContext, QName};

use super::complex_types::TypeId;
use super::particles::Occurs;

/// Index of an element declaration in the schema's element arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub(crate) usize);

/// Kind of value constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    /// `default="..."`: used when the item is absent or empty
    Default,
    /// `fixed="..."`: the value must equal this one
    Fixed,
}

/// A `default` or `fixed` value constraint
#[derive(Debug, Clone, PartialEq)]
pub struct ValueConstraint {
    /// Default or fixed
    pub kind: ConstraintKind,
    /// Literal as written in the schema
    pub literal: String,
    /// Namespace bindings of the declaring schema element, for QName values
    pub namespaces: Arc<NamespaceContext>,
}

impl ValueConstraint {
    /// Create a `default` constraint
    pub fn default_value(literal: impl Into<String>, namespaces: Arc<NamespaceContext>) -> Self {
        Self {
            kind: ConstraintKind::Default,
            literal: literal.into(),
            namespaces,
        }
    }

    /// Create a `fixed` constraint
    pub fn fixed(literal: impl Into<String>, namespaces: Arc<NamespaceContext>) -> Self {
        Self {
            kind: ConstraintKind::Fixed,
            literal: literal.into(),
            namespaces,
        }
    }

    /// Whether this is a fixed value
    pub fn is_fixed(&self) -> bool {
        self.kind == ConstraintKind::Fixed
    }
}

/// Scope of an element declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Top-level declaration
    Global,
    /// Declared inside a complex type or group
    Local,
}

/// A compiled element declaration
#[derive(Debug, Clone, PartialEq)]
pub struct ElementDeclaration {
    /// Qualified name
    pub name: QName,
    /// Resolved type
    pub type_id: TypeId,
    /// Declared occurrence bounds (always 1..1 for global declarations)
    pub occurs: Occurs,
    /// Global or local
    pub scope: Scope,
    /// Whether `xsi:nil` is permitted
    pub nillable: bool,
    /// Whether the element may only appear through substitution
    pub is_abstract: bool,
    /// `default` or `fixed` value
    pub value_constraint: Option<ValueConstraint>,
    /// Head of the substitution group this element belongs to
    pub substitution_group: Option<ElementId>,
}

impl ElementDeclaration {
    /// Create a declaration with default flags
    pub fn new(name: QName, type_id: TypeId, scope: Scope) -> Self {
        Self {
            name,
            type_id,
            occurs: Occurs::once(),
            scope,
            nillable: false,
            is_abstract: false,
            value_constraint: None,
            substitution_group: None,
        }
    }

    /// Whether this is a top-level declaration
    pub fn is_global(&self) -> bool {
        self.scope == Scope::Global
    }

    /// The fixed value, if any
    pub fn fixed(&self) -> Option<&ValueConstraint> {
        self.value_constraint.as_ref().filter(|c| c.is_fixed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declaration_defaults() {
        let decl = ElementDeclaration::new(QName::local("order"), TypeId(0), Scope::Global);
        assert!(decl.is_global());
        assert!(!decl.nillable);
        assert!(!decl.is_abstract);
        assert_eq!(decl.occurs, Occurs::once());
        assert!(decl.fixed().is_none());
    }

    #[test]
    fn test_fixed_constraint() {
        let ns = Arc::new(NamespaceContext::new());
        let mut decl = ElementDeclaration::new(QName::local("v"), TypeId(0), Scope::Local);

        decl.value_constraint = Some(ValueConstraint::default_value("1", ns.clone()));
        assert!(decl.fixed().is_none());

        decl.value_constraint = Some(ValueConstraint::fixed("1", ns));
        assert_eq!(decl.fixed().map(|c| c.literal.as_str()), Some("1"));
    }
}
