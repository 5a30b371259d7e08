//! XML Schema validators
//!
//! Schema components, the compiler that builds them from XSD documents, and
//! the validator that checks instance documents against the result.

// Simple types
pub mod builtins;
pub mod facets;
pub mod simple_types;

// Declarations and content models
pub mod attributes;
pub mod complex_types;
pub mod elements;
pub mod groups;
pub mod particles;
pub mod wildcards;

// Compilation
pub mod parsing;
pub mod schemas;

// Validation
pub mod document_validation;
pub mod exceptions;
pub mod models;

pub use attributes::{AttributeDeclaration, AttributeUse, AttributeUses, Form};
pub use builtins::{get_builtin_type, BuiltinType, XsdValue};
pub use complex_types::{ComplexType, ContentType, DerivationMethod, TypeDefinition, TypeId};
pub use document_validation::{validate_document, NamespacePolicy, ValidationOptions};
pub use elements::{ElementDeclaration, ElementId, ValueConstraint};
pub use exceptions::{PathStep, ValidationError, ValidationErrorKind};
pub use facets::{FacetFailure, FacetSet, WhiteSpace};
pub use groups::{Compositor, GroupId, ModelGroup};
pub use models::{ChildMatch, ModelViolation, ModelVisitor};
pub use parsing::SchemaCompiler;
pub use particles::{Occurs, Particle, Term};
pub use schemas::SchemaModel;
pub use simple_types::{SimpleType, Variety};
pub use wildcards::{NamespaceConstraint, ProcessContents, Wildcard};
