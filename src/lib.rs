//! # xsdgate
//!
//! XML Schema (XSD 1.0) validation of request bodies at the edge of a service.
//!
//! A schema is compiled once into an immutable [`SchemaModel`] and shared as
//! `Arc<SchemaModel>`. Each request body is parsed into a [`Document`] and
//! checked against it, producing an ordered list of [`ValidationError`]s.
//!
//! ## Features
//!
//! - Schema compilation with `xs:include` and `xs:import`
//! - Built-in datatypes and facets (length, pattern, enumeration, bounds, digits)
//! - Sequence, choice and all content models with occurrence bounds
//! - Wildcards, substitution groups, `xsi:type` and `xsi:nil`
//! - Resource limits on untrusted request bodies
//! - A [`ValidationGateway`] with a configurable enforcement policy
//!
//! ## Example
//!
//! ```rust
//! use xsdgate::{Document, SchemaModel};
//!
//! let schema = SchemaModel::compile(br#"
//!     <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
//!         <xs:element name="order">
//!             <xs:complexType>
//!                 <xs:sequence>
//!                     <xs:element name="id" type="xs:integer"/>
//!                 </xs:sequence>
//!             </xs:complexType>
//!         </xs:element>
//!     </xs:schema>"#).unwrap();
//!
//! let document = Document::parse(b"<order><id>abc</id></order>").unwrap();
//! let errors = schema.validate(&document);
//! assert_eq!(errors.len(), 1);
//! assert_eq!(errors[0].facet(), Some("datatype"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Foundation
pub mod error;
pub mod limits;

// Utilities
pub mod namespaces;
pub mod names;

// Resource loading
pub mod loaders;
pub mod documents;

// Schema components and validation
pub mod validators;

// Service integration
pub mod config;
pub mod gateway;

// Re-exports for convenience
pub use config::GatewayConfig;
pub use documents::{Document, Element, Position};
pub use error::{CompileError, ConfigError, Error, InitError, OperationError, ParseError, ParseErrorKind, Result};
pub use gateway::{EnforcementPolicy, Inspection, ValidationGateway, Verdict};
pub use limits::Limits;
pub use namespaces::QName;
pub use validators::{
    validate_document, NamespacePolicy, PathStep, SchemaModel, ValidationError, ValidationErrorKind,
    ValidationOptions,
};

/// Version of the xsdgate library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
