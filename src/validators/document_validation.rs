//! Document Validation
//!
//! Walks a parsed [`Document`] against a [`SchemaModel`] and collects every
//! violation into one ordered list: document order, depth-first, with the
//! attributes of an element checked before its children. The walk never
//! stops at the first error.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::documents::{Document, Element, Position};
use crate::namespaces::{NamespaceContext, QName, XSI_NAMESPACE};

use super::builtins::{XsdValue, DATATYPE_FACET};
use super::complex_types::{ComplexType, ContentType, TypeDefinition, TypeId};
use super::elements::{ElementDeclaration, ElementId, ValueConstraint};
use super::exceptions::{PathStep, ValidationError, ValidationErrorKind};
use super::models::{ChildMatch, ModelViolation, ModelVisitor};
use super::particles::Particle;
use super::schemas::SchemaModel;
use super::wildcards::{ProcessContents, Wildcard};

/// `xsi:` attributes admitted on every element
const XSI_ATTRIBUTES: &[&str] = &["type", "nil", "schemaLocation", "noNamespaceSchemaLocation"];

/// Treatment of names in namespaces the schema declares nothing in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamespacePolicy {
    /// Report them as unknown elements and attributes
    #[default]
    Strict,
    /// Pass them through without validation
    Lax,
}

impl FromStr for NamespacePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strict" => Ok(Self::Strict),
            "lax" => Ok(Self::Lax),
            other => Err(format!(
                "invalid namespace policy '{}', must be 'strict' or 'lax'",
                other
            )),
        }
    }
}

impl fmt::Display for NamespacePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => write!(f, "strict"),
            Self::Lax => write!(f, "lax"),
        }
    }
}

/// Options for a validation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationOptions {
    /// How uncovered namespaces are treated
    pub namespace_policy: NamespacePolicy,
}

impl ValidationOptions {
    /// Create default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the namespace policy
    pub fn with_namespace_policy(mut self, policy: NamespacePolicy) -> Self {
        self.namespace_policy = policy;
        self
    }
}

/// Validate an XML document against the schema.
///
/// When `root` is given, the document element must have that name. An empty
/// result means the document conforms.
pub fn validate_document(
    document: &Document,
    schema: &SchemaModel,
    root: Option<&QName>,
    options: &ValidationOptions,
) -> Vec<ValidationError> {
    let mut validator = DocumentValidator {
        schema,
        options,
        path: Vec::new(),
        errors: Vec::new(),
    };
    validator.validate_root(document.root(), root);
    validator.errors
}

struct DocumentValidator<'a> {
    schema: &'a SchemaModel,
    options: &'a ValidationOptions,
    path: Vec<PathStep>,
    errors: Vec<ValidationError>,
}

impl<'a> DocumentValidator<'a> {
    fn validate_root(&mut self, element: &Element, expected_root: Option<&QName>) {
        self.path.push(PathStep::Element(element.name.clone()));

        if let Some(expected) = expected_root {
            if element.name != *expected {
                let error = self
                    .error(
                        ValidationErrorKind::UnknownElement,
                        element.position,
                        format!("root element {} is not the expected {}", element.name, expected),
                    )
                    .with_expected(expected.to_string())
                    .with_actual(element.name.to_string());
                self.errors.push(error);
                return;
            }
        }

        match self.schema.get_element(&element.name) {
            Some(id) => self.validate_element(element, id),
            None if self.passes_through(element.namespace()) => {}
            None => {
                let declared: Vec<String> = self
                    .schema
                    .global_elements()
                    .map(|(name, _)| name.to_string())
                    .collect();
                let error = self
                    .error(
                        ValidationErrorKind::UnknownElement,
                        element.position,
                        format!("no global declaration for element {}", element.name),
                    )
                    .with_expected(declared.join(", "))
                    .with_actual(element.name.to_string());
                self.errors.push(error);
            }
        }
    }

    /// Validate an element against its declaration; the element is the last path step
    fn validate_element(&mut self, element: &Element, id: ElementId) {
        let schema = self.schema;
        let decl = schema.element(id);
        if decl.is_abstract {
            let error = self.error(
                ValidationErrorKind::AbstractElement,
                element.position,
                format!("element {} is abstract and cannot be used directly", decl.name),
            );
            self.errors.push(error);
            return;
        }

        let mut type_id = decl.type_id;
        if let Some(value) = element.attribute(&QName::namespaced(XSI_NAMESPACE, "type")) {
            if let Some(substituted) = self.resolve_xsi_type(element, value, decl.type_id) {
                type_id = substituted;
            }
        }

        let definition = schema.type_definition(type_id);
        if let TypeDefinition::Complex(complex) = definition {
            if complex.is_abstract {
                let error = self.error(
                    ValidationErrorKind::AbstractElement,
                    element.position,
                    format!(
                        "type {} is abstract; use xsi:type to select a concrete type",
                        complex.display_name()
                    ),
                );
                self.errors.push(error);
                return;
            }
        }

        let nil = self.check_nil(element, decl);
        self.validate_attributes(element, definition);

        if nil {
            if element.has_child_elements() || element.significant_text().is_some() {
                let error = self.error(
                    ValidationErrorKind::NilViolation,
                    element.position,
                    "element with xsi:nil=\"true\" must be empty",
                );
                self.errors.push(error);
            }
            if decl.fixed().is_some() {
                let error = self.error(
                    ValidationErrorKind::NilViolation,
                    element.position,
                    "element with a fixed value cannot be nil",
                );
                self.errors.push(error);
            }
            return;
        }

        match definition {
            TypeDefinition::Simple(_) => self.validate_simple_content(element, type_id, decl),
            TypeDefinition::Complex(complex) => self.validate_complex_content(element, complex, decl),
        }
    }

    /// Whether `xsi:nil` is set to true on a nillable element
    fn check_nil(&mut self, element: &Element, decl: &ElementDeclaration) -> bool {
        let Some(value) = element.attribute(&QName::namespaced(XSI_NAMESPACE, "nil")) else {
            return false;
        };
        let nil = match value.trim() {
            "true" | "1" => true,
            "false" | "0" => false,
            other => {
                self.path.push(PathStep::Attribute(QName::namespaced(XSI_NAMESPACE, "nil")));
                let error = self
                    .error(
                        ValidationErrorKind::NilViolation,
                        element.position,
                        format!("xsi:nil must be a boolean, found '{}'", other),
                    )
                    .with_expected("true or false")
                    .with_actual(other);
                self.errors.push(error);
                self.path.pop();
                return false;
            }
        };
        if nil && !decl.nillable {
            let error = self.error(
                ValidationErrorKind::NilViolation,
                element.position,
                format!("element {} is not nillable", decl.name),
            );
            self.errors.push(error);
            return false;
        }
        nil
    }

    fn resolve_xsi_type(&mut self, element: &Element, value: &str, declared: TypeId) -> Option<TypeId> {
        let schema = self.schema;
        self.path.push(PathStep::Attribute(QName::namespaced(XSI_NAMESPACE, "type")));

        let resolved = element.namespaces.resolve(value.trim());
        let outcome = match resolved.as_ref().map(|name| (name, schema.get_type(name))) {
            None => Err(format!("cannot resolve the prefix of xsi:type '{}'", value.trim())),
            Some((name, None)) => Err(format!("xsi:type {} is not a declared type", name)),
            Some((name, Some(id))) if !schema.is_derived_from(id, declared) => Err(format!(
                "xsi:type {} is not derived from the declared type {}",
                name,
                schema.type_definition(declared).display_name()
            )),
            Some((_, Some(id))) => Ok(id),
        };

        let result = match outcome {
            Ok(id) => Some(id),
            Err(message) => {
                let error = self
                    .error(ValidationErrorKind::TypeSubstitution, element.position, message)
                    .with_expected(format!(
                        "a type derived from {}",
                        schema.type_definition(declared).display_name()
                    ))
                    .with_actual(value.trim());
                self.errors.push(error);
                None
            }
        };
        self.path.pop();
        result
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    fn validate_attributes(&mut self, element: &Element, definition: &TypeDefinition) {
        let (uses, wildcard) = match definition {
            TypeDefinition::Complex(complex) => (Some(&complex.attributes), complex.attribute_wildcard.as_ref()),
            TypeDefinition::Simple(_) => (None, None),
        };

        for attribute in &element.attributes {
            if attribute.name.is_in(Some(XSI_NAMESPACE)) && XSI_ATTRIBUTES.contains(&attribute.name.local_name.as_str()) {
                continue;
            }
            self.path.push(PathStep::Attribute(attribute.name.clone()));

            match uses.and_then(|uses| uses.get(&attribute.name)) {
                Some(decl) if decl.is_prohibited() => {
                    let error = self
                        .error(
                            ValidationErrorKind::ProhibitedAttribute,
                            attribute.position,
                            format!("attribute {} is prohibited", attribute.name),
                        )
                        .with_actual(attribute.value.clone());
                    self.errors.push(error);
                }
                Some(decl) => self.check_attribute_value(
                    decl.type_id,
                    decl.value_constraint.as_ref(),
                    &attribute.value,
                    &element.namespaces,
                    attribute.position,
                ),
                None => match wildcard.filter(|w| w.allows(attribute.name.namespace())) {
                    Some(wildcard) => {
                        self.validate_wildcard_attribute(wildcard, &attribute.name, &attribute.value, element, attribute.position)
                    }
                    None if self.passes_through(attribute.name.namespace()) => {}
                    None => {
                        let error = self
                            .error(
                                ValidationErrorKind::UnknownAttribute,
                                attribute.position,
                                format!("attribute {} is not declared", attribute.name),
                            )
                            .with_actual(attribute.value.clone());
                        self.errors.push(error);
                    }
                },
            }
            self.path.pop();
        }

        if let Some(uses) = uses {
            let present: HashSet<&QName> = element.attributes.iter().map(|a| &a.name).collect();
            for (name, decl) in uses {
                if decl.is_required() && !present.contains(name) {
                    self.path.push(PathStep::Attribute(name.clone()));
                    let error = self
                        .error(
                            ValidationErrorKind::MissingAttribute,
                            element.position,
                            format!("missing required attribute {}", name),
                        )
                        .with_expected(name.to_string());
                    self.errors.push(error);
                    self.path.pop();
                }
            }
        }
    }

    fn validate_wildcard_attribute(
        &mut self,
        wildcard: &Wildcard,
        name: &QName,
        value: &str,
        element: &Element,
        position: Position,
    ) {
        if wildcard.process_contents == ProcessContents::Skip {
            return;
        }
        match self.schema.get_attribute(name) {
            Some(decl) => self.check_attribute_value(
                decl.type_id,
                decl.value_constraint.as_ref(),
                value,
                &element.namespaces,
                position,
            ),
            None if wildcard.process_contents == ProcessContents::Lax => {}
            None => {
                let error = self
                    .error(
                        ValidationErrorKind::UnknownAttribute,
                        position,
                        format!("attribute {} has no global declaration required by {}", name, wildcard),
                    )
                    .with_actual(value);
                self.errors.push(error);
            }
        }
    }

    fn check_attribute_value(
        &mut self,
        type_id: TypeId,
        constraint: Option<&ValueConstraint>,
        literal: &str,
        namespaces: &NamespaceContext,
        position: Position,
    ) {
        if let Some(value) = self.check_simple_value(type_id, literal, namespaces, position) {
            if let Some(constraint) = constraint {
                self.check_fixed(constraint, type_id, &value, literal, position);
            }
        }
    }

    // =========================================================================
    // Content
    // =========================================================================

    fn validate_simple_content(&mut self, element: &Element, type_id: TypeId, decl: &ElementDeclaration) {
        if let Some(child) = element.child_elements().next() {
            let error = self
                .error(
                    ValidationErrorKind::ContentModelViolation,
                    child.position,
                    format!(
                        "element has simple content of type {} and cannot contain child elements",
                        self.schema.type_definition(type_id).display_name()
                    ),
                )
                .with_expected("character data")
                .with_actual(format!("element {}", child.name));
            self.errors.push(error);
            return;
        }

        let text = element.text();
        let position = element.significant_text().map_or(element.position, |t| t.position);
        let (literal, namespaces) = match (&decl.value_constraint, text.is_empty()) {
            (Some(constraint), true) => (constraint.literal.clone(), constraint.namespaces.as_ref()),
            _ => (text, element.namespaces.as_ref()),
        };

        if let Some(value) = self.check_simple_value(type_id, &literal, namespaces, position) {
            if let Some(constraint) = &decl.value_constraint {
                self.check_fixed(constraint, type_id, &value, &literal, position);
            }
        }
    }

    fn validate_complex_content(&mut self, element: &Element, complex: &ComplexType, decl: &ElementDeclaration) {
        match &complex.content {
            ContentType::Empty => {
                if let Some(child) = element.child_elements().next() {
                    let error = self
                        .error(
                            ValidationErrorKind::ContentModelViolation,
                            child.position,
                            "element must be empty",
                        )
                        .with_expected("no content")
                        .with_actual(format!("element {}", child.name));
                    self.errors.push(error);
                } else if let Some(text) = element.significant_text() {
                    let error = self
                        .error(
                            ValidationErrorKind::ContentModelViolation,
                            text.position,
                            "element must be empty",
                        )
                        .with_expected("no content")
                        .with_actual(text.content.trim());
                    self.errors.push(error);
                }
            }
            ContentType::Simple(simple) => self.validate_simple_content(element, *simple, decl),
            ContentType::ElementOnly(particle) => {
                if let Some(text) = element.significant_text() {
                    let error = self
                        .error(
                            ValidationErrorKind::ContentModelViolation,
                            text.position,
                            "character data is not allowed in element-only content",
                        )
                        .with_expected("child elements only")
                        .with_actual(text.content.trim());
                    self.errors.push(error);
                }
                self.validate_children(element, particle);
            }
            ContentType::Mixed(particle) => self.validate_children(element, particle),
        }
    }

    fn validate_children(&mut self, element: &Element, particle: &Particle) {
        let schema = self.schema;
        let mut visitor = ModelVisitor::new(schema, particle);

        for child in element.child_elements() {
            let advance = visitor.advance(&child.name);
            for violation in advance.violations {
                self.report_model_violation(violation, element, Some(child));
            }

            self.path.push(PathStep::Element(child.name.clone()));
            match advance.matched {
                Some(ChildMatch::Element(id)) => self.validate_element(child, id),
                Some(ChildMatch::Wildcard(wildcard)) => self.validate_wildcard_element(child, wildcard),
                None => {}
            }
            self.path.pop();
        }

        for violation in visitor.stop() {
            self.report_model_violation(violation, element, None);
        }
    }

    fn report_model_violation(&mut self, violation: ModelViolation, parent: &Element, child: Option<&Element>) {
        let message = violation.to_string();
        match (violation, child) {
            (ModelViolation::Missing { expected }, _) => {
                let position = child.map_or(parent.position, |c| c.position);
                let error = self
                    .error(ValidationErrorKind::ContentModelViolation, position, message)
                    .with_expected(expected.join(", "))
                    .with_actual(match child {
                        Some(child) => format!("element {}", child.name),
                        None => "end of content".to_string(),
                    });
                self.errors.push(error);
            }
            (ModelViolation::Unexpected { .. }, Some(child)) if self.passes_through(child.namespace()) => {}
            (ModelViolation::Unexpected { expected }, Some(child)) => {
                let kind = if self.schema.covers_namespace(child.namespace()) {
                    ValidationErrorKind::ContentModelViolation
                } else {
                    ValidationErrorKind::UnknownElement
                };
                self.path.push(PathStep::Element(child.name.clone()));
                let error = self
                    .error(kind, child.position, format!("{}: {}", child.name, message))
                    .with_expected(expected.join(", "))
                    .with_actual(child.name.to_string());
                self.errors.push(error);
                self.path.pop();
            }
            (ModelViolation::Overflow { occurs, .. }, Some(child)) => {
                self.path.push(PathStep::Element(child.name.clone()));
                let error = self
                    .error(ValidationErrorKind::ContentModelViolation, child.position, message)
                    .with_expected(format!("{} occurrences", occurs))
                    .with_actual(child.name.to_string());
                self.errors.push(error);
                self.path.pop();
            }
            (_, None) => {}
        }
    }

    /// Validate a child matched by `xs:any`; the child is the last path step
    fn validate_wildcard_element(&mut self, element: &Element, wildcard: &Wildcard) {
        if wildcard.process_contents == ProcessContents::Skip {
            return;
        }
        match self.schema.get_element(&element.name) {
            Some(id) => self.validate_element(element, id),
            None if wildcard.process_contents == ProcessContents::Lax => self.validate_lax(element),
            None if self.passes_through(element.namespace()) => {}
            None => {
                let error = self
                    .error(
                        ValidationErrorKind::UnknownElement,
                        element.position,
                        format!("element {} has no global declaration required by {}", element.name, wildcard),
                    )
                    .with_actual(element.name.to_string());
                self.errors.push(error);
            }
        }
    }

    /// Validate the declared descendants of an undeclared element
    fn validate_lax(&mut self, element: &Element) {
        for child in element.child_elements() {
            self.path.push(PathStep::Element(child.name.clone()));
            match self.schema.get_element(&child.name) {
                Some(id) => self.validate_element(child, id),
                None => self.validate_lax(child),
            }
            self.path.pop();
        }
    }

    // =========================================================================
    // Simple values
    // =========================================================================

    /// Check a literal against a simple type; reports and returns None on failure
    fn check_simple_value(
        &mut self,
        type_id: TypeId,
        literal: &str,
        namespaces: &NamespaceContext,
        position: Position,
    ) -> Option<XsdValue> {
        let schema = self.schema;
        let simple = schema.simple_type(type_id)?;
        match simple.validate(schema, literal, namespaces) {
            Ok(value) => Some(value),
            Err(failure) => {
                let message = if failure.facet == DATATYPE_FACET {
                    match &failure.reason {
                        Some(reason) => format!("'{}' is not {}: {}", failure.actual, failure.expected, reason),
                        None => format!("'{}' is not {}", failure.actual, failure.expected),
                    }
                } else {
                    format!(
                        "'{}' violates the {} facet: expected {}",
                        failure.actual, failure.facet, failure.expected
                    )
                };
                let error = self
                    .error(
                        ValidationErrorKind::FacetViolation {
                            facet: failure.facet.clone(),
                        },
                        position,
                        message,
                    )
                    .with_expected(failure.expected)
                    .with_actual(failure.actual);
                self.errors.push(error);
                None
            }
        }
    }

    fn check_fixed(
        &mut self,
        constraint: &ValueConstraint,
        type_id: TypeId,
        value: &XsdValue,
        literal: &str,
        position: Position,
    ) {
        if !constraint.is_fixed() {
            return;
        }
        let schema = self.schema;
        let matches = schema
            .simple_type(type_id)
            .and_then(|simple| simple.validate(schema, &constraint.literal, &constraint.namespaces).ok())
            .map_or(false, |fixed| fixed.same_value(value));
        if !matches {
            let error = self
                .error(
                    ValidationErrorKind::FixedValueMismatch,
                    position,
                    format!("value '{}' differs from the fixed value '{}'", literal.trim(), constraint.literal),
                )
                .with_expected(constraint.literal.clone())
                .with_actual(literal.trim());
            self.errors.push(error);
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Whether a name in `namespace` is passed through under the lax policy
    fn passes_through(&self, namespace: Option<&str>) -> bool {
        self.options.namespace_policy == NamespacePolicy::Lax && !self.schema.covers_namespace(namespace)
    }

    fn error(&self, kind: ValidationErrorKind, position: Position, message: impl Into<String>) -> ValidationError {
        ValidationError::new(kind, self.path.clone(), position, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORDER_XSD: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
        <xs:element name="order">
            <xs:complexType>
                <xs:sequence>
                    <xs:element name="id" type="xs:integer"/>
                </xs:sequence>
            </xs:complexType>
        </xs:element>
    </xs:schema>"#;

    const SHOP_XSD: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
        <xs:simpleType name="sku">
            <xs:restriction base="xs:string">
                <xs:maxLength value="6"/>
                <xs:pattern value="[A-Z]{2}[0-9]+"/>
            </xs:restriction>
        </xs:simpleType>
        <xs:complexType name="item">
            <xs:sequence>
                <xs:element name="sku" type="sku"/>
                <xs:element name="qty" type="xs:positiveInteger" maxOccurs="2"/>
                <xs:element name="note" type="xs:string" minOccurs="0" nillable="true"/>
            </xs:sequence>
            <xs:attribute name="id" type="xs:ID" use="required"/>
            <xs:attribute name="currency" type="xs:string" fixed="EUR"/>
            <xs:attribute name="legacy" type="xs:string" use="prohibited"/>
        </xs:complexType>
        <xs:complexType name="special-item">
            <xs:complexContent>
                <xs:extension base="item">
                    <xs:sequence>
                        <xs:element name="reason" type="xs:string"/>
                    </xs:sequence>
                </xs:extension>
            </xs:complexContent>
        </xs:complexType>
        <xs:element name="cart">
            <xs:complexType>
                <xs:sequence>
                    <xs:element name="item" type="item" maxOccurs="unbounded"/>
                    <xs:element name="version" type="xs:decimal" fixed="1.0" minOccurs="0"/>
                    <xs:any namespace='##other' processContents="skip" minOccurs="0"/>
                </xs:sequence>
                <xs:anyAttribute namespace="urn:meta" processContents="lax"/>
            </xs:complexType>
        </xs:element>
    </xs:schema>"#;

    fn validate(xsd: &str, xml: &str) -> Vec<ValidationError> {
        let schema = SchemaModel::compile(xsd.as_bytes()).unwrap();
        let document = Document::from_string(xml).unwrap();
        validate_document(&document, &schema, None, &ValidationOptions::default())
    }

    fn kinds(errors: &[ValidationError]) -> Vec<ValidationErrorKind> {
        errors.iter().map(|e| e.kind.clone()).collect()
    }

    #[test]
    fn test_order_example() {
        assert!(validate(ORDER_XSD, "<order><id>42</id></order>").is_empty());

        let errors = validate(ORDER_XSD, "<order><id>abc</id></order>");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].facet(), Some(DATATYPE_FACET));
        assert_eq!(errors[0].path_string(), "/order/id");
        assert_eq!(errors[0].expected.as_deref(), Some("a valid xs:integer"));
        assert_eq!(errors[0].actual.as_deref(), Some("abc"));

        let errors = validate(ORDER_XSD, "<order></order>");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ValidationErrorKind::ContentModelViolation);
        assert_eq!(errors[0].path_string(), "/order");
        assert_eq!(errors[0].expected.as_deref(), Some("id"));
    }

    #[test]
    fn test_unknown_root() {
        let errors = validate(ORDER_XSD, "<invoice/>");
        assert_eq!(kinds(&errors), vec![ValidationErrorKind::UnknownElement]);
        assert_eq!(errors[0].expected.as_deref(), Some("order"));
    }

    #[test]
    fn test_expected_root() {
        let schema = SchemaModel::compile(SHOP_XSD.as_bytes()).unwrap();
        let document = Document::from_string("<order><id>1</id></order>").unwrap();
        let errors = validate_document(
            &document,
            &schema,
            Some(&QName::local("cart")),
            &ValidationOptions::default(),
        );
        assert_eq!(kinds(&errors), vec![ValidationErrorKind::UnknownElement]);
    }

    #[test]
    fn test_attributes_before_children() {
        let errors = validate(
            SHOP_XSD,
            r#"<cart><item legacy="x" currency="USD"><sku>ab1</sku><qty>1</qty></item></cart>"#,
        );
        assert_eq!(
            kinds(&errors),
            vec![
                ValidationErrorKind::ProhibitedAttribute,
                ValidationErrorKind::FixedValueMismatch,
                ValidationErrorKind::MissingAttribute,
                ValidationErrorKind::FacetViolation {
                    facet: "pattern".to_string()
                },
            ]
        );
        assert_eq!(errors[0].path_string(), "/cart/item/@legacy");
        assert_eq!(errors[2].path_string(), "/cart/item/@id");
        assert_eq!(errors[2].expected.as_deref(), Some("id"));
        assert_eq!(errors[3].path_string(), "/cart/item/sku");
    }

    #[test]
    fn test_facet_order_determinism() {
        // too long and not matching the pattern: only maxLength is reported
        let errors = validate(
            SHOP_XSD,
            r#"<cart><item id="i1"><sku>abcdefgh</sku><qty>1</qty></item></cart>"#,
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].facet(), Some("maxLength"));
    }

    #[test]
    fn test_max_occurs_overflow() {
        let errors = validate(
            SHOP_XSD,
            r#"<cart><item id="i1"><sku>AB1</sku><qty>1</qty><qty>2</qty><qty>0</qty></item></cart>"#,
        );
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].kind, ValidationErrorKind::ContentModelViolation);
        assert!(errors[0].message.contains("occurs 3 times"));
        assert!(errors[0].message.contains("1..2"));
        // the overflowing child is still checked against its declaration
        assert_eq!(errors[1].facet(), Some(DATATYPE_FACET));
    }

    #[test]
    fn test_errors_accumulate() {
        let errors = validate(
            SHOP_XSD,
            r#"<cart>
                 <item id="a"><sku>AB1</sku><qty>x</qty></item>
                 <item><sku>AB2</sku><qty>1</qty><bogus/></item>
                 <version>2.0</version>
               </cart>"#,
        );
        assert_eq!(
            kinds(&errors),
            vec![
                ValidationErrorKind::FacetViolation {
                    facet: DATATYPE_FACET.to_string()
                },
                ValidationErrorKind::MissingAttribute,
                ValidationErrorKind::ContentModelViolation,
                ValidationErrorKind::FixedValueMismatch,
            ]
        );
        assert_eq!(errors[2].path_string(), "/cart/item/bogus");
        assert_eq!(errors[2].position.line, 3);
    }

    #[test]
    fn test_text_in_element_only_content() {
        let errors = validate(ORDER_XSD, "<order>stray<id>1</id></order>");
        assert_eq!(kinds(&errors), vec![ValidationErrorKind::ContentModelViolation]);
        assert_eq!(errors[0].actual.as_deref(), Some("stray"));

        let errors = validate(ORDER_XSD, "<order><id><x/></id></order>");
        assert_eq!(kinds(&errors), vec![ValidationErrorKind::ContentModelViolation]);
    }

    #[test]
    fn test_fixed_value_space() {
        assert!(validate(SHOP_XSD, r#"<cart><item id="a"><sku>AB1</sku><qty>1</qty></item><version>1.00</version></cart>"#).is_empty());
        // empty element takes the fixed value
        assert!(validate(SHOP_XSD, r#"<cart><item id="a"><sku>AB1</sku><qty>1</qty></item><version/></cart>"#).is_empty());
    }

    #[test]
    fn test_nil() {
        assert!(validate(
            SHOP_XSD,
            r#"<cart xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
                 <item id="a"><sku>AB1</sku><qty>1</qty><note xsi:nil="true"/></item>
               </cart>"#
        )
        .is_empty());

        let errors = validate(
            SHOP_XSD,
            r#"<cart xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
                 <item id="a"><sku xsi:nil="true">AB1</sku><qty>1</qty><note xsi:nil="true">text</note></item>
               </cart>"#,
        );
        assert_eq!(
            kinds(&errors),
            vec![ValidationErrorKind::NilViolation, ValidationErrorKind::NilViolation]
        );
        assert_eq!(errors[0].path_string(), "/cart/item/sku");
        assert_eq!(errors[1].path_string(), "/cart/item/note");
    }

    #[test]
    fn test_xsi_type() {
        let xml = r#"<cart xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
                 <item id="a" xsi:type="special-item"><sku>AB1</sku><qty>1</qty><reason>gift</reason></item>
               </cart>"#;
        assert!(validate(SHOP_XSD, xml).is_empty());

        let errors = validate(
            SHOP_XSD,
            r#"<cart xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
                 <item id="a" xsi:type="xs:string"><sku>AB1</sku><qty>1</qty></item>
               </cart>"#,
        );
        assert_eq!(errors[0].kind, ValidationErrorKind::TypeSubstitution);
        assert_eq!(errors[0].path_string(), "/cart/item/@{http://www.w3.org/2001/XMLSchema-instance}type");
    }

    #[test]
    fn test_wildcards() {
        let xml = r#"<cart xmlns:m="urn:meta" m:trace="t1">
                 <item id="a"><sku>AB1</sku><qty>1</qty></item>
                 <ext:anything xmlns:ext="urn:ext"><deep/></ext:anything>
               </cart>"#;
        assert!(validate(SHOP_XSD, xml).is_empty());

        let errors = validate(SHOP_XSD, r#"<cart other="x"><item id="a"><sku>AB1</sku><qty>1</qty></item></cart>"#);
        assert_eq!(kinds(&errors), vec![ValidationErrorKind::UnknownAttribute]);
    }

    #[test]
    fn test_namespace_policy() {
        let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                                targetNamespace="urn:orders" elementFormDefault="qualified">
                        <xs:element name="order">
                            <xs:complexType>
                                <xs:sequence><xs:element name="id" type="xs:int"/></xs:sequence>
                            </xs:complexType>
                        </xs:element>
                     </xs:schema>"#;
        let xml = r#"<order xmlns="urn:orders" xmlns:x="urn:tracking" x:hop="1">
                        <id>7</id><x:route/>
                     </order>"#;
        let schema = SchemaModel::compile(xsd.as_bytes()).unwrap();
        let document = Document::from_string(xml).unwrap();

        let strict = validate_document(&document, &schema, None, &ValidationOptions::default());
        assert_eq!(
            kinds(&strict),
            vec![ValidationErrorKind::UnknownAttribute, ValidationErrorKind::UnknownElement]
        );

        let lax = ValidationOptions::new().with_namespace_policy(NamespacePolicy::Lax);
        assert!(validate_document(&document, &schema, None, &lax).is_empty());
    }

    #[test]
    fn test_namespace_policy_unqualified_locals() {
        let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:orders">
                        <xs:element name="order">
                            <xs:complexType>
                                <xs:sequence><xs:element name="id" type="xs:int"/></xs:sequence>
                                <xs:attribute name="currency" type="xs:string"/>
                            </xs:complexType>
                        </xs:element>
                     </xs:schema>"#;
        let xml = r#"<o:order xmlns:o="urn:orders" xmlns:x="urn:tracking" currency="EUR" bogus="1" x:hop="1">
                        <id>7</id><extra/>
                     </o:order>"#;
        let schema = SchemaModel::compile(xsd.as_bytes()).unwrap();
        assert!(schema.covers_namespace(None));
        assert!(schema.covers_namespace(Some("urn:orders")));
        assert!(!schema.covers_namespace(Some("urn:tracking")));
        let document = Document::from_string(xml).unwrap();

        let strict = validate_document(&document, &schema, None, &ValidationOptions::default());
        assert_eq!(
            kinds(&strict),
            vec![
                ValidationErrorKind::UnknownAttribute,
                ValidationErrorKind::UnknownAttribute,
                ValidationErrorKind::ContentModelViolation,
            ]
        );
        assert_eq!(strict[2].path_string(), "/{urn:orders}order/extra");

        let lax = ValidationOptions::new().with_namespace_policy(NamespacePolicy::Lax);
        let errors = validate_document(&document, &schema, None, &lax);
        assert_eq!(
            kinds(&errors),
            vec![ValidationErrorKind::UnknownAttribute, ValidationErrorKind::ContentModelViolation]
        );
        assert_eq!(errors[0].actual.as_deref(), Some("1"));
        assert_eq!(errors[0].path_string(), "/{urn:orders}order/@bogus");
    }

    #[test]
    fn test_abstract_and_substitution() {
        let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
            <xs:element name="shape" abstract="true" type="xs:string"/>
            <xs:element name="circle" substitutionGroup="shape"/>
            <xs:element name="drawing">
                <xs:complexType>
                    <xs:sequence><xs:element ref="shape" maxOccurs="unbounded"/></xs:sequence>
                </xs:complexType>
            </xs:element>
        </xs:schema>"#;
        assert!(validate(xsd, "<drawing><circle>r=1</circle></drawing>").is_empty());

        let errors = validate(xsd, "<drawing><shape>x</shape></drawing>");
        assert_eq!(kinds(&errors), vec![ValidationErrorKind::AbstractElement]);
    }

    #[test]
    fn test_namespace_policy_parse() {
        assert_eq!("lax".parse::<NamespacePolicy>().unwrap(), NamespacePolicy::Lax);
        assert!("loose".parse::<NamespacePolicy>().is_err());
        assert_eq!(NamespacePolicy::default(), NamespacePolicy::Strict);
    }
}
