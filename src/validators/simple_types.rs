//! XSD Simple Types
//!
//! Atomic, list and union simple types and the value check shared by element
//! text and attribute values. A value is whitespace-normalized, then checked
//! for datatype validity, then against the facets in a fixed order:
//! length, minLength, maxLength, pattern, enumeration, the range facets,
//! totalDigits and fractionDigits. The first failing check is reported.

use std::collections::HashSet;

use crate::namespaces::{NamespaceContext, QName};

use super::builtins::{
    BuiltinType, XsdValue, DATATYPE_FACET, LENGTH_FACETS, UNION_FACETS,
};
use super::complex_types::TypeId;
use super::facets::{FacetFailure, FacetSet, WhiteSpace};
use super::schemas::SchemaModel;

/// Variety of a simple type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Variety {
    /// Single value of a built-in datatype
    Atomic,
    /// Whitespace-separated list of item type values
    List(TypeId),
    /// Value of the first member type that accepts it
    Union(Vec<TypeId>),
}

/// A compiled simple type definition
#[derive(Debug, Clone)]
pub struct SimpleType {
    /// Name, for global and built-in types
    pub name: Option<QName>,
    /// Base type (None for anySimpleType)
    pub base: Option<TypeId>,
    /// Atomic, list or union
    pub variety: Variety,
    /// Nearest built-in ancestor; its parser checks atomic values
    pub builtin: &'static BuiltinType,
    /// Effective whitespace handling
    pub white_space: WhiteSpace,
    /// Effective facets, inherited ones included
    pub facets: FacetSet,
}

impl SimpleType {
    /// A built-in type with no facets
    pub fn builtin(builtin: &'static BuiltinType, base: Option<TypeId>, variety: Variety) -> Self {
        Self {
            name: Some(QName::xsd(builtin.name)),
            base,
            variety,
            builtin,
            white_space: builtin.white_space,
            facets: FacetSet::default(),
        }
    }

    /// Name for messages (`xs:int`, `{urn:x}code`, or `anonymous type`)
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) if name.is_in(Some(crate::namespaces::XSD_NAMESPACE)) => {
                format!("xs:{}", name.local_name)
            }
            Some(name) => name.to_string(),
            None => format!("anonymous type derived from xs:{}", self.builtin.name),
        }
    }

    /// Whether this is a list type
    pub fn is_list(&self) -> bool {
        matches!(self.variety, Variety::List(_))
    }

    /// Facets that a restriction of this type may declare
    pub fn admitted_facets(&self) -> &'static HashSet<&'static str> {
        match self.variety {
            Variety::Atomic => self.builtin.admitted_facets(),
            Variety::List(_) => &LENGTH_FACETS,
            Variety::Union(_) => &UNION_FACETS,
        }
    }

    /// Whether range facets can be evaluated on values of this type
    pub fn is_ordered(&self) -> bool {
        matches!(self.variety, Variety::Atomic) && self.builtin.is_ordered()
    }

    /// Check a literal against this type.
    ///
    /// Returns the parsed value, or the first failing check. `namespaces`
    /// resolves QName values.
    pub fn validate(
        &self,
        schema: &SchemaModel,
        literal: &str,
        namespaces: &NamespaceContext,
    ) -> Result<XsdValue, FacetFailure> {
        let normalized = self.white_space.normalize(literal);
        let normalized = normalized.as_ref();

        let (value, length) = match &self.variety {
            Variety::Atomic => {
                let value = self.builtin.parse(normalized, namespaces).map_err(|reason| {
                    FacetFailure::new(
                        DATATYPE_FACET,
                        format!("a valid xs:{}", self.builtin.name),
                        normalized,
                    )
                    .with_reason(reason)
                })?;
                let length = self.builtin.length_of(normalized, &value);
                (value, length)
            }
            Variety::List(item_type) => {
                let item = schema.simple_type(*item_type).ok_or_else(|| {
                    FacetFailure::new(DATATYPE_FACET, "a list item type", normalized)
                })?;
                let mut items = Vec::new();
                for token in normalized.split(' ').filter(|t| !t.is_empty()) {
                    items.push(item.validate(schema, token, namespaces)?);
                }
                let count = items.len();
                (XsdValue::List(items), Some(count))
            }
            Variety::Union(members) => {
                let value = members
                    .iter()
                    .filter_map(|id| schema.simple_type(*id))
                    .find_map(|member| member.validate(schema, normalized, namespaces).ok())
                    .ok_or_else(|| {
                        let names: Vec<String> = members
                            .iter()
                            .filter_map(|id| schema.simple_type(*id))
                            .map(|m| m.display_name())
                            .collect();
                        FacetFailure::new(
                            DATATYPE_FACET,
                            format!("a value of one of [{}]", names.join(", ")),
                            normalized,
                        )
                    })?;
                (value, None)
            }
        };

        if let Some(length) = length {
            self.facets.check_length(length)?;
        }
        self.facets.check_patterns(normalized)?;
        self.facets.check_enumeration(normalized, &value)?;
        self.facets.check_bounds(normalized, &value)?;
        self.facets.check_digits(normalized, &value)?;

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(source: &str) -> SchemaModel {
        SchemaModel::compile(source.as_bytes()).unwrap()
    }

    fn check(schema: &SchemaModel, type_name: &str, literal: &str) -> Result<XsdValue, FacetFailure> {
        let id = schema.get_type(&QName::local(type_name)).unwrap();
        schema
            .simple_type(id)
            .unwrap()
            .validate(schema, literal, &NamespaceContext::new())
    }

    const TYPES: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
        <xs:simpleType name="code">
            <xs:restriction base="xs:string">
                <xs:maxLength value="5"/>
                <xs:pattern value="[A-Z]+"/>
            </xs:restriction>
        </xs:simpleType>
        <xs:simpleType name="percent">
            <xs:restriction base="xs:int">
                <xs:minInclusive value="0"/>
                <xs:maxInclusive value="100"/>
            </xs:restriction>
        </xs:simpleType>
        <xs:simpleType name="small-percent">
            <xs:restriction base="percent">
                <xs:maxExclusive value="10"/>
            </xs:restriction>
        </xs:simpleType>
        <xs:simpleType name="sizes">
            <xs:list itemType="xs:positiveInteger"/>
        </xs:simpleType>
        <xs:simpleType name="short-sizes">
            <xs:restriction base="sizes">
                <xs:maxLength value="2"/>
            </xs:restriction>
        </xs:simpleType>
        <xs:simpleType name="date-or-never">
            <xs:union memberTypes="xs:date">
                <xs:simpleType>
                    <xs:restriction base="xs:token">
                        <xs:enumeration value="never"/>
                    </xs:restriction>
                </xs:simpleType>
            </xs:union>
        </xs:simpleType>
        <xs:simpleType name="price">
            <xs:restriction base="xs:decimal">
                <xs:totalDigits value="5"/>
                <xs:fractionDigits value="2"/>
            </xs:restriction>
        </xs:simpleType>
    </xs:schema>"#;

    #[test]
    fn test_facet_order_length_before_pattern() {
        let schema = schema(TYPES);
        assert!(check(&schema, "code", "ABC").is_ok());

        let err = check(&schema, "code", "abcdefg").unwrap_err();
        assert_eq!(err.facet, "maxLength");

        let err = check(&schema, "code", "abc").unwrap_err();
        assert_eq!(err.facet, "pattern");
    }

    #[test]
    fn test_datatype_before_facets() {
        let schema = schema(TYPES);
        let err = check(&schema, "percent", "lots").unwrap_err();
        assert_eq!(err.facet, DATATYPE_FACET);
        assert_eq!(err.expected, "a valid xs:int");
    }

    #[test]
    fn test_inherited_bounds() {
        let schema = schema(TYPES);
        assert!(check(&schema, "percent", " 100 ").is_ok());
        assert_eq!(check(&schema, "percent", "101").unwrap_err().facet, "maxInclusive");
        assert!(check(&schema, "small-percent", "9").is_ok());
        assert_eq!(check(&schema, "small-percent", "10").unwrap_err().facet, "maxExclusive");
        assert_eq!(check(&schema, "small-percent", "-1").unwrap_err().facet, "minInclusive");
    }

    #[test]
    fn test_list_type() {
        let schema = schema(TYPES);
        assert!(matches!(check(&schema, "sizes", " 1  2\n3 "), Ok(XsdValue::List(items)) if items.len() == 3));
        assert!(check(&schema, "sizes", "").is_ok());
        assert_eq!(check(&schema, "sizes", "1 0").unwrap_err().facet, DATATYPE_FACET);
        assert_eq!(check(&schema, "short-sizes", "1 2 3").unwrap_err().facet, "maxLength");
    }

    #[test]
    fn test_union_type() {
        let schema = schema(TYPES);
        assert!(matches!(check(&schema, "date-or-never", "2024-02-29"), Ok(XsdValue::DateTime(_))));
        assert!(check(&schema, "date-or-never", "never").is_ok());
        let err = check(&schema, "date-or-never", "someday").unwrap_err();
        assert_eq!(err.facet, DATATYPE_FACET);
        assert!(err.expected.contains("xs:date"));
    }

    #[test]
    fn test_digits() {
        let schema = schema(TYPES);
        assert!(check(&schema, "price", "999.99").is_ok());
        assert_eq!(check(&schema, "price", "9999.99").unwrap_err().facet, "totalDigits");
        assert_eq!(check(&schema, "price", "1.999").unwrap_err().facet, "fractionDigits");
    }

    #[test]
    fn test_display_name() {
        let schema = schema(TYPES);
        let id = schema.get_type(&QName::xsd("int")).unwrap();
        assert_eq!(schema.simple_type(id).unwrap().display_name(), "xs:int");
        let id = schema.get_type(&QName::local("code")).unwrap();
        assert_eq!(schema.simple_type(id).unwrap().display_name(), "code");
    }
}
