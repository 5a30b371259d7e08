//! Property-based tests
//!
//! The parser must never panic on untrusted bytes, and datatype checks must
//! agree with independently computed expectations.

use proptest::prelude::*;

use xsdgate::{Document, SchemaModel, ValidationErrorKind};

fn schema(simple_type: &str) -> SchemaModel {
    let xsd = format!(
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
             <xs:element name="v">{}</xs:element>
           </xs:schema>"#,
        simple_type
    );
    SchemaModel::compile(xsd.as_bytes()).unwrap()
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

proptest! {
    #[test]
    fn parser_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
        let _ = Document::parse(&bytes);
    }

    #[test]
    fn parser_never_panics_on_markup(text in "[<>/a-c =\"'&;!?\\[\\]-]{0,64}") {
        let _ = Document::parse(text.as_bytes());
    }

    #[test]
    fn integers_validate(n in any::<i64>()) {
        let schema = schema(r#"<xs:simpleType><xs:restriction base="xs:integer"/></xs:simpleType>"#);
        let document = Document::parse(format!("<v>{}</v>", n).as_bytes()).unwrap();
        prop_assert!(schema.validate(&document).is_empty());
    }

    #[test]
    fn bounded_int_matches_range(n in -1000i32..1000) {
        let schema = schema(
            r#"<xs:simpleType>
                 <xs:restriction base="xs:int">
                   <xs:minInclusive value="-10"/>
                   <xs:maxExclusive value="10"/>
                 </xs:restriction>
               </xs:simpleType>"#,
        );
        let document = Document::parse(format!("<v> {} </v>", n).as_bytes()).unwrap();
        let errors = schema.validate(&document);
        prop_assert_eq!(errors.is_empty(), (-10..10).contains(&n));
    }

    #[test]
    fn max_length_counts_characters(text in "\\PC{0,12}") {
        let schema = schema(
            r#"<xs:simpleType>
                 <xs:restriction base="xs:string">
                   <xs:maxLength value="6"/>
                 </xs:restriction>
               </xs:simpleType>"#,
        );
        let document = Document::parse(format!("<v>{}</v>", escape(&text)).as_bytes());
        prop_assume!(document.is_ok());
        let document = document.unwrap();
        let length = document.root().text().chars().count();
        let errors = schema.validate(&document);
        if length <= 6 {
            prop_assert!(errors.is_empty());
        } else {
            prop_assert_eq!(errors.len(), 1);
            prop_assert_eq!(
                errors[0].kind.clone(),
                ValidationErrorKind::FacetViolation { facet: "maxLength".to_string() }
            );
        }
    }
}
