//! XML namespace handling
//!
//! Qualified names, well-known namespace URIs and the in-scope prefix
//! mappings used both by the document parser and the schema compiler.

use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

/// XML Schema namespace
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// XML Schema instance namespace (`xsi:type`, `xsi:nil`, ...)
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Namespace bound to the predeclared `xml` prefix
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Namespace of `xmlns` attributes; never bindable
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

/// XML Namespace URI
pub type NamespaceUri = String;

/// Namespace prefix
pub type Prefix = String;

/// Qualified name (QName) - combination of namespace and local name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
    /// Namespace URI (None for no namespace)
    pub namespace: Option<NamespaceUri>,
    /// Local name
    pub local_name: String,
}

impl QName {
    /// Create a new QName
    pub fn new(namespace: Option<impl Into<String>>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.map(|s| s.into()),
            local_name: local_name.into(),
        }
    }

    /// Create a QName without a namespace
    pub fn local(local_name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            local_name: local_name.into(),
        }
    }

    /// Create a QName with a namespace
    pub fn namespaced(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            local_name: local_name.into(),
        }
    }

    /// Create a QName in the XML Schema namespace
    pub fn xsd(local_name: impl Into<String>) -> Self {
        Self::namespaced(XSD_NAMESPACE, local_name)
    }

    /// Parse Clark notation (`{uri}local`) or a bare local name
    pub fn from_clark(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Some(rest) = text.strip_prefix('{') {
            let (ns, local) = rest.split_once('}')?;
            if local.is_empty() || local.contains(':') {
                return None;
            }
            if ns.is_empty() {
                Some(Self::local(local))
            } else {
                Some(Self::namespaced(ns, local))
            }
        } else if text.is_empty() || text.contains(':') || text.contains('}') {
            None
        } else {
            Some(Self::local(text))
        }
    }

    /// Namespace URI as a string slice
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Whether this name lives in the given namespace
    pub fn is_in(&self, namespace: Option<&str>) -> bool {
        self.namespace.as_deref() == namespace
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{}}}{}", ns, self.local_name),
            None => write!(f, "{}", self.local_name),
        }
    }
}

impl Serialize for QName {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Namespace context for resolving prefixes
///
/// Holds every in-scope binding, so a context taken from an element can
/// resolve QName-valued content (`xsi:type="p:T"`) as well as names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceContext {
    /// Mapping from prefix to namespace URI
    prefixes: HashMap<Prefix, NamespaceUri>,
    /// Default namespace (no prefix)
    default_namespace: Option<NamespaceUri>,
}

impl NamespaceContext {
    /// Create a context holding only the predeclared `xml` prefix
    pub fn new() -> Self {
        let mut prefixes = HashMap::new();
        prefixes.insert("xml".to_string(), XML_NAMESPACE.to_string());
        Self {
            prefixes,
            default_namespace: None,
        }
    }

    /// Add a namespace prefix mapping
    pub fn add_prefix(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        self.prefixes.insert(prefix.into(), namespace.into());
    }

    /// Undeclare the default namespace (`xmlns=""`)
    pub fn clear_default_namespace(&mut self) {
        self.default_namespace = None;
    }

    /// Set the default namespace
    pub fn set_default_namespace(&mut self, namespace: impl Into<String>) {
        self.default_namespace = Some(namespace.into());
    }

    /// Get the namespace for a prefix
    pub fn get_namespace(&self, prefix: &str) -> Option<&str> {
        self.prefixes.get(prefix).map(|s| s.as_str())
    }

    /// Get the default namespace
    pub fn get_default_namespace(&self) -> Option<&str> {
        self.default_namespace.as_deref()
    }

    /// Find a prefix bound to the namespace, preferring the shortest one
    pub fn prefix_for(&self, namespace: &str) -> Option<&str> {
        self.prefixes
            .iter()
            .filter(|(_, ns)| ns.as_str() == namespace)
            .map(|(p, _)| p.as_str())
            .min_by_key(|p| (p.len(), *p))
    }

    /// Iterate over the prefix bindings
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.prefixes.iter().map(|(p, ns)| (p.as_str(), ns.as_str()))
    }

    /// Resolve an element name or QName-valued content.
    ///
    /// Unprefixed names take the default namespace. Returns `None` when the
    /// prefix is unbound.
    pub fn resolve(&self, prefixed_name: &str) -> Option<QName> {
        match prefixed_name.split_once(':') {
            Some((prefix, local)) => {
                let namespace = self.get_namespace(prefix)?;
                Some(QName::namespaced(namespace, local))
            }
            None => Some(QName::new(self.default_namespace.clone(), prefixed_name)),
        }
    }

    /// Resolve an attribute name. Unprefixed attributes are in no namespace.
    pub fn resolve_attribute(&self, prefixed_name: &str) -> Option<QName> {
        match prefixed_name.split_once(':') {
            Some((prefix, local)) => {
                let namespace = self.get_namespace(prefix)?;
                Some(QName::namespaced(namespace, local))
            }
            None => Some(QName::local(prefixed_name)),
        }
    }
}

impl Default for NamespaceContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qname_creation() {
        let qname = QName::namespaced("http://example.com", "element");
        assert_eq!(qname.namespace, Some("http://example.com".to_string()));
        assert_eq!(qname.local_name, "element");
    }

    #[test]
    fn test_qname_display() {
        let qname = QName::namespaced("http://example.com", "element");
        assert_eq!(qname.to_string(), "{http://example.com}element");

        let qname_local = QName::local("element");
        assert_eq!(qname_local.to_string(), "element");
    }

    #[test]
    fn test_qname_from_clark() {
        assert_eq!(
            QName::from_clark("{urn:orders}order"),
            Some(QName::namespaced("urn:orders", "order"))
        );
        assert_eq!(QName::from_clark("order"), Some(QName::local("order")));
        assert_eq!(QName::from_clark("{}order"), Some(QName::local("order")));
        assert_eq!(QName::from_clark("p:order"), None);
        assert_eq!(QName::from_clark("{urn:x"), None);
        assert_eq!(QName::from_clark(""), None);
    }

    #[test]
    fn test_qname_serializes_as_clark() {
        let json = serde_json::to_string(&QName::namespaced("urn:a", "b")).unwrap();
        assert_eq!(json, "\"{urn:a}b\"");
    }

    #[test]
    fn test_namespace_context() {
        let mut ctx = NamespaceContext::new();
        ctx.add_prefix("xs", XSD_NAMESPACE);
        ctx.set_default_namespace("http://example.com");

        assert_eq!(ctx.get_namespace("xs"), Some(XSD_NAMESPACE));
        assert_eq!(ctx.get_namespace("xml"), Some(XML_NAMESPACE));
        assert_eq!(ctx.get_default_namespace(), Some("http://example.com"));
        assert_eq!(ctx.prefix_for(XSD_NAMESPACE), Some("xs"));
    }

    #[test]
    fn test_resolve_prefixed_name() {
        let mut ctx = NamespaceContext::new();
        ctx.add_prefix("xs", XSD_NAMESPACE);

        let qname = ctx.resolve("xs:element").unwrap();
        assert_eq!(qname, QName::xsd("element"));
        assert!(ctx.resolve("foo:element").is_none());
    }

    #[test]
    fn test_attributes_ignore_default_namespace() {
        let mut ctx = NamespaceContext::new();
        ctx.set_default_namespace("urn:d");

        assert_eq!(ctx.resolve("a"), Some(QName::namespaced("urn:d", "a")));
        assert_eq!(ctx.resolve_attribute("a"), Some(QName::local("a")));
        assert_eq!(
            ctx.resolve_attribute("xml:lang"),
            Some(QName::namespaced(XML_NAMESPACE, "lang"))
        );
    }
}
