//! XSD Wildcards
//!
//! `xs:any` and `xs:anyAttribute` admit names by namespace:
//! - `##any`: every namespace, and no namespace
//! - `##other`: any namespace except the target namespace and no namespace
//! - a list of URIs, `##targetNamespace` and `##local`

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Process contents mode for wildcards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessContents {
    /// The admitted item must be declared and valid
    #[default]
    Strict,
    /// Validate if a declaration is found, otherwise accept
    Lax,
    /// Skip validation entirely
    Skip,
}

impl FromStr for ProcessContents {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strict" => Ok(Self::Strict),
            "lax" => Ok(Self::Lax),
            "skip" => Ok(Self::Skip),
            other => Err(format!(
                "processContents must be 'strict', 'lax' or 'skip', found '{}'",
                other
            )),
        }
    }
}

impl fmt::Display for ProcessContents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => write!(f, "strict"),
            Self::Lax => write!(f, "lax"),
            Self::Skip => write!(f, "skip"),
        }
    }
}

/// Namespace constraint for wildcards
///
/// The empty string stands for "no namespace".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NamespaceConstraint {
    /// Any namespace is allowed (##any)
    #[default]
    Any,
    /// Any namespace except the target namespace and no namespace (##other)
    Other {
        /// The target namespace to exclude
        target_namespace: Option<String>,
    },
    /// Specific set of allowed namespaces
    Enumeration(BTreeSet<String>),
}

impl NamespaceConstraint {
    /// Create from a `namespace` attribute value
    pub fn from_namespace_attr(value: &str, target_namespace: Option<&str>) -> Result<Self, String> {
        match value.trim() {
            "##any" => Ok(Self::Any),
            "##other" => Ok(Self::Other {
                target_namespace: target_namespace.map(String::from),
            }),
            value => {
                let mut namespaces = BTreeSet::new();
                for ns in value.split_whitespace() {
                    match ns {
                        "##local" => {
                            namespaces.insert(String::new());
                        }
                        "##targetNamespace" => {
                            namespaces.insert(target_namespace.unwrap_or_default().to_string());
                        }
                        s if s.starts_with("##") => {
                            return Err(format!("wrong value '{}' in 'namespace' attribute", s));
                        }
                        uri => {
                            namespaces.insert(uri.to_string());
                        }
                    }
                }
                Ok(Self::Enumeration(namespaces))
            }
        }
    }

    /// Whether a name in `namespace` is admitted
    pub fn allows(&self, namespace: Option<&str>) -> bool {
        match self {
            Self::Any => true,
            Self::Other { target_namespace } => match namespace {
                None | Some("") => false,
                Some(ns) => target_namespace.as_deref() != Some(ns),
            },
            Self::Enumeration(set) => set.contains(namespace.unwrap_or_default()),
        }
    }

    /// Union of two constraints, as used by complex type extension
    pub fn union(&self, other: &NamespaceConstraint) -> NamespaceConstraint {
        match (self, other) {
            (Self::Any, _) | (_, Self::Any) => Self::Any,
            (Self::Enumeration(a), Self::Enumeration(b)) => {
                Self::Enumeration(a.union(b).cloned().collect())
            }
            (Self::Other { target_namespace }, Self::Enumeration(set))
            | (Self::Enumeration(set), Self::Other { target_namespace }) => {
                let tns = target_namespace.clone().unwrap_or_default();
                if set.contains(&tns) || set.contains("") {
                    Self::Any
                } else {
                    Self::Other {
                        target_namespace: target_namespace.clone(),
                    }
                }
            }
            (Self::Other { target_namespace: a }, Self::Other { target_namespace: b }) => {
                if a == b {
                    self.clone()
                } else {
                    Self::Any
                }
            }
        }
    }
}

impl fmt::Display for NamespaceConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "##any"),
            Self::Other { .. } => write!(f, "##other"),
            Self::Enumeration(set) => {
                let items: Vec<&str> = set
                    .iter()
                    .map(|ns| if ns.is_empty() { "##local" } else { ns.as_str() })
                    .collect();
                write!(f, "{}", items.join(" "))
            }
        }
    }
}

/// An element or attribute wildcard
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Wildcard {
    /// Admitted namespaces
    pub namespaces: NamespaceConstraint,
    /// How admitted items are validated
    pub process_contents: ProcessContents,
}

impl Wildcard {
    /// Create a new wildcard
    pub fn new(namespaces: NamespaceConstraint, process_contents: ProcessContents) -> Self {
        Self {
            namespaces,
            process_contents,
        }
    }

    /// `##any` with lax processing, as used by `xs:anyType`
    pub fn any_lax() -> Self {
        Self::new(NamespaceConstraint::Any, ProcessContents::Lax)
    }

    /// Whether a name in `namespace` is admitted
    pub fn allows(&self, namespace: Option<&str>) -> bool {
        self.namespaces.allows(namespace)
    }

    /// Wildcard union; the processContents of `self` wins
    pub fn union(&self, other: &Wildcard) -> Wildcard {
        Wildcard::new(self.namespaces.union(&other.namespaces), self.process_contents)
    }
}

impl fmt::Display for Wildcard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "any({})", self.namespaces)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_contents_parse() {
        assert_eq!("strict".parse::<ProcessContents>().unwrap(), ProcessContents::Strict);
        assert_eq!("lax".parse::<ProcessContents>().unwrap(), ProcessContents::Lax);
        assert_eq!("skip".parse::<ProcessContents>().unwrap(), ProcessContents::Skip);
        assert!("eager".parse::<ProcessContents>().is_err());
    }

    #[test]
    fn test_namespace_any() {
        let c = NamespaceConstraint::from_namespace_attr("##any", Some("urn:t")).unwrap();
        assert!(c.allows(None));
        assert!(c.allows(Some("urn:x")));
    }

    #[test]
    fn test_namespace_other() {
        let c = NamespaceConstraint::from_namespace_attr("##other", Some("urn:t")).unwrap();
        assert!(!c.allows(None));
        assert!(!c.allows(Some("urn:t")));
        assert!(c.allows(Some("urn:x")));
    }

    #[test]
    fn test_namespace_list() {
        let c = NamespaceConstraint::from_namespace_attr("##targetNamespace ##local urn:a", Some("urn:t"))
            .unwrap();
        assert!(c.allows(None));
        assert!(c.allows(Some("urn:t")));
        assert!(c.allows(Some("urn:a")));
        assert!(!c.allows(Some("urn:b")));

        assert!(NamespaceConstraint::from_namespace_attr("##bogus", None).is_err());
    }

    #[test]
    fn test_union() {
        let a = NamespaceConstraint::from_namespace_attr("urn:a", None).unwrap();
        let b = NamespaceConstraint::from_namespace_attr("urn:b", None).unwrap();
        let u = a.union(&b);
        assert!(u.allows(Some("urn:a")));
        assert!(u.allows(Some("urn:b")));
        assert!(!u.allows(Some("urn:c")));

        let other = NamespaceConstraint::from_namespace_attr("##other", Some("urn:t")).unwrap();
        let local = NamespaceConstraint::from_namespace_attr("##local", Some("urn:t")).unwrap();
        assert_eq!(other.union(&local), NamespaceConstraint::Any);
    }
}
