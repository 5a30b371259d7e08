//! Gateway configuration
//!
//! A [`GatewayConfig`] is built in code with the `with_*` methods or read
//! from TOML:
//!
//! ```toml
//! schema_path = "schemas/order.xsd"
//! root_element = "{urn:orders}order"
//! policy = "reject"
//! namespace_policy = "strict"
//!
//! [limits]
//! max_xml_size = 1048576
//! ```

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::gateway::EnforcementPolicy;
use crate::limits::Limits;
use crate::namespaces::QName;
use crate::validators::{NamespacePolicy, ValidationOptions};

/// Configuration of a [`crate::gateway::ValidationGateway`]
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Path of the XSD file to compile at startup
    pub schema_path: PathBuf,

    /// Expected document element, in Clark notation or as a local name
    #[serde(default)]
    pub root_element: Option<String>,

    /// What to do with invalid request bodies
    #[serde(default)]
    pub policy: EnforcementPolicy,

    /// Treatment of names in namespaces the schema does not cover
    #[serde(default)]
    pub namespace_policy: NamespacePolicy,

    /// Parser limits for request bodies
    #[serde(default)]
    pub limits: Limits,
}

impl GatewayConfig {
    /// Configuration with defaults for everything but the schema path
    pub fn new(schema_path: impl Into<PathBuf>) -> Self {
        Self {
            schema_path: schema_path.into(),
            root_element: None,
            policy: EnforcementPolicy::default(),
            namespace_policy: NamespacePolicy::default(),
            limits: Limits::default(),
        }
    }

    /// Require a document element name
    pub fn with_root_element(mut self, root: impl Into<String>) -> Self {
        self.root_element = Some(root.into());
        self
    }

    /// Set the enforcement policy
    pub fn with_policy(mut self, policy: EnforcementPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the namespace policy
    pub fn with_namespace_policy(mut self, policy: NamespacePolicy) -> Self {
        self.namespace_policy = policy;
        self
    }

    /// Set the parser limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Parse a TOML configuration
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: GatewayConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML configuration file.
    ///
    /// A relative `schema_path` is resolved against the file's directory.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&content)?;
        if config.schema_path.is_relative() {
            if let Some(dir) = path.parent() {
                config.schema_path = dir.join(&config.schema_path);
            }
        }
        Ok(config)
    }

    /// Check values that deserialization alone does not catch
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.schema_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("schema_path must not be empty".to_string()));
        }
        if self.limits.max_xml_size == 0 {
            return Err(ConfigError::Invalid("limits.max_xml_size must be greater than 0".to_string()));
        }
        if self.limits.max_xml_depth == 0 {
            return Err(ConfigError::Invalid("limits.max_xml_depth must be greater than 0".to_string()));
        }
        self.root_name()?;
        Ok(())
    }

    /// The expected document element as a qualified name.
    ///
    /// A local name without braces has no namespace.
    pub fn root_name(&self) -> Result<Option<QName>, ConfigError> {
        let Some(root) = self.root_element.as_deref() else {
            return Ok(None);
        };
        let root = root.trim();
        if root.starts_with('{') {
            QName::from_clark(root)
                .map(Some)
                .ok_or_else(|| ConfigError::Invalid(format!("invalid root element '{}'", root)))
        } else if crate::names::is_valid_ncname(root) {
            Ok(Some(QName::local(root)))
        } else {
            Err(ConfigError::Invalid(format!("invalid root element '{}'", root)))
        }
    }

    /// Validation options derived from this configuration
    pub fn validation_options(&self) -> ValidationOptions {
        ValidationOptions::new().with_namespace_policy(self.namespace_policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::new("order.xsd");
        assert_eq!(config.policy, EnforcementPolicy::LogOnly);
        assert_eq!(config.namespace_policy, NamespacePolicy::Strict);
        assert_eq!(config.limits, Limits::default());
        assert_eq!(config.root_name().unwrap(), None);
    }

    #[test]
    fn test_from_toml_str() {
        let config = GatewayConfig::from_toml_str(
            r#"
            schema_path = "schemas/order.xsd"
            root_element = "{urn:orders}order"
            policy = "reject"
            namespace_policy = "lax"

            [limits]
            max_xml_size = 1024
            "#,
        )
        .unwrap();

        assert_eq!(config.schema_path, PathBuf::from("schemas/order.xsd"));
        assert_eq!(config.policy, EnforcementPolicy::Reject);
        assert_eq!(config.namespace_policy, NamespacePolicy::Lax);
        assert_eq!(config.limits.max_xml_size, 1024);
        assert_eq!(config.limits.max_xml_depth, Limits::default().max_xml_depth);
        assert_eq!(
            config.root_name().unwrap(),
            Some(QName::namespaced("urn:orders", "order"))
        );
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            GatewayConfig::from_toml_str("policy = \"reject\""),
            Err(ConfigError::Toml(_))
        ));
        assert!(matches!(
            GatewayConfig::from_toml_str("schema_path = \"a.xsd\"\npolicy = \"block\""),
            Err(ConfigError::Toml(_))
        ));
        assert!(matches!(
            GatewayConfig::from_toml_str("schema_path = \"a.xsd\"\nroot_element = \"1bad\""),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            GatewayConfig::from_toml_str("schema_path = \"a.xsd\"\n[limits]\nmax_xml_depth = 0"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_from_file_resolves_schema_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.toml");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "schema_path = \"order.xsd\"").unwrap();

        let config = GatewayConfig::from_file(&path).unwrap();
        assert_eq!(config.schema_path, dir.path().join("order.xsd"));

        let missing = GatewayConfig::from_file(dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_builders() {
        let config = GatewayConfig::new("a.xsd")
            .with_root_element("order")
            .with_policy(EnforcementPolicy::Reject)
            .with_namespace_policy(NamespacePolicy::Lax)
            .with_limits(Limits::strict());
        assert_eq!(config.root_name().unwrap(), Some(QName::local("order")));
        assert_eq!(config.validation_options().namespace_policy, NamespacePolicy::Lax);
        assert_eq!(config.limits, Limits::strict());
    }
}
