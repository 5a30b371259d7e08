//! Validation Gateway
//!
//! A [`ValidationGateway`] owns one compiled schema and validates request
//! bodies against it. It is built once at startup and shared between request
//! handlers; the only state it holds is the schema, published once.
//!
//! ```rust,ignore
//! use xsdgate::{GatewayConfig, ValidationGateway, Verdict};
//!
//! let gateway = ValidationGateway::new(GatewayConfig::new("schemas/order.xsd"))?;
//! let inspection = gateway.inspect(body);
//! if inspection.verdict == Verdict::Reject {
//!     // answer 400 with inspection.errors
//! }
//! ```

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::GatewayConfig;
use crate::documents::Document;
use crate::error::{CompileError, InitError, OperationError};
use crate::limits::Limits;
use crate::loaders::Loader;
use crate::namespaces::QName;
use crate::validators::{validate_document, SchemaModel, ValidationError, ValidationOptions};

/// What [`ValidationGateway::inspect`] does with an invalid body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnforcementPolicy {
    /// Log the findings and let the request through
    #[default]
    LogOnly,
    /// Log the findings and reject the request
    Reject,
}

impl FromStr for EnforcementPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "log-only" => Ok(Self::LogOnly),
            "reject" => Ok(Self::Reject),
            other => Err(format!(
                "invalid enforcement policy '{}', must be 'log-only' or 'reject'",
                other
            )),
        }
    }
}

impl fmt::Display for EnforcementPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LogOnly => write!(f, "log-only"),
            Self::Reject => write!(f, "reject"),
        }
    }
}

/// Outcome of an inspection under the configured policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// Hand the request to the next handler
    Pass,
    /// Answer the request with a client error
    Reject,
}

/// Result of [`ValidationGateway::inspect`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Inspection {
    /// Pass or reject
    pub verdict: Verdict,
    /// Validation findings, in document order
    pub errors: Vec<ValidationError>,
    /// Set when validation could not run
    #[serde(serialize_with = "serialize_failure")]
    pub failure: Option<OperationError>,
}

impl Inspection {
    /// Whether the body conformed to the schema
    pub fn is_valid(&self) -> bool {
        self.failure.is_none() && self.errors.is_empty()
    }
}

fn serialize_failure<S: serde::Serializer>(
    failure: &Option<OperationError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match failure {
        Some(failure) => serializer.serialize_some(&failure.to_string()),
        None => serializer.serialize_none(),
    }
}

/// Validates request bodies against one compiled schema
#[derive(Debug)]
pub struct ValidationGateway {
    schema: OnceCell<Arc<SchemaModel>>,
    root: Option<QName>,
    options: ValidationOptions,
    policy: EnforcementPolicy,
    limits: Limits,
}

impl ValidationGateway {
    /// Read and compile the configured schema.
    ///
    /// Fails with [`InitError::Io`] when the file cannot be read and
    /// [`InitError::Compile`] when it is not a valid schema.
    pub fn new(config: GatewayConfig) -> Result<Self, InitError> {
        let gateway = Self::pending(&config)?;
        gateway.load(&config.schema_path)?;
        Ok(gateway)
    }

    /// A gateway whose schema is installed later with [`install`](Self::install)
    /// or [`load`](Self::load)
    pub fn pending(config: &GatewayConfig) -> Result<Self, InitError> {
        config.validate()?;
        Ok(Self {
            schema: OnceCell::new(),
            root: config.root_name()?,
            options: config.validation_options(),
            policy: config.policy,
            limits: config.limits,
        })
    }

    /// A gateway over an already compiled schema
    pub fn with_schema(schema: Arc<SchemaModel>, config: &GatewayConfig) -> Result<Self, InitError> {
        let gateway = Self::pending(config)?;
        gateway.install(schema)?;
        Ok(gateway)
    }

    /// Publish the schema. Only the first installation succeeds.
    pub fn install(&self, schema: Arc<SchemaModel>) -> Result<(), InitError> {
        self.schema.set(schema).map_err(|_| InitError::AlreadyInstalled)
    }

    /// Compile a schema file and install it
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Arc<SchemaModel>, InitError> {
        let path = path.as_ref();
        if self.is_ready() {
            return Err(InitError::AlreadyInstalled);
        }

        let loader = Loader::new().with_limits(self.limits);
        let schema = match SchemaModel::from_file_with_loader(path, loader) {
            Ok(schema) => Arc::new(schema),
            Err(CompileError::Resource(e)) => {
                error!(file = %path.display(), error = %e, "load xsd file failed");
                return Err(InitError::Io(e));
            }
            Err(e) => {
                error!(file = %path.display(), error = %e, "compile xsd file failed");
                return Err(InitError::Compile {
                    path: PathBuf::from(path),
                    source: e,
                });
            }
        };

        self.install(Arc::clone(&schema))?;
        info!(
            file = %path.display(),
            target_namespace = schema.target_namespace().unwrap_or(""),
            elements = schema.global_elements().count(),
            "load xsd file done"
        );
        Ok(schema)
    }

    /// The installed schema
    pub fn schema(&self) -> Option<&Arc<SchemaModel>> {
        self.schema.get()
    }

    /// Whether a schema is installed
    pub fn is_ready(&self) -> bool {
        self.schema.get().is_some()
    }

    /// The configured enforcement policy
    pub fn policy(&self) -> EnforcementPolicy {
        self.policy
    }

    /// Validate a request body.
    ///
    /// An empty list means the body conforms. Malformed XML is an
    /// [`OperationError::Parse`], never a validation error.
    pub fn validate(&self, body: &[u8]) -> Result<Vec<ValidationError>, OperationError> {
        let schema = self.schema.get().ok_or(OperationError::NotReady)?;
        let document = Document::parse_with_limits(body, &self.limits)?;

        let start = Instant::now();
        let errors = validate_document(&document, schema, self.root.as_ref(), &self.options);
        debug!(
            bytes = body.len(),
            errors = errors.len(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "validated request body"
        );
        Ok(errors)
    }

    /// Validate a request body, log the findings and apply the policy
    pub fn inspect(&self, body: &[u8]) -> Inspection {
        let (errors, failure) = match self.validate(body) {
            Ok(errors) => {
                for e in &errors {
                    warn!(error = %e, "validate xml return error");
                }
                (errors, None)
            }
            Err(e @ OperationError::Parse(_)) => {
                error!(error = %e, "parse xml failed");
                (Vec::new(), Some(e))
            }
            Err(e) => {
                error!(error = %e, "xml validation unavailable");
                (Vec::new(), Some(e))
            }
        };

        let verdict = match self.policy {
            EnforcementPolicy::Reject if failure.is_some() || !errors.is_empty() => Verdict::Reject,
            _ => Verdict::Pass,
        };
        Inspection {
            verdict,
            errors,
            failure,
        }
    }
}
