//! Limits and constraints for XML processing
//!
//! Request bodies are untrusted input. These limits bound the size and shape
//! of a parsed document so that a single request cannot exhaust memory or
//! stack.

use serde::Deserialize;

use crate::error::{ParseError, ParseErrorKind};

/// Resource limits applied by the document parser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Maximum XML input size in bytes
    pub max_xml_size: usize,

    /// Maximum element nesting depth
    pub max_xml_depth: usize,

    /// Maximum number of attributes per element (namespace declarations included)
    pub max_attributes: usize,

    /// Maximum nesting of schema includes/imports
    pub max_schema_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_xml_size: 10 * 1024 * 1024, // 10 MB
            max_xml_depth: 256,
            max_attributes: 256,
            max_schema_depth: 50,
        }
    }
}

impl Limits {
    /// Create a new Limits with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create strict limits (more restrictive)
    pub fn strict() -> Self {
        Self {
            max_xml_size: 1024 * 1024, // 1 MB
            max_xml_depth: 64,
            max_attributes: 64,
            max_schema_depth: 20,
        }
    }

    /// Create permissive limits (less restrictive, use with caution)
    pub fn permissive() -> Self {
        Self {
            max_xml_size: 1024 * 1024 * 1024, // 1 GB
            max_xml_depth: 4096,
            max_attributes: 10000,
            max_schema_depth: 1000,
        }
    }

    /// Set the maximum input size
    pub fn with_max_xml_size(mut self, size: usize) -> Self {
        self.max_xml_size = size;
        self
    }

    /// Set the maximum element depth
    pub fn with_max_xml_depth(mut self, depth: usize) -> Self {
        self.max_xml_depth = depth;
        self
    }

    /// Set the maximum number of attributes per element
    pub fn with_max_attributes(mut self, count: usize) -> Self {
        self.max_attributes = count;
        self
    }

    /// Check if XML size is within limits
    pub fn check_xml_size(&self, size: usize) -> Result<(), ParseError> {
        if size > self.max_xml_size {
            Err(ParseError::new(ParseErrorKind::LimitExceeded(format!(
                "XML size {} bytes exceeds maximum {} bytes",
                size, self.max_xml_size
            ))))
        } else {
            Ok(())
        }
    }

    /// Check if XML depth is within limits
    pub fn check_xml_depth(&self, depth: usize) -> Result<(), ParseError> {
        if depth > self.max_xml_depth {
            Err(ParseError::new(ParseErrorKind::LimitExceeded(format!(
                "XML depth {} exceeds maximum {}",
                depth, self.max_xml_depth
            ))))
        } else {
            Ok(())
        }
    }

    /// Check if number of attributes is within limits
    pub fn check_attributes(&self, count: usize) -> Result<(), ParseError> {
        if count > self.max_attributes {
            Err(ParseError::new(ParseErrorKind::LimitExceeded(format!(
                "attribute count {} exceeds maximum {}",
                count, self.max_attributes
            ))))
        } else {
            Ok(())
        }
    }
}
