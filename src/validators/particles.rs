//! XSD Particle Schema Components
//!
//! A particle pairs a term (element declaration, model group or wildcard)
//! with its occurrence bounds.

use std::fmt;

use super::elements::ElementId;
use super::groups::GroupId;
use super::wildcards::Wildcard;

/// Occurrence bounds for a particle (minOccurs, maxOccurs)
/// None for max means unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurs {
    /// Minimum number of occurrences (default 1)
    pub min: u32,
    /// Maximum number of occurrences (None = unbounded, default 1)
    pub max: Option<u32>,
}

impl Default for Occurs {
    fn default() -> Self {
        Self::once()
    }
}

impl Occurs {
    /// Create new occurrence bounds
    pub fn new(min: u32, max: Option<u32>) -> Self {
        Self { min, max }
    }

    /// Default occurrence (1, 1)
    pub fn once() -> Self {
        Self { min: 1, max: Some(1) }
    }

    /// Optional occurrence (0, 1)
    pub fn optional() -> Self {
        Self { min: 0, max: Some(1) }
    }

    /// Zero or more (0, unbounded)
    pub fn zero_or_more() -> Self {
        Self { min: 0, max: None }
    }

    /// Parse `minOccurs` / `maxOccurs` attribute values
    pub fn parse(min: Option<&str>, max: Option<&str>) -> Result<Self, String> {
        let min_value = match min {
            Some(s) => s
                .trim()
                .parse::<u32>()
                .map_err(|_| format!("invalid minOccurs '{}'", s))?,
            None => 1,
        };
        let max_value = match max.map(str::trim) {
            Some("unbounded") => None,
            Some(s) => Some(
                s.parse::<u32>()
                    .map_err(|_| format!("invalid maxOccurs '{}'", s))?,
            ),
            None => Some(1),
        };
        if let Some(max_value) = max_value {
            if min_value > max_value {
                return Err(format!(
                    "minOccurs {} is greater than maxOccurs {}",
                    min_value, max_value
                ));
            }
        }
        Ok(Self::new(min_value, max_value))
    }

    /// Check if this particle can be empty (minOccurs == 0)
    pub fn is_emptiable(&self) -> bool {
        self.min == 0
    }

    /// Check if this particle is prohibited (maxOccurs == 0)
    pub fn is_empty(&self) -> bool {
        self.max == Some(0)
    }

    /// Check if occurrence count is under the minimum
    pub fn is_missing(&self, count: u32) -> bool {
        count < self.min
    }

    /// Check if occurrence count is at or over the maximum
    pub fn is_over(&self, count: u32) -> bool {
        match self.max {
            Some(max) => count >= max,
            None => false,
        }
    }

    /// Check if occurrence count exceeds the maximum
    pub fn is_exceeded(&self, count: u32) -> bool {
        match self.max {
            Some(max) => count > max,
            None => false,
        }
    }

    /// Multiply bounds, as when a particle is nested in a repeated group
    pub fn times(&self, other: &Occurs) -> Occurs {
        let max = match (self.max, other.max) {
            (Some(0), _) | (_, Some(0)) => Some(0),
            (Some(a), Some(b)) => Some(a.saturating_mul(b)),
            _ => None,
        };
        Occurs::new(self.min.saturating_mul(other.min), max)
    }
}

impl fmt::Display for Occurs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "{}..{}", self.min, max),
            None => write!(f, "{}..unbounded", self.min),
        }
    }
}

/// The term of a particle
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    /// An element declaration (local or a reference to a global one)
    Element(ElementId),
    /// A nested model group
    Group(GroupId),
    /// An element wildcard (`xs:any`)
    Any(Wildcard),
}

/// A term with occurrence bounds
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    /// What the particle matches
    pub term: Term,
    /// Occurrence bounds
    pub occurs: Occurs,
}

impl Particle {
    /// Create a new particle
    pub fn new(term: Term, occurs: Occurs) -> Self {
        Self { term, occurs }
    }

    /// Whether the particle is a model group
    pub fn group(&self) -> Option<GroupId> {
        match self.term {
            Term::Group(id) => Some(id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_occurs_creation() {
        let occurs = Occurs::once();
        assert_eq!(occurs.min, 1);
        assert_eq!(occurs.max, Some(1));

        let occurs = Occurs::zero_or_more();
        assert!(occurs.is_emptiable());
        assert_eq!(occurs.max, None);
    }

    #[test]
    fn test_occurs_parse() {
        assert_eq!(Occurs::parse(None, None).unwrap(), Occurs::once());
        assert_eq!(
            Occurs::parse(Some("0"), Some("unbounded")).unwrap(),
            Occurs::zero_or_more()
        );
        assert_eq!(
            Occurs::parse(Some("2"), Some("5")).unwrap(),
            Occurs::new(2, Some(5))
        );
        assert!(Occurs::parse(Some("-1"), None).is_err());
        assert!(Occurs::parse(Some("abc"), None).is_err());
        assert!(Occurs::parse(Some("3"), Some("2")).is_err());
        assert!(Occurs::parse(None, Some("0")).is_err());
    }

    #[test]
    fn test_occurs_counts() {
        let occurs = Occurs::new(1, Some(3));
        assert!(occurs.is_missing(0));
        assert!(!occurs.is_missing(1));
        assert!(occurs.is_over(3));
        assert!(!occurs.is_exceeded(3));
        assert!(occurs.is_exceeded(4));
        assert!(!Occurs::zero_or_more().is_over(u32::MAX));
    }

    #[test]
    fn test_occurs_display() {
        assert_eq!(Occurs::once().to_string(), "1..1");
        assert_eq!(Occurs::zero_or_more().to_string(), "0..unbounded");
    }

    #[test]
    fn test_occurs_times() {
        let product = Occurs::new(1, Some(2)).times(&Occurs::new(2, None));
        assert_eq!(product, Occurs::new(2, None));
        assert!(Occurs::once().times(&Occurs::new(0, Some(0))).is_empty());
    }
}
