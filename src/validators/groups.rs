//! XSD Model Groups
//!
//! Model groups (`xs:sequence`, `xs:choice`, `xs:all`) live in the schema's
//! group arena and are referred to by [`GroupId`]; named groups
//! (`xs:group name=...`) are ordinary arena entries with a name.

use std::fmt;

use crate::namespaces::QName;

use super::particles::Particle;

/// Index of a model group in the schema's group arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(pub(crate) usize);

/// Model group compositor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compositor {
    /// Particles in declared order
    #[default]
    Sequence,
    /// Exactly one of the particles
    Choice,
    /// Particles in any order
    All,
}

impl Compositor {
    /// Map an XSD element local name to a compositor
    pub fn from_local_name(name: &str) -> Option<Self> {
        match name {
            "sequence" => Some(Self::Sequence),
            "choice" => Some(Self::Choice),
            "all" => Some(Self::All),
            _ => None,
        }
    }
}

impl fmt::Display for Compositor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequence => write!(f, "sequence"),
            Self::Choice => write!(f, "choice"),
            Self::All => write!(f, "all"),
        }
    }
}

/// A compiled model group
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelGroup {
    /// Name, for global `xs:group` definitions
    pub name: Option<QName>,
    /// How the particles combine
    pub compositor: Compositor,
    /// Member particles in declaration order
    pub particles: Vec<Particle>,
}

impl ModelGroup {
    /// Create an anonymous group
    pub fn new(compositor: Compositor, particles: Vec<Particle>) -> Self {
        Self {
            name: None,
            compositor,
            particles,
        }
    }

    /// An empty sequence
    pub fn empty() -> Self {
        Self::default()
    }

    /// Set the name
    pub fn with_name(mut self, name: QName) -> Self {
        self.name = Some(name);
        self
    }

    /// Whether the group has no particles
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::particles::{Occurs, Term};
    use crate::validators::wildcards::Wildcard;

    #[test]
    fn test_compositor_names() {
        assert_eq!(Compositor::from_local_name("sequence"), Some(Compositor::Sequence));
        assert_eq!(Compositor::from_local_name("choice"), Some(Compositor::Choice));
        assert_eq!(Compositor::from_local_name("all"), Some(Compositor::All));
        assert_eq!(Compositor::from_local_name("group"), None);
        assert_eq!(Compositor::Choice.to_string(), "choice");
    }

    #[test]
    fn test_model_group() {
        let group = ModelGroup::new(
            Compositor::Choice,
            vec![Particle::new(Term::Any(Wildcard::any_lax()), Occurs::once())],
        )
        .with_name(QName::local("g"));

        assert!(!group.is_empty());
        assert_eq!(group.name, Some(QName::local("g")));
        assert!(ModelGroup::empty().is_empty());
    }
}
