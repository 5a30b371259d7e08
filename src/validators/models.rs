//! XSD Content Model Validators
//!
//! [`ModelVisitor`] matches the child elements of one element, in document
//! order, against a content particle. It keeps a stack of group frames so
//! that each child is matched from the state the previous child left behind:
//!
//! - a sequence consumes its particles in declared order, each between its
//!   minOccurs and maxOccurs times;
//! - a choice commits to the first alternative that can start with the child;
//! - an all group accepts its particles in any order, each at most once.
//!
//! Matching is greedy and never backtracks. A child that fits nowhere is
//! reported and skipped, leaving the state untouched, so later children are
//! still matched. A child whose particle already reached maxOccurs is still
//! assigned to that particle's declaration, with an overflow violation.

use std::fmt;

use crate::namespaces::QName;

use super::elements::ElementId;
use super::groups::Compositor;
use super::particles::{Occurs, Particle, Term};
use super::schemas::SchemaModel;
use super::wildcards::Wildcard;

/// Declaration a child element was matched to
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChildMatch<'s> {
    /// An element declaration (possibly a substitution group member)
    Element(ElementId),
    /// An element wildcard
    Wildcard(&'s Wildcard),
}

/// A content model violation found while matching children
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelViolation {
    /// The child fits no particle at the current position
    Unexpected {
        /// What could have come next
        expected: Vec<String>,
    },
    /// The child's particle already reached maxOccurs
    Overflow {
        /// The particle, for messages
        particle: String,
        /// Occurrences including this one
        count: u32,
        /// Allowed range
        occurs: Occurs,
    },
    /// A required particle was skipped or never reached
    Missing {
        /// What the particle could have started with
        expected: Vec<String>,
    },
}

impl fmt::Display for ModelViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unexpected { expected } if expected.is_empty() => {
                write!(f, "unexpected child element, no more elements are allowed here")
            }
            Self::Unexpected { expected } => {
                write!(f, "unexpected child element, expected one of: {}", expected.join(", "))
            }
            Self::Overflow {
                particle,
                count,
                occurs,
            } => write!(
                f,
                "{} occurs {} times, allowed {} (minOccurs..maxOccurs)",
                particle, count, occurs
            ),
            Self::Missing { expected } => {
                write!(f, "missing required content, expected one of: {}", expected.join(", "))
            }
        }
    }
}

/// Result of feeding one child to the visitor
#[derive(Debug, Clone, PartialEq)]
pub struct Advance<'s> {
    /// Where the child matched, if anywhere
    pub matched: Option<ChildMatch<'s>>,
    /// Violations detected at this child, in the order they apply
    pub violations: Vec<ModelViolation>,
}

/// Position within one model group
#[derive(Debug, Clone)]
struct Frame<'s> {
    compositor: Compositor,
    particles: &'s [Particle],
    /// Current particle (the chosen alternative, for a choice)
    index: usize,
    /// Occurrences per particle in the current iteration of the group
    counts: Vec<u32>,
}

impl<'s> Frame<'s> {
    fn new(compositor: Compositor, particles: &'s [Particle]) -> Self {
        Self {
            compositor,
            particles,
            index: 0,
            counts: vec![0; particles.len()],
        }
    }

    fn started(&self) -> bool {
        self.counts.iter().any(|&c| c > 0)
    }
}

/// Outcome of trying a child in the top frame
enum Step<'s> {
    Matched(ChildMatch<'s>),
    Descend(Frame<'s>),
    Exhausted,
}

/// Model visitor for validating element children against a content particle
#[derive(Debug, Clone)]
pub struct ModelVisitor<'s> {
    schema: &'s SchemaModel,
    stack: Vec<Frame<'s>>,
}

impl<'s> ModelVisitor<'s> {
    /// Create a visitor positioned before the first child
    pub fn new(schema: &'s SchemaModel, root: &'s Particle) -> Self {
        Self {
            schema,
            stack: vec![Frame::new(Compositor::Sequence, std::slice::from_ref(root))],
        }
    }

    /// Match the next child element
    pub fn advance(&mut self, name: &QName) -> Advance<'s> {
        let snapshot = self.stack.clone();
        let mut missing = Vec::new();

        loop {
            let schema = self.schema;
            let Some(frame) = self.stack.last_mut() else {
                break;
            };
            match step(schema, frame, name, &mut missing) {
                Step::Matched(matched) => {
                    return Advance {
                        matched: Some(matched),
                        violations: missing
                            .into_iter()
                            .map(|expected| ModelViolation::Missing { expected })
                            .collect(),
                    }
                }
                Step::Descend(frame) => self.stack.push(frame),
                Step::Exhausted if self.stack.len() > 1 => {
                    if let Some(done) = self.stack.pop() {
                        frame_missing(schema, &done, &mut missing);
                    }
                }
                Step::Exhausted => break,
            }
        }

        self.stack = snapshot;
        if let Some(advance) = self.overflow(name) {
            return advance;
        }
        Advance {
            matched: None,
            violations: vec![ModelViolation::Unexpected {
                expected: self.expected(),
            }],
        }
    }

    /// Close the model after the last child; returns required content never seen
    pub fn stop(&mut self) -> Vec<ModelViolation> {
        let mut missing = Vec::new();
        while let Some(frame) = self.stack.pop() {
            frame_missing(self.schema, &frame, &mut missing);
        }
        missing
            .into_iter()
            .map(|expected| ModelViolation::Missing { expected })
            .collect()
    }

    /// Whether the model could end here without violations
    pub fn is_stoppable(&self) -> bool {
        let mut missing = Vec::new();
        for frame in &self.stack {
            frame_missing(self.schema, frame, &mut missing);
        }
        missing.is_empty()
    }

    /// Elements and wildcards that may come next
    pub fn expected(&self) -> Vec<String> {
        let mut names = Vec::new();
        for frame in self.stack.iter().rev() {
            if !frame_expected(self.schema, frame, &mut names) {
                break;
            }
        }
        dedup(names)
    }

    /// Assign a child to an element particle that already reached maxOccurs
    fn overflow(&mut self, name: &QName) -> Option<Advance<'s>> {
        let schema = self.schema;
        for frame in self.stack.iter_mut().rev() {
            let candidates: Vec<usize> = match frame.compositor {
                Compositor::Sequence => (0..=frame.index.min(frame.particles.len().saturating_sub(1)))
                    .rev()
                    .collect(),
                Compositor::Choice => vec![frame.index],
                Compositor::All => (0..frame.particles.len()).collect(),
            };
            for index in candidates {
                let Some(particle) = frame.particles.get(index) else {
                    continue;
                };
                let Term::Element(id) = particle.term else {
                    continue;
                };
                let count = frame.counts[index];
                if count == 0 || !particle.occurs.is_over(count) {
                    continue;
                }
                if let Some(matched) = match_element(schema, id, name) {
                    frame.counts[index] += 1;
                    return Some(Advance {
                        matched: Some(ChildMatch::Element(matched)),
                        violations: vec![ModelViolation::Overflow {
                            particle: schema.element(id).name.to_string(),
                            count: count + 1,
                            occurs: particle.occurs,
                        }],
                    });
                }
            }
        }
        None
    }
}

// =============================================================================
// Frame stepping
// =============================================================================

fn step<'s>(schema: &'s SchemaModel, frame: &mut Frame<'s>, name: &QName, missing: &mut Vec<Vec<String>>) -> Step<'s> {
    match frame.compositor {
        Compositor::Sequence => step_sequence(schema, frame, name, missing),
        Compositor::Choice => {
            if !frame.started() {
                let chosen = frame
                    .particles
                    .iter()
                    .position(|p| !p.occurs.is_empty() && first_matches(schema, p, name));
                return match chosen {
                    Some(index) => take(schema, frame, index, name),
                    None => Step::Exhausted,
                };
            }
            let index = frame.index;
            let particle = &frame.particles[index];
            if !particle.occurs.is_over(frame.counts[index]) && first_matches(schema, particle, name) {
                take(schema, frame, index, name)
            } else {
                Step::Exhausted
            }
        }
        Compositor::All => {
            let found = frame
                .particles
                .iter()
                .zip(&frame.counts)
                .position(|(p, &count)| !p.occurs.is_over(count) && first_matches(schema, p, name));
            match found {
                Some(index) => take(schema, frame, index, name),
                None => Step::Exhausted,
            }
        }
    }
}

fn step_sequence<'s>(
    schema: &'s SchemaModel,
    frame: &mut Frame<'s>,
    name: &QName,
    missing: &mut Vec<Vec<String>>,
) -> Step<'s> {
    let len = frame.particles.len();
    let mut index = frame.index;

    while index < len {
        let particle = &frame.particles[index];
        let count = frame.counts[index];
        if !particle.occurs.is_over(count) && first_matches(schema, particle, name) {
            return take(schema, frame, index, name);
        }

        if particle.occurs.is_missing(count) && !is_emptiable(schema, particle) {
            // A later particle may accept the child; report what was skipped
            let later = (index + 1..len).find(|&j| {
                let p = &frame.particles[j];
                !p.occurs.is_over(frame.counts[j]) && first_matches(schema, p, name)
            });
            let Some(later) = later else {
                return Step::Exhausted;
            };
            for skipped in index..later {
                let p = &frame.particles[skipped];
                if p.occurs.is_missing(frame.counts[skipped]) && !is_emptiable(schema, p) {
                    missing.push(first_set(schema, p));
                }
            }
            return take(schema, frame, later, name);
        }
        index += 1;
    }
    Step::Exhausted
}

/// Count one occurrence of particle `index` and enter its term
fn take<'s>(schema: &'s SchemaModel, frame: &mut Frame<'s>, index: usize, name: &QName) -> Step<'s> {
    frame.index = index;
    frame.counts[index] += 1;
    let particles = frame.particles;
    match &particles[index].term {
        Term::Element(id) => match match_element(schema, *id, name) {
            Some(matched) => Step::Matched(ChildMatch::Element(matched)),
            None => Step::Exhausted,
        },
        Term::Any(wildcard) => Step::Matched(ChildMatch::Wildcard(wildcard)),
        Term::Group(group) => {
            let group = schema.group(*group);
            Step::Descend(Frame::new(group.compositor, &group.particles))
        }
    }
}

// =============================================================================
// Particle properties
// =============================================================================

/// Declaration matching `name`: the element itself or a substitution group member
fn match_element(schema: &SchemaModel, id: ElementId, name: &QName) -> Option<ElementId> {
    if schema.element(id).name == *name {
        return Some(id);
    }
    schema
        .substitutes(id)
        .iter()
        .copied()
        .find(|member| schema.element(*member).name == *name)
}

/// Whether the particle can start with an element named `name`
fn first_matches(schema: &SchemaModel, particle: &Particle, name: &QName) -> bool {
    if particle.occurs.is_empty() {
        return false;
    }
    match &particle.term {
        Term::Element(id) => match_element(schema, *id, name).is_some(),
        Term::Any(wildcard) => wildcard.allows(name.namespace()),
        Term::Group(group) => {
            let group = schema.group(*group);
            match group.compositor {
                Compositor::Sequence => {
                    for p in &group.particles {
                        if first_matches(schema, p, name) {
                            return true;
                        }
                        if !is_emptiable(schema, p) {
                            return false;
                        }
                    }
                    false
                }
                Compositor::Choice | Compositor::All => {
                    group.particles.iter().any(|p| first_matches(schema, p, name))
                }
            }
        }
    }
}

/// Whether the particle can match no elements at all
fn is_emptiable(schema: &SchemaModel, particle: &Particle) -> bool {
    if particle.occurs.is_emptiable() {
        return true;
    }
    match &particle.term {
        Term::Element(_) | Term::Any(_) => false,
        Term::Group(group) => {
            let group = schema.group(*group);
            match group.compositor {
                Compositor::Sequence | Compositor::All => {
                    group.particles.iter().all(|p| is_emptiable(schema, p))
                }
                Compositor::Choice => {
                    group.particles.is_empty() || group.particles.iter().any(|p| is_emptiable(schema, p))
                }
            }
        }
    }
}

/// Names the particle can start with, for messages
fn first_set(schema: &SchemaModel, particle: &Particle) -> Vec<String> {
    let mut names = Vec::new();
    collect_first(schema, particle, &mut names);
    dedup(names)
}

fn collect_first(schema: &SchemaModel, particle: &Particle, names: &mut Vec<String>) {
    if particle.occurs.is_empty() {
        return;
    }
    match &particle.term {
        Term::Element(id) => {
            let decl = schema.element(*id);
            if !decl.is_abstract {
                names.push(decl.name.to_string());
            }
            for member in schema.substitutes(*id) {
                let member = schema.element(*member);
                if !member.is_abstract {
                    names.push(member.name.to_string());
                }
            }
        }
        Term::Any(wildcard) => names.push(wildcard.to_string()),
        Term::Group(group) => {
            let group = schema.group(*group);
            for p in &group.particles {
                collect_first(schema, p, names);
                if group.compositor == Compositor::Sequence && !is_emptiable(schema, p) {
                    break;
                }
            }
        }
    }
}

/// Collect what may come next in `frame`; false when the frame cannot end yet
fn frame_expected(schema: &SchemaModel, frame: &Frame<'_>, names: &mut Vec<String>) -> bool {
    match frame.compositor {
        Compositor::Sequence => {
            for index in frame.index..frame.particles.len() {
                let particle = &frame.particles[index];
                let count = frame.counts[index];
                if !particle.occurs.is_over(count) {
                    collect_first(schema, particle, names);
                }
                if particle.occurs.is_missing(count) && !is_emptiable(schema, particle) {
                    return false;
                }
            }
            true
        }
        Compositor::Choice => {
            let Some(particle) = frame.particles.get(frame.index) else {
                return true;
            };
            let count = frame.counts[frame.index];
            if !particle.occurs.is_over(count) {
                collect_first(schema, particle, names);
            }
            !(particle.occurs.is_missing(count) && !is_emptiable(schema, particle))
        }
        Compositor::All => {
            let mut complete = true;
            for (particle, &count) in frame.particles.iter().zip(&frame.counts) {
                if !particle.occurs.is_over(count) {
                    collect_first(schema, particle, names);
                }
                if particle.occurs.is_missing(count) && !is_emptiable(schema, particle) {
                    complete = false;
                }
            }
            complete
        }
    }
}

/// Required particles of `frame` that were not satisfied
fn frame_missing(schema: &SchemaModel, frame: &Frame<'_>, missing: &mut Vec<Vec<String>>) {
    let range = match frame.compositor {
        Compositor::Sequence => frame.index..frame.particles.len(),
        Compositor::Choice => frame.index..(frame.index + 1).min(frame.particles.len()),
        Compositor::All => 0..frame.particles.len(),
    };
    for index in range {
        let particle = &frame.particles[index];
        if particle.occurs.is_missing(frame.counts[index]) && !is_emptiable(schema, particle) {
            missing.push(first_set(schema, particle));
        }
    }
}

fn dedup(names: Vec<String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        if !unique.contains(&name) {
            unique.push(name);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODELS: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
        <xs:complexType name="seq">
            <xs:sequence>
                <xs:element name="a"/>
                <xs:element name="b" minOccurs="0" maxOccurs="2"/>
                <xs:element name="c"/>
            </xs:sequence>
        </xs:complexType>
        <xs:complexType name="triple">
            <xs:sequence>
                <xs:element name="a"/>
                <xs:element name="b"/>
                <xs:element name="c"/>
            </xs:sequence>
        </xs:complexType>
        <xs:complexType name="choice">
            <xs:choice maxOccurs="unbounded">
                <xs:element name="x"/>
                <xs:sequence>
                    <xs:element name="y"/>
                    <xs:element name="z"/>
                </xs:sequence>
            </xs:choice>
        </xs:complexType>
        <xs:complexType name="all">
            <xs:all>
                <xs:element name="p"/>
                <xs:element name="q" minOccurs="0"/>
            </xs:all>
        </xs:complexType>
        <xs:complexType name="open">
            <xs:sequence>
                <xs:element name="head"/>
                <xs:any namespace='##other' processContents="lax" minOccurs="0" maxOccurs="unbounded"/>
            </xs:sequence>
        </xs:complexType>
        <xs:element name="shape" abstract="true"/>
        <xs:element name="circle" substitutionGroup="shape"/>
        <xs:complexType name="drawing">
            <xs:sequence>
                <xs:element ref="shape" maxOccurs="unbounded"/>
            </xs:sequence>
        </xs:complexType>
    </xs:schema>"#;

    fn schema() -> SchemaModel {
        SchemaModel::compile(MODELS.as_bytes()).unwrap()
    }

    fn root<'s>(schema: &'s SchemaModel, type_name: &str) -> &'s Particle {
        let id = schema.get_type(&QName::local(type_name)).unwrap();
        schema.complex_type(id).unwrap().content.particle().unwrap()
    }

    /// Feed names; collect every violation, end-of-content included
    fn run(schema: &SchemaModel, type_name: &str, children: &[&str]) -> Vec<ModelViolation> {
        let mut visitor = ModelVisitor::new(schema, root(schema, type_name));
        let mut violations = Vec::new();
        for child in children {
            violations.extend(visitor.advance(&QName::from_clark(child).unwrap()).violations);
        }
        violations.extend(visitor.stop());
        violations
    }

    #[test]
    fn test_sequence_valid() {
        let schema = schema();
        assert!(run(&schema, "seq", &["a", "c"]).is_empty());
        assert!(run(&schema, "seq", &["a", "b", "b", "c"]).is_empty());
    }

    #[test]
    fn test_sequence_missing_at_end() {
        let schema = schema();
        let violations = run(&schema, "seq", &["a"]);
        assert_eq!(
            violations,
            vec![ModelViolation::Missing {
                expected: vec!["c".to_string()]
            }]
        );
    }

    #[test]
    fn test_sequence_skipped_required() {
        let schema = schema();
        // "b" is skipped; "c" still matches
        let violations = run(&schema, "triple", &["a", "c"]);
        assert_eq!(
            violations,
            vec![ModelViolation::Missing {
                expected: vec!["b".to_string()]
            }]
        );
    }

    #[test]
    fn test_sequence_overflow() {
        let schema = schema();
        let mut visitor = ModelVisitor::new(&schema, root(&schema, "seq"));
        for name in ["a", "b", "b"] {
            assert!(visitor.advance(&QName::local(name)).violations.is_empty());
        }
        let advance = visitor.advance(&QName::local("b"));
        assert!(matches!(advance.matched, Some(ChildMatch::Element(_))));
        assert_eq!(
            advance.violations,
            vec![ModelViolation::Overflow {
                particle: "b".to_string(),
                count: 3,
                occurs: Occurs::new(0, Some(2)),
            }]
        );
        assert!(advance.violations[0].to_string().contains("occurs 3 times, allowed 0..2"));
    }

    #[test]
    fn test_unexpected_child_keeps_state() {
        let schema = schema();
        let mut visitor = ModelVisitor::new(&schema, root(&schema, "seq"));
        visitor.advance(&QName::local("a"));

        let advance = visitor.advance(&QName::local("zzz"));
        assert_eq!(advance.matched, None);
        assert_eq!(
            advance.violations,
            vec![ModelViolation::Unexpected {
                expected: vec!["b".to_string(), "c".to_string()]
            }]
        );

        assert!(visitor.advance(&QName::local("c")).violations.is_empty());
        assert!(visitor.is_stoppable());
        assert!(visitor.stop().is_empty());
    }

    #[test]
    fn test_choice() {
        let schema = schema();
        assert!(run(&schema, "choice", &["x", "y", "z", "x"]).is_empty());

        let violations = run(&schema, "choice", &["y", "x"]);
        assert_eq!(
            violations,
            vec![ModelViolation::Missing {
                expected: vec!["z".to_string()]
            }]
        );
    }

    #[test]
    fn test_all_group() {
        let schema = schema();
        assert!(run(&schema, "all", &["q", "p"]).is_empty());
        assert!(run(&schema, "all", &["p"]).is_empty());

        let violations = run(&schema, "all", &["q"]);
        assert_eq!(
            violations,
            vec![ModelViolation::Missing {
                expected: vec!["p".to_string()]
            }]
        );

        let violations = run(&schema, "all", &["p", "p"]);
        assert!(matches!(violations[..], [ModelViolation::Overflow { count: 2, .. }]));
    }

    #[test]
    fn test_wildcard() {
        let schema = schema();
        let mut visitor = ModelVisitor::new(&schema, root(&schema, "open"));
        visitor.advance(&QName::local("head"));

        let advance = visitor.advance(&QName::namespaced("urn:ext", "note"));
        assert!(matches!(advance.matched, Some(ChildMatch::Wildcard(_))));

        // ##other excludes unqualified names
        let advance = visitor.advance(&QName::local("note"));
        assert_eq!(advance.matched, None);
    }

    #[test]
    fn test_substitution_group() {
        let schema = schema();
        let circle = schema.get_element(&QName::local("circle")).unwrap();
        let mut visitor = ModelVisitor::new(&schema, root(&schema, "drawing"));

        let advance = visitor.advance(&QName::local("circle"));
        assert_eq!(advance.matched, Some(ChildMatch::Element(circle)));

        // the abstract head is matched too; the validator rejects it
        let advance = visitor.advance(&QName::local("shape"));
        assert!(advance.violations.is_empty());

        let fresh = ModelVisitor::new(&schema, root(&schema, "drawing"));
        assert_eq!(fresh.expected(), vec!["circle".to_string()]);
    }
}
