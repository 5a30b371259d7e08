//! XSD constraining facets
//!
//! A [`FacetSet`] holds the effective facets of a simple type after all
//! restriction steps have been folded in. Enumeration and range values are
//! stored already parsed into the base type's value space.

use regex::Regex;
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use crate::names::{NAME_EXTRA_RANGES, NAME_START_RANGES};
use crate::validators::builtins::{
    XsdValue, XSD_ENUMERATION, XSD_FRACTION_DIGITS, XSD_LENGTH, XSD_MAX_EXCLUSIVE,
    XSD_MAX_INCLUSIVE, XSD_MAX_LENGTH, XSD_MIN_EXCLUSIVE, XSD_MIN_INCLUSIVE, XSD_MIN_LENGTH,
    XSD_PATTERN, XSD_TOTAL_DIGITS,
};

/// White space handling modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WhiteSpace {
    /// Preserve all white space
    Preserve,
    /// Replace tabs and newlines with spaces
    Replace,
    /// Replace and collapse multiple spaces
    Collapse,
}

impl FromStr for WhiteSpace {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "preserve" => Ok(WhiteSpace::Preserve),
            "replace" => Ok(WhiteSpace::Replace),
            "collapse" => Ok(WhiteSpace::Collapse),
            _ => Err("must be 'preserve', 'replace' or 'collapse'".to_string()),
        }
    }
}

impl WhiteSpace {
    /// Normalize a string according to this white space mode
    pub fn normalize<'a>(&self, s: &'a str) -> Cow<'a, str> {
        match self {
            WhiteSpace::Preserve => Cow::Borrowed(s),
            WhiteSpace::Replace => {
                if s.contains(['\t', '\n', '\r']) {
                    Cow::Owned(s.replace(['\t', '\n', '\r'], " "))
                } else {
                    Cow::Borrowed(s)
                }
            }
            WhiteSpace::Collapse => {
                let collapsed = s
                    .split(|c| matches!(c, ' ' | '\t' | '\n' | '\r'))
                    .filter(|part| !part.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ");
                if collapsed == s {
                    Cow::Borrowed(s)
                } else {
                    Cow::Owned(collapsed)
                }
            }
        }
    }

    /// Facet keyword
    pub fn as_str(&self) -> &'static str {
        match self {
            WhiteSpace::Preserve => "preserve",
            WhiteSpace::Replace => "replace",
            WhiteSpace::Collapse => "collapse",
        }
    }
}

impl fmt::Display for WhiteSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value that failed one facet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetFailure {
    /// Facet name (`maxLength`, `pattern`, ... or `datatype`)
    pub facet: String,
    /// What the facet requires
    pub expected: String,
    /// What was observed
    pub actual: String,
    /// Why the datatype rejected the value, when known
    pub reason: Option<String>,
}

impl FacetFailure {
    /// Create a new failure record
    pub fn new(
        facet: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self {
            facet: facet.into(),
            expected: expected.into(),
            actual: actual.into(),
            reason: None,
        }
    }

    /// Attach the reason a datatype rejected the value
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// The pattern facets of one derivation step (alternatives ORed)
#[derive(Debug, Clone)]
pub struct PatternFacet {
    /// Patterns as written in the schema
    pub sources: Vec<String>,
    /// Compiled, anchored regex
    regex: Regex,
}

impl PatternFacet {
    /// Compile the patterns of one restriction step
    pub fn new(sources: Vec<String>) -> Result<Self, String> {
        let mut alternatives = Vec::with_capacity(sources.len());
        for source in &sources {
            alternatives.push(format!("(?:{})", translate_pattern(source)?));
        }
        let anchored = format!(r"\A(?:{})\z", alternatives.join("|"));
        let regex = Regex::new(&anchored).map_err(|e| e.to_string())?;
        Ok(Self { sources, regex })
    }

    /// Whether the whole literal matches
    pub fn is_match(&self, literal: &str) -> bool {
        self.regex.is_match(literal)
    }

    /// Patterns joined for messages
    pub fn description(&self) -> String {
        self.sources.join(" | ")
    }
}

/// Enumeration facet restricts values to a specific set
#[derive(Debug, Clone, PartialEq)]
pub struct EnumerationFacet {
    /// Literals as written in the schema
    pub literals: Vec<String>,
    /// Parsed values
    pub values: Vec<XsdValue>,
}

impl EnumerationFacet {
    /// Whether the value is one of the enumerated values
    pub fn contains(&self, value: &XsdValue) -> bool {
        self.values.iter().any(|v| v.same_value(value))
    }
}

/// A range facet value (min/max inclusive/exclusive)
#[derive(Debug, Clone, PartialEq)]
pub struct BoundFacet {
    /// Literal as written in the schema
    pub literal: String,
    /// Parsed value
    pub value: XsdValue,
}

impl BoundFacet {
    /// Create a bound from its literal and parsed value
    pub fn new(literal: impl Into<String>, value: XsdValue) -> Self {
        Self {
            literal: literal.into(),
            value,
        }
    }
}

/// Effective facets of a simple type
#[derive(Debug, Clone, Default)]
pub struct FacetSet {
    /// whiteSpace, when restricted beyond the base
    pub white_space: Option<WhiteSpace>,
    /// length
    pub length: Option<usize>,
    /// minLength
    pub min_length: Option<usize>,
    /// maxLength
    pub max_length: Option<usize>,
    /// pattern, one entry per derivation step; all must match
    pub patterns: Vec<PatternFacet>,
    /// enumeration
    pub enumeration: Option<EnumerationFacet>,
    /// minInclusive
    pub min_inclusive: Option<BoundFacet>,
    /// minExclusive
    pub min_exclusive: Option<BoundFacet>,
    /// maxInclusive
    pub max_inclusive: Option<BoundFacet>,
    /// maxExclusive
    pub max_exclusive: Option<BoundFacet>,
    /// totalDigits
    pub total_digits: Option<u32>,
    /// fractionDigits
    pub fraction_digits: Option<u32>,
}

impl FacetSet {
    /// Create an empty facet set
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no facet is set
    pub fn is_empty(&self) -> bool {
        self.white_space.is_none()
            && self.length.is_none()
            && self.min_length.is_none()
            && self.max_length.is_none()
            && self.patterns.is_empty()
            && self.enumeration.is_none()
            && !self.has_bounds()
            && self.total_digits.is_none()
            && self.fraction_digits.is_none()
    }

    /// Whether any range facet is set
    pub fn has_bounds(&self) -> bool {
        self.min_inclusive.is_some()
            || self.min_exclusive.is_some()
            || self.max_inclusive.is_some()
            || self.max_exclusive.is_some()
    }

    /// Fold the facets of a restriction step over the inherited ones.
    ///
    /// Declared facets override inherited ones; patterns add a step;
    /// an inclusive bound replaces an inherited exclusive bound on the same
    /// side and vice versa.
    pub fn restrict(&self, step: FacetSet) -> FacetSet {
        let mut merged = self.clone();

        if step.white_space.is_some() {
            merged.white_space = step.white_space;
        }
        if step.length.is_some() {
            merged.length = step.length;
        }
        if step.min_length.is_some() {
            merged.min_length = step.min_length;
        }
        if step.max_length.is_some() {
            merged.max_length = step.max_length;
        }
        merged.patterns.extend(step.patterns);
        if step.enumeration.is_some() {
            merged.enumeration = step.enumeration;
        }
        if step.min_inclusive.is_some() || step.min_exclusive.is_some() {
            merged.min_inclusive = step.min_inclusive;
            merged.min_exclusive = step.min_exclusive;
        }
        if step.max_inclusive.is_some() || step.max_exclusive.is_some() {
            merged.max_inclusive = step.max_inclusive;
            merged.max_exclusive = step.max_exclusive;
        }
        if step.total_digits.is_some() {
            merged.total_digits = step.total_digits;
        }
        if step.fraction_digits.is_some() {
            merged.fraction_digits = step.fraction_digits;
        }
        merged
    }

    /// Check that the facets are mutually consistent
    pub fn check_consistency(&self) -> Result<(), (&'static str, String)> {
        if let (Some(min), Some(max)) = (self.min_length, self.max_length) {
            if min > max {
                return Err((
                    XSD_MIN_LENGTH,
                    format!("minLength {} is greater than maxLength {}", min, max),
                ));
            }
        }
        if let Some(len) = self.length {
            if self.min_length.map_or(false, |m| m > len) || self.max_length.map_or(false, |m| m < len) {
                return Err((XSD_LENGTH, "length conflicts with minLength/maxLength".to_string()));
            }
        }
        if self.min_inclusive.is_some() && self.min_exclusive.is_some() {
            return Err((
                XSD_MIN_INCLUSIVE,
                "minInclusive and minExclusive cannot both be specified".to_string(),
            ));
        }
        if self.max_inclusive.is_some() && self.max_exclusive.is_some() {
            return Err((
                XSD_MAX_INCLUSIVE,
                "maxInclusive and maxExclusive cannot both be specified".to_string(),
            ));
        }
        let lower = self.min_inclusive.as_ref().or(self.min_exclusive.as_ref());
        let upper = self.max_inclusive.as_ref().or(self.max_exclusive.as_ref());
        if let (Some(lo), Some(hi)) = (lower, upper) {
            if lo.value.compare(&hi.value) == Some(std::cmp::Ordering::Greater) {
                return Err((
                    XSD_MIN_INCLUSIVE,
                    format!("lower bound {} is greater than upper bound {}", lo.literal, hi.literal),
                ));
            }
        }
        if let (Some(total), Some(fraction)) = (self.total_digits, self.fraction_digits) {
            if fraction > total {
                return Err((
                    XSD_FRACTION_DIGITS,
                    format!("fractionDigits {} exceeds totalDigits {}", fraction, total),
                ));
            }
        }
        Ok(())
    }

    /// length, minLength, maxLength
    pub fn check_length(&self, length: usize) -> Result<(), FacetFailure> {
        if let Some(expected) = self.length {
            if length != expected {
                return Err(FacetFailure::new(
                    XSD_LENGTH,
                    format!("length of {}", expected),
                    format!("length of {}", length),
                ));
            }
        }
        if let Some(min) = self.min_length {
            if length < min {
                return Err(FacetFailure::new(
                    XSD_MIN_LENGTH,
                    format!("length of at least {}", min),
                    format!("length of {}", length),
                ));
            }
        }
        if let Some(max) = self.max_length {
            if length > max {
                return Err(FacetFailure::new(
                    XSD_MAX_LENGTH,
                    format!("length of at most {}", max),
                    format!("length of {}", length),
                ));
            }
        }
        Ok(())
    }

    /// Every pattern step must match
    pub fn check_patterns(&self, literal: &str) -> Result<(), FacetFailure> {
        for pattern in &self.patterns {
            if !pattern.is_match(literal) {
                return Err(FacetFailure::new(
                    XSD_PATTERN,
                    format!("a value matching '{}'", pattern.description()),
                    literal,
                ));
            }
        }
        Ok(())
    }

    /// enumeration
    pub fn check_enumeration(&self, literal: &str, value: &XsdValue) -> Result<(), FacetFailure> {
        match &self.enumeration {
            Some(enumeration) if !enumeration.contains(value) => Err(FacetFailure::new(
                XSD_ENUMERATION,
                format!("one of [{}]", enumeration.literals.join(", ")),
                literal,
            )),
            _ => Ok(()),
        }
    }

    /// minInclusive, minExclusive, maxInclusive, maxExclusive
    pub fn check_bounds(&self, literal: &str, value: &XsdValue) -> Result<(), FacetFailure> {
        use std::cmp::Ordering::*;

        let checks: [(&Option<BoundFacet>, &'static str, &[std::cmp::Ordering], &str); 4] = [
            (&self.min_inclusive, XSD_MIN_INCLUSIVE, &[Greater, Equal], ">="),
            (&self.min_exclusive, XSD_MIN_EXCLUSIVE, &[Greater], ">"),
            (&self.max_inclusive, XSD_MAX_INCLUSIVE, &[Less, Equal], "<="),
            (&self.max_exclusive, XSD_MAX_EXCLUSIVE, &[Less], "<"),
        ];

        for (bound, facet, allowed, op) in checks {
            if let Some(bound) = bound {
                let ordering = value.compare(&bound.value);
                if !ordering.map_or(false, |o| allowed.contains(&o)) {
                    return Err(FacetFailure::new(
                        facet,
                        format!("a value {} {}", op, bound.literal),
                        literal,
                    ));
                }
            }
        }
        Ok(())
    }

    /// totalDigits, fractionDigits
    pub fn check_digits(&self, literal: &str, value: &XsdValue) -> Result<(), FacetFailure> {
        let XsdValue::Decimal(d) = value else {
            return Ok(());
        };
        let normalized = d.normalize();

        if let Some(total) = self.total_digits {
            let digits = normalized.mantissa().unsigned_abs().to_string().len() as u32;
            if digits > total {
                return Err(FacetFailure::new(
                    XSD_TOTAL_DIGITS,
                    format!("at most {} total digits", total),
                    literal,
                ));
            }
        }
        if let Some(fraction) = self.fraction_digits {
            if normalized.scale() > fraction {
                return Err(FacetFailure::new(
                    XSD_FRACTION_DIGITS,
                    format!("at most {} fraction digits", fraction),
                    literal,
                ));
            }
        }
        Ok(())
    }
}

// =============================================================================
// XSD regular expressions
// =============================================================================

fn push_ranges(out: &mut String, ranges: &[(char, char)]) {
    for &(lo, hi) in ranges {
        if lo == hi {
            out.push_str(&format!("\\x{{{:X}}}", lo as u32));
        } else {
            out.push_str(&format!("\\x{{{:X}}}-\\x{{{:X}}}", lo as u32, hi as u32));
        }
    }
}

fn name_class(include_extra: bool, negated: bool) -> String {
    let mut out = String::from(if negated { "[^:" } else { "[:" });
    push_ranges(&mut out, NAME_START_RANGES);
    if include_extra {
        push_ranges(&mut out, NAME_EXTRA_RANGES);
    }
    out.push(']');
    out
}

fn block_class(name: &str) -> Option<&'static str> {
    Some(match name {
        "BasicLatin" => r"\x00-\x7F",
        "Latin-1Supplement" => r"\x{80}-\x{FF}",
        "LatinExtended-A" => r"\x{100}-\x{17F}",
        "LatinExtended-B" => r"\x{180}-\x{24F}",
        "Greek" => r"\x{370}-\x{3FF}",
        "Cyrillic" => r"\x{400}-\x{4FF}",
        "Hebrew" => r"\x{590}-\x{5FF}",
        "Arabic" => r"\x{600}-\x{6FF}",
        "Hiragana" => r"\x{3040}-\x{309F}",
        "Katakana" => r"\x{30A0}-\x{30FF}",
        "CJKUnifiedIdeographs" => r"\x{4E00}-\x{9FFF}",
        _ => return None,
    })
}

/// Translate an XSD regular expression into `regex` crate syntax.
///
/// XSD patterns are implicitly anchored and have no `^`/`$` anchors; the
/// multi-character escapes `\i \c \s \w` and class subtraction `[a-z-[aeiou]]`
/// differ from the crate's syntax.
pub fn translate_pattern(pattern: &str) -> Result<String, String> {
    let mut out = String::with_capacity(pattern.len() + 8);
    let mut chars = pattern.chars().peekable();
    let mut class_depth = 0usize;

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let escaped = chars
                    .next()
                    .ok_or_else(|| "pattern ends with a lone backslash".to_string())?;
                match escaped {
                    'i' => out.push_str(&name_class(false, false)),
                    'I' => out.push_str(&name_class(false, true)),
                    'c' => out.push_str(&name_class(true, false)),
                    'C' => out.push_str(&name_class(true, true)),
                    's' => out.push_str(r"[\x20\t\n\r]"),
                    'S' => out.push_str(r"[^\x20\t\n\r]"),
                    'w' => out.push_str(r"[^\p{P}\p{Z}\p{C}]"),
                    'W' => out.push_str(r"[\p{P}\p{Z}\p{C}]"),
                    'p' | 'P' => {
                        let mut name = String::new();
                        if chars.next() != Some('{') {
                            return Err(format!("malformed \\{} escape", escaped));
                        }
                        loop {
                            match chars.next() {
                                Some('}') => break,
                                Some(ch) => name.push(ch),
                                None => return Err(format!("unterminated \\{} escape", escaped)),
                            }
                        }
                        if let Some(block) = name.strip_prefix("Is") {
                            let ranges = block_class(block)
                                .ok_or_else(|| format!("unsupported Unicode block '{}'", block))?;
                            let negate = if escaped == 'P' { "^" } else { "" };
                            out.push_str(&format!("[{}{}]", negate, ranges));
                        } else {
                            out.push('\\');
                            out.push(escaped);
                            out.push('{');
                            out.push_str(&name);
                            out.push('}');
                        }
                    }
                    'n' | 'r' | 't' | 'd' | 'D' | '\\' | '|' | '.' | '-' | '^' | '?' | '*'
                    | '+' | '{' | '}' | '(' | ')' | '[' | ']' => {
                        out.push('\\');
                        out.push(escaped);
                    }
                    other => return Err(format!("invalid escape '\\{}'", other)),
                }
            }
            '[' => {
                class_depth += 1;
                out.push('[');
                if chars.peek() == Some(&'^') {
                    chars.next();
                    out.push('^');
                }
            }
            ']' if class_depth > 0 => {
                class_depth -= 1;
                out.push(']');
            }
            '-' if class_depth > 0 && chars.peek() == Some(&'[') => {
                out.push_str("--");
            }
            '&' | '~' if class_depth > 0 => {
                out.push('\\');
                out.push(c);
            }
            '^' | '$' if class_depth == 0 => {
                out.push('\\');
                out.push(c);
            }
            '.' if class_depth == 0 => out.push_str(r"[^\n\r]"),
            _ => out.push(c),
        }
    }

    if class_depth > 0 {
        return Err("unterminated character class".to_string());
    }
    Ok(out)
}
