//! XSD built-in datatypes
//!
//! Registry of the XSD 1.0 built-in simple types with their lexical parsers.
//! Each parser maps an already whitespace-normalized literal to an
//! [`XsdValue`] in the type's value space, which is what enumeration, range
//! and fixed-value comparisons operate on.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::str::FromStr;

use base64::Engine;

use crate::names::{is_valid_name, is_valid_ncname, is_valid_nmtoken, is_valid_qname};
use crate::namespaces::{NamespaceContext, QName};
use crate::validators::facets::WhiteSpace;

// =============================================================================
// Type and facet names
// =============================================================================

/// XSD anyType type name
pub const XSD_ANY_TYPE: &str = "anyType";
/// XSD anySimpleType type name
pub const XSD_ANY_SIMPLE_TYPE: &str = "anySimpleType";
/// XSD string type name
pub const XSD_STRING: &str = "string";
/// XSD boolean type name
pub const XSD_BOOLEAN: &str = "boolean";
/// XSD decimal type name
pub const XSD_DECIMAL: &str = "decimal";
/// XSD integer type name
pub const XSD_INTEGER: &str = "integer";
/// XSD float type name
pub const XSD_FLOAT: &str = "float";
/// XSD double type name
pub const XSD_DOUBLE: &str = "double";
/// XSD QName type name
pub const XSD_QNAME: &str = "QName";

/// XSD length facet name
pub const XSD_LENGTH: &str = "length";
/// XSD minLength facet name
pub const XSD_MIN_LENGTH: &str = "minLength";
/// XSD maxLength facet name
pub const XSD_MAX_LENGTH: &str = "maxLength";
/// XSD pattern facet name
pub const XSD_PATTERN: &str = "pattern";
/// XSD enumeration facet name
pub const XSD_ENUMERATION: &str = "enumeration";
/// XSD whiteSpace facet name
pub const XSD_WHITE_SPACE: &str = "whiteSpace";
/// XSD maxInclusive facet name
pub const XSD_MAX_INCLUSIVE: &str = "maxInclusive";
/// XSD maxExclusive facet name
pub const XSD_MAX_EXCLUSIVE: &str = "maxExclusive";
/// XSD minInclusive facet name
pub const XSD_MIN_INCLUSIVE: &str = "minInclusive";
/// XSD minExclusive facet name
pub const XSD_MIN_EXCLUSIVE: &str = "minExclusive";
/// XSD totalDigits facet name
pub const XSD_TOTAL_DIGITS: &str = "totalDigits";
/// XSD fractionDigits facet name
pub const XSD_FRACTION_DIGITS: &str = "fractionDigits";

/// Pseudo-facet name used when a literal is not in the datatype's lexical space
pub const DATATYPE_FACET: &str = "datatype";

// =============================================================================
// Admitted facet sets
// =============================================================================

lazy_static::lazy_static! {
    /// Facets admitted by string-like, binary and URI types, and by lists
    pub static ref LENGTH_FACETS: HashSet<&'static str> = [
        XSD_LENGTH, XSD_MIN_LENGTH, XSD_MAX_LENGTH,
        XSD_PATTERN, XSD_ENUMERATION, XSD_WHITE_SPACE,
    ].into_iter().collect();

    /// Facets admitted by boolean
    pub static ref BOOLEAN_FACETS: HashSet<&'static str> =
        [XSD_PATTERN, XSD_WHITE_SPACE].into_iter().collect();

    /// Facets admitted by ordered types (float, double, date/time)
    pub static ref ORDERED_FACETS: HashSet<&'static str> = [
        XSD_PATTERN, XSD_ENUMERATION, XSD_WHITE_SPACE,
        XSD_MAX_INCLUSIVE, XSD_MAX_EXCLUSIVE, XSD_MIN_INCLUSIVE, XSD_MIN_EXCLUSIVE,
    ].into_iter().collect();

    /// Facets admitted by decimal and the integer family
    pub static ref DECIMAL_FACETS: HashSet<&'static str> = [
        XSD_TOTAL_DIGITS, XSD_FRACTION_DIGITS,
        XSD_PATTERN, XSD_ENUMERATION, XSD_WHITE_SPACE,
        XSD_MAX_INCLUSIVE, XSD_MAX_EXCLUSIVE, XSD_MIN_INCLUSIVE, XSD_MIN_EXCLUSIVE,
    ].into_iter().collect();

    /// Facets admitted by unions
    pub static ref UNION_FACETS: HashSet<&'static str> =
        [XSD_PATTERN, XSD_ENUMERATION].into_iter().collect();
}

// =============================================================================
// Values
// =============================================================================

/// A value in the value space of a simple type
#[derive(Debug, Clone, PartialEq)]
pub enum XsdValue {
    /// String-like values (string family, anyURI)
    String(String),
    /// Boolean value
    Boolean(bool),
    /// decimal and the integer family
    Decimal(Decimal),
    /// float and double
    Float(f64),
    /// duration as months plus seconds
    Duration {
        /// Total months (years folded in)
        months: i64,
        /// Total seconds (days, hours and minutes folded in)
        seconds: Decimal,
    },
    /// Date/time family, normalized to UTC
    DateTime(NaiveDateTime),
    /// hexBinary and base64Binary octets
    Binary(Vec<u8>),
    /// Resolved QName or NOTATION
    QName(QName),
    /// Items of a list type
    List(Vec<XsdValue>),
}

impl XsdValue {
    /// Order two values of the same type, if the type is ordered
    pub fn compare(&self, other: &XsdValue) -> Option<Ordering> {
        match (self, other) {
            (XsdValue::Decimal(a), XsdValue::Decimal(b)) => Some(a.cmp(b)),
            (XsdValue::Float(a), XsdValue::Float(b)) => a.partial_cmp(b),
            (XsdValue::DateTime(a), XsdValue::DateTime(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Value-space identity (NaN is identical to itself)
    pub fn same_value(&self, other: &XsdValue) -> bool {
        match (self, other) {
            (XsdValue::Float(a), XsdValue::Float(b)) => (a.is_nan() && b.is_nan()) || a == b,
            (XsdValue::List(a), XsdValue::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_value(y))
            }
            _ => self == other,
        }
    }
}

// =============================================================================
// Built-in type definition
// =============================================================================

/// Primitive ancestor of a built-in type
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    /// anySimpleType itself
    AnySimple,
    String,
    Boolean,
    Decimal,
    Float,
    Double,
    Duration,
    DateTime,
    Time,
    Date,
    GYearMonth,
    GYear,
    GMonthDay,
    GDay,
    GMonth,
    HexBinary,
    Base64Binary,
    AnyUri,
    QName,
    Notation,
}

type LexicalParser = fn(&str) -> Result<XsdValue, String>;

/// Definition of a built-in XSD simple type
#[derive(Debug, Clone)]
pub struct BuiltinType {
    /// Local name in the XSD namespace
    pub name: &'static str,
    /// Primitive ancestor
    pub primitive: Primitive,
    /// Base type name (None for anySimpleType)
    pub base_type: Option<&'static str>,
    /// White space handling
    pub white_space: WhiteSpace,
    /// Item type for the built-in list types (NMTOKENS, IDREFS, ENTITIES)
    pub item_type: Option<&'static str>,
    parser: LexicalParser,
}

impl BuiltinType {
    /// Parse a normalized literal into the value space.
    ///
    /// `namespaces` resolves QName and NOTATION literals.
    pub fn parse(&self, literal: &str, namespaces: &NamespaceContext) -> Result<XsdValue, String> {
        let value = (self.parser)(literal)?;
        match self.primitive {
            Primitive::QName | Primitive::Notation => namespaces
                .resolve(literal)
                .map(XsdValue::QName)
                .ok_or_else(|| format!("the prefix of '{}' is not declared", literal)),
            _ => Ok(value),
        }
    }

    /// Facets that may restrict this type
    pub fn admitted_facets(&self) -> &'static HashSet<&'static str> {
        match self.primitive {
            Primitive::Boolean => &BOOLEAN_FACETS,
            Primitive::Decimal => &DECIMAL_FACETS,
            Primitive::Float
            | Primitive::Double
            | Primitive::Duration
            | Primitive::DateTime
            | Primitive::Time
            | Primitive::Date
            | Primitive::GYearMonth
            | Primitive::GYear
            | Primitive::GMonthDay
            | Primitive::GDay
            | Primitive::GMonth => &ORDERED_FACETS,
            _ => &LENGTH_FACETS,
        }
    }

    /// Whether range facets can be evaluated on this type
    pub fn is_ordered(&self) -> bool {
        !matches!(self.primitive, Primitive::Duration) && self.admitted_facets().contains(XSD_MIN_INCLUSIVE)
    }

    /// Length of a value as counted by the length facets
    pub fn length_of(&self, literal: &str, value: &XsdValue) -> Option<usize> {
        match value {
            XsdValue::Binary(bytes) => Some(bytes.len()),
            XsdValue::QName(_) => None,
            _ => Some(literal.chars().count()),
        }
    }

    /// Whether this type is `name` or derives from it
    pub fn is_derived_from(&self, name: &str) -> bool {
        let mut current = Some(self);
        while let Some(t) = current {
            if t.name == name {
                return true;
            }
            current = t.base_type.and_then(get_builtin_type);
        }
        false
    }
}

fn builtin(
    name: &'static str,
    primitive: Primitive,
    base_type: &'static str,
    white_space: WhiteSpace,
    parser: LexicalParser,
) -> BuiltinType {
    BuiltinType {
        name,
        primitive,
        base_type: Some(base_type),
        white_space,
        item_type: None,
        parser,
    }
}

fn builtin_list(name: &'static str, item_type: &'static str) -> BuiltinType {
    BuiltinType {
        name,
        primitive: Primitive::String,
        base_type: Some(XSD_ANY_SIMPLE_TYPE),
        white_space: WhiteSpace::Collapse,
        item_type: Some(item_type),
        parser: parse_string,
    }
}

// =============================================================================
// Lexical patterns
// =============================================================================

const TZ: &str = r"(Z|[+-][0-9]{2}:[0-9]{2})?";

static DECIMAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)$").unwrap());

static INTEGER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[+-]?[0-9]+$").unwrap());

static FLOAT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[+-]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][+-]?[0-9]+)?|-?INF|NaN)$")
        .unwrap()
});

static LANGUAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z]{1,8}(?:-[a-zA-Z0-9]{1,8})*$").unwrap());

static DURATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(-)?P(?:([0-9]+)Y)?(?:([0-9]+)M)?(?:([0-9]+)D)?(?:T(?:([0-9]+)H)?(?:([0-9]+)M)?(?:([0-9]+(?:\.[0-9]+)?)S)?)?$",
    )
    .unwrap()
});

static DATETIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^(-?[0-9]{{4,}})-([0-9]{{2}})-([0-9]{{2}})T([0-9]{{2}}):([0-9]{{2}}):([0-9]{{2}}(?:\.[0-9]+)?){}$",
        TZ
    ))
    .unwrap()
});

static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^(-?[0-9]{{4,}})-([0-9]{{2}})-([0-9]{{2}}){}$", TZ)).unwrap()
});

static TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^([0-9]{{2}}):([0-9]{{2}}):([0-9]{{2}}(?:\.[0-9]+)?){}$",
        TZ
    ))
    .unwrap()
});

static GYEAR_MONTH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^(-?[0-9]{{4,}})-([0-9]{{2}}){}$", TZ)).unwrap());

static GYEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^(-?[0-9]{{4,}}){}$", TZ)).unwrap());

static GMONTH_DAY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^--([0-9]{{2}})-([0-9]{{2}}){}$", TZ)).unwrap());

static GDAY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^---([0-9]{{2}}){}$", TZ)).unwrap());

static GMONTH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^--([0-9]{{2}}){}$", TZ)).unwrap());

/// Reference leap year for the month/day-only types
const REFERENCE_YEAR: i32 = 2000;

// =============================================================================
// Lexical parsers
// =============================================================================

fn parse_any_simple(value: &str) -> Result<XsdValue, String> {
    Ok(XsdValue::String(value.to_string()))
}

fn parse_string(value: &str) -> Result<XsdValue, String> {
    Ok(XsdValue::String(value.to_string()))
}

fn parse_language(value: &str) -> Result<XsdValue, String> {
    if LANGUAGE_RE.is_match(value) {
        Ok(XsdValue::String(value.to_string()))
    } else {
        Err("not a valid language tag".to_string())
    }
}

fn parse_name(value: &str) -> Result<XsdValue, String> {
    if is_valid_name(value) {
        Ok(XsdValue::String(value.to_string()))
    } else {
        Err("not a valid XML name".to_string())
    }
}

fn parse_ncname(value: &str) -> Result<XsdValue, String> {
    if is_valid_ncname(value) {
        Ok(XsdValue::String(value.to_string()))
    } else {
        Err("not a valid NCName".to_string())
    }
}

fn parse_nmtoken(value: &str) -> Result<XsdValue, String> {
    if is_valid_nmtoken(value) {
        Ok(XsdValue::String(value.to_string()))
    } else {
        Err("not a valid NMTOKEN".to_string())
    }
}

fn parse_boolean(value: &str) -> Result<XsdValue, String> {
    match value {
        "true" | "1" => Ok(XsdValue::Boolean(true)),
        "false" | "0" => Ok(XsdValue::Boolean(false)),
        _ => Err("expected one of 'true', 'false', '1', '0'".to_string()),
    }
}

fn decimal_from_lexical(value: &str) -> Result<Decimal, String> {
    let (sign, digits) = match value.as_bytes().first() {
        Some(b'-') => ("-", &value[1..]),
        Some(b'+') => ("", &value[1..]),
        _ => ("", value),
    };
    let digits = digits.strip_suffix('.').unwrap_or(digits);
    let lead = if digits.starts_with('.') { "0" } else { "" };
    Decimal::from_str_exact(&format!("{}{}{}", sign, lead, digits))
        .map_err(|_| "outside the supported decimal range".to_string())
}

fn parse_decimal(value: &str) -> Result<XsdValue, String> {
    if !DECIMAL_RE.is_match(value) {
        return Err("not a valid decimal number".to_string());
    }
    decimal_from_lexical(value).map(XsdValue::Decimal)
}

fn integer_in_range(
    value: &str,
    min: Option<Decimal>,
    max: Option<Decimal>,
) -> Result<XsdValue, String> {
    if !INTEGER_RE.is_match(value) {
        return Err("not a valid integer".to_string());
    }
    let n = decimal_from_lexical(value)?;
    if let Some(min) = min {
        if n < min {
            return Err(format!("less than the minimum {}", min));
        }
    }
    if let Some(max) = max {
        if n > max {
            return Err(format!("greater than the maximum {}", max));
        }
    }
    Ok(XsdValue::Decimal(n))
}

fn parse_integer(value: &str) -> Result<XsdValue, String> {
    integer_in_range(value, None, None)
}

fn parse_non_positive_integer(value: &str) -> Result<XsdValue, String> {
    integer_in_range(value, None, Some(Decimal::ZERO))
}

fn parse_negative_integer(value: &str) -> Result<XsdValue, String> {
    integer_in_range(value, None, Some(Decimal::NEGATIVE_ONE))
}

fn parse_non_negative_integer(value: &str) -> Result<XsdValue, String> {
    integer_in_range(value, Some(Decimal::ZERO), None)
}

fn parse_positive_integer(value: &str) -> Result<XsdValue, String> {
    integer_in_range(value, Some(Decimal::ONE), None)
}

fn parse_long(value: &str) -> Result<XsdValue, String> {
    integer_in_range(value, Some(Decimal::from(i64::MIN)), Some(Decimal::from(i64::MAX)))
}

fn parse_int(value: &str) -> Result<XsdValue, String> {
    integer_in_range(value, Some(Decimal::from(i32::MIN)), Some(Decimal::from(i32::MAX)))
}

fn parse_short(value: &str) -> Result<XsdValue, String> {
    integer_in_range(value, Some(Decimal::from(i16::MIN)), Some(Decimal::from(i16::MAX)))
}

fn parse_byte(value: &str) -> Result<XsdValue, String> {
    integer_in_range(value, Some(Decimal::from(i8::MIN)), Some(Decimal::from(i8::MAX)))
}

fn parse_unsigned_long(value: &str) -> Result<XsdValue, String> {
    integer_in_range(value, Some(Decimal::ZERO), Some(Decimal::from(u64::MAX)))
}

fn parse_unsigned_int(value: &str) -> Result<XsdValue, String> {
    integer_in_range(value, Some(Decimal::ZERO), Some(Decimal::from(u32::MAX)))
}

fn parse_unsigned_short(value: &str) -> Result<XsdValue, String> {
    integer_in_range(value, Some(Decimal::ZERO), Some(Decimal::from(u16::MAX)))
}

fn parse_unsigned_byte(value: &str) -> Result<XsdValue, String> {
    integer_in_range(value, Some(Decimal::ZERO), Some(Decimal::from(u8::MAX)))
}

fn float_from_lexical(value: &str) -> Result<f64, String> {
    if !FLOAT_RE.is_match(value) {
        return Err("not a valid floating-point number".to_string());
    }
    match value {
        "INF" => Ok(f64::INFINITY),
        "-INF" => Ok(f64::NEG_INFINITY),
        "NaN" => Ok(f64::NAN),
        _ => f64::from_str(value).map_err(|e| e.to_string()),
    }
}

fn parse_float(value: &str) -> Result<XsdValue, String> {
    float_from_lexical(value).map(|v| XsdValue::Float(v as f32 as f64))
}

fn parse_double(value: &str) -> Result<XsdValue, String> {
    float_from_lexical(value).map(XsdValue::Float)
}

fn parse_duration(value: &str) -> Result<XsdValue, String> {
    let caps = DURATION_RE
        .captures(value)
        .ok_or_else(|| "not a valid duration".to_string())?;
    if value.ends_with('P') || value.ends_with('T') {
        return Err("a duration needs at least one component".to_string());
    }

    let field = |i: usize| -> Result<i64, String> {
        caps.get(i)
            .map(|m| m.as_str().parse::<i64>())
            .transpose()
            .map(|v| v.unwrap_or(0))
            .map_err(|_| "duration component out of range".to_string())
    };
    let overflow = || "duration out of range".to_string();

    let months = field(2)?
        .checked_mul(12)
        .and_then(|y| y.checked_add(field(3).ok()?))
        .ok_or_else(overflow)?;
    let whole = field(4)?
        .checked_mul(86_400)
        .and_then(|d| d.checked_add(field(5).ok()?.checked_mul(3_600)?))
        .and_then(|s| s.checked_add(field(6).ok()?.checked_mul(60)?))
        .ok_or_else(overflow)?;
    let fraction = match caps.get(7) {
        Some(m) => Decimal::from_str_exact(m.as_str()).map_err(|_| overflow())?,
        None => Decimal::ZERO,
    };
    let mut seconds = Decimal::from(whole)
        .checked_add(fraction)
        .ok_or_else(overflow)?;

    let mut months = months;
    if caps.get(1).is_some() {
        months = -months;
        seconds = -seconds;
    }
    Ok(XsdValue::Duration { months, seconds })
}

fn parse_year(text: &str) -> Result<i32, String> {
    let digits = text.trim_start_matches('-');
    if digits.len() > 4 && digits.starts_with('0') {
        return Err("years of more than four digits cannot have leading zeros".to_string());
    }
    let year = text
        .parse::<i32>()
        .map_err(|_| "year out of range".to_string())?;
    if year == 0 {
        return Err("year 0000 is not allowed".to_string());
    }
    Ok(year)
}

fn parse_two(text: &str) -> u32 {
    text.bytes()
        .fold(0, |acc, b| acc * 10 + u32::from(b.wrapping_sub(b'0')))
}

/// Timezone offset in minutes (absent timezones compare as UTC)
fn parse_timezone(tz: Option<regex::Match<'_>>) -> Result<i64, String> {
    let tz = match tz {
        None => return Ok(0),
        Some(m) if m.as_str() == "Z" => return Ok(0),
        Some(m) => m.as_str(),
    };
    let sign = if tz.starts_with('-') { -1 } else { 1 };
    let hours = i64::from(parse_two(&tz[1..3]));
    let minutes = i64::from(parse_two(&tz[4..6]));
    if minutes > 59 || hours > 14 || (hours == 14 && minutes > 0) {
        return Err(format!("invalid timezone '{}'", tz));
    }
    Ok(sign * (hours * 60 + minutes))
}

fn at_midnight(date: NaiveDate) -> Result<NaiveDateTime, String> {
    date.and_hms_opt(0, 0, 0)
        .ok_or_else(|| "date out of range".to_string())
}

fn make_date(year: i32, month: u32, day: u32) -> Result<NaiveDate, String> {
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| format!("{:04}-{:02}-{:02} is not a valid date", year, month, day))
}

/// Time of day; `24:00:00` is returned as midnight plus a day carry
fn make_time(hour: &str, minute: &str, second: &str) -> Result<(NaiveTime, bool), String> {
    let (h, m) = (parse_two(hour), parse_two(minute));
    let (whole, fraction) = second.split_once('.').unwrap_or((second, ""));
    let s = parse_two(whole);
    let nanos = fraction
        .bytes()
        .chain(std::iter::repeat(b'0'))
        .take(9)
        .fold(0u32, |acc, b| acc * 10 + u32::from(b - b'0'));

    if h == 24 && m == 0 && s == 0 && nanos == 0 {
        return NaiveTime::from_hms_opt(0, 0, 0)
            .map(|t| (t, true))
            .ok_or_else(|| "invalid time".to_string());
    }
    if s > 59 {
        return Err(format!("invalid seconds '{}'", second));
    }
    NaiveTime::from_hms_nano_opt(h, m, s, nanos)
        .map(|t| (t, false))
        .ok_or_else(|| format!("{}:{}:{} is not a valid time", hour, minute, second))
}

fn to_utc(local: NaiveDateTime, carry_day: bool, offset_minutes: i64) -> Result<XsdValue, String> {
    let shift = chrono::Duration::minutes(offset_minutes);
    let mut value = local.checked_sub_signed(shift);
    if carry_day {
        value = value.and_then(|v| v.checked_add_signed(chrono::Duration::days(1)));
    }
    value
        .map(XsdValue::DateTime)
        .ok_or_else(|| "date out of range".to_string())
}

fn parse_datetime(value: &str) -> Result<XsdValue, String> {
    let caps = DATETIME_RE
        .captures(value)
        .ok_or_else(|| "not a valid dateTime".to_string())?;
    let date = make_date(parse_year(&caps[1])?, parse_two(&caps[2]), parse_two(&caps[3]))?;
    let (time, carry) = make_time(&caps[4], &caps[5], &caps[6])?;
    to_utc(date.and_time(time), carry, parse_timezone(caps.get(7))?)
}

fn parse_date(value: &str) -> Result<XsdValue, String> {
    let caps = DATE_RE
        .captures(value)
        .ok_or_else(|| "not a valid date".to_string())?;
    let date = make_date(parse_year(&caps[1])?, parse_two(&caps[2]), parse_two(&caps[3]))?;
    to_utc(at_midnight(date)?, false, parse_timezone(caps.get(4))?)
}

fn parse_time(value: &str) -> Result<XsdValue, String> {
    let caps = TIME_RE
        .captures(value)
        .ok_or_else(|| "not a valid time".to_string())?;
    let date = make_date(REFERENCE_YEAR, 1, 1)?;
    let (time, _) = make_time(&caps[1], &caps[2], &caps[3])?;
    to_utc(date.and_time(time), false, parse_timezone(caps.get(4))?)
}

fn parse_gyear_month(value: &str) -> Result<XsdValue, String> {
    let caps = GYEAR_MONTH_RE
        .captures(value)
        .ok_or_else(|| "not a valid gYearMonth".to_string())?;
    let date = make_date(parse_year(&caps[1])?, parse_two(&caps[2]), 1)?;
    to_utc(at_midnight(date)?, false, parse_timezone(caps.get(3))?)
}

fn parse_gyear(value: &str) -> Result<XsdValue, String> {
    let caps = GYEAR_RE
        .captures(value)
        .ok_or_else(|| "not a valid gYear".to_string())?;
    let date = make_date(parse_year(&caps[1])?, 1, 1)?;
    to_utc(at_midnight(date)?, false, parse_timezone(caps.get(2))?)
}

fn parse_gmonth_day(value: &str) -> Result<XsdValue, String> {
    let caps = GMONTH_DAY_RE
        .captures(value)
        .ok_or_else(|| "not a valid gMonthDay".to_string())?;
    let date = make_date(REFERENCE_YEAR, parse_two(&caps[1]), parse_two(&caps[2]))?;
    to_utc(at_midnight(date)?, false, parse_timezone(caps.get(3))?)
}

fn parse_gday(value: &str) -> Result<XsdValue, String> {
    let caps = GDAY_RE
        .captures(value)
        .ok_or_else(|| "not a valid gDay".to_string())?;
    let date = make_date(REFERENCE_YEAR, 1, parse_two(&caps[1]))?;
    to_utc(at_midnight(date)?, false, parse_timezone(caps.get(2))?)
}

fn parse_gmonth(value: &str) -> Result<XsdValue, String> {
    let caps = GMONTH_RE
        .captures(value)
        .ok_or_else(|| "not a valid gMonth".to_string())?;
    let date = make_date(REFERENCE_YEAR, parse_two(&caps[1]), 1)?;
    to_utc(at_midnight(date)?, false, parse_timezone(caps.get(2))?)
}

fn parse_hex_binary(value: &str) -> Result<XsdValue, String> {
    if value.len() % 2 != 0 || !value.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err("not a valid hexBinary value".to_string());
    }
    let bytes = value
        .as_bytes()
        .chunks(2)
        .map(|pair| {
            let hi = (pair[0] as char).to_digit(16).unwrap_or(0);
            let lo = (pair[1] as char).to_digit(16).unwrap_or(0);
            (hi * 16 + lo) as u8
        })
        .collect();
    Ok(XsdValue::Binary(bytes))
}

fn parse_base64_binary(value: &str) -> Result<XsdValue, String> {
    let compact: String = value.chars().filter(|c| *c != ' ').collect();
    base64::engine::general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map(XsdValue::Binary)
        .map_err(|e| format!("not a valid base64Binary value: {}", e))
}

fn parse_any_uri(value: &str) -> Result<XsdValue, String> {
    if value.chars().any(|c| c.is_control()) {
        return Err("control characters are not allowed in a URI".to_string());
    }
    Ok(XsdValue::String(value.to_string()))
}

fn parse_qname(value: &str) -> Result<XsdValue, String> {
    if is_valid_qname(value) {
        Ok(XsdValue::String(value.to_string()))
    } else {
        Err("not a valid QName".to_string())
    }
}

// =============================================================================
// Built-in type registry
// =============================================================================

lazy_static::lazy_static! {
    /// Registry of the XSD 1.0 built-in simple types
    pub static ref BUILTIN_TYPES: Vec<BuiltinType> = {
        use Primitive as P;
        use WhiteSpace::{Collapse, Preserve, Replace};

        vec![
            BuiltinType {
                name: XSD_ANY_SIMPLE_TYPE,
                primitive: P::AnySimple,
                base_type: None,
                white_space: Preserve,
                item_type: None,
                parser: parse_any_simple,
            },
            // String family
            builtin(XSD_STRING, P::String, XSD_ANY_SIMPLE_TYPE, Preserve, parse_string),
            builtin("normalizedString", P::String, XSD_STRING, Replace, parse_string),
            builtin("token", P::String, "normalizedString", Collapse, parse_string),
            builtin("language", P::String, "token", Collapse, parse_language),
            builtin("Name", P::String, "token", Collapse, parse_name),
            builtin("NCName", P::String, "Name", Collapse, parse_ncname),
            builtin("ID", P::String, "NCName", Collapse, parse_ncname),
            builtin("IDREF", P::String, "NCName", Collapse, parse_ncname),
            builtin("ENTITY", P::String, "NCName", Collapse, parse_ncname),
            builtin("NMTOKEN", P::String, "token", Collapse, parse_nmtoken),
            builtin_list("NMTOKENS", "NMTOKEN"),
            builtin_list("IDREFS", "IDREF"),
            builtin_list("ENTITIES", "ENTITY"),
            // Other primitives
            builtin(XSD_BOOLEAN, P::Boolean, XSD_ANY_SIMPLE_TYPE, Collapse, parse_boolean),
            builtin(XSD_FLOAT, P::Float, XSD_ANY_SIMPLE_TYPE, Collapse, parse_float),
            builtin(XSD_DOUBLE, P::Double, XSD_ANY_SIMPLE_TYPE, Collapse, parse_double),
            builtin("duration", P::Duration, XSD_ANY_SIMPLE_TYPE, Collapse, parse_duration),
            builtin("dateTime", P::DateTime, XSD_ANY_SIMPLE_TYPE, Collapse, parse_datetime),
            builtin("time", P::Time, XSD_ANY_SIMPLE_TYPE, Collapse, parse_time),
            builtin("date", P::Date, XSD_ANY_SIMPLE_TYPE, Collapse, parse_date),
            builtin("gYearMonth", P::GYearMonth, XSD_ANY_SIMPLE_TYPE, Collapse, parse_gyear_month),
            builtin("gYear", P::GYear, XSD_ANY_SIMPLE_TYPE, Collapse, parse_gyear),
            builtin("gMonthDay", P::GMonthDay, XSD_ANY_SIMPLE_TYPE, Collapse, parse_gmonth_day),
            builtin("gDay", P::GDay, XSD_ANY_SIMPLE_TYPE, Collapse, parse_gday),
            builtin("gMonth", P::GMonth, XSD_ANY_SIMPLE_TYPE, Collapse, parse_gmonth),
            builtin("hexBinary", P::HexBinary, XSD_ANY_SIMPLE_TYPE, Collapse, parse_hex_binary),
            builtin("base64Binary", P::Base64Binary, XSD_ANY_SIMPLE_TYPE, Collapse, parse_base64_binary),
            builtin("anyURI", P::AnyUri, XSD_ANY_SIMPLE_TYPE, Collapse, parse_any_uri),
            builtin(XSD_QNAME, P::QName, XSD_ANY_SIMPLE_TYPE, Collapse, parse_qname),
            builtin("NOTATION", P::Notation, XSD_ANY_SIMPLE_TYPE, Collapse, parse_qname),
            // Decimal family
            builtin(XSD_DECIMAL, P::Decimal, XSD_ANY_SIMPLE_TYPE, Collapse, parse_decimal),
            builtin(XSD_INTEGER, P::Decimal, XSD_DECIMAL, Collapse, parse_integer),
            builtin("nonPositiveInteger", P::Decimal, XSD_INTEGER, Collapse, parse_non_positive_integer),
            builtin("negativeInteger", P::Decimal, "nonPositiveInteger", Collapse, parse_negative_integer),
            builtin("long", P::Decimal, XSD_INTEGER, Collapse, parse_long),
            builtin("int", P::Decimal, "long", Collapse, parse_int),
            builtin("short", P::Decimal, "int", Collapse, parse_short),
            builtin("byte", P::Decimal, "short", Collapse, parse_byte),
            builtin("nonNegativeInteger", P::Decimal, XSD_INTEGER, Collapse, parse_non_negative_integer),
            builtin("unsignedLong", P::Decimal, "nonNegativeInteger", Collapse, parse_unsigned_long),
            builtin("unsignedInt", P::Decimal, "unsignedLong", Collapse, parse_unsigned_int),
            builtin("unsignedShort", P::Decimal, "unsignedInt", Collapse, parse_unsigned_short),
            builtin("unsignedByte", P::Decimal, "unsignedShort", Collapse, parse_unsigned_byte),
            builtin("positiveInteger", P::Decimal, "nonNegativeInteger", Collapse, parse_positive_integer),
        ]
    };
}

/// Get a built-in type by local name
pub fn get_builtin_type(name: &str) -> Option<&'static BuiltinType> {
    BUILTIN_TYPES.iter().find(|t| t.name == name)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(type_name: &str, literal: &str) -> Result<XsdValue, String> {
        let builtin = get_builtin_type(type_name).unwrap();
        let normalized = builtin.white_space.normalize(literal);
        builtin.parse(&normalized, &NamespaceContext::new())
    }

    fn dec(s: &str) -> XsdValue {
        XsdValue::Decimal(Decimal::from_str(s).unwrap())
    }

    #[test]
    fn test_string_types() {
        assert!(parse("string", "Hello World").is_ok());
        assert!(parse("token", "  Hello   World ").is_ok());
        assert!(parse("NCName", "validName").is_ok());
        assert!(parse("NCName", "invalid:name").is_err());
        assert!(parse("language", "en-US").is_ok());
        assert!(parse("language", "en_US").is_err());
    }

    #[test]
    fn test_boolean_type() {
        assert_eq!(parse("boolean", "true").unwrap(), XsdValue::Boolean(true));
        assert_eq!(parse("boolean", " 0 ").unwrap(), XsdValue::Boolean(false));
        assert!(parse("boolean", "yes").is_err());
        assert!(parse("boolean", "TRUE").is_err());
    }

    #[test]
    fn test_decimal_types() {
        assert_eq!(parse("decimal", "1.50").unwrap(), dec("1.5"));
        assert_eq!(parse("decimal", "-.5").unwrap(), dec("-0.5"));
        assert_eq!(parse("decimal", "+3.").unwrap(), dec("3"));
        assert!(parse("decimal", "1e5").is_err());
        assert!(parse("decimal", "1_000").is_err());
        assert!(parse("decimal", "").is_err());
    }

    #[test]
    fn test_integer_types() {
        assert_eq!(parse("integer", "42").unwrap(), dec("42"));
        assert!(parse("integer", "abc").is_err());
        assert!(parse("integer", "4.0").is_err());
        assert!(parse("integer", "\u{0663}").is_err());
        assert!(parse("byte", "127").is_ok());
        assert!(parse("byte", "128").is_err());
        assert!(parse("unsignedByte", "-1").is_err());
        assert!(parse("positiveInteger", "0").is_err());
        assert!(parse("nonNegativeInteger", "0").is_ok());
        assert!(parse("negativeInteger", "-1").is_ok());
        assert!(parse("long", "9223372036854775808").is_err());
        assert!(parse("unsignedLong", "18446744073709551615").is_ok());
    }

    #[test]
    fn test_float_types() {
        assert_eq!(parse("double", "1.5e2").unwrap(), XsdValue::Float(150.0));
        assert_eq!(parse("double", "INF").unwrap(), XsdValue::Float(f64::INFINITY));
        assert!(parse("double", "+INF").is_err());
        assert!(parse("float", "NaN").unwrap().same_value(&XsdValue::Float(f64::NAN)));
        assert!(parse("float", "inf").is_err());
    }

    #[test]
    fn test_date_time_types() {
        assert!(parse("date", "2024-02-29").is_ok());
        assert!(parse("date", "2023-02-29").is_err());
        assert!(parse("date", "0000-01-01").is_err());
        assert!(parse("dateTime", "2024-01-01T12:30:00.123Z").is_ok());
        assert!(parse("dateTime", "2024-01-01T25:00:00").is_err());
        assert!(parse("time", "23:59:60").is_err());
        assert!(parse("gMonthDay", "--02-29").is_ok());
        assert!(parse("gYear", "02024").is_err());
        assert!(parse("gDay", "---31").is_ok());
        assert!(parse("dateTime", "2024-01-01T00:00:00+15:00").is_err());
    }

    #[test]
    fn test_timezone_normalization() {
        let a = parse("dateTime", "2024-01-01T12:00:00+02:00").unwrap();
        let b = parse("dateTime", "2024-01-01T10:00:00Z").unwrap();
        assert!(a.same_value(&b));

        let midnight = parse("dateTime", "2024-01-01T24:00:00").unwrap();
        let next = parse("dateTime", "2024-01-02T00:00:00").unwrap();
        assert_eq!(midnight.compare(&next), Some(Ordering::Equal));
    }

    #[test]
    fn test_duration_type() {
        assert_eq!(
            parse("duration", "P1Y2M").unwrap(),
            XsdValue::Duration {
                months: 14,
                seconds: Decimal::ZERO
            }
        );
        assert!(parse("duration", "-PT1.5S").is_ok());
        assert!(parse("duration", "P").is_err());
        assert!(parse("duration", "P1DT").is_err());
        assert!(parse("duration", "PT").is_err());
    }

    #[test]
    fn test_binary_types() {
        assert_eq!(
            parse("hexBinary", "0aFF").unwrap(),
            XsdValue::Binary(vec![0x0a, 0xff])
        );
        assert!(parse("hexBinary", "abc").is_err());
        assert_eq!(
            parse("base64Binary", "aGVsbG8=").unwrap(),
            XsdValue::Binary(b"hello".to_vec())
        );
        assert!(parse("base64Binary", "!!!").is_err());
    }

    #[test]
    fn test_qname_resolution() {
        let builtin = get_builtin_type(XSD_QNAME).unwrap();
        let mut ns = NamespaceContext::new();
        ns.add_prefix("o", "urn:orders");

        assert_eq!(
            builtin.parse("o:order", &ns).unwrap(),
            XsdValue::QName(QName::namespaced("urn:orders", "order"))
        );
        assert!(builtin.parse("x:order", &ns).is_err());
    }

    #[test]
    fn test_derivation_chain() {
        let byte = get_builtin_type("byte").unwrap();
        assert!(byte.is_derived_from("integer"));
        assert!(byte.is_derived_from("decimal"));
        assert!(byte.is_derived_from(XSD_ANY_SIMPLE_TYPE));
        assert!(!byte.is_derived_from("string"));
    }

    #[test]
    fn test_admitted_facets() {
        let boolean = get_builtin_type("boolean").unwrap();
        assert!(!boolean.admitted_facets().contains(XSD_MAX_LENGTH));
        let decimal = get_builtin_type("decimal").unwrap();
        assert!(decimal.admitted_facets().contains(XSD_TOTAL_DIGITS));
        assert!(decimal.is_ordered());
        assert!(!get_builtin_type("duration").unwrap().is_ordered());
    }

    #[test]
    fn test_registry_is_consistent() {
        for builtin in BUILTIN_TYPES.iter() {
            if let Some(base) = builtin.base_type {
                assert!(get_builtin_type(base).is_some(), "missing base of {}", builtin.name);
            }
            if let Some(item) = builtin.item_type {
                assert!(get_builtin_type(item).is_some());
            }
        }
    }
}
