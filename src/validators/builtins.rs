//! XSD built-in types
//!
//! This module defines the built-in primitive and derived datatypes of
//! XML Schema 1.0 and the lexical checks that turn a string into a typed
//! [`XsdValue`].

use crate::error::ParseError;
use crate::validators::facets::WhiteSpace;
use base64::Engine;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Result of a lexical check
pub type ValueResult = std::result::Result<XsdValue, ParseError>;

// =============================================================================
// XSD Value Representation
// =============================================================================

/// A typed value produced by validating a lexical form
#[derive(Debug, Clone, PartialEq)]
pub enum XsdValue {
    /// String-like value
    String(String),
    /// Boolean value
    Boolean(bool),
    /// Decimal value, integers included
    Decimal(Decimal),
    /// Float or double value
    Float(f64),
    /// Binary value (hex or base64 decoded)
    Binary(Vec<u8>),
    /// Date value; a timezone suffix is accepted but not normalized
    Date(NaiveDate),
    /// DateTime value; a timezone suffix is accepted but not normalized
    DateTime(NaiveDateTime),
    /// Time value; a timezone suffix is accepted but not normalized
    Time(NaiveTime),
    /// List value (xs:list and the built-in list types)
    List(Vec<XsdValue>),
}

impl XsdValue {
    /// Order two values of the same kind
    pub fn compare(&self, other: &XsdValue) -> Option<Ordering> {
        match (self, other) {
            (XsdValue::Decimal(a), XsdValue::Decimal(b)) => Some(a.cmp(b)),
            (XsdValue::Float(a), XsdValue::Float(b)) => a.partial_cmp(b),
            (XsdValue::Date(a), XsdValue::Date(b)) => Some(a.cmp(b)),
            (XsdValue::DateTime(a), XsdValue::DateTime(b)) => Some(a.cmp(b)),
            (XsdValue::Time(a), XsdValue::Time(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Length as measured by the length facets
    pub fn length(&self, lexical: &str) -> usize {
        match self {
            XsdValue::String(s) => s.chars().count(),
            XsdValue::Binary(b) => b.len(),
            XsdValue::List(items) => items.len(),
            _ => lexical.chars().count(),
        }
    }
}

impl fmt::Display for XsdValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XsdValue::String(s) => write!(f, "{}", s),
            XsdValue::Boolean(b) => write!(f, "{}", b),
            XsdValue::Decimal(d) => write!(f, "{}", d),
            XsdValue::Float(v) => {
                if v.is_nan() {
                    write!(f, "NaN")
                } else if *v == f64::INFINITY {
                    write!(f, "INF")
                } else if *v == f64::NEG_INFINITY {
                    write!(f, "-INF")
                } else {
                    write!(f, "{}", v)
                }
            }
            XsdValue::Binary(b) => {
                for byte in b {
                    write!(f, "{:02X}", byte)?;
                }
                Ok(())
            }
            XsdValue::Date(d) => write!(f, "{}", d),
            XsdValue::DateTime(d) => write!(f, "{}", d.format("%Y-%m-%dT%H:%M:%S%.f")),
            XsdValue::Time(t) => write!(f, "{}", t),
            XsdValue::List(items) => {
                let parts: Vec<String> = items.iter().map(|i| i.to_string()).collect();
                write!(f, "{}", parts.join(" "))
            }
        }
    }
}

// =============================================================================
// Built-in Type Definition
// =============================================================================

/// Definition of a built-in XSD type
#[derive(Debug, Clone, Copy)]
pub struct BuiltinType {
    /// Type name (local name in the XSD namespace)
    pub name: &'static str,
    /// Base type name (None for anyType)
    pub base_type: Option<&'static str>,
    /// White space handling
    pub white_space: WhiteSpace,
    /// Lexical check
    validator: fn(&str) -> ValueResult,
}

impl BuiltinType {
    /// Validate a string value against this type
    pub fn validate(&self, value: &str) -> ValueResult {
        let normalized = self.white_space.normalize(value);
        (self.validator)(&normalized).map_err(|e| {
            ParseError::validation(format!(
                "'{}' is not a valid value for '{}': {}",
                normalized, self.name, e.message
            ))
        })
    }

    /// Whether this type is, or derives from, `ancestor`
    pub fn derives_from(&self, ancestor: &str) -> bool {
        let mut current = Some(self);
        while let Some(t) = current {
            if t.name == ancestor {
                return true;
            }
            current = t.base_type.and_then(get_builtin_type);
        }
        false
    }
}

fn invalid(reason: impl Into<String>) -> ParseError {
    ParseError::validation(reason)
}

// =============================================================================
// Lexical patterns
// =============================================================================

static DECIMAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)$").expect("decimal pattern"));
static INTEGER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[+-]?\d+$").expect("integer pattern"));
static FLOAT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?$").expect("float pattern")
});
static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(-?\d{4,})-(\d{2})-(\d{2})(Z|[+-]\d{2}:\d{2})?$").expect("date pattern")
});
static DATETIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(-?\d{4,})-(\d{2})-(\d{2})T(\d{2}:\d{2}:\d{2}(\.\d+)?)(Z|[+-]\d{2}:\d{2})?$")
        .expect("dateTime pattern")
});
static TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{2}:\d{2}:\d{2}(\.\d+)?)(Z|[+-]\d{2}:\d{2})?$").expect("time pattern")
});
static DURATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^-?P(\d+Y)?(\d+M)?(\d+D)?(T(\d+H)?(\d+M)?(\d+(\.\d+)?S)?)?$")
        .expect("duration pattern")
});
static GYEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d{4,}(Z|[+-]\d{2}:\d{2})?$").expect("gYear pattern"));
static GYEAR_MONTH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d{4,}-\d{2}(Z|[+-]\d{2}:\d{2})?$").expect("gYearMonth pattern"));
static GMONTH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^--\d{2}(Z|[+-]\d{2}:\d{2})?$").expect("gMonth pattern"));
static GDAY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^---\d{2}(Z|[+-]\d{2}:\d{2})?$").expect("gDay pattern"));
static GMONTH_DAY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^--\d{2}-\d{2}(Z|[+-]\d{2}:\d{2})?$").expect("gMonthDay pattern"));
static LANGUAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z]{1,8}(-[a-zA-Z0-9]{1,8})*$").expect("language pattern"));

// =============================================================================
// Validator Functions
// =============================================================================

fn validate_string(value: &str) -> ValueResult {
    Ok(XsdValue::String(value.to_string()))
}

fn validate_token(value: &str) -> ValueResult {
    if value.starts_with(' ') || value.ends_with(' ') || value.contains("  ") {
        return Err(invalid("leading, trailing or consecutive spaces"));
    }
    Ok(XsdValue::String(value.to_string()))
}

fn validate_language(value: &str) -> ValueResult {
    if !LANGUAGE_RE.is_match(value) {
        return Err(invalid("invalid language code"));
    }
    Ok(XsdValue::String(value.to_string()))
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | '\u{B7}')
}

fn validate_name(value: &str) -> ValueResult {
    let mut chars = value.chars();
    match chars.next() {
        Some(c) if is_name_start(c) || c == ':' => {}
        _ => return Err(invalid("must start with a letter, underscore or colon")),
    }
    if !chars.all(|c| is_name_char(c) || c == ':') {
        return Err(invalid("contains a character not allowed in a name"));
    }
    Ok(XsdValue::String(value.to_string()))
}

fn validate_ncname(value: &str) -> ValueResult {
    if value.contains(':') {
        return Err(invalid("must not contain a colon"));
    }
    let mut chars = value.chars();
    match chars.next() {
        Some(c) if is_name_start(c) => {}
        _ => return Err(invalid("must start with a letter or underscore")),
    }
    if !chars.all(is_name_char) {
        return Err(invalid("contains a character not allowed in a name"));
    }
    Ok(XsdValue::String(value.to_string()))
}

fn validate_nmtoken(value: &str) -> ValueResult {
    if value.is_empty() || !value.chars().all(|c| is_name_char(c) || c == ':') {
        return Err(invalid("not a name token"));
    }
    Ok(XsdValue::String(value.to_string()))
}

fn validate_list_of(value: &str, item: fn(&str) -> ValueResult) -> ValueResult {
    let items = value
        .split_whitespace()
        .map(item)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    if items.is_empty() {
        return Err(invalid("list must not be empty"));
    }
    Ok(XsdValue::List(items))
}

fn validate_nmtokens(value: &str) -> ValueResult {
    validate_list_of(value, validate_nmtoken)
}

fn validate_ncnames(value: &str) -> ValueResult {
    validate_list_of(value, validate_ncname)
}

fn validate_boolean(value: &str) -> ValueResult {
    match value {
        "true" | "1" => Ok(XsdValue::Boolean(true)),
        "false" | "0" => Ok(XsdValue::Boolean(false)),
        _ => Err(invalid("expected 'true', 'false', '1' or '0'")),
    }
}

fn parse_decimal(value: &str) -> std::result::Result<Decimal, ParseError> {
    if !DECIMAL_RE.is_match(value) {
        return Err(invalid("not a decimal number"));
    }
    let mut normalized = value.trim_start_matches('+').to_string();
    if normalized.ends_with('.') {
        normalized.push('0');
    }
    if let Some(rest) = normalized.strip_prefix("-.") {
        normalized = format!("-0.{}", rest);
    } else if normalized.starts_with('.') {
        normalized.insert(0, '0');
    }
    Decimal::from_str(&normalized).map_err(|_| invalid("decimal number out of range"))
}

fn validate_decimal(value: &str) -> ValueResult {
    Ok(XsdValue::Decimal(parse_decimal(value)?))
}

fn integer_in(value: &str, min: Option<Decimal>, max: Option<Decimal>) -> ValueResult {
    if !INTEGER_RE.is_match(value) {
        return Err(invalid("not an integer"));
    }
    let d = parse_decimal(value)?;
    if min.map(|m| d < m).unwrap_or(false) || max.map(|m| d > m).unwrap_or(false) {
        return Err(invalid(format!(
            "value must be within [{}, {}]",
            min.map(|m| m.to_string()).unwrap_or_else(|| "-inf".to_string()),
            max.map(|m| m.to_string()).unwrap_or_else(|| "inf".to_string())
        )));
    }
    Ok(XsdValue::Decimal(d))
}

fn validate_integer(value: &str) -> ValueResult {
    integer_in(value, None, None)
}

fn validate_long(value: &str) -> ValueResult {
    integer_in(value, Some(i64::MIN.into()), Some(i64::MAX.into()))
}

fn validate_int(value: &str) -> ValueResult {
    integer_in(value, Some(i32::MIN.into()), Some(i32::MAX.into()))
}

fn validate_short(value: &str) -> ValueResult {
    integer_in(value, Some(i16::MIN.into()), Some(i16::MAX.into()))
}

fn validate_byte(value: &str) -> ValueResult {
    integer_in(value, Some(i8::MIN.into()), Some(i8::MAX.into()))
}

fn validate_non_negative_integer(value: &str) -> ValueResult {
    integer_in(value, Some(Decimal::ZERO), None)
}

fn validate_positive_integer(value: &str) -> ValueResult {
    integer_in(value, Some(Decimal::ONE), None)
}

fn validate_non_positive_integer(value: &str) -> ValueResult {
    integer_in(value, None, Some(Decimal::ZERO))
}

fn validate_negative_integer(value: &str) -> ValueResult {
    integer_in(value, None, Some(Decimal::NEGATIVE_ONE))
}

fn validate_unsigned_long(value: &str) -> ValueResult {
    integer_in(value, Some(Decimal::ZERO), Some(u64::MAX.into()))
}

fn validate_unsigned_int(value: &str) -> ValueResult {
    integer_in(value, Some(Decimal::ZERO), Some(u32::MAX.into()))
}

fn validate_unsigned_short(value: &str) -> ValueResult {
    integer_in(value, Some(Decimal::ZERO), Some(u16::MAX.into()))
}

fn validate_unsigned_byte(value: &str) -> ValueResult {
    integer_in(value, Some(Decimal::ZERO), Some(u8::MAX.into()))
}

fn parse_float(value: &str) -> std::result::Result<f64, ParseError> {
    match value {
        "INF" => return Ok(f64::INFINITY),
        "-INF" => return Ok(f64::NEG_INFINITY),
        "NaN" => return Ok(f64::NAN),
        _ => {}
    }
    if !FLOAT_RE.is_match(value) {
        return Err(invalid("not a floating point number"));
    }
    value
        .parse::<f64>()
        .map_err(|_| invalid("not a floating point number"))
}

fn validate_float(value: &str) -> ValueResult {
    let f = parse_float(value)?;
    if f.is_finite() && (f as f32).is_infinite() {
        return Err(invalid("value out of range for float"));
    }
    Ok(XsdValue::Float(f))
}

fn validate_double(value: &str) -> ValueResult {
    let f = parse_float(value)?;
    if f.is_infinite() && !value.ends_with("INF") {
        return Err(invalid("value out of range for double"));
    }
    Ok(XsdValue::Float(f))
}

fn date_from_parts(year: &str, month: &str, day: &str) -> std::result::Result<NaiveDate, ParseError> {
    let year: i32 = year.parse().map_err(|_| invalid("year out of range"))?;
    let month: u32 = month.parse().map_err(|_| invalid("invalid month"))?;
    let day: u32 = day.parse().map_err(|_| invalid("invalid day"))?;
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| invalid("no such calendar date"))
}

/// Parse `hh:mm:ss[.fff]`; `24:00:00` is reported as `None` (end of day)
fn parse_time(value: &str) -> std::result::Result<Option<NaiveTime>, ParseError> {
    if value.starts_with("24:") {
        let rest = value.trim_start_matches("24:");
        if rest.chars().all(|c| c == '0' || c == ':' || c == '.') {
            return Ok(None);
        }
        return Err(invalid("hour 24 is only allowed as 24:00:00"));
    }
    NaiveTime::parse_from_str(value, "%H:%M:%S%.f")
        .map(Some)
        .map_err(|_| invalid("invalid time of day"))
}

fn validate_date(value: &str) -> ValueResult {
    let caps = DATE_RE
        .captures(value)
        .ok_or_else(|| invalid("expected YYYY-MM-DD"))?;
    Ok(XsdValue::Date(date_from_parts(&caps[1], &caps[2], &caps[3])?))
}

fn validate_datetime(value: &str) -> ValueResult {
    let caps = DATETIME_RE
        .captures(value)
        .ok_or_else(|| invalid("expected YYYY-MM-DDThh:mm:ss"))?;
    let date = date_from_parts(&caps[1], &caps[2], &caps[3])?;
    let datetime = match parse_time(&caps[4])? {
        Some(time) => date.and_time(time),
        None => date
            .succ_opt()
            .ok_or_else(|| invalid("date out of range"))?
            .and_time(NaiveTime::MIN),
    };
    Ok(XsdValue::DateTime(datetime))
}

fn validate_time(value: &str) -> ValueResult {
    let caps = TIME_RE
        .captures(value)
        .ok_or_else(|| invalid("expected hh:mm:ss"))?;
    Ok(XsdValue::Time(parse_time(&caps[1])?.unwrap_or(NaiveTime::MIN)))
}

fn lexical(re: &Regex, value: &str, what: &str) -> ValueResult {
    if re.is_match(value) {
        Ok(XsdValue::String(value.to_string()))
    } else {
        Err(invalid(format!("invalid {} format", what)))
    }
}

fn validate_duration(value: &str) -> ValueResult {
    if value == "P" || value == "-P" || value.ends_with('T') {
        return Err(invalid("duration needs at least one component"));
    }
    lexical(&DURATION_RE, value, "duration")
}

fn validate_gyear(value: &str) -> ValueResult {
    lexical(&GYEAR_RE, value, "gYear")
}

fn validate_gyear_month(value: &str) -> ValueResult {
    lexical(&GYEAR_MONTH_RE, value, "gYearMonth")
}

fn validate_gmonth(value: &str) -> ValueResult {
    lexical(&GMONTH_RE, value, "gMonth")
}

fn validate_gday(value: &str) -> ValueResult {
    lexical(&GDAY_RE, value, "gDay")
}

fn validate_gmonth_day(value: &str) -> ValueResult {
    lexical(&GMONTH_DAY_RE, value, "gMonthDay")
}

fn validate_hex_binary(value: &str) -> ValueResult {
    if value.len() % 2 != 0 {
        return Err(invalid("hexBinary must have an even number of digits"));
    }
    (0..value.len())
        .step_by(2)
        .map(|i| {
            value
                .get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| invalid("invalid hexadecimal digit"))
        })
        .collect::<std::result::Result<Vec<u8>, _>>()
        .map(XsdValue::Binary)
}

fn validate_base64_binary(value: &str) -> ValueResult {
    let compact: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map(XsdValue::Binary)
        .map_err(|e| invalid(format!("invalid base64 data: {}", e)))
}

fn validate_any_uri(value: &str) -> ValueResult {
    if value.contains(['\n', '\r', '\t']) {
        return Err(invalid("anyURI cannot contain newline or tab characters"));
    }
    Ok(XsdValue::String(value.to_string()))
}

fn validate_qname(value: &str) -> ValueResult {
    match value.split_once(':') {
        Some((prefix, local)) => {
            validate_ncname(prefix)?;
            validate_ncname(local)?;
        }
        None => {
            validate_ncname(value)?;
        }
    }
    Ok(XsdValue::String(value.to_string()))
}

// =============================================================================
// Built-in Type Registry
// =============================================================================

macro_rules! builtin {
    ($name:expr, $base:expr, $ws:ident, $validator:expr) => {
        BuiltinType {
            name: $name,
            base_type: $base,
            white_space: WhiteSpace::$ws,
            validator: $validator,
        }
    };
}

/// Registry of all built-in XSD types
pub static BUILTIN_TYPES: &[BuiltinType] = &[
    builtin!("anyType", None, Preserve, validate_string),
    builtin!("anySimpleType", Some("anyType"), Preserve, validate_string),
    // String types
    builtin!("string", Some("anySimpleType"), Preserve, validate_string),
    builtin!("normalizedString", Some("string"), Replace, validate_string),
    builtin!("token", Some("normalizedString"), Collapse, validate_token),
    builtin!("language", Some("token"), Collapse, validate_language),
    builtin!("Name", Some("token"), Collapse, validate_name),
    builtin!("NCName", Some("Name"), Collapse, validate_ncname),
    builtin!("ID", Some("NCName"), Collapse, validate_ncname),
    builtin!("IDREF", Some("NCName"), Collapse, validate_ncname),
    builtin!("IDREFS", Some("anySimpleType"), Collapse, validate_ncnames),
    builtin!("ENTITY", Some("NCName"), Collapse, validate_ncname),
    builtin!("ENTITIES", Some("anySimpleType"), Collapse, validate_ncnames),
    builtin!("NMTOKEN", Some("token"), Collapse, validate_nmtoken),
    builtin!("NMTOKENS", Some("anySimpleType"), Collapse, validate_nmtokens),
    // Boolean
    builtin!("boolean", Some("anySimpleType"), Collapse, validate_boolean),
    // Numeric types
    builtin!("decimal", Some("anySimpleType"), Collapse, validate_decimal),
    builtin!("integer", Some("decimal"), Collapse, validate_integer),
    builtin!("long", Some("integer"), Collapse, validate_long),
    builtin!("int", Some("long"), Collapse, validate_int),
    builtin!("short", Some("int"), Collapse, validate_short),
    builtin!("byte", Some("short"), Collapse, validate_byte),
    builtin!("nonNegativeInteger", Some("integer"), Collapse, validate_non_negative_integer),
    builtin!("positiveInteger", Some("nonNegativeInteger"), Collapse, validate_positive_integer),
    builtin!("unsignedLong", Some("nonNegativeInteger"), Collapse, validate_unsigned_long),
    builtin!("unsignedInt", Some("unsignedLong"), Collapse, validate_unsigned_int),
    builtin!("unsignedShort", Some("unsignedInt"), Collapse, validate_unsigned_short),
    builtin!("unsignedByte", Some("unsignedShort"), Collapse, validate_unsigned_byte),
    builtin!("nonPositiveInteger", Some("integer"), Collapse, validate_non_positive_integer),
    builtin!("negativeInteger", Some("nonPositiveInteger"), Collapse, validate_negative_integer),
    builtin!("float", Some("anySimpleType"), Collapse, validate_float),
    builtin!("double", Some("anySimpleType"), Collapse, validate_double),
    // Date/time types
    builtin!("duration", Some("anySimpleType"), Collapse, validate_duration),
    builtin!("dateTime", Some("anySimpleType"), Collapse, validate_datetime),
    builtin!("date", Some("anySimpleType"), Collapse, validate_date),
    builtin!("time", Some("anySimpleType"), Collapse, validate_time),
    builtin!("gYear", Some("anySimpleType"), Collapse, validate_gyear),
    builtin!("gYearMonth", Some("anySimpleType"), Collapse, validate_gyear_month),
    builtin!("gMonth", Some("anySimpleType"), Collapse, validate_gmonth),
    builtin!("gDay", Some("anySimpleType"), Collapse, validate_gday),
    builtin!("gMonthDay", Some("anySimpleType"), Collapse, validate_gmonth_day),
    // Binary types
    builtin!("hexBinary", Some("anySimpleType"), Collapse, validate_hex_binary),
    builtin!("base64Binary", Some("anySimpleType"), Collapse, validate_base64_binary),
    // Other types
    builtin!("anyURI", Some("anySimpleType"), Collapse, validate_any_uri),
    builtin!("QName", Some("anySimpleType"), Collapse, validate_qname),
    builtin!("NOTATION", Some("anySimpleType"), Collapse, validate_qname),
];

/// Get a built-in type by name
pub fn get_builtin_type(name: &str) -> Option<&'static BuiltinType> {
    BUILTIN_TYPES.iter().find(|t| t.name == name)
}

/// Validate a value against a built-in type by name
pub fn validate_builtin(type_name: &str, value: &str) -> ValueResult {
    match get_builtin_type(type_name) {
        Some(builtin) => builtin.validate(value),
        None => Err(ParseError::validation(format!(
            "unknown built-in type '{}'",
            type_name
        ))),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_types() {
        assert!(validate_builtin("string", "Hello World").is_ok());
        assert_eq!(
            validate_builtin("token", "  spaced \n out ").unwrap(),
            XsdValue::String("spaced out".to_string())
        );
        assert!(validate_builtin("NCName", "a:b").is_err());
        assert!(validate_builtin("language", "en-GB").is_ok());
    }

    #[test]
    fn test_boolean_type() {
        assert_eq!(validate_builtin("boolean", " 1 ").unwrap(), XsdValue::Boolean(true));
        assert!(validate_builtin("boolean", "yes").is_err());
    }

    #[test]
    fn test_numeric_types() {
        assert!(validate_builtin("integer", "42").is_ok());
        assert!(validate_builtin("integer", "abc").is_err());
        assert!(validate_builtin("integer", "4.2").is_err());
        assert!(validate_builtin("byte", "127").is_ok());
        assert!(validate_builtin("byte", "128").is_err());
        assert!(validate_builtin("unsignedLong", "18446744073709551615").is_ok());
        assert!(validate_builtin("positiveInteger", "0").is_err());
        assert!(validate_builtin("negativeInteger", "-1").is_ok());
    }

    #[test]
    fn test_decimal_lexical_forms() {
        let d = |s: &str| match validate_builtin("decimal", s).unwrap() {
            XsdValue::Decimal(d) => d,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(d("+1.50"), Decimal::from_str("1.5").unwrap());
        assert_eq!(d(".5"), Decimal::from_str("0.5").unwrap());
        assert_eq!(d("-.5"), Decimal::from_str("-0.5").unwrap());
        assert_eq!(d("3."), Decimal::from(3));
        assert!(validate_builtin("decimal", "1e3").is_err());
    }

    #[test]
    fn test_float_types() {
        assert!(validate_builtin("double", "1.5e10").is_ok());
        assert!(validate_builtin("float", "INF").is_ok());
        assert!(validate_builtin("float", "1e40").is_err());
        assert!(validate_builtin("double", "inf").is_err());
    }

    #[test]
    fn test_datetime_types() {
        assert!(validate_builtin("date", "2024-02-29").is_ok());
        assert!(validate_builtin("date", "2023-02-29").is_err());
        assert!(validate_builtin("dateTime", "2024-01-15T10:30:00Z").is_ok());
        assert!(validate_builtin("dateTime", "2024-12-31T24:00:00").is_ok());
        assert!(validate_builtin("time", "25:00:00").is_err());
        assert!(validate_builtin("duration", "P1Y2M3DT4H").is_ok());
        assert!(validate_builtin("duration", "P").is_err());
        assert!(validate_builtin("gYear", "2024").is_ok());
    }

    #[test]
    fn test_binary_types() {
        assert_eq!(
            validate_builtin("hexBinary", "0FB7").unwrap(),
            XsdValue::Binary(vec![0x0F, 0xB7])
        );
        assert!(validate_builtin("hexBinary", "0G").is_err());
        assert_eq!(
            validate_builtin("base64Binary", "aGVs\nbG8=").unwrap(),
            XsdValue::Binary(b"hello".to_vec())
        );
    }

    #[test]
    fn test_list_types() {
        match validate_builtin("NMTOKENS", "a b  c").unwrap() {
            XsdValue::List(items) => assert_eq!(items.len(), 3),
            other => panic!("unexpected {:?}", other),
        }
        assert!(validate_builtin("IDREFS", "").is_err());
    }

    #[test]
    fn test_derivation_chain() {
        let byte = get_builtin_type("byte").unwrap();
        assert!(byte.derives_from("integer"));
        assert!(byte.derives_from("decimal"));
        assert!(!byte.derives_from("string"));
    }

    #[test]
    fn test_error_message_names_type() {
        let err = validate_builtin("integer", "abc").unwrap_err();
        assert!(err.message.contains("'abc' is not a valid value for 'integer'"));
    }

    #[test]
    fn test_compare_values() {
        let a = validate_builtin("date", "2024-01-01").unwrap();
        let b = validate_builtin("date", "2024-06-01").unwrap();
        assert_eq!(a.compare(&b), Some(Ordering::Less));
        assert_eq!(a.compare(&XsdValue::Boolean(true)), None);
    }
}
