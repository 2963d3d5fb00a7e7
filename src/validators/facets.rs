//! XSD constraining facets
//!
//! A restriction step collects its facets into one [`Facets`] value. The
//! value is checked after the base type accepted the lexical form, so
//! bounds and enumerations compare typed values where the base type has an
//! order or an equality.

use crate::error::{ParseError, Result};
use crate::validators::builtins::{ValueResult, XsdValue};
use regex::Regex;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::str::FromStr;

/// White space facet values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhiteSpace {
    /// Preserve all white space
    Preserve,
    /// Replace tabs and newlines with spaces
    Replace,
    /// Replace and collapse multiple spaces
    Collapse,
}

impl FromStr for WhiteSpace {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "preserve" => Ok(WhiteSpace::Preserve),
            "replace" => Ok(WhiteSpace::Replace),
            "collapse" => Ok(WhiteSpace::Collapse),
            _ => Err(crate::error::Error::configuration(format!(
                "invalid whiteSpace value '{}': must be 'preserve', 'replace' or 'collapse'",
                s
            ))),
        }
    }
}

impl WhiteSpace {
    /// Normalize a string according to this white space mode
    pub fn normalize(&self, s: &str) -> String {
        match self {
            WhiteSpace::Preserve => s.to_string(),
            WhiteSpace::Replace => s.replace(['\t', '\n', '\r'], " "),
            WhiteSpace::Collapse => s.split_whitespace().collect::<Vec<_>>().join(" "),
        }
    }
}

/// A compiled `pattern` facet
#[derive(Debug, Clone)]
pub struct PatternFacet {
    /// Pattern as written in the schema
    pub source: String,
    regex: Regex,
}

impl PatternFacet {
    /// Compile an XSD regular expression; the match is always anchored
    pub fn new(source: &str) -> Result<Self> {
        let translated = translate_pattern(source);
        let regex = Regex::new(&format!("^(?:{})$", translated)).map_err(|e| {
            crate::error::Error::configuration(format!("invalid pattern '{}': {}", source, e))
        })?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    /// Whether the value matches
    pub fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}

/// Rewrite the XSD-only escapes into their regex crate equivalents
fn translate_pattern(source: &str) -> String {
    const NAME_START: &str = r"_:A-Za-z\p{L}";
    const NAME_CHAR: &str = r"\-._:A-Za-z0-9\p{L}\p{Nd}\p{Mn}";

    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut in_class = false;
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('i') if in_class => out.push_str(NAME_START),
                Some('c') if in_class => out.push_str(NAME_CHAR),
                Some('i') => out.push_str(&format!("[{}]", NAME_START)),
                Some('I') => out.push_str(&format!("[^{}]", NAME_START)),
                Some('c') => out.push_str(&format!("[{}]", NAME_CHAR)),
                Some('C') => out.push_str(&format!("[^{}]", NAME_CHAR)),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            },
            '[' => {
                in_class = true;
                out.push(c);
            }
            ']' => {
                in_class = false;
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

/// Facets declared by one restriction step
#[derive(Debug, Clone, Default)]
pub struct Facets {
    /// whiteSpace
    pub white_space: Option<WhiteSpace>,
    /// length
    pub length: Option<usize>,
    /// minLength
    pub min_length: Option<usize>,
    /// maxLength
    pub max_length: Option<usize>,
    /// pattern; alternatives declared in the same step
    pub patterns: Vec<PatternFacet>,
    /// enumeration
    pub enumeration: Vec<String>,
    /// minInclusive
    pub min_inclusive: Option<String>,
    /// maxInclusive
    pub max_inclusive: Option<String>,
    /// minExclusive
    pub min_exclusive: Option<String>,
    /// maxExclusive
    pub max_exclusive: Option<String>,
    /// totalDigits
    pub total_digits: Option<u32>,
    /// fractionDigits
    pub fraction_digits: Option<u32>,
}

impl Facets {
    /// Whether no facet is set
    pub fn is_empty(&self) -> bool {
        self.white_space.is_none()
            && self.length.is_none()
            && self.min_length.is_none()
            && self.max_length.is_none()
            && self.patterns.is_empty()
            && self.enumeration.is_empty()
            && self.min_inclusive.is_none()
            && self.max_inclusive.is_none()
            && self.min_exclusive.is_none()
            && self.max_exclusive.is_none()
            && self.total_digits.is_none()
            && self.fraction_digits.is_none()
    }

    /// Record a facet element by its local name
    pub fn set(&mut self, facet: &str, value: &str) -> Result<()> {
        let count = |v: &str| {
            v.trim().parse::<usize>().map_err(|_| {
                crate::error::Error::configuration(format!(
                    "facet '{}' needs a non-negative integer, got '{}'",
                    facet, v
                ))
            })
        };
        match facet {
            "whiteSpace" => self.white_space = Some(value.trim().parse()?),
            "length" => self.length = Some(count(value)?),
            "minLength" => self.min_length = Some(count(value)?),
            "maxLength" => self.max_length = Some(count(value)?),
            "pattern" => self.patterns.push(PatternFacet::new(value)?),
            "enumeration" => self.enumeration.push(value.to_string()),
            "minInclusive" => self.min_inclusive = Some(value.to_string()),
            "maxInclusive" => self.max_inclusive = Some(value.to_string()),
            "minExclusive" => self.min_exclusive = Some(value.to_string()),
            "maxExclusive" => self.max_exclusive = Some(value.to_string()),
            "totalDigits" => self.total_digits = Some(count(value)? as u32),
            "fractionDigits" => self.fraction_digits = Some(count(value)? as u32),
            other => {
                return Err(crate::error::Error::configuration(format!(
                    "unsupported facet '{}'",
                    other
                )))
            }
        }
        Ok(())
    }

    /// Check a value the base type already accepted
    ///
    /// `base` re-validates facet operands (bounds, enumeration members)
    /// with the base type so they compare as typed values.
    pub fn check(
        &self,
        lexical: &str,
        value: &XsdValue,
        base: &dyn Fn(&str) -> ValueResult,
    ) -> std::result::Result<(), ParseError> {
        let length = value.length(lexical);
        if let Some(expected) = self.length {
            if length != expected {
                return Err(violation(lexical, format!("length must be {}", expected)));
            }
        }
        if let Some(min) = self.min_length {
            if length < min {
                return Err(violation(lexical, format!("length must be at least {}", min)));
            }
        }
        if let Some(max) = self.max_length {
            if length > max {
                return Err(violation(lexical, format!("length must be at most {}", max)));
            }
        }

        if !self.patterns.is_empty() && !self.patterns.iter().any(|p| p.is_match(lexical)) {
            let sources: Vec<&str> = self.patterns.iter().map(|p| p.source.as_str()).collect();
            return Err(violation(
                lexical,
                format!("value does not match pattern '{}'", sources.join("' or '")),
            ));
        }

        if !self.enumeration.is_empty() {
            let found = self.enumeration.iter().any(|member| {
                member == lexical || base(member).map(|m| &m == value).unwrap_or(false)
            });
            if !found {
                return Err(violation(
                    lexical,
                    format!("value must be one of [{}]", self.enumeration.join(", ")),
                ));
            }
        }

        let bounds = [
            (&self.min_inclusive, "minInclusive", &[Ordering::Greater, Ordering::Equal][..]),
            (&self.max_inclusive, "maxInclusive", &[Ordering::Less, Ordering::Equal][..]),
            (&self.min_exclusive, "minExclusive", &[Ordering::Greater][..]),
            (&self.max_exclusive, "maxExclusive", &[Ordering::Less][..]),
        ];
        for (bound, name, allowed) in bounds {
            if let Some(bound) = bound {
                let limit = base(bound)?;
                match value.compare(&limit) {
                    Some(ord) if allowed.contains(&ord) => {}
                    _ => {
                        return Err(violation(lexical, format!("{} is {}", name, bound)));
                    }
                }
            }
        }

        if self.total_digits.is_some() || self.fraction_digits.is_some() {
            if let XsdValue::Decimal(d) = value {
                let (total, fraction) = digit_counts(d);
                if let Some(max) = self.total_digits {
                    if total > max {
                        return Err(violation(lexical, format!("at most {} digits allowed", max)));
                    }
                }
                if let Some(max) = self.fraction_digits {
                    if fraction > max {
                        return Err(violation(
                            lexical,
                            format!("at most {} fraction digits allowed", max),
                        ));
                    }
                }
            }
        }

        Ok(())
    }
}

fn violation(lexical: &str, reason: String) -> ParseError {
    ParseError::validation(format!("value '{}' is not facet-valid: {}", lexical, reason))
}

/// Significant total and fraction digits of a decimal
fn digit_counts(d: &Decimal) -> (u32, u32) {
    let normalized = d.normalize();
    let fraction = normalized.scale();
    let digits = normalized
        .mantissa()
        .unsigned_abs()
        .to_string()
        .trim_start_matches('0')
        .len() as u32;
    (digits.max(fraction).max(1), fraction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::builtins::validate_builtin;

    fn check(facets: &Facets, type_name: &str, lexical: &str) -> bool {
        let value = match validate_builtin(type_name, lexical) {
            Ok(v) => v,
            Err(_) => return false,
        };
        facets
            .check(lexical, &value, &|s| validate_builtin(type_name, s))
            .is_ok()
    }

    #[test]
    fn test_white_space_normalize() {
        assert_eq!(WhiteSpace::Replace.normalize("a\tb\nc"), "a b c");
        assert_eq!(WhiteSpace::Collapse.normalize("  a \t b  "), "a b");
        assert_eq!(WhiteSpace::Preserve.normalize(" a "), " a ");
        assert!("sometimes".parse::<WhiteSpace>().is_err());
    }

    #[test]
    fn test_length_facets() {
        let mut facets = Facets::default();
        facets.set("minLength", "2").unwrap();
        facets.set("maxLength", "4").unwrap();
        assert!(check(&facets, "string", "abc"));
        assert!(!check(&facets, "string", "a"));
        assert!(!check(&facets, "string", "abcde"));
    }

    #[test]
    fn test_pattern_is_anchored() {
        let mut facets = Facets::default();
        facets.set("pattern", "[A-Z]{3}").unwrap();
        assert!(check(&facets, "string", "ABC"));
        assert!(!check(&facets, "string", "xABCx"));
    }

    #[test]
    fn test_pattern_name_escapes() {
        let pattern = PatternFacet::new(r"\i\c*").unwrap();
        assert!(pattern.is_match("item-1"));
        assert!(!pattern.is_match("1item"));
    }

    #[test]
    fn test_enumeration_compares_values() {
        let mut facets = Facets::default();
        facets.set("enumeration", "1").unwrap();
        facets.set("enumeration", "2.5").unwrap();
        assert!(check(&facets, "decimal", "1.0"));
        assert!(check(&facets, "decimal", "2.50"));
        assert!(!check(&facets, "decimal", "3"));
    }

    #[test]
    fn test_bounds() {
        let mut facets = Facets::default();
        facets.set("minInclusive", "0").unwrap();
        facets.set("maxExclusive", "100").unwrap();
        assert!(check(&facets, "integer", "0"));
        assert!(check(&facets, "integer", "99"));
        assert!(!check(&facets, "integer", "100"));
        assert!(!check(&facets, "integer", "-1"));
    }

    #[test]
    fn test_date_bounds() {
        let mut facets = Facets::default();
        facets.set("minInclusive", "2000-01-01").unwrap();
        assert!(check(&facets, "date", "2024-05-01"));
        assert!(!check(&facets, "date", "1999-12-31"));
    }

    #[test]
    fn test_digits() {
        let mut facets = Facets::default();
        facets.set("totalDigits", "5").unwrap();
        facets.set("fractionDigits", "2").unwrap();
        assert!(check(&facets, "decimal", "123.45"));
        assert!(check(&facets, "decimal", "1.500"));
        assert!(!check(&facets, "decimal", "1234.56"));
        assert!(!check(&facets, "decimal", "1.234"));
    }

    #[test]
    fn test_unknown_facet() {
        let mut facets = Facets::default();
        assert!(facets.set("assertion", "true()").is_err());
        assert!(facets.set("length", "-1").is_err());
        assert!(facets.is_empty());
    }
}
