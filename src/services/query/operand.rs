//! Predicate operand values: a closed sum type dispatched by pattern
//! match. String operator syntax lives at the serialisation boundary.

use std::fmt;

use regex::Regex;

use crate::services::files::format::FormatTag;
use crate::types::errors::{CoreError, CoreResult};

/// A compiled regular expression that remembers its source pattern, so
/// operands stay comparable and printable.
#[derive(Debug, Clone)]
pub struct RegexOperand {
    pattern: String,
    regex: Regex,
}

impl RegexOperand {
    /// Compile `pattern`; `case_insensitive` builds the regex with `(?i)`.
    pub fn new(pattern: &str, case_insensitive: bool) -> CoreResult<RegexOperand> {
        let source = if case_insensitive {
            format!("(?i){pattern}")
        } else {
            pattern.to_string()
        };
        let regex = Regex::new(&source)
            .map_err(|e| CoreError::InvalidRule(format!("invalid pattern {pattern:?}: {e}")))?;
        Ok(RegexOperand {
            pattern: pattern.to_string(),
            regex,
        })
    }

    /// Escape `value` and anchor it, mapping the wildcard characters
    /// `?`/`*` to `.`/`.*`.
    pub fn from_wildcard(value: &str, case_insensitive: bool) -> CoreResult<RegexOperand> {
        let escaped = regex::escape(value).replace(r"\?", ".").replace(r"\*", ".*");
        RegexOperand::new(&format!("^{escaped}$"), case_insensitive)
    }

    /// Escape `value` and anchor it verbatim. Used for plain string
    /// equality on names and paths.
    pub fn from_literal(value: &str, case_insensitive: bool) -> CoreResult<RegexOperand> {
        let escaped = regex::escape(value);
        RegexOperand::new(&format!("^{escaped}$"), case_insensitive)
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}

impl PartialEq for RegexOperand {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}

/// One or two comparison values attached to a predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Int(i64),
    Float(f64),
    /// POSIX timestamp.
    Date(f64),
    Str(String),
    Format(FormatTag),
    Regex(RegexOperand),
    List(Vec<Operand>),
    Range(Box<Operand>, Box<Operand>),
}

impl Operand {
    pub fn type_name(&self) -> &'static str {
        match self {
            Operand::Int(_) => "int",
            Operand::Float(_) => "float",
            Operand::Date(_) => "date",
            Operand::Str(_) => "string",
            Operand::Format(_) => "format",
            Operand::Regex(_) => "regex",
            Operand::List(_) => "list",
            Operand::Range(_, _) => "range",
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Int(v) => write!(f, "{v}"),
            Operand::Float(v) => write!(f, "{v:.4}"),
            Operand::Date(v) => write!(f, "{v}"),
            Operand::Str(v) => write!(f, "\"{v}\""),
            Operand::Format(v) => write!(f, "\"{}\"", v.as_str()),
            Operand::Regex(v) => write!(f, "\"{}\"", v.pattern()),
            Operand::List(items) => {
                let rendered: Vec<String> = items.iter().map(|i| i.to_string()).collect();
                write!(f, "[{}]", rendered.join(", "))
            }
            Operand::Range(low, high) => write!(f, "({low}, {high})"),
        }
    }
}

/// Parse a byte size with an optional unit suffix into bytes.
///
/// Decimal units use powers of 1000, binary units powers of 1024:
/// `B`/`KB`/`KiB`/`MB`/`MiB`/`GB`/`GiB`. A bare number is bytes.
pub fn parse_byte_size(value: &str) -> CoreResult<i64> {
    let trimmed = value.trim();
    let split = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-'))
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split);
    let number: f64 = number
        .parse()
        .map_err(|_| CoreError::InvalidRule(format!("invalid size: {value:?}")))?;

    let multiplier: f64 = match unit.trim().to_ascii_uppercase().as_str() {
        "" | "B" => 1.0,
        "KB" => 1000.0,
        "KIB" => 1024.0,
        "MB" => 1000.0 * 1000.0,
        "MIB" => 1024.0 * 1024.0,
        "GB" => 1000.0 * 1000.0 * 1000.0,
        "GIB" => 1024.0 * 1024.0 * 1024.0,
        other => {
            return Err(CoreError::InvalidRule(format!(
                "unknown size unit: {other:?}"
            )))
        }
    };

    Ok((number * multiplier).round() as i64)
}

#[cfg(test)]
#[path = "tests/operand_tests.rs"]
mod tests;
