//! Single-property predicates: one comparison of a descriptor property
//! against one or two operand values.
//!
//! Operators are a closed enum per value type; string forms exist only at
//! the serialisation boundary (see `graph`). Validation happens at
//! construction, evaluation is infallible.

use std::fmt;

use crate::services::files::descriptor::FileDescriptor;
use crate::services::files::format::FormatTag;
use crate::services::query::operand::Operand;
use crate::types::errors::{CoreError, CoreResult};

/// Span added to a day-start timestamp to reach `23:59:59.9999`.
const DAY_SPAN: f64 = 86399.9999;
const DAY_SECONDS: f64 = 86400.0;

/// Property a predicate compares. A superset of the sortable descriptor
/// properties: ratio and pixel count are derived from the image size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredicateProperty {
    FileName,
    FilePath,
    FileSize,
    FileDate,
    FileFormat,
    ImageWidth,
    ImageHeight,
    ImageRatio,
    ImagePixels,
}

impl PredicateProperty {
    pub fn as_str(&self) -> &'static str {
        match self {
            PredicateProperty::FileName => "fileName",
            PredicateProperty::FilePath => "filePath",
            PredicateProperty::FileSize => "fileSize",
            PredicateProperty::FileDate => "fileDate",
            PredicateProperty::FileFormat => "fileFormat",
            PredicateProperty::ImageWidth => "imageWidth",
            PredicateProperty::ImageHeight => "imageHeight",
            PredicateProperty::ImageRatio => "imageRatio",
            PredicateProperty::ImagePixels => "imagePixels",
        }
    }

    /// True when the property has no defined value on directory rows;
    /// such predicates always pass for directories so the rows stay
    /// visible in results.
    fn undefined_for_directories(&self) -> bool {
        !matches!(
            self,
            PredicateProperty::FileName | PredicateProperty::FilePath | PredicateProperty::FileDate
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredicateOperator {
    Eq,
    Neq,
    Lt,
    Gt,
    Le,
    Ge,
    In,
    NotIn,
    Between,
    NotBetween,
    Match,
    NotMatch,
}

impl PredicateOperator {
    /// Parse the wire/operator syntax. `!=` is an alias for `<>`.
    pub fn parse(value: &str) -> CoreResult<PredicateOperator> {
        match value.to_ascii_lowercase().as_str() {
            "=" => Ok(PredicateOperator::Eq),
            "<>" | "!=" => Ok(PredicateOperator::Neq),
            "<" => Ok(PredicateOperator::Lt),
            ">" => Ok(PredicateOperator::Gt),
            "<=" => Ok(PredicateOperator::Le),
            ">=" => Ok(PredicateOperator::Ge),
            "in" => Ok(PredicateOperator::In),
            "not in" => Ok(PredicateOperator::NotIn),
            "between" => Ok(PredicateOperator::Between),
            "not between" => Ok(PredicateOperator::NotBetween),
            "match" => Ok(PredicateOperator::Match),
            "not match" => Ok(PredicateOperator::NotMatch),
            other => Err(CoreError::InvalidRule(format!(
                "unknown operator: {other:?}"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PredicateOperator::Eq => "=",
            PredicateOperator::Neq => "<>",
            PredicateOperator::Lt => "<",
            PredicateOperator::Gt => ">",
            PredicateOperator::Le => "<=",
            PredicateOperator::Ge => ">=",
            PredicateOperator::In => "in",
            PredicateOperator::NotIn => "not in",
            PredicateOperator::Between => "between",
            PredicateOperator::NotBetween => "not between",
            PredicateOperator::Match => "match",
            PredicateOperator::NotMatch => "not match",
        }
    }

    fn is_ordering(&self) -> bool {
        matches!(
            self,
            PredicateOperator::Eq
                | PredicateOperator::Neq
                | PredicateOperator::Lt
                | PredicateOperator::Gt
                | PredicateOperator::Le
                | PredicateOperator::Ge
        )
    }
}

/// Optional evaluation modifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PredicateFlags {
    pub case_insensitive: bool,
    /// Compare dates at day granularity. Upper bounds are pushed to
    /// `23:59:59.9999`; see the expansion table in the constructor.
    pub date_only: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    property: PredicateProperty,
    operator: PredicateOperator,
    operand: Operand,
    flags: PredicateFlags,
}

impl Predicate {
    /// Build a predicate, validating that the operator belongs to the
    /// operator set of the property's value type and that the operand
    /// shape matches the operator (`in` wants a list, `between` a range).
    ///
    /// Date-only predicates are expanded here, against day-start operand
    /// timestamps:
    ///
    /// | operator | applied condition |
    /// |---|---|
    /// | `>`, `>=` | against `D 00:00:00` |
    /// | `<` | against `D 00:00:00` |
    /// | `<=` | against `D 23:59:59.9999` |
    /// | `=` | `>= D 00:00:00` and `<= D 23:59:59.9999` |
    /// | `<>` | negation of `=` |
    /// | `between (D1, D2)` | `>= D1 00:00:00` and `<= D2 23:59:59.9999` |
    /// | `not between` | negation |
    pub fn new(
        property: PredicateProperty,
        operator: PredicateOperator,
        operand: Operand,
        flags: PredicateFlags,
    ) -> CoreResult<Predicate> {
        check_operator(property, operator)?;
        check_operand(property, operator, &operand)?;

        let (operator, operand) = if flags.date_only && property == PredicateProperty::FileDate {
            expand_date_only(operator, operand)
        } else {
            (operator, operand)
        };

        Ok(Predicate {
            property,
            operator,
            operand,
            flags,
        })
    }

    pub fn property(&self) -> PredicateProperty {
        self.property
    }

    pub fn operator(&self) -> PredicateOperator {
        self.operator
    }

    pub fn operand(&self) -> &Operand {
        &self.operand
    }

    /// Evaluate against one descriptor. Directories pass automatically on
    /// properties they do not define.
    pub fn eval(&self, file: &FileDescriptor) -> bool {
        if file.is_directory() && self.property.undefined_for_directories() {
            return true;
        }

        match self.property {
            PredicateProperty::FileName => self.eval_text(file.name()),
            PredicateProperty::FilePath => self.eval_text(file.path()),
            PredicateProperty::FileSize => self.eval_int(file.size() as i64),
            PredicateProperty::ImageWidth => self.eval_int(file.image_size().0 as i64),
            PredicateProperty::ImageHeight => self.eval_int(file.image_size().1 as i64),
            PredicateProperty::ImagePixels => match file.image_pixels() {
                Some(pixels) => self.eval_int(pixels),
                None => false,
            },
            PredicateProperty::ImageRatio => match file.image_ratio() {
                Some(ratio) => self.eval_float(ratio),
                None => false,
            },
            PredicateProperty::FileDate => self.eval_date(file.modified()),
            PredicateProperty::FileFormat => self.eval_format(file.format()),
        }
    }

    fn eval_text(&self, value: &str) -> bool {
        match (&self.operator, &self.operand) {
            (PredicateOperator::Match, Operand::Regex(regex)) => regex.is_match(value),
            (PredicateOperator::NotMatch, Operand::Regex(regex)) => !regex.is_match(value),
            (PredicateOperator::Eq, Operand::Str(expected)) => self.text_eq(value, expected),
            (PredicateOperator::Neq, Operand::Str(expected)) => !self.text_eq(value, expected),
            (PredicateOperator::In, Operand::List(items)) => items
                .iter()
                .any(|item| matches!(item, Operand::Str(s) if self.text_eq(value, s))),
            (PredicateOperator::NotIn, Operand::List(items)) => !items
                .iter()
                .any(|item| matches!(item, Operand::Str(s) if self.text_eq(value, s))),
            _ => false,
        }
    }

    fn text_eq(&self, left: &str, right: &str) -> bool {
        if self.flags.case_insensitive {
            left.eq_ignore_ascii_case(right)
        } else {
            left == right
        }
    }

    fn eval_int(&self, value: i64) -> bool {
        match (&self.operator, &self.operand) {
            (PredicateOperator::Eq, Operand::Int(v)) => value == *v,
            (PredicateOperator::Neq, Operand::Int(v)) => value != *v,
            (PredicateOperator::Lt, Operand::Int(v)) => value < *v,
            (PredicateOperator::Gt, Operand::Int(v)) => value > *v,
            (PredicateOperator::Le, Operand::Int(v)) => value <= *v,
            (PredicateOperator::Ge, Operand::Int(v)) => value >= *v,
            (PredicateOperator::In, Operand::List(items)) => {
                items.iter().any(|i| matches!(i, Operand::Int(v) if value == *v))
            }
            (PredicateOperator::NotIn, Operand::List(items)) => {
                !items.iter().any(|i| matches!(i, Operand::Int(v) if value == *v))
            }
            (PredicateOperator::Between, Operand::Range(low, high)) => {
                int_of(low).is_some_and(|lo| value >= lo)
                    && int_of(high).is_some_and(|hi| value <= hi)
            }
            (PredicateOperator::NotBetween, Operand::Range(low, high)) => {
                !(int_of(low).is_some_and(|lo| value >= lo)
                    && int_of(high).is_some_and(|hi| value <= hi))
            }
            _ => false,
        }
    }

    fn eval_float(&self, value: f64) -> bool {
        match (&self.operator, &self.operand) {
            (PredicateOperator::Eq, Operand::Float(v)) => value == *v,
            (PredicateOperator::Neq, Operand::Float(v)) => value != *v,
            (PredicateOperator::Lt, Operand::Float(v)) => value < *v,
            (PredicateOperator::Gt, Operand::Float(v)) => value > *v,
            (PredicateOperator::Le, Operand::Float(v)) => value <= *v,
            (PredicateOperator::Ge, Operand::Float(v)) => value >= *v,
            (PredicateOperator::In, Operand::List(items)) => items
                .iter()
                .any(|i| matches!(i, Operand::Float(v) if value == *v)),
            (PredicateOperator::NotIn, Operand::List(items)) => !items
                .iter()
                .any(|i| matches!(i, Operand::Float(v) if value == *v)),
            (PredicateOperator::Between, Operand::Range(low, high)) => {
                float_of(low).is_some_and(|lo| value >= lo)
                    && float_of(high).is_some_and(|hi| value <= hi)
            }
            (PredicateOperator::NotBetween, Operand::Range(low, high)) => {
                !(float_of(low).is_some_and(|lo| value >= lo)
                    && float_of(high).is_some_and(|hi| value <= hi))
            }
            _ => false,
        }
    }

    fn eval_date(&self, value: f64) -> bool {
        match (&self.operator, &self.operand) {
            (PredicateOperator::Eq, Operand::Date(v)) => value == *v,
            (PredicateOperator::Neq, Operand::Date(v)) => value != *v,
            (PredicateOperator::Lt, Operand::Date(v)) => value < *v,
            (PredicateOperator::Gt, Operand::Date(v)) => value > *v,
            (PredicateOperator::Le, Operand::Date(v)) => value <= *v,
            (PredicateOperator::Ge, Operand::Date(v)) => value >= *v,
            (PredicateOperator::In, Operand::List(items)) => {
                let value = self.date_for_membership(value);
                items
                    .iter()
                    .any(|i| matches!(i, Operand::Date(v) if value == *v))
            }
            (PredicateOperator::NotIn, Operand::List(items)) => {
                let value = self.date_for_membership(value);
                !items
                    .iter()
                    .any(|i| matches!(i, Operand::Date(v) if value == *v))
            }
            (PredicateOperator::Between, Operand::Range(low, high)) => {
                date_of(low).is_some_and(|lo| value >= lo)
                    && date_of(high).is_some_and(|hi| value <= hi)
            }
            (PredicateOperator::NotBetween, Operand::Range(low, high)) => {
                !(date_of(low).is_some_and(|lo| value >= lo)
                    && date_of(high).is_some_and(|hi| value <= hi))
            }
            _ => false,
        }
    }

    /// Membership tests on date-only predicates compare at day
    /// granularity; bounds were already expanded for the ordering
    /// operators.
    fn date_for_membership(&self, value: f64) -> f64 {
        if self.flags.date_only {
            value - value.rem_euclid(DAY_SECONDS)
        } else {
            value
        }
    }

    fn eval_format(&self, value: FormatTag) -> bool {
        match (&self.operator, &self.operand) {
            (PredicateOperator::Eq, Operand::Format(v)) => value == *v,
            (PredicateOperator::Neq, Operand::Format(v)) => value != *v,
            (PredicateOperator::In, Operand::List(items)) => items
                .iter()
                .any(|i| matches!(i, Operand::Format(v) if value == *v)),
            (PredicateOperator::NotIn, Operand::List(items)) => !items
                .iter()
                .any(|i| matches!(i, Operand::Format(v) if value == *v)),
            _ => false,
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.property.as_str(),
            self.operator.as_str(),
            self.operand
        )
    }
}

fn int_of(operand: &Operand) -> Option<i64> {
    match operand {
        Operand::Int(v) => Some(*v),
        _ => None,
    }
}

fn float_of(operand: &Operand) -> Option<f64> {
    match operand {
        Operand::Float(v) => Some(*v),
        _ => None,
    }
}

fn date_of(operand: &Operand) -> Option<f64> {
    match operand {
        Operand::Date(v) => Some(*v),
        _ => None,
    }
}

/// Operator set allowed per property value type.
fn check_operator(property: PredicateProperty, operator: PredicateOperator) -> CoreResult<()> {
    let allowed = match property {
        PredicateProperty::FileName | PredicateProperty::FilePath => matches!(
            operator,
            PredicateOperator::Match
                | PredicateOperator::NotMatch
                | PredicateOperator::Eq
                | PredicateOperator::Neq
                | PredicateOperator::In
                | PredicateOperator::NotIn
        ),
        PredicateProperty::FileFormat => matches!(
            operator,
            PredicateOperator::Eq
                | PredicateOperator::Neq
                | PredicateOperator::In
                | PredicateOperator::NotIn
        ),
        PredicateProperty::FileSize
        | PredicateProperty::FileDate
        | PredicateProperty::ImageWidth
        | PredicateProperty::ImageHeight
        | PredicateProperty::ImageRatio
        | PredicateProperty::ImagePixels => {
            operator.is_ordering()
                || matches!(
                    operator,
                    PredicateOperator::In
                        | PredicateOperator::NotIn
                        | PredicateOperator::Between
                        | PredicateOperator::NotBetween
                )
        }
    };
    if allowed {
        Ok(())
    } else {
        Err(CoreError::InvalidRule(format!(
            "operator {:?} is not valid for property {}",
            operator.as_str(),
            property.as_str()
        )))
    }
}

/// Operand shape and element types must line up with the operator and the
/// property's value type.
fn check_operand(
    property: PredicateProperty,
    operator: PredicateOperator,
    operand: &Operand,
) -> CoreResult<()> {
    let scalar_ok = |op: &Operand| -> bool {
        match property {
            PredicateProperty::FileName | PredicateProperty::FilePath => {
                matches!(op, Operand::Str(_))
            }
            PredicateProperty::FileFormat => matches!(op, Operand::Format(_)),
            PredicateProperty::FileDate => matches!(op, Operand::Date(_)),
            PredicateProperty::ImageRatio => matches!(op, Operand::Float(_)),
            PredicateProperty::FileSize
            | PredicateProperty::ImageWidth
            | PredicateProperty::ImageHeight
            | PredicateProperty::ImagePixels => matches!(op, Operand::Int(_)),
        }
    };

    let shape_ok = match operator {
        PredicateOperator::In | PredicateOperator::NotIn => match operand {
            Operand::List(items) => !items.is_empty() && items.iter().all(scalar_ok),
            _ => false,
        },
        PredicateOperator::Between | PredicateOperator::NotBetween => match operand {
            Operand::Range(low, high) => scalar_ok(low) && scalar_ok(high),
            _ => false,
        },
        PredicateOperator::Match | PredicateOperator::NotMatch => {
            matches!(operand, Operand::Regex(_))
        }
        _ => scalar_ok(operand),
    };

    if shape_ok {
        Ok(())
    } else {
        Err(CoreError::InvalidRule(format!(
            "operand {} does not fit operator {:?} on property {}",
            operand.type_name(),
            operator.as_str(),
            property.as_str()
        )))
    }
}

/// Apply the date-only expansion table. Operand timestamps are day-start.
fn expand_date_only(
    operator: PredicateOperator,
    operand: Operand,
) -> (PredicateOperator, Operand) {
    match (operator, operand) {
        (PredicateOperator::Le, Operand::Date(v)) => {
            (PredicateOperator::Le, Operand::Date(v + DAY_SPAN))
        }
        (PredicateOperator::Eq, Operand::Date(v)) => (
            PredicateOperator::Between,
            Operand::Range(
                Box::new(Operand::Date(v)),
                Box::new(Operand::Date(v + DAY_SPAN)),
            ),
        ),
        (PredicateOperator::Neq, Operand::Date(v)) => (
            PredicateOperator::NotBetween,
            Operand::Range(
                Box::new(Operand::Date(v)),
                Box::new(Operand::Date(v + DAY_SPAN)),
            ),
        ),
        (PredicateOperator::Between, Operand::Range(low, high)) => {
            let high = match *high {
                Operand::Date(v) => Operand::Date(v + DAY_SPAN),
                other => other,
            };
            (
                PredicateOperator::Between,
                Operand::Range(low, Box::new(high)),
            )
        }
        (PredicateOperator::NotBetween, Operand::Range(low, high)) => {
            let high = match *high {
                Operand::Date(v) => Operand::Date(v + DAY_SPAN),
                other => other,
            };
            (
                PredicateOperator::NotBetween,
                Operand::Range(low, Box::new(high)),
            )
        }
        (operator, operand) => (operator, operand),
    }
}

#[cfg(test)]
#[path = "tests/predicate_tests.rs"]
mod tests;
