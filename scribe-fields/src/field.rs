//! Field descriptors: default policy, validation and wire output.
//!
//! A `FieldDef` pairs a `FieldKind` with an optional default and an optional
//! custom coercion. Validation turns any raw `FieldValue` into the kind's
//! canonical value or fails with `FieldsError::Validation`; `output` renders
//! the canonical value in its wire form.

use std::fmt;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

use crate::error::{FieldsError, Result};
use crate::types::{FieldKind, FieldValue, DATETIME_FORMAT, DATE_FORMAT};

static DATE_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{1,2}-\d{1,2}$").expect("Failed to compile date shape regex")
});

static DATETIME_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{1,2}-\d{1,2} \d{1,2}:\d{1,2}:\d{1,2}$")
        .expect("Failed to compile datetime shape regex")
});

/// A custom coercion attached to a descriptor, replacing its kind's rules.
pub type Coercion = Arc<dyn Fn(FieldValue) -> Result<FieldValue> + Send + Sync>;

/// Default value policy for a field.
#[derive(Clone)]
pub enum FieldDefault {
    /// A fixed value, cloned on every request.
    Literal(FieldValue),
    /// A producer evaluated fresh on every request.
    Producer(Arc<dyn Fn() -> FieldValue + Send + Sync>),
}

impl FieldDefault {
    pub fn get(&self) -> FieldValue {
        match self {
            Self::Literal(value) => value.clone(),
            Self::Producer(produce) => produce(),
        }
    }
}

impl fmt::Debug for FieldDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Self::Producer(_) => f.write_str("Producer(..)"),
        }
    }
}

/// A field descriptor: the typed policy for one named attribute of a record.
#[derive(Clone)]
pub struct FieldDef {
    kind: FieldKind,
    default: Option<FieldDefault>,
    coercion: Option<Coercion>,
}

impl FieldDef {
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            default: None,
            coercion: None,
        }
    }

    pub fn boolean() -> Self {
        Self::new(FieldKind::Boolean)
    }

    pub fn date() -> Self {
        Self::new(FieldKind::Date)
    }

    pub fn datetime() -> Self {
        Self::new(FieldKind::DateTime)
    }

    /// A float field. It rejects every value until a coercion is attached,
    /// usually `coerce_float`.
    pub fn float() -> Self {
        Self::new(FieldKind::Float)
    }

    pub fn integer() -> Self {
        Self::new(FieldKind::Integer)
    }

    pub fn string() -> Self {
        Self::new(FieldKind::String)
    }

    /// Use a fixed default value.
    pub fn with_default(mut self, value: impl Into<FieldValue>) -> Self {
        self.default = Some(FieldDefault::Literal(value.into()));
        self
    }

    /// Use a producer for the default; it runs on every `get_default` call.
    pub fn with_default_fn<F>(mut self, produce: F) -> Self
    where
        F: Fn() -> FieldValue + Send + Sync + 'static,
    {
        self.default = Some(FieldDefault::Producer(Arc::new(produce)));
        self
    }

    /// Replace the kind's coercion rules with a custom function.
    pub fn with_coercion<F>(mut self, coerce: F) -> Self
    where
        F: Fn(FieldValue) -> Result<FieldValue> + Send + Sync + 'static,
    {
        self.coercion = Some(Arc::new(coerce));
        self
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// The explicit default if one was supplied, otherwise the kind's built-in default.
    pub fn get_default(&self) -> FieldValue {
        match &self.default {
            Some(default) => default.get(),
            None => self.kind.builtin_default(),
        }
    }

    /// Coerce a raw value into this field's canonical value.
    pub fn validate(&self, raw: impl Into<FieldValue>) -> Result<FieldValue> {
        let raw = raw.into();
        if let Some(coerce) = &self.coercion {
            return coerce(raw);
        }
        match self.kind {
            FieldKind::Boolean => validate_boolean(raw),
            FieldKind::Date => validate_date(raw),
            FieldKind::DateTime => validate_datetime(raw),
            FieldKind::Float => Err(FieldsError::CoercionNotImplemented { kind: self.kind }),
            FieldKind::Integer => validate_integer(raw),
            FieldKind::String => Ok(validate_string(raw)),
        }
    }

    /// Render a raw value in its wire form.
    ///
    /// Dates and date-times use the fixed `DATE_FORMAT` / `DATETIME_FORMAT`;
    /// every other kind prints the validated value.
    pub fn output(&self, raw: impl Into<FieldValue>) -> Result<String> {
        let value = self.validate(raw)?;
        if value.is_null() {
            return Err(FieldsError::validation(self.kind, &value, "no value to output"));
        }
        let rendered = match (self.kind, &value) {
            (FieldKind::Date, FieldValue::Date(d)) => d.format(DATE_FORMAT).to_string(),
            (FieldKind::DateTime, FieldValue::DateTime(dt)) => {
                dt.format(DATETIME_FORMAT).to_string()
            }
            _ => value.to_string(),
        };
        trace!(kind = %self.kind, %rendered, "rendered field output");
        Ok(rendered)
    }
}

impl fmt::Debug for FieldDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDef")
            .field("kind", &self.kind)
            .field("default", &self.default)
            .field("coercion", &self.coercion.as_ref().map(|_| ".."))
            .finish()
    }
}

/// Ready-made float coercion for `FieldDef::float().with_coercion(coerce_float)`.
///
/// Null stays null, integers and booleans widen, strings are trimmed and parsed.
pub fn coerce_float(raw: FieldValue) -> Result<FieldValue> {
    match raw {
        FieldValue::Null => Ok(FieldValue::Null),
        FieldValue::Float(v) => Ok(FieldValue::Float(v)),
        FieldValue::Int(i) => Ok(FieldValue::Float(i as f64)),
        FieldValue::Bool(b) => Ok(FieldValue::Float(if b { 1.0 } else { 0.0 })),
        FieldValue::Str(ref s) => s.trim().parse::<f64>().map(FieldValue::Float).map_err(|_| {
            FieldsError::validation(FieldKind::Float, s, "not a number")
        }),
        other => Err(FieldsError::validation(
            FieldKind::Float,
            &other,
            format!("unsupported type {}", other.type_name()),
        )),
    }
}

fn validate_boolean(raw: FieldValue) -> Result<FieldValue> {
    let flag = match &raw {
        FieldValue::Null => false,
        FieldValue::Bool(b) => *b,
        FieldValue::Int(1) => true,
        FieldValue::Int(0) => false,
        FieldValue::Float(v) if *v == 1.0 => true,
        FieldValue::Float(v) if *v == 0.0 => false,
        FieldValue::Str(s) => match s.as_str() {
            "True" | "true" | "t" | "1" => true,
            "False" | "false" | "f" | "0" | "" => false,
            _ => {
                return Err(FieldsError::validation(
                    FieldKind::Boolean,
                    s,
                    "not a recognised boolean",
                ))
            }
        },
        other => {
            return Err(FieldsError::validation(
                FieldKind::Boolean,
                other,
                "not a recognised boolean",
            ))
        }
    };
    Ok(FieldValue::Bool(flag))
}

fn validate_integer(raw: FieldValue) -> Result<FieldValue> {
    match raw {
        FieldValue::Null => Ok(FieldValue::Int(0)),
        FieldValue::Int(i) => Ok(FieldValue::Int(i)),
        FieldValue::Bool(b) => Ok(FieldValue::Int(i64::from(b))),
        FieldValue::Float(v) if v.is_finite() && v.abs() < 9.2e18 => {
            Ok(FieldValue::Int(v.trunc() as i64))
        }
        FieldValue::Str(ref s) => s.trim().parse::<i64>().map(FieldValue::Int).map_err(|_| {
            FieldsError::validation(FieldKind::Integer, s, "not an integer")
        }),
        other => Err(FieldsError::validation(
            FieldKind::Integer,
            &other,
            format!("cannot convert {} to an integer", other.type_name()),
        )),
    }
}

fn validate_string(raw: FieldValue) -> FieldValue {
    match raw {
        FieldValue::Null => FieldValue::Str(String::new()),
        FieldValue::Str(s) => FieldValue::Str(s),
        other => FieldValue::Str(other.to_string()),
    }
}

/// Years a four-digit `DATE_FORMAT` rendering can carry.
const YEARS: std::ops::RangeInclusive<i32> = 1..=9999;

fn check_year(kind: FieldKind, value: FieldValue, year: i32) -> Result<FieldValue> {
    if YEARS.contains(&year) {
        Ok(value)
    } else {
        Err(FieldsError::validation(kind, &value, "year out of range 1..=9999"))
    }
}

fn validate_date(raw: FieldValue) -> Result<FieldValue> {
    match raw {
        FieldValue::DateTime(dt) => {
            check_year(FieldKind::Date, FieldValue::Date(dt.date()), dt.year())
        }
        FieldValue::Date(d) => check_year(FieldKind::Date, FieldValue::Date(d), d.year()),
        FieldValue::Str(ref s) => parse_date(s)
            .map(FieldValue::Date)
            .ok_or_else(|| FieldsError::validation(FieldKind::Date, s, "expected YYYY-MM-DD")),
        other => Err(FieldsError::validation(
            FieldKind::Date,
            &other,
            format!("unsupported type {}", other.type_name()),
        )),
    }
}

fn validate_datetime(raw: FieldValue) -> Result<FieldValue> {
    match raw {
        FieldValue::DateTime(dt) => {
            check_year(FieldKind::DateTime, FieldValue::DateTime(dt), dt.year())
        }
        FieldValue::Date(d) => check_year(
            FieldKind::DateTime,
            FieldValue::DateTime(d.and_time(NaiveTime::MIN)),
            d.year(),
        ),
        FieldValue::Str(ref s) => parse_datetime(s).map(FieldValue::DateTime).ok_or_else(|| {
            FieldsError::validation(FieldKind::DateTime, s, "expected YYYY-MM-DD HH:MM:SS")
        }),
        other => Err(FieldsError::validation(
            FieldKind::DateTime,
            &other,
            format!("unsupported type {}", other.type_name()),
        )),
    }
}

/// Parse a `YYYY-MM-DD` date, rejecting short years and trailing input.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    if !DATE_SHAPE.is_match(s) {
        return None;
    }
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .ok()
        .filter(|d| YEARS.contains(&d.year()))
}

/// Parse a `YYYY-MM-DD HH:MM:SS` date-time, rejecting short years and trailing input.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    if !DATETIME_SHAPE.is_match(s) {
        return None;
    }
    NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
        .ok()
        .filter(|dt| YEARS.contains(&dt.year()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn default_absent_uses_builtin() {
        let f = FieldDef::date();
        assert!(!f.has_default());
        assert!(f.get_default().is_null());

        let f = FieldDef::string();
        assert_eq!(f.get_default(), FieldValue::Str(String::new()));
    }

    #[test]
    fn default_literal_and_producer() {
        let f = FieldDef::string().with_default("hello");
        assert!(f.has_default());
        assert_eq!(f.get_default(), FieldValue::from("hello"));

        let f = FieldDef::string().with_default_fn(|| FieldValue::from("world"));
        assert_eq!(f.get_default(), FieldValue::from("world"));
    }

    #[test]
    fn producer_default_is_not_memoized() {
        let counter = Arc::new(AtomicI64::new(0));
        let c = counter.clone();
        let f = FieldDef::integer()
            .with_default_fn(move || FieldValue::Int(c.fetch_add(1, Ordering::SeqCst)));

        assert_eq!(f.get_default(), FieldValue::Int(0));
        assert_eq!(f.get_default(), FieldValue::Int(1));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn float_without_coercion_is_rejected() {
        let err = FieldDef::float().validate(1.5).unwrap_err();
        assert_eq!(
            err,
            FieldsError::CoercionNotImplemented {
                kind: FieldKind::Float
            }
        );
    }

    #[test]
    fn float_with_coercion() {
        let f = FieldDef::float().with_coercion(coerce_float);
        assert_eq!(f.validate("2.5").unwrap(), FieldValue::Float(2.5));
        assert_eq!(f.validate(3).unwrap(), FieldValue::Float(3.0));
        assert!(f.validate(FieldValue::Null).unwrap().is_null());
        assert_eq!(f.output(3).unwrap(), "3.0");
        assert!(f.validate("abc").is_err());
        assert!(f.validate(date(2016, 5, 18)).is_err());
    }

    #[test]
    fn custom_coercion_replaces_kind_rules() {
        let f = FieldDef::string().with_coercion(|raw| {
            Ok(FieldValue::Str(raw.to_string().to_uppercase()))
        });
        assert_eq!(f.validate("dog").unwrap(), FieldValue::from("DOG"));
    }

    #[test]
    fn integer_truncates_floats_and_widens_bools() {
        let f = FieldDef::integer();
        assert_eq!(f.validate(3.9).unwrap(), FieldValue::Int(3));
        assert_eq!(f.validate(-3.9).unwrap(), FieldValue::Int(-3));
        assert_eq!(f.validate(true).unwrap(), FieldValue::Int(1));
        assert_eq!(f.validate(" 7 ").unwrap(), FieldValue::Int(7));
        assert!(f.validate(f64::NAN).is_err());
        assert!(f.validate("1.5").is_err());
        assert!(f.validate(date(2016, 5, 18)).is_err());
    }

    #[test]
    fn string_prints_non_text_values() {
        let f = FieldDef::string();
        assert_eq!(f.validate(1).unwrap(), FieldValue::from("1"));
        assert_eq!(f.validate(true).unwrap(), FieldValue::from("True"));
        assert_eq!(f.validate(date(2016, 5, 18)).unwrap(), FieldValue::from("2016-05-18"));
    }

    #[test]
    fn date_shape_is_strict() {
        assert_eq!(parse_date("2016-5-8"), Some(date(2016, 5, 8)));
        assert_eq!(parse_date("16-05-18"), None);
        assert_eq!(parse_date("2016-05-18 "), None);
        assert_eq!(parse_date("2016-02-30"), None);
        assert!(parse_datetime("2016-05-18 18:42").is_none());
        assert!(parse_datetime("2016-05-18 18:42:34").is_some());
    }

    #[test_log::test]
    fn datetime_output_drops_subseconds() {
        let f = FieldDef::datetime();
        let dt = date(2016, 5, 18).and_hms_micro_opt(1, 2, 3, 500).unwrap();
        assert_eq!(f.output(dt).unwrap(), "2016-05-18 01:02:03");
    }

    #[test]
    fn output_of_null_date_fails() {
        assert!(FieldDef::date().output(FieldValue::Null).is_err());
        let weight = FieldDef::float().with_coercion(coerce_float);
        assert_eq!(weight.validate(FieldValue::Null).unwrap(), FieldValue::Null);
        assert!(weight.output(FieldValue::Null).is_err());
    }

    #[test]
    fn dates_outside_four_digit_years_are_rejected() {
        let far = NaiveDate::from_ymd_opt(10000, 1, 1).unwrap();
        let early = NaiveDate::from_ymd_opt(0, 12, 31).unwrap();
        for raw in [far, early] {
            assert!(FieldDef::date().validate(raw).is_err());
            assert!(FieldDef::date().output(raw).is_err());
            assert!(FieldDef::datetime().validate(raw).is_err());
            assert!(FieldDef::date().validate(raw.and_hms_opt(1, 0, 0).unwrap()).is_err());
        }

        assert!(FieldDef::date().validate("0000-01-01").is_err());
        assert!(FieldDef::datetime().validate("0000-01-01 00:00:00").is_err());

        let last = NaiveDate::from_ymd_opt(9999, 12, 31).unwrap();
        assert_eq!(FieldDef::date().output(last).unwrap(), "9999-12-31");
        let first = NaiveDate::from_ymd_opt(1, 1, 1).unwrap();
        assert_eq!(FieldDef::datetime().output(first).unwrap(), "0001-01-01 00:00:00");
    }

    #[test]
    fn debug_hides_closures() {
        let f = FieldDef::integer().with_default_fn(|| FieldValue::Int(1));
        let rendered = format!("{f:?}");
        assert!(rendered.contains("Producer(..)"));
        assert!(rendered.contains("Integer"));
    }
}
