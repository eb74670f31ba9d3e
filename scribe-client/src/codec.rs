//! The tab-delimited line format.
//!
//! ```text
//! <YYYY-MM-DD HH:MM:SS.ffffff> \t <entity> \t key1=val1 \t key2=val2 ...
//! ```
//!
//! Column 0 is the write timestamp, column 1 the entity tag, and every
//! further column a `key=value` pair split on its first `=`. Tabs inside a
//! column are replaced by a space on write.

use std::borrow::Cow;
use std::sync::Arc;

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use scribe_fields::FieldValue;
use tracing::trace;

use crate::error::{Result, ScribeError};
use crate::record::Record;

/// Column delimiter.
pub const SEPARATOR: char = '\t';

/// Separator between a key and its value inside a column.
pub const BINDING: char = '=';

/// Format of the write timestamp column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

const TIMESTAMP_PARSE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

static TIMESTAMP_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{1,2}-\d{1,2} \d{1,2}:\d{1,2}:\d{1,2}\.\d{1,6}$")
        .expect("Failed to compile timestamp shape regex")
});

/// Render a record as one line, stamping it with `now` as its write time.
///
/// Fails without producing output if `orders` names an undeclared field or
/// any field value cannot be rendered.
pub fn encode_line(record: &mut Record, now: NaiveDateTime) -> Result<String> {
    let record_type = Arc::clone(record.record_type());
    record_type.check_orders()?;

    let order = record_type.serialization_order();
    let mut columns: Vec<String> = Vec::with_capacity(order.len() + 2);
    columns.push(format_timestamp(now));
    columns.push(record_type.entity().to_string());

    for name in order {
        let Some(def) = record_type.field(name) else {
            continue;
        };
        let value = record.get(name).cloned().unwrap_or(FieldValue::Null);
        let rendered = def
            .output(value)
            .map_err(|source| ScribeError::field(name, source))?;
        columns.push(format!("{name}{BINDING}{rendered}"));
    }

    let separator = SEPARATOR.to_string();
    let line = columns
        .iter()
        .map(|column| sanitize(column))
        .collect::<Vec<_>>()
        .join(separator.as_str());

    record.mark_created(now);
    trace!(entity = %record_type.entity(), columns = columns.len(), "encoded line");
    Ok(line)
}

/// A line split into its parts, before any record type is involved.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedLine {
    pub written_at: NaiveDateTime,
    pub entity: String,
    pub pairs: Vec<(String, String)>,
}

/// Split a line into timestamp, entity tag and raw key/value pairs.
///
/// The line is taken verbatim: a trailing `\n` belongs to the last value.
/// Callers reading from a stream strip their own line terminators.
pub fn decode_line(line: &str) -> Result<DecodedLine> {
    let mut columns = line.split(SEPARATOR);

    let stamp = columns.next().unwrap_or_default();
    let written_at = parse_timestamp(stamp)?;

    let entity = columns
        .next()
        .ok_or_else(|| ScribeError::MalformedLine {
            column: 1,
            reason: "missing entity column".to_string(),
        })?
        .to_string();

    let mut pairs = Vec::new();
    for (offset, column) in columns.enumerate() {
        let (key, value) = column
            .split_once(BINDING)
            .ok_or_else(|| ScribeError::MalformedLine {
                column: offset + 2,
                reason: format!("expected key{BINDING}value, got '{column}'"),
            })?;
        pairs.push((key.to_string(), value.to_string()));
    }

    trace!(%entity, pairs = pairs.len(), "decoded line");
    Ok(DecodedLine {
        written_at,
        entity,
        pairs,
    })
}

/// Key filters applied to parsed pairs: `excludes` first, then `includes`.
///
/// An empty list means no filtering, so a key named in both lists is dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseFilter {
    includes: Vec<String>,
    excludes: Vec<String>,
}

impl ParseFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep only these keys.
    pub fn include<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.includes.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Drop these keys.
    pub fn exclude<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excludes.extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.includes.is_empty() && self.excludes.is_empty()
    }

    pub fn apply(&self, mut pairs: Vec<(String, String)>) -> Vec<(String, String)> {
        if !self.excludes.is_empty() {
            pairs.retain(|(key, _)| !self.excludes.contains(key));
        }
        if !self.includes.is_empty() {
            pairs.retain(|(key, _)| self.includes.contains(key));
        }
        pairs
    }
}

pub fn format_timestamp(at: NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime> {
    let invalid = || ScribeError::InvalidTimestamp {
        value: value.to_string(),
    };
    if !TIMESTAMP_SHAPE.is_match(value) {
        return Err(invalid());
    }
    NaiveDateTime::parse_from_str(value, TIMESTAMP_PARSE_FORMAT).map_err(|_| invalid())
}

fn sanitize(column: &str) -> Cow<'_, str> {
    if column.contains(SEPARATOR) {
        Cow::Owned(column.replace(SEPARATOR, " "))
    } else {
        Cow::Borrowed(column)
    }
}
