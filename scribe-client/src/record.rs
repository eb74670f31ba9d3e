//! Record instances.
//!
//! Every write to a declared field goes through that field's `validate`, both
//! at construction and through `set`.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use scribe_fields::FieldValue;
use tracing::debug;

use crate::error::{Result, ScribeError};
use crate::schema::RecordType;

/// One record: a validated value per declared field plus write metadata.
#[derive(Debug, Clone)]
pub struct Record {
    record_type: Arc<RecordType>,
    values: IndexMap<String, FieldValue>,
    created_at: Option<NaiveDateTime>,
    log_created_at: Option<NaiveDateTime>,
}

impl Record {
    /// Construct a record, validating each override and defaulting the rest.
    ///
    /// Overrides naming undeclared fields are ignored. A default of `Null`
    /// (the built-in default for dates, date-times and floats) is stored
    /// as-is rather than validated.
    pub fn new<I, K, V>(record_type: &Arc<RecordType>, overrides: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FieldValue>,
    {
        let mut supplied: HashMap<String, FieldValue> = overrides
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        let mut values = IndexMap::with_capacity(record_type.fields().len());
        for (name, def) in record_type.fields() {
            let value = match supplied.remove(name) {
                Some(raw) => def.validate(raw),
                None => match def.get_default() {
                    FieldValue::Null => Ok(FieldValue::Null),
                    default => def.validate(default),
                },
            }
            .map_err(|source| ScribeError::field(name, source))?;
            values.insert(name.clone(), value);
        }

        if !supplied.is_empty() {
            let mut ignored: Vec<_> = supplied.into_keys().collect();
            ignored.sort();
            debug!(entity = %record_type.entity(), ?ignored, "ignored undeclared fields");
        }

        Ok(Self {
            record_type: Arc::clone(record_type),
            values,
            created_at: None,
            log_created_at: None,
        })
    }

    /// Construct a record with every field at its default.
    pub fn with_defaults(record_type: &Arc<RecordType>) -> Result<Self> {
        Self::new(record_type, std::iter::empty::<(String, FieldValue)>())
    }

    pub fn record_type(&self) -> &Arc<RecordType> {
        &self.record_type
    }

    pub fn entity(&self) -> &str {
        self.record_type.entity()
    }

    /// Assign a declared field, re-running its validation.
    ///
    /// On failure the previous value is kept.
    pub fn set(&mut self, name: &str, value: impl Into<FieldValue>) -> Result<()> {
        let def = self
            .record_type
            .field(name)
            .ok_or_else(|| ScribeError::UnknownField {
                entity: self.record_type.entity().to_string(),
                field: name.to_string(),
            })?;
        let value = def
            .validate(value)
            .map_err(|source| ScribeError::field(name, source))?;
        self.values.insert(name.to_string(), value);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_str)
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(FieldValue::as_int)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(FieldValue::as_bool)
    }

    pub fn get_float(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(FieldValue::as_float)
    }

    pub fn get_date(&self, name: &str) -> Option<NaiveDate> {
        self.get(name).and_then(FieldValue::as_date)
    }

    pub fn get_datetime(&self, name: &str) -> Option<NaiveDateTime> {
        self.get(name).and_then(FieldValue::as_datetime)
    }

    /// Field values in natural field order.
    pub fn values(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// When this record was last written to a line.
    pub fn created_at(&self) -> Option<NaiveDateTime> {
        self.created_at
    }

    /// The write timestamp recovered from a parsed line.
    pub fn log_created_at(&self) -> Option<NaiveDateTime> {
        self.log_created_at
    }

    pub(crate) fn mark_created(&mut self, at: NaiveDateTime) {
        self.created_at = Some(at);
    }

    pub(crate) fn set_log_created_at(&mut self, at: NaiveDateTime) {
        self.log_created_at = Some(at);
    }
}
