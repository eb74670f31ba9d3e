//! Record type definitions.
//!
//! A `RecordType` is an entity tag, an ordered field schema and an optional
//! serialization order. Types are built once, usually at program start, and
//! shared as `Arc<RecordType>`; the `Arc` is the type's identity in the
//! entity registry.

use std::sync::Arc;

use indexmap::IndexMap;
use scribe_fields::FieldDef;
use tracing::debug;

use crate::error::{Result, ScribeError};

/// The schema of one kind of record.
#[derive(Debug)]
pub struct RecordType {
    entity: String,
    fields: IndexMap<String, FieldDef>,
    orders: Vec<String>,
}

impl RecordType {
    /// Start defining a record type tagged with `entity`.
    ///
    /// ```rust,ignore
    /// let animal = RecordType::builder("demo.animal")
    ///     .field("name", FieldDef::string())
    ///     .field("flying", FieldDef::boolean())
    ///     .build()?;
    ///
    /// let dog = RecordType::builder("demo.dog")
    ///     .extends(&animal)
    ///     .field("legs", FieldDef::integer())
    ///     .orders(["name", "legs", "flying"])
    ///     .build()?;
    /// ```
    pub fn builder(entity: impl Into<String>) -> RecordTypeBuilder {
        RecordTypeBuilder {
            entity: entity.into(),
            parents: Vec::new(),
            own: IndexMap::new(),
            orders: None,
        }
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// The merged field schema, in natural order.
    pub fn fields(&self) -> &IndexMap<String, FieldDef> {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.get(name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// The explicit serialization order; empty when natural order is used.
    pub fn orders(&self) -> &[String] {
        &self.orders
    }

    /// Check that every name in `orders` is a declared field.
    pub fn check_orders(&self) -> Result<()> {
        match self.orders.iter().find(|name| !self.fields.contains_key(*name)) {
            Some(missing) => Err(ScribeError::InvalidOrder {
                entity: self.entity.clone(),
                field: missing.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Field names in the order they are written to a line.
    pub fn serialization_order(&self) -> Vec<&str> {
        if self.orders.is_empty() {
            self.fields.keys().map(String::as_str).collect()
        } else {
            self.orders.iter().map(String::as_str).collect()
        }
    }
}

/// Builder for `RecordType`. Created by `RecordType::builder()`.
pub struct RecordTypeBuilder {
    entity: String,
    parents: Vec<Arc<RecordType>>,
    own: IndexMap<String, FieldDef>,
    orders: Option<Vec<String>>,
}

impl RecordTypeBuilder {
    /// Inherit the fields and serialization order of `parent`.
    ///
    /// The entity tag is never inherited. With several parents, the first one
    /// listed wins a name collision; the type's own fields always win.
    pub fn extends(mut self, parent: &Arc<RecordType>) -> Self {
        self.parents.push(Arc::clone(parent));
        self
    }

    /// Declare a field. Redeclaring a name replaces the earlier descriptor.
    pub fn field(mut self, name: impl Into<String>, def: FieldDef) -> Self {
        self.own.insert(name.into(), def);
        self
    }

    /// Set the serialization order. Names are checked when a record is encoded.
    pub fn orders<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.orders = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Merge the schema and produce the shared record type.
    pub fn build(self) -> Result<Arc<RecordType>> {
        if self.entity.is_empty() {
            return Err(ScribeError::EntityNotDefined);
        }

        // Ancestors first so overrides keep the ancestor's position.
        let mut fields: IndexMap<String, FieldDef> = IndexMap::new();
        for parent in &self.parents {
            for (name, def) in parent.fields() {
                if !fields.contains_key(name) {
                    fields.insert(name.clone(), def.clone());
                }
            }
        }
        for (name, def) in self.own {
            fields.insert(name, def);
        }

        if fields.is_empty() {
            return Err(ScribeError::NoFieldsDefined {
                entity: self.entity,
            });
        }

        let orders = match self.orders {
            Some(orders) => orders,
            None => self
                .parents
                .iter()
                .map(|parent| parent.orders())
                .find(|orders| !orders.is_empty())
                .map(<[String]>::to_vec)
                .unwrap_or_default(),
        };

        debug!(
            entity = %self.entity,
            fields = fields.len(),
            parents = self.parents.len(),
            "built record type"
        );

        Ok(Arc::new(RecordType {
            entity: self.entity,
            fields,
            orders,
        }))
    }
}
