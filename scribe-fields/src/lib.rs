//! Typed field descriptors for scribe records
//!
//! `scribe-fields` is the leaf of the scribe workspace. It knows nothing about
//! records, entities or lines. It only answers three questions for a single
//! named attribute:
//!
//! - **Default**: what value does an unset field start with (`get_default`)
//! - **Validation**: how is a raw value coerced into canonical form (`validate`)
//! - **Output**: how is a value rendered on the wire (`output`)
//!
//! Validation is idempotent for every built-in kind:
//! `validate(validate(x)) == validate(x)`.

pub mod error;
pub mod field;
pub mod types;

pub use error::{FieldsError, Result};
pub use field::{coerce_float, parse_date, parse_datetime, Coercion, FieldDef, FieldDefault};
pub use types::{FieldKind, FieldValue, DATETIME_FORMAT, DATE_FORMAT};
