//! # Scribe Client
//!
//! Typed records serialized as single tab-delimited lines for a log
//! collector, and parsed back.
//!
//! A record type is declared once with [`RecordType::builder`], registered
//! under its entity tag, and then instantiated, encoded and sent:
//!
//! ```rust,ignore
//! use scribe_client::{FieldDef, RecordType, ScribeClient, ScribeConfig};
//!
//! let animal = RecordType::builder("demo.animal")
//!     .field("name", FieldDef::string())
//!     .field("flying", FieldDef::boolean())
//!     .build()?;
//! let dog = RecordType::builder("demo.dog")
//!     .extends(&animal)
//!     .field("legs", FieldDef::integer())
//!     .orders(["name", "legs", "flying"])
//!     .build()?;
//!
//! let client = ScribeClient::new(ScribeConfig::load(None)?);
//! client.register(&dog)?;
//!
//! let mut rex = client.instantiate("demo.dog", [("name", "dog"), ("legs", "4")])?;
//! let line = client.send(&mut rex)?;
//! // 2016-05-18 15:39:34.000000	demo.dog	name=dog	legs=4	flying=False
//!
//! let back = client.parse(&line)?;
//! assert_eq!(back.get_int("legs"), Some(4));
//! ```

pub mod client;
pub mod clock;
pub mod codec;
pub mod config;
pub mod error;
pub mod record;
pub mod registry;
pub mod schema;
pub mod transport;

pub use client::ScribeClient;
pub use clock::{Clock, FixedClock, SystemClock};
pub use codec::{
    decode_line, encode_line, format_timestamp, parse_timestamp, DecodedLine, ParseFilter,
    BINDING, SEPARATOR, TIMESTAMP_FORMAT,
};
pub use config::{ScribeConfig, ENV_PREFIX};
pub use error::{ConfigError, Result, ScribeError};
pub use record::Record;
pub use registry::EntityRegistry;
pub use schema::{RecordType, RecordTypeBuilder};
pub use transport::{LogTransport, MemoryTransport, SentMessage, Transport};

pub use scribe_fields::{coerce_float, FieldDef, FieldDefault, FieldKind, FieldValue, FieldsError};
