//! The client facade tying registry, codec, clock and transport together.

use std::sync::Arc;

use scribe_fields::FieldValue;
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::codec::{encode_line, ParseFilter};
use crate::config::ScribeConfig;
use crate::error::Result;
use crate::record::Record;
use crate::registry::EntityRegistry;
use crate::schema::RecordType;
use crate::transport::{LogTransport, Transport};

/// Encodes records to lines, hands them to a transport, and parses lines back.
///
/// ```rust,ignore
/// let client = ScribeClient::new(ScribeConfig::load(None)?);
/// client.register(&dog)?;
///
/// let mut rex = client.instantiate("demo.dog", [("name", "rex"), ("legs", "4")])?;
/// client.send(&mut rex)?;
/// ```
#[derive(Clone)]
pub struct ScribeClient {
    registry: Arc<EntityRegistry>,
    clock: Arc<dyn Clock>,
    transport: Arc<dyn Transport>,
    config: ScribeConfig,
}

impl ScribeClient {
    /// A client on the global registry, the system clock and `LogTransport`.
    pub fn new(config: ScribeConfig) -> Self {
        Self {
            registry: Arc::clone(EntityRegistry::global()),
            clock: Arc::new(SystemClock),
            transport: Arc::new(LogTransport),
            config,
        }
    }

    pub fn with_registry(mut self, registry: Arc<EntityRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn registry(&self) -> &Arc<EntityRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &ScribeConfig {
        &self.config
    }

    pub fn register(&self, record_type: &Arc<RecordType>) -> Result<()> {
        self.registry.register(record_type)
    }

    pub fn instantiate<I, K, V>(&self, entity: &str, overrides: I) -> Result<Record>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.registry.instantiate(entity, overrides)
    }

    /// Encode `record` stamped with the client's clock.
    pub fn to_line(&self, record: &mut Record) -> Result<String> {
        encode_line(record, self.clock.now())
    }

    /// Encode `record` and hand the line to the transport under the configured category.
    ///
    /// The record is encoded even when sending is disabled, so encoding errors
    /// surface either way.
    pub fn send(&self, record: &mut Record) -> Result<String> {
        let line = self.to_line(record)?;
        if self.config.enabled {
            self.transport.send(&self.config.category, &line);
        } else {
            debug!(entity = %record.entity(), "sending disabled, line dropped");
        }
        Ok(line)
    }

    pub fn parse(&self, line: &str) -> Result<Record> {
        self.registry.parse(line, &ParseFilter::default())
    }

    pub fn parse_filtered(&self, line: &str, filter: &ParseFilter) -> Result<Record> {
        self.registry.parse(line, filter)
    }
}

impl std::fmt::Debug for ScribeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScribeClient")
            .field("entities", &self.registry.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::transport::MemoryTransport;
    use chrono::NaiveDate;
    use scribe_fields::FieldDef;

    fn client(config: ScribeConfig) -> (ScribeClient, Arc<MemoryTransport>) {
        let at = NaiveDate::from_ymd_opt(2016, 5, 18)
            .unwrap()
            .and_hms_opt(15, 39, 34)
            .unwrap();
        let transport = Arc::new(MemoryTransport::new());
        let client = ScribeClient::new(config)
            .with_registry(Arc::new(EntityRegistry::new()))
            .with_clock(Arc::new(FixedClock::new(at)))
            .with_transport(transport.clone());
        let note = RecordType::builder("demo.note")
            .field("text", FieldDef::string())
            .build()
            .unwrap();
        client.register(&note).unwrap();
        (client, transport)
    }

    #[test]
    fn send_uses_configured_category() {
        let config = ScribeConfig {
            category: "audit".to_string(),
            ..ScribeConfig::default()
        };
        let (client, transport) = client(config);
        let mut note = client.instantiate("demo.note", [("text", "hi")]).unwrap();
        let line = client.send(&mut note).unwrap();

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].category, "audit");
        assert_eq!(sent[0].line, line);
        assert_eq!(line, "2016-05-18 15:39:34.000000\tdemo.note\ttext=hi");
    }

    #[test]
    fn disabled_client_encodes_but_does_not_send() {
        let config = ScribeConfig {
            enabled: false,
            ..ScribeConfig::default()
        };
        let (client, transport) = client(config);
        let mut note = client.instantiate("demo.note", [("text", "hi")]).unwrap();
        assert!(client.send(&mut note).is_ok());
        assert!(note.created_at().is_some());
        assert!(transport.is_empty());
    }

    #[test]
    fn parse_uses_the_client_registry() {
        let (client, _) = client(ScribeConfig::default());
        let note = client
            .parse("2016-05-18 15:39:34.000000\tdemo.note\ttext=hello")
            .unwrap();
        assert_eq!(note.get_str("text"), Some("hello"));
        assert!(client.parse("2016-05-18 15:39:34.000000\tdemo.other\ttext=x").is_err());
    }
}
