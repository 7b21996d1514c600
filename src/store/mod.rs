pub mod json;
pub mod memory;

pub use json::JsonFileStore;
pub use memory::{MemoryCountryTable, MemoryStore, RecordingMailer, StoredRecord};

use crate::models::PropertyRecord;
use anyhow::Result;
use tracing::debug;

/// Outcome of handing one converted record to the persistence gateway.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    /// The record was persisted.
    Written,
    /// The source explicitly requested deletion; the record was marked as
    /// deleted instead of being inserted.
    DeletedFlagSet,
    /// Validation rejected the record; carries the names of the missing
    /// required fields.
    RequiredFieldsMissing(Vec<String>),
    /// Any other persistence failure.
    Failed(String),
}

/// Persistence gateway for converted property records.
///
/// Implementations validate the record against the required-field rules
/// before writing and signal the specific outcome instead of raising;
/// only the orchestrator decides how outcomes are logged.
pub trait PropertyStore: Send + Sync {
    fn write(&self, record: &PropertyRecord, location: u32) -> WriteOutcome;
}

/// Reference-data lookup from ISO-3166 country codes to internal
/// identifiers. A connectivity failure is an error and aborts the run;
/// an unknown code is simply `None`.
pub trait CountryStore: Send + Sync {
    fn find_by_iso_code(&self, code: &str) -> Result<Option<u32>>;
}

/// Outgoing mail transport for the import notifications.
pub trait MailTransport: Send + Sync {
    fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()>;
}

/// Invalidation hook for cached rendered pages that show imported records.
pub trait RenderCache: Send + Sync {
    fn clear_property_pages(&self);
}

/// Mail transport that only logs, for setups without a configured relay.
pub struct LogMailer;

impl MailTransport for LogMailer {
    fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        tracing::info!("Mail to {} ({}): {} bytes", recipient, subject, body.len());
        Ok(())
    }
}

/// No-op cache hook for standalone deployments without a page cache.
pub struct NoopRenderCache;

impl RenderCache for NoopRenderCache {
    fn clear_property_pages(&self) {
        debug!("No render cache configured, nothing to invalidate");
    }
}

/// Determine which of the configured required fields the record does not
/// fill. Shared by the store implementations.
pub fn missing_required_fields(record: &PropertyRecord, required: &[String]) -> Vec<String> {
    required
        .iter()
        .filter(|field| !record.is_filled(field))
        .cloned()
        .collect()
}
