use super::{missing_required_fields, CountryStore, MailTransport, PropertyStore, WriteOutcome};
use crate::models::PropertyRecord;
use anyhow::Result;
use std::collections::BTreeMap;
use std::sync::Mutex;
use tracing::debug;

/// One persisted record together with its storage location.
#[derive(Debug, Clone)]
pub struct StoredRecord {
    pub record: PropertyRecord,
    pub location: u32,
}

/// In-memory persistence gateway. Used by the integration tests and by
/// embedders that bring their own durable storage.
pub struct MemoryStore {
    required_fields: Vec<String>,
    records: Mutex<Vec<StoredRecord>>,
}

impl MemoryStore {
    pub fn new(required_fields: Vec<String>) -> Self {
        Self {
            required_fields,
            records: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of everything written so far.
    pub fn records(&self) -> Vec<StoredRecord> {
        self.records.lock().expect("store poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().expect("store poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PropertyStore for MemoryStore {
    fn write(&self, record: &PropertyRecord, location: u32) -> WriteOutcome {
        let missing = missing_required_fields(record, &self.required_fields);
        if !missing.is_empty() {
            return WriteOutcome::RequiredFieldsMissing(missing);
        }

        let mut records = self.records.lock().expect("store poisoned");

        if record.is_deleted() {
            let object_number = record.object_number();
            records.retain(|stored| stored.record.object_number() != object_number);
            return WriteOutcome::DeletedFlagSet;
        }

        // Re-imports replace the previous record with the same object number.
        let object_number = record.object_number();
        records.retain(|stored| stored.record.object_number() != object_number);
        records.push(StoredRecord {
            record: record.clone(),
            location,
        });
        debug!("Stored record {:?} at location {}", object_number, location);

        WriteOutcome::Written
    }
}

/// Country reference table backed by a plain map, loaded from the
/// configuration file.
pub struct MemoryCountryTable {
    countries: BTreeMap<String, u32>,
}

impl MemoryCountryTable {
    pub fn new(countries: BTreeMap<String, u32>) -> Self {
        Self { countries }
    }
}

impl CountryStore for MemoryCountryTable {
    fn find_by_iso_code(&self, code: &str) -> Result<Option<u32>> {
        Ok(self.countries.get(code).copied())
    }
}

/// Mail transport that records every message, for tests.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<(String, String, String)>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages sent so far as (recipient, subject, body).
    pub fn messages(&self) -> Vec<(String, String, String)> {
        self.sent.lock().expect("mailer poisoned").clone()
    }
}

impl MailTransport for RecordingMailer {
    fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        self.sent.lock().expect("mailer poisoned").push((
            recipient.to_string(),
            subject.to_string(),
            body.to_string(),
        ));
        Ok(())
    }
}
