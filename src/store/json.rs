use super::{missing_required_fields, PropertyStore, WriteOutcome};
use crate::models::PropertyRecord;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

/// Persistence gateway that writes each record as a JSON file named after
/// its object number. This is the storage the standalone binary ships
/// with; deployments with a real database are expected to bring their own
/// [`PropertyStore`].
pub struct JsonFileStore {
    data_dir: PathBuf,
    required_fields: Vec<String>,
}

#[derive(Serialize)]
struct PersistedRecord<'a> {
    location: u32,
    #[serde(flatten)]
    record: &'a PropertyRecord,
}

impl JsonFileStore {
    pub fn new(data_dir: PathBuf, required_fields: Vec<String>) -> Self {
        Self {
            data_dir,
            required_fields,
        }
    }

    fn file_for(&self, object_number: &str) -> PathBuf {
        // Object numbers come from vendor data; keep only characters that
        // are safe in a file name.
        let safe: String = object_number
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.data_dir.join(format!("{}.json", safe))
    }
}

impl PropertyStore for JsonFileStore {
    fn write(&self, record: &PropertyRecord, location: u32) -> WriteOutcome {
        let missing = missing_required_fields(record, &self.required_fields);
        if !missing.is_empty() {
            return WriteOutcome::RequiredFieldsMissing(missing);
        }

        let object_number = record.object_number().unwrap_or_default();
        let path = self.file_for(&object_number);

        if record.is_deleted() {
            if path.exists() {
                if let Err(error) = std::fs::remove_file(&path) {
                    return WriteOutcome::Failed(error.to_string());
                }
            }
            return WriteOutcome::DeletedFlagSet;
        }

        if let Err(error) = std::fs::create_dir_all(&self.data_dir) {
            return WriteOutcome::Failed(error.to_string());
        }

        let persisted = PersistedRecord { location, record };
        let json = match serde_json::to_string_pretty(&persisted) {
            Ok(json) => json,
            Err(error) => return WriteOutcome::Failed(error.to_string()),
        };
        if let Err(error) = std::fs::write(&path, json) {
            return WriteOutcome::Failed(error.to_string());
        }

        info!("Saved record {} to {}", object_number, path.display());
        WriteOutcome::Written
    }
}
