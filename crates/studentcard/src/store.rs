//! Persistence of the active student record.
//!
//! The record lives in one slot as a versioned envelope:
//!
//! ```json
//! {"schemaVersion":1,"savedAt":"2026-03-01T09:30:00Z","digest":"…","record":{…}}
//! ```
//!
//! Slots holding a bare record object (no `schemaVersion`) are read as
//! version 0. Anything unreadable is reported as absent and logged; loading
//! never fails.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::record::StudentRecord;
use crate::storage::SlotStorage;

/// Slot the record is stored under unless configured otherwise.
pub const DEFAULT_SLOT_KEY: &str = "studentCards";

/// Envelope version written by [`RecordStore::save`].
pub const RECORD_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    schema_version: u32,
    saved_at: DateTime<Utc>,
    digest: String,
    record: StudentRecord,
}

/// Why a stored slot was ignored.
#[derive(Debug, thiserror::Error)]
enum SlotError {
    #[error("slot is not valid JSON: {0}")]
    Syntax(serde_json::Error),

    #[error("slot does not hold a student record: {0}")]
    Shape(serde_json::Error),

    #[error("schema version {0} is newer than supported version {RECORD_SCHEMA_VERSION}")]
    UnsupportedVersion(u64),

    #[error("digest mismatch")]
    DigestMismatch,
}

/// A record read back from storage with its envelope metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    /// The record.
    pub record: StudentRecord,
    /// Envelope version the slot was written with. 0 for bare records.
    pub schema_version: u32,
    /// When the record was saved, if the envelope says.
    pub saved_at: Option<DateTime<Utc>>,
}

/// Loads and saves the single student record.
#[derive(Debug)]
pub struct RecordStore<S> {
    storage: S,
    key: String,
}

impl<S: SlotStorage> RecordStore<S> {
    /// Create a store over `storage` using [`DEFAULT_SLOT_KEY`].
    pub fn new(storage: S) -> Self {
        Self::with_key(storage, DEFAULT_SLOT_KEY)
    }

    /// Create a store over `storage` using a custom slot key.
    pub fn with_key(storage: S, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    /// The slot key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The underlying slot storage.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Load the saved record, if there is a readable one.
    #[must_use]
    pub fn load(&self) -> Option<StudentRecord> {
        self.load_stored().map(|stored| stored.record)
    }

    /// Load the saved record together with its envelope metadata.
    #[must_use]
    pub fn load_stored(&self) -> Option<StoredRecord> {
        let raw = match self.storage.read(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key = %self.key, "No saved record");
                return None;
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "Failed to read saved record");
                return None;
            }
        };

        match decode_slot(&raw) {
            Ok(stored) => {
                if stored.schema_version < RECORD_SCHEMA_VERSION {
                    info!(
                        key = %self.key,
                        from = stored.schema_version,
                        to = RECORD_SCHEMA_VERSION,
                        "Read saved record in legacy format"
                    );
                }
                Some(stored)
            }
            Err(e) => {
                warn!(key = %self.key, reason = %e, "Ignoring unreadable saved record");
                None
            }
        }
    }

    /// Overwrite the slot with `record`.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be serialized or the storage
    /// rejects the write.
    pub fn save(&self, record: &StudentRecord) -> Result<()> {
        let envelope = Envelope {
            schema_version: RECORD_SCHEMA_VERSION,
            saved_at: Utc::now(),
            digest: digest(record)?,
            record: record.clone(),
        };
        let json = serde_json::to_string(&envelope)?;
        self.storage.write(&self.key, &json)?;
        info!(key = %self.key, bytes = json.len(), "Saved student record");
        Ok(())
    }

    /// Remove the saved record. Returns `true` if one was present.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage rejects the delete.
    pub fn clear(&self) -> Result<bool> {
        let removed = self.storage.remove(&self.key)?;
        if removed {
            info!(key = %self.key, "Removed saved record");
        }
        Ok(removed)
    }
}

/// blake3 hex digest of the record's JSON text.
fn digest(record: &StudentRecord) -> serde_json::Result<String> {
    let json = serde_json::to_string(record)?;
    Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
}

fn decode_slot(raw: &str) -> std::result::Result<StoredRecord, SlotError> {
    let value: Value = serde_json::from_str(raw).map_err(SlotError::Syntax)?;

    let version = match value.get("schemaVersion") {
        None => {
            let record = serde_json::from_value(value).map_err(SlotError::Shape)?;
            return Ok(StoredRecord {
                record,
                schema_version: 0,
                saved_at: None,
            });
        }
        Some(version) => version.as_u64(),
    };
    if let Some(version) = version.filter(|v| *v > u64::from(RECORD_SCHEMA_VERSION)) {
        return Err(SlotError::UnsupportedVersion(version));
    }

    let envelope: Envelope = serde_json::from_value(value).map_err(SlotError::Shape)?;
    let expected = digest(&envelope.record).map_err(SlotError::Shape)?;
    if expected != envelope.digest {
        return Err(SlotError::DigestMismatch);
    }

    Ok(StoredRecord {
        record: envelope.record,
        schema_version: envelope.schema_version,
        saved_at: Some(envelope.saved_at),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::init_test_logging;
    use crate::record::{Allergy, BusRoute, ClassDivision, DataUri};
    use crate::storage::{MemoryStorage, Storage};

    fn asha() -> StudentRecord {
        let mut record = StudentRecord::new("Asha Rao", "12B-07");
        record.class_division = ClassDivision::B;
        record.set_allergies([Allergy::Peanuts, Allergy::Dairy, Allergy::Dust, Allergy::Gluten]);
        record.photo = Some(DataUri::from_bytes("image/png", b"\x89PNG\r\n"));
        record.rack = "R4".to_string();
        record.bus_route = BusRoute::Route2;
        record
    }

    fn store_with(raw: &str) -> RecordStore<MemoryStorage> {
        RecordStore::new(MemoryStorage::with_slot(DEFAULT_SLOT_KEY, raw))
    }

    #[test]
    fn test_load_empty() {
        let store = RecordStore::new(MemoryStorage::new());
        assert_eq!(store.load(), None);
    }

    #[test]
    fn test_save_then_load() {
        let store = RecordStore::new(MemoryStorage::new());
        let record = asha();
        store.save(&record).unwrap();

        let stored = store.load_stored().unwrap();
        assert_eq!(stored.record, record);
        assert_eq!(stored.schema_version, RECORD_SCHEMA_VERSION);
        assert!(stored.saved_at.is_some());
    }

    #[test]
    fn test_save_overwrites() {
        let store = RecordStore::new(MemoryStorage::new());
        store.save(&asha()).unwrap();
        let other = StudentRecord::new("Ravi", "7");
        store.save(&other).unwrap();
        assert_eq!(store.load(), Some(other));
    }

    #[test]
    fn test_envelope_layout() {
        let store = RecordStore::new(MemoryStorage::new());
        store.save(&asha()).unwrap();

        let raw = store.storage().read(DEFAULT_SLOT_KEY).unwrap().unwrap();
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["schemaVersion"], 1);
        assert_eq!(value["record"]["roll"], "12B-07");
        assert_eq!(value["digest"].as_str().unwrap().len(), 64);
        assert!(value["savedAt"].is_string());
    }

    #[test]
    fn test_decode_slot_verifies_saved_digest() {
        let store = RecordStore::new(MemoryStorage::new());
        let record = asha();
        store.save(&record).unwrap();

        let raw = store.storage().read(DEFAULT_SLOT_KEY).unwrap().unwrap();
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["digest"], digest(&record).unwrap());
        assert_eq!(decode_slot(&raw).unwrap().record, record);
    }

    #[test]
    fn test_load_legacy_bare_record() {
        let store = store_with(
            r#"{"name":"Asha Rao","roll":"12B-07","classDivision":"B","allergies":["Dairy"],"photo":"","rack":"","busRoute":"2"}"#,
        );
        let stored = store.load_stored().unwrap();
        assert_eq!(stored.schema_version, 0);
        assert_eq!(stored.saved_at, None);
        assert_eq!(stored.record.name, "Asha Rao");
        assert_eq!(stored.record.allergies, vec![Allergy::Dairy]);
        assert_eq!(stored.record.photo, None);
    }

    #[test]
    fn test_load_malformed_json_is_absent() {
        init_test_logging();
        assert_eq!(store_with("{not json").load(), None);
        assert_eq!(store_with("").load(), None);
    }

    #[test]
    fn test_load_wrong_shape_is_absent() {
        assert_eq!(store_with("[1,2,3]").load(), None);
        assert_eq!(store_with(r#"{"name":42}"#).load(), None);
        assert_eq!(store_with(r#"{"allergies":["Shellfish"]}"#).load(), None);
    }

    #[test]
    fn test_load_newer_version_is_absent() {
        let store = RecordStore::new(MemoryStorage::new());
        store.save(&asha()).unwrap();
        let raw = store.storage().read(DEFAULT_SLOT_KEY).unwrap().unwrap();
        let bumped = raw.replacen("\"schemaVersion\":1", "\"schemaVersion\":2", 1);
        store.storage().write(DEFAULT_SLOT_KEY, &bumped).unwrap();

        assert_eq!(store.load(), None);
    }

    #[test]
    fn test_load_tampered_record_is_absent() {
        let store = RecordStore::new(MemoryStorage::new());
        store.save(&asha()).unwrap();
        let raw = store.storage().read(DEFAULT_SLOT_KEY).unwrap().unwrap();
        let tampered = raw.replacen("Asha Rao", "Someone Else", 1);
        store.storage().write(DEFAULT_SLOT_KEY, &tampered).unwrap();

        assert_eq!(store.load(), None);
    }

    #[test]
    fn test_save_failure_is_returned() {
        let store = RecordStore::new(MemoryStorage::new());
        store.storage().set_read_only(true);
        assert!(store.save(&asha()).is_err());
        assert_eq!(store.load(), None);
    }

    #[test]
    fn test_clear() {
        let store = RecordStore::new(MemoryStorage::new());
        assert!(!store.clear().unwrap());
        store.save(&asha()).unwrap();
        assert!(store.clear().unwrap());
        assert_eq!(store.load(), None);
    }

    #[test]
    fn test_custom_key() {
        let store = RecordStore::with_key(MemoryStorage::new(), "cards-2026");
        store.save(&asha()).unwrap();
        assert_eq!(store.key(), "cards-2026");
        assert!(store.storage().read(DEFAULT_SLOT_KEY).unwrap().is_none());
        assert!(store.load().is_some());
    }

    #[test]
    fn test_sqlite_backed_round_trip() {
        let store = RecordStore::new(Storage::open_in_memory().unwrap());
        store.save(&asha()).unwrap();
        assert_eq!(store.load(), Some(asha()));
    }
}
