//! Pluggable record retrieval.

use crate::record::SecretRecord;
use crate::SecretsError;
use async_trait::async_trait;
use base64::Engine;
use serde_json::Value;

/// Trait all record sources implement.
///
/// The production secret-store transport lives behind this seam; the
/// reconciliation driver only ever sees records.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Fetch the records visible to the secrets client, optionally
    /// narrowed to a single record uid.
    async fn records(&self, uid: Option<&str>) -> Result<Vec<SecretRecord>, SecretsError>;
}

/// Record source backed by an in-memory payload.
///
/// Consumes the JSON the external secrets client hands over: either a bare
/// array of records or an object with a `records` array.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    records: Vec<SecretRecord>,
}

impl MemorySource {
    pub fn new(records: Vec<SecretRecord>) -> Self {
        Self { records }
    }

    /// Parse a record payload.
    pub fn from_json(payload: &str) -> Result<Self, SecretsError> {
        let value: Value = serde_json::from_str(payload)
            .map_err(|e| SecretsError::InvalidPayload(e.to_string()))?;
        let records_value = match value {
            Value::Array(_) => value,
            Value::Object(mut map) => map
                .remove("records")
                .ok_or_else(|| {
                    SecretsError::InvalidPayload("payload has no \"records\" array".to_string())
                })?,
            _ => {
                return Err(SecretsError::InvalidPayload(
                    "payload is neither an array nor an object".to_string(),
                ))
            }
        };
        let records: Vec<SecretRecord> = serde_json::from_value(records_value)
            .map_err(|e| SecretsError::InvalidPayload(e.to_string()))?;
        Ok(Self::new(records))
    }

    /// Decode a base64 blob (the `KSM_CONFIG_BASE64` / `config.base64`
    /// content) and parse the payload inside.
    pub fn from_base64(blob: &str) -> Result<Self, SecretsError> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(blob.trim())
            .map_err(|e| SecretsError::InvalidPayload(format!("base64: {e}")))?;
        let payload = String::from_utf8(bytes)
            .map_err(|e| SecretsError::InvalidPayload(format!("utf-8: {e}")))?;
        Self::from_json(&payload)
    }
}

#[async_trait]
impl RecordSource for MemorySource {
    async fn records(&self, uid: Option<&str>) -> Result<Vec<SecretRecord>, SecretsError> {
        let records = match uid {
            Some(uid) => self
                .records
                .iter()
                .filter(|r| r.uid == uid)
                .cloned()
                .collect(),
            None => self.records.clone(),
        };
        Ok(records)
    }
}
