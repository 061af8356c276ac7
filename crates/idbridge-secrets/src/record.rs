//! Secrets-record model.
//!
//! Mirrors the JSON shape of a vault `login` record: typed fields,
//! labelled custom fields, and file attachments.

use crate::SecretsError;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One typed or labelled field of a record. Values are always an array in
/// the wire format, usually with a single element.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordField {
    #[serde(rename = "type", default)]
    pub field_type: String,

    #[serde(default)]
    pub label: Option<String>,

    #[serde(default)]
    pub value: Vec<Value>,
}

/// A file attached to a record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordFile {
    pub name: String,

    /// Base64-encoded file content.
    #[serde(default)]
    pub data: String,
}

impl RecordFile {
    /// Decode the attachment content.
    pub fn data_bytes(&self) -> Result<Vec<u8>, SecretsError> {
        base64::engine::general_purpose::STANDARD
            .decode(self.data.trim())
            .map_err(|e| {
                SecretsError::InvalidPayload(format!("attachment \"{}\": {e}", self.name))
            })
    }
}

/// A vault record as handed over by the secrets client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretRecord {
    pub uid: String,

    #[serde(rename = "type", default)]
    pub record_type: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub fields: Vec<RecordField>,

    #[serde(default)]
    pub custom: Vec<RecordField>,

    #[serde(default)]
    pub files: Vec<RecordFile>,
}

impl SecretRecord {
    /// First string value of the typed field, if any.
    pub fn field_by_type(&self, field_type: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.field_type == field_type)
            .and_then(|f| f.value.first())
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// The record password.
    pub fn password(&self) -> Option<&str> {
        self.field_by_type("password")
    }

    /// Every custom field carrying this label.
    pub fn custom_fields<'a>(
        &'a self,
        label: &'a str,
    ) -> impl Iterator<Item = &'a RecordField> + 'a {
        self.custom
            .iter()
            .filter(move |f| f.label.as_deref() == Some(label))
    }

    /// Every string value of every custom field carrying this label.
    pub fn custom_values(&self, label: &str) -> Vec<String> {
        self.custom_fields(label)
            .flat_map(|f| f.value.iter())
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()
    }

    /// Boolean custom field, normalized from the spellings seen in the
    /// wild: a JSON bool, the strings `true`/`false`/`yes`/`no`, or the
    /// legacy integer form where `-1` means never and any other integer
    /// means enabled.
    pub fn custom_flag(&self, label: &str) -> Option<bool> {
        let value = self.custom_fields(label).flat_map(|f| f.value.iter()).next()?;
        match value {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_i64().map(|i| i != -1),
            Value::String(s) => match s.trim().to_lowercase().as_str() {
                "true" | "yes" => Some(true),
                "false" | "no" => Some(false),
                other => match other.parse::<i64>() {
                    Ok(i) => Some(i != -1),
                    Err(_) => Some(false),
                },
            },
            _ => None,
        }
    }

    /// Attachment by file name.
    pub fn find_file(&self, name: &str) -> Option<&RecordFile> {
        self.files.iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> SecretRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_field_by_type_returns_first_non_empty_value() {
        let r = record(json!({
            "uid": "r1",
            "type": "login",
            "fields": [
                {"type": "login", "value": ["admin@x.y"]},
                {"type": "url", "value": ["https://x.y/api/rest/scim/v2/abc"]},
                {"type": "password", "value": ["t0ken"]}
            ]
        }));
        assert_eq!(r.field_by_type("login"), Some("admin@x.y"));
        assert_eq!(r.password(), Some("t0ken"));
        assert_eq!(r.field_by_type("oneTimeCode"), None);
    }

    #[test]
    fn test_custom_values_concatenates_matching_labels() {
        let r = record(json!({
            "uid": "r1",
            "custom": [
                {"type": "text", "label": "SCIM Group", "value": ["Eng"]},
                {"type": "text", "label": "SCIM Group", "value": ["Sales", "Ops"]},
                {"type": "text", "label": "Other", "value": ["nope"]}
            ]
        }));
        assert_eq!(r.custom_values("SCIM Group"), vec!["Eng", "Sales", "Ops"]);
        assert!(r.custom_values("SCIM Groups").is_empty());
    }

    #[test]
    fn test_custom_flag_accepts_bool_and_strings() {
        let r = record(json!({
            "uid": "r1",
            "custom": [
                {"type": "text", "label": "Verbose", "value": [true]},
                {"type": "text", "label": "Quiet", "value": ["no"]},
                {"type": "text", "label": "Loud", "value": ["TRUE"]}
            ]
        }));
        assert_eq!(r.custom_flag("Verbose"), Some(true));
        assert_eq!(r.custom_flag("Quiet"), Some(false));
        assert_eq!(r.custom_flag("Loud"), Some(true));
        assert_eq!(r.custom_flag("Missing"), None);
    }

    #[test]
    fn test_custom_flag_normalizes_legacy_integers() {
        let r = record(json!({
            "uid": "r1",
            "custom": [
                {"type": "text", "label": "Destructive", "value": ["-1"]},
                {"type": "text", "label": "Armed", "value": ["2"]},
                {"type": "text", "label": "Odd", "value": ["sometimes"]}
            ]
        }));
        assert_eq!(r.custom_flag("Destructive"), Some(false));
        assert_eq!(r.custom_flag("Armed"), Some(true));
        assert_eq!(r.custom_flag("Odd"), Some(false));
    }

    #[test]
    fn test_file_data_roundtrip() {
        let r = record(json!({
            "uid": "r1",
            "files": [{"name": "credentials.json", "data": "eyJrIjoidiJ9"}]
        }));
        let file = r.find_file("credentials.json").unwrap();
        assert_eq!(file.data_bytes().unwrap(), br#"{"k":"v"}"#);
        assert!(r.find_file("other.json").is_none());
    }
}
