//! Record selection and sync-settings extraction.

use crate::record::SecretRecord;
use crate::SecretsError;
use url::Url;

/// URL path prefix identifying a SCIM provisioning endpoint record.
const SCIM_PATH_PREFIX: &str = "/api/rest/scim/v2/";

/// Attachment carrying the service-account credentials.
const CREDENTIALS_FILE: &str = "credentials.json";

/// Parameters for the downstream SCIM provider.
///
/// The [`Debug`] impl redacts the bearer token to keep it out of logs.
#[derive(Clone)]
pub struct ScimParameters {
    /// SCIM 2.0 base URL.
    pub url: String,

    /// Bearer token for every SCIM request.
    pub token: String,

    /// Carry request/response detail into the tally entries.
    pub verbose: bool,

    /// Delete provider entities absent from the source.
    pub destructive: bool,
}

impl std::fmt::Debug for ScimParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScimParameters")
            .field("url", &self.url)
            .field("token", &"[REDACTED]")
            .field("verbose", &self.verbose)
            .field("destructive", &self.destructive)
            .finish()
    }
}

/// Parameters for the source directory adapter.
///
/// The [`Debug`] impl redacts the service-account credential bytes.
#[derive(Clone)]
pub struct DirectoryParameters {
    /// Admin account the service account impersonates.
    pub admin_account: String,

    /// Raw `credentials.json` content (service-account JWT material).
    pub credentials: Vec<u8>,

    /// Raw group-filter entries, normalized later by the source adapter.
    pub scim_groups: Vec<String>,
}

impl std::fmt::Debug for DirectoryParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryParameters")
            .field("admin_account", &self.admin_account)
            .field("credentials", &"[REDACTED]")
            .field("scim_groups", &self.scim_groups)
            .finish()
    }
}

/// Everything one reconciliation run is parameterized by.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub scim: ScimParameters,
    pub directory: DirectoryParameters,
}

/// Select the SCIM sync record among the reachable ones.
///
/// The record is a `login` record whose `url` path starts with
/// `/api/rest/scim/v2/` and which carries a `credentials.json` attachment.
/// The first match wins.
pub fn select_scim_record<'a>(
    records: &'a [SecretRecord],
    uid: Option<&str>,
) -> Result<&'a SecretRecord, SecretsError> {
    records
        .iter()
        .filter(|r| uid.map_or(true, |u| r.uid == u))
        .find(|r| is_scim_record(r))
        .ok_or(SecretsError::RecordNotFound)
}

fn is_scim_record(record: &SecretRecord) -> bool {
    if record.record_type != "login" {
        return false;
    }
    let Some(web_url) = record.field_by_type("url") else {
        return false;
    };
    let Ok(url) = Url::parse(web_url) else {
        return false;
    };
    url.path().starts_with(SCIM_PATH_PREFIX) && record.find_file(CREDENTIALS_FILE).is_some()
}

impl SyncSettings {
    /// Extract the run parameters from a selected record.
    ///
    /// Fails on any missing piece, before any directory or SCIM I/O.
    pub fn from_record(record: &SecretRecord) -> Result<Self, SecretsError> {
        let url = record
            .field_by_type("url")
            .ok_or_else(|| SecretsError::MissingField("url".to_string()))?
            .to_string();
        let token = record
            .password()
            .ok_or_else(|| SecretsError::MissingField("password".to_string()))?
            .to_string();
        let admin_account = record
            .field_by_type("login")
            .ok_or_else(|| SecretsError::MissingField("login".to_string()))?
            .to_string();

        let credentials = record
            .find_file(CREDENTIALS_FILE)
            .ok_or_else(|| SecretsError::MissingFile {
                uid: record.uid.clone(),
                name: CREDENTIALS_FILE.to_string(),
            })?
            .data_bytes()?;

        let mut scim_groups = record.custom_values("SCIM Group");
        scim_groups.extend(record.custom_values("SCIM Groups"));
        if scim_groups.iter().all(|g| g.trim().is_empty()) {
            return Err(SecretsError::MissingField("SCIM Group".to_string()));
        }

        Ok(Self {
            scim: ScimParameters {
                url,
                token,
                verbose: record.custom_flag("Verbose").unwrap_or(false),
                destructive: record.custom_flag("Destructive").unwrap_or(false),
            },
            directory: DirectoryParameters {
                admin_account,
                credentials,
                scim_groups,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scim_record(uid: &str) -> SecretRecord {
        serde_json::from_value(json!({
            "uid": uid,
            "type": "login",
            "title": "SCIM Sync",
            "fields": [
                {"type": "login", "value": ["admin@x.y"]},
                {"type": "url", "value": ["https://keeper.example/api/rest/scim/v2/abc"]},
                {"type": "password", "value": ["bearer-token"]}
            ],
            "custom": [
                {"type": "text", "label": "SCIM Group", "value": ["Eng, Sales"]},
                {"type": "text", "label": "SCIM Groups", "value": ["Ops"]},
                {"type": "text", "label": "Verbose", "value": [true]},
                {"type": "text", "label": "Destructive", "value": ["-1"]}
            ],
            "files": [{"name": "credentials.json", "data": "eyJrIjoidiJ9"}]
        }))
        .unwrap()
    }

    fn plain_login_record(uid: &str) -> SecretRecord {
        serde_json::from_value(json!({
            "uid": uid,
            "type": "login",
            "fields": [{"type": "url", "value": ["https://keeper.example/vault"]}]
        }))
        .unwrap()
    }

    #[test]
    fn test_select_scans_for_the_scim_record() {
        let records = vec![plain_login_record("r1"), scim_record("r2")];
        let selected = select_scim_record(&records, None).unwrap();
        assert_eq!(selected.uid, "r2");
    }

    #[test]
    fn test_select_honors_uid_filter() {
        let records = vec![scim_record("r1"), scim_record("r2")];
        let selected = select_scim_record(&records, Some("r2")).unwrap();
        assert_eq!(selected.uid, "r2");
        assert!(matches!(
            select_scim_record(&records, Some("r3")),
            Err(SecretsError::RecordNotFound)
        ));
    }

    #[test]
    fn test_select_requires_path_and_attachment() {
        let mut no_attachment = scim_record("r1");
        no_attachment.files.clear();
        assert!(matches!(
            select_scim_record(&[no_attachment], None),
            Err(SecretsError::RecordNotFound)
        ));

        assert!(matches!(
            select_scim_record(&[plain_login_record("r1")], None),
            Err(SecretsError::RecordNotFound)
        ));
    }

    #[test]
    fn test_settings_extraction() {
        let record = scim_record("r1");
        let settings = SyncSettings::from_record(&record).unwrap();
        assert_eq!(settings.scim.url, "https://keeper.example/api/rest/scim/v2/abc");
        assert_eq!(settings.scim.token, "bearer-token");
        assert!(settings.scim.verbose);
        assert!(!settings.scim.destructive);
        assert_eq!(settings.directory.admin_account, "admin@x.y");
        assert_eq!(settings.directory.credentials, br#"{"k":"v"}"#);
        assert_eq!(settings.directory.scim_groups, vec!["Eng, Sales", "Ops"]);
    }

    #[test]
    fn test_settings_require_filter_fields() {
        let mut record = scim_record("r1");
        record.custom.retain(|f| {
            f.label.as_deref() != Some("SCIM Group") && f.label.as_deref() != Some("SCIM Groups")
        });
        match SyncSettings::from_record(&record) {
            Err(SecretsError::MissingField(label)) => assert_eq!(label, "SCIM Group"),
            other => panic!("expected MissingField, got {other:?}"),
        }
    }

    #[test]
    fn test_settings_require_credentials_attachment() {
        let mut record = scim_record("r1");
        record.files.clear();
        assert!(matches!(
            SyncSettings::from_record(&record),
            Err(SecretsError::MissingFile { .. })
        ));
    }
}
