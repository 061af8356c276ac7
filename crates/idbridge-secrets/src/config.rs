//! Secrets-client configuration discovery.
//!
//! The CLI reads a base64-encoded configuration from `config.base64` in
//! the working directory, falling back to the home directory; the cloud
//! function reads the `KSM_CONFIG_BASE64` environment variable. Either
//! way the decoded payload feeds a [`crate::MemorySource`].

use crate::SecretsError;
use base64::Engine;
use std::path::{Path, PathBuf};

/// Environment variable holding the base64-encoded client configuration.
pub const CONFIG_ENV: &str = "KSM_CONFIG_BASE64";

/// Environment variable selecting a specific record uid.
pub const RECORD_UID_ENV: &str = "KSM_RECORD_UID";

/// Configuration file name probed by the CLI.
pub const CONFIG_FILE: &str = "config.base64";

/// Read and decode the client configuration from the environment.
pub fn client_config_from_env() -> Result<String, SecretsError> {
    let blob = std::env::var(CONFIG_ENV).map_err(|_| {
        SecretsError::ConfigNotFound(format!("environment variable \"{CONFIG_ENV}\" is not set"))
    })?;
    decode(&blob)
}

/// Read and decode the client configuration from disk.
///
/// Probes `config.base64` in the working directory, then in the home
/// directory, unless an explicit path is given.
pub fn client_config_from_file(explicit: Option<&Path>) -> Result<String, SecretsError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => discover_config_file()?,
    };
    let blob = std::fs::read_to_string(&path)
        .map_err(|e| SecretsError::ConfigNotFound(format!("{}: {e}", path.display())))?;
    decode(&blob)
}

fn discover_config_file() -> Result<PathBuf, SecretsError> {
    let local = PathBuf::from(CONFIG_FILE);
    if local.is_file() {
        return Ok(local);
    }
    if let Some(home) = dirs::home_dir() {
        let fallback = home.join(CONFIG_FILE);
        if fallback.is_file() {
            return Ok(fallback);
        }
    }
    Err(SecretsError::ConfigNotFound(format!(
        "\"{CONFIG_FILE}\" was not found in the working directory or the home directory"
    )))
}

fn decode(blob: &str) -> Result<String, SecretsError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(blob.trim())
        .map_err(|e| SecretsError::InvalidPayload(format!("base64: {e}")))?;
    String::from_utf8(bytes).map_err(|e| SecretsError::InvalidPayload(format!("utf-8: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_explicit_config_file_is_decoded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let blob = base64::engine::general_purpose::STANDARD.encode("[]");
        file.write_all(blob.as_bytes()).unwrap();

        let payload = client_config_from_file(Some(file.path())).unwrap();
        assert_eq!(payload, "[]");
    }

    #[test]
    fn test_missing_explicit_file_is_config_not_found() {
        let err = client_config_from_file(Some(Path::new("/nonexistent/config.base64")));
        assert!(matches!(err, Err(SecretsError::ConfigNotFound(_))));
    }

    #[test]
    fn test_invalid_base64_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"not base64 !!!").unwrap();
        assert!(matches!(
            client_config_from_file(Some(file.path())),
            Err(SecretsError::InvalidPayload(_))
        ));
    }
}
