//! SCIM provider authentication.

use serde::{Deserialize, Serialize};

/// Credentials for a SCIM provider.
///
/// The [`Debug`] impl redacts the token to prevent accidental credential
/// exposure in log output.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ScimCredentials {
    /// Static Bearer token authentication.
    Bearer { token: String },
}

impl ScimCredentials {
    /// Bearer credentials from a token.
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer {
            token: token.into(),
        }
    }

    /// The token to place in the `Authorization: Bearer` header.
    pub(crate) fn token(&self) -> &str {
        match self {
            Self::Bearer { token } => token,
        }
    }
}

impl std::fmt::Debug for ScimCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bearer { .. } => f
                .debug_struct("Bearer")
                .field("token", &"[REDACTED]")
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_token() {
        let credentials = ScimCredentials::bearer("super-secret");
        let debug = format!("{credentials:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("super-secret"));
    }
}
