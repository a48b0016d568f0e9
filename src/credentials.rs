//! API credentials for the generative AI service
//!
//! The key comes from the environment (a `.env` file is loaded at startup)
//! and is wiped from memory when the last copy is dropped.

use crate::error::CredentialsError;
use zeroize::Zeroize;

/// Environment variable holding the API key
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

/// API key for the realtime and analysis endpoints
#[derive(Clone)]
pub struct OpenAICredentials {
    api_key: String,
}

impl OpenAICredentials {
    pub fn new(api_key: impl Into<String>) -> Result<Self, CredentialsError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(CredentialsError::Empty(API_KEY_VAR));
        }
        Ok(Self { api_key })
    }

    /// Read the key from `OPENAI_API_KEY`
    pub fn from_env() -> Result<Self, CredentialsError> {
        let key = std::env::var(API_KEY_VAR).map_err(|_| CredentialsError::Missing(API_KEY_VAR))?;
        Self::new(key)
    }

    pub(crate) fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl std::fmt::Debug for OpenAICredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAICredentials")
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl Drop for OpenAICredentials {
    fn drop(&mut self) {
        self.api_key.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_key_rejected() {
        assert!(matches!(
            OpenAICredentials::new("   "),
            Err(CredentialsError::Empty(API_KEY_VAR))
        ));
    }

    #[test]
    fn test_debug_hides_key() {
        let creds = OpenAICredentials::new("sk-secret").unwrap();
        let printed = format!("{:?}", creds);
        assert!(!printed.contains("sk-secret"));
        assert_eq!(creds.api_key(), "sk-secret");
    }
}
