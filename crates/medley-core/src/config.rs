//! Remote backend configuration shared by client frontends.
//!
//! These are safe-to-ship public endpoints and keys. Secret credentials
//! (sessions, tokens) never live here.

use serde::{Deserialize, Serialize};

use crate::util::{is_http_url, normalize_text_option};
use crate::{Error, Result};

pub const SUPABASE_URL_ENV: &str = "MEDLEY_SUPABASE_URL";
pub const SUPABASE_ANON_KEY_ENV: &str = "MEDLEY_SUPABASE_ANON_KEY";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

impl BackendConfig {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Result<Self> {
        let supabase_url = normalize_text_option(Some(url.into()))
            .ok_or_else(|| Error::InvalidInput("Supabase URL must not be empty".to_string()))?;
        if !is_http_url(&supabase_url) {
            return Err(Error::InvalidInput(
                "Supabase URL must include http:// or https://".to_string(),
            ));
        }
        let supabase_anon_key = normalize_text_option(Some(anon_key.into())).ok_or_else(|| {
            Error::InvalidInput("Supabase anon key must not be empty".to_string())
        })?;

        Ok(Self {
            supabase_url: supabase_url.trim_end_matches('/').to_string(),
            supabase_anon_key,
        })
    }

    /// Read the backend endpoints from the environment.
    pub fn from_env() -> Result<Option<Self>> {
        Self::from_optional(
            std::env::var(SUPABASE_URL_ENV).ok(),
            std::env::var(SUPABASE_ANON_KEY_ENV).ok(),
        )
    }

    /// Build a config from an optional pair. Both values must be present
    /// or both absent; a lone value is an error.
    pub fn from_optional(url: Option<String>, anon_key: Option<String>) -> Result<Option<Self>> {
        match (normalize_text_option(url), normalize_text_option(anon_key)) {
            (None, None) => Ok(None),
            (Some(url), Some(anon_key)) => Self::new(url, anon_key).map(Some),
            _ => Err(Error::InvalidInput(format!(
                "Set both {SUPABASE_URL_ENV} and {SUPABASE_ANON_KEY_ENV} (or neither)"
            ))),
        }
    }
}
