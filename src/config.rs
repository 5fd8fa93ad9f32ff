//! Client configuration
//!
//! Every field has a default, so a config file only needs the values it
//! changes:
//!
//! ```json
//! {
//!   "kas_url": "https://kas.example.com",
//!   "kas": { "timeout_ms": 10000 },
//!   "envelope": { "curve": "secp384r1", "cipher": "aes-256-gcm-128" },
//!   "dataset": { "max_key_iterations": 1000 }
//! }
//! ```

use crate::error::NanoTdfError;
use nanotdf_crypto::{DatasetConfig, EnvelopeConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Version sent in the `virtru-ntdf-version` header
pub const DEFAULT_CLIENT_VERSION: &str = "0.0.1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KasClientConfig {
    /// Applies to each KAS request as a whole
    pub timeout_ms: u64,
    pub client_version: String,
    pub rewrap_path: String,
    pub public_key_path: String,
}

impl Default for KasClientConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            client_version: DEFAULT_CLIENT_VERSION.to_string(),
            rewrap_path: "/v2/rewrap".to_string(),
            public_key_path: "/kas_public_key".to_string(),
        }
    }
}

impl KasClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis())
            .unwrap_or(u64::MAX)
            .max(1);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NanoTdfConfig {
    /// KAS used for encryption; decryption follows the locator in each header
    pub kas_url: Option<String>,
    pub kas: KasClientConfig,
    pub envelope: EnvelopeConfig,
    pub dataset: DatasetConfig,
}

impl NanoTdfConfig {
    pub fn from_json_str(json: &str) -> Result<Self, NanoTdfError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| NanoTdfError::Config(format!("invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), NanoTdfError> {
        if self.kas.timeout_ms == 0 {
            return Err(NanoTdfError::Config("kas.timeout_ms must be positive".to_string()));
        }
        for (name, path) in [
            ("rewrap_path", &self.kas.rewrap_path),
            ("public_key_path", &self.kas.public_key_path),
        ] {
            if !path.starts_with('/') {
                return Err(NanoTdfError::Config(format!(
                    "kas.{} must start with '/', got {:?}",
                    name, path
                )));
            }
        }
        self.dataset.validate()?;
        Ok(())
    }
}
