//! Envelope and dataset settings

use crate::error::CryptoError;
use nanotdf_protocol::{CipherSuite, CurveName, PolicyType};
use serde::{Deserialize, Serialize};

/// Largest number of payloads one dataset key may protect
///
/// The counter is 24 bits wide; `0` belongs to the policy and the top value
/// is never handed out.
pub const MAX_KEY_ITERATIONS: u32 = 8_388_606;

/// Counter value after which a dataset starts asking for a new key
pub const DEFAULT_ROTATION_THRESHOLD: u32 = 0x0070_0000;

/// How single envelopes are built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvelopeConfig {
    pub curve: CurveName,
    pub cipher: CipherSuite,
    pub use_ecdsa_binding: bool,
    /// Representation used when the caller hands over policy content
    pub policy_type: PolicyType,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            curve: CurveName::Secp256r1,
            cipher: CipherSuite::Aes256Gcm96,
            use_ecdsa_binding: false,
            policy_type: PolicyType::EmbeddedEncrypted,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub max_key_iterations: u32,
    pub rotation_threshold: u32,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            max_key_iterations: MAX_KEY_ITERATIONS,
            rotation_threshold: DEFAULT_ROTATION_THRESHOLD,
        }
    }
}

impl DatasetConfig {
    pub fn validate(&self) -> Result<(), CryptoError> {
        if self.max_key_iterations == 0 {
            return Err(CryptoError::InvalidDatasetConfig {
                reason: "max_key_iterations must be at least 1".to_string(),
            });
        }
        if self.max_key_iterations > MAX_KEY_ITERATIONS {
            return Err(CryptoError::InvalidDatasetConfig {
                reason: format!(
                    "max_key_iterations {} exceeds {}",
                    self.max_key_iterations, MAX_KEY_ITERATIONS
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DatasetConfig::default();
        assert_eq!(config.max_key_iterations, MAX_KEY_ITERATIONS);
        assert!(config.validate().is_ok());
        assert_eq!(EnvelopeConfig::default().cipher.tag_bits(), 96);
    }

    #[test]
    fn test_iteration_cap() {
        let config = DatasetConfig {
            max_key_iterations: MAX_KEY_ITERATIONS + 1,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CryptoError::InvalidDatasetConfig { .. })
        ));

        let config = DatasetConfig {
            max_key_iterations: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json() {
        let config: EnvelopeConfig =
            serde_json::from_str(r#"{"curve":"secp384r1","cipher":"aes-256-gcm-128"}"#).unwrap();
        assert_eq!(config.curve, CurveName::Secp384r1);
        assert_eq!(config.cipher, CipherSuite::Aes256Gcm128);
        assert!(!config.use_ecdsa_binding);
        assert_eq!(config.policy_type, PolicyType::EmbeddedEncrypted);

        let dataset: DatasetConfig = serde_json::from_str(r#"{"rotation_threshold":10}"#).unwrap();
        assert_eq!(dataset.max_key_iterations, MAX_KEY_ITERATIONS);
        assert_eq!(dataset.rotation_threshold, 10);
    }
}
