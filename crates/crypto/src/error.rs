//! Crypto engine errors

use nanotdf_protocol::{CodecError, CurveName};
use thiserror::Error;

/// Policy binding verification failure; never retried
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyBindingError {
    #[error("GMAC policy binding does not match the policy")]
    GmacMismatch,

    #[error("ECDSA policy binding does not verify against the ephemeral key")]
    EcdsaInvalid,

    #[error("Malformed policy binding: {reason}")]
    Malformed { reason: String },
}

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("Unsupported symmetric cipher tag {tag} (valid: 0..=5)")]
    UnsupportedCipher { tag: u8 },

    #[error("Authentication tag mismatch")]
    AuthenticationFailed,

    #[error("Encryption failed")]
    EncryptionFailed,

    #[error("Payload too large: {length} bytes (max 16777215 including IV and tag)")]
    PayloadTooLarge { length: usize },

    #[error("Curve mismatch: expected {expected:?}, got {actual:?}")]
    CurveMismatch {
        expected: CurveName,
        actual: CurveName,
    },

    #[error("Invalid EC key: {0}")]
    InvalidKey(String),

    #[error("PEM/PKCS#8 error: {0}")]
    Pem(String),

    #[error("Elliptic curve error")]
    EllipticCurve(#[from] p256::elliptic_curve::Error),

    #[error("ECDSA error: {0}")]
    Ecdsa(#[from] p256::ecdsa::Error),

    #[error("HKDF expansion failed")]
    KeyDerivation,

    #[error("Envelope carries no creator signature")]
    SignatureMissing,

    #[error("Creator signature does not verify")]
    SignatureInvalid,

    #[error("Dataset key exhausted after {max} iterations; re-key required")]
    DatasetExhausted { max: u32 },

    #[error("Invalid dataset configuration: {reason}")]
    InvalidDatasetConfig { reason: String },

    #[error("Builder is missing {0}")]
    MissingField(&'static str),

    #[error("Policy is not encrypted")]
    PolicyNotEncrypted,

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error(transparent)]
    PolicyBinding(#[from] PolicyBindingError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl From<nanotdf_protocol::FormatError> for CryptoError {
    fn from(err: nanotdf_protocol::FormatError) -> Self {
        CryptoError::Codec(err.into())
    }
}

impl From<hkdf::InvalidLength> for CryptoError {
    fn from(_: hkdf::InvalidLength) -> Self {
        CryptoError::KeyDerivation
    }
}

impl From<aes_gcm::Error> for CryptoError {
    fn from(_: aes_gcm::Error) -> Self {
        CryptoError::AuthenticationFailed
    }
}

impl CryptoError {
    pub fn is_policy_binding(&self) -> bool {
        matches!(self, CryptoError::PolicyBinding(_))
    }

    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, CryptoError::AuthenticationFailed)
    }
}
