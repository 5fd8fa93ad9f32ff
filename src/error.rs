//! Unified error type for the NanoTDF public API
//!
//! Each layer keeps its own error enum for precise handling; this type
//! wraps them so SDK consumers can use `?` across the whole pipeline.
//!
//! # Example
//!
//! ```no_run
//! use nanotdf::NanoTdfError;
//!
//! fn report(err: &NanoTdfError) {
//!     if err.is_retryable() {
//!         eprintln!("transient failure, retrying: {}", err);
//!     } else if let Some(hint) = err.suggestion() {
//!         eprintln!("{} ({})", err, hint);
//!     }
//! }
//! ```

use crate::auth::AuthError;
use nanotdf_crypto::CryptoError;
use nanotdf_protocol::{CodecError, FormatError};
use thiserror::Error;

/// Unified error type for all NanoTDF operations
///
/// # Error Categories
///
/// - **Codec**: malformed or unsupported envelope bytes
/// - **Crypto**: key agreement, AES-GCM, policy binding or signature failures
/// - **Kas**: rewrap exchange with the Key Access Service
/// - **Auth**: the auth provider could not produce a token
/// - **Config**: invalid client configuration
#[derive(Debug, Error)]
pub enum NanoTdfError {
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[cfg(feature = "kas-client")]
    #[error("KAS error: {0}")]
    Kas(#[from] crate::kas::KasError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<FormatError> for NanoTdfError {
    fn from(err: FormatError) -> Self {
        NanoTdfError::Codec(err.into())
    }
}

impl NanoTdfError {
    /// True only for network failures talking to the KAS
    pub fn is_retryable(&self) -> bool {
        match self {
            #[cfg(feature = "kas-client")]
            Self::Kas(e) => e.is_retryable(),
            _ => false,
        }
    }

    pub fn suggestion(&self) -> Option<&str> {
        match self {
            #[cfg(feature = "kas-client")]
            Self::Kas(e) => e.suggestion(),
            Self::Codec(CodecError::NotImplemented { .. })
            | Self::Crypto(CryptoError::Codec(CodecError::NotImplemented { .. })) => {
                Some("Policy key access (PKA) envelopes are not supported")
            }
            Self::Codec(_) => Some("The input is not a valid NanoTDF v1 envelope"),
            Self::Crypto(e) if e.is_policy_binding() => {
                Some("The policy was modified after encryption; do not trust this envelope")
            }
            Self::Crypto(CryptoError::DatasetExhausted { .. }) => {
                Some("Build a new dataset to rotate the key")
            }
            Self::Auth(AuthError::MissingClientPublicKey) => {
                Some("Bind the request-signing key with update_client_public_key")
            }
            _ => None,
        }
    }

    pub fn is_codec_error(&self) -> bool {
        matches!(self, Self::Codec(_))
    }

    pub fn is_crypto_error(&self) -> bool {
        matches!(self, Self::Crypto(_))
    }

    /// Policy binding mismatch, either local or reported while unwrapping
    pub fn is_policy_binding_error(&self) -> bool {
        match self {
            Self::Crypto(e) => e.is_policy_binding(),
            #[cfg(feature = "kas-client")]
            Self::Kas(crate::kas::KasError::Crypto(e)) => e.is_policy_binding(),
            _ => false,
        }
    }

    pub fn is_kas_error(&self) -> bool {
        #[cfg(feature = "kas-client")]
        {
            matches!(self, Self::Kas(_))
        }
        #[cfg(not(feature = "kas-client"))]
        {
            false
        }
    }

    pub fn is_auth_error(&self) -> bool {
        match self {
            Self::Auth(_) => true,
            #[cfg(feature = "kas-client")]
            Self::Kas(crate::kas::KasError::Auth(_)) => true,
            _ => false,
        }
    }
}
