//! NanoTDF cryptography
//!
//! Everything needed to seal and open NanoTDF envelopes once the content key
//! is known or can be derived:
//! - EC key agreement on P-256, P-384 and P-521 with HKDF-SHA256 key derivation
//! - AES-256-GCM with 64 to 128-bit tags
//! - GMAC and ECDSA policy binding
//! - optional creator signatures
//! - dataset mode, where one key protects a bounded run of envelopes
//!
//! Key material zeroizes on drop and prints as `[REDACTED]`.
//!
//! # Example
//!
//! ```
//! use nanotdf_crypto::{CurveName, EcSecretKey, NanoTdfBuilder, NanoTdfExt};
//!
//! # fn example() -> Result<(), nanotdf_crypto::CryptoError> {
//! let kas_key = EcSecretKey::generate(CurveName::Secp256r1);
//!
//! let nanotdf = NanoTdfBuilder::new()
//!     .kas_url("https://kas.example.com")
//!     .policy_plaintext(br#"{"body":{}}"#.to_vec())
//!     .encrypt(b"sensitive information", &kas_key.public_key())?;
//!
//! let plaintext = nanotdf.decrypt_with_kas_private_key(&kas_key)?;
//! assert_eq!(plaintext, b"sensitive information");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod kem;
pub mod tdf;
pub mod types;

pub use config::{DatasetConfig, EnvelopeConfig, DEFAULT_ROTATION_THRESHOLD, MAX_KEY_ITERATIONS};
pub use error::{CryptoError, PolicyBindingError};
pub use kem::{EcPublicKey, EcSecretKey};
pub use tdf::{NanoTdfBuilder, NanoTdfDataset, NanoTdfExt, NanoTdfIv, TagSize};
pub use types::AesKey;

pub use nanotdf_protocol::{CipherSuite, CurveName, NanoTdf, PolicyType};
