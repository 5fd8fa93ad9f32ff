//! NanoTDF for Rust
//!
//! NanoTDF is a compact, self-describing encrypted envelope. Its header
//! names a Key Access Server (KAS), carries an access policy bound to the
//! content key, and holds an ephemeral EC public key; only a client the KAS
//! authorizes can recover the key and read the payload.
//!
//! The workspace is layered:
//! - [`nanotdf_protocol`]: the binary codec, with no cryptography
//! - [`nanotdf_crypto`]: key agreement, AES-GCM, policy binding, signatures, datasets
//! - this crate: the KAS rewrap client, auth providers and high-level clients
//!
//! # Example
//!
//! ```no_run
//! use nanotdf::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), NanoTdfError> {
//! let kas = KasClient::new(KasClientConfig::default(), Arc::new(StaticBearer::new("token")))?;
//! let client = NanoTdfClient::new("https://kas.example.com", kas);
//!
//! let nanotdf = client.encrypt(b"hello", br#"{"body":{"dissem":["alice"]}}"#).await?;
//! let bytes = nanotdf.to_bytes()?;
//!
//! let plaintext = client.decrypt_bytes(&bytes).await?;
//! assert_eq!(plaintext, b"hello");
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod prelude;

#[cfg(feature = "kas-client")]
pub mod client;
#[cfg(feature = "kas-client")]
pub mod kas;

pub use config::{KasClientConfig, NanoTdfConfig};
pub use error::NanoTdfError;

#[cfg(feature = "kas-client")]
pub use client::{NanoTdfClient, NanoTdfDatasetClient};
#[cfg(feature = "kas-client")]
pub use kas::{KasClient, KasError};

pub use nanotdf_crypto::{
    AesKey, CryptoError, DatasetConfig, EcPublicKey, EcSecretKey, EnvelopeConfig, NanoTdfBuilder,
    NanoTdfDataset, NanoTdfExt, PolicyBindingError,
};
pub use nanotdf_protocol::{
    BinaryRead, BinaryWrite, CipherSuite, CodecError, CurveName, FormatError, Header, NanoTdf,
    Payload, Policy, PolicyBody, PolicyType, Protocol, ResourceLocator, Signature,
};

pub use nanotdf_crypto;
pub use nanotdf_protocol;
