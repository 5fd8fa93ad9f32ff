//! NanoTDF Prelude
//!
//! ```rust
//! use nanotdf::prelude::*;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let kas_key = EcSecretKey::generate(CurveName::Secp256r1);
//! let nanotdf = NanoTdfBuilder::new()
//!     .kas_url("https://kas.example.com")
//!     .policy_plaintext(b"{}".to_vec())
//!     .encrypt(b"data", &kas_key.public_key())?;
//!
//! // NanoTdfExt is in scope, so decryption methods are available
//! assert_eq!(nanotdf.decrypt_with_kas_private_key(&kas_key)?, b"data");
//! # Ok(())
//! # }
//! ```

pub use crate::auth::{AuthError, AuthProvider, StaticBearer, TokenFetcher, TokenSession};
pub use crate::config::{KasClientConfig, NanoTdfConfig};
pub use crate::error::NanoTdfError;

pub use nanotdf_crypto::{
    AesKey, CryptoError, DatasetConfig, EcPublicKey, EcSecretKey, EnvelopeConfig, NanoTdfBuilder,
    NanoTdfDataset, PolicyBindingError,
};
// Extension traits
pub use nanotdf_crypto::NanoTdfExt;
pub use nanotdf_protocol::{BinaryRead, BinaryWrite};

pub use nanotdf_protocol::{
    CipherSuite, CodecError, CurveName, FormatError, Header, NanoTdf, PolicyBody, PolicyType,
    ResourceLocator,
};

#[cfg(feature = "kas-client")]
pub use crate::client::{NanoTdfClient, NanoTdfDatasetClient};
#[cfg(feature = "kas-client")]
pub use crate::kas::{KasClient, KasError};
