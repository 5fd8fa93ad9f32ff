//! Key agreement
//!
//! NanoTDF wraps nothing: both sides derive the content key from an EC
//! Diffie-Hellman exchange between the ephemeral key in the header and the
//! KAS static key.

pub mod ec;

pub use ec::{derive_key, EcPublicKey, EcSecretKey};
