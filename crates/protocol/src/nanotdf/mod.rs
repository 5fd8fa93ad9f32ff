//! NanoTDF v1 container
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │  Header                             │
//! │  magic · kas · ecc · cfg · policy · │
//! │  ephemeral key                      │
//! ├─────────────────────────────────────┤
//! │  Payload (len24 · iv · ct · tag)    │
//! ├─────────────────────────────────────┤
//! │  Signature (optional)               │
//! └─────────────────────────────────────┘
//! ```
//!
//! All multi-byte integers are big-endian. The magic `4C 31 4C` reads as
//! `L1L` in base64.

pub mod envelope;
pub mod header;
pub mod payload;
pub mod policy;
pub mod resource_locator;
pub mod signature;

pub use envelope::NanoTdf;
pub use header::{
    CipherSuite, CurveName, EccAndBindingMode, Header, MagicNumberAndVersion,
    SymmetricAndPayloadConfig,
};
pub use payload::Payload;
pub use policy::{Policy, PolicyBody, PolicyType};
pub use resource_locator::{Protocol, ResourceLocator};
pub use signature::Signature;

/// Magic number (18 bits) + version (6 bits)
pub const MAGIC_NUMBER_AND_VERSION: [u8; 3] = [0x4C, 0x31, 0x4C];

/// HKDF salt for key derivation: SHA256(MAGIC_NUMBER_AND_VERSION)
pub const HKDF_SALT: [u8; 32] = [
    0x3d, 0xe3, 0xca, 0x1e, 0x50, 0xcf, 0x62, 0xd8, 0xb6, 0xab, 0xa6, 0x03, 0xa9, 0x6f, 0xca, 0x67,
    0x61, 0x38, 0x7a, 0x7a, 0xc8, 0x6c, 0x3d, 0x3a, 0xfe, 0x85, 0xae, 0x2d, 0x18, 0x12, 0xed, 0xfc,
];

/// Reserved payload IV for the encrypted policy
pub const POLICY_IV: [u8; 3] = [0x00, 0x00, 0x00];

/// Largest value of the 3-byte payload length field
pub const MAX_PAYLOAD_LENGTH: u32 = crate::binary::U24_MAX;
