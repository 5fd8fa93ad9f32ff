//! NanoTDF wire format
//!
//! Typed model and bit-exact codec for NanoTDF v1 envelopes. This crate
//! performs no cryptography and no network I/O; it turns bytes into
//! structures and back, rejecting anything malformed.

pub mod binary;
pub mod error;
pub mod nanotdf;

pub use binary::{BinaryRead, BinaryWrite};
pub use error::{CodecError, FormatError};
pub use nanotdf::{
    CipherSuite, CurveName, EccAndBindingMode, Header, NanoTdf, Payload, Policy, PolicyBody,
    PolicyType, Protocol, ResourceLocator, Signature, SymmetricAndPayloadConfig,
};
