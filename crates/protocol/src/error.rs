//! Codec errors
//!
//! Every decode or encode failure carries the offending value and the range
//! that was expected so callers can report exactly which byte was wrong.

use thiserror::Error;

/// Structural errors in NanoTDF framing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("Invalid magic number and version: {found:02X?} (expected 4C314C)")]
    InvalidMagic { found: [u8; 3] },

    #[error("Truncated input while reading {field}")]
    Truncated { field: &'static str },

    #[error("Unknown resource locator protocol tag 0x{tag:02X} (expected 0x00..=0x02 or 0xFF)")]
    UnknownProtocol { tag: u8 },

    #[error("Unknown curve tag {tag} (expected 0..={max})")]
    UnknownCurve { tag: u8, max: u8 },

    #[error("Unknown cipher tag {tag} (expected 0..={max})")]
    UnknownCipher { tag: u8, max: u8 },

    #[error("Reserved bits set in {field} byte 0x{byte:02X}")]
    ReservedBitsSet { field: &'static str, byte: u8 },

    #[error("Unknown policy type tag {tag} (expected 0..={max})")]
    UnknownPolicyType { tag: u8, max: u8 },

    #[error("Resource locator body is {len} bytes (max 255)")]
    LocatorTooLong { len: usize },

    #[error("Resource locator body is not valid UTF-8")]
    InvalidUtf8,

    #[error("Embedded policy content is {len} bytes (expected {min}..={max})")]
    PolicyLengthOutOfRange { len: usize, min: usize, max: usize },

    #[error("Policy binding is {actual} bytes (expected {expected})")]
    BindingLength { expected: usize, actual: usize },

    #[error("Ephemeral public key is {actual} bytes (expected {expected})")]
    EphemeralKeyLength { expected: usize, actual: usize },

    #[error("Payload length {length} is too short for a 3-byte IV and {tag_len}-byte tag")]
    PayloadTooShort { length: usize, tag_len: usize },

    #[error("Payload length {length} exceeds 0xFFFFFF")]
    PayloadTooLong { length: usize },

    #[error("Signature block does not match curve: {field} is {actual} bytes (expected {expected})")]
    SignatureLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Signature block presence does not match header flag (has_signature = {expected})")]
    SignaturePresence { expected: bool },

    #[error("{count} trailing bytes after envelope")]
    TrailingBytes { count: usize },

    #[error("I/O error: {0}")]
    Io(String),
}

/// Codec failure: either malformed bytes or a variant that is deliberately unsupported
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("Not implemented: {feature}")]
    NotImplemented { feature: &'static str },
}

impl CodecError {
    /// The policy-key-access policy variant
    pub const PKA: Self = Self::NotImplemented {
        feature: "embedded encrypted policy with policy key access",
    };

    /// Returns true for the fail-fast unimplemented variants
    pub fn is_not_implemented(&self) -> bool {
        matches!(self, Self::NotImplemented { .. })
    }
}

impl From<std::io::Error> for FormatError {
    fn from(err: std::io::Error) -> Self {
        FormatError::Io(err.to_string())
    }
}

impl From<std::io::Error> for CodecError {
    fn from(err: std::io::Error) -> Self {
        CodecError::Format(err.into())
    }
}
