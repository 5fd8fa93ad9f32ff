//! NanoTDF Policy Structures
//!
//! ```text
//! ┌───────────┬────────────────────────────┬──────────────────────┐
//! │ Type (1B) │ Body (locator or u16+data) │ Binding (8B or r||s) │
//! └───────────┴────────────────────────────┴──────────────────────┘
//! ```

use crate::binary::{read_bytes, read_u16_be, read_u8, write_bytes, write_u16_be, write_u8};
use crate::binary::{BinaryRead, BinaryWrite};
use crate::error::{CodecError, FormatError};
use crate::nanotdf::resource_locator::ResourceLocator;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// GMAC policy binding length in bytes (64-bit tag)
pub const GMAC_BINDING_LEN: usize = 8;

/// Embedded policy content bounds; with the 2-byte prefix the body spans 3..=257 bytes
pub const MIN_EMBEDDED_POLICY_LEN: usize = 1;
pub const MAX_EMBEDDED_POLICY_LEN: usize = 255;

/// Policy type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum PolicyType {
    Remote = 0x00,
    EmbeddedText = 0x01,
    #[default]
    EmbeddedEncrypted = 0x02,
    EmbeddedEncryptedWithPka = 0x03,
}

impl PolicyType {
    pub fn from_byte(tag: u8) -> Result<Self, FormatError> {
        match tag {
            0x00 => Ok(PolicyType::Remote),
            0x01 => Ok(PolicyType::EmbeddedText),
            0x02 => Ok(PolicyType::EmbeddedEncrypted),
            0x03 => Ok(PolicyType::EmbeddedEncryptedWithPka),
            _ => Err(FormatError::UnknownPolicyType { tag, max: 3 }),
        }
    }

    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

/// Policy body variants
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyBody {
    /// Policy held elsewhere, referenced by locator
    Remote(ResourceLocator),
    EmbeddedText(Vec<u8>),
    /// Encrypted with the content key under the reserved IV 0x000000
    EmbeddedEncrypted(Vec<u8>),
    /// Policy key access is not supported; encoding and decoding both fail
    EmbeddedEncryptedWithPka,
}

impl PolicyBody {
    pub fn policy_type(&self) -> PolicyType {
        match self {
            PolicyBody::Remote(_) => PolicyType::Remote,
            PolicyBody::EmbeddedText(_) => PolicyType::EmbeddedText,
            PolicyBody::EmbeddedEncrypted(_) => PolicyType::EmbeddedEncrypted,
            PolicyBody::EmbeddedEncryptedWithPka => PolicyType::EmbeddedEncryptedWithPka,
        }
    }

    /// Bytes the policy binding is computed over
    ///
    /// Remote policies bind the serialized locator; embedded policies bind
    /// their content exactly as it appears on the wire.
    pub fn binding_bytes(&self) -> Result<Vec<u8>, CodecError> {
        match self {
            PolicyBody::Remote(locator) => locator.to_vec(),
            PolicyBody::EmbeddedText(content) | PolicyBody::EmbeddedEncrypted(content) => {
                Ok(content.clone())
            }
            PolicyBody::EmbeddedEncryptedWithPka => Err(CodecError::PKA),
        }
    }

    fn validate(&self) -> Result<(), CodecError> {
        match self {
            PolicyBody::Remote(locator) => Ok(locator.validate()?),
            PolicyBody::EmbeddedText(content) | PolicyBody::EmbeddedEncrypted(content) => {
                validate_embedded_len(content.len())?;
                Ok(())
            }
            PolicyBody::EmbeddedEncryptedWithPka => Err(CodecError::PKA),
        }
    }
}

fn validate_embedded_len(len: usize) -> Result<(), FormatError> {
    if !(MIN_EMBEDDED_POLICY_LEN..=MAX_EMBEDDED_POLICY_LEN).contains(&len) {
        return Err(FormatError::PolicyLengthOutOfRange {
            len,
            min: MIN_EMBEDDED_POLICY_LEN,
            max: MAX_EMBEDDED_POLICY_LEN,
        });
    }
    Ok(())
}

/// Policy with its cryptographic binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    pub body: PolicyBody,
    /// GMAC tag (8 bytes) or ECDSA `r || s` (2 × curve field length)
    pub binding: Vec<u8>,
}

impl Policy {
    pub fn new(body: PolicyBody, binding: Vec<u8>) -> Self {
        Self { body, binding }
    }

    pub fn remote(locator: ResourceLocator, binding: Vec<u8>) -> Self {
        Self::new(PolicyBody::Remote(locator), binding)
    }

    pub fn embedded_text(content: Vec<u8>, binding: Vec<u8>) -> Self {
        Self::new(PolicyBody::EmbeddedText(content), binding)
    }

    pub fn embedded_encrypted(content: Vec<u8>, binding: Vec<u8>) -> Self {
        Self::new(PolicyBody::EmbeddedEncrypted(content), binding)
    }

    pub fn policy_type(&self) -> PolicyType {
        self.body.policy_type()
    }

    /// Validate the body and the binding length the header expects
    pub fn validate(&self, binding_len: usize) -> Result<(), CodecError> {
        self.body.validate()?;
        if self.binding.len() != binding_len {
            return Err(FormatError::BindingLength {
                expected: binding_len,
                actual: self.binding.len(),
            }
            .into());
        }
        Ok(())
    }

    /// Decode a policy whose binding length was fixed by the preceding mode byte
    pub fn read_with_binding<R: Read>(
        reader: &mut R,
        binding_len: usize,
    ) -> Result<Self, CodecError> {
        let policy_type = PolicyType::from_byte(read_u8(reader, "policy type")?)?;

        let body = match policy_type {
            PolicyType::Remote => PolicyBody::Remote(ResourceLocator::read_from(reader)?),
            PolicyType::EmbeddedText | PolicyType::EmbeddedEncrypted => {
                let len = read_u16_be(reader, "embedded policy length")? as usize;
                validate_embedded_len(len)?;
                let content = read_bytes(reader, len, "embedded policy content")?;
                if policy_type == PolicyType::EmbeddedText {
                    PolicyBody::EmbeddedText(content)
                } else {
                    PolicyBody::EmbeddedEncrypted(content)
                }
            }
            PolicyType::EmbeddedEncryptedWithPka => return Err(CodecError::PKA),
        };

        let binding = read_bytes(reader, binding_len, "policy binding")?;
        Ok(Self { body, binding })
    }
}

impl BinaryWrite for Policy {
    fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), CodecError> {
        self.body.validate()?;

        write_u8(writer, self.policy_type().to_byte())?;
        match &self.body {
            PolicyBody::Remote(locator) => locator.write_to(writer)?,
            PolicyBody::EmbeddedText(content) | PolicyBody::EmbeddedEncrypted(content) => {
                write_u16_be(writer, content.len() as u16)?;
                write_bytes(writer, content)?;
            }
            PolicyBody::EmbeddedEncryptedWithPka => return Err(CodecError::PKA),
        }
        write_bytes(writer, &self.binding)?;
        Ok(())
    }

    fn serialized_size(&self) -> usize {
        let body_size = match &self.body {
            PolicyBody::Remote(locator) => locator.serialized_size(),
            PolicyBody::EmbeddedText(content) | PolicyBody::EmbeddedEncrypted(content) => {
                2 + content.len()
            }
            PolicyBody::EmbeddedEncryptedWithPka => 0,
        };
        1 + body_size + self.binding.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nanotdf::resource_locator::Protocol;
    use std::io::Cursor;

    #[test]
    fn test_remote_policy_roundtrip() {
        let locator = ResourceLocator::new(Protocol::Https, "kas.virtru.com/policy");
        let policy = Policy::remote(locator.clone(), vec![0x5A; 64]);

        let bytes = policy.to_vec().unwrap();
        assert_eq!(bytes[0], 0x00);
        assert_eq!(bytes.len(), policy.serialized_size());

        let decoded = Policy::read_with_binding(&mut Cursor::new(&bytes), 64).unwrap();
        assert_eq!(decoded, policy);
        assert_eq!(decoded.body.binding_bytes().unwrap(), locator.to_vec().unwrap());
    }

    #[test]
    fn test_embedded_policy_roundtrip() {
        let policy = Policy::embedded_encrypted(vec![0x42; 100], vec![0x01; GMAC_BINDING_LEN]);
        let bytes = policy.to_vec().unwrap();
        assert_eq!(&bytes[..3], &[0x02, 0x00, 100]);

        let decoded = Policy::read_with_binding(&mut Cursor::new(&bytes), GMAC_BINDING_LEN).unwrap();
        assert_eq!(decoded, policy);
    }

    #[test]
    fn test_embedded_length_bounds() {
        let empty = Policy::embedded_text(Vec::new(), vec![0; GMAC_BINDING_LEN]);
        assert!(matches!(
            empty.to_vec(),
            Err(CodecError::Format(FormatError::PolicyLengthOutOfRange { len: 0, .. }))
        ));

        let max = Policy::embedded_text(vec![b'p'; 255], vec![0; GMAC_BINDING_LEN]);
        assert_eq!(max.to_vec().unwrap().len(), 1 + 257 + GMAC_BINDING_LEN);

        let too_long = Policy::embedded_text(vec![b'p'; 256], vec![0; GMAC_BINDING_LEN]);
        assert!(matches!(
            too_long.to_vec(),
            Err(CodecError::Format(FormatError::PolicyLengthOutOfRange { len: 256, .. }))
        ));

        // length prefix on the wire is checked before the content is read
        let wire = vec![0x01, 0x01, 0x00];
        assert!(matches!(
            Policy::read_with_binding(&mut Cursor::new(wire), GMAC_BINDING_LEN),
            Err(CodecError::Format(FormatError::PolicyLengthOutOfRange { len: 256, .. }))
        ));
    }

    #[test]
    fn test_pka_fails_fast() {
        let policy = Policy::new(PolicyBody::EmbeddedEncryptedWithPka, vec![0; 8]);
        let mut buf = Vec::new();
        let err = policy.write_to(&mut buf).unwrap_err();
        assert!(err.is_not_implemented());
        assert!(buf.is_empty());

        let err = Policy::read_with_binding(&mut Cursor::new(vec![0x03, 0x00, 0x10]), 8)
            .unwrap_err();
        assert!(err.is_not_implemented());
    }

    #[test]
    fn test_unknown_policy_type() {
        let err = Policy::read_with_binding(&mut Cursor::new(vec![0x04]), 8).unwrap_err();
        assert_eq!(
            err,
            CodecError::Format(FormatError::UnknownPolicyType { tag: 4, max: 3 })
        );
    }

    #[test]
    fn test_binding_length_check() {
        let policy = Policy::embedded_text(b"abc".to_vec(), vec![0; 8]);
        assert!(policy.validate(8).is_ok());
        assert_eq!(
            policy.validate(64),
            Err(CodecError::Format(FormatError::BindingLength {
                expected: 64,
                actual: 8
            }))
        );
    }
}
