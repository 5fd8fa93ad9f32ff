//! NanoTDF Header Structures
//!
//! The header contains all metadata needed to decrypt the payload.
//!
//! ```text
//! ┌───────┬──────────┬─────────┬──────────┬────────┬─────────────────┐
//! │ Magic │ KAS (RL) │ ECC (1B)│ Cfg (1B) │ Policy │ Ephemeral Key   │
//! │ (3B)  │ (2-257B) │         │          │        │ (33/49/67B)     │
//! └───────┴──────────┴─────────┴──────────┴────────┴─────────────────┘
//! ```

use crate::binary::{
    read_array, read_bytes, read_u8, write_bytes, write_u8, BinaryRead, BinaryWrite,
};
use crate::error::{CodecError, FormatError};
use crate::nanotdf::{
    policy::{Policy, GMAC_BINDING_LEN},
    resource_locator::ResourceLocator,
    MAGIC_NUMBER_AND_VERSION,
};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// Magic number and version (3 bytes, "L1L" in base64)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MagicNumberAndVersion {
    pub bytes: [u8; 3],
}

impl Default for MagicNumberAndVersion {
    fn default() -> Self {
        Self {
            bytes: MAGIC_NUMBER_AND_VERSION,
        }
    }
}

impl MagicNumberAndVersion {
    pub fn validate(&self) -> Result<(), FormatError> {
        if self.bytes != MAGIC_NUMBER_AND_VERSION {
            return Err(FormatError::InvalidMagic { found: self.bytes });
        }
        Ok(())
    }
}

impl BinaryRead for MagicNumberAndVersion {
    fn read_from<R: Read>(reader: &mut R) -> Result<Self, CodecError> {
        let magic = Self {
            bytes: read_array(reader, "magic number and version")?,
        };
        magic.validate()?;
        Ok(magic)
    }
}

impl BinaryWrite for MagicNumberAndVersion {
    fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), CodecError> {
        Ok(write_bytes(writer, &self.bytes)?)
    }

    fn serialized_size(&self) -> usize {
        3
    }
}

/// Elliptic curve used for the ephemeral key or the signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum CurveName {
    #[default]
    Secp256r1 = 0x00,
    Secp384r1 = 0x01,
    Secp521r1 = 0x02,
}

impl CurveName {
    pub const ALL: [CurveName; 3] = [Self::Secp256r1, Self::Secp384r1, Self::Secp521r1];

    /// Parse from the 3-bit field
    pub fn from_bits(bits: u8) -> Result<Self, FormatError> {
        match bits & 0x07 {
            0x00 => Ok(CurveName::Secp256r1),
            0x01 => Ok(CurveName::Secp384r1),
            0x02 => Ok(CurveName::Secp521r1),
            tag => Err(FormatError::UnknownCurve { tag, max: 2 }),
        }
    }

    pub fn to_bits(self) -> u8 {
        self as u8
    }

    pub fn bit_length(self) -> usize {
        match self {
            CurveName::Secp256r1 => 256,
            CurveName::Secp384r1 => 384,
            CurveName::Secp521r1 => 521,
        }
    }

    /// Field element length, ⌈bits / 8⌉
    pub fn public_key_length(self) -> usize {
        self.bit_length().div_ceil(8)
    }

    /// Fixed-size `r || s` ECDSA signature length
    pub fn signature_length(self) -> usize {
        2 * self.public_key_length()
    }

    /// SEC1 compressed point length; this is the form keys take on the wire
    pub fn compressed_public_key_length(self) -> usize {
        self.public_key_length() + 1
    }

    /// Algorithm name used in KAS requests, e.g. `ec:secp256r1`
    pub fn kas_algorithm(self) -> &'static str {
        match self {
            CurveName::Secp256r1 => "ec:secp256r1",
            CurveName::Secp384r1 => "ec:secp384r1",
            CurveName::Secp521r1 => "ec:secp521r1",
        }
    }
}

/// Bits between the ECDSA flag and the curve; always zero in v1
const ECC_MODE_RESERVED_BITS: u8 = 0x78;

/// ECC and binding mode byte
///
/// ```text
/// ┌──────────────┬───────────┬────────────────┐
/// │USE_ECDSA (1b)│UNUSED (4b)│ Curve (3b)     │
/// └──────────────┴───────────┴────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EccAndBindingMode {
    /// ECDSA policy binding when set, GMAC otherwise
    pub use_ecdsa_binding: bool,
    pub curve: CurveName,
}

impl EccAndBindingMode {
    pub fn new(use_ecdsa_binding: bool, curve: CurveName) -> Self {
        Self {
            use_ecdsa_binding,
            curve,
        }
    }

    pub fn from_byte(byte: u8) -> Result<Self, FormatError> {
        if byte & ECC_MODE_RESERVED_BITS != 0 {
            return Err(FormatError::ReservedBitsSet {
                field: "ecc and binding mode",
                byte,
            });
        }
        Ok(Self {
            use_ecdsa_binding: byte & 0x80 != 0,
            curve: CurveName::from_bits(byte & 0x07)?,
        })
    }

    pub fn to_byte(self) -> u8 {
        let ecdsa_bit = if self.use_ecdsa_binding { 0x80 } else { 0x00 };
        ecdsa_bit | self.curve.to_bits()
    }

    /// Length of the policy binding that follows the policy body
    pub fn binding_length(self) -> usize {
        if self.use_ecdsa_binding {
            self.curve.signature_length()
        } else {
            GMAC_BINDING_LEN
        }
    }
}

/// AES-256-GCM variants, distinguished only by tag length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum CipherSuite {
    #[serde(rename = "aes-256-gcm-64")]
    Aes256Gcm64 = 0x00,
    #[serde(rename = "aes-256-gcm-96")]
    #[default]
    Aes256Gcm96 = 0x01,
    #[serde(rename = "aes-256-gcm-104")]
    Aes256Gcm104 = 0x02,
    #[serde(rename = "aes-256-gcm-112")]
    Aes256Gcm112 = 0x03,
    #[serde(rename = "aes-256-gcm-120")]
    Aes256Gcm120 = 0x04,
    #[serde(rename = "aes-256-gcm-128")]
    Aes256Gcm128 = 0x05,
}

impl CipherSuite {
    pub const ALL: [CipherSuite; 6] = [
        Self::Aes256Gcm64,
        Self::Aes256Gcm96,
        Self::Aes256Gcm104,
        Self::Aes256Gcm112,
        Self::Aes256Gcm120,
        Self::Aes256Gcm128,
    ];

    /// Parse from the 4-bit field
    pub fn from_bits(bits: u8) -> Result<Self, FormatError> {
        match bits & 0x0F {
            0x00 => Ok(CipherSuite::Aes256Gcm64),
            0x01 => Ok(CipherSuite::Aes256Gcm96),
            0x02 => Ok(CipherSuite::Aes256Gcm104),
            0x03 => Ok(CipherSuite::Aes256Gcm112),
            0x04 => Ok(CipherSuite::Aes256Gcm120),
            0x05 => Ok(CipherSuite::Aes256Gcm128),
            tag => Err(FormatError::UnknownCipher { tag, max: 5 }),
        }
    }

    pub fn to_bits(self) -> u8 {
        self as u8
    }

    /// Authentication tag length in bytes
    pub fn tag_len(self) -> usize {
        match self {
            CipherSuite::Aes256Gcm64 => 8,
            CipherSuite::Aes256Gcm96 => 12,
            CipherSuite::Aes256Gcm104 => 13,
            CipherSuite::Aes256Gcm112 => 14,
            CipherSuite::Aes256Gcm120 => 15,
            CipherSuite::Aes256Gcm128 => 16,
        }
    }

    pub fn tag_bits(self) -> usize {
        self.tag_len() * 8
    }
}

/// Symmetric and payload config byte
///
/// ```text
/// ┌──────────────┬─────────────────┬─────────────────────┐
/// │HAS_SIG (1b)  │Sig Curve (3b)   │Cipher (4b)          │
/// └──────────────┴─────────────────┴─────────────────────┘
/// ```
///
/// The signature curve is carried even when no signature follows so the
/// byte round-trips exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymmetricAndPayloadConfig {
    pub has_signature: bool,
    pub signature_curve: CurveName,
    pub cipher: CipherSuite,
}

impl SymmetricAndPayloadConfig {
    pub fn new(has_signature: bool, signature_curve: CurveName, cipher: CipherSuite) -> Self {
        Self {
            has_signature,
            signature_curve,
            cipher,
        }
    }

    /// Config for an unsigned envelope
    pub fn unsigned(cipher: CipherSuite) -> Self {
        Self::new(false, CurveName::Secp256r1, cipher)
    }

    pub fn from_byte(byte: u8) -> Result<Self, FormatError> {
        Ok(Self {
            has_signature: byte & 0x80 != 0,
            signature_curve: CurveName::from_bits((byte >> 4) & 0x07)?,
            cipher: CipherSuite::from_bits(byte & 0x0F)?,
        })
    }

    pub fn to_byte(self) -> u8 {
        let sig_bit = if self.has_signature { 0x80 } else { 0x00 };
        sig_bit | (self.signature_curve.to_bits() << 4) | self.cipher.to_bits()
    }
}

/// NanoTDF Header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub magic_number_and_version: MagicNumberAndVersion,
    pub kas: ResourceLocator,
    pub ecc_and_binding_mode: EccAndBindingMode,
    pub payload_config: SymmetricAndPayloadConfig,
    pub policy: Policy,
    /// Compressed SEC1 point on `ecc_and_binding_mode.curve`
    pub ephemeral_public_key: Vec<u8>,
}

impl Header {
    pub fn new(
        kas: ResourceLocator,
        ecc_and_binding_mode: EccAndBindingMode,
        payload_config: SymmetricAndPayloadConfig,
        policy: Policy,
        ephemeral_public_key: Vec<u8>,
    ) -> Result<Self, CodecError> {
        let header = Self {
            magic_number_and_version: MagicNumberAndVersion::default(),
            kas,
            ecc_and_binding_mode,
            payload_config,
            policy,
            ephemeral_public_key,
        };
        header.validate()?;
        Ok(header)
    }

    pub fn curve(&self) -> CurveName {
        self.ecc_and_binding_mode.curve
    }

    pub fn cipher(&self) -> CipherSuite {
        self.payload_config.cipher
    }

    pub fn has_signature(&self) -> bool {
        self.payload_config.has_signature
    }

    /// Check every invariant that encoding depends on
    pub fn validate(&self) -> Result<(), CodecError> {
        self.magic_number_and_version.validate()?;
        self.kas.validate()?;
        self.policy
            .validate(self.ecc_and_binding_mode.binding_length())?;

        let expected = self.curve().compressed_public_key_length();
        if self.ephemeral_public_key.len() != expected {
            return Err(FormatError::EphemeralKeyLength {
                expected,
                actual: self.ephemeral_public_key.len(),
            }
            .into());
        }
        Ok(())
    }
}

impl BinaryRead for Header {
    fn read_from<R: Read>(reader: &mut R) -> Result<Self, CodecError> {
        let magic_number_and_version = MagicNumberAndVersion::read_from(reader)?;
        let kas = ResourceLocator::read_from(reader)?;
        let ecc_and_binding_mode =
            EccAndBindingMode::from_byte(read_u8(reader, "ecc and binding mode")?)?;
        let payload_config =
            SymmetricAndPayloadConfig::from_byte(read_u8(reader, "symmetric and payload config")?)?;
        let policy = Policy::read_with_binding(reader, ecc_and_binding_mode.binding_length())?;
        let ephemeral_public_key = read_bytes(
            reader,
            ecc_and_binding_mode.curve.compressed_public_key_length(),
            "ephemeral public key",
        )?;

        tracing::debug!(
            curve = ?ecc_and_binding_mode.curve,
            cipher = ?payload_config.cipher,
            ecdsa_binding = ecc_and_binding_mode.use_ecdsa_binding,
            "parsed nanotdf header"
        );

        Ok(Self {
            magic_number_and_version,
            kas,
            ecc_and_binding_mode,
            payload_config,
            policy,
            ephemeral_public_key,
        })
    }
}

impl BinaryWrite for Header {
    fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), CodecError> {
        self.validate()?;

        self.magic_number_and_version.write_to(writer)?;
        self.kas.write_to(writer)?;
        write_u8(writer, self.ecc_and_binding_mode.to_byte())?;
        write_u8(writer, self.payload_config.to_byte())?;
        self.policy.write_to(writer)?;
        write_bytes(writer, &self.ephemeral_public_key)?;
        Ok(())
    }

    fn serialized_size(&self) -> usize {
        self.magic_number_and_version.serialized_size()
            + self.kas.serialized_size()
            + 2
            + self.policy.serialized_size()
            + self.ephemeral_public_key.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nanotdf::resource_locator::Protocol;
    use std::io::Cursor;

    fn sample_header(ecdsa: bool, curve: CurveName) -> Header {
        let mode = EccAndBindingMode::new(ecdsa, curve);
        let policy = Policy::embedded_text(
            b"{\"body\":{}}".to_vec(),
            vec![0xAB; mode.binding_length()],
        );
        let mut key = vec![0x02];
        key.extend(vec![0x11; curve.public_key_length()]);
        Header::new(
            ResourceLocator::new(Protocol::Https, "kas.example.com"),
            mode,
            SymmetricAndPayloadConfig::unsigned(CipherSuite::Aes256Gcm96),
            policy,
            key,
        )
        .unwrap()
    }

    #[test]
    fn test_curve_lengths() {
        assert_eq!(CurveName::Secp256r1.public_key_length(), 32);
        assert_eq!(CurveName::Secp384r1.public_key_length(), 48);
        assert_eq!(CurveName::Secp521r1.public_key_length(), 66);

        assert_eq!(CurveName::Secp256r1.signature_length(), 64);
        assert_eq!(CurveName::Secp384r1.signature_length(), 96);
        assert_eq!(CurveName::Secp521r1.signature_length(), 132);

        assert_eq!(CurveName::Secp256r1.compressed_public_key_length(), 33);
        assert_eq!(CurveName::Secp521r1.compressed_public_key_length(), 67);
    }

    #[test]
    fn test_cipher_tag_bits() {
        let bits: Vec<usize> = CipherSuite::ALL.iter().map(|c| c.tag_bits()).collect();
        assert_eq!(bits, vec![64, 96, 104, 112, 120, 128]);
    }

    #[test]
    fn test_ecc_and_binding_mode() {
        let mode = EccAndBindingMode::new(true, CurveName::Secp256r1);
        assert_eq!(mode.to_byte(), 0x80);
        assert_eq!(EccAndBindingMode::from_byte(0x80).unwrap(), mode);
        assert_eq!(mode.binding_length(), 64);

        let gmac = EccAndBindingMode::new(false, CurveName::Secp521r1);
        assert_eq!(gmac.to_byte(), 0x02);
        assert_eq!(gmac.binding_length(), GMAC_BINDING_LEN);

        for tag in 3..=7u8 {
            assert_eq!(
                EccAndBindingMode::from_byte(0x80 | tag),
                Err(FormatError::UnknownCurve { tag, max: 2 })
            );
        }
    }

    #[test]
    fn test_ecc_mode_reserved_bits_rejected() {
        for byte in [0x90u8, 0x08, 0x40, 0x7A] {
            assert_eq!(
                EccAndBindingMode::from_byte(byte),
                Err(FormatError::ReservedBitsSet {
                    field: "ecc and binding mode",
                    byte
                })
            );
        }

        let mut bytes = sample_header(true, CurveName::Secp256r1).to_vec().unwrap();
        let at = bytes.iter().position(|&b| b == 0x80).unwrap();
        bytes[at] = 0x90;
        assert!(matches!(
            Header::read_from(&mut Cursor::new(&bytes)),
            Err(CodecError::Format(FormatError::ReservedBitsSet { .. }))
        ));
    }

    #[test]
    fn test_symmetric_and_payload_config() {
        let config =
            SymmetricAndPayloadConfig::new(true, CurveName::Secp256r1, CipherSuite::Aes256Gcm128);
        assert_eq!(config.to_byte(), 0x85);
        assert_eq!(SymmetricAndPayloadConfig::from_byte(0x85).unwrap(), config);

        // signature curve bits survive without the signature flag
        let parsed = SymmetricAndPayloadConfig::from_byte(0x21).unwrap();
        assert!(!parsed.has_signature);
        assert_eq!(parsed.signature_curve, CurveName::Secp521r1);
        assert_eq!(parsed.to_byte(), 0x21);

        for tag in 6..=15u8 {
            assert_eq!(
                SymmetricAndPayloadConfig::from_byte(tag),
                Err(FormatError::UnknownCipher { tag, max: 5 })
            );
        }
    }

    #[test]
    fn test_header_roundtrip_all_curves() {
        for curve in CurveName::ALL {
            for ecdsa in [false, true] {
                let header = sample_header(ecdsa, curve);
                let bytes = header.to_vec().unwrap();
                assert_eq!(bytes.len(), header.serialized_size());

                let decoded = Header::read_from(&mut Cursor::new(&bytes)).unwrap();
                assert_eq!(decoded, header);
                assert_eq!(decoded.to_vec().unwrap(), bytes);
            }
        }
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = sample_header(false, CurveName::Secp256r1).to_vec().unwrap();
        bytes[2] = 0x4D;
        let err = Header::read_from(&mut Cursor::new(bytes)).unwrap_err();
        assert_eq!(
            err,
            CodecError::Format(FormatError::InvalidMagic {
                found: [0x4C, 0x31, 0x4D]
            })
        );
    }

    #[test]
    fn test_wrong_ephemeral_key_length_rejected() {
        let header = sample_header(false, CurveName::Secp384r1);
        let result = Header::new(
            header.kas.clone(),
            header.ecc_and_binding_mode,
            header.payload_config,
            header.policy.clone(),
            vec![0x02; 33],
        );
        assert_eq!(
            result.unwrap_err(),
            CodecError::Format(FormatError::EphemeralKeyLength {
                expected: 49,
                actual: 33
            })
        );
    }
}
