//! Optional creator signature block
//!
//! ```text
//! ┌─────────────────────────────┬───────────────────────────┐
//! │ Public Key (33/49/67B)      │ Signature r||s (64-132B)  │
//! └─────────────────────────────┴───────────────────────────┘
//! ```

use crate::binary::{read_bytes, write_bytes, BinaryWrite};
use crate::error::{CodecError, FormatError};
use crate::nanotdf::header::CurveName;
use std::io::{Read, Write};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// Compressed SEC1 point of the signer
    pub public_key: Vec<u8>,
    /// Fixed-size ECDSA `r || s`
    pub signature: Vec<u8>,
}

impl Signature {
    pub fn new(public_key: Vec<u8>, signature: Vec<u8>) -> Self {
        Self {
            public_key,
            signature,
        }
    }

    pub fn validate(&self, curve: CurveName) -> Result<(), FormatError> {
        let expected = curve.compressed_public_key_length();
        if self.public_key.len() != expected {
            return Err(FormatError::SignatureLength {
                field: "public key",
                expected,
                actual: self.public_key.len(),
            });
        }
        let expected = curve.signature_length();
        if self.signature.len() != expected {
            return Err(FormatError::SignatureLength {
                field: "signature",
                expected,
                actual: self.signature.len(),
            });
        }
        Ok(())
    }

    pub fn read_with_curve<R: Read>(reader: &mut R, curve: CurveName) -> Result<Self, CodecError> {
        let public_key = read_bytes(
            reader,
            curve.compressed_public_key_length(),
            "signature public key",
        )?;
        let signature = read_bytes(reader, curve.signature_length(), "signature")?;
        Ok(Self {
            public_key,
            signature,
        })
    }
}

impl BinaryWrite for Signature {
    fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), CodecError> {
        write_bytes(writer, &self.public_key)?;
        write_bytes(writer, &self.signature)?;
        Ok(())
    }

    fn serialized_size(&self) -> usize {
        self.public_key.len() + self.signature.len()
    }
}
