//! Complete NanoTDF container: header, payload and optional signature

use crate::binary::{BinaryRead, BinaryWrite};
use crate::error::{CodecError, FormatError};
use crate::nanotdf::{header::Header, payload::Payload, signature::Signature};
use std::io::Cursor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NanoTdf {
    pub header: Header,
    pub payload: Payload,
    /// Present iff `header.payload_config.has_signature`
    pub signature: Option<Signature>,
}

impl NanoTdf {
    pub fn new(header: Header, payload: Payload, signature: Option<Signature>) -> Self {
        Self {
            header,
            payload,
            signature,
        }
    }

    fn validate_signature(&self) -> Result<(), FormatError> {
        let config = self.header.payload_config;
        match (&self.signature, config.has_signature) {
            (Some(sig), true) => sig.validate(config.signature_curve),
            (None, false) => Ok(()),
            (_, expected) => Err(FormatError::SignaturePresence { expected }),
        }
    }

    /// Header followed by framed payload; this is what a creator signature covers
    pub fn signed_bytes(&self) -> Result<Vec<u8>, CodecError> {
        let mut buf =
            Vec::with_capacity(self.header.serialized_size() + self.payload.serialized_size());
        self.header.write_to(&mut buf)?;
        self.payload.write_to(&mut buf)?;
        Ok(buf)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        self.validate_signature()?;

        let mut buf = self.signed_bytes()?;
        if let Some(sig) = &self.signature {
            sig.write_to(&mut buf)?;
        }
        Ok(buf)
    }

    /// Parse a complete envelope; trailing bytes are rejected
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut cursor = Cursor::new(bytes);

        let header = Header::read_from(&mut cursor)?;
        let payload = Payload::read_with_cipher(&mut cursor, header.cipher())?;
        let signature = if header.has_signature() {
            Some(Signature::read_with_curve(
                &mut cursor,
                header.payload_config.signature_curve,
            )?)
        } else {
            None
        };

        let consumed = cursor.position() as usize;
        if consumed != bytes.len() {
            return Err(FormatError::TrailingBytes {
                count: bytes.len() - consumed,
            }
            .into());
        }

        tracing::debug!(
            total = bytes.len(),
            payload = payload.length(),
            signed = signature.is_some(),
            "parsed nanotdf envelope"
        );

        Ok(Self {
            header,
            payload,
            signature,
        })
    }
}
