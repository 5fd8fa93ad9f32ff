//! NanoTDF payload framing
//!
//! ```text
//! ┌──────────────┬─────────┬────────────┬────────────────┐
//! │ Length (3B)  │ IV (3B) │ Ciphertext │ Tag (8-16B)    │
//! └──────────────┴─────────┴────────────┴────────────────┘
//! ```
//!
//! The length counts everything after itself. The tag length is not on the
//! wire; it comes from the header's cipher suite.

use crate::binary::{read_array, read_bytes, read_u24_be, write_bytes, write_u24_be, U24_MAX};
use crate::binary::BinaryWrite;
use crate::error::{CodecError, FormatError};
use crate::nanotdf::header::CipherSuite;
use std::io::{Read, Write};

pub const IV_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub iv: [u8; IV_LEN],
    pub ciphertext: Vec<u8>,
    pub auth_tag: Vec<u8>,
}

impl Payload {
    pub fn new(iv: [u8; IV_LEN], ciphertext: Vec<u8>, auth_tag: Vec<u8>) -> Self {
        Self {
            iv,
            ciphertext,
            auth_tag,
        }
    }

    /// Split `ciphertext || tag` as produced by AES-GCM
    pub fn from_sealed(
        iv: [u8; IV_LEN],
        mut sealed: Vec<u8>,
        cipher: CipherSuite,
    ) -> Result<Self, FormatError> {
        let tag_len = cipher.tag_len();
        if sealed.len() < tag_len {
            return Err(FormatError::PayloadTooShort {
                length: IV_LEN + sealed.len(),
                tag_len,
            });
        }
        let auth_tag = sealed.split_off(sealed.len() - tag_len);
        Ok(Self::new(iv, sealed, auth_tag))
    }

    /// `ciphertext || tag`, the form AES-GCM consumes
    pub fn sealed(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.ciphertext.len() + self.auth_tag.len());
        buf.extend_from_slice(&self.ciphertext);
        buf.extend_from_slice(&self.auth_tag);
        buf
    }

    /// Value of the 3-byte length field
    pub fn length(&self) -> usize {
        IV_LEN + self.ciphertext.len() + self.auth_tag.len()
    }

    pub fn read_with_cipher<R: Read>(
        reader: &mut R,
        cipher: CipherSuite,
    ) -> Result<Self, CodecError> {
        let length = read_u24_be(reader, "payload length")? as usize;
        let tag_len = cipher.tag_len();
        if length < IV_LEN + tag_len {
            return Err(FormatError::PayloadTooShort { length, tag_len }.into());
        }

        let iv = read_array(reader, "payload iv")?;
        let ciphertext = read_bytes(reader, length - IV_LEN - tag_len, "payload ciphertext")?;
        let auth_tag = read_bytes(reader, tag_len, "payload auth tag")?;

        Ok(Self {
            iv,
            ciphertext,
            auth_tag,
        })
    }
}

impl BinaryWrite for Payload {
    fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), CodecError> {
        let length = self.length();
        if length > U24_MAX as usize {
            return Err(FormatError::PayloadTooLong { length }.into());
        }

        write_u24_be(writer, length as u32)?;
        write_bytes(writer, &self.iv)?;
        write_bytes(writer, &self.ciphertext)?;
        write_bytes(writer, &self.auth_tag)?;
        Ok(())
    }

    fn serialized_size(&self) -> usize {
        3 + self.length()
    }
}
