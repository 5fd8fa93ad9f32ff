//! Traits for binary serialization and deserialization

use crate::error::CodecError;
use std::io::{Read, Write};

/// Types that can be decoded from NanoTDF bytes without outside context
pub trait BinaryRead: Sized {
    fn read_from<R: Read>(reader: &mut R) -> Result<Self, CodecError>;
}

/// Types that can be encoded to NanoTDF bytes
pub trait BinaryWrite {
    /// Write this value. Validation happens before the first byte is written.
    fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), CodecError>;

    /// Size in bytes when serialized
    fn serialized_size(&self) -> usize;

    /// Encode into a fresh buffer
    fn to_vec(&self) -> Result<Vec<u8>, CodecError> {
        let mut buf = Vec::with_capacity(self.serialized_size());
        self.write_to(&mut buf)?;
        Ok(buf)
    }
}
