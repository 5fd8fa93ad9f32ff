//! Big-endian primitives shared by every NanoTDF codec
//!
//! Readers name the field they are reading so that a short input reports
//! where the envelope was cut off.

use crate::error::FormatError;
use std::io::{self, Read, Write};

pub mod traits;

pub use traits::{BinaryRead, BinaryWrite};

/// Largest value representable in a u24 length field
pub const U24_MAX: u32 = 0x00FF_FFFF;

fn read_exact<R: Read>(
    reader: &mut R,
    buf: &mut [u8],
    field: &'static str,
) -> Result<(), FormatError> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => FormatError::Truncated { field },
        _ => FormatError::Io(e.to_string()),
    })
}

pub fn read_u8<R: Read>(reader: &mut R, field: &'static str) -> Result<u8, FormatError> {
    let mut buf = [0u8; 1];
    read_exact(reader, &mut buf, field)?;
    Ok(buf[0])
}

pub fn read_u16_be<R: Read>(reader: &mut R, field: &'static str) -> Result<u16, FormatError> {
    let mut buf = [0u8; 2];
    read_exact(reader, &mut buf, field)?;
    Ok(u16::from_be_bytes(buf))
}

/// Read a 3-byte big-endian integer, widened to u32
pub fn read_u24_be<R: Read>(reader: &mut R, field: &'static str) -> Result<u32, FormatError> {
    let mut buf = [0u8; 3];
    read_exact(reader, &mut buf, field)?;
    Ok(u32::from_be_bytes([0, buf[0], buf[1], buf[2]]))
}

pub fn read_array<R: Read, const N: usize>(
    reader: &mut R,
    field: &'static str,
) -> Result<[u8; N], FormatError> {
    let mut buf = [0u8; N];
    read_exact(reader, &mut buf, field)?;
    Ok(buf)
}

pub fn read_bytes<R: Read>(
    reader: &mut R,
    n: usize,
    field: &'static str,
) -> Result<Vec<u8>, FormatError> {
    let mut buf = vec![0u8; n];
    read_exact(reader, &mut buf, field)?;
    Ok(buf)
}

pub fn write_u8<W: Write>(writer: &mut W, value: u8) -> Result<(), FormatError> {
    Ok(writer.write_all(&[value])?)
}

pub fn write_u16_be<W: Write>(writer: &mut W, value: u16) -> Result<(), FormatError> {
    Ok(writer.write_all(&value.to_be_bytes())?)
}

/// Write the low 24 bits of `value`; anything larger is a length overflow
pub fn write_u24_be<W: Write>(writer: &mut W, value: u32) -> Result<(), FormatError> {
    if value > U24_MAX {
        return Err(FormatError::PayloadTooLong {
            length: value as usize,
        });
    }
    let bytes = value.to_be_bytes();
    Ok(writer.write_all(&bytes[1..4])?)
}

pub fn write_bytes<W: Write>(writer: &mut W, bytes: &[u8]) -> Result<(), FormatError> {
    Ok(writer.write_all(bytes)?)
}
