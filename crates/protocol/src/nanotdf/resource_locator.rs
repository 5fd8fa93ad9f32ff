//! Resource Locator for NanoTDF
//!
//! A compact reference to an external resource: the KAS endpoint and, for
//! remote policies, the policy location.
//!
//! ```text
//! ┌────────────────┬──────────────┬──────────────────┐
//! │ Protocol (1B)  │ Body Len (1B)│ Body (0-255B)    │
//! └────────────────┴──────────────┴──────────────────┘
//! ```

use crate::binary::{read_bytes, read_u8, write_bytes, write_u8, BinaryRead, BinaryWrite};
use crate::error::{CodecError, FormatError};
use std::fmt;
use std::io::{Read, Write};

/// Maximum body length (1-byte length prefix)
pub const MAX_BODY_LEN: usize = 255;

/// Protocol tag for resource location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Protocol {
    Http = 0x00,
    Https = 0x01,
    Unreserved = 0x02,
    SharedResourceDirectory = 0xFF,
}

impl Protocol {
    pub fn from_byte(tag: u8) -> Result<Self, FormatError> {
        match tag {
            0x00 => Ok(Protocol::Http),
            0x01 => Ok(Protocol::Https),
            0x02 => Ok(Protocol::Unreserved),
            0xFF => Ok(Protocol::SharedResourceDirectory),
            _ => Err(FormatError::UnknownProtocol { tag }),
        }
    }

    pub fn to_byte(self) -> u8 {
        self as u8
    }

    fn scheme(self) -> Option<&'static str> {
        match self {
            Protocol::Http => Some("http://"),
            Protocol::Https => Some("https://"),
            Protocol::Unreserved | Protocol::SharedResourceDirectory => None,
        }
    }
}

/// Resource Locator - protocol tag plus UTF-8 body
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceLocator {
    pub protocol: Protocol,
    /// Resource body without scheme, e.g. `kas.example.com/kas`
    pub body: String,
}

impl ResourceLocator {
    /// Create a new resource locator. Length is checked at encode time.
    pub fn new(protocol: Protocol, body: impl Into<String>) -> Self {
        Self {
            protocol,
            body: body.into(),
        }
    }

    /// Parse an `http://` or `https://` URL; any other input is kept verbatim as `Unreserved`
    pub fn from_url(url: &str) -> Self {
        if let Some(rest) = url.strip_prefix("https://") {
            Self::new(Protocol::Https, rest)
        } else if let Some(rest) = url.strip_prefix("http://") {
            Self::new(Protocol::Http, rest)
        } else {
            Self::new(Protocol::Unreserved, url)
        }
    }

    /// Reassemble a URL. Protocols without a scheme return the bare body.
    pub fn to_url(&self) -> String {
        match self.protocol.scheme() {
            Some(scheme) => format!("{}{}", scheme, self.body),
            None => self.body.clone(),
        }
    }

    /// Fail with `LocatorTooLong` if the body cannot be framed
    pub fn validate(&self) -> Result<(), FormatError> {
        if self.body.len() > MAX_BODY_LEN {
            return Err(FormatError::LocatorTooLong {
                len: self.body.len(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for ResourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_url())
    }
}

impl BinaryRead for ResourceLocator {
    fn read_from<R: Read>(reader: &mut R) -> Result<Self, CodecError> {
        let protocol = Protocol::from_byte(read_u8(reader, "resource locator protocol")?)?;
        let body_len = read_u8(reader, "resource locator length")? as usize;
        let body = read_bytes(reader, body_len, "resource locator body")?;
        let body = String::from_utf8(body).map_err(|_| FormatError::InvalidUtf8)?;

        Ok(Self { protocol, body })
    }
}

impl BinaryWrite for ResourceLocator {
    fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), CodecError> {
        self.validate()?;

        write_u8(writer, self.protocol.to_byte())?;
        write_u8(writer, self.body.len() as u8)?;
        write_bytes(writer, self.body.as_bytes())?;
        Ok(())
    }

    fn serialized_size(&self) -> usize {
        2 + self.body.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_from_url() {
        let locator = ResourceLocator::from_url("https://kas.example.com/kas");
        assert_eq!(locator.protocol, Protocol::Https);
        assert_eq!(locator.body, "kas.example.com/kas");
        assert_eq!(locator.to_url(), "https://kas.example.com/kas");

        let locator = ResourceLocator::from_url("http://localhost:65432/kas");
        assert_eq!(locator.protocol, Protocol::Http);
        assert_eq!(locator.body, "localhost:65432/kas");
    }

    #[test]
    fn test_wire_bytes() {
        let locator = ResourceLocator::new(Protocol::Https, "kas.virtru.com");
        let bytes = locator.to_vec().unwrap();
        assert_eq!(bytes[0], 0x01);
        assert_eq!(bytes[1], 14);
        assert_eq!(&bytes[2..], b"kas.virtru.com");
        assert_eq!(bytes.len(), locator.serialized_size());

        let decoded = ResourceLocator::read_from(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(decoded, locator);
    }

    #[test]
    fn test_shared_resource_directory_tag() {
        let locator = ResourceLocator::new(Protocol::SharedResourceDirectory, "srd");
        let bytes = locator.to_vec().unwrap();
        assert_eq!(bytes[0], 0xFF);
        let decoded = ResourceLocator::read_from(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(decoded.protocol, Protocol::SharedResourceDirectory);
    }

    #[test]
    fn test_body_too_long_writes_nothing() {
        let locator = ResourceLocator::new(Protocol::Https, "a".repeat(256));
        let mut buf = Vec::new();
        let err = locator.write_to(&mut buf).unwrap_err();
        assert_eq!(err, CodecError::Format(FormatError::LocatorTooLong { len: 256 }));
        assert!(buf.is_empty());

        let max = ResourceLocator::new(Protocol::Https, "a".repeat(255));
        assert_eq!(max.to_vec().unwrap().len(), 257);
    }

    #[test]
    fn test_unknown_protocol() {
        let err = ResourceLocator::read_from(&mut Cursor::new(vec![0x07, 0x00])).unwrap_err();
        assert_eq!(err, CodecError::Format(FormatError::UnknownProtocol { tag: 0x07 }));
    }

    #[test]
    fn test_truncated_body() {
        let err = ResourceLocator::read_from(&mut Cursor::new(vec![0x01, 0x05, b'k', b'a']))
            .unwrap_err();
        assert_eq!(
            err,
            CodecError::Format(FormatError::Truncated {
                field: "resource locator body"
            })
        );
    }

    #[test]
    fn test_invalid_utf8() {
        let err =
            ResourceLocator::read_from(&mut Cursor::new(vec![0x01, 0x02, 0xC3, 0x28])).unwrap_err();
        assert_eq!(err, CodecError::Format(FormatError::InvalidUtf8));
    }
}
