//! Elliptic curve keys for NanoTDF
//!
//! ECDH over secp256r1/secp384r1/secp521r1 followed by HKDF-SHA256 with the
//! NanoTDF salt, plus ECDSA (SHA-256 prehash) for policy bindings and
//! creator signatures.
//!
//! # Protocol Flow
//!
//! 1. Generate an ephemeral key pair on the header curve
//! 2. ECDH with the recipient public key; the shared secret is the affine x
//! 3. HKDF-SHA256(salt = SHA256("L1L"), info = "") → 32-byte AES key

use crate::error::CryptoError;
use crate::types::AesKey;
use der::{Reader, SliceReader};
use hkdf::Hkdf;
use nanotdf_protocol::nanotdf::HKDF_SALT;
use nanotdf_protocol::CurveName;
use p256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePublicKey, LineEnding};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use std::fmt;

/// HKDF-SHA256 over an ECDH shared secret
pub fn derive_key(shared_secret: &[u8]) -> Result<AesKey, CryptoError> {
    let hkdf = Hkdf::<Sha256>::new(Some(&HKDF_SALT), shared_secret);
    let mut okm = [0u8; AesKey::LEN];
    hkdf.expand(&[], &mut okm)?;
    Ok(AesKey::from_bytes(okm))
}

/// SHA-256 digest left-padded to the curve's field size
///
/// A digest shorter than the field is used whole as the ECDSA integer, so
/// zero-padding it changes nothing numerically.
fn field_prehash(curve: CurveName, message: &[u8]) -> Vec<u8> {
    let digest = Sha256::digest(message);
    let field_len = curve.public_key_length();
    let mut prehash = vec![0u8; field_len.saturating_sub(digest.len())];
    prehash.extend_from_slice(&digest);
    prehash
}

const CERTIFICATE_PEM_BOUNDARY: &str = "-----BEGIN CERTIFICATE-----";

/// Raw `subjectPublicKeyInfo` TLV of a DER certificate
///
/// ```text
/// Certificate ::= SEQUENCE { tbsCertificate, signatureAlgorithm, signatureValue }
/// TBSCertificate ::= SEQUENCE {
///     version [0] EXPLICIT OPTIONAL, serialNumber, signature,
///     issuer, validity, subject, subjectPublicKeyInfo, ... }
/// ```
fn certificate_spki(der_bytes: &[u8]) -> der::Result<&[u8]> {
    let mut reader = SliceReader::new(der_bytes)?;
    let spki = reader.sequence(|certificate| {
        let spki = certificate.sequence(|tbs| {
            if tbs.peek_tag()?.is_context_specific() {
                tbs.tlv_bytes()?;
            }
            // serialNumber, signature, issuer, validity, subject
            for _ in 0..5 {
                tbs.tlv_bytes()?;
            }
            let spki = tbs.tlv_bytes()?;
            // issuerUniqueID, subjectUniqueID, extensions
            while !tbs.is_finished() {
                tbs.tlv_bytes()?;
            }
            Ok(spki)
        })?;
        while !certificate.is_finished() {
            certificate.tlv_bytes()?;
        }
        Ok(spki)
    })?;
    reader.finish(spki)
}

/// Private key on one of the NanoTDF curves
#[derive(Clone)]
pub enum EcSecretKey {
    P256(p256::SecretKey),
    P384(p384::SecretKey),
    P521(p521::SecretKey),
}

impl EcSecretKey {
    pub fn generate(curve: CurveName) -> Self {
        match curve {
            CurveName::Secp256r1 => Self::P256(p256::SecretKey::random(&mut OsRng)),
            CurveName::Secp384r1 => Self::P384(p384::SecretKey::random(&mut OsRng)),
            CurveName::Secp521r1 => Self::P521(p521::SecretKey::random(&mut OsRng)),
        }
    }

    /// Raw big-endian scalar
    pub fn from_bytes(curve: CurveName, bytes: &[u8]) -> Result<Self, CryptoError> {
        Ok(match curve {
            CurveName::Secp256r1 => Self::P256(p256::SecretKey::from_slice(bytes)?),
            CurveName::Secp384r1 => Self::P384(p384::SecretKey::from_slice(bytes)?),
            CurveName::Secp521r1 => Self::P521(p521::SecretKey::from_slice(bytes)?),
        })
    }

    /// PKCS#8 DER; the curve is taken from the key's algorithm parameters
    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self, CryptoError> {
        if let Ok(key) = p256::SecretKey::from_pkcs8_der(der) {
            return Ok(Self::P256(key));
        }
        if let Ok(key) = p384::SecretKey::from_pkcs8_der(der) {
            return Ok(Self::P384(key));
        }
        p521::SecretKey::from_pkcs8_der(der)
            .map(Self::P521)
            .map_err(|e| CryptoError::Pem(e.to_string()))
    }

    pub fn from_pkcs8_pem(pem: &str) -> Result<Self, CryptoError> {
        if let Ok(key) = p256::SecretKey::from_pkcs8_pem(pem) {
            return Ok(Self::P256(key));
        }
        if let Ok(key) = p384::SecretKey::from_pkcs8_pem(pem) {
            return Ok(Self::P384(key));
        }
        p521::SecretKey::from_pkcs8_pem(pem)
            .map(Self::P521)
            .map_err(|e| CryptoError::Pem(e.to_string()))
    }

    pub fn curve(&self) -> CurveName {
        match self {
            Self::P256(_) => CurveName::Secp256r1,
            Self::P384(_) => CurveName::Secp384r1,
            Self::P521(_) => CurveName::Secp521r1,
        }
    }

    pub fn public_key(&self) -> EcPublicKey {
        match self {
            Self::P256(sk) => EcPublicKey::P256(sk.public_key()),
            Self::P384(sk) => EcPublicKey::P384(sk.public_key()),
            Self::P521(sk) => EcPublicKey::P521(sk.public_key()),
        }
    }

    /// ECDH followed by HKDF; the peer must be on the same curve
    pub fn derive_key(&self, peer: &EcPublicKey) -> Result<AesKey, CryptoError> {
        match (self, peer) {
            (Self::P256(sk), EcPublicKey::P256(pk)) => {
                let shared = p256::ecdh::diffie_hellman(sk.to_nonzero_scalar(), pk.as_affine());
                derive_key(shared.raw_secret_bytes())
            }
            (Self::P384(sk), EcPublicKey::P384(pk)) => {
                let shared = p384::ecdh::diffie_hellman(sk.to_nonzero_scalar(), pk.as_affine());
                derive_key(shared.raw_secret_bytes())
            }
            (Self::P521(sk), EcPublicKey::P521(pk)) => {
                let shared = p521::ecdh::diffie_hellman(sk.to_nonzero_scalar(), pk.as_affine());
                derive_key(shared.raw_secret_bytes())
            }
            _ => Err(CryptoError::CurveMismatch {
                expected: self.curve(),
                actual: peer.curve(),
            }),
        }
    }

    /// ECDSA over SHA-256(message); fixed-size `r || s`
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let prehash = field_prehash(self.curve(), message);
        let signature = match self {
            Self::P256(sk) => {
                let signer = p256::ecdsa::SigningKey::from_bytes(&sk.to_bytes())?;
                let sig: p256::ecdsa::Signature = signer.sign_prehash(&prehash)?;
                sig.to_bytes().to_vec()
            }
            Self::P384(sk) => {
                let signer = p384::ecdsa::SigningKey::from_bytes(&sk.to_bytes())?;
                let sig: p384::ecdsa::Signature = signer.sign_prehash(&prehash)?;
                sig.to_bytes().to_vec()
            }
            Self::P521(sk) => {
                let signer = p521::ecdsa::SigningKey::from_bytes(&sk.to_bytes())?;
                let sig: p521::ecdsa::Signature = signer.sign_prehash(&prehash)?;
                sig.to_bytes().to_vec()
            }
        };
        Ok(signature)
    }
}

impl fmt::Debug for EcSecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EcSecretKey({:?}, [REDACTED])", self.curve())
    }
}

/// Public key on one of the NanoTDF curves
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EcPublicKey {
    P256(p256::PublicKey),
    P384(p384::PublicKey),
    P521(p521::PublicKey),
}

impl EcPublicKey {
    /// Compressed or uncompressed SEC1 point
    pub fn from_sec1_bytes(curve: CurveName, bytes: &[u8]) -> Result<Self, CryptoError> {
        let key = match curve {
            CurveName::Secp256r1 => Self::P256(p256::PublicKey::from_sec1_bytes(bytes)?),
            CurveName::Secp384r1 => Self::P384(p384::PublicKey::from_sec1_bytes(bytes)?),
            CurveName::Secp521r1 => Self::P521(p521::PublicKey::from_sec1_bytes(bytes)?),
        };
        Ok(key)
    }

    /// SubjectPublicKeyInfo or X.509 certificate PEM; the curve is detected from the key
    pub fn from_pem(pem: &str) -> Result<Self, CryptoError> {
        if pem.trim_start().starts_with(CERTIFICATE_PEM_BOUNDARY) {
            return Self::from_certificate_pem(pem);
        }
        if let Ok(key) = p256::PublicKey::from_public_key_pem(pem) {
            return Ok(Self::P256(key));
        }
        if let Ok(key) = p384::PublicKey::from_public_key_pem(pem) {
            return Ok(Self::P384(key));
        }
        p521::PublicKey::from_public_key_pem(pem)
            .map(Self::P521)
            .map_err(|e| CryptoError::Pem(e.to_string()))
    }

    /// Subject public key of an X.509 certificate. The certificate itself is
    /// not validated.
    pub fn from_certificate_pem(pem: &str) -> Result<Self, CryptoError> {
        let (label, der_bytes) = der::pem::decode_vec(pem.trim_start().as_bytes())
            .map_err(|e| CryptoError::Pem(e.to_string()))?;
        if label != "CERTIFICATE" {
            return Err(CryptoError::Pem(format!(
                "expected a CERTIFICATE, found {}",
                label
            )));
        }
        let spki = certificate_spki(&der_bytes)
            .map_err(|e| CryptoError::Pem(format!("malformed certificate: {}", e)))?;
        Self::from_public_key_der(spki)
    }

    /// SubjectPublicKeyInfo DER
    pub fn from_public_key_der(der: &[u8]) -> Result<Self, CryptoError> {
        if let Ok(key) = p256::PublicKey::from_public_key_der(der) {
            return Ok(Self::P256(key));
        }
        if let Ok(key) = p384::PublicKey::from_public_key_der(der) {
            return Ok(Self::P384(key));
        }
        p521::PublicKey::from_public_key_der(der)
            .map(Self::P521)
            .map_err(|e| CryptoError::Pem(e.to_string()))
    }

    pub fn curve(&self) -> CurveName {
        match self {
            Self::P256(_) => CurveName::Secp256r1,
            Self::P384(_) => CurveName::Secp384r1,
            Self::P521(_) => CurveName::Secp521r1,
        }
    }

    /// SEC1 compressed point, the on-wire form
    pub fn to_compressed(&self) -> Vec<u8> {
        match self {
            Self::P256(pk) => pk.to_encoded_point(true).as_bytes().to_vec(),
            Self::P384(pk) => pk.to_encoded_point(true).as_bytes().to_vec(),
            Self::P521(pk) => pk.to_encoded_point(true).as_bytes().to_vec(),
        }
    }

    pub fn to_pem(&self) -> Result<String, CryptoError> {
        let pem = match self {
            Self::P256(pk) => pk.to_public_key_pem(LineEnding::LF),
            Self::P384(pk) => pk.to_public_key_pem(LineEnding::LF),
            Self::P521(pk) => pk.to_public_key_pem(LineEnding::LF),
        };
        pem.map_err(|e| CryptoError::Pem(e.to_string()))
    }

    /// Verify an ECDSA `r || s` signature over SHA-256(message)
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
        let prehash = field_prehash(self.curve(), message);
        let point = self.to_compressed();
        match self {
            Self::P256(_) => {
                let verifier = p256::ecdsa::VerifyingKey::from_sec1_bytes(&point)?;
                let sig = p256::ecdsa::Signature::from_slice(signature)?;
                verifier.verify_prehash(&prehash, &sig)?;
            }
            Self::P384(_) => {
                let verifier = p384::ecdsa::VerifyingKey::from_sec1_bytes(&point)?;
                let sig = p384::ecdsa::Signature::from_slice(signature)?;
                verifier.verify_prehash(&prehash, &sig)?;
            }
            Self::P521(_) => {
                let verifier = p521::ecdsa::VerifyingKey::from_sec1_bytes(&point)?;
                let sig = p521::ecdsa::Signature::from_slice(signature)?;
                verifier.verify_prehash(&prehash, &sig)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compressed_lengths() {
        for curve in CurveName::ALL {
            let sk = EcSecretKey::generate(curve);
            let point = sk.public_key().to_compressed();
            assert_eq!(point.len(), curve.compressed_public_key_length());
            assert!(point[0] == 0x02 || point[0] == 0x03);

            let parsed = EcPublicKey::from_sec1_bytes(curve, &point).unwrap();
            assert_eq!(parsed, sk.public_key());
        }
    }

    #[test]
    fn test_ecdh_agreement_both_sides() {
        for curve in CurveName::ALL {
            let kas = EcSecretKey::generate(curve);
            let ephemeral = EcSecretKey::generate(curve);

            let sender = ephemeral.derive_key(&kas.public_key()).unwrap();
            let receiver = kas.derive_key(&ephemeral.public_key()).unwrap();
            assert_eq!(sender.as_slice(), receiver.as_slice());
        }
    }

    #[test]
    fn test_curve_mismatch_rejected() {
        let a = EcSecretKey::generate(CurveName::Secp256r1);
        let b = EcSecretKey::generate(CurveName::Secp384r1);
        assert!(matches!(
            a.derive_key(&b.public_key()),
            Err(CryptoError::CurveMismatch {
                expected: CurveName::Secp256r1,
                actual: CurveName::Secp384r1
            })
        ));
    }

    #[test]
    fn test_sign_verify_every_curve() {
        for curve in CurveName::ALL {
            let sk = EcSecretKey::generate(curve);
            let sig = sk.sign(b"binding bytes").unwrap();
            assert_eq!(sig.len(), curve.signature_length());

            let pk = sk.public_key();
            assert!(pk.verify(b"binding bytes", &sig).is_ok());
            assert!(pk.verify(b"binding bytez", &sig).is_err());
        }
    }

    #[test]
    fn test_pem_roundtrip_detects_curve() {
        for curve in CurveName::ALL {
            let pk = EcSecretKey::generate(curve).public_key();
            let pem = pk.to_pem().unwrap();
            assert!(pem.starts_with("-----BEGIN PUBLIC KEY-----"));
            let parsed = EcPublicKey::from_pem(&pem).unwrap();
            assert_eq!(parsed.curve(), curve);
            assert_eq!(parsed, pk);
        }
    }

    const KAS_CERTIFICATE_PEM: &str = "-----BEGIN CERTIFICATE-----
MIIBijCCAS+gAwIBAgIUWqAUsN9BKVw+zW7OyzPFpV+o+yYwCgYIKoZIzj0EAwIw
GjEYMBYGA1UEAwwPa2FzLmV4YW1wbGUuY29tMB4XDTI2MTAxNjA0MDcwOFoXDTM2
MTAxMzA0MDcwOFowGjEYMBYGA1UEAwwPa2FzLmV4YW1wbGUuY29tMFkwEwYHKoZI
zj0CAQYIKoZIzj0DAQcDQgAE7IMj2v/Kc4UxCfvFodR3r7iRRiE7GaYBxNeN+y8W
XpDuOWhU3gpR0b1QARiG2P+ZYFvYLmvxaFp8nue5YKPVraNTMFEwHQYDVR0OBBYE
FMC0PO0ncaZ1oNQ70dbjmvIlT5k6MB8GA1UdIwQYMBaAFMC0PO0ncaZ1oNQ70dbj
mvIlT5k6MA8GA1UdEwEB/wQFMAMBAf8wCgYIKoZIzj0EAwIDSQAwRgIhAJLiCc+D
G1NxNYk/xkJwE+F96ubsGtnaY6gmYcNY9KwvAiEA7IGHeikRUxDMABP1L1wPW/5x
dxqnrqDO9+RWNqcQEfY=
-----END CERTIFICATE-----
";

    const KAS_CERTIFICATE_PUBLIC_KEY_PEM: &str = "-----BEGIN PUBLIC KEY-----
MFkwEwYHKoZIzj0CAQYIKoZIzj0DAQcDQgAE7IMj2v/Kc4UxCfvFodR3r7iRRiE7
GaYBxNeN+y8WXpDuOWhU3gpR0b1QARiG2P+ZYFvYLmvxaFp8nue5YKPVrQ==
-----END PUBLIC KEY-----
";

    #[test]
    fn test_public_key_from_certificate() {
        let from_cert = EcPublicKey::from_pem(KAS_CERTIFICATE_PEM).unwrap();
        let expected = EcPublicKey::from_pem(KAS_CERTIFICATE_PUBLIC_KEY_PEM).unwrap();
        assert_eq!(from_cert.curve(), CurveName::Secp256r1);
        assert_eq!(from_cert, expected);
        assert_eq!(
            EcPublicKey::from_certificate_pem(KAS_CERTIFICATE_PEM).unwrap(),
            expected
        );

        // a public key is not a certificate
        assert!(matches!(
            EcPublicKey::from_certificate_pem(KAS_CERTIFICATE_PUBLIC_KEY_PEM),
            Err(CryptoError::Pem(_))
        ));

        // drop the trailing signature lines; the DER no longer matches its length
        let lines: Vec<&str> = KAS_CERTIFICATE_PEM.lines().collect();
        let truncated = [&lines[..lines.len() - 3], &lines[lines.len() - 1..]]
            .concat()
            .join("\n");
        assert!(matches!(
            EcPublicKey::from_pem(&truncated),
            Err(CryptoError::Pem(_))
        ));
    }

    #[test]
    fn test_hkdf_salt_is_sha256_of_magic() {
        assert_eq!(Sha256::digest(b"L1L").as_slice(), &HKDF_SALT);
    }

    #[test]
    fn test_recipient_key_from_pkcs8() {
        use base64::{engine::general_purpose::STANDARD, Engine as _};
        let der = STANDARD
            .decode(
                "MIGHAgEAMBMGByqGSM49AgEGCCqGSM49AwEHBG0wawIBAQQgRywXmrI1J07LZni8xaoKhXj8WbdDHdjd\
                 N62+tgxjdhihRANCAARon4RjqRNA40eEdBT172emATq3I2siKccLcXl07nTrbAu4enVDo9T4LfQ4eZ0y\
                 x/KkIX2HylxzkAEoBxzVpBLN",
            )
            .unwrap();
        let sk = EcSecretKey::from_pkcs8_der(&der).unwrap();
        assert_eq!(sk.curve(), CurveName::Secp256r1);

        let expected = STANDARD
            .decode("A2ifhGOpE0DjR4R0FPXvZ6YBOrcjayIpxwtxeXTudOts")
            .unwrap();
        assert_eq!(sk.public_key().to_compressed(), expected);
    }

    #[test]
    fn test_debug_redacts_secret() {
        let sk = EcSecretKey::generate(CurveName::Secp256r1);
        assert_eq!(format!("{:?}", sk), "EcSecretKey(Secp256r1, [REDACTED])");
    }
}
