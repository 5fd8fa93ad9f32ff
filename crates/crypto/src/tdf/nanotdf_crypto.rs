//! AES-256-GCM with NanoTDF parameters
//!
//! - 3-byte IVs, expanded to a 12-byte nonce as `[0; 9] || iv`
//! - tag lengths of 64, 96, 104, 112, 120 and 128 bits
//!
//! The `aes-gcm` crate only admits 96-128 bit tags. 64-bit tags are the
//! leading half of the full 128-bit tag; on decrypt the keystream is applied
//! once to recover the plaintext and once more to recompute the tag over the
//! received ciphertext, and plaintext is only returned when the prefixes match.

use crate::error::CryptoError;
use crate::types::AesKey;
use aes_gcm::aead::{generic_array::GenericArray, Aead, AeadInPlace, KeyInit, Payload};
use aes_gcm::Aes256Gcm;
use nanotdf_protocol::nanotdf::POLICY_IV;
use nanotdf_protocol::CipherSuite;
use rand::RngCore;
use subtle::ConstantTimeEq;
use typenum::{U12, U13, U14, U15};

type Aes256Gcm96 = aes_gcm::AesGcm<aes::Aes256, U12, U12>;
type Aes256Gcm104 = aes_gcm::AesGcm<aes::Aes256, U12, U13>;
type Aes256Gcm112 = aes_gcm::AesGcm<aes::Aes256, U12, U14>;
type Aes256Gcm120 = aes_gcm::AesGcm<aes::Aes256, U12, U15>;

pub const NONCE_LEN: usize = 12;

/// Authentication tag size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagSize {
    Bits64 = 8,
    Bits96 = 12,
    Bits104 = 13,
    Bits112 = 14,
    Bits120 = 15,
    Bits128 = 16,
}

impl TagSize {
    pub fn bytes(self) -> usize {
        self as usize
    }

    pub fn bits(self) -> usize {
        self.bytes() * 8
    }
}

impl From<CipherSuite> for TagSize {
    fn from(cipher: CipherSuite) -> Self {
        match cipher {
            CipherSuite::Aes256Gcm64 => TagSize::Bits64,
            CipherSuite::Aes256Gcm96 => TagSize::Bits96,
            CipherSuite::Aes256Gcm104 => TagSize::Bits104,
            CipherSuite::Aes256Gcm112 => TagSize::Bits112,
            CipherSuite::Aes256Gcm120 => TagSize::Bits120,
            CipherSuite::Aes256Gcm128 => TagSize::Bits128,
        }
    }
}

/// Raw symmetric-cipher tag from the config byte
impl TryFrom<u8> for TagSize {
    type Error = CryptoError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        CipherSuite::from_bits(tag)
            .map(TagSize::from)
            .map_err(|_| CryptoError::UnsupportedCipher { tag })
    }
}

/// NanoTDF IV (3 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NanoTdfIv([u8; 3]);

impl NanoTdfIv {
    /// Reserved for the encrypted policy
    pub const POLICY: Self = Self(POLICY_IV);

    /// Random payload IV; never the reserved policy IV
    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        let mut iv = [0u8; 3];
        loop {
            rng.fill_bytes(&mut iv);
            if iv != POLICY_IV {
                return Self(iv);
            }
        }
    }

    pub fn from_bytes(bytes: [u8; 3]) -> Self {
        Self(bytes)
    }

    /// Low 24 bits of a dataset counter
    pub fn from_counter(counter: u32) -> Self {
        let [_, a, b, c] = counter.to_be_bytes();
        Self([a, b, c])
    }

    pub fn as_bytes(&self) -> &[u8; 3] {
        &self.0
    }

    pub fn to_gcm_nonce(&self) -> [u8; NONCE_LEN] {
        let mut nonce = [0u8; NONCE_LEN];
        nonce[9..].copy_from_slice(&self.0);
        nonce
    }
}

fn seal_truncated<C>(
    key: &AesKey,
    nonce: &[u8; NONCE_LEN],
    aad: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError>
where
    C: Aead + KeyInit,
{
    let cipher = C::new_from_slice(key.as_slice()).map_err(|_| CryptoError::InvalidKeyLength {
        expected: AesKey::LEN,
        actual: key.as_slice().len(),
    })?;
    cipher
        .encrypt(
            GenericArray::from_slice(nonce),
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|_| CryptoError::EncryptionFailed)
}

fn open_truncated<C>(
    key: &AesKey,
    nonce: &[u8; NONCE_LEN],
    aad: &[u8],
    sealed: &[u8],
) -> Result<Vec<u8>, CryptoError>
where
    C: Aead + KeyInit,
{
    let cipher = C::new_from_slice(key.as_slice()).map_err(|_| CryptoError::InvalidKeyLength {
        expected: AesKey::LEN,
        actual: key.as_slice().len(),
    })?;
    cipher
        .decrypt(GenericArray::from_slice(nonce), Payload { msg: sealed, aad })
        .map_err(|_| CryptoError::AuthenticationFailed)
}

fn full_cipher(key: &AesKey) -> Result<Aes256Gcm, CryptoError> {
    Aes256Gcm::new_from_slice(key.as_slice()).map_err(|_| CryptoError::InvalidKeyLength {
        expected: AesKey::LEN,
        actual: key.as_slice().len(),
    })
}

fn seal_64(
    key: &AesKey,
    nonce: &[u8; NONCE_LEN],
    aad: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = full_cipher(key)?;
    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(GenericArray::from_slice(nonce), aad, &mut buffer)
        .map_err(|_| CryptoError::EncryptionFailed)?;
    buffer.extend_from_slice(&tag[..TagSize::Bits64.bytes()]);
    Ok(buffer)
}

fn open_64(
    key: &AesKey,
    nonce: &[u8; NONCE_LEN],
    aad: &[u8],
    sealed: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = full_cipher(key)?;
    let nonce = GenericArray::from_slice(nonce);
    let (ciphertext, received_tag) = sealed.split_at(sealed.len() - TagSize::Bits64.bytes());

    // CTR is its own inverse: the first pass yields the candidate plaintext,
    // the second reproduces the ciphertext and its tag.
    let mut plaintext = ciphertext.to_vec();
    cipher
        .encrypt_in_place_detached(nonce, aad, &mut plaintext)
        .map_err(|_| CryptoError::AuthenticationFailed)?;
    let mut replay = plaintext.clone();
    let tag = cipher
        .encrypt_in_place_detached(nonce, aad, &mut replay)
        .map_err(|_| CryptoError::AuthenticationFailed)?;

    if bool::from(tag[..TagSize::Bits64.bytes()].ct_eq(received_tag)) {
        Ok(plaintext)
    } else {
        Err(CryptoError::AuthenticationFailed)
    }
}

/// Encrypt under an explicit 12-byte nonce; returns `ciphertext || tag`
pub fn seal(
    key: &AesKey,
    nonce: &[u8; NONCE_LEN],
    aad: &[u8],
    plaintext: &[u8],
    tag_size: TagSize,
) -> Result<Vec<u8>, CryptoError> {
    match tag_size {
        TagSize::Bits64 => seal_64(key, nonce, aad, plaintext),
        TagSize::Bits96 => seal_truncated::<Aes256Gcm96>(key, nonce, aad, plaintext),
        TagSize::Bits104 => seal_truncated::<Aes256Gcm104>(key, nonce, aad, plaintext),
        TagSize::Bits112 => seal_truncated::<Aes256Gcm112>(key, nonce, aad, plaintext),
        TagSize::Bits120 => seal_truncated::<Aes256Gcm120>(key, nonce, aad, plaintext),
        TagSize::Bits128 => seal_truncated::<Aes256Gcm>(key, nonce, aad, plaintext),
    }
}

/// Decrypt `ciphertext || tag` under an explicit 12-byte nonce
pub fn open(
    key: &AesKey,
    nonce: &[u8; NONCE_LEN],
    aad: &[u8],
    sealed: &[u8],
    tag_size: TagSize,
) -> Result<Vec<u8>, CryptoError> {
    if sealed.len() < tag_size.bytes() {
        return Err(CryptoError::AuthenticationFailed);
    }

    match tag_size {
        TagSize::Bits64 => open_64(key, nonce, aad, sealed),
        TagSize::Bits96 => open_truncated::<Aes256Gcm96>(key, nonce, aad, sealed),
        TagSize::Bits104 => open_truncated::<Aes256Gcm104>(key, nonce, aad, sealed),
        TagSize::Bits112 => open_truncated::<Aes256Gcm112>(key, nonce, aad, sealed),
        TagSize::Bits120 => open_truncated::<Aes256Gcm120>(key, nonce, aad, sealed),
        TagSize::Bits128 => open_truncated::<Aes256Gcm>(key, nonce, aad, sealed),
    }
}

/// Encrypt a payload or policy under a 3-byte IV
pub fn encrypt(
    key: &AesKey,
    iv: &NanoTdfIv,
    plaintext: &[u8],
    tag_size: TagSize,
) -> Result<Vec<u8>, CryptoError> {
    seal(key, &iv.to_gcm_nonce(), &[], plaintext, tag_size)
}

pub fn decrypt(
    key: &AesKey,
    iv: &NanoTdfIv,
    ciphertext_and_tag: &[u8],
    tag_size: TagSize,
) -> Result<Vec<u8>, CryptoError> {
    open(key, &iv.to_gcm_nonce(), &[], ciphertext_and_tag, tag_size)
}
