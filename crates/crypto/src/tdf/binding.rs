//! Policy binding
//!
//! The binding ties the policy to the content key so a tampered policy is
//! rejected before any plaintext is released. It is computed over the
//! policy's binding bytes: the serialized locator for remote policies, the
//! content for embedded ones.
//!
//! - GMAC: AES-256-GCM under the content key with an empty message and the
//!   binding bytes as AAD, truncated to 64 bits. The nonce `FF 00..00`
//!   cannot collide with the policy IV or any payload nonce, all of which
//!   start with nine zero bytes.
//! - ECDSA: the ephemeral private key signs SHA-256(binding bytes); the
//!   header's ephemeral public key verifies it.

use crate::error::{CryptoError, PolicyBindingError};
use crate::kem::ec::{EcPublicKey, EcSecretKey};
use crate::tdf::nanotdf_crypto::{seal, TagSize, NONCE_LEN};
use crate::types::AesKey;
use nanotdf_protocol::nanotdf::policy::GMAC_BINDING_LEN;
use nanotdf_protocol::{Header, PolicyBody};
use subtle::ConstantTimeEq;

const GMAC_NONCE: [u8; NONCE_LEN] = [0xFF, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];

pub fn compute_gmac(key: &AesKey, binding_bytes: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let tag = seal(key, &GMAC_NONCE, binding_bytes, &[], TagSize::Bits64)?;
    debug_assert_eq!(tag.len(), GMAC_BINDING_LEN);
    Ok(tag)
}

pub fn verify_gmac(
    key: &AesKey,
    binding_bytes: &[u8],
    binding: &[u8],
) -> Result<(), CryptoError> {
    let expected = compute_gmac(key, binding_bytes)?;
    if bool::from(expected.ct_eq(binding)) {
        Ok(())
    } else {
        Err(PolicyBindingError::GmacMismatch.into())
    }
}

pub fn compute_ecdsa(
    ephemeral: &EcSecretKey,
    binding_bytes: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    ephemeral.sign(binding_bytes)
}

pub fn verify_ecdsa(
    ephemeral_public_key: &EcPublicKey,
    binding_bytes: &[u8],
    binding: &[u8],
) -> Result<(), CryptoError> {
    ephemeral_public_key
        .verify(binding_bytes, binding)
        .map_err(|_| PolicyBindingError::EcdsaInvalid.into())
}

/// Compute the binding a header with this policy body must carry
pub fn compute(
    body: &PolicyBody,
    use_ecdsa_binding: bool,
    key: &AesKey,
    ephemeral: &EcSecretKey,
) -> Result<Vec<u8>, CryptoError> {
    let binding_bytes = body.binding_bytes()?;
    if use_ecdsa_binding {
        compute_ecdsa(ephemeral, &binding_bytes)
    } else {
        compute_gmac(key, &binding_bytes)
    }
}

/// Check the binding stored in a parsed header
pub fn verify(header: &Header, key: &AesKey) -> Result<(), CryptoError> {
    let policy = &header.policy;
    let binding_bytes = policy.body.binding_bytes()?;

    if header.ecc_and_binding_mode.use_ecdsa_binding {
        let ephemeral = EcPublicKey::from_sec1_bytes(header.curve(), &header.ephemeral_public_key)
            .map_err(|e| PolicyBindingError::Malformed {
                reason: e.to_string(),
            })?;
        verify_ecdsa(&ephemeral, &binding_bytes, &policy.binding)
    } else {
        verify_gmac(key, &binding_bytes, &policy.binding)
    }
}
