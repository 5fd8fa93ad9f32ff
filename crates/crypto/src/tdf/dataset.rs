//! NanoTDF dataset mode
//!
//! A dataset is a sequence of envelopes that share one header and one
//! content key. ECDH and HKDF run once; each envelope differs only by its
//! IV, taken from a counter, and its ciphertext.
//!
//! Because every envelope reuses the same key, IVs must never repeat. The
//! counter starts at 1 (`000000` is the policy IV) and is allocated with
//! compare-and-swap, so `encrypt` can be called from several threads. Once
//! `max_key_iterations` envelopes have been produced the dataset refuses to
//! encrypt and a new one must be built.
//!
//! ```rust,ignore
//! let dataset = NanoTdfBuilder::new()
//!     .kas_url("https://kas.example.com")
//!     .policy_plaintext(policy)
//!     .build_dataset(&kas_public_key, &DatasetConfig::default())?;
//!
//! for reading in sensor_readings {
//!     send(dataset.encrypt(&reading)?.to_bytes()?);
//! }
//! ```

use crate::config::DatasetConfig;
use crate::error::CryptoError;
use crate::kem::ec::{EcPublicKey, EcSecretKey};
use crate::tdf::nanotdf::{check_payload_size, seal_payload, NanoTdfBuilder, SealedHeader};
use crate::tdf::nanotdf_crypto::NanoTdfIv;
use crate::types::AesKey;
use nanotdf_protocol::{BinaryWrite, CodecError, Header, NanoTdf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

pub struct NanoTdfDataset {
    header: Header,
    key: AesKey,
    /// Next IV to hand out; starts at 1
    iv_counter: AtomicU32,
    max_key_iterations: u32,
    rotation_threshold: u32,
    rotation_warned: AtomicBool,
    signer: Option<EcSecretKey>,
}

impl NanoTdfDataset {
    pub(crate) fn new(
        sealed: SealedHeader,
        config: &DatasetConfig,
        signer: Option<EcSecretKey>,
    ) -> Result<Self, CryptoError> {
        config.validate()?;
        Ok(Self {
            header: sealed.header,
            key: sealed.key,
            iv_counter: AtomicU32::new(1),
            max_key_iterations: config.max_key_iterations,
            rotation_threshold: config.rotation_threshold,
            rotation_warned: AtomicBool::new(false),
            signer,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn to_header_bytes(&self) -> Result<Vec<u8>, CodecError> {
        self.header.to_vec()
    }

    pub fn current_iv(&self) -> u32 {
        self.iv_counter.load(Ordering::Relaxed)
    }

    pub fn remaining_capacity(&self) -> u32 {
        let current = self.current_iv();
        if current > self.max_key_iterations {
            0
        } else {
            self.max_key_iterations - current + 1
        }
    }

    pub fn rotation_threshold_reached(&self) -> bool {
        self.current_iv() >= self.rotation_threshold
    }

    pub fn is_exhausted(&self) -> bool {
        self.current_iv() > self.max_key_iterations
    }

    /// Encrypt `plaintext` under the next IV
    ///
    /// # Errors
    ///
    /// `CryptoError::DatasetExhausted` once the key has been used
    /// `max_key_iterations` times.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<NanoTdf, CryptoError> {
        check_payload_size(plaintext.len(), self.header.cipher())?;
        let counter = self.allocate_iv()?;

        if counter >= self.rotation_threshold && !self.rotation_warned.swap(true, Ordering::Relaxed)
        {
            tracing::warn!(
                iv = counter,
                remaining = self.max_key_iterations - counter,
                "nanotdf dataset passed its rotation threshold; build a new dataset soon"
            );
        }

        seal_payload(
            self.header.clone(),
            &self.key,
            NanoTdfIv::from_counter(counter),
            plaintext,
            self.signer.as_ref(),
        )
    }

    fn allocate_iv(&self) -> Result<u32, CryptoError> {
        loop {
            let current = self.iv_counter.load(Ordering::Relaxed);
            if current > self.max_key_iterations {
                return Err(CryptoError::DatasetExhausted {
                    max: self.max_key_iterations,
                });
            }

            match self.iv_counter.compare_exchange(
                current,
                current + 1,
                Ordering::SeqCst,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Ok(current),
                Err(_) => continue,
            }
        }
    }
}

impl std::fmt::Debug for NanoTdfDataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NanoTdfDataset")
            .field("current_iv", &self.current_iv())
            .field("remaining_capacity", &self.remaining_capacity())
            .field("rotation_threshold", &self.rotation_threshold)
            .field("cipher", &self.header.cipher())
            .field("is_exhausted", &self.is_exhausted())
            .finish_non_exhaustive()
    }
}

impl NanoTdfBuilder {
    /// Derive one content key and header for a bounded run of envelopes
    pub fn build_dataset(
        &self,
        kas_public_key: &EcPublicKey,
        config: &DatasetConfig,
    ) -> Result<NanoTdfDataset, CryptoError> {
        config.validate()?;
        let sealed = self.seal_header(kas_public_key)?;
        NanoTdfDataset::new(sealed, config, self.signer().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tdf::nanotdf::NanoTdfExt;
    use nanotdf_protocol::CurveName;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    fn dataset(kas: &EcSecretKey, config: DatasetConfig) -> NanoTdfDataset {
        NanoTdfBuilder::new()
            .kas_url("https://kas.example.com")
            .policy_plaintext(b"{\"body\":{}}".to_vec())
            .build_dataset(&kas.public_key(), &config)
            .unwrap()
    }

    #[test]
    fn test_shared_header_and_counter_ivs() {
        let kas = EcSecretKey::generate(CurveName::Secp256r1);
        let dataset = dataset(&kas, DatasetConfig::default());

        let first = dataset.encrypt(b"one").unwrap();
        let second = dataset.encrypt(b"two").unwrap();

        assert_eq!(first.header, second.header);
        assert_eq!(first.payload.iv, [0, 0, 1]);
        assert_eq!(second.payload.iv, [0, 0, 2]);
        assert_eq!(dataset.current_iv(), 3);

        let key = first.derive_content_key(&kas).unwrap();
        assert_eq!(first.decrypt(&key).unwrap(), b"one");
        assert_eq!(second.decrypt(&key).unwrap(), b"two");
    }

    #[test]
    fn test_cap_enforced() {
        let kas = EcSecretKey::generate(CurveName::Secp256r1);
        let dataset = dataset(
            &kas,
            DatasetConfig {
                max_key_iterations: 3,
                rotation_threshold: 2,
            },
        );

        assert_eq!(dataset.remaining_capacity(), 3);
        assert!(!dataset.rotation_threshold_reached());
        for _ in 0..3 {
            dataset.encrypt(b"x").unwrap();
        }
        assert!(dataset.rotation_threshold_reached());
        assert!(dataset.is_exhausted());
        assert_eq!(dataset.remaining_capacity(), 0);
        assert!(matches!(
            dataset.encrypt(b"x"),
            Err(CryptoError::DatasetExhausted { max: 3 })
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let kas = EcSecretKey::generate(CurveName::Secp256r1);
        let result = NanoTdfBuilder::new()
            .kas_url("https://kas.example.com")
            .policy_plaintext(b"p".to_vec())
            .build_dataset(
                &kas.public_key(),
                &DatasetConfig {
                    max_key_iterations: 8_388_607,
                    rotation_threshold: 1,
                },
            );
        assert!(matches!(
            result,
            Err(CryptoError::InvalidDatasetConfig { .. })
        ));
    }

    #[test]
    fn test_concurrent_ivs_are_unique() {
        let kas = EcSecretKey::generate(CurveName::Secp256r1);
        let dataset = Arc::new(dataset(&kas, DatasetConfig::default()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let dataset = Arc::clone(&dataset);
                thread::spawn(move || {
                    (0..50)
                        .map(|_| dataset.encrypt(b"frame").unwrap().payload.iv)
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for iv in handle.join().unwrap() {
                assert!(seen.insert(iv), "duplicate iv {:?}", iv);
            }
        }
        assert_eq!(seen.len(), 400);
        assert!(!seen.contains(&[0, 0, 0]));
    }

    #[test]
    fn test_debug_hides_key() {
        let kas = EcSecretKey::generate(CurveName::Secp256r1);
        let debug = format!("{:?}", dataset(&kas, DatasetConfig::default()));
        assert!(debug.contains("current_iv: 1"));
        assert!(!debug.contains("key"));
    }
}
