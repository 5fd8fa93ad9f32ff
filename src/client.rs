//! High-level NanoTDF clients
//!
//! [`NanoTdfClient`] encrypts for one KAS and decrypts anything whose KAS it
//! can reach, rewrapping the content key on every decrypt.
//!
//! [`NanoTdfDatasetClient`] is for streams: it encrypts many payloads under
//! one key (re-keying when the key is used up) and, when decrypting, only
//! goes back to the KAS when the ephemeral key in the header changes.

use crate::config::NanoTdfConfig;
use crate::error::NanoTdfError;
use crate::kas::KasClient;
use nanotdf_crypto::{
    AesKey, DatasetConfig, EcPublicKey, EcSecretKey, EnvelopeConfig, NanoTdfBuilder,
    NanoTdfDataset, NanoTdfExt,
};
use nanotdf_protocol::NanoTdf;
use tokio::sync::{Mutex, OnceCell};

pub struct NanoTdfClient {
    kas: KasClient,
    kas_url: String,
    envelope: EnvelopeConfig,
    kas_public_key: OnceCell<EcPublicKey>,
    creator_key: Option<EcSecretKey>,
}

impl NanoTdfClient {
    pub fn new(kas_url: impl Into<String>, kas: KasClient) -> Self {
        Self {
            kas,
            kas_url: kas_url.into(),
            envelope: EnvelopeConfig::default(),
            kas_public_key: OnceCell::new(),
            creator_key: None,
        }
    }

    /// Build a client from a loaded config; `kas_url` must be set
    pub fn from_config(config: &NanoTdfConfig, kas: KasClient) -> Result<Self, NanoTdfError> {
        let kas_url = config
            .kas_url
            .clone()
            .ok_or_else(|| NanoTdfError::Config("kas_url is required".to_string()))?;
        Ok(Self::new(kas_url, kas).with_envelope_config(config.envelope))
    }

    #[must_use]
    pub fn with_envelope_config(mut self, envelope: EnvelopeConfig) -> Self {
        self.envelope = envelope;
        self
    }

    /// Skip the public key lookup and encrypt to this key
    #[must_use]
    pub fn with_kas_public_key(self, key: EcPublicKey) -> Self {
        Self {
            kas_public_key: OnceCell::new_with(Some(key)),
            ..self
        }
    }

    /// Sign every envelope this client creates
    #[must_use]
    pub fn with_creator_key(mut self, key: EcSecretKey) -> Self {
        self.creator_key = Some(key);
        self
    }

    pub fn kas_client(&self) -> &KasClient {
        &self.kas
    }

    pub fn envelope_config(&self) -> &EnvelopeConfig {
        &self.envelope
    }

    /// KAS public key on the configured curve, fetched once
    pub async fn kas_public_key(&self) -> Result<&EcPublicKey, NanoTdfError> {
        self.kas_public_key
            .get_or_try_init(|| async {
                self.kas
                    .fetch_public_key(&self.kas_url, self.envelope.curve)
                    .await
                    .map_err(NanoTdfError::from)
            })
            .await
    }

    fn builder(&self) -> NanoTdfBuilder {
        let builder = NanoTdfBuilder::from_config(&self.envelope).kas_url(&self.kas_url);
        match &self.creator_key {
            Some(key) => builder.sign_with(key.clone()),
            None => builder,
        }
    }

    /// Builder carrying `policy` in the configured embedded representation
    pub(crate) fn embedded_builder(&self, policy: &[u8]) -> Result<NanoTdfBuilder, NanoTdfError> {
        Ok(self
            .builder()
            .policy_embedded(self.envelope.policy_type, policy.to_vec())?)
    }

    /// Encrypt with `policy` embedded as configured (`policy_type`)
    pub async fn encrypt(&self, plaintext: &[u8], policy: &[u8]) -> Result<NanoTdf, NanoTdfError> {
        let kas_public_key = self.kas_public_key().await?;
        Ok(self.embedded_builder(policy)?.encrypt(plaintext, kas_public_key)?)
    }

    /// Encrypt with a policy held by a policy service at `policy_url`
    pub async fn encrypt_with_remote_policy(
        &self,
        plaintext: &[u8],
        policy_url: &str,
    ) -> Result<NanoTdf, NanoTdfError> {
        let kas_public_key = self.kas_public_key().await?;
        Ok(self
            .builder()
            .policy_remote(policy_url)
            .encrypt(plaintext, kas_public_key)?)
    }

    /// Rewrap the content key with the header's KAS and decrypt
    pub async fn decrypt(&self, nanotdf: &NanoTdf) -> Result<Vec<u8>, NanoTdfError> {
        let key = self.kas.rewrap(&nanotdf.header).await?;
        Ok(nanotdf.decrypt(&key)?)
    }

    pub async fn decrypt_bytes(&self, bytes: &[u8]) -> Result<Vec<u8>, NanoTdfError> {
        let nanotdf = NanoTdf::from_bytes(bytes)?;
        self.decrypt(&nanotdf).await
    }

    /// Decrypt base64 transport form; whitespace is ignored
    pub async fn decrypt_base64(&self, encoded: &str) -> Result<Vec<u8>, NanoTdfError> {
        let nanotdf = NanoTdf::from_base64(encoded)?;
        self.decrypt(&nanotdf).await
    }
}

impl std::fmt::Debug for NanoTdfClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NanoTdfClient")
            .field("kas_url", &self.kas_url)
            .field("envelope", &self.envelope)
            .field("signed", &self.creator_key.is_some())
            .finish_non_exhaustive()
    }
}

struct ActiveDataset {
    policy: Vec<u8>,
    dataset: NanoTdfDataset,
}

struct CachedKey {
    ephemeral_public_key: Vec<u8>,
    key: AesKey,
}

pub struct NanoTdfDatasetClient {
    client: NanoTdfClient,
    dataset_config: DatasetConfig,
    active: Mutex<Option<ActiveDataset>>,
    cached_key: Mutex<Option<CachedKey>>,
}

impl NanoTdfDatasetClient {
    pub fn new(client: NanoTdfClient, dataset_config: DatasetConfig) -> Result<Self, NanoTdfError> {
        dataset_config.validate()?;
        Ok(Self {
            client,
            dataset_config,
            active: Mutex::new(None),
            cached_key: Mutex::new(None),
        })
    }

    pub fn from_config(config: &NanoTdfConfig, kas: KasClient) -> Result<Self, NanoTdfError> {
        Self::new(NanoTdfClient::from_config(config, kas)?, config.dataset)
    }

    pub fn client(&self) -> &NanoTdfClient {
        &self.client
    }

    /// Encrypt under the current dataset key
    ///
    /// A new key and header are derived on first use, when `policy` changes,
    /// and when the current key reaches `max_key_iterations`.
    pub async fn encrypt(&self, plaintext: &[u8], policy: &[u8]) -> Result<NanoTdf, NanoTdfError> {
        let mut active = self.active.lock().await;

        let reusable = matches!(
            active.as_ref(),
            Some(current) if current.policy == policy && !current.dataset.is_exhausted()
        );
        if !reusable {
            if active.as_ref().is_some_and(|current| current.dataset.is_exhausted()) {
                tracing::info!(
                    max = self.dataset_config.max_key_iterations,
                    "nanotdf dataset key exhausted, re-keying"
                );
            }
            let kas_public_key = self.client.kas_public_key().await?;
            let dataset = self
                .client
                .embedded_builder(policy)?
                .build_dataset(kas_public_key, &self.dataset_config)?;
            *active = Some(ActiveDataset {
                policy: policy.to_vec(),
                dataset,
            });
        }

        let current = active
            .as_ref()
            .ok_or_else(|| NanoTdfError::Config("dataset was not initialised".to_string()))?;
        Ok(current.dataset.encrypt(plaintext)?)
    }

    /// Decrypt, rewrapping only when the ephemeral key differs from the last one
    pub async fn decrypt(&self, nanotdf: &NanoTdf) -> Result<Vec<u8>, NanoTdfError> {
        let mut cached = self.cached_key.lock().await;

        let hit = matches!(
            cached.as_ref(),
            Some(entry) if entry.ephemeral_public_key == nanotdf.header.ephemeral_public_key
        );
        if !hit {
            let key = self.client.kas.rewrap(&nanotdf.header).await?;
            *cached = Some(CachedKey {
                ephemeral_public_key: nanotdf.header.ephemeral_public_key.clone(),
                key,
            });
        } else {
            tracing::debug!("reusing cached dataset key");
        }

        let entry = cached
            .as_ref()
            .ok_or_else(|| NanoTdfError::Config("dataset key cache is empty".to_string()))?;
        Ok(nanotdf.decrypt(&entry.key)?)
    }

    pub async fn decrypt_bytes(&self, bytes: &[u8]) -> Result<Vec<u8>, NanoTdfError> {
        let nanotdf = NanoTdf::from_bytes(bytes)?;
        self.decrypt(&nanotdf).await
    }
}

impl std::fmt::Debug for NanoTdfDatasetClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NanoTdfDatasetClient")
            .field("client", &self.client)
            .field("dataset_config", &self.dataset_config)
            .finish_non_exhaustive()
    }
}
