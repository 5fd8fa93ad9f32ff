//! NanoTDF encryption and decryption
//!
//! # Process
//!
//! Encrypt:
//! 1. Generate an ephemeral EC key pair on the configured curve
//! 2. ECDH with the KAS public key, HKDF → content key
//! 3. Encrypt the policy under IV `000000` if it is an encrypted policy
//! 4. Bind the policy (GMAC or ECDSA)
//! 5. Encrypt the payload under a random non-zero IV
//! 6. Optionally sign `header || payload` with a creator key
//!
//! Decrypt (given the content key, e.g. from a KAS rewrap):
//! 1. Verify the creator signature, if present
//! 2. Verify the policy binding
//! 3. Decrypt the payload

use crate::config::EnvelopeConfig;
use crate::error::CryptoError;
use crate::kem::ec::{EcPublicKey, EcSecretKey};
use crate::tdf::binding;
use crate::tdf::nanotdf_crypto::{decrypt, encrypt, NanoTdfIv, TagSize};
use crate::types::AesKey;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use nanotdf_protocol::nanotdf::MAX_PAYLOAD_LENGTH;
use nanotdf_protocol::{
    BinaryWrite, CipherSuite, CurveName, EccAndBindingMode, Header, NanoTdf, Payload, Policy,
    PolicyBody, PolicyType, ResourceLocator, Signature, SymmetricAndPayloadConfig,
};

/// Policy as supplied by the caller, before encryption and binding
#[derive(Debug, Clone, PartialEq, Eq)]
enum PolicySource {
    Remote(ResourceLocator),
    Text(Vec<u8>),
    Encrypted(Vec<u8>),
}

/// Header plus the key material an envelope (or a dataset) is sealed with
pub(crate) struct SealedHeader {
    pub header: Header,
    pub key: AesKey,
}

/// Builder for creating NanoTDF envelopes
///
/// # Example
///
/// ```rust,ignore
/// use nanotdf_crypto::{EcPublicKey, NanoTdfBuilder};
///
/// let nanotdf = NanoTdfBuilder::new()
///     .kas_url("https://kas.example.com")
///     .policy_plaintext(br#"{"body":{"dissem":["alice"]}}"#.to_vec())
///     .encrypt(b"sensitive data", &kas_public_key)?;
///
/// let bytes = nanotdf.to_bytes()?;
/// ```
#[derive(Debug, Clone)]
pub struct NanoTdfBuilder {
    kas: Option<ResourceLocator>,
    policy: Option<PolicySource>,
    curve: CurveName,
    cipher: CipherSuite,
    use_ecdsa_binding: bool,
    signer: Option<EcSecretKey>,
}

impl NanoTdfBuilder {
    /// Defaults: P-256, 96-bit tag, GMAC binding, unsigned
    pub fn new() -> Self {
        Self::from_config(&EnvelopeConfig::default())
    }

    pub fn from_config(config: &EnvelopeConfig) -> Self {
        NanoTdfBuilder {
            kas: None,
            policy: None,
            curve: config.curve,
            cipher: config.cipher,
            use_ecdsa_binding: config.use_ecdsa_binding,
            signer: None,
        }
    }

    #[must_use]
    pub fn kas_url(mut self, url: &str) -> Self {
        self.kas = Some(ResourceLocator::from_url(url));
        self
    }

    #[must_use]
    pub fn kas_locator(mut self, locator: ResourceLocator) -> Self {
        self.kas = Some(locator);
        self
    }

    /// Policy held by a policy service, referenced by URL
    #[must_use]
    pub fn policy_remote(mut self, url: &str) -> Self {
        self.policy = Some(PolicySource::Remote(ResourceLocator::from_url(url)));
        self
    }

    #[must_use]
    pub fn policy_plaintext(mut self, body: Vec<u8>) -> Self {
        self.policy = Some(PolicySource::Text(body));
        self
    }

    /// Policy encrypted with the content key under the reserved IV
    #[must_use]
    pub fn policy_encrypted(mut self, body: Vec<u8>) -> Self {
        self.policy = Some(PolicySource::Encrypted(body));
        self
    }

    /// Embedded policy in the representation `policy_type` names
    ///
    /// Fails for remote and PKA policy types.
    pub fn policy_embedded(self, policy_type: PolicyType, body: Vec<u8>) -> Result<Self, CryptoError> {
        match policy_type {
            PolicyType::EmbeddedText => Ok(self.policy_plaintext(body)),
            PolicyType::EmbeddedEncrypted => Ok(self.policy_encrypted(body)),
            PolicyType::EmbeddedEncryptedWithPka => {
                Err(nanotdf_protocol::CodecError::PKA.into())
            }
            PolicyType::Remote => Err(CryptoError::MissingField("remote policy locator")),
        }
    }

    #[must_use]
    pub fn curve(mut self, curve: CurveName) -> Self {
        self.curve = curve;
        self
    }

    #[must_use]
    pub fn cipher(mut self, cipher: CipherSuite) -> Self {
        self.cipher = cipher;
        self
    }

    #[must_use]
    pub fn use_ecdsa_binding(mut self, enabled: bool) -> Self {
        self.use_ecdsa_binding = enabled;
        self
    }

    /// Append a creator signature made with `signer`
    #[must_use]
    pub fn sign_with(mut self, signer: EcSecretKey) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Derive the content key and assemble the header
    pub(crate) fn seal_header(
        &self,
        kas_public_key: &EcPublicKey,
    ) -> Result<SealedHeader, CryptoError> {
        let kas = self.kas.clone().ok_or(CryptoError::MissingField("KAS locator"))?;
        let policy = self.policy.as_ref().ok_or(CryptoError::MissingField("policy"))?;

        if kas_public_key.curve() != self.curve {
            return Err(CryptoError::CurveMismatch {
                expected: self.curve,
                actual: kas_public_key.curve(),
            });
        }

        let ephemeral = EcSecretKey::generate(self.curve);
        let key = ephemeral.derive_key(kas_public_key)?;
        let tag_size = TagSize::from(self.cipher);

        let body = match policy {
            PolicySource::Remote(locator) => PolicyBody::Remote(locator.clone()),
            PolicySource::Text(content) => PolicyBody::EmbeddedText(content.clone()),
            PolicySource::Encrypted(content) => PolicyBody::EmbeddedEncrypted(encrypt(
                &key,
                &NanoTdfIv::POLICY,
                content,
                tag_size,
            )?),
        };
        let policy_binding = binding::compute(&body, self.use_ecdsa_binding, &key, &ephemeral)?;

        let payload_config = match &self.signer {
            Some(signer) => SymmetricAndPayloadConfig::new(true, signer.curve(), self.cipher),
            None => SymmetricAndPayloadConfig::new(false, self.curve, self.cipher),
        };

        let header = Header::new(
            kas,
            EccAndBindingMode::new(self.use_ecdsa_binding, self.curve),
            payload_config,
            Policy::new(body, policy_binding),
            ephemeral.public_key().to_compressed(),
        )?;

        tracing::debug!(
            curve = ?self.curve,
            cipher = ?self.cipher,
            ecdsa_binding = self.use_ecdsa_binding,
            header_len = header.serialized_size(),
            "sealed nanotdf header"
        );

        Ok(SealedHeader { header, key })
    }

    pub(crate) fn signer(&self) -> Option<&EcSecretKey> {
        self.signer.as_ref()
    }

    /// Encrypt `plaintext` for the KAS owning `kas_public_key`
    pub fn encrypt(
        &self,
        plaintext: &[u8],
        kas_public_key: &EcPublicKey,
    ) -> Result<NanoTdf, CryptoError> {
        check_payload_size(plaintext.len(), self.cipher)?;
        let SealedHeader { header, key } = self.seal_header(kas_public_key)?;
        seal_payload(header, &key, NanoTdfIv::random(), plaintext, self.signer())
    }
}

impl Default for NanoTdfBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn check_payload_size(plaintext_len: usize, cipher: CipherSuite) -> Result<(), CryptoError> {
    let length = 3 + plaintext_len + cipher.tag_len();
    if length > MAX_PAYLOAD_LENGTH as usize {
        return Err(CryptoError::PayloadTooLarge { length });
    }
    Ok(())
}

/// Encrypt a payload under an existing header and sign the result if asked
pub(crate) fn seal_payload(
    header: Header,
    key: &AesKey,
    iv: NanoTdfIv,
    plaintext: &[u8],
    signer: Option<&EcSecretKey>,
) -> Result<NanoTdf, CryptoError> {
    let cipher = header.cipher();
    let sealed = encrypt(key, &iv, plaintext, TagSize::from(cipher))?;
    let payload = Payload::from_sealed(*iv.as_bytes(), sealed, cipher)?;

    let mut nanotdf = NanoTdf::new(header, payload, None);
    if let Some(signer) = signer {
        let signature = signer.sign(&nanotdf.signed_bytes()?)?;
        nanotdf.signature = Some(Signature::new(
            signer.public_key().to_compressed(),
            signature,
        ));
    }
    Ok(nanotdf)
}

/// Cryptographic operations on a parsed envelope
pub trait NanoTdfExt: Sized {
    /// Decrypt with an already-unwrapped content key
    fn decrypt(&self, key: &AesKey) -> Result<Vec<u8>, CryptoError>;

    /// Derive the content key with the KAS private key and decrypt
    fn decrypt_with_kas_private_key(&self, kas_private_key: &EcSecretKey) -> Result<Vec<u8>, CryptoError>;

    /// Recover the content key a KAS would release for this envelope
    fn derive_content_key(&self, kas_private_key: &EcSecretKey) -> Result<AesKey, CryptoError>;

    fn verify_policy_binding(&self, key: &AesKey) -> Result<(), CryptoError>;

    /// Open an `EmbeddedEncrypted` policy
    fn decrypt_policy(&self, key: &AesKey) -> Result<Vec<u8>, CryptoError>;

    fn verify_signature(&self) -> Result<(), CryptoError>;

    fn to_base64(&self) -> Result<String, CryptoError>;

    fn from_base64(encoded: &str) -> Result<Self, CryptoError>;
}

impl NanoTdfExt for NanoTdf {
    fn decrypt(&self, key: &AesKey) -> Result<Vec<u8>, CryptoError> {
        if self.signature.is_some() {
            self.verify_signature()?;
        }
        self.verify_policy_binding(key)?;

        let iv = NanoTdfIv::from_bytes(self.payload.iv);
        decrypt(
            key,
            &iv,
            &self.payload.sealed(),
            TagSize::from(self.header.cipher()),
        )
    }

    fn decrypt_with_kas_private_key(&self, kas_private_key: &EcSecretKey) -> Result<Vec<u8>, CryptoError> {
        let key = self.derive_content_key(kas_private_key)?;
        self.decrypt(&key)
    }

    fn derive_content_key(&self, kas_private_key: &EcSecretKey) -> Result<AesKey, CryptoError> {
        let ephemeral =
            EcPublicKey::from_sec1_bytes(self.header.curve(), &self.header.ephemeral_public_key)?;
        kas_private_key.derive_key(&ephemeral)
    }

    fn verify_policy_binding(&self, key: &AesKey) -> Result<(), CryptoError> {
        binding::verify(&self.header, key)
    }

    fn decrypt_policy(&self, key: &AesKey) -> Result<Vec<u8>, CryptoError> {
        match &self.header.policy.body {
            PolicyBody::EmbeddedEncrypted(content) => {
                self.verify_policy_binding(key)?;
                decrypt(
                    key,
                    &NanoTdfIv::POLICY,
                    content,
                    TagSize::from(self.header.cipher()),
                )
            }
            _ => Err(CryptoError::PolicyNotEncrypted),
        }
    }

    fn verify_signature(&self) -> Result<(), CryptoError> {
        let signature = self.signature.as_ref().ok_or(CryptoError::SignatureMissing)?;
        let curve = self.header.payload_config.signature_curve;
        signature.validate(curve)?;

        let signer = EcPublicKey::from_sec1_bytes(curve, &signature.public_key)?;
        signer
            .verify(&self.signed_bytes()?, &signature.signature)
            .map_err(|_| CryptoError::SignatureInvalid)
    }

    fn to_base64(&self) -> Result<String, CryptoError> {
        Ok(BASE64.encode(self.to_bytes()?))
    }

    fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let compact: String = encoded.split_whitespace().collect();
        let bytes = BASE64.decode(compact)?;
        Ok(NanoTdf::from_bytes(&bytes)?)
    }
}
