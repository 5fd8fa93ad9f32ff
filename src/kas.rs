//! KAS (Key Access Service) rewrap client for NanoTDF
//!
//! The content key of a NanoTDF never leaves the KAS in the clear. To
//! decrypt, the client asks the KAS named in the header to rewrap it:
//!
//! 1. Generate an ephemeral P-256 key pair for the session
//! 2. Bind the request-signing key to the access token via the [`AuthProvider`]
//! 3. Build the rewrap request (base64 header + ephemeral public key PEM)
//! 4. Sign it as an ES256 JWT and POST it to `{kas}/v2/rewrap`
//! 5. Receive `entityWrappedKey` and the KAS `sessionPublicKey`
//! 6. ECDH(ephemeral, session) → HKDF → AES-GCM open → content key
//!
//! # Example
//!
//! ```no_run
//! use nanotdf::auth::StaticBearer;
//! use nanotdf::kas::KasClient;
//! use nanotdf::{KasClientConfig, NanoTdf};
//! use std::sync::Arc;
//!
//! # async fn example(nanotdf: NanoTdf) -> Result<(), Box<dyn std::error::Error>> {
//! let client = KasClient::new(KasClientConfig::default(), Arc::new(StaticBearer::new("token")))?;
//! let content_key = client.rewrap(&nanotdf.header).await?;
//! # Ok(())
//! # }
//! ```

use crate::auth::{AuthError, AuthProvider};
use crate::config::KasClientConfig;
use base64::{
    engine::general_purpose::{STANDARD as BASE64, URL_SAFE_NO_PAD},
    Engine as _,
};
use nanotdf_crypto::tdf::nanotdf_crypto::NONCE_LEN;
use nanotdf_crypto::tdf::{open, TagSize};
use nanotdf_crypto::{AesKey, CryptoError, CurveName, EcPublicKey, EcSecretKey};
use nanotdf_protocol::{BinaryWrite, CipherSuite, Header};
use p256::ecdsa::{signature::Signer, SigningKey};
use p256::pkcs8::{EncodePublicKey, LineEnding};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Algorithm of the client's session key
const CLIENT_KEY_ALGORITHM: &str = "ec:secp256r1";

/// Lifetime of a signed rewrap request
const REQUEST_TOKEN_TTL_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum KasError {
    /// Transport failure, timeout or cancellation; safe to retry
    #[error("Network error: {0}")]
    Network(String),

    #[error("KAS denied rewrap (HTTP {status}): {reason}")]
    Authorization { status: u16, reason: String },

    #[error("Invalid KAS response: {0}")]
    InvalidResponse(String),

    /// The request could not be built, e.g. the KAS locator is not a usable URL
    #[error("Invalid KAS request: {0}")]
    InvalidRequest(String),

    #[error("Key unwrap failed: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Auth provider error: {0}")]
    Auth(#[from] AuthError),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<reqwest::Error> for KasError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            KasError::InvalidResponse(err.to_string())
        } else if err.is_builder() {
            KasError::InvalidRequest(err.to_string())
        } else {
            KasError::Network(err.to_string())
        }
    }
}

impl From<base64::DecodeError> for KasError {
    fn from(err: base64::DecodeError) -> Self {
        KasError::InvalidResponse(format!("bad base64: {}", err))
    }
}

impl KasError {
    /// Only transport failures are retryable; a signed request can be resent as is
    pub fn is_retryable(&self) -> bool {
        matches!(self, KasError::Network(_))
    }

    pub fn suggestion(&self) -> Option<&str> {
        match self {
            KasError::Network(_) => Some("Check connectivity to the KAS and retry"),
            KasError::Authorization { status: 401, .. } => {
                Some("The access token was rejected; refresh credentials")
            }
            KasError::Authorization { .. } => {
                Some("The policy does not grant this entity access to the content key")
            }
            KasError::InvalidResponse(_) => Some("Verify the KAS URL and protocol version"),
            KasError::InvalidRequest(_) => {
                Some("The KAS locator must be an http or https URL")
            }
            KasError::Crypto(_) => Some("The KAS may use a different key or salt than expected"),
            KasError::Auth(_) => Some("Check the auth provider configuration"),
            KasError::Serialization(_) => None,
        }
    }
}

/// `keyAccess` entry of a NanoTDF rewrap request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyAccess {
    #[serde(rename = "type")]
    pub access_type: String,
    pub url: String,
    pub protocol: String,
    /// Base64 of the full NanoTDF header
    pub header: String,
}

/// Request body carried as a string inside the signed token
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewrapRequestBody {
    pub algorithm: String,
    pub key_access: KeyAccess,
    pub client_public_key: String,
}

impl RewrapRequestBody {
    pub fn new(header: &Header, client_public_key_pem: String) -> Result<Self, KasError> {
        let header_bytes = header
            .to_vec()
            .map_err(|e| KasError::Crypto(CryptoError::Codec(e)))?;
        Ok(Self {
            algorithm: CLIENT_KEY_ALGORITHM.to_string(),
            key_access: KeyAccess {
                access_type: "remote".to_string(),
                url: String::new(),
                protocol: "kas".to_string(),
                header: BASE64.encode(header_bytes),
            },
            client_public_key: client_public_key_pem,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedRewrapRequest {
    pub signed_request_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewrapResponse {
    /// Base64 of `nonce (12) || ciphertext || tag`
    pub entity_wrapped_key: String,
    pub session_public_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PublicKeyResponse {
    Pem(String),
    Object {
        #[serde(rename = "publicKey")]
        public_key: String,
    },
}

/// KAS client for the NanoTDF rewrap protocol
pub struct KasClient {
    http_client: Client,
    config: KasClientConfig,
    auth: Arc<dyn AuthProvider>,
    /// Request signer; its public key is bound to the access token
    signing_key: SigningKey,
}

impl KasClient {
    pub fn new(config: KasClientConfig, auth: Arc<dyn AuthProvider>) -> Result<Self, KasError> {
        let http_client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| KasError::Network(e.to_string()))?;

        let signing_key = SigningKey::random(&mut rand::rngs::OsRng);

        Ok(Self {
            http_client,
            config,
            auth,
            signing_key,
        })
    }

    /// Use a long-lived request-signing key instead of a generated one
    #[must_use]
    pub fn with_signing_key(mut self, signing_key: SigningKey) -> Self {
        self.signing_key = signing_key;
        self
    }

    pub fn config(&self) -> &KasClientConfig {
        &self.config
    }

    pub fn signing_public_key_pem(&self) -> Result<String, KasError> {
        self.signing_key
            .verifying_key()
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| KasError::Crypto(CryptoError::Pem(e.to_string())))
    }

    /// Fetch the KAS public key for `curve`
    pub async fn fetch_public_key(
        &self,
        kas_url: &str,
        curve: CurveName,
    ) -> Result<EcPublicKey, KasError> {
        let endpoint = format!(
            "{}{}",
            kas_url.trim_end_matches('/'),
            self.config.public_key_path
        );

        let exchange = async {
            let response = self
                .http_client
                .get(&endpoint)
                .query(&[("algorithm", curve.kas_algorithm())])
                .send()
                .await?;
            let status = response.status();
            tracing::info!(endpoint = %endpoint, status = status.as_u16(), "KAS public key request");

            if !status.is_success() {
                return Err(self.status_error(status, response).await);
            }
            let body = response.text().await?;
            Ok::<_, KasError>(body)
        };
        let body = self.with_deadline(exchange).await?;

        let pem = match serde_json::from_str::<PublicKeyResponse>(&body) {
            Ok(PublicKeyResponse::Pem(pem)) => pem,
            Ok(PublicKeyResponse::Object { public_key }) => public_key,
            Err(_) if body.trim_start().starts_with("-----BEGIN") => body,
            Err(e) => return Err(KasError::InvalidResponse(e.to_string())),
        };

        let key = EcPublicKey::from_pem(&pem)?;
        if key.curve() != curve {
            return Err(CryptoError::CurveMismatch {
                expected: curve,
                actual: key.curve(),
            }
            .into());
        }
        Ok(key)
    }

    /// Obtain the content key for `header` from the KAS its locator names
    pub async fn rewrap(&self, header: &Header) -> Result<AesKey, KasError> {
        let endpoint = format!(
            "{}{}",
            header.kas.to_url().trim_end_matches('/'),
            self.config.rewrap_path
        );

        let signer_pem = self.signing_public_key_pem()?;
        let ephemeral = EcSecretKey::generate(CurveName::Secp256r1);
        let request_body = RewrapRequestBody::new(header, ephemeral.public_key().to_pem()?)?;
        let signed_request = SignedRewrapRequest {
            signed_request_token: self.create_signed_jwt(&serde_json::to_string(&request_body)?)?,
        };

        // token refresh counts against the same deadline as the HTTP exchange
        let exchange = async {
            self.auth
                .update_client_public_key(&BASE64.encode(signer_pem.as_bytes()))
                .await?;
            let authorization = self.auth.authorization().await?;

            let response = self
                .http_client
                .post(&endpoint)
                .header("Authorization", authorization)
                .header("Content-Type", "application/json")
                .header("virtru-ntdf-version", &self.config.client_version)
                .json(&signed_request)
                .send()
                .await?;
            let status = response.status();
            tracing::info!(endpoint = %endpoint, status = status.as_u16(), "KAS rewrap");

            if !status.is_success() {
                return Err(self.status_error(status, response).await);
            }
            let body = response.text().await?;
            serde_json::from_str::<RewrapResponse>(&body)
                .map_err(|e| KasError::InvalidResponse(e.to_string()))
        };
        let response = self.with_deadline(exchange).await?;

        unwrap_key(&ephemeral, &response, header.cipher())
    }

    async fn with_deadline<T>(
        &self,
        exchange: impl std::future::Future<Output = Result<T, KasError>>,
    ) -> Result<T, KasError> {
        let timeout = self.config.timeout();
        tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| KasError::Network(format!("request timed out after {:?}", timeout)))?
    }

    async fn status_error(&self, status: StatusCode, response: reqwest::Response) -> KasError {
        let reason = match response.text().await {
            Ok(body) if !body.is_empty() => body,
            _ => status.canonical_reason().unwrap_or("unknown").to_string(),
        };
        tracing::warn!(status = status.as_u16(), reason = %reason, "KAS refused request");
        KasError::Authorization {
            status: status.as_u16(),
            reason,
        }
    }

    /// ES256 JWT whose `requestBody` claim is the request JSON as a string
    fn create_signed_jwt(&self, request_body: &str) -> Result<String, KasError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| KasError::InvalidResponse(format!("system clock: {}", e)))?
            .as_secs();

        let header = json!({
            "alg": "ES256",
            "typ": "JWT"
        });
        let payload = json!({
            "requestBody": request_body,
            "iat": now,
            "exp": now + REQUEST_TOKEN_TTL_SECS
        });

        let header_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?);
        let payload_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&payload)?);
        let signing_input = format!("{}.{}", header_b64, payload_b64);

        let signature: p256::ecdsa::Signature = self.signing_key.sign(signing_input.as_bytes());
        let signature_b64 = URL_SAFE_NO_PAD.encode(signature.to_bytes());

        Ok(format!("{}.{}", signing_input, signature_b64))
    }
}

impl std::fmt::Debug for KasClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KasClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Recover the content key from a rewrap response
///
/// The wrapped key is sealed with the session key under a 12-byte nonce and
/// carries a tag as long as the envelope's own payload tag.
pub fn unwrap_key(
    ephemeral: &EcSecretKey,
    response: &RewrapResponse,
    cipher: CipherSuite,
) -> Result<AesKey, KasError> {
    let wrapped = BASE64.decode(response.entity_wrapped_key.trim())?;
    let tag_size = TagSize::from(cipher);
    if wrapped.len() < NONCE_LEN + tag_size.bytes() {
        return Err(KasError::InvalidResponse(format!(
            "entityWrappedKey too short: {} bytes",
            wrapped.len()
        )));
    }

    let session_public_key = EcPublicKey::from_pem(&response.session_public_key)?;
    let session_key = ephemeral.derive_key(&session_public_key)?;

    let (nonce, sealed) = wrapped.split_at(NONCE_LEN);
    let mut nonce_bytes = [0u8; NONCE_LEN];
    nonce_bytes.copy_from_slice(nonce);

    let content_key = open(&session_key, &nonce_bytes, &[], sealed, tag_size)?;
    Ok(AesKey::from_slice(&content_key)?)
}
