//! Shared helpers for integration tests
//!
//! [`KasSimulator`] answers rewrap requests the way a real KAS does: it reads
//! the header from the signed request, derives the content key with its
//! static private key and reseals it for the client's ephemeral key.

#![allow(dead_code)]

use base64::{
    engine::general_purpose::{STANDARD as BASE64, URL_SAFE_NO_PAD},
    Engine as _,
};
use nanotdf::kas::{RewrapRequestBody, RewrapResponse, SignedRewrapRequest};
use nanotdf::nanotdf_crypto::tdf::nanotdf_crypto::NONCE_LEN;
use nanotdf::nanotdf_crypto::tdf::{seal, TagSize};
use nanotdf::prelude::*;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const TEST_PLAINTEXT: &[u8] = b"Hello, NanoTDF! This is test data for encryption.";
pub const TEST_POLICY: &[u8] = br#"{"body":{"dataAttributes":[],"dissem":["alice@example.com"]}}"#;

/// Base64 reference envelope: remote policy, ECDSA binding, signed, 64-bit tag
pub const REMOTE_EXAMPLE: &str = "
TDFMAQ5rYXMudmlydHJ1LmNvbYCAAAEVa2FzLnZpcnRydS5jb20vcG9saWN5teQTpgIR5fF7IjSgzT82
/3u6bY/o3yP2LJ0JNW+FgvipzxUSbIqdpGxeTgy8yCaXGawFG4BiXMdUAwNv+4KHHwL3f7rlJgnaxejr
94bhG3rt1w+JgPlIDH5nHLqrjiRQkgAAEJ69CRdSJo4D+f2AFK98ywYC1c+5f1UkxZA/YnNiBZM2qnGk
wu4W0Ft4NAOX4q4HHS6dm4rjMO9wI+pWmbUgS7x9Vo3/+j/6U1fh/NKQ8xrR72LORvDZXfQxa8rzco1P
dc0VlQEL8gQgdKyU3il2ugLz
";

/// Base64 reference envelope: plaintext embedded policy, ECDSA binding, unsigned
pub const PLAIN_EMBEDDED_EXAMPLE: &str = "
TDFMARFldGhlcmlhLmxvY2FsL2thc4AAAQBxeyJib2R5Ijp7ImRhdGFBdHRyaWJ1dGVzIjpbXSwiZGlz
c2VtIjpbIkNoYXJsaWVfMTIzNCIsImJvYl81Njc4Il19LCJ1dWlkIjoiZTk1YzJlNTAtYzQ2NS00OGE1
LWExNjctZWY5OGQyY2NmNjdhIn2avSz7nTV08u+z0lNoOax2ZSWlNtycmvQLS4zHNJn/2i8E1p+KGUx+
3ld0YkJETK7FIztiXbh5ChaU8qgVm7jHA0H20+g4w6gHywRmOGHxK5s6b/oqoFIbc9pMHc/GI2IvAAAR
eO9leyauC42VKckiAm5GJxs=
";

/// PKCS#8 DER (base64) of the reference recipient key
pub const RECIPIENT_PRIVATE_KEY: &str = "
MIGHAgEAMBMGByqGSM49AgEGCCqGSM49AwEHBG0wawIBAQQgRywXmrI1J07LZni8xaoKhXj8WbdDHdjd
N62+tgxjdhihRANCAARon4RjqRNA40eEdBT172emATq3I2siKccLcXl07nTrbAu4enVDo9T4LfQ4eZ0y
x/KkIX2HylxzkAEoBxzVpBLN
";

pub const RECIPIENT_PUBLIC_KEY: &str = "A2ifhGOpE0DjR4R0FPXvZ6YBOrcjayIpxwtxeXTudOts";

pub fn decode_b64(encoded: &str) -> Vec<u8> {
    let compact: String = encoded.split_whitespace().collect();
    BASE64.decode(compact).expect("valid base64")
}

/// Key Access Server stand-in holding one static key per curve
pub struct KasSimulator {
    keys: Vec<EcSecretKey>,
    session: EcSecretKey,
    rewraps: AtomicUsize,
}

impl KasSimulator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            keys: CurveName::ALL.iter().map(|c| EcSecretKey::generate(*c)).collect(),
            session: EcSecretKey::generate(CurveName::Secp256r1),
            rewraps: AtomicUsize::new(0),
        })
    }

    pub fn key(&self, curve: CurveName) -> &EcSecretKey {
        self.keys
            .iter()
            .find(|k| k.curve() == curve)
            .expect("key for every curve")
    }

    pub fn public_key(&self, curve: CurveName) -> EcPublicKey {
        self.key(curve).public_key()
    }

    pub fn public_key_pem(&self, curve: CurveName) -> String {
        self.public_key(curve).to_pem().unwrap()
    }

    pub fn rewrap_count(&self) -> usize {
        self.rewraps.load(Ordering::SeqCst)
    }

    /// Decode the signed request and return the parsed body
    pub fn read_request(body: &[u8]) -> RewrapRequestBody {
        let signed: SignedRewrapRequest = serde_json::from_slice(body).expect("signed request");
        let parts: Vec<&str> = signed.signed_request_token.split('.').collect();
        assert_eq!(parts.len(), 3, "JWT must have three segments");

        let claims: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[1]).unwrap()).unwrap();
        let request_body = claims["requestBody"]
            .as_str()
            .expect("requestBody is a string claim");
        serde_json::from_str(request_body).expect("rewrap request body")
    }

    /// Produce the JSON a KAS returns for `body`
    pub fn rewrap(&self, body: &[u8]) -> String {
        self.rewraps.fetch_add(1, Ordering::SeqCst);
        let request = Self::read_request(body);

        let header_bytes = BASE64.decode(&request.key_access.header).unwrap();
        let header = Header::read_from(&mut Cursor::new(header_bytes)).unwrap();
        let ephemeral =
            EcPublicKey::from_sec1_bytes(header.curve(), &header.ephemeral_public_key).unwrap();
        let content_key = self.key(header.curve()).derive_key(&ephemeral).unwrap();

        let client_key = EcPublicKey::from_pem(&request.client_public_key).unwrap();
        let session_key = self.session.derive_key(&client_key).unwrap();

        let nonce: [u8; NONCE_LEN] = rand::random();
        let sealed = seal(
            &session_key,
            &nonce,
            &[],
            content_key.as_slice(),
            TagSize::from(header.cipher()),
        )
        .unwrap();
        let mut wrapped = nonce.to_vec();
        wrapped.extend_from_slice(&sealed);

        serde_json::to_string(&RewrapResponse {
            entity_wrapped_key: BASE64.encode(wrapped),
            session_public_key: self.session.public_key().to_pem().unwrap(),
        })
        .unwrap()
    }
}

/// Mocks backing a simulated KAS; dropping this removes them
pub struct MountedKas {
    pub rewrap: mockito::Mock,
    pub public_keys: Vec<mockito::Mock>,
}

/// Mount rewrap and public key endpoints for `kas` on a mockito server
pub async fn mount_kas(server: &mut mockito::ServerGuard, kas: &Arc<KasSimulator>) -> MountedKas {
    let mut public_keys = Vec::new();
    for curve in CurveName::ALL {
        let mock = server
            .mock("GET", "/kas_public_key")
            .match_query(mockito::Matcher::UrlEncoded(
                "algorithm".into(),
                curve.kas_algorithm().into(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(serde_json::to_string(&kas.public_key_pem(curve)).unwrap())
            .create_async()
            .await;
        public_keys.push(mock);
    }

    let simulator = Arc::clone(kas);
    let rewrap = server
        .mock("POST", "/v2/rewrap")
        .match_header("content-type", "application/json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body_from_request(move |request| {
            simulator.rewrap(request.body().expect("request body")).into_bytes()
        })
        .create_async()
        .await;

    MountedKas {
        rewrap,
        public_keys,
    }
}

pub fn kas_client(auth: Arc<dyn AuthProvider>) -> KasClient {
    KasClient::new(KasClientConfig::default(), auth).unwrap()
}
