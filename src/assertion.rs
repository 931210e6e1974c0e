//! This module builds the signed JWT assertion presented to the token endpoint.
//! Only RS256 is supported, which is what service account keys are issued for.
//!
//! Resources:
//! - [JWT Profile for OAuth 2.0 Client Authentication and Authorization
//! Grants (RFC 7523)](https://www.rfc-editor.org/rfc/rfc7523)
//! - [JSON Web Tokens](https://jwt.io/)

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::sha2::Sha256;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::RsaPrivateKey;
use serde::Serialize;
use uuid::Uuid;

use crate::error::Error;
use crate::key::LoadedKey;

/// Validity window of an assertion, in seconds.
pub const ASSERTION_LIFETIME_SECS: i64 = 300;

// Encodes s as Base64
fn append_base64<T: AsRef<[u8]> + ?Sized>(s: &T, out: &mut String) {
    URL_SAFE_NO_PAD.encode_string(s, out)
}

/// Decode a PKCS#8 formatted RSA key.
fn decode_rsa_key(pem_pkcs8: &str) -> Result<RsaPrivateKey, Error> {
    RsaPrivateKey::from_pkcs8_pem(pem_pkcs8)
        .map_err(|e| Error::InvalidKey(format!("Error reading key from PEM: {}", e)))
}

#[derive(Serialize, Debug)]
struct Header<'a> {
    alg: &'a str,
    typ: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    kid: Option<&'a str>,
}

/// The claim set of an assertion.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Issuer; the service account id.
    pub iss: String,
    /// Subject; the service account id.
    pub sub: String,
    /// Audience; the token endpoint URL.
    pub aud: String,
    /// Issued at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, `iat + ASSERTION_LIFETIME_SECS`.
    pub exp: i64,
    /// Unique id of this assertion.
    pub jti: String,
}

impl Claims {
    /// Claims for `service_account_id`, valid for `token_url` from now on.
    pub fn new(service_account_id: &str, token_url: &str) -> Claims {
        let iat = chrono::Utc::now().timestamp();
        Claims {
            iss: service_account_id.to_string(),
            sub: service_account_id.to_string(),
            aud: token_url.to_string(),
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
            jti: Uuid::new_v4().to_string(),
        }
    }
}

/// A JSON Web Token ready to be signed.
pub(crate) struct JWT<'a> {
    kid: Option<&'a str>,
    claims: Claims,
}

impl<'a> JWT<'a> {
    pub(crate) fn new(claims: Claims, kid: Option<&'a str>) -> JWT<'a> {
        JWT { kid, claims }
    }

    // Encodes the first two parts (header and claims) to base64 and assembles them into a form
    // ready to be signed.
    fn encode_claims(&self) -> Result<String, Error> {
        let header = Header {
            alg: "RS256",
            typ: "JWT",
            kid: self.kid,
        };
        let mut head = String::new();
        append_base64(&serde_json::to_vec(&header)?, &mut head);
        head.push('.');
        append_base64(&serde_json::to_vec(&self.claims)?, &mut head);
        Ok(head)
    }

    /// Sign header and claims with the PKCS#8 PEM key, returning the compact token.
    pub(crate) fn sign(&self, private_key_pem: &str) -> Result<String, Error> {
        let mut jwt_head = self.encode_claims()?;
        let signer = JWTSigner::new(private_key_pem)?;
        let signature = signer.sign_claims(&jwt_head)?;
        jwt_head.push('.');
        append_base64(&signature, &mut jwt_head);
        Ok(jwt_head)
    }
}

struct JWTSigner {
    signer: SigningKey<Sha256>,
}

impl JWTSigner {
    fn new(private_key_pem: &str) -> Result<Self, Error> {
        let key = decode_rsa_key(private_key_pem)?;
        Ok(JWTSigner {
            signer: SigningKey::<Sha256>::new(key),
        })
    }

    fn sign_claims(&self, encoded_claims: &str) -> Result<Vec<u8>, Error> {
        let signature = self
            .signer
            .try_sign(encoded_claims.as_bytes())
            .map_err(Error::Signing)?;
        Ok(signature.to_vec())
    }
}

/// Build and sign an assertion for `service_account_id` addressed to `token_url`.
///
/// Each call uses a fresh `jti`, so no two assertions are identical. If the key
/// carries a key id, it is put into the `kid` header.
pub fn build_jwt_assertion(
    service_account_id: &str,
    token_url: &str,
    key: &LoadedKey,
) -> Result<String, Error> {
    let claims = Claims::new(service_account_id, token_url);
    log::debug!(
        "signing assertion iss={} aud={} jti={}",
        claims.iss,
        claims.aud,
        claims.jti
    );
    let kid = key.kid();
    JWT::new(claims, kid.as_deref()).sign(key.private_key_pem())
}
