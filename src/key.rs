//! Loading of service account keys.
//!
//! A service account key is an RSA private key in JSON Web Key form, as
//! downloaded from the identity platform's console:
//!
//! ```json
//! {"kty": "RSA", "kid": "...", "n": "...", "e": "AQAB", "d": "...", "p": "...", "q": "..."}
//! ```
//!
//! The key is converted to an unencrypted PKCS#8 PEM document, which is what the
//! assertion signer consumes.
//!
//! Resources:
//! - [JSON Web Key (RFC 7517)](https://www.rfc-editor.org/rfc/rfc7517)
//! - [JSON Web Algorithms, RSA keys (RFC 7518 §6.3)](https://www.rfc-editor.org/rfc/rfc7518#section-6.3)

use std::path::Path;

use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use rsa::pkcs8::{EncodePrivateKey, LineEnding};
use rsa::{BigUint, RsaPrivateKey};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::Error;

// JWK members are unpadded base64url, but some exporters pad anyway.
const JWK_BASE64: GeneralPurpose = GeneralPurpose::new(
    &base64::alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// The RSA members of a JSON Web Key that are needed to reconstruct the private key.
///
/// Members not listed here (`use`, `alg`, `dp`, `dq`, `qi`, ...) are ignored; they
/// remain available through [`LoadedKey::jwk`].
#[derive(Deserialize, Debug, Clone)]
pub struct ServiceAccountKey {
    /// Key type; only `RSA` is supported.
    pub kty: String,
    /// Key id, forwarded as the `kid` JWT header.
    #[serde(default)]
    pub kid: Option<Value>,
    /// Modulus
    pub n: String,
    /// Public exponent
    pub e: String,
    /// Private exponent
    pub d: String,
    /// First prime factor
    #[serde(default)]
    pub p: Option<String>,
    /// Second prime factor
    #[serde(default)]
    pub q: Option<String>,
}

impl ServiceAccountKey {
    /// Reconstruct the RSA private key from the JWK members.
    pub fn to_private_key(&self) -> Result<RsaPrivateKey, Error> {
        if self.kty != "RSA" {
            return Err(Error::InvalidKey(format!(
                "unsupported key type '{}', expected 'RSA'",
                self.kty
            )));
        }

        let n = decode_biguint("n", &self.n)?;
        let e = decode_biguint("e", &self.e)?;
        let d = decode_biguint("d", &self.d)?;
        // Without the prime factors they are recovered from n, e and d.
        let primes = match (&self.p, &self.q) {
            (Some(p), Some(q)) => vec![decode_biguint("p", p)?, decode_biguint("q", q)?],
            (None, None) => Vec::new(),
            _ => {
                return Err(Error::InvalidKey(
                    "members 'p' and 'q' must be given together".to_string(),
                ))
            }
        };

        let key = RsaPrivateKey::from_components(n, e, d, primes)
            .map_err(|e| Error::InvalidKey(e.to_string()))?;
        key.validate()
            .map_err(|e| Error::InvalidKey(e.to_string()))?;
        Ok(key)
    }
}

fn decode_biguint(member: &str, value: &str) -> Result<BigUint, Error> {
    let bytes = JWK_BASE64
        .decode(value.trim())
        .map_err(|e| Error::InvalidKey(format!("member '{}' is not base64url: {}", member, e)))?;
    Ok(BigUint::from_bytes_be(&bytes))
}

/// A service account key together with its PEM export.
#[derive(Debug, Clone)]
pub struct LoadedKey {
    jwk: Map<String, Value>,
    private_key_pem: String,
}

impl LoadedKey {
    /// Parse a JSON Web Key document and export its private key.
    pub fn from_json(json: &str) -> Result<LoadedKey, Error> {
        let jwk = match serde_json::from_str::<Value>(json)? {
            Value::Object(map) => map,
            other => {
                return Err(Error::InvalidKey(format!(
                    "expected a JSON object, found {}",
                    other
                )))
            }
        };
        let key: ServiceAccountKey = serde_json::from_value(Value::Object(jwk.clone()))?;
        let private_key_pem = key
            .to_private_key()?
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| Error::InvalidKey(e.to_string()))?
            .to_string();

        Ok(LoadedKey {
            jwk,
            private_key_pem,
        })
    }

    /// The JSON Web Key exactly as it was read.
    pub fn jwk(&self) -> &Map<String, Value> {
        &self.jwk
    }

    /// The private key as an unencrypted PKCS#8 PEM document.
    pub fn private_key_pem(&self) -> &str {
        &self.private_key_pem
    }

    /// The key id, if the key carries one. Non-string ids are rendered as JSON text.
    pub fn kid(&self) -> Option<String> {
        match self.jwk.get("kid")? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Read a service account key from a JSON Web Key file.
pub fn load_private_key<P: AsRef<Path>>(path: P) -> Result<LoadedKey, Error> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path).map_err(|e| {
        Error::LowLevelError(std::io::Error::new(
            e.kind(),
            format!("Can't read key file {}: {}", path.display(), e),
        ))
    })?;
    log::debug!("read service account key from {}", path.display());
    LoadedKey::from_json(&json)
}
