//! This library obtains OAuth2 access tokens for service accounts using the JWT-bearer
//! grant ([RFC 7523](https://www.rfc-editor.org/rfc/rfc7523)).
//!
//! A service account authenticates with an RSA key pair. The identity platform keeps the
//! public half; you download the private half as a JSON Web Key. To get a token:
//!
//! 1. the key is loaded and exported as PKCS#8 PEM ([`load_private_key`]),
//! 2. a short-lived assertion (five minutes) naming the service account is signed with it
//!    ([`build_jwt_assertion`]),
//! 3. the assertion is posted once to the token endpoint ([`fetch_token_response`]),
//! 4. the response is printed ([`print_token_response`]).
//!
//! There is no caching and no retrying: every call issues a new assertion and a single
//! request. A non-2xx answer is reported as [`Error::TokenEndpoint`].
//!
//! The `sa-access-token` binary wires these steps to a command line:
//!
//! ```text
//! $ sa-access-token -u https://acme-tenant.example.com -s <service-account-id> -k key.jwk.json
//! ```
//!
//! The same pipeline can be driven as a library:
//!
//! ```no_run
//! use sa_access_token::{run, Opts, DEFAULT_CLIENT_ID, DEFAULT_SCOPES};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), sa_access_token::Error> {
//!     let opts = Opts {
//!         tenant_url: "https://acme-tenant.example.com".to_string(),
//!         service_account_id: "6a5f3c1e-0000-4000-8000-000000000000".to_string(),
//!         jwk_path: "key.jwk.json".into(),
//!         client_id: DEFAULT_CLIENT_ID.to_string(),
//!         scopes: DEFAULT_SCOPES.to_string(),
//!         timeout: None,
//!     };
//!     run(&opts, &mut std::io::stdout()).await
//! }
//! ```
#![deny(missing_docs)]

pub mod assertion;
pub mod client;
pub mod config;
pub mod error;
pub mod key;
pub mod present;
pub mod token;

use std::io::Write;

use hyper_util::client::legacy::connect::Connect;

use crate::client::{DefaultHyperClientBuilder, HttpClient, HyperClientBuilder};

#[doc(inline)]
pub use crate::assertion::build_jwt_assertion;
#[doc(inline)]
pub use crate::config::{parse_args, Command, Opts, DEFAULT_CLIENT_ID, DEFAULT_SCOPES};
#[doc(inline)]
pub use crate::error::Error;
#[doc(inline)]
pub use crate::key::{load_private_key, LoadedKey, ServiceAccountKey};
#[doc(inline)]
pub use crate::present::print_token_response;
#[doc(inline)]
pub use crate::token::{fetch_token_response, TokenResponse, GRANT_TYPE};

/// Fetch a token as configured by `opts` using the default HTTPS client, and print the
/// response to `out`.
pub async fn run<W: Write>(opts: &Opts, out: &mut W) -> Result<(), Error> {
    let mut builder = DefaultHyperClientBuilder::default();
    if let Some(timeout) = opts.timeout {
        builder = builder.with_timeout(timeout);
    }
    run_with_client(opts, &builder.build_hyper_client()?, out).await
}

/// Like [`run`], but sends the request through `client`.
///
/// Nothing is written to `out` unless a token response was received.
pub async fn run_with_client<C, W>(
    opts: &Opts,
    client: &HttpClient<C>,
    out: &mut W,
) -> Result<(), Error>
where
    C: Connect + Clone + Send + Sync + 'static,
    W: Write,
{
    let token_url = opts.token_url();
    let key = load_private_key(&opts.jwk_path)?;
    let assertion = build_jwt_assertion(&opts.service_account_id, &token_url, &key)?;
    let response =
        fetch_token_response(client, &token_url, &assertion, &opts.scopes, &opts.client_id)
            .await?;
    print_token_response(out, &response)?;
    Ok(())
}
