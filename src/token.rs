//! Exchange of a signed assertion for an access token.

use http::header;
use hyper_util::client::legacy::connect::Connect;
use serde_json::{Map, Value};
use url::form_urlencoded;

use crate::client::HttpClient;
use crate::error::Error;

/// Grant type of the JWT-bearer flow.
pub const GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// The token endpoint's answer. No schema is enforced; providers add their own members
/// next to `access_token`, `token_type`, `expires_in` and `scope`.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenResponse(Map<String, Value>);

impl TokenResponse {
    /// The raw JSON object.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// The `access_token` member, if the server sent one.
    pub fn access_token(&self) -> Option<&Value> {
        self.0.get("access_token")
    }
}

impl From<Map<String, Value>> for TokenResponse {
    fn from(map: Map<String, Value>) -> TokenResponse {
        TokenResponse(map)
    }
}

/// Form-encode the token request body.
pub(crate) fn token_request_body(assertion: &str, scopes: &str, client_id: &str) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(&[
            ("grant_type", GRANT_TYPE),
            ("assertion", assertion),
            ("scope", scopes),
            ("client_id", client_id),
        ])
        .finish()
}

/// Send one token request and parse the response. A non-2xx status yields
/// [`Error::TokenEndpoint`]; the request is never retried.
pub async fn fetch_token_response<C>(
    hyper_client: &HttpClient<C>,
    token_url: &str,
    assertion: &str,
    scopes: &str,
    client_id: &str,
) -> Result<TokenResponse, Error>
where
    C: Connect + Clone + Send + Sync + 'static,
{
    let rqbody = token_request_body(assertion, scopes, client_id);
    let request = http::Request::post(token_url)
        .header(
            header::CONTENT_TYPE,
            mime::APPLICATION_WWW_FORM_URLENCODED.as_ref(),
        )
        .header(header::ACCEPT, mime::APPLICATION_JSON.as_ref())
        .body(rqbody)?;
    log::debug!("requesting token from {} for client {}", token_url, client_id);
    let (head, body) = hyper_client.request(request).await?.into_parts();
    log::debug!("received response; head: {:?}", head);

    if !head.status.is_success() {
        return Err(Error::TokenEndpoint {
            status: head.status,
            body: String::from_utf8_lossy(&body).into_owned(),
        });
    }

    match serde_json::from_slice::<Value>(&body)? {
        Value::Object(map) => Ok(TokenResponse(map)),
        other => Err(Error::BadServerResponse(format!(
            "Token response is not a JSON object: {}",
            other
        ))),
    }
}
