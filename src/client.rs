//! Module containing the HTTP client used for sending the token request
use std::time::Duration;

use http_body_util::BodyExt;
use hyper::body::Bytes;
use hyper_util::client::legacy::{connect::Connect, Error as LegacyHyperError};
use rustls::crypto::ring::default_provider as default_crypto_provider;
use thiserror::Error as ThisError;

use crate::Error;

pub(crate) type LegacyClient<C> = hyper_util::client::legacy::Client<C, String>;

#[derive(Debug, ThisError)]
/// Errors that can happen when a request is sent
pub enum SendError {
    /// Request could not complete before timeout elapsed
    #[error("Request timed out")]
    Timeout,
    /// Wrapper for hyper errors
    #[error("Hyper error: {0}")]
    Hyper(#[source] LegacyHyperError),
    /// The response body could not be read
    #[error("Error reading response body: {0}")]
    Body(#[source] hyper::Error),
}

/// A trait implemented for any hyper_util::client::legacy::Client as well as the DefaultHyperClientBuilder.
pub trait HyperClientBuilder {
    /// The hyper connector that the resulting hyper client will use.
    type Connector: Connect + Clone + Send + Sync + 'static;

    /// Sets duration after which a request times out
    fn with_timeout(self, timeout: Duration) -> Self;

    /// Create a hyper::Client
    fn build_hyper_client(self) -> Result<HttpClient<Self::Connector>, Error>;
}

/// Client that can be configured that a request will timeout after a specified
/// duration.
#[derive(Clone)]
pub struct HttpClient<C>
where
    C: Connect + Clone + Send + Sync + 'static,
{
    client: LegacyClient<C>,
    timeout: Option<Duration>,
}

impl<C> HttpClient<C>
where
    C: Connect + Clone + Send + Sync + 'static,
{
    pub(crate) fn new(hyper_client: LegacyClient<C>, timeout: Option<Duration>) -> Self {
        Self {
            client: hyper_client,
            timeout,
        }
    }

    /// Send a request and read the whole response body. The configured timeout, if
    /// any, covers both.
    pub(crate) async fn request(
        &self,
        payload: http::Request<String>,
    ) -> Result<http::Response<Bytes>, SendError> {
        let future = self.send_and_collect(payload);
        match self.timeout {
            Some(duration) => tokio::time::timeout(duration, future)
                .await
                .map_err(|_| SendError::Timeout)?,
            None => future.await,
        }
    }

    async fn send_and_collect(
        &self,
        payload: http::Request<String>,
    ) -> Result<http::Response<Bytes>, SendError> {
        let (head, body) = self
            .client
            .request(payload)
            .await
            .map_err(SendError::Hyper)?
            .into_parts();
        let body = body.collect().await.map_err(SendError::Body)?.to_bytes();
        Ok(http::Response::from_parts(head, body))
    }
}

/// The default connector: HTTPS via rustls with the Mozilla root
/// certificates. Plain `http://` endpoints are accepted as well.
pub type DefaultConnector =
    hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>;

/// The builder value used when the default hyper client should be used.
#[derive(Default)]
pub struct DefaultHyperClientBuilder {
    timeout: Option<Duration>,
}

impl HyperClientBuilder for DefaultHyperClientBuilder {
    type Connector = DefaultConnector;

    fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn build_hyper_client(self) -> Result<HttpClient<Self::Connector>, Error> {
        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_provider_and_webpki_roots(default_crypto_provider())
            .map_err(Error::Tls)?
            .https_or_http()
            .enable_http1()
            .enable_http2()
            .build();

        Ok(HttpClient::new(
            hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new())
                .pool_max_idle_per_host(0)
                .build::<_, String>(connector),
            self.timeout,
        ))
    }
}

/// Intended for using an existing hyper client. Instantiate with
/// [`CustomHyperClientBuilder::from`]
pub struct CustomHyperClientBuilder<C>
where
    C: Connect + Clone + Send + Sync + 'static,
{
    client: LegacyClient<C>,
    timeout: Option<Duration>,
}

impl<C> From<LegacyClient<C>> for CustomHyperClientBuilder<C>
where
    C: Connect + Clone + Send + Sync + 'static,
{
    fn from(client: LegacyClient<C>) -> Self {
        Self {
            client,
            timeout: None,
        }
    }
}

impl<C> HyperClientBuilder for CustomHyperClientBuilder<C>
where
    C: Connect + Clone + Send + Sync + 'static,
{
    type Connector = C;

    fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn build_hyper_client(self) -> Result<HttpClient<Self::Connector>, Error> {
        Ok(HttpClient::new(self.client, self.timeout))
    }
}
