use std::fmt;
use std::future::Future;
use std::sync::Arc;

use reqwest::{header, RequestBuilder};

use crate::{
    retry, trace,
    transport::{ClientHandle, TransportConfig},
    Options, Payload, Response, ResponseClass, Result, ServerError,
};

#[derive(Clone)]
/// HTTP operations against the storage API.
///
/// Holds only the shared, read-only [`Options`]; every call builds its own
/// client through [`TransportConfig`].
pub struct NetClient {
    options: Arc<Options>,
}

impl fmt::Debug for NetClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetClient")
            .field("options", &self.options)
            .finish()
    }
}

impl Default for NetClient {
    fn default() -> Self {
        Self::new(Options::default())
    }
}

impl NetClient {
    pub fn new(options: Options) -> Self {
        Self::from_shared(Arc::new(options))
    }

    /// Creates a client that shares `options` with other clients of the same
    /// session.
    pub fn from_shared(options: Arc<Options>) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Runs `operation` under the session's retry budget and interval.
    ///
    /// See [`crate::survive`].
    pub async fn survive<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        retry::survive(
            self.options.max_retries,
            self.options.retry_interval,
            operation,
        )
        .await
    }

    /// Downloads `url` and returns the raw body.
    ///
    /// A 509 with an empty body is the server's bandwidth-limit signal and is
    /// returned as [`ServerError::BandwidthLimitExceeded`]. Any other status,
    /// including a 509 that carries a body, is plain data.
    pub async fn get_content(&self, url: &str) -> Result<Vec<u8>> {
        let client = TransportConfig::build(url, &self.options)?;
        let response = client.get().send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        let response = Response {
            status,
            body: Payload::Binary(body),
        };
        if response.class() == ResponseClass::RateLimited {
            return Err(ServerError::BandwidthLimitExceeded.into());
        }
        Ok(response.body.into_bytes())
    }

    /// Posts `body` to `url` and returns status and body as received.
    ///
    /// No status is treated as an error here; classifying the response is up
    /// to the caller.
    pub async fn post(&self, url: &str, body: impl Into<Payload>) -> Result<Response> {
        let body = body.into();
        let client = TransportConfig::build(url, &self.options)?;

        tracing::debug!("REQ POST {} {}", url, trace::format_default(&body));
        let response = post_request(&client, body).send().await?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let bytes = response.bytes().await?.to_vec();
        let body = Payload::from_response(bytes, content_type.as_deref());
        tracing::debug!("REP {} {}", status, trace::format_default(&body));

        Ok(Response { status, body })
    }
}

// The client opens a new connection per call; announcing keep-alive stops
// the storage servers from resetting it mid-session.
fn post_request(client: &ClientHandle, body: Payload) -> RequestBuilder {
    client
        .post()
        .header(header::CONNECTION, "keep-alive")
        .body(body.into_bytes())
}
