//! HTTP client wrapper that turns responses into typed results.

use log::debug;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// Thin wrapper around a reqwest Client.
///
/// There is no retry here: a request either produces a response that the
/// caller checks, or fails with [`Error::Transport`].
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

/// Status and body of a response that has been fully read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: String,
}

impl HttpClient {
    /// Creates a new HTTP client wrapping the given reqwest Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Returns a reference to the underlying reqwest Client.
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Sends the request and reads the whole body.
    ///
    /// A body that breaks off after the status line arrived is reported as
    /// [`Error::MalformedResponse`] so the status is kept.
    #[tracing::instrument(skip(self, request))]
    pub async fn execute(
        &self,
        request: RequestBuilder,
        context: &'static str,
    ) -> Result<RawResponse> {
        let response = request
            .send()
            .await
            .map_err(|source| Error::Transport { context, source })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::MalformedResponse {
                context,
                status: status.as_u16(),
                body: String::new(),
                reason: format!("failed to read body: {}", e),
            })?;

        debug!("{}: HTTP {} ({} bytes)", context, status.as_u16(), body.len());

        Ok(RawResponse { status, body })
    }

    /// Sends the request, requires `expected` status and decodes the JSON body.
    pub async fn execute_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        expected: StatusCode,
        context: &'static str,
    ) -> Result<T> {
        self.execute(request, context)
            .await?
            .expect_status(expected, context)?
            .decode(context)
    }
}

impl RawResponse {
    /// Fails with [`Error::UnexpectedStatus`] unless the status is `expected`.
    pub fn expect_status(self, expected: StatusCode, context: &'static str) -> Result<Self> {
        if self.status == expected {
            Ok(self)
        } else {
            Err(Error::UnexpectedStatus {
                context,
                status: self.status.as_u16(),
                body: self.body,
            })
        }
    }

    /// Decodes the body as JSON.
    pub fn decode<T: DeserializeOwned>(&self, context: &'static str) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|e| Error::MalformedResponse {
            context,
            status: self.status.as_u16(),
            body: self.body.clone(),
            reason: e.to_string(),
        })
    }
}
