//! Error types for the Correios client.
//!
//! Every public operation returns [`Result`]. Failures that come from the
//! upstream API keep the HTTP status and the raw response body as fields so
//! callers can inspect them without parsing the error message.

use thiserror::Error;

/// An operation was called before the state it depends on exists.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// Price and deadline queries need at least one product.
    #[error("no products were added before querying")]
    NoProducts,

    /// `price_total` was called before a successful price query.
    #[error("prices have not been queried yet")]
    PricesNotQueried,

    /// `deadline_for` was called before a successful deadline query.
    #[error("deadlines have not been queried yet")]
    DeadlinesNotQueried,
}

/// Errors that can occur when talking to the Correios API.
#[derive(Error, Debug)]
pub enum Error {
    /// No HTTP response was obtained (connection refused, DNS, timeout, ...).
    #[error("{context}: request failed: {source}")]
    Transport {
        context: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The token endpoint answered with something other than 201.
    #[error("authentication rejected with HTTP status {status}")]
    AuthenticationRejected { status: u16, body: String },

    /// A response arrived but its status differs from the documented one.
    #[error("{context}: unexpected HTTP status {status}")]
    UnexpectedStatus {
        context: &'static str,
        status: u16,
        body: String,
    },

    /// The status was the expected one but the body could not be decoded.
    #[error("{context}: malformed response: {reason}")]
    MalformedResponse {
        context: &'static str,
        status: u16,
        body: String,
        reason: String,
    },

    /// A request payload could not be encoded.
    #[error("{context}: failed to encode request: {source}")]
    Encode {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Precondition(#[from] Precondition),

    /// A lookup found no record for the product code.
    #[error("product {product_code} not found in deadline results")]
    NotFound { product_code: String },

    /// Missing or invalid client configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// HTTP status of the upstream response, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::AuthenticationRejected { status, .. }
            | Error::UnexpectedStatus { status, .. }
            | Error::MalformedResponse { status, .. } => Some(*status),
            Error::Transport { source, .. } => source.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Raw upstream response body, when one was received.
    pub fn body(&self) -> Option<&str> {
        match self {
            Error::AuthenticationRejected { body, .. }
            | Error::UnexpectedStatus { body, .. }
            | Error::MalformedResponse { body, .. } => Some(body),
            _ => None,
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;
