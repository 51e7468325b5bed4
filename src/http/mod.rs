//! HTTP transport with status checking and error classification.

mod client;

pub use client::{HttpClient, RawResponse};
