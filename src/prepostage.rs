//! Pre-postage records (`/prepostagem/v1/prepostagens`) and shipping labels.
//!
//! Payloads are passed through as JSON: the client does not model the
//! pre-postage schema.

use log::{debug, info};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::client::Client;
use crate::clock::Clock;
use crate::error::{Error, Result};

pub const PREPOSTAGE_PATH: &str = "/prepostagem/v1/prepostagens";
pub const BATCH_PREPOSTAGE_PATH: &str = "/prepostagem/v1/prepostagens/lista/objetosregistrados";
pub const LABEL_PATH: &str = "/prepostagem/v1/prepostagens/rotulo";

/// Query parameter naming who requested a cancellation.
pub const CANCEL_REQUESTER_PARAM: &str = "idCorreiosSolicitanteCancelamento";

/// Multipart field carrying the batch file.
pub const BATCH_FILE_FIELD: &str = "arquivo";
pub const BATCH_FILE_NAME: &str = "prepostagens.json";

#[derive(Serialize)]
struct LabelRequest<'a> {
    #[serde(rename = "idCorreios")]
    correios_id: &'a str,
}

/// Extracts `urlEtiqueta` from a label response, or an empty string.
pub fn label_url(response: &Value) -> String {
    response
        .get("urlEtiqueta")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

impl<C: Clock> Client<C> {
    /// Creates a pre-postage record and returns the API's JSON answer.
    #[tracing::instrument(skip(self, payload))]
    pub async fn create_prepostage<P: Serialize + ?Sized>(
        &mut self,
        payload: &P,
    ) -> Result<Value> {
        const CONTEXT: &str = "pre-postage creation";

        let token = self.auth.ensure_valid().await?;
        let request = self
            .authorized(Method::POST, PREPOSTAGE_PATH, &token)
            .json(payload);

        let created: Value = self
            .http
            .execute_json(request, StatusCode::OK, CONTEXT)
            .await?;
        info!("Pre-postage created");
        Ok(created)
    }

    /// Cancels pre-postage `id`, optionally naming the requesting party.
    ///
    /// The id is percent-encoded as a single path segment.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_prepostage(
        &mut self,
        id: &str,
        requester: Option<&str>,
    ) -> Result<Value> {
        const CONTEXT: &str = "pre-postage cancellation";

        let token = self.auth.ensure_valid().await?;
        let url = self.endpoint_with_segment(PREPOSTAGE_PATH, id)?;
        let mut request = self.authorized_url(Method::DELETE, url, &token);
        if let Some(requester) = requester {
            request = request.query(&[(CANCEL_REQUESTER_PARAM, requester)]);
        }

        let confirmation: Value = self
            .http
            .execute_json(request, StatusCode::OK, CONTEXT)
            .await?;
        info!("Pre-postage {} cancelled", id);
        Ok(confirmation)
    }

    /// Creates several pre-postage records at once.
    ///
    /// The records are uploaded as a JSON array inside a multipart file
    /// attachment, built in memory.
    #[tracing::instrument(skip(self, records))]
    pub async fn create_prepostage_batch<P: Serialize>(
        &mut self,
        records: &[P],
    ) -> Result<Value> {
        const CONTEXT: &str = "pre-postage batch creation";

        let token = self.auth.ensure_valid().await?;
        let content = serde_json::to_vec(records).map_err(|source| Error::Encode {
            context: CONTEXT,
            source,
        })?;
        debug!(
            "Uploading {} pre-postage records ({} bytes)",
            records.len(),
            content.len()
        );

        let file = Part::bytes(content)
            .file_name(BATCH_FILE_NAME)
            .mime_str("application/json")
            .map_err(|source| Error::Transport {
                context: CONTEXT,
                source,
            })?;
        let form = Form::new().part(BATCH_FILE_FIELD, file);

        let request = self
            .authorized(Method::POST, BATCH_PREPOSTAGE_PATH, &token)
            .multipart(form);

        self.http
            .execute_json(request, StatusCode::OK, CONTEXT)
            .await
    }

    /// Generates the shipping label for `correios_id` and returns its URL.
    ///
    /// Returns an empty string when the response has no `urlEtiqueta`.
    #[tracing::instrument(skip(self))]
    pub async fn generate_label(&mut self, correios_id: &str) -> Result<String> {
        const CONTEXT: &str = "label generation";

        let token = self.auth.ensure_valid().await?;
        let request = self
            .authorized(Method::POST, LABEL_PATH, &token)
            .json(&LabelRequest { correios_id });

        let response: Value = self
            .http
            .execute_json(request, StatusCode::OK, CONTEXT)
            .await?;
        Ok(label_url(&response))
    }
}
