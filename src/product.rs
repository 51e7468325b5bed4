//! Products accumulated before a price or deadline query.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const CODE_FIELD: &str = "coProduto";
const REQUEST_NUMBER_FIELD: &str = "nuRequisicao";

/// One product of a price or deadline query, identified by its product code.
///
/// On the wire it is a flat object: the caller's attributes plus
/// `coProduto` and `nuRequisicao`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductEntry {
    #[serde(rename = "coProduto")]
    pub code: String,
    #[serde(rename = "nuRequisicao")]
    pub request_number: String,
    #[serde(flatten)]
    attributes: Map<String, Value>,
}

impl ProductEntry {
    pub fn new(code: impl Into<String>, request_number: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            request_number: request_number.into(),
            attributes: Map::new(),
        }
    }

    /// Adds a caller-supplied field such as `cepOrigem` or `psObjeto`.
    ///
    /// The code and request number are owned by the entry itself, so keys
    /// colliding with them are ignored.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if key != CODE_FIELD && key != REQUEST_NUMBER_FIELD {
            self.attributes.insert(key, value.into());
        }
        self
    }

    /// Adds every field of `attributes`, with the same rules as
    /// [`with_attribute`](Self::with_attribute).
    pub fn with_attributes(self, attributes: Map<String, Value>) -> Self {
        attributes
            .into_iter()
            .fold(self, |entry, (key, value)| entry.with_attribute(key, value))
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }
}
