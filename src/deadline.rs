//! National delivery deadline queries (`/prazo/v1/nacional`).

use chrono::NaiveDate;
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::batch::BATCH_ID;
use crate::client::Client;
use crate::clock::Clock;
use crate::error::{Error, Precondition, Result};

pub const DEADLINE_PATH: &str = "/prazo/v1/nacional";

const CONTEXT: &str = "deadline query";

/// Date format of `dataPostagem`.
const POSTING_DATE_FORMAT: &str = "%Y-%m-%d";

/// Date format of `dtEvento`.
const EVENT_DATE_FORMAT: &str = "%d-%m-%Y";

/// Shipment details shared by every product of a deadline query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadlineQuery {
    pub posting_date: NaiveDate,
    pub origin_postal_code: String,
    pub destination_postal_code: String,
    /// Defaults to the posting date.
    pub event_date: Option<NaiveDate>,
}

impl DeadlineQuery {
    pub fn new(
        posting_date: NaiveDate,
        origin_postal_code: impl Into<String>,
        destination_postal_code: impl Into<String>,
    ) -> Self {
        Self {
            posting_date,
            origin_postal_code: origin_postal_code.into(),
            destination_postal_code: destination_postal_code.into(),
            event_date: None,
        }
    }

    pub fn with_event_date(mut self, event_date: NaiveDate) -> Self {
        self.event_date = Some(event_date);
        self
    }

    /// Event date in `DD-MM-YYYY` form, falling back to the posting date.
    pub fn event_date_param(&self) -> String {
        self.event_date
            .unwrap_or(self.posting_date)
            .format(EVENT_DATE_FORMAT)
            .to_string()
    }

    pub fn posting_date_param(&self) -> String {
        self.posting_date.format(POSTING_DATE_FORMAT).to_string()
    }
}

/// One entry of `parametrosPrazo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeadlineParameter<'a> {
    #[serde(rename = "coProduto")]
    pub product_code: &'a str,
    #[serde(rename = "nuRequisicao")]
    pub request_number: &'a str,
    #[serde(rename = "dtEvento")]
    pub event_date: String,
    #[serde(rename = "cepOrigem")]
    pub origin_postal_code: &'a str,
    #[serde(rename = "cepDestino")]
    pub destination_postal_code: &'a str,
    #[serde(rename = "dataPostagem")]
    pub posting_date: String,
}

#[derive(Serialize)]
struct DeadlineBatch<'a> {
    #[serde(rename = "idLote")]
    batch_id: &'a str,
    #[serde(rename = "parametrosPrazo")]
    parameters: &'a [DeadlineParameter<'a>],
}

/// Delivery estimate of one product as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadlineRecord {
    #[serde(rename = "coProduto")]
    pub product_code: String,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl DeadlineRecord {
    /// Delivery time in days (`prazoEntrega`), when present.
    pub fn delivery_days(&self) -> Option<u64> {
        match self.details.get("prazoEntrega")? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Latest expected delivery date (`dataMaxima`), as sent by the API.
    pub fn max_date(&self) -> Option<&str> {
        self.details.get("dataMaxima").and_then(Value::as_str)
    }
}

/// First record for `product_code`.
pub fn find_record<'a>(
    records: &'a [DeadlineRecord],
    product_code: &str,
) -> Result<&'a DeadlineRecord> {
    records
        .iter()
        .find(|r| r.product_code == product_code)
        .ok_or_else(|| Error::NotFound {
            product_code: product_code.to_string(),
        })
}

impl<C: Clock> Client<C> {
    /// Estimates delivery for every accumulated product, five per request.
    ///
    /// The merged records replace the previous deadline results.
    #[tracing::instrument(skip(self))]
    pub async fn query_deadlines(&mut self, query: &DeadlineQuery) -> Result<&[DeadlineRecord]> {
        if self.products.is_empty() {
            return Err(Precondition::NoProducts.into());
        }

        let token = self.auth.ensure_valid().await?;

        let event_date = query.event_date_param();
        let posting_date = query.posting_date_param();
        let parameters: Vec<DeadlineParameter<'_>> = self
            .products
            .iter()
            .map(|product| DeadlineParameter {
                product_code: &product.code,
                request_number: &product.request_number,
                event_date: event_date.clone(),
                origin_postal_code: &query.origin_postal_code,
                destination_postal_code: &query.destination_postal_code,
                posting_date: posting_date.clone(),
            })
            .collect();

        let records: Vec<DeadlineRecord> = self
            .post_in_batches(&token, DEADLINE_PATH, CONTEXT, &parameters, |group| {
                DeadlineBatch {
                    batch_id: BATCH_ID,
                    parameters: group,
                }
            })
            .await?;

        info!(
            "Deadlines for {} products from {} to {}: {} records",
            parameters.len(),
            query.origin_postal_code,
            query.destination_postal_code,
            records.len()
        );

        Ok(self.deadlines.insert(records).as_slice())
    }

    /// Records of the last successful deadline query.
    pub fn deadline_results(&self) -> Option<&[DeadlineRecord]> {
        self.deadlines.as_deref()
    }

    /// Delivery estimate for `product_code`.
    ///
    /// Unlike [`price_total`](Client::price_total), a missing product is an
    /// error ([`Error::NotFound`]).
    pub fn deadline_for(&self, product_code: &str) -> Result<&DeadlineRecord> {
        let records = self
            .deadlines
            .as_deref()
            .ok_or(Precondition::DeadlinesNotQueried)?;
        find_record(records, product_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::{TOKEN, mock_token, test_config};
    use crate::product::ProductEntry;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(code: &str, days: u64) -> DeadlineRecord {
        serde_json::from_value(json!({"coProduto": code, "prazoEntrega": days})).unwrap()
    }

    #[test]
    fn test_event_date_defaults_to_reformatted_posting_date() {
        let query = DeadlineQuery::new(date(2024, 3, 7), "70002900", "05311900");
        assert_eq!(query.posting_date_param(), "2024-03-07");
        assert_eq!(query.event_date_param(), "07-03-2024");

        let query = query.with_event_date(date(2024, 3, 9));
        assert_eq!(query.event_date_param(), "09-03-2024");
        assert_eq!(query.posting_date_param(), "2024-03-07");
    }

    #[test]
    fn test_find_record_returns_first_match() {
        let records = vec![record("03220", 1), record("03298", 5), record("03220", 9)];
        assert_eq!(find_record(&records, "03220").unwrap().delivery_days(), Some(1));
        assert_eq!(find_record(&records, "03298").unwrap().delivery_days(), Some(5));
    }

    #[test]
    fn test_find_record_missing_is_not_found() {
        let records = vec![record("03220", 1)];
        let err = find_record(&records, "04227").unwrap_err();
        assert!(matches!(err, Error::NotFound { ref product_code } if product_code == "04227"));
    }

    #[test]
    fn test_record_accessors() {
        let record: DeadlineRecord = serde_json::from_value(json!({
            "coProduto": "03220",
            "prazoEntrega": "3",
            "dataMaxima": "2024-03-12T23:59:00"
        }))
        .unwrap();

        assert_eq!(record.delivery_days(), Some(3));
        assert_eq!(record.max_date(), Some("2024-03-12T23:59:00"));

        let bare = DeadlineRecord {
            product_code: "03220".to_string(),
            details: Map::new(),
        };
        assert_eq!(bare.delivery_days(), None);
        assert_eq!(bare.max_date(), None);
    }

    #[test]
    fn test_deadline_for_before_query_is_precondition_failure() {
        let client = Client::new(crate::config::Config::new("u", "p", "c", true)).unwrap();
        let err = client.deadline_for("03220").unwrap_err();
        assert!(matches!(
            err,
            Error::Precondition(Precondition::DeadlinesNotQueried)
        ));
    }

    #[tokio::test]
    async fn test_query_deadlines_without_products_makes_no_request() {
        let mut server = Server::new_async().await;
        let token = mock_token(&mut server, 0).await;
        let deadlines = server
            .mock("POST", DEADLINE_PATH)
            .expect(0)
            .create_async()
            .await;

        let mut client = Client::new(test_config(&server)).unwrap();
        let query = DeadlineQuery::new(date(2024, 3, 7), "70002900", "05311900");
        let err = client.query_deadlines(&query).await.unwrap_err();

        assert!(matches!(err, Error::Precondition(Precondition::NoProducts)));
        token.assert_async().await;
        deadlines.assert_async().await;
    }

    #[tokio::test]
    async fn test_query_deadlines_builds_parameters_per_product() {
        let mut server = Server::new_async().await;
        let token = mock_token(&mut server, 1).await;
        let deadlines = server
            .mock("POST", DEADLINE_PATH)
            .match_header("authorization", format!("Bearer {}", TOKEN).as_str())
            .match_body(Matcher::Json(json!({
                "idLote": "1",
                "parametrosPrazo": [
                    {
                        "coProduto": "03220",
                        "nuRequisicao": "01",
                        "dtEvento": "07-03-2024",
                        "cepOrigem": "70002900",
                        "cepDestino": "05311900",
                        "dataPostagem": "2024-03-07"
                    },
                    {
                        "coProduto": "03298",
                        "nuRequisicao": "02",
                        "dtEvento": "07-03-2024",
                        "cepOrigem": "70002900",
                        "cepDestino": "05311900",
                        "dataPostagem": "2024-03-07"
                    }
                ]
            })))
            .with_status(200)
            .with_body(
                r#"[{"coProduto": "03220", "prazoEntrega": 1},
                    {"coProduto": "03298", "prazoEntrega": 5}]"#,
            )
            .expect(1)
            .create_async()
            .await;

        let mut client = Client::new(test_config(&server)).unwrap();
        client.add_product(ProductEntry::new("03220", "01").with_attribute("psObjeto", 300));
        client.add_product(ProductEntry::new("03298", "02"));

        let query = DeadlineQuery::new(date(2024, 3, 7), "70002900", "05311900");
        let records = client.query_deadlines(&query).await.unwrap();
        assert_eq!(records.len(), 2);

        token.assert_async().await;
        deadlines.assert_async().await;

        assert_eq!(client.deadline_for("03298").unwrap().delivery_days(), Some(5));
        assert!(matches!(
            client.deadline_for("04510"),
            Err(Error::NotFound { .. })
        ));
        assert_eq!(client.products().len(), 2);
    }

    #[tokio::test]
    async fn test_query_deadlines_chunks_by_five() {
        let mut server = Server::new_async().await;
        let _token = mock_token(&mut server, 1).await;

        let first = server
            .mock("POST", DEADLINE_PATH)
            .match_body(Matcher::Regex(r#""coProduto":"D1""#.to_string()))
            .with_status(200)
            .with_body(
                r#"[{"coProduto":"D1"},{"coProduto":"D2"},{"coProduto":"D3"},
                    {"coProduto":"D4"},{"coProduto":"D5"}]"#,
            )
            .expect(1)
            .create_async()
            .await;
        let second = server
            .mock("POST", DEADLINE_PATH)
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#""coProduto":"D6""#.to_string()),
                Matcher::Regex(r#""dtEvento":"10-03-2024""#.to_string()),
            ]))
            .with_status(200)
            .with_body(r#"[{"coProduto":"D6"}]"#)
            .expect(1)
            .create_async()
            .await;

        let mut client = Client::new(test_config(&server)).unwrap();
        for i in 1..=6 {
            client.add_product(ProductEntry::new(format!("D{}", i), i.to_string()));
        }

        let query = DeadlineQuery::new(date(2024, 3, 7), "70002900", "05311900")
            .with_event_date(date(2024, 3, 10));
        let codes: Vec<String> = client
            .query_deadlines(&query)
            .await
            .unwrap()
            .iter()
            .map(|r| r.product_code.clone())
            .collect();

        first.assert_async().await;
        second.assert_async().await;
        assert_eq!(codes, vec!["D1", "D2", "D3", "D4", "D5", "D6"]);
    }

    #[tokio::test]
    async fn test_query_deadlines_failed_batch_leaves_no_results() {
        let mut server = Server::new_async().await;
        let _token = mock_token(&mut server, 1).await;
        let _deadlines = server
            .mock("POST", DEADLINE_PATH)
            .with_status(422)
            .with_body(r#"{"msgs":["CEP de destino inválido"]}"#)
            .create_async()
            .await;

        let mut client = Client::new(test_config(&server)).unwrap();
        client.add_product(ProductEntry::new("03220", "01"));
        let query = DeadlineQuery::new(date(2024, 3, 7), "70002900", "00000000");
        let err = client.query_deadlines(&query).await.unwrap_err();

        assert_eq!(err.status(), Some(422));
        assert!(client.deadline_results().is_none());
    }
}
