//! National price queries (`/preco/v1/nacional`).

use std::str::FromStr;

use log::{debug, info, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::batch::BATCH_ID;
use crate::client::Client;
use crate::clock::Clock;
use crate::error::{Precondition, Result};
use crate::product::ProductEntry;

pub const PRICE_PATH: &str = "/preco/v1/nacional";

const CONTEXT: &str = "price query";

#[derive(Serialize)]
struct PriceBatch<'a> {
    #[serde(rename = "idLote")]
    batch_id: &'a str,
    #[serde(rename = "parametrosProduto")]
    products: &'a [ProductEntry],
}

/// Price of one product as returned by the API.
///
/// Only the fields the client reads are typed; the rest are kept in `details`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    #[serde(rename = "coProduto")]
    pub product_code: String,
    /// Final price with a comma decimal separator, e.g. `"25,50"`.
    #[serde(rename = "pcFinal", default, skip_serializing_if = "Option::is_none")]
    pub final_price: Option<String>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl PriceRecord {
    /// Final price as a decimal, `None` when absent or not a number.
    pub fn final_price_decimal(&self) -> Option<Decimal> {
        self.final_price.as_deref().and_then(parse_comma_decimal)
    }
}

/// Parses a decimal that uses a comma as separator (`"10,50"` is 10.50).
pub fn parse_comma_decimal(value: &str) -> Option<Decimal> {
    Decimal::from_str(&value.trim().replace(',', ".")).ok()
}

/// Sums the final price of every record whose code is `product_code`.
///
/// Returns zero when no record matches. A matching record without a
/// numeric `pcFinal` (an item the API could not price, reported through
/// `txErro`) adds zero.
pub fn total_for(records: &[PriceRecord], product_code: &str) -> Decimal {
    records
        .iter()
        .filter(|r| r.product_code == product_code)
        .fold(Decimal::ZERO, |total, record| match record.final_price_decimal() {
            Some(price) => total + price,
            None => {
                warn!(
                    "Product {} has no usable final price ({:?}), counting zero",
                    record.product_code,
                    record.final_price.as_deref().unwrap_or_default()
                );
                total
            }
        })
}

impl<C: Clock> Client<C> {
    /// Prices every accumulated product, five per request.
    ///
    /// The merged records replace the previous price results. The product
    /// list is left untouched.
    #[tracing::instrument(skip(self))]
    pub async fn query_prices(&mut self) -> Result<&[PriceRecord]> {
        if self.products.is_empty() {
            return Err(Precondition::NoProducts.into());
        }

        let token = self.auth.ensure_valid().await?;
        let records: Vec<PriceRecord> = self
            .post_in_batches(&token, PRICE_PATH, CONTEXT, &self.products, |group| {
                PriceBatch {
                    batch_id: BATCH_ID,
                    products: group,
                }
            })
            .await?;

        info!(
            "Priced {} products, {} records",
            self.products.len(),
            records.len()
        );

        Ok(self.prices.insert(records).as_slice())
    }

    /// Records of the last successful price query.
    pub fn price_results(&self) -> Option<&[PriceRecord]> {
        self.prices.as_deref()
    }

    /// Sum of the final prices recorded for `product_code`.
    ///
    /// A code with no matching record totals zero, and so does a record the
    /// API returned without a usable price.
    pub fn price_total(&self, product_code: &str) -> Result<Decimal> {
        let records = self
            .prices
            .as_deref()
            .ok_or(Precondition::PricesNotQueried)?;

        let total = total_for(records, product_code);
        debug!("Price total for {}: {}", product_code, total);
        Ok(total)
    }
}
