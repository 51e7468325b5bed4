//! The Correios API client.
//!
//! Operations are spread over the `pricing`, `deadline` and `prepostage`
//! modules as further `impl Client` blocks; this module holds the shared
//! state and request plumbing.

use log::debug;
use reqwest::{IntoUrl, Method, RequestBuilder, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::auth::{Session, TokenManager};
use crate::batch::{self, BATCH_SIZE};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::deadline::DeadlineRecord;
use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::pricing::PriceRecord;
use crate::product::ProductEntry;

/// Client for one postage card.
///
/// Holds the bearer token, the products accumulated for the next price or
/// deadline query, and the results of the last successful queries. Every
/// operation takes `&mut self`; use one client per task.
///
/// # Example
///
/// ```ignore
/// use correios::{Client, Config, ProductEntry};
///
/// let mut client = Client::connect(Config::from_env()?).await?;
/// client.add_product(ProductEntry::new("03220", "01").with_attribute("psObjeto", 300));
/// client.query_prices().await?;
/// println!("SEDEX: {}", client.price_total("03220")?);
/// ```
pub struct Client<C: Clock = SystemClock> {
    pub(crate) http: HttpClient,
    pub(crate) base_url: String,
    pub(crate) auth: TokenManager<C>,
    pub(crate) products: Vec<ProductEntry>,
    pub(crate) prices: Option<Vec<PriceRecord>>,
    pub(crate) deadlines: Option<Vec<DeadlineRecord>>,
}

impl Client<SystemClock> {
    /// Creates a client that authenticates on its first operation.
    pub fn new(config: Config) -> Result<Self> {
        Self::with_clock(config, SystemClock)
    }

    /// Creates a client and authenticates immediately.
    pub async fn connect(config: Config) -> Result<Self> {
        let mut client = Self::new(config)?;
        client.auth.authenticate().await?;
        Ok(client)
    }
}

impl<C: Clock> Client<C> {
    /// Creates a client that reads the time from `clock`.
    pub fn with_clock(config: Config, clock: C) -> Result<Self> {
        let http = config.build_http_client()?;
        let base_url = config.resolved_base_url();
        debug!("Correios client for {} ({:?})", base_url, config.environment);

        let auth = TokenManager::new(http.clone(), &base_url, config.credentials, clock);

        Ok(Self {
            http,
            base_url,
            auth,
            products: Vec::new(),
            prices: None,
            deadlines: None,
        })
    }

    /// Forces a new token, replacing the current one.
    pub async fn authenticate(&mut self) -> Result<&Session> {
        self.auth.authenticate().await
    }

    /// Current token session, if one was ever obtained.
    pub fn session(&self) -> Option<&Session> {
        self.auth.session()
    }

    /// Whether a token exists and has not expired yet.
    pub fn is_authenticated(&self) -> bool {
        self.auth.is_valid()
    }

    /// Appends a product to the list used by price and deadline queries.
    pub fn add_product(&mut self, product: ProductEntry) {
        debug!(
            "Adding product {} (request {})",
            product.code, product.request_number
        );
        self.products.push(product);
    }

    /// Products in insertion order.
    pub fn products(&self) -> &[ProductEntry] {
        &self.products
    }

    /// Empties the product list. Result sets are kept.
    pub fn clear_products(&mut self) {
        self.products.clear();
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// URL of `path` with `segment` appended as one percent-encoded path segment.
    pub(crate) fn endpoint_with_segment(&self, path: &str, segment: &str) -> Result<Url> {
        let endpoint = self.endpoint(path);
        let mut url = Url::parse(&endpoint)
            .map_err(|e| Error::Config(format!("invalid endpoint {}: {}", endpoint, e)))?;
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("endpoint {} cannot take a path", endpoint)))?
            .push(segment);
        Ok(url)
    }

    pub(crate) fn authorized(&self, method: Method, path: &str, token: &str) -> RequestBuilder {
        self.authorized_url(method, self.endpoint(path), token)
    }

    pub(crate) fn authorized_url<U: IntoUrl>(
        &self,
        method: Method,
        url: U,
        token: &str,
    ) -> RequestBuilder {
        self.http.inner().request(method, url).bearer_auth(token)
    }

    /// Posts `items` in batches of [`BATCH_SIZE`], one request at a time.
    ///
    /// The first failing batch aborts the call; later batches are not sent
    /// and nothing is merged.
    pub(crate) async fn post_in_batches<'a, I, B, T, F>(
        &self,
        token: &str,
        path: &str,
        context: &'static str,
        items: &'a [I],
        body_for: F,
    ) -> Result<Vec<T>>
    where
        B: Serialize,
        T: DeserializeOwned,
        F: Fn(&'a [I]) -> B,
    {
        let batches = batch::chunk(items, BATCH_SIZE);
        let total = batches.len();
        let mut parts = Vec::with_capacity(total);

        for (index, group) in batches.into_iter().enumerate() {
            debug!(
                "{}: sending batch {}/{} with {} items",
                context,
                index + 1,
                total,
                group.len()
            );
            let request = self
                .authorized(Method::POST, path, token)
                .json(&body_for(group));
            let part: Vec<T> = self
                .http
                .execute_json(request, StatusCode::OK, context)
                .await?;
            parts.push(part);
        }

        Ok(batch::merge_in_order(parts))
    }
}
