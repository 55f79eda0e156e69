//! Cloud Billing catalog client

use anyhow::{Context, Result};
use async_trait::async_trait;
use estimator_lib::pricing::{Sku, SkuPage};
use estimator_lib::{EstimatorError, PriceCatalog};
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::config::BillingSettings;

/// Upper bound on followed pages, guards against a server repeating tokens
const MAX_PAGES: usize = 100;

/// Client for the `services.skus.list` endpoint
pub struct BillingClient {
    client: Client,
    skus_url: Url,
    currency_code: String,
    api_key: Option<String>,
    access_token: Option<String>,
}

impl BillingClient {
    /// Create a new catalog client
    pub fn new(settings: &BillingSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let mut base_url = Url::parse(&settings.base_url).context("Invalid billing API URL")?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let skus_url = base_url
            .join(&format!("v1/services/{}/skus", settings.service_id))
            .context("Invalid billing service id")?;

        Ok(Self {
            client,
            skus_url,
            currency_code: settings.currency_code.clone(),
            api_key: settings.api_key.clone(),
            access_token: settings.access_token.clone(),
        })
    }

    /// Fetch one page of SKUs
    async fn fetch_page(&self, page_token: Option<&str>) -> Result<SkuPage> {
        let mut query = vec![("currencyCode", self.currency_code.as_str())];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }
        if let Some(key) = &self.api_key {
            query.push(("key", key.as_str()));
        }

        let mut request = self.client.get(self.skus_url.clone()).query(&query);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Billing API error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse SKU page")
    }

    /// Fetch every SKU of the service, following page tokens
    pub async fn list_skus(&self) -> Result<Vec<Sku>> {
        let mut skus = Vec::new();
        let mut page_token: Option<String> = None;

        for page_number in 1..=MAX_PAGES {
            let page = self.fetch_page(page_token.as_deref()).await?;
            debug!(page = page_number, skus = page.skus.len(), "Fetched SKU page");
            skus.extend(page.skus);

            if page.next_page_token.is_empty() {
                return Ok(skus);
            }
            page_token = Some(page.next_page_token);
        }

        anyhow::bail!("Billing API returned more than {} pages", MAX_PAGES)
    }
}

#[async_trait]
impl PriceCatalog for BillingClient {
    async fn skus(&self) -> estimator_lib::Result<Vec<Sku>> {
        self.list_skus()
            .await
            .map_err(|e| EstimatorError::Source(format!("{:#}", e)))
    }
}
