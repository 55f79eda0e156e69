//! Price catalog read from a saved `skus.list` response

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::PriceCatalog;
use crate::error::{EstimatorError, Result};
use crate::pricing::{Sku, SkuPage};

/// Either a full response page or just its `skus` array
#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogDocument {
    Skus(Vec<Sku>),
    Page(SkuPage),
}

pub struct CatalogFile {
    path: PathBuf,
    skus: Vec<Sku>,
}

impl CatalogFile {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let raw = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| EstimatorError::Io {
                path: path.clone(),
                source,
            })?;

        let skus = Self::parse(&raw)?;
        debug!(path = %path.display(), skus = skus.len(), "Loaded price catalog file");
        Ok(Self { path, skus })
    }

    fn parse(raw: &str) -> Result<Vec<Sku>> {
        let document: CatalogDocument =
            serde_json::from_str(raw).map_err(|source| EstimatorError::Json {
                what: "price catalog".to_string(),
                source,
            })?;

        Ok(match document {
            CatalogDocument::Skus(skus) => skus,
            CatalogDocument::Page(page) => {
                if !page.next_page_token.is_empty() {
                    warn!(
                        event = "catalog_truncated",
                        "Catalog file holds a single page of a paginated response, later pages are missing"
                    );
                }
                page.skus
            }
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl PriceCatalog for CatalogFile {
    async fn skus(&self) -> Result<Vec<Sku>> {
        Ok(self.skus.clone())
    }
}
