use crate::metadata::extract::{bare_domain, favicon_url, Extracted};
use serde::{Deserialize, Serialize};

/// Link-preview metadata served for one page.
///
/// `is_fallback` marks a record synthesized from the URL alone after every
/// fetch attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRecord {
    pub title: String,
    pub description: String,
    pub image: Option<String>,
    pub site_name: String,
    pub favicon: String,
    pub url: String,
    pub is_fallback: bool,
}

impl MetadataRecord {
    pub fn from_extracted(extracted: Extracted, url: &str) -> Self {
        Self {
            title: extracted.title,
            description: extracted.description,
            image: extracted.image,
            site_name: extracted.site_name,
            favicon: extracted.favicon,
            url: url.to_string(),
            is_fallback: false,
        }
    }

    /// Record derived from the URL only. A URL without a usable host
    /// stands in for its own domain.
    pub fn degraded(url: &str) -> Self {
        let domain = url::Url::parse(url)
            .ok()
            .map(|parsed| bare_domain(&parsed))
            .filter(|domain| !domain.is_empty())
            .unwrap_or_else(|| url.to_string());

        Self {
            title: domain.clone(),
            description: url.to_string(),
            image: None,
            site_name: domain.clone(),
            favicon: favicon_url(&domain),
            url: url.to_string(),
            is_fallback: true,
        }
    }
}
