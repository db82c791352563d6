//! Site API client

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use std::sync::Arc;

use crate::application::errors::BotError;
use crate::domain::traits::{Tag, TagStore};
use crate::infrastructure::net::HttpSession;

#[derive(Debug, Deserialize)]
struct TagSummary {
    name: String,
}

/// Tags stored on the project site, read through its bot API.
pub struct SiteApiTags {
    session: Arc<HttpSession>,
    base_url: String,
    api_key: String,
}

impl SiteApiTags {
    pub fn new(session: Arc<HttpSession>, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            session,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn tags_url(&self) -> Result<Url, BotError> {
        Url::parse(&format!("{}/bot/tags", self.base_url))
            .map_err(|e| BotError::Network(format!("Invalid site API URL {:?}: {}", self.base_url, e)))
    }

    /// URL of one tag. The name becomes a single percent-encoded path
    /// segment, so `/`, `?` and `#` cannot leave the tags endpoint.
    pub fn tag_url(&self, name: &str) -> Result<Url, BotError> {
        let mut url = self.tags_url()?;
        url.path_segments_mut()
            .map_err(|_| BotError::Network(format!("Site API URL {:?} cannot have a path", self.base_url)))?
            .push(name);
        Ok(url)
    }

    fn request(&self, url: Url) -> Result<reqwest::RequestBuilder, BotError> {
        Ok(self
            .session
            .client()?
            .get(url)
            .bearer_auth(&self.api_key))
    }
}

/// Names that cannot form a tag path segment of their own.
fn is_unaddressable(name: &str) -> bool {
    matches!(name, "" | "." | "..")
}

fn network_error(e: reqwest::Error) -> BotError {
    BotError::Network(e.to_string())
}

#[async_trait]
impl TagStore for SiteApiTags {
    async fn get_tag(&self, name: &str) -> Result<Option<Tag>, BotError> {
        if is_unaddressable(name) {
            return Ok(None);
        }
        let url = self.tag_url(name)?;
        tracing::trace!("GET {}", url);

        let response = self.request(url)?.send().await.map_err(network_error)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let tag = response
            .error_for_status()
            .map_err(network_error)?
            .json::<Tag>()
            .await
            .map_err(network_error)?;
        Ok(Some(tag))
    }

    async fn list_tags(&self) -> Result<Vec<String>, BotError> {
        let tags = self
            .request(self.tags_url()?)?
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(network_error)?
            .json::<Vec<TagSummary>>()
            .await
            .map_err(network_error)?;
        Ok(tags.into_iter().map(|tag| tag.name).collect())
    }
}
