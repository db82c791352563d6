use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::application::errors::BotError;

/// A piece of named content served by the tag service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    pub body: String,
}

/// TagStore trait - abstraction over the external tag/content service
#[async_trait]
pub trait TagStore: Send + Sync {
    /// Look a tag up by name. `Ok(None)` means the tag does not exist.
    async fn get_tag(&self, name: &str) -> Result<Option<Tag>, BotError>;

    async fn list_tags(&self) -> Result<Vec<String>, BotError>;
}
