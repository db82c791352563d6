//! Startup check that every configured channel exists

use async_trait::async_trait;
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::application::bot::Bot;
use crate::application::errors::BotError;
use crate::application::services::{Cog, Extension};
use crate::domain::entities::{ChannelId, Command, GuildSnapshot};
use crate::infrastructure::config::Config;

const EXTENSION: &str = "exts.backend.config_verifier";

/// Configured channels missing from their guild. `public_` entries are
/// looked up in the public guild, everything else in the private one. A
/// guild that is not cached counts as having no channels.
pub fn invalid_channels(
    config: &Config,
    private: Option<&GuildSnapshot>,
    public: Option<&GuildSnapshot>,
) -> Vec<(&'static str, ChannelId)> {
    let ids = |guild: Option<&GuildSnapshot>| -> HashSet<ChannelId> {
        guild
            .map(|guild| guild.channels.iter().map(|c| c.id).collect())
            .unwrap_or_default()
    };
    let private_ids = ids(private);
    let public_ids = ids(public);

    config
        .channels
        .entries()
        .into_iter()
        .filter(|(name, id)| {
            if name.starts_with("public_") {
                !public_ids.contains(id)
            } else {
                !private_ids.contains(id)
            }
        })
        .collect()
}

/// Verify config on startup.
#[derive(Default)]
pub struct ConfigVerifier {
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ConfigVerifier {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Cog for ConfigVerifier {
    fn qualified_name(&self) -> &'static str {
        "ConfigVerifier"
    }

    fn extension(&self) -> Option<&'static str> {
        Some(EXTENSION)
    }

    fn commands(self: Arc<Self>) -> Vec<Command> {
        Vec::new()
    }

    async fn cog_load(&self, bot: &Arc<Bot>) -> Result<(), BotError> {
        let gate = Arc::clone(bot.gate());
        let chat = Arc::clone(bot.chat());
        let config = Arc::clone(bot.config());

        let task = tokio::spawn(async move {
            gate.wait(None).await;

            let private = chat.guild(config.guild.id);
            let public = chat.guild(config.guild.public);
            let invalid = invalid_channels(&config, private.as_ref(), public.as_ref());

            if !invalid.is_empty() {
                tracing::warn!("Configured channels do not exist in server: {:?}.", invalid);
            } else {
                tracing::debug!("All configured channels exist");
            }
        });
        *self.task.lock() = Some(task);
        Ok(())
    }

    async fn cog_unload(&self, _bot: &Arc<Bot>) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

pub struct ConfigVerifierExtension;

#[async_trait]
impl Extension for ConfigVerifierExtension {
    fn name(&self) -> &'static str {
        EXTENSION
    }

    async fn setup(&self, bot: &Arc<Bot>) -> Result<(), BotError> {
        bot.add_cog(Arc::new(ConfigVerifier::new())).await
    }
}
