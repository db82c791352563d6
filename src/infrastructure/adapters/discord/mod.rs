//! Discord adapter built on serenity

pub mod chat;
pub mod convert;
pub mod handler;

use serenity::all::{ClientBuilder, GatewayIntents, HttpBuilder};
use serenity::cache::Settings as CacheSettings;
use std::sync::Arc;

use crate::application::bot::Bot;
use crate::application::errors::BotError;
use crate::exts;
use crate::infrastructure::config::Config;
use crate::infrastructure::net::Network;
use crate::infrastructure::site_api::SiteApiTags;

pub use chat::SerenityChat;
pub use handler::Handler;

const MAX_CACHED_MESSAGES: usize = 10_000;

/// Every intent except presences, DM typing and reactions, invites,
/// webhooks and integrations.
pub fn intents() -> GatewayIntents {
    GatewayIntents::all()
        & !(GatewayIntents::GUILD_PRESENCES
            | GatewayIntents::DIRECT_MESSAGE_TYPING
            | GatewayIntents::DIRECT_MESSAGE_REACTIONS
            | GatewayIntents::GUILD_INVITES
            | GatewayIntents::GUILD_WEBHOOKS
            | GatewayIntents::GUILD_INTEGRATIONS)
}

/// Connect to Discord and run until the gateway closes or a shutdown
/// signal arrives.
pub async fn run(config: Arc<Config>) -> Result<(), BotError> {
    let network = Network::new()?;
    let connector = network
        .connector
        .client()
        .ok_or_else(|| BotError::Startup("Connector closed before startup".into()))?;
    let http = HttpBuilder::new(&config.bot.token).client(connector).build();

    let chat = Arc::new(SerenityChat::new());
    let tags = Arc::new(SiteApiTags::new(
        Arc::clone(&network.session),
        config.urls.site_api.clone(),
        config.keys.site_api.clone(),
    ));

    let bot = Bot::builder(Arc::clone(&config), chat.clone(), tags, network.resources())
        .with_extensions(exts::catalog())
        .build();

    let mut cache_settings = CacheSettings::default();
    cache_settings.max_messages = MAX_CACHED_MESSAGES;

    let mut client = ClientBuilder::new_with_http(http, intents())
        .cache_settings(cache_settings)
        .event_handler(Handler::new(Arc::clone(&bot), Arc::clone(&chat)))
        .await
        .map_err(|e| BotError::Startup(format!("Failed to build Discord client: {e}")))?;
    chat.attach(&client);

    bot.setup_hook();
    spawn_shutdown_listener(Arc::clone(&bot));

    tracing::info!("Connecting to Discord");
    let result = client.start().await;
    bot.close().await;

    result.map_err(|e| BotError::Startup(format!("Discord client stopped: {e}")))
}

fn spawn_shutdown_listener(bot: Arc<Bot>) {
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        tracing::info!("Shutdown signal received, closing the bot");
        bot.close().await;
    });
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = terminate.recv() => {}
            }
        }
        Err(e) => {
            tracing::warn!("Failed to listen for SIGTERM: {}", e);
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intents_exclude_noisy_events() {
        let intents = intents();
        assert!(intents.contains(GatewayIntents::MESSAGE_CONTENT));
        assert!(intents.contains(GatewayIntents::GUILD_MEMBERS));
        assert!(!intents.contains(GatewayIntents::GUILD_PRESENCES));
        assert!(!intents.contains(GatewayIntents::DIRECT_MESSAGE_TYPING));
        assert!(!intents.contains(GatewayIntents::GUILD_WEBHOOKS));
    }
}
