//! `ChatClient` on top of serenity's HTTP client and cache

use async_trait::async_trait;
use serenity::all::{
    Cache, Client, Command as GlobalCommand, Http, PermissionOverwrite, PermissionOverwriteType,
    Permissions, ShardManager,
};
use std::sync::{Arc, OnceLock};

use crate::application::errors::PlatformError;
use crate::domain::entities::{ChannelId, GuildId, GuildSnapshot, MessageId, OutgoingMessage, UserId};
use crate::domain::traits::{AppCommandSpec, ChatClient, SyncScope};

use super::convert;

/// Permissions toggled by silencing a channel.
fn silenced_permissions() -> Permissions {
    Permissions::SEND_MESSAGES | Permissions::SPEAK
}

/// The serenity client's parts, available once it has been built.
#[derive(Default)]
pub struct SerenityChat {
    http: OnceLock<Arc<Http>>,
    cache: OnceLock<Arc<Cache>>,
    shard_manager: OnceLock<Arc<ShardManager>>,
    user_id: OnceLock<UserId>,
}

impl SerenityChat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the HTTP client, cache and shard manager of `client`.
    pub fn attach(&self, client: &Client) {
        let _ = self.http.set(Arc::clone(&client.http));
        let _ = self.cache.set(Arc::clone(&client.cache));
        let _ = self.shard_manager.set(Arc::clone(&client.shard_manager));
    }

    pub fn set_current_user(&self, id: UserId) {
        let _ = self.user_id.set(id);
    }

    fn http(&self) -> Result<&Arc<Http>, PlatformError> {
        self.http
            .get()
            .ok_or_else(|| PlatformError::new("Discord client is not connected"))
    }
}

#[async_trait]
impl ChatClient for SerenityChat {
    fn current_user_id(&self) -> Option<UserId> {
        self.user_id.get().copied()
    }

    fn guild(&self, guild_id: GuildId) -> Option<GuildSnapshot> {
        let id = convert::to_guild(guild_id).ok()?;
        let cache = self.cache.get()?;
        let guild = cache.guild(id)?;
        Some(convert::guild_snapshot(&guild))
    }

    async fn send_message(
        &self,
        channel_id: ChannelId,
        message: OutgoingMessage,
    ) -> Result<MessageId, PlatformError> {
        let sent = convert::to_channel(channel_id)?
            .send_message(self.http()?, convert::create_message(&message))
            .await
            .map_err(convert::platform_error)?;
        Ok(MessageId(sent.id.get()))
    }

    async fn delete_message(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
    ) -> Result<(), PlatformError> {
        convert::to_channel(channel_id)?
            .delete_message(self.http()?, convert::to_message(message_id)?)
            .await
            .map_err(convert::platform_error)
    }

    async fn trigger_typing(&self, channel_id: ChannelId) -> Result<(), PlatformError> {
        let result = convert::to_channel(channel_id)?
            .broadcast_typing(self.http()?)
            .await
            .map_err(convert::platform_error);

        match result {
            Err(e) if e.is_forbidden() => {
                tracing::debug!("Missing permission to type in {}: {}", channel_id, e);
                Ok(())
            }
            other => other,
        }
    }

    async fn set_send_permission(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        allow: bool,
    ) -> Result<bool, PlatformError> {
        let http = self.http()?;
        let channel = convert::to_channel(channel_id)?;
        let everyone = serenity::all::RoleId::new(convert::to_guild(guild_id)?.get());

        let guild_channel = channel
            .to_channel(http)
            .await
            .map_err(convert::platform_error)?
            .guild()
            .ok_or_else(|| PlatformError::new(format!("{channel_id} is not a guild channel")))?;

        let current = guild_channel
            .permission_overwrites
            .iter()
            .find(|overwrite| overwrite.kind == PermissionOverwriteType::Role(everyone));
        let (current_allow, current_deny) = current
            .map(|overwrite| (overwrite.allow, overwrite.deny))
            .unwrap_or((Permissions::empty(), Permissions::empty()));

        let silenced = current_deny.contains(Permissions::SEND_MESSAGES);
        if silenced != allow {
            return Ok(false);
        }

        let toggled = silenced_permissions();
        let overwrite = PermissionOverwrite {
            allow: current_allow - toggled,
            deny: if allow {
                current_deny - toggled
            } else {
                current_deny | toggled
            },
            kind: PermissionOverwriteType::Role(everyone),
        };

        channel
            .create_permission(http, overwrite)
            .await
            .map_err(convert::platform_error)?;
        Ok(true)
    }

    async fn disconnect_voice_members(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<usize, PlatformError> {
        let guild = convert::to_guild(guild_id)?;
        let channel = convert::to_channel(channel_id)?;
        let members: Vec<serenity::all::UserId> = self
            .cache
            .get()
            .and_then(|cache| cache.guild(guild))
            .map(|cached| {
                cached
                    .voice_states
                    .values()
                    .filter(|state| state.channel_id == Some(channel))
                    .map(|state| state.user_id)
                    .collect()
            })
            .unwrap_or_default();

        let http = self.http()?;
        let mut moved = 0;
        for member in members {
            match guild.disconnect_member(http, member).await {
                Ok(_) => moved += 1,
                Err(e) => tracing::warn!("Failed to disconnect {} from {}: {}", member, channel_id, e),
            }
        }
        Ok(moved)
    }

    async fn sync_app_commands(
        &self,
        scope: SyncScope,
        commands: Vec<AppCommandSpec>,
    ) -> Result<usize, PlatformError> {
        let http = self.http()?;
        let builders = commands.iter().map(convert::create_command).collect();

        let synced = match scope {
            SyncScope::Global => GlobalCommand::set_global_commands(http, builders).await,
            SyncScope::Guild(guild_id) => {
                convert::to_guild(guild_id)?
                    .set_commands(http, builders)
                    .await
            }
        }
        .map_err(convert::platform_error)?;
        Ok(synced.len())
    }

    async fn close(&self) {
        match self.shard_manager.get() {
            Some(shard_manager) => shard_manager.shutdown_all().await,
            None => tracing::debug!("Discord client was never started"),
        }
    }
}
