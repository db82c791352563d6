use serenity::all::{
    Context as SerenityContext, CreateInteractionResponse, EventHandler, Guild, Interaction,
    Message as SerenityMessage, Ready, UnavailableGuild,
};
use serenity::async_trait;
use std::sync::Arc;

use crate::application::bot::Bot;
use crate::application::errors::BotError;
use crate::domain::entities::{ChannelId, GuildId, UserId};

use super::chat::SerenityChat;
use super::convert;

/// Forwards gateway events to the bot.
pub struct Handler {
    bot: Arc<Bot>,
    chat: Arc<SerenityChat>,
}

impl Handler {
    pub fn new(bot: Arc<Bot>, chat: Arc<SerenityChat>) -> Self {
        Self { bot, chat }
    }

    fn category_of(ctx: &SerenityContext, msg: &SerenityMessage) -> Option<ChannelId> {
        let guild = ctx.cache.guild(msg.guild_id?)?;
        let channel = guild
            .channels
            .get(&msg.channel_id)
            .or_else(|| guild.threads.iter().find(|thread| thread.id == msg.channel_id))?;
        channel.parent_id.map(|parent| ChannelId(parent.get()))
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _ctx: SerenityContext, ready: Ready) {
        self.chat.set_current_user(UserId(ready.user.id.get()));
        tracing::info!("{} is connected!", ready.user.name);
    }

    async fn guild_create(&self, _ctx: SerenityContext, guild: Guild, _is_new: Option<bool>) {
        self.bot.on_guild_available(&convert::guild_snapshot(&guild));
    }

    async fn guild_delete(&self, _ctx: SerenityContext, incomplete: UnavailableGuild, _full: Option<Guild>) {
        if incomplete.unavailable {
            self.bot.on_guild_unavailable(GuildId(incomplete.id.get()));
        }
    }

    async fn message(&self, ctx: SerenityContext, msg: SerenityMessage) {
        let category = Self::category_of(&ctx, &msg);
        self.bot
            .process_commands(convert::message(&msg, category))
            .await;
    }

    async fn interaction_create(&self, ctx: SerenityContext, interaction: Interaction) {
        let result = match interaction {
            Interaction::Command(command) => {
                let reply = self
                    .bot
                    .handle_app_command(convert::app_interaction(&command))
                    .await;
                command
                    .create_response(
                        &ctx.http,
                        CreateInteractionResponse::Message(convert::interaction_message(&reply)),
                    )
                    .await
            }
            Interaction::Component(component) => {
                let response = match self
                    .bot
                    .on_component(convert::component_interaction(&component))
                    .await
                {
                    Some(reply) => CreateInteractionResponse::Message(convert::interaction_message(&reply)),
                    None => CreateInteractionResponse::Acknowledge,
                };
                component.create_response(&ctx.http, response).await
            }
            _ => Ok(()),
        };

        if let Err(e) = result {
            let error = BotError::Platform(convert::platform_error(e));
            self.bot.on_event_error("interaction_create", &error, None);
        }
    }
}
