//! Invocation context handed to every command handler

use std::sync::Arc;

use crate::application::bot::Bot;
use crate::application::errors::{CommandError, PlatformError};
use crate::domain::entities::{Author, ChannelId, Command, GuildId, Message, MessageId, OutgoingMessage};
use crate::domain::traits::ChatClient;
use crate::utils::help;

use super::Args;

/// Everything known about one command invocation.
#[derive(Clone)]
pub struct Context {
    pub bot: Arc<Bot>,
    pub message: Message,
    /// Prefix the message started with; `None` when it is not a command.
    pub prefix: Option<String>,
    /// The word used to call the command, as typed.
    pub invoked_with: String,
    pub command: Option<Arc<Command>>,
    /// Unparsed text after the resolved command.
    pub rest: String,
    /// Set once the error handler starts trying fallbacks for this message.
    pub invoked_from_error_handler: bool,
}

impl Context {
    pub fn new(bot: Arc<Bot>, message: Message) -> Self {
        Self {
            bot,
            message,
            prefix: None,
            invoked_with: String::new(),
            command: None,
            rest: String::new(),
            invoked_from_error_handler: false,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.prefix.is_some()
    }

    pub fn chat(&self) -> &Arc<dyn ChatClient> {
        self.bot.chat()
    }

    pub fn author(&self) -> &Author {
        &self.message.author
    }

    pub fn author_is_member(&self) -> bool {
        self.message.author.is_member()
    }

    pub fn channel_id(&self) -> ChannelId {
        self.message.channel_id
    }

    pub fn guild_id(&self) -> Option<GuildId> {
        self.message.guild_id
    }

    pub fn prefix_or_default(&self) -> &str {
        self.prefix
            .as_deref()
            .unwrap_or_else(|| self.bot.config().bot.prefix.as_str())
    }

    /// Send a message to the invoking channel. A `delete_after` delay
    /// schedules the deletion in the background.
    pub async fn send(&self, message: OutgoingMessage) -> Result<MessageId, PlatformError> {
        let delete_after = message.delete_after;
        let channel_id = self.channel_id();
        let message_id = self.chat().send_message(channel_id, message).await?;

        if let Some(delay) = delete_after {
            let chat = Arc::clone(self.chat());
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                if let Err(e) = chat.delete_message(channel_id, message_id).await {
                    tracing::debug!("Failed to delete message {}: {}", message_id, e);
                }
            });
        }

        Ok(message_id)
    }

    pub async fn send_text(&self, content: impl Into<String>) -> Result<MessageId, PlatformError> {
        self.send(OutgoingMessage::text(content)).await
    }

    pub async fn typing(&self) -> Result<(), PlatformError> {
        self.chat().trigger_typing(self.channel_id()).await
    }

    /// Run `command` directly with `args`. Checks and hooks are skipped.
    pub async fn invoke(&self, command: Arc<Command>, args: Args) -> Result<(), CommandError> {
        let mut ctx = self.clone();
        ctx.command = Some(Arc::clone(&command));

        match command.handler.clone() {
            Some(handler) => handler(ctx, args).await,
            None => {
                ctx.send_help(&command).await?;
                Ok(())
            }
        }
    }

    pub async fn send_help(&self, command: &Command) -> Result<MessageId, PlatformError> {
        let embed = help::command_embed(self.prefix_or_default(), command);
        self.send(OutgoingMessage::embed(embed)).await
    }
}
