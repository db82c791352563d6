//! Central command error handling, including the fallbacks tried when no
//! command matches what the user typed.

use async_trait::async_trait;
use futures::future::BoxFuture;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use crate::application::bot::{Bot, CommandErrorManager};
use crate::application::errors::{BotError, CheckFailure, CommandError};
use crate::application::messaging::{Args, Context};
use crate::application::services::{Cog, Extension};
use crate::domain::entities::{
    colours, AppInteraction, ChannelId, ChannelKind, Command, Embed, InteractionReply, OutgoingMessage,
};
use crate::exts::info::tags::Tags;
use crate::utils::{fuzzy, interactions, messages};

const EXTENSION: &str = "exts.backend.error_handler";
const QUESTION_MARK_ICON: &str = "https://cdn.discordapp.com/emojis/512367613339369475.png";
const SUGGESTION_CUTOFF: f64 = 0.6;
const SUGGESTION_LIFETIME: Duration = Duration::from_secs(10);
const MAX_SHH_DURATION: u64 = 15;

static SHH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^shh+$").expect("valid shh regex"));
static UNSHH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^unshh+$").expect("valid unshh regex"));

/// What a `shh…`/`unshh…` shorthand asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shorthand {
    /// Silence for this many minutes.
    Silence(u64),
    Unsilence,
}

/// Recognise the silence shorthand. Each `h` adds two minutes, up to 15.
pub fn parse_shorthand(invoked_with: &str) -> Option<Shorthand> {
    let invoked = invoked_with.to_lowercase();
    if SHH.is_match(&invoked) {
        let hs = invoked.matches('h').count() as u64;
        Some(Shorthand::Silence((hs * 2).min(MAX_SHH_DURATION)))
    } else if UNSHH.is_match(&invoked) {
        Some(Shorthand::Unsilence)
    } else {
        None
    }
}

/// Handles errors emitted from commands.
#[derive(Debug, Default)]
pub struct ErrorHandler;

impl ErrorHandler {
    pub fn new() -> Self {
        Self
    }

    fn error_embed(title: &str, body: &str) -> Embed {
        Embed::new()
            .title(title)
            .description(body)
            .colour(colours::SOFT_RED)
    }

    /// Emit a single response for `error`, prioritised as follows:
    ///
    /// 1. A name that matches no command tries, in order, the silence
    ///    shorthand, a glued codeblock, a tag and finally a suggestion.
    /// 2. User input errors, check failures, cooldowns and disabled commands
    ///    get their own explanation.
    /// 3. Everything else is reported as unexpected.
    pub fn on_command_error(&self, ctx: Context, error: CommandError) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            let debug_message = format!(
                "Command {} invoked by {} with error {}: {}",
                ctx.command
                    .as_ref()
                    .map(|c| c.qualified_name.as_str())
                    .unwrap_or("None"),
                ctx.message.author,
                error.kind(),
                error
            );

            match error {
                CommandError::Handled => {
                    tracing::trace!("Command error was already handled locally; ignoring.");
                }
                CommandError::NotFound(_) if !ctx.invoked_from_error_handler => {
                    let mut ctx = ctx;
                    ctx.invoked_from_error_handler = true;

                    if let Err(err) = self.try_fallbacks(&ctx).await {
                        tracing::info!("Re-handling error raised by command in error handler");
                        self.on_command_error(ctx, err).await;
                    }
                }
                error if error.is_user_input() => {
                    tracing::debug!("{}", debug_message);
                    self.handle_user_input_error(&ctx, error).await;
                }
                CommandError::Check(failure) => {
                    tracing::debug!("{}", debug_message);
                    Self::handle_check_failure(&ctx, &failure).await;
                }
                error @ (CommandError::OnCooldown { .. } | CommandError::MaxConcurrencyReached { .. }) => {
                    tracing::debug!("{}", debug_message);
                    send_or_log(&ctx, OutgoingMessage::text(error.to_string())).await;
                }
                CommandError::Disabled(_) => {
                    tracing::debug!("{}", debug_message);
                    send_or_log(&ctx, OutgoingMessage::text("This command is currently disabled.")).await;
                }
                CommandError::Invoke(BotError::Platform(platform)) if platform.is_forbidden() => {
                    if !messages::handle_forbidden_from_block(&platform, Some(&ctx.message)) {
                        Self::handle_unexpected_error(&ctx, platform.kind(), &platform.message).await;
                    }
                }
                CommandError::Invoke(inner) => {
                    Self::handle_unexpected_error(&ctx, inner.kind(), &inner.to_string()).await;
                }
                other => {
                    Self::handle_unexpected_error(&ctx, other.kind(), &other.to_string()).await;
                }
            }
        })
    }

    async fn try_fallbacks(&self, ctx: &Context) -> Result<(), CommandError> {
        if self.try_silence(ctx).await? {
            return Ok(());
        }
        if self.try_run_fixed_codeblock(ctx).await? {
            return Ok(());
        }
        if self.try_get_tag(ctx).await? {
            return Ok(());
        }
        self.send_command_suggestion(ctx, &ctx.invoked_with).await
    }

    /// Invoke `silence` or `unsilence` when the name is `shh…`/`unshh…` and
    /// the author may run it.
    async fn try_silence(&self, ctx: &Context) -> Result<bool, CommandError> {
        let Some(silence) = ctx.bot.get_command("silence") else {
            tracing::debug!("Not attempting to parse message as `shh`/`unshh` as could not find `silence` command.");
            return Ok(false);
        };
        let Some(shorthand) = parse_shorthand(&ctx.invoked_with) else {
            return Ok(false);
        };

        if !matches!(ctx.bot.can_run(ctx, &silence).await, Ok(true)) {
            tracing::debug!("Cancelling attempt to invoke silence/unsilence due to failed checks.");
            return Ok(false);
        }

        let content = ctx.message.content.to_lowercase();
        let words: Vec<&str> = content.split(' ').collect();
        let channel = match (words.get(1), ctx.guild_id()) {
            (Some(argument), Some(guild_id)) => ctx.chat().guild(guild_id).and_then(|guild| {
                guild
                    .find_channel(argument, &[ChannelKind::Text, ChannelKind::Voice])
                    .map(|channel| channel.id)
            }),
            _ => None,
        };
        let kick = channel.is_some() && words.get(2).is_some_and(|word| *word == "true");

        match shorthand {
            Shorthand::Silence(duration) => {
                let mut args = Vec::with_capacity(3);
                if let Some(channel) = channel {
                    args.push(channel.mention());
                }
                args.push(duration.to_string());
                if channel.is_some() {
                    args.push(kick.to_string());
                }
                ctx.invoke(silence, Args::new(args)).await?;
            }
            Shorthand::Unsilence => {
                let Some(unsilence) = ctx.bot.get_command("unsilence") else {
                    return Ok(false);
                };
                let args = channel.map(ChannelId::mention).into_iter();
                ctx.invoke(unsilence, Args::new(args)).await?;
            }
        }
        Ok(true)
    }

    /// Re-run the message with a space before its first codeblock, for
    /// commands allowed to take one (e.g. ``!eval```py ...```).
    async fn try_run_fixed_codeblock(&self, ctx: &Context) -> Result<bool, CommandError> {
        let content = &ctx.message.content;
        let Some(index) = content.find("```") else {
            return Ok(false);
        };

        let fixed = format!("{} {}", &content[..index], &content[index..]);
        let mut new_ctx = ctx.bot.get_context(ctx.message.clone().with_content(fixed));
        let Some(command) = new_ctx.command.clone() else {
            return Ok(false);
        };

        let allowed = ctx
            .bot
            .config()
            .bot
            .codeblock_commands
            .iter()
            .filter_map(|name| ctx.bot.get_command(name))
            .any(|allowed| Arc::ptr_eq(&allowed, &command));
        if !allowed {
            return Ok(false);
        }

        tracing::debug!("Running {:?} command with fixed codeblock.", command.qualified_name);
        new_ctx.invoked_from_error_handler = true;
        ctx.bot.invoke(new_ctx).await;
        Ok(true)
    }

    /// Interpret the name as a tag. Returns true when nothing else should be
    /// tried: the tag was sent, or the author may not use tags here.
    async fn try_get_tag(&self, ctx: &Context) -> Result<bool, CommandError> {
        let Some(tags) = ctx.bot.get_cog_as::<Tags>(Tags::NAME) else {
            tracing::debug!("Not attempting to parse message as a tag as could not find `Tags` cog.");
            return Ok(false);
        };

        let maybe_tag_name = ctx.invoked_with.as_str();
        if maybe_tag_name.is_empty() || !ctx.author_is_member() {
            return Ok(true);
        }

        if !matches!(ctx.bot.can_run_global(ctx).await, Ok(true)) {
            tracing::debug!("Cancelling attempt to fall back to a tag due to failed checks.");
            return Ok(true);
        }

        tags.get_command_ctx(ctx, maybe_tag_name).await
    }

    /// Suggest the closest visible command, or say the command is unknown.
    async fn send_command_suggestion(&self, ctx: &Context, command_name: &str) -> Result<(), CommandError> {
        let mut candidates: Vec<String> = Vec::new();
        for command in ctx.bot.walk_commands() {
            if command.hidden {
                continue;
            }
            candidates.push(command.qualified_name.clone());
            let parent = command
                .qualified_name
                .rsplit_once(' ')
                .map(|(parent, _)| format!("{parent} "))
                .unwrap_or_default();
            candidates.extend(command.aliases.iter().map(|alias| format!("{parent}{alias}")));
        }

        let Some(similar_name) =
            fuzzy::close_match(command_name, candidates.iter().map(String::as_str), SUGGESTION_CUTOFF)
        else {
            let prefix = ctx.prefix_or_default();
            let notice = Embed::new()
                .description(format!(
                    "Unknown command `{command_name}`. Use `{prefix}help` to see the available commands."
                ))
                .colour(colours::SOFT_RED);
            ctx.send(OutgoingMessage::embed(notice).delete_after(SUGGESTION_LIFETIME))
                .await?;
            return Ok(());
        };

        let Some(similar_command) = ctx.bot.get_command(similar_name) else {
            return Ok(());
        };

        let log_msg = "Cancelling attempt to suggest a command due to failed checks.";
        match ctx.bot.can_run(ctx, &similar_command).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!("{}", log_msg);
                return Ok(());
            }
            Err(cmd_error) => {
                tracing::debug!("{}", log_msg);
                self.on_command_error(ctx.clone(), cmd_error).await;
                return Ok(());
            }
        }

        let misspelled_content = &ctx.message.content;
        let embed = Embed::new()
            .author("Did you mean:", Some(QUESTION_MARK_ICON))
            .description(misspelled_content.replacen(command_name, similar_name, 1));
        ctx.send(OutgoingMessage::embed(embed).delete_after(SUGGESTION_LIFETIME))
            .await?;
        Ok(())
    }

    async fn handle_user_input_error(&self, ctx: &Context, error: CommandError) {
        let embed = match &error {
            CommandError::MissingRequiredArgument { param } => {
                Self::error_embed("Missing required argument", param)
            }
            CommandError::TooManyArguments(message) => Self::error_embed("Too many arguments", message),
            CommandError::BadArgument(message) => Self::error_embed("Bad argument", message),
            CommandError::BadUnionArgument { errors, .. } => {
                let last = errors.last().map(String::as_str).unwrap_or_default();
                Self::error_embed("Bad argument", &format!("{error}\n{last}"))
            }
            CommandError::ArgumentParsing(message) => {
                let embed = Self::error_embed("Argument parsing error", message);
                send_or_log(ctx, OutgoingMessage::embed(embed)).await;
                return;
            }
            _ => Self::error_embed(
                "Input error",
                "Something about your input seems off. Check the arguments and try again.",
            ),
        };

        Self::send_error_with_help(ctx, embed).await;
    }

    /// Send the error with a help button and a delete button.
    async fn send_error_with_help(ctx: &Context, error_embed: Embed) {
        let mut message = OutgoingMessage::embed(error_embed);
        if let Some(command) = &ctx.command {
            message = message
                .with_button(interactions::help_button(command))
                .with_button(interactions::delete_button(ctx.author().user.id));
        }
        send_or_log(ctx, message).await;
    }

    async fn handle_check_failure(ctx: &Context, failure: &CheckFailure) {
        let text = if failure.is_bot_missing() {
            "Sorry, it looks like I don't have the permissions or roles I need to do that.".to_string()
        } else {
            match failure {
                CheckFailure::NoPrivateMessage | CheckFailure::InWhitelist { .. } => failure.to_string(),
                _ => "Sorry, you don't have permission to do that.".to_string(),
            }
        };
        send_or_log(ctx, OutgoingMessage::text(text)).await;
    }

    async fn handle_unexpected_error(ctx: &Context, kind: &str, message: &str) {
        send_or_log(
            ctx,
            OutgoingMessage::text(format!(
                "Sorry, an unexpected error occurred.\n\n```{kind}: {message}```"
            )),
        )
        .await;

        tracing::error!(
            "Error executing command invoked by {}: {} ({}: {})",
            ctx.message.author,
            ctx.message.content,
            kind,
            message
        );
    }
}

async fn send_or_log(ctx: &Context, message: OutgoingMessage) {
    if let Err(e) = ctx.send(message).await {
        if !messages::handle_forbidden_from_block(&e, Some(&ctx.message)) {
            tracing::warn!("Failed to send error response in {}: {}", ctx.channel_id(), e);
        }
    }
}

#[async_trait]
impl CommandErrorManager for ErrorHandler {
    async fn handle_command_error(&self, ctx: Context, error: CommandError) {
        self.on_command_error(ctx, error).await;
    }

    async fn handle_app_command_error(
        &self,
        interaction: &AppInteraction,
        error: CommandError,
    ) -> InteractionReply {
        let message = if error.is_user_input() {
            OutgoingMessage::embed(Self::error_embed("Bad argument", &error.to_string()))
        } else {
            match &error {
                CommandError::Check(failure) if failure.is_bot_missing() => OutgoingMessage::text(
                    "Sorry, it looks like I don't have the permissions or roles I need to do that.",
                ),
                CommandError::Check(failure) => OutgoingMessage::text(failure.to_string()),
                CommandError::OnCooldown { .. } | CommandError::MaxConcurrencyReached { .. } => {
                    OutgoingMessage::text(error.to_string())
                }
                CommandError::Disabled(_) => OutgoingMessage::text("This command is currently disabled."),
                _ => {
                    tracing::error!(
                        "Error executing /{} invoked by {}: {}",
                        interaction.command_name,
                        interaction.user,
                        error
                    );
                    OutgoingMessage::text(format!(
                        "Sorry, an unexpected error occurred.\n\n```{}: {}```",
                        error.kind(),
                        error
                    ))
                }
            }
        };
        InteractionReply::ephemeral(message)
    }
}

#[async_trait]
impl Cog for ErrorHandler {
    fn qualified_name(&self) -> &'static str {
        "ErrorHandler"
    }

    fn extension(&self) -> Option<&'static str> {
        Some(EXTENSION)
    }

    fn commands(self: Arc<Self>) -> Vec<Command> {
        Vec::new()
    }

    async fn cog_unload(&self, bot: &Arc<Bot>) {
        bot.clear_command_error_manager();
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Adds the `ErrorHandler` cog and makes it the bot's error manager.
pub struct ErrorHandlerExtension;

#[async_trait]
impl Extension for ErrorHandlerExtension {
    fn name(&self) -> &'static str {
        EXTENSION
    }

    async fn setup(&self, bot: &Arc<Bot>) -> Result<(), BotError> {
        let handler = Arc::new(ErrorHandler::new());
        bot.add_cog(handler.clone()).await?;
        bot.register_command_error_manager(handler);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shorthand_duration_is_two_minutes_per_h() {
        assert_eq!(parse_shorthand("shh"), Some(Shorthand::Silence(4)));
        assert_eq!(parse_shorthand("SHHHH"), Some(Shorthand::Silence(8)));
        assert_eq!(parse_shorthand("shhhhhhhhhh"), Some(Shorthand::Silence(15)));
        assert_eq!(parse_shorthand("unshhh"), Some(Shorthand::Unsilence));
    }

    #[test]
    fn test_shorthand_requires_exact_shape() {
        assert_eq!(parse_shorthand("sh"), None);
        assert_eq!(parse_shorthand("shhx"), None);
        assert_eq!(parse_shorthand("unsh"), None);
        assert_eq!(parse_shorthand("hush"), None);
    }
}
