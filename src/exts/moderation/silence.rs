//! Temporarily stop `@everyone` from talking in a channel

use async_trait::async_trait;
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::application::bot::Bot;
use crate::application::errors::{BotError, CheckFailure, CommandError};
use crate::application::messaging::{Args, Context};
use crate::application::services::{Cog, Extension};
use crate::domain::entities::{ChannelId, ChannelKind, ChannelRef, Command, GuildId, RoleId};
use crate::domain::traits::ChatClient;
use crate::utils::checks::HasAnyRole;

const EXTENSION: &str = "exts.moderation.silence";
const DEFAULT_DURATION: u64 = 10;
const MAX_DURATION: u64 = 15;
const CHANNEL_KINDS: [ChannelKind; 2] = [ChannelKind::Text, ChannelKind::Voice];

const OK: &str = "\u{2705}";
const CROSS_MARK: &str = "\u{274c}";

/// What a `silence` invocation resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SilenceRequest {
    /// `None` targets the invoking channel.
    pub channel: Option<ChannelRef>,
    pub minutes: u64,
    pub kick: bool,
}

/// Resolve `[duration_or_channel] [duration] [kick]`. A leading number is
/// the duration; anything else must name a text or voice channel.
pub fn parse_silence_args(
    args: &mut Args,
    find_channel: impl Fn(&str) -> Option<ChannelRef>,
) -> Result<SilenceRequest, CommandError> {
    let mut channel = None;
    let mut minutes = DEFAULT_DURATION;

    if let Some(first) = args.next_raw() {
        match first.parse::<u64>() {
            Ok(value) => minutes = value,
            Err(_) => {
                let found = find_channel(&first)
                    .ok_or_else(|| CommandError::BadArgument(format!("Channel \"{first}\" not found.")))?;
                channel = Some(found);
                minutes = args.optional("duration")?.unwrap_or(DEFAULT_DURATION);
            }
        }
    }

    let kick = args.optional("kick")?.unwrap_or(false);
    args.finish("silence")?;

    if minutes == 0 {
        return Err(CommandError::BadArgument("Duration must be at least 1 minute.".into()));
    }

    Ok(SilenceRequest {
        channel,
        minutes: minutes.min(MAX_DURATION),
        kick,
    })
}

pub struct Silence {
    chat: Arc<dyn ChatClient>,
    moderation_roles: Vec<RoleId>,
    timers: Mutex<HashMap<ChannelId, JoinHandle<()>>>,
}

impl Silence {
    pub fn new(chat: Arc<dyn ChatClient>, moderation_roles: Vec<RoleId>) -> Self {
        Self {
            chat,
            moderation_roles,
            timers: Mutex::new(HashMap::new()),
        }
    }

    fn find_channel(&self, guild_id: GuildId, argument: &str) -> Option<ChannelRef> {
        self.chat
            .guild(guild_id)?
            .find_channel(argument, &CHANNEL_KINDS)
            .cloned()
    }

    fn channel_label(ctx: &Context, channel: ChannelId) -> String {
        if channel == ctx.channel_id() {
            "current channel".to_string()
        } else {
            channel.mention()
        }
    }

    async fn silence(&self, ctx: Context, mut args: Args) -> Result<(), CommandError> {
        let guild_id = ctx.guild_id().ok_or(CheckFailure::NoPrivateMessage)?;
        let request = parse_silence_args(&mut args, |argument| self.find_channel(guild_id, argument))?;

        let channel = match request.channel {
            Some(channel) => channel,
            None => self
                .chat
                .guild(guild_id)
                .and_then(|guild| guild.channel(ctx.channel_id()).cloned())
                .unwrap_or_else(|| ChannelRef::new(ctx.channel_id(), "", ChannelKind::Text)),
        };
        let label = Self::channel_label(&ctx, channel.id);

        if !self.chat.set_send_permission(guild_id, channel.id, false).await? {
            ctx.send_text(format!("{CROSS_MARK} {label} is already silenced.")).await?;
            return Ok(());
        }

        if request.kick && channel.kind == ChannelKind::Voice {
            let moved = self.chat.disconnect_voice_members(guild_id, channel.id).await?;
            tracing::debug!("Disconnected {} member(s) from {}", moved, channel.id);
        }

        self.schedule_unsilence(guild_id, channel.id, Duration::from_secs(request.minutes * 60));
        tracing::info!(
            "{} silenced {} for {} minute(s)",
            ctx.message.author,
            channel.id,
            request.minutes
        );
        ctx.send_text(format!(
            "{OK} silenced {label} for {} minute(s).",
            request.minutes
        ))
        .await?;
        Ok(())
    }

    async fn unsilence(&self, ctx: Context, mut args: Args) -> Result<(), CommandError> {
        let guild_id = ctx.guild_id().ok_or(CheckFailure::NoPrivateMessage)?;
        let channel = match args.next_raw() {
            Some(argument) => {
                self.find_channel(guild_id, &argument)
                    .ok_or_else(|| CommandError::BadArgument(format!("Channel \"{argument}\" not found.")))?
                    .id
            }
            None => ctx.channel_id(),
        };
        args.finish("unsilence")?;

        if let Some(timer) = self.timers.lock().remove(&channel) {
            timer.abort();
        }

        let label = Self::channel_label(&ctx, channel);
        if self.chat.set_send_permission(guild_id, channel, true).await? {
            tracing::info!("{} unsilenced {}", ctx.message.author, channel);
            ctx.send_text(format!("{OK} unsilenced {label}.")).await?;
        } else {
            ctx.send_text(format!("{CROSS_MARK} {label} was not silenced.")).await?;
        }
        Ok(())
    }

    fn schedule_unsilence(&self, guild_id: GuildId, channel_id: ChannelId, after: Duration) {
        let chat = Arc::clone(&self.chat);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            match chat.set_send_permission(guild_id, channel_id, true).await {
                Ok(_) => tracing::info!("Automatically unsilenced {}", channel_id),
                Err(e) => tracing::warn!("Failed to unsilence {}: {}", channel_id, e),
            }
        });

        if let Some(previous) = self.timers.lock().insert(channel_id, timer) {
            previous.abort();
        }
    }

    /// Channels with a pending automatic unsilence.
    pub fn scheduled(&self) -> Vec<ChannelId> {
        self.timers
            .lock()
            .iter()
            .filter(|(_, timer)| !timer.is_finished())
            .map(|(channel, _)| *channel)
            .collect()
    }
}

#[async_trait]
impl Cog for Silence {
    fn qualified_name(&self) -> &'static str {
        "Silence"
    }

    fn extension(&self) -> Option<&'static str> {
        Some(EXTENSION)
    }

    fn commands(self: Arc<Self>) -> Vec<Command> {
        let silence = Arc::clone(&self);
        let unsilence = Arc::clone(&self);

        vec![
            Command::new("silence")
                .with_aliases(["hush"])
                .with_usage("[duration_or_channel] [duration=10] [kick=false]")
                .with_description("Silence a channel for up to 15 minutes.")
                .with_check(HasAnyRole(self.moderation_roles.clone()))
                .with_handler(move |ctx, args| {
                    let cog = Arc::clone(&silence);
                    async move { cog.silence(ctx, args).await }
                }),
            Command::new("unsilence")
                .with_aliases(["unhush"])
                .with_usage("[channel]")
                .with_description("Unsilence a channel.")
                .with_check(HasAnyRole(self.moderation_roles.clone()))
                .with_handler(move |ctx, args| {
                    let cog = Arc::clone(&unsilence);
                    async move { cog.unsilence(ctx, args).await }
                }),
        ]
    }

    async fn cog_unload(&self, _bot: &Arc<Bot>) {
        for (_, timer) in self.timers.lock().drain() {
            timer.abort();
        }
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

pub struct SilenceExtension;

#[async_trait]
impl Extension for SilenceExtension {
    fn name(&self) -> &'static str {
        EXTENSION
    }

    async fn setup(&self, bot: &Arc<Bot>) -> Result<(), BotError> {
        let roles = bot.config().roles.moderation_roles();
        bot.add_cog(Arc::new(Silence::new(Arc::clone(bot.chat()), roles))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lounge(argument: &str) -> Option<ChannelRef> {
        (argument == "lounge").then(|| ChannelRef::new(5u64, "lounge", ChannelKind::Voice))
    }

    #[test]
    fn test_defaults_to_current_channel_for_ten_minutes() {
        let request = parse_silence_args(&mut Args::default(), lounge).unwrap();
        assert_eq!(
            request,
            SilenceRequest {
                channel: None,
                minutes: DEFAULT_DURATION,
                kick: false
            }
        );
    }

    #[test]
    fn test_leading_number_is_duration_and_is_capped() {
        let request = parse_silence_args(&mut Args::new(["4"]), lounge).unwrap();
        assert_eq!(request.minutes, 4);
        assert!(request.channel.is_none());

        let request = parse_silence_args(&mut Args::new(["60"]), lounge).unwrap();
        assert_eq!(request.minutes, MAX_DURATION);
    }

    #[test]
    fn test_channel_then_duration_and_kick() {
        let request = parse_silence_args(&mut Args::new(["lounge", "6", "true"]), lounge).unwrap();
        assert_eq!(request.channel.map(|c| c.id), Some(ChannelId(5)));
        assert_eq!(request.minutes, 6);
        assert!(request.kick);
    }

    #[test]
    fn test_unknown_channel_and_zero_duration_are_rejected() {
        assert!(matches!(
            parse_silence_args(&mut Args::new(["nowhere"]), lounge),
            Err(CommandError::BadArgument(_))
        ));
        assert!(matches!(
            parse_silence_args(&mut Args::new(["0"]), lounge),
            Err(CommandError::BadArgument(_))
        ));
        assert!(matches!(
            parse_silence_args(&mut Args::new(["5", "false", "extra"]), lounge),
            Err(CommandError::TooManyArguments(_))
        ));
    }
}
