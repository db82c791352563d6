//! Recording doubles for the platform, the tag service and the network
//! resources, plus a bot harness built on top of them.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;

use pb_discord::application::bot::{Bot, NetResources};
use pb_discord::application::errors::{BotError, PlatformError};
use pb_discord::application::services::{Cog, Extension};
use pb_discord::domain::entities::{
    Author, ChannelId, ChannelKind, ChannelRef, Command, GuildId, GuildSnapshot, Message,
    MessageId, OutgoingMessage, User, UserId,
};
use pb_discord::domain::traits::{AppCommandSpec, ChatClient, NetResource, SyncScope, Tag, TagStore};
use pb_discord::exts;
use pb_discord::infrastructure::config::Config;

pub const PRIVATE_GUILD: u64 = 100_000_000_000_000_001;
pub const PUBLIC_GUILD: u64 = 100_000_000_000_000_002;
pub const GENERAL: u64 = 700_000_000_000_000_001;
pub const LOUNGE: u64 = 700_000_000_000_000_002;
pub const MEMBER: u64 = 400_000_000_000_000_001;
pub const BOT_USER: u64 = 400_000_000_000_000_999;

static INIT: Once = Once::new();

pub fn ensure_init() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("pb_discord=debug")
            .with_test_writer()
            .try_init();
    });
}

/// Shared, ordered record of side effects across the doubles.
pub type EventLog = Arc<Mutex<Vec<String>>>;

pub struct RecordingChat {
    log: EventLog,
    guilds: Mutex<HashMap<GuildId, GuildSnapshot>>,
    pub sent: Mutex<Vec<(ChannelId, OutgoingMessage)>>,
    pub deleted: Mutex<Vec<(ChannelId, MessageId)>>,
    pub silenced: Mutex<HashSet<ChannelId>>,
    pub disconnected: Mutex<Vec<ChannelId>>,
    pub synced: Mutex<Vec<(SyncScope, Vec<String>)>>,
    next_id: AtomicU64,
}

impl RecordingChat {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            guilds: Mutex::new(HashMap::new()),
            sent: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
            silenced: Mutex::new(HashSet::new()),
            disconnected: Mutex::new(Vec::new()),
            synced: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(900_000_000_000_000_000),
        }
    }

    pub fn add_guild(&self, guild: GuildSnapshot) {
        self.guilds.lock().insert(guild.id, guild);
    }

    /// Everything readable in each sent message, one string per message.
    pub fn texts(&self) -> Vec<String> {
        self.sent.lock().iter().map(|(_, message)| rendered(message)).collect()
    }

    pub fn last_sent(&self) -> Option<OutgoingMessage> {
        self.sent.lock().last().map(|(_, message)| message.clone())
    }

    pub fn sync_scopes(&self) -> Vec<SyncScope> {
        self.synced.lock().iter().map(|(scope, _)| *scope).collect()
    }
}

#[async_trait]
impl ChatClient for RecordingChat {
    fn current_user_id(&self) -> Option<UserId> {
        Some(UserId(BOT_USER))
    }

    fn guild(&self, guild_id: GuildId) -> Option<GuildSnapshot> {
        self.guilds.lock().get(&guild_id).cloned()
    }

    async fn send_message(
        &self,
        channel_id: ChannelId,
        message: OutgoingMessage,
    ) -> Result<MessageId, PlatformError> {
        self.sent.lock().push((channel_id, message));
        Ok(MessageId(self.next_id.fetch_add(1, Ordering::SeqCst)))
    }

    async fn delete_message(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
    ) -> Result<(), PlatformError> {
        self.deleted.lock().push((channel_id, message_id));
        Ok(())
    }

    async fn trigger_typing(&self, _channel_id: ChannelId) -> Result<(), PlatformError> {
        Ok(())
    }

    async fn set_send_permission(
        &self,
        _guild_id: GuildId,
        channel_id: ChannelId,
        allow: bool,
    ) -> Result<bool, PlatformError> {
        let mut silenced = self.silenced.lock();
        Ok(if allow {
            silenced.remove(&channel_id)
        } else {
            silenced.insert(channel_id)
        })
    }

    async fn disconnect_voice_members(
        &self,
        _guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<usize, PlatformError> {
        self.disconnected.lock().push(channel_id);
        Ok(2)
    }

    async fn sync_app_commands(
        &self,
        scope: SyncScope,
        commands: Vec<AppCommandSpec>,
    ) -> Result<usize, PlatformError> {
        let count = commands.len();
        let names = commands.into_iter().map(|command| command.name).collect();
        self.synced.lock().push((scope, names));
        Ok(count)
    }

    async fn close(&self) {
        self.log.lock().push("chat".to_string());
    }
}

#[derive(Default)]
pub struct MockTags {
    tags: HashMap<String, Tag>,
}

impl MockTags {
    pub fn with_tag(mut self, name: &str, title: Option<&str>, body: &str) -> Self {
        self.tags.insert(
            name.to_string(),
            Tag {
                name: name.to_string(),
                title: title.map(str::to_string),
                body: body.to_string(),
            },
        );
        self
    }
}

#[async_trait]
impl TagStore for MockTags {
    async fn get_tag(&self, name: &str) -> Result<Option<Tag>, BotError> {
        Ok(self.tags.get(name).cloned())
    }

    async fn list_tags(&self) -> Result<Vec<String>, BotError> {
        Ok(self.tags.keys().cloned().collect())
    }
}

pub struct MockNet {
    name: &'static str,
    log: EventLog,
}

impl MockNet {
    pub fn new(name: &'static str, log: EventLog) -> Arc<Self> {
        Arc::new(Self { name, log })
    }
}

#[async_trait]
impl NetResource for MockNet {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn close(&self) {
        self.log.lock().push(self.name.to_string());
    }
}

/// A command-less cog that records its unload in the event log.
pub struct LoggingCog {
    log: EventLog,
    load_delay: Duration,
}

impl LoggingCog {
    pub fn new(log: EventLog) -> Arc<Self> {
        Self::slow(log, Duration::ZERO)
    }

    /// A cog whose `cog_load` takes `load_delay` to finish.
    pub fn slow(log: EventLog, load_delay: Duration) -> Arc<Self> {
        Arc::new(Self { log, load_delay })
    }
}

#[async_trait]
impl Cog for LoggingCog {
    fn qualified_name(&self) -> &'static str {
        "Logger"
    }

    fn commands(self: Arc<Self>) -> Vec<Command> {
        Vec::new()
    }

    async fn cog_load(&self, _bot: &Arc<Bot>) -> Result<(), BotError> {
        if !self.load_delay.is_zero() {
            tokio::time::sleep(self.load_delay).await;
        }
        Ok(())
    }

    async fn cog_unload(&self, _bot: &Arc<Bot>) {
        self.log.lock().push("cog".to_string());
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

pub fn populated_guild(id: u64) -> GuildSnapshot {
    let mut guild = GuildSnapshot::new(id, format!("guild-{id}"));
    guild.role_count = 4;
    guild.member_count = 12;
    guild.channels = vec![
        ChannelRef::new(GENERAL, "general", ChannelKind::Text),
        ChannelRef::new(LOUNGE, "lounge", ChannelKind::Voice),
    ];
    guild
}

pub fn test_config(same_guild: bool) -> Config {
    let mut config = Config::default();
    config.bot.token = "test-token".to_string();
    config.guild.id = GuildId(PRIVATE_GUILD);
    config.guild.public = GuildId(if same_guild { PRIVATE_GUILD } else { PUBLIC_GUILD });
    config
}

pub struct Harness {
    pub bot: Arc<Bot>,
    pub chat: Arc<RecordingChat>,
    pub log: EventLog,
}

pub fn harness_with(config: Config) -> Harness {
    ensure_init();
    let log = EventLog::default();
    let chat = Arc::new(RecordingChat::new(Arc::clone(&log)));
    chat.add_guild(populated_guild(config.guild.id.get()));
    chat.add_guild(populated_guild(config.guild.public.get()));

    let tags = Arc::new(
        MockTags::default()
            .with_tag("faq", Some("Frequently asked questions"), "Read the FAQ first.")
            .with_tag("ask", None, "Just ask your question."),
    );
    let net = NetResources {
        http_session: MockNet::new("http_session", Arc::clone(&log)),
        connector: MockNet::new("connector", Arc::clone(&log)),
        resolver: MockNet::new("resolver", Arc::clone(&log)),
    };

    let bot = Bot::builder(Arc::new(config), chat.clone(), tags, net)
        .with_extensions(exts::catalog())
        .build();
    Harness { bot, chat, log }
}

pub fn harness() -> Harness {
    harness_with(test_config(false))
}

/// A harness with every extension of the catalog loaded directly.
pub async fn loaded_harness() -> Harness {
    let harness = harness();
    for extension in exts::catalog() {
        harness
            .bot
            .load_extension(extension.name())
            .await
            .expect("extension loads");
    }
    harness
}

static NEXT_MESSAGE: AtomicU64 = AtomicU64::new(800_000_000_000_000_000);

pub fn message_from(author: Author, content: &str) -> Message {
    Message::new(NEXT_MESSAGE.fetch_add(1, Ordering::SeqCst), GENERAL, author, content)
        .in_guild(PRIVATE_GUILD)
}

pub fn member_message(content: &str) -> Message {
    message_from(Author::member(User::new(MEMBER, "member"), vec![]), content)
}

pub fn moderator_message(content: &str) -> Message {
    let roles = Config::default().roles.moderation_roles();
    message_from(Author::member(User::new(MEMBER, "moderator"), roles), content)
}

pub fn rendered(message: &OutgoingMessage) -> String {
    let mut parts: Vec<&str> = Vec::new();
    if let Some(content) = &message.content {
        parts.push(content);
    }
    if let Some(embed) = &message.embed {
        parts.extend(
            [&embed.author_name, &embed.title, &embed.description]
                .into_iter()
                .flatten()
                .map(String::as_str),
        );
    }
    parts.join("\n")
}

/// Poll `condition` until it holds, failing the test after two seconds.
pub async fn eventually<F>(mut condition: F)
where
    F: FnMut() -> bool,
{
    let waited = tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "condition was not met in time");
}

pub async fn within<T>(future: impl Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(2), future)
        .await
        .expect("finished in time")
}
