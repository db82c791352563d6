//! Bot session - Owns the registries, extension state and network resources

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::application::errors::{BotError, CheckFailure, CommandError, ExtensionError, RegistrationError};
use crate::application::messaging::{Args, Context, MessageParser};
use crate::application::services::{
    walk_extensions, AppCommandScope, AppCommandTree, Availability, Cog, CommandService,
    Extension, GuildAvailability, GuildKey, LoadState,
};
use crate::domain::entities::{
    AppInteraction, Check, Command, ComponentInteraction, GuildId, GuildSnapshot,
    InteractionReply, Message, OutgoingMessage,
};
use crate::domain::traits::{ChatClient, NetResource, SyncScope, TagStore};
use crate::infrastructure::config::Config;
use crate::utils::{interactions, messages};

/// Network resources closed after the chat connection, in field order.
pub struct NetResources {
    pub http_session: Arc<dyn NetResource>,
    pub connector: Arc<dyn NetResource>,
    pub resolver: Arc<dyn NetResource>,
}

/// Receives every command error the bot does not handle itself.
#[async_trait]
pub trait CommandErrorManager: Send + Sync {
    async fn handle_command_error(&self, ctx: Context, error: CommandError);

    /// Build the reply for a failed application command.
    async fn handle_app_command_error(
        &self,
        interaction: &AppInteraction,
        error: CommandError,
    ) -> InteractionReply;
}

struct LoadedCog {
    cog: Arc<dyn Cog>,
    commands: Vec<String>,
    app_commands: Vec<String>,
}

pub struct Bot {
    config: Arc<Config>,
    chat: Arc<dyn ChatClient>,
    tags: Arc<dyn TagStore>,
    net: NetResources,
    parser: MessageParser,
    gate: Arc<GuildAvailability>,
    catalog: Vec<Arc<dyn Extension>>,
    all_extensions: RwLock<Option<BTreeSet<String>>>,
    extensions: RwLock<BTreeSet<String>>,
    commands: RwLock<CommandService>,
    cogs: RwLock<Vec<LoadedCog>>,
    tree: RwLock<AppCommandTree>,
    error_manager: RwLock<Option<Arc<dyn CommandErrorManager>>>,
    global_checks: RwLock<Vec<Arc<dyn Check>>>,
    load_state: watch::Sender<LoadState>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    closed: AtomicBool,
}

pub struct BotBuilder {
    config: Arc<Config>,
    chat: Arc<dyn ChatClient>,
    tags: Arc<dyn TagStore>,
    net: NetResources,
    catalog: Vec<Arc<dyn Extension>>,
}

impl BotBuilder {
    pub fn new(
        config: Arc<Config>,
        chat: Arc<dyn ChatClient>,
        tags: Arc<dyn TagStore>,
        net: NetResources,
    ) -> Self {
        Self {
            config,
            chat,
            tags,
            net,
            catalog: Vec::new(),
        }
    }

    pub fn with_extensions(mut self, catalog: Vec<Arc<dyn Extension>>) -> Self {
        self.catalog.extend(catalog);
        self
    }

    pub fn with_extension(mut self, extension: impl Extension + 'static) -> Self {
        self.catalog.push(Arc::new(extension));
        self
    }

    pub fn build(self) -> Arc<Bot> {
        let (load_state, _) = watch::channel(LoadState::Idle);
        let gate = GuildAvailability::new(self.config.guild.id, self.config.guild.public);

        Arc::new(Bot {
            parser: MessageParser::new(self.config.bot.prefix.clone()),
            gate: Arc::new(gate),
            config: self.config,
            chat: self.chat,
            tags: self.tags,
            net: self.net,
            catalog: self.catalog,
            all_extensions: RwLock::new(None),
            extensions: RwLock::new(BTreeSet::new()),
            commands: RwLock::new(CommandService::new()),
            cogs: RwLock::new(Vec::new()),
            tree: RwLock::new(AppCommandTree::new()),
            error_manager: RwLock::new(None),
            global_checks: RwLock::new(Vec::new()),
            load_state,
            tasks: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        })
    }
}

impl Bot {
    pub fn builder(
        config: Arc<Config>,
        chat: Arc<dyn ChatClient>,
        tags: Arc<dyn TagStore>,
        net: NetResources,
    ) -> BotBuilder {
        BotBuilder::new(config, chat, tags, net)
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn chat(&self) -> &Arc<dyn ChatClient> {
        &self.chat
    }

    pub fn tags(&self) -> &Arc<dyn TagStore> {
        &self.tags
    }

    pub fn gate(&self) -> &Arc<GuildAvailability> {
        &self.gate
    }

    pub fn guild_id(&self) -> GuildId {
        self.config.guild.id
    }

    pub fn public_guild_id(&self) -> GuildId {
        self.config.guild.public
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Start-up work that needs the session to exist: kicks off extension
    /// loading for the `exts` namespace.
    pub fn setup_hook(self: &Arc<Self>) {
        tracing::info!("Running setup hook with {} known extensions", self.catalog.len());
        self.load_extensions("exts", true);
    }

    pub fn on_guild_available(&self, guild: &GuildSnapshot) -> Availability {
        self.gate.on_guild_available(guild)
    }

    pub fn on_guild_unavailable(&self, guild_id: GuildId) {
        self.gate.on_guild_unavailable(guild_id);
    }

    pub fn is_guild_available(&self, key: GuildKey) -> bool {
        self.gate.is_available(key)
    }

    pub async fn wait_until_guild_available(&self, key: Option<GuildKey>) {
        self.gate.wait(key).await;
    }

    /// Load every extension under `namespace` once both guilds are available,
    /// then optionally sync application commands. Both run in the background.
    pub fn load_extensions(self: &Arc<Self>, namespace: &str, sync_app_commands: bool) {
        if self.is_closed() {
            tracing::warn!("Not loading extensions: the bot is closed");
            return;
        }
        self.load_state.send_replace(LoadState::Loading);

        let mut tasks = Vec::with_capacity(2);
        let bot = Arc::clone(self);
        let namespace = namespace.to_string();
        tasks.push(tokio::spawn(async move {
            bot.load_all_extensions(&namespace).await;
        }));

        if sync_app_commands {
            let bot = Arc::clone(self);
            tasks.push(tokio::spawn(async move {
                bot.wait_until_extensions_loaded().await;
                if bot.load_state() != LoadState::Loaded {
                    return;
                }
                if let Err(e) = bot.sync_app_commands().await {
                    tracing::error!("Failed to sync application commands: {}", e);
                }
            }));
        }

        self.tasks.lock().extend(tasks);
    }

    async fn load_all_extensions(self: &Arc<Self>, namespace: &str) {
        tracing::info!(
            "Waiting for guilds {} and {} to be available before loading extensions.",
            self.guild_id(),
            self.public_guild_id()
        );
        self.wait_until_guild_available(None).await;

        tracing::info!("Loading extensions...");
        let names = walk_extensions(&self.catalog, namespace);
        *self.all_extensions.write() = Some(names.clone());

        let loads = names.iter().map(|name| async move {
            let result = self.load_extension(name).await;
            (name, result)
        });
        for (name, result) in futures::future::join_all(loads).await {
            if let Err(e) = result {
                tracing::error!("Failed to load extension {}: {}", name, e);
            }
        }

        self.load_state.send_if_modified(|state| {
            let finished = *state == LoadState::Loading;
            if finished {
                *state = LoadState::Loaded;
            }
            finished
        });
        tracing::info!("Finished loading {} extensions", names.len());
    }

    pub fn load_state(&self) -> LoadState {
        *self.load_state.borrow()
    }

    /// Returns at once unless extension loading is in progress.
    pub async fn wait_until_extensions_loaded(&self) {
        let mut rx = self.load_state.subscribe();
        let _ = rx.wait_for(|state| *state != LoadState::Loading).await;
    }

    /// Extensions discovered by the last `load_extensions` run.
    pub fn all_extensions(&self) -> Option<BTreeSet<String>> {
        self.all_extensions.read().clone()
    }

    pub fn extensions(&self) -> BTreeSet<String> {
        self.extensions.read().clone()
    }

    pub async fn load_extension(self: &Arc<Self>, name: &str) -> Result<(), ExtensionError> {
        let extension = self
            .catalog
            .iter()
            .find(|ext| ext.name() == name)
            .cloned()
            .ok_or_else(|| ExtensionError::NotFound(name.to_string()))?;

        if !self.extensions.write().insert(name.to_string()) {
            return Err(ExtensionError::AlreadyLoaded(name.to_string()));
        }

        if let Err(e) = extension.setup(self).await {
            self.remove_extension_cogs(name).await;
            self.extensions.write().remove(name);
            return Err(ExtensionError::SetupFailed {
                name: name.to_string(),
                reason: e.to_string(),
            });
        }

        tracing::debug!("Extension loaded: {}", name);
        Ok(())
    }

    pub async fn unload_extension(self: &Arc<Self>, name: &str) -> Result<(), ExtensionError> {
        if !self.extensions.read().contains(name) {
            return Err(ExtensionError::NotLoaded(name.to_string()));
        }

        self.remove_extension_cogs(name).await;
        self.extensions.write().remove(name);
        tracing::debug!("Extension unloaded: {}", name);
        Ok(())
    }

    async fn remove_extension_cogs(self: &Arc<Self>, extension: &str) {
        let owned: Vec<&'static str> = self
            .cogs
            .read()
            .iter()
            .filter(|loaded| loaded.cog.extension() == Some(extension))
            .map(|loaded| loaded.cog.qualified_name())
            .collect();

        for cog in owned {
            self.remove_cog(cog).await;
        }
    }

    pub async fn add_cog(self: &Arc<Self>, cog: Arc<dyn Cog>) -> Result<(), BotError> {
        let name = cog.qualified_name();
        if self.get_cog(name).is_some() {
            return Err(BotError::Internal(format!("Cog named {name:?} already loaded")));
        }

        cog.cog_load(self).await?;

        let commands = match self.register_cog_commands(&cog) {
            Ok(commands) => commands,
            Err(e) => {
                cog.cog_unload(self).await;
                return Err(e.into());
            }
        };
        let app_commands = match self.register_cog_app_commands(&cog) {
            Ok(app_commands) => app_commands,
            Err(e) => {
                self.unregister_commands(&commands);
                cog.cog_unload(self).await;
                return Err(e.into());
            }
        };

        // Another load of the same name may have finished while `cog_load` ran.
        let duplicate = {
            let mut cogs = self.cogs.write();
            let taken = cogs.iter().any(|loaded| loaded.cog.qualified_name() == name);
            if !taken {
                cogs.push(LoadedCog {
                    cog: Arc::clone(&cog),
                    commands: commands.clone(),
                    app_commands: app_commands.clone(),
                });
            }
            taken
        };
        if duplicate {
            self.unregister_commands(&commands);
            self.unregister_app_commands(&app_commands);
            cog.cog_unload(self).await;
            return Err(BotError::Internal(format!("Cog named {name:?} already loaded")));
        }

        tracing::info!("Cog loaded: {}", name);
        Ok(())
    }

    /// Register every command of `cog`, removing the ones already added when
    /// one of them fails.
    fn register_cog_commands(&self, cog: &Arc<dyn Cog>) -> Result<Vec<String>, RegistrationError> {
        let mut registry = self.commands.write();
        let mut added: Vec<String> = Vec::new();

        for command in Arc::clone(cog).commands() {
            let command = Arc::new(command);
            let name = command.name.clone();
            if let Err(e) = registry.add_command(Arc::clone(&command)) {
                if registry.get(&name).is_some_and(|c| Arc::ptr_eq(&c, &command)) {
                    registry.remove_command(&name);
                }
                for name in &added {
                    registry.remove_command(name);
                }
                return Err(e);
            }
            added.push(name);
        }
        Ok(added)
    }

    fn register_cog_app_commands(&self, cog: &Arc<dyn Cog>) -> Result<Vec<String>, RegistrationError> {
        let mut tree = self.tree.write();
        let mut added: Vec<String> = Vec::new();

        for command in Arc::clone(cog).app_commands() {
            let name = command.name.clone();
            if let Err(e) = tree.add_command(command) {
                for name in &added {
                    tree.remove_command(name);
                }
                return Err(e);
            }
            added.push(name);
        }
        Ok(added)
    }

    fn unregister_commands(&self, names: &[String]) {
        let mut registry = self.commands.write();
        for name in names {
            registry.remove_command(name);
        }
    }

    fn unregister_app_commands(&self, names: &[String]) {
        let mut tree = self.tree.write();
        for name in names {
            tree.remove_command(name);
        }
    }

    pub async fn remove_cog(self: &Arc<Self>, name: &str) -> Option<Arc<dyn Cog>> {
        let loaded = {
            let mut cogs = self.cogs.write();
            let index = cogs.iter().position(|c| c.cog.qualified_name() == name)?;
            cogs.remove(index)
        };

        self.unregister_commands(&loaded.commands);
        self.unregister_app_commands(&loaded.app_commands);

        loaded.cog.cog_unload(self).await;
        tracing::info!("Cog unloaded: {}", name);
        Some(loaded.cog)
    }

    pub fn get_cog(&self, name: &str) -> Option<Arc<dyn Cog>> {
        self.cogs
            .read()
            .iter()
            .find(|c| c.cog.qualified_name() == name)
            .map(|c| Arc::clone(&c.cog))
    }

    /// Look a cog up by name and downcast it to its concrete type.
    pub fn get_cog_as<T: Cog>(&self, name: &str) -> Option<Arc<T>> {
        self.get_cog(name)?.as_any().downcast::<T>().ok()
    }

    pub fn cog_names(&self) -> Vec<&'static str> {
        self.cogs.read().iter().map(|c| c.cog.qualified_name()).collect()
    }

    pub fn add_command(&self, command: Command) -> Result<Arc<Command>, RegistrationError> {
        let command = Arc::new(command);
        self.commands.write().add_command(Arc::clone(&command))?;
        Ok(command)
    }

    pub fn remove_command(&self, name: &str) -> Option<Arc<Command>> {
        self.commands.write().remove_command(name)
    }

    /// Resolve a qualified name such as `"tags get"`.
    pub fn get_command(&self, qualified: &str) -> Option<Arc<Command>> {
        self.commands.read().get_command(qualified)
    }

    pub fn commands(&self) -> Vec<Arc<Command>> {
        self.commands.read().commands()
    }

    pub fn walk_commands(&self) -> Vec<Arc<Command>> {
        self.commands.read().walk_commands()
    }

    pub fn add_check(&self, check: impl Check + 'static) {
        self.global_checks.write().push(Arc::new(check));
    }

    pub fn app_command_count(&self) -> usize {
        self.tree.read().len()
    }

    /// Entry point for incoming messages. Waits for extension loading first.
    pub async fn process_commands(self: &Arc<Self>, message: Message) {
        if message.author.user.is_bot || self.is_closed() {
            return;
        }

        self.wait_until_extensions_loaded().await;
        if self.is_closed() {
            return;
        }
        let ctx = self.get_context(message);
        self.invoke(ctx).await;
    }

    /// Parse `message` into a context, descending into subcommands for as
    /// long as the next word names one.
    pub fn get_context(self: &Arc<Self>, message: Message) -> Context {
        let mut ctx = Context::new(Arc::clone(self), message);
        let Some(parsed) = self
            .parser
            .parse(&ctx.message.content, self.chat.current_user_id())
        else {
            return ctx;
        };

        let mut rest = parsed.rest;
        let mut command = self.commands.read().get(&parsed.invoked_with);
        while let Some(group) = command.clone() {
            let Some((word, remainder)) = MessageParser::split_word(&rest) else {
                break;
            };
            let Some(sub) = group.subcommand(word) else {
                break;
            };
            command = Some(Arc::clone(sub));
            rest = remainder.to_string();
        }

        ctx.prefix = Some(parsed.prefix);
        ctx.invoked_with = parsed.invoked_with;
        ctx.command = command;
        ctx.rest = rest;
        ctx
    }

    /// Global checks only.
    pub async fn can_run_global(&self, ctx: &Context) -> Result<bool, CommandError> {
        let checks: Vec<Arc<dyn Check>> = self.global_checks.read().clone();
        for check in checks {
            if !check.check(ctx).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Global checks, then those of every enclosing group, then the
    /// command's own.
    pub async fn can_run(&self, ctx: &Context, command: &Command) -> Result<bool, CommandError> {
        if !self.can_run_global(ctx).await? {
            return Ok(false);
        }

        let mut checks: Vec<Arc<dyn Check>> = self
            .commands
            .read()
            .ancestors(command)
            .iter()
            .flat_map(|group| group.checks.iter().cloned())
            .collect();
        checks.extend(command.checks.iter().cloned());

        for check in checks {
            if !check.check(ctx).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Run the resolved command, returning any error instead of reporting it.
    pub async fn invoke_raw(&self, ctx: &Context) -> Result<(), CommandError> {
        let command = ctx
            .command
            .clone()
            .ok_or_else(|| CommandError::NotFound(ctx.invoked_with.clone()))?;

        if !command.enabled {
            return Err(CommandError::Disabled(command.qualified_name.clone()));
        }
        if !self.can_run(ctx, &command).await? {
            return Err(CheckFailure::Failed.into());
        }

        let args = Args::parse(&ctx.rest)?;
        for hook in &command.before_invoke {
            if !hook.check(ctx).await? {
                return Err(CheckFailure::Failed.into());
            }
        }

        tracing::debug!(
            "{} invoked {} in channel {}",
            ctx.message.author,
            command.qualified_name,
            ctx.channel_id()
        );
        ctx.invoke(command, args).await
    }

    /// Run the resolved command and report failures to the error manager.
    pub async fn invoke(&self, ctx: Context) {
        if !ctx.is_valid() || (ctx.command.is_none() && ctx.invoked_with.is_empty()) {
            return;
        }

        if let Err(error) = self.invoke_raw(&ctx).await {
            self.on_command_error(ctx, error).await;
        }
    }

    pub fn register_command_error_manager(&self, manager: Arc<dyn CommandErrorManager>) {
        *self.error_manager.write() = Some(manager);
    }

    pub fn clear_command_error_manager(&self) {
        *self.error_manager.write() = None;
    }

    pub async fn on_command_error(&self, ctx: Context, error: CommandError) {
        let manager = self.error_manager.read().clone();
        match manager {
            Some(manager) => manager.handle_command_error(ctx, error).await,
            None => tracing::warn!(
                "Command error manager hasn't been registered; dropping {}: {}",
                error.kind(),
                error
            ),
        }
    }

    /// Log an error raised while handling a gateway event.
    pub fn on_event_error(&self, event: &str, error: &BotError, message: Option<&Message>) {
        if let Some(platform) = error.platform() {
            if messages::handle_forbidden_from_block(platform, message) {
                return;
            }
        }
        tracing::error!("Unhandled exception in {}: {}", event, error);
    }

    pub async fn handle_app_command(self: &Arc<Self>, interaction: AppInteraction) -> InteractionReply {
        let handler = self
            .tree
            .read()
            .get(&interaction.command_name)
            .map(|command| command.handler.clone());

        let Some(handler) = handler else {
            tracing::warn!("Received unknown application command {}", interaction.command_name);
            return InteractionReply::ephemeral(OutgoingMessage::text("Unknown command."));
        };

        match handler(Arc::clone(self), interaction.clone()).await {
            Ok(reply) => reply,
            Err(error) => {
                let manager = self.error_manager.read().clone();
                match manager {
                    Some(manager) => manager.handle_app_command_error(&interaction, error).await,
                    None => {
                        tracing::warn!("Command error manager hasn't been loaded in the command tree.");
                        tracing::error!("Application command /{} failed: {}", interaction.command_name, error);
                        InteractionReply::ephemeral(OutgoingMessage::text(
                            "Sorry, an unexpected error occurred.",
                        ))
                    }
                }
            }
        }
    }

    /// Handle a button press. `None` means the press is acknowledged without a reply.
    pub async fn on_component(self: &Arc<Self>, interaction: ComponentInteraction) -> Option<InteractionReply> {
        match interactions::handle_component(self, &interaction).await {
            Ok(reply) => reply,
            Err(e) => {
                self.on_event_error("on_component", &BotError::Platform(e), None);
                None
            }
        }
    }

    /// Sync application commands globally, then for the public guild, then
    /// for the private guild.
    pub async fn sync_app_commands(&self) -> Result<(), BotError> {
        let (global, public, private) = {
            let tree = self.tree.read();
            (
                tree.specs(AppCommandScope::Global),
                tree.specs(AppCommandScope::Public),
                tree.specs(AppCommandScope::Private),
            )
        };

        let synced = self.chat.sync_app_commands(SyncScope::Global, global).await?;
        tracing::info!("Synced {} global application commands", synced);

        if self.public_guild_id() == self.guild_id() {
            let mut combined = public;
            combined.extend(private);
            let synced = self
                .chat
                .sync_app_commands(SyncScope::Guild(self.guild_id()), combined)
                .await?;
            tracing::info!("Synced {} guild application commands", synced);
            return Ok(());
        }

        let synced = self
            .chat
            .sync_app_commands(SyncScope::Guild(self.public_guild_id()), public)
            .await?;
        tracing::info!("Synced {} public guild application commands", synced);

        let synced = self
            .chat
            .sync_app_commands(SyncScope::Guild(self.guild_id()), private)
            .await?;
        tracing::info!("Synced {} private guild application commands", synced);
        Ok(())
    }

    /// Unload extensions and cogs, then close the chat connection, the HTTP
    /// session, the connector and the resolver. Later calls do nothing.
    pub async fn close(self: &Arc<Self>) {
        if self.closed.swap(true, Ordering::SeqCst) {
            tracing::debug!("Bot already closed");
            return;
        }
        tracing::info!("Closing bot");

        let tasks: Vec<JoinHandle<()>> = self.tasks.lock().drain(..).collect();
        for task in tasks {
            task.abort();
        }
        // Release anyone still waiting on an aborted load.
        self.load_state.send_replace(LoadState::Closed);

        let loaded: Vec<String> = self.extensions.read().iter().cloned().collect();
        for extension in loaded {
            if let Err(e) = self.unload_extension(&extension).await {
                tracing::warn!("Failed to unload extension {}: {}", extension, e);
            }
        }

        for cog in self.cog_names() {
            self.remove_cog(cog).await;
        }

        self.chat.close().await;

        for resource in [&self.net.http_session, &self.net.connector, &self.net.resolver] {
            resource.close().await;
            tracing::debug!("Closed {}", resource.name());
        }
        tracing::info!("Bot closed");
    }

    /// A closed bot cannot be reset; build a new one instead.
    pub fn clear(&self) -> Result<(), BotError> {
        Err(BotError::Closed)
    }
}
