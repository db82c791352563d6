//! Application layer errors

use std::time::Duration;
use thiserror::Error;

use crate::domain::entities::ChannelId;

/// Discord error code returned when the target user has blocked the bot.
pub const BLOCKED_BY_USER: i64 = 90001;

/// Error reported by the chat platform.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct PlatformError {
    pub status: Option<u16>,
    pub code: Option<i64>,
    pub message: String,
}

impl PlatformError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            code: None,
            message: message.into(),
        }
    }

    pub fn http(status: u16, code: Option<i64>, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            code,
            message: message.into(),
        }
    }

    pub fn is_forbidden(&self) -> bool {
        self.status == Some(403)
    }

    pub fn is_blocked_by_user(&self) -> bool {
        self.is_forbidden() && self.code == Some(BLOCKED_BY_USER)
    }

    pub fn kind(&self) -> &'static str {
        if self.is_forbidden() {
            "Forbidden"
        } else {
            "HTTPException"
        }
    }
}

/// General bot errors
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Discord error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Extension error: {0}")]
    Extension(#[from] ExtensionError),

    #[error("Registration error: {0}")]
    Registration(#[from] RegistrationError),

    #[error("Startup error: {0}")]
    Startup(String),

    #[error("Re-using a Bot object after closing it is not supported")]
    Closed,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BotError {
    /// Short category name, shown to users for unexpected errors.
    pub fn kind(&self) -> &'static str {
        match self {
            BotError::Config(_) => "ConfigError",
            BotError::Network(_) => "NetworkError",
            BotError::Platform(e) => e.kind(),
            BotError::Extension(_) => "ExtensionError",
            BotError::Registration(_) => "CommandRegistrationError",
            BotError::Startup(_) => "StartupError",
            BotError::Closed => "ClosedError",
            BotError::Internal(_) => "InternalError",
        }
    }

    pub fn platform(&self) -> Option<&PlatformError> {
        match self {
            BotError::Platform(e) => Some(e),
            _ => None,
        }
    }
}

/// Raised when a name or alias is already registered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("The {} {name} is already an existing command or alias.", conflict_label(.alias_conflict))]
pub struct RegistrationError {
    pub name: String,
    pub alias_conflict: bool,
}

fn conflict_label(alias_conflict: &bool) -> &'static str {
    if *alias_conflict {
        "alias"
    } else {
        "command"
    }
}

fn redirect_hint(redirect: &Option<ChannelId>) -> String {
    redirect
        .map(|channel| format!(" here. Please use the {} channel instead", channel.mention()))
        .unwrap_or_default()
}

impl RegistrationError {
    pub fn new(name: &str, alias_conflict: bool) -> Self {
        Self {
            name: name.to_string(),
            alias_conflict,
        }
    }
}

/// Why a command check did not pass
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckFailure {
    #[error("Bot requires {} permission(s) to run this command.", .0.join(", "))]
    BotMissingPermissions(Vec<String>),

    #[error("Bot requires the role {0} to run this command.")]
    BotMissingRole(String),

    #[error("Bot is missing at least one of the required roles.")]
    BotMissingAnyRole,

    #[error("This command cannot be used in private messages.")]
    NoPrivateMessage,

    #[error("You are not allowed to use that command{}.", redirect_hint(.redirect))]
    InWhitelist { redirect: Option<ChannelId> },

    #[error("You are missing at least one of the required roles.")]
    MissingAnyRole,

    #[error("The check functions for this command failed.")]
    Failed,
}

impl CheckFailure {
    pub fn is_bot_missing(&self) -> bool {
        matches!(
            self,
            CheckFailure::BotMissingPermissions(_)
                | CheckFailure::BotMissingRole(_)
                | CheckFailure::BotMissingAnyRole
        )
    }
}

/// Command execution errors
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Command \"{0}\" is not found")]
    NotFound(String),

    #[error("{param} is a required argument that is missing.")]
    MissingRequiredArgument { param: String },

    #[error("{0}")]
    TooManyArguments(String),

    #[error("{0}")]
    BadArgument(String),

    #[error("Could not convert \"{param}\" into any accepted type.")]
    BadUnionArgument { param: String, errors: Vec<String> },

    #[error("{0}")]
    ArgumentParsing(String),

    #[error("{0}")]
    UserInput(String),

    #[error(transparent)]
    Check(#[from] CheckFailure),

    #[error("You are on cooldown. Try again in {:.2}s", .retry_after.as_secs_f64())]
    OnCooldown { retry_after: Duration },

    #[error("Too many people are using this command. It can only be used {number} time(s) concurrently.")]
    MaxConcurrencyReached { number: usize },

    #[error("{0} command is disabled")]
    Disabled(String),

    #[error("Command raised an exception: {0}")]
    Invoke(#[source] BotError),

    #[error("Conversion failed: {0}")]
    Conversion(String),

    #[error(transparent)]
    Extension(#[from] ExtensionError),

    /// Already reported to the user by the command itself.
    #[error("error already handled")]
    Handled,
}

impl CommandError {
    pub fn kind(&self) -> &'static str {
        match self {
            CommandError::NotFound(_) => "CommandNotFound",
            CommandError::MissingRequiredArgument { .. } => "MissingRequiredArgument",
            CommandError::TooManyArguments(_) => "TooManyArguments",
            CommandError::BadArgument(_) => "BadArgument",
            CommandError::BadUnionArgument { .. } => "BadUnionArgument",
            CommandError::ArgumentParsing(_) => "ArgumentParsingError",
            CommandError::UserInput(_) => "UserInputError",
            CommandError::Check(_) => "CheckFailure",
            CommandError::OnCooldown { .. } => "CommandOnCooldown",
            CommandError::MaxConcurrencyReached { .. } => "MaxConcurrencyReached",
            CommandError::Disabled(_) => "DisabledCommand",
            CommandError::Invoke(e) => e.kind(),
            CommandError::Conversion(_) => "ConversionError",
            CommandError::Extension(_) => "ExtensionError",
            CommandError::Handled => "Handled",
        }
    }

    pub fn is_user_input(&self) -> bool {
        matches!(
            self,
            CommandError::MissingRequiredArgument { .. }
                | CommandError::TooManyArguments(_)
                | CommandError::BadArgument(_)
                | CommandError::BadUnionArgument { .. }
                | CommandError::ArgumentParsing(_)
                | CommandError::UserInput(_)
        )
    }
}

impl From<BotError> for CommandError {
    fn from(err: BotError) -> Self {
        CommandError::Invoke(err)
    }
}

impl From<PlatformError> for CommandError {
    fn from(err: PlatformError) -> Self {
        CommandError::Invoke(BotError::Platform(err))
    }
}

/// Extension loading errors
#[derive(Error, Debug)]
pub enum ExtensionError {
    #[error("Extension {0:?} could not be found")]
    NotFound(String),

    #[error("Extension {0:?} is already loaded")]
    AlreadyLoaded(String),

    #[error("Extension {0:?} has not been loaded")]
    NotLoaded(String),

    #[error("Extension {name:?} raised an error during setup: {reason}")]
    SetupFailed { name: String, reason: String },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Parse error: {0}")]
    Parse(String),
}
