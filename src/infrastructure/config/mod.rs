//! Configuration management

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::application::errors::ConfigError;
use crate::domain::entities::{ChannelId, GuildId, RoleId};

/// Files loaded into the process environment before the overlay runs.
pub const ENV_FILES: [&str; 2] = [".env.server", ".env"];

/// Bot configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    pub misc: MiscConfig,
    pub bot: BotConfig,
    pub guild: GuildConfig,
    pub channels: ChannelsConfig,
    pub roles: RolesConfig,
    pub redirect_output: RedirectOutputConfig,
    pub urls: UrlsConfig,
    pub keys: KeysConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct MiscConfig {
    pub debug: bool,
    pub file_logs: bool,
}

impl Default for MiscConfig {
    fn default() -> Self {
        Self {
            debug: true,
            file_logs: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BotConfig {
    pub prefix: String,
    pub token: String,
    /// `*` for the whole crate, a comma list of module paths, or `!` followed
    /// by a list of modules to exclude.
    pub trace_loggers: String,
    /// Commands that may be run with a codeblock glued to their name.
    pub codeblock_commands: Vec<String>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            prefix: "!".to_string(),
            token: String::new(),
            trace_loggers: "*".to_string(),
            codeblock_commands: vec!["eval".to_string(), "timeit".to_string()],
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct GuildConfig {
    /// The private (staff) guild.
    pub id: GuildId,
    pub public: GuildId,
}

impl Default for GuildConfig {
    fn default() -> Self {
        Self {
            id: GuildId(0),
            public: GuildId(350643892447870976),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ChannelsConfig {
    pub announcements: ChannelId,
    pub github: ChannelId,
    pub releases: ChannelId,
    pub meetings: ChannelId,
    pub introductions: ChannelId,
    pub tech_support: ChannelId,
    pub team_lead: ChannelId,
    pub production: ChannelId,
    pub strike_group: ChannelId,
    pub email_config: ChannelId,
    pub ravenholm_feedback: ChannelId,
    pub playtest_feedback: ChannelId,
    pub bot_test: ChannelId,
    pub public_playtesters: ChannelId,
}

impl Default for ChannelsConfig {
    fn default() -> Self {
        Self {
            announcements: ChannelId(350810790325911572),
            github: ChannelId(352463633219059712),
            releases: ChannelId(611957255566393359),
            meetings: ChannelId(657342682057801762),
            introductions: ChannelId(351324332833898509),
            tech_support: ChannelId(417775952605741057),
            team_lead: ChannelId(654378725697126412),
            production: ChannelId(654368648114339910),
            strike_group: ChannelId(811649445950914570),
            email_config: ChannelId(601134391850434570),
            ravenholm_feedback: ChannelId(379742050406498305),
            playtest_feedback: ChannelId(655180925688086528),
            bot_test: ChannelId(420850706136694786),
            public_playtesters: ChannelId(502887068783869952),
        }
    }
}

impl ChannelsConfig {
    /// Every configured channel as `(field name, id)`, in declaration order.
    pub fn entries(&self) -> Vec<(&'static str, ChannelId)> {
        vec![
            ("announcements", self.announcements),
            ("github", self.github),
            ("releases", self.releases),
            ("meetings", self.meetings),
            ("introductions", self.introductions),
            ("tech_support", self.tech_support),
            ("team_lead", self.team_lead),
            ("production", self.production),
            ("strike_group", self.strike_group),
            ("email_config", self.email_config),
            ("ravenholm_feedback", self.ravenholm_feedback),
            ("playtest_feedback", self.playtest_feedback),
            ("bot_test", self.bot_test),
            ("public_playtesters", self.public_playtesters),
        ]
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RolesConfig {
    pub on_leave: RoleId,
    pub support: RoleId,
    pub inviter: RoleId,
    pub public_manager: RoleId,
    pub public_moderator: RoleId,
    pub public_team: RoleId,
    pub public_former_team: RoleId,
    pub public_playtester: RoleId,
    pub public_playtest_admin: RoleId,
}

impl Default for RolesConfig {
    fn default() -> Self {
        Self {
            on_leave: RoleId(800250529259061278),
            support: RoleId(803741037557186632),
            inviter: RoleId(966924781767237652),
            public_manager: RoleId(461192768811827200),
            public_moderator: RoleId(353372472546033664),
            public_team: RoleId(353372472546033664),
            public_former_team: RoleId(802949984637943849),
            public_playtester: RoleId(554090450210783254),
            public_playtest_admin: RoleId(625415837641080853),
        }
    }
}

impl RolesConfig {
    /// Roles allowed to moderate: silence channels, delete other people's bot replies.
    pub fn moderation_roles(&self) -> Vec<RoleId> {
        let mut roles = vec![self.public_manager, self.public_moderator];
        if !roles.contains(&self.public_team) {
            roles.push(self.public_team);
        }
        roles
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RedirectOutputConfig {
    pub delete_delay: u64,
    pub delete_invocation: bool,
}

impl Default for RedirectOutputConfig {
    fn default() -> Self {
        Self {
            delete_delay: 15,
            delete_invocation: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct UrlsConfig {
    pub discord_api: String,
    pub github_api: String,
    pub site_api: String,
}

impl Default for UrlsConfig {
    fn default() -> Self {
        Self {
            discord_api: "https://discordapp.com/api/v7/".to_string(),
            github_api: "https://api.github.com".to_string(),
            site_api: "https://api.projectborealis.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct KeysConfig {
    pub github: String,
    pub site_api: String,
}

impl Config {
    /// Load `path` as YAML (defaults when the file is missing), then apply
    /// environment overrides.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let config = if path.exists() {
            Self::read_yaml(&path)?
        } else {
            tracing::warn!("Config file {} not found, using defaults", path.display());
            Config::default()
        };

        load_env_files();
        config.with_overrides(|key| std::env::var(key).ok())
    }

    /// Defaults plus environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        load_env_files();
        Config::default().with_overrides(|key| std::env::var(key).ok())
    }

    fn read_yaml(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config: {}", e)))?;

        serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))
    }

    /// Apply `<SECTION>_<FIELD>` overrides looked up through `lookup`.
    pub fn with_overrides<F>(self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            misc: overlay(&self.misc, "", &lookup)?,
            bot: overlay(&self.bot, "BOT_", &lookup)?,
            guild: overlay(&self.guild, "GUILD_", &lookup)?,
            channels: overlay(&self.channels, "CHANNELS_", &lookup)?,
            roles: overlay(&self.roles, "ROLES_", &lookup)?,
            redirect_output: overlay(&self.redirect_output, "REDIRECT_OUTPUT_", &lookup)?,
            urls: overlay(&self.urls, "URLS_", &lookup)?,
            keys: overlay(&self.keys, "API_KEYS_", &lookup)?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bot.token.trim().is_empty() {
            return Err(ConfigError::MissingField("bot.token (BOT_TOKEN)".to_string()));
        }
        if self.guild.id.get() == 0 {
            return Err(ConfigError::MissingField("guild.id (GUILD_ID)".to_string()));
        }
        Ok(())
    }

    pub fn default_yaml() -> Result<String, ConfigError> {
        serde_yaml::to_string(&Config::default())
            .map_err(|e| ConfigError::Parse(format!("Failed to serialize config: {}", e)))
    }
}

fn load_env_files() {
    for file in ENV_FILES {
        if dotenvy::from_filename(file).is_ok() {
            tracing::debug!("Loaded environment from {}", file);
        }
    }
}

/// Round-trip `section` through a JSON object, replacing each field whose
/// `<prefix><FIELD>` variable is set. The value is parsed to the field's
/// current JSON type.
fn overlay<T, F>(section: &T, prefix: &str, lookup: &F) -> Result<T, ConfigError>
where
    T: Serialize + DeserializeOwned,
    F: Fn(&str) -> Option<String>,
{
    let mut value = serde_json::to_value(section)
        .map_err(|e| ConfigError::Parse(format!("Failed to serialize section: {}", e)))?;

    if let Value::Object(fields) = &mut value {
        for (field, current) in fields.iter_mut() {
            let key = format!("{}{}", prefix, field.replace('-', "_").to_uppercase());
            let Some(raw) = lookup(&key) else {
                continue;
            };
            *current = parse_override(&key, &raw, current)?;
        }
    }

    serde_json::from_value(value)
        .map_err(|e| ConfigError::InvalidValue(format!("Invalid override: {}", e)))
}

fn parse_override(key: &str, raw: &str, current: &Value) -> Result<Value, ConfigError> {
    let raw = raw.trim();
    let invalid = || ConfigError::InvalidValue(format!("{key}={raw}"));

    Ok(match current {
        Value::Bool(_) => match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Value::Bool(true),
            "0" | "false" | "no" | "off" => Value::Bool(false),
            _ => return Err(invalid()),
        },
        Value::Number(_) => {
            if let Ok(n) = raw.parse::<u64>() {
                Value::from(n)
            } else if let Ok(n) = raw.parse::<i64>() {
                Value::from(n)
            } else {
                raw.parse::<f64>().map(Value::from).map_err(|_| invalid())?
            }
        }
        Value::Array(_) => Value::Array(
            raw.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(|item| Value::String(item.to_string()))
                .collect(),
        ),
        _ => Value::String(raw.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.bot.prefix, "!");
        assert_eq!(config.bot.codeblock_commands, vec!["eval", "timeit"]);
        assert!(config.misc.debug);
        assert!(!config.misc.file_logs);
        assert_eq!(config.redirect_output.delete_delay, 15);
    }

    #[test]
    fn test_env_overrides_use_section_prefix() {
        let config = Config::default()
            .with_overrides(env(&[
                ("BOT_TOKEN", "secret"),
                ("GUILD_ID", "1234"),
                ("CHANNELS_BOT_TEST", "42"),
                ("API_KEYS_SITE_API", "key"),
                ("FILE_LOGS", "true"),
                ("BOT_CODEBLOCK_COMMANDS", "eval, run"),
            ]))
            .unwrap();

        assert_eq!(config.bot.token, "secret");
        assert_eq!(config.guild.id, GuildId(1234));
        assert_eq!(config.channels.bot_test, ChannelId(42));
        assert_eq!(config.keys.site_api, "key");
        assert!(config.misc.file_logs);
        assert_eq!(config.bot.codeblock_commands, vec!["eval", "run"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bad_override_is_rejected() {
        let err = Config::default()
            .with_overrides(env(&[("DEBUG", "maybe")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }

    #[test]
    fn test_validate_requires_token_and_guild() {
        let mut config = Config::default();
        assert!(matches!(config.validate(), Err(ConfigError::MissingField(_))));
        config.bot.token = "token".into();
        assert!(matches!(config.validate(), Err(ConfigError::MissingField(_))));
        config.guild.id = GuildId(1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config: Config = serde_yaml::from_str("bot:\n  prefix: \"?\"\nguild:\n  id: 7\n").unwrap();
        assert_eq!(config.bot.prefix, "?");
        assert_eq!(config.bot.trace_loggers, "*");
        assert_eq!(config.guild.id, GuildId(7));
        assert_eq!(config.guild.public, GuildId(350643892447870976));
    }
}
