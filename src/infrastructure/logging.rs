//! tracing subscriber setup

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::application::errors::BotError;
use crate::infrastructure::config::Config;

const CRATE_TARGET: &str = "pb_discord";
const LOG_DIR: &str = "logs";
const LOG_FILE: &str = "bot.log";

/// Filter directives for the configured level and trace loggers.
///
/// `trace_loggers` is `*` for the whole crate, a comma separated list of
/// module paths, or such a list prefixed with `!` to trace everything
/// except those modules.
pub fn filter_directives(debug: bool, trace_loggers: &str) -> String {
    let base = if debug { "debug" } else { "info" };
    let mut directives = vec![base.to_string()];

    let trace_loggers = trace_loggers.trim();
    let (inverted, list) = match trace_loggers.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, trace_loggers),
    };
    let modules: Vec<String> = list
        .split(',')
        .map(str::trim)
        .filter(|module| !module.is_empty() && *module != "*")
        .map(|module| module.replace('.', "::"))
        .collect();

    if trace_loggers == "*" || inverted {
        directives.push(format!("{CRATE_TARGET}=trace"));
    }
    for module in modules {
        let level = if inverted { base } else { "trace" };
        directives.push(format!("{module}={level}"));
    }

    directives.push("serenity=warn".to_string());
    directives.join(",")
}

/// Install the global subscriber. `RUST_LOG` replaces the configured
/// filter when set.
pub fn init(config: &Config) -> Result<(), BotError> {
    let directives = filter_directives(config.misc.debug, &config.bot.trace_loggers);
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&directives)
            .map_err(|e| BotError::Startup(format!("Invalid log filter {directives:?}: {e}")))?,
    };

    let file_layer = if config.misc.file_logs {
        fs::create_dir_all(LOG_DIR)
            .map_err(|e| BotError::Startup(format!("Failed to create {LOG_DIR}: {e}")))?;
        let path = Path::new(LOG_DIR).join(LOG_FILE);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| BotError::Startup(format!("Failed to open {}: {e}", path.display())))?;
        Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .with(file_layer)
        .try_init()
        .map_err(|e| BotError::Startup(format!("Failed to initialise logging: {e}")))
}
