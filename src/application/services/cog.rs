use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;

use crate::application::bot::Bot;
use crate::application::errors::BotError;
use crate::domain::entities::Command;

use super::app_commands::AppCommand;

/// A group of commands and state added to the bot as a unit.
#[async_trait]
pub trait Cog: Send + Sync + 'static {
    fn qualified_name(&self) -> &'static str;

    /// Extension that added this cog; unloading the extension removes it.
    fn extension(&self) -> Option<&'static str> {
        None
    }

    fn commands(self: Arc<Self>) -> Vec<Command>;

    fn app_commands(self: Arc<Self>) -> Vec<AppCommand> {
        Vec::new()
    }

    async fn cog_load(&self, _bot: &Arc<Bot>) -> Result<(), BotError> {
        Ok(())
    }

    async fn cog_unload(&self, _bot: &Arc<Bot>) {}

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}
