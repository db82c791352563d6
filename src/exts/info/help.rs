//! `help` command

use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;

use crate::application::bot::Bot;
use crate::application::errors::{BotError, CommandError};
use crate::application::messaging::{Args, Context};
use crate::application::services::{Cog, Extension};
use crate::domain::entities::{Command, OutgoingMessage};
use crate::utils::help;

const EXTENSION: &str = "exts.info.help";

#[derive(Debug, Default)]
pub struct Help;

impl Help {
    async fn help(ctx: Context, mut args: Args) -> Result<(), CommandError> {
        let prefix = ctx.prefix_or_default().to_string();

        let Some(query) = args.rest() else {
            // Root aliases also map subcommands at the top level.
            let commands = ctx.bot.commands();
            let top_level = commands.iter().filter(|c| c.name == c.qualified_name);
            let embed = help::overview_embed(&prefix, top_level.map(|c| c.as_ref()));
            ctx.send(OutgoingMessage::embed(embed)).await?;
            return Ok(());
        };

        match ctx.bot.get_command(&query) {
            Some(command) if !command.hidden => {
                ctx.send(OutgoingMessage::embed(help::command_embed(&prefix, &command)))
                    .await?;
            }
            _ => {
                ctx.send_text(format!("No command called `{query}` found.")).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Cog for Help {
    fn qualified_name(&self) -> &'static str {
        "Help"
    }

    fn extension(&self) -> Option<&'static str> {
        Some(EXTENSION)
    }

    fn commands(self: Arc<Self>) -> Vec<Command> {
        vec![Command::new("help")
            .with_usage("[command]")
            .with_description("Show help for a command, or list every command.")
            .with_handler(Help::help)]
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

pub struct HelpExtension;

#[async_trait]
impl Extension for HelpExtension {
    fn name(&self) -> &'static str {
        EXTENSION
    }

    async fn setup(&self, bot: &Arc<Bot>) -> Result<(), BotError> {
        bot.add_cog(Arc::new(Help)).await
    }
}
