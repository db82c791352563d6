//! Tags served by the site API

use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;

use crate::application::bot::Bot;
use crate::application::errors::{BotError, CommandError};
use crate::application::messaging::{Args, Context};
use crate::application::services::{AppCommand, AppCommandScope, Cog, Extension};
use crate::domain::entities::{colours, Command, Embed, InteractionReply, OutgoingMessage};
use crate::domain::traits::{Tag, TagStore};

const EXTENSION: &str = "exts.info.tags";

pub struct Tags {
    store: Arc<dyn TagStore>,
}

impl Tags {
    pub const NAME: &'static str = "Tags";

    pub fn new(store: Arc<dyn TagStore>) -> Self {
        Self { store }
    }

    fn normalize(name: &str) -> String {
        name.trim().to_lowercase()
    }

    fn tag_embed(tag: &Tag) -> Embed {
        Embed::new()
            .title(tag.title.clone().unwrap_or_else(|| tag.name.clone()))
            .description(tag.body.clone())
            .colour(colours::BLUE)
    }

    fn not_found(name: &str) -> String {
        format!("No tag named `{name}` found.")
    }

    /// Send the tag called `name` if it exists. Returns whether a tag was sent.
    pub async fn get_command_ctx(&self, ctx: &Context, name: &str) -> Result<bool, CommandError> {
        let name = Self::normalize(name);
        match self.store.get_tag(&name).await? {
            Some(tag) => {
                tracing::debug!("Sending tag {:?} to {}", tag.name, ctx.message.author);
                ctx.send(OutgoingMessage::embed(Self::tag_embed(&tag))).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get(&self, ctx: Context, mut args: Args) -> Result<(), CommandError> {
        let Some(name) = args.rest() else {
            return self.list(ctx).await;
        };
        if !self.get_command_ctx(&ctx, &name).await? {
            ctx.send_text(Self::not_found(&name)).await?;
        }
        Ok(())
    }

    async fn list(&self, ctx: Context) -> Result<(), CommandError> {
        let mut names = self.store.list_tags().await?;
        names.sort();

        let description = if names.is_empty() {
            "There are no tags yet.".to_string()
        } else {
            names
                .iter()
                .map(|name| format!("**»** {name}"))
                .collect::<Vec<_>>()
                .join("\n")
        };
        let embed = Embed::new()
            .title("Current tags")
            .description(description)
            .colour(colours::BLUE)
            .footer(format!("To show a tag, type {}tags <tagname>.", ctx.prefix_or_default()));
        ctx.send(OutgoingMessage::embed(embed)).await?;
        Ok(())
    }

    async fn slash_tag(&self, name: Option<&str>) -> Result<InteractionReply, CommandError> {
        let Some(name) = name.map(Self::normalize).filter(|name| !name.is_empty()) else {
            return Ok(InteractionReply::ephemeral(OutgoingMessage::text(
                "Please provide a tag name.",
            )));
        };

        Ok(match self.store.get_tag(&name).await? {
            Some(tag) => InteractionReply::public(OutgoingMessage::embed(Self::tag_embed(&tag))),
            None => InteractionReply::ephemeral(OutgoingMessage::text(Self::not_found(&name))),
        })
    }
}

#[async_trait]
impl Cog for Tags {
    fn qualified_name(&self) -> &'static str {
        Self::NAME
    }

    fn extension(&self) -> Option<&'static str> {
        Some(EXTENSION)
    }

    fn commands(self: Arc<Self>) -> Vec<Command> {
        let group = Arc::clone(&self);
        let get = Arc::clone(&self);
        let list = Arc::clone(&self);

        vec![Command::new("tags")
            .with_aliases(["tag", "t"])
            .with_usage("[tag_name]")
            .with_description("Show a tag, or list all tags when no name is given.")
            .with_handler(move |ctx, args| {
                let cog = Arc::clone(&group);
                async move { cog.get(ctx, args).await }
            })
            .with_subcommand(
                Command::new("get")
                    .with_root_aliases(["tag-get"])
                    .with_usage("<tag_name>")
                    .with_description("Show the contents of a tag.")
                    .with_handler(move |ctx, args| {
                        let cog = Arc::clone(&get);
                        async move { cog.get(ctx, args).await }
                    }),
            )
            .with_subcommand(
                Command::new("list")
                    .with_description("List every available tag.")
                    .with_handler(move |ctx, _args| {
                        let cog = Arc::clone(&list);
                        async move { cog.list(ctx).await }
                    }),
            )]
    }

    fn app_commands(self: Arc<Self>) -> Vec<AppCommand> {
        vec![AppCommand::new(
            "tag",
            "Show a tag.",
            AppCommandScope::Public,
            move |_bot, interaction| {
                let cog = Arc::clone(&self);
                async move { cog.slash_tag(interaction.option("name")).await }
            },
        )
        .with_option("name", "Name of the tag", true)]
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

pub struct TagsExtension;

#[async_trait]
impl Extension for TagsExtension {
    fn name(&self) -> &'static str {
        EXTENSION
    }

    async fn setup(&self, bot: &Arc<Bot>) -> Result<(), BotError> {
        bot.add_cog(Arc::new(Tags::new(Arc::clone(bot.tags())))).await
    }
}
