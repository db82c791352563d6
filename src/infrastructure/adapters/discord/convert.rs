//! Conversions between serenity models and the bot's own types

use chrono::{DateTime, Utc};
use serenity::all::{
    ButtonStyle as SerenityButtonStyle, ChannelType, CommandDataOptionValue, CommandInteraction,
    CommandOptionType, ComponentInteraction as SerenityComponent, CreateActionRow,
    CreateAllowedMentions, CreateButton, CreateCommand, CreateCommandOption, CreateEmbed,
    CreateEmbedAuthor, CreateEmbedFooter, CreateInteractionResponseMessage, CreateMessage,
    Guild as SerenityGuild, GuildChannel, HttpError, Member, Message as SerenityMessage,
    ReactionType, User as SerenityUser,
};

use crate::application::errors::PlatformError;
use crate::domain::entities::{
    AppInteraction, Author, Button, ButtonStyle, ChannelId, ChannelKind, ChannelRef,
    ComponentInteraction, Embed, GuildId, GuildSnapshot, InteractionReply, Message, MessageId,
    OutgoingMessage, RoleId, User, UserId,
};
use crate::domain::traits::AppCommandSpec;

fn nonzero(kind: &str, id: u64) -> Result<u64, PlatformError> {
    if id == 0 {
        Err(PlatformError::new(format!("{kind} id must not be 0")))
    } else {
        Ok(id)
    }
}

pub fn to_guild(id: GuildId) -> Result<serenity::all::GuildId, PlatformError> {
    nonzero("Guild", id.get()).map(serenity::all::GuildId::new)
}

pub fn to_channel(id: ChannelId) -> Result<serenity::all::ChannelId, PlatformError> {
    nonzero("Channel", id.get()).map(serenity::all::ChannelId::new)
}

pub fn to_message(id: MessageId) -> Result<serenity::all::MessageId, PlatformError> {
    nonzero("Message", id.get()).map(serenity::all::MessageId::new)
}

pub fn platform_error(error: serenity::Error) -> PlatformError {
    match error {
        serenity::Error::Http(HttpError::UnsuccessfulRequest(response)) => PlatformError::http(
            response.status_code.as_u16(),
            Some(response.error.code as i64),
            response.error.message,
        ),
        other => PlatformError::new(other.to_string()),
    }
}

pub fn user(user: &SerenityUser) -> User {
    User {
        id: UserId(user.id.get()),
        username: user.name.clone(),
        global_name: user.global_name.clone(),
        is_bot: user.bot,
    }
}

fn roles(roles: &[serenity::all::RoleId]) -> Vec<RoleId> {
    roles.iter().map(|role| RoleId(role.get())).collect()
}

fn author(user_model: &SerenityUser, member: Option<&Member>) -> Author {
    match member {
        Some(member) => Author::member(user(user_model), roles(&member.roles)),
        None => Author::direct(user(user_model)),
    }
}

pub fn message(msg: &SerenityMessage, category_id: Option<ChannelId>) -> Message {
    let author = match (&msg.guild_id, &msg.member) {
        (Some(_), Some(member)) => Author::member(user(&msg.author), roles(&member.roles)),
        _ => Author::direct(user(&msg.author)),
    };

    Message {
        id: MessageId(msg.id.get()),
        channel_id: ChannelId(msg.channel_id.get()),
        guild_id: msg.guild_id.map(|id| GuildId(id.get())),
        category_id,
        author,
        content: msg.content.clone(),
        timestamp: DateTime::<Utc>::from_timestamp(msg.timestamp.unix_timestamp(), 0)
            .unwrap_or_else(Utc::now),
    }
}

fn channel_kind(kind: ChannelType) -> ChannelKind {
    match kind {
        ChannelType::Text | ChannelType::News => ChannelKind::Text,
        ChannelType::Voice | ChannelType::Stage => ChannelKind::Voice,
        ChannelType::Category => ChannelKind::Category,
        ChannelType::NewsThread | ChannelType::PublicThread | ChannelType::PrivateThread => {
            ChannelKind::Thread
        }
        _ => ChannelKind::Other,
    }
}

pub fn channel(channel: &GuildChannel) -> ChannelRef {
    let converted = ChannelRef::new(channel.id.get(), channel.name.clone(), channel_kind(channel.kind));
    match channel.parent_id {
        Some(parent) => converted.with_parent(parent.get()),
        None => converted,
    }
}

pub fn guild_snapshot(guild: &SerenityGuild) -> GuildSnapshot {
    GuildSnapshot {
        id: GuildId(guild.id.get()),
        name: guild.name.clone(),
        role_count: guild.roles.len(),
        member_count: guild.members.len(),
        channels: guild
            .channels
            .values()
            .chain(guild.threads.iter())
            .map(channel)
            .collect(),
    }
}

pub fn embed(embed: &Embed) -> CreateEmbed {
    let mut builder = CreateEmbed::new();
    if let Some(title) = &embed.title {
        builder = builder.title(title);
    }
    if let Some(description) = &embed.description {
        builder = builder.description(description);
    }
    if let Some(colour) = embed.colour {
        builder = builder.colour(colour);
    }
    if let Some(name) = &embed.author_name {
        let mut author = CreateEmbedAuthor::new(name);
        if let Some(icon) = &embed.author_icon {
            author = author.icon_url(icon);
        }
        builder = builder.author(author);
    }
    if let Some(footer) = &embed.footer {
        builder = builder.footer(CreateEmbedFooter::new(footer));
    }
    builder
}

fn button(button: &Button) -> CreateButton {
    let style = match button.style {
        ButtonStyle::Primary => SerenityButtonStyle::Primary,
        ButtonStyle::Secondary => SerenityButtonStyle::Secondary,
        ButtonStyle::Danger => SerenityButtonStyle::Danger,
    };
    let mut builder = CreateButton::new(&button.custom_id).style(style);
    if let Some(label) = &button.label {
        builder = builder.label(label);
    }
    if let Some(emoji) = &button.emoji {
        builder = builder.emoji(ReactionType::Unicode(emoji.clone()));
    }
    builder
}

fn components(message: &OutgoingMessage) -> Vec<CreateActionRow> {
    if message.buttons.is_empty() {
        return Vec::new();
    }
    vec![CreateActionRow::Buttons(message.buttons.iter().map(button).collect())]
}

/// Mentions resolve for users and roles, never for `@everyone`.
pub fn allowed_mentions() -> CreateAllowedMentions {
    CreateAllowedMentions::new()
        .all_users(true)
        .all_roles(true)
        .everyone(false)
}

pub fn create_message(message: &OutgoingMessage) -> CreateMessage {
    let mut builder = CreateMessage::new().allowed_mentions(allowed_mentions());
    if let Some(content) = &message.content {
        builder = builder.content(content);
    }
    if let Some(embed_model) = &message.embed {
        builder = builder.embed(embed(embed_model));
    }
    let rows = components(message);
    if !rows.is_empty() {
        builder = builder.components(rows);
    }
    builder
}

pub fn interaction_message(reply: &InteractionReply) -> CreateInteractionResponseMessage {
    let mut builder = CreateInteractionResponseMessage::new()
        .ephemeral(reply.ephemeral)
        .allowed_mentions(allowed_mentions());
    if let Some(content) = &reply.message.content {
        builder = builder.content(content);
    }
    if let Some(embed_model) = &reply.message.embed {
        builder = builder.embed(embed(embed_model));
    }
    let rows = components(&reply.message);
    if !rows.is_empty() {
        builder = builder.components(rows);
    }
    builder
}

pub fn create_command(spec: &AppCommandSpec) -> CreateCommand {
    spec.options.iter().fold(
        CreateCommand::new(&spec.name).description(&spec.description),
        |command, option| {
            command.add_option(
                CreateCommandOption::new(CommandOptionType::String, &option.name, &option.description)
                    .required(option.required),
            )
        },
    )
}

pub fn app_interaction(command: &CommandInteraction) -> AppInteraction {
    let mut interaction = AppInteraction::new(
        command.channel_id.get(),
        author(&command.user, command.member.as_deref()),
        command.data.name.clone(),
    );
    if let Some(guild_id) = command.guild_id {
        interaction = interaction.in_guild(guild_id.get());
    }
    for option in &command.data.options {
        if let CommandDataOptionValue::String(value) = &option.value {
            interaction = interaction.with_option(option.name.clone(), value.clone());
        }
    }
    interaction
}

pub fn component_interaction(component: &SerenityComponent) -> ComponentInteraction {
    ComponentInteraction {
        guild_id: component.guild_id.map(|id| GuildId(id.get())),
        channel_id: ChannelId(component.channel_id.get()),
        message_id: MessageId(component.message.id.get()),
        user: author(&component.user, component.member.as_ref()),
        custom_id: component.data.custom_id.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_ids_are_rejected() {
        assert!(to_guild(GuildId(0)).is_err());
        assert!(to_channel(ChannelId(0)).is_err());
        assert_eq!(to_channel(ChannelId(5)).unwrap().get(), 5);
    }

    #[test]
    fn test_channel_kinds() {
        assert_eq!(channel_kind(ChannelType::News), ChannelKind::Text);
        assert_eq!(channel_kind(ChannelType::Stage), ChannelKind::Voice);
        assert_eq!(channel_kind(ChannelType::PrivateThread), ChannelKind::Thread);
        assert_eq!(channel_kind(ChannelType::Directory), ChannelKind::Other);
    }
}
