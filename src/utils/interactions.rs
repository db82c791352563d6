//! Stateless message buttons
//!
//! Buttons carry their whole state in the custom id, so presses keep
//! working after a restart:
//! - `help:<qualified command name>` shows the command help to whoever presses it
//! - `delete:<owner id>` deletes the message, for the owner and moderators only

use std::sync::Arc;

use crate::application::bot::Bot;
use crate::application::errors::PlatformError;
use crate::domain::entities::{
    Button, ButtonStyle, Command, ComponentInteraction, InteractionReply, OutgoingMessage, UserId,
};
use crate::utils::help;

const HELP_PREFIX: &str = "help:";
const DELETE_PREFIX: &str = "delete:";
const TRASHCAN: &str = "\u{1f5d1}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentAction {
    Help(String),
    Delete(UserId),
}

impl ComponentAction {
    pub fn parse(custom_id: &str) -> Option<Self> {
        if let Some(name) = custom_id.strip_prefix(HELP_PREFIX) {
            return Some(ComponentAction::Help(name.to_string()));
        }
        custom_id
            .strip_prefix(DELETE_PREFIX)
            .and_then(|owner| owner.parse::<u64>().ok())
            .map(|owner| ComponentAction::Delete(UserId(owner)))
    }
}

pub fn help_button(command: &Command) -> Button {
    Button {
        custom_id: format!("{HELP_PREFIX}{}", command.qualified_name),
        label: Some("Help".to_string()),
        emoji: None,
        style: ButtonStyle::Primary,
    }
}

pub fn delete_button(owner: UserId) -> Button {
    Button {
        custom_id: format!("{DELETE_PREFIX}{owner}"),
        label: None,
        emoji: Some(TRASHCAN.to_string()),
        style: ButtonStyle::Secondary,
    }
}

/// Handle a button press. `Ok(None)` acknowledges without replying.
pub async fn handle_component(
    bot: &Arc<Bot>,
    interaction: &ComponentInteraction,
) -> Result<Option<InteractionReply>, PlatformError> {
    let Some(action) = ComponentAction::parse(&interaction.custom_id) else {
        tracing::debug!("Ignoring unknown component {}", interaction.custom_id);
        return Ok(None);
    };

    match action {
        ComponentAction::Help(name) => {
            let reply = match bot.get_command(&name) {
                Some(command) => {
                    tracing::trace!(
                        "Allowed interaction by {} on {} as it was with the help button",
                        interaction.user,
                        interaction.message_id
                    );
                    OutgoingMessage::embed(help::command_embed(&bot.config().bot.prefix, &command))
                }
                None => OutgoingMessage::text("That command no longer exists."),
            };
            Ok(Some(InteractionReply::ephemeral(reply)))
        }
        ComponentAction::Delete(owner) => {
            let moderation_roles = bot.config().roles.moderation_roles();
            let allowed = interaction.user.user.id == owner
                || interaction.user.has_any_role(&moderation_roles);

            if !allowed {
                tracing::trace!(
                    "Rejected delete press by {} on {}: not owner or moderator",
                    interaction.user,
                    interaction.message_id
                );
                return Ok(Some(InteractionReply::ephemeral(OutgoingMessage::text(
                    "This is not your button to click!",
                ))));
            }

            bot.chat()
                .delete_message(interaction.channel_id, interaction.message_id)
                .await?;
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_ids_round_trip() {
        let command = Command::new("tags").with_subcommand(Command::new("get"));
        let get = command.subcommand("get").unwrap();

        let help = help_button(get);
        assert_eq!(help.custom_id, "help:tags get");
        assert_eq!(
            ComponentAction::parse(&help.custom_id),
            Some(ComponentAction::Help("tags get".to_string()))
        );

        let delete = delete_button(UserId(7));
        assert_eq!(ComponentAction::parse(&delete.custom_id), Some(ComponentAction::Delete(UserId(7))));
    }

    #[test]
    fn test_unknown_ids_are_ignored() {
        assert_eq!(ComponentAction::parse("delete:abc"), None);
        assert_eq!(ComponentAction::parse("vote:1"), None);
    }
}
