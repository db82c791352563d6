//! Command Dispatch Integration Tests
//!
//! Covers root aliases, the error handler's fallbacks and error replies.
//!
//! Run with: cargo test --test command_flow_test

mod common;

use std::sync::Arc;

use common::*;
use pb_discord::domain::entities::{
    Author, ChannelId, Command, ComponentInteraction, GuildId, MessageId, User, UserId,
};

#[tokio::test]
async fn test_root_alias_resolves_to_subcommand() {
    let h = loaded_harness().await;

    let by_alias = h.bot.get_command("tag-get").expect("root alias registered");
    let by_path = h.bot.get_command("tags get").expect("subcommand registered");
    assert!(Arc::ptr_eq(&by_alias, &by_path));

    assert!(h.bot.add_command(Command::new("tag-get")).is_err());
    assert!(h.bot.add_command(Command::new("hush")).is_err());
}

#[tokio::test]
async fn test_removing_group_alias_drops_subcommand_root_aliases() {
    let h = loaded_harness().await;

    assert!(h.bot.remove_command("tag").is_some());
    assert!(h.bot.get_command("tag").is_none());
    assert!(h.bot.get_command("tag-get").is_none());
    assert!(h.bot.get_command("tags").is_some());
}

#[tokio::test]
async fn test_removing_root_alias_drops_it() {
    let h = loaded_harness().await;

    assert!(h.bot.remove_command("tag-get").is_some());
    assert!(h.bot.get_command("tag-get").is_none());
    assert!(h.bot.get_command("tags").is_some());
}

#[tokio::test]
async fn test_unloading_extension_drops_commands_and_root_aliases() {
    let h = loaded_harness().await;

    h.bot.unload_extension("exts.info.tags").await.expect("unloads");
    assert!(h.bot.get_command("tags").is_none());
    assert!(h.bot.get_command("tag-get").is_none());
    assert!(!h.bot.cog_names().contains(&"Tags"));
    assert_eq!(h.bot.app_command_count(), 0);
}

#[tokio::test]
async fn test_root_alias_invokes_subcommand() {
    let h = loaded_harness().await;
    h.bot.process_commands(member_message("!tag-get FAQ")).await;

    let texts = h.chat.texts();
    assert_eq!(texts.len(), 1);
    assert!(texts[0].contains("Frequently asked questions"));
}

#[tokio::test]
async fn test_bot_authors_are_ignored() {
    let h = loaded_harness().await;
    let author = Author::member(User::new(BOT_USER, "bot").bot(), vec![]);
    h.bot.process_commands(message_from(author, "!help")).await;
    assert!(h.chat.sent.lock().is_empty());
}

#[tokio::test]
async fn test_shh_shorthand_silences_current_channel() {
    let h = loaded_harness().await;
    h.bot.process_commands(moderator_message("!shhh")).await;

    assert!(h.chat.silenced.lock().contains(&ChannelId(GENERAL)));
    assert_eq!(h.chat.texts(), vec!["✅ silenced current channel for 6 minute(s).".to_string()]);
}

#[tokio::test]
async fn test_shh_shorthand_with_voice_channel_and_kick() {
    let h = loaded_harness().await;
    h.bot.process_commands(moderator_message("!shh Lounge true")).await;

    assert!(h.chat.silenced.lock().contains(&ChannelId(LOUNGE)));
    assert_eq!(*h.chat.disconnected.lock(), vec![ChannelId(LOUNGE)]);
    let expected = format!("✅ silenced {} for 4 minute(s).", ChannelId(LOUNGE).mention());
    assert_eq!(h.chat.texts(), vec![expected]);
}

#[tokio::test]
async fn test_unshh_shorthand_unsilences() {
    let h = loaded_harness().await;
    h.bot.process_commands(moderator_message("!shh")).await;
    h.bot.process_commands(moderator_message("!unshh")).await;

    assert!(h.chat.silenced.lock().is_empty());
    assert_eq!(
        h.chat.texts().last().map(String::as_str),
        Some("✅ unsilenced current channel.")
    );
}

#[tokio::test]
async fn test_shh_from_member_without_role_does_not_silence() {
    let h = loaded_harness().await;
    h.bot.process_commands(member_message("!shh")).await;
    assert!(h.chat.silenced.lock().is_empty());
}

#[tokio::test]
async fn test_unknown_command_falls_back_to_tag() {
    let h = loaded_harness().await;
    h.bot.process_commands(member_message("!ask")).await;

    assert_eq!(h.chat.sent.lock().len(), 1);
    let message = h.chat.last_sent().expect("tag sent");
    let embed = message.embed.expect("tag embed");
    assert_eq!(embed.title.as_deref(), Some("ask"));
    assert_eq!(embed.description.as_deref(), Some("Just ask your question."));
}

#[tokio::test]
async fn test_unknown_command_suggests_closest_match() {
    let h = loaded_harness().await;
    h.bot.process_commands(member_message("!helpp tags")).await;

    let message = h.chat.last_sent().expect("suggestion sent");
    assert!(message.delete_after.is_some());
    let embed = message.embed.expect("suggestion embed");
    assert_eq!(embed.author_name.as_deref(), Some("Did you mean:"));
    assert_eq!(embed.description.as_deref(), Some("!help tags"));
}

#[tokio::test]
async fn test_unknown_command_without_match_sends_notice() {
    let h = loaded_harness().await;
    h.bot.process_commands(member_message("!qwertyuiop")).await;

    let texts = h.chat.texts();
    assert_eq!(texts.len(), 1);
    assert!(texts[0].starts_with("Unknown command `qwertyuiop`."));
    assert!(texts[0].contains("!help"));
}

#[tokio::test]
async fn test_direct_messages_stop_at_tag_fallback() {
    let h = loaded_harness().await;
    let author = Author::direct(User::new(MEMBER, "member"));
    let mut message = message_from(author, "!qwertyuiop");
    message.guild_id = None;
    h.bot.process_commands(message).await;

    assert!(h.chat.sent.lock().is_empty());
}

#[tokio::test]
async fn test_bad_argument_reply_has_help_and_delete_buttons() {
    let h = loaded_harness().await;
    h.bot.process_commands(moderator_message("!silence 0")).await;

    let message = h.chat.last_sent().expect("error sent");
    let embed = message.embed.expect("error embed");
    assert_eq!(embed.title.as_deref(), Some("Bad argument"));

    let ids: Vec<&str> = message.buttons.iter().map(|b| b.custom_id.as_str()).collect();
    assert_eq!(ids, vec!["help:silence".to_string(), format!("delete:{MEMBER}")]);
    assert!(h.chat.silenced.lock().is_empty());
}

#[tokio::test]
async fn test_check_failure_reply() {
    let h = loaded_harness().await;
    h.bot.process_commands(member_message("!silence")).await;

    assert_eq!(
        h.chat.texts(),
        vec!["Sorry, you don't have permission to do that.".to_string()]
    );
}

#[tokio::test]
async fn test_silence_twice_reports_already_silenced() {
    let h = loaded_harness().await;
    h.bot.process_commands(moderator_message("!silence 5")).await;
    h.bot.process_commands(moderator_message("!hush")).await;

    let texts = h.chat.texts();
    assert_eq!(texts[0], "✅ silenced current channel for 5 minute(s).");
    assert_eq!(texts[1], "❌ current channel is already silenced.");
}

fn press(custom_id: String, user: Author) -> ComponentInteraction {
    ComponentInteraction {
        guild_id: Some(GuildId(PRIVATE_GUILD)),
        channel_id: ChannelId(GENERAL),
        message_id: MessageId(555),
        user,
        custom_id,
    }
}

#[tokio::test]
async fn test_delete_button_is_limited_to_owner_and_moderators() {
    let h = loaded_harness().await;
    let custom_id = format!("delete:{MEMBER}");

    let stranger = Author::member(User::new(UserId(7), "stranger"), vec![]);
    let reply = h.bot.on_component(press(custom_id.clone(), stranger)).await;
    let reply = reply.expect("rejection reply");
    assert!(reply.ephemeral);
    assert_eq!(reply.message.content.as_deref(), Some("This is not your button to click!"));
    assert!(h.chat.deleted.lock().is_empty());

    let owner = Author::member(User::new(MEMBER, "member"), vec![]);
    assert!(h.bot.on_component(press(custom_id, owner)).await.is_none());
    assert_eq!(*h.chat.deleted.lock(), vec![(ChannelId(GENERAL), MessageId(555))]);
}

#[tokio::test]
async fn test_help_button_shows_command_help() {
    let h = loaded_harness().await;
    let anyone = Author::member(User::new(UserId(7), "anyone"), vec![]);

    let reply = h
        .bot
        .on_component(press("help:tags get".to_string(), anyone))
        .await
        .expect("help reply");
    assert!(reply.ephemeral);
    let embed = reply.message.embed.expect("help embed");
    assert!(rendered_embed_mentions(&embed, "tags get"));
}

fn rendered_embed_mentions(embed: &pb_discord::domain::entities::Embed, needle: &str) -> bool {
    [&embed.title, &embed.description]
        .into_iter()
        .flatten()
        .any(|text| text.contains(needle))
}
