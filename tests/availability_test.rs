//! Guild Availability Integration Tests
//!
//! Run with: cargo test --test availability_test

mod common;

use std::time::Duration;

use common::*;
use pb_discord::application::services::{Availability, GuildKey, LoadState};
use pb_discord::domain::entities::{GuildId, GuildSnapshot};

#[tokio::test]
async fn test_wait_blocks_until_both_guilds_are_populated() {
    let h = harness();
    let bot = h.bot.clone();
    let waiter = tokio::spawn(async move { bot.wait_until_guild_available(None).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!waiter.is_finished());

    assert_eq!(h.bot.on_guild_available(&populated_guild(PRIVATE_GUILD)), Availability::Set);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!waiter.is_finished());

    assert_eq!(h.bot.on_guild_available(&populated_guild(PUBLIC_GUILD)), Availability::Set);
    within(waiter).await.expect("waiter task");
}

#[tokio::test]
async fn test_empty_cache_does_not_open_the_gate() {
    let h = harness();
    let empty = GuildSnapshot::new(PRIVATE_GUILD, "private");

    assert_eq!(h.bot.on_guild_available(&empty), Availability::CacheEmpty);
    assert!(!h.bot.is_guild_available(GuildKey::Private));
}

#[tokio::test]
async fn test_other_guilds_are_ignored() {
    let h = harness();
    assert_eq!(h.bot.on_guild_available(&populated_guild(42)), Availability::Ignored);
    assert!(!h.bot.is_guild_available(GuildKey::Private));
    assert!(!h.bot.is_guild_available(GuildKey::Public));
}

#[tokio::test]
async fn test_unavailable_clears_the_flag() {
    let h = harness();
    h.bot.on_guild_available(&populated_guild(PUBLIC_GUILD));
    assert!(h.bot.is_guild_available(GuildKey::Public));

    h.bot.on_guild_unavailable(GuildId(PUBLIC_GUILD));
    assert!(!h.bot.is_guild_available(GuildKey::Public));
}

#[tokio::test]
async fn test_shared_guild_opens_both_keys() {
    let h = harness_with(test_config(true));
    h.bot.on_guild_available(&populated_guild(PRIVATE_GUILD));

    assert!(h.bot.is_guild_available(GuildKey::Private));
    assert!(h.bot.is_guild_available(GuildKey::Public));
    within(h.bot.wait_until_guild_available(None)).await;
}

#[tokio::test]
async fn test_extensions_load_only_after_the_gate_opens() {
    let h = harness();
    h.bot.load_extensions("exts", false);
    assert_eq!(h.bot.load_state(), LoadState::Loading);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(h.bot.extensions().is_empty());
    assert!(h.bot.all_extensions().is_none());

    h.bot.on_guild_available(&populated_guild(PRIVATE_GUILD));
    h.bot.on_guild_available(&populated_guild(PUBLIC_GUILD));
    within(h.bot.wait_until_extensions_loaded()).await;

    assert_eq!(h.bot.load_state(), LoadState::Loaded);
    let loaded = h.bot.extensions();
    assert_eq!(Some(loaded.clone()), h.bot.all_extensions());
    assert!(loaded.contains("exts.info.tags"));
    assert!(loaded.contains("exts.backend.error_handler"));
    assert!(loaded.contains("exts.moderation.silence"));
}

#[tokio::test]
async fn test_commands_wait_for_extensions_to_load() {
    let h = harness();
    h.bot.load_extensions("exts", false);
    let bot = h.bot.clone();
    let command = tokio::spawn(async move { bot.process_commands(member_message("!tags")).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(h.chat.sent.lock().is_empty());
    assert!(!command.is_finished());

    h.bot.on_guild_available(&populated_guild(PRIVATE_GUILD));
    h.bot.on_guild_available(&populated_guild(PUBLIC_GUILD));
    within(command).await.expect("command task");

    let texts = h.chat.texts();
    assert_eq!(texts.len(), 1);
    assert!(texts[0].contains("Current tags"));
    assert!(texts[0].contains("faq"));
}
