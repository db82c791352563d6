//! pb-discord: the Project Borealis Discord bot
//!
//! Layout:
//! - `domain`: ids, messages, guild snapshots, commands and the platform traits
//! - `application`: the bot session, command dispatch, cogs and extensions
//! - `infrastructure`: config, logging, networking and the Discord adapter
//! - `exts`: the extensions loaded at startup
//! - `utils`: helpers shared by extensions

pub mod application;
pub mod domain;
pub mod exts;
pub mod infrastructure;
pub mod utils;
