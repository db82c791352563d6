//! Application services - Registries and state the bot session is built from

pub mod app_commands;
pub mod availability;
pub mod cog;
pub mod command_service;
pub mod extensions;

pub use app_commands::{AppCommand, AppCommandHandler, AppCommandScope, AppCommandTree};
pub use availability::{Availability, GuildAvailability, GuildKey};
pub use cog::Cog;
pub use command_service::CommandService;
pub use extensions::{walk_extensions, Extension, LoadState};
