//! Application layer - Use cases and business logic
//!
//! This layer contains:
//! - Bot: The session object tying registries, extensions and the chat client together
//! - Services: Registries, readiness gate, extension discovery
//! - Errors: Domain-specific errors
//! - Messaging: Message parsing, arguments, invocation context

pub mod bot;
pub mod errors;
pub mod messaging;
pub mod services;

pub use bot::{Bot, BotBuilder, CommandErrorManager, NetResources};
