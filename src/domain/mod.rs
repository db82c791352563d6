//! Domain layer - Core types with no knowledge of the chat platform
//!
//! This layer contains:
//! - Entities: ids, users, messages, guild snapshots, commands
//! - Traits: abstractions the infrastructure implements (chat client, tag store, network resources)

pub mod entities;
pub mod traits;
