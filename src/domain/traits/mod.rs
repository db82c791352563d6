//! Domain traits - Abstractions for infrastructure implementations

pub mod chat;
pub mod net;
pub mod store;

pub use chat::{AppCommandOption, AppCommandSpec, ChatClient, SyncScope};
pub use net::NetResource;
pub use store::{Tag, TagStore};
