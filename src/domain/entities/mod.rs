//! Domain entities - Core objects the bot reasons about

pub mod command;
pub mod guild;
pub mod ids;
pub mod interaction;
pub mod message;
pub mod user;

pub use command::{Check, Command, CommandHandler, CommandRegistry};
pub use guild::{ChannelKind, ChannelRef, GuildSnapshot};
pub use ids::{ChannelId, GuildId, MessageId, RoleId, UserId};
pub use interaction::{AppInteraction, ComponentInteraction, InteractionReply};
pub use message::{colours, Button, ButtonStyle, Embed, Message, OutgoingMessage};
pub use user::{Author, User};
