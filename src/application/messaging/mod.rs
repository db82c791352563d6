//! Message handling - Turning chat messages into command invocations

pub mod args;
pub mod context;
pub mod parser;

pub use args::Args;
pub use context::Context;
pub use parser::{MessageParser, ParsedInvocation};
