//! Helpers shared by the extensions

pub mod checks;
pub mod fuzzy;
pub mod help;
pub mod interactions;
pub mod messages;
