//! Bot extensions, loaded at startup under the `exts` namespace

pub mod backend;
pub mod info;
pub mod moderation;

use std::sync::Arc;

use crate::application::services::Extension;

/// Every extension shipped with the bot.
pub fn catalog() -> Vec<Arc<dyn Extension>> {
    vec![
        Arc::new(backend::error_handler::ErrorHandlerExtension),
        Arc::new(backend::config_verifier::ConfigVerifierExtension),
        Arc::new(info::help::HelpExtension),
        Arc::new(info::tags::TagsExtension),
        Arc::new(moderation::silence::SilenceExtension),
    ]
}
