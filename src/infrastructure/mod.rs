//! Infrastructure layer - External concerns
//!
//! This layer contains:
//! - Config: Configuration loading
//! - Logging: tracing subscriber setup
//! - Net: resolver, connector and HTTP session
//! - Site API: tag storage
//! - Adapters: Discord integration

pub mod adapters;
pub mod config;
pub mod logging;
pub mod net;
pub mod site_api;
