pub mod config_verifier;
pub mod error_handler;
