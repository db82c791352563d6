use std::sync::Arc;

use crate::application::errors::RegistrationError;
use crate::domain::entities::{Command, CommandRegistry};

/// Command table with root aliases layered over the base registry.
#[derive(Default)]
pub struct CommandService {
    registry: CommandRegistry,
}

impl CommandService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `command` normally, then its root aliases and those of its
    /// subcommands. A root alias conflict leaves the command registered
    /// without any of its root aliases.
    pub fn add_command(&mut self, command: Arc<Command>) -> Result<(), RegistrationError> {
        self.registry.add_command(Arc::clone(&command))?;
        self.registry.add_root_aliases(&command)
    }

    /// Remove a command or alias as normal, then every root alias declared
    /// by the removed command and its subcommands. Root aliases cannot be
    /// removed one at a time.
    pub fn remove_command(&mut self, name: &str) -> Option<Arc<Command>> {
        let command = self.registry.remove_command(name)?;
        self.registry.remove_root_aliases(&command);
        Some(command)
    }

    pub fn get(&self, name: &str) -> Option<Arc<Command>> {
        self.registry.get(name)
    }

    pub fn get_command(&self, qualified: &str) -> Option<Arc<Command>> {
        self.registry.get_command(qualified)
    }

    pub fn ancestors(&self, command: &Command) -> Vec<Arc<Command>> {
        self.registry.ancestors(command)
    }

    pub fn commands(&self) -> Vec<Arc<Command>> {
        self.registry.commands()
    }

    pub fn walk_commands(&self) -> Vec<Arc<Command>> {
        self.registry.walk_commands()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.registry.contains(name)
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }
}
