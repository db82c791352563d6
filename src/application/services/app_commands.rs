//! Application (slash) command tree

use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

use crate::application::bot::Bot;
use crate::application::errors::{CommandError, RegistrationError};
use crate::domain::entities::{AppInteraction, InteractionReply};
use crate::domain::traits::{AppCommandOption, AppCommandSpec};

pub type AppCommandHandler = Arc<
    dyn Fn(Arc<Bot>, AppInteraction) -> BoxFuture<'static, Result<InteractionReply, CommandError>>
        + Send
        + Sync,
>;

/// Where an application command is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppCommandScope {
    Global,
    Public,
    Private,
}

#[derive(Clone)]
pub struct AppCommand {
    pub name: String,
    pub description: String,
    pub options: Vec<AppCommandOption>,
    pub scope: AppCommandScope,
    pub handler: AppCommandHandler,
}

impl std::fmt::Debug for AppCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppCommand")
            .field("name", &self.name)
            .field("scope", &self.scope)
            .field("options", &self.options)
            .finish()
    }
}

impl AppCommand {
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        scope: AppCommandScope,
        handler: F,
    ) -> Self
    where
        F: Fn(Arc<Bot>, AppInteraction) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<InteractionReply, CommandError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            options: Vec::new(),
            scope,
            handler: Arc::new(move |bot, interaction| Box::pin(handler(bot, interaction))),
        }
    }

    pub fn with_option(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        self.options.push(AppCommandOption {
            name: name.into(),
            description: description.into(),
            required,
        });
        self
    }

    pub fn spec(&self) -> AppCommandSpec {
        AppCommandSpec {
            name: self.name.clone(),
            description: self.description.clone(),
            options: self.options.clone(),
        }
    }
}

/// Registered application commands. Names are unique across scopes.
#[derive(Default)]
pub struct AppCommandTree {
    commands: Vec<AppCommand>,
}

impl AppCommandTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_command(&mut self, command: AppCommand) -> Result<(), RegistrationError> {
        if self.get(&command.name).is_some() {
            return Err(RegistrationError::new(&command.name, false));
        }
        self.commands.push(command);
        Ok(())
    }

    pub fn remove_command(&mut self, name: &str) -> Option<AppCommand> {
        let index = self.commands.iter().position(|c| c.name == name)?;
        Some(self.commands.remove(index))
    }

    pub fn get(&self, name: &str) -> Option<&AppCommand> {
        self.commands.iter().find(|c| c.name == name)
    }

    /// Registration payloads for one scope, sorted by name.
    pub fn specs(&self, scope: AppCommandScope) -> Vec<AppCommandSpec> {
        let mut specs: Vec<AppCommandSpec> = self
            .commands
            .iter()
            .filter(|c| c.scope == scope)
            .map(AppCommand::spec)
            .collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        specs
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
