use async_trait::async_trait;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use crate::application::errors::{CommandError, RegistrationError};
use crate::application::messaging::{Args, Context};

/// Command handler function type
pub type CommandHandler =
    Arc<dyn Fn(Context, Args) -> BoxFuture<'static, Result<(), CommandError>> + Send + Sync>;

/// A predicate deciding whether a command may run in a context.
///
/// `Ok(false)` is a plain check failure; an `Err` carries a more specific
/// reason that the error handler can report.
#[async_trait]
pub trait Check: Send + Sync {
    async fn check(&self, ctx: &Context) -> Result<bool, CommandError>;
}

/// Represents a bot command. A command with subcommands is a group.
#[derive(Clone)]
pub struct Command {
    pub name: String,
    pub qualified_name: String,
    pub description: Option<String>,
    pub aliases: Vec<String>,
    /// Extra names registered at the top level instead of under the parent group.
    pub root_aliases: Vec<String>,
    pub usage: Option<String>,
    pub hidden: bool,
    pub enabled: bool,
    pub checks: Vec<Arc<dyn Check>>,
    /// Run after checks pass, right before the handler.
    pub before_invoke: Vec<Arc<dyn Check>>,
    pub handler: Option<CommandHandler>,
    pub subcommands: Vec<Arc<Command>>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("qualified_name", &self.qualified_name)
            .field("aliases", &self.aliases)
            .field("root_aliases", &self.root_aliases)
            .field("hidden", &self.hidden)
            .field("subcommands", &self.subcommands.len())
            .finish()
    }
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            qualified_name: name.clone(),
            name,
            description: None,
            aliases: Vec::new(),
            root_aliases: Vec::new(),
            usage: None,
            hidden: false,
            enabled: true,
            checks: Vec::new(),
            before_invoke: Vec::new(),
            handler: None,
            subcommands: Vec::new(),
        }
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_root_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.root_aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn with_check(mut self, check: impl Check + 'static) -> Self {
        self.checks.push(Arc::new(check));
        self
    }

    pub fn with_before_invoke(mut self, hook: impl Check + 'static) -> Self {
        self.before_invoke.push(Arc::new(hook));
        self
    }

    pub fn with_handler<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Context, Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), CommandError>> + Send + 'static,
    {
        self.handler = Some(Arc::new(move |ctx, args| Box::pin(handler(ctx, args))));
        self
    }

    pub fn with_subcommand(mut self, mut command: Command) -> Self {
        command.set_parent(&self.qualified_name);
        self.subcommands.push(Arc::new(command));
        self
    }

    fn set_parent(&mut self, parent: &str) {
        self.qualified_name = format!("{parent} {}", self.name);
        let qualified = self.qualified_name.clone();
        for sub in &mut self.subcommands {
            Arc::make_mut(sub).set_parent(&qualified);
        }
    }

    pub fn is_group(&self) -> bool {
        !self.subcommands.is_empty()
    }

    pub fn matches(&self, input: &str) -> bool {
        self.name.eq_ignore_ascii_case(input)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(input))
    }

    pub fn subcommand(&self, input: &str) -> Option<&Arc<Command>> {
        self.subcommands.iter().find(|c| c.matches(input))
    }

    /// Name of the top-level command this one belongs to.
    pub fn root_parent(&self) -> &str {
        self.qualified_name
            .split_whitespace()
            .next()
            .unwrap_or(&self.name)
    }
}

/// Base command table: top-level names and aliases mapped to commands.
/// Keys are stored lower-cased so lookups are case-insensitive.
#[derive(Default)]
pub struct CommandRegistry {
    all_commands: HashMap<String, Arc<Command>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command under its name and aliases. Nothing is inserted
    /// when any of them is already taken.
    pub fn add_command(&mut self, command: Arc<Command>) -> Result<(), RegistrationError> {
        let name = command.name.to_lowercase();
        if self.all_commands.contains_key(&name) {
            return Err(RegistrationError::new(&command.name, false));
        }

        let mut aliases: Vec<String> = Vec::with_capacity(command.aliases.len());
        for alias in &command.aliases {
            let alias = alias.to_lowercase();
            if alias == name || self.all_commands.contains_key(&alias) || aliases.contains(&alias) {
                return Err(RegistrationError::new(&alias, true));
            }
            aliases.push(alias);
        }

        for alias in aliases {
            self.all_commands.insert(alias, Arc::clone(&command));
        }
        self.all_commands.insert(name, command);
        Ok(())
    }

    /// Remove a name. Removing a command by its name drops its aliases too;
    /// removing an alias only drops that alias.
    pub fn remove_command(&mut self, name: &str) -> Option<Arc<Command>> {
        let key = name.to_lowercase();
        let command = self.all_commands.remove(&key)?;

        // An alias or root alias entry: only the entry itself goes.
        if !command.qualified_name.eq_ignore_ascii_case(&key) {
            return Some(command);
        }

        for alias in &command.aliases {
            let alias = alias.to_lowercase();
            if self
                .all_commands
                .get(&alias)
                .is_some_and(|c| Arc::ptr_eq(c, &command))
            {
                self.all_commands.remove(&alias);
            }
        }
        Some(command)
    }

    /// Index every root alias declared by `command` or its subcommands.
    /// All aliases are validated before any of them is inserted.
    pub fn add_root_aliases(&mut self, command: &Arc<Command>) -> Result<(), RegistrationError> {
        let mut pending: Vec<(String, Arc<Command>)> = Vec::new();
        collect_root_aliases(command, &mut pending);

        for (index, (alias, _)) in pending.iter().enumerate() {
            let duplicated = pending[..index].iter().any(|(seen, _)| seen == alias);
            if duplicated || self.all_commands.contains_key(alias) {
                return Err(RegistrationError::new(alias, true));
            }
        }

        for (alias, target) in pending {
            self.all_commands.insert(alias, target);
        }
        Ok(())
    }

    /// Drop every root alias declared by `command` or its subcommands that
    /// still points at the declaring command.
    pub fn remove_root_aliases(&mut self, command: &Arc<Command>) {
        let mut declared: Vec<(String, Arc<Command>)> = Vec::new();
        collect_root_aliases(command, &mut declared);

        for (alias, target) in declared {
            if self
                .all_commands
                .get(&alias)
                .is_some_and(|c| Arc::ptr_eq(c, &target))
            {
                self.all_commands.remove(&alias);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<Command>> {
        self.all_commands.get(&name.to_lowercase()).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.all_commands.contains_key(&name.to_lowercase())
    }

    /// Resolve a space separated qualified name, e.g. `"tags get"`.
    pub fn get_command(&self, qualified: &str) -> Option<Arc<Command>> {
        let mut parts = qualified.split_whitespace();
        let mut command = self.get(parts.next()?)?;
        for part in parts {
            command = Arc::clone(command.subcommand(part)?);
        }
        Some(command)
    }

    /// Groups enclosing `command`, outermost first.
    pub fn ancestors(&self, command: &Command) -> Vec<Arc<Command>> {
        let parts: Vec<&str> = command.qualified_name.split_whitespace().collect();
        let mut chain = Vec::new();
        let Some((_, parents)) = parts.split_last() else {
            return chain;
        };

        let mut current: Option<Arc<Command>> = None;
        for part in parents {
            current = match current {
                None => self.get(part),
                Some(group) => group.subcommand(part).cloned(),
            };
            match &current {
                Some(group) => chain.push(Arc::clone(group)),
                None => break,
            }
        }
        chain
    }

    /// Distinct top-level commands, sorted by name.
    pub fn commands(&self) -> Vec<Arc<Command>> {
        let mut unique: Vec<Arc<Command>> = Vec::new();
        for command in self.all_commands.values() {
            if !unique.iter().any(|c| Arc::ptr_eq(c, command)) {
                unique.push(Arc::clone(command));
            }
        }
        unique.sort_by(|a, b| a.qualified_name.cmp(&b.qualified_name));
        unique
    }

    /// Every distinct command including subcommands, depth-first.
    pub fn walk_commands(&self) -> Vec<Arc<Command>> {
        let mut walked: Vec<Arc<Command>> = Vec::new();
        for command in self.commands() {
            walk(&command, &mut walked);
        }
        walked
    }

    pub fn len(&self) -> usize {
        self.all_commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all_commands.is_empty()
    }
}

fn collect_root_aliases(command: &Arc<Command>, out: &mut Vec<(String, Arc<Command>)>) {
    for sub in &command.subcommands {
        collect_root_aliases(sub, out);
    }
    for alias in &command.root_aliases {
        out.push((alias.to_lowercase(), Arc::clone(command)));
    }
}

fn walk(command: &Arc<Command>, out: &mut Vec<Arc<Command>>) {
    if out.iter().any(|c| Arc::ptr_eq(c, command)) {
        return;
    }
    out.push(Arc::clone(command));
    let mut subs = command.subcommands.clone();
    subs.sort_by(|a, b| a.name.cmp(&b.name));
    for sub in &subs {
        walk(sub, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group() -> Arc<Command> {
        Arc::new(
            Command::new("tags")
                .with_aliases(["tag", "t"])
                .with_subcommand(Command::new("get").with_root_aliases(["tag-get"]))
                .with_subcommand(Command::new("list").hidden()),
        )
    }

    #[test]
    fn test_subcommands_get_qualified_names() {
        let nested = Command::new("outer")
            .with_subcommand(Command::new("inner").with_subcommand(Command::new("leaf")));
        let inner = nested.subcommand("inner").unwrap();
        assert_eq!(inner.qualified_name, "outer inner");
        assert_eq!(inner.subcommands[0].qualified_name, "outer inner leaf");
        assert_eq!(inner.subcommands[0].root_parent(), "outer");
    }

    #[test]
    fn test_add_command_rejects_taken_alias() {
        let mut registry = CommandRegistry::new();
        registry.add_command(Arc::new(Command::new("t"))).unwrap();

        let err = registry.add_command(group()).unwrap_err();
        assert!(err.alias_conflict);
        assert!(!registry.contains("tags"));
        assert!(!registry.contains("tag"));
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let mut registry = CommandRegistry::new();
        registry.add_command(group()).unwrap();
        assert!(registry.get("TAGS").is_some());
        assert_eq!(
            registry.get_command("Tag GET").map(|c| c.qualified_name.clone()),
            Some("tags get".to_string())
        );
    }

    #[test]
    fn test_root_aliases_point_at_subcommand() {
        let mut registry = CommandRegistry::new();
        let tags = group();
        registry.add_command(Arc::clone(&tags)).unwrap();
        registry.add_root_aliases(&tags).unwrap();

        let target = registry.get("tag-get").unwrap();
        assert_eq!(target.qualified_name, "tags get");
        assert_eq!(registry.ancestors(&target).len(), 1);
    }

    #[test]
    fn test_remove_alias_keeps_command() {
        let mut registry = CommandRegistry::new();
        registry.add_command(group()).unwrap();

        let removed = registry.remove_command("t").unwrap();
        assert_eq!(removed.name, "tags");
        assert!(registry.contains("tags"));
        assert!(registry.contains("tag"));
        assert!(!registry.contains("t"));
    }

    #[test]
    fn test_walk_commands_visits_each_command_once() {
        let mut registry = CommandRegistry::new();
        let tags = group();
        registry.add_command(Arc::clone(&tags)).unwrap();
        registry.add_root_aliases(&tags).unwrap();
        registry.add_command(Arc::new(Command::new("help"))).unwrap();

        let names: Vec<String> = registry
            .walk_commands()
            .iter()
            .map(|c| c.qualified_name.clone())
            .collect();
        assert_eq!(names, vec!["help", "tags", "tags get", "tags list"]);
    }
}
