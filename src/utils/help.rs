//! Help embeds for commands

use crate::domain::entities::{colours, Command, Embed};

fn usage_line(prefix: &str, command: &Command) -> String {
    match &command.usage {
        Some(usage) => format!("{prefix}{} {usage}", command.qualified_name),
        None => format!("{prefix}{}", command.qualified_name),
    }
}

/// Full help for one command: usage, description, aliases and subcommands.
pub fn command_embed(prefix: &str, command: &Command) -> Embed {
    let mut description = format!("```\n{}\n```\n", usage_line(prefix, command));
    description.push_str(&format!(
        "*{}*\n",
        command.description.as_deref().unwrap_or("No details provided")
    ));

    // Aliases of a subcommand are only reachable through its parent.
    let parent = command
        .qualified_name
        .rsplit_once(' ')
        .map(|(parent, _)| format!("{parent} "))
        .unwrap_or_default();
    let mut aliases: Vec<String> = command
        .aliases
        .iter()
        .map(|alias| format!("`{parent}{alias}`"))
        .collect();
    aliases.extend(command.root_aliases.iter().map(|alias| format!("`{alias}`")));
    if !aliases.is_empty() {
        description.push_str(&format!("\n**Can also use:** {}\n", aliases.join(", ")));
    }

    let visible: Vec<&Command> = command
        .subcommands
        .iter()
        .map(|sub| sub.as_ref())
        .filter(|sub| !sub.hidden)
        .collect();
    if !visible.is_empty() {
        description.push_str("\n**Subcommands:**\n");
        for sub in visible {
            description.push_str(&format!("`{}`\n", usage_line(prefix, sub)));
            if let Some(desc) = &sub.description {
                description.push_str(&format!("*{desc}*\n"));
            }
        }
    }

    Embed::new()
        .title("Command Help")
        .description(description.trim_end())
        .colour(colours::BLUE)
}

/// Overview of every visible top-level command.
pub fn overview_embed<'a, I>(prefix: &str, commands: I) -> Embed
where
    I: IntoIterator<Item = &'a Command>,
{
    let lines: Vec<String> = commands
        .into_iter()
        .filter(|command| !command.hidden)
        .map(|command| {
            format!(
                "**`{}`**\n*{}*",
                usage_line(prefix, command),
                command.description.as_deref().unwrap_or("No details provided")
            )
        })
        .collect();

    let description = if lines.is_empty() {
        "No commands available.".to_string()
    } else {
        lines.join("\n")
    };

    Embed::new()
        .title("Command Help")
        .description(description)
        .colour(colours::BLUE)
        .footer(format!("Use {prefix}help <command> for more info on a command."))
}
