//! Message parser - Splits raw message content into prefix, command name and arguments

use crate::domain::entities::UserId;

/// A message that starts with one of the bot's prefixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedInvocation {
    pub prefix: String,
    /// The word right after the prefix, as typed. Empty when nothing follows.
    pub invoked_with: String,
    /// Everything after the invoked word, with leading whitespace removed.
    pub rest: String,
}

/// Recognises commands addressed to the bot: either mentioning it or
/// starting with the configured prefix.
#[derive(Debug, Clone)]
pub struct MessageParser {
    command_prefix: String,
}

impl MessageParser {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            command_prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.command_prefix
    }

    fn prefixes(&self, bot_id: Option<UserId>) -> Vec<String> {
        let mut prefixes = Vec::with_capacity(3);
        if let Some(id) = bot_id {
            prefixes.push(format!("<@{id}> "));
            prefixes.push(format!("<@!{id}> "));
        }
        prefixes.push(self.command_prefix.clone());
        prefixes
    }

    /// Parse `content`, returning `None` when it is not addressed to the bot.
    pub fn parse(&self, content: &str, bot_id: Option<UserId>) -> Option<ParsedInvocation> {
        let prefix = self
            .prefixes(bot_id)
            .into_iter()
            .find(|p| !p.is_empty() && content.starts_with(p.as_str()))?;

        let remainder = content[prefix.len()..].trim_start();
        let split = remainder
            .find(char::is_whitespace)
            .unwrap_or(remainder.len());
        let (invoked_with, rest) = remainder.split_at(split);

        Some(ParsedInvocation {
            prefix,
            invoked_with: invoked_with.to_string(),
            rest: rest.trim_start().to_string(),
        })
    }

    /// Split a leading word off `rest`, returning `(word, remainder)`.
    pub fn split_word(rest: &str) -> Option<(&str, &str)> {
        let rest = rest.trim_start();
        if rest.is_empty() {
            return None;
        }
        let split = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let (word, remainder) = rest.split_at(split);
        Some((word, remainder.trim_start()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_prefix_command() {
        let parser = MessageParser::new("!");
        let parsed = parser.parse("!tags get   python", None).unwrap();
        assert_eq!(parsed.prefix, "!");
        assert_eq!(parsed.invoked_with, "tags");
        assert_eq!(parsed.rest, "get   python");
    }

    #[test]
    fn test_parse_mention_prefix() {
        let parser = MessageParser::new("!");
        let bot = Some(UserId(99));
        let parsed = parser.parse("<@!99> help me", bot).unwrap();
        assert_eq!(parsed.prefix, "<@!99> ");
        assert_eq!(parsed.invoked_with, "help");
        assert_eq!(parsed.rest, "me");
    }

    #[test]
    fn test_parse_ignores_plain_text() {
        let parser = MessageParser::new("!");
        assert!(parser.parse("hello there", Some(UserId(1))).is_none());
    }

    #[test]
    fn test_parse_prefix_only() {
        let parser = MessageParser::new("!");
        let parsed = parser.parse("!", None).unwrap();
        assert!(parsed.invoked_with.is_empty());
        assert!(parsed.rest.is_empty());
    }

    #[test]
    fn test_codeblock_stays_attached_to_name() {
        let parser = MessageParser::new("!");
        let parsed = parser.parse("!eval```py\nprint(1)```", None).unwrap();
        assert_eq!(parsed.invoked_with, "eval```py");
    }
}
