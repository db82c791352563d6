//! Argument tokenizer and typed accessors for command handlers

use std::collections::VecDeque;
use std::str::FromStr;

use crate::application::errors::CommandError;

/// Remaining arguments of a command invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Args {
    tokens: VecDeque<String>,
}

impl Args {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    /// Tokenize on whitespace, honouring double quotes.
    pub fn parse(input: &str) -> Result<Self, CommandError> {
        let mut tokens = VecDeque::new();
        let mut current = String::new();
        let mut in_quotes = false;
        let mut quoted = false;
        let mut chars = input.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '\\' if in_quotes && chars.peek() == Some(&'"') => {
                    current.push('"');
                    chars.next();
                }
                '"' if in_quotes => {
                    in_quotes = false;
                    if chars.peek().is_some_and(|next| !next.is_whitespace()) {
                        return Err(CommandError::ArgumentParsing(
                            "Expected space after closing quotation".into(),
                        ));
                    }
                }
                '"' if current.is_empty() && !quoted => {
                    in_quotes = true;
                    quoted = true;
                }
                c if c.is_whitespace() && !in_quotes => {
                    if !current.is_empty() || quoted {
                        tokens.push_back(std::mem::take(&mut current));
                    }
                    quoted = false;
                }
                c => current.push(c),
            }
        }

        if in_quotes {
            return Err(CommandError::ArgumentParsing(
                "Expected closing \".".into(),
            ));
        }
        if !current.is_empty() || quoted {
            tokens.push_back(current);
        }
        Ok(Self { tokens })
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn peek(&self) -> Option<&str> {
        self.tokens.front().map(String::as_str)
    }

    pub fn next_raw(&mut self) -> Option<String> {
        self.tokens.pop_front()
    }

    /// Take and convert the next argument, failing when it is absent.
    pub fn required<T: FromStr>(&mut self, param: &str) -> Result<T, CommandError> {
        let raw = self
            .tokens
            .pop_front()
            .ok_or_else(|| CommandError::MissingRequiredArgument {
                param: param.to_string(),
            })?;
        convert(&raw, param)
    }

    /// Take and convert the next argument if there is one.
    pub fn optional<T: FromStr>(&mut self, param: &str) -> Result<Option<T>, CommandError> {
        match self.tokens.pop_front() {
            Some(raw) => convert(&raw, param).map(Some),
            None => Ok(None),
        }
    }

    /// Consume everything that is left as a single space-joined string.
    pub fn rest(&mut self) -> Option<String> {
        if self.tokens.is_empty() {
            return None;
        }
        Some(self.tokens.drain(..).collect::<Vec<_>>().join(" "))
    }

    /// Fail if arguments remain unconsumed.
    pub fn finish(&self, command: &str) -> Result<(), CommandError> {
        if self.tokens.is_empty() {
            Ok(())
        } else {
            Err(CommandError::TooManyArguments(format!(
                "Too many arguments passed to {command}"
            )))
        }
    }
}

fn convert<T: FromStr>(raw: &str, param: &str) -> Result<T, CommandError> {
    raw.parse::<T>().map_err(|_| {
        let type_name = std::any::type_name::<T>()
            .rsplit("::")
            .next()
            .unwrap_or("value");
        CommandError::BadArgument(format!(
            "Converting to \"{type_name}\" failed for parameter \"{param}\"."
        ))
    })
}
