use std::fmt;

use super::{RoleId, UserId};

/// Represents a user in the system
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub global_name: Option<String>,
    pub is_bot: bool,
}

impl User {
    pub fn new(id: impl Into<UserId>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            global_name: None,
            is_bot: false,
        }
    }

    pub fn with_global_name(mut self, name: impl Into<String>) -> Self {
        self.global_name = Some(name.into());
        self
    }

    pub fn bot(mut self) -> Self {
        self.is_bot = true;
        self
    }

    pub fn display_name(&self) -> &str {
        self.global_name.as_deref().unwrap_or(&self.username)
    }

    pub fn mention(&self) -> String {
        self.id.mention()
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.username)
    }
}

/// The author of a message. `roles` is only present when the message was
/// sent inside a guild, i.e. the author is a guild member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub user: User,
    pub roles: Option<Vec<RoleId>>,
}

impl Author {
    pub fn member(user: User, roles: Vec<RoleId>) -> Self {
        Self {
            user,
            roles: Some(roles),
        }
    }

    pub fn direct(user: User) -> Self {
        Self { user, roles: None }
    }

    pub fn is_member(&self) -> bool {
        self.roles.is_some()
    }

    pub fn has_role(&self, role: RoleId) -> bool {
        self.roles.as_ref().is_some_and(|roles| roles.contains(&role))
    }

    pub fn has_any_role(&self, roles: &[RoleId]) -> bool {
        roles.iter().any(|role| self.has_role(*role))
    }
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.user.fmt(f)
    }
}
