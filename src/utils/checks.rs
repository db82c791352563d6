//! Reusable command checks

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use crate::application::errors::{CheckFailure, CommandError};
use crate::application::messaging::Context;
use crate::domain::entities::{Author, Check, ChannelId, Message, RoleId, UserId};

/// Only lets a command run in whitelisted channels or categories, or for
/// members holding a whitelisted role.
#[derive(Debug, Clone, Default)]
pub struct InWhitelist {
    channels: Vec<ChannelId>,
    categories: Vec<ChannelId>,
    roles: Vec<RoleId>,
    redirect: Option<ChannelId>,
    fail_silently: bool,
}

impl InWhitelist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn channels(mut self, channels: impl IntoIterator<Item = ChannelId>) -> Self {
        self.channels.extend(channels);
        self
    }

    pub fn categories(mut self, categories: impl IntoIterator<Item = ChannelId>) -> Self {
        self.categories.extend(categories);
        self
    }

    pub fn roles(mut self, roles: impl IntoIterator<Item = RoleId>) -> Self {
        self.roles.extend(roles);
        self
    }

    /// Channel users are pointed to on failure. It is whitelisted too.
    pub fn redirect(mut self, channel: ChannelId) -> Self {
        self.redirect = Some(channel);
        if !self.channels.contains(&channel) {
            self.channels.push(channel);
        }
        self
    }

    pub fn fail_silently(mut self) -> Self {
        self.fail_silently = true;
        self
    }

    pub fn evaluate(&self, message: &Message) -> Result<bool, CheckFailure> {
        if self.channels.contains(&message.channel_id) {
            tracing::trace!("{} may run the command: whitelisted channel", message.author);
            return Ok(true);
        }

        if message
            .category_id
            .is_some_and(|category| self.categories.contains(&category))
        {
            tracing::trace!("{} may run the command: whitelisted category", message.author);
            return Ok(true);
        }

        if message.author.has_any_role(&self.roles) {
            tracing::trace!("{} may run the command: whitelisted role", message.author);
            return Ok(true);
        }

        tracing::trace!("{} may not run the command in this context", message.author);
        if self.fail_silently {
            return Ok(false);
        }
        Err(CheckFailure::InWhitelist {
            redirect: self.redirect,
        })
    }
}

#[async_trait]
impl Check for InWhitelist {
    async fn check(&self, ctx: &Context) -> Result<bool, CommandError> {
        Ok(self.evaluate(&ctx.message)?)
    }
}

/// True when the author holds any of `roles`. Always false outside a guild.
pub fn has_any_role_check(author: &Author, roles: &[RoleId]) -> bool {
    author.is_member() && author.has_any_role(roles)
}

/// True when the author holds none of `roles`. Always false outside a guild.
pub fn has_no_roles_check(author: &Author, roles: &[RoleId]) -> bool {
    author.is_member() && !author.has_any_role(roles)
}

/// Requires the author to hold at least one of the roles.
#[derive(Debug, Clone)]
pub struct HasAnyRole(pub Vec<RoleId>);

#[async_trait]
impl Check for HasAnyRole {
    async fn check(&self, ctx: &Context) -> Result<bool, CommandError> {
        let author = ctx.author();
        if !author.is_member() {
            return Err(CheckFailure::NoPrivateMessage.into());
        }
        if author.has_any_role(&self.0) {
            Ok(true)
        } else {
            Err(CheckFailure::MissingAnyRole.into())
        }
    }
}

/// Per-user cooldown that members with a bypass role skip. Meant to be a
/// before-invoke hook so that bad input does not use up a slot.
pub struct CooldownWithRoleBypass {
    rate: usize,
    per: Duration,
    bypass: HashSet<RoleId>,
    buckets: Mutex<HashMap<UserId, Vec<Instant>>>,
}

impl CooldownWithRoleBypass {
    pub fn new(rate: usize, per: Duration, bypass_roles: impl IntoIterator<Item = RoleId>) -> Self {
        Self {
            rate,
            per,
            bypass: bypass_roles.into_iter().collect(),
            buckets: Mutex::new(HashMap::new()),
        }
    }

    pub fn update(&self, author: &Author, now: Instant) -> Result<(), CommandError> {
        let bypassed = author
            .roles
            .as_ref()
            .is_some_and(|roles| roles.iter().any(|role| self.bypass.contains(role)));
        if bypassed {
            return Ok(());
        }

        let mut buckets = self.buckets.lock();
        let uses = buckets.entry(author.user.id).or_default();
        uses.retain(|used| now.duration_since(*used) < self.per);

        if uses.len() >= self.rate {
            let retry_after = uses
                .first()
                .map(|first| self.per.saturating_sub(now.duration_since(*first)))
                .unwrap_or(self.per);
            return Err(CommandError::OnCooldown { retry_after });
        }

        uses.push(now);
        Ok(())
    }
}

#[async_trait]
impl Check for CooldownWithRoleBypass {
    async fn check(&self, ctx: &Context) -> Result<bool, CommandError> {
        self.update(ctx.author(), Instant::now())?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::User;

    fn member(roles: Vec<RoleId>) -> Author {
        Author::member(User::new(1u64, "member"), roles)
    }

    fn message(channel: u64, author: Author) -> Message {
        Message::new(1u64, channel, author, "!cmd").in_guild(9u64)
    }

    #[test]
    fn test_whitelist_channel_category_and_role() {
        let check = InWhitelist::new()
            .channels([ChannelId(10)])
            .categories([ChannelId(20)])
            .roles([RoleId(30)]);

        assert_eq!(check.evaluate(&message(10, member(vec![]))), Ok(true));
        assert_eq!(
            check.evaluate(&message(11, member(vec![])).in_category(20u64)),
            Ok(true)
        );
        assert_eq!(check.evaluate(&message(11, member(vec![RoleId(30)]))), Ok(true));
        assert_eq!(
            check.evaluate(&message(11, member(vec![]))),
            Err(CheckFailure::InWhitelist { redirect: None })
        );
    }

    #[test]
    fn test_redirect_channel_is_whitelisted() {
        let check = InWhitelist::new().redirect(ChannelId(5));
        assert_eq!(check.evaluate(&message(5, member(vec![]))), Ok(true));
        assert_eq!(
            check.evaluate(&message(6, member(vec![]))),
            Err(CheckFailure::InWhitelist {
                redirect: Some(ChannelId(5))
            })
        );
        assert_eq!(check.fail_silently().evaluate(&message(6, member(vec![]))), Ok(false));
    }

    #[test]
    fn test_role_checks_fail_outside_guild() {
        let direct = Author::direct(User::new(1u64, "dm"));
        assert!(!has_any_role_check(&direct, &[RoleId(1)]));
        assert!(!has_no_roles_check(&direct, &[RoleId(1)]));

        let author = member(vec![RoleId(1)]);
        assert!(has_any_role_check(&author, &[RoleId(1)]));
        assert!(!has_no_roles_check(&author, &[RoleId(1)]));
        assert!(has_no_roles_check(&author, &[RoleId(2)]));
    }

    #[test]
    fn test_cooldown_with_bypass() {
        let cooldown = CooldownWithRoleBypass::new(2, Duration::from_secs(60), [RoleId(99)]);
        let now = Instant::now();
        let author = member(vec![]);

        assert!(cooldown.update(&author, now).is_ok());
        assert!(cooldown.update(&author, now).is_ok());
        match cooldown.update(&author, now + Duration::from_secs(10)) {
            Err(CommandError::OnCooldown { retry_after }) => {
                assert_eq!(retry_after, Duration::from_secs(50))
            }
            other => panic!("expected cooldown, got {other:?}"),
        }
        assert!(cooldown.update(&author, now + Duration::from_secs(61)).is_ok());

        let staff = member(vec![RoleId(99)]);
        for _ in 0..5 {
            assert!(cooldown.update(&staff, now).is_ok());
        }
    }
}
