//! Readiness tracking for the two guilds the bot serves

use tokio::sync::watch;

use crate::domain::entities::{GuildId, GuildSnapshot};

/// Which configured guild a readiness flag belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuildKey {
    Private,
    Public,
}

/// Outcome of a guild becoming available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    /// Not one of the configured guilds.
    Ignored,
    /// Configured, but the cache has no roles, members or channels yet.
    CacheEmpty,
    Set,
}

/// One readiness flag per configured guild.
pub struct GuildAvailability {
    private_id: GuildId,
    public_id: GuildId,
    private: watch::Sender<bool>,
    public: watch::Sender<bool>,
}

impl GuildAvailability {
    pub fn new(private_id: GuildId, public_id: GuildId) -> Self {
        let (private, _) = watch::channel(false);
        let (public, _) = watch::channel(false);
        Self {
            private_id,
            public_id,
            private,
            public,
        }
    }

    pub fn guild_id(&self, key: GuildKey) -> GuildId {
        match key {
            GuildKey::Private => self.private_id,
            GuildKey::Public => self.public_id,
        }
    }

    fn flag(&self, key: GuildKey) -> &watch::Sender<bool> {
        match key {
            GuildKey::Private => &self.private,
            GuildKey::Public => &self.public,
        }
    }

    /// Keys configured for `guild_id`; both when the two ids coincide.
    pub fn keys_for(&self, guild_id: GuildId) -> Vec<GuildKey> {
        [GuildKey::Private, GuildKey::Public]
            .into_iter()
            .filter(|key| self.guild_id(*key) == guild_id)
            .collect()
    }

    pub fn on_guild_available(&self, guild: &GuildSnapshot) -> Availability {
        let keys = self.keys_for(guild.id);
        if keys.is_empty() {
            return Availability::Ignored;
        }

        if !guild.is_cache_populated() {
            tracing::warn!(
                "Guild available event was dispatched but the cache appears to still be empty! \
                 guild={} roles={} members={} channels={}",
                guild.id,
                guild.role_count,
                guild.member_count,
                guild.channels.len()
            );
            return Availability::CacheEmpty;
        }

        for key in keys {
            self.flag(key).send_replace(true);
            tracing::debug!("Guild {} ({:?}) is available", guild.id, key);
        }
        Availability::Set
    }

    /// Clear the flags of `guild_id`. Returns whether anything was cleared.
    pub fn on_guild_unavailable(&self, guild_id: GuildId) -> bool {
        let keys = self.keys_for(guild_id);
        for key in &keys {
            self.flag(*key).send_replace(false);
            tracing::info!("Guild {} ({:?}) became unavailable", guild_id, key);
        }
        !keys.is_empty()
    }

    pub fn is_available(&self, key: GuildKey) -> bool {
        *self.flag(key).borrow()
    }

    /// Wait for one guild, or for both when `key` is `None`.
    pub async fn wait(&self, key: Option<GuildKey>) {
        let keys = match key {
            Some(key) => vec![key],
            None => vec![GuildKey::Private, GuildKey::Public],
        };

        for key in keys {
            let mut rx = self.flag(key).subscribe();
            // The sender lives as long as `self`, so this only returns once set.
            let _ = rx.wait_for(|available| *available).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{ChannelKind, ChannelRef};
    use std::sync::Arc;
    use std::time::Duration;

    fn populated(id: u64) -> GuildSnapshot {
        let mut guild = GuildSnapshot::new(id, "guild");
        guild.role_count = 1;
        guild.member_count = 1;
        guild.channels = vec![ChannelRef::new(10u64, "general", ChannelKind::Text)];
        guild
    }

    #[test]
    fn test_unconfigured_guild_is_ignored() {
        let gate = GuildAvailability::new(GuildId(1), GuildId(2));
        assert_eq!(gate.on_guild_available(&populated(3)), Availability::Ignored);
    }

    #[test]
    fn test_empty_cache_leaves_flag_unset() {
        let gate = GuildAvailability::new(GuildId(1), GuildId(2));
        let mut guild = populated(1);
        guild.member_count = 0;

        assert_eq!(gate.on_guild_available(&guild), Availability::CacheEmpty);
        assert!(!gate.is_available(GuildKey::Private));
    }

    #[test]
    fn test_same_id_sets_both_flags() {
        let gate = GuildAvailability::new(GuildId(5), GuildId(5));
        assert_eq!(gate.on_guild_available(&populated(5)), Availability::Set);
        assert!(gate.is_available(GuildKey::Private));
        assert!(gate.is_available(GuildKey::Public));

        assert!(gate.on_guild_unavailable(GuildId(5)));
        assert!(!gate.is_available(GuildKey::Public));
    }

    #[tokio::test]
    async fn test_wait_for_both_guilds() {
        let gate = Arc::new(GuildAvailability::new(GuildId(1), GuildId(2)));
        let waiter = {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move { gate.wait(None).await })
        };

        gate.on_guild_available(&populated(1));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        gate.on_guild_available(&populated(2));
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("gate opened")
            .unwrap();
    }
}
