//! Network resources owned by the bot session
//!
//! The resolver, the pooled connector built on it and the HTTP session for
//! external APIs. Each is closed explicitly on shutdown, session first.

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::application::bot::NetResources;
use crate::application::errors::BotError;
use crate::domain::traits::NetResource;

type ResolveError = Box<dyn std::error::Error + Send + Sync>;

const USER_AGENT: &str = concat!("pb-discord/", env!("CARGO_PKG_VERSION"));

/// DNS resolver that only hands out IPv4 addresses.
#[derive(Debug, Default)]
pub struct Ipv4Resolver {
    closed: Arc<AtomicBool>,
}

impl Ipv4Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

pub fn ipv4_only(addrs: impl IntoIterator<Item = SocketAddr>) -> Vec<SocketAddr> {
    addrs.into_iter().filter(SocketAddr::is_ipv4).collect()
}

impl Resolve for Ipv4Resolver {
    fn resolve(&self, name: Name) -> Resolving {
        let closed = Arc::clone(&self.closed);
        let host = format!("{}:0", name.as_str());

        Box::pin(async move {
            if closed.load(Ordering::SeqCst) {
                return Err("resolver is closed".into());
            }

            let addrs = ipv4_only(tokio::net::lookup_host(host.as_str()).await?);
            if addrs.is_empty() {
                return Err(format!("no IPv4 address found for {host}").into());
            }
            let addrs: Addrs = Box::new(addrs.into_iter());
            Ok::<_, ResolveError>(addrs)
        })
    }
}

#[async_trait]
impl NetResource for Ipv4Resolver {
    fn name(&self) -> &'static str {
        "resolver"
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

fn build_client(resolver: &Arc<Ipv4Resolver>, timeout: Option<Duration>) -> Result<reqwest::Client, BotError> {
    let mut builder = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .dns_resolver(Arc::clone(resolver));
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| BotError::Network(format!("Failed to build HTTP client: {e}")))
}

/// Pooled client shared with the Discord REST layer.
pub struct Connector {
    client: RwLock<Option<reqwest::Client>>,
}

impl Connector {
    pub fn new(resolver: &Arc<Ipv4Resolver>) -> Result<Self, BotError> {
        Ok(Self {
            client: RwLock::new(Some(build_client(resolver, None)?)),
        })
    }

    /// `None` once closed.
    pub fn client(&self) -> Option<reqwest::Client> {
        self.client.read().clone()
    }
}

#[async_trait]
impl NetResource for Connector {
    fn name(&self) -> &'static str {
        "connector"
    }

    async fn close(&self) {
        self.client.write().take();
    }
}

/// Client for external APIs such as the site API.
pub struct HttpSession {
    client: RwLock<Option<reqwest::Client>>,
}

impl HttpSession {
    pub fn new(resolver: &Arc<Ipv4Resolver>) -> Result<Self, BotError> {
        Ok(Self {
            client: RwLock::new(Some(build_client(resolver, Some(Duration::from_secs(30)))?)),
        })
    }

    pub fn client(&self) -> Result<reqwest::Client, BotError> {
        self.client
            .read()
            .clone()
            .ok_or_else(|| BotError::Network("HTTP session is closed".into()))
    }
}

#[async_trait]
impl NetResource for HttpSession {
    fn name(&self) -> &'static str {
        "http_session"
    }

    async fn close(&self) {
        self.client.write().take();
    }
}

/// The three resources created together at startup.
pub struct Network {
    pub resolver: Arc<Ipv4Resolver>,
    pub connector: Arc<Connector>,
    pub session: Arc<HttpSession>,
}

impl Network {
    pub fn new() -> Result<Self, BotError> {
        let resolver = Arc::new(Ipv4Resolver::new());
        let connector = Arc::new(Connector::new(&resolver)?);
        let session = Arc::new(HttpSession::new(&resolver)?);
        Ok(Self {
            resolver,
            connector,
            session,
        })
    }

    pub fn resources(&self) -> NetResources {
        NetResources {
            http_session: self.session.clone(),
            connector: self.connector.clone(),
            resolver: self.resolver.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn test_ipv4_only_drops_v6() {
        let v4 = SocketAddr::from((Ipv4Addr::LOCALHOST, 0));
        let v6 = SocketAddr::from((Ipv6Addr::LOCALHOST, 0));
        assert_eq!(ipv4_only([v6, v4, v6]), vec![v4]);
    }

    #[tokio::test]
    async fn test_closed_resources() {
        let network = Network::new().unwrap();
        assert!(network.connector.client().is_some());
        assert!(network.session.client().is_ok());

        network.session.close().await;
        network.connector.close().await;
        network.resolver.close().await;

        assert!(network.session.client().is_err());
        assert!(network.connector.client().is_none());
        assert!(network.resolver.is_closed());
    }
}
