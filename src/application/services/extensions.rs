//! Extension discovery and load state

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::application::bot::Bot;
use crate::application::errors::BotError;

/// A loadable unit of bot functionality, addressed by a dotted name such
/// as `exts.info.tags`. Setup usually adds one or more cogs.
#[async_trait]
pub trait Extension: Send + Sync {
    fn name(&self) -> &'static str;

    async fn setup(&self, bot: &Arc<Bot>) -> Result<(), BotError>;
}

/// Progress of the background extension loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// Loading was never started.
    Idle,
    Loading,
    Loaded,
    /// The bot was closed; no loading will happen.
    Closed,
}

/// Names of every extension under `namespace`, skipping private segments
/// (those starting with `_`).
pub fn walk_extensions(catalog: &[Arc<dyn Extension>], namespace: &str) -> BTreeSet<String> {
    catalog
        .iter()
        .map(|ext| ext.name())
        .filter(|name| is_under(name, namespace))
        .filter(|name| !name.split('.').any(|segment| segment.starts_with('_')))
        .map(str::to_string)
        .collect()
}

fn is_under(name: &str, namespace: &str) -> bool {
    if namespace.is_empty() {
        return true;
    }
    name.strip_prefix(namespace)
        .is_some_and(|rest| rest.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    #[async_trait]
    impl Extension for Named {
        fn name(&self) -> &'static str {
            self.0
        }

        async fn setup(&self, _bot: &Arc<Bot>) -> Result<(), BotError> {
            Ok(())
        }
    }

    #[test]
    fn test_walk_extensions_filters_namespace_and_private() {
        let catalog: Vec<Arc<dyn Extension>> = vec![
            Arc::new(Named("exts.info.tags")),
            Arc::new(Named("exts.backend.error_handler")),
            Arc::new(Named("exts._private.hidden")),
            Arc::new(Named("exts.info._draft")),
            Arc::new(Named("extsother.thing")),
            Arc::new(Named("plugins.thing")),
        ];

        let found: Vec<String> = walk_extensions(&catalog, "exts").into_iter().collect();
        assert_eq!(found, vec!["exts.backend.error_handler", "exts.info.tags"]);

        let info = walk_extensions(&catalog, "exts.info");
        assert_eq!(info.len(), 1);
    }
}
