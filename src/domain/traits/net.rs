use async_trait::async_trait;

/// A network resource owned by the bot session that has to be closed
/// explicitly, in order, during shutdown.
#[async_trait]
pub trait NetResource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn close(&self);
}
