use std::sync::Arc;

use redis::aio::ConnectionManager;
use redis::{cmd, Client, RedisError};
use tokio::sync::RwLock;

#[derive(Clone)]
pub(crate) struct RedisHandle {
    url: String,
    manager: Arc<RwLock<Option<ConnectionManager>>>,
}

impl RedisHandle {
    pub(crate) fn new(url: String) -> Self {
        Self { url, manager: Arc::new(RwLock::new(None)) }
    }

    pub(crate) async fn connect(&self) -> Result<(), RedisError> {
        let client = Client::open(self.url.clone())?;
        let manager = ConnectionManager::new(client).await?;
        let mut guard = self.manager.write().await;
        *guard = Some(manager);
        Ok(())
    }

    pub(crate) async fn disconnect(&self) {
        let mut guard = self.manager.write().await;
        *guard = None;
    }

    pub(crate) async fn is_connected(&self) -> bool {
        self.manager.read().await.is_some()
    }

    /// Clones the manager out so no lock is held while a command is in flight.
    async fn connection(&self) -> Result<ConnectionManager, RedisError> {
        let manager = { self.manager.read().await.clone() };
        manager.ok_or_else(|| {
            RedisError::from((redis::ErrorKind::IoError, "redis connection is not established"))
        })
    }

    pub(crate) async fn get_string(&self, key: &str) -> Result<Option<String>, RedisError> {
        let mut manager = self.connection().await?;
        let value = cmd("GET").arg(key).query_async::<_, Option<String>>(&mut manager).await?;
        Ok(value)
    }

    pub(crate) async fn set_string(&self, key: &str, value: &str) -> Result<(), RedisError> {
        let mut manager = self.connection().await?;
        cmd("SET").arg(key).arg(value).query_async::<_, ()>(&mut manager).await?;
        Ok(())
    }

    pub(crate) async fn delete(&self, key: &str) -> Result<(), RedisError> {
        let mut manager = self.connection().await?;
        cmd("DEL").arg(key).query_async::<_, ()>(&mut manager).await?;
        Ok(())
    }
}
