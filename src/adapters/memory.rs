//! In-Memory Shard Store
//!
//! Keeps containers in a map behind a lock. Used by unit tests and by
//! callers that want to encode without touching disk.

use std::collections::HashMap;

use bytes::Bytes;
use parking_lot::RwLock;

use crate::domain::ShardStore;
use crate::error::{Error, Result};

type Container = HashMap<String, Bytes>;

/// Map-backed [`ShardStore`]
#[derive(Debug, Default)]
pub struct InMemoryShardStore {
    containers: RwLock<HashMap<String, Container>>,
}

impl InMemoryShardStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove a blob, returning whether it existed
    pub fn remove(&self, container: &str, name: &str) -> bool {
        self.containers
            .write()
            .get_mut(container)
            .map(|c| c.remove(name).is_some())
            .unwrap_or(false)
    }

    fn missing(container: &str) -> Error {
        Error::io(
            format!("accessing container {}", container),
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such container"),
        )
    }
}

impl ShardStore for InMemoryShardStore {
    fn create_container(&self, container: &str) -> Result<()> {
        let mut containers = self.containers.write();
        if containers.contains_key(container) {
            return Err(Error::ContainerExists(container.to_string()));
        }
        containers.insert(container.to_string(), HashMap::new());
        Ok(())
    }

    fn container_exists(&self, container: &str) -> Result<bool> {
        Ok(self.containers.read().contains_key(container))
    }

    fn list(&self, container: &str) -> Result<Vec<String>> {
        self.containers
            .read()
            .get(container)
            .map(|c| c.keys().cloned().collect())
            .ok_or_else(|| Self::missing(container))
    }

    fn read(&self, container: &str, name: &str) -> Result<Option<Bytes>> {
        Ok(self
            .containers
            .read()
            .get(container)
            .and_then(|c| c.get(name).cloned()))
    }

    fn write(&self, container: &str, name: &str, data: &[u8]) -> Result<()> {
        self.containers
            .write()
            .get_mut(container)
            .ok_or_else(|| Self::missing(container))?
            .insert(name.to_string(), Bytes::copy_from_slice(data));
        Ok(())
    }
}
