//! Domain Ports (DDD Port/Adapter Pattern)
//!
//! The pipeline never touches the filesystem directly. It sees containers
//! as named collections of byte blobs through the [`ShardStore`] port, and
//! adapters provide the concrete backends.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Domain Layer                           │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │                    Ports (Traits)                   │    │
//! │  │                     ShardStore                      │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Infrastructure Layer                      │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │                  Adapters (Impls)                   │    │
//! │  │        FsShardStore │ InMemoryShardStore            │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use bytes::Bytes;

use crate::error::Result;

// =============================================================================
// Port Traits
// =============================================================================

/// Port for container storage.
///
/// A container is a flat namespace of blobs (`spec`, `d1`, `c2`, ...).
/// Implementations must make a single `write` replace the previous blob as
/// a whole.
pub trait ShardStore {
    /// Create an empty container.
    ///
    /// Fails with [`Error::ContainerExists`](crate::Error::ContainerExists)
    /// if anything already exists under that name.
    fn create_container(&self, container: &str) -> Result<()>;

    /// Whether the container exists.
    fn container_exists(&self, container: &str) -> Result<bool>;

    /// Names of all blobs in the container, in no particular order.
    fn list(&self, container: &str) -> Result<Vec<String>>;

    /// Read a blob, `None` if it does not exist.
    fn read(&self, container: &str, name: &str) -> Result<Option<Bytes>>;

    /// Write a blob, replacing any previous contents.
    fn write(&self, container: &str, name: &str, data: &[u8]) -> Result<()>;
}

impl<S: ShardStore + ?Sized> ShardStore for &S {
    fn create_container(&self, container: &str) -> Result<()> {
        (**self).create_container(container)
    }

    fn container_exists(&self, container: &str) -> Result<bool> {
        (**self).container_exists(container)
    }

    fn list(&self, container: &str) -> Result<Vec<String>> {
        (**self).list(container)
    }

    fn read(&self, container: &str, name: &str) -> Result<Option<Bytes>> {
        (**self).read(container, name)
    }

    fn write(&self, container: &str, name: &str, data: &[u8]) -> Result<()> {
        (**self).write(container, name, data)
    }
}
