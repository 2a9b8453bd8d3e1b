//! Domain Layer
//!
//! Value objects and port traits shared by the codec, the container layer
//! and the storage adapters.
//!
//! # Architecture
//!
//! - **Shard** (`shard.rs`) - Shard identifiers, roles and erasure sets
//! - **Ports** (`ports.rs`) - Trait abstractions over container storage
//!
//! # Usage
//!
//! ```ignore
//! use cauchy_shard::domain::{ErasureSet, ShardId, ShardStore};
//!
//! fn missing<S: ShardStore>(store: &S, container: &str, k: usize) -> Result<Vec<ShardId>> {
//!     let names = store.list(container)?;
//!     // ...
//! }
//! ```

pub mod ports;
pub mod shard;

pub use ports::ShardStore;
pub use shard::{ErasureSet, ShardId, ShardRole, MAX_SHARD_INDEX};
