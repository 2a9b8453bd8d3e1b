//! cauchy-shard - Cauchy Reed-Solomon file sharding
//!
//! Splits a file into `k` equally sized data shards plus `m` coding shards
//! stored in a container, such that the file survives the loss of any `m`
//! shards. Coding runs over GF(2^w) using an improved Cauchy matrix,
//! expanded to a bit-matrix and executed as XOR schedules on packets.
//!
//! # Architecture
//!
//! ```text
//! pipeline (encode / decode / restore / status)
//!     │
//!     ├── store    (spec record, container scan)
//!     │     └── domain::ShardStore ◀── adapters (filesystem, memory)
//!     └── ec       (galois → cauchy → spec → schedule → codec)
//! ```
//!
//! # Modules
//!
//! - [`adapters`] - Storage backends implementing domain ports
//! - [`domain`] - Shard identifiers, erasure sets and port traits
//! - [`ec`] - Erasure coding engine
//! - [`error`] - Error types
//! - [`pipeline`] - Container operations
//! - [`store`] - Spec record layout and container access

pub mod adapters;
pub mod domain;
pub mod ec;
pub mod error;
pub mod pipeline;
pub mod store;

// Re-export commonly used types
pub use ec::{EncodingSpec, ShardCodec};
pub use error::{Error, Result};
pub use pipeline::{decode, encode, encode_file, restore, status};
