//! Container Persistence
//!
//! - **Spec Record** (`spec_record.rs`): binary layout of the `spec` blob
//! - **Container** (`container.rs`): shard naming and presence scanning

pub mod container;
pub mod spec_record;

pub use container::{Container, PresentShards, ShardSet, SPEC_BLOB};
pub use spec_record::{decode_spec, encode_spec, SPEC_FORMAT_VERSION, SPEC_HEADER_LEN};
