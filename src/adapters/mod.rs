//! Infrastructure Adapters
//!
//! Adapter implementations for the domain ports, following the
//! Port/Adapter (Hexagonal) architecture pattern.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Domain Layer                             │
//! │  ┌────────────────────────────────────────────────────────────┐ │
//! │  │                    Ports (Traits)                          │ │
//! │  │                      ShardStore                            │ │
//! │  └────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Adapters (This Module)                      │
//! │  ┌────────────────────────────────────────────────────────────┐ │
//! │  │        FsShardStore        │      InMemoryShardStore       │ │
//! │  └────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use cauchy_shard::adapters::FsShardStore;
//! use cauchy_shard::domain::ShardStore;
//!
//! let store = FsShardStore::unrooted();
//! store.create_container("/srv/archive/report.pdf.crs")?;
//! ```

mod filesystem;
mod memory;

pub use filesystem::FsShardStore;
pub use memory::InMemoryShardStore;
