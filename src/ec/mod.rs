//! Erasure Coding Module
//!
//! Cauchy Reed-Solomon coding over GF(2^w), executed as XOR schedules on
//! packet-sized slices of each shard.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Erasure Coding Module                            │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌──────────────┐    ┌──────────────┐    ┌───────────────────────────┐  │
//! │  │   Galois     │───▶│   Cauchy     │───▶│   Encoding Spec           │  │
//! │  │   GF(2^w)    │    │   Bitmatrix  │    │   (k, m, w, width, pad)   │  │
//! │  └──────────────┘    └──────────────┘    └───────────────────────────┘  │
//! │                                                       │                 │
//! │                   ┌───────────────────┐    ┌──────────┴────────────┐    │
//! │                   │   Shard Codec     │◀───│   Schedule Compiler   │    │
//! │                   │  encode / decode  │    │   (smart XOR plans)   │    │
//! │                   └───────────────────┘    └───────────────────────┘    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - **Galois** (`galois.rs`): field arithmetic and element bit-matrices
//! - **Bitmatrix** (`bitmatrix.rs`): dense GF(2) matrices, inversion
//! - **Cauchy** (`cauchy.rs`): improved Cauchy coding matrix
//! - **Spec** (`spec.rs`): parameter derivation and the immutable spec
//! - **Schedule** (`schedule.rs`): bit-matrix to copy/XOR operation lists
//! - **Codec** (`codec.rs`): runs schedules over shard buffers
//!
//! # Usage
//!
//! ```rust,ignore
//! use cauchy_shard::domain::ErasureSet;
//! use cauchy_shard::ec::{EncodingSpec, ShardCodec};
//!
//! let spec = EncodingSpec::for_file_size(100, 4, 2)?;
//! let codec = ShardCodec::new(&spec)?;
//! let coding = codec.encode(&data_shards)?;
//!
//! // lose d1 and c2, rebuild them
//! let erasures = ErasureSet::new([0, 5], spec.total_shards())?;
//! let repaired = codec.decode(&shards, &erasures)?;
//! ```

pub mod bitmatrix;
pub mod cauchy;
pub mod codec;
pub mod galois;
pub mod schedule;
pub mod spec;

#[cfg(test)]
mod proptest;

pub use bitmatrix::BitMatrix;
pub use codec::{RepairedShard, ShardCodec};
pub use galois::GaloisField;
pub use schedule::{Schedule, ScheduleCompiler};
pub use spec::{EncodingParams, EncodingSpec, SpecCalculator, MAX_K, WORD_BYTES};
