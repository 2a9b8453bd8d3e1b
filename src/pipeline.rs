//! Shard Pipeline
//!
//! The four container operations, wired from the codec and the container
//! layer:
//!
//! ```text
//! encode:  source ──▶ split ──▶ codec.encode ──▶ spec, d1..dk, c1..cm
//! decode:  container scan ──▶ codec.decode ──▶ write back erased shards
//! restore: container scan ──▶ (codec.decode) ──▶ d1..dk trimmed ──▶ output
//! status:  container scan ──▶ missing shards, recoverability
//! ```

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Read, Write};
use std::path::Path;

use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::domain::{ShardId, ShardStore};
use crate::ec::codec::ShardCodec;
use crate::ec::spec::{EncodingParams, EncodingSpec};
use crate::error::{Error, Result};
use crate::store::{Container, ShardSet, SPEC_FORMAT_VERSION};

// =============================================================================
// Data Layout
// =============================================================================

/// Read `file_size` bytes from `reader` into `k` zero-padded data shards
pub fn read_data_shards<R: Read>(spec: &EncodingSpec, reader: &mut R) -> Result<Vec<Vec<u8>>> {
    let width = spec.width();
    let mut remaining = spec.file_size();
    let mut shards = Vec::with_capacity(spec.k());

    for i in 0..spec.k() {
        let mut shard = vec![0u8; width];
        let n = remaining.min(width as u64) as usize;
        reader
            .read_exact(&mut shard[..n])
            .map_err(|e| Error::io(format!("reading source data for d{}", i + 1), e))?;
        remaining -= n as u64;
        shards.push(shard);
    }
    Ok(shards)
}

/// Write the data shards to `writer`, dropping the end padding
///
/// Returns the number of bytes written, always the original file size.
pub fn write_restored<W: Write, D: AsRef<[u8]>>(
    spec: &EncodingSpec,
    data: &[D],
    writer: &mut W,
) -> Result<u64> {
    if data.len() != spec.k() {
        return Err(Error::InvalidParameters(format!(
            "expected {} data shards, got {}",
            spec.k(),
            data.len()
        )));
    }
    let mut remaining = spec.file_size();
    for shard in data {
        let shard = shard.as_ref();
        let n = remaining.min(shard.len() as u64) as usize;
        writer
            .write_all(&shard[..n])
            .map_err(|e| Error::io("writing restored data", e))?;
        remaining -= n as u64;
    }
    Ok(spec.file_size() - remaining)
}

// =============================================================================
// Encode
// =============================================================================

/// Shard `file_size` bytes from `reader` into a new container
///
/// Counts are validated before anything is created. The container is
/// written in the order spec, data shards, coding shards; a failure part
/// way through leaves the partial container behind.
#[instrument(skip(store, reader))]
pub fn encode<S, R>(
    store: &S,
    container: &str,
    reader: &mut R,
    file_size: u64,
    k: u32,
    m: u32,
) -> Result<EncodingSpec>
where
    S: ShardStore + ?Sized,
    R: Read,
{
    let spec = EncodingSpec::for_file_size(file_size, k, m)?;
    let codec = ShardCodec::new(&spec)?;
    let target = Container::create(store, container)?;

    let data = read_data_shards(&spec, reader)?;
    let coding = codec.encode(&data)?;
    debug!(
        ops = codec.encoding_schedule().ops().len(),
        xors = codec.encoding_schedule().xor_count(),
        "encoding schedule"
    );

    target.write_spec(&spec)?;
    target.write_all_shards(&data, &coding)?;

    info!(
        container,
        file_size,
        k,
        m,
        w = spec.w(),
        width = spec.width(),
        end_padding = spec.end_padding(),
        "encoded file"
    );
    Ok(spec)
}

/// Shard the file at `source` into a new container
pub fn encode_file<S: ShardStore + ?Sized>(
    store: &S,
    source: &Path,
    container: &str,
    k: u32,
    m: u32,
) -> Result<EncodingSpec> {
    let mut file = File::open(source)
        .map_err(|e| Error::io(format!("opening {}", source.display()), e))?;
    let file_size = file
        .metadata()
        .map_err(|e| Error::io(format!("inspecting {}", source.display()), e))?
        .len();
    encode(store, container, &mut file, file_size, k, m)
}

// =============================================================================
// Decode
// =============================================================================

/// Rebuild every missing or damaged shard and write it back
///
/// Returns the repaired shards in row order. Nothing is written when more
/// than `m` shards are missing.
#[instrument(skip(store))]
pub fn decode<S: ShardStore + ?Sized>(store: &S, container: &str) -> Result<Vec<ShardId>> {
    let target = Container::open(store, container);
    let spec = target.read_spec()?;
    let set = target.read_shard_set(&spec)?;

    if set.erasures.is_empty() {
        info!(container, "all shards present, nothing to repair");
        return Ok(Vec::new());
    }

    let codec = ShardCodec::new(&spec)?;
    let repaired = codec.decode(&set.shards, &set.erasures)?;
    for shard in &repaired {
        target.write_shard(shard.id, &shard.data)?;
    }

    let ids: Vec<ShardId> = repaired.iter().map(|s| s.id).collect();
    info!(
        container,
        repaired = ?ids.iter().map(ToString::to_string).collect::<Vec<_>>(),
        "repaired container"
    );
    Ok(ids)
}

// =============================================================================
// Restore
// =============================================================================

/// Reassemble the original file into `writer` without modifying the container
#[instrument(skip(store, writer))]
pub fn restore_to<S, W>(store: &S, container: &str, writer: &mut W) -> Result<u64>
where
    S: ShardStore + ?Sized,
    W: Write,
{
    let target = Container::open(store, container);
    let spec = target.read_spec()?;
    let ShardSet {
        mut shards,
        erasures,
    } = target.read_shard_set(&spec)?;

    let k = spec.k();
    if erasures.rows().iter().any(|&row| row < k) {
        let codec = ShardCodec::new(&spec)?;
        for shard in codec.decode(&shards, &erasures)? {
            if shard.row < k {
                shards[shard.row] = Some(Bytes::from(shard.data));
            }
        }
    }

    let mut data = Vec::with_capacity(k);
    for (row, shard) in shards.into_iter().take(k).enumerate() {
        data.push(shard.ok_or_else(|| {
            Error::MatrixConstruction(format!("{} was not reconstructed", ShardId::from_row(row, k)))
        })?);
    }

    let written = write_restored(&spec, &data, writer)?;
    info!(container, bytes = written, "restored file");
    Ok(written)
}

/// Reassemble the original file into a new file at `output`
pub fn restore<S: ShardStore + ?Sized>(store: &S, container: &str, output: &Path) -> Result<u64> {
    // reconstruct before creating the output so a failed restore leaves nothing
    let mut buf = Vec::new();
    restore_to(store, container, &mut buf)?;

    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(output)
        .map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => {
                Error::io(format!("{} already exists", output.display()), e)
            }
            _ => Error::io(format!("creating {}", output.display()), e),
        })?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(&buf)
        .and_then(|()| writer.flush())
        .map_err(|e| Error::io(format!("writing {}", output.display()), e))?;
    Ok(buf.len() as u64)
}

// =============================================================================
// Status
// =============================================================================

/// Health summary of a container
#[derive(Debug, Clone, Serialize)]
pub struct ContainerStatus {
    pub container: String,
    pub format_version: u32,
    #[serde(flatten)]
    pub params: EncodingParams,
    pub file_size: u64,
    pub present: usize,
    pub missing: Vec<String>,
    pub recoverable: bool,
}

impl ContainerStatus {
    pub fn is_healthy(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Report which shards are missing and whether the container can be repaired
#[instrument(skip(store))]
pub fn status<S: ShardStore + ?Sized>(store: &S, container: &str) -> Result<ContainerStatus> {
    let target = Container::open(store, container);
    let spec = target.read_spec()?;
    let set = target.read_shard_set(&spec)?;

    let missing: Vec<String> = set
        .erasures
        .shard_ids(spec.k())
        .iter()
        .map(ToString::to_string)
        .collect();
    Ok(ContainerStatus {
        container: container.to_string(),
        format_version: SPEC_FORMAT_VERSION,
        params: *spec.params(),
        file_size: spec.file_size(),
        present: spec.total_shards() - missing.len(),
        recoverable: missing.len() <= spec.m(),
        missing,
    })
}
