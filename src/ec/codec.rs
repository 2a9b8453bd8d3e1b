//! Shard Codec
//!
//! Executes compiled schedules over shard buffers. Each shard of `width`
//! bytes is split into `w` packets; schedule operations copy or XOR whole
//! packets, so one pass over the schedule per `w * packet_size` chunk
//! produces every output byte.

use crate::domain::{ErasureSet, ShardId};
use crate::ec::schedule::{OpKind, Schedule, ScheduleCompiler, Source};
use crate::ec::spec::EncodingSpec;
use crate::error::{Error, Result};
use tracing::{debug, instrument};

/// A shard rebuilt by [`ShardCodec::decode`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairedShard {
    /// Codec row (0..k-1 data, k..k+m-1 coding)
    pub row: usize,
    /// Container name of the shard
    pub id: ShardId,
    /// Reconstructed contents, `width` bytes
    pub data: Vec<u8>,
}

// =============================================================================
// Shard Codec
// =============================================================================

/// Encoder/decoder bound to one encoding spec
pub struct ShardCodec<'a> {
    spec: &'a EncodingSpec,
    encoding: Schedule,
}

impl std::fmt::Debug for ShardCodec<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardCodec")
            .field("k", &self.spec.k())
            .field("m", &self.spec.m())
            .field("w", &self.spec.w())
            .field("width", &self.spec.width())
            .field("encoding_ops", &self.encoding.ops().len())
            .finish()
    }
}

impl<'a> ShardCodec<'a> {
    /// Compile the encoding schedule for `spec`
    pub fn new(spec: &'a EncodingSpec) -> Result<Self> {
        let encoding = ScheduleCompiler::compile_encoding(
            spec.bitmatrix(),
            spec.k(),
            spec.m(),
            spec.w() as usize,
        )?;
        Ok(Self { spec, encoding })
    }

    pub fn spec(&self) -> &EncodingSpec {
        self.spec
    }

    /// The compiled encoding schedule
    pub fn encoding_schedule(&self) -> &Schedule {
        &self.encoding
    }

    /// Compute the `m` coding shards for `k` data shards
    #[instrument(skip(self, data), fields(k = self.spec.k(), m = self.spec.m(), width = self.spec.width()))]
    pub fn encode<D: AsRef<[u8]>>(&self, data: &[D]) -> Result<Vec<Vec<u8>>> {
        let mut coding = vec![vec![0u8; self.spec.width()]; self.spec.m()];
        self.encode_into(data, &mut coding)?;
        Ok(coding)
    }

    /// Compute coding shards into caller-provided buffers
    ///
    /// Every buffer in `coding` must already be `width` bytes; its previous
    /// contents are overwritten.
    pub fn encode_into<D: AsRef<[u8]>>(&self, data: &[D], coding: &mut [Vec<u8>]) -> Result<()> {
        let (k, m, width) = (self.spec.k(), self.spec.m(), self.spec.width());
        if data.len() != k {
            return Err(Error::InvalidParameters(format!(
                "expected {} data shards, got {}",
                k,
                data.len()
            )));
        }
        if coding.len() != m {
            return Err(Error::InvalidParameters(format!(
                "expected {} coding buffers, got {}",
                m,
                coding.len()
            )));
        }
        for (row, shard) in data.iter().enumerate() {
            self.check_width(row, shard.as_ref().len())?;
        }
        for (i, buf) in coding.iter_mut().enumerate() {
            self.check_width(k + i, buf.len())?;
            buf.fill(0);
        }

        let inputs: Vec<&[u8]> = data.iter().map(|d| d.as_ref()).collect();
        execute(&self.encoding, &inputs, coding, self.spec.packet_size());

        debug!(bytes = k * width, "encoded data shards");
        Ok(())
    }

    /// Reconstruct the erased shards
    ///
    /// `shards` holds all `k + m` rows; entries listed in `erasures` are
    /// ignored, every other entry must be present and `width` bytes long.
    /// Only the reconstructed rows are returned.
    #[instrument(skip(self, shards), fields(erased = erasures.len()))]
    pub fn decode<S: AsRef<[u8]>>(
        &self,
        shards: &[Option<S>],
        erasures: &ErasureSet,
    ) -> Result<Vec<RepairedShard>> {
        let (k, m) = (self.spec.k(), self.spec.m());
        if erasures.len() > m {
            return Err(Error::TooManyErasures {
                erased: erasures.len(),
                tolerated: m,
            });
        }
        if shards.len() != k + m {
            return Err(Error::InvalidParameters(format!(
                "expected {} shards, got {}",
                k + m,
                shards.len()
            )));
        }
        for (row, shard) in shards.iter().enumerate() {
            if erasures.contains(row) {
                continue;
            }
            match shard {
                Some(s) => self.check_width(row, s.as_ref().len())?,
                None => {
                    return Err(Error::InvalidParameters(format!(
                        "shard {} is missing but not listed as erased",
                        ShardId::from_row(row, k)
                    )))
                }
            }
        }
        if erasures.is_empty() {
            return Ok(Vec::new());
        }

        let schedule = ScheduleCompiler::compile_decoding(
            self.spec.bitmatrix(),
            k,
            m,
            self.spec.w() as usize,
            erasures,
        )?;

        let mut inputs = Vec::with_capacity(k);
        for &row in schedule.inputs() {
            let shard = shards[row].as_ref().ok_or_else(|| {
                Error::MatrixConstruction(format!("decoding input row {} is absent", row))
            })?;
            inputs.push(shard.as_ref());
        }
        let mut outputs = vec![vec![0u8; self.spec.width()]; schedule.outputs().len()];
        execute(&schedule, &inputs, &mut outputs, self.spec.packet_size());

        let repaired: Vec<RepairedShard> = schedule
            .outputs()
            .iter()
            .zip(outputs)
            .map(|(&row, data)| RepairedShard {
                row,
                id: ShardId::from_row(row, k),
                data,
            })
            .collect();

        debug!(
            repaired = ?repaired.iter().map(|r| r.id.to_string()).collect::<Vec<_>>(),
            "reconstructed shards"
        );
        Ok(repaired)
    }

    /// Check that the coding shards match the data shards
    pub fn verify<S: AsRef<[u8]>>(&self, shards: &[S]) -> Result<bool> {
        let (k, m) = (self.spec.k(), self.spec.m());
        if shards.len() != k + m {
            return Err(Error::InvalidParameters(format!(
                "expected {} shards, got {}",
                k + m,
                shards.len()
            )));
        }
        let expected = self.encode(&shards[..k])?;
        Ok(expected
            .iter()
            .zip(&shards[k..])
            .all(|(e, actual)| e.as_slice() == actual.as_ref()))
    }

    fn check_width(&self, row: usize, actual: usize) -> Result<()> {
        let expected = self.spec.width();
        if actual != expected {
            return Err(Error::InconsistentShardSize {
                shard: ShardId::from_row(row, self.spec.k()).to_string(),
                expected,
                actual,
            });
        }
        Ok(())
    }
}

// =============================================================================
// Schedule Execution
// =============================================================================

/// Run `schedule` over every chunk of the shard buffers
fn execute(schedule: &Schedule, inputs: &[&[u8]], outputs: &mut [Vec<u8>], packet_size: usize) {
    let chunk = schedule.w() * packet_size;
    let width = outputs.first().map(Vec::len).unwrap_or(0);

    for offset in (0..width).step_by(chunk.max(1)) {
        for op in schedule.ops() {
            let dst = offset + op.dest.packet * packet_size;
            match op.source {
                Source::Input(src) => {
                    let s = offset + src.packet * packet_size;
                    let from = &inputs[src.slot][s..s + packet_size];
                    apply(op.kind, from, &mut outputs[op.dest.slot][dst..dst + packet_size]);
                }
                Source::Output(src) => {
                    let s = offset + src.packet * packet_size;
                    if src.slot == op.dest.slot {
                        let buf = &mut outputs[src.slot];
                        let (lo, hi) = buf.split_at_mut(s.max(dst));
                        if s < dst {
                            apply(op.kind, &lo[s..s + packet_size], &mut hi[..packet_size]);
                        } else {
                            apply(op.kind, &hi[..packet_size], &mut lo[dst..dst + packet_size]);
                        }
                    } else {
                        let (from, to) = pair_mut(outputs, src.slot, op.dest.slot);
                        apply(
                            op.kind,
                            &from[s..s + packet_size],
                            &mut to[dst..dst + packet_size],
                        );
                    }
                }
            }
        }
    }
}

/// Shared reference to `bufs[a]` and mutable reference to `bufs[b]`, `a != b`
fn pair_mut(bufs: &mut [Vec<u8>], a: usize, b: usize) -> (&[u8], &mut [u8]) {
    if a < b {
        let (lo, hi) = bufs.split_at_mut(b);
        (&lo[a], &mut hi[0])
    } else {
        let (lo, hi) = bufs.split_at_mut(a);
        (&hi[0], &mut lo[b])
    }
}

#[inline]
fn apply(kind: OpKind, src: &[u8], dst: &mut [u8]) {
    match kind {
        OpKind::Copy => dst.copy_from_slice(src),
        OpKind::Xor => {
            for (d, s) in dst.iter_mut().zip(src) {
                *d ^= *s;
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
