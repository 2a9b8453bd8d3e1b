//! Encoding Specification
//!
//! Derives shard width, end padding and word size from the source size and
//! the k+m configuration, and carries them together with the coding
//! bit-matrix as an immutable [`EncodingSpec`].

use crate::ec::bitmatrix::BitMatrix;
use crate::ec::cauchy;
use crate::ec::galois::{MAX_W, MIN_W};
use crate::error::{Error, Result};
use serde::Serialize;
use tracing::debug;

/// Machine word size used for padding and alignment, fixed so that specs
/// are identical across platforms.
pub const WORD_BYTES: u64 = 8;

/// Largest number of data shards (shard names carry at most 4 digits)
pub const MAX_K: u32 = 9998;

// =============================================================================
// Encoding Parameters
// =============================================================================

/// Scalar encoding parameters, everything but the bit-matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EncodingParams {
    /// Number of data shards
    pub k: u32,
    /// Number of coding shards
    pub m: u32,
    /// Field word size in bits
    pub w: u32,
    /// Bytes per shard
    pub width: u64,
    /// Pad bytes appended to the source
    pub end_padding: u64,
}

impl EncodingParams {
    /// Check the invariants shared by derived and loaded parameters
    pub fn validate(&self) -> Result<()> {
        validate_counts(self.k, self.m)?;
        if !(MIN_W..=MAX_W).contains(&self.w) {
            return Err(Error::InvalidParameters(format!(
                "w={} outside {}..={}",
                self.w, MIN_W, MAX_W
            )));
        }
        if (1u64 << self.w) <= (self.k + self.m) as u64 {
            return Err(Error::InvalidParameters(format!(
                "GF(2^{}) is too small for {} shards",
                self.w,
                self.k + self.m
            )));
        }
        if self.width == 0 || self.width % WORD_BYTES != 0 {
            return Err(Error::InvalidParameters(format!(
                "width {} is not a positive multiple of {}",
                self.width, WORD_BYTES
            )));
        }
        if self.width % self.w as u64 != 0 {
            return Err(Error::InvalidParameters(format!(
                "width {} is not divisible by w={}",
                self.width, self.w
            )));
        }
        let block = self.k as u64 * WORD_BYTES;
        if self.end_padding == 0 || self.end_padding > block {
            return Err(Error::InvalidParameters(format!(
                "end padding {} outside 1..={}",
                self.end_padding, block
            )));
        }
        if self.width.checked_mul(self.k as u64).is_none() {
            return Err(Error::InvalidParameters(format!(
                "width {} overflows the total size for k={}",
                self.width, self.k
            )));
        }
        Ok(())
    }

    /// Total shard count, k + m
    pub fn total_shards(&self) -> usize {
        (self.k + self.m) as usize
    }

    /// Size of the original file, `k * width - end_padding`
    pub fn file_size(&self) -> u64 {
        self.k as u64 * self.width - self.end_padding
    }

    /// Bytes per packet: each shard carries `w` packets, one per word bit
    pub fn packet_size(&self) -> usize {
        (self.width / self.w as u64) as usize
    }

    /// Number of entries in the coding bit-matrix
    pub fn bitmatrix_len(&self) -> usize {
        (self.w * self.w) as usize * self.k as usize * self.m as usize
    }
}

fn validate_counts(k: u32, m: u32) -> Result<()> {
    if k == 0 || k > MAX_K {
        return Err(Error::InvalidParameters(format!(
            "k={} must be between 1 and {}",
            k, MAX_K
        )));
    }
    if m == 0 || m > k {
        return Err(Error::InvalidParameters(format!(
            "m={} must be between 1 and k={}",
            m, k
        )));
    }
    Ok(())
}

// =============================================================================
// Spec Calculator
// =============================================================================

/// Derives encoding parameters from a file size
pub struct SpecCalculator;

impl SpecCalculator {
    /// Derive width, padding and word size for a file of `file_size` bytes
    ///
    /// The source is padded to a multiple of `k * WORD_BYTES`; padding is
    /// never zero, a file that already divides evenly gets a full block. The
    /// word size is the smallest `w` with `2^w > k + m` that divides the
    /// shard width.
    pub fn derive(file_size: u64, k: u32, m: u32) -> Result<EncodingParams> {
        validate_counts(k, m)?;

        let block = k as u64 * WORD_BYTES;
        let end_padding = block - (file_size % block);
        let padded = file_size.checked_add(end_padding).ok_or_else(|| {
            Error::InvalidParameters(format!("file size {} is too large", file_size))
        })?;
        let width = padded / k as u64;

        let w = (MIN_W..=MAX_W)
            .find(|&w| (1u64 << w) > (k + m) as u64 && width % w as u64 == 0)
            .ok_or_else(|| {
                Error::InvalidParameters(format!(
                    "no word size in {}..={} fits k={} m={} width={}",
                    MIN_W, MAX_W, k, m, width
                ))
            })?;

        let params = EncodingParams {
            k,
            m,
            w,
            width,
            end_padding,
        };
        debug!(file_size, ?params, "derived encoding parameters");
        Ok(params)
    }
}

// =============================================================================
// Encoding Spec
// =============================================================================

/// Complete, immutable description of an encoded container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodingSpec {
    params: EncodingParams,
    bitmatrix: BitMatrix,
}

impl EncodingSpec {
    /// Pair validated parameters with their coding bit-matrix
    pub fn new(params: EncodingParams, bitmatrix: BitMatrix) -> Result<Self> {
        params.validate()?;
        let w = params.w as usize;
        if bitmatrix.rows() != params.m as usize * w || bitmatrix.cols() != params.k as usize * w
        {
            return Err(Error::InvalidParameters(format!(
                "bitmatrix is {}x{}, expected {}x{}",
                bitmatrix.rows(),
                bitmatrix.cols(),
                params.m as usize * w,
                params.k as usize * w
            )));
        }
        Ok(Self { params, bitmatrix })
    }

    /// Derive parameters and build the Cauchy bit-matrix in one step
    pub fn for_file_size(file_size: u64, k: u32, m: u32) -> Result<Self> {
        let params = SpecCalculator::derive(file_size, k, m)?;
        let bitmatrix = cauchy::build(k as usize, m as usize, params.w)?;
        Self::new(params, bitmatrix)
    }

    pub fn params(&self) -> &EncodingParams {
        &self.params
    }

    pub fn bitmatrix(&self) -> &BitMatrix {
        &self.bitmatrix
    }

    pub fn k(&self) -> usize {
        self.params.k as usize
    }

    pub fn m(&self) -> usize {
        self.params.m as usize
    }

    pub fn w(&self) -> u32 {
        self.params.w
    }

    pub fn width(&self) -> usize {
        self.params.width as usize
    }

    pub fn end_padding(&self) -> u64 {
        self.params.end_padding
    }

    pub fn file_size(&self) -> u64 {
        self.params.file_size()
    }

    pub fn packet_size(&self) -> usize {
        self.params.packet_size()
    }

    pub fn total_shards(&self) -> usize {
        self.params.total_shards()
    }
}

// =============================================================================
// Tests
// =============================================================================
