//! Spec Record Codec
//!
//! Binary layout of the `spec` blob, all integers little-endian:
//!
//! ```text
//! offset  field        type
//! 0       k            i32
//! 4       m            i32
//! 8       w            i32
//! 12      width        u64
//! 20      end_padding  u64
//! 28      bitmatrix    w*w*k*m bytes, each 0x00 or 0x01
//! ```
//!
//! The record carries no version field. This layout is
//! [`SPEC_FORMAT_VERSION`] 1, and `status` reports the version it reads.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::ec::bitmatrix::BitMatrix;
use crate::ec::galois::{MAX_W, MIN_W};
use crate::ec::spec::{EncodingParams, EncodingSpec};
use crate::error::{Error, Result};

/// Layout version written and read by this crate
pub const SPEC_FORMAT_VERSION: u32 = 1;

/// Bytes before the bit-matrix
pub const SPEC_HEADER_LEN: usize = 28;

/// Serialize a spec into its record
pub fn encode_spec(spec: &EncodingSpec) -> Bytes {
    let params = spec.params();
    let matrix = spec.bitmatrix().as_bytes();
    let mut buf = BytesMut::with_capacity(SPEC_HEADER_LEN + matrix.len());
    buf.put_i32_le(params.k as i32);
    buf.put_i32_le(params.m as i32);
    buf.put_i32_le(params.w as i32);
    buf.put_u64_le(params.width);
    buf.put_u64_le(params.end_padding);
    buf.put_slice(matrix);
    buf.freeze()
}

/// Parse and validate a spec record
pub fn decode_spec(record: &[u8]) -> Result<EncodingSpec> {
    if record.len() < SPEC_HEADER_LEN {
        return Err(Error::CorruptSpec(format!(
            "record is {} bytes, shorter than the {}-byte header",
            record.len(),
            SPEC_HEADER_LEN
        )));
    }

    let mut buf = record;
    let k = read_count(&mut buf, "k")?;
    let m = read_count(&mut buf, "m")?;
    let w = read_count(&mut buf, "w")?;
    let width = buf.get_u64_le();
    let end_padding = buf.get_u64_le();

    if !(MIN_W..=MAX_W).contains(&w) {
        return Err(Error::CorruptSpec(format!("w={} out of range", w)));
    }
    let params = EncodingParams {
        k,
        m,
        w,
        width,
        end_padding,
    };
    params
        .validate()
        .map_err(|e| Error::CorruptSpec(e.to_string()))?;

    let expected = (w as u64 * w as u64)
        .checked_mul(k as u64 * m as u64)
        .filter(|&n| n == buf.remaining() as u64);
    if expected.is_none() {
        return Err(Error::CorruptSpec(format!(
            "bitmatrix is {} bytes, expected {}",
            buf.remaining(),
            params.bitmatrix_len()
        )));
    }

    let rows = m as usize * w as usize;
    let cols = k as usize * w as usize;
    let bitmatrix = BitMatrix::from_bytes(rows, cols, buf.to_vec())
        .map_err(|e| Error::CorruptSpec(e.to_string()))?;

    EncodingSpec::new(params, bitmatrix).map_err(|e| Error::CorruptSpec(e.to_string()))
}

fn read_count(buf: &mut &[u8], field: &str) -> Result<u32> {
    let value = buf.get_i32_le();
    u32::try_from(value)
        .map_err(|_| Error::CorruptSpec(format!("{}={} is negative", field, value)))
}
