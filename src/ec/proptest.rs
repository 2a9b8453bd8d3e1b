//! Property-Based Tests for Erasure Coding
//!
//! Uses proptest to verify the Cauchy codec across a range of file sizes
//! and k+m configurations.
//!
//! # Test Properties
//!
//! 1. **Roundtrip Correctness**: split → encode → join = data
//! 2. **Fault Tolerance**: any pattern of up to m erasures is repaired
//! 3. **Determinism**: same input always produces same shards
//! 4. **Size Identity**: k * width - end_padding = file size
//! 5. **Failure Mode**: more than m erasures is rejected

#![cfg(test)]

use proptest::prelude::*;

use super::codec::ShardCodec;
use super::spec::{EncodingSpec, SpecCalculator, WORD_BYTES};
use crate::domain::ErasureSet;
use crate::error::Error;
use crate::pipeline::{read_data_shards, write_restored};

// =============================================================================
// Property Strategies
// =============================================================================

/// Strategy for small k+m configurations, m <= k
fn small_ec_config_strategy() -> impl Strategy<Value = (u32, u32)> {
    (1u32..=5).prop_flat_map(|k| (Just(k), 1u32..=k.min(3)))
}

/// Strategy for generating test data, empty included
fn small_data_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..1500)
}

/// Encode `data` and return all k+m shards
fn encode_all(spec: &EncodingSpec, data: &[u8]) -> Result<Vec<Vec<u8>>, Error> {
    let codec = ShardCodec::new(spec)?;
    let data_shards = read_data_shards(spec, &mut &data[..])?;
    let coding = codec.encode(&data_shards)?;
    Ok(data_shards.into_iter().chain(coding).collect())
}

fn restore(spec: &EncodingSpec, shards: &[Vec<u8>]) -> Result<Vec<u8>, Error> {
    let mut out = Vec::new();
    write_restored(spec, &shards[..spec.k()], &mut out)?;
    Ok(out)
}

// =============================================================================
// Roundtrip Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: encoding then joining the data shards returns the original data.
    #[test]
    fn prop_roundtrip_no_loss(
        (k, m) in small_ec_config_strategy(),
        data in small_data_strategy(),
    ) {
        let spec = EncodingSpec::for_file_size(data.len() as u64, k, m)?;
        let shards = encode_all(&spec, &data)?;
        prop_assert_eq!(shards.len(), (k + m) as usize);
        prop_assert!(shards.iter().all(|s| s.len() == spec.width()));

        let recovered = restore(&spec, &shards)?;
        prop_assert_eq!(recovered, data, "roundtrip failed for k={}, m={}", k, m);
    }

    /// Property: recovery works regardless of which shards are lost.
    #[test]
    fn prop_any_erasure_pattern(
        (k, m) in small_ec_config_strategy(),
        data in prop::collection::vec(any::<u8>(), 1..800),
        erasure_indices in prop::collection::vec(0usize..8, 0..=3),
    ) {
        let spec = EncodingSpec::for_file_size(data.len() as u64, k, m)?;
        let total = spec.total_shards();
        let erasures = ErasureSet::new(erasure_indices.into_iter().filter(|&i| i < total), total)?;
        if erasures.len() > m as usize {
            return Ok(());
        }

        let shards = encode_all(&spec, &data)?;
        let mut damaged: Vec<Option<Vec<u8>>> = shards.iter().cloned().map(Some).collect();
        for &row in erasures.rows() {
            damaged[row] = None;
        }

        let codec = ShardCodec::new(&spec)?;
        let repaired = codec.decode(&damaged, &erasures)?;
        prop_assert_eq!(repaired.len(), erasures.len());
        for shard in repaired {
            prop_assert_eq!(&shard.data, &shards[shard.row],
                "row {} differs for k={}, m={}, erasures={:?}", shard.row, k, m, erasures.rows());
        }
    }
}

// =============================================================================
// Parameter Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: derived parameters always describe the file exactly.
    #[test]
    fn prop_size_identity(
        k in 1u32..=64,
        m_seed in 1u32..=64,
        size in 0u64..1_000_000,
    ) {
        let m = 1 + (m_seed - 1) % k;
        let p = SpecCalculator::derive(size, k, m)?;
        prop_assert_eq!(k as u64 * p.width - p.end_padding, size);
        prop_assert!(p.end_padding >= 1 && p.end_padding <= k as u64 * WORD_BYTES);
        prop_assert_eq!(p.width % p.w as u64, 0);
        prop_assert!(1u64 << p.w > (k + m) as u64);
    }
}

// =============================================================================
// Determinism Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    /// Property: two independent encodings produce identical shards.
    #[test]
    fn prop_encoding_deterministic(
        (k, m) in small_ec_config_strategy(),
        data in small_data_strategy(),
    ) {
        let spec1 = EncodingSpec::for_file_size(data.len() as u64, k, m)?;
        let spec2 = EncodingSpec::for_file_size(data.len() as u64, k, m)?;
        prop_assert_eq!(&spec1, &spec2);

        let shards1 = encode_all(&spec1, &data)?;
        let shards2 = encode_all(&spec2, &data)?;
        prop_assert_eq!(shards1, shards2, "encoding should be deterministic");
    }
}

// =============================================================================
// Failure Mode Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    /// Property: more than m erasures is rejected.
    #[test]
    fn prop_too_many_erasures_fails(
        (k, m) in small_ec_config_strategy(),
        data in prop::collection::vec(any::<u8>(), 1..500),
    ) {
        let spec = EncodingSpec::for_file_size(data.len() as u64, k, m)?;
        let shards = encode_all(&spec, &data)?;
        let mut damaged: Vec<Option<Vec<u8>>> = shards.into_iter().map(Some).collect();
        for shard in damaged.iter_mut().take(m as usize + 1) {
            *shard = None;
        }
        let erasures = ErasureSet::new(0..=m as usize, spec.total_shards())?;

        let codec = ShardCodec::new(&spec)?;
        let result = codec.decode(&damaged, &erasures);
        let rejected = matches!(result, Err(Error::TooManyErasures { .. }));
        prop_assert!(rejected, "should fail with {} erasures (m={})", m + 1, m);
    }
}
