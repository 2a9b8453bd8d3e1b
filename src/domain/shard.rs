//! Shard Identity Value Objects
//!
//! Shards are addressed two ways: by *row* (0..k-1 for data, k..k+m-1 for
//! coding), which is what the codec works with, and by *name* (`d1..dk`,
//! `c1..cm`), which is what lives in a container.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{Error, Result};

/// Largest shard index a name can carry
pub const MAX_SHARD_INDEX: u32 = 9999;

/// Whether a shard holds source data or coding data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShardRole {
    Data,
    Coding,
}

impl ShardRole {
    /// Name prefix used in containers
    pub fn prefix(&self) -> char {
        match self {
            ShardRole::Data => 'd',
            ShardRole::Coding => 'c',
        }
    }
}

impl fmt::Display for ShardRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShardRole::Data => write!(f, "data"),
            ShardRole::Coding => write!(f, "coding"),
        }
    }
}

/// Shard identifier (value object), 1-based within its role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ShardId {
    pub role: ShardRole,
    pub index: u32,
}

impl ShardId {
    pub fn data(index: u32) -> Self {
        Self {
            role: ShardRole::Data,
            index,
        }
    }

    pub fn coding(index: u32) -> Self {
        Self {
            role: ShardRole::Coding,
            index,
        }
    }

    /// Identifier for codec row `row` in a code with `k` data shards
    pub fn from_row(row: usize, k: usize) -> Self {
        if row < k {
            Self::data((row + 1) as u32)
        } else {
            Self::coding((row - k + 1) as u32)
        }
    }

    /// Codec row of this shard in a code with `k` data shards, `None` for
    /// index 0
    pub fn row(&self, k: usize) -> Option<usize> {
        let offset = (self.index as usize).checked_sub(1)?;
        match self.role {
            ShardRole::Data => Some(offset),
            ShardRole::Coding => Some(k + offset),
        }
    }
}

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.role.prefix(), self.index)
    }
}

impl FromStr for ShardId {
    type Err = Error;

    /// Parse a canonical shard name: a role prefix followed by a decimal
    /// index in `1..=9999` with no sign, padding or leading zeros.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidParameters(format!("not a shard name: {:?}", s));

        let mut chars = s.chars();
        let role = match chars.next() {
            Some('d') => ShardRole::Data,
            Some('c') => ShardRole::Coding,
            _ => return Err(invalid()),
        };
        let digits = chars.as_str();
        if digits.is_empty()
            || digits.len() > 4
            || digits.starts_with('0')
            || !digits.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }
        let index: u32 = digits.parse().map_err(|_| invalid())?;
        if index == 0 || index > MAX_SHARD_INDEX {
            return Err(invalid());
        }
        Ok(Self { role, index })
    }
}

// =============================================================================
// Erasure Set
// =============================================================================

/// Ascending, duplicate-free list of missing codec rows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErasureSet {
    rows: Vec<usize>,
}

impl ErasureSet {
    /// Build from arbitrary row indices, all below `total`
    pub fn new(rows: impl IntoIterator<Item = usize>, total: usize) -> Result<Self> {
        let mut rows: Vec<usize> = rows.into_iter().collect();
        if let Some(&bad) = rows.iter().find(|&&r| r >= total) {
            return Err(Error::InvalidParameters(format!(
                "erasure row {} out of range for {} shards",
                bad, total
            )));
        }
        rows.sort_unstable();
        rows.dedup();
        Ok(Self { rows })
    }

    /// Rows whose presence flag is false
    pub fn from_presence(present: &[bool]) -> Self {
        Self {
            rows: present
                .iter()
                .enumerate()
                .filter(|(_, &p)| !p)
                .map(|(i, _)| i)
                .collect(),
        }
    }

    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn contains(&self, row: usize) -> bool {
        self.rows.binary_search(&row).is_ok()
    }

    /// Shard identifiers of the erased rows
    pub fn shard_ids(&self, k: usize) -> Vec<ShardId> {
        self.rows.iter().map(|&r| ShardId::from_row(r, k)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_shard_id_display_and_parse() {
        assert_eq!(ShardId::data(1).to_string(), "d1");
        assert_eq!(ShardId::coding(9999).to_string(), "c9999");
        assert_eq!("d42".parse::<ShardId>().unwrap(), ShardId::data(42));
        assert_eq!("c3".parse::<ShardId>().unwrap(), ShardId::coding(3));
    }

    #[test]
    fn test_shard_id_rejects_non_canonical() {
        for name in ["", "d", "x1", "d0", "d01", "d+1", "d-1", "d 1", "d10000", "spec", "d1.tmp"] {
            assert_matches!(name.parse::<ShardId>(), Err(Error::InvalidParameters(_)), "{}", name);
        }
    }

    #[test]
    fn test_row_mapping() {
        let k = 4;
        assert_eq!(ShardId::from_row(0, k), ShardId::data(1));
        assert_eq!(ShardId::from_row(3, k), ShardId::data(4));
        assert_eq!(ShardId::from_row(4, k), ShardId::coding(1));
        for row in 0..6 {
            assert_eq!(ShardId::from_row(row, k).row(k), Some(row));
        }
    }

    #[test]
    fn test_row_of_index_zero() {
        assert_eq!(ShardId::data(0).row(4), None);
        assert_eq!(ShardId::coding(0).row(4), None);
    }

    #[test]
    fn test_erasure_set() {
        let set = ErasureSet::new(vec![5, 1, 5], 6).unwrap();
        assert_eq!(set.rows(), &[1, 5]);
        assert!(set.contains(5));
        assert!(!set.contains(0));
        assert_eq!(set.shard_ids(4), vec![ShardId::data(2), ShardId::coding(2)]);
        assert!(ErasureSet::new(vec![6], 6).is_err());

        let from_presence = ErasureSet::from_presence(&[true, false, true, false]);
        assert_eq!(from_presence.rows(), &[1, 3]);
    }
}
