//! Container Access
//!
//! A container holds one `spec` record plus the shards `d1..dk` and
//! `c1..cm`. [`Container`] maps those names onto a [`ShardStore`] and
//! turns a directory scan into a presence map.

use bytes::Bytes;
use tracing::{debug, warn};

use crate::domain::{ErasureSet, ShardId, ShardRole, ShardStore};
use crate::ec::spec::EncodingSpec;
use crate::error::{Error, Result};
use crate::store::spec_record::{decode_spec, encode_spec};

/// Blob name of the spec record
pub const SPEC_BLOB: &str = "spec";

// =============================================================================
// Present Shards
// =============================================================================

/// Shards of one role found in a container, indexed by `index - 1`
#[derive(Debug, Clone)]
pub struct PresentShards {
    role: ShardRole,
    shards: Vec<Option<Bytes>>,
}

impl PresentShards {
    pub fn role(&self) -> ShardRole {
        self.role
    }

    /// Number of slots, present or not
    pub fn len(&self) -> usize {
        self.shards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }

    /// Whether shard `index` (1-based) was found
    pub fn is_present(&self, index: u32) -> bool {
        self.get(index).is_some()
    }

    /// Contents of shard `index` (1-based)
    pub fn get(&self, index: u32) -> Option<&Bytes> {
        let slot = (index as usize).checked_sub(1)?;
        self.shards.get(slot)?.as_ref()
    }

    /// Presence bitmap, one flag per slot
    pub fn presence(&self) -> Vec<bool> {
        self.shards.iter().map(Option::is_some).collect()
    }

    /// Identifiers of the absent shards
    pub fn missing(&self) -> Vec<ShardId> {
        self.shards
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_none())
            .map(|(i, _)| ShardId {
                role: self.role,
                index: i as u32 + 1,
            })
            .collect()
    }

    pub fn into_inner(self) -> Vec<Option<Bytes>> {
        self.shards
    }
}

/// Every shard of a container laid out by codec row
#[derive(Debug, Clone)]
pub struct ShardSet {
    pub shards: Vec<Option<Bytes>>,
    pub erasures: ErasureSet,
}

// =============================================================================
// Container
// =============================================================================

/// Handle on one named container of a store
#[derive(Debug)]
pub struct Container<'a, S: ShardStore + ?Sized> {
    store: &'a S,
    name: String,
}

impl<'a, S: ShardStore + ?Sized> Container<'a, S> {
    /// Handle on an existing container; nothing is checked until first use
    pub fn open(store: &'a S, name: impl Into<String>) -> Self {
        Self {
            store,
            name: name.into(),
        }
    }

    /// Create a new, empty container
    pub fn create(store: &'a S, name: impl Into<String>) -> Result<Self> {
        let container = Self::open(store, name);
        store.create_container(&container.name)?;
        debug!(container = %container.name, "created container");
        Ok(container)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn write_spec(&self, spec: &EncodingSpec) -> Result<()> {
        self.store.write(&self.name, SPEC_BLOB, &encode_spec(spec))
    }

    /// Load and validate the spec record
    pub fn read_spec(&self) -> Result<EncodingSpec> {
        let record = self.store.read(&self.name, SPEC_BLOB)?.ok_or_else(|| {
            Error::io(
                format!("reading spec record of {}", self.name),
                std::io::Error::new(std::io::ErrorKind::NotFound, "no spec record"),
            )
        })?;
        let spec = decode_spec(&record)?;
        debug!(container = %self.name, params = ?spec.params(), "loaded spec record");
        Ok(spec)
    }

    pub fn write_shard(&self, id: ShardId, data: &[u8]) -> Result<()> {
        self.store.write(&self.name, &id.to_string(), data)
    }

    /// Write `d1..dk` then `c1..cm`
    pub fn write_all_shards<D: AsRef<[u8]>, C: AsRef<[u8]>>(
        &self,
        data: &[D],
        coding: &[C],
    ) -> Result<()> {
        for (i, shard) in data.iter().enumerate() {
            self.write_shard(ShardId::data(i as u32 + 1), shard.as_ref())?;
        }
        for (i, shard) in coding.iter().enumerate() {
            self.write_shard(ShardId::coding(i as u32 + 1), shard.as_ref())?;
        }
        Ok(())
    }

    /// Read every shard of `role` with index `1..=max_count`
    ///
    /// Names that are not canonical shard names are ignored. A shard whose
    /// length differs from `expected_width` is reported as absent.
    pub fn read_present(
        &self,
        role: ShardRole,
        max_count: usize,
        expected_width: usize,
    ) -> Result<PresentShards> {
        let mut shards = vec![None; max_count];

        for name in self.store.list(&self.name)? {
            let Ok(id) = name.parse::<ShardId>() else {
                continue;
            };
            if id.role != role || id.index as usize > max_count {
                continue;
            }
            let Some(data) = self.store.read(&self.name, &name)? else {
                continue;
            };
            if data.len() != expected_width {
                warn!(
                    container = %self.name,
                    shard = %id,
                    expected = expected_width,
                    actual = data.len(),
                    "shard has the wrong size, treating it as missing"
                );
                continue;
            }
            shards[id.index as usize - 1] = Some(data);
        }

        Ok(PresentShards { role, shards })
    }

    /// Read all `k + m` shards described by `spec`
    pub fn read_shard_set(&self, spec: &EncodingSpec) -> Result<ShardSet> {
        let data = self.read_present(ShardRole::Data, spec.k(), spec.width())?;
        let coding = self.read_present(ShardRole::Coding, spec.m(), spec.width())?;

        let shards: Vec<Option<Bytes>> = data
            .into_inner()
            .into_iter()
            .chain(coding.into_inner())
            .collect();
        let presence: Vec<bool> = shards.iter().map(Option::is_some).collect();
        let erasures = ErasureSet::from_presence(&presence);

        debug!(
            container = %self.name,
            missing = ?erasures.shard_ids(spec.k()).iter().map(ToString::to_string).collect::<Vec<_>>(),
            "scanned container"
        );
        Ok(ShardSet { shards, erasures })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryShardStore;
    use assert_matches::assert_matches;

    #[test]
    fn test_create_twice_fails() {
        let store = InMemoryShardStore::new();
        Container::create(&store, "box").unwrap();
        assert_matches!(Container::create(&store, "box"), Err(Error::ContainerExists(_)));
    }

    #[test]
    fn test_spec_roundtrip_through_store() {
        let store = InMemoryShardStore::new();
        let container = Container::create(&store, "box").unwrap();
        let spec = EncodingSpec::for_file_size(100, 4, 2).unwrap();
        container.write_spec(&spec).unwrap();
        assert_eq!(container.read_spec().unwrap(), spec);
    }

    #[test]
    fn test_missing_spec() {
        let store = InMemoryShardStore::new();
        let container = Container::create(&store, "box").unwrap();
        assert_matches!(container.read_spec(), Err(Error::Io { .. }));
    }

    #[test]
    fn test_read_present_filters_names_and_sizes() {
        let store = InMemoryShardStore::new();
        let container = Container::create(&store, "box").unwrap();
        container.write_shard(ShardId::data(1), &[1; 8]).unwrap();
        container.write_shard(ShardId::data(3), &[3; 7]).unwrap();
        container.write_shard(ShardId::data(5), &[5; 8]).unwrap();
        container.write_shard(ShardId::coding(2), &[9; 8]).unwrap();
        for name in ["d02", "d+2", "dx", "notes.txt"] {
            store.write("box", name, &[0; 8]).unwrap();
        }

        let data = container.read_present(ShardRole::Data, 4, 8).unwrap();
        assert_eq!(data.len(), 4);
        assert_eq!(data.presence(), vec![true, false, false, false]);
        assert_eq!(&data.get(1).unwrap()[..], &[1u8; 8]);
        assert!(!data.is_present(3));
        assert_eq!(
            data.missing(),
            vec![ShardId::data(2), ShardId::data(3), ShardId::data(4)]
        );

        let coding = container.read_present(ShardRole::Coding, 2, 8).unwrap();
        assert_eq!(coding.presence(), vec![false, true]);
    }

    #[test]
    fn test_read_shard_set() {
        let store = InMemoryShardStore::new();
        let container = Container::create(&store, "box").unwrap();
        let spec = EncodingSpec::for_file_size(100, 4, 2).unwrap();
        let width = spec.width();
        let data = vec![vec![0u8; width]; 4];
        let coding = vec![vec![0u8; width]; 2];
        container.write_all_shards(&data, &coding).unwrap();
        store.remove("box", "d2");
        store.remove("box", "c1");

        let set = container.read_shard_set(&spec).unwrap();
        assert_eq!(set.shards.len(), 6);
        assert_eq!(set.erasures.rows(), &[1, 4]);
    }
}
