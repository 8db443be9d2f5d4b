//! Distinct viewport tile-sets, stored in one arena and bucketed by tile count.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use omaf_packing::TileDef;

use crate::coverage::CoverageDef;

/// Identifier of a surviving viewport, and of its extractor track.
pub type ViewportId = u16;

/// Tiles selected for one candidate viewport, plus their sphere coverage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileSet {
    pub viewport_id: ViewportId,
    /// Tiles in selection order, duplicates included. `idx` is resolved.
    pub tiles: Vec<TileDef>,
    pub coverage: CoverageDef,
}

impl TileSet {
    /// Number of tiles, duplicates included.
    #[must_use]
    pub fn count(&self) -> usize {
        self.tiles.len()
    }

    /// Distinct tile indices in the projected picture.
    #[must_use]
    pub fn index_set(&self) -> BTreeSet<u16> {
        self.tiles.iter().map(|t| t.idx).collect()
    }
}

/// Order-independent identity of a tile list.
fn dedup_key(tiles: &[TileDef]) -> Vec<TileDef> {
    let mut key = tiles.to_vec();
    key.sort_unstable();
    key
}

/// Distinct tile-sets keyed by tile count, then viewport id.
#[derive(Debug, Clone, Default)]
pub struct TileSetCollection {
    sets: Vec<TileSet>,
    buckets: BTreeMap<usize, Vec<usize>>,
    keys: HashSet<Vec<TileDef>>,
}

impl TileSetCollection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `tiles` unless an equal multiset is already held.
    ///
    /// Returns the new viewport id. Ids follow insertion order across all buckets.
    pub fn insert(&mut self, tiles: Vec<TileDef>, coverage: CoverageDef) -> Option<ViewportId> {
        if !self.keys.insert(dedup_key(&tiles)) {
            return None;
        }
        let viewport_id = self.sets.len() as ViewportId;
        let slot = self.sets.len();
        self.buckets.entry(tiles.len()).or_default().push(slot);
        self.sets.push(TileSet {
            viewport_id,
            tiles,
            coverage,
        });
        Some(viewport_id)
    }

    /// Number of distinct tile-sets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Tile-set with the given viewport id.
    #[must_use]
    pub fn get(&self, viewport_id: ViewportId) -> Option<&TileSet> {
        self.sets.get(usize::from(viewport_id))
    }

    /// Tile-sets in ascending count, then ascending viewport id.
    pub fn iter(&self) -> impl Iterator<Item = &TileSet> + '_ {
        self.buckets
            .values()
            .flat_map(move |slots| slots.iter().map(move |&slot| &self.sets[slot]))
    }

    /// Tile-sets holding exactly `count` tiles, by viewport id.
    pub fn bucket(&self, count: usize) -> impl Iterator<Item = &TileSet> + '_ {
        self.buckets
            .get(&count)
            .into_iter()
            .flatten()
            .map(move |&slot| &self.sets[slot])
    }

    /// Tile counts present, ascending.
    pub fn counts(&self) -> impl Iterator<Item = usize> + '_ {
        self.buckets.keys().copied()
    }

    /// Number of tile-sets per tile count.
    #[must_use]
    pub fn bucket_sizes(&self) -> BTreeMap<usize, usize> {
        self.buckets
            .iter()
            .map(|(&count, slots)| (count, slots.len()))
            .collect()
    }

    /// Largest tile count of any held tile-set.
    #[must_use]
    pub fn max_count(&self) -> usize {
        self.buckets.keys().next_back().copied().unwrap_or(0)
    }

    /// Consume the collection, yielding tile-sets in [`iter`](Self::iter) order.
    pub fn into_sorted(self) -> Vec<TileSet> {
        let mut slots: Vec<Option<TileSet>> = self.sets.into_iter().map(Some).collect();
        self.buckets
            .values()
            .flatten()
            .filter_map(|&slot| slots[slot].take())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiles(idx: &[u16]) -> Vec<TileDef> {
        idx.iter()
            .map(|&i| TileDef::new(i32::from(i % 4) * 960, i32::from(i / 4) * 960, 0, i))
            .collect()
    }

    #[test]
    fn test_dedup_ignores_order() {
        let mut sets = TileSetCollection::new();
        assert_eq!(sets.insert(tiles(&[0, 1, 4, 5]), CoverageDef::default()), Some(0));
        assert_eq!(sets.insert(tiles(&[5, 4, 1, 0]), CoverageDef::default()), None);
        assert_eq!(sets.insert(tiles(&[1, 2, 5, 6]), CoverageDef::default()), Some(1));
        assert_eq!(sets.len(), 2);
    }

    #[test]
    fn test_duplicates_count_toward_identity() {
        let mut sets = TileSetCollection::new();
        assert!(sets.insert(tiles(&[0, 1, 2]), CoverageDef::default()).is_some());
        assert!(sets.insert(tiles(&[0, 1, 2, 0]), CoverageDef::default()).is_some());
        assert!(sets.insert(tiles(&[0, 0, 1, 2]), CoverageDef::default()).is_none());
        assert_eq!(sets.get(1).map(TileSet::index_set), Some([0, 1, 2].into()));
    }

    #[test]
    fn test_iteration_order() {
        let mut sets = TileSetCollection::new();
        sets.insert(tiles(&[0, 1, 2, 3, 4, 5, 6, 7]), CoverageDef::default());
        sets.insert(tiles(&[0, 1, 4, 5]), CoverageDef::default());
        sets.insert(tiles(&[2, 3, 6, 7]), CoverageDef::default());

        let ids: Vec<ViewportId> = sets.iter().map(|s| s.viewport_id).collect();
        assert_eq!(ids, vec![1, 2, 0]);
        assert_eq!(sets.counts().collect::<Vec<_>>(), vec![4, 8]);
        assert_eq!(sets.bucket(4).count(), 2);
        assert_eq!(sets.bucket(5).count(), 0);
        assert_eq!(sets.max_count(), 8);
        assert_eq!(sets.bucket_sizes(), [(4, 2), (8, 1)].into());

        let sorted: Vec<ViewportId> = sets.into_sorted().iter().map(|s| s.viewport_id).collect();
        assert_eq!(sorted, vec![1, 2, 0]);
    }
}
