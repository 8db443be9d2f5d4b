//! Subset pruning of swept tile-sets.
//!
//! A dense sweep can yield hundreds of distinct tile-sets, many of them a
//! corner of a bigger one. Above a threshold, every tile-set whose tiles all
//! appear in a tile-set with more tiles is dropped, bounding the number of
//! extractor tracks.

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::config::DEFAULT_REFINE_THRESHOLD;
use crate::tileset::TileSetCollection;

/// Drops tile-sets contained in a larger one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileSetRefiner {
    threshold: usize,
}

impl Default for TileSetRefiner {
    fn default() -> Self {
        Self::new(DEFAULT_REFINE_THRESHOLD)
    }
}

impl TileSetRefiner {
    #[must_use]
    pub fn new(threshold: usize) -> Self {
        Self { threshold }
    }

    #[must_use]
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Prune `samples` if they exceed the threshold.
    ///
    /// Below the threshold the collection is returned untouched, ids included.
    /// Otherwise survivors are renumbered from 0 in ascending tile count, then
    /// ascending former id.
    #[must_use]
    pub fn refine(&self, samples: TileSetCollection) -> TileSetCollection {
        if samples.len() <= self.threshold {
            debug!(
                distinct = samples.len(),
                threshold = self.threshold,
                "tile-set pruning skipped"
            );
            return samples;
        }

        let index_sets: Vec<(usize, BTreeSet<u16>)> = samples
            .iter()
            .map(|set| (set.count(), set.index_set()))
            .collect();

        let before = samples.len();
        let mut refined = TileSetCollection::new();
        for (pos, set) in samples.into_sorted().into_iter().enumerate() {
            let (count, indices) = &index_sets[pos];
            // Sorted by count, so every larger set sits after `pos`.
            let contained = index_sets[pos + 1..]
                .iter()
                .any(|(larger, other)| larger > count && indices.is_subset(other));
            if !contained {
                refined.insert(set.tiles, set.coverage);
            }
        }

        info!(before, after = refined.len(), "pruned contained tile-sets");
        refined
    }
}
