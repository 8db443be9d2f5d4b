//! Region-wise packing of viewport tiles for OMAF extractor tracks.
//!
//! This crate decides how the tiles seen from one viewport are merged into a
//! single HEVC picture. Each strategy produces three things for a tile-set:
//!
//! - the **region-wise packing** (RWPK) written into the merged bitstream's SEI,
//! - the **merge direction**, giving each tile's slice address in the merged picture,
//! - the **tile arrangement**, the merged tile grid used to rewrite the PPS.
//!
//! # Quick Start
//!
//! ```ignore
//! use omaf_packing::{PackingContext, StrategyRegistry, TileDef};
//!
//! let registry = StrategyRegistry::with_builtin();
//! let mut strategy = registry.create("HighResPlusFullLowResPacking")?;
//!
//! strategy.initialize(&PackingContext {
//!     streams: &layouts,
//!     selected_count: 4,
//!     max_selected_count: 8,
//! })?;
//!
//! let rwpk = strategy.generate_dst_rwpk(&tiles)?;
//! let merge = strategy.generate_tiles_merge_direction(&tiles)?;
//! let arrange = strategy.generate_merged_tiles_arrange(&tiles)?;
//! ```
//!
//! # Strategies
//!
//! - [`HighResPlusFullLowResPacking`]: viewport tiles of the high resolution
//!   stream next to the whole low resolution picture
//! - [`SingleVideoPacking`]: viewport tiles of a single stream only
//!
//! Custom strategies implement [`PackingStrategy`] and are added with
//! [`StrategyRegistry::register`].

mod error;
mod registry;
mod traits;
mod types;

pub mod strategies;

pub use error::PackingError;
pub use registry::{StrategyFactory, StrategyRegistry};
pub use strategies::{
    near_square_grid, square_factor, HighResPlusFullLowResPacking, SingleVideoPacking,
};
pub use traits::{PackingContext, PackingStrategy};
pub use types::{
    ContentCoverage, PicResolution, ProjectionFormat, RectRegionPacking, RegionWisePacking,
    SingleTile, SphereRegion, StreamLayout, TileArrangement, TileDef, TilesMergeDirectionInCol,
    CTU_SIZE,
};
