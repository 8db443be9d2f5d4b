//! Built-in packing strategies.

mod high_res_plus_low_res;
mod single_video;

pub use high_res_plus_low_res::HighResPlusFullLowResPacking;
pub use single_video::SingleVideoPacking;

use crate::{PackingError, StreamLayout, TileDef, CTU_SIZE};

/// Largest divisor of `count` not above its square root.
///
/// Returns 1 for 0, 1 and primes.
#[must_use]
pub fn square_factor(count: usize) -> usize {
    let mut sqrt = floor_sqrt(count);
    while sqrt > 1 && count % sqrt != 0 {
        sqrt -= 1;
    }
    sqrt.max(1)
}

/// Near-square grid `(tiles_in_col, tiles_in_row)` holding exactly `count` tiles.
///
/// `tiles_in_col` is the number of tile rows and never exceeds `tiles_in_row`.
#[must_use]
pub fn near_square_grid(count: usize) -> (usize, usize) {
    let sqrt = square_factor(count);
    let divided = count / sqrt;
    (sqrt.min(divided), sqrt.max(divided))
}

fn floor_sqrt(n: usize) -> usize {
    let mut r = (n as f64).sqrt() as usize;
    while r * r > n {
        r -= 1;
    }
    while (r + 1) * (r + 1) <= n {
        r += 1;
    }
    r
}

/// Index into a row-major tile list for column-major merge position `pos`.
fn row_major_pick(pos: usize, tiles_in_col: usize, tiles_in_row: usize) -> usize {
    (pos % tiles_in_col) * tiles_in_row + pos / tiles_in_col
}

/// Width and height of tile 0 of a stream, read from its source packing.
fn tile_size(stream: &StreamLayout) -> Result<(u32, u32), PackingError> {
    let region = stream.src_rwpk.regions.first().ok_or_else(|| {
        PackingError::invalid_data(format!(
            "stream {} has no source regions",
            stream.stream_idx_in_media
        ))
    })?;
    let (w, h) = (region.proj_reg_width, region.proj_reg_height);
    if w == 0 || h == 0 || w % CTU_SIZE != 0 || h % CTU_SIZE != 0 {
        return Err(PackingError::invalid_data(format!(
            "tile size {}x{} is not a positive multiple of the CTU size",
            w, h
        )));
    }
    Ok((w, h))
}

/// Region count of the selected tiles, as carried by the RWPK SEI.
fn hi_region_count(tiles: &[TileDef]) -> Result<u8, PackingError> {
    u8::try_from(tiles.len()).map_err(|_| {
        PackingError::invalid_data(format!(
            "{} high resolution regions exceed the RWPK limit of {}",
            tiles.len(),
            u8::MAX
        ))
    })
}

fn check_selection(tiles: &[TileDef], max_selected: usize) -> Result<(), PackingError> {
    if tiles.is_empty() {
        return Err(PackingError::incorrect_selection("empty tile-set"));
    }
    if tiles.len() > max_selected {
        return Err(PackingError::incorrect_selection(format!(
            "{} tiles exceed the maximum of {}",
            tiles.len(),
            max_selected
        )));
    }
    Ok(())
}
