//! YCbCr to RGB conversion (JFIF, full range).

use crate::constants::BLOCK_DIM;
use crate::error::Result;
use crate::jpeg1::image::{Block, BlockGrid, ComponentPlane, ImageHeader};
use log::debug;

const LEVEL_SHIFT: f64 = 128.0;

/// Converts one sample. Inputs are IDCT outputs (centred on zero); outputs are in 0..=255.
#[inline]
pub fn ycbcr_to_rgb(y: f64, cb: f64, cr: f64) -> [f64; 3] {
    let r = y + 1.402 * cr + LEVEL_SHIFT;
    let g = y - 0.344 * cb - 0.714 * cr + LEVEL_SHIFT;
    let b = y + 1.772 * cb + LEVEL_SHIFT;
    [clamp_channel(r), clamp_channel(g), clamp_channel(b)]
}

#[inline]
fn clamp_channel(value: f64) -> f64 {
    // max/min rather than clamp: NaN collapses to 0 instead of propagating.
    value.max(0.0).min(255.0)
}

/// Replaces the Y/Cb/Cr planes of a block by R/G/B.
pub fn convert_block(block: &mut Block) {
    let [y_r, cb_g, cr_b] = block.planes_mut();
    for i in 0..BLOCK_DIM {
        let [r, g, b] = ycbcr_to_rgb(y_r[i], cb_g[i], cr_b[i]);
        y_r[i] = r;
        cb_g[i] = g;
        cr_b[i] = b;
    }
}

/// Converts the whole grid. Grayscale frames have zero chroma planes, which makes all three
/// channels equal the level-shifted luma.
pub fn ycbcr_to_rgb_image(header: &ImageHeader, grid: &mut BlockGrid) -> Result<()> {
    header.ensure_not_subsampled()?;

    debug!("Converting {} blocks from YCbCr to RGB", grid.len());
    grid.for_each_block_mut(convert_block);
    Ok(())
}

/// Sample of `plane` at pixel (x, y) of a converted grid, or `None` outside the grid.
pub fn sample_at(grid: &BlockGrid, plane: ComponentPlane, x: usize, y: usize) -> Option<f64> {
    let block = grid.block(y / 8, x / 8)?;
    Some(block.plane(plane)[(y % 8) * 8 + x % 8])
}
