//! Frame metadata and the block grid shared by every decoding stage.

use crate::constants::{BLOCK_DIM, BLOCK_SIZE, COMPONENT_SLOT_COUNT, PLANE_COUNT};
use crate::error::{Result, UnsupportedFeature, ValidationError};
use crate::jpeg_marker_code::FrameType;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// One of the three sample planes of a [`Block`].
///
/// The planes hold Y/Cb/Cr data until colour conversion, and R/G/B afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum ComponentPlane {
    Luma = 0,
    BlueDifference = 1,
    RedDifference = 2,
}

impl ComponentPlane {
    pub const ALL: [ComponentPlane; PLANE_COUNT] =
        [Self::Luma, Self::BlueDifference, Self::RedDifference];

    pub fn from_index(index: usize) -> std::result::Result<Self, ValidationError> {
        u8::try_from(index)
            .ok()
            .and_then(|i| Self::try_from(i).ok())
            .ok_or(ValidationError::InvalidComponentPlane(index))
    }

    pub fn index(self) -> usize {
        u8::from(self) as usize
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColorComponent {
    pub horizontal_sampling_factor: u8,
    pub vertical_sampling_factor: u8,
    pub quantization_table_id: u8,
    pub huffman_dc_table_id: u8,
    pub huffman_ac_table_id: u8,
    pub used_in_frame: bool,
    pub used_in_scan: bool,
}

/// Everything learnt from the frame and scan headers.
///
/// Component IDs are normalized to 1-based; component `id` lives in slot `id - 1`
/// and decodes into plane `id - 1`.
#[derive(Debug, Clone, Default)]
pub struct ImageHeader {
    pub frame_type: Option<FrameType>,
    /// Byte offset of the SOF segment, used to locate frame-level failures.
    pub frame_offset: usize,
    pub width: u16,
    pub height: u16,
    pub component_count: u8,
    pub zero_based_ids: bool,
    pub components: [ColorComponent; COMPONENT_SLOT_COUNT],

    pub block_width: usize,
    pub block_height: usize,
    pub block_width_real: usize,
    pub block_height_real: usize,
    pub horizontal_sampling_factor: u8,
    pub vertical_sampling_factor: u8,

    pub restart_interval: u16,

    pub components_in_scan: u8,
    pub start_of_selection: u8,
    pub end_of_selection: u8,
    pub successive_approximation_high: u8,
    pub successive_approximation_low: u8,
}

impl ImageHeader {
    pub fn has_frame(&self) -> bool {
        self.component_count != 0
    }

    /// Sets the frame size and derives the block grid dimensions.
    pub fn set_dimensions(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        self.block_width = (width as usize).div_ceil(BLOCK_SIZE);
        self.block_height = (height as usize).div_ceil(BLOCK_SIZE);
        self.block_width_real = self.block_width;
        self.block_height_real = self.block_height;
    }

    /// Records the luma sampling factors; an MCU spanning 2 blocks pads odd grids to even.
    pub fn set_sampling_factors(&mut self, horizontal: u8, vertical: u8) {
        if horizontal == 2 && self.block_width % 2 == 1 {
            self.block_width_real += 1;
        }
        if vertical == 2 && self.block_height % 2 == 1 {
            self.block_height_real += 1;
        }
        self.horizontal_sampling_factor = horizontal;
        self.vertical_sampling_factor = vertical;
    }

    pub fn is_subsampled(&self) -> bool {
        self.horizontal_sampling_factor != 1 || self.vertical_sampling_factor != 1
    }

    /// Fails for headers whose chroma would need upsampling.
    pub fn ensure_not_subsampled(&self) -> Result<()> {
        if self.is_subsampled() {
            return Err(UnsupportedFeature::ChromaSubsampling.at(self.frame_offset));
        }
        Ok(())
    }

    /// Component with 1-based `id`, if that slot exists.
    pub fn component(&self, id: u8) -> Option<&ColorComponent> {
        (id as usize).checked_sub(1).and_then(|i| self.components.get(i))
    }

    pub fn component_mut(&mut self, id: u8) -> Option<&mut ColorComponent> {
        (id as usize).checked_sub(1).and_then(|i| self.components.get_mut(i))
    }

    /// (plane, component) pairs of the frame's components, in ID order.
    pub fn frame_components(&self) -> impl Iterator<Item = (ComponentPlane, &ColorComponent)> {
        ComponentPlane::ALL
            .into_iter()
            .zip(self.components.iter())
            .take(self.component_count as usize)
            .filter(|(_, component)| component.used_in_frame)
    }

    pub fn scan_components(&self) -> impl Iterator<Item = (ComponentPlane, &ColorComponent)> {
        self.frame_components()
            .filter(|(_, component)| component.used_in_scan)
    }

    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// An 8x8 tile with one 64-value plane per component.
///
/// The same storage carries coefficients, then dequantized coefficients, then spatial
/// samples, and finally clamped 0-255 channel values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Block {
    planes: [[f64; BLOCK_DIM]; PLANE_COUNT],
}

impl Default for Block {
    fn default() -> Self {
        Self {
            planes: [[0.0; BLOCK_DIM]; PLANE_COUNT],
        }
    }
}

impl Block {
    pub fn plane(&self, plane: ComponentPlane) -> &[f64; BLOCK_DIM] {
        &self.planes[plane.index()]
    }

    pub fn plane_mut(&mut self, plane: ComponentPlane) -> &mut [f64; BLOCK_DIM] {
        &mut self.planes[plane.index()]
    }

    pub fn planes_mut(&mut self) -> &mut [[f64; BLOCK_DIM]; PLANE_COUNT] {
        &mut self.planes
    }
}

/// Row-major grid of blocks covering the (padded) frame.
#[derive(Debug, Clone)]
pub struct BlockGrid {
    blocks: Vec<Block>,
    block_width: usize,
    block_height: usize,
}

impl BlockGrid {
    pub fn new(block_width: usize, block_height: usize) -> Self {
        Self {
            blocks: vec![Block::default(); block_width * block_height],
            block_width,
            block_height,
        }
    }

    pub fn for_header(header: &ImageHeader) -> Self {
        Self::new(header.block_width_real, header.block_height_real)
    }

    pub fn block_width(&self) -> usize {
        self.block_width
    }

    pub fn block_height(&self) -> usize {
        self.block_height
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn block(&self, row: usize, column: usize) -> Option<&Block> {
        if column >= self.block_width {
            return None;
        }
        self.blocks.get(row * self.block_width + column)
    }

    pub fn block_mut(&mut self, row: usize, column: usize) -> Option<&mut Block> {
        if column >= self.block_width {
            return None;
        }
        self.blocks.get_mut(row * self.block_width + column)
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Applies `f` to every block. Blocks are independent, so with the `parallel`
    /// feature the sweep runs on the rayon pool.
    pub fn for_each_block_mut<F>(&mut self, f: F)
    where
        F: Fn(&mut Block) + Send + Sync,
    {
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            self.blocks.par_iter_mut().for_each(f);
        }
        #[cfg(not(feature = "parallel"))]
        {
            self.blocks.iter_mut().for_each(f);
        }
    }
}
