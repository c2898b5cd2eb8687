//! Quantization tables and dequantization of decoded coefficients.

use crate::constants::{BLOCK_DIM, TABLE_SLOT_COUNT, ZIGZAG_ORDER};
use crate::error::{Result, ValidationError};
use crate::jpeg1::image::{BlockGrid, ComponentPlane, ImageHeader};
use log::debug;

/// 64 quantizer steps in natural (row-major) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantizationTable {
    values: [u16; BLOCK_DIM],
}

impl QuantizationTable {
    pub fn new(values: [u16; BLOCK_DIM]) -> Self {
        Self { values }
    }

    /// Builds a table from values in the zig-zag order they are stored in a DQT segment.
    pub fn from_zigzag(zigzag: &[u16; BLOCK_DIM]) -> Self {
        let mut values = [0u16; BLOCK_DIM];
        for (i, &value) in zigzag.iter().enumerate() {
            values[ZIGZAG_ORDER[i]] = value;
        }
        Self { values }
    }

    pub fn values(&self) -> &[u16; BLOCK_DIM] {
        &self.values
    }
}

/// The 4 quantization table slots of a decode session. Each slot may be set once.
#[derive(Debug, Clone, Default)]
pub struct QuantizationTableStore {
    tables: [Option<QuantizationTable>; TABLE_SLOT_COUNT],
}

impl QuantizationTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        id: u8,
        table: QuantizationTable,
    ) -> std::result::Result<(), ValidationError> {
        let slot = self
            .tables
            .get_mut(id as usize)
            .ok_or(ValidationError::InvalidQuantizationTableId(id))?;
        if slot.is_some() {
            return Err(ValidationError::DuplicateQuantizationTable(id));
        }
        *slot = Some(table);
        Ok(())
    }

    pub fn get(&self, id: u8) -> Option<&QuantizationTable> {
        self.tables.get(id as usize).and_then(Option::as_ref)
    }

    pub fn is_set(&self, id: u8) -> bool {
        self.get(id).is_some()
    }

    pub fn defined(&self) -> impl Iterator<Item = (u8, &QuantizationTable)> {
        self.tables
            .iter()
            .enumerate()
            .filter_map(|(id, slot)| slot.as_ref().map(|t| (id as u8, t)))
    }
}

/// De-quantizes DCT coefficients in place.
pub fn dequantize_block(coefficients: &mut [f64; BLOCK_DIM], table: &QuantizationTable) {
    for (coefficient, &step) in coefficients.iter_mut().zip(table.values.iter()) {
        *coefficient *= step as f64;
    }
}

/// Scales every block of every frame component by that component's table.
pub fn dequantize(
    header: &ImageHeader,
    tables: &QuantizationTableStore,
    grid: &mut BlockGrid,
) -> Result<()> {
    header.ensure_not_subsampled()?;

    let mut assignments: Vec<(ComponentPlane, &QuantizationTable)> = Vec::new();
    for (plane, component) in header.frame_components() {
        let table = tables.get(component.quantization_table_id).ok_or(
            ValidationError::UndefinedQuantizationTable {
                component: plane.index() as u8 + 1,
                table: component.quantization_table_id,
            }
            .at(header.frame_offset),
        )?;
        assignments.push((plane, table));
    }

    debug!("Dequantizing {} blocks", grid.len());
    grid.for_each_block_mut(|block| {
        for &(plane, table) in &assignments {
            dequantize_block(block.plane_mut(plane), table);
        }
    });
    Ok(())
}
