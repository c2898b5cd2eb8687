//! Huffman entropy decoding of one baseline scan into the block grid.

use crate::constants::{
    BLOCK_DIM, END_OF_BLOCK, MAXIMUM_AC_COEFFICIENT_LENGTH, MAXIMUM_DC_COEFFICIENT_LENGTH,
    PLANE_COUNT, ZERO_RUN_LENGTH, ZIGZAG_ORDER,
};
use crate::error::{Result, StructuralError, ValidationError};
use crate::jpeg_marker_code::JPEG_RESTART_MARKER_RANGE;
use crate::jpeg1::bitstream::Bitstream;
use crate::jpeg1::huffman::{HuffmanTable, HuffmanTableClass, HuffmanTableStore, decode_value_bits};
use crate::jpeg1::image::{BlockGrid, ComponentPlane, ImageHeader};
use log::{debug, warn};

/// Decodes the DC and AC coefficients of one block of one component.
///
/// Coefficients are stored in natural order and every other position is zeroed. Returns
/// the new DC predictor.
pub fn decode_block_component(
    bitstream: &mut Bitstream,
    dc_table: &HuffmanTable,
    ac_table: &HuffmanTable,
    previous_dc: i32,
    coefficients: &mut [f64; BLOCK_DIM],
) -> Result<i32> {
    let length = dc_table.next_symbol(bitstream)?;
    if length > MAXIMUM_DC_COEFFICIENT_LENGTH {
        return Err(ValidationError::DcCoefficientLength(length).at(bitstream.position()));
    }
    let bits = bitstream.read_bits(length)?;
    let difference = decode_value_bits(bits, length);
    let dc = previous_dc.checked_add(difference).ok_or(
        ValidationError::DcPredictorOverflow {
            previous: previous_dc,
            difference,
        }
        .at(bitstream.position()),
    )?;
    coefficients.fill(0.0);
    coefficients[0] = dc as f64;

    let mut i = 1;
    while i < BLOCK_DIM {
        let symbol = ac_table.next_symbol(bitstream)?;
        if symbol == END_OF_BLOCK {
            break;
        }
        if symbol == ZERO_RUN_LENGTH {
            // 16 zeros; landing exactly on 64 is only legal if nothing follows.
            if i + 16 > BLOCK_DIM {
                return Err(ValidationError::ZeroRunOverflow(i + 16).at(bitstream.position()));
            }
            i += 16;
            continue;
        }

        let run = (symbol >> 4) as usize;
        let length = symbol & 0x0F;
        if i + run >= BLOCK_DIM {
            return Err(ValidationError::ZeroRunOverflow(i + run).at(bitstream.position()));
        }
        if length > MAXIMUM_AC_COEFFICIENT_LENGTH {
            return Err(ValidationError::AcCoefficientLength(length).at(bitstream.position()));
        }
        i += run;

        let bits = bitstream.read_bits(length)?;
        coefficients[ZIGZAG_ORDER[i]] = decode_value_bits(bits, length) as f64;
        i += 1;
    }

    Ok(dc)
}

/// Decoder state for one scan: the shared bit cursor plus per-component DC predictors.
pub struct ScanDecoder<'s, 'a> {
    bitstream: &'s mut Bitstream<'a>,
    header: &'s ImageHeader,
    huffman_tables: &'s HuffmanTableStore,
    strict_restart_markers: bool,
    dc_predictors: [i32; PLANE_COUNT],
}

impl<'s, 'a> ScanDecoder<'s, 'a> {
    pub fn new(
        bitstream: &'s mut Bitstream<'a>,
        header: &'s ImageHeader,
        huffman_tables: &'s HuffmanTableStore,
        strict_restart_markers: bool,
    ) -> Self {
        Self {
            bitstream,
            header,
            huffman_tables,
            strict_restart_markers,
            dc_predictors: [0; PLANE_COUNT],
        }
    }

    /// Decodes every MCU of the scan in raster order into `grid`.
    pub fn decode_scan(&mut self, grid: &mut BlockGrid) -> Result<()> {
        let mut scan_tables: Vec<(ComponentPlane, &HuffmanTable, &HuffmanTable)> = Vec::new();
        for (plane, component) in self.header.scan_components() {
            let dc_table = self.table(plane, HuffmanTableClass::Dc, component.huffman_dc_table_id)?;
            let ac_table = self.table(plane, HuffmanTableClass::Ac, component.huffman_ac_table_id)?;
            scan_tables.push((plane, dc_table, ac_table));
        }

        let restart_interval = self.header.restart_interval as usize;
        debug!(
            "Decoding scan of {} component(s), {}x{} MCUs, restart interval {}",
            scan_tables.len(),
            self.header.block_width,
            self.header.block_height,
            restart_interval
        );

        for y in 0..self.header.block_height {
            for x in 0..self.header.block_width {
                let mcu_index = y * self.header.block_width_real + x;
                let restart = restart_interval != 0 && mcu_index % restart_interval == 0;
                let markers_before = self.bitstream.restart_markers_consumed();
                if restart {
                    self.dc_predictors = [0; PLANE_COUNT];
                    self.bitstream.align();
                }

                let block = grid.block_mut(y, x).ok_or(
                    ValidationError::InvalidDimensions {
                        width: self.header.width,
                        height: self.header.height,
                    }
                    .at(self.header.frame_offset),
                )?;
                for &(plane, dc_table, ac_table) in &scan_tables {
                    let predictor = &mut self.dc_predictors[plane.index()];
                    *predictor = decode_block_component(
                        self.bitstream,
                        dc_table,
                        ac_table,
                        *predictor,
                        block.plane_mut(plane),
                    )?;
                }

                if restart && mcu_index != 0 {
                    let interval_number = mcu_index / restart_interval - 1;
                    self.check_restart_marker(interval_number, markers_before)?;
                }
            }
        }
        Ok(())
    }

    fn table(
        &self,
        plane: ComponentPlane,
        class: HuffmanTableClass,
        id: u8,
    ) -> Result<&'s HuffmanTable> {
        self.huffman_tables.get(class, id).ok_or_else(|| {
            ValidationError::UndefinedHuffmanTable {
                component: plane.index() as u8 + 1,
                class: class.name(),
                id,
            }
            .at(self.bitstream.position())
        })
    }

    /// Verifies the marker consumed while decoding the first MCU after a restart boundary.
    fn check_restart_marker(&self, interval_number: usize, markers_before: usize) -> Result<()> {
        let expected = (interval_number % JPEG_RESTART_MARKER_RANGE as usize) as u8;
        if self.bitstream.restart_markers_consumed() == markers_before {
            warn!(
                "Missing RST{} before byte {}",
                expected,
                self.bitstream.position()
            );
            return Ok(());
        }

        match self.bitstream.last_restart_marker() {
            Some(found) if found != expected => {
                if self.strict_restart_markers {
                    return Err(StructuralError::RestartMarkerOutOfSequence { expected, found }
                        .at(self.bitstream.position()));
                }
                warn!("RST{} out of sequence, expected RST{}", found, expected);
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    /// One symbol, code `0`.
    fn single_symbol_table(symbol: u8) -> HuffmanTable {
        let mut counts = [0u8; 16];
        counts[0] = 1;
        HuffmanTable::from_counts(&counts, &[symbol]).unwrap()
    }

    /// Two symbols: `0` -> first, `10` -> second.
    fn two_symbol_table(first: u8, second: u8) -> HuffmanTable {
        let mut counts = [0u8; 16];
        counts[0] = 1;
        counts[1] = 1;
        HuffmanTable::from_counts(&counts, &[first, second]).unwrap()
    }

    #[test]
    fn test_dc_only_block() {
        // DC length 3 (code 0), bits 101 = +5; AC EOB (code 0).
        let dc = single_symbol_table(3);
        let ac = single_symbol_table(END_OF_BLOCK);
        let data = [0b0101_0111];
        let mut bitstream = Bitstream::new(&data);
        let mut coefficients = [0.0f64; BLOCK_DIM];
        let dc_value =
            decode_block_component(&mut bitstream, &dc, &ac, 10, &mut coefficients).unwrap();
        assert_eq!(dc_value, 15);
        assert_eq!(coefficients[0], 15.0);
        assert!(coefficients[1..].iter().all(|&c| c == 0.0));
    }

    #[test]
    fn test_dc_predictor_overflow() {
        // DC length 11 (code 0), bits 111_1111_1111 = +2047; AC EOB.
        let dc = single_symbol_table(11);
        let ac = single_symbol_table(END_OF_BLOCK);
        let data = [0b0111_1111, 0b1111_0111];
        let mut coefficients = [0.0f64; BLOCK_DIM];

        let mut bitstream = Bitstream::new(&data);
        let dc_value =
            decode_block_component(&mut bitstream, &dc, &ac, i32::MAX - 2047, &mut coefficients)
                .unwrap();
        assert_eq!(dc_value, i32::MAX);

        let mut bitstream = Bitstream::new(&data);
        let err =
            decode_block_component(&mut bitstream, &dc, &ac, i32::MAX - 2046, &mut coefficients)
                .unwrap_err();
        assert_eq!(
            err,
            ValidationError::DcPredictorOverflow {
                previous: i32::MAX - 2046,
                difference: 2047
            }
            .at(2)
        );
    }

    #[test]
    fn test_stale_coefficients_are_cleared() {
        let dc = single_symbol_table(3);
        let ac = single_symbol_table(END_OF_BLOCK);
        let data = [0b0101_0111];
        let mut bitstream = Bitstream::new(&data);
        let mut coefficients = [7.0f64; BLOCK_DIM];
        decode_block_component(&mut bitstream, &dc, &ac, 0, &mut coefficients).unwrap();
        assert_eq!(coefficients[0], 5.0);
        assert!(coefficients[1..].iter().all(|&c| c == 0.0));
    }

    #[test]
    fn test_ac_run_lands_in_zigzag_position() {
        // DC length 0; AC: symbol 0x21 (run 2, length 1) bit 0 -> -1 at scan index 3; EOB.
        let dc = single_symbol_table(0);
        let ac = two_symbol_table(0x21, END_OF_BLOCK);
        // 0 | 0 0 | 10 | pad
        let data = [0b0001_0111];
        let mut bitstream = Bitstream::new(&data);
        let mut coefficients = [0.0f64; BLOCK_DIM];
        decode_block_component(&mut bitstream, &dc, &ac, 0, &mut coefficients).unwrap();
        assert_eq!(coefficients[ZIGZAG_ORDER[3]], -1.0);
        assert_eq!(ZIGZAG_ORDER[3], 16);
        assert_eq!(coefficients.iter().filter(|&&c| c != 0.0).count(), 1);
    }

    #[test]
    fn test_zero_run_overflow() {
        // Four ZRL symbols reach index 65.
        let dc = single_symbol_table(0);
        let ac = single_symbol_table(ZERO_RUN_LENGTH);
        let data = [0x00, 0x00];
        let mut bitstream = Bitstream::new(&data);
        let mut coefficients = [0.0f64; BLOCK_DIM];
        let err =
            decode_block_component(&mut bitstream, &dc, &ac, 0, &mut coefficients).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Validation);
    }

    #[test]
    fn test_coefficient_length_limits() {
        let ac = single_symbol_table(END_OF_BLOCK);
        let dc = single_symbol_table(12);
        let data = [0x00, 0x00, 0x00];
        let mut bitstream = Bitstream::new(&data);
        let mut coefficients = [0.0f64; BLOCK_DIM];
        let err =
            decode_block_component(&mut bitstream, &dc, &ac, 0, &mut coefficients).unwrap_err();
        assert_eq!(err, ValidationError::DcCoefficientLength(12).at(1));

        let dc = single_symbol_table(0);
        let ac = single_symbol_table(0x0B);
        let mut bitstream = Bitstream::new(&data);
        let err =
            decode_block_component(&mut bitstream, &dc, &ac, 0, &mut coefficients).unwrap_err();
        assert_eq!(err, ValidationError::AcCoefficientLength(11).at(1));
    }

    fn grayscale_header(width: u16, height: u16, restart_interval: u16) -> ImageHeader {
        let mut header = ImageHeader::default();
        header.set_dimensions(width, height);
        header.set_sampling_factors(1, 1);
        header.component_count = 1;
        header.restart_interval = restart_interval;
        header.components[0].used_in_frame = true;
        header.components[0].used_in_scan = true;
        header
    }

    fn tables(dc: HuffmanTable, ac: HuffmanTable) -> HuffmanTableStore {
        let mut store = HuffmanTableStore::new();
        store.insert(HuffmanTableClass::Dc, 0, dc).unwrap();
        store.insert(HuffmanTableClass::Ac, 0, ac).unwrap();
        store
    }

    #[test]
    fn test_dc_prediction_accumulates_without_restarts() {
        // DC length 1, bit 1 (+1) then EOB, for two blocks: 0 1 0 | 0 1 0 | pad.
        let header = grayscale_header(16, 8, 0);
        let store = tables(single_symbol_table(1), single_symbol_table(END_OF_BLOCK));
        let data = [0b0100_1011];
        let mut bitstream = Bitstream::new(&data);
        let mut grid = BlockGrid::for_header(&header);
        ScanDecoder::new(&mut bitstream, &header, &store, false)
            .decode_scan(&mut grid)
            .unwrap();
        assert_eq!(grid.block(0, 0).unwrap().plane(ComponentPlane::Luma)[0], 1.0);
        assert_eq!(grid.block(0, 1).unwrap().plane(ComponentPlane::Luma)[0], 2.0);
    }

    #[test]
    fn test_restart_resets_predictor() {
        let header = grayscale_header(16, 8, 1);
        let store = tables(single_symbol_table(1), single_symbol_table(END_OF_BLOCK));
        let data = [0b0101_1111, 0xFF, 0xD0, 0b0101_1111];
        let mut bitstream = Bitstream::new(&data);
        let mut grid = BlockGrid::for_header(&header);
        ScanDecoder::new(&mut bitstream, &header, &store, true)
            .decode_scan(&mut grid)
            .unwrap();
        assert_eq!(grid.block(0, 0).unwrap().plane(ComponentPlane::Luma)[0], 1.0);
        assert_eq!(grid.block(0, 1).unwrap().plane(ComponentPlane::Luma)[0], 1.0);
        assert_eq!(bitstream.restart_markers_consumed(), 1);
    }

    #[test]
    fn test_out_of_sequence_restart_marker() {
        let header = grayscale_header(16, 8, 1);
        let store = tables(single_symbol_table(1), single_symbol_table(END_OF_BLOCK));
        let data = [0b0101_1111, 0xFF, 0xD5, 0b0101_1111];

        let mut bitstream = Bitstream::new(&data);
        let mut grid = BlockGrid::for_header(&header);
        ScanDecoder::new(&mut bitstream, &header, &store, false)
            .decode_scan(&mut grid)
            .unwrap();

        let mut bitstream = Bitstream::new(&data);
        let err = ScanDecoder::new(&mut bitstream, &header, &store, true)
            .decode_scan(&mut grid)
            .unwrap_err();
        assert_eq!(
            err,
            StructuralError::RestartMarkerOutOfSequence { expected: 0, found: 5 }.at(4)
        );
    }

    #[test]
    fn test_missing_huffman_table() {
        let header = grayscale_header(8, 8, 0);
        let store = HuffmanTableStore::new();
        let data = [0u8; 4];
        let mut bitstream = Bitstream::new(&data);
        let mut grid = BlockGrid::for_header(&header);
        let err = ScanDecoder::new(&mut bitstream, &header, &store, false)
            .decode_scan(&mut grid)
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::UndefinedHuffmanTable { component: 1, class: "DC", id: 0 }.at(0)
        );
    }
}
