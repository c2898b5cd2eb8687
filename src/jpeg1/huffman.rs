//! Canonical Huffman tables for baseline JPEG (ISO/IEC 10918-1 Annex C).
//!
//! A table is defined on the wire by a histogram of code lengths (how many codes have
//! length 1, 2, ... 16) plus the symbol list in code order. Codes are assigned by
//! counting up within a length and shifting left when moving to the next length.

use crate::constants::{MAXIMUM_CODE_LENGTH, MAXIMUM_HUFFMAN_SYMBOLS, TABLE_SLOT_COUNT};
use crate::error::{DecodeError, JpegError, Result, StructuralError, ValidationError};
use crate::jpeg1::bitstream::Bitstream;
use num_enum::{IntoPrimitive, TryFromPrimitive};

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum HuffmanTableClass {
    Dc = 0,
    Ac = 1,
}

impl HuffmanTableClass {
    pub fn name(self) -> &'static str {
        match self {
            Self::Dc => "DC",
            Self::Ac => "AC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanTable {
    /// `offsets[l]..offsets[l + 1]` indexes the symbols whose code is `l + 1` bits long.
    offsets: [usize; MAXIMUM_CODE_LENGTH + 1],
    symbols: [u8; MAXIMUM_HUFFMAN_SYMBOLS],
    codes: [u32; MAXIMUM_HUFFMAN_SYMBOLS],
}

impl HuffmanTable {
    /// Builds a table from the 16 per-length counts of a DHT entry and its symbols.
    pub fn from_counts(
        counts: &[u8; MAXIMUM_CODE_LENGTH],
        symbols: &[u8],
    ) -> std::result::Result<Self, ValidationError> {
        let mut offsets = [0usize; MAXIMUM_CODE_LENGTH + 1];
        let mut total = 0usize;
        for (length, &count) in counts.iter().enumerate() {
            total += count as usize;
            offsets[length + 1] = total;
        }

        if total > MAXIMUM_HUFFMAN_SYMBOLS {
            return Err(ValidationError::TooManyHuffmanSymbols(total));
        }
        if symbols.len() != total {
            return Err(ValidationError::TooManyHuffmanSymbols(symbols.len()));
        }

        let mut table = Self {
            offsets,
            symbols: [0; MAXIMUM_HUFFMAN_SYMBOLS],
            codes: [0; MAXIMUM_HUFFMAN_SYMBOLS],
        };
        table.symbols[..total].copy_from_slice(symbols);
        table.codes = generate_codes(&offsets)?;
        Ok(table)
    }

    pub fn symbol_count(&self) -> usize {
        self.offsets[MAXIMUM_CODE_LENGTH]
    }

    /// Symbols whose code is `length` bits long (1..=16).
    pub fn symbols_of_length(&self, length: usize) -> &[u8] {
        &self.symbols[self.offsets[length - 1]..self.offsets[length]]
    }

    /// (symbol, code, code length) for every entry, in code order.
    pub fn entries(&self) -> impl Iterator<Item = (u8, u32, usize)> + '_ {
        (1..=MAXIMUM_CODE_LENGTH).flat_map(move |length| {
            (self.offsets[length - 1]..self.offsets[length])
                .map(move |j| (self.symbols[j], self.codes[j], length))
        })
    }

    /// Reads bits until they spell a code of this table and returns its symbol.
    pub fn next_symbol(&self, bitstream: &mut Bitstream) -> Result<u8> {
        let mut code = 0u32;
        for length in 1..=MAXIMUM_CODE_LENGTH {
            let bit = bitstream.read_bit().map_err(|err| match err {
                JpegError::Structural {
                    offset,
                    kind: StructuralError::UnexpectedEndOfStream,
                } => DecodeError::TruncatedHuffmanCode.at(offset),
                other => other,
            })?;
            code = (code << 1) | bit as u32;

            let mut candidates = self.offsets[length - 1]..self.offsets[length];
            if let Some(j) = candidates.find(|&j| self.codes[j] == code) {
                return Ok(self.symbols[j]);
            }
        }
        Err(DecodeError::NoMatchingHuffmanCode.at(bitstream.position()))
    }
}

/// Assigns canonical codes to the symbol slots described by `offsets`.
///
/// Fails when the histogram asks for more codes of some length than that length can hold.
pub fn generate_codes(
    offsets: &[usize; MAXIMUM_CODE_LENGTH + 1],
) -> std::result::Result<[u32; MAXIMUM_HUFFMAN_SYMBOLS], ValidationError> {
    let mut codes = [0u32; MAXIMUM_HUFFMAN_SYMBOLS];
    let mut code = 0u32;
    for length in 1..=MAXIMUM_CODE_LENGTH {
        for j in offsets[length - 1]..offsets[length] {
            codes[j] = code;
            code += 1;
        }
        if code > 1 << length {
            return Err(ValidationError::InvalidHuffmanCodeLengths(length));
        }
        code <<= 1;
    }
    Ok(codes)
}

/// Maps `length` raw magnitude bits to a signed value (ISO/IEC 10918-1 F.2.2.1, EXTEND).
pub fn decode_value_bits(bits: u16, length: u8) -> i32 {
    if length == 0 {
        return 0;
    }
    let bits = bits as i32;
    if bits < 1 << (length - 1) {
        bits - ((1 << length) - 1)
    } else {
        bits
    }
}

/// The 4 DC and 4 AC table slots of a decode session. Each slot may be set once.
#[derive(Debug, Clone, Default)]
pub struct HuffmanTableStore {
    dc_tables: [Option<HuffmanTable>; TABLE_SLOT_COUNT],
    ac_tables: [Option<HuffmanTable>; TABLE_SLOT_COUNT],
}

impl HuffmanTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self, class: HuffmanTableClass) -> &[Option<HuffmanTable>; TABLE_SLOT_COUNT] {
        match class {
            HuffmanTableClass::Dc => &self.dc_tables,
            HuffmanTableClass::Ac => &self.ac_tables,
        }
    }

    pub fn insert(
        &mut self,
        class: HuffmanTableClass,
        id: u8,
        table: HuffmanTable,
    ) -> std::result::Result<(), ValidationError> {
        let slots = match class {
            HuffmanTableClass::Dc => &mut self.dc_tables,
            HuffmanTableClass::Ac => &mut self.ac_tables,
        };
        let slot = slots
            .get_mut(id as usize)
            .ok_or(ValidationError::InvalidHuffmanTableId(id))?;
        if slot.is_some() {
            return Err(ValidationError::DuplicateHuffmanTable {
                class: class.name(),
                id,
            });
        }
        *slot = Some(table);
        Ok(())
    }

    pub fn get(&self, class: HuffmanTableClass, id: u8) -> Option<&HuffmanTable> {
        self.slots(class).get(id as usize).and_then(Option::as_ref)
    }

    pub fn is_set(&self, class: HuffmanTableClass, id: u8) -> bool {
        self.get(class, id).is_some()
    }

    /// (class, id, table) for every defined table.
    pub fn defined(&self) -> impl Iterator<Item = (HuffmanTableClass, u8, &HuffmanTable)> {
        [HuffmanTableClass::Dc, HuffmanTableClass::Ac]
            .into_iter()
            .flat_map(move |class| {
                self.slots(class)
                    .iter()
                    .enumerate()
                    .filter_map(move |(id, slot)| slot.as_ref().map(|t| (class, id as u8, t)))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    /// Table K.3: luminance DC code lengths.
    const LUMINANCE_DC_COUNTS: [u8; 16] = [0, 1, 5, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0];

    fn luminance_dc() -> HuffmanTable {
        let symbols: Vec<u8> = (0..12).collect();
        HuffmanTable::from_counts(&LUMINANCE_DC_COUNTS, &symbols).unwrap()
    }

    #[test]
    fn test_canonical_codes_match_annex_k() {
        let table = luminance_dc();
        let entries: Vec<_> = table.entries().collect();
        assert_eq!(entries[0], (0, 0b00, 2));
        assert_eq!(entries[1], (1, 0b010, 3));
        assert_eq!(entries[5], (5, 0b110, 3));
        assert_eq!(entries[6], (6, 0b1110, 4));
        assert_eq!(entries[11], (11, 0b1_1111_1110, 9));
    }

    #[test]
    fn test_codes_are_prefix_free() {
        // Table K.5: luminance AC code lengths.
        let counts = [0, 2, 1, 3, 3, 2, 4, 3, 5, 5, 4, 4, 0, 0, 1, 125];
        let symbols: Vec<u8> = (0..162).map(|i| i as u8).collect();
        let table = HuffmanTable::from_counts(&counts, &symbols).unwrap();
        assert_eq!(kraft_sum(&counts), (1 << 16) - 1);
        assert_prefix_free(&table);
    }

    /// Sum of 2^(16 - length) over all codes; a complete code has exactly 2^16.
    fn kraft_sum(counts: &[u8; 16]) -> u32 {
        counts
            .iter()
            .enumerate()
            .map(|(i, &count)| (count as u32) << (15 - i))
            .sum()
    }

    fn assert_prefix_free(table: &HuffmanTable) {
        let entries: Vec<_> = table.entries().collect();
        for (i, &(_, code_a, len_a)) in entries.iter().enumerate() {
            for &(_, code_b, len_b) in entries.iter().skip(i + 1) {
                let (short, short_len, long, long_len) = if len_a <= len_b {
                    (code_a, len_a, code_b, len_b)
                } else {
                    (code_b, len_b, code_a, len_a)
                };
                assert_ne!(long >> (long_len - short_len), short, "prefix clash");
            }
        }
    }

    #[test]
    fn test_codes_are_prefix_free_arb() {
        arbtest::arbtest(|u| {
            let mut counts = [0u8; 16];
            let mut budget = 1u32 << 16;
            let mut remaining = MAXIMUM_HUFFMAN_SYMBOLS as u32;
            for (i, count) in counts.iter_mut().enumerate() {
                let weight = 1u32 << (15 - i);
                let max = (budget / weight).min(remaining);
                let chosen = u.int_in_range(0..=max)?;
                *count = chosen as u8;
                budget -= chosen * weight;
                remaining -= chosen;
            }
            let total = (MAXIMUM_HUFFMAN_SYMBOLS as u32 - remaining) as usize;
            let symbols: Vec<u8> = (0..total).map(|i| i as u8).collect();

            let table = HuffmanTable::from_counts(&counts, &symbols).unwrap();
            assert_eq!(table.symbol_count(), total);
            assert_prefix_free(&table);
            Ok(())
        });
    }

    #[test]
    fn test_oversubscribed_lengths_are_rejected_arb() {
        arbtest::arbtest(|u| {
            let mut counts = [0u8; 16];
            let mut remaining = MAXIMUM_HUFFMAN_SYMBOLS as u8;
            for count in counts.iter_mut() {
                *count = u.int_in_range(0..=remaining.min(24))?;
                remaining -= *count;
            }
            let total: usize = counts.iter().map(|&c| c as usize).sum();
            let symbols: Vec<u8> = (0..total).map(|i| i as u8).collect();

            let result = HuffmanTable::from_counts(&counts, &symbols);
            if kraft_sum(&counts) <= 1 << 16 {
                assert_prefix_free(&result.unwrap());
            } else {
                assert!(
                    matches!(result, Err(ValidationError::InvalidHuffmanCodeLengths(_))),
                    "{:?} accepted",
                    counts
                );
            }
            Ok(())
        });
    }

    #[test]
    fn test_oversubscribed_lengths_are_rejected() {
        let mut counts = [0u8; 16];
        counts[0] = 3;
        assert_eq!(
            HuffmanTable::from_counts(&counts, &[1, 2, 3]),
            Err(ValidationError::InvalidHuffmanCodeLengths(1))
        );
    }

    #[test]
    fn test_too_many_symbols() {
        let mut counts = [0u8; 16];
        counts[15] = 177;
        let symbols = vec![0u8; 177];
        assert_eq!(
            HuffmanTable::from_counts(&counts, &symbols),
            Err(ValidationError::TooManyHuffmanSymbols(177))
        );
    }

    #[test]
    fn test_next_symbol() {
        let table = luminance_dc();
        // 010 -> 1, 1110 -> 6, 00 -> 0, then padding ones.
        let data = [0b0101_1100, 0b0111_1111];
        let mut bitstream = Bitstream::new(&data);
        assert_eq!(table.next_symbol(&mut bitstream).unwrap(), 1);
        assert_eq!(table.next_symbol(&mut bitstream).unwrap(), 6);
        assert_eq!(table.next_symbol(&mut bitstream).unwrap(), 0);
    }

    #[test]
    fn test_no_matching_code() {
        let table = luminance_dc();
        let data = [0xFF, 0x00, 0xFF, 0x00];
        let mut bitstream = Bitstream::new(&data);
        let err = table.next_symbol(&mut bitstream).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Decode);
    }

    #[test]
    fn test_truncated_code_is_decode_error() {
        let table = luminance_dc();
        let data = [0xFF, 0x00];
        let mut bitstream = Bitstream::new(&data);
        let err = table.next_symbol(&mut bitstream).unwrap_err();
        assert_eq!(err, DecodeError::TruncatedHuffmanCode.at(2));
    }

    #[test]
    fn test_sign_extension() {
        for length in 1..=11u8 {
            let half = 1i32 << (length - 1);
            let full = (1i32 << length) - 1;
            for bits in 0..(1u16 << length) {
                let value = decode_value_bits(bits, length);
                let expected = if (bits as i32) >= half {
                    bits as i32
                } else {
                    bits as i32 - full
                };
                assert_eq!(value, expected);
                assert!(value.abs() <= full && value.abs() >= half);
            }
        }
        assert_eq!(decode_value_bits(0, 0), 0);
    }

    #[test]
    fn test_store_is_write_once() {
        let mut store = HuffmanTableStore::new();
        store.insert(HuffmanTableClass::Dc, 1, luminance_dc()).unwrap();
        assert!(store.is_set(HuffmanTableClass::Dc, 1));
        assert!(!store.is_set(HuffmanTableClass::Ac, 1));
        store.insert(HuffmanTableClass::Ac, 1, luminance_dc()).unwrap();
        assert_eq!(
            store.insert(HuffmanTableClass::Dc, 1, luminance_dc()),
            Err(ValidationError::DuplicateHuffmanTable { class: "DC", id: 1 })
        );
        assert_eq!(
            store.insert(HuffmanTableClass::Dc, 4, luminance_dc()),
            Err(ValidationError::InvalidHuffmanTableId(4))
        );
        assert_eq!(store.defined().count(), 2);
    }
}
