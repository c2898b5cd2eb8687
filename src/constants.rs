// Limits and fixed tables of ITU-T T.81 baseline sequential coding.

/// Samples per block edge.
pub const BLOCK_SIZE: usize = 8;
/// Samples (or coefficients) per 8x8 block.
pub const BLOCK_DIM: usize = BLOCK_SIZE * BLOCK_SIZE;

/// Number of quantization table slots, and of DC and of AC Huffman table slots.
pub const TABLE_SLOT_COUNT: usize = 4;
pub const MAXIMUM_TABLE_ID: u8 = (TABLE_SLOT_COUNT - 1) as u8;

/// Component slots kept per frame; a 4th component is only ever seen as CMYK and rejected.
pub const COMPONENT_SLOT_COUNT: usize = 4;
/// Sample planes per block (Y, Cb, Cr and later R, G, B).
pub const PLANE_COUNT: usize = 3;

pub const BASELINE_SAMPLE_PRECISION: u8 = 8;

pub const MAXIMUM_CODE_LENGTH: usize = 16;
/// Upper bound on symbols in one DHT table (162 AC symbols plus headroom).
pub const MAXIMUM_HUFFMAN_SYMBOLS: usize = 176;

pub const MAXIMUM_DC_COEFFICIENT_LENGTH: u8 = 11;
pub const MAXIMUM_AC_COEFFICIENT_LENGTH: u8 = 10;

/// AC symbol ending a block early.
pub const END_OF_BLOCK: u8 = 0x00;
/// AC symbol for a run of 16 zero coefficients.
pub const ZERO_RUN_LENGTH: u8 = 0xF0;

pub const BASELINE_SPECTRAL_START: u8 = 0;
pub const BASELINE_SPECTRAL_END: u8 = 63;

// The size in bytes of the segment length field.
pub const SEGMENT_LENGTH_SIZE: u16 = 2;

/// Default cap on `width * height` accepted before the block grid is allocated.
pub const DEFAULT_MAXIMUM_PIXELS: u64 = 1 << 26;

/// Maps the zig-zag scan index used on the wire to the natural row-major position.
#[rustfmt::skip]
pub const ZIGZAG_ORDER: [usize; BLOCK_DIM] = [
    0,  1,  8, 16,  9,  2,  3, 10,
    17, 24, 32, 25, 18, 11,  4,  5,
    12, 19, 26, 33, 40, 48, 41, 34,
    27, 20, 13,  6,  7, 14, 21, 28,
    35, 42, 49, 56, 57, 50, 43, 36,
    29, 22, 15, 23, 30, 37, 44, 51,
    58, 59, 52, 45, 38, 31, 39, 46,
    53, 60, 61, 54, 47, 55, 62, 63,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zigzag_is_a_permutation() {
        let mut seen = [false; BLOCK_DIM];
        for &position in ZIGZAG_ORDER.iter() {
            assert!(!seen[position], "position {} visited twice", position);
            seen[position] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_zigzag_walks_anti_diagonals() {
        // Consecutive scan positions never jump more than one anti-diagonal.
        for pair in ZIGZAG_ORDER.windows(2) {
            let diagonal = |p: usize| p / BLOCK_SIZE + p % BLOCK_SIZE;
            let step = diagonal(pair[1]) as isize - diagonal(pair[0]) as isize;
            assert!((0..=1).contains(&step));
        }
    }
}
