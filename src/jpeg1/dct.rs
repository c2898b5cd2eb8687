//! Inverse Discrete Cosine Transform for 8x8 blocks.
//!
//! [`idct_8x8`] is a separable AAN-style butterfly run over columns and then rows.
//! [`idct_8x8_reference`] evaluates the defining double sum directly and is only used to
//! check and benchmark the fast path.

use crate::constants::{BLOCK_DIM, BLOCK_SIZE};
use crate::error::Result;
use crate::jpeg1::image::{BlockGrid, ComponentPlane, ImageHeader};
use log::debug;
use std::f64::consts::PI;
use std::sync::LazyLock;

/// Butterfly multipliers (`m*`) and per-frequency input scales (`s*`).
struct IdctConstants {
    m1: f64,
    m2: f64,
    m3: f64,
    m4: f64,
    m5: f64,
    s: [f64; BLOCK_SIZE],
}

static IDCT_CONSTANTS: LazyLock<IdctConstants> = LazyLock::new(|| {
    let m0 = 2.0 * (2.0 * PI / 16.0).cos();
    let m1 = 2.0 * (4.0 * PI / 16.0).cos();
    let m5 = 2.0 * (6.0 * PI / 16.0).cos();

    let mut s = [0.0f64; BLOCK_SIZE];
    s[0] = 1.0 / 8.0f64.sqrt();
    for (k, scale) in s.iter_mut().enumerate().skip(1) {
        *scale = (k as f64 * PI / 16.0).cos() / 2.0;
    }

    IdctConstants {
        m1,
        m2: m0 - m5,
        m3: m1,
        m4: m0 + m5,
        m5,
        s,
    }
});

/// One 8-point inverse transform over `block[base + k * stride]`, k = 0..8.
#[inline]
fn idct_1d(block: &mut [f64; BLOCK_DIM], base: usize, stride: usize, bias: f64) {
    let k = &*IDCT_CONSTANTS;
    let at = |i: usize| block[base + i * stride];

    let g0 = at(0) * k.s[0];
    let g1 = at(4) * k.s[4];
    let g2 = at(2) * k.s[2];
    let g3 = at(6) * k.s[6];
    let g4 = at(5) * k.s[5];
    let g5 = at(1) * k.s[1];
    let g6 = at(7) * k.s[7];
    let g7 = at(3) * k.s[3];

    let f4 = g4 - g7;
    let f5 = g5 + g6;
    let f6 = g5 - g6;
    let f7 = g4 + g7;

    let e2 = g2 - g3;
    let e3 = g2 + g3;
    let e5 = f5 - f7;
    let e7 = f5 + f7;
    let e8 = f4 + f6;

    let d2 = e2 * k.m1;
    let d4 = f4 * k.m2;
    let d5 = e5 * k.m3;
    let d6 = f6 * k.m4;
    let d8 = e8 * k.m5;

    let c0 = g0 + g1;
    let c1 = g0 - g1;
    let c2 = d2 - e3;
    let c4 = d4 + d8;
    let c5 = d5 + e7;
    let c6 = d6 - d8;
    let c8 = c5 - c6;

    let b0 = c0 + e3;
    let b1 = c1 + c2;
    let b2 = c1 - c2;
    let b3 = c0 - e3;
    let b4 = c4 - c8;
    let b6 = c6 - e7;

    let out = [
        b0 + e7,
        b1 + b6,
        b2 + c8,
        b3 + b4,
        b3 - b4,
        b2 - c8,
        b1 - b6,
        b0 - e7,
    ];
    for (i, value) in out.into_iter().enumerate() {
        block[base + i * stride] = value + bias;
    }
}

/// Transforms a block of dequantized coefficients (natural order) into spatial samples.
///
/// The output is centred on zero; level shifting happens during colour conversion. The
/// second pass adds 0.5, so truncating `sample + 128` later rounds to nearest.
pub fn idct_8x8(block: &mut [f64; BLOCK_DIM]) {
    for column in 0..BLOCK_SIZE {
        idct_1d(block, column, BLOCK_SIZE, 0.0);
    }
    for row in 0..BLOCK_SIZE {
        idct_1d(block, row * BLOCK_SIZE, 1, 0.5);
    }
}

/// Direct evaluation of the 2D IDCT, with the same 0.5 bias as [`idct_8x8`].
pub fn idct_8x8_reference(input: &[f64; BLOCK_DIM], output: &mut [f64; BLOCK_DIM]) {
    let c = |u: usize| if u == 0 { 1.0 / 2.0f64.sqrt() } else { 1.0 };
    for y in 0..BLOCK_SIZE {
        for x in 0..BLOCK_SIZE {
            let mut sum = 0.0f64;
            for v in 0..BLOCK_SIZE {
                for u in 0..BLOCK_SIZE {
                    let cos_x = (((2 * x + 1) * u) as f64 * PI / 16.0).cos();
                    let cos_y = (((2 * y + 1) * v) as f64 * PI / 16.0).cos();
                    sum += c(u) * c(v) * input[v * BLOCK_SIZE + u] * cos_x * cos_y;
                }
            }
            output[y * BLOCK_SIZE + x] = 0.25 * sum + 0.5;
        }
    }
}

/// Runs [`idct_8x8`] over every plane of every frame component.
pub fn inverse_dct(header: &ImageHeader, grid: &mut BlockGrid) -> Result<()> {
    header.ensure_not_subsampled()?;

    let planes: Vec<ComponentPlane> = header.frame_components().map(|(plane, _)| plane).collect();
    debug!("Inverse DCT over {} blocks, {} planes", grid.len(), planes.len());
    grid.for_each_block_mut(|block| {
        for &plane in &planes {
            idct_8x8(block.plane_mut(plane));
        }
    });
    Ok(())
}
