//! JPEG 1 (Baseline) Implementation (ISO/IEC 10918-1 / ITU-T T.81)
//!
//! This module implements baseline sequential DCT decoding.
//!
//! Features:
//! - 8-bit grayscale and YCbCr (1x1 sampling) frames.
//! - Huffman coding with tables defined in the stream.
//! - Restart Markers (DRI/RSTm), with optional strict sequence checking.
//! - Interleaved and non-interleaved (one scan per component) scans.
//!
//! The pipeline runs entropy decoding, dequantization, the inverse DCT and colour conversion
//! in turn over one shared [`image::BlockGrid`].

pub mod bitstream;
pub mod color;
pub mod dct;
pub mod decoder;
pub mod huffman;
pub mod image;
pub mod quantization;
pub mod scan_decoder;

pub use decoder::{DecodedImage, DecoderOptions, Jpeg1Decoder};
