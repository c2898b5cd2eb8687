//! JPEG 1 Baseline Decoder implementation.

use crate::FrameInfo;
use crate::constants::DEFAULT_MAXIMUM_PIXELS;
use crate::error::{Result, StructuralError, ValidationError};
use crate::jpeg_stream_reader::{JpegStreamReader, ScanEnd};
use crate::jpeg1::color::{sample_at, ycbcr_to_rgb_image};
use crate::jpeg1::dct::inverse_dct;
use crate::jpeg1::huffman::HuffmanTableStore;
use crate::jpeg1::image::{BlockGrid, ComponentPlane, ImageHeader};
use crate::jpeg1::quantization::{QuantizationTableStore, dequantize};
use log::debug;

/// Knobs for a decode session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderOptions {
    /// Frames with more pixels than this are refused before any pixel memory is allocated.
    pub max_pixels: u64,
    /// Treat an out-of-sequence RSTn as a structural error instead of a warning.
    pub strict_restart_markers: bool,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            max_pixels: DEFAULT_MAXIMUM_PIXELS,
            strict_restart_markers: false,
        }
    }
}

impl DecoderOptions {
    pub fn with_max_pixels(mut self, max_pixels: u64) -> Self {
        self.max_pixels = max_pixels;
        self
    }

    pub fn with_strict_restart_markers(mut self, strict: bool) -> Self {
        self.strict_restart_markers = strict;
        self
    }
}

pub struct Jpeg1Decoder<'a> {
    reader: JpegStreamReader<'a>,
    options: DecoderOptions,
}

impl<'a> Jpeg1Decoder<'a> {
    pub fn new(source: &'a [u8]) -> Self {
        Self::with_options(source, DecoderOptions::default())
    }

    pub fn with_options(source: &'a [u8], options: DecoderOptions) -> Self {
        Self {
            reader: JpegStreamReader::new(source),
            options,
        }
    }

    /// Parses every segment before the first scan and describes the frame.
    pub fn read_header(&mut self) -> Result<FrameInfo> {
        self.reader.read_header()?;
        self.reader
            .frame_info()
            .ok_or(StructuralError::MissingStartOfFrame.at(self.reader.position()))
    }

    pub fn header(&self) -> &ImageHeader {
        self.reader.header()
    }

    pub fn quantization_tables(&self) -> &QuantizationTableStore {
        self.reader.quantization_tables()
    }

    pub fn huffman_tables(&self) -> &HuffmanTableStore {
        self.reader.huffman_tables()
    }

    /// Decodes the whole stream. Any failure aborts the decode; no partial image is returned.
    pub fn decode(mut self) -> Result<DecodedImage> {
        let info = self.read_header()?;

        let pixels = self.reader.header().pixel_count();
        if pixels > self.options.max_pixels {
            return Err(ValidationError::ImageTooLarge {
                pixels,
                limit: self.options.max_pixels,
            }
            .at(self.reader.header().frame_offset));
        }

        let mut grid = BlockGrid::for_header(self.reader.header());
        loop {
            self.reader.read_start_of_scan()?;
            self.reader
                .decode_scan(&mut grid, self.options.strict_restart_markers)?;
            match self.reader.read_after_scan()? {
                ScanEnd::NextScan => continue,
                ScanEnd::EndOfImage => break,
            }
        }
        debug!("{} scan(s) decoded", self.reader.scan_count());

        let header = self.reader.header();
        dequantize(header, self.reader.quantization_tables(), &mut grid)?;
        inverse_dct(header, &mut grid)?;
        ycbcr_to_rgb_image(header, &mut grid)?;

        Ok(DecodedImage { info, grid })
    }
}

/// A fully decoded frame: RGB samples stored in 8x8 tiles.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    info: FrameInfo,
    grid: BlockGrid,
}

impl DecodedImage {
    pub fn width(&self) -> u16 {
        self.info.width
    }

    pub fn height(&self) -> u16 {
        self.info.height
    }

    pub fn component_count(&self) -> u8 {
        self.info.component_count
    }

    pub fn frame_info(&self) -> &FrameInfo {
        &self.info
    }

    /// RGB at (x, y), or `None` outside the frame.
    ///
    /// Pixels live in block `(y / 8) * block_width_real + x / 8` at `(y % 8) * 8 + x % 8`.
    /// Channels are truncated, not rounded.
    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 3]> {
        if x >= self.info.width as usize || y >= self.info.height as usize {
            return None;
        }
        let mut rgb = [0u8; 3];
        for (channel, plane) in rgb.iter_mut().zip(ComponentPlane::ALL) {
            *channel = sample_at(&self.grid, plane, x, y)? as u8;
        }
        Some(rgb)
    }

    /// Interleaved RGB rows, top to bottom.
    pub fn to_rgb8(&self) -> Vec<u8> {
        let (width, height) = (self.info.width as usize, self.info.height as usize);
        let mut out = Vec::with_capacity(width * height * 3);
        for y in 0..height {
            for x in 0..width {
                out.extend_from_slice(&self.pixel(x, y).unwrap_or_default());
            }
        }
        out
    }

    /// One byte per pixel. For colour frames this is the red channel; grayscale frames
    /// have R = G = B.
    pub fn to_luma8(&self) -> Vec<u8> {
        let (width, height) = (self.info.width as usize, self.info.height as usize);
        let mut out = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                out.push(self.pixel(x, y).map_or(0, |[r, _, _]| r));
            }
        }
        out
    }

    pub fn block_grid(&self) -> &BlockGrid {
        &self.grid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    #[test]
    fn test_options_builder() {
        let options = DecoderOptions::default()
            .with_max_pixels(10)
            .with_strict_restart_markers(true);
        assert_eq!(options.max_pixels, 10);
        assert!(options.strict_restart_markers);
        assert_eq!(DecoderOptions::default().max_pixels, 1 << 26);
    }

    #[test]
    fn test_empty_input() {
        let err = Jpeg1Decoder::new(&[]).decode().unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Structural);
        assert_eq!(err.offset(), 0);
    }

    #[test]
    fn test_pixel_limit_checked_before_allocation() {
        // SOI, SOF0 65535x65535 grayscale, SOS marker.
        let data = [
            0xFF, 0xD8, 0xFF, 0xC0, 0x00, 0x0B, 0x08, 0xFF, 0xFF, 0xFF, 0xFF, 0x01, 0x01, 0x11,
            0x00, 0xFF, 0xDA,
        ];
        let err = Jpeg1Decoder::new(&data).decode().unwrap_err();
        assert_eq!(
            err,
            ValidationError::ImageTooLarge {
                pixels: 65535 * 65535,
                limit: 1 << 26
            }
            .at(2)
        );
    }
}
