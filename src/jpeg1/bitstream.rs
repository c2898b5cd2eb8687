//! Byte and bit level reader over a JPEG byte stream.
//!
//! Bits are read MSB-first. Inside entropy-coded data a literal 0xFF is followed by a
//! stuffed 0x00, and restart markers (RST0..RST7) may appear between bytes; both are
//! removed transparently by [`Bitstream::read_bit`].

use crate::error::{Result, StructuralError};
use crate::jpeg_marker_code::{
    JPEG_MARKER_START_BYTE, JPEG_RESTART_MARKER_BASE, JPEG_STUFFED_BYTE, is_restart_marker,
};
use log::trace;

pub struct Bitstream<'a> {
    source: &'a [u8],
    position: usize,
    current_byte: u8,
    /// Index of the next bit to hand out from `current_byte`; 0 means a new byte is needed.
    next_bit: u8,
    restart_markers_consumed: usize,
    last_restart_marker: Option<u8>,
}

impl<'a> Bitstream<'a> {
    pub fn new(source: &'a [u8]) -> Self {
        Self {
            source,
            position: 0,
            current_byte: 0,
            next_bit: 0,
            restart_markers_consumed: 0,
            last_restart_marker: None,
        }
    }

    /// Offset of the next unread byte.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn has_bytes(&self) -> bool {
        self.position < self.source.len()
    }

    pub fn remaining(&self) -> usize {
        self.source.len() - self.position
    }

    pub fn read_byte(&mut self) -> Result<u8> {
        let byte = self.peek_byte()?;
        self.position += 1;
        Ok(byte)
    }

    pub fn peek_byte(&self) -> Result<u8> {
        self.source
            .get(self.position)
            .copied()
            .ok_or_else(|| StructuralError::UnexpectedEndOfStream.at(self.position))
    }

    /// Big-endian 16-bit word.
    pub fn read_word(&mut self) -> Result<u16> {
        let high = self.read_byte()? as u16;
        let low = self.read_byte()? as u16;
        Ok((high << 8) | low)
    }

    /// Discards `count` bytes.
    pub fn skip(&mut self, count: usize) -> Result<()> {
        if count > self.remaining() {
            self.position = self.source.len();
            return Err(StructuralError::UnexpectedEndOfStream.at(self.position));
        }
        self.position += count;
        Ok(())
    }

    pub fn read_bit(&mut self) -> Result<u8> {
        if self.next_bit == 0 {
            self.current_byte = self.fetch_data_byte()?;
        }

        let bit = (self.current_byte >> (7 - self.next_bit)) & 1;
        self.next_bit = (self.next_bit + 1) % 8;
        Ok(bit)
    }

    /// Reads `count` bits (at most 16) and accumulates them MSB-first.
    pub fn read_bits(&mut self, count: u8) -> Result<u16> {
        debug_assert!(count <= 16);
        let mut bits = 0u16;
        for _ in 0..count {
            bits = (bits << 1) | self.read_bit()? as u16;
        }
        Ok(bits)
    }

    /// Drops whatever is left of the current byte so the next bit read starts on a fresh one.
    pub fn align(&mut self) {
        self.next_bit = 0;
    }

    pub fn is_aligned(&self) -> bool {
        self.next_bit == 0
    }

    pub fn restart_markers_consumed(&self) -> usize {
        self.restart_markers_consumed
    }

    /// Number (0..=7) of the most recently consumed restart marker.
    pub fn last_restart_marker(&self) -> Option<u8> {
        self.last_restart_marker
    }

    /// Next byte of entropy-coded data, with stuffing and restart markers removed.
    fn fetch_data_byte(&mut self) -> Result<u8> {
        loop {
            let byte = self.read_byte()?;
            if byte != JPEG_MARKER_START_BYTE {
                return Ok(byte);
            }

            let mut code = self.peek_byte()?;
            while code == JPEG_MARKER_START_BYTE {
                self.position += 1;
                code = self.peek_byte()?;
            }

            if code == JPEG_STUFFED_BYTE {
                self.position += 1;
                return Ok(JPEG_MARKER_START_BYTE);
            }

            if !is_restart_marker(code) {
                return Err(StructuralError::UnexpectedMarkerInScan(code).at(self.position));
            }

            self.position += 1;
            let number = code - JPEG_RESTART_MARKER_BASE;
            trace!("RST{} consumed at byte {}", number, self.position - 2);
            self.restart_markers_consumed += 1;
            self.last_restart_marker = Some(number);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    #[test]
    fn test_bytes_and_words() {
        let data = [0x12, 0x34, 0x56];
        let mut bitstream = Bitstream::new(&data);
        assert_eq!(bitstream.peek_byte().unwrap(), 0x12);
        assert_eq!(bitstream.read_word().unwrap(), 0x1234);
        assert_eq!(bitstream.read_byte().unwrap(), 0x56);

        let err = bitstream.read_byte().unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Structural);
        assert_eq!(err.offset(), 3);
    }

    #[test]
    fn test_bits_are_msb_first() {
        let data = [0b1011_0010, 0b0111_1111];
        let mut bitstream = Bitstream::new(&data);
        assert_eq!(bitstream.read_bit().unwrap(), 1);
        assert_eq!(bitstream.read_bits(3).unwrap(), 0b011);
        assert_eq!(bitstream.read_bits(6).unwrap(), 0b0010_01);
        assert_eq!(bitstream.read_bits(6).unwrap(), 0b11_1111);
        assert_eq!(bitstream.read_bits(0).unwrap(), 0);
    }

    #[test]
    fn test_stuffed_ff_is_literal_data() {
        let data = [0xFF, 0x00, 0x80];
        let mut bitstream = Bitstream::new(&data);
        assert_eq!(bitstream.read_bits(8).unwrap(), 0xFF);
        assert_eq!(bitstream.read_bit().unwrap(), 1);
        assert_eq!(bitstream.position(), 3);
    }

    #[test]
    fn test_restart_marker_is_skipped() {
        let data = [0xA0, 0xFF, 0xD3, 0xC0];
        let mut bitstream = Bitstream::new(&data);
        assert_eq!(bitstream.read_bits(3).unwrap(), 0b101);
        bitstream.align();
        assert!(bitstream.is_aligned());
        assert_eq!(bitstream.read_bits(2).unwrap(), 0b11);
        assert_eq!(bitstream.restart_markers_consumed(), 1);
        assert_eq!(bitstream.last_restart_marker(), Some(3));
    }

    #[test]
    fn test_fill_bytes_before_restart_marker() {
        let data = [0xFF, 0xFF, 0xFF, 0xD0, 0x40];
        let mut bitstream = Bitstream::new(&data);
        assert_eq!(bitstream.read_bits(2).unwrap(), 0b01);
        assert_eq!(bitstream.position(), 5);
    }

    #[test]
    fn test_other_marker_in_entropy_data() {
        let data = [0xFF, 0xD9];
        let mut bitstream = Bitstream::new(&data);
        let err = bitstream.read_bit().unwrap_err();
        assert_eq!(err, StructuralError::UnexpectedMarkerInScan(0xD9).at(1));
    }

    #[test]
    fn test_skip_past_end() {
        let data = [0u8; 4];
        let mut bitstream = Bitstream::new(&data);
        bitstream.skip(3).unwrap();
        assert!(bitstream.skip(2).is_err());
    }
}
