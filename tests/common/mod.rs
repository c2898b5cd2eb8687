//! Builders for small synthetic baseline JPEG streams.

#![allow(dead_code)]

/// MSB-first bit writer for entropy-coded data: 0xFF bytes are followed by a stuffed 0x00
/// and the final byte is padded with one bits.
#[derive(Default)]
pub struct JpegBitWriter {
    bytes: Vec<u8>,
    bit_buffer: u32,
    bits_in_buffer: u8,
}

impl JpegBitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_bits(&mut self, value: u32, length: u8) {
        if length == 0 {
            return;
        }
        let mask = (1u32 << length) - 1;
        self.bit_buffer = (self.bit_buffer << length) | (value & mask);
        self.bits_in_buffer += length;

        while self.bits_in_buffer >= 8 {
            let shift = self.bits_in_buffer - 8;
            let byte = ((self.bit_buffer >> shift) & 0xFF) as u8;
            self.bytes.push(byte);
            if byte == 0xFF {
                self.bytes.push(0x00);
            }
            self.bits_in_buffer = shift;
            self.bit_buffer &= (1u32 << shift) - 1;
        }
    }

    /// Magnitude category bits of a DC difference or AC coefficient.
    pub fn write_value(&mut self, value: i32) {
        let length = value_length(value);
        let bits = if value < 0 {
            value + (1 << length) - 1
        } else {
            value
        };
        self.write_bits(bits as u32, length);
    }

    pub fn flush(&mut self) {
        if self.bits_in_buffer > 0 {
            let pad_bits = 8 - self.bits_in_buffer;
            self.write_bits((1u32 << pad_bits) - 1, pad_bits);
        }
    }

    /// Pads the current byte and appends RSTn.
    pub fn restart(&mut self, number: u8) {
        self.flush();
        self.bytes.extend_from_slice(&[0xFF, 0xD0 + number]);
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.flush();
        self.bytes
    }
}

/// Number of magnitude bits needed for `value`.
pub fn value_length(value: i32) -> u8 {
    (32 - value.unsigned_abs().leading_zeros()) as u8
}

pub fn segment(marker: u8, payload: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0xFF, marker];
    bytes.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
    bytes.extend_from_slice(payload);
    bytes
}

/// DQT with every entry set to `value` (8-bit precision).
pub fn dqt(id: u8, value: u8) -> Vec<u8> {
    let mut payload = vec![id];
    payload.extend_from_slice(&[value; 64]);
    segment(0xDB, &payload)
}

/// DQT from 64 entries in zig-zag order (8-bit precision).
pub fn dqt_zigzag(id: u8, zigzag: &[u8; 64]) -> Vec<u8> {
    let mut payload = vec![id];
    payload.extend_from_slice(zigzag);
    segment(0xDB, &payload)
}

/// SOF with `(id, sampling, quantization table)` per component.
pub fn sof(marker: u8, width: u16, height: u16, components: &[(u8, u8, u8)]) -> Vec<u8> {
    let mut payload = vec![8];
    payload.extend_from_slice(&height.to_be_bytes());
    payload.extend_from_slice(&width.to_be_bytes());
    payload.push(components.len() as u8);
    for &(id, sampling, table) in components {
        payload.extend_from_slice(&[id, sampling, table]);
    }
    segment(marker, &payload)
}

pub fn sof0(width: u16, height: u16, components: &[(u8, u8, u8)]) -> Vec<u8> {
    sof(0xC0, width, height, components)
}

/// DHT entry from `(code length, symbols)` groups, in code order.
pub fn dht(class: u8, id: u8, groups: &[(usize, &[u8])]) -> Vec<u8> {
    let mut counts = [0u8; 16];
    let mut symbols = Vec::new();
    for &(length, group) in groups {
        counts[length - 1] += group.len() as u8;
        symbols.extend_from_slice(group);
    }
    let mut payload = vec![(class << 4) | id];
    payload.extend_from_slice(&counts);
    payload.extend_from_slice(&symbols);
    segment(0xC4, &payload)
}

pub fn dri(interval: u16) -> Vec<u8> {
    segment(0xDD, &interval.to_be_bytes())
}

/// SOS with `(component id, DC/AC table selectors)` pairs and full spectral selection.
pub fn sos(components: &[(u8, u8)]) -> Vec<u8> {
    let mut payload = vec![components.len() as u8];
    for &(id, tables) in components {
        payload.extend_from_slice(&[id, tables]);
    }
    payload.extend_from_slice(&[0, 63, 0]);
    segment(0xDA, &payload)
}

/// SOI, the given parts, then EOI.
pub fn jpeg(parts: &[Vec<u8>]) -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xD8];
    for part in parts {
        bytes.extend_from_slice(part);
    }
    bytes.extend_from_slice(&[0xFF, 0xD9]);
    bytes
}
