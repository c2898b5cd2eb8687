//! 24-bit BMP output for decoded images.
//!
//! Files use the 12-byte OS/2 `BITMAPCOREHEADER`, rows stored bottom-up in BGR order and
//! padded to a multiple of 4 bytes.

use crate::jpeg1::DecodedImage;
use std::io::{self, Write};

const FILE_HEADER_SIZE: u32 = 14;
const CORE_HEADER_SIZE: u32 = 12;
const BITS_PER_PIXEL: u16 = 24;

/// Zero bytes appended to each row of `width` pixels.
pub fn row_padding(width: usize) -> usize {
    (4 - (width * 3) % 4) % 4
}

/// Little-endian BMP writer over any byte sink.
pub struct BmpWriter<W: Write> {
    sink: W,
}

impl<W: Write> BmpWriter<W> {
    pub fn new(sink: W) -> Self {
        Self { sink }
    }

    fn write_u16(&mut self, value: u16) -> io::Result<()> {
        self.sink.write_all(&value.to_le_bytes())
    }

    fn write_u32(&mut self, value: u32) -> io::Result<()> {
        self.sink.write_all(&value.to_le_bytes())
    }

    pub fn write_image(&mut self, image: &DecodedImage) -> io::Result<()> {
        let width = image.width() as usize;
        let height = image.height() as usize;
        let padding = row_padding(width);
        let pixel_bytes = (width * 3 + padding) * height;
        let offset = FILE_HEADER_SIZE + CORE_HEADER_SIZE;
        let file_size = u32::try_from(pixel_bytes)
            .ok()
            .and_then(|bytes| bytes.checked_add(offset))
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "image too large for BMP"))?;

        self.sink.write_all(b"BM")?;
        self.write_u32(file_size)?;
        self.write_u32(0)?;
        self.write_u32(offset)?;

        self.write_u32(CORE_HEADER_SIZE)?;
        self.write_u16(image.width())?;
        self.write_u16(image.height())?;
        self.write_u16(1)?;
        self.write_u16(BITS_PER_PIXEL)?;

        let mut row = Vec::with_capacity(width * 3 + padding);
        for y in (0..height).rev() {
            row.clear();
            for x in 0..width {
                let [r, g, b] = image.pixel(x, y).unwrap_or_default();
                row.extend_from_slice(&[b, g, r]);
            }
            row.resize(width * 3 + padding, 0);
            self.sink.write_all(&row)?;
        }
        self.sink.flush()
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}

/// Writes `image` as a BMP file to `sink`.
pub fn write_bmp<W: Write>(sink: W, image: &DecodedImage) -> io::Result<()> {
    BmpWriter::new(sink).write_image(image)
}

/// Encodes `image` as an in-memory BMP file.
pub fn encode_bmp(image: &DecodedImage) -> io::Result<Vec<u8>> {
    let mut writer = BmpWriter::new(Vec::new());
    writer.write_image(image)?;
    Ok(writer.into_inner())
}
