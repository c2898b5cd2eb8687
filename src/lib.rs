//! Baseline sequential JPEG (ITU-T T.81, SOF0) decoding.
//!
//! ```no_run
//! let data = std::fs::read("image.jpg").unwrap();
//! let image = jpegdec_rs::decode(&data).unwrap();
//! println!("{}x{}: {:?}", image.width(), image.height(), image.pixel(0, 0));
//! ```

pub mod bmp_writer;
pub mod constants;
pub mod error;
pub mod jpeg1;
pub mod jpeg_marker_code;
pub mod jpeg_stream_reader;

pub use error::{ErrorCategory, JpegError, Result};
pub use jpeg1::{DecodedImage, DecoderOptions, Jpeg1Decoder};
pub use jpeg_marker_code::FrameType;

/// Frame parameters known once the header segments have been read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    pub width: u16,
    pub height: u16,
    pub bits_per_sample: u8,
    pub component_count: u8,
    pub restart_interval: u16,
    pub frame_type: FrameType,
}

/// Decodes a complete baseline JPEG stream with default options.
pub fn decode(source: &[u8]) -> Result<DecodedImage> {
    Jpeg1Decoder::new(source).decode()
}
