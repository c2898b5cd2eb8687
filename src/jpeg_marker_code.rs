use num_enum::{IntoPrimitive, TryFromPrimitive};

pub const JPEG_MARKER_START_BYTE: u8 = 0xFF;
/// Byte following a literal 0xFF inside entropy-coded data.
pub const JPEG_STUFFED_BYTE: u8 = 0x00;
pub const JPEG_RESTART_MARKER_BASE: u8 = 0xD0;
pub const JPEG_RESTART_MARKER_RANGE: u8 = 8;

/// Start of frame flavours (ITU-T T.81, Table B.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum FrameType {
    /// SOF0: Baseline DCT, Huffman coding.
    BaselineDct = 0xC0,
    /// SOF1: Extended sequential DCT, Huffman coding.
    ExtendedSequentialDct = 0xC1,
    /// SOF2: Progressive DCT, Huffman coding.
    ProgressiveDct = 0xC2,
    /// SOF3: Lossless (sequential), Huffman coding.
    Lossless = 0xC3,
    /// SOF5: Differential sequential DCT, Huffman coding.
    DifferentialSequentialDct = 0xC5,
    /// SOF6: Differential progressive DCT, Huffman coding.
    DifferentialProgressiveDct = 0xC6,
    /// SOF7: Differential lossless, Huffman coding.
    DifferentialLossless = 0xC7,
    /// SOF9: Extended sequential DCT, arithmetic coding.
    ExtendedSequentialDctArithmetic = 0xC9,
    /// SOF10: Progressive DCT, arithmetic coding.
    ProgressiveDctArithmetic = 0xCA,
    /// SOF11: Lossless (sequential), arithmetic coding.
    LosslessArithmetic = 0xCB,
    /// SOF13: Differential sequential DCT, arithmetic coding.
    DifferentialSequentialDctArithmetic = 0xCD,
    /// SOF14: Differential progressive DCT, arithmetic coding.
    DifferentialProgressiveDctArithmetic = 0xCE,
    /// SOF15: Differential lossless, arithmetic coding.
    DifferentialLosslessArithmetic = 0xCF,
}

impl FrameType {
    pub fn is_arithmetic(self) -> bool {
        u8::from(self) >= 0xC9
    }

    pub fn is_progressive(self) -> bool {
        matches!(
            self,
            Self::ProgressiveDct | Self::DifferentialProgressiveDct | Self::ProgressiveDctArithmetic
                | Self::DifferentialProgressiveDctArithmetic
        )
    }
}

/// A marker code, i.e. the byte following 0xFF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JpegMarkerCode {
    /// SOFn: Marks the start of a frame of the given type.
    StartOfFrame(FrameType),

    /// DHT: Defines one or more Huffman tables.
    DefineHuffmanTable,

    /// DAC: Defines arithmetic coding conditioning.
    DefineArithmeticCoding,

    /// RSTm: Restart marker with modulo-8 count m.
    Restart(u8),

    /// SOI: Marks the start of an image.
    StartOfImage,

    /// EOI: Marks the end of an image.
    EndOfImage,

    /// SOS: Marks the start of scan.
    StartOfScan,

    /// DQT: Defines one or more quantization tables.
    DefineQuantizationTable,

    /// DNL: Defines the number of lines in a scan.
    DefineNumberOfLines,

    /// DRI: Defines the restart interval used in succeeding scans.
    DefineRestartInterval,

    /// DHP: Defines hierarchical progression.
    DefineHierarchicalProgression,

    /// EXP: Expands reference components.
    ExpandReferenceComponents,

    /// APPn: Application data n (JFIF, EXIF, ICC, Adobe, ...).
    ApplicationData(u8),

    /// JPGn: Reserved for JPEG extensions.
    JpegExtension(u8),

    /// COM: Comment block.
    Comment,

    /// TEM: For temporary private use in arithmetic coding; carries no length.
    Temporary,

    /// RES and the lone JPG code 0xC8.
    Reserved(u8),
}

impl JpegMarkerCode {
    /// Maps a marker code byte; `None` for 0x00 (stuffing) and 0xFF (fill).
    pub fn from_byte(code: u8) -> Option<Self> {
        let marker = match code {
            0x00 | 0xFF => return None,
            0x01 => Self::Temporary,
            0xC4 => Self::DefineHuffmanTable,
            0xC8 => Self::Reserved(code),
            0xCC => Self::DefineArithmeticCoding,
            0xC0..=0xCF => match FrameType::try_from(code) {
                Ok(frame_type) => Self::StartOfFrame(frame_type),
                Err(_) => Self::Reserved(code),
            },
            0xD0..=0xD7 => Self::Restart(code - JPEG_RESTART_MARKER_BASE),
            0xD8 => Self::StartOfImage,
            0xD9 => Self::EndOfImage,
            0xDA => Self::StartOfScan,
            0xDB => Self::DefineQuantizationTable,
            0xDC => Self::DefineNumberOfLines,
            0xDD => Self::DefineRestartInterval,
            0xDE => Self::DefineHierarchicalProgression,
            0xDF => Self::ExpandReferenceComponents,
            0xE0..=0xEF => Self::ApplicationData(code - 0xE0),
            0xF0..=0xFD => Self::JpegExtension(code - 0xF0),
            0xFE => Self::Comment,
            _ => Self::Reserved(code),
        };
        Some(marker)
    }

    pub fn code(self) -> u8 {
        match self {
            Self::StartOfFrame(frame_type) => frame_type.into(),
            Self::DefineHuffmanTable => 0xC4,
            Self::DefineArithmeticCoding => 0xCC,
            Self::Restart(n) => JPEG_RESTART_MARKER_BASE + n,
            Self::StartOfImage => 0xD8,
            Self::EndOfImage => 0xD9,
            Self::StartOfScan => 0xDA,
            Self::DefineQuantizationTable => 0xDB,
            Self::DefineNumberOfLines => 0xDC,
            Self::DefineRestartInterval => 0xDD,
            Self::DefineHierarchicalProgression => 0xDE,
            Self::ExpandReferenceComponents => 0xDF,
            Self::ApplicationData(n) => 0xE0 + n,
            Self::JpegExtension(n) => 0xF0 + n,
            Self::Comment => 0xFE,
            Self::Temporary => 0x01,
            Self::Reserved(code) => code,
        }
    }

    /// Short mnemonic used in log output.
    pub fn name(self) -> &'static str {
        match self {
            Self::StartOfFrame(_) => "SOF",
            Self::DefineHuffmanTable => "DHT",
            Self::DefineArithmeticCoding => "DAC",
            Self::Restart(_) => "RST",
            Self::StartOfImage => "SOI",
            Self::EndOfImage => "EOI",
            Self::StartOfScan => "SOS",
            Self::DefineQuantizationTable => "DQT",
            Self::DefineNumberOfLines => "DNL",
            Self::DefineRestartInterval => "DRI",
            Self::DefineHierarchicalProgression => "DHP",
            Self::ExpandReferenceComponents => "EXP",
            Self::ApplicationData(_) => "APP",
            Self::JpegExtension(_) => "JPG",
            Self::Comment => "COM",
            Self::Temporary => "TEM",
            Self::Reserved(_) => "RES",
        }
    }
}

pub fn is_restart_marker(code: u8) -> bool {
    (JPEG_RESTART_MARKER_BASE..JPEG_RESTART_MARKER_BASE + JPEG_RESTART_MARKER_RANGE).contains(&code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_marker_byte_round_trips() {
        for code in 0x01..=0xFEu8 {
            let marker = JpegMarkerCode::from_byte(code).unwrap();
            assert_eq!(marker.code(), code, "{:?}", marker);
        }
        assert_eq!(JpegMarkerCode::from_byte(0x00), None);
        assert_eq!(JpegMarkerCode::from_byte(0xFF), None);
    }

    #[test]
    fn test_parametrized_ranges() {
        assert_eq!(JpegMarkerCode::from_byte(0xD5), Some(JpegMarkerCode::Restart(5)));
        assert_eq!(JpegMarkerCode::from_byte(0xEE), Some(JpegMarkerCode::ApplicationData(14)));
        assert_eq!(
            JpegMarkerCode::from_byte(0xC2),
            Some(JpegMarkerCode::StartOfFrame(FrameType::ProgressiveDct))
        );
        assert_eq!(JpegMarkerCode::from_byte(0xC8), Some(JpegMarkerCode::Reserved(0xC8)));
        assert!(is_restart_marker(0xD7));
        assert!(!is_restart_marker(0xD8));
    }

    #[test]
    fn test_frame_type_families() {
        assert!(FrameType::ProgressiveDct.is_progressive());
        assert!(!FrameType::ProgressiveDct.is_arithmetic());
        assert!(FrameType::ExtendedSequentialDctArithmetic.is_arithmetic());
        assert!(!FrameType::BaselineDct.is_arithmetic());
    }
}
