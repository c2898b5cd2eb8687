use thiserror::Error;

/// The four failure families a decode can end in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Structural,
    UnsupportedFeature,
    Validation,
    Decode,
}

/// Error returned by every decoding operation.
///
/// All errors are fatal: decoding stops at the first one and no partial image is produced.
/// `offset` is the byte position in the source at which the problem was detected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JpegError {
    #[error("structural error at byte {offset}: {kind}")]
    Structural { offset: usize, kind: StructuralError },

    #[error("unsupported feature at byte {offset}: {feature}")]
    UnsupportedFeature {
        offset: usize,
        feature: UnsupportedFeature,
    },

    #[error("invalid value at byte {offset}: {kind}")]
    Validation { offset: usize, kind: ValidationError },

    #[error("entropy decoding failed at byte {offset}: {kind}")]
    Decode { offset: usize, kind: DecodeError },
}

impl JpegError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Structural { .. } => ErrorCategory::Structural,
            Self::UnsupportedFeature { .. } => ErrorCategory::UnsupportedFeature,
            Self::Validation { .. } => ErrorCategory::Validation,
            Self::Decode { .. } => ErrorCategory::Decode,
        }
    }

    pub fn offset(&self) -> usize {
        match self {
            Self::Structural { offset, .. }
            | Self::UnsupportedFeature { offset, .. }
            | Self::Validation { offset, .. }
            | Self::Decode { offset, .. } => *offset,
        }
    }
}

/// Bad stream layout: missing or misplaced markers, truncation, wrong segment sizes.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuralError {
    #[error("Start of image marker not found")]
    StartOfImageMarkerNotFound,
    #[error("Expected a marker start byte, found 0x{0:02X}")]
    JpegMarkerStartByteNotFound(u8),
    #[error("Unexpected end of stream")]
    UnexpectedEndOfStream,
    #[error("Invalid {segment} marker segment size {length}")]
    InvalidMarkerSegmentSize { segment: &'static str, length: u16 },
    #[error("Duplicate start of frame marker")]
    DuplicateStartOfFrameMarker,
    #[error("Start of scan marker before start of frame")]
    MissingStartOfFrame,
    #[error("Embedded start of image marker")]
    DuplicateStartOfImageMarker,
    #[error("End of image marker before start of scan")]
    UnexpectedEndOfImageMarker,
    #[error("Restart marker RST{0} before start of scan")]
    UnexpectedRestartMarker(u8),
    #[error("Restart marker RST{found} out of sequence, expected RST{expected}")]
    RestartMarkerOutOfSequence { expected: u8, found: u8 },
    #[error("Unknown JPEG marker 0xFF{0:02X}")]
    UnknownJpegMarkerFound(u8),
    #[error("Marker 0xFF{0:02X} inside entropy-coded data")]
    UnexpectedMarkerInScan(u8),
    #[error("Marker 0xFF{0:02X} after scan data")]
    UnexpectedMarkerAfterScan(u8),
}

/// Features of the JPEG family that this decoder recognizes and refuses.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsupportedFeature {
    #[error("Progressive DCT frames are not supported")]
    ProgressiveDct,
    #[error("Arithmetic coding is not supported")]
    ArithmeticCoding,
    #[error("Frame type 0xFF{0:02X} is not supported")]
    FrameType(u8),
    #[error("CMYK (4 component) frames are not supported")]
    Cmyk,
    #[error("Sample precision of {0} bits is not supported")]
    SamplePrecision(u8),
    #[error("Sampling factors {horizontal}x{vertical} of component {component} are not supported")]
    SamplingFactor {
        component: u8,
        horizontal: u8,
        vertical: u8,
    },
    #[error("Chroma subsampling is not supported")]
    ChromaSubsampling,
}

/// A field value that is out of range or violates a use-once rule.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid frame dimensions {width}x{height}")]
    InvalidDimensions { width: u16, height: u16 },
    #[error("Image of {pixels} pixels exceeds the configured limit of {limit}")]
    ImageTooLarge { pixels: u64, limit: u64 },
    #[error("Invalid component count {0} (1 or 3 required)")]
    InvalidComponentCount(u8),
    #[error("Invalid component ID {0}")]
    InvalidComponentId(u8),
    #[error("Duplicate component ID {0} in SOF segment")]
    DuplicateComponentIdInFrame(u8),
    #[error("Duplicate component ID {0} in SOS segment")]
    DuplicateComponentIdInScan(u8),
    #[error("Invalid component count {0} in scan")]
    InvalidComponentCountInScan(u8),
    #[error("Invalid component plane index {0}")]
    InvalidComponentPlane(usize),
    #[error("Invalid quantization table ID {0}")]
    InvalidQuantizationTableId(u8),
    #[error("Invalid quantization table precision {0}")]
    InvalidQuantizationPrecision(u8),
    #[error("Quantization table {0} is already defined")]
    DuplicateQuantizationTable(u8),
    #[error("Component {component} uses undefined quantization table {table}")]
    UndefinedQuantizationTable { component: u8, table: u8 },
    #[error("Invalid Huffman table class {0}")]
    InvalidHuffmanTableClass(u8),
    #[error("Invalid Huffman table ID {0}")]
    InvalidHuffmanTableId(u8),
    #[error("Huffman {class} table {id} is already defined")]
    DuplicateHuffmanTable { class: &'static str, id: u8 },
    #[error("Component {component} uses undefined Huffman {class} table {id}")]
    UndefinedHuffmanTable {
        component: u8,
        class: &'static str,
        id: u8,
    },
    #[error("Too many symbols in Huffman table: {0}")]
    TooManyHuffmanSymbols(usize),
    #[error("Huffman code lengths are over-subscribed at length {0}")]
    InvalidHuffmanCodeLengths(usize),
    #[error("Invalid spectral selection {start}..{end} for a baseline scan")]
    InvalidSpectralSelection { start: u8, end: u8 },
    #[error("Invalid successive approximation {high}/{low} for a baseline scan")]
    InvalidSuccessiveApproximation { high: u8, low: u8 },
    #[error("DC coefficient length {0} greater than 11")]
    DcCoefficientLength(u8),
    #[error("AC coefficient length {0} greater than 10")]
    AcCoefficientLength(u8),
    #[error("Zero run-length exceeded block component at index {0}")]
    ZeroRunOverflow(usize),
    #[error("DC predictor {previous} plus difference {difference} overflows")]
    DcPredictorOverflow { previous: i32, difference: i32 },
}

/// Entropy-coded data that does not decode against the active Huffman tables.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("No Huffman code matched within 16 bits")]
    NoMatchingHuffmanCode,
    #[error("Stream ended inside a Huffman code")]
    TruncatedHuffmanCode,
}

impl StructuralError {
    pub fn at(self, offset: usize) -> JpegError {
        JpegError::Structural { offset, kind: self }
    }
}

impl UnsupportedFeature {
    pub fn at(self, offset: usize) -> JpegError {
        JpegError::UnsupportedFeature {
            offset,
            feature: self,
        }
    }
}

impl ValidationError {
    pub fn at(self, offset: usize) -> JpegError {
        JpegError::Validation { offset, kind: self }
    }
}

impl DecodeError {
    pub fn at(self, offset: usize) -> JpegError {
        JpegError::Decode { offset, kind: self }
    }
}

pub type Result<T> = std::result::Result<T, JpegError>;
