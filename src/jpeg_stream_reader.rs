use crate::FrameInfo;
use crate::constants::{
    BASELINE_SAMPLE_PRECISION, BASELINE_SPECTRAL_END, BASELINE_SPECTRAL_START, BLOCK_DIM,
    MAXIMUM_CODE_LENGTH, MAXIMUM_HUFFMAN_SYMBOLS, MAXIMUM_TABLE_ID, SEGMENT_LENGTH_SIZE,
};
use crate::error::{Result, StructuralError, UnsupportedFeature, ValidationError};
use crate::jpeg_marker_code::{FrameType, JPEG_MARKER_START_BYTE, JpegMarkerCode};
use crate::jpeg1::bitstream::Bitstream;
use crate::jpeg1::huffman::{HuffmanTable, HuffmanTableClass, HuffmanTableStore};
use crate::jpeg1::image::{BlockGrid, ImageHeader};
use crate::jpeg1::quantization::{QuantizationTable, QuantizationTableStore};
use crate::jpeg1::scan_decoder::ScanDecoder;
use log::{debug, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JpegStreamReaderState {
    BeforeStartOfImage,
    HeaderSection,
    ScanSection,
    AfterScan,
    EndOfImage,
}

/// What follows the entropy-coded data of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanEnd {
    NextScan,
    EndOfImage,
}

/// Marker and segment parser for a baseline sequential JPEG stream.
///
/// Owns the session's tables: nothing is shared between two readers.
pub struct JpegStreamReader<'a> {
    bitstream: Bitstream<'a>,
    state: JpegStreamReaderState,
    header: ImageHeader,
    quantization_tables: QuantizationTableStore,
    huffman_tables: HuffmanTableStore,
    /// A marker already read but not yet handled (the SOS that ends a header section).
    pending_marker: Option<(JpegMarkerCode, usize)>,
    scan_count: usize,
}

impl<'a> JpegStreamReader<'a> {
    pub fn new(source: &'a [u8]) -> Self {
        Self {
            bitstream: Bitstream::new(source),
            state: JpegStreamReaderState::BeforeStartOfImage,
            header: ImageHeader::default(),
            quantization_tables: QuantizationTableStore::new(),
            huffman_tables: HuffmanTableStore::new(),
            pending_marker: None,
            scan_count: 0,
        }
    }

    pub fn state(&self) -> JpegStreamReaderState {
        self.state
    }

    pub fn header(&self) -> &ImageHeader {
        &self.header
    }

    pub fn quantization_tables(&self) -> &QuantizationTableStore {
        &self.quantization_tables
    }

    pub fn huffman_tables(&self) -> &HuffmanTableStore {
        &self.huffman_tables
    }

    pub fn position(&self) -> usize {
        self.bitstream.position()
    }

    pub fn scan_count(&self) -> usize {
        self.scan_count
    }

    pub fn frame_info(&self) -> Option<FrameInfo> {
        let frame_type = self.header.frame_type?;
        Some(FrameInfo {
            width: self.header.width,
            height: self.header.height,
            bits_per_sample: BASELINE_SAMPLE_PRECISION,
            component_count: self.header.component_count,
            restart_interval: self.header.restart_interval,
            frame_type,
        })
    }

    /// Reads SOI and every header segment up to the first SOS marker, which is left for
    /// [`Self::read_start_of_scan`].
    pub fn read_header(&mut self) -> Result<()> {
        if self.state != JpegStreamReaderState::BeforeStartOfImage {
            return Ok(());
        }
        self.read_start_of_image()?;

        loop {
            let (marker, offset) = self.read_next_marker()?;
            match marker {
                JpegMarkerCode::StartOfScan => {
                    if !self.header.has_frame() {
                        return Err(StructuralError::MissingStartOfFrame.at(offset));
                    }
                    self.pending_marker = Some((marker, offset));
                    return Ok(());
                }
                JpegMarkerCode::StartOfFrame(frame_type) => {
                    if self.header.has_frame() {
                        return Err(StructuralError::DuplicateStartOfFrameMarker.at(offset));
                    }
                    self.read_start_of_frame_segment(frame_type, offset)?;
                }
                JpegMarkerCode::StartOfImage => {
                    return Err(StructuralError::DuplicateStartOfImageMarker.at(offset));
                }
                JpegMarkerCode::EndOfImage => {
                    return Err(StructuralError::UnexpectedEndOfImageMarker.at(offset));
                }
                JpegMarkerCode::Restart(number) => {
                    return Err(StructuralError::UnexpectedRestartMarker(number).at(offset));
                }
                _ => self.read_table_or_misc_segment(marker, offset)?,
            }
        }
    }

    /// Reads the next SOS segment and prepares the scan it starts.
    pub fn read_start_of_scan(&mut self) -> Result<()> {
        let (marker, offset) = self.read_next_marker()?;
        if marker != JpegMarkerCode::StartOfScan {
            return Err(StructuralError::UnexpectedMarkerAfterScan(marker.code()).at(offset));
        }
        if !self.header.has_frame() {
            return Err(StructuralError::MissingStartOfFrame.at(offset));
        }
        self.read_start_of_scan_segment(offset)?;
        self.state = JpegStreamReaderState::ScanSection;
        Ok(())
    }

    /// Decodes the entropy-coded data of the current scan into `grid`.
    pub fn decode_scan(
        &mut self,
        grid: &mut BlockGrid,
        strict_restart_markers: bool,
    ) -> Result<()> {
        ScanDecoder::new(
            &mut self.bitstream,
            &self.header,
            &self.huffman_tables,
            strict_restart_markers,
        )
        .decode_scan(grid)?;
        self.scan_count += 1;
        self.state = JpegStreamReaderState::AfterScan;
        Ok(())
    }

    /// Consumes trailing restart markers and table segments after a scan, up to the next
    /// SOS or EOI.
    pub fn read_after_scan(&mut self) -> Result<ScanEnd> {
        self.bitstream.align();
        loop {
            let (marker, offset) = self.read_next_marker()?;
            match marker {
                JpegMarkerCode::Restart(number) => {
                    debug!("Trailing RST{} at byte {}", number, offset);
                }
                JpegMarkerCode::EndOfImage => {
                    self.state = JpegStreamReaderState::EndOfImage;
                    if self.bitstream.has_bytes() {
                        warn!(
                            "{} bytes after end of image ignored",
                            self.bitstream.remaining()
                        );
                    }
                    debug!("EOI at byte {}", offset);
                    return Ok(ScanEnd::EndOfImage);
                }
                JpegMarkerCode::StartOfScan => {
                    self.pending_marker = Some((marker, offset));
                    return Ok(ScanEnd::NextScan);
                }
                JpegMarkerCode::StartOfFrame(_) => {
                    return Err(StructuralError::DuplicateStartOfFrameMarker.at(offset));
                }
                JpegMarkerCode::StartOfImage => {
                    return Err(StructuralError::DuplicateStartOfImageMarker.at(offset));
                }
                _ => self.read_table_or_misc_segment(marker, offset)?,
            }
        }
    }

    fn read_start_of_image(&mut self) -> Result<()> {
        let offset = self.bitstream.position();
        let first = self.bitstream.read_byte()?;
        let second = self.bitstream.read_byte()?;
        if first != JPEG_MARKER_START_BYTE
            || JpegMarkerCode::from_byte(second) != Some(JpegMarkerCode::StartOfImage)
        {
            return Err(StructuralError::StartOfImageMarkerNotFound.at(offset));
        }
        debug!("SOI at byte {}", offset);
        self.state = JpegStreamReaderState::HeaderSection;
        Ok(())
    }

    /// Reads the next marker, skipping fill bytes. Returns it with the offset of its 0xFF.
    fn read_next_marker(&mut self) -> Result<(JpegMarkerCode, usize)> {
        if let Some(pending) = self.pending_marker.take() {
            return Ok(pending);
        }

        let offset = self.bitstream.position();
        let byte = self.bitstream.read_byte()?;
        if byte != JPEG_MARKER_START_BYTE {
            return Err(StructuralError::JpegMarkerStartByteNotFound(byte).at(offset));
        }

        let mut code = self.bitstream.read_byte()?;
        let mut fill_bytes = 0usize;
        while code == JPEG_MARKER_START_BYTE {
            fill_bytes += 1;
            code = self.bitstream.read_byte()?;
        }
        let marker_offset = offset + fill_bytes;
        if fill_bytes > 0 {
            warn!("Skipped {} fill bytes before marker at byte {}", fill_bytes, marker_offset);
        }

        let marker = JpegMarkerCode::from_byte(code)
            .ok_or(StructuralError::UnknownJpegMarkerFound(code).at(marker_offset))?;
        Ok((marker, marker_offset))
    }

    /// Segments allowed both before the first scan and between scans.
    fn read_table_or_misc_segment(&mut self, marker: JpegMarkerCode, offset: usize) -> Result<()> {
        match marker {
            JpegMarkerCode::DefineQuantizationTable => self.read_dqt_segment(offset),
            JpegMarkerCode::DefineHuffmanTable => self.read_dht_segment(offset),
            JpegMarkerCode::DefineRestartInterval => self.read_dri_segment(offset),
            JpegMarkerCode::DefineArithmeticCoding => {
                Err(UnsupportedFeature::ArithmeticCoding.at(offset))
            }
            JpegMarkerCode::ApplicationData(_)
            | JpegMarkerCode::Comment
            | JpegMarkerCode::DefineNumberOfLines
            | JpegMarkerCode::DefineHierarchicalProgression
            | JpegMarkerCode::ExpandReferenceComponents
            | JpegMarkerCode::JpegExtension(_) => self.skip_segment(marker, offset),
            JpegMarkerCode::Temporary => {
                trace!("TEM at byte {} ignored", offset);
                Ok(())
            }
            JpegMarkerCode::Reserved(code) => {
                Err(StructuralError::UnknownJpegMarkerFound(code).at(offset))
            }
            other => Err(StructuralError::UnexpectedMarkerAfterScan(other.code()).at(offset)),
        }
    }

    /// Reads the segment length field and returns the number of payload bytes that follow.
    fn read_segment_size(&mut self, segment: &'static str) -> Result<usize> {
        let offset = self.bitstream.position();
        let length = self.bitstream.read_word()?;
        if length < SEGMENT_LENGTH_SIZE {
            return Err(StructuralError::InvalidMarkerSegmentSize { segment, length }.at(offset));
        }
        Ok((length - SEGMENT_LENGTH_SIZE) as usize)
    }

    fn skip_segment(&mut self, marker: JpegMarkerCode, offset: usize) -> Result<()> {
        let size = self.read_segment_size(marker.name())?;
        debug!("{} segment at byte {}, {} bytes skipped", marker.name(), offset, size);
        self.bitstream.skip(size)
    }

    fn read_start_of_frame_segment(&mut self, frame_type: FrameType, offset: usize) -> Result<()> {
        match frame_type {
            FrameType::BaselineDct => {}
            frame_type if frame_type.is_arithmetic() => {
                return Err(UnsupportedFeature::ArithmeticCoding.at(offset));
            }
            frame_type if frame_type.is_progressive() => {
                return Err(UnsupportedFeature::ProgressiveDct.at(offset));
            }
            other => return Err(UnsupportedFeature::FrameType(other.into()).at(offset)),
        }

        let length_offset = self.bitstream.position();
        let size = self.read_segment_size("SOF")?;

        let precision = self.bitstream.read_byte()?;
        if precision != BASELINE_SAMPLE_PRECISION {
            return Err(UnsupportedFeature::SamplePrecision(precision).at(offset));
        }
        let height = self.bitstream.read_word()?;
        let width = self.bitstream.read_word()?;
        if width == 0 || height == 0 {
            return Err(ValidationError::InvalidDimensions { width, height }.at(offset));
        }

        let component_count = self.bitstream.read_byte()?;
        match component_count {
            1 | 3 => {}
            4 => return Err(UnsupportedFeature::Cmyk.at(offset)),
            other => return Err(ValidationError::InvalidComponentCount(other).at(offset)),
        }
        if size != 6 + 3 * component_count as usize {
            return Err(StructuralError::InvalidMarkerSegmentSize {
                segment: "SOF",
                length: size as u16 + SEGMENT_LENGTH_SIZE,
            }
            .at(length_offset));
        }
        self.header.component_count = component_count;

        for index in 0..component_count {
            let field_offset = self.bitstream.position();
            let raw_id = self.bitstream.read_byte()?;
            if index == 0 && raw_id == 0 {
                self.header.zero_based_ids = true;
            }
            let id = self.normalize_component_id(raw_id, field_offset)?;
            let component = self
                .header
                .component_mut(id)
                .ok_or(ValidationError::InvalidComponentId(raw_id).at(field_offset))?;
            if component.used_in_frame {
                return Err(ValidationError::DuplicateComponentIdInFrame(raw_id).at(field_offset));
            }

            let sampling = self.bitstream.read_byte()?;
            let horizontal = sampling >> 4;
            let vertical = sampling & 0x0F;
            if horizontal != 1 || vertical != 1 {
                return Err(UnsupportedFeature::SamplingFactor {
                    component: id,
                    horizontal,
                    vertical,
                }
                .at(field_offset + 1));
            }

            let table_id = self.bitstream.read_byte()?;
            if table_id > MAXIMUM_TABLE_ID {
                return Err(
                    ValidationError::InvalidQuantizationTableId(table_id).at(field_offset + 2),
                );
            }

            component.used_in_frame = true;
            component.horizontal_sampling_factor = horizontal;
            component.vertical_sampling_factor = vertical;
            component.quantization_table_id = table_id;
        }

        self.header.frame_type = Some(frame_type);
        self.header.frame_offset = offset;
        self.header.set_dimensions(width, height);
        let (horizontal, vertical) = self
            .header
            .component(1)
            .map(|luma| (luma.horizontal_sampling_factor, luma.vertical_sampling_factor))
            .unwrap_or((1, 1));
        self.header.set_sampling_factors(horizontal, vertical);

        debug!(
            "SOF0 at byte {}: {}x{}, {} component(s), {}x{} blocks",
            offset,
            width,
            height,
            component_count,
            self.header.block_width,
            self.header.block_height
        );
        Ok(())
    }

    /// Maps a wire component ID to the 1-based ID used internally.
    fn normalize_component_id(&self, raw_id: u8, offset: usize) -> Result<u8> {
        let id = if self.header.zero_based_ids {
            raw_id.checked_add(1)
        } else {
            Some(raw_id)
        };
        match id {
            Some(id) if id >= 1 && id <= self.header.component_count => Ok(id),
            _ => Err(ValidationError::InvalidComponentId(raw_id).at(offset)),
        }
    }

    fn read_dqt_segment(&mut self, offset: usize) -> Result<()> {
        let length_offset = self.bitstream.position();
        let mut remaining = self.read_segment_size("DQT")?;
        let length = remaining as u16 + SEGMENT_LENGTH_SIZE;
        debug!("DQT segment at byte {}, {} bytes", offset, remaining);

        while remaining > 0 {
            let entry_offset = self.bitstream.position();
            let info = self.bitstream.read_byte()?;
            let precision = info >> 4;
            let id = info & 0x0F;
            if id > MAXIMUM_TABLE_ID {
                return Err(ValidationError::InvalidQuantizationTableId(id).at(entry_offset));
            }
            let value_size = match precision {
                0 => 1,
                1 => 2,
                other => {
                    return Err(
                        ValidationError::InvalidQuantizationPrecision(other).at(entry_offset),
                    );
                }
            };

            let entry_size = 1 + BLOCK_DIM * value_size;
            remaining = remaining.checked_sub(entry_size).ok_or(
                StructuralError::InvalidMarkerSegmentSize {
                    segment: "DQT",
                    length,
                }
                .at(length_offset),
            )?;

            let mut zigzag = [0u16; BLOCK_DIM];
            for value in zigzag.iter_mut() {
                *value = if value_size == 1 {
                    self.bitstream.read_byte()? as u16
                } else {
                    self.bitstream.read_word()?
                };
            }

            let table = QuantizationTable::from_zigzag(&zigzag);
            trace!("Quantization table {}: {:?}", id, table.values());
            self.quantization_tables
                .insert(id, table)
                .map_err(|err| err.at(entry_offset))?;
        }
        Ok(())
    }

    fn read_dht_segment(&mut self, offset: usize) -> Result<()> {
        let length_offset = self.bitstream.position();
        let mut remaining = self.read_segment_size("DHT")?;
        let length = remaining as u16 + SEGMENT_LENGTH_SIZE;
        debug!("DHT segment at byte {}, {} bytes", offset, remaining);

        while remaining > 0 {
            let entry_offset = self.bitstream.position();
            let info = self.bitstream.read_byte()?;
            let class = HuffmanTableClass::try_from(info >> 4)
                .map_err(|_| {
                    ValidationError::InvalidHuffmanTableClass(info >> 4).at(entry_offset)
                })?;
            let id = info & 0x0F;
            if id > MAXIMUM_TABLE_ID {
                return Err(ValidationError::InvalidHuffmanTableId(id).at(entry_offset));
            }

            let mut counts = [0u8; MAXIMUM_CODE_LENGTH];
            for count in counts.iter_mut() {
                *count = self.bitstream.read_byte()?;
            }
            let total: usize = counts.iter().map(|&c| c as usize).sum();
            if total > MAXIMUM_HUFFMAN_SYMBOLS {
                return Err(ValidationError::TooManyHuffmanSymbols(total).at(entry_offset));
            }

            remaining = remaining
                .checked_sub(1 + MAXIMUM_CODE_LENGTH + total)
                .ok_or(
                    StructuralError::InvalidMarkerSegmentSize {
                        segment: "DHT",
                        length,
                    }
                    .at(length_offset),
                )?;

            let mut symbols = [0u8; MAXIMUM_HUFFMAN_SYMBOLS];
            for symbol in symbols.iter_mut().take(total) {
                *symbol = self.bitstream.read_byte()?;
            }

            let table = HuffmanTable::from_counts(&counts, &symbols[..total])
                .map_err(|err| err.at(entry_offset))?;
            trace!("Huffman {} table {}, {} symbols", class.name(), id, total);
            for length in 1..=MAXIMUM_CODE_LENGTH {
                let symbols = table.symbols_of_length(length);
                if !symbols.is_empty() {
                    trace!("  length {:2}: {:02X?}", length, symbols);
                }
            }
            self.huffman_tables
                .insert(class, id, table)
                .map_err(|err| err.at(entry_offset))?;
        }
        Ok(())
    }

    fn read_dri_segment(&mut self, offset: usize) -> Result<()> {
        let length_offset = self.bitstream.position();
        let length = self.bitstream.read_word()?;
        if length != 4 {
            return Err(StructuralError::InvalidMarkerSegmentSize {
                segment: "DRI",
                length,
            }
            .at(length_offset));
        }
        self.header.restart_interval = self.bitstream.read_word()?;
        debug!(
            "DRI at byte {}: restart interval {}",
            offset, self.header.restart_interval
        );
        Ok(())
    }

    fn read_start_of_scan_segment(&mut self, offset: usize) -> Result<()> {
        let length_offset = self.bitstream.position();
        let size = self.read_segment_size("SOS")?;

        let count_offset = self.bitstream.position();
        let components_in_scan = self.bitstream.read_byte()?;
        if components_in_scan == 0 || components_in_scan > self.header.component_count {
            return Err(
                ValidationError::InvalidComponentCountInScan(components_in_scan).at(count_offset),
            );
        }
        if size != 4 + 2 * components_in_scan as usize {
            return Err(StructuralError::InvalidMarkerSegmentSize {
                segment: "SOS",
                length: size as u16 + SEGMENT_LENGTH_SIZE,
            }
            .at(length_offset));
        }

        for component in self.header.components.iter_mut() {
            component.used_in_scan = false;
        }
        self.header.components_in_scan = components_in_scan;

        for _ in 0..components_in_scan {
            let field_offset = self.bitstream.position();
            let raw_id = self.bitstream.read_byte()?;
            let id = self.normalize_component_id(raw_id, field_offset)?;
            let tables = self.bitstream.read_byte()?;
            let dc_id = tables >> 4;
            let ac_id = tables & 0x0F;

            let component = *self
                .header
                .component(id)
                .filter(|component| component.used_in_frame)
                .ok_or(ValidationError::InvalidComponentId(raw_id).at(field_offset))?;
            if component.used_in_scan {
                return Err(ValidationError::DuplicateComponentIdInScan(raw_id).at(field_offset));
            }
            for (class, table_id) in
                [(HuffmanTableClass::Dc, dc_id), (HuffmanTableClass::Ac, ac_id)]
            {
                if table_id > MAXIMUM_TABLE_ID {
                    return Err(
                        ValidationError::InvalidHuffmanTableId(table_id).at(field_offset + 1),
                    );
                }
                if !self.huffman_tables.is_set(class, table_id) {
                    return Err(ValidationError::UndefinedHuffmanTable {
                        component: id,
                        class: class.name(),
                        id: table_id,
                    }
                    .at(field_offset + 1));
                }
            }
            if !self.quantization_tables.is_set(component.quantization_table_id) {
                return Err(ValidationError::UndefinedQuantizationTable {
                    component: id,
                    table: component.quantization_table_id,
                }
                .at(field_offset));
            }

            if let Some(component) = self.header.component_mut(id) {
                component.used_in_scan = true;
                component.huffman_dc_table_id = dc_id;
                component.huffman_ac_table_id = ac_id;
            }
        }

        let selection_offset = self.bitstream.position();
        let start = self.bitstream.read_byte()?;
        let end = self.bitstream.read_byte()?;
        let approximation = self.bitstream.read_byte()?;
        let high = approximation >> 4;
        let low = approximation & 0x0F;
        if start != BASELINE_SPECTRAL_START || end != BASELINE_SPECTRAL_END {
            return Err(
                ValidationError::InvalidSpectralSelection { start, end }.at(selection_offset),
            );
        }
        if high != 0 || low != 0 {
            return Err(
                ValidationError::InvalidSuccessiveApproximation { high, low }
                    .at(selection_offset + 2),
            );
        }
        self.header.start_of_selection = start;
        self.header.end_of_selection = end;
        self.header.successive_approximation_high = high;
        self.header.successive_approximation_low = low;

        debug!(
            "SOS at byte {}: {} component(s), entropy data from byte {}",
            offset,
            components_in_scan,
            self.bitstream.position()
        );
        Ok(())
    }
}
