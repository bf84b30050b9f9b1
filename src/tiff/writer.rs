//! Multi-page TIFF writing
//!
//! [`TiffWriter`] appends one page (IFD plus a single strip) at a time and
//! links each new IFD into the chain, so stacks of any length can be
//! streamed to disk without holding them in memory. Output is classic TIFF
//! in the byte order chosen at construction.

use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};

use log::{debug, info};

use crate::compression::{CompressionFactory, CompressionHandler};
use crate::io::byte_order::ByteOrder;
use crate::tiff::constants::{field_types, header, photometric, planar_config, tags};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::utils::write_utils;

/// Pixel layout of one page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLayout {
    pub width: u32,
    pub height: u32,
    pub samples_per_pixel: u16,
    pub bits_per_sample: u16,
    /// TIFF SampleFormat code (1 unsigned, 2 signed, 3 float)
    pub sample_format: u16,
}

impl PageLayout {
    /// Number of bytes in one uncompressed, chunky page
    pub fn plane_bytes(&self) -> usize {
        self.width as usize
            * self.height as usize
            * self.samples_per_pixel as usize
            * (self.bits_per_sample as usize / 8)
    }
}

/// Entry waiting to be written, with its value already encoded
struct PendingEntry {
    tag: u16,
    field_type: u16,
    count: u32,
    payload: Vec<u8>,
}

/// Streaming writer for multi-page TIFF files
pub struct TiffWriter<W: Write + Seek> {
    writer: W,
    byte_order: ByteOrder,
    compression: Box<dyn CompressionHandler>,
    /// Position of the link that must point at the next IFD
    next_link_position: u64,
    pages: usize,
    software: String,
}

impl TiffWriter<BufWriter<File>> {
    /// Creates a TIFF file on disk
    pub fn create(path: &str, byte_order: ByteOrder) -> TiffResult<Self> {
        info!("Writing TIFF to {}", path);
        let file = File::create(path)?;
        TiffWriter::new(BufWriter::with_capacity(1024 * 1024, file), byte_order)
    }
}

impl<W: Write + Seek> TiffWriter<W> {
    /// Writes the header and returns a writer ready for pages
    pub fn new(mut writer: W, byte_order: ByteOrder) -> TiffResult<Self> {
        writer.seek(SeekFrom::Start(0))?;
        writer.write_all(&byte_order.marker())?;
        byte_order.write_u16(&mut writer, header::TIFF_VERSION)?;
        // First IFD offset, patched when the first page lands
        byte_order.write_u32(&mut writer, 0)?;

        Ok(TiffWriter {
            writer,
            byte_order,
            compression: CompressionFactory::create_handler(crate::tiff::constants::compression::NONE)?,
            next_link_position: 4,
            pages: 0,
            software: format!("stitchkit {}", env!("CARGO_PKG_VERSION")),
        })
    }

    /// Selects the compression applied to subsequent pages
    pub fn with_compression(mut self, handler: Box<dyn CompressionHandler>) -> Self {
        self.compression = handler;
        self
    }

    pub fn pages_written(&self) -> usize {
        self.pages
    }

    /// Appends one page
    ///
    /// # Arguments
    /// * `layout` - Pixel layout of the page
    /// * `data` - Uncompressed chunky samples, already in this writer's byte order
    /// * `description` - Optional ImageDescription text
    pub fn write_page(&mut self, layout: &PageLayout, data: &[u8], description: Option<&str>) -> TiffResult<()> {
        if data.len() != layout.plane_bytes() {
            return Err(TiffError::GenericError(format!(
                "Page data is {} bytes, layout needs {}",
                data.len(),
                layout.plane_bytes()
            )));
        }

        let strip = self.compression.compress(data)?;
        let strip_offset = self.append(&strip)?;
        debug!("Page {}: {} bytes of strip data at {}", self.pages, strip.len(), strip_offset);

        let spp = layout.samples_per_pixel.max(1);
        let photometric = if spp >= 3 { photometric::RGB } else { photometric::BLACK_IS_ZERO };

        let mut entries = vec![
            self.long(tags::IMAGE_WIDTH, layout.width),
            self.long(tags::IMAGE_LENGTH, layout.height),
            self.shorts(tags::BITS_PER_SAMPLE, &vec![layout.bits_per_sample; spp as usize]),
            self.shorts(tags::COMPRESSION, &[self.compression.code() as u16]),
            self.shorts(tags::PHOTOMETRIC_INTERPRETATION, &[photometric]),
            self.long(tags::STRIP_OFFSETS, Self::to_u32(strip_offset)?),
            self.shorts(tags::SAMPLES_PER_PIXEL, &[spp]),
            self.long(tags::ROWS_PER_STRIP, layout.height),
            self.long(tags::STRIP_BYTE_COUNTS, Self::to_u32(strip.len() as u64)?),
            self.shorts(tags::PLANAR_CONFIGURATION, &[planar_config::CHUNKY as u16]),
            Self::ascii(tags::SOFTWARE, &self.software),
            self.shorts(tags::SAMPLE_FORMAT, &vec![layout.sample_format; spp as usize]),
        ];
        if let Some(text) = description {
            entries.push(Self::ascii(tags::IMAGE_DESCRIPTION, text));
        }
        entries.sort_by_key(|entry| entry.tag);

        // Values that do not fit in the entry go before the IFD
        let mut value_fields = Vec::with_capacity(entries.len());
        for entry in &entries {
            let mut field = [0u8; 4];
            if entry.payload.len() <= 4 {
                field[..entry.payload.len()].copy_from_slice(&entry.payload);
            } else {
                let offset = Self::to_u32(self.append(&entry.payload)?)?;
                self.byte_order.u32_into(&mut field, offset);
            }
            value_fields.push(field);
        }

        let ifd_offset = self.writer.seek(SeekFrom::End(0))?;
        let ifd_offset32 = Self::to_u32(ifd_offset)?;
        self.byte_order.write_u16(&mut self.writer, entries.len() as u16)?;
        for (entry, field) in entries.iter().zip(&value_fields) {
            self.byte_order.write_u16(&mut self.writer, entry.tag)?;
            self.byte_order.write_u16(&mut self.writer, entry.field_type)?;
            self.byte_order.write_u32(&mut self.writer, entry.count)?;
            self.writer.write_all(field)?;
        }
        self.byte_order.write_u32(&mut self.writer, 0)?;

        self.writer.seek(SeekFrom::Start(self.next_link_position))?;
        self.byte_order.write_u32(&mut self.writer, ifd_offset32)?;
        self.writer.seek(SeekFrom::End(0))?;

        self.next_link_position = ifd_offset + 2 + 12 * entries.len() as u64;
        self.pages += 1;
        Ok(())
    }

    /// Flushes and returns the underlying writer
    pub fn finish(mut self) -> TiffResult<W> {
        self.writer.flush()?;
        info!("Wrote {} TIFF pages", self.pages);
        Ok(self.writer)
    }

    /// Appends a word-aligned block at the end of the file
    fn append(&mut self, bytes: &[u8]) -> TiffResult<u64> {
        let position = self.writer.seek(SeekFrom::End(0))?;
        self.writer.write_all(bytes)?;
        write_utils::write_padding(&mut self.writer, bytes.len())?;
        Ok(position)
    }

    fn to_u32(offset: u64) -> TiffResult<u32> {
        u32::try_from(offset)
            .map_err(|_| TiffError::GenericError(format!("Offset {} exceeds classic TIFF limits", offset)))
    }

    fn long(&self, tag: u16, value: u32) -> PendingEntry {
        let mut payload = vec![0u8; 4];
        self.byte_order.u32_into(&mut payload, value);
        PendingEntry { tag, field_type: field_types::LONG, count: 1, payload }
    }

    fn shorts(&self, tag: u16, values: &[u16]) -> PendingEntry {
        let mut payload = vec![0u8; values.len() * 2];
        for (chunk, &value) in payload.chunks_exact_mut(2).zip(values) {
            self.byte_order.u16_into(chunk, value);
        }
        PendingEntry { tag, field_type: field_types::SHORT, count: values.len() as u32, payload }
    }

    fn ascii(tag: u16, text: &str) -> PendingEntry {
        let mut payload = text.as_bytes().to_vec();
        payload.push(0);
        PendingEntry { tag, field_type: field_types::ASCII, count: payload.len() as u32, payload }
    }
}
