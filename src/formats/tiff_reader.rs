//! TIFF plane reader
//!
//! Exposes a TIFF or BigTIFF file as one series. Every full-resolution IFD
//! is one plane; reduced-resolution subfiles are ignored. Planes may be
//! stored in strips or tiles, chunky or planar, uncompressed or with
//! deflate/zstd (optionally with the horizontal predictor); planar data is
//! returned interleaved.
//!
//! The Z/C/T split of the planes is taken from the first ImageDescription:
//! ImageJ hyperstack headers (`channels=`, `slices=`, `frames=`) and OME-XML
//! `Pixels` attributes are understood. Without either, every plane is a
//! time point and the order is reported as uncertain.

use std::io::{Read, SeekFrom};
use std::sync::Arc;

use log::{debug, info, warn};
use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::compression::CompressionFactory;
use crate::formats::core::{CoreMetadata, DimensionOrder, PixelType, Region};
use crate::formats::errors::{FormatError, FormatResult};
use crate::formats::reader::{check_plane_request, crop_plane, series_core, FormatReader};
use crate::io::byte_order::ByteOrder;
use crate::io::location::FileSystem;
use crate::io::seekable::SeekableReader;
use crate::tiff::constants::{compression, planar_config, predictor, sample_format, tags};
use crate::tiff::errors::TiffError;
use crate::tiff::ifd::IFD;
use crate::tiff::reader::TiffReader;
use crate::tiff::validation;

/// How one plane is laid out in the file
#[derive(Debug, Clone)]
struct PlaneLayout {
    width: usize,
    height: usize,
    samples: usize,
    bytes_per_sample: usize,
    pixel_type: PixelType,
    compression: u64,
    predictor: u64,
    planar: u64,
    tiled: bool,
    chunk_width: usize,
    chunk_height: usize,
    offsets: Vec<u64>,
    byte_counts: Vec<u64>,
}

impl PlaneLayout {
    /// Reads the layout of one IFD, resolving offset arrays
    fn from_ifd(parser: &TiffReader, handle: &mut dyn SeekableReader, ifd: &IFD, order: ByteOrder) -> FormatResult<Self> {
        let (width, height) = ifd.get_dimensions(order).ok_or(TiffError::MissingDimensions)?;
        let (width, height) = (width as usize, height as usize);
        let samples = ifd.get_samples_per_pixel(order).max(1) as usize;

        let bits = Self::first_value(parser, handle, ifd, tags::BITS_PER_SAMPLE, 1)?;
        let format = Self::first_value(parser, handle, ifd, tags::SAMPLE_FORMAT, sample_format::UNSIGNED)?;
        let pixel_type = PixelType::from_tiff(bits, format)
            .ok_or_else(|| FormatError::UnsupportedPixelType(format!("{} bits, sample format {}", bits, format)))?;

        let compression = ifd.get_tag_value(tags::COMPRESSION, order).unwrap_or(compression::NONE);
        let predictor = ifd.get_tag_value(tags::PREDICTOR, order).unwrap_or(predictor::NONE);
        let planar = ifd.get_tag_value(tags::PLANAR_CONFIGURATION, order).unwrap_or(planar_config::CHUNKY);
        if predictor != predictor::NONE && predictor != predictor::HORIZONTAL_DIFFERENCING {
            return Err(TiffError::UnsupportedLayout(format!("predictor {}", predictor)).into());
        }

        let tiled = ifd.is_tiled();
        let (chunk_width, chunk_height, offset_tag, count_tag) = if tiled {
            let tile_width = ifd.get_tag_value(tags::TILE_WIDTH, order).ok_or(TiffError::TagNotFound(tags::TILE_WIDTH))?;
            let tile_length = ifd.get_tag_value(tags::TILE_LENGTH, order).ok_or(TiffError::TagNotFound(tags::TILE_LENGTH))?;
            (tile_width as usize, tile_length as usize, tags::TILE_OFFSETS, tags::TILE_BYTE_COUNTS)
        } else {
            let rows = ifd
                .get_tag_value(tags::ROWS_PER_STRIP, order)
                .map(|r| (r as usize).min(height))
                .unwrap_or(height);
            (width, rows, tags::STRIP_OFFSETS, tags::STRIP_BYTE_COUNTS)
        };
        if chunk_width == 0 || chunk_height == 0 {
            return Err(TiffError::UnsupportedLayout("zero-sized strip or tile".to_string()).into());
        }

        let offsets = parser.read_tag_values(handle, ifd, offset_tag)?;
        let byte_counts = parser.read_tag_values(handle, ifd, count_tag)?;

        let layout = PlaneLayout {
            width,
            height,
            samples,
            bytes_per_sample: pixel_type.bytes_per_pixel(),
            pixel_type,
            compression,
            predictor,
            planar,
            tiled,
            chunk_width,
            chunk_height,
            offsets,
            byte_counts,
        };

        let expected = layout.chunks_per_plane() * layout.sample_planes();
        if layout.offsets.len() < expected || layout.byte_counts.len() < expected {
            return Err(TiffError::UnsupportedLayout(format!(
                "IFD {} has {} data blocks, expected {}",
                ifd.number,
                layout.offsets.len().min(layout.byte_counts.len()),
                expected
            ))
            .into());
        }
        Ok(layout)
    }

    fn first_value(parser: &TiffReader, handle: &mut dyn SeekableReader, ifd: &IFD, tag: u16, default: u64) -> FormatResult<u64> {
        if !ifd.has_tag(tag) {
            return Ok(default);
        }
        let values = parser.read_tag_values(handle, ifd, tag)?;
        Ok(values.first().copied().unwrap_or(default))
    }

    fn chunks_across(&self) -> usize {
        (self.width + self.chunk_width - 1) / self.chunk_width
    }

    fn chunks_down(&self) -> usize {
        (self.height + self.chunk_height - 1) / self.chunk_height
    }

    fn chunks_per_plane(&self) -> usize {
        self.chunks_across() * self.chunks_down()
    }

    /// Number of separately stored sample planes
    fn sample_planes(&self) -> usize {
        if self.planar == planar_config::PLANAR { self.samples } else { 1 }
    }

    /// Samples stored per pixel inside one strip or tile
    fn samples_per_chunk(&self) -> usize {
        if self.planar == planar_config::PLANAR { 1 } else { self.samples }
    }

    fn same_shape(&self, other: &PlaneLayout) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.samples == other.samples
            && self.pixel_type == other.pixel_type
    }
}

/// Reverses horizontal differencing on one decoded strip or tile
fn undo_horizontal_predictor(
    data: &mut [u8],
    row_pixels: usize,
    samples: usize,
    bytes_per_sample: usize,
    order: ByteOrder,
) -> FormatResult<()> {
    let row_bytes = row_pixels * samples * bytes_per_sample;
    if row_bytes == 0 {
        return Ok(());
    }
    let stride = samples * bytes_per_sample;

    for row in data.chunks_exact_mut(row_bytes) {
        match bytes_per_sample {
            1 => {
                for i in stride..row.len() {
                    row[i] = row[i].wrapping_add(row[i - stride]);
                }
            }
            2 => {
                for i in (stride..row.len()).step_by(2) {
                    let value = order.u16_from(&row[i..]).wrapping_add(order.u16_from(&row[i - stride..]));
                    order.u16_into(&mut row[i..], value);
                }
            }
            4 => {
                for i in (stride..row.len()).step_by(4) {
                    let value = order.u32_from(&row[i..]).wrapping_add(order.u32_from(&row[i - stride..]));
                    order.u32_into(&mut row[i..], value);
                }
            }
            other => {
                return Err(TiffError::UnsupportedLayout(format!(
                    "horizontal predictor with {}-byte samples",
                    other
                ))
                .into())
            }
        }
    }
    Ok(())
}

/// Z/C/T extents recovered from an image description
#[derive(Debug, Clone, PartialEq)]
struct DescribedDims {
    size_z: usize,
    size_c: usize,
    size_t: usize,
    order: DimensionOrder,
}

/// Parses an ImageJ hyperstack header
///
/// ImageJ stores planes channel-fastest (XYCZT). For RGB files the channel
/// count refers to the samples of each plane.
fn parse_imagej_description(description: &str, samples: usize) -> Option<DescribedDims> {
    if !description.starts_with("ImageJ=") {
        return None;
    }
    let mut channels = 1;
    let mut slices = 1;
    let mut frames = 1;
    for line in description.lines() {
        let Some((key, value)) = line.split_once('=') else { continue };
        let value = value.trim().parse::<usize>().ok().filter(|v| *v > 0);
        match (key.trim(), value) {
            ("channels", Some(v)) => channels = v,
            ("slices", Some(v)) => slices = v,
            ("frames", Some(v)) => frames = v,
            _ => {}
        }
    }
    let size_c = if samples > 1 { samples } else { channels };
    Some(DescribedDims {
        size_z: slices,
        size_c,
        size_t: frames,
        order: DimensionOrder::sanitize("XYCZT"),
    })
}

/// Reads the first OME-XML `Pixels` element
fn parse_ome_description(description: &str) -> Option<DescribedDims> {
    if !description.contains("<OME") {
        return None;
    }
    let mut reader = Reader::from_str(description);
    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) | Ok(Event::Empty(element)) if element.local_name().as_ref() == b"Pixels" => {
                let mut dims = DescribedDims {
                    size_z: 1,
                    size_c: 1,
                    size_t: 1,
                    order: DimensionOrder::default(),
                };
                for attribute in element.attributes().flatten() {
                    let value = String::from_utf8_lossy(&attribute.value).into_owned();
                    match attribute.key.local_name().as_ref() {
                        b"SizeZ" => dims.size_z = value.parse().ok()?,
                        b"SizeC" => dims.size_c = value.parse().ok()?,
                        b"SizeT" => dims.size_t = value.parse().ok()?,
                        b"DimensionOrder" => dims.order = DimensionOrder::parse(&value).ok()?,
                        _ => {}
                    }
                }
                return Some(dims);
            }
            Ok(Event::Eof) => return None,
            Err(e) => {
                warn!("Malformed OME-XML description: {}", e);
                return None;
            }
            _ => {}
        }
    }
}

/// Builds the series metadata from the plane layout and description
fn describe_series(first: &PlaneLayout, plane_count: usize, little_endian: bool, description: Option<&str>) -> CoreMetadata {
    let mut core = CoreMetadata {
        size_x: first.width,
        size_y: first.height,
        pixel_type: first.pixel_type,
        rgb_channel_count: first.samples,
        little_endian,
        interleaved: true,
        ..CoreMetadata::default()
    };

    let described = description.and_then(|text| {
        parse_imagej_description(text, first.samples).or_else(|| parse_ome_description(text))
    });

    match described {
        Some(dims) if dims.size_c % first.samples == 0
            && dims.size_z * dims.size_t * (dims.size_c / first.samples) == plane_count =>
        {
            core.size_z = dims.size_z;
            core.size_c = dims.size_c;
            core.size_t = dims.size_t;
            core.dimension_order = dims.order;
            core.order_certain = true;
        }
        other => {
            if let Some(dims) = other {
                warn!(
                    "Description declares Z={} C={} T={}, which does not match {} planes; ignoring it",
                    dims.size_z, dims.size_c, dims.size_t, plane_count
                );
            }
            core.size_z = 1;
            core.size_c = first.samples;
            core.size_t = plane_count;
            core.dimension_order = DimensionOrder::sanitize("XYCZT");
            core.order_certain = false;
        }
    }
    core.image_count = plane_count;
    core
}

/// Reader for TIFF and BigTIFF files
pub struct TiffFormatReader {
    fs: Arc<dyn FileSystem>,
    current: Option<String>,
    handle: Option<Box<dyn SeekableReader>>,
    byte_order: ByteOrder,
    file_size: u64,
    planes: Vec<PlaneLayout>,
    cores: Vec<CoreMetadata>,
}

impl TiffFormatReader {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        TiffFormatReader {
            fs,
            current: None,
            handle: None,
            byte_order: ByteOrder::LittleEndian,
            file_size: 0,
            planes: Vec::new(),
            cores: Vec::new(),
        }
    }

    /// Decodes one full plane into interleaved samples
    fn decode_plane(&mut self, index: usize) -> FormatResult<Vec<u8>> {
        let layout = &self.planes[index];
        let handle = self.handle.as_mut().ok_or(FormatError::NotOpen)?;
        let handler = CompressionFactory::create_handler(layout.compression)?;

        let bps = layout.bytes_per_sample;
        let pixel_bytes = layout.samples * bps;
        let chunk_samples = layout.samples_per_chunk();
        let chunk_row_bytes = layout.chunk_width * chunk_samples * bps;
        let mut out = vec![0u8; layout.width * layout.height * pixel_bytes];

        let across = layout.chunks_across();
        let down = layout.chunks_down();

        for sample_plane in 0..layout.sample_planes() {
            for cy in 0..down {
                for cx in 0..across {
                    let chunk = sample_plane * across * down + cy * across + cx;
                    let offset = layout.offsets[chunk];
                    let count = layout.byte_counts[chunk];
                    validation::validate_data_range(offset, count, self.file_size)?;

                    let mut raw = vec![0u8; count as usize];
                    handle.seek(SeekFrom::Start(offset))?;
                    handle.read_exact(&mut raw)?;
                    let visible_rows = layout.chunk_height.min(layout.height - cy * layout.chunk_height);
                    let stored_rows = if layout.tiled { layout.chunk_height } else { visible_rows };
                    let expected = stored_rows * chunk_row_bytes;
                    let mut data = handler.decode_block(&raw, expected)?;

                    if layout.predictor == predictor::HORIZONTAL_DIFFERENCING {
                        undo_horizontal_predictor(&mut data[..expected], layout.chunk_width, chunk_samples, bps, self.byte_order)?;
                    }

                    let visible_cols = layout.chunk_width.min(layout.width - cx * layout.chunk_width);
                    for row in 0..visible_rows {
                        let y = cy * layout.chunk_height + row;
                        let src_row = &data[row * chunk_row_bytes..];
                        let x0 = cx * layout.chunk_width;
                        if chunk_samples == layout.samples {
                            let dst = (y * layout.width + x0) * pixel_bytes;
                            let len = visible_cols * pixel_bytes;
                            out[dst..dst + len].copy_from_slice(&src_row[..len]);
                        } else {
                            for col in 0..visible_cols {
                                let dst = ((y * layout.width + x0 + col) * layout.samples + sample_plane) * bps;
                                out[dst..dst + bps].copy_from_slice(&src_row[col * bps..(col + 1) * bps]);
                            }
                        }
                    }
                }
            }
        }
        Ok(out)
    }
}

impl FormatReader for TiffFormatReader {
    fn format_name(&self) -> &'static str {
        "Tagged Image File Format"
    }

    fn set_id(&mut self, path: &str) -> FormatResult<()> {
        self.close();
        info!("Opening TIFF file: {}", path);

        let mut handle = self.fs.open(path)?;
        let mut parser = TiffReader::new();
        let tiff = parser.read(handle.as_mut())?;
        let file_size = validation::get_file_size(handle.as_mut())?;

        let image_ifds = tiff.image_ifds();
        if image_ifds.is_empty() {
            return Err(TiffError::NoImages.into());
        }

        let mut planes = Vec::with_capacity(image_ifds.len());
        for ifd in &image_ifds {
            planes.push(PlaneLayout::from_ifd(&parser, handle.as_mut(), ifd, tiff.byte_order)?);
        }
        if let Some(odd) = planes.iter().find(|p| !p.same_shape(&planes[0])) {
            return Err(TiffError::UnsupportedLayout(format!(
                "planes differ in shape: {}x{}x{} {} vs {}x{}x{} {}",
                planes[0].width, planes[0].height, planes[0].samples, planes[0].pixel_type,
                odd.width, odd.height, odd.samples, odd.pixel_type
            ))
            .into());
        }

        let description = parser.read_ascii(handle.as_mut(), image_ifds[0], tags::IMAGE_DESCRIPTION)?;
        let core = describe_series(&planes[0], planes.len(), tiff.byte_order.is_little_endian(), description.as_deref());
        debug!(
            "TIFF {}: {} planes, Z={} C={} T={} order {} (certain: {})",
            path, core.image_count, core.size_z, core.size_c, core.size_t, core.dimension_order, core.order_certain
        );

        self.byte_order = tiff.byte_order;
        self.file_size = file_size;
        self.planes = planes;
        self.cores = vec![core];
        self.handle = Some(handle);
        self.current = Some(path.to_string());
        Ok(())
    }

    fn close(&mut self) {
        if let Some(path) = self.current.take() {
            debug!("Closing TIFF file: {}", path);
        }
        self.handle = None;
        self.planes.clear();
        self.cores.clear();
    }

    fn current_file(&self) -> Option<&str> {
        self.current.as_deref()
    }

    fn series_count(&self) -> usize {
        self.cores.len()
    }

    fn core(&self, series: usize) -> FormatResult<&CoreMetadata> {
        series_core(&self.cores, series)
    }

    fn open_bytes(&mut self, series: usize, no: usize, region: &Region) -> FormatResult<Vec<u8>> {
        if self.current.is_none() {
            return Err(FormatError::NotOpen);
        }
        let core = series_core(&self.cores, series)?.clone();
        check_plane_request(&core, no, region)?;
        let plane = self.decode_plane(no)?;
        Ok(crop_plane(&plane, &core, region))
    }
}
