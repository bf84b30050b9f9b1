//! Tests for the multi-page writer

use std::io::Cursor;

use crate::compression::CompressionFactory;
use crate::io::byte_order::ByteOrder;
use crate::tiff::constants::{compression, tags};
use crate::tiff::reader::TiffReader;
use crate::tiff::writer::{PageLayout, TiffWriter};

fn gray8(width: u32, height: u32) -> PageLayout {
    PageLayout { width, height, samples_per_pixel: 1, bits_per_sample: 8, sample_format: 1 }
}

#[test]
fn test_written_pages_are_chained() {
    let layout = gray8(4, 3);
    let mut writer = TiffWriter::new(Cursor::new(Vec::new()), ByteOrder::LittleEndian).unwrap();
    writer.write_page(&layout, &[1u8; 12], Some("first page")).unwrap();
    writer.write_page(&layout, &[2u8; 12], None).unwrap();
    writer.write_page(&layout, &[3u8; 12], None).unwrap();
    assert_eq!(writer.pages_written(), 3);

    let mut cursor = writer.finish().unwrap();
    let mut reader = TiffReader::new();
    let tiff = reader.read(&mut cursor).unwrap();

    assert_eq!(tiff.ifd_count(), 3);
    for ifd in &tiff.ifds {
        assert_eq!(ifd.get_dimensions(tiff.byte_order), Some((4, 3)));
    }
    let description = reader.read_ascii(&mut cursor, &tiff.ifds[0], tags::IMAGE_DESCRIPTION).unwrap();
    assert_eq!(description.as_deref(), Some("first page"));
    assert!(!tiff.ifds[1].has_tag(tags::IMAGE_DESCRIPTION));
}

#[test]
fn test_big_endian_rgb_page() {
    let layout = PageLayout { width: 2, height: 2, samples_per_pixel: 3, bits_per_sample: 16, sample_format: 1 };
    let mut writer = TiffWriter::new(Cursor::new(Vec::new()), ByteOrder::BigEndian).unwrap();
    writer.write_page(&layout, &[0u8; 24], None).unwrap();

    let mut cursor = writer.finish().unwrap();
    let mut reader = TiffReader::new();
    let tiff = reader.read(&mut cursor).unwrap();
    let ifd = tiff.main_ifd().unwrap();

    assert_eq!(tiff.byte_order, ByteOrder::BigEndian);
    assert_eq!(ifd.get_samples_per_pixel(tiff.byte_order), 3);
    assert_eq!(reader.read_tag_values(&mut cursor, ifd, tags::BITS_PER_SAMPLE).unwrap(), vec![16, 16, 16]);
}

#[test]
fn test_compressed_strip_byte_count() {
    let layout = gray8(64, 64);
    let handler = CompressionFactory::create_handler(compression::DEFLATE).unwrap();
    let mut writer = TiffWriter::new(Cursor::new(Vec::new()), ByteOrder::LittleEndian)
        .unwrap()
        .with_compression(handler);
    writer.write_page(&layout, &vec![0u8; 64 * 64], None).unwrap();

    let mut cursor = writer.finish().unwrap();
    let tiff = TiffReader::new().read(&mut cursor).unwrap();
    let ifd = tiff.main_ifd().unwrap();

    assert_eq!(ifd.get_tag_value(tags::COMPRESSION, tiff.byte_order), Some(compression::DEFLATE));
    let byte_count = ifd.get_tag_value(tags::STRIP_BYTE_COUNTS, tiff.byte_order).unwrap();
    assert!(byte_count < 64 * 64);
}

#[test]
fn test_rejects_mismatched_page_size() {
    let mut writer = TiffWriter::new(Cursor::new(Vec::new()), ByteOrder::LittleEndian).unwrap();
    assert!(writer.write_page(&gray8(4, 4), &[0u8; 10], None).is_err());
    assert_eq!(writer.pages_written(), 0);
}
