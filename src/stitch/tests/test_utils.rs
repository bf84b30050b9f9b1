use std::io::Cursor;
use std::sync::Arc;

use crate::config::StitchConfig;
use crate::formats::registry::ReaderRegistry;
use crate::io::byte_order::ByteOrder;
use crate::io::location::MemoryFileSystem;
use crate::stitch::stitcher::FileStitcher;
use crate::tiff::writer::{PageLayout, TiffWriter};

/// Width and height of every fixture plane
pub const FIXTURE_SIZE: u32 = 2;

/// Bytes in one fixture plane
pub const FIXTURE_PLANE_BYTES: usize = (FIXTURE_SIZE * FIXTURE_SIZE) as usize;

/// Builds a little-endian uint8 TIFF whose plane `i` is filled with `first_value + i`
pub fn tiff_stack(first_value: u8, planes: usize) -> Vec<u8> {
    let layout = PageLayout {
        width: FIXTURE_SIZE,
        height: FIXTURE_SIZE,
        samples_per_pixel: 1,
        bits_per_sample: 8,
        sample_format: 1,
    };
    let mut writer = TiffWriter::new(Cursor::new(Vec::new()), ByteOrder::LittleEndian).unwrap();
    for i in 0..planes {
        writer
            .write_page(&layout, &vec![first_value + i as u8; FIXTURE_PLANE_BYTES], None)
            .unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Single-plane TIFF filled with one value
pub fn tiff_plane(value: u8) -> Vec<u8> {
    tiff_stack(value, 1)
}

pub fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

pub fn stitcher(fs: &MemoryFileSystem) -> FileStitcher {
    stitcher_with(fs, StitchConfig::default())
}

pub fn stitcher_with(fs: &MemoryFileSystem, config: StitchConfig) -> FileStitcher {
    FileStitcher::new(ReaderRegistry::new(Arc::new(fs.clone())), config)
}

/// Memory file system holding `data/img_t<1-n>.tif`, file `t` filled with `10 * t`
pub fn time_series(count: u8) -> MemoryFileSystem {
    let fs = MemoryFileSystem::new();
    for t in 1..=count {
        fs.insert(&format!("data/img_t{}.tif", t), tiff_plane(10 * t));
    }
    fs
}
