//! Integration tests for stitching file families end to end

use std::fs;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

use stitchkit::formats::registry::ReaderRegistry;
use stitchkit::formats::tiff_reader::TiffFormatReader;
use stitchkit::tiff::{ByteOrder, PageLayout, TiffReader, TiffWriter};
use stitchkit::{
    AxisType, FileStitcher, FormatReader, LocalFileSystem, MemoryFileSystem, Region, StitchConfig, StitchError,
    StitchKit,
};

fn gray_tiff(width: u32, height: u32, values: &[u8]) -> Vec<u8> {
    let layout = PageLayout {
        width,
        height,
        samples_per_pixel: 1,
        bits_per_sample: 8,
        sample_format: 1,
    };
    let mut writer = TiffWriter::new(Cursor::new(Vec::new()), ByteOrder::LittleEndian).unwrap();
    for &value in values {
        writer
            .write_page(&layout, &vec![value; (width * height) as usize], None)
            .unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Fresh scratch directory under the system temp dir
fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("stitchkit-{}-{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn test_written_tiff_parses() {
    let bytes = gray_tiff(200, 100, &[1, 2]);
    let mut cursor = Cursor::new(bytes);
    let tiff = TiffReader::new().read(&mut cursor).unwrap();

    assert!(!tiff.is_big_tiff);
    assert_eq!(tiff.ifd_count(), 2);
    let ifd = tiff.main_ifd().unwrap();
    assert_eq!(ifd.get_dimensions(ByteOrder::LittleEndian), Some((200, 100)));
}

#[test]
fn test_time_series_in_memory() {
    let fs = MemoryFileSystem::new();
    for t in 1..=5u8 {
        fs.insert(&format!("scan/img_z01_c01_t{:02}.tif", t), gray_tiff(3, 2, &[t]));
    }
    fs.touch("scan/metadata.txt");

    let kit = StitchKit::with_file_system(Arc::new(fs.clone()), StitchConfig::default());
    let summary = kit.describe("scan/img_z01_c01_t02.tif").unwrap();
    assert!(summary.contains("Z=1 C=1 T=5"), "{}", summary);
    assert!(summary.contains("scan/img_z01_c01_t<01-05>.tif (5 files)"), "{}", summary);
    assert_eq!(kit.axes("scan/img_z01_c01_t02.tif", 0).unwrap(), vec![AxisType::T]);

    let mut stitcher = kit.open("scan/img_z01_c01_t02.tif").unwrap();
    let location = stitcher.to_file_and_plane(0, 3).unwrap();
    assert_eq!((location.file_index, location.plane_index), (3, 0));
    assert_eq!(stitcher.open_plane(0, 3).unwrap(), vec![4; 6]);

    fs.remove("scan/img_z01_c01_t05.tif");
    assert_eq!(stitcher.open_plane(0, 4).unwrap(), vec![0; 6]);
}

#[test]
fn test_image_count_matches_extents() {
    let fs = MemoryFileSystem::new();
    for z in 1..=4 {
        for c in 1..=2 {
            fs.touch(&format!("grid_z{}_c{}&sizeX=8&sizeY=8&sizeT=3&certain=true.fake", z, c));
        }
    }

    let mut stitcher = FileStitcher::new(ReaderRegistry::new(Arc::new(fs)), StitchConfig::default());
    stitcher.initialize("grid_z1_c1&sizeX=8&sizeY=8&sizeT=3&certain=true.fake").unwrap();

    let core = stitcher.core(0).unwrap().clone();
    assert_eq!((core.size_z, core.size_c, core.size_t), (4, 2, 3));
    assert_eq!(core.image_count, core.size_z * core.size_c * core.size_t);
    assert!(core.order_certain);

    for no in 0..core.image_count {
        let location = stitcher.to_file_and_plane(0, no).unwrap();
        assert!(location.file_index < 8);
        assert!(location.plane_index < 3);
        assert_eq!(stitcher.open_plane(0, no).unwrap().len(), 64);
    }
}

#[test]
fn test_missing_family() {
    let kit = StitchKit::with_file_system(Arc::new(MemoryFileSystem::new()), StitchConfig::default());
    assert!(matches!(kit.open("nothing_<1-3>.tif"), Err(StitchError::NoMatchingFiles(_))));
    assert!(matches!(kit.open("nothing.tif"), Err(StitchError::NoMatchingFiles(_))));
}

#[test]
fn test_export_from_disk() {
    let dir = scratch_dir("export");
    for z in 1..=3u8 {
        for c in 1..=2u8 {
            fs::write(dir.join(format!("cells_z{}_c{}.tif", z, c)), gray_tiff(4, 4, &[10 * z + c])).unwrap();
        }
    }
    let seed = dir.join("cells_z1_c1.tif").to_string_lossy().into_owned();
    let output = dir.join("stack.tif").to_string_lossy().into_owned();

    let kit = StitchKit::new(None).unwrap();
    assert_eq!(kit.export_tiff(&seed, 0, &output, Some("deflate")).unwrap(), 6);

    let mut reader = TiffFormatReader::new(Arc::new(LocalFileSystem));
    reader.set_id(&output).unwrap();
    let core = reader.core(0).unwrap().clone();
    assert_eq!((core.size_z, core.size_c, core.size_t), (3, 2, 1));
    let plane = reader.open_bytes(0, core.plane_index(2, 1, 0), &Region::full(&core)).unwrap();
    assert_eq!(plane, vec![32; 16]);

    let pngs = kit
        .export_png(&seed, 0, &dir.join("planes.png").to_string_lossy())
        .unwrap();
    assert_eq!(pngs.len(), 6);
    assert!(pngs.iter().all(|p| fs::metadata(p).is_ok()));

    let _ = fs::remove_dir_all(&dir);
}
