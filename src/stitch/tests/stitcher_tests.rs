//! Tests for the file stitcher

use std::sync::Arc;

use super::test_utils::{stitcher, stitcher_with, tiff_plane, tiff_stack, time_series, FIXTURE_PLANE_BYTES};
use crate::config::StitchConfig;
use crate::formats::core::Region;
use crate::formats::fake_reader::FakeReader;
use crate::formats::reader::FormatReader;
use crate::formats::registry::ReaderRegistry;
use crate::io::location::{LocalFileSystem, MemoryFileSystem};
use crate::stitch::axis::{AxisType, UnresolvedAxisPolicy};
use crate::stitch::errors::StitchError;
use crate::stitch::stitcher::FileStitcher;

fn filled(value: u8) -> Vec<u8> {
    vec![value; FIXTURE_PLANE_BYTES]
}

/// `img_z<01-03>_c<01-02>.tif`, file (z, c) filled with `10 * z + c`
fn depth_channel_grid() -> MemoryFileSystem {
    let fs = MemoryFileSystem::new();
    for z in 1..=3u8 {
        for c in 1..=2u8 {
            fs.insert(&format!("img_z{:02}_c{:02}.tif", z, c), tiff_plane(10 * z + c));
        }
    }
    fs
}

#[test]
fn test_time_only_family() {
    let fs = MemoryFileSystem::new();
    for t in 1..=5u8 {
        fs.insert(&format!("data/img_z01_c01_t{:02}.tif", t), tiff_plane(10 * t));
    }
    fs.touch("data/readme.txt");

    let mut stitcher = stitcher(&fs);
    stitcher.initialize("data/img_z01_c01_t01.tif").unwrap();

    assert!(!stitcher.is_pass_through());
    assert_eq!(stitcher.series_count(), 1);
    assert_eq!(stitcher.size_t(0).unwrap(), 5);
    assert_eq!(stitcher.size_z(0).unwrap(), 1);
    assert_eq!(stitcher.size_c(0).unwrap(), 1);
    assert_eq!(stitcher.image_count(0).unwrap(), 5);
    assert_eq!(stitcher.file_pattern(0).unwrap().pattern(), "data/img_z01_c01_t<01-05>.tif");
    assert_eq!(stitcher.axis_types(0).unwrap(), &[AxisType::T]);
    assert_eq!(stitcher.used_files().unwrap().len(), 5);

    let location = stitcher.to_file_and_plane(0, 3).unwrap();
    assert_eq!(location.file_index, 3);
    assert_eq!(location.plane_index, 0);
    assert_eq!(stitcher.open_plane(0, 3).unwrap(), filled(40));
}

#[test]
fn test_depth_channel_grid() {
    let fs = depth_channel_grid();
    let mut stitcher = stitcher(&fs);
    stitcher.initialize("img_z02_c02.tif").unwrap();

    assert_eq!(stitcher.dimension_order(0).unwrap().as_str(), "XYCZT");
    assert_eq!(stitcher.size_z(0).unwrap(), 3);
    assert_eq!(stitcher.size_c(0).unwrap(), 2);
    assert_eq!(stitcher.image_count(0).unwrap(), 6);
    assert_eq!(stitcher.axis_types(0).unwrap(), &[AxisType::Z, AxisType::C]);

    assert_eq!(stitcher.zct_coords(0, 4).unwrap(), [2, 0, 0]);
    assert_eq!(stitcher.to_file_and_plane(0, 4).unwrap().file_index, 4);
    assert_eq!(stitcher.open_plane(0, 4).unwrap(), filled(31));

    let files = stitcher.used_files().unwrap();
    for no in 0..6 {
        let [z, c, t] = stitcher.zct_coords(0, no).unwrap();
        assert_eq!(stitcher.index(0, z, c, t).unwrap(), no);
        let location = stitcher.to_file_and_plane(0, no).unwrap();
        assert_eq!(files[location.file_index], format!("img_z{:02}_c{:02}.tif", z + 1, c + 1));
        assert_eq!(stitcher.open_plane(0, no).unwrap(), filled(10 * (z as u8 + 1) + c as u8 + 1));
    }
}

#[test]
fn test_single_file_passes_through() {
    let fs = MemoryFileSystem::new();
    fs.insert("solo.tif", tiff_stack(5, 3));
    fs.touch("notes.txt");

    let mut stitcher = stitcher(&fs);
    stitcher.initialize("solo.tif").unwrap();

    assert!(stitcher.is_pass_through());
    assert_eq!(stitcher.series_count(), 1);
    assert_eq!(stitcher.image_count(0).unwrap(), 3);
    assert_eq!(stitcher.file_count(0).unwrap(), 1);
    assert_eq!(stitcher.file_pattern(0).unwrap().total(), 1);
    assert!(stitcher.axis_types(0).unwrap().is_empty());
    assert_eq!(stitcher.used_files().unwrap(), vec!["solo.tif".to_string()]);
    assert_eq!(stitcher.to_file_and_plane(0, 2).unwrap().plane_index, 2);
    assert_eq!(stitcher.open_plane(0, 2).unwrap(), filled(7));
    assert_eq!(stitcher.open_file_count(), 1);
}

#[test]
fn test_grouping_disabled() {
    let fs = time_series(3);
    let config = StitchConfig { group_files: false, ..StitchConfig::default() };
    let mut stitcher = stitcher_with(&fs, config);
    stitcher.initialize("data/img_t2.tif").unwrap();

    assert!(stitcher.is_pass_through());
    assert_eq!(stitcher.image_count(0).unwrap(), 1);
    assert_eq!(stitcher.used_files().unwrap(), vec!["data/img_t2.tif".to_string()]);
    assert_eq!(stitcher.open_plane(0, 0).unwrap(), filled(20));
}

#[test]
fn test_pattern_seed() {
    let fs = time_series(4);
    let mut stitcher = stitcher(&fs);
    stitcher.initialize("data/img_t<2-4:2>.tif").unwrap();

    assert_eq!(stitcher.image_count(0).unwrap(), 2);
    assert_eq!(stitcher.open_plane(0, 1).unwrap(), filled(40));
}

#[test]
fn test_missing_files_at_initialization() {
    let fs = time_series(3);
    fs.remove("data/img_t2.tif");
    let mut stitcher = stitcher(&fs);

    match stitcher.initialize("data/img_t<1-3>.tif") {
        Err(StitchError::FileNotFound { index, path }) => {
            assert_eq!(index, 1);
            assert_eq!(path, "data/img_t2.tif");
        }
        other => panic!("Expected FileNotFound, got {:?}", other.err()),
    }

    assert!(matches!(
        stitcher.initialize("data/none.tif"),
        Err(StitchError::NoMatchingFiles(_))
    ));
    assert!(matches!(
        stitcher.initialize("data/other_<1-3>.tif"),
        Err(StitchError::NoMatchingFiles(_))
    ));
    assert!(matches!(
        stitcher.initialize("data/img_t<3-1>.tif"),
        Err(StitchError::InvalidPattern { .. })
    ));
    assert_eq!(stitcher.series_count(), 0);
}

#[test]
fn test_deleted_file_reads_blank() {
    let fs = time_series(3);
    let mut stitcher = stitcher(&fs);
    stitcher.initialize("data/img_t1.tif").unwrap();

    assert!(fs.remove("data/img_t2.tif"));
    assert_eq!(stitcher.open_plane(0, 1).unwrap(), vec![0; FIXTURE_PLANE_BYTES]);
    assert_eq!(stitcher.open_plane(0, 2).unwrap(), filled(30));

    // the first file was open when it disappeared
    assert!(fs.remove("data/img_t1.tif"));
    assert_eq!(stitcher.open_plane(0, 0).unwrap(), vec![0; FIXTURE_PLANE_BYTES]);

    let region = Region::new(0, 0, 1, 2);
    assert_eq!(stitcher.open_bytes(0, 1, &region).unwrap(), vec![0; 2]);
}

#[test]
fn test_plane_outside_file_reads_blank() {
    let fs = MemoryFileSystem::new();
    fs.insert("data/img_t1.tif", tiff_stack(1, 2));
    fs.insert("data/img_t2.tif", tiff_stack(9, 1));

    let mut stitcher = stitcher(&fs);
    stitcher.initialize("data/img_t1.tif").unwrap();

    // two planes of an uncertain file are read as depth, the names vary time
    assert_eq!(stitcher.dimension_order(0).unwrap().as_str(), "XYCTZ");
    assert_eq!(stitcher.size_z(0).unwrap(), 2);
    assert_eq!(stitcher.size_t(0).unwrap(), 2);

    let second_depth = stitcher.index(0, 1, 0, 0).unwrap();
    assert_eq!(stitcher.open_plane(0, second_depth).unwrap(), filled(2));
    let later = stitcher.index(0, 0, 0, 1).unwrap();
    assert_eq!(stitcher.open_plane(0, later).unwrap(), filled(9));
    let beyond = stitcher.index(0, 1, 0, 1).unwrap();
    assert_eq!(stitcher.open_plane(0, beyond).unwrap(), vec![0; FIXTURE_PLANE_BYTES]);
}

#[test]
fn test_open_readers_stay_bounded() {
    let fs = time_series(5);
    let config = StitchConfig { max_open_files: 2, ..StitchConfig::default() };
    let mut stitcher = stitcher_with(&fs, config);
    stitcher.initialize("data/img_t1.tif").unwrap();
    assert_eq!(stitcher.open_file_count(), 1);

    for no in (0..5).chain([0, 4, 2]) {
        assert_eq!(stitcher.open_plane(0, no).unwrap(), filled(10 * (no as u8 + 1)));
        assert!(stitcher.open_file_count() <= 2);
    }
    assert_eq!(stitcher.open_file_count(), 2);
}

#[test]
fn test_series_prefixed_names_split() {
    let fs = MemoryFileSystem::new();
    for s in 1..=2u8 {
        for t in 1..=2u8 {
            fs.insert(&format!("cell_s{}_t{}.tif", s, t), tiff_plane(10 * s + t));
        }
    }

    let mut stitcher = stitcher(&fs);
    stitcher.initialize("cell_s1_t1.tif").unwrap();

    assert_eq!(stitcher.series_count(), 2);
    assert_eq!(stitcher.size_t(1).unwrap(), 2);
    assert_eq!(stitcher.file_pattern(1).unwrap().pattern(), "cell_s2_t<1-2>.tif");
    assert_eq!(stitcher.open_plane(1, 1).unwrap(), filled(22));
    assert_eq!(stitcher.open_plane(0, 0).unwrap(), filled(11));
    assert_eq!(
        stitcher.used_files().unwrap(),
        vec!["cell_s1_t1.tif", "cell_s1_t2.tif", "cell_s2_t1.tif", "cell_s2_t2.tif"]
    );
    assert_eq!(stitcher.series_used_files(0).unwrap(), vec!["cell_s1_t1.tif", "cell_s1_t2.tif"]);
    assert_eq!(stitcher.series_used_files(1).unwrap(), vec!["cell_s2_t1.tif", "cell_s2_t2.tif"]);
    assert!(matches!(
        stitcher.series_used_files(2),
        Err(StitchError::SeriesOutOfRange { series: 2, count: 2 })
    ));

    let config = StitchConfig { split_series: false, ..StitchConfig::default() };
    let mut joined = stitcher_with(&fs, config);
    joined.initialize("cell_s1_t1.tif").unwrap();
    assert_eq!(joined.series_count(), 1);
    assert_eq!(joined.axis_types(0).unwrap(), &[AxisType::Series, AxisType::T]);
    assert_eq!(joined.image_count(0).unwrap(), 2);
}

#[test]
fn test_multi_series_families_rejected() {
    let fs = MemoryFileSystem::new();
    fs.touch("multi_s1&series=2&sizeX=2&sizeY=2.fake");
    fs.touch("multi_s2&series=2&sizeX=2&sizeY=2.fake");

    let mut stitcher = stitcher(&fs);
    match stitcher.initialize("multi_s1&series=2&sizeX=2&sizeY=2.fake") {
        Err(StitchError::UnsupportedGrouping { files, series }) => assert_eq!((files, series), (2, 2)),
        other => panic!("Expected UnsupportedGrouping, got {:?}", other.err()),
    }
}

#[test]
fn test_multi_series_files_in_one_family() {
    let fs = MemoryFileSystem::new();
    fs.touch("multi_t1&series=2&sizeX=2&sizeY=2.fake");
    fs.touch("multi_t2&series=2&sizeX=2&sizeY=2.fake");

    let mut stitcher = stitcher(&fs);
    stitcher.initialize("multi_t1&series=2&sizeX=2&sizeY=2.fake").unwrap();

    assert_eq!(stitcher.series_count(), 2);
    assert_eq!(stitcher.size_t(1).unwrap(), 2);
    assert_eq!(stitcher.open_plane(1, 1).unwrap().len(), 4);
}

#[test]
fn test_fake_name_in_unlisted_directory() {
    let registry = ReaderRegistry::new(Arc::new(LocalFileSystem));
    let mut stitcher = FileStitcher::new(registry, StitchConfig::default());
    let name = "stitchkit_absent_dir/stack&sizeX=2&sizeY=2&sizeZ=3.fake";

    stitcher.initialize(name).unwrap();
    assert!(stitcher.is_pass_through());
    assert_eq!(stitcher.size_z(0).unwrap(), 3);
    assert_eq!(stitcher.series_used_files(0).unwrap(), vec![name]);
    assert_eq!(stitcher.open_plane(0, 2).unwrap().len(), 4);

    assert!(matches!(
        stitcher.initialize("stitchkit_absent_dir/img_t1.tif"),
        Err(StitchError::NoMatchingFiles(_))
    ));
}

#[test]
fn test_uncertain_time_becomes_depth() {
    let fs = MemoryFileSystem::new();
    let name = |t: usize| format!("tl_t{}&sizeX=4&sizeY=4&sizeT=4&certain=false.fake", t);
    for t in 1..=3 {
        fs.touch(&name(t));
    }

    let mut stitcher = stitcher(&fs);
    stitcher.initialize(&name(1)).unwrap();
    assert_eq!(stitcher.dimension_order(0).unwrap().as_str(), "XYTCZ");
    assert_eq!((stitcher.size_z(0).unwrap(), stitcher.size_t(0).unwrap()), (4, 3));
    assert_eq!(stitcher.image_count(0).unwrap(), 12);

    let no = stitcher.index(0, 2, 0, 1).unwrap();
    let location = stitcher.to_file_and_plane(0, no).unwrap();
    assert_eq!(location.file_index, 1);
    assert_eq!(location.plane_index, 2);

    let mut direct = FakeReader::new();
    direct.set_id(&name(2)).unwrap();
    let expected = direct.open_bytes(0, 2, &Region::new(0, 0, 4, 4)).unwrap();
    assert_eq!(stitcher.open_plane(0, no).unwrap(), expected);
}

#[test]
fn test_unresolved_blocks() {
    let fs = MemoryFileSystem::new();
    let mut first = None;
    for x in 1..=2 {
        for y in 1..=2 {
            for q in 1..=2 {
                for r in 1..=2 {
                    let name = format!("x{}_y{}_q{}_r{}&sizeX=2&sizeY=2.fake", x, y, q, r);
                    fs.touch(&name);
                    first.get_or_insert(name);
                }
            }
        }
    }
    let seed = first.unwrap();

    let mut stitcher = stitcher(&fs);
    stitcher.initialize(&seed).unwrap();
    assert_eq!(
        stitcher.axis_types(0).unwrap(),
        &[AxisType::Z, AxisType::T, AxisType::C, AxisType::Series]
    );
    assert_eq!(stitcher.image_count(0).unwrap(), 8);
    assert_eq!(stitcher.file_count(0).unwrap(), 16);

    let config = StitchConfig { unresolved_axis: UnresolvedAxisPolicy::Reject, ..StitchConfig::default() };
    let mut strict = stitcher_with(&fs, config);
    assert!(matches!(strict.initialize(&seed), Err(StitchError::UnknownAxis { index: 3 })));
}

#[test]
fn test_override_axis_types() {
    let fs = depth_channel_grid();
    let mut stitcher = stitcher(&fs);
    stitcher.initialize("img_z01_c01.tif").unwrap();

    stitcher.set_axis_types(0, &[AxisType::C, AxisType::Z]).unwrap();
    assert_eq!((stitcher.size_z(0).unwrap(), stitcher.size_c(0).unwrap()), (2, 3));
    assert_eq!(stitcher.image_count(0).unwrap(), 6);

    assert!(matches!(
        stitcher.set_axis_types(0, &[AxisType::Z]),
        Err(StitchError::AxisCountMismatch { expected: 2, actual: 1 })
    ));
    assert!(matches!(
        stitcher.set_axis_types(0, &[AxisType::Z, AxisType::Unknown]),
        Err(StitchError::UnknownAxis { index: 1 })
    ));
    assert_eq!(stitcher.axis_types(0).unwrap(), &[AxisType::C, AxisType::Z]);
    assert_eq!(stitcher.size_z(0).unwrap(), 2);
}

#[test]
fn test_request_validation() {
    let fs = time_series(2);
    let mut stitcher = stitcher(&fs);
    stitcher.initialize("data/img_t1.tif").unwrap();

    assert!(matches!(
        stitcher.open_plane(0, 2),
        Err(StitchError::PlaneOutOfRange { plane: 2, count: 2 })
    ));
    assert!(matches!(
        stitcher.core(3),
        Err(StitchError::SeriesOutOfRange { series: 3, count: 1 })
    ));
    assert!(matches!(
        stitcher.open_bytes(0, 0, &Region::new(1, 1, 2, 2)),
        Err(StitchError::RegionOutOfBounds { .. })
    ));
    assert_eq!(stitcher.open_bytes(0, 1, &Region::new(1, 1, 1, 1)).unwrap(), vec![20]);
}

#[test]
fn test_close_is_idempotent() {
    let fs = time_series(2);
    let mut stitcher = stitcher(&fs);
    assert!(matches!(stitcher.core(0), Err(StitchError::NotInitialized)));

    stitcher.initialize("data/img_t1.tif").unwrap();
    stitcher.close();
    stitcher.close();

    assert_eq!(stitcher.series_count(), 0);
    assert_eq!(stitcher.open_file_count(), 0);
    assert!(matches!(stitcher.open_plane(0, 0), Err(StitchError::NotInitialized)));
    assert!(matches!(stitcher.used_files(), Err(StitchError::NotInitialized)));

    stitcher.initialize("data/img_t2.tif").unwrap();
    assert_eq!(stitcher.open_plane(0, 1).unwrap(), filled(20));
}
