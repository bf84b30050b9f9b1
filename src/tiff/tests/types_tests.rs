//! Tests for the TIFF types module

use crate::io::byte_order::ByteOrder;
use crate::tiff::types::TIFF;
use crate::tiff::ifd::{IFD, IFDEntry};

fn long_entry(tag: u16, value: u32) -> IFDEntry {
    IFDEntry::new(tag, 4, 1, value.to_le_bytes().to_vec(), value as u64)
}

#[test]
fn test_tiff_creation() {
    let tiff = TIFF::new(false, ByteOrder::LittleEndian);
    assert!(!tiff.is_big_tiff);
    assert_eq!(tiff.ifd_count(), 0);
    assert!(tiff.main_ifd().is_none());
}

#[test]
fn test_image_ifds_skip_reduced_resolution() {
    let mut tiff = TIFF::new(false, ByteOrder::LittleEndian);

    let mut main_ifd = IFD::new(0, 8);
    main_ifd.add_entry(long_entry(256, 1024));
    main_ifd.add_entry(long_entry(257, 768));
    tiff.ifds.push(main_ifd);

    let mut overview_ifd = IFD::new(1, 100);
    overview_ifd.add_entry(long_entry(254, 1)); // reduced resolution
    overview_ifd.add_entry(long_entry(256, 512));
    overview_ifd.add_entry(long_entry(257, 384));
    tiff.ifds.push(overview_ifd);

    let mut second_plane = IFD::new(2, 200);
    second_plane.add_entry(long_entry(254, 0));
    second_plane.add_entry(long_entry(256, 1024));
    second_plane.add_entry(long_entry(257, 768));
    tiff.ifds.push(second_plane);

    let planes = tiff.image_ifds();
    assert_eq!(planes.len(), 2);
    assert_eq!(planes[1].number, 2);
    assert_eq!(planes[0].get_dimensions(ByteOrder::LittleEndian), Some((1024, 768)));
}
