use std::io::Cursor;
use byteorder::{BigEndian, LittleEndian, WriteBytesExt};

/// Creates a test buffer with TIFF header and one IFD
///
/// The IFD also carries a SHORT BitsPerSample and an out-of-line ASCII
/// ImageDescription.
pub fn create_test_tiff_buffer() -> Cursor<Vec<u8>> {
    let mut buffer = Vec::new();

    // TIFF header (little-endian)
    buffer.write_u16::<LittleEndian>(0x4949).unwrap(); // II for little-endian
    buffer.write_u16::<LittleEndian>(42).unwrap();     // TIFF magic number
    buffer.write_u32::<LittleEndian>(8).unwrap();      // IFD offset

    // Sample IFD (at offset 8)
    buffer.write_u16::<LittleEndian>(4).unwrap();      // Entry count

    // Entry 1: ImageWidth (tag 256)
    buffer.write_u16::<LittleEndian>(256).unwrap();
    buffer.write_u16::<LittleEndian>(4).unwrap();      // LONG
    buffer.write_u32::<LittleEndian>(1).unwrap();
    buffer.write_u32::<LittleEndian>(800).unwrap();

    // Entry 2: ImageLength (tag 257)
    buffer.write_u16::<LittleEndian>(257).unwrap();
    buffer.write_u16::<LittleEndian>(4).unwrap();      // LONG
    buffer.write_u32::<LittleEndian>(1).unwrap();
    buffer.write_u32::<LittleEndian>(600).unwrap();

    // Entry 3: BitsPerSample (tag 258)
    buffer.write_u16::<LittleEndian>(258).unwrap();
    buffer.write_u16::<LittleEndian>(3).unwrap();      // SHORT
    buffer.write_u32::<LittleEndian>(1).unwrap();
    buffer.write_u16::<LittleEndian>(16).unwrap();
    buffer.write_u16::<LittleEndian>(0).unwrap();

    // Entry 4: ImageDescription (tag 270), stored after the IFD
    let description = b"hello\0";
    let description_offset = 8 + 2 + 4 * 12 + 4;
    buffer.write_u16::<LittleEndian>(270).unwrap();
    buffer.write_u16::<LittleEndian>(2).unwrap();      // ASCII
    buffer.write_u32::<LittleEndian>(description.len() as u32).unwrap();
    buffer.write_u32::<LittleEndian>(description_offset).unwrap();

    // Next IFD offset (0 = no more IFDs)
    buffer.write_u32::<LittleEndian>(0).unwrap();
    buffer.extend_from_slice(description);

    Cursor::new(buffer)
}

/// Creates a big-endian TIFF buffer with two IFDs of one entry each
pub fn create_big_endian_two_ifd_buffer() -> Cursor<Vec<u8>> {
    let mut buffer = Vec::new();

    buffer.write_u16::<BigEndian>(0x4D4D).unwrap();    // MM
    buffer.write_u16::<BigEndian>(42).unwrap();
    buffer.write_u32::<BigEndian>(8).unwrap();

    // IFD 0 at 8: SHORT width stored in the first two bytes of the value field
    buffer.write_u16::<BigEndian>(1).unwrap();
    buffer.write_u16::<BigEndian>(256).unwrap();
    buffer.write_u16::<BigEndian>(3).unwrap();
    buffer.write_u32::<BigEndian>(1).unwrap();
    buffer.write_u16::<BigEndian>(320).unwrap();
    buffer.write_u16::<BigEndian>(0).unwrap();
    buffer.write_u32::<BigEndian>(26).unwrap();        // next IFD

    // IFD 1 at 26
    buffer.write_u16::<BigEndian>(1).unwrap();
    buffer.write_u16::<BigEndian>(256).unwrap();
    buffer.write_u16::<BigEndian>(3).unwrap();
    buffer.write_u32::<BigEndian>(1).unwrap();
    buffer.write_u16::<BigEndian>(160).unwrap();
    buffer.write_u16::<BigEndian>(0).unwrap();
    buffer.write_u32::<BigEndian>(0).unwrap();

    Cursor::new(buffer)
}

/// Creates a test buffer with BigTIFF header and sample data
pub fn create_test_bigtiff_buffer() -> Cursor<Vec<u8>> {
    let mut buffer = Vec::new();

    // BigTIFF header (little-endian)
    buffer.write_u16::<LittleEndian>(0x4949).unwrap(); // II for little-endian
    buffer.write_u16::<LittleEndian>(43).unwrap();     // BigTIFF version
    buffer.write_u16::<LittleEndian>(8).unwrap();      // Offset size
    buffer.write_u16::<LittleEndian>(0).unwrap();      // Reserved
    buffer.write_u64::<LittleEndian>(16).unwrap();     // IFD offset

    // Sample IFD (at offset 16)
    buffer.write_u64::<LittleEndian>(2).unwrap();      // Entry count (2 entries)

    // Entry 1: ImageWidth (tag 256)
    buffer.write_u16::<LittleEndian>(256).unwrap();    // Tag
    buffer.write_u16::<LittleEndian>(4).unwrap();      // Type (LONG)
    buffer.write_u64::<LittleEndian>(1).unwrap();      // Count
    buffer.write_u64::<LittleEndian>(1024).unwrap();   // Value (width)

    // Entry 2: ImageLength/Height (tag 257)
    buffer.write_u16::<LittleEndian>(257).unwrap();    // Tag
    buffer.write_u16::<LittleEndian>(4).unwrap();      // Type (LONG)
    buffer.write_u64::<LittleEndian>(1).unwrap();      // Count
    buffer.write_u64::<LittleEndian>(768).unwrap();    // Value (height)

    // Next IFD offset (0 = no more IFDs)
    buffer.write_u64::<LittleEndian>(0).unwrap();

    Cursor::new(buffer)
}
