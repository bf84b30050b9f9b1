//! Core TIFF data structures

use crate::io::byte_order::ByteOrder;
use crate::tiff::constants::{new_subfile_type, tags};
use crate::tiff::ifd::IFD;
use std::fmt;

/// Represents a TIFF file with its Image File Directories (IFDs)
#[derive(Debug)]
pub struct TIFF {
    /// Image File Directories in the TIFF file
    pub ifds: Vec<IFD>,
    /// Whether this is a BigTIFF format
    pub is_big_tiff: bool,
    /// Byte order announced in the header
    pub byte_order: ByteOrder,
}

impl TIFF {
    /// Creates a new empty TIFF structure
    pub fn new(is_big_tiff: bool, byte_order: ByteOrder) -> Self {
        TIFF {
            ifds: Vec::new(),
            is_big_tiff,
            byte_order,
        }
    }

    /// Returns the main (first) IFD if available
    pub fn main_ifd(&self) -> Option<&IFD> {
        self.ifds.first()
    }

    /// Returns the number of IFDs in the TIFF file
    pub fn ifd_count(&self) -> usize {
        self.ifds.len()
    }

    /// IFDs holding full-resolution planes, in file order
    ///
    /// Reduced-resolution subfiles (pyramid levels, thumbnails) are skipped.
    pub fn image_ifds(&self) -> Vec<&IFD> {
        self.ifds
            .iter()
            .filter(|ifd| {
                let subfile = ifd
                    .get_tag_value(tags::NEW_SUBFILE_TYPE, self.byte_order)
                    .unwrap_or(0);
                subfile & new_subfile_type::REDUCED_RESOLUTION == 0
            })
            .collect()
    }
}

impl fmt::Display for TIFF {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "TIFF File:")?;
        writeln!(f, "  Format: {}", if self.is_big_tiff { "BigTIFF" } else { "TIFF" })?;
        writeln!(f, "  Byte order: {}", self.byte_order.name())?;
        writeln!(f, "  Number of IFDs: {}", self.ifds.len())?;

        if let Some(ifd) = self.main_ifd() {
            write!(f, "{}", ifd)?;
        }

        Ok(())
    }
}
