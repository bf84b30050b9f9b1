//! Dimension stage between a format reader and the stitcher
//!
//! [`DimensionSwapper`] wraps any [`FormatReader`] and offers two
//! independent adjustments per series:
//!
//! * `swap_dimensions` relabels axes. The sizes stay where they are in the
//!   order string and take the letter found at the same position of the new
//!   order, so `XYZCT` with Z=5 swapped to `XYTCZ` reports T=5. Plane
//!   indices are unchanged.
//! * `set_output_order` keeps the axes but reports planes in another
//!   rasterization order; plane indices are translated back to the wrapped
//!   reader's order on every read.

use log::debug;

use crate::formats::core::{CoreMetadata, DimensionOrder, Region};
use crate::formats::errors::{FormatError, FormatResult};
use crate::formats::reader::{series_core, FormatReader};

pub struct DimensionSwapper {
    reader: Box<dyn FormatReader>,
    /// Metadata after relabeling, in the wrapped reader's plane order
    swapped: Vec<CoreMetadata>,
    /// Metadata as reported, with the output order applied
    reported: Vec<CoreMetadata>,
}

impl DimensionSwapper {
    pub fn new(reader: Box<dyn FormatReader>) -> Self {
        DimensionSwapper {
            reader,
            swapped: Vec::new(),
            reported: Vec::new(),
        }
    }

    /// The order planes are stored in after relabeling
    pub fn input_order(&self, series: usize) -> FormatResult<&DimensionOrder> {
        Ok(&series_core(&self.swapped, series)?.dimension_order)
    }

    /// Relabels the axes of a series to follow `order`
    ///
    /// X and Y must keep their positions. The channel axis of an RGB series
    /// cannot move, since its samples live inside each plane.
    pub fn swap_dimensions(&mut self, series: usize, order: &DimensionOrder) -> FormatResult<()> {
        let current = series_core(&self.swapped, series)?.clone();
        let old = &current.dimension_order;
        if old == order {
            return Ok(());
        }
        if old.position('X') != order.position('X') || old.position('Y') != order.position('Y') {
            return Err(FormatError::InvalidDimensionOrder(format!(
                "cannot move X or Y: {} -> {}",
                old, order
            )));
        }
        if current.is_rgb() && old.position('C') != order.position('C') {
            return Err(FormatError::InvalidDimensionOrder(format!(
                "cannot move the channel axis of an RGB series: {} -> {}",
                old, order
            )));
        }

        let size_of = |axis: char| match axis {
            'Z' => current.size_z,
            'C' => current.size_c,
            'T' => current.size_t,
            _ => 1,
        };
        let mut relabeled = current.clone();
        for (old_axis, new_axis) in old.as_str().chars().zip(order.as_str().chars()) {
            let size = size_of(old_axis);
            match new_axis {
                'Z' => relabeled.size_z = size,
                'C' => relabeled.size_c = size,
                'T' => relabeled.size_t = size,
                _ => {}
            }
        }
        relabeled.dimension_order = order.clone();
        debug!(
            "Swapped dimensions of series {}: {} (Z={} C={} T={}) -> {} (Z={} C={} T={})",
            series, old, current.size_z, current.size_c, current.size_t,
            order, relabeled.size_z, relabeled.size_c, relabeled.size_t
        );

        let output = self.reported[series].dimension_order.clone();
        let was_reordered = output != current.dimension_order;
        self.swapped[series] = relabeled.clone();
        self.reported[series] = relabeled;
        if was_reordered {
            self.reported[series].dimension_order = output;
        }
        Ok(())
    }

    /// Reports the planes of a series in `order`
    pub fn set_output_order(&mut self, series: usize, order: &DimensionOrder) -> FormatResult<()> {
        series_core(&self.swapped, series)?;
        self.reported[series].dimension_order = order.clone();
        Ok(())
    }

    /// Plane index of (z, c, t) in the reported order
    pub fn plane_index(&self, series: usize, z: usize, c: usize, t: usize) -> FormatResult<usize> {
        Ok(series_core(&self.reported, series)?.plane_index(z, c, t))
    }

    /// Maps a reported plane index onto the wrapped reader's index
    fn input_plane(&self, series: usize, no: usize) -> FormatResult<usize> {
        let reported = series_core(&self.reported, series)?;
        let swapped = series_core(&self.swapped, series)?;
        if reported.dimension_order == swapped.dimension_order {
            return Ok(no);
        }
        let [z, c, t] = reported.zct_coords(no);
        Ok(swapped.plane_index(z, c, t))
    }
}

impl FormatReader for DimensionSwapper {
    fn format_name(&self) -> &'static str {
        self.reader.format_name()
    }

    fn set_id(&mut self, path: &str) -> FormatResult<()> {
        self.reader.set_id(path)?;
        self.swapped = (0..self.reader.series_count())
            .map(|s| self.reader.core(s).cloned())
            .collect::<FormatResult<Vec<_>>>()?;
        self.reported = self.swapped.clone();
        Ok(())
    }

    fn close(&mut self) {
        self.reader.close();
        self.swapped.clear();
        self.reported.clear();
    }

    fn current_file(&self) -> Option<&str> {
        self.reader.current_file()
    }

    fn series_count(&self) -> usize {
        self.reported.len()
    }

    fn core(&self, series: usize) -> FormatResult<&CoreMetadata> {
        series_core(&self.reported, series)
    }

    fn open_bytes(&mut self, series: usize, no: usize, region: &Region) -> FormatResult<Vec<u8>> {
        let count = series_core(&self.reported, series)?.image_count;
        if no >= count {
            return Err(FormatError::PlaneOutOfRange { plane: no, count });
        }
        let input = self.input_plane(series, no)?;
        self.reader.open_bytes(series, input, region)
    }

    fn used_files(&self) -> Vec<String> {
        self.reader.used_files()
    }
}
