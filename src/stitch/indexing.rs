//! Mixed-radix plane index arithmetic
//!
//! A stitched plane index is decoded in three steps: the global index
//! becomes a (z, c, t) coordinate using the series' dimension order; each
//! coordinate is split into digits against its axis length table, where
//! digit 0 is the coordinate inside one file and the remaining digits are
//! positions in the pattern blocks assigned to that axis; the block digits
//! are re-encoded into a file index and the digit 0s into a plane index of
//! that file.

use crate::formats::core::{CoreMetadata, DimensionOrder};
use crate::stitch::axis::AxisType;
use crate::stitch::errors::{StitchError, StitchResult};

/// Splits a raster index into digits, first digit fastest
///
/// Zero lengths are treated as 1.
pub fn raster_to_position(lengths: &[usize], raster: usize) -> Vec<usize> {
    let mut rest = raster;
    lengths
        .iter()
        .map(|&len| {
            let len = len.max(1);
            let digit = rest % len;
            rest /= len;
            digit
        })
        .collect()
}

/// Joins digits into a raster index, first digit fastest
pub fn position_to_raster(lengths: &[usize], position: &[usize]) -> usize {
    let mut raster = 0;
    let mut scale = 1;
    for (&len, &digit) in lengths.iter().zip(position) {
        raster += digit * scale;
        scale *= len.max(1);
    }
    raster
}

/// Slot of an axis letter in a `[z, c, t]` triple
fn zct_slot(axis: char) -> usize {
    match axis {
        'Z' => 0,
        'C' => 1,
        _ => 2,
    }
}

/// Axis lengths in the order the axes vary, fastest first
fn ordered_lengths(order: &DimensionOrder, sizes: [usize; 3]) -> (Vec<char>, Vec<usize>) {
    let letters = order.zct_letters();
    let lengths = letters.iter().map(|&axis| sizes[zct_slot(axis)]).collect();
    (letters, lengths)
}

/// Decodes a plane index into `[z, c, t]`
///
/// `size_c` is the number of channel planes, with RGB samples folded out.
pub fn zct_coords(order: &DimensionOrder, size_z: usize, size_c: usize, size_t: usize, no: usize) -> [usize; 3] {
    let (letters, lengths) = ordered_lengths(order, [size_z, size_c, size_t]);
    let digits = raster_to_position(&lengths, no);
    let mut zct = [0; 3];
    for (axis, digit) in letters.into_iter().zip(digits) {
        zct[zct_slot(axis)] = digit;
    }
    zct
}

/// Encodes `[z, c, t]` into a plane index
pub fn plane_index(order: &DimensionOrder, size_z: usize, size_c: usize, size_t: usize, zct: [usize; 3]) -> usize {
    let (letters, lengths) = ordered_lengths(order, [size_z, size_c, size_t]);
    let digits: Vec<usize> = letters.iter().map(|&axis| zct[zct_slot(axis)]).collect();
    position_to_raster(&lengths, &digits)
}

/// Channel table with the RGB samples of each file folded out of digit 0
pub fn fold_channel_lengths(len_c: &[usize], rgb_channel_count: usize) -> Vec<usize> {
    let mut folded = len_c.to_vec();
    if let Some(first) = folded.first_mut() {
        *first = (*first / rgb_channel_count.max(1)).max(1);
    }
    folded
}

/// Encodes per-block positions into a file index, last block fastest
pub fn file_index(counts: &[usize], position: &[usize]) -> usize {
    counts
        .iter()
        .zip(position)
        .fold(0, |index, (&count, &digit)| index * count.max(1) + digit)
}

/// Decodes a file index into per-block positions, last block fastest
pub fn file_position(counts: &[usize], index: usize) -> Vec<usize> {
    let mut rest = index;
    let mut position = vec![0; counts.len()];
    for (slot, &count) in position.iter_mut().zip(counts).rev() {
        let count = count.max(1);
        *slot = rest % count;
        rest /= count;
    }
    position
}

/// Per-axis length tables of one stitched series
///
/// Entry 0 of each table is the extent inside one file; the following
/// entries are the counts of the pattern blocks assigned to that axis, in
/// block order. For C, entry 0 still includes RGB samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisLengths {
    pub len_z: Vec<usize>,
    pub len_c: Vec<usize>,
    pub len_t: Vec<usize>,
}

impl AxisLengths {
    /// Builds the tables from the block axes and the intrinsic extents
    ///
    /// # Arguments
    /// * `axes` - Axis of each pattern block
    /// * `counts` - Element count of each pattern block
    /// * `intrinsic` - Per-file `[size_z, size_c, size_t]`
    pub fn compute(axes: &[AxisType], counts: &[usize], intrinsic: [usize; 3]) -> StitchResult<Self> {
        let mut lengths = AxisLengths {
            len_z: vec![intrinsic[0]],
            len_c: vec![intrinsic[1]],
            len_t: vec![intrinsic[2]],
        };
        for (index, (axis, &count)) in axes.iter().zip(counts).enumerate() {
            match axis {
                AxisType::Z => lengths.len_z.push(count),
                AxisType::C => lengths.len_c.push(count),
                AxisType::T => lengths.len_t.push(count),
                AxisType::Series => {}
                AxisType::Unknown => return Err(StitchError::UnknownAxis { index }),
            }
        }
        Ok(lengths)
    }

    pub fn size_z(&self) -> usize {
        self.len_z.iter().product()
    }

    /// Total channels, RGB samples included
    pub fn size_c(&self) -> usize {
        self.len_c.iter().product()
    }

    pub fn size_t(&self) -> usize {
        self.len_t.iter().product()
    }
}

/// Where a stitched plane lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneLocation {
    /// Index into the family's file list
    pub file_index: usize,
    /// Plane index inside that file, in the intrinsic order
    pub plane_index: usize,
    /// Stitched (z, c, t) coordinate
    pub zct: [usize; 3],
    /// (z, c, t) coordinate inside the file
    pub file_zct: [usize; 3],
}

/// Translates a stitched plane index into a file and intra-file plane
///
/// # Arguments
/// * `lengths` - Axis length tables of the series
/// * `axes` - Axis of each pattern block
/// * `counts` - Element count of each pattern block
/// * `series` - Stitched metadata (order and combined sizes)
/// * `intrinsic` - Metadata of one file of the family
/// * `no` - Stitched plane index
pub fn translate(
    lengths: &AxisLengths,
    axes: &[AxisType],
    counts: &[usize],
    series: &CoreMetadata,
    intrinsic: &CoreMetadata,
    no: usize,
) -> StitchResult<PlaneLocation> {
    let zct = series.zct_coords(no);
    let pos_z = raster_to_position(&lengths.len_z, zct[0]);
    let pos_c = raster_to_position(&fold_channel_lengths(&lengths.len_c, intrinsic.rgb_channel_count), zct[1]);
    let pos_t = raster_to_position(&lengths.len_t, zct[2]);

    let (mut z, mut c, mut t) = (1, 1, 1);
    let mut position = Vec::with_capacity(axes.len());
    for (index, axis) in axes.iter().enumerate() {
        let digit = match axis {
            AxisType::Z => {
                z += 1;
                pos_z[z - 1]
            }
            AxisType::C => {
                c += 1;
                pos_c[c - 1]
            }
            AxisType::T => {
                t += 1;
                pos_t[t - 1]
            }
            AxisType::Series => 0,
            AxisType::Unknown => return Err(StitchError::UnknownAxis { index }),
        };
        position.push(digit);
    }

    let file_zct = [pos_z[0], pos_c[0], pos_t[0]];
    Ok(PlaneLocation {
        file_index: file_index(counts, &position),
        plane_index: intrinsic.plane_index(file_zct[0], file_zct[1], file_zct[2]),
        zct,
        file_zct,
    })
}
