//! Axis guessing for file patterns
//!
//! Every numeric block of a [`FilePattern`] is assigned to Z, C, T or
//! Series. The text preceding a block decides first (`_z01`, `_ch2`,
//! `_t005`); the prefix table is embedded from `axis_prefixes.toml`.
//! Blocks without a known prefix are assigned by elimination against the
//! axes the file names and the files themselves already vary.

use std::fmt;

use lazy_static::lazy_static;
use log::{debug, error, warn};

use crate::formats::core::DimensionOrder;
use crate::stitch::errors::{StitchError, StitchResult};
use crate::stitch::pattern::FilePattern;

lazy_static! {
    static ref AXIS_PREFIXES: AxisPrefixes = {
        let content = include_str!("../../axis_prefixes.toml");
        AxisPrefixes::from_str(content).unwrap_or_else(|e| {
            error!("Failed to parse axis prefix table: {}", e);
            AxisPrefixes::default()
        })
    };
}

/// Axis a pattern block varies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxisType {
    Z,
    C,
    T,
    Series,
    Unknown,
}

impl AxisType {
    /// Dimension order letter, for the axes that have one
    pub fn letter(&self) -> Option<char> {
        match self {
            AxisType::Z => Some('Z'),
            AxisType::C => Some('C'),
            AxisType::T => Some('T'),
            AxisType::Series | AxisType::Unknown => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AxisType::Z => "Z",
            AxisType::C => "C",
            AxisType::T => "T",
            AxisType::Series => "series",
            AxisType::Unknown => "unknown",
        }
    }

    /// Parses `z`, `c`, `t`, `s`/`series` or `unknown`, case-insensitively
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "z" => Some(AxisType::Z),
            "c" => Some(AxisType::C),
            "t" => Some(AxisType::T),
            "s" | "series" => Some(AxisType::Series),
            "u" | "unknown" => Some(AxisType::Unknown),
            _ => None,
        }
    }
}

impl fmt::Display for AxisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What to do with blocks that no heuristic can place
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnresolvedAxisPolicy {
    /// Keep them as an outer series selector
    #[default]
    Series,
    /// Tag them Unknown, which the stitcher rejects
    Reject,
}

impl UnresolvedAxisPolicy {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "series" => Some(UnresolvedAxisPolicy::Series),
            "reject" | "unknown" => Some(UnresolvedAxisPolicy::Reject),
            _ => None,
        }
    }
}

/// Prefix lists per axis
#[derive(Debug, Default)]
pub struct AxisPrefixes {
    z: Vec<String>,
    t: Vec<String>,
    c: Vec<String>,
    series: Vec<String>,
}

impl AxisPrefixes {
    /// Parses a prefix table from TOML
    ///
    /// The table lives under `[axes]` with one string array per axis
    /// (`z`, `t`, `c`, `series`).
    pub fn from_str(content: &str) -> StitchResult<Self> {
        let toml_value: toml::Value = content
            .parse()
            .map_err(|e| StitchError::Config(format!("Failed to parse TOML: {}", e)))?;
        let axes = toml_value
            .get("axes")
            .and_then(|v| v.as_table())
            .ok_or_else(|| StitchError::Config("missing [axes] table".to_string()))?;

        let list = |key: &str| -> Vec<String> {
            axes.get(key)
                .and_then(|v| v.as_array())
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|item| item.as_str())
                        .map(|s| s.to_lowercase())
                        .collect()
                })
                .unwrap_or_default()
        };

        Ok(AxisPrefixes {
            z: list("z"),
            t: list("t"),
            c: list("c"),
            series: list("series"),
        })
    }

    /// Axis named by a reduced prefix
    pub fn axis_for(&self, prefix: &str) -> Option<AxisType> {
        let matches = |list: &[String]| list.iter().any(|p| p == prefix);
        if prefix.is_empty() {
            None
        } else if matches(&self.z) {
            Some(AxisType::Z)
        } else if matches(&self.t) {
            Some(AxisType::T)
        } else if matches(&self.c) {
            Some(AxisType::C)
        } else if matches(&self.series) {
            Some(AxisType::Series)
        } else {
            None
        }
    }
}

/// Reduces the text before a block to its trailing run of letters
///
/// `"dir/img_Z"` gives `"z"`, `"focalplane-"` gives `"focalplane"`,
/// `"img_"` gives `"img"`.
pub fn block_prefix(text: &str) -> String {
    let lower = text.to_lowercase();
    let trimmed = lower.trim_end_matches(|c: char| !c.is_alphabetic());
    let start = trimmed
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_alphabetic())
        .last()
        .map(|(i, _)| i)
        .unwrap_or(trimmed.len());
    trimmed[start..].to_string()
}

/// Axis named by the text before a block, if any
pub fn prefix_axis(text: &str) -> Option<AxisType> {
    AXIS_PREFIXES.axis_for(&block_prefix(text))
}

/// Result of guessing the axes of a pattern
#[derive(Debug, Clone, PartialEq)]
pub struct AxisAssignment {
    /// One axis per pattern block
    pub axis_types: Vec<AxisType>,
    /// Intrinsic order, Z/T-swapped if needed, extended with found axes
    pub adjusted_order: DimensionOrder,
    pub certain: bool,
    /// Intrinsic extents after any Z/T swap
    pub size_z: usize,
    pub size_c: usize,
    pub size_t: usize,
    /// Whether the per-file Z and T were exchanged
    pub swapped_zt: bool,
}

impl AxisAssignment {
    fn count(&self, axis: AxisType) -> usize {
        self.axis_types.iter().filter(|a| **a == axis).count()
    }

    /// Number of blocks assigned to Z
    pub fn count_z(&self) -> usize {
        self.count(AxisType::Z)
    }

    pub fn count_c(&self) -> usize {
        self.count(AxisType::C)
    }

    pub fn count_t(&self) -> usize {
        self.count(AxisType::T)
    }

    pub fn count_series(&self) -> usize {
        self.count(AxisType::Series)
    }
}

/// Blocks assigned to Series that hold several values
///
/// Series blocks always read at their first value, so files with any
/// other value there are listed but never read.
pub fn unreachable_blocks(pattern: &FilePattern, axis_types: &[AxisType]) -> Vec<usize> {
    axis_types
        .iter()
        .zip(pattern.count())
        .enumerate()
        .filter(|(_, (axis, count))| **axis == AxisType::Series && *count > 1)
        .map(|(index, _)| index)
        .collect()
}

/// Assigns an axis to every block of a pattern
///
/// # Arguments
/// * `pattern` - File family pattern
/// * `order` - Dimension order of the first file
/// * `size_z`, `size_t`, `size_c` - Extents of the first file (C without RGB samples)
/// * `order_certain` - Whether the first file's order is reliable
/// * `policy` - Treatment of blocks no rule can place
///
/// # Returns
/// The block axes, the adjusted dimension order and the certainty flag.
///
/// A pattern with a single unprefixed block is taken to vary time; this
/// may misclassify unusual naming schemes. Unknown blocks must be split
/// into separate families before stitching.
pub fn guess_axes(
    pattern: &FilePattern,
    order: &DimensionOrder,
    size_z: usize,
    size_t: usize,
    size_c: usize,
    order_certain: bool,
    policy: UnresolvedAxisPolicy,
) -> AxisAssignment {
    let prefixes = pattern.prefixes();
    let mut axis_types: Vec<AxisType> = prefixes
        .iter()
        .map(|text| prefix_axis(text).unwrap_or(AxisType::Unknown))
        .collect();

    let found = |types: &[AxisType], axis: AxisType| types.contains(&axis);
    let mut found_z = found(&axis_types, AxisType::Z);
    let mut found_t = found(&axis_types, AxisType::T);
    let mut found_c = found(&axis_types, AxisType::C);

    let mut order = order.clone();
    let (mut size_z, mut size_t) = (size_z, size_t);
    let mut swapped_zt = false;
    if !order_certain
        && ((found_z && !found_t && size_z > 1 && size_t == 1) || (found_t && !found_z && size_t > 1 && size_z == 1))
    {
        debug!("Reinterpreting per-file {} planes as {}", if found_z { "Z" } else { "T" }, if found_z { "T" } else { "Z" });
        order = order.swap_zt();
        std::mem::swap(&mut size_z, &mut size_t);
        swapped_zt = true;
    }

    let mut certain = order_certain;
    let unresolved: Vec<usize> = axis_types
        .iter()
        .enumerate()
        .filter(|(_, axis)| **axis == AxisType::Unknown)
        .map(|(i, _)| i)
        .collect();

    if axis_types.len() == 1 && unresolved.len() == 1 {
        axis_types[0] = AxisType::T;
        certain = false;
    } else {
        for index in unresolved {
            certain = false;
            axis_types[index] = if !found_z && size_z == 1 {
                found_z = true;
                AxisType::Z
            } else if !found_t && size_t == 1 {
                found_t = true;
                AxisType::T
            } else if !found_c && size_c == 1 {
                found_c = true;
                AxisType::C
            } else {
                match policy {
                    UnresolvedAxisPolicy::Series => AxisType::Series,
                    UnresolvedAxisPolicy::Reject => AxisType::Unknown,
                }
            };
        }
    }

    let mut order_text = order.as_str().to_string();
    order_text.extend(axis_types.iter().filter_map(|axis| axis.letter()));
    let adjusted_order = DimensionOrder::sanitize(&order_text);

    let unreachable = unreachable_blocks(pattern, &axis_types);
    if !unreachable.is_empty() {
        warn!(
            "Series blocks {:?} of {} are not stitched; only their first value is read \
             (enable split_series or rename the files)",
            unreachable,
            pattern.pattern()
        );
    }

    debug!(
        "Guessed axes [{}] for {}, order {} (certain: {})",
        axis_types.iter().map(|a| a.name()).collect::<Vec<_>>().join(", "),
        pattern.pattern(),
        adjusted_order,
        certain
    );

    AxisAssignment {
        axis_types,
        adjusted_order,
        certain,
        size_z,
        size_c,
        size_t,
        swapped_zt,
    }
}
