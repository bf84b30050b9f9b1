//! Multi-file series stitcher
//!
//! [`FileStitcher`] presents a family of files as one dataset. It resolves
//! a seed (a file, a `.fake` name or a pattern) into one or more file
//! families, opens the first file of each to learn the per-file extents,
//! guesses which axis every numbered block of the file names varies, and
//! then serves planes by translating stitched plane indices into a file
//! and a plane inside it. Files are opened lazily.
//!
//! Planes whose file has disappeared since initialization, or whose
//! coordinate lies outside what that file holds, are returned zero-filled.
//!
//! When grouping is disabled, the seed is a lone file, or its format
//! already spans several files, the stitcher passes reads straight through
//! to a single reader.

use std::collections::HashSet;

use log::{debug, info, warn};

use crate::config::StitchConfig;
use crate::formats::core::{CoreMetadata, DimensionOrder, Region};
use crate::formats::fake_reader;
use crate::formats::reader::FormatReader;
use crate::formats::registry::ReaderRegistry;
use crate::formats::swapper::DimensionSwapper;
use crate::stitch::axis::AxisType;
use crate::stitch::errors::{StitchError, StitchResult};
use crate::stitch::external::ExternalSeries;
use crate::stitch::indexing::{self, AxisLengths, PlaneLocation};
use crate::stitch::pattern::{self, FilePattern};

/// One logical series of a stitched dataset
struct StitchedSeries {
    /// Index of the file family
    external: usize,
    /// Series inside each file of the family
    internal: usize,
    core: CoreMetadata,
    lengths: AxisLengths,
    /// Metadata of the family's first file, order applied
    intrinsic: CoreMetadata,
}

enum StitchState {
    PassThrough {
        reader: DimensionSwapper,
        pattern: FilePattern,
    },
    Stitched {
        externals: Vec<ExternalSeries>,
        series: Vec<StitchedSeries>,
    },
}

pub struct FileStitcher {
    registry: ReaderRegistry,
    config: StitchConfig,
    state: Option<StitchState>,
}

/// Builds the metadata of a stitched series from its first file
fn stitched_core(external: &ExternalSeries, intrinsic: &CoreMetadata) -> StitchResult<(CoreMetadata, AxisLengths)> {
    let assignment = external.assignment();
    let lengths = AxisLengths::compute(
        &assignment.axis_types,
        &external.pattern().count(),
        [intrinsic.size_z, intrinsic.size_c, intrinsic.size_t],
    )?;

    let mut core = CoreMetadata {
        size_z: lengths.size_z(),
        size_c: lengths.size_c(),
        size_t: lengths.size_t(),
        dimension_order: assignment.adjusted_order.clone(),
        order_certain: assignment.certain,
        ..intrinsic.clone()
    };
    core.image_count = core.size_z * core.size_t * core.effective_size_c();
    Ok((core, lengths))
}

/// Checks a plane request against a series
fn check_request(core: &CoreMetadata, no: usize, region: &Region) -> StitchResult<()> {
    if no >= core.image_count {
        return Err(StitchError::PlaneOutOfRange { plane: no, count: core.image_count });
    }
    if !region.fits(core.size_x, core.size_y) {
        return Err(StitchError::RegionOutOfBounds {
            region: region.to_string(),
            size_x: core.size_x,
            size_y: core.size_y,
        });
    }
    Ok(())
}

impl FileStitcher {
    pub fn new(registry: ReaderRegistry, config: StitchConfig) -> Self {
        FileStitcher {
            registry,
            config,
            state: None,
        }
    }

    pub fn config(&self) -> &StitchConfig {
        &self.config
    }

    pub fn registry(&self) -> &ReaderRegistry {
        &self.registry
    }

    /// Whether reads go straight to a single reader
    pub fn is_pass_through(&self) -> bool {
        matches!(self.state, Some(StitchState::PassThrough { .. }))
    }

    /// Opens a dataset
    ///
    /// # Arguments
    /// * `seed` - A file of the family, a `.fake` name, or a pattern such as `img_z<1-3>.tif`
    ///
    /// # Returns
    /// `NoMatchingFiles` when nothing matches the seed, `FileNotFound` when
    /// part of a family is missing, `UnsupportedGrouping` when several
    /// families of multi-series files are found, `InvalidPattern` or
    /// `UnknownAxis` when the file names cannot be interpreted
    pub fn initialize(&mut self, seed: &str) -> StitchResult<()> {
        self.close();
        info!("Initializing stitcher for {}", seed);

        let fs = self.registry.file_system().clone();
        let seed_pattern = if fs.exists(seed) || fake_reader::is_fake(seed) {
            None
        } else if FilePattern::is_pattern_string(seed) {
            Some(FilePattern::parse(seed)?)
        } else {
            return Err(StitchError::NoMatchingFiles(seed.to_string()));
        };

        if !self.config.group_files {
            let path = match &seed_pattern {
                Some(pattern) => pattern
                    .files()
                    .into_iter()
                    .find(|f| fake_reader::is_fake(f) || fs.exists(f))
                    .ok_or_else(|| StitchError::NoMatchingFiles(seed.to_string()))?,
                None => seed.to_string(),
            };
            let (_, reader) = self.registry.open(&path)?;
            self.state = Some(StitchState::PassThrough { reader, pattern: FilePattern::parse(&path)? });
            return Ok(());
        }

        let patterns = match seed_pattern {
            Some(pattern) => vec![pattern],
            None => pattern::find_series_patterns(seed, fs.as_ref(), self.config.split_series)?,
        };

        for pattern in &patterns {
            let files = pattern.files();
            let checked: Vec<(usize, &String)> =
                files.iter().enumerate().filter(|(_, f)| !fake_reader::is_fake(f)).collect();
            let missing: Vec<&(usize, &String)> = checked.iter().filter(|(_, f)| !fs.exists(f)).collect();
            if !checked.is_empty() && missing.len() == checked.len() {
                return Err(StitchError::NoMatchingFiles(pattern.to_string()));
            }
            if let Some((index, path)) = missing.first() {
                return Err(StitchError::FileNotFound { index: *index, path: path.to_string() });
            }
        }

        let first_file = patterns[0].files().remove(0);
        let (kind, first) = self.registry.open(&first_file)?;
        let internal_series = first.series_count();
        if internal_series > 1 && patterns.len() > 1 {
            return Err(StitchError::UnsupportedGrouping {
                files: patterns.iter().map(|p| p.total()).sum(),
                series: internal_series,
            });
        }
        if first.used_files().len() > 1 {
            debug!("{} format groups its own files; passing reads through", first.format_name());
            self.state = Some(StitchState::PassThrough { reader: first, pattern: patterns[0].clone() });
            return Ok(());
        }
        if patterns.len() == 1 && patterns[0].total() == 1 {
            debug!("Single file {}; passing reads through", first_file);
            self.state = Some(StitchState::PassThrough { reader: first, pattern: patterns[0].clone() });
            return Ok(());
        }

        let family_count = patterns.len();
        let mut externals = Vec::with_capacity(family_count);
        let mut first = Some((kind, first));
        for pattern in patterns {
            let (kind, reader) = match first.take() {
                Some(opened) => opened,
                None => self.registry.open(&pattern.files()[0])?,
            };
            externals.push(ExternalSeries::new(
                pattern,
                kind,
                reader,
                self.config.max_open_files,
                self.config.unresolved_axis,
            )?);
        }

        let layout: Vec<(usize, usize)> = if family_count == 1 {
            (0..internal_series).map(|s| (0, s)).collect()
        } else {
            (0..family_count).map(|e| (e, 0)).collect()
        };
        let mut series = Vec::with_capacity(layout.len());
        for (external, internal) in layout {
            let intrinsic = externals[external].first_core(internal)?;
            let (core, lengths) = stitched_core(&externals[external], &intrinsic)?;
            info!(
                "Series {}: {} files, {}x{} Z={} C={} T={} order {} ({} planes)",
                series.len(),
                externals[external].files().len(),
                core.size_x,
                core.size_y,
                core.size_z,
                core.size_c,
                core.size_t,
                core.dimension_order,
                core.image_count
            );
            series.push(StitchedSeries { external, internal, core, lengths, intrinsic });
        }

        self.state = Some(StitchState::Stitched { externals, series });
        Ok(())
    }

    /// Releases every reader; safe to call repeatedly
    pub fn close(&mut self) {
        match self.state.take() {
            Some(StitchState::PassThrough { mut reader, .. }) => reader.close(),
            Some(StitchState::Stitched { mut externals, .. }) => {
                for external in externals.iter_mut() {
                    external.close();
                }
            }
            None => {}
        }
    }

    fn state(&self) -> StitchResult<&StitchState> {
        self.state.as_ref().ok_or(StitchError::NotInitialized)
    }

    fn stitched_series(series: &[StitchedSeries], index: usize) -> StitchResult<&StitchedSeries> {
        series.get(index).ok_or(StitchError::SeriesOutOfRange { series: index, count: series.len() })
    }

    /// Number of series; 0 when nothing is open
    pub fn series_count(&self) -> usize {
        match &self.state {
            Some(StitchState::PassThrough { reader, .. }) => reader.series_count(),
            Some(StitchState::Stitched { series, .. }) => series.len(),
            None => 0,
        }
    }

    /// Metadata of one series
    pub fn core(&self, series: usize) -> StitchResult<&CoreMetadata> {
        match self.state()? {
            StitchState::PassThrough { reader, .. } => {
                let count = reader.series_count();
                reader
                    .core(series)
                    .map_err(|_| StitchError::SeriesOutOfRange { series, count })
            }
            StitchState::Stitched { series: list, .. } => Ok(&Self::stitched_series(list, series)?.core),
        }
    }

    pub fn size_x(&self, series: usize) -> StitchResult<usize> {
        Ok(self.core(series)?.size_x)
    }

    pub fn size_y(&self, series: usize) -> StitchResult<usize> {
        Ok(self.core(series)?.size_y)
    }

    pub fn size_z(&self, series: usize) -> StitchResult<usize> {
        Ok(self.core(series)?.size_z)
    }

    pub fn size_c(&self, series: usize) -> StitchResult<usize> {
        Ok(self.core(series)?.size_c)
    }

    pub fn size_t(&self, series: usize) -> StitchResult<usize> {
        Ok(self.core(series)?.size_t)
    }

    pub fn image_count(&self, series: usize) -> StitchResult<usize> {
        Ok(self.core(series)?.image_count)
    }

    pub fn dimension_order(&self, series: usize) -> StitchResult<&DimensionOrder> {
        Ok(&self.core(series)?.dimension_order)
    }

    /// Reads a region of one plane
    ///
    /// A plane whose file no longer exists, or whose coordinate lies
    /// outside the file's own extents, comes back zero-filled.
    pub fn open_bytes(&mut self, series: usize, no: usize, region: &Region) -> StitchResult<Vec<u8>> {
        let registry = &self.registry;
        let state = self.state.as_mut().ok_or(StitchError::NotInitialized)?;
        match state {
            StitchState::PassThrough { reader, .. } => {
                let count = reader.series_count();
                let core = reader
                    .core(series)
                    .map_err(|_| StitchError::SeriesOutOfRange { series, count })?;
                check_request(core, no, region)?;
                Ok(reader.open_bytes(series, no, region)?)
            }
            StitchState::Stitched { externals, series: list } => {
                let stitched = Self::stitched_series(list, series)?;
                check_request(&stitched.core, no, region)?;
                let external = &mut externals[stitched.external];
                let location = indexing::translate(
                    &stitched.lengths,
                    external.axis_types(),
                    &external.pattern().count(),
                    &stitched.core,
                    &stitched.intrinsic,
                    no,
                )?;
                let blank = || vec![0u8; stitched.core.region_bytes(region)];

                let path = external.files()[location.file_index].clone();
                if !fake_reader::is_fake(&path) && !registry.file_system().exists(&path) {
                    warn!("missing file {} (series {}, plane {}); returning a blank plane", path, series, no);
                    external.close_reader(location.file_index);
                    return Ok(blank());
                }

                let internal = stitched.internal;
                let reader = external.reader(registry, location.file_index)?;
                let file_core = reader.core(internal)?;
                let [z, c, t] = location.file_zct;
                if z >= file_core.size_z || c >= file_core.effective_size_c() || t >= file_core.size_t {
                    debug!("Plane {} lies outside {} ({:?}); returning a blank plane", no, path, location.file_zct);
                    return Ok(blank());
                }
                let file_plane = reader.plane_index(internal, z, c, t)?;
                if file_plane >= file_core.image_count {
                    debug!("Plane {} maps past the end of {}; returning a blank plane", no, path);
                    return Ok(blank());
                }
                Ok(reader.open_bytes(internal, file_plane, region)?)
            }
        }
    }

    /// Reads one full plane
    pub fn open_plane(&mut self, series: usize, no: usize) -> StitchResult<Vec<u8>> {
        let region = Region::full(self.core(series)?);
        self.open_bytes(series, no, &region)
    }

    /// Every file of the dataset, without duplicates, in family order
    pub fn used_files(&self) -> StitchResult<Vec<String>> {
        match self.state()? {
            StitchState::PassThrough { reader, .. } => Ok(reader.used_files()),
            StitchState::Stitched { externals, .. } => {
                let mut seen = HashSet::new();
                Ok(externals
                    .iter()
                    .flat_map(|e| e.files().iter())
                    .filter(|f| seen.insert(f.as_str()))
                    .cloned()
                    .collect())
            }
        }
    }

    /// Files backing one series, in pattern order
    pub fn series_used_files(&self, series: usize) -> StitchResult<Vec<String>> {
        match self.state()? {
            StitchState::PassThrough { reader, .. } => {
                self.core(series)?;
                Ok(reader.used_files())
            }
            StitchState::Stitched { externals, series: list } => {
                Ok(externals[Self::stitched_series(list, series)?.external].files().to_vec())
            }
        }
    }

    /// Pattern of the family behind a series
    pub fn file_pattern(&self, series: usize) -> StitchResult<&FilePattern> {
        match self.state()? {
            StitchState::PassThrough { pattern, .. } => {
                self.core(series)?;
                Ok(pattern)
            }
            StitchState::Stitched { externals, series: list } => {
                Ok(externals[Self::stitched_series(list, series)?.external].pattern())
            }
        }
    }

    /// Number of files in the family behind a series
    pub fn file_count(&self, series: usize) -> StitchResult<usize> {
        match self.state()? {
            StitchState::PassThrough { .. } => {
                self.core(series)?;
                Ok(1)
            }
            StitchState::Stitched { externals, series: list } => {
                Ok(externals[Self::stitched_series(list, series)?.external].files().len())
            }
        }
    }

    /// Axis of each numbered block of a series' pattern
    pub fn axis_types(&self, series: usize) -> StitchResult<&[AxisType]> {
        match self.state()? {
            StitchState::PassThrough { .. } => {
                self.core(series)?;
                Ok(&[])
            }
            StitchState::Stitched { externals, series: list } => {
                Ok(externals[Self::stitched_series(list, series)?.external].axis_types())
            }
        }
    }

    /// Overrides the guessed block axes of a series
    ///
    /// The axes apply to the whole file family, so every series built from
    /// it is recomputed.
    pub fn set_axis_types(&mut self, series: usize, axes: &[AxisType]) -> StitchResult<()> {
        let state = self.state.as_mut().ok_or(StitchError::NotInitialized)?;
        match state {
            StitchState::PassThrough { .. } => {
                if axes.is_empty() {
                    Ok(())
                } else {
                    Err(StitchError::AxisCountMismatch { expected: 0, actual: axes.len() })
                }
            }
            StitchState::Stitched { externals, series: list } => {
                let family = Self::stitched_series(list, series)?.external;
                let expected = externals[family].pattern().blocks().len();
                if axes.len() != expected {
                    return Err(StitchError::AxisCountMismatch { expected, actual: axes.len() });
                }

                let previous = externals[family].axis_types().to_vec();
                externals[family].set_axis_types(axes);
                let mut rebuilt = Vec::new();
                for (index, stitched) in list.iter().enumerate().filter(|(_, s)| s.external == family) {
                    match stitched_core(&externals[family], &stitched.intrinsic) {
                        Ok(result) => rebuilt.push((index, result)),
                        Err(e) => {
                            externals[family].set_axis_types(&previous);
                            return Err(e);
                        }
                    }
                }
                for (index, (core, lengths)) in rebuilt {
                    list[index].core = core;
                    list[index].lengths = lengths;
                }
                Ok(())
            }
        }
    }

    /// Decodes a stitched plane index into (z, c, t)
    pub fn zct_coords(&self, series: usize, no: usize) -> StitchResult<[usize; 3]> {
        let core = self.core(series)?;
        if no >= core.image_count {
            return Err(StitchError::PlaneOutOfRange { plane: no, count: core.image_count });
        }
        Ok(core.zct_coords(no))
    }

    /// Encodes (z, c, t) into a stitched plane index
    pub fn index(&self, series: usize, z: usize, c: usize, t: usize) -> StitchResult<usize> {
        Ok(self.core(series)?.plane_index(z, c, t))
    }

    /// File and intra-file plane holding a stitched plane
    pub fn to_file_and_plane(&self, series: usize, no: usize) -> StitchResult<PlaneLocation> {
        let zct = self.zct_coords(series, no)?;
        match self.state()? {
            StitchState::PassThrough { .. } => Ok(PlaneLocation {
                file_index: 0,
                plane_index: no,
                zct,
                file_zct: zct,
            }),
            StitchState::Stitched { externals, series: list } => {
                let stitched = Self::stitched_series(list, series)?;
                let external = &externals[stitched.external];
                indexing::translate(
                    &stitched.lengths,
                    external.axis_types(),
                    &external.pattern().count(),
                    &stitched.core,
                    &stitched.intrinsic,
                    no,
                )
            }
        }
    }

    /// Number of file readers currently open
    pub fn open_file_count(&self) -> usize {
        match &self.state {
            Some(StitchState::PassThrough { reader, .. }) => usize::from(reader.current_file().is_some()),
            Some(StitchState::Stitched { externals, .. }) => externals.iter().map(|e| e.open_count()).sum(),
            None => 0,
        }
    }
}

impl Drop for FileStitcher {
    fn drop(&mut self) {
        self.close();
    }
}
