//! One file family behind a stitched series
//!
//! An [`ExternalSeries`] owns the expanded file list of a pattern, the
//! guessed axes and one reader slot per file. Slots are opened on first
//! access and kept open; when more than `max_open_files` are open, the
//! least recently used one is closed. A reopened reader gets the same
//! dimension order applied again, so reads are identical either way.

use std::num::NonZeroUsize;

use log::{debug, trace};
use lru::LruCache;

use crate::formats::core::{CoreMetadata, DimensionOrder};
use crate::formats::reader::FormatReader;
use crate::formats::registry::{FormatKind, ReaderRegistry};
use crate::formats::swapper::DimensionSwapper;
use crate::stitch::axis::{guess_axes, AxisAssignment, AxisType, UnresolvedAxisPolicy};
use crate::stitch::errors::{StitchError, StitchResult};
use crate::stitch::pattern::FilePattern;

pub struct ExternalSeries {
    pattern: FilePattern,
    files: Vec<String>,
    assignment: AxisAssignment,
    kind: FormatKind,
    readers: Vec<Option<DimensionSwapper>>,
    open: LruCache<usize, ()>,
    /// Order applied to every reader when it is opened
    order: DimensionOrder,
}

impl ExternalSeries {
    /// Creates the family from its pattern and its opened first file
    ///
    /// # Arguments
    /// * `pattern` - Pattern of the family
    /// * `kind` - Reader kind detected for the first file
    /// * `first` - Reader opened on the first file of the pattern
    /// * `max_open_files` - Cap on simultaneously open readers, 0 for none
    /// * `policy` - Treatment of blocks the axis guesser cannot place
    pub fn new(
        pattern: FilePattern,
        kind: FormatKind,
        mut first: DimensionSwapper,
        max_open_files: usize,
        policy: UnresolvedAxisPolicy,
    ) -> StitchResult<Self> {
        let files = pattern.files();
        let raw = first.core(0)?.clone();
        let assignment = guess_axes(
            &pattern,
            &raw.dimension_order,
            raw.size_z,
            raw.size_t,
            raw.effective_size_c(),
            raw.order_certain,
            policy,
        );
        let order = assignment.adjusted_order.clone();

        let mut open = match NonZeroUsize::new(max_open_files) {
            Some(cap) => LruCache::new(cap),
            None => LruCache::unbounded(),
        };
        Self::configure(&mut first, &order, files.len())?;
        open.put(0, ());

        let mut readers: Vec<Option<DimensionSwapper>> = (0..files.len()).map(|_| None).collect();
        readers[0] = Some(first);

        Ok(ExternalSeries {
            pattern,
            files,
            assignment,
            kind,
            readers,
            open,
            order,
        })
    }

    /// Applies the family's order to every series of a freshly opened reader
    fn configure(reader: &mut DimensionSwapper, order: &DimensionOrder, file_count: usize) -> StitchResult<()> {
        for series in 0..reader.series_count() {
            let core = reader.core(series)?;
            let keeps_channel = core.rgb_channel_count == 1 || order.position('C') == core.dimension_order.position('C');
            if (file_count > 1 || !core.order_certain) && keeps_channel {
                reader.swap_dimensions(series, order)?;
            }
            reader.set_output_order(series, order)?;
        }
        Ok(())
    }

    pub fn pattern(&self) -> &FilePattern {
        &self.pattern
    }

    /// Files of the family, in pattern order
    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn assignment(&self) -> &AxisAssignment {
        &self.assignment
    }

    pub fn axis_types(&self) -> &[AxisType] {
        &self.assignment.axis_types
    }

    pub(crate) fn set_axis_types(&mut self, axes: &[AxisType]) {
        self.assignment.axis_types = axes.to_vec();
    }

    pub fn kind(&self) -> FormatKind {
        self.kind
    }

    pub fn order(&self) -> &DimensionOrder {
        &self.order
    }

    /// Metadata of one series of the first file, with the order applied
    pub fn first_core(&self, series: usize) -> StitchResult<CoreMetadata> {
        match &self.readers[0] {
            Some(reader) => Ok(reader.core(series)?.clone()),
            None => Err(StitchError::NotInitialized),
        }
    }

    /// Returns the reader of a file, opening it if needed
    pub fn reader(&mut self, registry: &ReaderRegistry, index: usize) -> StitchResult<&mut DimensionSwapper> {
        let path = self
            .files
            .get(index)
            .cloned()
            .ok_or_else(|| StitchError::FileNotFound { index, path: self.pattern.to_string() })?;

        if self.readers[index].is_none() {
            debug!("Opening file #{} of {}: {}", index, self.pattern, path);
            let mut reader = registry.create(self.kind);
            reader.set_id(&path)?;
            Self::configure(&mut reader, &self.order, self.files.len())?;
            self.readers[index] = Some(reader);
        }

        if let Some((evicted, _)) = self.open.push(index, ()) {
            if evicted != index {
                trace!("Evicting reader #{} of {}", evicted, self.pattern);
                self.close_reader(evicted);
            }
        }

        self.readers[index].as_mut().ok_or(StitchError::NotInitialized)
    }

    /// Closes the reader of one file, if open
    pub fn close_reader(&mut self, index: usize) {
        if let Some(mut reader) = self.readers.get_mut(index).and_then(Option::take) {
            reader.close();
        }
        self.open.pop(&index);
    }

    /// Closes every reader
    pub fn close(&mut self) {
        for slot in self.readers.iter_mut() {
            if let Some(mut reader) = slot.take() {
                reader.close();
            }
        }
        self.open.clear();
    }

    /// Number of readers currently open
    pub fn open_count(&self) -> usize {
        self.readers.iter().filter(|slot| slot.is_some()).count()
    }
}
