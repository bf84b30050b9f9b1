//! File patterns
//!
//! A pattern is a file name in which varying numbers are replaced by
//! blocks:
//!
//! * `<1-12>` counts from 1 to 12,
//! * `<01-12:2>` counts in steps of two with two-digit zero padding,
//! * `<3,7,15>` lists values that are not evenly spaced.
//!
//! Expanding a pattern yields one file per combination of block values,
//! with the first block outermost and the last block varying fastest. That
//! is the natural numeric order of the file family.
//!
//! Patterns are derived from one file name and a directory listing: every
//! sibling sharing the literal text of the sample contributes its numbers,
//! numbers that never change stay literal, and the rest become blocks.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use lazy_static::lazy_static;
use log::{debug, trace};
use regex::Regex;

use crate::formats::fake_reader;
use crate::io::location::{self, FileSystem};
use crate::stitch::axis::{prefix_axis, AxisType};
use crate::stitch::errors::{StitchError, StitchResult};

lazy_static! {
    static ref NUMBER_RUN: Regex = Regex::new(r"\d+").unwrap();
}

/// Arithmetic progression behind a range block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumericRange {
    pub start: u64,
    pub end: u64,
    pub step: u64,
    /// Zero-padding width, 0 for none
    pub width: usize,
}

/// One numeric block of a pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberBlock {
    text: String,
    elements: Vec<String>,
    range: Option<NumericRange>,
}

impl NumberBlock {
    /// Parses the content of a `<...>` block
    fn parse(pattern: &str, content: &str) -> StitchResult<Self> {
        let invalid = |reason: String| StitchError::invalid_pattern(pattern, reason);
        let text = format!("<{}>", content);

        if content.contains(',') {
            let elements: Vec<String> = content.split(',').map(|e| e.trim().to_string()).collect();
            if elements.iter().any(|e| e.is_empty()) {
                return Err(invalid(format!("empty element in block {}", text)));
            }
            return Ok(NumberBlock { text, elements, range: None });
        }

        let (bounds, step) = match content.split_once(':') {
            Some((bounds, step)) => (bounds, Some(step)),
            None => (content, None),
        };
        let (start_text, end_text) = bounds
            .split_once('-')
            .ok_or_else(|| invalid(format!("block {} is neither a range nor a list", text)))?;
        let number = |value: &str| -> StitchResult<u64> {
            let value = value.trim();
            if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid(format!("'{}' in block {} is not a number", value, text)));
            }
            value
                .parse::<u64>()
                .map_err(|_| invalid(format!("'{}' in block {} is too large", value, text)))
        };

        let start = number(start_text)?;
        let end = number(end_text)?;
        let step = match step {
            Some(step) => number(step)?,
            None => 1,
        };
        if start > end {
            return Err(invalid(format!("block {} counts down", text)));
        }
        if step == 0 {
            return Err(invalid(format!("block {} has a zero step", text)));
        }

        let start_text = start_text.trim();
        let width = if start_text.len() > 1 && start_text.starts_with('0') { start_text.len() } else { 0 };
        let elements = (start..=end)
            .step_by(step as usize)
            .map(|value| format!("{:0width$}", value, width = width))
            .collect();

        Ok(NumberBlock {
            text,
            elements,
            range: Some(NumericRange { start, end, step, width }),
        })
    }

    /// The block as written in the pattern, brackets included
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Values the block expands to, in order
    pub fn elements(&self) -> &[String] {
        &self.elements
    }

    /// Progression of a range block, `None` for lists
    pub fn range(&self) -> Option<NumericRange> {
        self.range
    }

    pub fn count(&self) -> usize {
        self.elements.len()
    }
}

/// A family of file names with numbered blocks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePattern {
    pattern: String,
    prefixes: Vec<String>,
    suffix: String,
    blocks: Vec<NumberBlock>,
}

impl FilePattern {
    /// Parses pattern text
    ///
    /// Text without any `<...>` block is a pattern of one file.
    pub fn parse(pattern: &str) -> StitchResult<Self> {
        let mut prefixes = Vec::new();
        let mut blocks = Vec::new();
        let mut rest = pattern;

        while let Some(open) = rest.find('<') {
            let after = &rest[open + 1..];
            let close = after
                .find('>')
                .ok_or_else(|| StitchError::invalid_pattern(pattern, "unterminated '<'"))?;
            let content = &after[..close];
            if content.contains('<') {
                return Err(StitchError::invalid_pattern(pattern, "nested '<'"));
            }
            prefixes.push(rest[..open].to_string());
            blocks.push(NumberBlock::parse(pattern, content)?);
            rest = &after[close + 1..];
        }

        Ok(FilePattern {
            pattern: pattern.to_string(),
            prefixes,
            suffix: rest.to_string(),
            blocks,
        })
    }

    /// Whether text contains block syntax
    pub fn is_pattern_string(text: &str) -> bool {
        match (text.find('<'), text.rfind('>')) {
            (Some(open), Some(close)) => open < close,
            _ => false,
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Literal text before each block; the first includes the directory
    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// Literal text after the last block
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn blocks(&self) -> &[NumberBlock] {
        &self.blocks
    }

    /// Element count of each block
    pub fn count(&self) -> Vec<usize> {
        self.blocks.iter().map(|b| b.count()).collect()
    }

    /// Number of files the pattern expands to
    pub fn total(&self) -> usize {
        self.blocks.iter().map(|b| b.count()).product()
    }

    /// Expands the pattern, last block varying fastest
    pub fn files(&self) -> Vec<String> {
        let mut names = vec![String::new()];
        for (prefix, block) in self.prefixes.iter().zip(&self.blocks) {
            names = names
                .iter()
                .flat_map(|name| block.elements.iter().map(move |element| format!("{}{}{}", name, prefix, element)))
                .collect();
        }
        names.into_iter().map(|name| name + &self.suffix).collect()
    }
}

impl fmt::Display for FilePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

/// A file name split at its digit runs
#[derive(Debug, Clone, PartialEq, Eq)]
struct Tokens {
    /// Literal runs; always one more than `numbers`
    literals: Vec<String>,
    numbers: Vec<String>,
}

fn tokenize(name: &str) -> Tokens {
    let mut literals = Vec::new();
    let mut numbers = Vec::new();
    let mut last = 0;
    for run in NUMBER_RUN.find_iter(name) {
        literals.push(name[last..run.start()].to_string());
        numbers.push(run.as_str().to_string());
        last = run.end();
    }
    literals.push(name[last..].to_string());
    Tokens { literals, numbers }
}

fn numeric_value(text: &str) -> Option<u64> {
    text.parse().ok()
}

/// Builds the block text for the distinct values of one digit run
fn block_for_values(pattern: &str, values: &BTreeSet<String>) -> StitchResult<String> {
    let mut numbers: Vec<(u64, &String)> = Vec::with_capacity(values.len());
    for value in values {
        let number = numeric_value(value)
            .ok_or_else(|| StitchError::invalid_pattern(pattern, format!("number '{}' is too large", value)))?;
        numbers.push((number, value));
    }
    numbers.sort();

    let padded: BTreeSet<usize> = values
        .iter()
        .filter(|v| v.len() > 1 && v.starts_with('0'))
        .map(|v| v.len())
        .collect();
    if padded.len() > 1 {
        return Err(StitchError::invalid_pattern(
            pattern,
            format!("mixed zero padding among {}", values.iter().cloned().collect::<Vec<_>>().join(", ")),
        ));
    }
    let width = padded.iter().next().copied().unwrap_or(0);
    if let Some((_, odd)) = numbers
        .iter()
        .find(|(number, text)| format!("{:0width$}", number, width = width) != **text)
    {
        return Err(StitchError::invalid_pattern(
            pattern,
            format!("'{}' does not follow the {}-digit zero padding", odd, width),
        ));
    }

    let (first, last) = (numbers[0].0, numbers[numbers.len() - 1].0);
    let step = numbers[1].0 - first;
    let evenly_spaced = numbers.windows(2).all(|pair| pair[1].0 - pair[0].0 == step);
    Ok(if evenly_spaced {
        let start = numbers[0].1;
        let end = format!("{:0width$}", last, width = width);
        if step == 1 {
            format!("<{}-{}>", start, end)
        } else {
            format!("<{}-{}:{}>", start, end, step)
        }
    } else {
        let list: Vec<&str> = numbers.iter().map(|(_, text)| text.as_str()).collect();
        format!("<{}>", list.join(","))
    })
}

/// Derives the pattern of the family a file belongs to
///
/// # Arguments
/// * `sample_path` - Path of one file of the family
/// * `siblings` - Names (without directory) of the files next to it
///
/// # Returns
/// A pattern whose expansion is exactly the family, or `InvalidPattern`
/// when the siblings do not form a complete grid of numbers
pub fn derive_pattern(sample_path: &str, siblings: &[String]) -> StitchResult<FilePattern> {
    let dir = location::parent_dir(sample_path);
    let name = location::file_name(sample_path);
    if name.contains('<') || name.contains('>') {
        return Err(StitchError::invalid_pattern(sample_path, "file name contains block brackets"));
    }
    let sample = tokenize(&name);

    let mut members: BTreeSet<String> = siblings
        .iter()
        .filter(|candidate| {
            let tokens = tokenize(candidate);
            tokens.literals == sample.literals
        })
        .cloned()
        .collect();
    members.insert(name.clone());
    trace!("{} has {} siblings sharing its literal text", sample_path, members.len());

    let mut values: Vec<BTreeSet<String>> = vec![BTreeSet::new(); sample.numbers.len()];
    for member in &members {
        for (set, number) in values.iter_mut().zip(tokenize(member).numbers) {
            set.insert(number);
        }
    }

    let mut text = String::new();
    for (i, literal) in sample.literals.iter().enumerate() {
        text.push_str(literal);
        if let Some(set) = values.get(i) {
            if set.len() == 1 {
                text.push_str(&sample.numbers[i]);
            } else {
                text.push_str(&block_for_values(sample_path, set)?);
            }
        }
    }
    let joined = location::join(&dir, &text);
    let pattern = FilePattern::parse(&joined)?;

    let expanded: Vec<String> = pattern.files().iter().map(|f| location::file_name(f)).collect();
    if let Some(missing) = expanded.iter().find(|f| !members.contains(*f)) {
        return Err(StitchError::invalid_pattern(
            &joined,
            format!("missing file {}", location::join(&dir, missing)),
        ));
    }
    let expanded: HashSet<&String> = expanded.iter().collect();
    if let Some(extra) = members.iter().find(|m| !expanded.contains(m)) {
        return Err(StitchError::invalid_pattern(&joined, format!("{} is not covered", extra)));
    }

    debug!("Derived pattern {} ({} files)", joined, pattern.total());
    Ok(pattern)
}

/// Lists the parent directory of a file
///
/// A `.fake` name needs no directory: when the listing fails it stands alone.
fn sibling_names(path: &str, fs: &dyn FileSystem) -> StitchResult<Vec<String>> {
    let dir = location::parent_dir(path);
    let name = location::file_name(path);
    let is_fake = fake_reader::is_fake(&name);
    let mut names = match fs.list_dir(&dir) {
        Ok(names) => names,
        Err(e) if is_fake => {
            debug!("Cannot list {} ({}); using {} alone", dir, e, name);
            Vec::new()
        }
        Err(e) => return Err(StitchError::Format(e.into())),
    };
    if is_fake && !names.contains(&name) {
        names.push(name);
    }
    Ok(names)
}

/// Derives the pattern of a file from its directory listing
pub fn find_pattern(path: &str, fs: &dyn FileSystem) -> StitchResult<FilePattern> {
    derive_pattern(path, &sibling_names(path, fs)?)
}

/// Derives one pattern per series of a file family
///
/// Digit runs preceded by a series prefix (`_s1`, `series2`) are not
/// stitched: siblings are grouped by their values there and a pattern is
/// derived for each group. Patterns come back ordered by series values.
/// Without `split_series`, or without series runs, this is [`find_pattern`].
pub fn find_series_patterns(path: &str, fs: &dyn FileSystem, split_series: bool) -> StitchResult<Vec<FilePattern>> {
    let names = sibling_names(path, fs)?;
    let name = location::file_name(path);
    let sample = tokenize(&name);

    let series_runs: Vec<usize> = if split_series {
        (0..sample.numbers.len())
            .filter(|&i| prefix_axis(&sample.literals[i]) == Some(AxisType::Series))
            .collect()
    } else {
        Vec::new()
    };
    if series_runs.is_empty() {
        return Ok(vec![derive_pattern(path, &names)?]);
    }

    let mut groups: BTreeMap<Vec<(u64, String)>, Vec<String>> = BTreeMap::new();
    for candidate in &names {
        let tokens = tokenize(candidate);
        if tokens.literals != sample.literals {
            continue;
        }
        let key = series_runs
            .iter()
            .map(|&i| {
                let text = tokens.numbers[i].clone();
                (numeric_value(&text).unwrap_or(u64::MAX), text)
            })
            .collect();
        groups.entry(key).or_default().push(candidate.clone());
    }

    let dir = location::parent_dir(path);
    let mut patterns = Vec::with_capacity(groups.len());
    for members in groups.values() {
        let sample_path = location::join(&dir, &members[0]);
        patterns.push(derive_pattern(&sample_path, members)?);
    }
    debug!("Split {} into {} series patterns", path, patterns.len());
    Ok(patterns)
}
