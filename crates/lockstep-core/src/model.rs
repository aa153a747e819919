//! The difference tree: hunks, differences and lines for one file pair
//!
//! The tree is produced by an external provider and treated as append-only
//! while displayed; the only mutation the viewer performs is flipping the
//! `applied` flag of a difference through [`crate::apply::ApplyTracker`].

use serde::{Deserialize, Serialize};
use std::ops::Range;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    /// A difference with no lines on either side would get a zero-height
    /// span and break the monotonic scroll id invariant, so the tree is
    /// rejected up front.
    #[error("hunk {hunk}, difference {index}: no lines on either side")]
    EmptyDifference { hunk: usize, index: usize },
}

/// Kind of a single change unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DifferenceType {
    Unchanged,
    Inserted,
    Deleted,
    Changed,
}

/// One line of text plus the sub-ranges that differ from its paired line
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    pub text: String,
    /// Byte ranges within `text` covering intra-line changes
    pub changed: Vec<Range<usize>>,
}

impl Line {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            changed: Vec::new(),
        }
    }

    pub fn with_changes(text: impl Into<String>, changed: Vec<Range<usize>>) -> Self {
        Self {
            text: text.into(),
            changed,
        }
    }
}

/// A single change unit with parallel source and destination line sequences
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Difference {
    pub kind: DifferenceType,
    pub source: Vec<Line>,
    pub destination: Vec<Line>,
    /// 1-based starting line number in the source file
    pub source_line_no: usize,
    /// 1-based starting line number in the destination file
    pub destination_line_no: usize,
    /// True when the destination pane should show this difference's
    /// source content (the change is taken back)
    pub applied: bool,
}

impl Difference {
    pub fn new(
        kind: DifferenceType,
        source: Vec<Line>,
        destination: Vec<Line>,
        source_line_no: usize,
        destination_line_no: usize,
    ) -> Self {
        Self {
            kind,
            source,
            destination,
            source_line_no,
            destination_line_no,
            applied: false,
        }
    }

    pub fn source_line_count(&self) -> usize {
        self.source.len()
    }

    pub fn destination_line_count(&self) -> usize {
        self.destination.len()
    }

    /// The larger of the two sides, which drives the virtual extent
    pub fn line_count(&self) -> usize {
        self.source.len().max(self.destination.len())
    }
}

/// A contiguous block of differences, optionally labeled with the
/// enclosing function
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Hunk {
    pub differences: Vec<Difference>,
    pub function: Option<String>,
}

impl Hunk {
    pub fn new(differences: Vec<Difference>) -> Self {
        Self {
            differences,
            function: None,
        }
    }

    pub fn with_function(differences: Vec<Difference>, function: impl Into<String>) -> Self {
        Self {
            differences,
            function: Some(function.into()),
        }
    }
}

/// Index handle addressing one difference within the tree.
///
/// Items and views hold these instead of references so the model stays
/// solely owned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiffKey {
    pub hunk: usize,
    pub diff: usize,
}

/// Aggregate counts for the status line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiffStats {
    pub hunks: usize,
    pub differences: usize,
    pub applied: usize,
}

/// Ordered hunks for one file pair
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiffModel {
    pub hunks: Vec<Hunk>,
}

impl DiffModel {
    /// Build a model, rejecting trees that violate the line-count invariant.
    pub fn new(hunks: Vec<Hunk>) -> Result<Self, ModelError> {
        let model = Self { hunks };
        model.validate()?;
        Ok(model)
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        for (h, hunk) in self.hunks.iter().enumerate() {
            for (d, diff) in hunk.differences.iter().enumerate() {
                if diff.source.is_empty() && diff.destination.is_empty() {
                    return Err(ModelError::EmptyDifference { hunk: h, index: d });
                }
            }
        }
        Ok(())
    }

    pub fn hunk(&self, index: usize) -> Option<&Hunk> {
        self.hunks.get(index)
    }

    pub fn difference(&self, key: DiffKey) -> Option<&Difference> {
        self.hunks.get(key.hunk)?.differences.get(key.diff)
    }

    pub fn difference_mut(&mut self, key: DiffKey) -> Option<&mut Difference> {
        self.hunks.get_mut(key.hunk)?.differences.get_mut(key.diff)
    }

    /// All differences in display order
    pub fn keys(&self) -> impl Iterator<Item = DiffKey> + '_ {
        self.hunks.iter().enumerate().flat_map(|(h, hunk)| {
            (0..hunk.differences.len()).map(move |d| DiffKey { hunk: h, diff: d })
        })
    }

    /// Non-Unchanged differences in display order; these are the selection
    /// and navigation targets.
    pub fn change_keys(&self) -> Vec<DiffKey> {
        self.keys()
            .filter(|&key| {
                self.difference(key)
                    .is_some_and(|d| d.kind != DifferenceType::Unchanged)
            })
            .collect()
    }

    pub fn difference_count(&self) -> usize {
        self.hunks.iter().map(|h| h.differences.len()).sum()
    }

    pub fn stats(&self) -> DiffStats {
        let mut stats = DiffStats {
            hunks: self.hunks.len(),
            ..DiffStats::default()
        };
        for hunk in &self.hunks {
            for diff in &hunk.differences {
                if diff.kind != DifferenceType::Unchanged {
                    stats.differences += 1;
                    if diff.applied {
                        stats.applied += 1;
                    }
                }
            }
        }
        stats
    }
}
