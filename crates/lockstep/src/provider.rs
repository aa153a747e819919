//! Difference tree provider
//!
//! Builds a [`DiffModel`] from two texts with imara-diff, grouping nearby
//! changes into hunks with a few unchanged context lines, the way an
//! external parser would hand the viewer a finished tree. The viewer core
//! never looks at raw file content.

use imara_diff::intern::InternedInput;
use imara_diff::{diff, Algorithm, Sink};
use lockstep_core::{DiffModel, Difference, DifferenceType, Hunk, Line, ModelError};
use std::ops::Range;

/// A single contiguous change: `old` lines replaced by `new` lines.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ChangeOp {
    old: Range<usize>,
    new: Range<usize>,
}

#[derive(Default)]
struct ChangeCollector {
    ops: Vec<ChangeOp>,
}

impl Sink for ChangeCollector {
    type Out = Vec<ChangeOp>;

    fn process_change(&mut self, before: Range<u32>, after: Range<u32>) {
        self.ops.push(ChangeOp {
            old: before.start as usize..before.end as usize,
            new: after.start as usize..after.end as usize,
        });
    }

    fn finish(self) -> Self::Out {
        self.ops
    }
}

pub struct TreeProvider {
    context_lines: usize,
}

impl TreeProvider {
    pub fn new() -> Self {
        Self { context_lines: 3 }
    }

    pub fn with_context(mut self, context_lines: usize) -> Self {
        self.context_lines = context_lines;
        self
    }

    /// Diff two texts and assemble the hunk/difference tree.
    pub fn build(&self, old: &str, new: &str) -> Result<DiffModel, ModelError> {
        let input = InternedInput::new(old, new);
        let ops = diff(Algorithm::Histogram, &input, ChangeCollector::default());

        let old_lines: Vec<&str> = old.lines().collect();
        let new_lines: Vec<&str> = new.lines().collect();

        let mut hunks = Vec::new();
        let mut i = 0;
        while i < ops.len() {
            let group_start = i;
            // changes separated by at most two context windows share a hunk
            while i + 1 < ops.len()
                && ops[i + 1].old.start - ops[i].old.end <= 2 * self.context_lines
            {
                i += 1;
            }
            hunks.push(self.build_hunk(&ops[group_start..=i], &old_lines, &new_lines));
            i += 1;
        }

        DiffModel::new(hunks)
    }

    fn build_hunk(&self, group: &[ChangeOp], old_lines: &[&str], new_lines: &[&str]) -> Hunk {
        let first = &group[0];
        let lead = self.context_lines.min(first.old.start);
        let mut old_pos = first.old.start - lead;
        let mut new_pos = first.new.start - lead;

        let mut differences = Vec::new();
        for op in group {
            if op.old.start > old_pos {
                differences.push(unchanged_difference(
                    &old_lines[old_pos..op.old.start],
                    old_pos,
                    new_pos,
                ));
                new_pos += op.old.start - old_pos;
                old_pos = op.old.start;
            }
            differences.push(change_difference(op, old_lines, new_lines));
            old_pos = op.old.end;
            new_pos = op.new.end;
        }

        let trail = self
            .context_lines
            .min(old_lines.len() - old_pos)
            .min(new_lines.len() - new_pos);
        if trail > 0 {
            differences.push(unchanged_difference(
                &old_lines[old_pos..old_pos + trail],
                old_pos,
                new_pos,
            ));
        }

        let hunk_top = first.old.start - lead;
        match enclosing_function(old_lines, hunk_top) {
            Some(function) => Hunk::with_function(differences, function),
            None => Hunk::new(differences),
        }
    }
}

impl Default for TreeProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn unchanged_difference(lines: &[&str], old_pos: usize, new_pos: usize) -> Difference {
    Difference::new(
        DifferenceType::Unchanged,
        lines.iter().copied().map(Line::new).collect(),
        lines.iter().copied().map(Line::new).collect(),
        old_pos + 1,
        new_pos + 1,
    )
}

fn change_difference(op: &ChangeOp, old_lines: &[&str], new_lines: &[&str]) -> Difference {
    let kind = if op.old.is_empty() {
        DifferenceType::Inserted
    } else if op.new.is_empty() {
        DifferenceType::Deleted
    } else {
        DifferenceType::Changed
    };

    let mut source: Vec<Line> = old_lines[op.old.clone()].iter().copied().map(Line::new).collect();
    let mut destination: Vec<Line> = new_lines[op.new.clone()].iter().copied().map(Line::new).collect();

    // Intra-line markers only make sense for pairwise-replaced lines.
    if kind == DifferenceType::Changed && source.len() == destination.len() {
        for (src, dst) in source.iter_mut().zip(destination.iter_mut()) {
            let (src_range, dst_range) = changed_ranges(&src.text, &dst.text);
            if let Some(range) = src_range {
                src.changed.push(range);
            }
            if let Some(range) = dst_range {
                dst.changed.push(range);
            }
        }
    }

    Difference::new(kind, source, destination, op.old.start + 1, op.new.start + 1)
}

/// The changed sub-range of each side after trimming the common prefix and
/// suffix on char boundaries.
fn changed_ranges(old: &str, new: &str) -> (Option<Range<usize>>, Option<Range<usize>>) {
    if old == new {
        return (None, None);
    }

    let prefix = old
        .char_indices()
        .zip(new.char_indices())
        .take_while(|((_, a), (_, b))| a == b)
        .count();
    let prefix_bytes: usize = old.chars().take(prefix).map(char::len_utf8).sum();

    let old_rest = &old[prefix_bytes..];
    let new_rest = &new[prefix_bytes..];
    let suffix = old_rest
        .chars()
        .rev()
        .zip(new_rest.chars().rev())
        .take_while(|(a, b)| a == b)
        .count();
    let old_suffix_bytes: usize = old_rest.chars().rev().take(suffix).map(char::len_utf8).sum();
    let new_suffix_bytes: usize = new_rest.chars().rev().take(suffix).map(char::len_utf8).sum();

    let old_range = prefix_bytes..old.len() - old_suffix_bytes;
    let new_range = prefix_bytes..new.len() - new_suffix_bytes;
    (
        (!old_range.is_empty()).then_some(old_range),
        (!new_range.is_empty()).then_some(new_range),
    )
}

/// Nearest preceding line that starts at column zero with an identifier
/// character, used as the hunk's display label (diff -p convention).
fn enclosing_function(old_lines: &[&str], hunk_top: usize) -> Option<String> {
    old_lines[..hunk_top]
        .iter()
        .rev()
        .find(|line| {
            line.chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        })
        .map(|line| line.trim_end().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockstep_core::DiffKey;

    #[test]
    fn test_identical_inputs_produce_empty_tree() {
        let model = TreeProvider::new().build("a\nb\n", "a\nb\n").unwrap();
        assert!(model.hunks.is_empty());
    }

    #[test]
    fn test_single_change_gets_context() {
        let old = "1\n2\n3\n4\n5\n6\n7\n8\n9\n";
        let new = "1\n2\n3\n4\nFIVE\n6\n7\n8\n9\n";
        let model = TreeProvider::new().build(old, new).unwrap();

        assert_eq!(model.hunks.len(), 1);
        let hunk = &model.hunks[0];
        assert_eq!(hunk.differences.len(), 3);
        assert_eq!(hunk.differences[0].kind, DifferenceType::Unchanged);
        assert_eq!(hunk.differences[0].source_line_count(), 3);
        assert_eq!(hunk.differences[0].source_line_no, 2);
        assert_eq!(hunk.differences[1].kind, DifferenceType::Changed);
        assert_eq!(hunk.differences[1].source_line_no, 5);
        assert_eq!(hunk.differences[2].kind, DifferenceType::Unchanged);
        assert_eq!(hunk.differences[2].source_line_count(), 3);
    }

    #[test]
    fn test_far_changes_split_into_hunks() {
        let old_lines: Vec<String> = (1..=40).map(|i| i.to_string()).collect();
        let mut new_lines = old_lines.clone();
        new_lines[4] = "five".to_string();
        new_lines[34] = "thirty-five".to_string();
        let old = old_lines.join("\n");
        let new = new_lines.join("\n");

        let model = TreeProvider::new().build(&old, &new).unwrap();
        assert_eq!(model.hunks.len(), 2);
        assert_eq!(model.change_keys().len(), 2);
    }

    #[test]
    fn test_near_changes_share_a_hunk() {
        let old = "a\nb\nc\nd\ne\nf\ng\nh\n";
        let new = "a\nB\nc\nd\ne\nF\ng\nh\n";
        let model = TreeProvider::new().build(old, new).unwrap();

        assert_eq!(model.hunks.len(), 1);
        let kinds: Vec<DifferenceType> = model.hunks[0]
            .differences
            .iter()
            .map(|d| d.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                DifferenceType::Unchanged,
                DifferenceType::Changed,
                DifferenceType::Unchanged,
                DifferenceType::Changed,
                DifferenceType::Unchanged,
            ]
        );
    }

    #[test]
    fn test_pure_insertion_has_empty_source() {
        let old = "a\nb\n";
        let new = "a\nx\nb\n";
        let model = TreeProvider::new().build(old, new).unwrap();

        let key = model.change_keys()[0];
        let diff = model.difference(key).unwrap();
        assert_eq!(diff.kind, DifferenceType::Inserted);
        assert_eq!(diff.source_line_count(), 0);
        assert_eq!(diff.destination_line_count(), 1);
        assert_eq!(diff.destination[0].text, "x");
    }

    #[test]
    fn test_intra_line_ranges_trim_common_affixes() {
        let (old_range, new_range) = changed_ranges("let count = 1;", "let count = 2;");
        assert_eq!(old_range, Some(12..13));
        assert_eq!(new_range, Some(12..13));

        let (old_range, new_range) = changed_ranges("same", "same");
        assert_eq!(old_range, None);
        assert_eq!(new_range, None);

        // pure suffix growth: nothing changed on the old side
        let (old_range, new_range) = changed_ranges("abc", "abcd");
        assert_eq!(old_range, None);
        assert_eq!(new_range, Some(3..4));
    }

    #[test]
    fn test_changed_lines_carry_markers() {
        let old = "ctx\nlet x = 1;\nctx2\n";
        let new = "ctx\nlet x = 9;\nctx2\n";
        let model = TreeProvider::new().build(old, new).unwrap();

        let diff = model.difference(DiffKey { hunk: 0, diff: 1 }).unwrap();
        assert_eq!(diff.kind, DifferenceType::Changed);
        assert_eq!(diff.source[0].changed, vec![8..9]);
        assert_eq!(diff.destination[0].changed, vec![8..9]);
    }

    #[test]
    fn test_enclosing_function_label() {
        let old = "fn main() {\n    a();\n    b();\n    c();\n    d();\n    e();\n}\n";
        let new = "fn main() {\n    a();\n    b();\n    c();\n    d();\n    E();\n}\n";
        let model = TreeProvider::new().build(old, new).unwrap();

        assert_eq!(model.hunks[0].function.as_deref(), Some("fn main() {"));
    }
}
