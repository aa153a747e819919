//! Virtual scroll coordinate index
//!
//! Every hunk header and difference gets a contiguous span in an abstract,
//! pane-independent coordinate space. A difference's span length is driven
//! by the *larger* of its two sides, so the index never changes when a
//! difference is applied or unapplied - only which side a pane shows does.
//! The index is therefore built once per tree load.

use crate::model::{DiffKey, DiffModel, Difference};
use rustc_hash::FxHashMap;

/// Unit heights used when assigning virtual and local extents.
///
/// Defaults are the pixel constants of a desktop line view; a terminal
/// host uses [`LayoutMetrics::ROWS`] where one unit is one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutMetrics {
    /// Height of one text line
    pub line_unit: u32,
    /// Height of the placeholder shown for an empty side
    pub blank_height: u32,
    /// Height of a hunk header without a function label
    pub hunk_height: u32,
}

impl Default for LayoutMetrics {
    fn default() -> Self {
        Self {
            line_unit: 12,
            blank_height: 3,
            hunk_height: 5,
        }
    }
}

impl LayoutMetrics {
    /// One terminal row per unit
    pub const ROWS: Self = Self {
        line_unit: 1,
        blank_height: 1,
        hunk_height: 1,
    };

    /// Virtual extent of a difference: the larger side's line count.
    pub fn difference_height(&self, diff: &Difference) -> u32 {
        let lines = diff.line_count() as u32;
        if lines == 0 {
            // Unreachable for validated trees, but never emit a zero span.
            self.blank_height
        } else {
            lines * self.line_unit
        }
    }

    /// Virtual extent of a hunk header.
    pub fn header_height(&self, has_function: bool) -> u32 {
        if has_function {
            self.line_unit
        } else {
            self.hunk_height
        }
    }
}

/// A contiguous range in virtual scroll coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualSpan {
    pub start: u32,
    pub len: u32,
}

impl VirtualSpan {
    pub fn end(&self) -> u32 {
        self.start + self.len
    }

    pub fn contains(&self, id: u32) -> bool {
        id >= self.start && id < self.end()
    }
}

/// What a span belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpanKey {
    Header(usize),
    Difference(DiffKey),
}

/// The shared virtual layout both panes agree on
#[derive(Debug, Clone, Default)]
pub struct VirtualLayout {
    /// Spans in display order, contiguous and strictly increasing
    spans: Vec<(SpanKey, VirtualSpan)>,
    by_diff: FxHashMap<DiffKey, usize>,
    viewport_height: u32,
    total: u32,
}

impl VirtualLayout {
    pub fn build(model: &DiffModel, metrics: &LayoutMetrics, viewport_height: u32) -> Self {
        let mut spans = Vec::new();
        let mut by_diff = FxHashMap::default();
        let mut start = 0u32;

        for (h, hunk) in model.hunks.iter().enumerate() {
            let len = metrics.header_height(hunk.function.is_some());
            spans.push((SpanKey::Header(h), VirtualSpan { start, len }));
            start += len;

            for (d, diff) in hunk.differences.iter().enumerate() {
                let key = DiffKey { hunk: h, diff: d };
                let len = metrics.difference_height(diff);
                by_diff.insert(key, spans.len());
                spans.push((SpanKey::Difference(key), VirtualSpan { start, len }));
                start += len;
            }
        }

        Self {
            spans,
            by_diff,
            viewport_height,
            total: start,
        }
    }

    /// Track viewport resizes; only affects the centering offset.
    pub fn set_viewport_height(&mut self, height: u32) {
        self.viewport_height = height;
    }

    pub fn span_of(&self, key: DiffKey) -> Option<VirtualSpan> {
        self.by_diff.get(&key).map(|&i| self.spans[i].1)
    }

    pub fn height_of(&self, key: DiffKey) -> Option<u32> {
        self.span_of(key).map(|s| s.len)
    }

    /// The difference whose span covers `id`, if any. Ids inside a hunk
    /// header span map to no difference.
    pub fn difference_at(&self, id: u32) -> Option<DiffKey> {
        match self.span_at(id)? {
            (SpanKey::Difference(key), _) => Some(key),
            (SpanKey::Header(_), _) => None,
        }
    }

    /// The span covering `id`, found by binary search over the sorted list.
    pub fn span_at(&self, id: u32) -> Option<(SpanKey, VirtualSpan)> {
        if id >= self.total {
            return None;
        }
        let idx = self
            .spans
            .partition_point(|(_, span)| span.start <= id)
            .checked_sub(1)?;
        Some(self.spans[idx])
    }

    /// Half the viewport, so the viewport midpoint aligns to an id. Short
    /// diffs center symmetrically instead of pinning to the top edge.
    pub fn min_scroll_id(&self) -> u32 {
        self.viewport_height / 2
    }

    /// Never below [`Self::min_scroll_id`]: content shorter than half the
    /// viewport pins to the centering offset instead of inverting the range.
    pub fn max_scroll_id(&self) -> u32 {
        self.total
            .saturating_sub(self.min_scroll_id())
            .max(self.min_scroll_id())
    }

    pub fn total_height(&self) -> u32 {
        self.total
    }

    pub fn spans(&self) -> &[(SpanKey, VirtualSpan)] {
        &self.spans
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Difference, DifferenceType, Hunk, Line};

    fn lines(n: usize) -> Vec<Line> {
        (0..n).map(|i| Line::new(format!("line {i}"))).collect()
    }

    fn sample_model() -> DiffModel {
        // One hunk: Unchanged(3/3), Changed(2/0), Unchanged(1/1)
        let hunk = Hunk::new(vec![
            Difference::new(DifferenceType::Unchanged, lines(3), lines(3), 1, 1),
            Difference::new(DifferenceType::Changed, lines(2), vec![], 4, 4),
            Difference::new(DifferenceType::Unchanged, lines(1), lines(1), 6, 4),
        ]);
        DiffModel::new(vec![hunk]).unwrap()
    }

    #[test]
    fn test_spans_cover_total_without_gaps() {
        let model = sample_model();
        let layout = VirtualLayout::build(&model, &LayoutMetrics::ROWS, 10);

        let mut expected_start = 0;
        for (_, span) in layout.spans() {
            assert_eq!(span.start, expected_start);
            assert!(span.len > 0);
            expected_start = span.end();
        }
        assert_eq!(expected_start, layout.total_height());
        // header(1) + 3 + 2 + 1 line units
        assert_eq!(layout.total_height(), 7);
    }

    #[test]
    fn test_total_height_invariant_under_apply() {
        let mut model = sample_model();
        let before = VirtualLayout::build(&model, &LayoutMetrics::ROWS, 10).total_height();

        let key = DiffKey { hunk: 0, diff: 1 };
        model.difference_mut(key).unwrap().applied = true;
        let after = VirtualLayout::build(&model, &LayoutMetrics::ROWS, 10);

        assert_eq!(before, after.total_height());
        assert_eq!(after.span_of(key), Some(VirtualSpan { start: 4, len: 2 }));
    }

    #[test]
    fn test_difference_at_binary_search() {
        let model = sample_model();
        let layout = VirtualLayout::build(&model, &LayoutMetrics::ROWS, 10);

        // id 0 is the hunk header
        assert_eq!(layout.difference_at(0), None);
        assert_eq!(layout.difference_at(1), Some(DiffKey { hunk: 0, diff: 0 }));
        assert_eq!(layout.difference_at(4), Some(DiffKey { hunk: 0, diff: 1 }));
        assert_eq!(layout.difference_at(6), Some(DiffKey { hunk: 0, diff: 2 }));
        assert_eq!(layout.difference_at(7), None);
    }

    #[test]
    fn test_scroll_id_bounds() {
        let model = sample_model();
        let layout = VirtualLayout::build(&model, &LayoutMetrics::ROWS, 4);
        assert_eq!(layout.min_scroll_id(), 2);
        assert_eq!(layout.max_scroll_id(), 5);
    }

    #[test]
    fn test_scroll_bounds_for_content_shorter_than_viewport() {
        let model = sample_model();
        // total height 7, viewport 40: the scroll range collapses to the
        // centering offset rather than going min > max
        let layout = VirtualLayout::build(&model, &LayoutMetrics::ROWS, 40);
        assert_eq!(layout.min_scroll_id(), 20);
        assert_eq!(layout.max_scroll_id(), 20);
    }

    #[test]
    fn test_header_with_function_uses_line_unit() {
        let hunk = Hunk::with_function(
            vec![Difference::new(
                DifferenceType::Inserted,
                vec![],
                lines(1),
                1,
                1,
            )],
            "fn main()",
        );
        let model = DiffModel::new(vec![hunk]).unwrap();
        let layout = VirtualLayout::build(&model, &LayoutMetrics::default(), 100);
        // labeled header takes a full text row (12), not the 5px rule height
        assert_eq!(layout.spans()[0].1.len, 12);
        assert_eq!(layout.spans()[1].1.start, 12);
    }
}
