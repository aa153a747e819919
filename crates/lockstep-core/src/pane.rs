//! Per-pane projection of the difference tree
//!
//! A pane materializes the tree into a flat sequence of renderable rows in
//! its own local coordinate space. Local heights diverge between the two
//! panes (a changed block may have five source lines and an empty
//! destination side), so cross-pane alignment always goes through the
//! shared [`VirtualLayout`].

use crate::layout::{LayoutMetrics, SpanKey, VirtualLayout};
use crate::model::{DiffKey, DiffModel, Difference, DifferenceType};
use rustc_hash::FxHashMap;
use std::ops::Range;

/// One of the two synchronized display surfaces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaneSide {
    Source,
    Destination,
}

/// One renderable row in one pane
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaneItem {
    HunkHeader {
        hunk: usize,
    },
    Line {
        key: DiffKey,
        /// Index into the visible side's line sequence
        index: usize,
        /// 1-based display line number
        number: usize,
    },
    /// Placeholder shown when the visible side has no lines of its own
    Blank {
        key: DiffKey,
    },
}

impl PaneItem {
    pub fn difference_key(&self) -> Option<DiffKey> {
        match self {
            PaneItem::Line { key, .. } | PaneItem::Blank { key } => Some(*key),
            PaneItem::HunkHeader { .. } => None,
        }
    }
}

/// An item plus its local position and height
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaneRow {
    pub item: PaneItem,
    pub pos: u32,
    pub height: u32,
}

/// Local extent of one header or difference, kept for incremental updates
/// and scroll interpolation
#[derive(Debug, Clone)]
struct PaneBlock {
    pos: u32,
    height: u32,
    rows: Range<usize>,
}

/// Everything the render surface needs to paint one row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaintPayload<'a> {
    pub text: &'a str,
    pub changed: &'a [Range<usize>],
    pub number: Option<usize>,
    pub class: BackgroundClass,
}

/// Background classification for a row, matched explicitly by the painter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundClass {
    HunkHeader,
    Unchanged,
    Difference {
        kind: DifferenceType,
        selected: bool,
        applied: bool,
    },
}

/// Projects the shared tree into one pane's concrete item sequence
#[derive(Debug, Clone)]
pub struct PaneView {
    side: PaneSide,
    metrics: LayoutMetrics,
    rows: Vec<PaneRow>,
    blocks: Vec<PaneBlock>,
    block_by_key: FxHashMap<SpanKey, usize>,
    content_height: u32,
}

impl PaneView {
    pub fn new(side: PaneSide, metrics: LayoutMetrics) -> Self {
        Self {
            side,
            metrics,
            rows: Vec::new(),
            blocks: Vec::new(),
            block_by_key: FxHashMap::default(),
            content_height: 0,
        }
    }

    pub fn side(&self) -> PaneSide {
        self.side
    }

    /// Rebuild the whole item sequence from the tree.
    pub fn materialize(&mut self, model: &DiffModel) {
        self.rows.clear();
        self.blocks.clear();
        self.block_by_key.clear();
        let mut pos = 0u32;

        for (h, hunk) in model.hunks.iter().enumerate() {
            let height = self.metrics.header_height(hunk.function.is_some());
            let start = self.rows.len();
            self.rows.push(PaneRow {
                item: PaneItem::HunkHeader { hunk: h },
                pos,
                height,
            });
            self.push_block(SpanKey::Header(h), pos, height, start..self.rows.len());
            pos += height;

            for (d, diff) in hunk.differences.iter().enumerate() {
                let key = DiffKey { hunk: h, diff: d };
                let start = self.rows.len();
                let height = self.emit_difference_rows(diff, key, pos);
                self.push_block(SpanKey::Difference(key), pos, height, start..self.rows.len());
                pos += height;
            }
        }

        self.content_height = pos;
    }

    /// Rebuild only one difference's rows after its applied state flipped,
    /// shifting everything below by the height delta.
    pub fn rematerialize(&mut self, model: &DiffModel, key: DiffKey) {
        let Some(&block_idx) = self.block_by_key.get(&SpanKey::Difference(key)) else {
            return;
        };
        let Some(diff) = model.difference(key) else {
            return;
        };

        let (pos, old_height, old_range) = {
            let block = &self.blocks[block_idx];
            (block.pos, block.height, block.rows.clone())
        };

        let mut fresh = PaneView::new(self.side, self.metrics);
        let new_height = fresh.emit_difference_rows(diff, key, pos);
        let new_len = fresh.rows.len();
        let old_len = old_range.len();

        self.rows.splice(old_range.clone(), fresh.rows);

        let height_delta = new_height as i64 - old_height as i64;
        let count_delta = new_len as i64 - old_len as i64;

        {
            let block = &mut self.blocks[block_idx];
            block.height = new_height;
            block.rows = old_range.start..old_range.start + new_len;
        }
        for block in &mut self.blocks[block_idx + 1..] {
            block.pos = (block.pos as i64 + height_delta) as u32;
            block.rows = shift(block.rows.clone(), count_delta);
        }
        let first_after = old_range.start + new_len;
        for row in &mut self.rows[first_after..] {
            row.pos = (row.pos as i64 + height_delta) as u32;
        }
        self.content_height = (self.content_height as i64 + height_delta) as u32;
    }

    /// Which side's lines this pane shows for a difference: the source side
    /// when this is the source pane or the difference has been applied,
    /// the destination side otherwise.
    pub fn visible_side(&self, diff: &Difference) -> PaneSide {
        if self.side == PaneSide::Source || diff.applied {
            PaneSide::Source
        } else {
            PaneSide::Destination
        }
    }

    fn emit_difference_rows(&mut self, diff: &Difference, key: DiffKey, mut pos: u32) -> u32 {
        let (lines, start_no) = match self.visible_side(diff) {
            PaneSide::Source => (&diff.source, diff.source_line_no),
            PaneSide::Destination => (&diff.destination, diff.destination_line_no),
        };

        if lines.is_empty() {
            self.rows.push(PaneRow {
                item: PaneItem::Blank { key },
                pos,
                height: self.metrics.blank_height,
            });
            return self.metrics.blank_height;
        }

        let start = pos;
        for index in 0..lines.len() {
            self.rows.push(PaneRow {
                item: PaneItem::Line {
                    key,
                    index,
                    number: start_no + index,
                },
                pos,
                height: self.metrics.line_unit,
            });
            pos += self.metrics.line_unit;
        }
        pos - start
    }

    fn push_block(&mut self, key: SpanKey, pos: u32, height: u32, rows: Range<usize>) {
        self.block_by_key.insert(key, self.blocks.len());
        self.blocks.push(PaneBlock { pos, height, rows });
    }

    /// The row covering a local pixel position, if any.
    pub fn item_at(&self, pixel: u32) -> Option<&PaneRow> {
        self.row_index_at(pixel).map(|i| &self.rows[i])
    }

    fn row_index_at(&self, pixel: u32) -> Option<usize> {
        if pixel >= self.content_height {
            return None;
        }
        self.rows
            .partition_point(|row| row.pos <= pixel)
            .checked_sub(1)
    }

    /// Virtual scroll id of a row, via its owning difference's span.
    pub fn scroll_id_of(&self, row: &PaneRow, layout: &VirtualLayout) -> Option<u32> {
        let key = row.item.difference_key()?;
        layout.span_of(key).map(|span| span.start)
    }

    /// First non-Unchanged difference at or below the viewport top.
    pub fn first_visible_difference(&self, model: &DiffModel, viewport_top: u32) -> Option<DiffKey> {
        let start = self.row_index_at(viewport_top)?;
        self.rows[start..]
            .iter()
            .find_map(|row| self.change_key(model, row))
    }

    /// Last non-Unchanged difference at or above the viewport bottom.
    pub fn last_visible_difference(
        &self,
        model: &DiffModel,
        viewport_bottom: u32,
    ) -> Option<DiffKey> {
        // Below the last item the scan still starts from the end of the list.
        let start = self
            .row_index_at(viewport_bottom)
            .unwrap_or(self.rows.len().checked_sub(1)?);
        self.rows[..=start]
            .iter()
            .rev()
            .find_map(|row| self.change_key(model, row))
    }

    fn change_key(&self, model: &DiffModel, row: &PaneRow) -> Option<DiffKey> {
        let key = row.item.difference_key()?;
        let diff = model.difference(key)?;
        (diff.kind != DifferenceType::Unchanged).then_some(key)
    }

    /// Map a virtual scroll id to a local content offset.
    ///
    /// The id is interpolated linearly within the covering block, since the
    /// block's local height may differ from its virtual span length (blank
    /// placeholder vs. multi-line side). The centering offset is then
    /// subtracted so the id lands at the viewport midpoint.
    pub fn pixel_for_scroll_id(&self, id: u32, layout: &VirtualLayout) -> u32 {
        let Some((span_key, span)) = layout.span_at(id.min(layout.total_height().saturating_sub(1)))
        else {
            return 0;
        };
        let Some(&block_idx) = self.block_by_key.get(&span_key) else {
            return 0;
        };
        let block = &self.blocks[block_idx];

        let ratio = f64::from(id.saturating_sub(span.start)) / f64::from(span.len.max(1));
        let y = f64::from(block.pos) + ratio * f64::from(block.height);
        (y as i64 - i64::from(layout.min_scroll_id())).max(0) as u32
    }

    /// Paint data for one row; `selected` is the globally selected difference.
    pub fn paint_payload<'a>(
        &self,
        model: &'a DiffModel,
        row: &PaneRow,
        selected: Option<DiffKey>,
    ) -> PaintPayload<'a> {
        match &row.item {
            PaneItem::HunkHeader { hunk } => {
                let text = model
                    .hunk(*hunk)
                    .and_then(|h| h.function.as_deref())
                    .unwrap_or("");
                PaintPayload {
                    text,
                    changed: &[],
                    number: None,
                    class: BackgroundClass::HunkHeader,
                }
            }
            PaneItem::Blank { key } => PaintPayload {
                text: "",
                changed: &[],
                number: None,
                class: self.class_for(model, *key, selected),
            },
            PaneItem::Line { key, index, number } => {
                let line = model.difference(*key).and_then(|diff| {
                    match self.visible_side(diff) {
                        PaneSide::Source => diff.source.get(*index),
                        PaneSide::Destination => diff.destination.get(*index),
                    }
                });
                PaintPayload {
                    text: line.map_or("", |l| l.text.as_str()),
                    changed: line.map_or(&[][..], |l| &l.changed),
                    number: Some(*number),
                    class: self.class_for(model, *key, selected),
                }
            }
        }
    }

    fn class_for(
        &self,
        model: &DiffModel,
        key: DiffKey,
        selected: Option<DiffKey>,
    ) -> BackgroundClass {
        match model.difference(key) {
            Some(diff) if diff.kind != DifferenceType::Unchanged => BackgroundClass::Difference {
                kind: diff.kind,
                selected: selected == Some(key),
                applied: diff.applied,
            },
            _ => BackgroundClass::Unchanged,
        }
    }

    pub fn rows(&self) -> &[PaneRow] {
        &self.rows
    }

    pub fn content_height(&self) -> u32 {
        self.content_height
    }
}

fn shift(range: Range<usize>, delta: i64) -> Range<usize> {
    let start = (range.start as i64 + delta) as usize;
    let end = (range.end as i64 + delta) as usize;
    start..end
}
