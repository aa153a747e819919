//! Selection and scroll coordination between the two panes
//!
//! A single globally selected difference and a single virtual scroll
//! position keep both panes in agreement. Programmatic scrolls are
//! deferred: selecting records a one-shot scroll request that the host
//! takes on its next tick, after the originating event (typically a click)
//! has finished its own handling. The request carries its target anchor
//! and is re-validated on take, so a request superseded by newer
//! interaction simply fizzles.

use crate::layout::VirtualLayout;
use crate::model::{DiffKey, DiffModel};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Provider / viewer status
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Status {
    #[default]
    Idle,
    Parsing,
    FinishedParsing,
    Error(String),
}

/// Events published to the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    SelectionChanged { key: DiffKey },
    StatusChanged(Status),
}

/// One-shot deferred scroll request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingScroll {
    anchor: u32,
}

/// Current selection and scroll position, reset on every tree load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelectionState {
    pub selected: Option<DiffKey>,
    pub scroll_id: u32,
}

#[derive(Debug, Default)]
pub struct Coordinator {
    state: SelectionState,
    status: Status,
    pending: Option<PendingScroll>,
    events: VecDeque<Event>,
    /// Non-Unchanged differences in display order; the only valid
    /// selection and navigation targets
    targets: Vec<DiffKey>,
}

impl Coordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind to a freshly loaded tree, clearing selection and scroll state.
    pub fn load(&mut self, model: &DiffModel) {
        self.targets = model.change_keys();
        self.state = SelectionState::default();
        self.pending = None;
    }

    pub fn selection(&self) -> Option<DiffKey> {
        self.state.selected
    }

    pub fn state(&self) -> SelectionState {
        self.state
    }

    /// Select a difference. Re-selecting the current target is a no-op and
    /// publishes nothing. With `scroll` set, a deferred scroll to the
    /// difference's span start is scheduled; click-originated selections
    /// pass `scroll = false` so the clicked pane does not jump under the
    /// cursor.
    pub fn select(&mut self, key: DiffKey, scroll: bool, layout: &VirtualLayout) -> bool {
        if self.state.selected == Some(key) {
            return false;
        }
        if !self.targets.contains(&key) {
            return false;
        }

        self.state.selected = Some(key);
        if scroll {
            if let Some(span) = layout.span_of(key) {
                self.pending = Some(PendingScroll { anchor: span.start });
            }
        }
        self.events.push_back(Event::SelectionChanged { key });
        true
    }

    /// Take the deferred scroll target, if it still matches the current
    /// selection's span. A stale anchor (selection moved on since the
    /// request was scheduled) is dropped without acting.
    pub fn take_pending_scroll(&mut self, layout: &VirtualLayout) -> Option<u32> {
        let pending = self.pending.take()?;
        let selected = self.state.selected?;
        let span = layout.span_of(selected)?;
        (span.start == pending.anchor).then_some(pending.anchor)
    }

    /// Record a user-driven scroll position.
    pub fn set_scroll_id(&mut self, id: u32, layout: &VirtualLayout) {
        self.state.scroll_id = id.clamp(layout.min_scroll_id(), layout.max_scroll_id());
    }

    pub fn scroll_id(&self) -> u32 {
        self.state.scroll_id
    }

    /// Step to the next difference in flattened (hunk, difference) order.
    ///
    /// Unchanged differences are never targets: stepping uses the same
    /// ordering as the visible-difference queries rather than raw
    /// difference indices. At the last target the selection stays put.
    pub fn next_difference(&mut self, layout: &VirtualLayout) -> bool {
        match self.selected_target_index() {
            None => match self.targets.first().copied() {
                Some(first) => self.select(first, true, layout),
                None => false,
            },
            Some(i) if i + 1 < self.targets.len() => {
                let next = self.targets[i + 1];
                self.select(next, true, layout)
            }
            Some(_) => false,
        }
    }

    /// Step to the previous difference; see [`Self::next_difference`].
    pub fn previous_difference(&mut self, layout: &VirtualLayout) -> bool {
        match self.selected_target_index() {
            None => match self.targets.first().copied() {
                Some(first) => self.select(first, true, layout),
                None => false,
            },
            Some(i) if i > 0 => {
                let prev = self.targets[i - 1];
                self.select(prev, true, layout)
            }
            Some(_) => false,
        }
    }

    pub fn can_step_forward(&self) -> bool {
        match self.selected_target_index() {
            None => !self.targets.is_empty(),
            Some(i) => i + 1 < self.targets.len(),
        }
    }

    pub fn can_step_backward(&self) -> bool {
        match self.selected_target_index() {
            None => !self.targets.is_empty(),
            Some(i) => i > 0,
        }
    }

    fn selected_target_index(&self) -> Option<usize> {
        let selected = self.state.selected?;
        self.targets.iter().position(|&k| k == selected)
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn set_status(&mut self, status: Status) {
        if self.status == status {
            return;
        }
        self.status = status.clone();
        self.events.push_back(Event::StatusChanged(status));
    }

    pub fn drain_events(&mut self) -> Vec<Event> {
        self.events.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::LayoutMetrics;
    use crate::model::{Difference, DifferenceType, Hunk, Line};

    fn lines(texts: &[&str]) -> Vec<Line> {
        texts.iter().copied().map(Line::new).collect()
    }

    fn model_with_three_changes() -> DiffModel {
        let first = Hunk::new(vec![
            Difference::new(DifferenceType::Deleted, lines(&["a"]), vec![], 1, 1),
            Difference::new(
                DifferenceType::Unchanged,
                lines(&["b"]),
                lines(&["b"]),
                2,
                1,
            ),
            Difference::new(DifferenceType::Inserted, vec![], lines(&["c"]), 3, 2),
        ]);
        let second = Hunk::new(vec![Difference::new(
            DifferenceType::Changed,
            lines(&["d"]),
            lines(&["D"]),
            9,
            9,
        )]);
        DiffModel::new(vec![first, second]).unwrap()
    }

    fn setup() -> (DiffModel, VirtualLayout, Coordinator) {
        let model = model_with_three_changes();
        let layout = VirtualLayout::build(&model, &LayoutMetrics::ROWS, 4);
        let mut coordinator = Coordinator::new();
        coordinator.load(&model);
        (model, layout, coordinator)
    }

    #[test]
    fn test_reselection_is_idempotent() {
        let (_, layout, mut coordinator) = setup();
        let key = DiffKey { hunk: 0, diff: 0 };

        assert!(coordinator.select(key, true, &layout));
        assert!(!coordinator.select(key, true, &layout));

        let events: Vec<_> = coordinator
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, Event::SelectionChanged { .. }))
            .collect();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_unchanged_is_not_selectable() {
        let (_, layout, mut coordinator) = setup();
        assert!(!coordinator.select(DiffKey { hunk: 0, diff: 1 }, true, &layout));
        assert_eq!(coordinator.selection(), None);
    }

    #[test]
    fn test_navigation_skips_unchanged_and_crosses_hunks() {
        let (_, layout, mut coordinator) = setup();

        assert!(coordinator.next_difference(&layout));
        assert_eq!(coordinator.selection(), Some(DiffKey { hunk: 0, diff: 0 }));

        assert!(coordinator.next_difference(&layout));
        assert_eq!(coordinator.selection(), Some(DiffKey { hunk: 0, diff: 2 }));

        assert!(coordinator.next_difference(&layout));
        assert_eq!(coordinator.selection(), Some(DiffKey { hunk: 1, diff: 0 }));
    }

    #[test]
    fn test_navigation_boundaries_leave_selection_unchanged() {
        let (_, layout, mut coordinator) = setup();

        coordinator.next_difference(&layout);
        assert!(!coordinator.previous_difference(&layout));
        assert_eq!(coordinator.selection(), Some(DiffKey { hunk: 0, diff: 0 }));
        assert!(!coordinator.can_step_backward());

        while coordinator.next_difference(&layout) {}
        assert_eq!(coordinator.selection(), Some(DiffKey { hunk: 1, diff: 0 }));
        assert!(!coordinator.next_difference(&layout));
        assert_eq!(coordinator.selection(), Some(DiffKey { hunk: 1, diff: 0 }));
        assert!(!coordinator.can_step_forward());
    }

    #[test]
    fn test_pending_scroll_taken_once() {
        let (_, layout, mut coordinator) = setup();
        let key = DiffKey { hunk: 1, diff: 0 };
        coordinator.select(key, true, &layout);

        let anchor = coordinator.take_pending_scroll(&layout);
        assert_eq!(anchor, Some(layout.span_of(key).unwrap().start));
        assert_eq!(coordinator.take_pending_scroll(&layout), None);
    }

    #[test]
    fn test_stale_pending_scroll_is_dropped() {
        let (_, layout, mut coordinator) = setup();
        coordinator.select(DiffKey { hunk: 1, diff: 0 }, true, &layout);

        // A newer click-selection supersedes the scheduled scroll; its
        // anchor no longer matches the current selection's span.
        coordinator.select(DiffKey { hunk: 0, diff: 0 }, false, &layout);
        assert_eq!(coordinator.take_pending_scroll(&layout), None);
    }

    #[test]
    fn test_click_selection_schedules_no_scroll() {
        let (_, layout, mut coordinator) = setup();
        assert!(coordinator.select(DiffKey { hunk: 0, diff: 0 }, false, &layout));
        assert_eq!(coordinator.take_pending_scroll(&layout), None);
        assert_eq!(
            coordinator.drain_events(),
            vec![Event::SelectionChanged {
                key: DiffKey { hunk: 0, diff: 0 }
            }]
        );
    }

    #[test]
    fn test_scroll_clamps_when_viewport_exceeds_content() {
        let model = model_with_three_changes();
        // total height 6, viewport 40
        let layout = VirtualLayout::build(&model, &LayoutMetrics::ROWS, 40);
        let mut coordinator = Coordinator::new();
        coordinator.load(&model);

        coordinator.set_scroll_id(0, &layout);
        assert_eq!(coordinator.scroll_id(), layout.min_scroll_id());
        coordinator.set_scroll_id(u32::MAX, &layout);
        assert_eq!(coordinator.scroll_id(), layout.max_scroll_id());
    }

    #[test]
    fn test_error_status_publishes_event() {
        let (_, _, mut coordinator) = setup();
        coordinator.set_status(Status::Error("bad tree".to_string()));

        assert_eq!(coordinator.status(), &Status::Error("bad tree".to_string()));
        let events = coordinator.drain_events();
        assert!(events.contains(&Event::StatusChanged(Status::Error(
            "bad tree".to_string()
        ))));
    }

    #[test]
    fn test_status_change_publishes_once() {
        let (_, _, mut coordinator) = setup();
        coordinator.set_status(Status::Parsing);
        coordinator.set_status(Status::Parsing);
        coordinator.set_status(Status::FinishedParsing);

        let statuses: Vec<_> = coordinator
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, Event::StatusChanged(_)))
            .collect();
        assert_eq!(statuses.len(), 2);
    }

    #[test]
    fn test_load_resets_selection() {
        let (model, layout, mut coordinator) = setup();
        coordinator.select(DiffKey { hunk: 0, diff: 0 }, true, &layout);
        coordinator.load(&model);
        assert_eq!(coordinator.selection(), None);
        assert_eq!(coordinator.take_pending_scroll(&layout), None);
    }
}
