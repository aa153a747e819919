//! Application state and input handling

use crate::config::Settings;
use lockstep_core::{
    ApplyTracker, Coordinator, DiffKey, DiffModel, Event, LayoutMetrics, ModelError, PaneSide,
    PaneView, Status, VirtualLayout,
};

/// Screen region of one rendered pane, recorded each frame for mouse
/// hit-testing
#[derive(Debug, Clone, Copy, Default)]
pub struct PaneArea {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl PaneArea {
    pub fn contains(&self, column: u16, row: u16) -> bool {
        column >= self.x
            && column < self.x + self.width
            && row >= self.y
            && row < self.y + self.height
    }
}

/// The main application state
pub struct App {
    pub model: DiffModel,
    pub layout: VirtualLayout,
    pub source: PaneView,
    pub destination: PaneView,
    pub coordinator: Coordinator,
    pub tracker: ApplyTracker,
    pub settings: Settings,
    pub should_quit: bool,
    /// Last published error, shown in the top bar
    pub error: Option<String>,
    pub source_area: Option<PaneArea>,
    pub destination_area: Option<PaneArea>,
}

impl App {
    /// One terminal row per virtual unit.
    const METRICS: LayoutMetrics = LayoutMetrics::ROWS;

    /// Build the app from a provider result. Publishes `Parsing` before the
    /// tree is consumed and `FinishedParsing` or `Error` after, so status
    /// observers see the full sequence. A rejected tree leaves an empty
    /// model behind with the error in the status channel.
    pub fn new(
        tree: Result<DiffModel, ModelError>,
        settings: Settings,
        viewport_height: u32,
    ) -> Self {
        let mut coordinator = Coordinator::new();
        coordinator.set_status(Status::Parsing);

        let (model, status) = match tree {
            Ok(model) => (model, Status::FinishedParsing),
            Err(err) => (DiffModel::default(), Status::Error(err.to_string())),
        };

        let layout = VirtualLayout::build(&model, &Self::METRICS, viewport_height);
        let mut source = PaneView::new(PaneSide::Source, Self::METRICS);
        let mut destination = PaneView::new(PaneSide::Destination, Self::METRICS);
        source.materialize(&model);
        destination.materialize(&model);

        coordinator.load(&model);
        coordinator.set_status(status);

        let mut app = Self {
            model,
            layout,
            source,
            destination,
            coordinator,
            tracker: ApplyTracker::new(),
            settings,
            should_quit: false,
            error: None,
            source_area: None,
            destination_area: None,
        };
        // land on the first difference once the tree is in
        app.coordinator.next_difference(&app.layout);
        app
    }

    /// Run the deferred scroll-to-selection, if one is still valid.
    pub fn tick(&mut self) {
        if let Some(anchor) = self.coordinator.take_pending_scroll(&self.layout) {
            self.coordinator.set_scroll_id(anchor, &self.layout);
        }
        for event in self.coordinator.drain_events() {
            if let Event::StatusChanged(Status::Error(message)) = event {
                self.error = Some(message);
            }
        }
    }

    pub fn on_key(&mut self, code: crossterm::event::KeyCode) {
        use crossterm::event::KeyCode;
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('n') | KeyCode::Down => {
                self.coordinator.next_difference(&self.layout);
            }
            KeyCode::Char('p') | KeyCode::Up => {
                self.coordinator.previous_difference(&self.layout);
            }
            KeyCode::Char(' ') | KeyCode::Enter => self.toggle_selected(),
            KeyCode::Char('a') => self.apply_all(true),
            KeyCode::Char('u') => self.apply_all(false),
            KeyCode::Char('j') => self.scroll_by(1),
            KeyCode::Char('k') => self.scroll_by(-1),
            KeyCode::PageDown => self.scroll_by(i64::from(self.layout.min_scroll_id())),
            KeyCode::PageUp => self.scroll_by(-i64::from(self.layout.min_scroll_id())),
            KeyCode::Char('g') => {
                self.coordinator
                    .set_scroll_id(self.layout.min_scroll_id(), &self.layout);
            }
            KeyCode::Char('G') => {
                self.coordinator
                    .set_scroll_id(self.layout.max_scroll_id(), &self.layout);
            }
            _ => {}
        }
    }

    pub fn scroll_by(&mut self, delta: i64) {
        let id = i64::from(self.coordinator.scroll_id()) + delta;
        self.coordinator
            .set_scroll_id(id.max(0) as u32, &self.layout);
    }

    /// Mouse click: resolve the pane and the item under the cursor, then
    /// select without scrolling so the clicked pane stays put. The sibling
    /// pane will highlight on the next paint.
    pub fn on_click(&mut self, column: u16, row: u16) {
        let hit = [
            (PaneSide::Source, self.source_area),
            (PaneSide::Destination, self.destination_area),
        ]
        .into_iter()
        .find_map(|(side, area)| {
            let area = area?;
            area.contains(column, row)
                .then(|| (side, u32::from(row - area.y)))
        });
        let Some((side, local_row)) = hit else {
            return;
        };

        let pane = self.pane(side);
        let pixel = self.pane_scroll_offset(side) + local_row;
        let Some(key) = pane
            .item_at(pixel)
            .and_then(|item| item.item.difference_key())
        else {
            return;
        };
        // clicks on unchanged rows fall through (coordinator only accepts
        // change targets, matching the visible-difference queries)
        self.coordinator.select(key, false, &self.layout);
    }

    pub fn toggle_selected(&mut self) {
        let Some(key) = self.coordinator.selection() else {
            return;
        };
        let on = !self
            .model
            .difference(key)
            .map(|d| d.applied)
            .unwrap_or(false);
        if self.tracker.apply(&mut self.model, key, on) {
            self.refresh_difference(key);
        }
    }

    pub fn apply_all(&mut self, on: bool) {
        for key in self.tracker.apply_all(&mut self.model, on) {
            self.refresh_difference(key);
        }
    }

    /// Rebuild just this difference's rows in both panes, before the next
    /// paint so neither pane shows a stale view.
    fn refresh_difference(&mut self, key: DiffKey) {
        self.source.rematerialize(&self.model, key);
        self.destination.rematerialize(&self.model, key);
    }

    pub fn pane(&self, side: PaneSide) -> &PaneView {
        match side {
            PaneSide::Source => &self.source,
            PaneSide::Destination => &self.destination,
        }
    }

    /// Local content offset of a pane for the shared scroll position,
    /// clamped to the pane's own scrollable range.
    pub fn pane_scroll_offset(&self, side: PaneSide) -> u32 {
        let pane = self.pane(side);
        let viewport = self
            .pane_area(side)
            .map(|a| u32::from(a.height))
            .unwrap_or(0);
        let max = pane.content_height().saturating_sub(viewport);
        pane.pixel_for_scroll_id(self.coordinator.scroll_id(), &self.layout)
            .min(max)
    }

    fn pane_area(&self, side: PaneSide) -> Option<PaneArea> {
        match side {
            PaneSide::Source => self.source_area,
            PaneSide::Destination => self.destination_area,
        }
    }

    pub fn on_resize(&mut self, viewport_height: u32) {
        self.layout.set_viewport_height(viewport_height);
        let id = self.coordinator.scroll_id();
        self.coordinator.set_scroll_id(id, &self.layout);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::provider::TreeProvider;
    use lockstep_core::DifferenceType;

    fn make_app() -> App {
        let old = "1\n2\n3\n4\n5\n6\n7\n8\n9\n";
        let new = "1\n2\n3\n4\nFIVE\n6\n7\n8\n9\n";
        let tree = TreeProvider::new().build(old, new);
        App::new(tree, Config::default().resolve(), 8)
    }

    #[test]
    fn test_new_selects_first_change_and_schedules_scroll() {
        let mut app = make_app();
        let key = app.coordinator.selection().expect("selection expected");
        assert_eq!(
            app.model.difference(key).unwrap().kind,
            DifferenceType::Changed
        );

        let anchor = app.layout.span_of(key).unwrap().start;
        app.tick();
        assert_eq!(app.coordinator.scroll_id(), anchor);
    }

    #[test]
    fn test_toggle_selected_rematerializes_both_panes() {
        let mut app = make_app();
        let key = app.coordinator.selection().unwrap();

        let src_height = app.source.content_height();
        let dst_height = app.destination.content_height();

        app.toggle_selected();
        assert!(app.model.difference(key).unwrap().applied);
        assert!(app.tracker.is_modified());
        // equal-height change: panes keep their extents but show source
        assert_eq!(app.source.content_height(), src_height);
        assert_eq!(app.destination.content_height(), dst_height);

        app.toggle_selected();
        assert!(!app.model.difference(key).unwrap().applied);
    }

    #[test]
    fn test_rejected_tree_surfaces_error_status() {
        let tree = Err(ModelError::EmptyDifference { hunk: 0, index: 0 });
        let mut app = App::new(tree, Config::default().resolve(), 8);
        app.tick();

        assert!(matches!(app.coordinator.status(), Status::Error(_)));
        assert!(app
            .error
            .as_deref()
            .unwrap()
            .contains("no lines on either side"));
        assert_eq!(app.coordinator.selection(), None);
    }

    #[test]
    fn test_apply_all_and_unapply_all() {
        let mut app = make_app();
        app.apply_all(true);
        assert_eq!(app.model.stats().applied, app.model.stats().differences);
        app.apply_all(false);
        assert_eq!(app.model.stats().applied, 0);
    }

    #[test]
    fn test_scroll_clamps_to_layout_range() {
        let mut app = make_app();
        app.scroll_by(-100);
        assert_eq!(app.coordinator.scroll_id(), app.layout.min_scroll_id());
        app.scroll_by(1_000);
        assert_eq!(app.coordinator.scroll_id(), app.layout.max_scroll_id());
    }

    #[test]
    fn test_click_selects_without_scroll() {
        let mut app = make_app();
        app.tick();
        app.source_area = Some(PaneArea {
            x: 0,
            y: 0,
            width: 40,
            height: 8,
        });
        app.destination_area = Some(PaneArea {
            x: 40,
            y: 0,
            width: 40,
            height: 8,
        });
        let before = app.coordinator.scroll_id();

        // row under the changed block in the source pane
        let key = app.coordinator.selection().unwrap();
        let offset = app.pane_scroll_offset(PaneSide::Source);
        let row_pos = app
            .source
            .rows()
            .iter()
            .find(|r| r.item.difference_key() == Some(key))
            .unwrap()
            .pos;
        app.on_click(3, (row_pos - offset) as u16);

        app.tick();
        assert_eq!(app.coordinator.scroll_id(), before);
        assert_eq!(app.coordinator.selection(), Some(key));
    }
}
