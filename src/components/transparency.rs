//! Raster transparency dock panel.
//!
//! Two linked slider/numeric-entry pairs select the range of pixel values
//! that stays opaque; every integer value outside `[start, end]` is handed
//! to the host as a fully-transparent single-value record. The controller
//! half of this file is UI-free and drives all behavior through
//! [`PanelEvent`]s, so the same code path serves the egui dock, the
//! headless CLI, and the tests.

use eframe::egui;

use crate::host::{PrefStore, TransparencyHost};
use crate::layer::TransparentPixel;

/// Preference key for the persisted manual-update flag.
pub const MANUAL_UPDATE_KEY: &str = "manual_update";

/// Widget events, dispatched through [`TransparencyPanel::handle_event`].
///
/// Handler contracts:
/// - `StartChanged(v)` / `EndChanged(v)`: clamp `v` against the opposite
///   endpoint and the domain; in auto mode an accepted change applies
///   immediately.
/// - `DragReleased`: in auto mode a completed slider drag applies (covers
///   hosts that suppress per-tick change events during a drag).
/// - `ManualUpdateToggled(on)`: flips the mode and persists the flag.
/// - `RefreshClicked`: explicit apply (the only apply path in manual mode).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelEvent {
    StartChanged(i32),
    EndChanged(i32),
    DragReleased,
    ManualUpdateToggled(bool),
    RefreshClicked,
}

pub struct TransparencyPanel {
    min_val: i32,
    max_val: i32,
    /// Invariant: `min_val <= start < end <= max_val` whenever the domain
    /// is non-degenerate (`max_val > min_val`).
    start: i32,
    end: i32,
    manual_update: bool,
    enabled: bool,
}

impl TransparencyPanel {
    /// The manual-update flag is read from the preference store once, here;
    /// it is written back on every toggle.
    pub fn new(prefs: &dyn PrefStore) -> Self {
        Self {
            min_val: 0,
            max_val: 0,
            start: 0,
            end: 0,
            manual_update: prefs.get_bool(MANUAL_UPDATE_KEY, false),
            enabled: false,
        }
    }

    pub fn start(&self) -> i32 {
        self.start
    }

    pub fn end(&self) -> i32 {
        self.end
    }

    pub fn bounds(&self) -> (i32, i32) {
        (self.min_val, self.max_val)
    }

    pub fn manual_update(&self) -> bool {
        self.manual_update
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Toggle interactivity of all range widgets as a unit (used when no
    /// suitable layer is active).
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled && self.has_domain();
    }

    fn has_domain(&self) -> bool {
        self.max_val > self.min_val
    }

    /// New value domain from the active layer. Resets the selection to the
    /// full domain, clearing whatever range was previously chosen.
    /// Argument order (max, min) mirrors the host's layer-statistics call.
    pub fn update_bounds(&mut self, max_value: i32, min_value: i32) {
        self.max_val = max_value;
        self.min_val = min_value;
        self.start = min_value;
        self.end = max_value;
        if !self.has_domain() {
            // Flat raster (or empty): a 1-value domain cannot hold
            // start < end, so the controls go dormant.
            self.enabled = false;
        }
    }

    /// Move the start endpoint. A value reaching or passing `end` is forced
    /// to `end - 1`. Returns true when the stored value actually changed.
    pub fn set_start(&mut self, value: i32) -> bool {
        if !self.has_domain() {
            return false;
        }
        let clamped = value.clamp(self.min_val, self.end - 1);
        if clamped == self.start {
            return false;
        }
        self.start = clamped;
        true
    }

    /// Move the end endpoint; symmetric to [`Self::set_start`].
    pub fn set_end(&mut self, value: i32) -> bool {
        if !self.has_domain() {
            return false;
        }
        let clamped = value.clamp(self.start + 1, self.max_val);
        if clamped == self.end {
            return false;
        }
        self.end = clamped;
        true
    }

    /// Records for every integer value outside `[start, end]`:
    /// `[min_val, start)` then `(end, max_val]`, each fully transparent.
    /// Built fresh on every call; a full-domain selection yields an empty
    /// list.
    pub fn transparency_list(&self) -> Vec<TransparentPixel> {
        if !self.has_domain() {
            return Vec::new();
        }
        let record = |pixel_value| TransparentPixel {
            pixel_value,
            percent_transparent: 100,
        };
        let len = (self.start - self.min_val) + (self.max_val - self.end);
        let mut records = Vec::with_capacity(len as usize);
        if self.start != self.min_val {
            records.extend((self.min_val..self.start).map(record));
        }
        if self.end != self.max_val {
            records.extend((self.end + 1..=self.max_val).map(record));
        }
        records
    }

    /// Push the current selection to the host: invalidate the cached render,
    /// install the record list, request a repaint. With no active layer this
    /// is a logged no-op rather than a crash.
    pub fn apply(&self, host: &mut dyn TransparencyHost) {
        if !host.has_active_layer() {
            crate::logger::write("WARN", "transparency apply skipped: no active raster layer");
            return;
        }
        host.invalidate();
        host.set_transparency(self.transparency_list());
        host.request_redraw();
    }

    /// Fixed event-to-handler dispatch; the only entry point the widgets use.
    pub fn handle_event(
        &mut self,
        event: PanelEvent,
        host: &mut dyn TransparencyHost,
        prefs: &mut dyn PrefStore,
    ) {
        match event {
            PanelEvent::StartChanged(value) => {
                if self.set_start(value) && !self.manual_update {
                    self.apply(host);
                }
            }
            PanelEvent::EndChanged(value) => {
                if self.set_end(value) && !self.manual_update {
                    self.apply(host);
                }
            }
            PanelEvent::DragReleased => {
                if !self.manual_update {
                    self.apply(host);
                }
            }
            PanelEvent::ManualUpdateToggled(on) => {
                self.manual_update = on;
                prefs.set_bool(MANUAL_UPDATE_KEY, on);
            }
            PanelEvent::RefreshClicked => self.apply(host),
        }
    }

    // ------------------------------------------------------------------
    // egui view
    // ------------------------------------------------------------------

    /// Render the dock contents and route widget interactions through
    /// `handle_event`.
    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        host: &mut dyn TransparencyHost,
        prefs: &mut dyn PrefStore,
    ) {
        let mut events: Vec<PanelEvent> = Vec::new();
        let interactive = self.enabled && self.has_domain();

        ui.add_enabled_ui(interactive, |ui| {
            ui.label("Opaque pixel-value range");
            ui.add_space(2.0);

            let mut start = self.start;
            ui.horizontal(|ui| {
                ui.label("Start");
                let slider = ui.add(
                    egui::Slider::new(&mut start, self.min_val..=self.max_val).show_value(false),
                );
                let spin = ui.add(
                    egui::DragValue::new(&mut start).clamp_range(self.min_val..=self.max_val),
                );
                if slider.changed() || spin.changed() {
                    events.push(PanelEvent::StartChanged(start));
                }
                if slider.drag_released() {
                    events.push(PanelEvent::DragReleased);
                }
            });

            let mut end = self.end;
            ui.horizontal(|ui| {
                ui.label("End  ");
                let slider = ui.add(
                    egui::Slider::new(&mut end, self.min_val..=self.max_val).show_value(false),
                );
                let spin =
                    ui.add(egui::DragValue::new(&mut end).clamp_range(self.min_val..=self.max_val));
                if slider.changed() || spin.changed() {
                    events.push(PanelEvent::EndChanged(end));
                }
                if slider.drag_released() {
                    events.push(PanelEvent::DragReleased);
                }
            });

        });

        // The mode toggle stays interactive even with no usable layer; only
        // the range widgets go dormant as a unit.
        ui.add_space(4.0);
        let mut manual = self.manual_update;
        if ui
            .checkbox(&mut manual, "Manual update")
            .on_hover_text("Apply only when Refresh is pressed")
            .changed()
        {
            events.push(PanelEvent::ManualUpdateToggled(manual));
        }

        // Refresh is the only apply path in manual mode; pointless otherwise.
        ui.add_enabled_ui(self.manual_update && interactive, |ui| {
            if ui.button("Refresh").clicked() {
                events.push(PanelEvent::RefreshClicked);
            }
        });

        for event in events {
            self.handle_event(event, host, prefs);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;

    /// Recording host: remembers every call so tests can assert call
    /// counts and the exact record lists installed.
    struct MockHost {
        active: bool,
        invalidations: usize,
        installed: Vec<Vec<TransparentPixel>>,
        redraws: usize,
    }

    impl MockHost {
        fn new() -> Self {
            Self {
                active: true,
                invalidations: 0,
                installed: Vec::new(),
                redraws: 0,
            }
        }

        fn applies(&self) -> usize {
            self.installed.len()
        }
    }

    impl TransparencyHost for MockHost {
        fn has_active_layer(&self) -> bool {
            self.active
        }

        fn invalidate(&mut self) {
            self.invalidations += 1;
        }

        fn set_transparency(&mut self, records: Vec<TransparentPixel>) {
            self.installed.push(records);
        }

        fn request_redraw(&mut self) {
            self.redraws += 1;
        }
    }

    #[derive(Default)]
    struct MemPrefs(HashMap<String, bool>);

    impl PrefStore for MemPrefs {
        fn get_bool(&self, key: &str, default: bool) -> bool {
            self.0.get(key).copied().unwrap_or(default)
        }

        fn set_bool(&mut self, key: &str, value: bool) {
            self.0.insert(key.to_string(), value);
        }
    }

    fn panel(min: i32, max: i32) -> TransparencyPanel {
        let mut p = TransparencyPanel::new(&MemPrefs::default());
        p.update_bounds(max, min);
        p.set_enabled(true);
        p
    }

    #[test]
    fn list_is_complement_of_selection() {
        let mut p = panel(0, 255);
        assert!(p.set_start(10));
        assert!(p.set_end(240));
        let list = p.transparency_list();
        assert_eq!(list.len(), 25); // 0..9 and 241..255
        let values: Vec<i32> = list.iter().map(|r| r.pixel_value).collect();
        assert!(values.contains(&0));
        assert!(values.contains(&9));
        assert!(!values.contains(&10));
        assert!(!values.contains(&240));
        assert!(values.contains(&241));
        assert!(values.contains(&255));
        assert!(list.iter().all(|r| r.percent_transparent == 100));
    }

    #[test]
    fn full_domain_selection_yields_empty_list_but_apply_still_runs() {
        let p = panel(0, 255);
        let mut host = MockHost::new();
        p.apply(&mut host);
        assert_eq!(host.applies(), 1);
        assert!(host.installed[0].is_empty());
        assert_eq!(host.invalidations, 1);
        assert_eq!(host.redraws, 1);
    }

    #[test]
    fn start_reaching_end_is_forced_one_below() {
        let mut p = panel(0, 100);
        p.set_end(50);
        assert!(p.set_start(50));
        assert_eq!(p.start(), 49);
        assert!(p.set_start(9999));
        assert_eq!(p.start(), 49);
        assert_eq!(p.start(), p.end() - 1);
    }

    #[test]
    fn end_reaching_start_is_forced_one_above() {
        let mut p = panel(0, 100);
        p.set_start(60);
        assert!(p.set_end(60));
        assert_eq!(p.end(), 61);
        assert!(p.set_end(-40));
        assert_eq!(p.end(), 61);
    }

    #[test]
    fn unchanged_value_is_not_an_accepted_change() {
        let mut p = panel(0, 100);
        p.set_start(30);
        assert!(!p.set_start(30));
        // Clamping to the current value is also not a change.
        p.set_end(31);
        assert!(!p.set_start(30));
    }

    #[test]
    fn bounds_reset_clears_selection() {
        let mut p = panel(0, 255);
        p.set_start(10);
        p.set_end(240);
        p.update_bounds(4095, 0);
        assert_eq!(p.start(), 0);
        assert_eq!(p.end(), 4095);
        assert!(p.transparency_list().is_empty());
    }

    #[test]
    fn degenerate_domain_disables_panel() {
        let mut p = panel(0, 255);
        p.update_bounds(7, 7);
        assert!(!p.is_enabled());
        assert!(!p.set_start(3));
        assert!(p.transparency_list().is_empty());
        // Re-enabling is refused while the domain stays degenerate.
        p.set_enabled(true);
        assert!(!p.is_enabled());
    }

    #[test]
    fn auto_mode_applies_once_per_accepted_change() {
        let mut p = panel(0, 255);
        let mut host = MockHost::new();
        let mut prefs = MemPrefs::default();
        p.handle_event(PanelEvent::StartChanged(10), &mut host, &mut prefs);
        assert_eq!(host.applies(), 1);
        p.handle_event(PanelEvent::EndChanged(240), &mut host, &mut prefs);
        assert_eq!(host.applies(), 2);
        // Rejected change (same value) — no apply.
        p.handle_event(PanelEvent::StartChanged(10), &mut host, &mut prefs);
        assert_eq!(host.applies(), 2);
        assert_eq!(host.installed[1].len(), 25);
    }

    #[test]
    fn drag_release_applies_in_auto_mode_only() {
        let mut p = panel(0, 255);
        let mut host = MockHost::new();
        let mut prefs = MemPrefs::default();
        p.handle_event(PanelEvent::DragReleased, &mut host, &mut prefs);
        assert_eq!(host.applies(), 1);
        p.handle_event(PanelEvent::ManualUpdateToggled(true), &mut host, &mut prefs);
        p.handle_event(PanelEvent::DragReleased, &mut host, &mut prefs);
        assert_eq!(host.applies(), 1);
    }

    #[test]
    fn manual_mode_defers_until_refresh() {
        let mut p = panel(0, 255);
        let mut host = MockHost::new();
        let mut prefs = MemPrefs::default();
        p.handle_event(PanelEvent::ManualUpdateToggled(true), &mut host, &mut prefs);
        p.handle_event(PanelEvent::StartChanged(10), &mut host, &mut prefs);
        p.handle_event(PanelEvent::EndChanged(240), &mut host, &mut prefs);
        assert_eq!(host.applies(), 0);
        p.handle_event(PanelEvent::RefreshClicked, &mut host, &mut prefs);
        assert_eq!(host.applies(), 1);
        assert_eq!(host.installed[0].len(), 25);
    }

    #[test]
    fn toggle_persists_flag_and_constructor_reads_it() {
        let mut p = panel(0, 255);
        let mut host = MockHost::new();
        let mut prefs = MemPrefs::default();
        p.handle_event(PanelEvent::ManualUpdateToggled(true), &mut host, &mut prefs);
        assert!(prefs.get_bool(MANUAL_UPDATE_KEY, false));
        let rebuilt = TransparencyPanel::new(&prefs);
        assert!(rebuilt.manual_update());
    }

    #[test]
    fn apply_without_active_layer_is_a_noop() {
        let p = panel(0, 255);
        let mut host = MockHost::new();
        host.active = false;
        p.apply(&mut host);
        assert_eq!(host.applies(), 0);
        assert_eq!(host.invalidations, 0);
        assert_eq!(host.redraws, 0);
    }

    proptest! {
        /// Any event sequence of endpoint moves keeps the invariant, and
        /// the generated list is exactly the complement of the selection.
        #[test]
        fn invariant_and_complement_hold(
            min in -2000i32..2000,
            span in 1i32..600,
            moves in proptest::collection::vec((any::<bool>(), -3000i32..3000), 0..32),
        ) {
            let max = min + span;
            let mut p = panel(min, max);
            for (is_start, value) in moves {
                if is_start {
                    p.set_start(value);
                } else {
                    p.set_end(value);
                }
                prop_assert!(min <= p.start());
                prop_assert!(p.start() < p.end());
                prop_assert!(p.end() <= max);
            }

            let list = p.transparency_list();
            prop_assert_eq!(
                list.len() as i32,
                (p.start() - min) + (max - p.end())
            );
            let mut seen = std::collections::HashSet::new();
            for rec in &list {
                prop_assert_eq!(rec.percent_transparent, 100);
                prop_assert!(seen.insert(rec.pixel_value), "duplicate record");
                prop_assert!(rec.pixel_value < p.start() || rec.pixel_value > p.end());
                prop_assert!(rec.pixel_value >= min && rec.pixel_value <= max);
            }
        }
    }
}
