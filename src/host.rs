//! Seam interfaces between the transparency panel and the rest of the
//! application. The panel never touches a concrete layer or settings file;
//! it only sees these two narrow traits, which keeps it testable headless
//! and keeps the GUI shell swappable.

use crate::layer::TransparentPixel;

/// What the panel needs from whatever owns the active raster layer.
///
/// Contract for `apply`: the panel calls, in order, `invalidate()`,
/// `set_transparency(records)`, `request_redraw()` — but only after
/// `has_active_layer()` returned true. Implementations with no active
/// layer may no-op the mutating calls.
pub trait TransparencyHost {
    fn has_active_layer(&self) -> bool;

    /// Drop any cached rendering of the active layer.
    fn invalidate(&mut self);

    /// Install `records` as the active layer's single-value transparency set,
    /// replacing whatever was installed before.
    fn set_transparency(&mut self, records: Vec<TransparentPixel>);

    /// Ask the host to repaint the map view.
    fn request_redraw(&mut self);
}

/// Minimal persisted key-value store for panel preferences.
/// The only key the panel uses is `"manual_update"`.
pub trait PrefStore {
    fn get_bool(&self, key: &str, default: bool) -> bool;

    /// Set and persist. Storage failures are swallowed; preferences are
    /// never worth interrupting the user for.
    fn set_bool(&mut self, key: &str, value: bool);
}
