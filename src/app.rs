//! GUI shell: menu bar, layer list, map view, and the transparency dock.
//! All panel↔layer traffic goes through the [`TransparencyHost`] adapter so
//! the dock never holds a reference to application state.

use eframe::egui;
use std::path::PathBuf;

use crate::components::transparency::TransparencyPanel;
use crate::host::TransparencyHost;
use crate::layer::{RasterLayer, TransparentPixel};
use crate::settings::AppSettings;

const CHECKER_TILE: f32 = 12.0;

/// Borrow of the active layer (if any) plus a repaint flag — the three host
/// capabilities the dock panel is allowed to use, nothing more.
struct ActiveLayerHost<'a> {
    layer: Option<&'a mut RasterLayer>,
    redraw_requested: &'a mut bool,
}

impl TransparencyHost for ActiveLayerHost<'_> {
    fn has_active_layer(&self) -> bool {
        self.layer.is_some()
    }

    fn invalidate(&mut self) {
        if let Some(layer) = self.layer.as_deref_mut() {
            layer.invalidate();
        }
    }

    fn set_transparency(&mut self, records: Vec<TransparentPixel>) {
        if let Some(layer) = self.layer.as_deref_mut() {
            layer.set_transparency(records);
        }
    }

    fn request_redraw(&mut self) {
        *self.redraw_requested = true;
    }
}

pub struct RasterVeilApp {
    layers: Vec<RasterLayer>,
    active_layer: Option<usize>,

    // UI components
    transparency_panel: TransparencyPanel,

    // Settings
    settings: AppSettings,

    // Map view texture cache — rebuilt when the active layer or its
    // dirty generation moves.
    map_texture: Option<egui::TextureHandle>,
    texture_layer: Option<usize>,
    texture_generation: u64,

    status: String,
}

impl RasterVeilApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        // Initialize settings from disk (or defaults if no saved file)
        let settings = AppSettings::load();
        cc.egui_ctx.set_visuals(if settings.dark_mode {
            egui::Visuals::dark()
        } else {
            egui::Visuals::light()
        });

        let transparency_panel = TransparencyPanel::new(&settings);

        Self {
            layers: Vec::new(),
            active_layer: None,
            transparency_panel,
            settings,
            map_texture: None,
            texture_layer: None,
            texture_generation: 0,
            status: "Open a raster to begin".to_string(),
        }
    }

    /// Switch the active layer and push its value domain into the panel.
    /// `None` (no layer) disables the range controls as a unit.
    fn activate_layer(&mut self, index: Option<usize>) {
        self.active_layer = index;
        match index.and_then(|i| self.layers.get(i)) {
            Some(layer) => {
                let (min_val, max_val) = layer.value_domain();
                self.transparency_panel.update_bounds(max_val, min_val);
                self.transparency_panel.set_enabled(max_val > min_val);
                self.status = format!(
                    "{} — {}×{}, values {}..{}",
                    layer.name,
                    layer.width(),
                    layer.height(),
                    min_val,
                    max_val
                );
                if max_val <= min_val {
                    self.status
                        .push_str(" (flat raster, transparency controls disabled)");
                }
            }
            None => {
                self.transparency_panel.set_enabled(false);
            }
        }
        self.map_texture = None;
    }

    fn open_file_dialog(&mut self) {
        let mut dialog = rfd::FileDialog::new().add_filter(
            "Raster images",
            &["png", "jpg", "jpeg", "bmp", "tif", "tiff"],
        );
        if !self.settings.last_open_dir.is_empty() {
            dialog = dialog.set_directory(&self.settings.last_open_dir);
        }
        let Some(path) = dialog.pick_file() else { return };

        if let Some(parent) = path.parent() {
            self.settings.last_open_dir = parent.display().to_string();
            self.settings.save();
        }
        self.load_file(path);
    }

    fn load_file(&mut self, path: PathBuf) {
        match crate::io::load_raster(&path) {
            Ok(layer) => {
                crate::log_info!(
                    "loaded '{}' ({}x{}, domain {:?})",
                    layer.name,
                    layer.width(),
                    layer.height(),
                    layer.value_domain()
                );
                self.layers.push(layer);
                self.activate_layer(Some(self.layers.len() - 1));
            }
            Err(e) => {
                crate::log_err!("{}", e);
                self.status = e;
            }
        }
    }

    fn export_dialog(&mut self) {
        let Some(index) = self.active_layer else {
            self.status = "Nothing to export — no active layer".to_string();
            return;
        };
        let Some(path) = rfd::FileDialog::new()
            .add_filter("PNG image", &["png"])
            .set_file_name("masked.png")
            .save_file()
        else {
            return;
        };
        let layer = &mut self.layers[index];
        match crate::io::save_png(layer.composite(), &path) {
            Ok(()) => {
                crate::log_info!("exported '{}' to {}", layer.name, path.display());
                self.status = format!("Exported {}", path.display());
            }
            Err(e) => {
                crate::log_err!("{}", e);
                self.status = e;
            }
        }
    }

    fn close_active_layer(&mut self) {
        let Some(index) = self.active_layer else { return };
        self.layers.remove(index);
        let next = if self.layers.is_empty() {
            None
        } else {
            Some(index.min(self.layers.len() - 1))
        };
        self.activate_layer(next);
        if next.is_none() {
            self.status = "Open a raster to begin".to_string();
        }
    }

    // ------------------------------------------------------------------
    // View sections
    // ------------------------------------------------------------------

    fn show_menu_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Open…").clicked() {
                        ui.close_menu();
                        self.open_file_dialog();
                    }
                    if ui.button("Export PNG…").clicked() {
                        ui.close_menu();
                        self.export_dialog();
                    }
                    if ui.button("Close Layer").clicked() {
                        ui.close_menu();
                        self.close_active_layer();
                    }
                    ui.separator();
                    if ui.button("Quit").clicked() {
                        ui.close_menu();
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });
                ui.menu_button("View", |ui| {
                    if ui
                        .checkbox(&mut self.settings.dark_mode, "Dark mode")
                        .changed()
                    {
                        ctx.set_visuals(if self.settings.dark_mode {
                            egui::Visuals::dark()
                        } else {
                            egui::Visuals::light()
                        });
                        self.settings.save();
                    }
                });
            });
        });
    }

    fn show_layer_list(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("layer_list")
            .default_width(180.0)
            .show(ctx, |ui| {
                ui.heading("Layers");
                ui.separator();
                if self.layers.is_empty() {
                    ui.label(egui::RichText::new("No layers loaded").weak());
                    return;
                }
                let mut clicked: Option<usize> = None;
                for (i, layer) in self.layers.iter().enumerate() {
                    let selected = self.active_layer == Some(i);
                    if ui.selectable_label(selected, &layer.name).clicked() && !selected {
                        clicked = Some(i);
                    }
                }
                if let Some(i) = clicked {
                    self.activate_layer(Some(i));
                }
            });
    }

    fn show_transparency_dock(&mut self, ctx: &egui::Context) {
        let mut redraw = false;
        egui::SidePanel::right("transparency_dock")
            .default_width(270.0)
            .show(ctx, |ui| {
                ui.heading("Raster Transparency");
                ui.separator();
                let mut host = ActiveLayerHost {
                    layer: self
                        .active_layer
                        .and_then(|i| self.layers.get_mut(i)),
                    redraw_requested: &mut redraw,
                };
                self.transparency_panel
                    .show(ui, &mut host, &mut self.settings);
            });
        if redraw {
            ctx.request_repaint();
        }
    }

    fn show_map_view(&mut self, ui: &mut egui::Ui) {
        let Some(index) = self.active_layer else {
            ui.centered_and_justified(|ui| {
                ui.label(egui::RichText::new("File → Open… to load a raster").weak());
            });
            return;
        };

        // Re-upload the texture when the layer switched or was invalidated.
        let layer = &mut self.layers[index];
        let stale = self.map_texture.is_none()
            || self.texture_layer != Some(index)
            || self.texture_generation != layer.dirty_generation;
        if stale {
            let composed = layer.composite();
            let size = [composed.width() as usize, composed.height() as usize];
            let color_image = egui::ColorImage::from_rgba_unmultiplied(size, composed.as_raw());
            self.map_texture = Some(ui.ctx().load_texture(
                "map_view",
                color_image,
                egui::TextureOptions::NEAREST,
            ));
            self.texture_layer = Some(index);
            self.texture_generation = layer.dirty_generation;
        }
        let Some(texture) = &self.map_texture else { return };

        // Fit the raster into the available rect, preserving aspect ratio.
        let avail = ui.available_rect_before_wrap();
        let tex_size = texture.size_vec2();
        let scale = (avail.width() / tex_size.x)
            .min(avail.height() / tex_size.y)
            .min(8.0); // cap magnification of tiny rasters
        let shown = tex_size * scale;
        let rect = egui::Rect::from_center_size(avail.center(), shown);

        paint_checkerboard(ui.painter(), rect);
        ui.painter().image(
            texture.id(),
            rect,
            egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
            egui::Color32::WHITE,
        );
    }
}

/// Checkerboard under the raster so transparent pixels are visible.
fn paint_checkerboard(painter: &egui::Painter, rect: egui::Rect) {
    let light = egui::Color32::from_gray(110);
    let dark = egui::Color32::from_gray(80);
    painter.rect_filled(rect, 0.0, light);

    let mut y = rect.min.y;
    let mut row = 0;
    while y < rect.max.y {
        let mut x = rect.min.x + if row % 2 == 0 { CHECKER_TILE } else { 0.0 };
        while x < rect.max.x {
            let tile = egui::Rect::from_min_size(
                egui::pos2(x, y),
                egui::vec2(
                    CHECKER_TILE.min(rect.max.x - x),
                    CHECKER_TILE.min(rect.max.y - y),
                ),
            );
            painter.rect_filled(tile, 0.0, dark);
            x += CHECKER_TILE * 2.0;
        }
        y += CHECKER_TILE;
        row += 1;
    }
}

impl eframe::App for RasterVeilApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.show_menu_bar(ctx);
        self.show_layer_list(ctx);
        self.show_transparency_dock(ctx);

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.label(&self.status);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.show_map_view(ui);
        });
    }
}
