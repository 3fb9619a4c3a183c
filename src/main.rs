#![allow(dead_code)] // API surface kept for embedding the panel in other shells

mod app;
mod cli;
mod components;
mod host;
mod io;
mod layer;
pub mod logger;
mod settings;

use app::RasterVeilApp;
use eframe::egui;

fn main() -> Result<(), eframe::Error> {
    // -- CLI / headless mode ---------------------------------------------
    if cli::CliArgs::is_cli_mode() {
        use clap::Parser;
        let args = cli::CliArgs::parse();
        std::process::exit(cli::run(args));
    }

    // -- GUI mode -----------------------------------------------------

    // Initialize session log (overwrites previous session log)
    logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1100.0, 720.0])
            .with_title("RasterVeil"),
        ..Default::default()
    };

    eframe::run_native(
        "RasterVeil",
        options,
        Box::new(|cc| Box::new(RasterVeilApp::new(cc))),
    )
}
