// GUI-subsystem binary on Windows: no console window is allocated in GUI
// mode; CLI mode (--input/-i present) runs headless before any window is
// created.
#![cfg_attr(target_os = "windows", windows_subsystem = "windows")]
#![allow(dead_code)] // API surface kept for the reserved masking mode and CLI growth

mod app;
mod cli;
mod components;
mod io;
mod layer;
pub mod logger;
mod ops;
mod session;

use app::VisualTypeApp;
use eframe::egui;

fn main() -> Result<(), eframe::Error> {
    // -- CLI / headless mode ---------------------------------------------
    if cli::CliArgs::is_cli_mode() {
        use clap::Parser;
        logger::init();
        let args = cli::CliArgs::parse();
        std::process::exit(cli::run(args));
    }

    // -- GUI mode ---------------------------------------------------------

    // Initialize session log (overwrites previous session log)
    logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_title("VisualType"),
        ..Default::default()
    };

    eframe::run_native(
        "VisualType",
        options,
        Box::new(|cc| Box::new(VisualTypeApp::new(cc))),
    )
}
