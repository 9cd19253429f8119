#![warn(clippy::all, rust_2018_idioms)]
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod config;
mod directory;
mod error;
mod map;
mod maps_api;
mod ui;

#[cfg(not(target_arch = "wasm32"))]
fn main() -> eframe::Result<()> {
    env_logger::init();

    // Missing credentials are fatal before any window exists.
    let config = match config::Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            log::error!("{}", err);
            eprintln!("member_map: {}", err);
            std::process::exit(1);
        }
    };

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(egui::vec2(1280.0, 800.0))
            .with_min_inner_size(egui::vec2(400.0, 300.0))
            .with_title("Member Map")
            .with_resizable(true)
            .with_decorations(true),
        ..Default::default()
    };

    eframe::run_native(
        "Member Map",
        native_options,
        Box::new(|cc| Ok(Box::new(ui::my_app::MyApp::new(cc, config)?))),
    )
}
