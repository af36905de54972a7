#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod config;
mod gesture;
mod model_download;
mod pipeline;
mod speech;
mod types;
mod ui;

use std::path::Path;

use anyhow::Result;
use crossbeam_channel::bounded;
use gpui::Application;

fn main() -> Result<()> {
    env_logger::init();

    let config_path = Path::new(config::CONFIG_FILE);
    let config = config::Config::load_or_default(config_path);
    if !config_path.exists() {
        if let Err(err) = config.save(config_path) {
            log::warn!("failed to write default config: {err:#}");
        }
    }

    // All channels are lossy bounded(1): every stage keeps only the newest item.
    let (frame_tx, frame_rx) = bounded(1);
    let (detector_frame_tx, detector_frame_rx) = bounded(1);
    let (result_tx, result_rx) = bounded(1);

    Application::new()
        .with_assets(gpui_component_assets::Assets)
        .run(move |app| {
            gpui_component::init(app);

            if let Err(err) = ui::launch_ui(
                app,
                config,
                frame_rx,
                frame_tx,
                detector_frame_rx,
                detector_frame_tx,
                result_rx,
                result_tx,
            ) {
                eprintln!("failed to launch ui: {err:?}");
            }
        });

    Ok(())
}
