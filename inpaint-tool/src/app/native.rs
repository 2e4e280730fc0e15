use std::{io, path::PathBuf, sync::Arc, time::Duration};

use eframe::egui;
use log::info;

use super::InpaintApp;
use crate::HttpService;

pub fn run_native() -> Result<(), eframe::Error> {
    env_logger::init();

    let config: crate::Config = match std::fs::File::open("config.json") {
        Ok(f) => serde_json::from_reader(f).map_err(|e| eframe::Error::AppCreation(Box::new(e)))?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => crate::Config::default(),
        Err(e) => Err(eframe::Error::AppCreation(Box::new(e)))?,
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size(config.egui.viewport),
        ..Default::default()
    };

    let initial_image = std::env::args().nth(1).map(PathBuf::from);

    info!("Run with config: {config:?}");
    eframe::run_native(
        "Inpaint",
        options,
        Box::new(|cc| {
            let service = Arc::new(HttpService::new(
                config.endpoint.clone(),
                Duration::from_secs(config.timeout_secs),
            ));
            info!("Inpainting requests go to {}", service.endpoint());
            Ok(Box::new(InpaintApp::new(cc, config, service, initial_image)))
        }),
    )
}
