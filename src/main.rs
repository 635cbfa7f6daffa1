//! Node Graph Widgets - demo canvas for the node extensions
//!
//! Entry point for the application.

use eframe::egui;
use nodegraph_widgets::app::DemoApp;

fn main() -> eframe::Result<()> {
    env_logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_title("Node Graph Widgets"),
        ..Default::default()
    };

    eframe::run_native(
        "Node Graph Widgets",
        options,
        Box::new(|_cc| Ok(Box::new(DemoApp::default()))),
    )
}
