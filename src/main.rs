//! Grid Lines - Main Entry Point
//!
//! Streams measurements from a publisher and draws them as auto-scaled
//! rolling traces.

use anyhow::Context;
use gridlines_rs::{
    config::{ensure_app_data_dir, AppConfig, LOG_DIR},
    frontend::GridLinesApp,
    simulation::SimulatedPublisher,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> anyhow::Result<()> {
    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = init_logging();

    tracing::info!("Starting Grid Lines");

    let config = AppConfig::load_or_default();
    let title = config.title.clone();

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_min_inner_size([800.0, 600.0])
            .with_title(&title),
        ..Default::default()
    };

    let result = eframe::run_native(
        &title,
        native_options,
        Box::new(move |cc| {
            cc.egui_ctx.set_visuals(egui::Visuals::dark());

            let provider = Box::new(SimulatedPublisher::default());
            Ok(Box::new(GridLinesApp::new(cc, config, provider)?))
        }),
    );

    tracing::info!("Shutting down...");
    result
        .map_err(|e| anyhow::anyhow!("{}", e))
        .context("Failed to run the viewer")
}

/// Console plus daily-rolling file logging. Falls back to console only when
/// the data directory is unavailable.
fn init_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,gridlines_rs=debug"));

    let file = ensure_app_data_dir().ok().map(|dir| {
        let appender = tracing_appender::rolling::daily(dir.join(LOG_DIR), "gridlines.log");
        tracing_appender::non_blocking(appender)
    });

    match file {
        Some((writer, guard)) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(writer),
                )
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
            None
        }
    }
}
