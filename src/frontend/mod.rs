//! Frontend module for egui UI
//!
//! The eframe frame update is the presentation tick: each frame drains the
//! dispatcher, advances the graph and repaints. User intents go through a
//! [`ControllerHandle`], so the same code paths serve the UI and the tests.
//!
//! # Main Types
//!
//! - [`GridLinesApp`] - Main application state implementing [`eframe::App`]
//! - [`PlotLines`] - egui_plot surface implementing [`LineRenderer`](crate::graph::LineRenderer)
//! - [`ControlForm`] - Editable connection, filter and replay fields

mod plot;

pub use plot::{PlotLines, PlotTrace};

use crate::config::AppConfig;
use crate::error::Result;
use crate::status::StatusRow;
use crate::subscription::{
    ControllerHandle, GraphPresenter, HistoricalRange, Provider, SubscriptionState,
};
use egui::{Color32, RichText};
use std::time::Instant;

/// Longest frame interval fed to the scale groups; avoids a jump after a stall
const MAX_FRAME_DT: f64 = 0.25;

/// Replay interval slider range in milliseconds
const REPLAY_INTERVAL_RANGE: std::ops::RangeInclusive<u32> = 0..=1000;

/// Text fields and slider state of the control panel
#[derive(Debug, Clone, PartialEq)]
pub struct ControlForm {
    pub connection_string: String,
    pub filter_expression: String,
    pub start_time: String,
    pub stop_time: String,
    pub process_interval_ms: u32,
}

impl ControlForm {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            connection_string: config.connection_string.clone(),
            filter_expression: config.filter_expression.clone(),
            start_time: config.subscription.start_time.clone(),
            stop_time: config.subscription.stop_time.clone(),
            process_interval_ms: config.subscription.process_interval_ms,
        }
    }

    /// Copy the form back into `config` for saving
    pub fn apply_to(&self, config: &mut AppConfig) {
        config.connection_string = self.connection_string.clone();
        config.filter_expression = self.filter_expression.clone();
        config.subscription.start_time = self.start_time.clone();
        config.subscription.stop_time = self.stop_time.clone();
        config.subscription.process_interval_ms = self.process_interval_ms;
    }

    pub fn historical_range(&self) -> HistoricalRange {
        HistoricalRange::new(self.start_time.clone(), self.stop_time.clone())
    }
}

/// What the control panel needs from the controller each frame
struct FrameView {
    state: SubscriptionState,
    status: Option<Vec<StatusRow>>,
    traces: usize,
}

/// Main application state
pub struct GridLinesApp {
    config: AppConfig,
    presenter: GraphPresenter<PlotLines>,
    handle: ControllerHandle<PlotLines>,
    form: ControlForm,
    last_frame: Instant,
}

impl GridLinesApp {
    /// Create the app on the UI thread, which becomes the presentation thread
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        config: AppConfig,
        provider: Box<dyn Provider>,
    ) -> Result<Self> {
        let renderer = PlotLines::new(&config.graph);
        let presenter = GraphPresenter::new(provider, renderer, &config)?;
        let handle = presenter.handle();
        let form = ControlForm::from_config(&config);

        if config.subscription.auto_initiate_connection {
            tracing::info!("Auto-initiating connection to {}", form.connection_string);
            handle.connect(form.connection_string.clone());
        }

        Ok(Self {
            config,
            presenter,
            handle,
            form,
            last_frame: Instant::now(),
        })
    }

    fn frame_view(&self) -> Option<FrameView> {
        self.presenter
            .with_controller(|controller| FrameView {
                state: controller.state(),
                status: controller
                    .status()
                    .is_visible()
                    .then(|| controller.status().display_rows()),
                traces: controller.epoch().len(),
            })
            .ok()
    }

    fn render_controls(&mut self, ui: &mut egui::Ui, view: &FrameView) {
        let connected = view.state.is_connected();

        ui.horizontal(|ui| {
            ui.label("Connection:");
            ui.add(
                egui::TextEdit::singleline(&mut self.form.connection_string)
                    .desired_width(280.0),
            );
            let can_connect = !matches!(
                view.state,
                SubscriptionState::Connecting | SubscriptionState::Terminating
            );
            if ui
                .add_enabled(can_connect, egui::Button::new("Connect"))
                .clicked()
            {
                self.handle.connect(self.form.connection_string.clone());
            }
            if ui
                .add_enabled(
                    connected || view.state == SubscriptionState::Connecting,
                    egui::Button::new("Disconnect"),
                )
                .clicked()
            {
                self.handle.disconnect();
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let color = match view.state {
                    SubscriptionState::Subscribed(_) => Color32::GREEN,
                    SubscriptionState::Disconnected => Color32::GRAY,
                    _ => Color32::YELLOW,
                };
                ui.colored_label(color, view.state.to_string());
                ui.label(RichText::new(format!("{} traces", view.traces)).small());
            });
        });

        ui.horizontal(|ui| {
            ui.label("Filter:");
            ui.add(
                egui::TextEdit::singleline(&mut self.form.filter_expression)
                    .desired_width(520.0),
            );
            if ui
                .add_enabled(connected, egui::Button::new("Update"))
                .clicked()
            {
                self.handle
                    .update_subscription(self.form.filter_expression.clone());
            }
        });

        ui.horizontal(|ui| {
            ui.label("Start:");
            ui.add(egui::TextEdit::singleline(&mut self.form.start_time).desired_width(160.0));
            ui.label("Stop:");
            ui.add(egui::TextEdit::singleline(&mut self.form.stop_time).desired_width(160.0));

            let slider = ui.add(
                egui::Slider::new(&mut self.form.process_interval_ms, REPLAY_INTERVAL_RANGE)
                    .text("ms interval"),
            );
            if slider.changed() {
                self.handle.set_replay_interval(self.form.process_interval_ms);
            }

            if ui
                .add_enabled(connected, egui::Button::new("Replay"))
                .clicked()
            {
                self.handle.replay(
                    self.form.filter_expression.clone(),
                    self.form.historical_range(),
                    self.form.process_interval_ms,
                );
            }
        });
    }

    fn render_status(&self, ctx: &egui::Context, rows: &[StatusRow]) {
        egui::Area::new(egui::Id::new("status_overlay"))
            .anchor(egui::Align2::LEFT_BOTTOM, [12.0, -12.0])
            .interactable(false)
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    for row in rows {
                        for segment in &row.segments {
                            let text = RichText::new(segment).monospace().small();
                            if row.is_error {
                                ui.label(text.color(Color32::LIGHT_RED));
                            } else {
                                ui.label(text);
                            }
                        }
                    }
                });
            });
    }
}

impl eframe::App for GridLinesApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        let dt = now
            .duration_since(self.last_frame)
            .as_secs_f64()
            .min(MAX_FRAME_DT);
        self.last_frame = now;

        if let Err(e) = self.presenter.tick(dt) {
            tracing::error!("Presentation tick failed: {}", e);
        }

        // Traces scroll continuously
        ctx.request_repaint();

        let Some(view) = self.frame_view() else {
            return;
        };

        egui::TopBottomPanel::top("controls").show(ctx, |ui| {
            self.render_controls(ui, &view);
        });

        egui::SidePanel::right("legend")
            .resizable(true)
            .default_width(260.0)
            .show(ctx, |ui| {
                ui.heading("Legend");
                ui.separator();
                let _ = self
                    .presenter
                    .with_controller(|controller| controller.renderer().render_legend(ui));
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            let _ = self
                .presenter
                .with_controller(|controller| controller.renderer().render(ui));
        });

        if let Some(rows) = view.status.as_deref() {
            self.render_status(ctx, rows);
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        if let Err(e) = self
            .presenter
            .with_controller(|controller| controller.disconnect())
            .and_then(|result| result)
        {
            tracing::warn!("Failed to disconnect on exit: {}", e);
        }

        self.form.apply_to(&mut self.config);
        if let Err(e) = self.config.save_default() {
            tracing::warn!("Failed to save settings: {}", e);
        }
    }
}
