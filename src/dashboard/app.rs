//! Dashboard application entry point

use anyhow::Context as _;
use crossbeam_channel::{unbounded, Receiver, Sender};
use eframe::egui;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

use crate::app::{DocumentPipeline, PipelineOutput};
use crate::config::{self, AppConfig, CredentialOverrides};
use crate::dashboard::components::render_sidebar;
use crate::dashboard::state::{
    DashboardState, DashboardView, JobKind, JobResult, Session, SettingsViewState, StatusLevel,
    UserAction,
};
use crate::dashboard::theme;
use crate::dashboard::views::{render_document_view, render_results_view, render_settings_view};
use crate::document::DocumentImage;

/// The main dashboard application
pub struct DashboardApp {
    /// Document, results and saved configuration
    session: Session,
    /// Dashboard-specific state
    dashboard_state: DashboardState,
    /// Whether theme has been applied
    theme_applied: bool,
    /// Results from the worker thread
    job_tx: Sender<JobResult>,
    job_rx: Receiver<JobResult>,
}

impl DashboardApp {
    /// Create a new dashboard application
    pub fn new(config: AppConfig, config_path: PathBuf, overrides: &CredentialOverrides) -> Self {
        let (job_tx, job_rx) = unbounded();
        let dashboard_state = DashboardState {
            settings: SettingsViewState::from_overrides(overrides),
            ..Default::default()
        };

        Self {
            session: Session::new(config, config_path),
            dashboard_state,
            theme_applied: false,
            job_tx,
            job_rx,
        }
    }

    /// Create eframe options for the dashboard window
    pub fn options() -> eframe::NativeOptions {
        eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size([1200.0, 800.0])
                .with_min_inner_size([800.0, 500.0])
                .with_title("DocGround")
                .with_drag_and_drop(true),
            ..Default::default()
        }
    }

    /// Run `job` on a background thread; only one job runs at a time
    fn spawn_job<F>(&mut self, ctx: &egui::Context, kind: JobKind, job: F)
    where
        F: FnOnce() -> JobResult + Send + 'static,
    {
        if self.session.is_busy() {
            return;
        }
        self.session.busy = Some(kind);

        let tx = self.job_tx.clone();
        let ctx = ctx.clone();
        std::thread::spawn(move || {
            let result = job();
            if tx.send(result).is_err() {
                error!("Dashboard closed before the job finished");
            }
            ctx.request_repaint();
        });
    }

    /// Apply finished jobs
    fn poll_jobs(&mut self) {
        while let Ok(result) = self.job_rx.try_recv() {
            let switch_to_results = matches!(result, JobResult::Extracted(Ok(_)));
            self.session.finish_job(result);
            if switch_to_results {
                self.dashboard_state.current_view = DashboardView::Results;
            }
        }
    }

    /// Open files dropped on the window
    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| {
            i.raw
                .dropped_files
                .iter()
                .find_map(|f| f.path.clone())
        });
        if let Some(path) = dropped {
            self.dashboard_state.document.path_input = path.display().to_string();
            self.session.request(UserAction::Open(path));
        }
    }

    /// Handle the action a view requested this frame
    fn process_action(&mut self, ctx: &egui::Context) {
        let Some(action) = self.session.pending_action.take() else {
            return;
        };

        match action {
            UserAction::Open(path) => {
                info!("Opening {}", path.display());
                self.dashboard_state.current_view = DashboardView::Document;
                self.spawn_job(ctx, JobKind::Load, move || {
                    let result = DocumentImage::load(&path).map_err(|e| e.to_string());
                    JobResult::Loaded { path, result }
                });
            }
            UserAction::RotateClockwise => self.session.rotate(1),
            UserAction::RotateCounterClockwise => self.session.rotate(-1),
            UserAction::Extract => self.start_extraction(ctx),
            UserAction::SaveImage(path) => {
                let Some(output) = &self.session.output else {
                    return;
                };
                match output.grounded_image.save(&path) {
                    Ok(()) => self
                        .session
                        .set_status(StatusLevel::Info, format!("Saved {}", path.display())),
                    Err(e) => self.session.set_status(
                        StatusLevel::Error,
                        format!("Could not save {}: {}", path.display(), e),
                    ),
                }
            }
            UserAction::SaveConfig => {
                match config::save_config(&self.session.config, &self.session.config_path) {
                    Ok(()) => {
                        self.dashboard_state.settings.has_unsaved_changes = false;
                        self.session.set_status(
                            StatusLevel::Info,
                            format!("Saved settings to {}", self.session.config_path.display()),
                        );
                    }
                    Err(e) => {
                        error!("Failed to save config: {:#}", e);
                        self.session
                            .set_status(StatusLevel::Error, format!("Could not save settings: {e:#}"));
                    }
                }
            }
            UserAction::ResetConfig => {
                self.session.config = AppConfig::default();
                self.dashboard_state.settings.has_unsaved_changes = true;
            }
        }
    }

    /// Validate, then run the pipeline on the worker thread
    fn start_extraction(&mut self, ctx: &egui::Context) {
        let Some(document) = self.session.document.clone() else {
            return;
        };
        let config = self
            .session
            .config
            .with_overrides(&self.dashboard_state.settings.overrides());

        match config.validate() {
            Err(e) => {
                self.session.set_status(StatusLevel::Error, e.to_string());
                return;
            }
            Ok(warnings) => {
                if let Some(first) = warnings.first() {
                    self.session.set_status(StatusLevel::Warning, first.to_string());
                }
            }
        }

        self.spawn_job(ctx, JobKind::Extract, move || {
            let result = run_extraction(&config, &document).map_err(|e| format!("{e:#}"));
            JobResult::Extracted(result)
        });
    }
}

fn run_extraction(config: &AppConfig, document: &DocumentImage) -> anyhow::Result<PipelineOutput> {
    let pipeline = DocumentPipeline::from_config(config)?;
    pipeline.run(document).context("Extraction failed")
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Apply theme once
        if !self.theme_applied {
            theme::apply_theme(ctx);
            self.theme_applied = true;
        }

        self.poll_jobs();
        self.handle_dropped_files(ctx);

        if self.session.is_busy() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }

        egui::SidePanel::left("sidebar")
            .resizable(false)
            .default_width(180.0)
            .show(ctx, |ui| {
                render_sidebar(ui, &mut self.dashboard_state.current_view, &self.session);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::Frame::none()
                .inner_margin(24.0)
                .show(ui, |ui| match self.dashboard_state.current_view {
                    DashboardView::Document => {
                        render_document_view(ui, &mut self.dashboard_state.document, &mut self.session);
                    }
                    DashboardView::Results => {
                        render_results_view(ui, &mut self.dashboard_state.results, &self.session);
                    }
                    DashboardView::Settings => {
                        render_settings_view(ui, &mut self.dashboard_state.settings, &mut self.session);
                    }
                });
        });

        self.process_action(ctx);
    }
}

/// Run the dashboard application
pub fn run_dashboard(
    config: AppConfig,
    config_path: PathBuf,
    overrides: CredentialOverrides,
) -> Result<(), eframe::Error> {
    let app = DashboardApp::new(config, config_path, &overrides);
    eframe::run_native(
        "DocGround",
        DashboardApp::options(),
        Box::new(|_cc| Ok(Box::new(app))),
    )
}
