//! Main window implemented with egui/eframe

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use eframe::{egui, CreationContext, NativeOptions};
use parking_lot::Mutex;
use tracing::{error, info, warn, Level};

use super::components::pages::{self, PageAction};
use super::constants::*;
use crate::config::ConfigService;
use crate::dispatcher::{UiDispatcher, UiLoop};
use crate::events::{ErrorOccurred, ErrorSeverity, EventBus, Subscription};
use crate::logging::LogHandle;
use crate::navigation::{
    ContentSlot, NavigationHost, NavigationService, PageType, PageView, ViewKind, ViewModel,
};
use crate::theme::{Theme, ThemeService};
use crate::viewmodels::{
    DetectionViewModel, HistoryViewModel, HomeViewModel, MainWindowViewModel, SettingsViewModel,
    TestViewModel,
};

/// Everything the window needs, wired up before it opens
pub struct Services {
    pub runtime: tokio::runtime::Handle,
    pub events: EventBus,
    pub config: Arc<ConfigService>,
    pub themes: Arc<ThemeService>,
    pub navigation: Arc<NavigationService>,
    /// Resolved [`MainWindowViewModel`]
    pub shell: Arc<dyn ViewModel>,
    pub host: Arc<ContentSlot>,
    pub dispatcher: UiDispatcher,
    pub ui_loop: UiLoop,
    pub start_page: PageType,
    pub log: LogHandle,
    pub log_level: Level,
}

struct StatusMessage {
    text: String,
    color: egui::Color32,
}

impl StatusMessage {
    fn from_event(event: &ErrorOccurred) -> Self {
        let color = match event.severity {
            ErrorSeverity::Info => STATUS_INFO,
            ErrorSeverity::Warning => STATUS_WARNING,
            ErrorSeverity::Error | ErrorSeverity::Critical => STATUS_ERROR,
        };
        Self {
            text: format!("{}: {}", event.title, event.message),
            color,
        }
    }
}

fn theme_preference(theme: Theme) -> egui::ThemePreference {
    match theme {
        Theme::Light => egui::ThemePreference::Light,
        Theme::Dark => egui::ThemePreference::Dark,
        Theme::System => egui::ThemePreference::System,
    }
}

struct DetectorApp {
    services: Services,
    status_message: Arc<Mutex<Option<StatusMessage>>>,
    applied_theme: Option<Theme>,
    _errors: Subscription<ErrorOccurred>,
}

impl DetectorApp {
    fn new(cc: &CreationContext<'_>, mut services: Services) -> Self {
        info!("Initializing main window");

        let repaint = cc.egui_ctx.clone();
        services.dispatcher.set_waker(move || repaint.request_repaint());
        // Claims this thread as the UI thread before any navigation runs
        services.ui_loop.run_pending();

        let status_message = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&status_message);
        let repaint = cc.egui_ctx.clone();
        let errors = services.events.subscribe_fn(move |event: &ErrorOccurred| {
            *sink.lock() = Some(StatusMessage::from_event(event));
            repaint.request_repaint();
        });

        services
            .navigation
            .set_navigation_target(Arc::clone(&services.host) as Arc<dyn NavigationHost>);
        if let Some(shell) = services.shell.as_any().downcast_ref::<MainWindowViewModel>() {
            // Completion is observed through NavigationCompleted
            let _ = shell.initialize_navigation(services.start_page);
        }

        Self {
            services,
            status_message,
            applied_theme: None,
            _errors: errors,
        }
    }

    fn shell(&self) -> Option<&MainWindowViewModel> {
        self.services.shell.as_any().downcast_ref::<MainWindowViewModel>()
    }

    fn apply_theme(&mut self, ctx: &egui::Context) {
        let theme = self.services.themes.current();
        if self.applied_theme != Some(theme) {
            ctx.set_theme(theme_preference(theme));
            self.applied_theme = Some(theme);
        }
    }

    fn toggle_theme(&self) {
        let themes = Arc::clone(&self.services.themes);
        self.services.runtime.spawn(async move {
            if let Err(err) = themes.toggle_theme().await {
                error!(error = %err, "Failed to toggle theme");
            }
        });
    }

    fn apply_log_level(&self) {
        let level = self.services.log_level;
        match self.services.log.set_level(level) {
            Ok(()) => info!(%level, "Log level changed"),
            Err(err) => warn!(error = %err, "Failed to change log level"),
        }
    }

    fn run_action(&self, view: &PageView, action: PageAction) {
        let view_model = Arc::clone(&view.view_model);
        self.services.runtime.spawn(async move {
            let Some(settings) = view_model.as_any().downcast_ref::<SettingsViewModel>() else {
                return;
            };
            let result = match action {
                PageAction::SaveSettings => settings.save().await,
                PageAction::ResetSettings => {
                    settings.reset_section(crate::config::ConfigSection::All).await
                }
            };
            if let Err(err) = result {
                error!(error = %err, "Settings action failed");
            }
        });
    }

    fn navigation_panel(&self, ui: &mut egui::Ui) {
        let Some(shell) = self.shell() else {
            return;
        };
        ui.add_space(PADDING);
        ui.heading("Fake News Detector");
        ui.add_space(SECTION_SPACING);

        let current = shell.current_page();
        for page in PageType::ALL {
            if ui.selectable_label(current == page, page.title()).clicked() && current != page {
                let _ = shell.navigate(page.name());
            }
            ui.add_space(ITEM_SPACING);
        }

        ui.separator();
        let label = match self.services.themes.current() {
            Theme::Dark => "\u{2600} Light Mode",
            _ => "\u{1F319} Dark Mode",
        };
        if ui.button(label).clicked() {
            self.toggle_theme();
        }
    }

    fn page_body(&mut self, ui: &mut egui::Ui, view: &PageView) -> Option<PageAction> {
        match view.view {
            ViewKind::Home => {
                if let Some(vm) = view.view_model_as::<HomeViewModel>() {
                    pages::home(ui, vm);
                }
            }
            ViewKind::Detection => {
                if let Some(vm) = view.view_model_as::<DetectionViewModel>() {
                    pages::detection(ui, vm);
                }
            }
            ViewKind::Settings => {
                if let Some(vm) = view.view_model_as::<SettingsViewModel>() {
                    return pages::settings(ui, vm);
                }
            }
            ViewKind::History => {
                if let Some(vm) = view.view_model_as::<HistoryViewModel>() {
                    pages::history(ui, vm);
                }
            }
            ViewKind::Statistics => pages::statistics(ui),
            ViewKind::Test => {
                let changed = view
                    .view_model_as::<TestViewModel>()
                    .is_some_and(|vm| pages::tests(ui, vm, &mut self.services.log_level));
                if changed {
                    self.apply_log_level();
                }
            }
        }
        None
    }
}

impl eframe::App for DetectorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.services.ui_loop.run_pending();
        self.apply_theme(ctx);

        let show_status_bar = self
            .services
            .config
            .get_config()
            .map(|config| config.ui_settings.show_status_bar)
            .unwrap_or(true);
        if show_status_bar {
            egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
                match self.status_message.lock().as_ref() {
                    Some(message) => ui.colored_label(message.color, &message.text),
                    None => ui.label("Ready"),
                };
            });
        }

        egui::SidePanel::left("navigation")
            .exact_width(NAV_PANEL_WIDTH)
            .show(ctx, |ui| self.navigation_panel(ui));

        let content = self.services.host.content();
        let mut action = None;
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space(PADDING);
            ui.heading(self.services.navigation.current_title());
            ui.add_space(SECTION_SPACING);
            if let Some(view) = &content {
                action = self.page_body(ui, view);
            }
        });
        if let (Some(view), Some(action)) = (&content, action) {
            self.run_action(view, action);
        }

        ctx.request_repaint_after(Duration::from_millis(REPAINT_INTERVAL_MS));
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.services.config.stop_watching();
        info!("Main window exiting");
    }
}

pub fn run_gui(services: Services) -> Result<()> {
    let options = NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([WINDOW_WIDTH, WINDOW_HEIGHT])
            .with_min_inner_size([WINDOW_MIN_WIDTH, WINDOW_MIN_HEIGHT])
            .with_title("Fake News Detector"),
        ..Default::default()
    };

    eframe::run_native(
        "Fake News Detector",
        options,
        Box::new(move |cc| Ok(Box::new(DetectorApp::new(cc, services)))),
    )
    .map_err(|err| anyhow!("Failed to launch main window: {err}"))
}
