#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{info, warn};

use fake_news_detector::config::{
    ConfigDocument, ConfigLayer, ConfigLevel, ConfigPaths, ConfigService, ConfigStorage, ConfigValidator,
    JsonFileStorage, RuleValidator, StoredLayer,
};
use fake_news_detector::dispatcher;
use fake_news_detector::events::EventBus;
use fake_news_detector::gui::{self, Services};
use fake_news_detector::logging;
use fake_news_detector::navigation::{
    ContentSlot, NavigationService, PageType, ViewModelContainer, ViewModelKind, ViewModelResolver,
};
use fake_news_detector::theme::ThemeService;
use fake_news_detector::viewmodels::{self, ViewModelDeps};

#[derive(Debug, Parser)]
#[command(name = "fake-news-detector", version, about = "Check news articles for credibility")]
struct Cli {
    /// trace, debug, info, warn or error; defaults to LOG_LEVEL or info
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Directory holding the user configuration file
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Directory holding the system configuration file
    #[arg(long)]
    system_config_dir: Option<PathBuf>,

    /// Theme for this run only (Light, Dark or System); not saved
    #[arg(long)]
    theme: Option<String>,

    /// Page shown when the window opens
    #[arg(long, default_value = "Home")]
    start_page: String,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    print_config: bool,

    /// Validate the stored configuration files without repairing them, then exit
    #[arg(long)]
    validate: bool,
}

impl Cli {
    fn config_paths(&self) -> ConfigPaths {
        let mut paths = ConfigPaths::default_locations();
        if let Some(dir) = &self.config_dir {
            paths = paths.with_user_dir(dir);
        }
        if let Some(dir) = &self.system_config_dir {
            paths = paths.with_system_dir(dir);
        }
        paths
    }
}

/// Check each persisted level as stored on disk; true when all are valid
fn validate_stored(storage: &dyn ConfigStorage, validator: &dyn ConfigValidator) -> Result<bool> {
    let mut all_valid = true;
    for level in ConfigLevel::PERSISTED {
        let layer = match storage.load(level)? {
            StoredLayer::Missing => {
                println!("{level}: no file, defaults apply");
                continue;
            }
            StoredLayer::Corrupt { reason } => {
                println!("{level}: unreadable document: {reason}");
                all_valid = false;
                continue;
            }
            StoredLayer::Parsed(layer) => layer,
        };
        let result = validator.validate(&layer.overlay_onto(ConfigDocument::default()));
        if result.is_valid() {
            println!("{level}: valid");
        } else {
            println!("{level}: invalid\n{result}");
            all_valid = false;
        }
    }
    Ok(all_valid)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = logging::parse_level(&cli.log_level);
    let log = logging::init(log_level)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let _guard = runtime.enter();

    let events = EventBus::new();
    let paths = cli.config_paths();
    info!(user = %paths.user.display(), system = %paths.system.display(), "Using configuration files");
    let storage = Arc::new(JsonFileStorage::new(paths));
    let validator = Arc::new(RuleValidator::new());

    if cli.validate {
        if !validate_stored(storage.as_ref(), validator.as_ref())? {
            bail!("Configuration is invalid");
        }
        return Ok(());
    }

    let config = Arc::new(ConfigService::new(storage, validator, events.clone()));
    runtime
        .block_on(config.load_config(None))
        .context("Failed to load configuration")?;

    if let Some(theme) = &cli.theme {
        let session = ConfigLayer {
            theme: Some(theme.clone()),
            ..Default::default()
        };
        runtime
            .block_on(config.update_layer(session, ConfigLevel::Session))
            .context("Failed to apply theme override")?;
    }

    if cli.print_config {
        let effective = config.get_config()?;
        println!("{}", serde_json::to_string_pretty(&effective)?);
        return Ok(());
    }

    if let Err(err) = config.start_watching() {
        warn!(error = %err, "Config file watching unavailable");
    }

    let start_page = cli.start_page.parse::<PageType>().unwrap_or_else(|_| {
        warn!(page = %cli.start_page, "Unknown start page, using Home");
        PageType::Home
    });

    let (ui_dispatcher, ui_loop) = dispatcher::channel();
    let container = Arc::new(ViewModelContainer::new());
    let navigation = Arc::new(NavigationService::new(
        Arc::clone(&container) as Arc<dyn ViewModelResolver>,
        ui_dispatcher.clone(),
        events.clone(),
    )?);
    viewmodels::register_defaults(
        &container,
        ViewModelDeps {
            events: events.clone(),
            config: Arc::clone(&config),
            navigation: navigation.requester(),
        },
    );
    let shell = container
        .resolve(ViewModelKind::Shell)
        .context("Failed to create main window view-model")?;
    let themes = Arc::new(ThemeService::new(Arc::clone(&config)));

    gui::run_gui(Services {
        runtime: runtime.handle().clone(),
        events,
        config: Arc::clone(&config),
        themes,
        navigation,
        shell,
        host: Arc::new(ContentSlot::new()),
        dispatcher: ui_dispatcher,
        ui_loop,
        start_page,
        log,
        log_level,
    })?;

    config.stop_watching();
    info!("Exiting");
    Ok(())
}
