use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use url::Url;

use folio::app::{App, AppEvent};
use folio::browser::{FeedBrowser, LoadState, Presenter, Row};
use folio::config::Config;
use folio::fetch::{FetchError, HttpFetcher};
use folio::keybindings::KeybindingRegistry;
use folio::ui;
use folio::util::validate_url;

/// Get the config directory path (~/.config/folio/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("folio"))
}

#[derive(Parser, Debug)]
#[command(name = "folio", about = "Terminal browser for OPDS publication catalogs")]
struct Args {
    /// Catalog URL to open
    url: Option<String>,

    /// Open a catalog from the config file by name
    #[arg(long, short, value_name = "NAME", conflicts_with = "url")]
    catalog: Option<String>,

    /// Config file (default: ~/.config/folio/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the catalog layout and exit instead of starting the TUI
    #[arg(long)]
    dump: bool,
}

/// Picks the catalog to open: positional URL, `--catalog`, then `default_catalog`.
fn resolve_start_url(args: &Args, config: &Config) -> Result<Url> {
    let raw = match (&args.url, &args.catalog) {
        (Some(url), _) => url.clone(),
        (None, Some(name)) => config
            .catalog(name)
            .map(|c| c.url.clone())
            .with_context(|| format!("No catalog named '{}' in config", name))?,
        (None, None) => match &config.default_catalog {
            Some(name) => config
                .catalog(name)
                .map(|c| c.url.clone())
                .with_context(|| format!("default_catalog '{}' is not defined", name))?,
            None => bail!(
                "No catalog given. Pass a URL, use --catalog NAME, or set default_catalog in config.toml"
            ),
        },
    };

    let url = validate_url(&raw, config.host_policy())
        .with_context(|| format!("Cannot open catalog '{}'", raw))?;
    Ok(url)
}

/// Presenter for `--dump`: reports to stderr.
struct ConsolePresenter;

impl Presenter for ConsolePresenter {
    fn busy(&mut self, busy: bool) {
        if busy {
            eprintln!("Loading...");
        }
    }

    fn feed_ready(&mut self, browser: &FeedBrowser) {
        eprintln!("Loaded {} as {}", browser.current_url(), browser.mode().label());
    }

    fn load_failed(&mut self, url: &Url, error: &FetchError) {
        eprintln!("Failed to load {}: {}", url, error);
        if let Some(hint) = error.hint() {
            eprintln!("  hint: {}", hint);
        }
    }
}

fn dump(browser: &FeedBrowser) {
    println!("{}", browser.title());
    for section in 0..browser.section_count() {
        println!();
        if let Some(title) = browser.section_title(section) {
            println!("## {}", title);
        }
        for row in 0..browser.row_count(section) {
            match browser.row(section, row) {
                Some(Row::Navigation(entry)) => println!("  > {}", entry.title),
                Some(Row::Group(group)) => {
                    for publication in &group.publications {
                        println!("  - {}", publication.title);
                    }
                    for entry in &group.navigation {
                        println!("  > {}", entry.title);
                    }
                }
                Some(Row::Publications(pubs)) => {
                    for publication in pubs {
                        println!("  - {}", publication.title);
                    }
                }
                None => {}
            }
        }
    }
    if let Some(feed) = browser.feed() {
        for facet in &feed.facets {
            let options: Vec<&str> = facet
                .links
                .iter()
                .filter_map(|l| l.title.as_deref())
                .collect();
            println!("\nFilter {}: {}", facet.title, options.join(", "));
        }
    }
    if let Some(next) = browser.next_page() {
        println!("\nNext page: {}", next);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing for debug logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => {
            let config_dir = get_config_dir()?;
            if !config_dir.exists() {
                std::fs::create_dir_all(&config_dir)
                    .context("Failed to create config directory")?;
            }

            // SEC-007: Set directory permissions on Unix (user-only access)
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                match std::fs::metadata(&config_dir) {
                    Ok(metadata) => {
                        let mut perms = metadata.permissions();
                        perms.set_mode(0o700);
                        if let Err(e) = std::fs::set_permissions(&config_dir, perms) {
                            tracing::warn!(
                                path = %config_dir.display(),
                                error = %e,
                                "Failed to set config directory permissions to 0700"
                            );
                        }
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %config_dir.display(),
                            error = %e,
                            "Failed to read config directory metadata"
                        );
                    }
                }
            }
            config_dir.join("config.toml")
        }
    };

    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    tracing::debug!(config = ?config, "Loaded configuration");

    let start_url = resolve_start_url(&args, &config)?;

    let mut fetcher =
        HttpFetcher::new(config.fetch_settings()).context("Failed to create HTTP client")?;
    for credentials in config.credentials() {
        fetcher = fetcher.with_credentials(credentials);
    }

    if args.dump {
        let mut browser = FeedBrowser::new(start_url);
        browser.load(&fetcher, &mut ConsolePresenter).await;
        if let LoadState::Failed(e) = browser.load_state() {
            bail!("{}", e);
        }
        dump(&browser);
        return Ok(());
    }

    let mut keybindings = KeybindingRegistry::new();
    for warning in keybindings.apply_overrides(&config.keybindings) {
        tracing::warn!("{}", warning);
    }

    let mut app = App::new(start_url, Arc::new(fetcher), keybindings);

    // Create event channel for background tasks
    let (event_tx, event_rx) = mpsc::channel::<AppEvent>(32);

    // Run the TUI
    ui::run(&mut app, event_tx, event_rx).await?;

    Ok(())
}
