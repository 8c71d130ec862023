use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};

use taskboard::analytics::detail::{AccountSelector, DetailMetric};
use taskboard::cli::{self, OutputFormat};
use taskboard::config::{self, TaskboardConfig};
use taskboard::filter::RangeToken;
use taskboard::logging;
use taskboard::poller::Poller;
use taskboard::views::Tab;
use taskboard::web;

#[derive(Debug, Parser)]
#[command(name = "taskboard")]
#[command(about = "Dashboard for background task executions")]
struct App {
    /// Dashboard endpoint (overrides config)
    #[arg(long, global = true)]
    endpoint: Option<String>,
    /// Read the dashboard payload from a JSON file instead of the endpoint
    #[arg(long, global = true)]
    file: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Summary, status, task types, top users, and the task table
    Overview {
        /// Time window: 24h, 7d, 30d, all (default from config)
        #[arg(long)]
        range: Option<String>,
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// TikTok tasks and API call volume
    Tiktok {
        /// Time window: 24h, 7d, 30d, all (default from config)
        #[arg(long)]
        range: Option<String>,
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Facebook tasks, batch health, and app usage
    Facebook {
        /// Time window: 24h, 7d, 30d, all (default from config)
        #[arg(long)]
        range: Option<String>,
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Per-batch, per-account breakdown of one task
    Task {
        job_id: String,
        /// Ad account id, or `all`
        #[arg(long, default_value = "all")]
        account: String,
        /// app_usage, insights_usage, eta, time_stats
        #[arg(long, default_value = "app_usage")]
        metric: String,
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Print the logs of one task
    Logs { job_id: String },
    /// Poll the endpoint and re-render a tab on every refresh
    Watch {
        /// overview, tiktok, facebook
        #[arg(long, default_value = "overview")]
        tab: String,
        /// Time window: 24h, 7d, 30d, all (default from config)
        #[arg(long)]
        range: Option<String>,
        /// Seconds between refreshes, at least 1 (default from config)
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        interval: Option<u64>,
    },
    /// Serve the web dashboard
    Serve {
        /// Bind address (default from config)
        #[arg(long)]
        addr: Option<String>,
        /// Do not open a browser
        #[arg(long)]
        no_open: bool,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Write the default config to ~/.taskboard/config.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Set a dotted key, e.g. `source.endpoint`
    Set { key: String, value: String },
    /// Reset ~/.taskboard/config.toml to defaults
    Reset,
}

fn resolve_range(cfg: &TaskboardConfig, raw: Option<&str>) -> Result<RangeToken> {
    match raw {
        Some(s) => s.parse(),
        None => Ok(cfg.dashboard.default_range),
    }
}

fn main() -> Result<()> {
    let app = App::parse();
    let cfg = config::load();
    let _log_guard = match logging::init(&cfg.logging) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("warning: file logging disabled: {e:#}");
            None
        }
    };

    let source = cli::build_source(&cfg, app.endpoint.as_deref(), app.file.as_deref());

    match app.command {
        Commands::Overview { range, format } => {
            let range = resolve_range(&cfg, range.as_deref())?;
            let fmt = OutputFormat::from_str_opt(Some(&format));
            cli::run_tab(source.as_ref(), &cfg, Tab::Overview, range, fmt)
        }
        Commands::Tiktok { range, format } => {
            let range = resolve_range(&cfg, range.as_deref())?;
            let fmt = OutputFormat::from_str_opt(Some(&format));
            cli::run_tab(source.as_ref(), &cfg, Tab::Tiktok, range, fmt)
        }
        Commands::Facebook { range, format } => {
            let range = resolve_range(&cfg, range.as_deref())?;
            let fmt = OutputFormat::from_str_opt(Some(&format));
            cli::run_tab(source.as_ref(), &cfg, Tab::Facebook, range, fmt)
        }
        Commands::Task {
            job_id,
            account,
            metric,
            format,
        } => {
            let account = AccountSelector::parse(Some(&account));
            let metric: DetailMetric = metric.parse()?;
            let fmt = OutputFormat::from_str_opt(Some(&format));
            cli::run_task(source.as_ref(), &job_id, &account, metric, fmt)
        }
        Commands::Logs { job_id } => cli::run_logs(source.as_ref(), &job_id),
        Commands::Watch {
            tab,
            range,
            interval,
        } => {
            let tab: Tab = tab.parse()?;
            let range = resolve_range(&cfg, range.as_deref())?;
            let secs = interval.unwrap_or(cfg.source.poll_interval_secs);
            cli::run_watch(source, &cfg, tab, range, Duration::from_secs(secs))
        }
        Commands::Serve { addr, no_open } => {
            let addr = addr.unwrap_or_else(|| cfg.web.addr.clone());
            let poller = Poller::new(
                source,
                Duration::from_secs(cfg.source.poll_interval_secs),
            );
            let state = web::AppState::new(poller, cfg.dashboard.clone());
            web::serve(&addr, state, cfg.web.open_browser && !no_open)
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => cli::run_config_show(),
            ConfigAction::Init { force } => cli::run_config_init(force),
            ConfigAction::Set { key, value } => cli::run_config_set(&key, &value),
            ConfigAction::Reset => cli::run_config_reset(),
        },
    }
}
