//! PVEDash client - terminal dashboard for a Proxmox VE cluster
//!
//! Talks to the PVEDash proxy only:
//! - `watch`: polls on a fixed interval and redraws the VM table; filters,
//!   search and sort can be changed while it runs (see `commands`)
//! - `export`: one fetch, CSV of the filtered rows
//! - `hosts`: one fetch, node table

mod api;
mod commands;
mod config;
mod export;
mod format;
mod poller;
mod render;
mod view;

use anyhow::{Context, Result};
use api::ProxyClient;
use clap::{Args, Parser, Subcommand};
use commands::{parse_command, Command, ViewState};
use config::ClientConfig;
use poller::{DashboardState, Poller};
use pvedash_proxy::{LabelFilter, VmFilter};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use view::{Column, Direction, SortSpec, ViewFilter};

#[derive(Parser)]
#[command(name = "pvedash-client")]
#[command(about = "Terminal dashboard for Proxmox VE virtual machines", long_about = None)]
struct Cli {
    /// Proxy base URL (overrides config and PVEDASH_PROXY_URL)
    #[arg(long, global = true)]
    proxy_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Live VM table, refreshed on a fixed interval
    Watch {
        #[command(flatten)]
        view: ViewArgs,
        /// Seconds between polls
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Write the filtered VM rows as CSV
    Export {
        #[command(flatten)]
        view: ViewArgs,
        /// Output file (stdout when absent)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the cluster nodes
    Hosts,
}

#[derive(Args, Clone)]
struct ViewArgs {
    /// Only VMs on this node
    #[arg(long)]
    node: Option<String>,
    /// Only VMs in this status (running, stopped, ...)
    #[arg(long)]
    status: Option<String>,
    /// Only VMs carrying at least one of these tags (repeatable)
    #[arg(long = "tag")]
    tags: Vec<String>,
    /// Free-text search on name, ID or node
    #[arg(long, default_value = "")]
    search: String,
    /// Sort column
    #[arg(long, value_enum)]
    sort: Option<Column>,
    /// Sort descending
    #[arg(long, requires = "sort")]
    desc: bool,
}

impl ViewArgs {
    fn filter(&self) -> ViewFilter {
        ViewFilter {
            server: VmFilter {
                host: self.node.clone().filter(|n| !n.is_empty()),
                status: self.status.clone().filter(|s| !s.is_empty()),
                labels: LabelFilter::new(&self.tags),
            },
            search: self.search.clone(),
        }
    }

    fn sort(&self) -> Option<SortSpec> {
        self.sort.map(|column| SortSpec {
            column,
            direction: if self.desc { Direction::Desc } else { Direction::Asc },
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the dashboard and CSV, logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = ClientConfig::load().await.context("Failed to load client config")?;
    if let Some(url) = cli.proxy_url {
        config.proxy_url = url;
    }
    debug!("proxy: {}", config.proxy_url);

    let client = ProxyClient::new(
        &config.proxy_url,
        config.api_key.clone(),
        Duration::from_secs(config.request_timeout_secs),
    )
    .context("Failed to build HTTP client")?;

    match cli.command {
        Commands::Watch { view, interval } => {
            let period = Duration::from_secs(interval.unwrap_or(config.poll_interval_secs).max(1));
            run_watch(client, period, &view).await
        }
        Commands::Export { view, output } => run_export(client, &view, output).await,
        Commands::Hosts => {
            let hosts = client.fetch_hosts().await?;
            print!("{}", render::render_hosts(&hosts));
            Ok(())
        }
    }
}

async fn run_watch(client: ProxyClient, period: Duration, view: &ViewArgs) -> Result<()> {
    let mut view_state = ViewState { filter: view.filter(), sort: view.sort() };
    let mut message: Option<String> = None;

    let (tx, mut rx) = watch::channel(DashboardState::default());
    let (refresh_tx, refresh_rx) = mpsc::channel(1);
    let poller = tokio::spawn(Poller::new(client, period).run(tx, refresh_rx));

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut state = rx.borrow().clone();
    draw(&state, &view_state, message.as_deref())?;

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                state = rx.borrow_and_update().clone();
            }
            line = stdin.next_line(), if stdin_open => {
                let Some(line) = line? else {
                    stdin_open = false;
                    continue;
                };
                message = None;
                match parse_command(&line) {
                    Ok(Some(Command::Quit)) => break,
                    // a refresh already pending is enough
                    Ok(Some(Command::Refresh)) => { let _ = refresh_tx.try_send(()); }
                    Ok(Some(command)) => view_state.apply(&command),
                    Ok(None) => {}
                    Err(e) => message = Some(e.to_string()),
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
        // redraw from the current snapshot, no new fetch
        draw(&state, &view_state, message.as_deref())?;
    }

    drop(rx);
    poller.abort();
    info!("👋 bye");
    Ok(())
}

fn draw(state: &DashboardState, view: &ViewState, message: Option<&str>) -> Result<()> {
    let mut out = std::io::stdout().lock();
    // clear screen, cursor home
    write!(out, "\x1b[2J\x1b[H")?;
    write!(out, "{}", render::render_dashboard(state, &view.filter, view.sort))?;
    if let Some(message) = message {
        writeln!(out, "\n{message}")?;
    }
    writeln!(out, "\n{}", commands::HELP)?;
    out.flush()?;
    Ok(())
}

async fn run_export(client: ProxyClient, view: &ViewArgs, output: Option<PathBuf>) -> Result<()> {
    let filter = view.filter();
    let vms = client.fetch_vms(&filter.server).await?;
    let rows = view::visible_rows(&vms, &filter, view.sort());

    match output {
        Some(path) => {
            let mut file = std::fs::File::create(&path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            export::write_csv(&mut file, &rows)?;
            info!("📄 exported {} rows to {}", rows.len(), path.display());
        }
        None => {
            let mut out = std::io::stdout().lock();
            export::write_csv(&mut out, &rows)?;
        }
    }
    Ok(())
}
