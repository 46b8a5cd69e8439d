//! Vmeet - follow-me layout replication and speaker stats
//!
//! `vmeet relay` runs the command-bus relay; `vmeet join` joins a conference
//! through it and reads slash commands from stdin.

use std::net::SocketAddr;
use std::path::PathBuf;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vmeet_core::speaker_stats::format_elapsed;
use vmeet_core::{Config, Role};
use vmeet_net::Server;

mod console;
mod error;
mod session;
mod state;

use console::{ConsoleCommand, HELP};
use error::{Error, Result};
use session::Session;

const USAGE: &str = "Usage: vmeet <relay|join> [--config PATH] [--name NAME] [--moderator]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Relay,
    Join,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Cli {
    mode: Mode,
    config: Option<PathBuf>,
    name: Option<String>,
    moderator: bool,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> std::result::Result<Cli, String> {
    let mode = match args.next().as_deref() {
        Some("relay") => Mode::Relay,
        Some("join") => Mode::Join,
        _ => return Err(USAGE.to_string()),
    };

    let mut cli = Cli {
        mode,
        config: std::env::var_os("VMEET_CONFIG").map(PathBuf::from),
        name: None,
        moderator: false,
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => cli.config = Some(args.next().ok_or(USAGE)?.into()),
            "--name" => cli.name = Some(args.next().ok_or(USAGE)?),
            "--moderator" => cli.moderator = true,
            _ => return Err(USAGE.to_string()),
        }
    }

    Ok(cli)
}

fn main() {
    let cli = match parse_args(std::env::args().skip(1)) {
        Ok(cli) => cli,
        Err(usage) => {
            eprintln!("{}", usage);
            std::process::exit(2);
        }
    };

    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(name) = cli.name {
        config.participant.display_name = name;
    }
    if cli.moderator {
        config.participant.role = Role::Moderator;
    }

    // RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_filter())),
        )
        .init();

    tracing::info!("Starting Vmeet");

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Failed to create tokio runtime: {}", e);
            std::process::exit(1);
        }
    };

    let result = runtime.block_on(async {
        match cli.mode {
            Mode::Relay => run_relay(&config).await,
            Mode::Join => run_join(&config).await,
        }
    });

    if let Err(e) = result {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

async fn relay_addr(config: &Config) -> Result<SocketAddr> {
    let host = config.relay.address.as_str();
    tokio::net::lookup_host((host, config.relay.port))
        .await
        .ok()
        .and_then(|mut addrs| addrs.next())
        .ok_or_else(|| Error::InvalidAddress(format!("{}:{}", host, config.relay.port)))
}

async fn run_relay(config: &Config) -> Result<()> {
    let addr = relay_addr(config).await?;
    let server = Server::start(
        addr,
        config.relay.token.clone(),
        config.relay.max_participants,
    )
    .await?;

    println!("Relay listening on {}", server.addr());

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to wait for Ctrl-C");
    }
    server.shutdown();
    Ok(())
}

async fn run_join(config: &Config) -> Result<()> {
    let addr = relay_addr(config).await?;
    let session = Session::join(addr, config).await?;

    println!("Joined as {} ({})", config.participant.display_name, session.local_id());
    println!("Type /help for commands");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = tokio::signal::ctrl_c() => break,
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read stdin");
                break;
            }
        };

        if session.is_finished() {
            println!("Session ended");
            break;
        }

        let pagination = session.state().layout().await.pagination;
        match console::parse_line(&line, &pagination) {
            Ok(ConsoleCommand::Action(action)) => session.act(action).await?,
            Ok(ConsoleCommand::Stats(query)) => print_stats(&session, query.as_deref()).await,
            Ok(ConsoleCommand::Who) => print_roster(&session).await,
            Ok(ConsoleCommand::Help) => println!("{}", HELP),
            Ok(ConsoleCommand::Quit) => break,
            Err(message) => println!("{}", message),
        }
    }

    session.leave().await;
    Ok(())
}

async fn print_stats(session: &Session, query: Option<&str>) {
    let report = session.state().speaker_stats_report().await;
    for row in report.search(query.unwrap_or("")) {
        let status = if row.has_left { "left" } else { "present" };
        println!(
            "{:<24} {:>9} {:<8} sessions={}",
            row.display_name,
            format_elapsed(row.elapsed_ms),
            status,
            row.sessions
        );
    }
}

async fn print_roster(session: &Session) {
    let roster = session.state().roster().await;
    let layout = session.state().layout().await;
    let follow_me = session.state().follow_me().await;
    let settings = session.state().settings().await;

    for participant in roster.participants() {
        let pinned = if roster.pinned() == Some(&participant.id) { " *" } else { "" };
        println!(
            "{} {} [{}]{}",
            participant.id, participant.display_name, participant.role, pinned
        );
    }
    println!(
        "page {}/{} tile={} filmstrip={} follow-me={} recording={}",
        layout.page.current,
        layout.page.total_pages,
        layout.tile_view_enabled,
        layout.filmstrip_visible,
        settings.follow_me_enabled,
        settings.recording
    );
    if let Some(moderator) = follow_me.moderator_id {
        println!("following {}", moderator);
    }
}
