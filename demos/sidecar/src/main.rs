use std::path::PathBuf;
use std::process::ExitCode;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use warden::prelude::*;

// ---------------------------------------------------------------------------
// Console commands
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq)]
enum Command {
    ReloadApi,
    ReloadCache,
    Players(u32),
    Check(String),
    Status,
    Help,
    Stop,
}

impl Command {
    fn parse(line: &str) -> Result<Self, String> {
        let words: Vec<&str> = line.split_whitespace().collect();
        match words.as_slice() {
            ["reload", "allowlist", "api"] => Ok(Self::ReloadApi),
            ["reload", "allowlist", "cache"] => Ok(Self::ReloadCache),
            ["reload", "allowlist"] | ["reload", "allowlist", _] => {
                Err("usage: reload allowlist <api|cache>".into())
            }
            ["players", n] => n
                .parse()
                .map(Self::Players)
                .map_err(|_| format!("not a player count: {n}")),
            ["check", id] => Ok(Self::Check(id.to_string())),
            ["status"] => Ok(Self::Status),
            ["help"] | [] => Ok(Self::Help),
            ["stop"] | ["quit"] | ["exit"] => Ok(Self::Stop),
            _ => Err(format!("unknown command: {}", line.trim())),
        }
    }
}

const HELP: &[&str] = &[
    "reload allowlist api    fetch the allow-list from the authority now",
    "reload allowlist cache  reload the allow-list from the local cache file",
    "players <n>             set the player count sent with heartbeats",
    "check <identity>        run the join check for an identity",
    "status                  show server, heartbeat and allow-list state",
    "stop                    shut down",
];

async fn run(agent: &Agent, players: &AtomicPlayerCount, command: Command) {
    match command {
        Command::ReloadApi => {
            warn!("Calling the API too often may get this server rate limited.");
            match agent.refresh_allowlist().await {
                Ok(total) => info!(total, "allow-list reloaded from the API"),
                Err(e) => {
                    error!(error = %e, "allow-list reload failed");
                    warn!("{}", e.remediation());
                }
            }
        }
        Command::ReloadCache => {
            warn!("The cache will be overwritten on the next API refresh.");
            match agent.reload_allowlist() {
                Ok(total) => info!(total, "allow-list reloaded from the cache"),
                Err(e) => {
                    error!(error = %e, "allow-list reload failed");
                    warn!("{}", e.remediation());
                }
            }
        }
        Command::Players(n) => {
            players.set(n);
            info!(players = n, "player count updated");
        }
        Command::Check(identity) => match agent.check(&identity) {
            AccessDecision::Granted => info!(%identity, "join granted"),
            AccessDecision::Denied { kick_message } => {
                info!(%identity, %kick_message, "join denied, player kicked");
            }
        },
        Command::Status => {
            let profile = agent.profile();
            let metrics = agent.heartbeat_metrics();
            let allowlist = agent.allowlist_status();
            info!(
                server = %profile.name,
                visibility = profile.visibility(),
                players = profile.player_count,
                last_heartbeat = %profile.last_heartbeat_at,
                "server"
            );
            info!(
                state = %agent.heartbeat_state(),
                sent = metrics.sent,
                failed = metrics.failed,
                retry_delay = ?metrics.retry_delay,
                "heartbeat"
            );
            info!(
                restricted = allowlist.restricted,
                size = allowlist.size,
                source = %allowlist.source,
                loaded_at = %allowlist.loaded_at,
                refreshing = allowlist.refreshing,
                "allow-list"
            );
        }
        Command::Help => {
            for line in HELP {
                info!("{line}");
            }
        }
        Command::Stop => {}
    }
}

async fn console(agent: &Agent, players: &AtomicPlayerCount) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    info!("console ready, type `help` for commands");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) => match Command::parse(&line) {
                    Ok(Command::Stop) => break,
                    Ok(command) => run(agent, players, command).await,
                    Err(msg) => warn!("{msg}"),
                },
                Ok(None) => {
                    info!("console closed, running until Ctrl-C");
                    let _ = tokio::signal::ctrl_c().await;
                    break;
                }
                Err(e) => {
                    error!(error = %e, "failed to read console input");
                    break;
                }
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Bootstrap
// ---------------------------------------------------------------------------

fn fatal(err: WardenError) -> ExitCode {
    warden::banner::critical_error(&err);
    ExitCode::FAILURE
}

#[tokio::main]
async fn main() -> ExitCode {
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    let config = match AgentConfig::load_or_create(&path) {
        Ok(config) => config,
        Err(e) => {
            warden::logging::init(false);
            return fatal(e.into());
        }
    };
    warden::logging::init(config.server.debug);

    let players = AtomicPlayerCount::new(0);
    let agent = match Agent::builder(config)
        .players(PlayerCountSource::counter(players.clone()))
        .connect()
        .await
    {
        Ok(agent) => agent,
        Err(e) => return fatal(e),
    };
    if let Err(e) = agent.start().await {
        return fatal(e);
    }

    console(&agent, &players).await;
    agent.shutdown().await;
    ExitCode::SUCCESS
}
