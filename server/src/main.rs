use std::path::PathBuf;

use anyhow::{Context, Result};
use bzrflag_server::config::{GameConfig, TeamConfig};
use bzrflag_server::Server;
use clap::Parser;
use shared::world::World;
use shared::TeamColor;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Runs a BZRFlag game and serves one BZRC agent per team.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// World file describing boxes and team bases
    #[arg(short, long)]
    world: PathBuf,
    /// JSON game configuration
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Address to listen on
    #[arg(long)]
    host: Option<String>,
    /// Team port, e.g. `--port red:50100`; repeat for each team
    #[arg(long, value_parser = parse_team_port)]
    port: Vec<(TeamColor, u16)>,
    #[arg(long)]
    world_size: Option<f32>,
    /// Seconds until the game ends
    #[arg(long)]
    time_limit: Option<f64>,
    #[arg(long)]
    max_shots: Option<usize>,
    /// Tanks per team unless the config says otherwise
    #[arg(long)]
    default_tanks: Option<usize>,
    #[arg(long)]
    respawn_time: Option<f32>,
    #[arg(long)]
    friendly_fire: bool,
    #[arg(long)]
    no_report_obstacles: bool,
    /// Seed for all simulation randomness
    #[arg(long)]
    seed: Option<u64>,
    /// Log every protocol line
    #[arg(long)]
    debug: bool,
}

fn parse_team_port(s: &str) -> Result<(TeamColor, u16), String> {
    let (color, port) = s
        .split_once(':')
        .ok_or_else(|| format!("expected COLOR:PORT, got '{s}'"))?;
    let color = color.parse::<TeamColor>().map_err(|e| e.to_string())?;
    let port = port.parse::<u16>().map_err(|e| e.to_string())?;
    Ok((color, port))
}

impl Args {
    fn game_config(&self) -> Result<GameConfig> {
        let mut config = match &self.config {
            Some(path) => GameConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => GameConfig::default(),
        };
        if let Some(host) = &self.host {
            config.bind_host = host.clone();
        }
        for &(color, port) in &self.port {
            config.teams.entry(color).or_insert_with(TeamConfig::default).port = Some(port);
        }
        if let Some(size) = self.world_size {
            config.world_size = size;
        }
        if let Some(limit) = self.time_limit {
            config.time_limit = limit;
        }
        if let Some(max_shots) = self.max_shots {
            config.max_shots = max_shots;
        }
        if let Some(tanks) = self.default_tanks {
            config.default_tanks = tanks;
        }
        if let Some(respawn) = self.respawn_time {
            config.respawn_time = respawn;
        }
        if let Some(seed) = self.seed {
            config.random_seed = Some(seed);
        }
        config.friendly_fire |= self.friendly_fire;
        config.no_report_obstacles |= self.no_report_obstacles;
        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    let default_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config = args.game_config()?;
    let world = World::load(&args.world, config.world_size, config.world_size)
        .with_context(|| format!("loading world {}", args.world.display()))?;
    info!(
        world = %args.world.display(),
        obstacles = world.obstacles.len(),
        teams = world.bases.len(),
        "world loaded"
    );

    let server = Server::bind(config, world)
        .await
        .context("starting server")?;
    for (color, addr) in server.addresses() {
        println!("{color}: {addr}");
    }

    tokio::select! {
        result = server.run() => result.context("game loop failed")?,
        _ = tokio::signal::ctrl_c() => info!("received Ctrl+C, shutting down"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_team_port() {
        assert_eq!(parse_team_port("red:50100"), Ok((TeamColor::Red, 50100)));
        assert!(parse_team_port("red").is_err());
        assert!(parse_team_port("orange:1").is_err());
        assert!(parse_team_port("blue:99999").is_err());
    }

    #[test]
    fn test_overrides_apply_on_top_of_defaults() {
        let args = Args::parse_from([
            "bzrflag",
            "--world",
            "maps/four_ls.bzw",
            "--port",
            "blue:4100",
            "--friendly-fire",
            "--time-limit",
            "60",
            "--seed",
            "3",
        ]);
        let config = args.game_config().unwrap();
        assert!(config.friendly_fire);
        assert_eq!(config.time_limit, 60.0);
        assert_eq!(config.random_seed, Some(3));
        assert_eq!(config.team(TeamColor::Blue).port, 4100);
        assert_eq!(config.team(TeamColor::Red).port, 0);
    }
}
