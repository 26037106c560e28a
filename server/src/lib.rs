//! BZRFlag server: the tank simulation and the BZRC protocol server that
//! lets one agent per team drive it.

pub mod config;
pub mod game;
pub mod net;
pub mod occgrid;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use shared::world::World;
use shared::TeamColor;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::config::GameConfig;
use crate::game::{Map, SimError};
use crate::net::{CommandTable, SharedMap, TeamListener};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Sim(#[from] SimError),
    #[error("failed to listen for team {color}: {source}")]
    Bind {
        color: TeamColor,
        #[source]
        source: io::Error,
    },
}

/// A bound server: the map plus one listening socket per team.
pub struct Server {
    map: SharedMap,
    listeners: Vec<TeamListener>,
    tick: Duration,
}

impl Server {
    pub async fn bind(config: GameConfig, world: World) -> Result<Self, ServerError> {
        let config = Arc::new(config);
        let map = Map::new(Arc::clone(&config), world)?;

        let mut listeners = Vec::with_capacity(map.teams.len());
        for (index, team) in map.teams.iter().enumerate() {
            let listener = TeamListener::bind(&config.bind_host, team.settings.port, index, team.color)
                .await
                .map_err(|source| ServerError::Bind {
                    color: team.color,
                    source,
                })?;
            listeners.push(listener);
        }

        Ok(Self {
            map: Arc::new(Mutex::new(map)),
            listeners,
            tick: Duration::from_millis(config.loop_timeout_ms),
        })
    }

    /// Bound address of every team, in team order.
    pub fn addresses(&self) -> Vec<(TeamColor, SocketAddr)> {
        self.listeners
            .iter()
            .filter_map(|l| l.local_addr().ok().map(|addr| (l.color, addr)))
            .collect()
    }

    pub fn map(&self) -> SharedMap {
        Arc::clone(&self.map)
    }

    /// Accepts agents and advances the game until the time limit runs out.
    pub async fn run(self) -> Result<(), ServerError> {
        let table = Arc::new(CommandTable::standard());
        for listener in self.listeners {
            let map = Arc::clone(&self.map);
            let table = Arc::clone(&table);
            let color = listener.color;
            tokio::spawn(async move {
                if let Err(err) = listener.run(map, table).await {
                    error!(team = %color, "listener stopped: {err}");
                }
            });
        }
        run_game_loop(self.map, self.tick).await
    }
}

async fn run_game_loop(map: SharedMap, tick: Duration) -> Result<(), ServerError> {
    let mut ticker = interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last_update = Instant::now();

    loop {
        ticker.tick().await;
        let now = Instant::now();
        let dt = (now - last_update).as_secs_f32();
        last_update = now;

        let mut map = map.lock().await;
        map.update(dt)?;
        for entity in map.drain_created() {
            debug!(?entity, "created");
        }
        for entity in map.drain_destroyed() {
            debug!(?entity, "destroyed");
        }

        if map.is_over() {
            info!(elapsed = map.time_spent(), "time limit reached, game over");
            for team in &map.teams {
                info!(
                    team = %team.color,
                    score = team.score.total(),
                    captures = team.score.captures(),
                    "final score"
                );
            }
            return Ok(());
        }
    }
}
