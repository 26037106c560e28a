//! The authoritative simulation: teams, tanks, shots, flags and scores on a
//! static world, advanced one tick at a time by [`Map::update`].

pub mod flag;
pub mod score;
pub mod shot;
pub mod tank;
pub mod team;

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::constants::{
    CARRY_BASE, PROXIMITY_MAX, RESPAWN_TRIES, SHOT_RADIUS, TANK_RADIUS,
};
use shared::geometry::{circle_to_circle, circle_to_polygon, Circle};
use shared::world::{Base, World};
use shared::{TankStatus, TeamColor, Vec2};
use thiserror::Error;
use tracing::debug;

use crate::config::GameConfig;
use crate::occgrid::{GridReading, OccGrid};

pub use flag::Flag;
pub use score::Score;
pub use shot::{Shot, ShotStatus};
pub use tank::Tank;
pub use team::Team;

/// Non-owning handle to a tank: team index and tank index within the team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TankRef {
    pub team: usize,
    pub tank: usize,
}

/// Something that appeared on or vanished from the map, for observers.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Tank(TankRef),
    /// A shot, identified by its owner.
    Shot(TankRef),
    Flag(TeamColor),
    Base(TeamColor),
    Score(TeamColor),
}

#[derive(Debug, Error)]
pub enum SimError {
    #[error("no workable spawning spots found for team {0}")]
    NoSpawnPoint(TeamColor),
    #[error("world defines no team bases")]
    NoTeams,
}

/// Failures of agent commands; reported to the client as `fail <message>`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Invalid tank ID: {0}")]
    InvalidTank(usize),
    #[error("not a number")]
    NotANumber,
    #[error("tank is dead")]
    TankDead,
    #[error("occgrid not currently compatible with rotated obstacles")]
    OccgridUnavailable,
}

pub struct Map {
    config: Arc<GameConfig>,
    world: World,
    pub teams: Vec<Team>,
    occgrid: Option<OccGrid>,
    time_spent: f64,
    end_game: bool,
    created: Vec<Entity>,
    destroyed: Vec<Entity>,
    rng: StdRng,
}

impl Map {
    /// Builds one team per base in the world and spawns every tank.
    pub fn new(config: Arc<GameConfig>, world: World) -> Result<Self, SimError> {
        if world.bases.is_empty() {
            return Err(SimError::NoTeams);
        }
        let rng = match config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut order: Vec<usize> = (0..world.bases.len()).collect();
        order.sort_by_key(|&i| world.bases[i].color);
        let teams = order
            .into_iter()
            .map(|i| {
                let base = &world.bases[i];
                Team::new(i, base, config.team(base.color), &world.obstacles)
            })
            .collect::<Vec<_>>();

        let mut created = Vec::new();
        for (ti, team) in teams.iter().enumerate() {
            created.extend((0..team.tanks.len()).map(|k| Entity::Tank(TankRef { team: ti, tank: k })));
            created.push(Entity::Base(team.color));
            created.push(Entity::Flag(team.color));
            created.push(Entity::Score(team.color));
        }

        let mut map = Self {
            occgrid: OccGrid::build(&world),
            config,
            world,
            teams,
            time_spent: 0.0,
            end_game: false,
            created,
            destroyed: Vec::new(),
            rng,
        };
        for r in map.tank_refs().collect::<Vec<_>>() {
            map.respawn(r)?;
        }
        Ok(map)
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn occgrid(&self) -> Option<&OccGrid> {
        self.occgrid.as_ref()
    }

    /// Noisy occupancy window of `occgrid_width` cells around `center`.
    pub fn sample_occgrid(
        &mut self,
        center: Vec2,
        true_positive: f32,
        true_negative: f32,
    ) -> Option<GridReading> {
        let window = self.config.occgrid_width;
        let grid = self.occgrid.as_ref()?;
        Some(grid.sample(center, window, true_positive, true_negative, &mut self.rng))
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    pub fn time_spent(&self) -> f64 {
        self.time_spent
    }

    pub fn time_limit(&self) -> f64 {
        self.config.time_limit
    }

    pub fn is_over(&self) -> bool {
        self.end_game
    }

    pub fn team_index(&self, color: TeamColor) -> Option<usize> {
        self.teams.iter().position(|t| t.color == color)
    }

    pub fn base_of(&self, team: usize) -> &Base {
        &self.world.bases[self.teams[team].base]
    }

    pub fn tank(&self, r: TankRef) -> &Tank {
        &self.teams[r.team].tanks[r.tank]
    }

    pub fn tank_mut(&mut self, r: TankRef) -> &mut Tank {
        &mut self.teams[r.team].tanks[r.tank]
    }

    pub fn tank_refs(&self) -> impl Iterator<Item = TankRef> + '_ {
        self.teams.iter().enumerate().flat_map(|(ti, team)| {
            (0..team.tanks.len()).map(move |k| TankRef { team: ti, tank: k })
        })
    }

    pub(crate) fn live_tank_circles(&self) -> impl Iterator<Item = (TankRef, Circle)> + '_ {
        self.tank_refs()
            .filter_map(|r| self.tank(r).circle().map(|c| (r, c)))
    }

    pub fn shots(&self) -> impl Iterator<Item = &Shot> + '_ {
        self.teams
            .iter()
            .flat_map(|t| t.tanks.iter())
            .flat_map(|t| t.shots.iter())
    }

    pub fn drain_created(&mut self) -> Vec<Entity> {
        std::mem::take(&mut self.created)
    }

    pub fn drain_destroyed(&mut self) -> Vec<Entity> {
        std::mem::take(&mut self.destroyed)
    }

    /// Fires a shot from the given tank. `Ok(false)` means the tank is
    /// reloading, at its shot limit, or dead.
    pub fn shoot(&mut self, team: usize, tank: usize) -> Result<bool, CommandError> {
        let owner = TankRef { team, tank };
        let max_shots = self.config.max_shots;
        let fired = self.teams[team].tank_mut(tank)?.shoot(owner, max_shots);
        if fired {
            self.created.push(Entity::Shot(owner));
        }
        Ok(fired)
    }

    /// Advances the whole game by `dt` seconds.
    pub fn update(&mut self, dt: f32) -> Result<(), SimError> {
        if self.end_game {
            return Ok(());
        }
        self.time_spent += f64::from(dt);
        if self.time_spent > self.config.time_limit {
            self.end_game = true;
            return Ok(());
        }
        for r in self.tank_refs().collect::<Vec<_>>() {
            self.update_tank(r, dt)?;
        }
        // carried flags follow carriers that have already moved this tick
        for ti in 0..self.teams.len() {
            self.update_flag(ti);
        }
        for ti in 0..self.teams.len() {
            if self.teams[ti].score.tick(dt) {
                for k in 0..self.teams[ti].tanks.len() {
                    self.score_tank(TankRef { team: ti, tank: k });
                }
            }
        }
        Ok(())
    }

    fn update_tank(&mut self, r: TankRef, dt: f32) -> Result<(), SimError> {
        self.update_shots(r, dt);

        let tank = self.tank_mut(r);
        if !tank.is_alive() {
            tank.dead_timer -= dt;
            if tank.dead_timer <= 0.0 {
                self.respawn(r)?;
            }
            return Ok(());
        }
        tank.tick_reload(dt);
        tank.update_goals(dt);

        let Some(pos) = tank.pos else {
            return Ok(());
        };
        let step = tank.velocity().scale(dt);
        let candidates = [
            pos.add(step),
            Vec2::new(pos.x, pos.y + step.y),
            Vec2::new(pos.x + step.x, pos.y),
        ];
        if let Some(next) = candidates.into_iter().find(|c| !self.blocked(r, *c)) {
            self.tank_mut(r).pos = Some(next);
        }
        Ok(())
    }

    /// True if a tank of `r` placed at `pos` would hit an obstacle, another
    /// tank, or the arena edge.
    fn blocked(&self, r: TankRef, pos: Vec2) -> bool {
        let body = Circle::new(pos, TANK_RADIUS);
        self.world
            .obstacles
            .iter()
            .any(|o| circle_to_polygon(body, &o.shape))
            || self
                .live_tank_circles()
                .any(|(other, c)| other != r && circle_to_circle(body, c))
            || self.world.out_of_bounds(body)
    }

    fn spawn_clear(&self, team: usize, pos: Vec2) -> bool {
        let body = Circle::new(pos, TANK_RADIUS);
        let obstacles = &self.world.obstacles;
        !(self.teams[team]
            .nearby_obstacles()
            .iter()
            .any(|&i| circle_to_polygon(body, &obstacles[i].shape))
            || self
                .shots()
                .any(|s| circle_to_circle(body, Circle::new(s.pos, SHOT_RADIUS)))
            || self.live_tank_circles().any(|(_, c)| circle_to_circle(body, c))
            || self.world.out_of_bounds(body))
    }

    fn respawn(&mut self, r: TankRef) -> Result<(), SimError> {
        let center = self.base_of(r.team).center;
        for _ in 0..RESPAWN_TRIES {
            let candidate = self.teams[r.team].spawn_candidate(center, &mut self.rng);
            if self.spawn_clear(r.team, candidate) {
                let heading = self.rng.gen_range(0.0..std::f32::consts::TAU);
                let tank = self.tank_mut(r);
                tank.reset_motion();
                tank.angle = heading;
                tank.pos = Some(candidate);
                tank.status = TankStatus::Alive;
                debug!(callsign = %tank.callsign, x = candidate.x, y = candidate.y, "tank spawned");
                return Ok(());
            }
        }
        Err(SimError::NoSpawnPoint(self.teams[r.team].color))
    }

    /// Kills a tank: scores it one last time, drops any carried flag where it
    /// stands, and destroys its shots.
    pub fn kill_tank(&mut self, r: TankRef) {
        if !self.tank(r).is_alive() {
            return;
        }
        self.score_tank(r);
        let carried = self.tank(r).flag.and_then(|c| self.team_index(c));
        if let Some(flag_team) = carried {
            self.drop_flag(flag_team);
        }

        let respawn_time = self.config.respawn_time;
        let tank = self.tank_mut(r);
        debug!(callsign = %tank.callsign, "tank killed");
        let lost_shots = tank.shots.len();
        tank.shots.clear();
        tank.flag = None;
        tank.status = TankStatus::Dead;
        tank.dead_timer = respawn_time;
        tank.pos = None;
        self.destroyed
            .extend(std::iter::repeat(Entity::Shot(r)).take(lost_shots));
    }

    /// Offers the tank's current proximity score to its team.
    fn score_tank(&mut self, r: TankRef) {
        let Some(pos) = self.tank(r).pos else {
            return;
        };
        let own_base = self.base_of(r.team).center;

        let carried = self.tank(r).flag.and_then(|c| self.team_index(c));
        let candidate = match carried {
            Some(enemy) => {
                let d_bases = own_base.distance(self.base_of(enemy).center);
                let d_back = pos.distance(own_base);
                let progress = if d_back > d_bases || d_bases == 0.0 {
                    0.0
                } else {
                    PROXIMITY_MAX * (d_bases - d_back) / d_bases
                };
                Some(CARRY_BASE + progress)
            }
            None => self
                .teams
                .iter()
                .enumerate()
                .filter(|(ti, _)| *ti != r.team)
                .map(|(ti, _)| self.base_of(ti).center)
                .min_by(|a, b| pos.distance(*a).total_cmp(&pos.distance(*b)))
                .and_then(|enemy_base| {
                    let d_total = own_base.distance(enemy_base);
                    let d_to = pos.distance(enemy_base);
                    (d_to <= d_total && d_total > 0.0)
                        .then(|| PROXIMITY_MAX * (d_total - d_to) / d_total)
                }),
        };
        if let Some(value) = candidate {
            self.teams[r.team].score.offer(value);
        }
    }
}

#[cfg(test)]
mod tests;
