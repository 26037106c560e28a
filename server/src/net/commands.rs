//! The BZRC command table.
//!
//! Each command maps to a plain handler function that parses its arguments,
//! acts on the [`Map`] and returns a [`Reply`]. The table is built once and
//! shared by every session.

use std::collections::HashMap;
use std::str::FromStr;

use shared::constants::{
    ANGULAR_ACCEL, DEAD_ZONE, EXPLODE_TIME, FLAG_RADIUS, LINEAR_ACCEL, SHOT_RADIUS, SHOT_RANGE,
    SHOT_SPEED, TANK_ALIVE, TANK_ANGVEL, TANK_DEAD, TANK_LENGTH, TANK_RADIUS, TANK_SPEED,
    TANK_WIDTH,
};
use shared::protocol::{
    Ack, BaseRecord, ConstantRecord, FlagRecord, MyTank, ObstacleRecord, OtherTank, ShotRecord,
    TeamRecord, TimerRecord, BEGIN, END, FAIL, OK,
};
use shared::{normalize_angle, TankStatus, Vec2};
use thiserror::Error;
use tracing::error;

use crate::game::{CommandError, Map};
use crate::occgrid::gauss;

pub const INVALID_COMMAND: &str = "fail invalid command";
pub const INVALID_PARAMETERS: &str = "fail Invalid parameter(s)";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("Invalid parameter(s)")]
    InvalidArgs,
    #[error(transparent)]
    Command(#[from] CommandError),
}

/// What a handler sends back after the `ack` line.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Ok,
    /// `fail`, with an optional reason.
    Fail(Option<String>),
    /// A single data line.
    Line(String),
    /// Data lines wrapped in `begin` / `end`.
    List(Vec<String>),
    /// `ok`, then the session closes.
    Quit,
}

impl Reply {
    fn boolean(ok: bool) -> Self {
        if ok {
            Reply::Ok
        } else {
            Reply::Fail(None)
        }
    }

    fn list<T: ToString>(items: impl IntoIterator<Item = T>) -> Self {
        Reply::List(items.into_iter().map(|i| i.to_string()).collect())
    }

    fn write_to(self, out: &mut Vec<String>) {
        match self {
            Reply::Ok | Reply::Quit => out.push(OK.to_string()),
            Reply::Fail(None) => out.push(FAIL.to_string()),
            Reply::Fail(Some(reason)) => out.push(format!("{FAIL} {reason}")),
            Reply::Line(line) => out.push(line),
            Reply::List(lines) => {
                out.push(BEGIN.to_string());
                out.extend(lines);
                out.push(END.to_string());
            }
        }
    }
}

/// A parsed command line, as seen by a handler.
pub struct Request<'a> {
    /// Index of the requesting team in the map.
    pub team: usize,
    /// Arguments after the command name.
    pub args: &'a [&'a str],
    pub table: &'a CommandTable,
}

impl Request<'_> {
    fn expect_args(&self, count: usize) -> Result<(), DispatchError> {
        if self.args.len() == count {
            Ok(())
        } else {
            Err(DispatchError::InvalidArgs)
        }
    }

    fn arg<T: FromStr>(&self, index: usize) -> Result<T, DispatchError> {
        self.args
            .get(index)
            .and_then(|a| a.parse().ok())
            .ok_or(DispatchError::InvalidArgs)
    }
}

pub type Handler = fn(&mut Map, &Request) -> Result<Reply, DispatchError>;

#[derive(Clone, Copy)]
pub struct CommandSpec {
    pub name: &'static str,
    pub usage: &'static str,
    pub handler: Handler,
}

/// Everything a dispatched line produced.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Response {
    pub lines: Vec<String>,
    pub close: bool,
}

pub struct CommandTable {
    commands: HashMap<&'static str, CommandSpec>,
}

impl CommandTable {
    pub fn standard() -> Self {
        let specs = [
            CommandSpec { name: "shoot", usage: "shoot [tankid]", handler: shoot },
            CommandSpec { name: "speed", usage: "speed [tankid] [speed]", handler: speed },
            CommandSpec { name: "angvel", usage: "angvel [tankid] [angular_velocity]", handler: angvel },
            CommandSpec { name: "mytanks", usage: "mytanks", handler: mytanks },
            CommandSpec { name: "othertanks", usage: "othertanks", handler: othertanks },
            CommandSpec { name: "flags", usage: "flags", handler: flags },
            CommandSpec { name: "shots", usage: "shots", handler: shots },
            CommandSpec { name: "obstacles", usage: "obstacles", handler: obstacles },
            CommandSpec { name: "bases", usage: "bases", handler: bases },
            CommandSpec { name: "teams", usage: "teams", handler: teams },
            CommandSpec { name: "constants", usage: "constants", handler: constants },
            CommandSpec { name: "timer", usage: "timer", handler: timer },
            CommandSpec { name: "occgrid", usage: "occgrid [tankid]", handler: occgrid },
            CommandSpec { name: "help", usage: "help [command]", handler: help },
            CommandSpec { name: "quit", usage: "quit", handler: quit },
        ];
        Self {
            commands: specs.into_iter().map(|s| (s.name, s)).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&CommandSpec> {
        self.commands.get(name)
    }

    /// Command specs sorted by name.
    pub fn specs(&self) -> Vec<&CommandSpec> {
        let mut specs: Vec<_> = self.commands.values().collect();
        specs.sort_by_key(|s| s.name);
        specs
    }

    /// Runs one established-session line for `team` and renders every line
    /// to send back. `tokens` must not be empty.
    pub fn dispatch(&self, map: &mut Map, team: usize, elapsed: f64, tokens: &[&str]) -> Response {
        let Some((name, args)) = tokens.split_first() else {
            return Response::default();
        };
        let Some(spec) = self.get(name) else {
            return Response {
                lines: vec![INVALID_COMMAND.to_string()],
                close: false,
            };
        };

        let mut lines = vec![Ack {
            elapsed,
            command: tokens.join(" "),
        }
        .to_string()];
        let request = Request { team, args, table: self };
        let reply = match (spec.handler)(map, &request) {
            Ok(reply) => reply,
            Err(DispatchError::InvalidArgs) => {
                lines.push(INVALID_PARAMETERS.to_string());
                return Response { lines, close: false };
            }
            Err(DispatchError::Command(err)) => {
                error!(team = %map.teams[team].color, command = spec.name, "{err}");
                Reply::Fail(Some(err.to_string()))
            }
        };
        let close = reply == Reply::Quit;
        reply.write_to(&mut lines);
        Response { lines, close }
    }
}

fn shoot(map: &mut Map, req: &Request) -> Result<Reply, DispatchError> {
    req.expect_args(1)?;
    let id: usize = req.arg(0)?;
    Ok(Reply::boolean(map.shoot(req.team, id)?))
}

fn speed(map: &mut Map, req: &Request) -> Result<Reply, DispatchError> {
    req.expect_args(2)?;
    map.teams[req.team].set_speed(req.arg(0)?, req.arg(1)?)?;
    Ok(Reply::Ok)
}

fn angvel(map: &mut Map, req: &Request) -> Result<Reply, DispatchError> {
    req.expect_args(2)?;
    map.teams[req.team].set_angvel(req.arg(0)?, req.arg(1)?)?;
    Ok(Reply::Ok)
}

fn mytanks(map: &mut Map, req: &Request) -> Result<Reply, DispatchError> {
    req.expect_args(0)?;
    let max_shots = map.config().max_shots;
    let records = map.teams[req.team]
        .tanks
        .iter()
        .enumerate()
        .map(|(index, tank)| MyTank {
            index,
            callsign: tank.callsign.clone(),
            status: tank.status,
            shots_left: max_shots.saturating_sub(tank.shots.len()),
            reload: tank.reload_timer,
            flag: tank.flag,
            pos: tank.pos.unwrap_or(Vec2::new(DEAD_ZONE, DEAD_ZONE)),
            angle: normalize_angle(tank.angle),
            vel: if tank.is_alive() {
                tank.velocity()
            } else {
                Vec2::default()
            },
            angvel: tank.angvel * TANK_ANGVEL,
        })
        .collect::<Vec<_>>();
    Ok(Reply::list(records))
}

fn othertanks(map: &mut Map, req: &Request) -> Result<Reply, DispatchError> {
    req.expect_args(0)?;
    let noise = map.teams[req.team].settings.noise;
    let observed = map
        .teams
        .iter()
        .enumerate()
        .filter(|(ti, _)| *ti != req.team)
        .flat_map(|(_, team)| {
            team.tanks
                .iter()
                .map(move |t| (t.callsign.clone(), team.color, t.status, t.flag, t.pos, t.angle))
        })
        .collect::<Vec<_>>();

    let rng = map.rng();
    let records = observed
        .into_iter()
        .map(|(callsign, color, status, flag, pos, angle)| {
            let (pos, angle) = match pos {
                Some(p) if status == TankStatus::Alive => (
                    Vec2::new(
                        gauss(rng, p.x, noise.posnoise),
                        gauss(rng, p.y, noise.posnoise),
                    ),
                    normalize_angle(gauss(rng, angle, noise.angnoise)),
                ),
                _ => (Vec2::new(DEAD_ZONE, DEAD_ZONE), normalize_angle(angle)),
            };
            OtherTank {
                callsign,
                color,
                status,
                flag,
                pos,
                angle,
            }
        })
        .collect::<Vec<_>>();
    Ok(Reply::list(records))
}

fn flags(map: &mut Map, req: &Request) -> Result<Reply, DispatchError> {
    req.expect_args(0)?;
    let posnoise = map.teams[req.team].settings.noise.posnoise;
    let flags = map
        .teams
        .iter()
        .map(|t| {
            let possessor = t.flag.carrier.map(|c| map.teams[c.team].color);
            (t.color, possessor, t.flag.pos)
        })
        .collect::<Vec<_>>();

    let rng = map.rng();
    let records = flags
        .into_iter()
        .map(|(color, possessor, pos)| FlagRecord {
            color,
            possessor,
            pos: Vec2::new(gauss(rng, pos.x, posnoise), gauss(rng, pos.y, posnoise)),
        })
        .collect::<Vec<_>>();
    Ok(Reply::list(records))
}

fn shots(map: &mut Map, req: &Request) -> Result<Reply, DispatchError> {
    req.expect_args(0)?;
    Ok(Reply::list(map.shots().map(|s| ShotRecord {
        pos: s.pos,
        vel: s.vel,
    })))
}

fn obstacles(map: &mut Map, req: &Request) -> Result<Reply, DispatchError> {
    req.expect_args(0)?;
    if map.config().no_report_obstacles {
        return Ok(Reply::Fail(None));
    }
    let posnoise = map.teams[req.team].settings.noise.posnoise;
    let shapes = map
        .world()
        .obstacles
        .iter()
        .map(|o| o.shape.clone())
        .collect::<Vec<_>>();

    let rng = map.rng();
    let records = shapes
        .into_iter()
        .map(|shape| ObstacleRecord {
            corners: shape
                .into_iter()
                .map(|p| Vec2::new(gauss(rng, p.x, posnoise), gauss(rng, p.y, posnoise)))
                .collect(),
        })
        .collect::<Vec<_>>();
    Ok(Reply::list(records))
}

fn bases(map: &mut Map, req: &Request) -> Result<Reply, DispatchError> {
    req.expect_args(0)?;
    Ok(Reply::list((0..map.teams.len()).map(|ti| {
        let base = map.base_of(ti);
        BaseRecord {
            color: base.color,
            corners: base.shape.clone(),
        }
    })))
}

fn teams(map: &mut Map, req: &Request) -> Result<Reply, DispatchError> {
    req.expect_args(0)?;
    Ok(Reply::list(map.teams.iter().map(|t| TeamRecord {
        color: t.color,
        tanks: t.tanks.len(),
    })))
}

fn constants(map: &mut Map, req: &Request) -> Result<Reply, DispatchError> {
    req.expect_args(0)?;
    let config = map.config();
    let team = &map.teams[req.team];
    Ok(Reply::list([
        ConstantRecord::new("team", team.color),
        ConstantRecord::new("worldsize", config.world_size),
        ConstantRecord::new("hoverbot", 0),
        ConstantRecord::new("puppyzone", config.puppy_guard_zone),
        ConstantRecord::new("tankangvel", TANK_ANGVEL),
        ConstantRecord::new("tanklength", TANK_LENGTH),
        ConstantRecord::new("tankradius", TANK_RADIUS),
        ConstantRecord::new("tankspeed", TANK_SPEED),
        ConstantRecord::new("tankalive", TANK_ALIVE),
        ConstantRecord::new("tankdead", TANK_DEAD),
        ConstantRecord::new("linearaccel", LINEAR_ACCEL),
        ConstantRecord::new("angularaccel", ANGULAR_ACCEL),
        ConstantRecord::new("tankwidth", TANK_WIDTH),
        ConstantRecord::new("shotradius", SHOT_RADIUS),
        ConstantRecord::new("shotrange", SHOT_RANGE),
        ConstantRecord::new("shotspeed", SHOT_SPEED),
        ConstantRecord::new("flagradius", FLAG_RADIUS),
        ConstantRecord::new("explodetime", EXPLODE_TIME),
        ConstantRecord::new("truepositive", team.settings.true_positive),
        ConstantRecord::new("truenegative", team.settings.true_negative),
    ]))
}

fn timer(map: &mut Map, req: &Request) -> Result<Reply, DispatchError> {
    req.expect_args(0)?;
    Ok(Reply::Line(
        TimerRecord {
            elapsed: map.time_spent(),
            limit: map.time_limit(),
        }
        .to_string(),
    ))
}

fn occgrid(map: &mut Map, req: &Request) -> Result<Reply, DispatchError> {
    req.expect_args(1)?;
    let id: usize = req.arg(0)?;
    if map.occgrid().is_none() {
        return Err(CommandError::OccgridUnavailable.into());
    }
    let team = &map.teams[req.team];
    let Some(pos) = team.tank(id)?.pos else {
        return Err(CommandError::TankDead.into());
    };
    let (tp, tn) = (team.settings.true_positive, team.settings.true_negative);
    let reading = map
        .sample_occgrid(pos, tp, tn)
        .ok_or(CommandError::OccgridUnavailable)?;
    Ok(Reply::List(reading.lines()))
}

fn help(_map: &mut Map, req: &Request) -> Result<Reply, DispatchError> {
    let line = |spec: &CommandSpec| format!("help {} {}", spec.name, spec.usage);
    match req.args {
        [] => Ok(Reply::List(req.table.specs().into_iter().map(line).collect())),
        [name] => Ok(match req.table.get(name) {
            Some(spec) => Reply::Line(line(spec)),
            None => Reply::Fail(Some("invalid command".to_string())),
        }),
        _ => Err(DispatchError::InvalidArgs),
    }
}

fn quit(_map: &mut Map, req: &Request) -> Result<Reply, DispatchError> {
    req.expect_args(0)?;
    Ok(Reply::Quit)
}
