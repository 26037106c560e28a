//! Line records of the BZRC protocol.
//!
//! Every exchange is newline-terminated ASCII. After the greeting and the
//! agent's handshake, each command receives an `ack` line followed by either
//! `ok`, `fail [reason]`, a single data line, or a `begin` ... `end` list of
//! data lines. The types here render (`Display`) and parse (`FromStr`) the
//! individual data lines so the server and client agree on one format.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::{TankStatus, TeamColor, Vec2};

pub const SERVER_GREETING: &str = "bzrobots 1";
pub const AGENT_HANDSHAKE: &str = "agent 1";

pub const OK: &str = "ok";
pub const FAIL: &str = "fail";
pub const BEGIN: &str = "begin";
pub const END: &str = "end";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed {kind} line: '{line}'")]
pub struct RecordError {
    pub kind: &'static str,
    pub line: String,
}

fn fields<'a>(line: &'a str, tag: &'static str) -> Result<Vec<&'a str>, RecordError> {
    let mut tokens = line.split_whitespace();
    if tokens.next() != Some(tag) {
        return Err(malformed(tag, line));
    }
    Ok(tokens.collect())
}

fn malformed(kind: &'static str, line: &str) -> RecordError {
    RecordError {
        kind,
        line: line.to_string(),
    }
}

fn num<T: FromStr>(kind: &'static str, line: &str, token: &str) -> Result<T, RecordError> {
    token.parse().map_err(|_| malformed(kind, line))
}

fn color(kind: &'static str, line: &str, token: &str) -> Result<TeamColor, RecordError> {
    token.parse().map_err(|_| malformed(kind, line))
}

/// `-` or `none` mean nobody.
fn optional_color(kind: &'static str, line: &str, token: &str) -> Result<Option<TeamColor>, RecordError> {
    match token {
        "-" | "none" => Ok(None),
        other => color(kind, line, other).map(Some),
    }
}

fn points(kind: &'static str, line: &str, tokens: &[&str]) -> Result<Vec<Vec2>, RecordError> {
    if tokens.len() % 2 != 0 {
        return Err(malformed(kind, line));
    }
    tokens
        .chunks(2)
        .map(|pair| Ok(Vec2::new(num(kind, line, pair[0])?, num(kind, line, pair[1])?)))
        .collect()
}

fn write_points(f: &mut fmt::Formatter<'_>, points: &[Vec2]) -> fmt::Result {
    for p in points {
        write!(f, " {} {}", p.x, p.y)?;
    }
    Ok(())
}

/// `ack <seconds since connect> <echoed command>`
#[derive(Debug, Clone, PartialEq)]
pub struct Ack {
    pub elapsed: f64,
    pub command: String,
}

impl fmt::Display for Ack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ack {} {}", self.elapsed, self.command)
    }
}

impl FromStr for Ack {
    type Err = RecordError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let tokens = fields(line, "ack")?;
        let (elapsed, command) = tokens.split_first().ok_or_else(|| malformed("ack", line))?;
        Ok(Ack {
            elapsed: num("ack", line, elapsed)?,
            command: command.join(" "),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MyTank {
    pub index: usize,
    pub callsign: String,
    pub status: TankStatus,
    pub shots_left: usize,
    pub reload: f32,
    pub flag: Option<TeamColor>,
    pub pos: Vec2,
    pub angle: f32,
    pub vel: Vec2,
    pub angvel: f32,
}

impl fmt::Display for MyTank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "mytank {} {} {} {} {} {} {} {} {} {} {} {}",
            self.index,
            self.callsign,
            self.status,
            self.shots_left,
            self.reload,
            self.flag.map_or("-", TeamColor::as_str),
            self.pos.x as i64,
            self.pos.y as i64,
            self.angle,
            self.vel.x,
            self.vel.y,
            self.angvel,
        )
    }
}

impl FromStr for MyTank {
    type Err = RecordError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        const KIND: &str = "mytank";
        let t = fields(line, KIND)?;
        if t.len() != 12 {
            return Err(malformed(KIND, line));
        }
        Ok(MyTank {
            index: num(KIND, line, t[0])?,
            callsign: t[1].to_string(),
            status: t[2].parse().map_err(|_| malformed(KIND, line))?,
            shots_left: num(KIND, line, t[3])?,
            reload: num(KIND, line, t[4])?,
            flag: optional_color(KIND, line, t[5])?,
            pos: Vec2::new(num(KIND, line, t[6])?, num(KIND, line, t[7])?),
            angle: num(KIND, line, t[8])?,
            vel: Vec2::new(num(KIND, line, t[9])?, num(KIND, line, t[10])?),
            angvel: num(KIND, line, t[11])?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OtherTank {
    pub callsign: String,
    pub color: TeamColor,
    pub status: TankStatus,
    pub flag: Option<TeamColor>,
    pub pos: Vec2,
    pub angle: f32,
}

impl fmt::Display for OtherTank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "othertank {} {} {} {} {} {} {}",
            self.callsign,
            self.color,
            self.status,
            self.flag.map_or("-", TeamColor::as_str),
            self.pos.x,
            self.pos.y,
            self.angle,
        )
    }
}

impl FromStr for OtherTank {
    type Err = RecordError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        const KIND: &str = "othertank";
        let t = fields(line, KIND)?;
        if t.len() != 7 {
            return Err(malformed(KIND, line));
        }
        Ok(OtherTank {
            callsign: t[0].to_string(),
            color: color(KIND, line, t[1])?,
            status: t[2].parse().map_err(|_| malformed(KIND, line))?,
            flag: optional_color(KIND, line, t[3])?,
            pos: Vec2::new(num(KIND, line, t[4])?, num(KIND, line, t[5])?),
            angle: num(KIND, line, t[6])?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlagRecord {
    pub color: TeamColor,
    pub possessor: Option<TeamColor>,
    pub pos: Vec2,
}

impl fmt::Display for FlagRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "flag {} {} {} {}",
            self.color,
            self.possessor.map_or("none", TeamColor::as_str),
            self.pos.x,
            self.pos.y,
        )
    }
}

impl FromStr for FlagRecord {
    type Err = RecordError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        const KIND: &str = "flag";
        let t = fields(line, KIND)?;
        if t.len() != 4 {
            return Err(malformed(KIND, line));
        }
        Ok(FlagRecord {
            color: color(KIND, line, t[0])?,
            possessor: optional_color(KIND, line, t[1])?,
            pos: Vec2::new(num(KIND, line, t[2])?, num(KIND, line, t[3])?),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShotRecord {
    pub pos: Vec2,
    pub vel: Vec2,
}

impl fmt::Display for ShotRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "shot {} {} {} {}",
            self.pos.x, self.pos.y, self.vel.x, self.vel.y
        )
    }
}

impl FromStr for ShotRecord {
    type Err = RecordError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        const KIND: &str = "shot";
        let t = fields(line, KIND)?;
        match points(KIND, line, &t)?.as_slice() {
            [pos, vel] => Ok(ShotRecord {
                pos: *pos,
                vel: *vel,
            }),
            _ => Err(malformed(KIND, line)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObstacleRecord {
    pub corners: Vec<Vec2>,
}

impl fmt::Display for ObstacleRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("obstacle")?;
        write_points(f, &self.corners)
    }
}

impl FromStr for ObstacleRecord {
    type Err = RecordError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let t = fields(line, "obstacle")?;
        Ok(ObstacleRecord {
            corners: points("obstacle", line, &t)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BaseRecord {
    pub color: TeamColor,
    pub corners: Vec<Vec2>,
}

impl fmt::Display for BaseRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "base {}", self.color)?;
        write_points(f, &self.corners)
    }
}

impl FromStr for BaseRecord {
    type Err = RecordError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        const KIND: &str = "base";
        let t = fields(line, KIND)?;
        let (c, rest) = t.split_first().ok_or_else(|| malformed(KIND, line))?;
        Ok(BaseRecord {
            color: color(KIND, line, c)?,
            corners: points(KIND, line, rest)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstantRecord {
    pub name: String,
    pub value: String,
}

impl ConstantRecord {
    pub fn new(name: &str, value: impl fmt::Display) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
        }
    }
}

impl fmt::Display for ConstantRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "constant {} {}", self.name, self.value)
    }
}

impl FromStr for ConstantRecord {
    type Err = RecordError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        match fields(line, "constant")?.as_slice() {
            [name, value] => Ok(ConstantRecord::new(name, value)),
            _ => Err(malformed("constant", line)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TeamRecord {
    pub color: TeamColor,
    pub tanks: usize,
}

impl fmt::Display for TeamRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "team {} {}", self.color, self.tanks)
    }
}

impl FromStr for TeamRecord {
    type Err = RecordError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        match fields(line, "team")?.as_slice() {
            [c, n] => Ok(TeamRecord {
                color: color("team", line, c)?,
                tanks: num("team", line, n)?,
            }),
            _ => Err(malformed("team", line)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimerRecord {
    pub elapsed: f64,
    pub limit: f64,
}

impl fmt::Display for TimerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer {} {}", self.elapsed, self.limit)
    }
}

impl FromStr for TimerRecord {
    type Err = RecordError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        match fields(line, "timer")?.as_slice() {
            [e, l] => Ok(TimerRecord {
                elapsed: num("timer", line, e)?,
                limit: num("timer", line, l)?,
            }),
            _ => Err(malformed("timer", line)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_ack_keeps_command_text() {
        let ack: Ack = "ack 1.25 speed 0 0.5".parse().unwrap();
        assert_approx_eq!(ack.elapsed, 1.25, 1e-6);
        assert_eq!(ack.command, "speed 0 0.5");
        assert_eq!(ack.to_string(), "ack 1.25 speed 0 0.5");
    }

    #[test]
    fn test_mytank_truncates_position() {
        let tank = MyTank {
            index: 3,
            callsign: "red3".into(),
            status: TankStatus::Alive,
            shots_left: 10,
            reload: 0.0,
            flag: None,
            pos: Vec2::new(12.9, -7.8),
            angle: 1.5,
            vel: Vec2::new(0.0, 25.0),
            angvel: 0.0,
        };
        assert_eq!(
            tank.to_string(),
            "mytank 3 red3 alive 10 0 - 12 -7 1.5 0 25 0"
        );
    }

    #[test]
    fn test_mytank_parse() {
        let tank: MyTank = "mytank 0 blue0 dead 8 1.2 red -999999 -999999 0 0 0 0"
            .parse()
            .unwrap();
        assert_eq!(tank.status, TankStatus::Dead);
        assert_eq!(tank.flag, Some(TeamColor::Red));
        assert_eq!(tank.shots_left, 8);
        assert_approx_eq!(tank.pos.x, -999999.0, 1.0);
    }

    #[test]
    fn test_mytank_rejects_short_line() {
        assert!("mytank 0 blue0 alive".parse::<MyTank>().is_err());
        assert!("othertank red0 red alive".parse::<MyTank>().is_err());
    }

    #[test]
    fn test_flag_possessor_none() {
        let flag = FlagRecord {
            color: TeamColor::Green,
            possessor: None,
            pos: Vec2::new(1.5, 2.0),
        };
        assert_eq!(flag.to_string(), "flag green none 1.5 2");
        let parsed: FlagRecord = "flag green purple 1 2".parse().unwrap();
        assert_eq!(parsed.possessor, Some(TeamColor::Purple));
    }

    #[test]
    fn test_obstacle_corner_pairs() {
        let obstacle: ObstacleRecord = "obstacle 0 0 10 0 10 10 0 10".parse().unwrap();
        assert_eq!(obstacle.corners.len(), 4);
        assert_eq!(obstacle.corners[2], Vec2::new(10.0, 10.0));
        assert!("obstacle 0 0 10".parse::<ObstacleRecord>().is_err());
    }

    #[test]
    fn test_base_record() {
        let base: BaseRecord = "base red -1 -1 1 -1 1 1 -1 1".parse().unwrap();
        assert_eq!(base.color, TeamColor::Red);
        assert_eq!(base.corners.len(), 4);
        assert!("base orange 0 0".parse::<BaseRecord>().is_err());
    }

    #[test]
    fn test_other_records() {
        let shot: ShotRecord = "shot 1 2 3 4".parse().unwrap();
        assert_eq!(shot.vel, Vec2::new(3.0, 4.0));
        let team: TeamRecord = "team blue 10".parse().unwrap();
        assert_eq!(team.tanks, 10);
        let timer: TimerRecord = "timer 12.5 300".parse().unwrap();
        assert_approx_eq!(timer.limit, 300.0, 1e-6);
        let constant: ConstantRecord = "constant tankspeed 25".parse().unwrap();
        assert_eq!(constant, ConstantRecord::new("tankspeed", 25));
    }
}
