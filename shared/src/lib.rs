use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub mod constants;
pub mod geometry;
pub mod protocol;
pub mod world;

pub use geometry::normalize_angle;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Unit vector pointing along `angle` (radians, counter-clockwise from +x).
    pub fn from_angle(angle: f32) -> Self {
        Self::new(angle.cos(), angle.sin())
    }

    pub fn add(self, other: Vec2) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }

    pub fn sub(self, other: Vec2) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }

    pub fn scale(self, s: f32) -> Self {
        Self::new(self.x * s, self.y * s)
    }

    pub fn dot(self, other: Vec2) -> f32 {
        self.x * other.x + self.y * other.y
    }

    pub fn length(self) -> f32 {
        self.x.hypot(self.y)
    }

    pub fn distance(self, other: Vec2) -> f32 {
        self.sub(other).length()
    }
}

/// Team identity. The numeric order matches the color indices used by world files.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TeamColor {
    Rogue,
    Red,
    Green,
    Blue,
    Purple,
}

impl TeamColor {
    pub const ALL: [TeamColor; 5] = [
        TeamColor::Rogue,
        TeamColor::Red,
        TeamColor::Green,
        TeamColor::Blue,
        TeamColor::Purple,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TeamColor::Rogue => "rogue",
            TeamColor::Red => "red",
            TeamColor::Green => "green",
            TeamColor::Blue => "blue",
            TeamColor::Purple => "purple",
        }
    }
}

impl fmt::Display for TeamColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown team color '{0}'")]
pub struct UnknownColor(pub String);

impl FromStr for TeamColor {
    type Err = UnknownColor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownColor(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TankStatus {
    Alive,
    Dead,
}

impl TankStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TankStatus::Alive => constants::TANK_ALIVE,
            TankStatus::Dead => constants::TANK_DEAD,
        }
    }
}

impl fmt::Display for TankStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TankStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            constants::TANK_ALIVE => Ok(TankStatus::Alive),
            constants::TANK_DEAD => Ok(TankStatus::Dead),
            other => Err(format!("unknown tank status '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_vec2_arithmetic() {
        let a = Vec2::new(3.0, 4.0);
        let b = Vec2::new(1.0, 1.0);
        assert_eq!(a.add(b), Vec2::new(4.0, 5.0));
        assert_eq!(a.sub(b), Vec2::new(2.0, 3.0));
        assert_eq!(a.scale(2.0), Vec2::new(6.0, 8.0));
        assert_approx_eq!(a.length(), 5.0, 1e-6);
        assert_approx_eq!(a.dot(b), 7.0, 1e-6);
        assert_approx_eq!(a.distance(b), 13.0f32.sqrt(), 1e-6);
    }

    #[test]
    fn test_from_angle_is_unit() {
        let v = Vec2::from_angle(std::f32::consts::FRAC_PI_2);
        assert_approx_eq!(v.x, 0.0, 1e-6);
        assert_approx_eq!(v.y, 1.0, 1e-6);
    }

    #[test]
    fn test_color_index_order() {
        assert_eq!(TeamColor::from_index(0), Some(TeamColor::Rogue));
        assert_eq!(TeamColor::from_index(1), Some(TeamColor::Red));
        assert_eq!(TeamColor::from_index(4), Some(TeamColor::Purple));
        assert_eq!(TeamColor::from_index(5), None);
    }

    #[test]
    fn test_color_parse() {
        assert_eq!("blue".parse::<TeamColor>(), Ok(TeamColor::Blue));
        assert!("orange".parse::<TeamColor>().is_err());
        assert_eq!(TeamColor::Green.to_string(), "green");
    }

    #[test]
    fn test_color_serde_lowercase() {
        let c: TeamColor = serde_json::from_str("\"purple\"").unwrap();
        assert_eq!(c, TeamColor::Purple);
        assert_eq!(serde_json::to_string(&TeamColor::Red).unwrap(), "\"red\"");
    }
}
