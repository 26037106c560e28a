//! Physical constants of the simulation. Clients receive most of these
//! through the `constants` command.

use std::f32::consts::PI;

/// Maximum turn rate in radians per second at `angvel 1`.
pub const TANK_ANGVEL: f32 = PI / 4.0;
pub const TANK_LENGTH: f32 = 6.0;
pub const TANK_RADIUS: f32 = 0.72 * TANK_LENGTH;
pub const TANK_WIDTH: f32 = 2.8;
/// World units per second at `speed 1`.
pub const TANK_SPEED: f32 = 25.0;
pub const LINEAR_ACCEL: f32 = 0.5;
pub const ANGULAR_ACCEL: f32 = 0.5;

pub const SHOT_RADIUS: f32 = 0.5;
pub const SHOT_RANGE: f32 = 350.0;
pub const SHOT_SPEED: f32 = 100.0;
pub const RELOAD_TIME: f32 = SHOT_RANGE / SHOT_SPEED;

pub const FLAG_RADIUS: f32 = 2.5;
pub const EXPLODE_TIME: f32 = 5.0;
pub const RESPAWN_TRIES: usize = 1000;

/// Coordinate reported on the wire for tanks that are currently dead.
pub const DEAD_ZONE: f32 = -999999.0;

/// Seconds between proximity score evaluations.
pub const SCORE_INTERVAL: f32 = 2.0;
pub const CAPTURE_BONUS: f32 = 1000.0;
pub const CARRY_BASE: f32 = 500.0;
pub const PROXIMITY_MAX: f32 = 100.0;

pub const TANK_ALIVE: &str = "alive";
pub const TANK_DEAD: &str = "dead";

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_derived_constants() {
        assert_approx_eq!(TANK_RADIUS, 4.32, 1e-5);
        assert_approx_eq!(RELOAD_TIME, 3.5, 1e-6);
    }
}
