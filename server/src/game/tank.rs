use shared::constants::{
    ANGULAR_ACCEL, LINEAR_ACCEL, RELOAD_TIME, TANK_ANGVEL, TANK_RADIUS, TANK_SPEED,
};
use shared::geometry::{wrap_heading, Circle};
use shared::{TankStatus, TeamColor, Vec2};

use super::shot::Shot;
use super::TankRef;

#[derive(Debug, Clone)]
pub struct Tank {
    pub callsign: String,
    /// `None` while the tank is dead.
    pub pos: Option<Vec2>,
    /// Heading in [0, 2π).
    pub angle: f32,
    pub speed: f32,
    pub goal_speed: f32,
    pub angvel: f32,
    pub goal_angvel: f32,
    pub status: TankStatus,
    /// Newest first.
    pub shots: Vec<Shot>,
    pub reload_timer: f32,
    /// Color of the flag this tank carries.
    pub flag: Option<TeamColor>,
    pub dead_timer: f32,
}

impl Tank {
    /// A new tank starts dead with an expired timer so the first update spawns it.
    pub fn new(callsign: String) -> Self {
        Self {
            callsign,
            pos: None,
            angle: 0.0,
            speed: 0.0,
            goal_speed: 0.0,
            angvel: 0.0,
            goal_angvel: 0.0,
            status: TankStatus::Dead,
            shots: Vec::new(),
            reload_timer: 0.0,
            flag: None,
            dead_timer: 0.0,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.status == TankStatus::Alive
    }

    pub fn circle(&self) -> Option<Circle> {
        self.pos.map(|p| Circle::new(p, TANK_RADIUS))
    }

    pub fn velocity(&self) -> Vec2 {
        Vec2::from_angle(self.angle).scale(self.speed * TANK_SPEED)
    }

    pub fn reset_motion(&mut self) {
        self.speed = 0.0;
        self.goal_speed = 0.0;
        self.angvel = 0.0;
        self.goal_angvel = 0.0;
    }

    /// Moves speed and angular velocity toward their goals and turns the heading.
    pub fn update_goals(&mut self, dt: f32) {
        self.speed = approach(self.speed, self.goal_speed, LINEAR_ACCEL * dt);
        self.angvel = approach(self.angvel, self.goal_angvel, ANGULAR_ACCEL * dt);
        self.angle = wrap_heading(self.angle + self.angvel * TANK_ANGVEL * dt);
    }

    pub fn tick_reload(&mut self, dt: f32) {
        self.reload_timer = (self.reload_timer - dt).max(0.0);
    }

    pub fn shoot(&mut self, owner: TankRef, max_shots: usize) -> bool {
        if !self.is_alive() || self.reload_timer > 0.0 || self.shots.len() >= max_shots {
            return false;
        }
        let Some(pos) = self.pos else {
            return false;
        };
        self.shots
            .insert(0, Shot::new(owner, pos, self.angle, self.speed));
        self.reload_timer = RELOAD_TIME;
        true
    }
}

fn approach(current: f32, goal: f32, step: f32) -> f32 {
    if current < goal {
        (current + step).min(goal)
    } else if current > goal {
        (current - step).max(goal)
    } else {
        current
    }
}
