use std::f32::consts::TAU;

use rand::Rng;
use shared::constants::TANK_RADIUS;
use shared::geometry::{circle_to_circle, Circle};
use shared::world::{Base, Obstacle};
use shared::{TeamColor, Vec2};

use super::flag::Flag;
use super::score::Score;
use super::tank::Tank;
use super::CommandError;
use crate::config::TeamSettings;

#[derive(Debug, Clone)]
pub struct Team {
    pub color: TeamColor,
    /// Fixed at construction; tanks are killed and respawned in place.
    pub tanks: Vec<Tank>,
    pub flag: Flag,
    /// Index into the world's bases.
    pub base: usize,
    pub score: Score,
    pub settings: TeamSettings,
    tanks_radius: f32,
    /// Indices of obstacles close enough to the base to block a respawn.
    nearby_obstacles: Vec<usize>,
}

impl Team {
    pub fn new(base_index: usize, base: &Base, settings: TeamSettings, obstacles: &[Obstacle]) -> Self {
        let color = base.color;
        let tanks = (0..settings.tanks)
            .map(|i| Tank::new(format!("{color}{i}")))
            .collect::<Vec<_>>();
        let tanks_radius = TANK_RADIUS * settings.tanks as f32 * 1.5;

        let reach = Circle::new(base.center, tanks_radius + TANK_RADIUS);
        let nearby_obstacles = obstacles
            .iter()
            .enumerate()
            .filter(|(_, o)| circle_to_circle(Circle::new(o.center, o.radius), reach))
            .map(|(i, _)| i)
            .collect();

        Self {
            color,
            tanks,
            flag: Flag::new(color, base.center),
            base: base_index,
            score: Score::new(),
            settings,
            tanks_radius,
            nearby_obstacles,
        }
    }

    pub fn tanks_radius(&self) -> f32 {
        self.tanks_radius
    }

    pub fn nearby_obstacles(&self) -> &[usize] {
        &self.nearby_obstacles
    }

    pub fn tank(&self, id: usize) -> Result<&Tank, CommandError> {
        self.tanks.get(id).ok_or(CommandError::InvalidTank(id))
    }

    pub fn tank_mut(&mut self, id: usize) -> Result<&mut Tank, CommandError> {
        self.tanks.get_mut(id).ok_or(CommandError::InvalidTank(id))
    }

    pub fn set_speed(&mut self, id: usize, value: f32) -> Result<(), CommandError> {
        let value = clamp_unit(value)?;
        self.tank_mut(id)?.goal_speed = value;
        Ok(())
    }

    pub fn set_angvel(&mut self, id: usize, value: f32) -> Result<(), CommandError> {
        let value = clamp_unit(value)?;
        self.tank_mut(id)?.goal_angvel = value;
        Ok(())
    }

    /// A random point within `tanks_radius` of the base center.
    pub fn spawn_candidate(&self, base_center: Vec2, rng: &mut impl Rng) -> Vec2 {
        let angle = rng.gen_range(0.0..TAU);
        let dist = rng.gen::<f32>() * self.tanks_radius;
        base_center.add(Vec2::from_angle(angle).scale(dist))
    }
}

fn clamp_unit(value: f32) -> Result<f32, CommandError> {
    if value.is_nan() {
        return Err(CommandError::NotANumber);
    }
    Ok(value.clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SensorNoise, TeamSettings};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn settings(tanks: usize) -> TeamSettings {
        TeamSettings {
            tanks,
            port: 0,
            noise: SensorNoise::default(),
            true_positive: 1.0,
            true_negative: 1.0,
        }
    }

    fn red_base() -> Base {
        Base::new(TeamColor::Red, Vec2::new(-100.0, 0.0), Vec2::new(10.0, 10.0), 0.0)
    }

    #[test]
    fn test_callsigns_and_count() {
        let team = Team::new(0, &red_base(), settings(3), &[]);
        let names: Vec<&str> = team.tanks.iter().map(|t| t.callsign.as_str()).collect();
        assert_eq!(names, ["red0", "red1", "red2"]);
        assert_eq!(team.flag.pos, Vec2::new(-100.0, 0.0));
        assert!(team.flag.carrier.is_none());
    }

    #[test]
    fn test_obstacle_cache_keeps_only_nearby() {
        let near = Obstacle::new(Vec2::new(-80.0, 0.0), Vec2::new(5.0, 5.0), 0.0);
        let far = Obstacle::new(Vec2::new(200.0, 0.0), Vec2::new(5.0, 5.0), 0.0);
        let team = Team::new(0, &red_base(), settings(2), &[near, far]);
        assert_eq!(team.nearby_obstacles(), &[0]);
    }

    #[test]
    fn test_goal_values_are_clamped() {
        let mut team = Team::new(0, &red_base(), settings(1), &[]);
        team.set_speed(0, 3.0).unwrap();
        assert_eq!(team.tanks[0].goal_speed, 1.0);
        team.set_angvel(0, -7.5).unwrap();
        assert_eq!(team.tanks[0].goal_angvel, -1.0);
        team.set_speed(0, f32::NEG_INFINITY).unwrap();
        assert_eq!(team.tanks[0].goal_speed, -1.0);
    }

    #[test]
    fn test_nan_and_bad_index_are_rejected() {
        let mut team = Team::new(0, &red_base(), settings(1), &[]);
        assert_eq!(team.set_speed(0, f32::NAN), Err(CommandError::NotANumber));
        assert_eq!(team.set_angvel(4, 0.5), Err(CommandError::InvalidTank(4)));
    }

    #[test]
    fn test_spawn_candidates_stay_near_base() {
        let team = Team::new(0, &red_base(), settings(4), &[]);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let p = team.spawn_candidate(Vec2::new(-100.0, 0.0), &mut rng);
            assert!(p.distance(Vec2::new(-100.0, 0.0)) <= team.tanks_radius() + 1e-3);
        }
    }
}
