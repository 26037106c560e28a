use std::mem;

use shared::constants::{SHOT_RADIUS, SHOT_RANGE, SHOT_SPEED, TANK_RADIUS};
use shared::geometry::{
    circle_to_circle, circle_to_polygon, distance_to_segment, segment_to_polygon, Circle, Segment,
};
use shared::Vec2;

use super::{Entity, Map, TankRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShotStatus {
    Alive,
    Dead,
}

#[derive(Debug, Clone)]
pub struct Shot {
    pub pos: Vec2,
    pub vel: Vec2,
    /// Cumulative distance traveled.
    pub distance: f32,
    pub owner: TankRef,
    pub status: ShotStatus,
}

impl Shot {
    /// `tank_speed` is the firing tank's normalized speed, added to the muzzle speed.
    pub fn new(owner: TankRef, pos: Vec2, angle: f32, tank_speed: f32) -> Self {
        Self {
            pos,
            vel: Vec2::from_angle(angle).scale(SHOT_SPEED + tank_speed),
            distance: 0.0,
            owner,
            status: ShotStatus::Alive,
        }
    }

    pub fn circle(&self) -> Circle {
        Circle::new(self.pos, SHOT_RADIUS)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShotHit {
    Nothing,
    Wall,
    Tank(TankRef),
}

impl Map {
    /// Advances every shot owned by `owner`, resolving hits and removing
    /// shots that died this tick.
    pub(crate) fn update_shots(&mut self, owner: TankRef, dt: f32) {
        let shots = mem::take(&mut self.tank_mut(owner).shots);
        let mut survivors = Vec::with_capacity(shots.len());
        for mut shot in shots {
            self.advance_shot(&mut shot, dt);
            if shot.status == ShotStatus::Alive {
                survivors.push(shot);
            } else {
                self.destroyed.push(Entity::Shot(owner));
            }
        }
        self.tank_mut(owner).shots = survivors;
    }

    fn advance_shot(&mut self, shot: &mut Shot, dt: f32) {
        let step = shot.vel.scale(dt);
        let travel = step.length();
        let path = Segment::new(shot.pos, shot.pos.add(step));
        shot.distance += travel;
        shot.pos = path.b;

        // Fast shots are swept along their path so they cannot tunnel through tanks.
        let hit = if travel > 2.0 * TANK_RADIUS {
            self.sweep_hit(shot.owner, path)
        } else {
            self.contact_hit(shot.owner, shot.circle())
        };

        match hit {
            ShotHit::Tank(victim) => {
                self.kill_tank(victim);
                shot.status = ShotStatus::Dead;
            }
            ShotHit::Wall => shot.status = ShotStatus::Dead,
            ShotHit::Nothing => {}
        }
        if shot.distance > SHOT_RANGE {
            shot.status = ShotStatus::Dead;
        }
    }

    fn can_hit(&self, owner: TankRef, target: TankRef) -> bool {
        target != owner && (self.config.friendly_fire || target.team != owner.team)
    }

    fn contact_hit(&self, owner: TankRef, circle: Circle) -> ShotHit {
        if self
            .world
            .obstacles
            .iter()
            .any(|o| circle_to_polygon(circle, &o.shape))
        {
            return ShotHit::Wall;
        }
        for (target, tank_circle) in self.live_tank_circles() {
            if self.can_hit(owner, target) && circle_to_circle(circle, tank_circle) {
                return ShotHit::Tank(target);
            }
        }
        if self.world.out_of_bounds(circle) {
            return ShotHit::Wall;
        }
        ShotHit::Nothing
    }

    fn sweep_hit(&self, owner: TankRef, path: Segment) -> ShotHit {
        if self
            .world
            .obstacles
            .iter()
            .any(|o| segment_to_polygon(path, &o.shape))
        {
            return ShotHit::Wall;
        }
        for (target, tank_circle) in self.live_tank_circles() {
            if self.can_hit(owner, target)
                && distance_to_segment(tank_circle.center, path) <= TANK_RADIUS + SHOT_RADIUS
            {
                return ShotHit::Tank(target);
            }
        }
        if self.world.out_of_bounds(Circle::new(path.b, SHOT_RADIUS)) {
            return ShotHit::Wall;
        }
        ShotHit::Nothing
    }
}
