use shared::constants::FLAG_RADIUS;
use shared::geometry::{circle_to_circle, circle_to_polygon, Circle};
use shared::{TeamColor, Vec2};
use tracing::{debug, info};

use super::{Map, TankRef};

#[derive(Debug, Clone)]
pub struct Flag {
    pub color: TeamColor,
    pub pos: Vec2,
    pub carrier: Option<TankRef>,
}

impl Flag {
    pub fn new(color: TeamColor, pos: Vec2) -> Self {
        Self {
            color,
            pos,
            carrier: None,
        }
    }

    pub fn circle(&self) -> Circle {
        Circle::new(self.pos, FLAG_RADIUS)
    }
}

impl Map {
    pub(crate) fn update_flag(&mut self, team: usize) {
        match self.teams[team].flag.carrier {
            Some(carrier) => self.update_carried_flag(team, carrier),
            None => self.update_loose_flag(team),
        }
    }

    fn update_carried_flag(&mut self, team: usize, carrier: TankRef) {
        let Some(pos) = self.tank(carrier).pos else {
            // carriers drop the flag when they die, so this only guards stale state
            self.drop_flag(team);
            return;
        };
        self.teams[team].flag.pos = pos;

        let home = self.base_of(carrier.team);
        if circle_to_polygon(self.teams[team].flag.circle(), &home.shape) {
            self.capture_flag(team, carrier);
        }
    }

    fn update_loose_flag(&mut self, team: usize) {
        let flag_circle = self.teams[team].flag.circle();
        let flag_color = self.teams[team].color;

        let toucher = self
            .live_tank_circles()
            .filter(|(_, circle)| circle_to_circle(flag_circle, *circle))
            .map(|(r, _)| r)
            .find(|r| r.team == team || self.tank(*r).flag.is_none());

        match toucher {
            Some(r) if r.team == team => self.return_flag(team),
            Some(r) => {
                debug!(callsign = %self.tank(r).callsign, flag = %flag_color, "flag picked up");
                self.teams[team].flag.carrier = Some(r);
                self.tank_mut(r).flag = Some(flag_color);
            }
            None => {}
        }
    }

    /// Releases the flag where it currently lies.
    pub(crate) fn drop_flag(&mut self, team: usize) {
        if let Some(carrier) = self.teams[team].flag.carrier.take() {
            if let Some(pos) = self.tank(carrier).pos {
                self.teams[team].flag.pos = pos;
            }
            self.tank_mut(carrier).flag = None;
        }
    }

    pub(crate) fn return_flag(&mut self, team: usize) {
        if let Some(carrier) = self.teams[team].flag.carrier.take() {
            self.tank_mut(carrier).flag = None;
        }
        self.teams[team].flag.pos = self.base_of(team).center;
    }

    fn capture_flag(&mut self, team: usize, carrier: TankRef) {
        info!(
            capturer = %self.teams[carrier.team].color,
            flag = %self.teams[team].color,
            callsign = %self.tank(carrier).callsign,
            "flag captured"
        );
        self.teams[carrier.team].score.record_capture();
        self.teams[team].score.record_loss();
        self.return_flag(team);
    }
}
