use std::sync::Arc;

use assert_approx_eq::assert_approx_eq;
use shared::constants::{RELOAD_TIME, SHOT_RADIUS, SHOT_SPEED, TANK_RADIUS, TANK_SPEED};
use shared::geometry::{circle_to_polygon, Circle};
use shared::world::{Base, Obstacle, World};
use shared::{TankStatus, TeamColor, Vec2};

use super::*;
use crate::config::GameConfig;

const RED: usize = 0;
const BLUE: usize = 1;
const DT: f32 = 0.01;

fn config(tanks: usize, friendly_fire: bool) -> Arc<GameConfig> {
    Arc::new(GameConfig {
        random_seed: Some(42),
        default_tanks: tanks,
        friendly_fire,
        ..GameConfig::default()
    })
}

fn two_team_world() -> World {
    let mut world = World::new(800.0, 800.0);
    world.bases.push(Base::new(
        TeamColor::Blue,
        Vec2::new(100.0, 0.0),
        Vec2::new(10.0, 10.0),
        0.0,
    ));
    world.bases.push(Base::new(
        TeamColor::Red,
        Vec2::new(-100.0, 0.0),
        Vec2::new(10.0, 10.0),
        0.0,
    ));
    world
}

fn tank_ref(team: usize, tank: usize) -> TankRef {
    TankRef { team, tank }
}

/// Moves every tank out of the way along the top edge.
fn park_all(map: &mut Map) {
    let refs: Vec<TankRef> = map.tank_refs().collect();
    for (i, r) in refs.into_iter().enumerate() {
        place(map, r, Vec2::new(-350.0 + 30.0 * i as f32, 350.0), 0.0);
    }
}

fn place(map: &mut Map, r: TankRef, pos: Vec2, angle: f32) {
    let tank = map.tank_mut(r);
    tank.pos = Some(pos);
    tank.angle = angle;
}

fn run(map: &mut Map, ticks: usize) {
    for _ in 0..ticks {
        map.update(DT).unwrap();
    }
}

fn pos(map: &Map, r: TankRef) -> Vec2 {
    map.tank(r).pos.unwrap()
}

#[test]
fn test_new_map_spawns_every_tank() {
    let map = Map::new(config(3, false), two_team_world()).unwrap();
    assert_eq!(map.teams.len(), 2);
    assert_eq!(map.teams[RED].color, TeamColor::Red);
    assert_eq!(map.teams[BLUE].color, TeamColor::Blue);

    for team in 0..2 {
        let center = map.base_of(team).center;
        let radius = map.teams[team].tanks_radius();
        for tank in &map.teams[team].tanks {
            assert_eq!(tank.status, TankStatus::Alive);
            let p = tank.pos.unwrap();
            assert!(p.distance(center) <= radius + 1e-3);
        }
    }

    let circles: Vec<_> = map.live_tank_circles().collect();
    for (i, (_, a)) in circles.iter().enumerate() {
        for (_, b) in circles.iter().skip(i + 1) {
            assert!(a.center.distance(b.center) > 2.0 * TANK_RADIUS);
        }
    }
}

#[test]
fn test_new_map_announces_entities() {
    let mut map = Map::new(config(2, false), two_team_world()).unwrap();
    let created = map.drain_created();
    let tanks = created.iter().filter(|e| matches!(e, Entity::Tank(_))).count();
    assert_eq!(tanks, 4);
    assert!(created.contains(&Entity::Base(TeamColor::Red)));
    assert!(created.contains(&Entity::Flag(TeamColor::Blue)));
    assert!(created.contains(&Entity::Score(TeamColor::Blue)));
    assert!(map.drain_created().is_empty());
}

#[test]
fn test_world_without_bases_is_rejected() {
    let result = Map::new(config(1, false), World::new(800.0, 800.0));
    assert!(matches!(result, Err(SimError::NoTeams)));
}

#[test]
fn test_respawn_exhaustion_is_fatal() {
    let mut world = World::new(800.0, 800.0);
    world.bases.push(Base::new(
        TeamColor::Green,
        Vec2::new(0.0, 0.0),
        Vec2::new(10.0, 10.0),
        0.0,
    ));
    world
        .obstacles
        .push(Obstacle::new(Vec2::new(0.0, 0.0), Vec2::new(100.0, 100.0), 0.0));
    let result = Map::new(config(2, false), world);
    assert!(matches!(result, Err(SimError::NoSpawnPoint(TeamColor::Green))));
}

#[test]
fn test_speed_ramp_and_arena_edge() {
    let mut world = World::new(800.0, 800.0);
    world.bases.push(Base::new(
        TeamColor::Red,
        Vec2::new(0.0, 0.0),
        Vec2::new(10.0, 10.0),
        0.0,
    ));
    let mut map = Map::new(config(1, false), world).unwrap();
    let r = tank_ref(0, 0);
    place(&mut map, r, Vec2::new(0.0, 0.0), 0.0);
    map.teams[0].set_speed(0, 1.0).unwrap();

    // speed ramps linearly to 1 over 2 s, covering half a second's worth of full speed
    run(&mut map, 200);
    assert_approx_eq!(map.tank(r).speed, 1.0, 1e-4);
    assert_approx_eq!(pos(&map, r).x, TANK_SPEED, 0.5);
    assert_approx_eq!(pos(&map, r).y, 0.0, 1e-3);

    run(&mut map, 3000);
    let x = pos(&map, r).x;
    assert!(x <= 400.0 - TANK_RADIUS);
    assert!(x > 400.0 - TANK_RADIUS - 0.3);
}

#[test]
fn test_tank_never_enters_obstacle() {
    let mut world = two_team_world();
    world
        .obstacles
        .push(Obstacle::new(Vec2::new(50.0, 0.0), Vec2::new(10.0, 50.0), 0.0));
    let mut map = Map::new(config(1, false), world).unwrap();
    park_all(&mut map);
    let r = tank_ref(RED, 0);
    place(&mut map, r, Vec2::new(0.0, 10.0), 0.3);
    map.teams[RED].set_speed(0, 1.0).unwrap();

    let shape = map.world().obstacles[0].shape.clone();
    for _ in 0..400 {
        map.update(DT).unwrap();
        let body = Circle::new(pos(&map, r), TANK_RADIUS);
        assert!(!circle_to_polygon(body, &shape));
    }
    // slid along the wall's face instead of stopping dead
    assert!(pos(&map, r).y > 10.0);
    assert!(pos(&map, r).x < 40.0);
}

#[test]
fn test_second_shot_within_reload_fails() {
    let mut map = Map::new(config(1, false), two_team_world()).unwrap();
    map.drain_created();
    assert_eq!(map.shoot(RED, 0), Ok(true));
    assert_eq!(map.shoot(RED, 0), Ok(false));
    assert_eq!(map.drain_created(), vec![Entity::Shot(tank_ref(RED, 0))]);
    assert_eq!(map.shoot(RED, 5), Err(CommandError::InvalidTank(5)));

    park_all(&mut map);
    run(&mut map, (RELOAD_TIME / DT) as usize + 2);
    assert_eq!(map.shoot(RED, 0), Ok(true));
}

#[test]
fn test_shot_kills_enemy_tank() {
    let mut map = Map::new(config(1, false), two_team_world()).unwrap();
    park_all(&mut map);
    let shooter = tank_ref(RED, 0);
    let target = tank_ref(BLUE, 0);
    place(&mut map, shooter, Vec2::new(0.0, 0.0), 0.0);
    place(&mut map, target, Vec2::new(30.0, 0.0), 0.0);
    map.drain_destroyed();

    assert_eq!(map.shoot(RED, 0), Ok(true));
    run(&mut map, 50);

    assert_eq!(map.tank(target).status, TankStatus::Dead);
    assert!(map.tank(target).pos.is_none());
    assert!(map.tank(shooter).is_alive());
    assert!(map.tank(shooter).shots.is_empty());
    assert_eq!(map.drain_destroyed(), vec![Entity::Shot(shooter)]);
}

#[test]
fn test_friendly_fire_setting() {
    for friendly_fire in [false, true] {
        let mut map = Map::new(config(2, friendly_fire), two_team_world()).unwrap();
        park_all(&mut map);
        place(&mut map, tank_ref(RED, 0), Vec2::new(0.0, 0.0), 0.0);
        place(&mut map, tank_ref(RED, 1), Vec2::new(30.0, 0.0), 0.0);

        map.shoot(RED, 0).unwrap();
        run(&mut map, 50);

        assert_eq!(map.tank(tank_ref(RED, 1)).is_alive(), !friendly_fire);
        assert!(map.tank(tank_ref(RED, 0)).is_alive());
    }
}

#[test]
fn test_shot_expires_at_range() {
    let mut map = Map::new(config(1, false), two_team_world()).unwrap();
    park_all(&mut map);
    let shooter = tank_ref(RED, 0);
    place(&mut map, shooter, Vec2::new(-200.0, 0.0), 0.0);
    map.shoot(RED, 0).unwrap();

    run(&mut map, 340);
    assert_eq!(map.shots().count(), 1);
    let shot = map.shots().next().unwrap();
    assert_approx_eq!(shot.pos.x, -200.0 + 3.4 * SHOT_SPEED, 0.5);

    run(&mut map, 20);
    assert_eq!(map.shots().count(), 0);
}

#[test]
fn test_fast_shot_is_swept() {
    let mut map = Map::new(config(1, false), two_team_world()).unwrap();
    park_all(&mut map);
    place(&mut map, tank_ref(RED, 0), Vec2::new(0.0, 0.0), 0.0);
    place(&mut map, tank_ref(BLUE, 0), Vec2::new(15.0, 0.0), 0.0);
    map.shoot(RED, 0).unwrap();

    // one 0.2 s step moves the shot 20 units, past the target
    map.update(0.2).unwrap();
    assert!(!map.tank(tank_ref(BLUE, 0)).is_alive());
}

#[test]
fn test_flag_pickup_and_capture() {
    let mut map = Map::new(config(1, false), two_team_world()).unwrap();
    park_all(&mut map);
    let carrier = tank_ref(RED, 0);
    place(&mut map, carrier, Vec2::new(100.0, 0.0), 0.0);

    map.update(DT).unwrap();
    assert_eq!(map.teams[BLUE].flag.carrier, Some(carrier));
    assert_eq!(map.tank(carrier).flag, Some(TeamColor::Blue));

    place(&mut map, carrier, Vec2::new(-100.0, 0.0), 0.0);
    map.update(DT).unwrap();

    assert_eq!(map.teams[RED].score.captures(), 1);
    assert_eq!(map.teams[BLUE].score.losses(), 1);
    assert!(map.teams[BLUE].flag.carrier.is_none());
    assert_eq!(map.teams[BLUE].flag.pos, Vec2::new(100.0, 0.0));
    assert_eq!(map.tank(carrier).flag, None);
    assert_approx_eq!(map.teams[RED].score.total(), 1000.0);
}

#[test]
fn test_killed_carrier_drops_flag_in_place() {
    let mut map = Map::new(config(1, false), two_team_world()).unwrap();
    park_all(&mut map);
    let carrier = tank_ref(RED, 0);
    place(&mut map, carrier, Vec2::new(100.0, 0.0), 0.0);
    map.update(DT).unwrap();
    place(&mut map, carrier, Vec2::new(50.0, 0.0), 0.0);
    map.update(DT).unwrap();
    assert_eq!(map.teams[BLUE].flag.pos, Vec2::new(50.0, 0.0));

    map.kill_tank(carrier);
    assert!(map.teams[BLUE].flag.carrier.is_none());
    assert_eq!(map.tank(carrier).flag, None);

    run(&mut map, 100);
    assert_eq!(map.teams[BLUE].flag.pos, Vec2::new(50.0, 0.0));
    assert_eq!(map.teams[RED].score.captures(), 0);
}

#[test]
fn test_own_team_returns_loose_flag() {
    let mut map = Map::new(config(1, false), two_team_world()).unwrap();
    park_all(&mut map);
    map.teams[BLUE].flag.pos = Vec2::new(0.0, 50.0);
    place(&mut map, tank_ref(BLUE, 0), Vec2::new(0.0, 52.0), 0.0);
    map.update(DT).unwrap();
    assert_eq!(map.teams[BLUE].flag.pos, Vec2::new(100.0, 0.0));
    assert!(map.teams[BLUE].flag.carrier.is_none());
}

#[test]
fn test_dead_tank_respawns_after_delay() {
    let mut map = Map::new(config(1, false), two_team_world()).unwrap();
    park_all(&mut map);
    let r = tank_ref(RED, 0);
    map.kill_tank(r);
    assert_eq!(map.tank(r).status, TankStatus::Dead);

    for _ in 0..4 {
        map.update(1.0).unwrap();
        assert!(!map.tank(r).is_alive());
    }
    map.update(1.0).unwrap();
    assert!(map.tank(r).is_alive());
    let p = pos(&map, r);
    assert!(p.distance(Vec2::new(-100.0, 0.0)) <= map.teams[RED].tanks_radius() + 1e-3);
    assert_eq!(map.tank(r).speed, 0.0);
}

#[test]
fn test_proximity_score_ratchets() {
    let mut map = Map::new(config(1, false), two_team_world()).unwrap();
    park_all(&mut map);
    let r = tank_ref(RED, 0);
    place(&mut map, r, Vec2::new(60.0, 0.0), 0.0);
    for _ in 0..5 {
        map.update(0.5).unwrap();
    }
    // 40 units from the blue base, 200 between bases
    assert_approx_eq!(map.teams[RED].score.value(), 80.0, 1e-3);

    place(&mut map, r, Vec2::new(-50.0, 0.0), 0.0);
    for _ in 0..5 {
        map.update(0.5).unwrap();
    }
    assert_approx_eq!(map.teams[RED].score.value(), 80.0, 1e-3);
}

#[test]
fn test_time_limit_ends_game() {
    let config = Arc::new(GameConfig {
        random_seed: Some(1),
        default_tanks: 1,
        time_limit: 1.0,
        ..GameConfig::default()
    });
    let mut map = Map::new(config, two_team_world()).unwrap();
    map.update(0.6).unwrap();
    assert!(!map.is_over());
    map.update(0.6).unwrap();
    assert!(map.is_over());
    let before = map.time_spent();
    map.update(0.6).unwrap();
    assert_eq!(map.time_spent(), before);
}

#[test]
fn test_clock_keeps_running_past_f32_precision() {
    let config = Arc::new(GameConfig {
        random_seed: Some(1),
        default_tanks: 1,
        time_limit: 262_200.0,
        ..GameConfig::default()
    });
    let mut map = Map::new(config, two_team_world()).unwrap();
    park_all(&mut map);

    // 2^18 s, where a 10 ms step falls below f32 resolution
    map.update(262_144.0).unwrap();
    run(&mut map, 5000);
    assert_approx_eq!(map.time_spent(), 262_194.0, 1e-3);
    assert!(!map.is_over());

    run(&mut map, 1000);
    assert!(map.is_over());
}

#[test]
fn test_respawn_avoids_live_shot() {
    let mut map = Map::new(config(1, false), two_team_world()).unwrap();
    park_all(&mut map);
    let center = map.base_of(RED).center;
    let shooter = tank_ref(BLUE, 0);
    map.tank_mut(shooter).shots.push(Shot::new(shooter, center, 0.0, 0.0));

    let r = tank_ref(RED, 0);
    for _ in 0..50 {
        map.kill_tank(r);
        map.respawn(r).unwrap();
        assert!(pos(&map, r).distance(center) > TANK_RADIUS + SHOT_RADIUS);
    }
}

#[test]
fn test_respawn_avoids_obstacle_near_base() {
    let mut world = two_team_world();
    world
        .obstacles
        .push(Obstacle::new(Vec2::new(-100.0, 0.0), Vec2::new(10.0, 10.0), 0.0));
    let mut map = Map::new(config(3, false), world).unwrap();
    assert_eq!(map.teams[RED].nearby_obstacles(), &[0]);
    assert!(map.teams[BLUE].nearby_obstacles().is_empty());

    let shape = map.world().obstacles[0].shape.clone();
    let r = tank_ref(RED, 1);
    for _ in 0..50 {
        map.kill_tank(r);
        map.respawn(r).unwrap();
        assert!(!circle_to_polygon(Circle::new(pos(&map, r), TANK_RADIUS), &shape));
    }
}

#[test]
fn test_carried_flag_tracks_carrier_of_later_team() {
    let mut map = Map::new(config(1, false), two_team_world()).unwrap();
    park_all(&mut map);
    // blue updates after red, so blue carrying red's flag is the lagging case
    let carrier = tank_ref(BLUE, 0);
    place(&mut map, carrier, Vec2::new(-100.0, 0.0), 0.0);
    map.update(DT).unwrap();
    assert_eq!(map.teams[RED].flag.carrier, Some(carrier));

    map.teams[BLUE].set_speed(0, 1.0).unwrap();
    for _ in 0..50 {
        map.update(DT).unwrap();
        assert_eq!(map.teams[RED].flag.pos, pos(&map, carrier));
    }
    assert!(pos(&map, carrier).x > -100.0);
}
