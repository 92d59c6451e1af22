//! End-to-end tests against the application façade and the records
//! store: joining, steering, pickups, office returns, clipping, idle
//! retirement and the ranked records query.

use assert_approx_eq::assert_approx_eq;
use model::{LootItem, Map, MapId, Office, OfficeId, Offset, Point, Position, Road, World};
use server::app::{ActionError, Application};
use server::records::RecordStore;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

static SCRATCH_SEQ: AtomicU64 = AtomicU64::new(0);

fn scratch_path() -> PathBuf {
    let n = SCRATCH_SEQ.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("laf_integration_{}_{n}.jsonl", std::process::id()))
}

/// One horizontal road from (0,0) to (end_x, 0).
fn strip_world(end_x: i64, dog_speed: f64, bag_capacity: usize) -> World {
    let mut world = World::new(dog_speed, bag_capacity);
    let mut map = Map::new(MapId::new("town"), "Town", dog_speed, bag_capacity);
    map.add_road(Road::horizontal(Point::new(0, 0), end_x));
    world.add_map(map).unwrap();
    world
}

fn place_loot(world: &mut World, x: f64, value: f64) -> model::LootId {
    let id = world.alloc_loot_id();
    world
        .map_mut(&MapId::new("town"))
        .unwrap()
        .add_loot(LootItem {
            id,
            kind: 1,
            value,
            position: Position::new(x, 0.0),
        });
    id
}

fn place_office(world: &mut World, x: i64) {
    world.map_mut(&MapId::new("town")).unwrap().add_office(Office {
        id: OfficeId("o1".into()),
        position: Point::new(x, 0),
        offset: Offset { dx: 5, dy: 0 },
    });
}

mod simulation {
    use super::*;

    #[test]
    fn dog_walks_the_road_and_picks_up_loot() {
        let mut world = strip_world(10, 5.0, 3);
        let item = place_loot(&mut world, 5.0, 10.0);
        let app = Application::new(world, false, 60.0);

        let join = app.join_game("Scout", "town").unwrap();
        app.set_player_action(&join.token, "R").unwrap();
        app.tick(Duration::from_secs(1));

        let state = app.game_state(&join.token);
        assert_eq!(state.len(), 1);
        assert_approx_eq!(state[0].position.x, 5.0);
        assert_approx_eq!(state[0].position.y, 0.0);
        assert_eq!(state[0].bag.len(), 1);
        assert_eq!(state[0].bag[0].id, item);
        assert_eq!(state[0].score, 0);
    }

    #[test]
    fn full_bag_walks_past_further_loot() {
        let mut world = strip_world(10, 10.0, 1);
        let first = place_loot(&mut world, 2.0, 10.0);
        let skipped = place_loot(&mut world, 5.0, 10.0);
        let app = Application::new(world, false, 60.0);

        let join = app.join_game("Scout", "town").unwrap();
        app.set_player_action(&join.token, "R").unwrap();
        app.tick(Duration::from_secs(1));

        let state = app.game_state(&join.token);
        assert_eq!(state[0].bag.len(), 1);
        assert_eq!(state[0].bag[0].id, first);
        assert_ne!(state[0].bag[0].id, skipped);
        assert_eq!(state[0].score, 0);
    }

    #[test]
    fn pickup_and_office_return_in_one_tick() {
        let mut world = strip_world(10, 10.0, 3);
        place_loot(&mut world, 2.0, 10.0);
        place_office(&mut world, 8);
        let app = Application::new(world, false, 60.0);

        let join = app.join_game("Scout", "town").unwrap();
        app.set_player_action(&join.token, "R").unwrap();
        app.tick(Duration::from_secs(1));

        let state = app.game_state(&join.token);
        assert_eq!(state[0].score, 10);
        assert!(state[0].bag.is_empty());
    }

    #[test]
    fn road_end_clips_motion_and_zeroes_velocity() {
        let app = Application::new(strip_world(5, 10.0, 3), false, 60.0);

        let join = app.join_game("Scout", "town").unwrap();
        app.set_player_action(&join.token, "R").unwrap();
        app.tick(Duration::from_secs(1));

        let state = app.game_state(&join.token);
        // The walkable strip extends half a road width past the segment.
        assert_approx_eq!(state[0].position.x, 5.4);
        assert!(state[0].velocity.is_zero());

        // With no velocity the next tick leaves the dog in place.
        app.tick(Duration::from_millis(50));
        assert_approx_eq!(app.game_state(&join.token)[0].position.x, 5.4);
    }

    #[test]
    fn dogs_stay_on_the_road_union_across_ticks() {
        let mut world = strip_world(10, 6.0, 3);
        world
            .map_mut(&MapId::new("town"))
            .unwrap()
            .add_road(Road::vertical(Point::new(5, 0), 8));
        let app = Application::new(world, false, 60.0);

        let join = app.join_game("Scout", "town").unwrap();
        for cmd in ["R", "D", "U", "L", "D"] {
            app.set_player_action(&join.token, cmd).unwrap();
            for _ in 0..4 {
                app.tick(Duration::from_millis(250));
            }
        }

        let pos = app.game_state(&join.token)[0].position;
        let on_horizontal = (-0.4..=10.4).contains(&pos.x) && (-0.4..=0.4).contains(&pos.y);
        let on_vertical = (4.6..=5.4).contains(&pos.x) && (-0.4..=8.4).contains(&pos.y);
        assert!(on_horizontal || on_vertical, "dog left the roads: {pos:?}");
    }

    #[test]
    fn players_see_only_their_own_map() {
        let mut world = strip_world(10, 4.0, 3);
        let mut port = Map::new(MapId::new("port"), "Port", 4.0, 3);
        port.add_road(Road::horizontal(Point::new(0, 0), 6));
        world.add_map(port).unwrap();
        let app = Application::new(world, false, 60.0);

        let town_a = app.join_game("A", "town").unwrap();
        app.join_game("B", "town").unwrap();
        app.join_game("C", "port").unwrap();

        let names: Vec<String> = app
            .players(&town_a.token)
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, ["A", "B"]);
    }
}

mod retirement {
    use super::*;

    #[test]
    fn idle_player_is_retired_and_recorded() {
        let app = Application::new(strip_world(10, 4.0, 3), false, 0.05);
        let records: Arc<Mutex<Vec<(String, i64, f64)>>> = Arc::new(Mutex::new(Vec::new()));
        {
            let records = Arc::clone(&records);
            app.set_retirement_callback(Box::new(move |name, score, play_time| {
                records.lock().unwrap().push((name.to_string(), score, play_time));
            }));
        }

        let join = app.join_game("Idler", "town").unwrap();
        app.set_player_action(&join.token, "").unwrap();

        thread::sleep(Duration::from_millis(80));
        app.tick(Duration::from_millis(50));

        let records = records.lock().unwrap();
        assert_eq!(records.len(), 1);
        let (name, score, play_time) = &records[0];
        assert_eq!(name, "Idler");
        assert_eq!(*score, 0);
        assert!(*play_time >= 0.08);

        assert!(app.game_state(&join.token).is_empty());
        assert!(app.players(&join.token).is_empty());
        assert_eq!(
            app.set_player_action(&join.token, "R").unwrap_err(),
            ActionError::Unauthorized
        );
        assert_eq!(app.player_count(), 0);
    }

    #[test]
    fn pickup_and_retirement_land_in_the_same_tick() {
        let mut world = strip_world(10, 10.0, 3);
        place_loot(&mut world, 2.0, 10.0);
        place_office(&mut world, 8);
        let app = Application::new(world, false, 0.05);
        let records: Arc<Mutex<Vec<(String, i64)>>> = Arc::new(Mutex::new(Vec::new()));
        {
            let records = Arc::clone(&records);
            app.set_retirement_callback(Box::new(move |name, score, _| {
                records.lock().unwrap().push((name.to_string(), score));
            }));
        }

        let walker = app.join_game("Walker", "town").unwrap();
        let idler = app.join_game("Idler", "town").unwrap();
        app.set_player_action(&walker.token, "R").unwrap();
        app.set_player_action(&idler.token, "").unwrap();

        thread::sleep(Duration::from_millis(80));
        app.tick(Duration::from_secs(1));

        // One tick moved the walker through the loot and the office and
        // retired the idler.
        let state = app.game_state(&walker.token);
        assert_eq!(state.len(), 1);
        assert_eq!(state[0].name, "Walker");
        assert_approx_eq!(state[0].position.x, 10.0);
        assert_eq!(state[0].score, 10);
        assert!(state[0].bag.is_empty());

        assert_eq!(*records.lock().unwrap(), [("Idler".to_string(), 0)]);
        assert!(app.game_state(&idler.token).is_empty());
        assert_eq!(app.player_count(), 1);
    }

    #[test]
    fn only_idle_players_retire() {
        let app = Application::new(strip_world(1000, 1.0, 3), false, 0.0);
        let retired: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        {
            let retired = Arc::clone(&retired);
            app.set_retirement_callback(Box::new(move |name, _, _| {
                retired.lock().unwrap().push(name.to_string());
            }));
        }

        let a = app.join_game("A", "town").unwrap();
        let b = app.join_game("B", "town").unwrap();
        app.join_game("C", "town").unwrap();
        app.set_player_action(&a.token, "R").unwrap();
        app.set_player_action(&b.token, "R").unwrap();

        app.tick(Duration::from_millis(50));

        assert_eq!(*retired.lock().unwrap(), ["C"]);
        assert_eq!(app.players(&a.token).len(), 2);
    }
}

mod records {
    use super::*;

    #[test]
    fn ranking_is_score_desc_time_asc_name_asc() {
        let path = scratch_path();
        let store = RecordStore::open(&path, 2).unwrap();
        store.add("A", 10, 5.0).unwrap();
        store.add("B", 10, 3.0).unwrap();
        store.add("C", 20, 9.0).unwrap();

        let top = store.top(0, 3).unwrap();
        let names: Vec<&str> = top.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["C", "B", "A"]);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn retirements_flow_into_the_store() {
        let path = scratch_path();
        let store = Arc::new(RecordStore::open(&path, 1).unwrap());

        let app = Application::new(strip_world(10, 4.0, 3), false, 0.0);
        {
            let store = Arc::clone(&store);
            app.set_retirement_callback(Box::new(move |name, score, play_time| {
                store.add(name, score, play_time).unwrap();
            }));
        }

        app.join_game("First", "town").unwrap();
        app.tick(Duration::from_millis(50));
        app.join_game("Second", "town").unwrap();
        app.tick(Duration::from_millis(50));

        let top = store.top(0, 10).unwrap();
        assert_eq!(top.len(), 2);
        for record in &top {
            assert_eq!(record.score, 0);
            assert!(record.play_time_ms >= 0);
        }

        std::fs::remove_file(&path).ok();
    }
}
