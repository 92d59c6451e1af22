//! Swept collision resolution for one dog's per-tick motion segment.
//!
//! After motion, every loot item (radius 0.3) and office (radius 0.55) on
//! the dog's map is tested against the segment the dog swept this tick.
//! Hits become events ordered by time of impact and are applied in that
//! order, so a pickup before an office return lands in the deposit and a
//! pickup after it refills the bag.

use model::{
    Dog, LootId, Map, Position, ITEM_COLLISION_RADIUS, OFFICE_COLLISION_RADIUS,
};

const ZERO_LENGTH: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
pub enum CollisionEvent {
    Pickup { t: f64, item: LootId },
    OfficeReturn { t: f64 },
}

impl CollisionEvent {
    fn t(&self) -> f64 {
        match self {
            CollisionEvent::Pickup { t, .. } => *t,
            CollisionEvent::OfficeReturn { t } => *t,
        }
    }
}

/// Earliest parameter `t` in `[0, 1]` at which the point moving from
/// `start` to `end` enters the circle of `radius` around `target`, or
/// None when the path misses the circle.
///
/// A zero-length segment collides at `t = 0` iff it already lies within
/// the radius. A path that starts inside the circle and only exits it
/// reports no entry.
pub fn collision_time(
    start: Position,
    end: Position,
    target: Position,
    radius: f64,
) -> Option<f64> {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    let path_length = dx.hypot(dy);

    if path_length < ZERO_LENGTH {
        return (start.distance_to(target) <= radius).then_some(0.0);
    }

    let dir_x = dx / path_length;
    let dir_y = dy / path_length;

    let to_target_x = target.x - start.x;
    let to_target_y = target.y - start.y;
    let projection = to_target_x * dir_x + to_target_y * dir_y;

    let closest = if projection <= 0.0 {
        start
    } else if projection >= path_length {
        end
    } else {
        Position::new(start.x + dir_x * projection, start.y + dir_y * projection)
    };

    let distance_to_path = target.distance_to(closest);
    if distance_to_path > radius {
        return None;
    }

    let entry = projection - (radius * radius - distance_to_path * distance_to_path).sqrt();
    if entry < 0.0 || entry > path_length {
        return None;
    }
    Some(entry / path_length)
}

/// Collect every pickup and office-return event along the segment, in
/// map order (loot first, then offices).
fn gather_events(map: &Map, start: Position, end: Position) -> Vec<CollisionEvent> {
    let mut events = Vec::new();
    for item in map.loot() {
        if let Some(t) = collision_time(start, end, item.position, ITEM_COLLISION_RADIUS) {
            events.push(CollisionEvent::Pickup { t, item: item.id });
        }
    }
    for office in map.offices() {
        if let Some(t) = collision_time(start, end, office.location(), OFFICE_COLLISION_RADIUS) {
            events.push(CollisionEvent::OfficeReturn { t });
        }
    }
    events
}

/// Apply all collision effects of one dog's motion segment.
///
/// Events are processed in ascending `t`; the sort is stable, so ties
/// keep insertion order. A pickup with a full bag is dropped and the
/// item stays on the map. An office return credits and empties the bag.
pub fn resolve(dog: &mut Dog, map: &mut Map, start: Position, end: Position) {
    let mut events = gather_events(map, start, end);
    events.sort_by(|a, b| a.t().total_cmp(&b.t()));

    for event in events {
        match event {
            CollisionEvent::Pickup { item, .. } => {
                if dog.bag_is_full() {
                    continue;
                }
                if let Some(item) = map.take_loot(item) {
                    // Cannot fail, fullness was checked above.
                    let _ = dog.stash(item);
                }
            }
            CollisionEvent::OfficeReturn { .. } => {
                dog.deposit_bag();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use model::{DogId, LootItem, MapId, Office, OfficeId, Offset, Point, Road};

    fn map_with(loot: &[(u64, f64, f64)], offices: &[(i64, i64)]) -> Map {
        let mut map = Map::new(MapId::new("m1"), "town", 4.0, 3);
        map.add_road(Road::horizontal(Point::new(0, 0), 10));
        for &(id, x, value) in loot {
            map.add_loot(LootItem {
                id: LootId(id),
                kind: 1,
                value,
                position: Position::new(x, 0.0),
            });
        }
        for (i, &(x, y)) in offices.iter().enumerate() {
            map.add_office(Office {
                id: OfficeId(format!("o{i}")),
                position: Point::new(x, y),
                offset: Offset { dx: 5, dy: 0 },
            });
        }
        map
    }

    fn dog(capacity: usize) -> Dog {
        Dog::new(
            DogId(0),
            "Rex",
            MapId::new("m1"),
            Position::new(0.0, 0.0),
            capacity,
        )
    }

    #[test]
    fn direct_hit_reports_entry_time() {
        let t = collision_time(
            Position::new(0.0, 0.0),
            Position::new(10.0, 0.0),
            Position::new(5.0, 0.0),
            0.3,
        )
        .unwrap();
        assert_approx_eq!(t, 0.47, 1e-9);
    }

    #[test]
    fn grazing_outside_radius_misses() {
        let t = collision_time(
            Position::new(0.0, 0.0),
            Position::new(10.0, 0.0),
            Position::new(5.0, 0.31),
            0.3,
        );
        assert!(t.is_none());
    }

    #[test]
    fn target_behind_the_segment_misses() {
        let t = collision_time(
            Position::new(2.0, 0.0),
            Position::new(10.0, 0.0),
            Position::new(0.0, 0.0),
            0.3,
        );
        assert!(t.is_none());
    }

    #[test]
    fn zero_length_segment_hits_only_within_radius() {
        let start = Position::new(5.0, 0.0);
        assert_eq!(
            collision_time(start, start, Position::new(5.2, 0.0), 0.3),
            Some(0.0)
        );
        assert_eq!(
            collision_time(start, start, Position::new(5.4, 0.0), 0.3),
            None
        );
    }

    #[test]
    fn single_road_pickup_empties_the_map() {
        let mut map = map_with(&[(7, 5.0, 10.0)], &[]);
        let mut dog = dog(3);
        resolve(
            &mut dog,
            &mut map,
            Position::new(0.0, 0.0),
            Position::new(5.0, 0.0),
        );
        assert_eq!(dog.bag().len(), 1);
        assert_eq!(dog.bag()[0].id, LootId(7));
        assert!(map.loot().is_empty());
        assert_eq!(dog.score(), 0);
    }

    #[test]
    fn full_bag_skips_the_pickup_and_leaves_the_item() {
        let mut map = map_with(&[(1, 2.0, 10.0), (2, 5.0, 10.0)], &[]);
        let mut dog = dog(1);
        resolve(
            &mut dog,
            &mut map,
            Position::new(0.0, 0.0),
            Position::new(10.0, 0.0),
        );
        assert_eq!(dog.bag().len(), 1);
        assert_eq!(dog.bag()[0].id, LootId(1));
        assert_eq!(map.loot().len(), 1);
        assert_eq!(map.loot()[0].id, LootId(2));
    }

    #[test]
    fn pickup_then_return_in_one_segment_scores() {
        let mut map = map_with(&[(1, 2.0, 10.0)], &[(8, 0)]);
        let mut dog = dog(3);
        resolve(
            &mut dog,
            &mut map,
            Position::new(0.0, 0.0),
            Position::new(10.0, 0.0),
        );
        assert_eq!(dog.score(), 10);
        assert!(dog.bag().is_empty());
        assert!(map.loot().is_empty());
    }

    #[test]
    fn pickup_after_the_office_stays_in_the_bag() {
        let mut map = map_with(&[(1, 8.0, 10.0)], &[(2, 0)]);
        let mut dog = dog(3);
        resolve(
            &mut dog,
            &mut map,
            Position::new(0.0, 0.0),
            Position::new(10.0, 0.0),
        );
        assert_eq!(dog.score(), 0);
        assert_eq!(dog.bag().len(), 1);
    }

    #[test]
    fn office_between_two_pickups_splits_the_deposit() {
        let mut map = map_with(&[(1, 2.0, 10.0), (2, 8.0, 4.0)], &[(5, 0)]);
        let mut dog = dog(1);
        resolve(
            &mut dog,
            &mut map,
            Position::new(0.0, 0.0),
            Position::new(10.0, 0.0),
        );
        // First pickup fills the one-slot bag, the office converts it to
        // score, the second pickup refills.
        assert_eq!(dog.score(), 10);
        assert_eq!(dog.bag().len(), 1);
        assert_eq!(dog.bag()[0].id, LootId(2));
        assert!(map.loot().is_empty());
    }

    #[test]
    fn stationary_dog_picks_up_loot_it_stands_on() {
        let mut map = map_with(&[(1, 0.0, 10.0)], &[]);
        let mut dog = dog(3);
        let pos = Position::new(0.2, 0.0);
        resolve(&mut dog, &mut map, pos, pos);
        assert_eq!(dog.bag().len(), 1);
    }
}
