//! Loot replenishment.
//!
//! Runs at the end of every tick: any map whose loot set has emptied gets
//! a fresh batch of five items laid out along its first road. Ids come
//! from the world's monotonic loot counter, so a respawned batch never
//! reuses the ids of the items just carried off.

use log::debug;
use model::{LootItem, Orientation, Position, Road, World, DEFAULT_LOOT_VALUE};

/// Items spawned per empty map.
pub const RESPAWN_BATCH: usize = 5;

/// Catalog index of respawned items.
pub const RESPAWN_KIND: usize = 1;

/// Evenly spaced interior points along the road axis.
fn seed_positions(road: &Road) -> Vec<Position> {
    let (start, end) = (road.start(), road.end());
    (0..RESPAWN_BATCH)
        .map(|i| {
            let t = (i + 1) as f64 / (RESPAWN_BATCH + 1) as f64;
            match road.orientation() {
                Orientation::Horizontal => Position::new(
                    start.x as f64 + t * (end.x - start.x) as f64,
                    start.y as f64,
                ),
                Orientation::Vertical => Position::new(
                    start.x as f64,
                    start.y as f64 + t * (end.y - start.y) as f64,
                ),
            }
        })
        .collect()
}

/// Refill every map whose loot set is empty.
pub fn replenish(world: &mut World) {
    for idx in 0..world.maps().len() {
        let map = &world.maps()[idx];
        if !map.loot().is_empty() {
            continue;
        }
        let Some(road) = map.roads().first().copied() else {
            continue;
        };
        let map_id = map.id().clone();
        for position in seed_positions(&road) {
            let id = world.alloc_loot_id();
            world.map_at_mut(idx).add_loot(LootItem {
                id,
                kind: RESPAWN_KIND,
                value: DEFAULT_LOOT_VALUE,
                position,
            });
        }
        debug!("respawned {RESPAWN_BATCH} loot items on map {map_id}");
    }
}
