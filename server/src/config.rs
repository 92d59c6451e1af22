//! World configuration.
//!
//! Read once at startup from a JSON document. Top-level defaults apply
//! to every map that does not override them; each map carries its roads,
//! buildings, offices and loot-type catalog. Loading also seeds the
//! initial loot population from the catalog.

use crate::loot;
use log::warn;
use model::{
    Building, LootItem, LootType, Map, MapId, Office, OfficeId, Offset, Point, Position,
    Rectangle, Road, Size, World, DEFAULT_BAG_CAPACITY, DEFAULT_DOG_SPEED, DEFAULT_LOOT_VALUE,
    DEFAULT_RETIREMENT_SECONDS, WorldError,
};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Items seeded per loot-type catalog entry at load time.
const SEED_ITEMS_PER_TYPE: usize = 3;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("map {map}: road needs x1 (horizontal) or y1 (vertical)")]
    InvalidRoad { map: String },
    #[error("map {map}: at least one road is required")]
    NoRoads { map: String },
    #[error("duplicate map id {0}")]
    DuplicateMap(String),
}

impl From<WorldError> for ConfigError {
    fn from(err: WorldError) -> Self {
        match err {
            WorldError::DuplicateMap(id) => ConfigError::DuplicateMap(id.0),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameConfig {
    #[serde(default)]
    default_dog_speed: Option<f64>,
    #[serde(default)]
    default_bag_capacity: Option<usize>,
    #[serde(default)]
    dog_retirement_time: Option<f64>,
    /// Accepted for forward compatibility; the generator currently runs
    /// a fixed respawn policy and does not consult it.
    #[serde(default)]
    loot_generator_config: Option<serde_json::Value>,
    maps: Vec<MapConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MapConfig {
    id: String,
    name: String,
    #[serde(default)]
    dog_speed: Option<f64>,
    #[serde(default)]
    bag_capacity: Option<usize>,
    roads: Vec<RoadConfig>,
    #[serde(default)]
    buildings: Vec<BuildingConfig>,
    #[serde(default)]
    offices: Vec<OfficeConfig>,
    #[serde(default)]
    loot_types: Vec<LootTypeConfig>,
}

#[derive(Debug, Deserialize)]
struct RoadConfig {
    x0: i64,
    y0: i64,
    #[serde(default)]
    x1: Option<i64>,
    #[serde(default)]
    y1: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct BuildingConfig {
    x: i64,
    y: i64,
    w: i64,
    h: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OfficeConfig {
    id: String,
    x: i64,
    y: i64,
    offset_x: i64,
    offset_y: i64,
}

#[derive(Debug, Deserialize)]
struct LootTypeConfig {
    #[serde(default)]
    value: Option<f64>,
}

/// The loaded world plus the settings that live outside it.
#[derive(Debug)]
pub struct LoadedGame {
    pub world: World,
    pub retirement_seconds: f64,
}

pub fn load_game(path: &Path) -> Result<LoadedGame, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let config: GameConfig = serde_json::from_str(&text)?;
    build_game(config)
}

pub fn build_game(config: GameConfig) -> Result<LoadedGame, ConfigError> {
    if config.loot_generator_config.is_some() {
        warn!("lootGeneratorConfig is present but unused; loot respawns in fixed batches of {}",
            loot::RESPAWN_BATCH);
    }

    let mut world = World::new(
        config.default_dog_speed.unwrap_or(DEFAULT_DOG_SPEED),
        config.default_bag_capacity.unwrap_or(DEFAULT_BAG_CAPACITY),
    );

    for map_config in config.maps {
        let map = build_map(&mut world, map_config)?;
        world.add_map(map)?;
    }

    Ok(LoadedGame {
        world,
        retirement_seconds: config
            .dog_retirement_time
            .unwrap_or(DEFAULT_RETIREMENT_SECONDS),
    })
}

fn build_map(world: &mut World, config: MapConfig) -> Result<Map, ConfigError> {
    if config.roads.is_empty() {
        return Err(ConfigError::NoRoads { map: config.id });
    }

    let mut map = Map::new(
        MapId::new(config.id.clone()),
        config.name,
        config.dog_speed.unwrap_or(world.default_dog_speed()),
        config.bag_capacity.unwrap_or(world.default_bag_capacity()),
    );

    for road in &config.roads {
        let start = Point::new(road.x0, road.y0);
        let parsed = if let Some(x1) = road.x1 {
            Road::horizontal(start, x1)
        } else if let Some(y1) = road.y1 {
            Road::vertical(start, y1)
        } else {
            return Err(ConfigError::InvalidRoad {
                map: config.id.clone(),
            });
        };
        map.add_road(parsed);
    }

    for building in &config.buildings {
        map.add_building(Building {
            bounds: Rectangle {
                position: Point::new(building.x, building.y),
                size: Size {
                    w: building.w,
                    h: building.h,
                },
            },
        });
    }

    for office in config.offices {
        map.add_office(Office {
            id: OfficeId(office.id),
            position: Point::new(office.x, office.y),
            offset: Offset {
                dx: office.offset_x,
                dy: office.offset_y,
            },
        });
    }

    seed_loot(world, &mut map, &config.loot_types);
    Ok(map)
}

/// Seed the initial loot population: a few items per catalog entry at
/// deterministic positions, kinds cycling through the catalog range.
fn seed_loot(world: &mut World, map: &mut Map, loot_types: &[LootTypeConfig]) {
    let mut seeded = 0usize;
    for loot_type in loot_types {
        let value = loot_type.value.unwrap_or(DEFAULT_LOOT_VALUE);
        map.add_loot_type(LootType { value });
        for i in 0..SEED_ITEMS_PER_TYPE {
            let position = Position::new(10.0 + i as f64 * 5.0, 10.0 + seeded as f64 * 3.0);
            let id = world.alloc_loot_id();
            map.add_loot(LootItem {
                id,
                kind: seeded % 5 + 1,
                value,
                position,
            });
            seeded += 1;
        }
    }
}
