//! # World Model
//!
//! Shared data model for the Lost and Found game server: geometry
//! primitives, typed entity ids, the per-map topology (roads, buildings,
//! offices, loot catalog) and the live entities that move through it
//! (loot items, dogs, players).
//!
//! Everything here is plain data. Motion, collision resolution, session
//! bookkeeping and persistence live in the `server` crate and operate on
//! these types. All structures serialize with `serde` so transport
//! adapters and the records store can encode them directly.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Half-width of the walkable strip around every road axis.
///
/// A road segment sweeps a square of this half-width along its axis; a
/// position is on the road network iff it lies inside at least one strip.
pub const ROAD_HALF_WIDTH: f64 = 0.4;

/// Collision radius for picking up a loot item.
pub const ITEM_COLLISION_RADIUS: f64 = 0.3;

/// Collision radius for returning the bag at an office.
pub const OFFICE_COLLISION_RADIUS: f64 = 0.55;

/// Dog speed used when neither the map nor the configuration provides one.
pub const DEFAULT_DOG_SPEED: f64 = 1.0;

/// Bag capacity used when neither the map nor the configuration provides one.
pub const DEFAULT_BAG_CAPACITY: usize = 3;

/// Value of a loot item whose catalog entry carries no explicit value.
pub const DEFAULT_LOOT_VALUE: f64 = 10.0;

/// Seconds of idling after which a player is retired, unless configured.
pub const DEFAULT_RETIREMENT_SECONDS: f64 = 60.0;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorldError {
    #[error("duplicate map id {0}")]
    DuplicateMap(MapId),
}

/// Identifier of a map, stable across the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MapId(pub String);

impl MapId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a player, unique across the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u32);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a dog, unique across the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DogId(pub u32);

impl fmt::Display for DogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a loot item. Ids are drawn from a monotonically
/// increasing per-world counter and are never reissued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LootId(pub u64);

impl fmt::Display for LootId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of an office within its map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OfficeId(pub String);

/// Integer grid point used by the static topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

/// Real-valued position of a moving entity.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: Position) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

impl From<Point> for Position {
    fn from(p: Point) -> Self {
        Self {
            x: p.x as f64,
            y: p.y as f64,
        }
    }
}

/// Velocity in map units per second.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Velocity {
    pub vx: f64,
    pub vy: f64,
}

impl Velocity {
    pub fn new(vx: f64, vy: f64) -> Self {
        Self { vx, vy }
    }

    pub fn is_zero(&self) -> bool {
        self.vx == 0.0 && self.vy == 0.0
    }
}

/// Facing of a dog. Serialized with the single-letter codes the move
/// commands use ("U", "D", "L", "R").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "U")]
    North,
    #[serde(rename = "D")]
    South,
    #[serde(rename = "L")]
    West,
    #[serde(rename = "R")]
    East,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::North => "U",
            Direction::South => "D",
            Direction::West => "L",
            Direction::East => "R",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub w: i64,
    pub h: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rectangle {
    pub position: Point,
    pub size: Size,
}

/// Orientation of a road segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// An axis-aligned road segment. The walkable area is the strip of
/// half-width [`ROAD_HALF_WIDTH`] around the segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Road {
    orientation: Orientation,
    start: Point,
    end_coord: i64,
}

impl Road {
    pub fn horizontal(start: Point, end_x: i64) -> Self {
        Self {
            orientation: Orientation::Horizontal,
            start,
            end_coord: end_x,
        }
    }

    pub fn vertical(start: Point, end_y: i64) -> Self {
        Self {
            orientation: Orientation::Vertical,
            start,
            end_coord: end_y,
        }
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn is_horizontal(&self) -> bool {
        self.orientation == Orientation::Horizontal
    }

    pub fn start(&self) -> Point {
        self.start
    }

    pub fn end(&self) -> Point {
        match self.orientation {
            Orientation::Horizontal => Point::new(self.end_coord, self.start.y),
            Orientation::Vertical => Point::new(self.start.x, self.end_coord),
        }
    }

    /// Axis length of the segment, ignoring the strip width.
    pub fn length(&self) -> f64 {
        match self.orientation {
            Orientation::Horizontal => (self.end_coord - self.start.x).abs() as f64,
            Orientation::Vertical => (self.end_coord - self.start.y).abs() as f64,
        }
    }

    /// The walkable strip as normalized min/max bounds.
    pub fn strip(&self) -> StripBounds {
        let (a, b) = (self.start, self.end());
        StripBounds {
            min_x: a.x.min(b.x) as f64 - ROAD_HALF_WIDTH,
            max_x: a.x.max(b.x) as f64 + ROAD_HALF_WIDTH,
            min_y: a.y.min(b.y) as f64 - ROAD_HALF_WIDTH,
            max_y: a.y.max(b.y) as f64 + ROAD_HALF_WIDTH,
        }
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.strip().contains(pos)
    }
}

/// Axis-aligned bounds of a road strip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StripBounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl StripBounds {
    pub fn contains(&self, p: Position) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }

    /// Clamp a point into the bounds.
    pub fn clamp(&self, p: Position) -> Position {
        Position {
            x: p.x.clamp(self.min_x, self.max_x),
            y: p.y.clamp(self.min_y, self.max_y),
        }
    }
}

/// A building footprint. Informational only; buildings do not clip motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Building {
    pub bounds: Rectangle,
}

/// Rendering offset of an office relative to its anchor point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offset {
    pub dx: i64,
    pub dy: i64,
}

/// A deposit point that converts bag contents to score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Office {
    pub id: OfficeId,
    pub position: Point,
    pub offset: Offset,
}

impl Office {
    pub fn location(&self) -> Position {
        self.position.into()
    }
}

/// Catalog entry describing one kind of loot a map can spawn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LootType {
    pub value: f64,
}

/// A loot item currently lying on a map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LootItem {
    pub id: LootId,
    pub kind: usize,
    pub value: f64,
    pub position: Position,
}

/// Immutable per-map topology plus the mutable set of loot currently on
/// the map.
#[derive(Debug, Clone)]
pub struct Map {
    id: MapId,
    name: String,
    roads: Vec<Road>,
    buildings: Vec<Building>,
    offices: Vec<Office>,
    loot_types: Vec<LootType>,
    dog_speed: f64,
    bag_capacity: usize,
    loot: Vec<LootItem>,
}

impl Map {
    pub fn new(id: MapId, name: impl Into<String>, dog_speed: f64, bag_capacity: usize) -> Self {
        Self {
            id,
            name: name.into(),
            roads: Vec::new(),
            buildings: Vec::new(),
            offices: Vec::new(),
            loot_types: Vec::new(),
            dog_speed,
            bag_capacity,
            loot: Vec::new(),
        }
    }

    pub fn id(&self) -> &MapId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dog_speed(&self) -> f64 {
        self.dog_speed
    }

    pub fn bag_capacity(&self) -> usize {
        self.bag_capacity
    }

    pub fn add_road(&mut self, road: Road) {
        self.roads.push(road);
    }

    pub fn add_building(&mut self, building: Building) {
        self.buildings.push(building);
    }

    pub fn add_office(&mut self, office: Office) {
        self.offices.push(office);
    }

    pub fn add_loot_type(&mut self, loot_type: LootType) {
        self.loot_types.push(loot_type);
    }

    pub fn roads(&self) -> &[Road] {
        &self.roads
    }

    pub fn buildings(&self) -> &[Building] {
        &self.buildings
    }

    pub fn offices(&self) -> &[Office] {
        &self.offices
    }

    pub fn loot_types(&self) -> &[LootType] {
        &self.loot_types
    }

    pub fn loot(&self) -> &[LootItem] {
        &self.loot
    }

    pub fn add_loot(&mut self, item: LootItem) {
        self.loot.push(item);
    }

    /// Remove and return the item with the given id, if present.
    pub fn take_loot(&mut self, id: LootId) -> Option<LootItem> {
        let idx = self.loot.iter().position(|item| item.id == id)?;
        Some(self.loot.remove(idx))
    }

    /// Spawn position used when spawn randomization is off: the start of
    /// the first road.
    pub fn default_spawn(&self) -> Option<Position> {
        self.roads.first().map(|road| road.start().into())
    }
}

/// A player's avatar. Owns the bag and the score.
#[derive(Debug, Clone)]
pub struct Dog {
    pub id: DogId,
    pub name: String,
    pub map_id: MapId,
    pub position: Position,
    pub velocity: Velocity,
    pub direction: Direction,
    bag: Vec<LootItem>,
    bag_capacity: usize,
    score: i64,
}

impl Dog {
    pub fn new(
        id: DogId,
        name: impl Into<String>,
        map_id: MapId,
        position: Position,
        bag_capacity: usize,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            map_id,
            position,
            velocity: Velocity::default(),
            direction: Direction::North,
            bag: Vec::new(),
            bag_capacity,
            score: 0,
        }
    }

    pub fn bag(&self) -> &[LootItem] {
        &self.bag
    }

    pub fn bag_capacity(&self) -> usize {
        self.bag_capacity
    }

    pub fn bag_is_full(&self) -> bool {
        self.bag.len() >= self.bag_capacity
    }

    /// Append an item to the bag. A full bag rejects the item and hands
    /// it back.
    pub fn stash(&mut self, item: LootItem) -> Result<(), LootItem> {
        if self.bag_is_full() {
            return Err(item);
        }
        self.bag.push(item);
        Ok(())
    }

    /// Credit every bag item to the score and empty the bag. Each item is
    /// credited as a whole number of points. Returns the total credited.
    pub fn deposit_bag(&mut self) -> i64 {
        let mut credited = 0;
        for item in self.bag.drain(..) {
            credited += item.value as i64;
        }
        self.score += credited;
        credited
    }

    pub fn score(&self) -> i64 {
        self.score
    }

    pub fn stop(&mut self) {
        self.velocity = Velocity::default();
    }
}

/// A joined player. The auth token is an opaque 32-character lowercase
/// hex string.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub dog_id: DogId,
    pub map_id: MapId,
    pub token: String,
}

/// The world: every map loaded at startup plus the defaults that apply
/// when a map omits a setting, and the loot id counter.
#[derive(Debug)]
pub struct World {
    maps: Vec<Map>,
    map_index: HashMap<MapId, usize>,
    default_dog_speed: f64,
    default_bag_capacity: usize,
    next_loot_id: u64,
}

impl World {
    pub fn new(default_dog_speed: f64, default_bag_capacity: usize) -> Self {
        Self {
            maps: Vec::new(),
            map_index: HashMap::new(),
            default_dog_speed,
            default_bag_capacity,
            next_loot_id: 0,
        }
    }

    pub fn default_dog_speed(&self) -> f64 {
        self.default_dog_speed
    }

    pub fn default_bag_capacity(&self) -> usize {
        self.default_bag_capacity
    }

    pub fn add_map(&mut self, map: Map) -> Result<(), WorldError> {
        if self.map_index.contains_key(map.id()) {
            return Err(WorldError::DuplicateMap(map.id().clone()));
        }
        self.map_index.insert(map.id().clone(), self.maps.len());
        self.maps.push(map);
        Ok(())
    }

    pub fn maps(&self) -> &[Map] {
        &self.maps
    }

    pub fn map(&self, id: &MapId) -> Option<&Map> {
        self.map_index.get(id).map(|&i| &self.maps[i])
    }

    pub fn map_mut(&mut self, id: &MapId) -> Option<&mut Map> {
        let idx = *self.map_index.get(id)?;
        Some(&mut self.maps[idx])
    }

    pub fn map_at_mut(&mut self, idx: usize) -> &mut Map {
        &mut self.maps[idx]
    }

    /// Draw the next loot id. Ids are monotonic and never reissued.
    pub fn alloc_loot_id(&mut self) -> LootId {
        let id = LootId(self.next_loot_id);
        self.next_loot_id += 1;
        id
    }
}
