//! The application façade.
//!
//! Single owner of the world and the session registry. Every public
//! operation goes through one `RwLock`: mutations and the tick take it
//! exclusively, state queries take it shared and copy their results out
//! before releasing. A transport adapter calls these operations from its
//! request handlers; a ticker drives [`Application::tick`] on a fixed
//! cadence.
//!
//! Tick order: motion and collision per dog in join order, then loot
//! replenishment, then the idle-retirement sweep.

use crate::collision;
use crate::loot;
use crate::motion::{MotionError, RoadNetwork};
use crate::sessions::SessionRegistry;
use log::info;
use model::{
    Direction, LootId, MapId, PlayerId, Position, Velocity, World, DEFAULT_DOG_SPEED,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Hook invoked with `(name, score, play_time_seconds)` when a player
/// retires. The records store is normally wired through this.
pub type RetirementCallback = Box<dyn Fn(&str, i64, f64) + Send + Sync>;

#[derive(Debug, Error, PartialEq)]
pub enum JoinError {
    #[error("user name must not be empty")]
    InvalidName,
    #[error("unknown map {0}")]
    UnknownMap(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum ActionError {
    #[error("unknown or retired token")]
    Unauthorized,
    #[error("unknown move code {0:?}")]
    BadRequest(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct JoinInfo {
    pub token: String,
    pub player_id: PlayerId,
}

/// Copied-out view of one player for state queries.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub name: String,
    pub position: Position,
    pub velocity: Velocity,
    pub direction: Direction,
    pub bag: Vec<BagSlot>,
    pub score: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BagSlot {
    pub id: LootId,
    pub kind: usize,
}

struct AppState {
    world: World,
    networks: HashMap<MapId, RoadNetwork>,
    sessions: SessionRegistry,
    on_retire: Option<RetirementCallback>,
}

pub struct Application {
    state: RwLock<AppState>,
    randomize_spawn: bool,
    retirement_after: Duration,
}

impl Application {
    pub fn new(world: World, randomize_spawn: bool, retirement_seconds: f64) -> Self {
        let networks = world
            .maps()
            .iter()
            .map(|map| (map.id().clone(), RoadNetwork::new(map)))
            .collect();
        Self {
            state: RwLock::new(AppState {
                world,
                networks,
                sessions: SessionRegistry::new(),
                on_retire: None,
            }),
            randomize_spawn,
            retirement_after: Duration::from_secs_f64(retirement_seconds),
        }
    }

    pub fn set_retirement_callback(&self, callback: RetirementCallback) {
        self.state.write().unwrap().on_retire = Some(callback);
    }

    /// Join a map. Spawns a dog at the map default or, when spawn
    /// randomization is on, at a uniform point on the road network.
    pub fn join_game(&self, user_name: &str, map_id: &str) -> Result<JoinInfo, JoinError> {
        if user_name.is_empty() {
            return Err(JoinError::InvalidName);
        }
        let mut state = self.state.write().unwrap();
        let state = &mut *state;
        let map_id = MapId::new(map_id);
        let Some(map) = state.world.map(&map_id) else {
            return Err(JoinError::UnknownMap(map_id.0));
        };

        let spawn = if self.randomize_spawn {
            state
                .networks
                .get(&map_id)
                .and_then(|network| network.random_position(&mut rand::thread_rng()))
        } else {
            None
        }
        .or_else(|| map.default_spawn())
        .unwrap_or_default();

        let (token, player_id) = state.sessions.join(user_name, map, spawn);
        Ok(JoinInfo { token, player_id })
    }

    /// Every player on the token holder's map, with full dog state.
    /// Empty for an unknown or retired token.
    pub fn game_state(&self, token: &str) -> Vec<PlayerSnapshot> {
        let state = self.state.read().unwrap();
        Self::snapshots(&state, token)
    }

    /// Same view as [`Application::game_state`]; the transport layer
    /// serializes the two differently.
    pub fn players(&self, token: &str) -> Vec<PlayerSnapshot> {
        let state = self.state.read().unwrap();
        Self::snapshots(&state, token)
    }

    /// Apply a move command: "L", "R", "U", "D" set velocity at map dog
    /// speed and turn the dog; "" stops it and keeps the facing.
    pub fn set_player_action(&self, token: &str, move_cmd: &str) -> Result<(), ActionError> {
        let mut state = self.state.write().unwrap();
        let player = state
            .sessions
            .find_by_token(token)
            .ok_or(ActionError::Unauthorized)?;
        let (player_id, dog_id, map_id) = (player.id, player.dog_id, player.map_id.clone());
        let speed = state
            .world
            .map(&map_id)
            .map(|m| m.dog_speed())
            .unwrap_or(DEFAULT_DOG_SPEED);

        let (velocity, direction) = match move_cmd {
            "L" => (Velocity::new(-speed, 0.0), Some(Direction::West)),
            "R" => (Velocity::new(speed, 0.0), Some(Direction::East)),
            "U" => (Velocity::new(0.0, -speed), Some(Direction::North)),
            "D" => (Velocity::new(0.0, speed), Some(Direction::South)),
            "" => (Velocity::default(), None),
            other => return Err(ActionError::BadRequest(other.to_string())),
        };

        let Some(dog) = state.sessions.dog_mut(dog_id) else {
            return Err(ActionError::Unauthorized);
        };
        dog.velocity = velocity;
        if let Some(direction) = direction {
            dog.direction = direction;
        }

        if let Some(meta) = state.sessions.meta_mut(player_id) {
            if velocity.is_zero() {
                meta.idle_since.get_or_insert_with(Instant::now);
            } else {
                meta.idle_since = None;
            }
        }
        Ok(())
    }

    /// Advance the simulation by `delta`.
    pub fn tick(&self, delta: Duration) {
        let mut state = self.state.write().unwrap();
        if let Err(err) = Self::update_world(&mut state, delta.as_secs_f64()) {
            // An off-road dog is corrupted state, not recoverable input.
            panic!("tick aborted: {err}");
        }
        loot::replenish(&mut state.world);
        Self::check_retirement(&mut state, self.retirement_after);
        debug_assert!(state.sessions.indices_consistent());
    }

    pub fn player_count(&self) -> usize {
        self.state.read().unwrap().sessions.players().len()
    }

    fn snapshots(state: &AppState, token: &str) -> Vec<PlayerSnapshot> {
        let Some(player) = state.sessions.find_by_token(token) else {
            return Vec::new();
        };
        let map_id = player.map_id.clone();
        state
            .sessions
            .players_on_map(&map_id)
            .filter_map(|p| {
                let dog = state.sessions.dog(p.dog_id)?;
                Some(PlayerSnapshot {
                    id: p.id,
                    name: p.name.clone(),
                    position: dog.position,
                    velocity: dog.velocity,
                    direction: dog.direction,
                    bag: dog
                        .bag()
                        .iter()
                        .map(|item| BagSlot {
                            id: item.id,
                            kind: item.kind,
                        })
                        .collect(),
                    score: dog.score(),
                })
            })
            .collect()
    }

    /// Motion and collision for every dog, in stable join order.
    fn update_world(state: &mut AppState, dt: f64) -> Result<(), MotionError> {
        let AppState {
            world,
            networks,
            sessions,
            ..
        } = state;

        for idx in 0..sessions.dog_count() {
            let dog = sessions.dog_at_mut(idx);
            let map_id = dog.map_id.clone();
            let start = dog.position;

            if !dog.velocity.is_zero() {
                if let Some(network) = networks.get(&map_id) {
                    let moved = network.constrain(start, dog.velocity, dt)?;
                    dog.position = moved.position;
                    if moved.clipped {
                        dog.stop();
                    }
                }
            }

            let end = dog.position;
            if let Some(map) = world.map_mut(&map_id) {
                collision::resolve(dog, map, start, end);
            }
        }
        Ok(())
    }

    /// Start or clear idle clocks, then retire everyone past the limit.
    fn check_retirement(state: &mut AppState, retirement_after: Duration) {
        let now = Instant::now();
        let mut due = Vec::new();
        for id in state.sessions.active_ids() {
            let Some(player) = state.sessions.player(id) else {
                continue;
            };
            let dog_id = player.dog_id;
            let Some(dog) = state.sessions.dog(dog_id) else {
                continue;
            };
            let idle = dog.velocity.is_zero();
            let Some(meta) = state.sessions.meta_mut(id) else {
                continue;
            };
            if idle {
                let since = *meta.idle_since.get_or_insert(now);
                if now.duration_since(since) >= retirement_after {
                    due.push(id);
                }
            } else {
                meta.idle_since = None;
            }
        }
        for id in due {
            Self::retire_player(state, id, now);
        }
    }

    /// Emit the record, mark the metadata retired and excise the player.
    /// A second call for the same id is a no-op.
    fn retire_player(state: &mut AppState, id: PlayerId, now: Instant) {
        let Some(meta) = state.sessions.meta(id) else {
            return;
        };
        if meta.retired {
            return;
        }
        let join_time = meta.join_time;
        let Some(player) = state.sessions.player(id) else {
            return;
        };
        let name = player.name.clone();
        let dog_id = player.dog_id;
        let Some(dog) = state.sessions.dog(dog_id) else {
            return;
        };
        let score = dog.score();
        let play_time_seconds = now.duration_since(join_time).as_secs_f64();

        if let Some(callback) = &state.on_retire {
            callback(&name, score, play_time_seconds);
        }
        state.sessions.mark_retired(id);
        let _ = state.sessions.remove(id);
        info!("player {id} ({name}) retired with score {score} after {play_time_seconds:.1}s");
    }
}
