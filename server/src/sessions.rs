//! Session registry: the live players and dogs, the indices that resolve
//! tokens and ids to them, and per-player lifecycle metadata.
//!
//! Players and dogs are kept in ordered sequences because the tick
//! processes dogs in stable join order. The three lookup indices store
//! positions into those sequences and are rebuilt after every removal so
//! they can never point at a shifted slot.

use log::info;
use model::{Dog, DogId, Map, MapId, Player, PlayerId, Position};
use rand::rngs::OsRng;
use rand::RngCore;
use std::collections::HashMap;
use std::time::Instant;

/// Lifecycle metadata kept per player, retained after retirement so a
/// second retirement of the same id stays a no-op.
#[derive(Debug, Clone, Copy)]
pub struct PlayerMeta {
    pub join_time: Instant,
    pub idle_since: Option<Instant>,
    pub retired: bool,
}

/// A 32-character lowercase hex auth token from the OS entropy source.
pub fn generate_token() -> String {
    let mut rng = OsRng;
    format!("{:016x}{:016x}", rng.next_u64(), rng.next_u64())
}

#[derive(Debug, Default)]
pub struct SessionRegistry {
    players: Vec<Player>,
    dogs: Vec<Dog>,
    token_index: HashMap<String, usize>,
    player_index: HashMap<PlayerId, usize>,
    dog_index: HashMap<DogId, usize>,
    meta: HashMap<PlayerId, PlayerMeta>,
    next_player_id: u32,
    next_dog_id: u32,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a dog and player on the given map. The caller has already
    /// validated the user name and resolved the map.
    pub fn join(&mut self, user_name: &str, map: &Map, spawn: Position) -> (String, PlayerId) {
        let dog_id = DogId(self.next_dog_id);
        self.next_dog_id += 1;
        let dog = Dog::new(dog_id, user_name, map.id().clone(), spawn, map.bag_capacity());
        self.dog_index.insert(dog_id, self.dogs.len());
        self.dogs.push(dog);

        let player_id = PlayerId(self.next_player_id);
        self.next_player_id += 1;
        let token = generate_token();
        self.token_index.insert(token.clone(), self.players.len());
        self.player_index.insert(player_id, self.players.len());
        self.players.push(Player {
            id: player_id,
            name: user_name.to_string(),
            dog_id,
            map_id: map.id().clone(),
            token: token.clone(),
        });

        self.meta.insert(
            player_id,
            PlayerMeta {
                join_time: Instant::now(),
                idle_since: None,
                retired: false,
            },
        );

        info!("player {player_id} ({user_name}) joined map {}", map.id());
        (token, player_id)
    }

    pub fn find_by_token(&self, token: &str) -> Option<&Player> {
        self.token_index.get(token).map(|&i| &self.players[i])
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.player_index.get(&id).map(|&i| &self.players[i])
    }

    pub fn dog(&self, id: DogId) -> Option<&Dog> {
        self.dog_index.get(&id).map(|&i| &self.dogs[i])
    }

    pub fn dog_mut(&mut self, id: DogId) -> Option<&mut Dog> {
        let idx = *self.dog_index.get(&id)?;
        Some(&mut self.dogs[idx])
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn dog_count(&self) -> usize {
        self.dogs.len()
    }

    pub fn dog_at_mut(&mut self, idx: usize) -> &mut Dog {
        &mut self.dogs[idx]
    }

    pub fn players_on_map<'a>(&'a self, map_id: &'a MapId) -> impl Iterator<Item = &'a Player> {
        self.players.iter().filter(move |p| &p.map_id == map_id)
    }

    pub fn meta(&self, id: PlayerId) -> Option<&PlayerMeta> {
        self.meta.get(&id)
    }

    pub fn meta_mut(&mut self, id: PlayerId) -> Option<&mut PlayerMeta> {
        self.meta.get_mut(&id)
    }

    /// Ids of every player not yet retired.
    pub fn active_ids(&self) -> Vec<PlayerId> {
        self.meta
            .iter()
            .filter(|(_, m)| !m.retired)
            .map(|(&id, _)| id)
            .collect()
    }

    pub fn mark_retired(&mut self, id: PlayerId) {
        if let Some(meta) = self.meta.get_mut(&id) {
            meta.retired = true;
        }
    }

    /// Excise the player and their dog from the sequences and all three
    /// indices. Metadata is retained. Returns the removed pair.
    pub fn remove(&mut self, id: PlayerId) -> Option<(Player, Dog)> {
        let player_pos = self.players.iter().position(|p| p.id == id)?;
        let dog_id = self.players[player_pos].dog_id;
        let dog_pos = self.dogs.iter().position(|d| d.id == dog_id)?;
        let player = self.players.remove(player_pos);
        let dog = self.dogs.remove(dog_pos);

        self.token_index.remove(&player.token);
        self.player_index.remove(&player.id);
        self.dog_index.remove(&dog.id);
        self.rebuild_indices();
        Some((player, dog))
    }

    fn rebuild_indices(&mut self) {
        self.token_index.clear();
        self.player_index.clear();
        for (i, player) in self.players.iter().enumerate() {
            self.token_index.insert(player.token.clone(), i);
            self.player_index.insert(player.id, i);
        }
        self.dog_index.clear();
        for (i, dog) in self.dogs.iter().enumerate() {
            self.dog_index.insert(dog.id, i);
        }
    }

    /// Check that every index entry points at the entity it was filed
    /// under. Used by tests and debug assertions.
    pub fn indices_consistent(&self) -> bool {
        self.players.iter().enumerate().all(|(i, p)| {
            self.token_index.get(&p.token) == Some(&i) && self.player_index.get(&p.id) == Some(&i)
        }) && self
            .dogs
            .iter()
            .enumerate()
            .all(|(i, d)| self.dog_index.get(&d.id) == Some(&i))
            && self.token_index.len() == self.players.len()
            && self.player_index.len() == self.players.len()
            && self.dog_index.len() == self.dogs.len()
    }
}
