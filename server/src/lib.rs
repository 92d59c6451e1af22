//! # Lost and Found server core
//!
//! Authoritative simulation and session subsystem for the Lost and Found
//! multiplayer game. Players join a map, steer their dog along the road
//! network, collect loot, deposit it at offices for score, and are
//! retired to a durable records store after idling too long.
//!
//! The [`app::Application`] façade is the single entry point a transport
//! adapter talks to: join, list players, read state, set an action. A
//! ticker calls [`app::Application::tick`] on a fixed cadence to drive
//! motion, collision resolution, loot replenishment and idle retirement.
//!
//! ## Module organization
//!
//! - [`config`] - world configuration, read once at startup
//! - [`motion`] - road-constrained movement per map
//! - [`collision`] - swept pickup and office-return resolution
//! - [`loot`] - loot replenishment policy
//! - [`sessions`] - players, dogs, tokens and their indices
//! - [`records`] - durable ranked store of retired players
//! - [`app`] - the façade owning world and sessions behind one lock

pub mod app;
pub mod collision;
pub mod config;
pub mod loot;
pub mod motion;
pub mod records;
pub mod sessions;
