//! Road-constrained motion.
//!
//! Dogs may only ever stand on the union of their map's road strips. The
//! [`RoadNetwork`] caches the strip bounds of one map and answers the
//! per-tick question: starting on the network with this velocity, where
//! does the dog end up after `dt` seconds, and was the move cut short by
//! a road boundary?

use model::{Map, Orientation, Position, Road, StripBounds, Velocity};
use rand::Rng;
use thiserror::Error;

const CLIP_EPSILON: f64 = 1e-9;

#[derive(Debug, Error, PartialEq)]
pub enum MotionError {
    /// The starting position is not on any road strip. This violates a
    /// world invariant and indicates a bug, not bad input.
    #[error("position ({x:.3}, {y:.3}) is off the road network")]
    OffRoad { x: f64, y: f64 },
}

/// Outcome of one constrained move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Moved {
    pub position: Position,
    /// True when a road boundary cut the move short. The caller must zero
    /// the dog's velocity afterwards.
    pub clipped: bool,
}

/// Precomputed road strips of one map.
#[derive(Debug)]
pub struct RoadNetwork {
    roads: Vec<Road>,
    strips: Vec<StripBounds>,
}

impl RoadNetwork {
    pub fn new(map: &Map) -> Self {
        Self {
            roads: map.roads().to_vec(),
            strips: map.roads().iter().map(Road::strip).collect(),
        }
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.strips.iter().any(|strip| strip.contains(pos))
    }

    /// Move from `start` with `velocity` for `dt` seconds, constrained to
    /// the road network.
    ///
    /// The unconstrained target is clamped into every strip containing
    /// `start`; the end point is the clamped candidate that advances
    /// farthest along the velocity direction, so motion continues onto
    /// any road crossing the current one.
    pub fn constrain(
        &self,
        start: Position,
        velocity: Velocity,
        dt: f64,
    ) -> Result<Moved, MotionError> {
        if velocity.is_zero() {
            return Ok(Moved {
                position: start,
                clipped: false,
            });
        }

        let target = Position::new(start.x + velocity.vx * dt, start.y + velocity.vy * dt);

        let mut best: Option<Position> = None;
        let mut best_advance = f64::NEG_INFINITY;
        for strip in self.strips.iter().filter(|s| s.contains(start)) {
            let candidate = strip.clamp(target);
            let advance =
                (candidate.x - start.x) * velocity.vx + (candidate.y - start.y) * velocity.vy;
            if advance > best_advance {
                best_advance = advance;
                best = Some(candidate);
            }
        }

        let end = best.ok_or(MotionError::OffRoad {
            x: start.x,
            y: start.y,
        })?;
        let clipped =
            (end.x - target.x).abs() > CLIP_EPSILON || (end.y - target.y).abs() > CLIP_EPSILON;
        Ok(Moved {
            position: end,
            clipped,
        })
    }

    /// Sample a spawn position on the network: a road chosen uniformly,
    /// then a point uniform along its axis. Returns None for a map with
    /// no roads.
    pub fn random_position<R: Rng>(&self, rng: &mut R) -> Option<Position> {
        if self.roads.is_empty() {
            return None;
        }
        let road = &self.roads[rng.gen_range(0..self.roads.len())];
        let (start, end) = (road.start(), road.end());
        let t = rng.gen::<f64>();
        Some(match road.orientation() {
            Orientation::Horizontal => Position::new(
                start.x as f64 + t * (end.x - start.x) as f64,
                start.y as f64,
            ),
            Orientation::Vertical => Position::new(
                start.x as f64,
                start.y as f64 + t * (end.y - start.y) as f64,
            ),
        })
    }
}
