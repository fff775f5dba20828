// Menace gauge: how threatening the creature currently is to the player.
//
// Every `MenaceParams::interval` seconds the navigator re-scores menace from
// two terms, the straight-line distance to the player and the hop distance
// from the creature's node to the player's nearest node:
//
//     menace = (neutral_distance - distance) / factor_distance
//            + (neutral_node_distance - hops) / factor_node_distance
//
// Destroying a beacon nudges the score by `beacon_destroy_menace_change`.
// After every change the score is checked against two thresholds. Too low and
// the nodes the player is looking at are coerced to `coerced_weight`; too
// high and the nodes on the far side of the map, seen from the world origin,
// are coerced instead. In both cases every other node is reset to neutral,
// which also wipes any lingering sound heat. Between the thresholds nothing
// happens.
//
// The coerced regions are truncated cones ("frustums"). `frustum_points`
// samples one as slices along its axis, each slice a set of concentric rings
// spaced `min_point_spacing` apart, each ring a set of points about the same
// spacing apart along its arc. The cone is built around +Z and rotated onto
// the requested direction. A ring of radius zero is a single point on the
// axis. Every sample is mapped to its nearest node through one parallel
// `KdTree::nearest_batch` call, and the node list is de-duplicated keeping
// first-seen order.
//
// See also: `config.rs` for `MenaceParams`/`FrustumParams`, `navigator.rs`
// which schedules the gauge and applies the coercion.

use crate::config::{FrustumParams, MenaceParams};
use crate::error::NavResult;
use crate::kdtree::KdTree;
use crate::types::{NodeId, Vec3};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

/// Which frustum a menace score coerces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Coercion {
    /// Forward from the player, along their facing.
    PlayerView,
    /// From the world origin, pointing away from the player.
    OppositeSide,
}

impl MenaceParams {
    /// Score from the creature's world distance and hop distance to the
    /// player.
    pub fn score(&self, distance: f32, hops: usize) -> f32 {
        (self.neutral_distance - distance) / self.factor_distance
            + (self.neutral_node_distance - hops as f32) / self.factor_node_distance
    }

    pub fn coercion(&self, menace: f32) -> Option<Coercion> {
        if menace <= self.lower_threshold {
            Some(Coercion::PlayerView)
        } else if menace >= self.higher_threshold {
            Some(Coercion::OppositeSide)
        } else {
            None
        }
    }
}

/// Rotation taking +Z onto a unit direction (Rodrigues form).
#[derive(Clone, Copy, Debug)]
struct FromForward {
    axis: Vec3,
    cos: f32,
    sin: f32,
}

impl FromForward {
    fn new(direction: Vec3) -> Self {
        let dir = direction.normalized();
        if dir == Vec3::ZERO {
            return Self::IDENTITY;
        }
        let cross = Vec3::FORWARD.cross(dir);
        let sin = cross.length();
        let cos = Vec3::FORWARD.dot(dir);
        if sin <= f32::EPSILON {
            if cos > 0.0 {
                return Self::IDENTITY;
            }
            // Antiparallel: half turn about Y.
            return Self {
                axis: Vec3::new(0.0, 1.0, 0.0),
                cos: -1.0,
                sin: 0.0,
            };
        }
        Self {
            axis: cross * (1.0 / sin),
            cos,
            sin,
        }
    }

    const IDENTITY: Self = Self {
        axis: Vec3::FORWARD,
        cos: 1.0,
        sin: 0.0,
    };

    fn apply(&self, v: Vec3) -> Vec3 {
        let k = self.axis;
        v * self.cos + k.cross(v) * self.sin + k * (k.dot(v) * (1.0 - self.cos))
    }
}

/// Sample points filling a frustum whose axis starts at `origin` and points
/// along `direction`. A zero `direction` leaves the frustum facing +Z.
pub fn frustum_points(origin: Vec3, direction: Vec3, params: &FrustumParams) -> Vec<Vec3> {
    let spacing = params.min_point_spacing;
    if !spacing.is_finite() || spacing <= 0.0 {
        return Vec::new();
    }
    let rotation = FromForward::new(direction);
    let length = params.end_length - params.start_length;
    let slices = (length / spacing).floor().max(0.0) as usize;

    let mut points = Vec::new();
    for slice in 0..=slices {
        let t = if slices == 0 {
            0.0
        } else {
            slice as f32 / slices as f32
        };
        let along = params.start_length + t * length;
        let radius = params.start_radius + t * (params.end_radius - params.start_radius);
        let rings = (radius / spacing).floor().max(0.0) as usize;

        for ring in 0..=rings {
            let r = if rings == 0 {
                0.0
            } else {
                radius * ring as f32 / rings as f32
            };
            if r <= 0.0 {
                points.push(origin + rotation.apply(Vec3::new(0.0, 0.0, along)));
                continue;
            }
            let arc_points = ((TAU * r) / spacing).ceil().max(1.0) as usize;
            for k in 0..arc_points {
                let angle = TAU * k as f32 / arc_points as f32;
                let local = Vec3::new(r * angle.cos(), r * angle.sin(), along);
                points.push(origin + rotation.apply(local));
            }
        }
    }
    points
}

/// Distinct nodes nearest to the frustum's sample points, in the order they
/// are first found.
pub fn frustum_nodes(
    index: &KdTree,
    origin: Vec3,
    direction: Vec3,
    params: &FrustumParams,
) -> NavResult<Vec<NodeId>> {
    let points = frustum_points(origin, direction, params);
    let nearest = index.nearest_batch(&points)?;
    let mut seen = FxHashSet::default();
    Ok(nearest.into_iter().filter(|id| seen.insert(*id)).collect())
}
