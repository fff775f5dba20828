// Tunable creature parameters.
//
// Everything the navigator reads at runtime lives in `NavConfig`, loaded from
// JSON at startup and never mutated afterwards. The navigator holds no magic
// numbers of its own beyond the neutral weight and the snap epsilon in
// `weights.rs`.
//
// The struct is `#[serde(default)]` throughout, so a config file only needs
// the fields it overrides. `menace` is an `Option`: leaving it out (or setting
// it to `null`) disables the menace gauge entirely, which is what the
// deterministic scenario tests do.
//
// See also: `navigator.rs` which owns the config, `menace.rs` for how
// `MenaceParams` and `FrustumParams` are used.

use crate::error::{NavError, NavResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level creature configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavConfig {
    /// Node the creature spawns on.
    pub starting_node: u32,
    /// Seed for the wander roll.
    pub seed: u64,
    /// Scale of the cubic ease-out applied to node weights.
    pub decay_rate: f32,
    /// Total weight above which a sound is investigated directly.
    pub detection_threshold: f32,
    /// Total weight above which a sound triggers a fresh wander roll.
    pub new_wander_threshold: f32,
    /// World units per second, on and off the graph.
    pub travel_speed: f32,
    /// Reach for attacking the player or a beacon.
    pub attack_distance: f32,
    /// Seconds the creature stays locked in place after destroying a beacon.
    pub beacon_attack_duration: f32,
    /// Squared distance at which a creature heading back snaps onto its node.
    pub return_snap_distance_sq: f32,
    /// Share of a sound's intensity added to the direct neighbors of the
    /// sound's node.
    pub neighbor_falloff: f32,
    /// Share added to nodes two hops away.
    pub second_neighbor_falloff: f32,
    /// Weight removed from a neutral node when the creature reaches it, so
    /// wandering prefers places it has not been.
    pub arrival_weight_drop: f32,
    pub growl: GrowlParams,
    pub menace: Option<MenaceParams>,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            starting_node: 0,
            seed: 0x10c4_e5ee,
            decay_rate: 0.002,
            detection_threshold: 45.0,
            new_wander_threshold: 32.0,
            travel_speed: 4.0,
            attack_distance: 2.0,
            beacon_attack_duration: 3.0,
            return_snap_distance_sq: 0.1,
            neighbor_falloff: 0.25,
            second_neighbor_falloff: 0.05,
            arrival_weight_drop: 0.5,
            growl: GrowlParams::default(),
            menace: Some(MenaceParams::default()),
        }
    }
}

impl NavConfig {
    /// Parse and validate a JSON config.
    pub fn from_json_str(json: &str) -> NavResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> NavResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Reject values that would make the navigator divide by zero, move
    /// backwards, or loop without progress.
    pub fn validate(&self) -> NavResult<()> {
        let non_negative = [
            ("decay_rate", self.decay_rate),
            ("travel_speed", self.travel_speed),
            ("attack_distance", self.attack_distance),
            ("beacon_attack_duration", self.beacon_attack_duration),
            ("return_snap_distance_sq", self.return_snap_distance_sq),
            ("neighbor_falloff", self.neighbor_falloff),
            ("second_neighbor_falloff", self.second_neighbor_falloff),
            ("arrival_weight_drop", self.arrival_weight_drop),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(NavError::InvalidConfig(format!(
                    "{name} must be a finite non-negative number, got {value}"
                )));
            }
        }
        for (name, value) in [
            ("detection_threshold", self.detection_threshold),
            ("new_wander_threshold", self.new_wander_threshold),
        ] {
            if !value.is_finite() {
                return Err(NavError::InvalidConfig(format!("{name} must be finite")));
            }
        }
        if let Some(menace) = &self.menace {
            menace.validate()?;
        }
        Ok(())
    }
}

/// Ambient growl timing, driven by the volume factor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowlParams {
    /// Shortest gap between growls when the map is saturated with sound.
    pub base_delay: f32,
    /// Extra gap per unit of volume factor.
    pub volume_delay: f32,
    /// Longest gap as a multiple of the shortest.
    pub spread: f32,
}

impl Default for GrowlParams {
    fn default() -> Self {
        Self {
            base_delay: 5.0,
            volume_delay: 10.0,
            spread: 1.5,
        }
    }
}

impl GrowlParams {
    /// `(min, max)` seconds between growls for a given volume factor.
    pub fn delay_range(&self, volume_factor: f32) -> (f32, f32) {
        let min = self.base_delay + self.volume_delay * volume_factor;
        (min, min * self.spread)
    }
}

/// Menace gauge tuning. See `menace.rs`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MenaceParams {
    /// Seconds between re-evaluations.
    pub interval: f32,
    /// At or below this, nodes in the player's view are coerced.
    pub lower_threshold: f32,
    /// At or above this, nodes on the far side of the map are coerced.
    pub higher_threshold: f32,
    /// World distance to the player at which the distance term is zero.
    pub neutral_distance: f32,
    /// World units per unit of menace.
    pub factor_distance: f32,
    /// Hop distance to the player's node at which the hop term is zero.
    pub neutral_node_distance: f32,
    /// Hops per unit of menace.
    pub factor_node_distance: f32,
    /// Menace added when the creature destroys a beacon.
    pub beacon_destroy_menace_change: f32,
    /// Weight given to every node inside the coerced frustum. Nodes outside
    /// it are reset to neutral.
    pub coerced_weight: f32,
    /// Frustum projected forward from the player.
    pub near_frustum: FrustumParams,
    /// Frustum projected from the world origin away from the player.
    pub far_frustum: FrustumParams,
}

impl Default for MenaceParams {
    fn default() -> Self {
        Self {
            interval: 5.0,
            lower_threshold: -1.0,
            higher_threshold: 1.0,
            neutral_distance: 60.0,
            factor_distance: 50.0,
            neutral_node_distance: 5.0,
            factor_node_distance: 4.0,
            beacon_destroy_menace_change: 0.5,
            coerced_weight: 0.0,
            near_frustum: FrustumParams {
                start_length: 0.0,
                end_length: 100.0,
                start_radius: 0.0,
                end_radius: 35.0,
                min_point_spacing: 5.0,
            },
            far_frustum: FrustumParams {
                start_length: 30.0,
                end_length: 100.0,
                start_radius: 10.0,
                end_radius: 40.0,
                min_point_spacing: 5.0,
            },
        }
    }
}

impl MenaceParams {
    fn validate(&self) -> NavResult<()> {
        if !self.interval.is_finite() || self.interval <= 0.0 {
            return Err(NavError::InvalidConfig(
                "menace.interval must be positive".into(),
            ));
        }
        if self.factor_distance == 0.0 || self.factor_node_distance == 0.0 {
            return Err(NavError::InvalidConfig(
                "menace distance factors must be non-zero".into(),
            ));
        }
        if self.lower_threshold > self.higher_threshold {
            return Err(NavError::InvalidConfig(format!(
                "menace.lower_threshold {} exceeds higher_threshold {}",
                self.lower_threshold, self.higher_threshold
            )));
        }
        self.near_frustum.validate("near_frustum")?;
        self.far_frustum.validate("far_frustum")
    }
}

/// A truncated cone sampled on a grid of rings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrustumParams {
    /// Distance along the axis where the frustum starts.
    pub start_length: f32,
    /// Distance along the axis where it ends.
    pub end_length: f32,
    pub start_radius: f32,
    pub end_radius: f32,
    /// Target gap between neighboring sample points.
    pub min_point_spacing: f32,
}

impl FrustumParams {
    fn validate(&self, name: &str) -> NavResult<()> {
        if !self.min_point_spacing.is_finite() || self.min_point_spacing <= 0.0 {
            return Err(NavError::InvalidConfig(format!(
                "{name}.min_point_spacing must be positive"
            )));
        }
        if self.end_length < self.start_length
            || self.start_radius < 0.0
            || self.end_radius < 0.0
        {
            return Err(NavError::InvalidConfig(format!(
                "{name} must have end_length >= start_length and non-negative radii"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrips_through_json() {
        let config = NavConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let restored: NavConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, restored);
        assert!(restored.validate().is_ok());
    }

    #[test]
    fn config_loads_from_partial_json_string() {
        let json = r#"{
            "starting_node": 3,
            "travel_speed": 6.5,
            "detection_threshold": 80.0,
            "growl": { "spread": 2.0 },
            "menace": null
        }"#;
        let config = NavConfig::from_json_str(json).unwrap();
        assert_eq!(config.starting_node, 3);
        assert_eq!(config.travel_speed, 6.5);
        assert_eq!(config.detection_threshold, 80.0);
        assert_eq!(config.growl.spread, 2.0);
        assert_eq!(config.growl.base_delay, 5.0);
        assert!(config.menace.is_none());
        // Untouched fields keep their defaults.
        assert_eq!(config.neighbor_falloff, 0.25);
        assert_eq!(config.return_snap_distance_sq, 0.1);
    }

    #[test]
    fn missing_menace_group_uses_defaults() {
        let config = NavConfig::from_json_str("{}").unwrap();
        assert_eq!(config.menace, Some(MenaceParams::default()));
    }

    #[test]
    fn malformed_json_is_config_error() {
        let err = NavConfig::from_json_str("{ \"travel_speed\": ").unwrap_err();
        assert!(matches!(err, NavError::Config(_)), "got {err:?}");
    }

    #[test]
    fn negative_speed_is_rejected() {
        let err = NavConfig::from_json_str(r#"{ "travel_speed": -1.0 }"#).unwrap_err();
        assert!(matches!(err, NavError::InvalidConfig(_)), "got {err:?}");
    }

    #[test]
    fn zero_point_spacing_is_rejected() {
        let mut config = NavConfig::default();
        if let Some(menace) = config.menace.as_mut() {
            menace.near_frustum.min_point_spacing = 0.0;
        }
        assert!(matches!(
            config.validate(),
            Err(NavError::InvalidConfig(_))
        ));
    }

    #[test]
    fn growl_delay_tracks_volume_factor() {
        let growl = GrowlParams::default();
        assert_eq!(growl.delay_range(1.0), (15.0, 22.5));
        assert_eq!(growl.delay_range(0.5), (10.0, 15.0));
    }
}
