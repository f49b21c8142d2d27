use std::{env, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::ClusterError;

/// Grouping radius in screen pixels.
pub const DEFAULT_RADIUS: f64 = 70.0;
/// Tile extent the radius is relative to.
pub const DEFAULT_EXTENT: f64 = 512.0;
pub const DEFAULT_MIN_ZOOM: u8 = 0;
pub const DEFAULT_MAX_ZOOM: u8 = 18;
pub const DEFAULT_MIN_POINTS: usize = 2;
/// Point count from which markers are aggregated at all.
pub const DEFAULT_ACTIVATION_THRESHOLD: usize = 200;

/// Zoom levels are encoded into 5 bits of a cluster id.
const MAX_SUPPORTED_ZOOM: u8 = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterOptions {
    pub radius: f64,
    pub extent: f64,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub min_points: usize,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            radius: DEFAULT_RADIUS,
            extent: DEFAULT_EXTENT,
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
            min_points: DEFAULT_MIN_POINTS,
        }
    }
}

impl ClusterOptions {
    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_zoom_range(mut self, min_zoom: u8, max_zoom: u8) -> Self {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self
    }

    pub fn validate(&self) -> Result<(), ClusterError> {
        if !self.radius.is_finite() || self.radius <= 0.0 {
            return Err(ClusterError::InvalidOptions(format!(
                "radius must be positive, got {}",
                self.radius
            )));
        }
        if !self.extent.is_finite() || self.extent <= 0.0 {
            return Err(ClusterError::InvalidOptions(format!(
                "extent must be positive, got {}",
                self.extent
            )));
        }
        if self.min_zoom > self.max_zoom || self.max_zoom > MAX_SUPPORTED_ZOOM {
            return Err(ClusterError::InvalidOptions(format!(
                "zoom range {}..={} is not within 0..={}",
                self.min_zoom, self.max_zoom, MAX_SUPPORTED_ZOOM
            )));
        }
        if self.min_points < 2 {
            return Err(ClusterError::InvalidOptions(
                "a cluster needs at least 2 points".to_owned(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteringConfig {
    pub options: ClusterOptions,
    pub activation_threshold: usize,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            options: ClusterOptions::default(),
            activation_threshold: DEFAULT_ACTIVATION_THRESHOLD,
        }
    }
}

impl ClusteringConfig {
    /// Reads `CLUSTER_RADIUS`, `CLUSTER_MIN_ZOOM`, `CLUSTER_MAX_ZOOM` and
    /// `CLUSTER_ACTIVATION_THRESHOLD`, falling back to the defaults for
    /// unset or unparsable values.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            options: ClusterOptions {
                radius: env_or("CLUSTER_RADIUS", defaults.options.radius),
                min_zoom: env_or("CLUSTER_MIN_ZOOM", defaults.options.min_zoom),
                max_zoom: env_or("CLUSTER_MAX_ZOOM", defaults.options.max_zoom),
                ..defaults.options
            },
            activation_threshold: env_or(
                "CLUSTER_ACTIVATION_THRESHOLD",
                defaults.activation_threshold,
            ),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(value) => value.trim().parse().unwrap_or_else(|_| {
            log::warn!("ignoring unparsable value '{}' for {}", value, key);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ClusteringConfig::default();
        assert!(config.options.validate().is_ok());
        assert_eq!(config.activation_threshold, 200);
        assert_eq!(config.options.radius, 70.0);
        assert_eq!(config.options.max_zoom, 18);
    }

    #[test]
    fn rejects_broken_options() {
        assert!(ClusterOptions::default().with_radius(0.0).validate().is_err());
        assert!(ClusterOptions::default()
            .with_zoom_range(10, 5)
            .validate()
            .is_err());
        assert!(ClusterOptions::default()
            .with_zoom_range(0, 31)
            .validate()
            .is_err());
    }
}
