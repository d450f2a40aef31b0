use serde::Deserialize;
use std::time::Duration;

use domain::models::Coordinate;
use domain::services::EngineSettings;

use crate::location::{LocationAccuracy, SimulationSettings, WatchOptions};
use crate::tracker::TrackerSettings;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub logging: LoggingConfig,
    pub database: DatabaseConfig,
    pub proximity: ProximityConfig,
    pub location: LocationConfig,
    pub simulation: SimulationConfig,
    pub markers: MarkersConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Compact,
    #[default]
    Pretty,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProximityConfig {
    /// Radius around a marker that counts as "near", inclusive.
    #[serde(default = "default_threshold_meters")]
    pub threshold_meters: f64,

    /// Minimum time before the same marker may notify again.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationConfig {
    #[serde(default = "default_time_interval_ms")]
    pub time_interval_ms: u64,

    #[serde(default = "default_distance_interval_meters")]
    pub distance_interval_meters: f64,

    #[serde(default)]
    pub accuracy: LocationAccuracy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Distance travelled per tick, in degrees.
    #[serde(default = "default_step_degrees")]
    pub step_degrees: f64,

    /// Maximum heading change per tick, in radians.
    #[serde(default = "default_heading_jitter_radians")]
    pub heading_jitter_radians: f64,

    /// Maximum offset applied to the starting point, in degrees.
    #[serde(default = "default_start_jitter_degrees")]
    pub start_jitter_degrees: f64,

    /// Fallback start when no real position is known.
    #[serde(default = "default_start_latitude")]
    pub start_latitude: f64,

    #[serde(default = "default_start_longitude")]
    pub start_longitude: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarkersConfig {
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}
fn default_max_connections() -> u32 {
    5
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_threshold_meters() -> f64 {
    100.0
}
fn default_cooldown_secs() -> u64 {
    60
}

/// Longest accepted visit cooldown: one week.
pub const MAX_COOLDOWN_SECS: u64 = 7 * 24 * 60 * 60;
fn default_time_interval_ms() -> u64 {
    5000
}
fn default_distance_interval_meters() -> f64 {
    10.0
}
fn default_tick_ms() -> u64 {
    1000
}
fn default_step_degrees() -> f64 {
    0.0001
}
fn default_heading_jitter_radians() -> f64 {
    0.1
}
fn default_start_jitter_degrees() -> f64 {
    0.0005
}
fn default_start_latitude() -> f64 {
    58.0105
}
fn default_start_longitude() -> f64 {
    56.2502
}
fn default_refresh_interval_secs() -> u64 {
    30
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml - base configuration with defaults
    /// 2. config/local.toml - local overrides (optional, not in git)
    /// 3. Environment variables with GEOMARKER__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("GEOMARKER").separator("__"))
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Load configuration for testing with custom overrides.
    ///
    /// Defaults are embedded so tests do not depend on the working directory.
    #[cfg(test)]
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [logging]
            level = "info"
            format = "pretty"

            [database]
            url = ""
            max_connections = 5
            connect_timeout_secs = 10

            [proximity]
            threshold_meters = 100.0
            cooldown_secs = 60

            [location]
            time_interval_ms = 5000
            distance_interval_meters = 10.0
            accuracy = "balanced"

            [simulation]
            tick_ms = 1000
            step_degrees = 0.0001
            heading_jitter_radians = 0.1
            start_jitter_degrees = 0.0005
            start_latitude = 58.0105
            start_longitude = 56.2502

            [markers]
            refresh_interval_secs = 30
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        let cfg: Self = builder.build()?.try_deserialize()?;
        // Skip validation in tests to allow partial configs
        Ok(cfg)
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.database.url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "GEOMARKER__DATABASE__URL environment variable must be set".to_string(),
            ));
        }

        if self.proximity.threshold_meters.is_nan() || self.proximity.threshold_meters <= 0.0 {
            return Err(ConfigValidationError::InvalidValue(
                "proximity.threshold_meters must be positive".to_string(),
            ));
        }

        if self.proximity.cooldown_secs > MAX_COOLDOWN_SECS {
            return Err(ConfigValidationError::InvalidValue(format!(
                "proximity.cooldown_secs must be at most {}",
                MAX_COOLDOWN_SECS
            )));
        }

        if self.location.time_interval_ms == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "location.time_interval_ms must be positive".to_string(),
            ));
        }

        if self.location.distance_interval_meters.is_nan()
            || self.location.distance_interval_meters < 0.0
        {
            return Err(ConfigValidationError::InvalidValue(
                "location.distance_interval_meters cannot be negative".to_string(),
            ));
        }

        if self.simulation.tick_ms == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "simulation.tick_ms must be positive".to_string(),
            ));
        }

        if self.simulation.step_degrees.is_nan() || self.simulation.step_degrees <= 0.0 {
            return Err(ConfigValidationError::InvalidValue(
                "simulation.step_degrees must be positive".to_string(),
            ));
        }

        if !shared::validation::is_valid_coordinate(
            self.simulation.start_latitude,
            self.simulation.start_longitude,
        ) {
            return Err(ConfigValidationError::InvalidValue(
                "simulation start coordinates are out of range".to_string(),
            ));
        }

        if self.markers.refresh_interval_secs == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "markers.refresh_interval_secs must be positive".to_string(),
            ));
        }

        Ok(())
    }

    pub fn pool_config(&self) -> persistence::db::DatabaseConfig {
        persistence::db::DatabaseConfig {
            url: self.database.url.clone(),
            max_connections: self.database.max_connections,
            connect_timeout_secs: self.database.connect_timeout_secs,
        }
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            threshold_meters: self.proximity.threshold_meters,
            // validate() rejects anything above the cap.
            cooldown: chrono::Duration::seconds(
                self.proximity.cooldown_secs.min(MAX_COOLDOWN_SECS) as i64,
            ),
        }
    }

    pub fn watch_options(&self) -> WatchOptions {
        WatchOptions {
            time_interval: Duration::from_millis(self.location.time_interval_ms),
            distance_interval_meters: self.location.distance_interval_meters,
            accuracy: self.location.accuracy,
        }
    }

    pub fn simulation_settings(&self) -> SimulationSettings {
        SimulationSettings {
            tick: Duration::from_millis(self.simulation.tick_ms),
            step_degrees: self.simulation.step_degrees,
            heading_jitter_radians: self.simulation.heading_jitter_radians,
            start_jitter_degrees: self.simulation.start_jitter_degrees,
            origin: Coordinate::new(
                self.simulation.start_latitude,
                self.simulation.start_longitude,
            ),
            seed: None,
        }
    }

    pub fn tracker_settings(&self) -> TrackerSettings {
        TrackerSettings {
            engine: self.engine_settings(),
            watch: self.watch_options(),
            simulation: self.simulation_settings(),
            ..TrackerSettings::default()
        }
    }

    pub fn marker_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.markers.refresh_interval_secs)
    }
}
