//! Runtime settings for the server and its simulation.

use shared::{CollisionResolution, Map, Vector2};
use std::time::Duration;

/// Simulation tuning owned by each `Game`.
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Player speed in pixels per second while a key is held.
    pub player_speed: f32,
    /// Upper bound on the seconds a single update may integrate.
    pub max_delta_time: f32,
    /// Where new players appear.
    pub spawn: Vector2,
    pub collision: CollisionResolution,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            player_speed: 150.0,
            // Cap the maximum delta time to 50ms
            max_delta_time: 1.0 / 20.0,
            spawn: Vector2::new(32.0, 32.0),
            collision: CollisionResolution::default(),
        }
    }
}

/// Everything the network server needs to start.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub tick_duration: Duration,
    pub max_clients: usize,
    /// Sessions silent for longer than this are dropped.
    pub client_timeout: Duration,
    pub map: Map,
    pub game: GameConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            tick_duration: Duration::from_secs_f32(1.0 / 30.0),
            max_clients: 16,
            client_timeout: Duration::from_secs(5),
            map: Map::default(),
            game: GameConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Tick interval for a rate in Hz. A zero rate falls back to 1 Hz.
    pub fn tick_duration_for(tick_rate: u32) -> Duration {
        Duration::from_secs_f64(1.0 / tick_rate.max(1) as f64)
    }
}
