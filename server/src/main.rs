use clap::{Parser, ValueEnum};
use log::info;
use server::config::{GameConfig, ServerConfig};
use server::network::Server;
use shared::{CollisionResolution, Map};
use std::time::Duration;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Collision {
    /// Smallest push-out among all overlapping blocks
    Minimum,
    /// Blocks in layout order, last overlap decides
    LastBlock,
}

impl From<Collision> for CollisionResolution {
    fn from(collision: Collision) -> Self {
        match collision {
            Collision::Minimum => CollisionResolution::MinimumCorrection,
            Collision::LastBlock => CollisionResolution::LastBlockWins,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Tick rate (updates per second)
    #[arg(short, long, default_value = "30")]
    tick_rate: u32,

    /// Maximum number of concurrent clients
    #[arg(short, long, default_value = "16")]
    max_clients: usize,

    /// Player speed in pixels per second
    #[arg(long, default_value = "150")]
    player_speed: f32,

    /// Longest time step a single update may integrate, in milliseconds
    #[arg(long, default_value = "50")]
    max_delta_ms: u64,

    /// Seconds of silence before a client is dropped
    #[arg(long, default_value = "5")]
    client_timeout_secs: u64,

    /// How overlaps with several blocks on one axis are resolved
    #[arg(long, value_enum, default_value = "minimum")]
    collision: Collision,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        ServerConfig {
            bind_addr: format!("{}:{}", self.host, self.port),
            tick_duration: ServerConfig::tick_duration_for(self.tick_rate),
            max_clients: self.max_clients,
            client_timeout: Duration::from_secs(self.client_timeout_secs),
            map: Map::default(),
            game: GameConfig {
                player_speed: self.player_speed,
                max_delta_time: Duration::from_millis(self.max_delta_ms).as_secs_f32(),
                collision: self.collision.into(),
                ..GameConfig::default()
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    info!("Starting server with {:?}", args);

    let mut server = Server::new(args.into_config()).await?;

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}
