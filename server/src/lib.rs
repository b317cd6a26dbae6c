//! # Block Arena Server Library
//!
//! Authoritative server for a small top-down arena. Players steer with four
//! movement keys, collide with a fixed set of square blocks, and every client
//! receives the floored positions of all players once per tick.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! The server is the only place positions are integrated. Each player's
//! entity advances by the wall-clock time since its own previous update,
//! one axis at a time, and is pushed flush against any block it runs into.
//!
//! ### Client Management
//! Connections are identified by a server-assigned client id. The game keeps
//! an outbound handle and a player for every id, added and removed together.
//! Input or leave messages for an id that is already gone are ignored.
//!
//! ### State Broadcasting
//! After every tick one `State` packet is built and queued to every client.
//! Delivery goes through an unbounded queue drained by a separate task, so
//! a slow socket never stalls the simulation.
//!
//! ## Module Organization
//!
//! - `game`: the `Game` type, the `ClientHandle` seam and the tick/broadcast
//! - `player`: input-driven wrapper around the shared `Entity2D`
//! - `session`: address to client id bookkeeping and timeouts
//! - `network`: UDP socket tasks and the main `tokio::select!` loop
//! - `config`: server and simulation settings
//! - `error`: error types
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::new(ServerConfig::default()).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod game;
pub mod network;
pub mod player;
pub mod session;
