//! Authoritative simulation: connected players, static blocks, and the
//! per-tick update and broadcast.

use crate::config::GameConfig;
use crate::error::{GameError, TransportError};
use crate::player::Player;
use log::{debug, info, warn};
use shared::input::INPUT_MASK;
use shared::{Block, ClientId, KeyboardState, Map, Packet};
use std::collections::BTreeMap;
use std::time::Instant;

/// Outbound side of one connection.
///
/// `send` must not block: implementations queue the packet and return.
pub trait ClientHandle: Send {
    fn send(&self, packet: &Packet) -> Result<(), TransportError>;
}

/// One running match.
///
/// `clients` and `players` always hold the same keys. Both are only touched
/// through `&mut self` methods that update them together, so no caller can
/// observe one without the other.
pub struct Game {
    clients: BTreeMap<ClientId, Box<dyn ClientHandle>>,
    players: BTreeMap<ClientId, Player>,
    blocks: Vec<Block>,
    map: Map,
    config: GameConfig,
    tick: u32,
}

impl Game {
    /// Builds the block list from `map` once; it never changes afterwards.
    pub fn new(map: Map, config: GameConfig) -> Self {
        let blocks = map.blocks();
        info!("Game created with {} blocks", blocks.len());
        Self {
            clients: BTreeMap::new(),
            players: BTreeMap::new(),
            blocks,
            map,
            config,
            tick: 0,
        }
    }

    pub fn with_layout(layout: Vec<[i32; 2]>) -> Self {
        Self::new(Map::new(layout), GameConfig::default())
    }

    /// Registers a connection and spawns its player.
    ///
    /// A key that is already present is rejected and both maps are left as
    /// they were.
    pub fn add_player(
        &mut self,
        client_id: ClientId,
        handle: Box<dyn ClientHandle>,
    ) -> Result<(), GameError> {
        if self.clients.contains_key(&client_id) || self.players.contains_key(&client_id) {
            warn!("Rejected duplicate join for client {}", client_id);
            return Err(GameError::DuplicateConnection(client_id));
        }

        let player = Player::new(client_id, self.config.spawn, self.config.player_speed);
        info!(
            "Added player {} at ({}, {})",
            client_id,
            player.position().x(),
            player.position().y()
        );
        self.clients.insert(client_id, handle);
        self.players.insert(client_id, player);
        Ok(())
    }

    /// Drops a connection and its player. Unknown ids are ignored.
    pub fn remove_player(&mut self, client_id: ClientId) -> bool {
        let had_client = self.clients.remove(&client_id).is_some();
        let had_player = self.players.remove(&client_id).is_some();
        if had_client || had_player {
            info!("Removed player {}", client_id);
        }
        had_client || had_player
    }

    /// Decodes a key bitmask and hands it to the addressed player.
    ///
    /// Input for an id without a player is dropped silently: it can arrive
    /// after the disconnect that removed the player.
    pub fn apply_input(&mut self, client_id: ClientId, encoded: u8) {
        let Some(player) = self.players.get_mut(&client_id) else {
            return;
        };

        if encoded & !INPUT_MASK != 0 {
            debug!(
                "Client {} sent out-of-range input {}, ignoring high bits",
                client_id, encoded
            );
        }
        player.update_on_input(KeyboardState::decode(encoded));
    }

    /// Advances every player by the wall-clock time since its last update.
    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    pub fn tick_at(&mut self, now: Instant) {
        let max_delta = self.config.max_delta_time;
        let resolution = self.config.collision;
        for player in self.players.values_mut() {
            if !player.entity.is_finite() {
                warn!("Skipping update for player {} with invalid state", player.id);
                continue;
            }
            player.update(now, &self.blocks, max_delta, resolution);
        }
        self.tick = self.tick.wrapping_add(1);
    }

    /// Advances every player by a fixed `dt` seconds, bypassing their clocks.
    pub fn step(&mut self, dt: f32) {
        let resolution = self.config.collision;
        for player in self.players.values_mut() {
            if !player.entity.is_finite() {
                warn!("Skipping update for player {} with invalid state", player.id);
                continue;
            }
            player.entity.integrate(dt, &self.blocks, resolution);
        }
        self.tick = self.tick.wrapping_add(1);
    }

    /// Floored positions of every player in ascending id order.
    pub fn state_snapshot(&self) -> Vec<[i32; 2]> {
        self.players.values().map(Player::floored_position).collect()
    }

    /// Sends the same `State` packet to every client. Returns how many
    /// handles accepted it.
    pub fn broadcast_state(&self) -> usize {
        if self.clients.is_empty() {
            return 0;
        }

        let packet = Packet::State {
            positions: self.state_snapshot(),
        };

        let mut delivered = 0;
        for (client_id, handle) in &self.clients {
            match handle.send(&packet) {
                Ok(()) => delivered += 1,
                Err(e) => warn!("Failed to queue state for client {}: {}", client_id, e),
            }
        }
        delivered
    }

    /// Sends one packet to a single client, if it is connected.
    pub fn send_to(&self, client_id: ClientId, packet: &Packet) -> Result<bool, TransportError> {
        match self.clients.get(&client_id) {
            Some(handle) => handle.send(packet).map(|()| true),
            None => Ok(false),
        }
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn player(&self, client_id: ClientId) -> Option<&Player> {
        self.players.get(&client_id)
    }

    pub fn player_mut(&mut self, client_id: ClientId) -> Option<&mut Player> {
        self.players.get_mut(&client_id)
    }

    pub fn has_client(&self, client_id: ClientId) -> bool {
        self.clients.contains_key(&client_id)
    }

    pub fn has_player(&self, client_id: ClientId) -> bool {
        self.players.contains_key(&client_id)
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn map(&self) -> &Map {
        &self.map
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn tick_count(&self) -> u32 {
        self.tick
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use shared::input::{DOWN, RIGHT, UP};
    use shared::Vector2;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct RecordingHandle {
        sent: Arc<Mutex<Vec<Packet>>>,
    }

    impl ClientHandle for RecordingHandle {
        fn send(&self, packet: &Packet) -> Result<(), TransportError> {
            self.sent.lock().unwrap().push(packet.clone());
            Ok(())
        }
    }

    struct ClosedHandle;

    impl ClientHandle for ClosedHandle {
        fn send(&self, _packet: &Packet) -> Result<(), TransportError> {
            Err(TransportError::QueueClosed)
        }
    }

    fn recording() -> (RecordingHandle, Box<dyn ClientHandle>) {
        let handle = RecordingHandle::default();
        (handle.clone(), Box::new(handle))
    }

    fn assert_co_populated(game: &Game, ids: &[ClientId]) {
        for id in ids {
            assert_eq!(game.has_client(*id), game.has_player(*id), "id {}", id);
        }
    }

    #[test]
    fn test_game_creation_builds_blocks() {
        let game = Game::new(Map::default(), GameConfig::default());
        assert_eq!(game.blocks().len(), 4);
        assert_eq!(game.blocks()[0].position(), Vector2::new(256.0, 128.0));
        assert!(game.is_empty());
        assert_eq!(game.tick_count(), 0);
    }

    #[test]
    fn test_add_and_remove_player() {
        let mut game = Game::with_layout(vec![]);
        let (_, handle) = recording();

        game.add_player(1, handle).unwrap();
        assert!(game.has_client(1));
        assert!(game.has_player(1));
        assert_eq!(game.player(1).unwrap().position(), game.config().spawn);
        assert_co_populated(&game, &[1, 2]);

        assert!(game.remove_player(1));
        assert!(!game.has_client(1));
        assert!(!game.has_player(1));
        assert_co_populated(&game, &[1, 2]);
    }

    #[test]
    fn test_duplicate_join_is_rejected() {
        let mut game = Game::with_layout(vec![]);
        let (first, handle) = recording();
        game.add_player(7, handle).unwrap();
        game.player_mut(7).unwrap().entity.position = Vector2::new(1.0, 2.0);

        let (_, again) = recording();
        assert_eq!(
            game.add_player(7, again),
            Err(GameError::DuplicateConnection(7))
        );
        assert_eq!(game.len(), 1);
        assert_eq!(game.player(7).unwrap().position(), Vector2::new(1.0, 2.0));

        // The first handle is still the one registered.
        game.broadcast_state();
        assert_eq!(first.sent.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_remove_unknown_player_is_noop() {
        let mut game = Game::with_layout(vec![]);
        assert!(!game.remove_player(42));
        assert!(game.is_empty());
    }

    #[test]
    fn test_apply_input() {
        let mut game = Game::with_layout(vec![]);
        let (_, handle) = recording();
        game.add_player(1, handle).unwrap();

        game.apply_input(1, RIGHT | UP);
        let player = game.player(1).unwrap();
        let speed = game.config().player_speed;
        assert_eq!(player.velocity(), Vector2::new(speed, -speed));
        assert!(player.keys.right && player.keys.up);
    }

    #[test]
    fn test_apply_input_for_unknown_client_is_ignored() {
        let mut game = Game::with_layout(vec![]);
        game.apply_input(99, DOWN);
        assert!(game.is_empty());
    }

    #[test]
    fn test_apply_input_masks_high_bits() {
        let mut game = Game::with_layout(vec![]);
        let (_, handle) = recording();
        game.add_player(1, handle).unwrap();

        game.apply_input(1, 0x10 | DOWN);
        let speed = game.config().player_speed;
        assert_eq!(game.player(1).unwrap().velocity(), Vector2::new(0.0, speed));
    }

    #[test]
    fn test_block_collision_scenario() {
        let mut game = Game::with_layout(vec![[256, 128]]);
        let (_, handle) = recording();
        game.add_player(1, handle).unwrap();
        {
            let player = game.player_mut(1).unwrap();
            player.entity.position = Vector2::new(250.0, 128.0);
            player.entity.velocity = Vector2::new(5.0, 0.0);
        }

        game.step(1.0);

        let player = game.player(1).unwrap();
        assert_eq!(player.position().x(), 236.0);
        assert_eq!(player.velocity().x(), 0.0);
        assert_eq!(game.tick_count(), 1);
    }

    #[test]
    fn test_tick_uses_each_player_clock() {
        let mut game = Game::with_layout(vec![]);
        let (_, handle) = recording();
        game.add_player(1, handle).unwrap();
        game.apply_input(1, RIGHT);

        let start = Instant::now();
        game.tick_at(start);
        // First update measures nothing.
        assert_eq!(game.player(1).unwrap().position(), game.config().spawn);

        game.tick_at(start + Duration::from_millis(40));
        let moved = game.player(1).unwrap().position().x() - game.config().spawn.x();
        assert_approx_eq!(moved, game.config().player_speed * 0.04, 1e-3);
        assert_eq!(game.tick_count(), 2);
    }

    #[test]
    fn test_invalid_player_does_not_stop_tick() {
        let mut game = Game::with_layout(vec![]);
        let (_, a) = recording();
        let (_, b) = recording();
        game.add_player(1, a).unwrap();
        game.add_player(2, b).unwrap();

        game.player_mut(1).unwrap().entity.velocity = Vector2::new(f32::NAN, 0.0);
        game.player_mut(2).unwrap().entity.velocity = Vector2::new(10.0, 0.0);

        game.step(1.0);

        assert_eq!(game.player(1).unwrap().position(), game.config().spawn);
        assert_eq!(
            game.player(2).unwrap().position().x(),
            game.config().spawn.x() + 10.0
        );
    }

    #[test]
    fn test_broadcast_floors_positions_for_every_client() {
        let mut game = Game::with_layout(vec![]);
        let (first, a) = recording();
        let (second, b) = recording();
        game.add_player(1, a).unwrap();
        game.add_player(2, b).unwrap();
        game.player_mut(1).unwrap().entity.position = Vector2::new(10.7, 5.2);
        game.player_mut(2).unwrap().entity.position = Vector2::new(3.9, 8.1);

        assert_eq!(game.broadcast_state(), 2);

        let expected = Packet::State {
            positions: vec![[10, 5], [3, 8]],
        };
        assert_eq!(*first.sent.lock().unwrap(), vec![expected.clone()]);
        assert_eq!(*second.sent.lock().unwrap(), vec![expected]);
    }

    #[test]
    fn test_broadcast_survives_failed_handle() {
        let mut game = Game::with_layout(vec![]);
        let (healthy, handle) = recording();
        game.add_player(1, Box::new(ClosedHandle)).unwrap();
        game.add_player(2, handle).unwrap();

        assert_eq!(game.broadcast_state(), 1);
        assert_eq!(healthy.sent.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_broadcast_without_clients() {
        let game = Game::with_layout(vec![]);
        assert_eq!(game.broadcast_state(), 0);
    }

    #[test]
    fn test_send_to() {
        let mut game = Game::with_layout(vec![]);
        let (recorder, handle) = recording();
        game.add_player(3, handle).unwrap();

        let packet = Packet::Welcome { client_id: 3 };
        assert!(game.send_to(3, &packet).unwrap());
        assert!(!game.send_to(4, &packet).unwrap());
        assert_eq!(*recorder.sent.lock().unwrap(), vec![packet]);
    }
}
