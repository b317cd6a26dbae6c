//! Server network layer handling UDP communications and game loop coordination

use crate::config::ServerConfig;
use crate::error::{ServerError, TransportError};
use crate::game::{ClientHandle, Game};
use crate::session::SessionTable;
use log::{debug, error, info, warn};
use shared::{ClientId, Packet, MAX_PACKET_SIZE, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived { packet: Packet, addr: SocketAddr },
    Shutdown,
}

/// An encoded datagram waiting for the sender task.
#[derive(Debug)]
pub struct Outgoing {
    pub data: Vec<u8>,
    pub addr: SocketAddr,
}

/// `ClientHandle` that encodes the packet and queues it for the sender task.
#[derive(Debug, Clone)]
pub struct UdpClientHandle {
    addr: SocketAddr,
    queue: mpsc::UnboundedSender<Outgoing>,
}

impl UdpClientHandle {
    pub fn new(addr: SocketAddr, queue: mpsc::UnboundedSender<Outgoing>) -> Self {
        Self { addr, queue }
    }
}

impl ClientHandle for UdpClientHandle {
    fn send(&self, packet: &Packet) -> Result<(), TransportError> {
        let data = packet.to_bytes()?;
        self.queue
            .send(Outgoing {
                data,
                addr: self.addr,
            })
            .map_err(|_| TransportError::QueueClosed)
    }
}

/// Main server coordinating networking and game simulation.
///
/// The `Game` and the session table live on the task running `run`, so
/// joins, leaves, input and ticks are applied one at a time.
pub struct Server {
    socket: Arc<UdpSocket>,
    sessions: SessionTable,
    game: Game,
    tick_duration: Duration,
    client_timeout: Duration,

    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    out_tx: mpsc::UnboundedSender<Outgoing>,
    out_rx: Option<mpsc::UnboundedReceiver<Outgoing>>,
}

impl Server {
    pub async fn new(config: ServerConfig) -> Result<Self, ServerError> {
        let addr: SocketAddr = config.bind_addr.parse()?;
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            sessions: SessionTable::new(config.max_clients),
            game: Game::new(config.map, config.game),
            tick_duration: config.tick_duration,
            client_timeout: config.client_timeout,
            server_tx,
            server_rx,
            out_tx,
            out_rx: Some(out_rx),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.socket.local_addr()?)
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn sessions(&self) -> &SessionTable {
        &self.sessions
    }

    /// Sender that can stop `run` with `ServerMessage::Shutdown`.
    pub fn control(&self) -> mpsc::UnboundedSender<ServerMessage> {
        self.server_tx.clone()
    }

    /// Spawns task that continuously listens for incoming packets
    fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; MAX_PACKET_SIZE];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => match Packet::from_bytes(&buffer[..len]) {
                        Ok(packet) => {
                            if server_tx
                                .send(ServerMessage::PacketReceived { packet, addr })
                                .is_err()
                            {
                                debug!("Main loop gone, stopping receiver");
                                break;
                            }
                        }
                        Err(_) => warn!("Failed to deserialize packet from {}", addr),
                    },
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that drains the outgoing queue onto the socket
    fn spawn_network_sender(&mut self) {
        let Some(mut out_rx) = self.out_rx.take() else {
            return;
        };
        let socket = Arc::clone(&self.socket);

        tokio::spawn(async move {
            while let Some(Outgoing { data, addr }) = out_rx.recv().await {
                if let Err(e) = socket.send_to(&data, addr).await {
                    error!("Failed to send packet to {}: {}", addr, e);
                }
            }
        });
    }

    fn queue_direct(&self, packet: &Packet, addr: SocketAddr) {
        let handle = UdpClientHandle::new(addr, self.out_tx.clone());
        if let Err(e) = handle.send(packet) {
            error!("Failed to queue packet for {}: {}", addr, e);
        }
    }

    /// Tears down a connection on both the transport and the game side.
    fn drop_client(&mut self, client_id: ClientId) {
        self.sessions.remove(client_id);
        self.game.remove_player(client_id);
    }

    /// Processes incoming packets and updates game state
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        match packet {
            Packet::Join { client_version } => {
                info!("Client joining from {} (version: {})", addr, client_version);

                if client_version != PROTOCOL_VERSION {
                    let response = Packet::Rejected {
                        reason: "Protocol version mismatch".to_string(),
                    };
                    self.queue_direct(&response, addr);
                    return;
                }

                // Remove existing connection if present
                if let Some(existing_id) = self.sessions.find_by_addr(addr) {
                    info!("Removing existing client {} from {}", existing_id, addr);
                    self.drop_client(existing_id);
                }

                let Some(client_id) = self.sessions.add(addr) else {
                    let response = Packet::Rejected {
                        reason: "Server full".to_string(),
                    };
                    self.queue_direct(&response, addr);
                    return;
                };

                let handle = UdpClientHandle::new(addr, self.out_tx.clone());
                if let Err(e) = self.game.add_player(client_id, Box::new(handle)) {
                    error!("Could not register client {}: {}", client_id, e);
                    self.sessions.remove(client_id);
                    return;
                }

                let layout = Packet::Layout {
                    blocks: self.game.map().layout().to_vec(),
                };
                for packet in [Packet::Welcome { client_id }, layout] {
                    if let Err(e) = self.game.send_to(client_id, &packet) {
                        error!("Failed to queue welcome for client {}: {}", client_id, e);
                    }
                }
            }

            Packet::Input { keys } => {
                if let Some(client_id) = self.sessions.find_by_addr(addr) {
                    self.sessions.touch(client_id);
                    self.game.apply_input(client_id, keys);
                }
            }

            Packet::Leave => {
                if let Some(client_id) = self.sessions.find_by_addr(addr) {
                    self.drop_client(client_id);
                }
            }

            _ => {
                warn!("Unexpected packet type from client at {}", addr);
            }
        }
    }

    fn expire_sessions(&mut self) {
        for client_id in self.sessions.check_timeouts(self.client_timeout) {
            info!("Client {} timed out", client_id);
            self.game.remove_player(client_id);
        }
    }

    /// Main server loop coordinating all operations
    pub async fn run(&mut self) -> Result<(), ServerError> {
        self.spawn_network_receiver();
        self.spawn_network_sender();

        let mut tick_interval = interval(self.tick_duration);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut timeout_interval = interval(Duration::from_secs(1));

        info!("Server started successfully");

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr).await;
                        }
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                }

                _ = tick_interval.tick() => {
                    self.game.tick();
                    self.game.broadcast_state();

                    // Periodic performance monitoring
                    let tick = self.game.tick_count();
                    if tick % 60 == 0 && !self.game.is_empty() {
                        debug!("Tick {}: {} players", tick, self.game.len());
                    }
                }

                _ = timeout_interval.tick() => {
                    self.expire_sessions();
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::input::RIGHT;

    fn test_config() -> ServerConfig {
        ServerConfig {
            bind_addr: "127.0.0.1:0".to_string(),
            max_clients: 2,
            ..Default::default()
        }
    }

    fn peer(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<Outgoing>) -> Vec<(SocketAddr, Packet)> {
        let mut packets = Vec::new();
        while let Ok(out) = rx.try_recv() {
            packets.push((out.addr, Packet::from_bytes(&out.data).unwrap()));
        }
        packets
    }

    #[tokio::test]
    async fn test_join_sends_welcome_then_layout() {
        let mut server = Server::new(test_config()).await.unwrap();
        let mut out_rx = server.out_rx.take().unwrap();

        server
            .handle_packet(Packet::Join { client_version: PROTOCOL_VERSION }, peer(9001))
            .await;

        assert!(server.game().has_player(1));
        assert_eq!(server.sessions().find_by_addr(peer(9001)), Some(1));

        let sent = drain(&mut out_rx);
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0], (peer(9001), Packet::Welcome { client_id: 1 }));
        match &sent[1].1 {
            Packet::Layout { blocks } => assert_eq!(blocks, server.game().map().layout()),
            other => panic!("Expected layout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_version_mismatch_is_rejected() {
        let mut server = Server::new(test_config()).await.unwrap();
        let mut out_rx = server.out_rx.take().unwrap();

        server
            .handle_packet(Packet::Join { client_version: 999 }, peer(9001))
            .await;

        assert!(server.game().is_empty());
        assert!(server.sessions().is_empty());
        match drain(&mut out_rx).pop() {
            Some((_, Packet::Rejected { reason })) => {
                assert_eq!(reason, "Protocol version mismatch")
            }
            other => panic!("Expected rejection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_server_full_is_rejected() {
        let mut server = Server::new(test_config()).await.unwrap();
        let mut out_rx = server.out_rx.take().unwrap();
        let join = Packet::Join { client_version: PROTOCOL_VERSION };

        server.handle_packet(join.clone(), peer(9001)).await;
        server.handle_packet(join.clone(), peer(9002)).await;
        drain(&mut out_rx);

        server.handle_packet(join, peer(9003)).await;
        assert_eq!(server.game().len(), 2);
        assert_eq!(
            drain(&mut out_rx),
            vec![(
                peer(9003),
                Packet::Rejected {
                    reason: "Server full".to_string()
                }
            )]
        );
    }

    #[tokio::test]
    async fn test_rejoin_from_same_address_replaces_session() {
        let mut server = Server::new(test_config()).await.unwrap();
        let join = Packet::Join { client_version: PROTOCOL_VERSION };

        server.handle_packet(join.clone(), peer(9001)).await;
        server.handle_packet(join, peer(9001)).await;

        assert!(!server.game().has_player(1));
        assert!(!server.game().has_client(1));
        assert!(server.game().has_player(2));
        assert_eq!(server.sessions().len(), 1);
    }

    #[tokio::test]
    async fn test_input_and_leave() {
        let mut server = Server::new(test_config()).await.unwrap();
        server
            .handle_packet(Packet::Join { client_version: PROTOCOL_VERSION }, peer(9001))
            .await;

        server
            .handle_packet(Packet::Input { keys: RIGHT }, peer(9001))
            .await;
        let speed = server.game().config().player_speed;
        assert_eq!(server.game().player(1).unwrap().velocity().x(), speed);

        // Input from a stranger is ignored.
        server
            .handle_packet(Packet::Input { keys: RIGHT }, peer(9999))
            .await;
        assert_eq!(server.game().len(), 1);

        server.handle_packet(Packet::Leave, peer(9001)).await;
        assert!(server.game().is_empty());
        assert!(server.sessions().is_empty());

        // Late input after the leave is a no-op.
        server
            .handle_packet(Packet::Input { keys: RIGHT }, peer(9001))
            .await;
        assert!(server.game().is_empty());
    }

    #[test]
    fn test_udp_handle_reports_closed_queue() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let handle = UdpClientHandle::new(peer(9001), tx);
        assert!(matches!(
            handle.send(&Packet::Leave),
            Err(TransportError::QueueClosed)
        ));
    }

    #[test]
    fn test_udp_handle_encodes_packet() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = UdpClientHandle::new(peer(9001), tx);
        let packet = Packet::State {
            positions: vec![[1, 2]],
        };

        handle.send(&packet).unwrap();
        let out = rx.try_recv().unwrap();
        assert_eq!(out.addr, peer(9001));
        assert_eq!(Packet::from_bytes(&out.data).unwrap(), packet);
    }

    #[test]
    fn test_run_stops_on_shutdown() {
        tokio_test::block_on(async {
            let mut server = Server::new(test_config()).await.unwrap();
            server.control().send(ServerMessage::Shutdown).unwrap();

            let result = tokio::time::timeout(Duration::from_secs(2), server.run())
                .await
                .expect("run did not return after shutdown");
            assert!(result.is_ok());
        });
    }
}
