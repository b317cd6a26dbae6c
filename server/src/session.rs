//! Transport-side connection tracking for the UDP server
//!
//! Maps datagram source addresses to client ids, enforces the connection
//! cap, and notices sessions that have gone quiet. The `Game` never sees
//! addresses; it only knows client ids and their outbound handles.

use log::info;
use shared::ClientId;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// One connected peer.
#[derive(Debug)]
pub struct Session {
    /// Unique client identifier assigned by the server
    pub id: ClientId,
    /// Network address for sending responses
    pub addr: SocketAddr,
    /// Last time we received any packet from this client
    pub last_seen: Instant,
}

impl Session {
    pub fn new(id: ClientId, addr: SocketAddr) -> Self {
        Self {
            id,
            addr,
            last_seen: Instant::now(),
        }
    }

    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// All live sessions, keyed by client id.
pub struct SessionTable {
    sessions: HashMap<ClientId, Session>,
    next_client_id: ClientId,
    max_clients: usize,
}

impl SessionTable {
    /// Client ids start from 1 and are never reused.
    pub fn new(max_clients: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            next_client_id: 1,
            max_clients,
        }
    }

    /// Returns `None` when the server is full.
    pub fn add(&mut self, addr: SocketAddr) -> Option<ClientId> {
        if self.sessions.len() >= self.max_clients {
            return None;
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        info!("Client {} connected from {}", client_id, addr);
        self.sessions.insert(client_id, Session::new(client_id, addr));
        Some(client_id)
    }

    pub fn remove(&mut self, client_id: ClientId) -> bool {
        if let Some(session) = self.sessions.remove(&client_id) {
            info!("Client {} disconnected", session.id);
            true
        } else {
            false
        }
    }

    pub fn find_by_addr(&self, addr: SocketAddr) -> Option<ClientId> {
        self.sessions
            .values()
            .find(|session| session.addr == addr)
            .map(|session| session.id)
    }

    /// Marks the session as active. Returns false for unknown ids.
    pub fn touch(&mut self, client_id: ClientId) -> bool {
        match self.sessions.get_mut(&client_id) {
            Some(session) => {
                session.last_seen = Instant::now();
                true
            }
            None => false,
        }
    }

    /// Removes sessions silent for longer than `timeout` and returns their ids.
    pub fn check_timeouts(&mut self, timeout: Duration) -> Vec<ClientId> {
        let timed_out: Vec<ClientId> = self
            .sessions
            .values()
            .filter(|session| session.is_timed_out(timeout))
            .map(|session| session.id)
            .collect();

        for client_id in &timed_out {
            self.remove(*client_id);
        }

        timed_out
    }

    pub fn get(&self, client_id: ClientId) -> Option<&Session> {
        self.sessions.get(&client_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
