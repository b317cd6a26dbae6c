//! Headless client that joins, walks a square with scripted input, prints
//! the state it receives and leaves.

use clap::Parser;
use log::{info, warn};
use shared::input::{DOWN, LEFT, RIGHT, UP};
use shared::{Packet, MAX_PACKET_SIZE, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::{sleep, timeout};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: SocketAddr,

    /// Milliseconds each scripted key is held
    #[arg(long, default_value = "500")]
    hold_ms: u64,
}

async fn recv_packet(socket: &UdpSocket, buf: &mut [u8]) -> Option<Packet> {
    match timeout(Duration::from_secs(1), socket.recv_from(buf)).await {
        Ok(Ok((len, _))) => match Packet::from_bytes(&buf[..len]) {
            Ok(packet) => Some(packet),
            Err(e) => {
                warn!("Failed to deserialize packet: {}", e);
                None
            }
        },
        Ok(Err(e)) => {
            warn!("Error receiving packet: {}", e);
            None
        }
        Err(_) => None,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    info!("Client socket bound to {}", socket.local_addr()?);

    let join = Packet::Join {
        client_version: PROTOCOL_VERSION,
    };
    socket.send_to(&join.to_bytes()?, args.server).await?;

    let mut buf = [0u8; MAX_PACKET_SIZE];
    match recv_packet(&socket, &mut buf).await {
        Some(Packet::Welcome { client_id }) => info!("Joined as client {}", client_id),
        Some(Packet::Rejected { reason }) => {
            warn!("Join rejected: {}", reason);
            return Ok(());
        }
        other => {
            warn!("Expected Welcome but got: {:?}", other);
            return Ok(());
        }
    }

    // Walk a square: right, down, left, up, then stop.
    for keys in [RIGHT, DOWN, LEFT, UP, 0] {
        socket
            .send_to(&Packet::Input { keys }.to_bytes()?, args.server)
            .await?;

        let hold = sleep(Duration::from_millis(args.hold_ms));
        tokio::pin!(hold);
        loop {
            tokio::select! {
                _ = &mut hold => break,
                packet = recv_packet(&socket, &mut buf) => match packet {
                    Some(Packet::Layout { blocks }) => info!("Layout: {:?}", blocks),
                    Some(Packet::State { positions }) => info!("keys={:04b} state={:?}", keys, positions),
                    Some(other) => info!("Unexpected packet: {:?}", other),
                    None => {}
                },
            }
        }
    }

    socket.send_to(&Packet::Leave.to_bytes()?, args.server).await?;
    info!("Test client finished");
    Ok(())
}
