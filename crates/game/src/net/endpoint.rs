use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::atomic::{AtomicU64, Ordering};

use super::protocol::{MAX_PACKET_SIZE, Packet};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetworkStats {
    pub packets_sent: u64,
    pub packets_received: u64,
    pub packets_rejected: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

#[derive(Debug, Default)]
struct AtomicStats {
    packets_sent: AtomicU64,
    packets_received: AtomicU64,
    packets_rejected: AtomicU64,
    bytes_sent: AtomicU64,
    bytes_received: AtomicU64,
}

/// Non-blocking UDP socket speaking the relay packet format.
///
/// Every method takes `&self`, so one endpoint can be shared between the
/// receive loop and the transport that sends on it.
#[derive(Debug)]
pub struct NetworkEndpoint {
    socket: UdpSocket,
    local_addr: SocketAddr,
    stats: AtomicStats,
}

impl NetworkEndpoint {
    pub fn bind<A: ToSocketAddrs>(addr: A) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_nonblocking(true)?;

        let local_addr = socket.local_addr()?;

        Ok(Self {
            socket,
            local_addr,
            stats: AtomicStats::default(),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn stats(&self) -> NetworkStats {
        NetworkStats {
            packets_sent: self.stats.packets_sent.load(Ordering::Relaxed),
            packets_received: self.stats.packets_received.load(Ordering::Relaxed),
            packets_rejected: self.stats.packets_rejected.load(Ordering::Relaxed),
            bytes_sent: self.stats.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.stats.bytes_received.load(Ordering::Relaxed),
        }
    }

    pub fn send_to(&self, packet: &Packet, addr: SocketAddr) -> io::Result<usize> {
        let data = packet
            .serialize()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;

        let bytes = self.socket.send_to(&data, addr)?;

        self.stats.packets_sent.fetch_add(1, Ordering::Relaxed);
        self.stats
            .bytes_sent
            .fetch_add(bytes as u64, Ordering::Relaxed);

        Ok(bytes)
    }

    /// Drains everything currently queued on the socket.
    pub fn receive(&self) -> io::Result<Vec<(Packet, SocketAddr)>> {
        let mut packets = Vec::new();
        let mut buffer = [0u8; MAX_PACKET_SIZE];

        loop {
            match self.socket.recv_from(&mut buffer) {
                Ok((size, addr)) => match Packet::deserialize(&buffer[..size]) {
                    Ok(packet) => {
                        self.stats.packets_received.fetch_add(1, Ordering::Relaxed);
                        self.stats
                            .bytes_received
                            .fetch_add(size as u64, Ordering::Relaxed);
                        packets.push((packet, addr));
                    }
                    Err(e) => {
                        self.stats.packets_rejected.fetch_add(1, Ordering::Relaxed);
                        log::debug!("rejected {} bytes from {}: {}", size, addr, e);
                    }
                },
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                // Windows reports ICMP port-unreachable from a previous send here.
                Err(ref e) if e.kind() == io::ErrorKind::ConnectionReset => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(packets)
    }
}
