//! UDP endpoint of the gmond collector.

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};

use tracing::debug;

use crate::error::ReporterError;

/// A connected UDP socket pointed at one collector address.
#[derive(Debug)]
pub struct CollectorEndpoint {
    target: String,
    peer: SocketAddr,
    socket: UdpSocket,
}

impl CollectorEndpoint {
    /// Resolves `host:port`, binds an ephemeral socket of the same address
    /// family and connects it. The first resolved address is used.
    pub fn connect(host: &str, port: u16, multicast_ttl: u32) -> Result<Self, ReporterError> {
        let target = format!("{}:{}", host, port);
        let unavailable = |source: io::Error| ReporterError::EndpointUnavailable {
            target: target.clone(),
            source,
        };

        if host.trim().is_empty() {
            return Err(unavailable(io::Error::new(
                io::ErrorKind::InvalidInput,
                "empty collector host",
            )));
        }

        let peer = (host, port)
            .to_socket_addrs()
            .map_err(unavailable)?
            .next()
            .ok_or_else(|| {
                unavailable(io::Error::new(
                    io::ErrorKind::NotFound,
                    "host resolved to no addresses",
                ))
            })?;

        let socket = bind_for(peer, multicast_ttl).map_err(unavailable)?;
        socket.connect(peer).map_err(unavailable)?;
        debug!(%target, %peer, "collector endpoint connected");

        Ok(Self {
            target,
            peer,
            socket,
        })
    }

    pub fn send(&self, datagram: &[u8]) -> Result<(), ReporterError> {
        self.socket
            .send(datagram)
            .map(|_| ())
            .map_err(|source| ReporterError::Send {
                target: self.target.clone(),
                source,
            })
    }

    /// `host:port` as configured.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The resolved collector address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

/// Ephemeral socket of `peer`'s address family, with the multicast TTL applied
/// when `peer` is an IPv4 multicast group.
fn bind_for(peer: SocketAddr, multicast_ttl: u32) -> io::Result<UdpSocket> {
    let local: SocketAddr = match peer {
        SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
        SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
    };
    let socket = UdpSocket::bind(local)?;

    if let IpAddr::V4(ip) = peer.ip() {
        if ip.is_multicast() {
            socket.set_multicast_ttl_v4(multicast_ttl)?;
        }
    }
    Ok(socket)
}
