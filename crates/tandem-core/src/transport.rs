//! Datagram transport between synchronized players

use crate::{Error, Result};
use std::io::ErrorKind;
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use tracing::{debug, info};

/// Largest record accepted from a peer
const MAX_DATAGRAM: usize = 1500;

/// Fire-and-forget text channel to peers
pub trait Transport: Sized {
    /// Open a channel to a multicast group or unicast peer
    fn connect(address: &str, port: u16) -> Result<Self>;

    /// Send one record
    fn send(&mut self, payload: &str) -> Result<()>;

    /// Next received record, without blocking
    fn poll(&mut self) -> Option<String>;
}

/// UDP transport; joins the group when `address` is multicast
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    target: SocketAddr,
    buffer: Vec<u8>,
}

impl UdpTransport {
    pub fn target(&self) -> SocketAddr {
        self.target
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Unicast peers get an ephemeral socket. Group members share the group
    /// port, so several of them can run on one host.
    fn bind(ip: IpAddr, port: u16) -> Result<UdpSocket> {
        let (domain, unspecified): (Domain, IpAddr) = match ip {
            IpAddr::V4(_) => (Domain::IPV4, Ipv4Addr::UNSPECIFIED.into()),
            IpAddr::V6(_) => (Domain::IPV6, Ipv6Addr::UNSPECIFIED.into()),
        };

        if !ip.is_multicast() {
            return Ok(UdpSocket::bind((unspecified, 0))?);
        }

        let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        #[cfg(unix)]
        socket.set_reuse_port(true)?;
        socket
            .bind(&SocketAddr::new(unspecified, port).into())
            .map_err(|e| Error::Transport(format!("bind group port {port}: {e}")))?;

        Ok(socket.into())
    }
}

impl Transport for UdpTransport {
    fn connect(address: &str, port: u16) -> Result<Self> {
        let ip: IpAddr = address
            .parse()
            .map_err(|_| Error::Transport(format!("'{address}' is not an IP address")))?;

        let socket = Self::bind(ip, port)?;

        match ip {
            IpAddr::V4(group) if group.is_multicast() => {
                socket
                    .join_multicast_v4(&group, &Ipv4Addr::UNSPECIFIED)
                    .map_err(|e| Error::Transport(format!("join {group}: {e}")))?;
                socket.set_multicast_loop_v4(true)?;
            }
            IpAddr::V6(group) if group.is_multicast() => {
                socket
                    .join_multicast_v6(&group, 0)
                    .map_err(|e| Error::Transport(format!("join {group}: {e}")))?;
                socket.set_multicast_loop_v6(true)?;
            }
            _ => {}
        }

        socket.set_nonblocking(true)?;

        info!(address, port, local = ?socket.local_addr().ok(), "Transport connected");

        Ok(Self {
            socket,
            target: SocketAddr::new(ip, port),
            buffer: vec![0; MAX_DATAGRAM],
        })
    }

    fn send(&mut self, payload: &str) -> Result<()> {
        match self.socket.send_to(payload.as_bytes(), self.target) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                debug!("Send buffer full, dropping record");
                Ok(())
            }
            Err(e) => Err(Error::Transport(format!("send to {}: {e}", self.target))),
        }
    }

    fn poll(&mut self) -> Option<String> {
        loop {
            match self.socket.recv_from(&mut self.buffer) {
                Ok((len, from)) => match std::str::from_utf8(&self.buffer[..len]) {
                    Ok(text) => return Some(text.to_string()),
                    Err(_) => debug!(%from, "Dropping non-UTF-8 datagram"),
                },
                Err(e) if e.kind() == ErrorKind::WouldBlock => return None,
                Err(e) => {
                    debug!(error = %e, "Receive failed");
                    return None;
                }
            }
        }
    }
}
