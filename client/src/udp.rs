//! UDP transport for the legacy binary protocol
//!
//! Fire and forget: the protocol has no responses, so delivery errors
//! surface only as local socket failures.

use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

use anyhow::{Context, Result};
use protocol::constants::UDP_PORT;
use protocol::{udp, Session};
use socket2::SockRef;
use tracing::{debug, info};

use crate::discovery;

/// A connected UDP notifier. Registers the session's notification
/// types on creation; afterwards only [`notify`](Self::notify) is
/// needed.
pub struct UdpNotifier {
    session: Session,
    socket: UdpSocket,
    target: SocketAddr,
}

impl UdpNotifier {
    /// Resolves `host`, binds a socket and sends the registration
    /// packet.
    pub fn connect(host: &str, session: Session) -> Result<Self> {
        let target = (host, UDP_PORT)
            .to_socket_addrs()
            .with_context(|| format!("Failed to resolve growl host: {}", host))?
            .next()
            .with_context(|| format!("No addresses for growl host: {}", host))?;

        let socket = UdpSocket::bind("0.0.0.0:0").context("Failed to bind UDP socket")?;

        if discovery::is_broadcast(&target) {
            socket
                .set_broadcast(true)
                .context("Failed to enable broadcast")?;
            debug!("Broadcast target: {}", target);
        }

        let notifier = UdpNotifier {
            session,
            socket,
            target,
        };

        notifier.register()?;
        info!("Registered {} with {}", notifier.session.application(), target);

        Ok(notifier)
    }

    /// Re-sends the registration packet. Useful after the server
    /// restarts, since registrations are not persistent everywhere.
    pub fn register(&self) -> Result<()> {
        let packet = udp::registration_packet(&self.session)?;
        self.send(&packet)
    }

    /// Sends one notification of a registered type.
    pub fn notify(
        &self,
        name: &str,
        title: &str,
        description: &str,
        priority: i8,
        sticky: bool,
    ) -> Result<()> {
        let packet =
            udp::notification_packet(&self.session, name, title, description, priority, sticky)?;
        self.send(&packet)
    }

    fn send(&self, packet: &[u8]) -> Result<()> {
        // size the send buffer to the packet, as existing clients do
        let sock = SockRef::from(&self.socket);
        sock.set_send_buffer_size(packet.len())
            .context("Failed to set send buffer size")?;

        debug!("Sending {} byte packet to {}", packet.len(), self.target);

        self.socket
            .send_to(packet, self.target)
            .context("Failed to send growl packet")?;

        Ok(())
    }
}
