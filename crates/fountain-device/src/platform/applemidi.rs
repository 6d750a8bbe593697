//! AppleMIDI (RTP-MIDI) network session.
//!
//! Enabling binds the session's UDP control port; disabling says `BY` to
//! every peer still in the session and releases the port. `connect` sends a
//! session invitation to the peer's control port and returns without
//! waiting for the peer to answer. Peer answers (`OK`, `NO`, `BY`) are read
//! whenever the control socket is next used. Clock sync and journalling are
//! left to the peer-side stack.
//!
//! Host names are resolved on the blocking pool, so `connect` never waits
//! on DNS; literal IPv4 addresses are sent to directly.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4, ToSocketAddrs, UdpSocket};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use fountain_protocol::applemidi::{SessionCommand, SessionPacket};
use socket2::{Domain, Protocol, Socket, Type};
use tracing::{debug, info, warn};

use crate::NetworkMidi;

/// Largest control packet we read: header plus a generous session name.
const MAX_CONTROL_PACKET: usize = 512;

/// Bound control socket plus the peers invited through it.
struct Control {
    socket: UdpSocket,
    /// Invited peers and the initiator token of their invitation
    peers: BTreeMap<SocketAddr, u32>,
}

impl Control {
    /// Apply every answer waiting on the control socket.
    fn drain_replies(&mut self) {
        let mut buf = [0u8; MAX_CONTROL_PACKET];
        loop {
            let (n, src) = match self.socket.recv_from(&mut buf) {
                Ok(received) => received,
                Err(e) if e.kind() == ErrorKind::WouldBlock => return,
                Err(e) => {
                    debug!(error = %e, "Control socket read failed");
                    return;
                }
            };

            let Some(packet) = SessionPacket::deserialize(&buf[..n]) else {
                debug!(%src, bytes = n, "Ignoring non-session packet");
                continue;
            };

            match packet.command {
                SessionCommand::Accepted => {
                    info!(peer = %src, name = %packet.name, "Network MIDI peer accepted invitation");
                }
                SessionCommand::Rejected => {
                    self.peers.remove(&src);
                    info!(peer = %src, "Network MIDI peer rejected invitation");
                }
                SessionCommand::End => {
                    self.peers.remove(&src);
                    info!(peer = %src, "Network MIDI peer left the session");
                }
                SessionCommand::Invitation => {
                    debug!(peer = %src, name = %packet.name, "Ignoring inbound invitation");
                }
            }
        }
    }

    fn send(&self, packet: &SessionPacket, peer: SocketAddr) -> std::io::Result<()> {
        let mut buf = Vec::with_capacity(SessionPacket::HEADER_SIZE + packet.name.len() + 1);
        packet.serialize(&mut buf);
        self.socket.send_to(&buf, peer).map(|_| ())
    }
}

type SharedControl = Arc<Mutex<Option<Control>>>;

fn lock(control: &Mutex<Option<Control>>) -> anyhow::Result<MutexGuard<'_, Option<Control>>> {
    control
        .lock()
        .map_err(|_| anyhow::anyhow!("session lock poisoned"))
}

/// Send `packet` to `peer` if the session is still enabled, and remember
/// the peer for the closing `BY`.
fn invite(control: &Mutex<Option<Control>>, packet: &SessionPacket, peer: SocketAddr) -> anyhow::Result<()> {
    let mut guard = lock(control)?;
    let control = guard
        .as_mut()
        .ok_or_else(|| anyhow::anyhow!("Network MIDI session is disabled"))?;

    control.drain_replies();
    control.send(packet, peer)?;
    control.peers.insert(peer, packet.initiator_token);

    debug!(%peer, token = packet.initiator_token, "Sent AppleMIDI invitation");
    Ok(())
}

fn resolve_ipv4(host: &str, port: u16) -> anyhow::Result<SocketAddr> {
    (host, port)
        .to_socket_addrs()?
        .find(SocketAddr::is_ipv4)
        .ok_or_else(|| anyhow::anyhow!("No IPv4 address for {}", host))
}

/// Non-blocking UDP control socket with address reuse.
fn bind_control_socket(port: u16) -> std::io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;

    let addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port);
    socket.bind(&addr.into())?;
    socket.set_nonblocking(true)?;

    Ok(socket.into())
}

/// Session source identifier: not cryptographic, only unique per run.
fn generate_ssrc() -> u32 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    nanos ^ std::process::id().rotate_left(16)
}

pub struct AppleMidiSession {
    session_name: String,
    local_name: String,
    control_port: u16,
    ssrc: u32,
    next_token: AtomicU32,
    control: SharedControl,
}

impl AppleMidiSession {
    pub fn new(session_name: &str, local_name: &str, control_port: u16) -> Self {
        let ssrc = generate_ssrc();
        Self {
            session_name: session_name.to_string(),
            local_name: local_name.to_string(),
            control_port,
            ssrc,
            next_token: AtomicU32::new(ssrc.rotate_left(8)),
            control: Arc::new(Mutex::new(None)),
        }
    }

    fn is_enabled(&self) -> anyhow::Result<bool> {
        Ok(lock(&self.control)?.is_some())
    }
}

impl NetworkMidi for AppleMidiSession {
    fn supported(&self) -> bool {
        true
    }

    fn set_enabled(&self, enabled: bool) -> anyhow::Result<()> {
        let mut control = lock(&self.control)?;

        match (enabled, control.is_some()) {
            (true, false) => {
                let socket = bind_control_socket(self.control_port)?;
                info!(
                    port = self.control_port,
                    session = %self.session_name,
                    "Network MIDI session enabled"
                );
                *control = Some(Control {
                    socket,
                    peers: BTreeMap::new(),
                });
            }
            (false, true) => {
                if let Some(mut closing) = control.take() {
                    closing.drain_replies();
                    for (&peer, &token) in &closing.peers {
                        if let Err(e) = closing.send(&SessionPacket::end(token, self.ssrc), peer) {
                            debug!(error = %e, %peer, "Failed to send AppleMIDI end");
                        }
                    }
                }
                info!(session = %self.session_name, "Network MIDI session disabled");
            }
            _ => {}
        }
        Ok(())
    }

    fn connect(&self, host: &str, port: u16) -> anyhow::Result<()> {
        if !self.is_enabled()? {
            anyhow::bail!("Network MIDI session is disabled");
        }

        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let invitation = SessionPacket::invitation(token, self.ssrc, &self.session_name);

        match host.parse::<IpAddr>() {
            Ok(IpAddr::V4(ip)) => invite(&self.control, &invitation, SocketAddr::new(ip.into(), port)),
            Ok(IpAddr::V6(_)) => Err(anyhow::anyhow!("Network MIDI control socket is IPv4 only")),
            Err(_) => {
                let runtime = tokio::runtime::Handle::try_current()
                    .map_err(|_| anyhow::anyhow!("Resolving '{}' needs a tokio runtime", host))?;

                let control = Arc::clone(&self.control);
                let host = host.to_string();
                runtime.spawn_blocking(move || {
                    let sent = resolve_ipv4(&host, port)
                        .and_then(|peer| invite(&control, &invitation, peer));
                    if let Err(e) = sent {
                        warn!(error = %e, host = %host, port, "AppleMIDI invitation not sent");
                    }
                });
                Ok(())
            }
        }
    }

    fn network_name(&self) -> String {
        self.session_name.clone()
    }

    fn local_name(&self) -> String {
        self.local_name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    fn peer() -> (UdpSocket, u16) {
        let peer = UdpSocket::bind("127.0.0.1:0").unwrap();
        peer.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
        let port = peer.local_addr().unwrap().port();
        (peer, port)
    }

    fn recv_packet(peer: &UdpSocket) -> (SessionPacket, SocketAddr) {
        let mut buf = [0u8; 128];
        let (n, src) = peer.recv_from(&mut buf).unwrap();
        (SessionPacket::deserialize(&buf[..n]).unwrap(), src)
    }

    /// Port 0 lets the OS pick a free control port.
    fn enabled_session() -> AppleMidiSession {
        let session = AppleMidiSession::new("Fountain", "studio", 0);
        session.set_enabled(true).unwrap();
        session
    }

    #[test]
    fn test_connect_requires_enabled_session() {
        let session = AppleMidiSession::new("Fountain", "studio", 0);
        assert!(session.connect("127.0.0.1", 5004).is_err());
    }

    #[test]
    fn test_invitation_reaches_peer() {
        let (peer, peer_port) = peer();
        let session = enabled_session();
        session.connect("127.0.0.1", peer_port).unwrap();

        let (packet, _) = recv_packet(&peer);
        assert_eq!(packet.command, SessionCommand::Invitation);
        assert_eq!(packet.name, "Fountain");
        assert_eq!(packet.ssrc, session.ssrc);
    }

    #[test]
    fn test_disable_says_goodbye_to_invited_peer() {
        let (peer, peer_port) = peer();
        let session = enabled_session();
        session.connect("127.0.0.1", peer_port).unwrap();
        let (invitation, _) = recv_packet(&peer);

        session.set_enabled(false).unwrap();
        let (bye, _) = recv_packet(&peer);
        assert_eq!(bye.command, SessionCommand::End);
        assert_eq!(bye.initiator_token, invitation.initiator_token);
        assert_eq!(bye.ssrc, session.ssrc);
    }

    #[test]
    fn test_rejecting_peer_gets_no_goodbye() {
        let (peer, peer_port) = peer();
        let session = enabled_session();
        session.connect("127.0.0.1", peer_port).unwrap();
        let (invitation, control_addr) = recv_packet(&peer);

        let reply = SessionPacket {
            command: SessionCommand::Rejected,
            initiator_token: invitation.initiator_token,
            ssrc: 0x1234,
            name: String::new(),
        };
        let mut buf = Vec::new();
        reply.serialize(&mut buf);
        let control_addr = SocketAddr::new(Ipv4Addr::LOCALHOST.into(), control_addr.port());
        peer.send_to(&buf, control_addr).unwrap();
        thread::sleep(Duration::from_millis(50));

        session.set_enabled(false).unwrap();
        peer.set_read_timeout(Some(Duration::from_millis(200))).unwrap();
        let mut buf = [0u8; 64];
        assert!(peer.recv_from(&mut buf).is_err());
    }

    #[test]
    fn test_disable_releases_socket() {
        let session = enabled_session();
        session.set_enabled(false).unwrap();
        assert!(session.connect("127.0.0.1", 5004).is_err());
    }

    #[test]
    fn test_ipv6_peer_rejected() {
        let session = enabled_session();
        assert!(session.connect("::1", 5004).is_err());
    }

    #[test]
    fn test_host_name_needs_runtime() {
        let session = enabled_session();
        assert!(session.connect("localhost", 5004).is_err());
    }

    #[tokio::test]
    async fn test_host_name_resolved_off_the_caller() {
        let (peer, peer_port) = peer();
        let session = enabled_session();

        session.connect("localhost", peer_port).unwrap();

        let (packet, _) = tokio::task::spawn_blocking(move || recv_packet(&peer))
            .await
            .unwrap();
        assert_eq!(packet.command, SessionCommand::Invitation);
        assert_eq!(packet.ssrc, session.ssrc);
    }
}
