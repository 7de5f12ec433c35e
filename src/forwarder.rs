use std::io::ErrorKind;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::error::ForwardError;
use crate::filter::{DatagramFilter, identity};

/// Largest datagram relayed in one piece. Longer payloads are cut off at
/// this boundary by the receive call, UDP has no reassembly.
pub const BUFFER_SIZE: usize = 1024;

/// Upper bound on one suspension of the relay loop, so cancellation is
/// observed within this interval even while no traffic flows.
pub const POLL_TIMEOUT: Duration = Duration::from_secs(1);

/// Outcome of a non-blocking receive on a readiness-notified socket.
///
/// `Empty` is the stale-readiness race between the multiplexer and actual
/// data availability. It is expected control flow and the loop moves on.
pub enum RecvOutcome<T> {
    Ready(T),
    Empty,
}

fn nonblocking<T>(res: std::io::Result<T>) -> Result<RecvOutcome<T>, ForwardError> {
    match res {
        Ok(value) => Ok(RecvOutcome::Ready(value)),
        Err(err) if err.kind() == ErrorKind::WouldBlock => Ok(RecvOutcome::Empty),
        Err(err) => Err(ForwardError::Transfer(err)),
    }
}

/// Endpoints and optional payload filters for a [`Forwarder`].
pub struct ForwarderConfig {
    /// Address of the proxied application, i.e.: `127.0.0.1:9996`.
    pub local: SocketAddr,
    /// Address the remote-facing socket binds to.
    pub remote: SocketAddr,
    local_to_remote: DatagramFilter,
    remote_to_local: DatagramFilter,
}

impl ForwarderConfig {
    pub fn new(local: SocketAddr, remote: SocketAddr) -> Self {
        Self {
            local,
            remote,
            local_to_remote: identity(),
            remote_to_local: identity(),
        }
    }

    /// Install a filter for datagrams flowing from the local application to
    /// the remote peer.
    pub fn local_to_remote_filter(
        mut self,
        filter: impl Fn(&[u8]) -> Option<Bytes> + Send + Sync + 'static,
    ) -> Self {
        self.local_to_remote = Box::new(filter);
        self
    }

    /// Install a filter for datagrams flowing from the remote peer to the
    /// local application.
    pub fn remote_to_local_filter(
        mut self,
        filter: impl Fn(&[u8]) -> Option<Bytes> + Send + Sync + 'static,
    ) -> Self {
        self.remote_to_local = Box::new(filter);
        self
    }
}

enum Wake {
    Local,
    Remote,
    Tick,
}

/// Bidirectional single-peer UDP relay.
///
/// Owns two sockets: one connected to the local application, one bound for
/// the remote side. [`run`](Self::run) copies whatever arrives on either
/// socket to the other until the token is cancelled or a transfer fails.
pub struct Forwarder {
    local_socket: UdpSocket,
    remote_socket: UdpSocket,
    /// Relay target for local-to-remote traffic. Overwritten on every
    /// inbound remote datagram, a second concurrent remote peer takes over
    /// the relay.
    last_remote_sender: SocketAddr,
    local_to_remote: DatagramFilter,
    remote_to_local: DatagramFilter,
}

impl std::fmt::Debug for Forwarder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Forwarder")
            .field("local_socket", &self.local_socket)
            .field("remote_socket", &self.remote_socket)
            .field("last_remote_sender", &self.last_remote_sender)
            .finish_non_exhaustive()
    }
}

impl Forwarder {
    /// Set up both sockets. Binding is separate from [`run`](Self::run) so
    /// callers can observe the actual bound addresses when port 0 was asked
    /// for.
    pub async fn bind(config: ForwarderConfig) -> Result<Self, ForwardError> {
        let setup = |addr: SocketAddr, source: std::io::Error| ForwardError::Setup { addr, source };

        // Ephemeral port on the application's interface. The datagram
        // connect fixes the peer without any handshake, UDP has none.
        let local_socket = UdpSocket::bind(SocketAddr::new(config.local.ip(), 0))
            .await
            .map_err(|e| setup(config.local, e))?;
        local_socket
            .connect(config.local)
            .await
            .map_err(|e| setup(config.local, e))?;

        let remote_socket = UdpSocket::bind(config.remote)
            .await
            .map_err(|e| setup(config.remote, e))?;
        // Until the first remote datagram arrives there is no observed
        // sender, the operator-supplied address stands in.
        let last_remote_sender = remote_socket
            .local_addr()
            .map_err(|e| setup(config.remote, e))?;

        Ok(Self {
            local_socket,
            remote_socket,
            last_remote_sender,
            local_to_remote: config.local_to_remote,
            remote_to_local: config.remote_to_local,
        })
    }

    /// Address of the socket the local application talks to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.local_socket.local_addr()
    }

    /// Address of the socket remote peers talk to.
    pub fn remote_addr(&self) -> std::io::Result<SocketAddr> {
        self.remote_socket.local_addr()
    }

    /// Relay until `cancel` fires or a transfer fails.
    ///
    /// Single task, no locks: this loop is the only mutator of the relay
    /// target. Each suspension is bounded by [`POLL_TIMEOUT`] so the token
    /// is observed even when both sockets stay quiet.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<(), ForwardError> {
        info!(
            local = %self.local_addr()?,
            remote = %self.remote_addr()?,
            "relay loop started"
        );

        let mut buf = [0u8; BUFFER_SIZE];
        loop {
            let wake = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("relay loop cancelled");
                    return Ok(());
                }
                _ = tokio::time::sleep(POLL_TIMEOUT) => Wake::Tick,
                ready = self.remote_socket.readable() => {
                    ready?;
                    Wake::Remote
                }
                ready = self.local_socket.readable() => {
                    ready?;
                    Wake::Local
                }
            };

            match wake {
                Wake::Remote => self.relay_remote_to_local(&mut buf).await?,
                Wake::Local => self.relay_local_to_remote(&mut buf).await?,
                Wake::Tick => trace!("idle poll timeout"),
            }
        }
    }

    async fn relay_remote_to_local(&mut self, buf: &mut [u8]) -> Result<(), ForwardError> {
        let (len, sender) = match nonblocking(self.remote_socket.try_recv_from(buf))? {
            RecvOutcome::Ready(received) => received,
            RecvOutcome::Empty => {
                trace!("remote readiness was stale");
                return Ok(());
            }
        };
        if len == 0 {
            return Ok(());
        }

        self.last_remote_sender = sender;
        match (self.remote_to_local)(&buf[..len]) {
            Some(payload) => {
                debug!(%sender, len, "remote -> local");
                self.local_socket.send(&payload).await?;
            }
            None => debug!(%sender, len, "remote datagram dropped by filter"),
        }
        Ok(())
    }

    async fn relay_local_to_remote(&mut self, buf: &mut [u8]) -> Result<(), ForwardError> {
        let len = match nonblocking(self.local_socket.try_recv(buf))? {
            RecvOutcome::Ready(len) => len,
            RecvOutcome::Empty => {
                trace!("local readiness was stale");
                return Ok(());
            }
        };
        if len == 0 {
            return Ok(());
        }

        match (self.local_to_remote)(&buf[..len]) {
            Some(payload) => {
                debug!(target_addr = %self.last_remote_sender, len, "local -> remote");
                self.remote_socket
                    .send_to(&payload, self.last_remote_sender)
                    .await?;
            }
            None => debug!(len, "local datagram dropped by filter"),
        }
        Ok(())
    }
}
