use std::net::SocketAddr;

use thiserror::Error;

/// Failures the forwarder can surface to its caller.
///
/// A readiness notification with no datagram behind it is routine control
/// flow, not a failure; it is represented by [`RecvOutcome::Empty`] on the
/// receive path and never appears here.
///
/// [`RecvOutcome::Empty`]: crate::forwarder::RecvOutcome::Empty
#[derive(Debug, Error)]
pub enum ForwardError {
    /// An endpoint string did not parse as `ip:port`.
    #[error("invalid endpoint {input:?}: {source}")]
    Endpoint {
        input: String,
        #[source]
        source: std::net::AddrParseError,
    },

    /// Socket creation, bind, or connect failed at startup. The process
    /// cannot relay anything and should exit non-zero.
    #[error("socket setup failed for {addr}: {source}")]
    Setup {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// A receive or send failed while the relay loop was running, i.e.:
    /// destination unreachable or the socket closed under us. There is no
    /// retry or reconnect logic, the loop terminates.
    #[error("transfer failed: {0}")]
    Transfer(#[from] std::io::Error),
}
