//! Bidirectional single-peer UDP forwarder.
//!
//! Relays datagrams between a local application endpoint and a remote peer:
//! whatever arrives on one socket is copied to the other, unmodified unless a
//! payload filter is installed. The remote relay target follows the most
//! recently observed remote sender, so exactly one peer pair is served at a
//! time.

use std::net::SocketAddr;

pub mod error;
pub mod filter;
pub mod forwarder;

pub use error::ForwardError;
pub use filter::DatagramFilter;
pub use forwarder::{BUFFER_SIZE, Forwarder, ForwarderConfig, POLL_TIMEOUT};

/// Parse an `ip:port` endpoint string, i.e.: `192.168.0.4:9997`.
pub fn parse_endpoint(input: &str) -> Result<SocketAddr, ForwardError> {
    input.parse().map_err(|source| ForwardError::Endpoint {
        input: input.to_string(),
        source,
    })
}
