use bytes::Bytes;

/// Payload transform applied to each datagram before it is relayed.
///
/// Returning `None` drops the datagram. The default in both directions is
/// identity, the forwarder is pass-through unless told otherwise.
pub type DatagramFilter = Box<dyn Fn(&[u8]) -> Option<Bytes> + Send + Sync>;

pub(crate) fn identity() -> DatagramFilter {
    Box::new(|payload| Some(Bytes::copy_from_slice(payload)))
}
