use std::fmt;
use std::net::Ipv4Addr;

/// The neighbor entry a queue belongs to: the outgoing device and the
/// next-hop address whose hardware address is still unresolved.
///
/// The queue never interprets this; it only shows up in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Destination {
    pub device: usize,
    pub addr: Ipv4Addr,
}

impl Destination {
    pub fn new(device: usize, addr: Ipv4Addr) -> Self {
        Destination { device, addr }
    }
}

impl Default for Destination {
    fn default() -> Self {
        Destination {
            device: 0,
            addr: Ipv4Addr::UNSPECIFIED,
        }
    }
}

/// Renders as `[device]addr`, e.g. `[1]10.0.0.7`.
impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}]{}", self.device, self.addr)
    }
}
