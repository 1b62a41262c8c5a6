//! Broadcast target detection
//!
//! The binary UDP protocol is commonly sent to a whole subnet. A
//! target counts as broadcast when it is the limited broadcast address
//! or the directed broadcast address of a local interface; the socket
//! then needs `SO_BROADCAST` before the first send.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use anyhow::Result;
use if_addrs::IfAddr;
use tracing::warn;

/// Resolves candidate Growl hosts advertising on the local network.
/// Implementations (mDNS and friends) plug in from outside; nothing in
/// this crate browses the network itself.
#[allow(dead_code)]
pub trait Discovery {
    fn discover(&mut self) -> Result<Vec<String>>;
}

/// Whether `target` requires a broadcast-enabled socket.
pub fn is_broadcast(target: &SocketAddr) -> bool {
    let IpAddr::V4(ip) = target.ip() else {
        return false;
    };

    ip == Ipv4Addr::BROADCAST || interface_broadcasts().contains(&ip)
}

/// Directed broadcast addresses of every local IPv4 interface.
fn interface_broadcasts() -> Vec<Ipv4Addr> {
    match if_addrs::get_if_addrs() {
        Ok(interfaces) => interfaces
            .into_iter()
            .filter_map(|interface| match interface.addr {
                IfAddr::V4(v4) => v4.broadcast,
                IfAddr::V6(_) => None,
            })
            .collect(),
        Err(e) => {
            warn!("Failed to enumerate interfaces: {}", e);
            Vec::new()
        }
    }
}
