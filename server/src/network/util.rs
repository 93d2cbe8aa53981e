//! Interface discovery for the server identity.

use std::net::Ipv4Addr;

/// Return a private (RFC1918) IPv4 address and its MAC address if both
/// can be inferred from the machine's interfaces.
pub fn get_private_ipv4_with_mac() -> Option<(Ipv4Addr, [u8; 6])> {
    use pnet_datalink::NetworkInterface;
    let ifaces: Vec<NetworkInterface> = pnet_datalink::interfaces();
    for iface in &ifaces {
        if let Some(mac) = iface.mac {
            for ipnet in &iface.ips {
                if let std::net::IpAddr::V4(v4) = ipnet.ip() {
                    if v4.is_loopback() {
                        continue;
                    }
                    if is_private_ipv4(&v4) {
                        return Some((v4, mac.octets()));
                    }
                }
            }
        }
    }
    None
}

/// Check if an IPv4 address is within the RFC1918 private ranges.
/// - 10.0.0.0/8
/// - 172.16.0.0/12
/// - 192.168.0.0/16
#[inline]
pub fn is_private_ipv4(ip: &Ipv4Addr) -> bool {
    let octets = ip.octets();
    match octets {
        [10, _, _, _] => true,
        [172, b, _, _] if (16..=31).contains(&b) => true,
        [192, 168, _, _] => true,
        _ => false,
    }
}
