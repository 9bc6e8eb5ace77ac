//! Best-guess LAN address of this device.
//!
//! Candidates are the IPv4 addresses of every interface that is up, followed
//! by the local addresses the routing table picks for a handful of
//! well-known destinations. Connecting a UDP socket only selects a route; no
//! packet is sent.

use std::net::{IpAddr, Ipv4Addr, UdpSocket};

const PROBE_TARGETS: [&str; 4] = [
    "192.168.255.255:9",
    "10.255.255.255:9",
    "172.31.255.255:9",
    "8.8.8.8:53",
];

/// Discover the device's IPv4 address, falling back to `127.0.0.1`.
pub fn device_ip() -> Ipv4Addr {
    select_device_ip(&candidate_addresses())
}

/// Pick the preferred address: `192.168.*` or `10.*` first, then any other
/// non-loopback IPv4, then loopback.
pub fn select_device_ip(candidates: &[Ipv4Addr]) -> Ipv4Addr {
    let usable = || {
        candidates
            .iter()
            .copied()
            .filter(|ip| !ip.is_loopback() && !ip.is_unspecified())
    };

    usable()
        .find(|ip| {
            let [a, b, ..] = ip.octets();
            (a == 192 && b == 168) || a == 10
        })
        .or_else(|| usable().next())
        .unwrap_or(Ipv4Addr::LOCALHOST)
}

fn candidate_addresses() -> Vec<Ipv4Addr> {
    let mut found = match interface_addresses() {
        Ok(addresses) => addresses,
        Err(e) => {
            tracing::debug!(error = %e, "Interface enumeration failed, using route probes only");
            Vec::new()
        }
    };
    for target in PROBE_TARGETS {
        match route_source(target) {
            Ok(Some(ip)) if !found.contains(&ip) => found.push(ip),
            Ok(_) => {}
            Err(e) => tracing::debug!(probe = target, error = %e, "No route for probe target"),
        }
    }
    found
}

#[cfg(unix)]
fn interface_addresses() -> std::io::Result<Vec<Ipv4Addr>> {
    let mut head: *mut libc::ifaddrs = std::ptr::null_mut();
    if unsafe { libc::getifaddrs(&mut head) } != 0 {
        return Err(std::io::Error::last_os_error());
    }

    let mut found = Vec::new();
    let mut cursor = head;
    while !cursor.is_null() {
        // SAFETY: `cursor` walks the list returned by getifaddrs, which stays
        // valid until freeifaddrs below.
        let entry = unsafe { &*cursor };
        cursor = entry.ifa_next;

        let up = entry.ifa_flags & libc::IFF_UP as libc::c_uint != 0;
        if !up || entry.ifa_addr.is_null() {
            continue;
        }
        let family = unsafe { (*entry.ifa_addr).sa_family };
        if i32::from(family) != libc::AF_INET {
            continue;
        }
        let addr = unsafe { &*(entry.ifa_addr as *const libc::sockaddr_in) };
        let ip = Ipv4Addr::from(u32::from_be(addr.sin_addr.s_addr));
        if !found.contains(&ip) {
            found.push(ip);
        }
    }

    unsafe { libc::freeifaddrs(head) };
    Ok(found)
}

#[cfg(not(unix))]
fn interface_addresses() -> std::io::Result<Vec<Ipv4Addr>> {
    Ok(Vec::new())
}

fn route_source(target: &str) -> std::io::Result<Option<Ipv4Addr>> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
    socket.connect(target)?;
    Ok(match socket.local_addr()?.ip() {
        IpAddr::V4(ip) => Some(ip),
        IpAddr::V6(_) => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> Ipv4Addr {
        s.parse().unwrap()
    }

    #[test]
    fn prefers_private_lan_ranges() {
        let candidates = [ip("172.17.0.2"), ip("192.168.1.20"), ip("10.0.0.5")];
        assert_eq!(select_device_ip(&candidates), ip("192.168.1.20"));

        let candidates = [ip("172.17.0.2"), ip("10.0.0.5")];
        assert_eq!(select_device_ip(&candidates), ip("10.0.0.5"));
    }

    #[test]
    fn falls_back_to_any_non_loopback() {
        let candidates = [ip("127.0.0.1"), ip("0.0.0.0"), ip("100.64.3.1")];
        assert_eq!(select_device_ip(&candidates), ip("100.64.3.1"));
    }

    #[test]
    fn falls_back_to_loopback() {
        assert_eq!(select_device_ip(&[]), Ipv4Addr::LOCALHOST);
        assert_eq!(select_device_ip(&[ip("127.0.0.1")]), Ipv4Addr::LOCALHOST);
    }

    #[cfg(unix)]
    #[test]
    fn interfaces_include_loopback() {
        let addresses = interface_addresses().unwrap();
        assert!(addresses.iter().any(|ip| ip.is_loopback()), "got {:?}", addresses);
        assert!(addresses.iter().all(|ip| !ip.is_unspecified()));
    }

    #[test]
    fn lan_interface_beats_route_source() {
        // A cellular default route listed before the Wi-Fi interface.
        let candidates = [ip("127.0.0.1"), ip("100.72.14.9"), ip("192.168.43.17")];
        assert_eq!(select_device_ip(&candidates), ip("192.168.43.17"));
    }

    #[test]
    fn discovery_never_returns_unspecified() {
        assert!(!device_ip().is_unspecified());
    }
}
