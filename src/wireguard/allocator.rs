//! Host address allocation inside a server subnet.

use std::collections::HashSet;
use std::net::Ipv4Addr;

use ipnetwork::IpNetwork;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AllocError {
    #[error("no free addresses left in {0}")]
    Exhausted(String),

    #[error("invalid subnet {0}")]
    InvalidSubnet(String),
}

/// Builds the set of addresses held by existing peers.
///
/// Accepts both `a.b.c.d` and `a.b.c.d/32`. Entries that do not parse are
/// skipped.
pub fn used_addresses<'a, I>(allowed_ips: I) -> HashSet<Ipv4Addr>
where
    I: IntoIterator<Item = &'a str>,
{
    allowed_ips
        .into_iter()
        .filter_map(|raw| {
            let host = raw.split('/').next().unwrap_or(raw).trim();
            match host.parse::<Ipv4Addr>() {
                Ok(addr) => Some(addr),
                Err(_) => {
                    tracing::warn!("Ignoring unparsable allowed_ip {:?}", raw);
                    None
                }
            }
        })
        .collect()
}

/// Returns the lowest free host address of `subnet` as a `/32`.
///
/// The network address, the first host (gateway) and the broadcast address
/// are never handed out.
///
/// # Arguments
///
/// * `subnet` - The server subnet in CIDR form, e.g. `10.0.1.0/24`.
/// * `used` - Addresses already bound to peers of the same server.
pub fn allocate(subnet: &str, used: &HashSet<Ipv4Addr>) -> Result<String, AllocError> {
    let network = match subnet.trim().parse::<IpNetwork>() {
        Ok(IpNetwork::V4(network)) => network,
        Ok(IpNetwork::V6(_)) | Err(_) => return Err(AllocError::InvalidSubnet(subnet.to_string())),
    };

    if network.prefix() >= 31 {
        return Err(AllocError::Exhausted(subnet.to_string()));
    }

    let first = u32::from(network.network()) + 2;
    let broadcast = u32::from(network.broadcast());

    (first..broadcast)
        .map(Ipv4Addr::from)
        .find(|candidate| !used.contains(candidate))
        .map(|addr| format!("{}/32", addr))
        .ok_or_else(|| AllocError::Exhausted(subnet.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn used(addrs: &[&str]) -> HashSet<Ipv4Addr> {
        used_addresses(addrs.iter().copied())
    }

    #[test]
    fn first_allocation_skips_network_and_gateway() {
        assert_eq!(allocate("10.0.1.0/24", &HashSet::new()).unwrap(), "10.0.1.2/32");
    }

    #[test]
    fn picks_the_lowest_free_address() {
        let taken = used(&["10.0.1.2/32", "10.0.1.4/32"]);
        assert_eq!(allocate("10.0.1.0/24", &taken).unwrap(), "10.0.1.3/32");
    }

    #[test]
    fn never_hands_out_the_broadcast_address() {
        let taken: HashSet<Ipv4Addr> = (2..=253).map(|last| Ipv4Addr::new(10, 0, 1, last)).collect();
        assert_eq!(allocate("10.0.1.0/24", &taken).unwrap(), "10.0.1.254/32");

        let mut full = taken;
        full.insert(Ipv4Addr::new(10, 0, 1, 254));
        assert!(matches!(allocate("10.0.1.0/24", &full), Err(AllocError::Exhausted(_))));
    }

    #[test]
    fn tiny_subnets_exhaust() {
        // /30: .0 network, .1 gateway, .2 host, .3 broadcast
        assert_eq!(allocate("192.168.5.0/30", &HashSet::new()).unwrap(), "192.168.5.2/32");
        assert!(allocate("192.168.5.0/30", &used(&["192.168.5.2/32"])).is_err());

        assert!(matches!(allocate("192.168.5.0/31", &HashSet::new()), Err(AllocError::Exhausted(_))));
        assert!(matches!(allocate("192.168.5.7/32", &HashSet::new()), Err(AllocError::Exhausted(_))));
    }

    #[test]
    fn results_stay_inside_the_subnet() {
        let mut taken = HashSet::new();
        for _ in 0..20 {
            let ip = allocate("172.16.8.0/27", &taken).unwrap();
            let addr: Ipv4Addr = ip.trim_end_matches("/32").parse().unwrap();
            assert!(addr > Ipv4Addr::new(172, 16, 8, 1));
            assert!(addr < Ipv4Addr::new(172, 16, 8, 31));
            assert!(taken.insert(addr));
        }
    }

    #[test]
    fn rejects_non_ipv4_subnets() {
        assert!(matches!(allocate("fd00::/64", &HashSet::new()), Err(AllocError::InvalidSubnet(_))));
        assert!(matches!(allocate("garbage", &HashSet::new()), Err(AllocError::InvalidSubnet(_))));
    }

    #[test]
    fn unparsable_stored_addresses_are_ignored() {
        let taken = used(&["10.0.1.2/32", "nonsense", "10.0.1.3"]);
        assert_eq!(taken.len(), 2);
        assert_eq!(allocate("10.0.1.0/24", &taken).unwrap(), "10.0.1.4/32");
    }
}
