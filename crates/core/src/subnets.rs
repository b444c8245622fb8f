//! CIDR partitioning of a network's base range
//!
//! A base range split into `n` subnets gains `ceil(log2(n))` prefix bits,
//! producing equal-sized, contiguous, non-overlapping subranges in address
//! order whose union is exactly the base range. `n == 1` means no further
//! split: one subnet equal to the base range.

use std::net::Ipv4Addr;

use ipnetwork::Ipv4Network;

use crate::error::{Error, Result};

/// Additional prefix bits needed to carve `subnet_count` partitions
fn extra_bits(subnet_count: u32) -> u8 {
    if subnet_count <= 1 {
        return 0;
    }
    (u32::BITS - (subnet_count - 1).leading_zeros()) as u8
}

/// Partition `address` into `subnet_count` equal subnets.
///
/// Returns the normalized base range together with the partitions in
/// address order.
pub fn partition(address: &str, subnet_count: u32) -> Result<(Ipv4Network, Vec<Ipv4Network>)> {
    if subnet_count == 0 {
        return Err(Error::validation("subnet count must be at least 1"));
    }

    let parsed: Ipv4Network = address
        .parse()
        .map_err(|e| Error::validation(format!("invalid CIDR {}: {}", address, e)))?;
    let base = Ipv4Network::new(parsed.network(), parsed.prefix())?;

    let bits = extra_bits(subnet_count);
    let new_prefix = base.prefix() + bits;
    if new_prefix > 32 {
        return Err(Error::validation(format!(
            "cannot split {} into {} subnets",
            base, subnet_count
        )));
    }

    // u64 math so a /0 step does not overflow
    let step = 1u64 << (32 - new_prefix);
    let start = u64::from(u32::from(base.network()));

    let mut subnets = Vec::with_capacity(subnet_count as usize);
    for i in 0..u64::from(subnet_count) {
        let addr = Ipv4Addr::from((start + i * step) as u32);
        subnets.push(Ipv4Network::new(addr, new_prefix)?);
    }

    Ok((base, subnets))
}

/// The host-only address an agent assigns to its interface: the subnet's
/// base address with a mask covering exactly one host.
pub fn host_address(subnet: &Ipv4Network) -> Ipv4Network {
    // /32 of the network address always parses
    Ipv4Network::new(subnet.network(), 32).unwrap_or(*subnet)
}

/// The subnet's second host address (offset +1), keeping the subnet's
/// prefix. `None` when the subnet is too small to have one.
pub fn second_host_address(subnet: &Ipv4Network) -> Option<Ipv4Network> {
    if subnet.prefix() > 31 {
        return None;
    }
    let second = Ipv4Addr::from(u32::from(subnet.network()) + 1);
    Ipv4Network::new(second, subnet.prefix()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn net(s: &str) -> Ipv4Network {
        s.parse().unwrap()
    }

    #[test]
    fn test_extra_bits() {
        assert_eq!(extra_bits(1), 0);
        assert_eq!(extra_bits(2), 1);
        assert_eq!(extra_bits(3), 2);
        assert_eq!(extra_bits(4), 2);
        assert_eq!(extra_bits(5), 3);
        assert_eq!(extra_bits(8), 3);
        assert_eq!(extra_bits(9), 4);
    }

    #[test]
    fn test_partition_into_four() {
        let (base, subnets) = partition("10.0.0.0/24", 4).unwrap();
        assert_eq!(base, net("10.0.0.0/24"));
        assert_eq!(
            subnets,
            vec![
                net("10.0.0.0/26"),
                net("10.0.0.64/26"),
                net("10.0.0.128/26"),
                net("10.0.0.192/26"),
            ]
        );
    }

    #[test]
    fn test_partition_single_subnet_is_base_range() {
        let (base, subnets) = partition("192.168.1.0/24", 1).unwrap();
        assert_eq!(subnets, vec![base]);
    }

    #[test]
    fn test_partition_covers_base_exactly() {
        for count in [1u32, 3, 4, 5] {
            let (base, subnets) = partition("10.1.0.0/20", count).unwrap();

            // Equal-sized, in address order, pairwise non-overlapping
            let size = u64::from(subnets[0].size());
            let mut next = u64::from(u32::from(base.network()));
            for subnet in &subnets {
                assert_eq!(u64::from(subnet.size()), size);
                assert!(u64::from(u32::from(subnet.network())) >= next);
                next = u64::from(u32::from(subnet.network())) + size;
            }

            // The union never leaves the base range
            let end = u64::from(u32::from(base.network())) + u64::from(base.size());
            assert!(next <= end);

            // With a power-of-two count the union is exactly the base range
            if count.is_power_of_two() {
                assert_eq!(next, end);
            }
        }
    }

    #[test]
    fn test_partition_normalizes_host_bits() {
        let (base, _) = partition("10.0.0.77/24", 2).unwrap();
        assert_eq!(base, net("10.0.0.0/24"));
    }

    #[test]
    fn test_partition_rejects_bad_input() {
        assert!(matches!(
            partition("not-a-cidr", 4),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            partition("10.0.0.0/24", 0),
            Err(Error::Validation(_))
        ));
        // /32 cannot be split any further
        assert!(matches!(
            partition("10.0.0.1/32", 2),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_host_address() {
        assert_eq!(host_address(&net("10.0.0.64/26")), net("10.0.0.64/32"));
    }

    #[test]
    fn test_second_host_address() {
        assert_eq!(
            second_host_address(&net("10.0.0.64/26")),
            Some(net("10.0.0.65/26"))
        );
        assert_eq!(second_host_address(&net("10.0.0.1/32")), None);
    }
}
