//! IP address and subnet matching (`S@`).

use crate::context::MatchContext;
use std::net::IpAddr;
use std::str::FromStr;
use thiserror::Error;
use tracing::error;

/// Returns whether any of the agent's known addresses is `pattern` (a single address) or falls
/// within `pattern` (a CIDR block).
///
/// Only addresses of the pattern's family are considered; see [MatchContext::addresses]. A
/// pattern that is neither an address nor a valid block is logged and does not match.
pub fn ipcidr_match(
    pattern: &str,
    ctx: &MatchContext,
    _delimiter: Option<char>,
) -> anyhow::Result<bool> {
    let target = match pattern.parse::<IpTarget>() {
        Ok(target) => target,
        Err(err) => {
            error!("invalid IP/CIDR target {pattern}: {err}");
            return Ok(false);
        }
    };

    let addresses = ctx.addresses(target.is_ipv6());
    Ok(addresses.iter().any(|addr| target.contains(*addr)))
}

/// A single address or a network block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IpTarget {
    Address(IpAddr),
    Network { base: IpAddr, prefix: u8 },
}

impl IpTarget {
    pub fn is_ipv6(&self) -> bool {
        match self {
            IpTarget::Address(addr) | IpTarget::Network { base: addr, .. } => addr.is_ipv6(),
        }
    }

    /// Returns whether `addr` is this address or lies within this network.
    pub fn contains(&self, addr: IpAddr) -> bool {
        match *self {
            IpTarget::Address(target) => target == addr,
            IpTarget::Network { base, prefix } => match (base, addr) {
                (IpAddr::V4(base), IpAddr::V4(addr)) => {
                    let mask = mask_u32(prefix);
                    u32::from(base) & mask == u32::from(addr) & mask
                }
                (IpAddr::V6(base), IpAddr::V6(addr)) => {
                    let mask = mask_u128(prefix);
                    u128::from(base) & mask == u128::from(addr) & mask
                }
                _ => false,
            },
        }
    }
}

fn mask_u32(prefix: u8) -> u32 {
    u32::MAX.checked_shl(32 - u32::from(prefix)).unwrap_or(0)
}

fn mask_u128(prefix: u8) -> u128 {
    u128::MAX.checked_shl(128 - u32::from(prefix)).unwrap_or(0)
}

/// Why a pattern is not a valid [IpTarget].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ParseIpTargetError {
    /// The address portion didn't parse.
    #[error("not an IP address")]
    Address,
    /// The prefix length wasn't a number within the family's bit width.
    #[error("invalid prefix length")]
    Prefix,
    /// The network address has bits set beyond the prefix length, e.g. `10.0.0.1/8`.
    #[error("network address has host bits set")]
    HostBitsSet,
}

impl FromStr for IpTarget {
    type Err = ParseIpTargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((base, prefix)) = s.split_once('/') else {
            return s
                .parse()
                .map(IpTarget::Address)
                .map_err(|_| ParseIpTargetError::Address);
        };

        let base: IpAddr = base.parse().map_err(|_| ParseIpTargetError::Address)?;
        let width = if base.is_ipv6() { 128 } else { 32 };
        let prefix: u8 = prefix.parse().map_err(|_| ParseIpTargetError::Prefix)?;
        if prefix > width {
            return Err(ParseIpTargetError::Prefix);
        }

        let network = IpTarget::Network { base, prefix };
        // A network must equal its own base address once masked.
        let host_bits_clear = match base {
            IpAddr::V4(v4) => u32::from(v4) & !mask_u32(prefix) == 0,
            IpAddr::V6(v6) => u128::from(v6) & !mask_u128(prefix) == 0,
        };
        if !host_bits_clear {
            return Err(ParseIpTargetError::HostBitsSet);
        }
        Ok(network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> MatchContext {
        MatchContext::new("web01").with_grains(
            serde_yaml::from_str(
                "ipv4: [127.0.0.1, 10.20.30.40, 192.168.1.7]\nipv6: ['::1', 'fe80::1']",
            )
            .unwrap(),
        )
    }

    fn is_match(pattern: &str) -> bool {
        ipcidr_match(pattern, &context(), None).unwrap()
    }

    #[test]
    fn single_addresses_match_exactly() {
        assert!(is_match("10.20.30.40"));
        assert!(!is_match("10.20.30.41"));
        assert!(is_match("::1"));
        assert!(is_match("fe80::1"));
    }

    #[test]
    fn networks_match_contained_addresses() {
        assert!(is_match("10.0.0.0/8"));
        assert!(is_match("192.168.1.0/24"));
        assert!(!is_match("192.168.2.0/24"));
        assert!(is_match("fe80::/10"));
        assert!(!is_match("2001:db8::/32"));
    }

    #[test]
    fn zero_and_full_prefixes() {
        assert!(is_match("0.0.0.0/0"));
        assert!(is_match("127.0.0.1/32"));
        assert!(!is_match("127.0.0.2/32"));
        assert!(is_match("::/0"));
    }

    #[test]
    fn invalid_targets_do_not_match() {
        assert!(!is_match("10.0.0.1/8"));
        assert!(!is_match("10.0.0.0/33"));
        assert!(!is_match("web01"));
        assert!(!is_match("10.0.0.0/x"));
    }

    #[test]
    fn only_consults_the_matching_family() {
        let ctx = MatchContext::new("web01")
            .with_grains(serde_yaml::from_str("ipv6: ['::ffff:10.0.0.1']").unwrap());
        assert!(!ipcidr_match("10.0.0.0/8", &ctx, None).unwrap());
    }

    mod parse {
        use super::*;

        #[test]
        fn reports_why_parsing_failed() {
            assert_eq!(Err(ParseIpTargetError::Address), "nope".parse::<IpTarget>());
            assert_eq!(Err(ParseIpTargetError::Address), "nope/8".parse::<IpTarget>());
            assert_eq!(Err(ParseIpTargetError::Prefix), "::/129".parse::<IpTarget>());
            assert_eq!(
                Err(ParseIpTargetError::HostBitsSet),
                "192.168.1.1/24".parse::<IpTarget>(),
            );
        }
    }
}
