//! The local agent's view of itself, as seen by matcher engines.

#[cfg(doc)]
use crate::engine::EngineRegistry;
use serde_yaml::{Mapping, Value};
use std::net::IpAddr;

/// Everything a matcher engine may inspect about the agent being targeted.
///
/// A [MatchContext] is supplied by the caller for the duration of an evaluation. The evaluator
/// only ever borrows it; it never mutates or retains it. Gathering grains and pillar data (from a
/// cache, a live query, etc.) is the caller's job and must happen before evaluation begins.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MatchContext {
    /// The agent's identity, e.g. `web01.example.com`.
    pub id: String,

    /// Static facts about the agent. Expected to be a mapping; any other value simply never
    /// matches.
    pub grains: Value,

    /// Configuration data assigned to the agent. Expected to be a mapping, like
    /// [Self::grains].
    pub pillar: Value,
}

impl MatchContext {
    /// Creates a context with the given identity and empty grains and pillar.
    pub fn new(id: impl Into<String>) -> Self {
        MatchContext {
            id: id.into(),
            grains: Value::Mapping(Mapping::new()),
            pillar: Value::Mapping(Mapping::new()),
        }
    }

    /// Replaces the grains.
    pub fn with_grains(mut self, grains: Value) -> Self {
        self.grains = grains;
        self
    }

    /// Replaces the pillar.
    pub fn with_pillar(mut self, pillar: Value) -> Self {
        self.pillar = pillar;
        self
    }

    /// Returns the agent's known addresses of one family, read from the `ipv4` or `ipv6` grain.
    ///
    /// Entries that don't parse as addresses of the requested family are skipped. A missing
    /// grain yields an empty list.
    pub fn addresses(&self, ipv6: bool) -> Vec<IpAddr> {
        let key = if ipv6 { "ipv6" } else { "ipv4" };
        let Some(values) = self.grains.get(key) else {
            return Vec::new();
        };

        let entries: Vec<&Value> = match values {
            Value::Sequence(seq) => seq.iter().collect(),
            value => vec![value],
        };

        entries
            .into_iter()
            .filter_map(Value::as_str)
            .filter_map(|s| s.parse::<IpAddr>().ok())
            .filter(|addr| addr.is_ipv6() == ipv6)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod addresses {
        use super::*;

        fn context(grains: &str) -> MatchContext {
            MatchContext::new("web01").with_grains(serde_yaml::from_str(grains).unwrap())
        }

        #[test]
        fn reads_the_requested_family() {
            let ctx = context("ipv4: [127.0.0.1, 10.0.0.5]\nipv6: ['::1']");
            assert_eq!(
                vec![
                    "127.0.0.1".parse::<IpAddr>().unwrap(),
                    "10.0.0.5".parse().unwrap(),
                ],
                ctx.addresses(false),
            );
            assert_eq!(vec!["::1".parse::<IpAddr>().unwrap()], ctx.addresses(true));
        }

        #[test]
        fn skips_garbage_and_wrong_families() {
            let ctx = context("ipv4: [not-an-ip, '::1', 192.168.1.1, 7]");
            assert_eq!(
                vec!["192.168.1.1".parse::<IpAddr>().unwrap()],
                ctx.addresses(false),
            );
        }

        #[test]
        fn accepts_a_scalar_grain() {
            let ctx = context("ipv4: 10.1.2.3");
            assert_eq!(
                vec!["10.1.2.3".parse::<IpAddr>().unwrap()],
                ctx.addresses(false),
            );
        }

        #[test]
        fn works_without_grains() {
            assert!(MatchContext::new("web01").addresses(false).is_empty());
            assert!(MatchContext::default().addresses(true).is_empty());
        }
    }
}
