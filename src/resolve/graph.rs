//-
// Copyright (c) 2024, Jason Lingle
//
// This file is part of piler-mailcow.
//
// piler-mailcow is free software: you can redistribute it and/or modify it
// under the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// piler-mailcow is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for
// more details.
//
// You should have received a copy of the GNU General Public License along
// with piler-mailcow. If not, see <http://www.gnu.org/licenses/>.

use std::collections::{BTreeMap, BTreeSet};

use crate::mailcow::AliasRecord;

/// The alias table viewed backwards: for each destination, the aliases which
/// deliver to it.
///
/// Domain wildcards are not part of the graph; they match any local part and
/// so are handled by `wildcard::match_wildcards` instead.
#[derive(Debug, Default)]
pub struct AliasGraph<'a> {
    predecessors: BTreeMap<&'a str, Vec<&'a str>>,
}

impl<'a> AliasGraph<'a> {
    pub fn new(aliases: &'a [AliasRecord]) -> Self {
        let mut predecessors = BTreeMap::<&str, Vec<&str>>::new();
        for alias in aliases.iter().filter(|a| !a.is_wildcard()) {
            for destination in &alias.destinations {
                predecessors
                    .entry(destination.as_str())
                    .or_default()
                    .push(alias.address.as_str());
            }
        }

        Self { predecessors }
    }

    /// Aliases whose destinations include `target`.
    pub fn predecessors(&self, target: &str) -> &[&'a str] {
        self.predecessors
            .get(target)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Return every address that delivers to `mailbox` through one or more
    /// alias hops.
    ///
    /// `mailbox` itself is never part of the result, even if an alias cycle
    /// leads back to it. Each address is expanded at most once, so cycles and
    /// re-convergent chains terminate.
    pub fn routing_addresses(&self, mailbox: &str) -> BTreeSet<String> {
        let mut seen = BTreeSet::<&str>::new();
        seen.insert(mailbox);

        let mut resolved = BTreeSet::new();
        let mut stack = vec![mailbox];
        while let Some(target) = stack.pop() {
            for &address in self.predecessors(target) {
                if seen.insert(address) {
                    resolved.insert(address.to_owned());
                    stack.push(address);
                }
            }
        }

        resolved
    }
}

/// Compute the set of plain (non-wildcard) addresses which route to
/// `mailbox`.
///
/// `mailbox` is compared case-insensitively, like alias addresses.
pub fn resolve_routing_addresses(
    mailbox: &str,
    aliases: &[AliasRecord],
) -> BTreeSet<String> {
    AliasGraph::new(aliases).routing_addresses(&mailbox.to_lowercase())
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;

    fn aliases(pairs: &[(&str, &str)]) -> Vec<AliasRecord> {
        pairs
            .iter()
            .map(|&(address, goto)| AliasRecord::new(address, goto))
            .collect()
    }

    fn set(addresses: &[&str]) -> BTreeSet<String> {
        addresses.iter().map(|&a| a.to_owned()).collect()
    }

    #[test]
    fn single_alias() {
        assert_eq!(
            set(&["a@x.com"]),
            resolve_routing_addresses(
                "m@x.com",
                &aliases(&[("a@x.com", "m@x.com")])
            )
        );
    }

    #[test]
    fn two_hop_chain() {
        assert_eq!(
            set(&["a@x.com", "b@x.com"]),
            resolve_routing_addresses(
                "m@x.com",
                &aliases(&[("a@x.com", "m@x.com"), ("b@x.com", "a@x.com")])
            )
        );
    }

    #[test]
    fn wildcards_are_not_resolved() {
        assert_eq!(
            set(&[]),
            resolve_routing_addresses(
                "m@x.com",
                &aliases(&[("@x.com", "m@x.com")])
            )
        );

        // Nor does anything pointing at a wildcard get followed
        assert_eq!(
            set(&[]),
            resolve_routing_addresses(
                "m@x.com",
                &aliases(&[("@x.com", "m@x.com"), ("b@y.com", "@x.com")])
            )
        );
    }

    #[test]
    fn mailbox_case_is_ignored() {
        assert_eq!(
            set(&["a@x.com", "b@x.com"]),
            resolve_routing_addresses(
                "M@X.com",
                &aliases(&[("A@x.com", "m@x.com"), ("b@x.com", "a@X.COM")])
            )
        );
    }

    #[test]
    fn cycle_terminates() {
        assert_eq!(
            set(&["b@x.com"]),
            resolve_routing_addresses(
                "a@x.com",
                &aliases(&[("a@x.com", "b@x.com"), ("b@x.com", "a@x.com")])
            )
        );
    }

    #[test]
    fn self_alias() {
        assert_eq!(
            set(&[]),
            resolve_routing_addresses(
                "m@x.com",
                &aliases(&[("m@x.com", "m@x.com")])
            )
        );
    }

    #[test]
    fn diamond_reports_every_address_once() {
        // c -> {a, b}, a -> m, b -> m, d -> c
        assert_eq!(
            set(&["a@x.com", "b@x.com", "c@x.com", "d@x.com"]),
            resolve_routing_addresses(
                "m@x.com",
                &aliases(&[
                    ("a@x.com", "m@x.com"),
                    ("b@x.com", "m@x.com"),
                    ("c@x.com", "a@x.com, b@x.com"),
                    ("d@x.com", "c@x.com"),
                ])
            )
        );
    }

    #[test]
    fn unrelated_and_multi_destination_aliases() {
        assert_eq!(
            set(&["team@x.com", "all@x.com"]),
            resolve_routing_addresses(
                "m@x.com",
                &aliases(&[
                    ("team@x.com", "m@x.com,n@x.com"),
                    ("all@x.com", "team@x.com,other@x.com"),
                    ("sales@x.com", "n@x.com"),
                    ("other@x.com", "sales@x.com"),
                ])
            )
        );
    }

    #[test]
    fn empty_alias_list() {
        assert_eq!(set(&[]), resolve_routing_addresses("m@x.com", &[]));
    }

    // Reference implementation: repeatedly add any alias which delivers to
    // the mailbox or something already known, until nothing changes.
    fn fixed_point(
        mailbox: &str,
        aliases: &[AliasRecord],
    ) -> BTreeSet<String> {
        let mut reached = BTreeSet::new();
        reached.insert(mailbox.to_owned());
        loop {
            let before = reached.len();
            for alias in aliases.iter().filter(|a| !a.is_wildcard()) {
                if alias.destinations.iter().any(|d| reached.contains(d)) {
                    reached.insert(alias.address.clone());
                }
            }

            if reached.len() == before {
                break;
            }
        }

        reached.remove(mailbox);
        reached
    }

    fn alias_table() -> impl Strategy<Value = Vec<AliasRecord>> {
        // A small address space so that chains, cycles, and diamonds are
        // common.
        let address = prop_oneof![
            9 => "[a-h]@x\\.com",
            1 => Just("@x.com".to_owned()),
        ];
        prop::collection::vec(
            (address, prop::collection::vec("[a-h]@x\\.com", 1..4)),
            0..16,
        )
        .prop_map(|pairs| {
            pairs
                .into_iter()
                .map(|(address, goto)| {
                    AliasRecord::new(&address, &goto.join(","))
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn matches_fixed_point(aliases in alias_table()) {
            prop_assert_eq!(
                fixed_point("a@x.com", &aliases),
                resolve_routing_addresses("a@x.com", &aliases)
            );
        }

        #[test]
        fn never_contains_mailbox_or_wildcards(aliases in alias_table()) {
            let resolved = resolve_routing_addresses("a@x.com", &aliases);
            prop_assert!(!resolved.contains("a@x.com"));
            prop_assert!(resolved.iter().all(|a| !a.starts_with('@')));
        }

        #[test]
        fn idempotent(aliases in alias_table()) {
            prop_assert_eq!(
                resolve_routing_addresses("a@x.com", &aliases),
                resolve_routing_addresses("a@x.com", &aliases)
            );
        }
    }
}
