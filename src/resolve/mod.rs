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

//! Working out which addresses belong to a mailbox.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::mailcow::AliasRecord;

pub mod graph;
pub mod wildcard;

pub use graph::resolve_routing_addresses;
pub use wildcard::match_wildcards;

/// Everything a login learns about the addresses of one mailbox.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionResult {
    /// Concrete addresses which deliver to the mailbox, directly or through
    /// other aliases.
    pub resolved_addresses: BTreeSet<String>,
    /// Domains (without `@`) whose wildcard alias delivers to the mailbox.
    pub matched_wildcard_domains: BTreeSet<String>,
}

/// Resolve both the plain aliases and the wildcard domains of `mailbox`.
pub fn resolve(mailbox: &str, aliases: &[AliasRecord]) -> ResolutionResult {
    ResolutionResult {
        resolved_addresses: resolve_routing_addresses(mailbox, aliases),
        matched_wildcard_domains: match_wildcards(mailbox, aliases),
    }
}
