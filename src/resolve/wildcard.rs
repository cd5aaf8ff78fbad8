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

use std::collections::BTreeSet;

use crate::mailcow::AliasRecord;

/// Return the domains of all wildcard aliases (`@example.com`) which deliver
/// directly to `mailbox`.
///
/// The domains are returned without the leading `@`. Only direct delivery
/// counts; a wildcard pointing at another alias of the mailbox does not match.
pub fn match_wildcards(
    mailbox: &str,
    aliases: &[AliasRecord],
) -> BTreeSet<String> {
    let mailbox = mailbox.to_lowercase();
    aliases
        .iter()
        .filter(|a| a.destinations.contains(&mailbox))
        .filter_map(AliasRecord::wildcard_domain)
        .filter(|domain| !domain.is_empty())
        .map(str::to_owned)
        .collect()
}
