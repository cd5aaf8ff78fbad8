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

use log::warn;
use serde::Deserialize;

use crate::support::error::Error;

/// An alias as it appears in the `get/alias/all` response.
///
/// Only the fields we need are decoded; mailcow sends many more.
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RawAlias {
    pub address: String,
    #[serde(default)]
    pub goto: Option<String>,
    #[serde(default)]
    pub active: Option<ActiveFlag>,
    /// Older API versions only report the active state under this name.
    #[serde(default)]
    pub active_int: Option<ActiveFlag>,
}

/// The "active" state of an alias.
///
/// Depending on the mailcow version, this is sent as a boolean, an integer, or
/// a numeric string.
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(untagged)]
pub enum ActiveFlag {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl ActiveFlag {
    pub fn is_set(&self) -> bool {
        match *self {
            ActiveFlag::Bool(b) => b,
            ActiveFlag::Int(i) => 0 != i,
            ActiveFlag::Str(ref s) => {
                let s = s.trim();
                "1" == s || s.eq_ignore_ascii_case("true")
            }
        }
    }
}

/// The parts of the `get/mailbox/{mailbox}` response we care about.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct RawMailbox {
    #[serde(default)]
    pub name: Option<String>,
}

/// A normalised alias record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AliasRecord {
    /// The alias address, lower case. Domain wildcards start with `@`.
    pub address: String,
    /// Where mail to `address` is delivered, lower case. Never empty.
    pub destinations: BTreeSet<String>,
    pub active: bool,
}

impl AliasRecord {
    /// Normalise `raw`, returning `None` if it has no address or no
    /// destinations.
    pub fn from_raw(raw: RawAlias) -> Option<Self> {
        let address = normalise_address(&raw.address);
        if address.is_empty() {
            return None;
        }

        let destinations = raw
            .goto
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(normalise_address)
            .filter(|d| !d.is_empty())
            .collect::<BTreeSet<_>>();
        if destinations.is_empty() {
            return None;
        }

        let active = raw
            .active
            .iter()
            .chain(raw.active_int.iter())
            .any(ActiveFlag::is_set);

        Some(Self {
            address,
            destinations,
            active,
        })
    }

    #[cfg(test)]
    pub fn new(address: &str, goto: &str) -> Self {
        Self {
            address: normalise_address(address),
            destinations: goto
                .split(',')
                .map(normalise_address)
                .filter(|d| !d.is_empty())
                .collect(),
            active: true,
        }
    }

    /// If this is a domain wildcard (`@example.com`), return the domain.
    pub fn wildcard_domain(&self) -> Option<&str> {
        self.address.strip_prefix('@')
    }

    pub fn is_wildcard(&self) -> bool {
        self.wildcard_domain().is_some()
    }
}

pub fn normalise_address(address: &str) -> String {
    address.trim().to_lowercase()
}

/// Decode the body of a `get/alias/all` response.
///
/// Elements which cannot be decoded or have no address or destinations are
/// skipped; the whole response is only rejected if it is not a list at all.
/// Inactive aliases are retained here.
pub fn parse_alias_list(body: &[u8]) -> Result<Vec<AliasRecord>, Error> {
    let elements = match serde_json::from_slice::<serde_json::Value>(body)? {
        serde_json::Value::Array(elements) => elements,
        // mailcow sends `{}` instead of `[]` when there are no aliases
        serde_json::Value::Object(ref map) if map.is_empty() => Vec::new(),
        _ => {
            return Err(Error::UnexpectedResponse(
                "alias list is not a JSON array",
            ))
        }
    };

    let mut malformed = 0usize;
    let mut records = Vec::with_capacity(elements.len());
    for element in elements {
        match serde_json::from_value::<RawAlias>(element)
            .ok()
            .and_then(AliasRecord::from_raw)
        {
            Some(record) => records.push(record),
            None => malformed += 1,
        }
    }

    if malformed > 0 {
        warn!("Ignored {} malformed alias records", malformed);
    }

    Ok(records)
}

/// Decode the body of a `get/mailbox/{mailbox}` response into the trimmed
/// display name.
pub fn parse_realname(body: &[u8]) -> Result<String, Error> {
    let mailbox: RawMailbox = serde_json::from_slice(body)?;
    mailbox
        .name
        .map(|n| n.trim().to_owned())
        .filter(|n| !n.is_empty())
        .ok_or(Error::MissingField("name"))
}
